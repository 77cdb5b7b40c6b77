use crate::{BlockHash, VotingPower};

/// The quorum thresholds a bucket of votes can reach.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Threshold {
    /// No quorum has been reached yet.
    Unreached,

    /// Quorum of votes, but not for the same block.
    Any,

    /// Quorum of votes for nil.
    Nil,

    /// Quorum of votes for a specific block.
    Value(BlockHash),
}

/// The two threshold parameters of the protocol.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThresholdParams {
    /// Threshold for a quorum (2f+1).
    pub quorum: ThresholdParam,

    /// Threshold guaranteeing at least one honest participant (f+1).
    pub honest: ThresholdParam,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            quorum: ThresholdParam::TWO_F_PLUS_ONE,
            honest: ThresholdParam::F_PLUS_ONE,
        }
    }
}

/// A threshold expressed as a fraction of the total voting power.
///
/// The threshold is met when `weight / total > numerator / denominator`,
/// evaluated without division: `weight * denominator > total * numerator`.
/// With `3F + 1 <= total < 3F + 4`, more-than-two-thirds is exactly the
/// `2F + 1` quorum and more-than-one-third is exactly `F + 1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThresholdParam {
    /// Numerator of the threshold fraction.
    pub numerator: u64,

    /// Denominator of the threshold fraction.
    pub denominator: u64,
}

impl ThresholdParam {
    /// 2f+1, ie. more than two thirds of the total voting power.
    pub const TWO_F_PLUS_ONE: Self = Self::new(2, 3);

    /// f+1, ie. more than one third of the total voting power.
    pub const F_PLUS_ONE: Self = Self::new(1, 3);

    /// Create a new threshold parameter.
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Whether the threshold is met by `weight` out of `total` voting power.
    pub fn is_met(&self, weight: VotingPower, total: VotingPower) -> bool {
        let lhs = weight
            .checked_mul(self.denominator)
            .expect("attempt to multiply with overflow");

        let rhs = total
            .checked_mul(self.numerator)
            .expect("attempt to multiply with overflow");

        lhs > rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_is_two_thirds() {
        assert!(!ThresholdParam::TWO_F_PLUS_ONE.is_met(2, 4));
        assert!(ThresholdParam::TWO_F_PLUS_ONE.is_met(3, 4));

        assert!(!ThresholdParam::TWO_F_PLUS_ONE.is_met(6, 10));
        assert!(ThresholdParam::TWO_F_PLUS_ONE.is_met(7, 10));
    }

    #[test]
    fn honest_is_one_third() {
        assert!(!ThresholdParam::F_PLUS_ONE.is_met(1, 4));
        assert!(ThresholdParam::F_PLUS_ONE.is_met(2, 4));

        assert!(!ThresholdParam::F_PLUS_ONE.is_met(3, 10));
        assert!(ThresholdParam::F_PLUS_ONE.is_met(4, 10));
    }

    #[test]
    #[should_panic(expected = "attempt to multiply with overflow")]
    fn is_met_overflow() {
        ThresholdParam::TWO_F_PLUS_ONE.is_met(1, u64::MAX);
    }
}
