use core::{cmp, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A round number.
///
/// Can be either:
/// - `Round::Nil` (ie. `-1`), the value of an unset round reference
///   such as a fresh proposal's valid round or an empty lock
/// - `Round::Some(r)` where `r >= 0`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Round {
    /// No round, ie. `-1`
    Nil,

    /// Some round `r` where `r >= 0`
    Some(u32),
}

impl Round {
    /// The initial round.
    pub const ZERO: Self = Self::Some(0);

    /// Create a new non-nil round.
    pub const fn new(round: u32) -> Self {
        Self::Some(round)
    }

    /// Convert the round to an `Option<u32>`, mapping `Nil` to `None`.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Round::Nil => None,
            Round::Some(r) => Some(*r),
        }
    }

    /// Convert the round to an `i64`, mapping `Nil` to `-1`.
    pub fn as_i64(&self) -> i64 {
        match self {
            Round::Nil => -1,
            Round::Some(r) => i64::from(*r),
        }
    }

    /// Whether the round is defined, ie. `r >= 0`.
    pub fn is_defined(&self) -> bool {
        matches!(self, Round::Some(_))
    }

    /// Whether the round is nil, ie. `r == -1`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Round::Nil)
    }

    /// The round after this one. `Nil` increments to round zero.
    pub fn increment(&self) -> Round {
        match self {
            Round::Nil => Round::new(0),
            Round::Some(r) => Round::new(r + 1),
        }
    }
}

impl From<u32> for Round {
    fn from(round: u32) -> Self {
        Round::new(round)
    }
}

impl From<i64> for Round {
    fn from(round: i64) -> Self {
        assert!(round <= i64::from(u32::MAX));

        if round < 0 {
            Round::Nil
        } else {
            Round::new(round as u32)
        }
    }
}

impl PartialOrd for Round {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Round {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.as_i64().cmp(&other.as_i64())
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_i64().fmt(f)
    }
}

impl Serialize for Round {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for Round {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let round = i64::deserialize(deserializer)?;

        if round > i64::from(u32::MAX) {
            return Err(serde::de::Error::custom("round out of range"));
        }

        Ok(Round::from(round))
    }
}
