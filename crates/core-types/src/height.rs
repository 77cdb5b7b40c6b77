use core::fmt;

use serde::{Deserialize, Serialize};

/// A blockchain height.
///
/// Fixed at context construction: one context decides exactly one height.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Height(u64);

impl Height {
    /// Create a new height.
    pub const fn new(height: u64) -> Self {
        Self(height)
    }

    /// The height as a plain integer.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The next height.
    pub fn increment(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for Height {
    fn from(height: u64) -> Self {
        Self(height)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Height({})", self.0)
    }
}
