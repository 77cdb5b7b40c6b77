use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PublicKey;

/// A validator address: the first 20 bytes of the Keccak-256 digest
/// of the validator's public key.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; Self::LENGTH]);

impl Address {
    const LENGTH: usize = 20;

    /// Create an address from raw bytes.
    pub const fn new(value: [u8; Self::LENGTH]) -> Self {
        Self(value)
    }

    /// Derive the address of the given public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let hash = basaltbft_codec::keccak256(public_key.as_bytes());
        let mut address = [0; Self::LENGTH];
        address.copy_from_slice(&hash[..Self::LENGTH]);
        Self(address)
    }

    /// The raw address bytes.
    pub fn into_inner(self) -> [u8; Self::LENGTH] {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;

        let bytes: [u8; Self::LENGTH] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid address length"))?;

        Ok(Self(bytes))
    }
}
