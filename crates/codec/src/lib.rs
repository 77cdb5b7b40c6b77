//! Canonical deterministic encoding for consensus payloads.
//!
//! Everything that is hashed or signed in the engine goes through this crate,
//! so that digests and signature pre-images agree bit-exactly across peers:
//!
//! - maps are encoded with their keys in sorted order,
//! - integers are encoded as JSON numbers,
//! - byte strings are encoded as lowercase hex strings,
//! - timestamps are encoded as `yyyy-MM-ddTHH:mm:ss.ffffffZ` (UTC,
//!   microsecond precision).

#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![warn(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha3::{Digest, Keccak256};

pub mod timestamp;

/// Errors that can occur while encoding or decoding a canonical payload.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The payload could not be serialized.
    #[error("failed to encode canonical payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// The payload could not be deserialized.
    #[error("failed to decode canonical payload: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode a value into its canonical byte representation.
///
/// The value is first lowered into a JSON value, whose object keys are kept
/// in a sorted map, and then rendered without insignificant whitespace.
/// Two structurally equal values therefore always encode to the same bytes,
/// regardless of field declaration order.
pub fn to_canonical_vec<T>(value: &T) -> Result<Vec<u8>, Error>
where
    T: Serialize,
{
    let json = serde_json::to_value(value).map_err(Error::Encode)?;
    serde_json::to_vec(&json).map_err(Error::Encode)
}

/// Decode a value from its canonical byte representation.
pub fn from_canonical_slice<T>(bytes: &[u8]) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(Error::Decode)
}

/// Keccak-256 digest of the given bytes.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Serde helper for byte arrays rendered as lowercase hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a lowercase hex string.
    pub fn serialize<S>(bytes: impl AsRef<[u8]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes.as_ref()))
    }

    /// Deserialize bytes from a hex string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    struct Unsorted {
        zebra: u64,
        apple: u64,
        mango: u64,
    }

    #[test]
    fn keys_are_sorted() {
        let bytes = to_canonical_vec(&Unsorted {
            zebra: 1,
            apple: 2,
            mango: 3,
        })
        .unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"apple":2,"mango":3,"zebra":1}"#
        );
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
    struct Payload {
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
        index: u64,
    }

    #[test]
    fn round_trip() {
        let payload = Payload {
            data: vec![0xde, 0xad, 0xbe, 0xef],
            index: 42,
        };

        let bytes = to_canonical_vec(&payload).unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"{"data":"deadbeef","index":42}"#
        );

        let decoded: Payload = from_canonical_slice(&bytes).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn keccak256_digest() {
        // Keccak-256 of the empty string, a fixed point of the EVM world.
        let digest = keccak256(b"");
        assert_eq!(
            hex::encode(digest),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
