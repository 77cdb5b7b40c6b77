use core::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use basaltbft_codec as codec;

use crate::{Address, Height};

/// The Keccak-256 digest of a block's canonical header encoding.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    /// Create a block hash from raw digest bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({self})")
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;

        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid block hash length"))?;

        Ok(Self(bytes))
    }
}

/// A block header.
///
/// The header is what gets hashed and agreed upon; the payload is opaque to
/// consensus and only pinned down by `payload_hash`. Serde field names are
/// the fixed key alphabet of the canonical encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Protocol version the block was produced under.
    pub version: u32,

    /// Height of the block.
    pub height: Height,

    /// Creation time of the block.
    #[serde(with = "codec::timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Hash of the previous block.
    pub prev_hash: BlockHash,

    /// Keccak-256 digest of the block payload.
    pub payload_hash: BlockHash,

    /// Address of the validator that produced the block.
    pub proposer: Address,
}

impl BlockHeader {
    /// The canonical encoding of this header.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, codec::Error> {
        codec::to_canonical_vec(self)
    }

    /// The hash identifying the block with this header.
    ///
    /// Headers always have a canonical encoding, so this cannot fail.
    pub fn hash(&self) -> BlockHash {
        let bytes = self
            .canonical_bytes()
            .unwrap_or_else(|e| unreachable!("header encoding cannot fail: {e}"));

        BlockHash(codec::keccak256(&bytes))
    }
}

/// A block: a header plus an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,

    /// The opaque block payload. Consensus never inspects it.
    #[serde(with = "payload")]
    pub payload: Bytes,
}

impl Block {
    /// Create a block from a header and payload.
    pub fn new(header: BlockHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// The hash identifying this block.
    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    /// Whether the payload matches the digest committed to in the header.
    pub fn payload_matches_header(&self) -> bool {
        BlockHash(codec::keccak256(&self.payload)) == self.header.payload_hash
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({} at height {})", self.hash(), self.header.height)
    }
}

mod payload {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Ok(Bytes::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn header() -> BlockHeader {
        BlockHeader {
            version: 1,
            height: Height::new(7),
            timestamp: Utc.with_ymd_and_hms(2021, 9, 6, 13, 46, 39).unwrap(),
            prev_hash: BlockHash::new([0x11; 32]),
            payload_hash: BlockHash::new([0x22; 32]),
            proposer: Address::new([0x33; 20]),
        }
    }

    #[test]
    fn canonical_encoding_has_sorted_keys() {
        let bytes = header().canonical_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let keys: Vec<usize> = [
            "\"height\"",
            "\"payload_hash\"",
            "\"prev_hash\"",
            "\"proposer\"",
            "\"timestamp\"",
            "\"version\"",
        ]
        .iter()
        .map(|k| text.find(k).expect("key present"))
        .collect();

        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn header_round_trips() {
        let header = header();
        let bytes = header.canonical_bytes().unwrap();
        let decoded: BlockHeader = codec::from_canonical_slice(&bytes).unwrap();

        assert_eq!(decoded, header);
        assert_eq!(decoded.hash(), header.hash());
    }

    #[test]
    fn hash_changes_with_header() {
        let a = header();

        let mut b = a.clone();
        b.height = Height::new(8);

        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn payload_digest_check() {
        let payload = Bytes::from_static(b"transactions");

        let mut header = header();
        header.payload_hash = BlockHash::new(codec::keccak256(&payload));

        let block = Block::new(header, payload);
        assert!(block.payload_matches_header());

        let tampered = Block::new(block.header.clone(), Bytes::from_static(b"other"));
        assert!(!tampered.payload_matches_header());
    }
}
