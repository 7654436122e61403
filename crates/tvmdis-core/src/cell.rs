//! Content-addressed cells.
//!
//! A cell is a fixed-capacity tree node: at most [`MAX_BITS`] payload bits
//! and [`MAX_REFS`] child references. Cells are immutable and identified by
//! the SHA-256 of their standard representation (descriptor bytes, padded
//! payload, child hashes), so structurally equal subtrees share a hash.

#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
#[cfg(feature = "std")]
use std::sync::Arc;

use core::fmt;
use core::str::FromStr;

use sha2::{Digest as _, Sha256};
use smallvec::SmallVec;

use crate::bits::BitString;
use crate::{CellError, CellResult};

/// Maximum payload length of a cell, in bits.
pub const MAX_BITS: usize = 1023;

/// Maximum number of child references of a cell.
pub const MAX_REFS: usize = 4;

/* ─────────────────────────── CellHash ─────────────────────────── */

/// 32-byte content hash of a cell's standard representation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellHash([u8; 32]);

impl CellHash {
    /// Wraps raw hash bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw hash bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CellHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CellHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellHash({self})")
    }
}

/// Error parsing a [`CellHash`] from its 64-char hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCellHashError;

impl fmt::Display for ParseCellHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid cell hash (expected 64 hex chars)")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseCellHashError {}

impl FromStr for CellHash {
    type Err = ParseCellHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.as_bytes();
        if raw.len() != 64 {
            return Err(ParseCellHashError);
        }
        let mut out = [0u8; 32];
        for (i, chunk) in raw.chunks_exact(2).enumerate() {
            let hi = hex_val(chunk[0]).ok_or(ParseCellHashError)?;
            let lo = hex_val(chunk[1]).ok_or(ParseCellHashError)?;
            out[i] = (hi << 4) | lo;
        }
        Ok(Self(out))
    }
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CellHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CellHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl serde::de::Visitor<'_> for HexVisitor {
            type Value = CellHash;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 64-character hex string")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

/* ─────────────────────────── Cell ─────────────────────────── */

/// Immutable node of a content-addressed cell tree.
#[derive(Debug, Clone)]
pub struct Cell {
    bits: BitString,
    refs: SmallVec<[Arc<Cell>; MAX_REFS]>,
    hash: CellHash,
}

impl Cell {
    /// Builds a cell over the given payload and children.
    ///
    /// Fails with [`CellError::CellOverflow`] past [`MAX_BITS`] /
    /// [`MAX_REFS`]. The content hash is computed eagerly; children must
    /// already exist, so trees are built leaves-first.
    pub fn new(bits: BitString, refs: &[Arc<Cell>]) -> CellResult<Arc<Self>> {
        if bits.len() > MAX_BITS || refs.len() > MAX_REFS {
            return Err(CellError::CellOverflow { bits: bits.len(), refs: refs.len() });
        }
        let refs: SmallVec<[Arc<Cell>; MAX_REFS]> = refs.iter().cloned().collect();
        let hash = repr_hash(&bits, &refs);
        Ok(Arc::new(Self { bits, refs, hash }))
    }

    /// Payload bits.
    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    /// Payload length in bits.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Child references, in order.
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Content hash of the standard representation.
    pub fn hash(&self) -> CellHash {
        self.hash
    }
}

/// Standard representation hash: two descriptor bytes, the
/// completion-tagged payload image, then each child hash in order.
fn repr_hash(bits: &BitString, refs: &[Arc<Cell>]) -> CellHash {
    let mut hasher = Sha256::new();
    let d1 = refs.len() as u8;
    let d2 = (bits.len() / 8 + bits.len().div_ceil(8)) as u8;
    hasher.update([d1, d2]);
    hasher.update(bits.to_padded_bytes());
    for child in refs {
        hasher.update(child.hash.as_bytes());
    }
    CellHash(hasher.finalize().into())
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bits(s: &str) -> BitString {
        BitString::from_binary(s).unwrap()
    }

    #[test]
    fn equal_content_means_equal_hash() {
        let a = Cell::new(bits("1010"), &[]).unwrap();
        let b = Cell::new(bits("1010"), &[]).unwrap();
        let c = Cell::new(bits("1011"), &[]).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn children_participate_in_the_hash() {
        let leaf_a = Cell::new(bits("1"), &[]).unwrap();
        let leaf_b = Cell::new(bits("0"), &[]).unwrap();
        let with_a = Cell::new(bits("11"), &[leaf_a.clone()]).unwrap();
        let with_b = Cell::new(bits("11"), &[leaf_b]).unwrap();
        let with_a_again = Cell::new(bits("11"), &[leaf_a]).unwrap();
        assert_ne!(with_a.hash(), with_b.hash());
        assert_eq!(with_a.hash(), with_a_again.hash());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut long = BitString::new();
        for _ in 0..MAX_BITS + 1 {
            long.push(true);
        }
        assert_eq!(
            Cell::new(long, &[]).unwrap_err(),
            CellError::CellOverflow { bits: MAX_BITS + 1, refs: 0 }
        );

        let leaf = Cell::new(bits(""), &[]).unwrap();
        let five = [leaf.clone(), leaf.clone(), leaf.clone(), leaf.clone(), leaf];
        assert!(matches!(
            Cell::new(bits(""), &five).unwrap_err(),
            CellError::CellOverflow { refs: 5, .. }
        ));
    }

    #[test]
    fn hash_hex_round_trip() {
        let cell = Cell::new(bits("110"), &[]).unwrap();
        let text = cell.hash().to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<CellHash>().unwrap(), cell.hash());
        assert!("zz".parse::<CellHash>().is_err());
    }
}
