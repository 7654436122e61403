//! tvmdis-core — shared primitives for the tvmdis workspace (no_std-ready)
//!
//! Provides:
//! - `BitString`: owned bit buffer with bit-exact windows and the `x{…}`
//!   hex literal form
//! - `Cell` + `CellHash`: immutable content-addressed tree nodes
//! - `CellRegistry`: hash-indexed, deduplicated view of a cell tree
//! - Errors `CellError` + alias `CellResult<T>`
//!
//! Features:
//! - `std` (default): `std::error::Error` impls
//! - `serde`: string (de)serialization for `CellHash`

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

/* ─────────────────────────── Imports ─────────────────────────── */

use core::fmt;

#[cfg(not(feature = "std"))]
extern crate alloc;

/* ─────────────────────────── Public modules ─────────────────────────── */

/// Bit-level buffers and the `x{…}` literal form.
pub mod bits;

/// Content-addressed cells and their hashes.
pub mod cell;

/// Hash-indexed registry over a cell tree.
pub mod registry;

pub use bits::BitString;
pub use cell::{Cell, CellHash, ParseCellHashError, MAX_BITS, MAX_REFS};
pub use registry::{CellRegistry, Subslice};

/* ─────────────────────────── Common result ─────────────────────────── */

/// Common result alias for the core crate.
pub type CellResult<T> = core::result::Result<T, CellError>;

/* ─────────────────────────── Errors ─────────────────────────── */

/// Low-level cell faults shared across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellError {
    /// A referenced content hash is absent from the registry.
    UnknownCell {
        /// The hash that failed to resolve.
        hash: CellHash,
    },
    /// A requested window runs past the owning cell's actual extent.
    SliceOutOfRange {
        /// Requested window end, in bits.
        end_bits: usize,
        /// Requested window end, in refs.
        end_refs: usize,
        /// Bit length of the owning cell.
        cell_bits: usize,
        /// Reference count of the owning cell.
        cell_refs: usize,
    },
    /// Attempted to build a cell beyond [`MAX_BITS`] / [`MAX_REFS`].
    CellOverflow {
        /// Requested payload length in bits.
        bits: usize,
        /// Requested reference count.
        refs: usize,
    },
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellError::UnknownCell { hash } => write!(f, "unknown cell {hash}"),
            CellError::SliceOutOfRange { end_bits, end_refs, cell_bits, cell_refs } => write!(
                f,
                "slice out of range: window ends at {end_bits} bits / {end_refs} refs, cell has {cell_bits} / {cell_refs}"
            ),
            CellError::CellOverflow { bits, refs } => {
                write!(f, "cell overflow: {bits} bits / {refs} refs")
            }
        }
    }
}

/// `std::error::Error` only with the `std` feature.
#[cfg(feature = "std")]
impl std::error::Error for CellError {}

/* ─────────────────────────── Prelude ─────────────────────────── */

/// Convenience re-exports of the crate's key types.
pub mod prelude {
    /// Re-exports for a quick import.
    pub use super::{
        BitString, Cell, CellError, CellHash, CellRegistry, CellResult, Subslice, MAX_BITS,
        MAX_REFS,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
