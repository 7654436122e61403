//! Hash-indexed registry over a cell tree.
//!
//! The registry deduplicates the tree by content hash: the same subtree
//! reachable through several parents is indexed once, so lookups see the
//! tree as the DAG it logically is. Built once per disassembly request and
//! read-only afterwards.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::{collections::BTreeMap, sync::Arc, vec, vec::Vec};

use crate::bits::BitString;
use crate::cell::{Cell, CellHash};
use crate::{CellError, CellResult};

/// A bit/ref window resolved out of a registered cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subslice {
    /// The window's bits.
    pub bits: BitString,
    /// Number of references covered by the window.
    pub refs: usize,
}

/// Deduplicated hash → cell index over one tree.
#[derive(Debug, Default, Clone)]
pub struct CellRegistry {
    cells: BTreeMap<CellHash, Arc<Cell>>,
}

impl CellRegistry {
    /// Indexes every distinct cell reachable from `root`.
    ///
    /// Walks with an explicit work stack so pathological tree depth cannot
    /// exhaust the call stack; descent stops at already-indexed hashes.
    pub fn build(root: &Arc<Cell>) -> Self {
        let mut cells = BTreeMap::new();
        let mut stack: Vec<Arc<Cell>> = vec![root.clone()];
        while let Some(cell) = stack.pop() {
            let hash = cell.hash();
            if cells.contains_key(&hash) {
                continue;
            }
            for child in cell.refs() {
                stack.push(child.clone());
            }
            cells.insert(hash, cell);
        }
        Self { cells }
    }

    /// Number of distinct cells indexed.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Resolves a cell by content hash.
    pub fn cell(&self, hash: &CellHash) -> CellResult<&Arc<Cell>> {
        self.cells.get(hash).ok_or(CellError::UnknownCell { hash: *hash })
    }

    /// Resolves the window `[offset_bits, offset_bits + bits)` /
    /// `[offset_refs, offset_refs + refs)` of the cell at `hash`.
    ///
    /// The window must lie within the owning cell's actual extent.
    pub fn subslice(
        &self,
        hash: &CellHash,
        offset_bits: usize,
        offset_refs: usize,
        bits: usize,
        refs: usize,
    ) -> CellResult<Subslice> {
        let cell = self.cell(hash)?;
        let out_of_range = || CellError::SliceOutOfRange {
            end_bits: offset_bits + bits,
            end_refs: offset_refs + refs,
            cell_bits: cell.bit_len(),
            cell_refs: cell.refs().len(),
        };
        if offset_refs + refs > cell.refs().len() {
            return Err(out_of_range());
        }
        let bits = cell.bits().subslice(offset_bits, bits).ok_or_else(out_of_range)?;
        Ok(Subslice { bits, refs })
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
