//! tvmdis-text — renders a decoded code graph as structured assembly
//!
//! The external decoder turns raw bytecode cells into a flat graph of
//! tagged items ([`Code`]); this crate folds that graph back into the
//! nested text a structured assembler would have produced:
//!
//! ```text
//! 0 SETCP
//! 19 (xC_) DICTPUSHCONST
//! DICTIGETJMPZ {
//!   0 => <{
//!     IF:<{
//!       s0 s1 XCHG
//!     }>ELSE<{
//!       DROP
//!     }>
//!   }>
//! }
//! ```
//!
//! API:
//! - [`disassemble`]: code graph + cell tree → text
//! - [`DisasmParams`]: indentation width (the only knob)
//! - [`item`]: the decoder interchange model
//!
//! Rendering is a pure, terminating traversal of immutable inputs; every
//! failure is an integrity fault surfaced as [`DisasmError`], except for
//! partially decoded blocks, which render as diagnostics.

#![deny(missing_docs)]

use std::sync::Arc;

use tracing::debug;
use tvmdis_core::{Cell, CellError, CellRegistry};

/// Decoded code graph: the decoder interchange model.
pub mod item;

mod context;
mod render;

use context::Context;
use render::BlockRenderer;

pub use item::{
    Code, CodeBlock, Data, DataBlock, Item, ItemId, JumpTable, Library, Opcode, OpcodeArg, Tail,
};

/* ─────────────────────────── Errors ─────────────────────────── */

/// Common result alias for the renderer.
pub type DisasmResult<T> = Result<T, DisasmError>;

/// Integrity faults raised while rendering.
///
/// These check the assumption of a conformant upstream decoder; none of
/// them is expected control flow, and none is recoverable.
#[derive(Debug, thiserror::Error)]
pub enum DisasmError {
    /// A cell-level fault (unknown hash, out-of-range window).
    #[error(transparent)]
    Cell(#[from] CellError),
    /// An item id points outside the graph's item array.
    #[error("unknown item {id}")]
    UnknownItem {
        /// The id that failed to resolve.
        id: ItemId,
    },
    /// A resolved item's kind is invalid for its argument position.
    #[error("unexpected item kind: expected {expected}, found {found}")]
    UnexpectedItemKind {
        /// Kind required by the argument position.
        expected: &'static str,
        /// Kind actually found.
        found: &'static str,
    },
    /// An instruction's argument list does not match its shape.
    #[error("{opcode}: expected {expected} argument")]
    UnexpectedArg {
        /// The instruction with the malformed arguments.
        opcode: String,
        /// What the renderer needed.
        expected: &'static str,
    },
    /// A pending-continuation slot was occupied (or empty) where the
    /// classifier guarantees otherwise; a renderer defect, never expected
    /// from well-formed input.
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

/* ─────────────────────────── Parameters ─────────────────────────── */

/// Rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisasmParams {
    /// Columns per indentation level.
    pub tab_width: usize,
}

impl Default for DisasmParams {
    fn default() -> Self {
        Self { tab_width: 2 }
    }
}

/* ─────────────────────────── Entry point ─────────────────────────── */

/// Renders a decoded code graph as nested structured assembly text.
///
/// `root_cell` is the raw tree the graph was decoded from; it backs every
/// bit-level lookup (inline slices, diagnostics for partially decoded
/// blocks). `code.root` must name a code block.
pub fn disassemble(
    root_cell: &Arc<Cell>,
    code: &Code,
    params: &DisasmParams,
) -> DisasmResult<String> {
    let registry = CellRegistry::build(root_cell);
    debug!(
        root = code.root,
        items = code.items.len(),
        cells = registry.len(),
        "rendering code graph"
    );

    let mut ctx = Context::new(code, &registry, params);
    let root = code.code_block(code.root)?;
    BlockRenderer::new(&mut ctx, 0).render(root)?;
    Ok(ctx.into_output())
}

/* ─────────────────────────── Tests ─────────────────────────── */
