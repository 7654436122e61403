//! Shared rendering context: output buffer, indentation, argument tokens.

use tvmdis_core::{CellHash, CellRegistry};

use crate::item::{Code, CodeBlock, Data, DataBlock, Item, ItemId, JumpTable, OpcodeArg};
use crate::{DisasmError, DisasmParams, DisasmResult};

/// Jump tables passed as slice arguments always print as this literal;
/// their entries are rendered separately by the consuming opcode, so the
/// raw selector bits are irrelevant here.
const JUMP_TABLE_SLICE: &str = "(xC_)";

/// Rendering context shared by every scope of one disassembly.
///
/// Owns the output buffer and resolves item references through the code
/// graph and the cell registry. Lookups return graph-lifetime references
/// so callers can hold onto blocks while continuing to write.
pub(crate) struct Context<'a> {
    code: &'a Code,
    cells: &'a CellRegistry,
    tab: String,
    out: String,
}

impl<'a> Context<'a> {
    pub(crate) fn new(code: &'a Code, cells: &'a CellRegistry, params: &DisasmParams) -> Self {
        Self { code, cells, tab: " ".repeat(params.tab_width), out: String::new() }
    }

    pub(crate) fn into_output(self) -> String {
        self.out
    }

    pub(crate) fn write_line(&mut self, depth: usize, text: &str) {
        self.out.push_str(&self.tab.repeat(depth));
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn registry(&self) -> &'a CellRegistry {
        self.cells
    }

    pub(crate) fn item(&self, id: ItemId) -> DisasmResult<&'a Item> {
        self.code.item(id)
    }

    pub(crate) fn code_block(&self, id: ItemId) -> DisasmResult<&'a CodeBlock> {
        self.code.code_block(id)
    }

    pub(crate) fn jump_table(&self, id: ItemId) -> DisasmResult<&'a JumpTable> {
        self.code.jump_table(id)
    }

    /// Formats one opcode argument as its output token.
    pub(crate) fn format_arg(&self, arg: &OpcodeArg) -> DisasmResult<String> {
        match arg {
            OpcodeArg::Int { value } => Ok(value.clone()),
            OpcodeArg::Stack { idx } => {
                Ok(if *idx < 0 { format!("s({idx})") } else { format!("s{idx}") })
            }
            OpcodeArg::Reg { idx } => Ok(format!("c{idx}")),
            OpcodeArg::Cell { id } => {
                let hash = self.cell_arg_hash(*id)?;
                Ok(format!("({hash})"))
            }
            OpcodeArg::Slice { id } => self.slice_arg_token(*id),
        }
    }

    /// Token hash for a whole-cell argument: a non-inline code block, a
    /// library, or a cell-shaped data block.
    fn cell_arg_hash(&self, id: ItemId) -> DisasmResult<CellHash> {
        match self.item(id)? {
            Item::Code(block) => {
                if block.is_inline {
                    return Err(DisasmError::UnexpectedItemKind {
                        expected: "non-inline code",
                        found: "inline code",
                    });
                }
                Ok(block.cell_hash)
            }
            Item::Library(lib) => Ok(lib.hash),
            Item::DataBlock(DataBlock { data: Data::Cell { cell_hash }, .. }) => Ok(*cell_hash),
            Item::DataBlock(_) => Err(DisasmError::UnexpectedItemKind {
                expected: "cell-shaped data",
                found: "slice-shaped data",
            }),
            other => Err(DisasmError::UnexpectedItemKind { expected: "cell", found: other.kind() }),
        }
    }

    /// Token for a slice argument: an inline code block or a slice-shaped
    /// data block, loaded through the registry; jump tables are the fixed
    /// literal.
    fn slice_arg_token(&self, id: ItemId) -> DisasmResult<String> {
        let window = match self.item(id)? {
            Item::JumpTable(_) => return Ok(JUMP_TABLE_SLICE.into()),
            Item::Code(block) => {
                if !block.is_inline {
                    return Err(DisasmError::UnexpectedItemKind {
                        expected: "inline code",
                        found: "non-inline code",
                    });
                }
                self.cells.subslice(
                    &block.cell_hash,
                    block.offset_bits,
                    block.offset_refs,
                    block.bits,
                    block.refs,
                )?
            }
            Item::DataBlock(DataBlock {
                data: Data::Slice { cell_hash, offset_bits, offset_refs, bits, refs },
                ..
            }) => self.cells.subslice(cell_hash, *offset_bits, *offset_refs, *bits, *refs)?,
            Item::DataBlock(_) => {
                return Err(DisasmError::UnexpectedItemKind {
                    expected: "slice-shaped data",
                    found: "cell-shaped data",
                })
            }
            other => {
                return Err(DisasmError::UnexpectedItemKind {
                    expected: "slice",
                    found: other.kind(),
                })
            }
        };
        Ok(if window.refs > 0 {
            format!("({},{})", window.bits, window.refs)
        } else {
            window.bits.to_string()
        })
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
