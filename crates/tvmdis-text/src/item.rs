//! Decoded code graph: the decoder interchange model.
//!
//! The external instruction decoder emits a dense array of tagged items
//! plus a root id, as camelCase, `type`-tagged JSON. Everything here is
//! immutable once deserialized; opcode arguments reference other items by
//! [`ItemId`] and the graph is expected to be referentially intact, which
//! the accessors enforce with explicit checks rather than trusting it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tvmdis_core::CellHash;

use crate::{DisasmError, DisasmResult};

/// Dense index of an [`Item`] within one [`Code`] graph.
pub type ItemId = u32;

/// A decoded code graph: parsed items and the index to start from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Code {
    /// Entry item; must be a code block.
    pub root: ItemId,
    /// All items, indexed by [`ItemId`].
    pub items: Vec<Item>,
}

impl Code {
    /// Resolves an item id, failing on out-of-range ids.
    pub fn item(&self, id: ItemId) -> DisasmResult<&Item> {
        self.items.get(id as usize).ok_or(DisasmError::UnknownItem { id })
    }

    /// Resolves an id that must name a code block.
    pub fn code_block(&self, id: ItemId) -> DisasmResult<&CodeBlock> {
        match self.item(id)? {
            Item::Code(block) => Ok(block),
            other => Err(DisasmError::UnexpectedItemKind { expected: "code", found: other.kind() }),
        }
    }

    /// Resolves an id that must name a jump table.
    pub fn jump_table(&self, id: ItemId) -> DisasmResult<&JumpTable> {
        match self.item(id)? {
            Item::JumpTable(table) => Ok(table),
            other => {
                Err(DisasmError::UnexpectedItemKind { expected: "jumpTable", found: other.kind() })
            }
        }
    }
}

/// One graph item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Item {
    /// Multi-way dispatch table.
    JumpTable(JumpTable),
    /// Decoded continuation.
    Code(CodeBlock),
    /// Non-code payload region.
    DataBlock(DataBlock),
    /// Reference to a cell stored outside the supplied tree.
    Library(Library),
}

impl Item {
    /// Wire tag of the item's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Item::JumpTable(_) => "jumpTable",
            Item::Code(_) => "code",
            Item::DataBlock(_) => "dataBlock",
            Item::Library(_) => "library",
        }
    }
}

/// Dictionary mapping integer keys to continuation entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpTable {
    /// Item id.
    pub id: ItemId,
    /// Hash of the cell holding the serialized dictionary.
    pub cell_hash: CellHash,
    /// Width of the dictionary keys, in bits.
    pub key_bits: u16,
    /// Key → target item. Iteration order is unspecified; rendering sorts.
    #[serde(with = "int_key_map")]
    pub items: HashMap<i64, ItemId>,
    /// Whether the table dispatches over full method bodies.
    pub is_full_code: bool,
}

/// A decoded continuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    /// Item id.
    pub id: ItemId,
    /// Hash of the owning cell.
    pub cell_hash: CellHash,
    /// Whether the block is embedded in a parent cell's bit range rather
    /// than occupying a whole cell.
    pub is_inline: bool,
    /// Start of the block within the owning cell, in bits.
    pub offset_bits: usize,
    /// Start of the block within the owning cell, in refs.
    pub offset_refs: usize,
    /// Declared length in bits.
    pub bits: usize,
    /// Declared length in refs.
    pub refs: usize,
    /// Decoded instructions, in order.
    pub opcodes: Vec<Opcode>,
    /// What follows the last decoded opcode, if anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<Tail>,
}

impl CodeBlock {
    /// Total bit/ref footprint consumed by the decoded opcodes.
    ///
    /// Never exceeds the declared `bits`/`refs`; any shortfall is exactly
    /// the tail.
    pub fn consumed(&self) -> (usize, usize) {
        self.opcodes
            .iter()
            .fold((0, 0), |(bits, refs), op| (bits + op.bits, refs + op.refs))
    }
}

/// What follows a block's last decoded opcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Tail {
    /// Undecoded trailing bits/refs with no further structure.
    Incomplete,
    /// The block's logical continuation lives in a child cell and is
    /// appended transparently, not nested.
    Child {
        /// Item id of the continuation block.
        id: ItemId,
    },
}

/// One decoded instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opcode {
    /// Bits consumed by the instruction.
    pub bits: usize,
    /// Refs consumed by the instruction.
    #[serde(default)]
    pub refs: usize,
    /// Instruction name, e.g. `PUSHINT`.
    pub name: String,
    /// Ordered arguments.
    #[serde(default)]
    pub args: Vec<OpcodeArg>,
    /// Execution cost figure; carried through, unused by rendering.
    pub gas: u64,
}

/// One decoded instruction argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OpcodeArg {
    /// Integer literal, e.g. `PUSHINT 123`. Kept as its decimal text so
    /// arbitrary-width values survive.
    Int {
        /// Decimal literal.
        value: String,
    },
    /// Stack slot, e.g. `PUSH s1`.
    Stack {
        /// Slot index; may be negative.
        idx: i32,
    },
    /// Control register, e.g. `POP c4`.
    Reg {
        /// Register index.
        idx: u8,
    },
    /// Whole-cell reference, e.g. `PUSHREFCONT (…hash…)`.
    Cell {
        /// Referenced item.
        id: ItemId,
    },
    /// Bit-range reference, e.g. `PUSHSLICECONST x{6_}`.
    Slice {
        /// Referenced item.
        id: ItemId,
    },
}

/// Non-code payload region referenced only as an opcode argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBlock {
    /// Item id.
    pub id: ItemId,
    /// The payload's shape and location.
    pub data: Data,
}

/// Shape of a data payload, addressed into the shared cell tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Data {
    /// A bit/ref window of a cell.
    #[serde(rename_all = "camelCase")]
    Slice {
        /// Hash of the owning cell.
        cell_hash: CellHash,
        /// Window start, in bits.
        offset_bits: usize,
        /// Window start, in refs.
        offset_refs: usize,
        /// Window length, in bits.
        bits: usize,
        /// Window length, in refs.
        refs: usize,
    },
    /// A whole cell.
    #[serde(rename_all = "camelCase")]
    Cell {
        /// Hash of the cell.
        cell_hash: CellHash,
    },
}

/// Reference to a cell whose content lives outside the supplied tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    /// Item id.
    pub id: ItemId,
    /// Content hash of the external cell.
    pub hash: CellHash,
}

/// (De)serialize an `i64`-keyed map as a JSON object with string keys.
///
/// JSON object keys are always strings, and `serde_json` normally coerces
/// them back to integers — but that coercion is lost when the value is
/// buffered through an internally tagged enum (`Item`'s `#[serde(tag)]`).
/// Converting keys explicitly here keeps the wire format identical while
/// making the round-trip work inside the tagged wrapper.
mod int_key_map {
    use std::collections::HashMap;

    use serde::de::{Deserialize, Deserializer, Error as _};
    use serde::ser::{SerializeMap, Serializer};

    use super::ItemId;

    pub fn serialize<S: Serializer>(
        map: &HashMap<i64, ItemId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            out.serialize_entry(&key.to_string(), value)?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<i64, ItemId>, D::Error> {
        let string_keyed = HashMap::<String, ItemId>::deserialize(deserializer)?;
        string_keyed
            .into_iter()
            .map(|(key, value)| {
                key.parse::<i64>()
                    .map(|key| (key, value))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
