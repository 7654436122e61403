//! Block renderer: re-folds flat opcode sequences into nested structured
//! assembly.
//!
//! Continuation pushes are not printed where they appear. They are
//! buffered in the scope's pending state until a control opcode claims
//! them (`IF:<{…}>`, `WHILE:<{…}>DO<{…}>`, …) or until something forces a
//! flush, in which case they surface as generic `CONT:<{…}>` blocks —
//! buffered continuations are never silently dropped. Each nested body
//! renders through a fresh scope one indent deeper; pending state never
//! crosses scope boundaries.

use std::sync::Arc;

use tracing::trace;
use tvmdis_core::Cell;

use crate::context::Context;
use crate::item::{CodeBlock, ItemId, JumpTable, Opcode, OpcodeArg, Tail};
use crate::{DisasmError, DisasmResult};

/// Buffered continuation pushes of one scope.
///
/// `first` was pushed earlier and, by stack discipline, executes first;
/// rotation and flushing preserve that order. Keeping the two slots as one
/// enum makes the after-construct "slots are clear" condition structural.
enum Pending<'a> {
    Empty,
    One(&'a CodeBlock),
    Two { first: &'a CodeBlock, second: &'a CodeBlock },
}

impl Pending<'_> {
    fn is_empty(&self) -> bool {
        matches!(self, Pending::Empty)
    }

    fn is_full(&self) -> bool {
        matches!(self, Pending::Two { .. })
    }
}

/// One rendering scope: a depth, the pending continuations and a pending
/// jump table. Created fresh for every nested body and discarded on
/// return.
pub(crate) struct BlockRenderer<'c, 'a> {
    ctx: &'c mut Context<'a>,
    depth: usize,
    pending: Pending<'a>,
    dict: Option<&'a JumpTable>,
}

impl<'c, 'a> BlockRenderer<'c, 'a> {
    pub(crate) fn new(ctx: &'c mut Context<'a>, depth: usize) -> Self {
        Self { ctx, depth, pending: Pending::Empty, dict: None }
    }

    /// Renders a block, following `child` tails transparently (the logical
    /// continuation of a block that spills into a child cell is appended,
    /// not nested).
    pub(crate) fn render(&mut self, block: &'a CodeBlock) -> DisasmResult<()> {
        let mut block = block;
        loop {
            for opcode in &block.opcodes {
                self.show_op(opcode)?;
            }
            match &block.tail {
                None => break,
                Some(Tail::Child { id }) => block = self.ctx.code_block(*id)?,
                Some(Tail::Incomplete) => {
                    self.dict = None;
                    self.flush_cont()?;
                    return self.show_incomplete(block);
                }
            }
        }
        self.dict = None;
        self.flush_cont()
    }

    fn show_op(&mut self, opcode: &'a Opcode) -> DisasmResult<()> {
        // Track consecutive dict ops.
        match opcode.name.as_str() {
            "DICTPUSHCONST" => {
                let table = dict_args(opcode)?;
                self.flush_cont()?;
                self.dict = Some(self.ctx.jump_table(table)?);
                return self.show_simple_op(opcode);
            }
            "DICTIGETJMP" | "DICTIGETJMPZ" | "DICTUGETJMP" | "DICTUGETJMPZ" | "DICTIGETEXEC"
            | "DICTUGETEXEC" => {
                if let Some(table) = self.dict.take() {
                    self.flush_cont()?;
                    return self.show_const_dict_op(opcode, table);
                }
            }
            _ => {}
        }

        // Anything else invalidates a pushed table.
        self.dict = None;

        // Track consecutive continuation ops.
        match opcode.name.as_str() {
            "PUSHCONT" | "PUSHREFCONT" => {
                let id = cont_arg(opcode)?;
                let body = self.ctx.code_block(id)?;
                return self.save_cont(body);
            }
            "REPEAT" | "UNTIL" | "IF" | "IFNOT" | "IFJMP" | "IFNOTJMP"
                if !self.pending.is_empty() =>
            {
                let body = self.take_cont()?;
                return self.show_cont_op(opcode.name.as_str(), body);
            }
            "IFREF" | "IFNOTREF" | "IFJMPREF" | "IFNOTJMPREF" | "CALLREF" | "JMPREF" => {
                self.flush_cont()?;
                return self.show_ref_op(opcode);
            }
            "WHILE" if self.pending.is_full() => {
                return self.show_cont2_op("WHILE", "DO");
            }
            "IFELSE" if self.pending.is_full() => {
                return self.show_cont2_op("IF", "ELSE");
            }
            "IFREFELSE" if !self.pending.is_empty() => {
                return self.show_cont_ref_op(opcode, false);
            }
            "IFELSEREF" if !self.pending.is_empty() => {
                return self.show_cont_ref_op(opcode, true);
            }
            "IFREFELSEREF" => {
                self.flush_cont()?;
                return self.show_ref2_op(opcode, "IF", "ELSE");
            }
            _ => {}
        }

        // Fallback to a flat instruction.
        self.flush_cont()?;
        self.show_simple_op(opcode)
    }

    /* ─────────────── pending-continuation state machine ─────────────── */

    /// Buffers a pushed continuation. A third push evicts the
    /// earliest-pushed block as a `CONT:<{…}>` before rotating.
    fn save_cont(&mut self, body: &'a CodeBlock) -> DisasmResult<()> {
        match core::mem::replace(&mut self.pending, Pending::Empty) {
            Pending::Empty => self.pending = Pending::One(body),
            Pending::One(first) => self.pending = Pending::Two { first, second: body },
            Pending::Two { first, second } => {
                self.show_cont_flush(first)?;
                self.pending = Pending::Two { first: second, second: body };
            }
        }
        Ok(())
    }

    /// Consumes the most recent push, flushing the earlier one if present.
    fn take_cont(&mut self) -> DisasmResult<&'a CodeBlock> {
        match core::mem::replace(&mut self.pending, Pending::Empty) {
            Pending::Empty => Err(DisasmError::InvariantViolation("no pending continuation")),
            Pending::One(body) => Ok(body),
            Pending::Two { first, second } => {
                self.show_cont_flush(first)?;
                Ok(second)
            }
        }
    }

    /// Consumes both pushes, in push order.
    fn take_cont2(&mut self) -> DisasmResult<(&'a CodeBlock, &'a CodeBlock)> {
        match core::mem::replace(&mut self.pending, Pending::Empty) {
            Pending::Two { first, second } => Ok((first, second)),
            _ => Err(DisasmError::InvariantViolation("two pending continuations required")),
        }
    }

    /// Flushes everything pending, earlier-pushed first (printing order
    /// mirrors execution order).
    fn flush_cont(&mut self) -> DisasmResult<()> {
        match core::mem::replace(&mut self.pending, Pending::Empty) {
            Pending::Empty => Ok(()),
            Pending::One(body) => self.show_cont_flush(body),
            Pending::Two { first, second } => {
                self.show_cont_flush(first)?;
                self.show_cont_flush(second)
            }
        }
    }

    fn show_cont_flush(&mut self, body: &'a CodeBlock) -> DisasmResult<()> {
        self.show_cont_body("CONT", ":<{", body)?;
        self.writeln("}>");
        Ok(())
    }

    /* ─────────────────────── construct printers ─────────────────────── */

    fn show_cont_op(&mut self, name: &str, body: &'a CodeBlock) -> DisasmResult<()> {
        self.show_cont_body(name, ":<{", body)?;
        self.writeln("}>");
        Ok(())
    }

    fn show_cont2_op(&mut self, prefix: &str, infix: &str) -> DisasmResult<()> {
        let (first, second) = self.take_cont2()?;
        self.show_cont_body(prefix, ":<{", first)?;
        self.show_cont_body(&format!("}}>{infix}"), "<{", second)?;
        self.writeln("}>");
        Ok(())
    }

    fn show_cont_body(&mut self, prefix: &str, paren: &str, body: &'a CodeBlock) -> DisasmResult<()> {
        self.writeln(&format!("{prefix}{paren}"));
        BlockRenderer::new(self.ctx, self.depth + 1).render(body)
    }

    /// `IFJMPREF` and friends: the branch body is a referenced child cell;
    /// the printed keyword drops the trailing ref marker.
    fn show_ref_op(&mut self, opcode: &'a Opcode) -> DisasmResult<()> {
        let body = self.ctx.code_block(cell_arg(opcode, 0)?)?;
        let prefix = opcode.name.strip_suffix("REF").unwrap_or(&opcode.name);
        self.show_cont_body(prefix, ":<{", body)?;
        self.writeln("}>");
        Ok(())
    }

    /// `IFREFELSE` / `IFELSEREF`: one branch is a referenced cell, the
    /// other is the pending continuation; `cont_first` picks the order.
    fn show_cont_ref_op(&mut self, opcode: &'a Opcode, cont_first: bool) -> DisasmResult<()> {
        let referenced = self.ctx.code_block(cell_arg(opcode, 0)?)?;
        let pending = self.take_cont()?;
        let (first, second) =
            if cont_first { (pending, referenced) } else { (referenced, pending) };
        self.show_cont_body("IF", ":<{", first)?;
        self.show_cont_body("}>ELSE", "<{", second)?;
        self.writeln("}>");
        Ok(())
    }

    fn show_ref2_op(&mut self, opcode: &'a Opcode, prefix: &str, infix: &str) -> DisasmResult<()> {
        let first = self.ctx.code_block(cell_arg(opcode, 0)?)?;
        let second = self.ctx.code_block(cell_arg(opcode, 1)?)?;
        self.show_cont_body(prefix, ":<{", first)?;
        self.show_cont_body(&format!("}}>{infix}"), "<{", second)?;
        self.writeln("}>");
        Ok(())
    }

    /// Renders a pushed jump table at its dispatch site, entries in
    /// ascending key order whatever the map's iteration order.
    fn show_const_dict_op(&mut self, opcode: &'a Opcode, table: &'a JumpTable) -> DisasmResult<()> {
        let mut entries: Vec<(i64, ItemId)> = table.items.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_unstable_by_key(|(key, _)| *key);
        trace!(name = %opcode.name, entries = entries.len(), "rendering dispatch table");

        if entries.is_empty() {
            self.writeln(&format!("{} {{}}", opcode.name));
            return Ok(());
        }

        self.writeln(&format!("{} {{", opcode.name));
        for (key, target) in entries {
            let body = self.ctx.code_block(target)?;
            self.ctx.write_line(self.depth + 1, &format!("{key} => <{{"));
            BlockRenderer::new(self.ctx, self.depth + 2).render(body)?;
            self.ctx.write_line(self.depth + 1, "}>");
        }
        self.writeln("}");
        Ok(())
    }

    fn show_simple_op(&mut self, opcode: &Opcode) -> DisasmResult<()> {
        let (name, args) = adjust_opcode(opcode);
        let mut line = String::new();
        for arg in args.iter() {
            line.push_str(&self.ctx.format_arg(arg)?);
            line.push(' ');
        }
        line.push_str(&name);
        self.writeln(&line);
        Ok(())
    }

    /* ─────────────────────── degraded rendering ─────────────────────── */

    /// A block whose decoding stopped early: print the undecoded window,
    /// then every unconsumed child cell as raw bits, one indent deeper
    /// than its parent. Explicit work stack; never opcode-aware.
    fn show_incomplete(&mut self, block: &'a CodeBlock) -> DisasmResult<()> {
        let (used_bits, used_refs) = block.consumed();
        let registry = self.ctx.registry();
        let window = registry.subslice(
            &block.cell_hash,
            block.offset_bits + used_bits,
            block.offset_refs + used_refs,
            block.bits.saturating_sub(used_bits),
            block.refs.saturating_sub(used_refs),
        )?;
        self.writeln(&format!("Cannot disassemble: {}", window.bits));

        let cell = registry.cell(&block.cell_hash)?;
        let first = block.offset_refs + used_refs;
        let last = block.offset_refs + block.refs;
        let mut stack: Vec<(Arc<Cell>, usize)> = cell
            .refs()
            .get(first..last)
            .unwrap_or(&[])
            .iter()
            .rev()
            .map(|child| (child.clone(), self.depth + 1))
            .collect();
        while let Some((cell, depth)) = stack.pop() {
            self.ctx.write_line(depth, &cell.bits().to_string());
            for child in cell.refs().iter().rev() {
                stack.push((child.clone(), depth + 1));
            }
        }
        Ok(())
    }

    fn writeln(&mut self, text: &str) {
        self.ctx.write_line(self.depth, text);
    }
}

/* ─────────────────────── argument extraction ─────────────────────── */

fn cont_arg(opcode: &Opcode) -> DisasmResult<ItemId> {
    match opcode.args.first() {
        Some(OpcodeArg::Cell { id } | OpcodeArg::Slice { id }) => Ok(*id),
        _ => Err(unexpected_arg(opcode, "continuation")),
    }
}

fn cell_arg(opcode: &Opcode, index: usize) -> DisasmResult<ItemId> {
    match opcode.args.get(index) {
        Some(OpcodeArg::Cell { id }) => Ok(*id),
        _ => Err(unexpected_arg(opcode, "cell")),
    }
}

/// `DICTPUSHCONST` carries the key width and the serialized table.
fn dict_args(opcode: &Opcode) -> DisasmResult<ItemId> {
    match (opcode.args.first(), opcode.args.get(1)) {
        (Some(OpcodeArg::Int { .. }), Some(OpcodeArg::Slice { id })) => Ok(*id),
        _ => Err(unexpected_arg(opcode, "int + slice")),
    }
}

fn unexpected_arg(opcode: &Opcode, expected: &'static str) -> DisasmError {
    DisasmError::UnexpectedArg { opcode: opcode.name.clone(), expected }
}

/// Cosmetic rewrites applied to flat instructions only.
fn adjust_opcode(opcode: &Opcode) -> (std::borrow::Cow<'_, str>, std::borrow::Cow<'_, [OpcodeArg]>) {
    use std::borrow::Cow;
    match opcode.name.as_str() {
        // implicit code page zero gets its argument back
        "SETCP0" if opcode.args.is_empty() => (
            Cow::Borrowed("SETCP"),
            Cow::Owned(vec![OpcodeArg::Int { value: "0".into() }]),
        ),
        // one-operand exchange always shows the implied top of stack
        "XCHG" if opcode.args.len() == 1 => {
            let mut args = Vec::with_capacity(2);
            args.push(OpcodeArg::Stack { idx: 0 });
            args.extend(opcode.args.iter().cloned());
            (Cow::Borrowed("XCHG"), Cow::Owned(args))
        }
        // immediate shift counts get the distinguishing suffix
        "LSHIFT" if !opcode.args.is_empty() => {
            (Cow::Borrowed("LSHIFT#"), Cow::Borrowed(opcode.args.as_slice()))
        }
        "RSHIFT" if !opcode.args.is_empty() => {
            (Cow::Borrowed("RSHIFT#"), Cow::Borrowed(opcode.args.as_slice()))
        }
        _ => (Cow::Borrowed(opcode.name.as_str()), Cow::Borrowed(opcode.args.as_slice())),
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Code, Item};
    use crate::{disassemble, DisasmParams};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tvmdis_core::{BitString, CellHash};

    fn flat(name: &str) -> Opcode {
        with_args(name, vec![])
    }

    fn with_args(name: &str, args: Vec<OpcodeArg>) -> Opcode {
        Opcode { bits: 8, refs: 0, name: name.into(), args, gas: 18 }
    }

    fn push_cont(id: ItemId) -> Opcode {
        with_args("PUSHCONT", vec![OpcodeArg::Slice { id }])
    }

    fn code_item(id: ItemId, opcodes: Vec<Opcode>) -> Item {
        code_item_tailed(id, opcodes, None)
    }

    fn code_item_tailed(id: ItemId, opcodes: Vec<Opcode>, tail: Option<Tail>) -> Item {
        Item::Code(CodeBlock {
            id,
            cell_hash: CellHash::new([0; 32]),
            is_inline: true,
            offset_bits: 0,
            offset_refs: 0,
            bits: 0,
            refs: 0,
            opcodes,
            tail,
        })
    }

    fn render(items: Vec<Item>) -> String {
        render_params(items, &DisasmParams::default())
    }

    fn render_params(items: Vec<Item>, params: &DisasmParams) -> String {
        let root_cell = Cell::new(BitString::new(), &[]).unwrap();
        disassemble(&root_cell, &Code { root: 0, items }, params).unwrap()
    }

    #[test]
    fn empty_block_renders_nothing() {
        assert_eq!(render(vec![code_item(0, vec![])]), "");
    }

    #[test]
    fn flat_instructions_keep_their_order() {
        let out = render(vec![code_item(0, vec![flat("ADD"), flat("MUL")])]);
        assert_eq!(out, "ADD\nMUL\n");
    }

    #[test]
    fn two_pushes_and_ifelse_fold_into_branches() {
        let out = render(vec![
            code_item(0, vec![push_cont(1), push_cont(2), flat("IFELSE")]),
            code_item(1, vec![flat("ADD")]),
            code_item(2, vec![flat("MUL")]),
        ]);
        // first-pushed executes first, so it is the IF branch
        assert_eq!(out, "IF:<{\n  ADD\n}>ELSE<{\n  MUL\n}>\n");
    }

    #[test]
    fn unconsumed_push_surfaces_as_cont() {
        let out = render(vec![
            code_item(0, vec![push_cont(1), flat("ADD")]),
            code_item(1, vec![flat("SUB")]),
        ]);
        assert_eq!(out, "CONT:<{\n  SUB\n}>\nADD\n");
    }

    #[test]
    fn push_pending_at_block_end_is_flushed() {
        let out = render(vec![
            code_item(0, vec![push_cont(1)]),
            code_item(1, vec![flat("ADD")]),
        ]);
        assert_eq!(out, "CONT:<{\n  ADD\n}>\n");
    }

    #[test]
    fn third_push_evicts_the_earliest() {
        let out = render(vec![
            code_item(0, vec![push_cont(1), push_cont(2), push_cont(3), flat("IFELSE")]),
            code_item(1, vec![flat("ADD")]),
            code_item(2, vec![flat("SUB")]),
            code_item(3, vec![flat("MUL")]),
        ]);
        assert_eq!(
            out,
            "CONT:<{\n  ADD\n}>\nIF:<{\n  SUB\n}>ELSE<{\n  MUL\n}>\n"
        );
    }

    #[test]
    fn single_branch_ops_take_the_latest_push() {
        for name in ["REPEAT", "UNTIL", "IF", "IFNOT", "IFJMP", "IFNOTJMP"] {
            let out = render(vec![
                code_item(0, vec![push_cont(1), flat(name)]),
                code_item(1, vec![flat("ADD")]),
            ]);
            assert_eq!(out, format!("{name}:<{{\n  ADD\n}}>\n"));
        }

        // with two pushes pending, the earlier one is flushed first
        let out = render(vec![
            code_item(0, vec![push_cont(1), push_cont(2), flat("IF")]),
            code_item(1, vec![flat("ADD")]),
            code_item(2, vec![flat("SUB")]),
        ]);
        assert_eq!(out, "CONT:<{\n  ADD\n}>\nIF:<{\n  SUB\n}>\n");
    }

    #[test]
    fn single_branch_ops_without_a_push_stay_flat() {
        assert_eq!(render(vec![code_item(0, vec![flat("IFJMP")])]), "IFJMP\n");
    }

    #[test]
    fn while_takes_both_pushes_in_order() {
        let out = render(vec![
            code_item(0, vec![push_cont(1), push_cont(2), flat("WHILE")]),
            code_item(1, vec![flat("ADD")]),
            code_item(2, vec![flat("SUB")]),
        ]);
        assert_eq!(out, "WHILE:<{\n  ADD\n}>DO<{\n  SUB\n}>\n");

        // a lone push cannot satisfy WHILE; it flushes and WHILE prints flat
        let out = render(vec![
            code_item(0, vec![push_cont(1), flat("WHILE")]),
            code_item(1, vec![flat("ADD")]),
        ]);
        assert_eq!(out, "CONT:<{\n  ADD\n}>\nWHILE\n");
    }

    #[test]
    fn ref_ops_nest_the_referenced_cell_and_drop_the_suffix() {
        for (name, prefix) in [
            ("IFREF", "IF"),
            ("IFNOTREF", "IFNOT"),
            ("IFJMPREF", "IFJMP"),
            ("IFNOTJMPREF", "IFNOTJMP"),
            ("CALLREF", "CALL"),
            ("JMPREF", "JMP"),
        ] {
            let out = render(vec![
                code_item(0, vec![with_args(name, vec![OpcodeArg::Cell { id: 1 }])]),
                code_item(1, vec![flat("ADD")]),
            ]);
            assert_eq!(out, format!("{prefix}:<{{\n  ADD\n}}>\n"));
        }
    }

    #[test]
    fn ref_ops_flush_instead_of_combining() {
        let out = render(vec![
            code_item(0, vec![push_cont(1), with_args("CALLREF", vec![OpcodeArg::Cell { id: 2 }])]),
            code_item(1, vec![flat("ADD")]),
            code_item(2, vec![flat("SUB")]),
        ]);
        assert_eq!(out, "CONT:<{\n  ADD\n}>\nCALL:<{\n  SUB\n}>\n");
    }

    #[test]
    fn mixed_ref_cont_branch_order_is_variant_specific() {
        let ifrefelse = render(vec![
            code_item(0, vec![push_cont(2), with_args("IFREFELSE", vec![OpcodeArg::Cell { id: 1 }])]),
            code_item(1, vec![flat("ADD")]),
            code_item(2, vec![flat("SUB")]),
        ]);
        assert_eq!(ifrefelse, "IF:<{\n  ADD\n}>ELSE<{\n  SUB\n}>\n");

        let ifelseref = render(vec![
            code_item(0, vec![push_cont(2), with_args("IFELSEREF", vec![OpcodeArg::Cell { id: 1 }])]),
            code_item(1, vec![flat("ADD")]),
            code_item(2, vec![flat("SUB")]),
        ]);
        assert_eq!(ifelseref, "IF:<{\n  SUB\n}>ELSE<{\n  ADD\n}>\n");
    }

    #[test]
    fn two_ref_branches_ignore_pending_state() {
        let out = render(vec![
            code_item(
                0,
                vec![with_args(
                    "IFREFELSEREF",
                    vec![OpcodeArg::Cell { id: 1 }, OpcodeArg::Cell { id: 2 }],
                )],
            ),
            code_item(1, vec![flat("ADD")]),
            code_item(2, vec![flat("SUB")]),
        ]);
        assert_eq!(out, "IF:<{\n  ADD\n}>ELSE<{\n  SUB\n}>\n");
    }

    fn dict_graph(keys: &[(i64, ItemId)]) -> Vec<Item> {
        let mut items = vec![
            code_item(
                0,
                vec![
                    with_args(
                        "DICTPUSHCONST",
                        vec![OpcodeArg::Int { value: "19".into() }, OpcodeArg::Slice { id: 1 }],
                    ),
                    flat("DICTIGETJMPZ"),
                ],
            ),
            Item::JumpTable(JumpTable {
                id: 1,
                cell_hash: CellHash::new([0; 32]),
                key_bits: 19,
                items: keys.iter().copied().collect::<HashMap<_, _>>(),
                is_full_code: true,
            }),
        ];
        items.push(code_item(2, vec![flat("ADD")]));
        items.push(code_item(3, vec![flat("SUB")]));
        items.push(code_item(4, vec![flat("MUL")]));
        items
    }

    #[test]
    fn dispatch_tables_print_sorted_by_key() {
        let out = render(dict_graph(&[(7, 2), (-3, 3), (0, 4)]));
        assert_eq!(
            out,
            "19 (xC_) DICTPUSHCONST\nDICTIGETJMPZ {\n  -3 => <{\n    SUB\n  }>\n  0 => <{\n    MUL\n  }>\n  7 => <{\n    ADD\n  }>\n}\n"
        );
    }

    #[test]
    fn empty_dispatch_table_prints_braces() {
        let out = render(dict_graph(&[]));
        assert_eq!(out, "19 (xC_) DICTPUSHCONST\nDICTIGETJMPZ {}\n");
    }

    #[test]
    fn dispatch_without_a_pushed_table_stays_flat() {
        assert_eq!(render(vec![code_item(0, vec![flat("DICTIGETJMP")])]), "DICTIGETJMP\n");
    }

    #[test]
    fn an_intervening_op_invalidates_the_pushed_table() {
        let mut items = dict_graph(&[(0, 2)]);
        let Item::Code(root) = &mut items[0] else { unreachable!() };
        root.opcodes.insert(1, flat("NOP"));
        let out = render(items);
        // the dispatch op prints flat because the table is gone
        assert_eq!(out, "19 (xC_) DICTPUSHCONST\nNOP\nDICTIGETJMPZ\n");
    }

    #[test]
    fn cosmetic_rewrites() {
        assert_eq!(render(vec![code_item(0, vec![flat("SETCP0")])]), "0 SETCP\n");
        assert_eq!(
            render(vec![code_item(
                0,
                vec![with_args("XCHG", vec![OpcodeArg::Stack { idx: 5 }])]
            )]),
            "s0 s5 XCHG\n"
        );
        assert_eq!(
            render(vec![code_item(
                0,
                vec![with_args("LSHIFT", vec![OpcodeArg::Int { value: "5".into() }])]
            )]),
            "5 LSHIFT#\n"
        );
        assert_eq!(
            render(vec![code_item(
                0,
                vec![with_args("RSHIFT", vec![OpcodeArg::Int { value: "8".into() }])]
            )]),
            "8 RSHIFT#\n"
        );
        // the implicit-count forms keep their names
        assert_eq!(render(vec![code_item(0, vec![flat("RSHIFT")])]), "RSHIFT\n");
    }

    #[test]
    fn child_tails_continue_in_the_same_scope() {
        let out = render(vec![
            code_item_tailed(0, vec![flat("ADD")], Some(Tail::Child { id: 1 })),
            code_item(1, vec![flat("MUL")]),
        ]);
        assert_eq!(out, "ADD\nMUL\n");

        // pending state crosses the cell boundary: the push in the parent
        // cell pairs with the branch op in the child cell
        let out = render(vec![
            code_item_tailed(0, vec![push_cont(2)], Some(Tail::Child { id: 1 })),
            code_item(1, vec![flat("IFJMP")]),
            code_item(2, vec![flat("ADD")]),
        ]);
        assert_eq!(out, "IFJMP:<{\n  ADD\n}>\n");
    }

    #[test]
    fn incomplete_tail_dumps_raw_bits_and_children() {
        let grandchild = Cell::new(BitString::from_binary("0011").unwrap(), &[]).unwrap();
        let child = Cell::new(BitString::from_binary("1100").unwrap(), &[grandchild]).unwrap();
        let root_cell = Cell::new(BitString::from_binary("10101010").unwrap(), &[child]).unwrap();

        let block = CodeBlock {
            id: 0,
            cell_hash: root_cell.hash(),
            is_inline: false,
            offset_bits: 0,
            offset_refs: 0,
            bits: 8,
            refs: 1,
            opcodes: vec![Opcode { bits: 4, refs: 0, name: "NOP".into(), args: vec![], gas: 18 }],
            tail: Some(Tail::Incomplete),
        };
        let code = Code { root: 0, items: vec![Item::Code(block)] };
        let out = disassemble(&root_cell, &code, &DisasmParams::default()).unwrap();
        assert_eq!(out, "NOP\nCannot disassemble: x{A}\n  x{C}\n    x{3}\n");
    }

    #[test]
    fn incomplete_tail_flushes_pending_first() {
        let root_cell = Cell::new(BitString::from_binary("101010101111").unwrap(), &[]).unwrap();
        // the push consumes 8 of the 12 declared bits; `1111` is left over
        let block = CodeBlock {
            id: 0,
            cell_hash: root_cell.hash(),
            is_inline: false,
            offset_bits: 0,
            offset_refs: 0,
            bits: 12,
            refs: 0,
            opcodes: vec![push_cont(1)],
            tail: Some(Tail::Incomplete),
        };
        let code = Code {
            root: 0,
            items: vec![Item::Code(block), code_item(1, vec![flat("ADD")])],
        };
        let out = disassemble(&root_cell, &code, &DisasmParams::default()).unwrap();
        assert_eq!(out, "CONT:<{\n  ADD\n}>\nCannot disassemble: x{F}\n");
    }

    #[test]
    fn rendering_is_deterministic() {
        let items = dict_graph(&[(7, 2), (-3, 3), (0, 4)]);
        let a = render(items.clone());
        let b = render(items);
        assert_eq!(a, b);
    }

    #[test]
    fn indent_width_is_respected() {
        let items = vec![
            code_item(0, vec![with_args("IFJMPREF", vec![OpcodeArg::Cell { id: 1 }])]),
            code_item(1, vec![flat("ADD")]),
        ];
        let out = render_params(items, &DisasmParams { tab_width: 4 });
        assert_eq!(out, "IFJMP:<{\n    ADD\n}>\n");
    }

    #[test]
    fn referential_faults_are_reported() {
        let err = disassemble(
            &Cell::new(BitString::new(), &[]).unwrap(),
            &Code { root: 0, items: vec![code_item(0, vec![push_cont(9)])] },
            &DisasmParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DisasmError::UnknownItem { id: 9 }));

        let err = disassemble(
            &Cell::new(BitString::new(), &[]).unwrap(),
            &Code {
                root: 0,
                items: vec![
                    code_item(0, vec![with_args("PUSHREF", vec![OpcodeArg::Cell { id: 1 }])]),
                    Item::JumpTable(JumpTable {
                        id: 1,
                        cell_hash: CellHash::new([0; 32]),
                        key_bits: 19,
                        items: HashMap::new(),
                        is_full_code: false,
                    }),
                ],
            },
            &DisasmParams::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DisasmError::UnexpectedItemKind { expected: "cell", found: "jumpTable" }
        ));
    }
}
