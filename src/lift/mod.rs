//! # Symbolic Stack Lifter
//!
//! The last pipeline stage: walks a function body's instructions once,
//! consulting the [`RegionMap`] at every index for a structured shape to
//! emit (loop, if/else, ternary, short-circuit logical, try/catch) before
//! falling through to plain per-opcode stack transformations in priority
//! order. [`expr`] and [`stmt`] hold the per-opcode rendering rules; this
//! module is purely the walk and the region dispatch.

mod emit;
mod expr;
mod function;
mod naming;
mod stack;
mod stmt;

pub use emit::Line;
pub use naming::VarNaming;

use crate::cfg::{self, BlockId, Cfg};
use crate::config::DecompilerConfig;
use crate::dominators;
use crate::error::Diagnostic;
use crate::model::{Instruction, Opcode, OpcodeMap, OperandKind, StringTable, SwappedOpcodes, Version};
use crate::region::{self, LogicalOperator, LoopPattern, RegionMap, RegionRef};

use emit::Emitter;
use stack::{default_for, SymbolicStack};

/// Disassemble, build the control-flow graph and dominators, recognize
/// regions, and lift one function body's instructions into source text.
/// `instrs` is already the product of the disassembler — this is the
/// entry point used both for the outermost program body and, via
/// [`function::lift_nested`], for every nested `BUILD_FUNCTION`.
#[allow(clippy::too_many_arguments)]
pub fn lift(
    instrs: &[Instruction],
    opcode_map: &OpcodeMap,
    string_table: &StringTable,
    swapped: &SwappedOpcodes,
    return_opcode: Option<Opcode>,
    version: Version,
    config: &DecompilerConfig,
) -> (String, Vec<Diagnostic>) {
    let cfg = cfg::build(instrs);
    let dom = dominators::compute(&cfg);
    let regions = region::recognize(&cfg, &dom, instrs);
    let mut naming = VarNaming::new();

    let mut lifter = Lifter {
        instrs,
        cfg: &cfg,
        regions: &regions,
        opcode_map,
        string_table,
        swapped,
        return_opcode,
        version,
        naming: &mut naming,
        config,
        diagnostics: Vec::new(),
    };

    let mut emitter = Emitter::new();
    let mut stack = SymbolicStack::new();
    lifter.lift_range(&mut emitter, &mut stack, 0, instrs.len());

    (emitter.render(), lifter.diagnostics)
}

/// Bridge used by [`function::lift_nested`]: lift a nested function body's
/// already-disassembled instructions, sharing the parent's [`VarNaming`]
/// instead of starting a fresh one — `(scope, slot)` pairs are unique
/// across the whole payload, not just within one function body.
#[allow(clippy::too_many_arguments)]
pub(super) fn lift_range_as_function(
    instrs: &[Instruction],
    cfg: &Cfg,
    regions: &RegionMap,
    opcode_map: &OpcodeMap,
    string_table: &StringTable,
    swapped: &SwappedOpcodes,
    return_opcode: Option<Opcode>,
    version: Version,
    config: &DecompilerConfig,
    naming: &mut VarNaming,
) -> (Vec<Line>, Vec<Diagnostic>) {
    let mut lifter = Lifter {
        instrs,
        cfg,
        regions,
        opcode_map,
        string_table,
        swapped,
        return_opcode,
        version,
        naming,
        config,
        diagnostics: Vec::new(),
    };
    let mut emitter = Emitter::new();
    let mut stack = SymbolicStack::new();
    lifter.lift_range(&mut emitter, &mut stack, 0, instrs.len());
    (emitter.into_lines(), lifter.diagnostics)
}

struct Lifter<'a> {
    instrs: &'a [Instruction],
    cfg: &'a Cfg,
    regions: &'a RegionMap,
    opcode_map: &'a OpcodeMap,
    string_table: &'a StringTable,
    swapped: &'a SwappedOpcodes,
    return_opcode: Option<Opcode>,
    #[allow(dead_code)]
    version: Version,
    naming: &'a mut VarNaming,
    config: &'a DecompilerConfig,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lifter<'a> {
    /// Walk `[start, end)`, dispatching to a region whenever one starts at
    /// the current index, otherwise lifting the single instruction there.
    fn lift_range(&mut self, emitter: &mut Emitter, stack: &mut SymbolicStack, start: usize, end: usize) {
        let mut idx = start;
        while idx < end {
            if let Some(region_ref) = self.regions.starts_at.get(&idx).copied() {
                idx = self.lift_region(region_ref, emitter, stack);
                continue;
            }
            if self.regions.consumed.contains(&idx) {
                idx += 1;
                continue;
            }
            self.lift_instruction(idx, emitter, stack);
            idx += 1;
        }
    }

    fn lift_region(&mut self, region_ref: RegionRef, emitter: &mut Emitter, stack: &mut SymbolicStack) -> usize {
        match region_ref {
            RegionRef::Loop(i) => self.lift_loop(i, emitter, stack),
            RegionRef::IfElse(i) => self.lift_if_else(i, emitter, stack),
            RegionRef::Ternary(i) => self.lift_ternary(i, stack),
            RegionRef::Logical(i) => self.lift_logical(i, stack),
            RegionRef::TryCatch(i) => self.lift_try_catch(i, emitter),
        }
    }

    fn lift_loop(&mut self, i: usize, emitter: &mut Emitter, stack: &mut SymbolicStack) -> usize {
        let region = self.regions.loops[i].clone();

        let cond_text = match region.pattern {
            // The condition value was already computed by ordinary
            // instructions just before the jump and sits on the ambient
            // stack; the region itself spans only the jump.
            LoopPattern::V2PreTest => stack.pop_or(default_for::GENERIC).0,
            // The condition lives physically after the body in the byte
            // stream; it has its own fresh stack.
            LoopPattern::V1PostTest => {
                let mut cond_stack = SymbolicStack::new();
                self.lift_range(emitter, &mut cond_stack, region.cond_start, region.cond_jump_idx);
                cond_stack.pop_or(default_for::GENERIC).0
            }
        };

        let negate = match region.pattern {
            LoopPattern::V2PreTest => region.is_true,
            LoopPattern::V1PostTest => !region.is_true,
        };
        let header = if negate {
            format!("while (!({}))", cond_text)
        } else {
            format!("while ({})", cond_text)
        };

        emitter.open_block(header);
        let mut body_stack = SymbolicStack::new();
        self.lift_range(emitter, &mut body_stack, region.body_start, region.body_end + 1);
        emitter.close_block();

        region.exit_idx
    }

    fn lift_if_else(&mut self, i: usize, emitter: &mut Emitter, stack: &mut SymbolicStack) -> usize {
        let region = self.regions.if_elses[i].clone();
        let (cond_text, _) = stack.pop_or(default_for::GENERIC);

        emitter.open_block(format!("if ({})", cond_text));
        if let Some((s, e)) = self.block_range(&region.true_blocks) {
            let mut branch_stack = SymbolicStack::new();
            self.lift_range(emitter, &mut branch_stack, s, self.trim_trailing_jump(e));
        }
        if let Some((s, e)) = self.block_range(&region.false_blocks) {
            emitter.close_and_open("else");
            let mut branch_stack = SymbolicStack::new();
            self.lift_range(emitter, &mut branch_stack, s, self.trim_trailing_jump(e));
        }
        emitter.close_block();

        match region.merge_block {
            Some(b) => self.cfg.block(b).start_idx,
            None => region.cond_jump_idx + 1,
        }
    }

    fn lift_ternary(&mut self, i: usize, stack: &mut SymbolicStack) -> usize {
        let region = self.regions.ternaries[i].clone();
        let (cond_text, _) = stack.pop_or(default_for::GENERIC);

        let true_block = region.true_blocks[0];
        let false_block = region.false_blocks[0];

        let (ts, te) = self.branch_value_range(true_block);
        let mut true_stack = stack.clone();
        let mut scratch = Emitter::new();
        self.lift_range(&mut scratch, &mut true_stack, ts, te);
        let (left, _) = true_stack.pop_or(default_for::GENERIC);

        let (fs, fe) = self.branch_value_range(false_block);
        let mut false_stack = stack.clone();
        let mut scratch2 = Emitter::new();
        self.lift_range(&mut scratch2, &mut false_stack, fs, fe);
        let (right, _) = false_stack.pop_or(default_for::GENERIC);

        stack.push(format!("({} ? {} : {})", cond_text, left, right));

        match region.merge_block {
            Some(b) => self.cfg.block(b).start_idx,
            None => te.max(fe),
        }
    }

    fn lift_logical(&mut self, i: usize, stack: &mut SymbolicStack) -> usize {
        let region = self.regions.logicals[i].clone();
        let (left, _) = stack.pop_or(default_for::GENERIC);

        let mut right_stack = stack.clone();
        let mut scratch = Emitter::new();
        self.lift_range(&mut scratch, &mut right_stack, region.right_start, region.right_end);
        let (right, _) = right_stack.pop_or(default_for::GENERIC);

        let op = match region.operator {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        };
        stack.push(format!("({} {} {})", left, op, right));

        region.target_idx
    }

    fn lift_try_catch(&mut self, i: usize, emitter: &mut Emitter) -> usize {
        let region = self.regions.try_catches[i].clone();

        emitter.open_block("try");
        let mut try_stack = SymbolicStack::new();
        self.lift_range(emitter, &mut try_stack, region.try_start, region.try_end);

        emitter.close_and_open("catch (err)");
        let mut catch_stack = SymbolicStack::new();
        catch_stack.push("err");
        self.lift_range(emitter, &mut catch_stack, region.catch_start, self.trim_trailing_jump(region.catch_end));

        let mut next_idx = region.catch_end + 1;
        if let Some(finally_addr) = region.finally_addr {
            if let Some(&fstart) = self.cfg.addr_to_index.get(&finally_addr) {
                let fend = region
                    .after_addr
                    .and_then(|a| self.cfg.addr_to_index.get(&a).copied())
                    .unwrap_or(self.instrs.len());
                emitter.close_and_open("finally");
                let mut finally_stack = SymbolicStack::new();
                self.lift_range(emitter, &mut finally_stack, fstart, fend);
                next_idx = fend;
            }
        }
        emitter.close_block();

        if let Some(after_addr) = region.after_addr {
            if let Some(&after_idx) = self.cfg.addr_to_index.get(&after_addr) {
                next_idx = next_idx.max(after_idx);
            }
        }
        next_idx
    }

    /// The `[start, end)` instruction-index span covering every block in
    /// `blocks`, assuming (as the obfuscator's single-compiler output
    /// always does) that a branch's blocks are physically contiguous.
    fn block_range(&self, blocks: &[BlockId]) -> Option<(usize, usize)> {
        blocks.iter().map(|&b| self.cfg.block(b)).fold(None, |acc, block| {
            match acc {
                None => Some((block.start_idx, block.end_idx)),
                Some((s, e)) => Some((s.min(block.start_idx), e.max(block.end_idx))),
            }
        })
    }

    /// A ternary branch's value-producing range: its block's instructions,
    /// excluding a trailing unconditional jump to the merge block.
    fn branch_value_range(&self, block: BlockId) -> (usize, usize) {
        let b = self.cfg.block(block);
        (b.start_idx, self.trim_trailing_jump(b.end_idx))
    }

    /// The compiler emits an unconditional `JUMP` to the merge block at the
    /// end of whichever branch doesn't fall through to it naturally — that
    /// jump is purely structural and must never be lifted as an
    /// instruction in its own right (it would otherwise render as an
    /// unstructured-jump comment). Given the inclusive end index of a
    /// branch's instructions, return the exclusive end to pass to
    /// `lift_range`, dropping that trailing jump if present.
    fn trim_trailing_jump(&self, inclusive_end: usize) -> usize {
        if self.instrs[inclusive_end].opcode == Some(Opcode::Jump) {
            inclusive_end
        } else {
            inclusive_end + 1
        }
    }

    fn lift_instruction(&mut self, idx: usize, emitter: &mut Emitter, stack: &mut SymbolicStack) {
        let instr = &self.instrs[idx];
        let Some(op) = instr.opcode else {
            self.diagnostics.push(Diagnostic::UnknownOpcode { raw: instr.raw_opcode });
            if self.config.keep_unknown_opcode_comments {
                emitter.raw(stmt::unknown_opcode_comment(&instr.op_name));
            }
            return;
        };

        match op {
            Opcode::PushString
            | Opcode::PushInt
            | Opcode::PushDouble
            | Opcode::PushBool
            | Opcode::PushNull
            | Opcode::PushUndefined => {
                stack.push(expr::push_literal(instr, self.string_table));
            }
            Opcode::Duplicate => {
                let top = stack.peek().unwrap_or(default_for::GENERIC).to_string();
                stack.push(top);
            }
            Opcode::Pop | Opcode::SequencePop => {
                stack.pop_or(default_for::GENERIC);
            }
            _ if op.is_binary_operator() => {
                let (left, right, underflowed) = expr::pop_binary_operands(op, stack);
                if underflowed {
                    self.diagnostics.push(Diagnostic::LifterUnderflow {
                        addr: instr.addr,
                        message: format!("{} operand underflow", instr.op_name),
                    });
                }
                stack.push(expr::binary_expr(op, instr.swapped, left, right));
            }
            Opcode::UnaryPlus
            | Opcode::UnaryMinus
            | Opcode::UnaryNot
            | Opcode::UnaryBitNot
            | Opcode::Typeof
            | Opcode::Void => {
                let (operand, _) = stack.pop_or(default_for::GENERIC);
                stack.push(expr::unary_expr(op, operand));
            }
            Opcode::Throw => {
                let (value, _) = stack.pop_or(default_for::GENERIC);
                emitter.stmt(format!("throw {}", value));
            }
            Opcode::IncVar | Opcode::DecVar => {
                let scope = operand_u32(instr, OperandKind::Scope).unwrap_or(0);
                let slot = operand_u32(instr, OperandKind::VarSlot).unwrap_or(0);
                let prefix = operand_bool(instr, OperandKind::Prefix).unwrap_or(false);
                let name = self.naming.name_for(scope, slot);
                let op_text = if op == Opcode::IncVar { "++" } else { "--" };
                let text = if prefix {
                    format!("{}{}", op_text, name)
                } else {
                    format!("{}{}", name, op_text)
                };
                emitter.stmt(text);
            }
            Opcode::IncProp | Opcode::DecProp => {
                let prefix = operand_bool(instr, OperandKind::Prefix).unwrap_or(false);
                let (key, _) = stack.pop_or(default_for::GENERIC);
                let (object, _) = stack.pop_or(default_for::GENERIC);
                let access = expr::property_access(&object, &key);
                let op_text = if op == Opcode::IncProp { "++" } else { "--" };
                let text = if prefix {
                    format!("{}{}", op_text, access)
                } else {
                    format!("{}{}", access, op_text)
                };
                emitter.stmt(text);
            }
            Opcode::LoadVar => {
                let scope = operand_u32(instr, OperandKind::Scope).unwrap_or(0);
                let slot = operand_u32(instr, OperandKind::VarSlot).unwrap_or(0);
                stack.push(self.naming.name_for(scope, slot));
            }
            Opcode::StoreVar => {
                let scope = operand_u32(instr, OperandKind::Scope).unwrap_or(0);
                let slot = operand_u32(instr, OperandKind::VarSlot).unwrap_or(0);
                let name = self.naming.name_for(scope, slot);
                let (value, _) = stack.pop_or(default_for::GENERIC);
                emitter.stmt(stmt::declare(&name, &value));
            }
            Opcode::AssignVar => {
                let scope = operand_u32(instr, OperandKind::Scope).unwrap_or(0);
                let dest = operand_u32(instr, OperandKind::Dest).unwrap_or(0);
                let name = self.naming.name_for(scope, dest);
                let (value, _) = stack.pop_or(default_for::GENERIC);
                match expr::assign_compound_opcode(instr).and_then(Opcode::operator_str) {
                    Some(operator) => emitter.stmt(stmt::compound_assign(&name, operator, &value)),
                    None => emitter.stmt(stmt::assign(&name, &value)),
                }
                stack.push(name);
            }
            Opcode::LoadGlobal => stack.push("globalThis"),
            Opcode::LoadGlobalProperty => {
                let idx = operand_u32(instr, OperandKind::StringIndex).unwrap_or(0);
                let name = self.string_table.get(idx).unwrap_or("undefined");
                stack.push(expr::property_access("globalThis", &format!("{:?}", name)));
            }
            Opcode::LoadThis => stack.push("this"),
            Opcode::LoadArguments => stack.push("arguments"),
            Opcode::LoadArgument => {
                let n = operand_u32(instr, OperandKind::Dword).unwrap_or(0);
                stack.push(format!("arguments[{}]", n));
            }
            Opcode::CallFunction | Opcode::CallMethod | Opcode::CallValue | Opcode::Construct => {
                let argc = expr::argc_of(instr);
                let args = expr::pop_n_in_push_order(stack, argc);
                let (callee, _) = stack.pop_or(default_for::GENERIC);
                let call_text = if op == Opcode::Construct {
                    format!("new {}({})", callee, args.join(", "))
                } else {
                    format!("{}({})", callee, args.join(", "))
                };
                let next_op = self.instrs.get(idx + 1).and_then(|n| n.opcode);
                if stmt::consumes_pushed_value(next_op) {
                    stack.push(call_text);
                } else {
                    emitter.stmt(call_text);
                }
            }
            Opcode::GetProperty => {
                let (key, _) = stack.pop_or(default_for::GENERIC);
                let (object, _) = stack.pop_or(default_for::GENERIC);
                stack.push(expr::property_access(&object, &key));
            }
            Opcode::SetProperty => {
                let (value, _) = stack.pop_or(default_for::GENERIC);
                let (key, _) = stack.pop_or(default_for::GENERIC);
                let (object, _) = stack.pop_or(default_for::GENERIC);
                emitter.stmt(format!("{} = {}", expr::property_access(&object, &key), value));
            }
            Opcode::DeleteProperty => {
                let (key, _) = stack.pop_or(default_for::GENERIC);
                let (object, _) = stack.pop_or(default_for::GENERIC);
                emitter.stmt(format!("delete {}", expr::property_access(&object, &key)));
            }
            Opcode::BuildArray => {
                let length = operand_u32(instr, OperandKind::Length).unwrap_or(0) as usize;
                let elements = expr::pop_n_in_push_order(stack, length);
                stack.push(format!("[{}]", elements.join(", ")));
            }
            Opcode::BuildObject => {
                let pairs_count = operand_u32(instr, OperandKind::Length).unwrap_or(0) as usize;
                let elements = expr::pop_n_in_push_order(stack, pairs_count * 2);
                let rendered: Vec<String> = elements
                    .chunks(2)
                    .filter(|chunk| chunk.len() == 2)
                    .map(|chunk| format!("{}: {}", expr::object_literal_key(&chunk[0]), chunk[1]))
                    .collect();
                stack.push(format!("{{{}}}", rendered.join(", ")));
            }
            Opcode::BuildFunction => {
                let body = instr.fn_body.clone().unwrap_or_default();
                let text = function::lift_nested(
                    &body,
                    self.opcode_map,
                    self.string_table,
                    self.swapped,
                    self.return_opcode,
                    self.version,
                    self.config,
                    self.naming,
                    &mut self.diagnostics,
                );
                stack.push(text);
            }
            Opcode::BuildRegexp => {
                let (pattern, flags) = match (
                    operand_u32(instr, OperandKind::StringIndex),
                    operand_bool(instr, OperandKind::HasFlags),
                ) {
                    (Some(_), _) => {
                        let pattern_idx = instr.args.first().and_then(|a| a.as_u32()).unwrap_or(0);
                        let flags_idx = instr.args.get(1).and_then(|a| a.as_u32()).unwrap_or(0);
                        (
                            self.string_table.get(pattern_idx).unwrap_or("").to_string(),
                            self.string_table.get(flags_idx).unwrap_or("").to_string(),
                        )
                    }
                    (None, Some(has_flags)) => {
                        let flags = if has_flags { stack.pop_or(default_for::GENERIC).0 } else { String::new() };
                        let pattern = stack.pop_or(default_for::GENERIC).0;
                        (strip_quotes(&pattern), strip_quotes(&flags))
                    }
                    (None, None) => (String::new(), String::new()),
                };
                stack.push(format!("/{}/{}", pattern, flags));
            }
            Opcode::Jump | Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                if instr.is_conditional_jump() {
                    stack.pop_or(default_for::GENERIC);
                }
                let target = instr.jump_target().unwrap_or(instr.addr);
                self.diagnostics
                    .push(Diagnostic::StructuringFallback { block_id: self.cfg.block_for_instr(idx) });
                if self.config.emit_structuring_fallback_comments {
                    emitter.raw(stmt::unstructured_jump_comment(target));
                }
            }
            Opcode::Return => {
                let has_value = operand_bool(instr, OperandKind::HasValue).unwrap_or(false);
                let value = has_value.then(|| stack.pop_or(default_for::GENERIC).0);
                emitter.stmt(stmt::return_stmt(value));
            }
            Opcode::Debugger => emitter.stmt("debugger"),
            Opcode::TryPush | Opcode::TryPop | Opcode::TryFinally => {
                // Only meaningful as part of a recognized try/catch region;
                // a bare occurrence here means recognition failed to match
                // it, so there is nothing sound to emit.
            }
            Opcode::In | Opcode::InstanceOf => unreachable!("handled by the is_binary_operator() arm above"),
        }
    }
}

fn operand_u32(instr: &Instruction, kind: OperandKind) -> Option<u32> {
    instr.args.iter().find(|a| a.kind == kind).and_then(|a| a.as_u32())
}

fn operand_bool(instr: &Instruction, kind: OperandKind) -> Option<bool> {
    instr.args.iter().find(|a| a.kind == kind).and_then(|a| a.as_bool())
}

fn strip_quotes(text: &str) -> String {
    text.strip_prefix('"').and_then(|t| t.strip_suffix('"')).unwrap_or(text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Operand;

    fn bare(addr: u32, opcode: Opcode, args: Vec<Operand>) -> Instruction {
        Instruction {
            addr,
            raw_opcode: 0,
            opcode: Some(opcode),
            op_name: opcode.to_string(),
            args,
            swapped: false,
            string_value: None,
            fn_body: None,
            error: None,
        }
    }

    fn push_bool(addr: u32, value: bool) -> Instruction {
        bare(addr, Opcode::PushBool, vec![Operand::bool(OperandKind::Boolean, value)])
    }

    fn push_int(addr: u32, value: i32) -> Instruction {
        bare(addr, Opcode::PushInt, vec![Operand::i32(OperandKind::SignedDword, value)])
    }

    fn jump(addr: u32, opcode: Opcode, target: u32) -> Instruction {
        bare(addr, opcode, vec![Operand::u32(OperandKind::Address, target)])
    }

    fn load_var(addr: u32, scope: u32, slot: u32) -> Instruction {
        bare(
            addr,
            Opcode::LoadVar,
            vec![Operand::u32(OperandKind::Scope, scope), Operand::u32(OperandKind::VarSlot, slot)],
        )
    }

    fn store_var(addr: u32, scope: u32, slot: u32) -> Instruction {
        bare(
            addr,
            Opcode::StoreVar,
            vec![Operand::u32(OperandKind::Scope, scope), Operand::u32(OperandKind::VarSlot, slot)],
        )
    }

    fn assign_var(addr: u32, scope: u32, dest: u32) -> Instruction {
        bare(
            addr,
            Opcode::AssignVar,
            vec![Operand::u32(OperandKind::Scope, scope), Operand::u32(OperandKind::Dest, dest)],
        )
    }

    fn simple(addr: u32, opcode: Opcode) -> Instruction {
        bare(addr, opcode, Vec::new())
    }

    fn return_instr(addr: u32, has_value: bool) -> Instruction {
        bare(addr, Opcode::Return, vec![Operand::bool(OperandKind::HasValue, has_value)])
    }

    fn lift_source(instrs: &[Instruction]) -> (String, Vec<Diagnostic>) {
        lift(
            instrs,
            &OpcodeMap::new(),
            &StringTable::new(Vec::new()),
            &SwappedOpcodes::new(),
            Some(Opcode::Return),
            Version::V1Legacy,
            &DecompilerConfig::default(),
        )
    }

    /// spec.md §8 scenario 3: if-else with no ternary shape (both branches
    /// store a variable, so they're not pure-expression).
    #[test]
    fn scenario_3_if_else() {
        let instrs = vec![
            push_bool(0, true),
            jump(1, Opcode::JumpIfFalse, 5),
            push_int(2, 1),
            store_var(3, 0, 0),
            jump(4, Opcode::Jump, 7),
            push_int(5, 2),
            store_var(6, 0, 0),
            return_instr(7, false),
        ];
        let (source, diagnostics) = lift_source(&instrs);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        assert_eq!(
            source,
            "if (true) {\n  var var_0 = 1;\n} else {\n  var var_0 = 2;\n}\nreturn;"
        );
    }

    /// spec.md §8 scenario 4: same shape as scenario 3, but both branches
    /// are a single pure-expression push — recognized as a ternary instead.
    #[test]
    fn scenario_4_ternary() {
        let instrs = vec![
            push_bool(0, true),
            jump(1, Opcode::JumpIfFalse, 4),
            push_int(2, 1),
            jump(3, Opcode::Jump, 5),
            push_int(4, 2),
            return_instr(5, true),
        ];
        let (source, diagnostics) = lift_source(&instrs);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        assert_eq!(source, "return (true ? 1 : 2);");
    }

    /// spec.md §8 scenario 5: V2 pre-test loop.
    #[test]
    fn scenario_5_v2_pre_test_loop() {
        let instrs = vec![
            load_var(0, 0, 0),
            push_int(1, 10),
            simple(2, Opcode::Less),
            jump(3, Opcode::JumpIfFalse, 10),
            load_var(4, 0, 0),
            push_int(5, 1),
            simple(6, Opcode::Add),
            assign_var(7, 0, 0),
            simple(8, Opcode::Pop),
            jump(9, Opcode::Jump, 0),
            return_instr(10, false),
        ];
        let (source, diagnostics) = lift_source(&instrs);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        assert_eq!(
            source,
            "while ((var_0 < 10)) {\n  var_0 = (var_0 + 1);\n}\nreturn;"
        );
    }

    /// spec.md §8 scenario 6: short-circuit `&&`.
    #[test]
    fn scenario_6_short_circuit_and() {
        let instrs = vec![
            load_var(0, 0, 0),
            simple(1, Opcode::Duplicate),
            jump(2, Opcode::JumpIfFalse, 5),
            simple(3, Opcode::Pop),
            load_var(4, 0, 1),
            return_instr(5, true),
        ];
        let (source, diagnostics) = lift_source(&instrs);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        assert_eq!(source, "return (var_0 && var_1);");
    }
}
