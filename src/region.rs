//! # Region Recognizer
//!
//! Recovers structured control-flow shapes from a [`Cfg`] and its
//! [`Dominators`]: loops (two wire-format-dependent patterns), if/if-else,
//! ternary expressions, short-circuit logical operators, and try/catch.
//! `RegionMap` is a derived, read-only view over instruction indices — it
//! never owns blocks (spec.md §3 Lifetimes) — and records which instruction
//! indices each region consumes so the lifter's linear pass can skip
//! instructions a structured region already accounts for.

use std::collections::{BTreeMap, BTreeSet};

use crate::cfg::{BlockId, Cfg};
use crate::dominators::Dominators;
use crate::model::{Instruction, Opcode};

pub type InstrIdx = usize;

/// Which of the two wire-format loop shapes a [`LoopRegion`] matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPattern {
    /// V1: unconditional forward jump into the condition, terminated by a
    /// conditional back-edge.
    V1PostTest,
    /// V2: conditional forward exit, body, unconditional back-edge.
    V2PreTest,
}

#[derive(Debug, Clone)]
pub struct LoopRegion {
    pub pattern: LoopPattern,
    /// Present only for [`LoopPattern::V1PostTest`].
    pub init_jump_idx: Option<InstrIdx>,
    pub cond_start: InstrIdx,
    pub cond_end: InstrIdx,
    pub cond_jump_idx: InstrIdx,
    pub body_start: InstrIdx,
    pub body_end: InstrIdx,
    /// Present only for [`LoopPattern::V2PreTest`].
    pub back_jump_idx: Option<InstrIdx>,
    pub exit_idx: InstrIdx,
    /// `true` when the loop's conditional jump is `JUMP_IF_TRUE` (condition
    /// text must be negated for a natural `while (cond)` reading), `false`
    /// for `JUMP_IF_FALSE` (condition text already reads naturally).
    pub is_true: bool,
}

#[derive(Debug, Clone)]
pub struct IfElseRegion {
    pub cond_block: BlockId,
    pub cond_jump_idx: InstrIdx,
    pub true_blocks: Vec<BlockId>,
    pub false_blocks: Vec<BlockId>,
    pub merge_block: Option<BlockId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct LogicalRegion {
    pub duplicate_idx: InstrIdx,
    pub jump_idx: InstrIdx,
    pub pop_idx: InstrIdx,
    pub operator: LogicalOperator,
    pub right_start: InstrIdx,
    pub right_end: InstrIdx,
    pub target_idx: InstrIdx,
}

#[derive(Debug, Clone)]
pub struct TryCatchRegion {
    pub try_start: InstrIdx,
    pub try_end: InstrIdx,
    pub catch_addr: u32,
    pub catch_start: InstrIdx,
    pub catch_end: InstrIdx,
    pub after_addr: Option<u32>,
    /// `finally_addr` carried by V1's `TRY_PUSH`, or the address named by a
    /// `TRY_FINALLY` marker in V2. `None` when the try has no finally block.
    pub finally_addr: Option<u32>,
}

/// Tagged pointer into one of the four region collections, keyed by the
/// first instruction index the region claims. The lifter's dispatcher
/// consults `starts_at` in its priority order (spec.md §4.7 steps 1-5)
/// before falling through to plain per-instruction processing.
#[derive(Debug, Clone, Copy)]
pub enum RegionRef {
    Loop(usize),
    IfElse(usize),
    Ternary(usize),
    Logical(usize),
    TryCatch(usize),
}

#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    pub loops: Vec<LoopRegion>,
    pub if_elses: Vec<IfElseRegion>,
    pub ternaries: Vec<IfElseRegion>,
    pub logicals: Vec<LogicalRegion>,
    pub try_catches: Vec<TryCatchRegion>,
    /// First instruction index of each recognized region, for the lifter's
    /// dispatch priority.
    pub starts_at: BTreeMap<InstrIdx, RegionRef>,
    /// Every instruction index already accounted for by some region; the
    /// lifter skips these in its fallthrough per-instruction step.
    pub consumed: BTreeSet<InstrIdx>,
}

/// Recognize every structured region in one function body.
pub fn recognize(cfg: &Cfg, dom: &Dominators, instrs: &[Instruction]) -> RegionMap {
    let mut regions = RegionMap::default();

    recognize_loops(instrs, cfg, &mut regions);
    recognize_try_catch(instrs, &mut regions);
    recognize_logicals(instrs, &mut regions);
    recognize_if_else_and_ternary(cfg, dom, instrs, &mut regions);

    regions
}

// --- loops -------------------------------------------------------------

fn recognize_loops(instrs: &[Instruction], cfg: &Cfg, regions: &mut RegionMap) {
    let addr_to_idx = &cfg.addr_to_index;
    let mut claimed: BTreeSet<InstrIdx> = BTreeSet::new();

    // V2 pre-test: a conditional jump whose target is forward (an exit),
    // followed eventually by an unconditional back-edge jump.
    for (i, instr) in instrs.iter().enumerate() {
        if claimed.contains(&i) || !instr.is_conditional_jump() {
            continue;
        }
        let Some(exit_idx) = instr.jump_target().and_then(|a| addr_to_idx.get(&a)).copied() else {
            continue;
        };
        if exit_idx <= i {
            continue; // not a forward exit
        }
        let body_start = i + 1;
        let Some(back_jump_idx) = find_back_edge(instrs, addr_to_idx, body_start, i) else {
            continue;
        };

        let body_end = back_jump_idx.saturating_sub(1).max(body_start.saturating_sub(1));
        regions.loops.push(LoopRegion {
            pattern: LoopPattern::V2PreTest,
            init_jump_idx: None,
            cond_start: i,
            cond_end: i,
            cond_jump_idx: i,
            body_start,
            body_end,
            back_jump_idx: Some(back_jump_idx),
            exit_idx,
            is_true: instr.opcode == Some(Opcode::JumpIfTrue),
        });
        let region_idx = regions.loops.len() - 1;
        regions.starts_at.insert(i, RegionRef::Loop(region_idx));
        // Only the jump markers are consumed — the body itself is re-lifted
        // by `lift_loop` via its own `lift_range` call over `[body_start,
        // body_end]`, so marking that range consumed here would make the
        // top-level pass skip it before `lift_loop` ever gets to it.
        for idx in i..=back_jump_idx {
            claimed.insert(idx);
        }
        regions.consumed.insert(i);
        regions.consumed.insert(back_jump_idx);
    }

    // V1 post-test: an unconditional forward jump into a condition region
    // terminated by a conditional back-edge.
    for (i, instr) in instrs.iter().enumerate() {
        if claimed.contains(&i) || instr.opcode != Some(Opcode::Jump) {
            continue;
        }
        let Some(cond_start) = instr.jump_target().and_then(|a| addr_to_idx.get(&a)).copied() else {
            continue;
        };
        if cond_start <= i {
            continue; // not a forward jump
        }
        let Some(cond_jump_idx) = (cond_start..instrs.len())
            .find(|&idx| !claimed.contains(&idx) && instrs[idx].is_conditional_jump())
        else {
            continue;
        };
        let Some(back_target) = instrs[cond_jump_idx].jump_target().and_then(|a| addr_to_idx.get(&a)).copied()
        else {
            continue;
        };
        if back_target > i {
            continue; // not a back-edge into the body
        }

        regions.loops.push(LoopRegion {
            pattern: LoopPattern::V1PostTest,
            init_jump_idx: Some(i),
            cond_start,
            cond_end: cond_jump_idx,
            cond_jump_idx,
            body_start: i + 1,
            body_end: cond_start.saturating_sub(1),
            back_jump_idx: None,
            exit_idx: cond_jump_idx + 1,
            is_true: instrs[cond_jump_idx].opcode == Some(Opcode::JumpIfTrue),
        });
        let region_idx = regions.loops.len() - 1;
        regions.starts_at.insert(i, RegionRef::Loop(region_idx));
        // Same reasoning as the V2 branch above: `lift_loop` re-lifts both
        // the condition range `[cond_start, cond_jump_idx)` and the body
        // range through its own `lift_range` calls, so only the initial and
        // condition jumps are markers here.
        for idx in i..=cond_jump_idx {
            claimed.insert(idx);
        }
        regions.consumed.insert(i);
        regions.consumed.insert(cond_jump_idx);
    }
}

/// Starting at `from`, find the first unconditional `JUMP` whose target
/// addresses an instruction at or before `limit` (the back-edge closing a
/// V2 pre-test loop body).
fn find_back_edge(
    instrs: &[Instruction],
    addr_to_idx: &BTreeMap<u32, usize>,
    from: InstrIdx,
    limit: InstrIdx,
) -> Option<InstrIdx> {
    (from..instrs.len()).find(|&idx| {
        instrs[idx].opcode == Some(Opcode::Jump)
            && instrs[idx]
                .jump_target()
                .and_then(|a| addr_to_idx.get(&a))
                .is_some_and(|&t| t <= limit)
    })
}

// --- short-circuit logicals ---------------------------------------------

fn recognize_logicals(instrs: &[Instruction], regions: &mut RegionMap) {
    let mut i = 0;
    while i + 2 < instrs.len() {
        let is_triple = instrs[i].opcode == Some(Opcode::Duplicate)
            && instrs[i + 1].is_conditional_jump()
            && instrs[i + 2].opcode == Some(Opcode::Pop);

        if !is_triple {
            i += 1;
            continue;
        }

        let jump = &instrs[i + 1];
        let Some(target_addr) = jump.jump_target() else {
            i += 1;
            continue;
        };
        let Some(target_idx) = instrs.iter().position(|instr| instr.addr == target_addr) else {
            i += 1;
            continue;
        };
        if target_idx <= i + 2 {
            i += 1;
            continue; // not a forward target over a right-hand operand
        }

        let operator = if jump.opcode == Some(Opcode::JumpIfFalse) {
            LogicalOperator::And
        } else {
            LogicalOperator::Or
        };

        regions.logicals.push(LogicalRegion {
            duplicate_idx: i,
            jump_idx: i + 1,
            pop_idx: i + 2,
            operator,
            right_start: i + 3,
            right_end: target_idx,
            target_idx,
        });
        let region_idx = regions.logicals.len() - 1;
        regions.starts_at.insert(i, RegionRef::Logical(region_idx));
        // Only the duplicate/jump/pop triple is consumed — `lift_logical`
        // re-lifts `[right_start, right_end)` itself through its own
        // `lift_range` call, so marking that range consumed here would
        // make the top-level pass skip the right-hand operand entirely.
        regions.consumed.insert(i);
        regions.consumed.insert(i + 1);
        regions.consumed.insert(i + 2);
        i = target_idx;
    }
}

// --- try/catch -----------------------------------------------------------

fn recognize_try_catch(instrs: &[Instruction], regions: &mut RegionMap) {
    struct Open {
        try_start: InstrIdx,
        catch_addr: u32,
        finally_addr: Option<u32>,
    }
    let mut stack: Vec<Open> = Vec::new();

    for (i, instr) in instrs.iter().enumerate() {
        match instr.opcode {
            Some(Opcode::TryPush) => {
                let catch_addr = instr
                    .args
                    .iter()
                    .find(|a| a.kind == crate::model::OperandKind::CatchAddr)
                    .and_then(|a| a.as_u32())
                    .unwrap_or(0);
                let finally_addr = instr
                    .args
                    .iter()
                    .find(|a| a.kind == crate::model::OperandKind::FinallyAddr)
                    .and_then(|a| a.as_u32());
                stack.push(Open {
                    try_start: i + 1,
                    catch_addr,
                    finally_addr,
                });
            }
            Some(Opcode::TryPop) => {
                let Some(open) = stack.pop() else { continue };
                let try_end = i;
                let after_addr = instrs
                    .get(i + 1)
                    .filter(|next| next.opcode == Some(Opcode::Jump))
                    .and_then(|next| next.jump_target());

                let Some(catch_start) = instrs.iter().position(|instr| instr.addr == open.catch_addr) else {
                    continue;
                };
                let catch_end = match after_addr {
                    Some(addr) => instrs
                        .iter()
                        .position(|instr| instr.opcode == Some(Opcode::Jump) && instr.jump_target() == Some(addr))
                        .filter(|&idx| idx >= catch_start)
                        .unwrap_or(instrs.len().saturating_sub(1)),
                    None => instrs.len().saturating_sub(1),
                };

                // Only the `TRY_PUSH`/`TRY_POP` markers (and the jump past
                // the catch block) are consumed here — `lift_try_catch`
                // re-lifts the try, catch, and finally ranges itself through
                // its own `lift_range` calls, so marking those ranges
                // consumed here would make the top-level pass skip them
                // before `lift_try_catch` ever runs.
                regions.consumed.insert(open.try_start - 1);
                regions.consumed.insert(try_end);
                if after_addr.is_some() {
                    regions.consumed.insert(try_end + 1);
                }
                regions.starts_at.insert(open.try_start, RegionRef::TryCatch(regions.try_catches.len()));
                regions.try_catches.push(TryCatchRegion {
                    try_start: open.try_start,
                    try_end,
                    catch_addr: open.catch_addr,
                    catch_start,
                    catch_end,
                    after_addr,
                    finally_addr: open.finally_addr,
                });
            }
            _ => {}
        }
    }
}

// --- if/if-else and ternary ----------------------------------------------

fn recognize_if_else_and_ternary(cfg: &Cfg, dom: &Dominators, instrs: &[Instruction], regions: &mut RegionMap) {
    let loop_cond_jumps: BTreeSet<InstrIdx> = regions.loops.iter().map(|l| l.cond_jump_idx).collect();

    for block in &cfg.blocks {
        if !block.is_conditional {
            continue;
        }
        if loop_cond_jumps.contains(&block.end_idx) {
            continue; // already consumed by loop recognition
        }
        let (Some(true_succ), Some(false_succ)) = (block.true_successor, block.false_successor) else {
            continue;
        };
        if !dom.dominates(block.id, true_succ) || !dom.dominates(block.id, false_succ) {
            continue;
        }

        let merge_block = dom.ipdom[block.id];
        let true_blocks = collect_branch_blocks(cfg, true_succ, merge_block);
        let false_blocks = collect_branch_blocks(cfg, false_succ, merge_block);

        let region = IfElseRegion {
            cond_block: block.id,
            cond_jump_idx: block.end_idx,
            true_blocks: true_blocks.clone(),
            false_blocks: false_blocks.clone(),
            merge_block,
        };

        if is_ternary_shape(cfg, instrs, &true_blocks, &false_blocks) {
            regions.ternaries.push(region);
            let idx = regions.ternaries.len() - 1;
            regions.starts_at.insert(block.end_idx, RegionRef::Ternary(idx));
        } else {
            regions.if_elses.push(region);
            let idx = regions.if_elses.len() - 1;
            regions.starts_at.insert(block.end_idx, RegionRef::IfElse(idx));
        }

        // Only the conditional jump itself is a marker — `lift_if_else`/
        // `lift_ternary` re-lift each branch's blocks through their own
        // `lift_range` calls, so marking the branch contents consumed here
        // would make the top-level pass skip them before either ever runs,
        // leaving every structured branch emitted empty.
        regions.consumed.insert(block.end_idx);
    }
}

/// Breadth-first collect every block reachable from `start` without
/// crossing into `merge` (exclusive) — the blocks belonging to one branch
/// of an if/else.
fn collect_branch_blocks(cfg: &Cfg, start: BlockId, merge: Option<BlockId>) -> Vec<BlockId> {
    if Some(start) == merge {
        return Vec::new();
    }
    let mut seen = BTreeSet::new();
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(start);
    seen.insert(start);
    let mut ordered = Vec::new();

    while let Some(b) = queue.pop_front() {
        ordered.push(b);
        for &succ in &cfg.block(b).successors {
            if Some(succ) == merge || seen.contains(&succ) {
                continue;
            }
            seen.insert(succ);
            queue.push_back(succ);
        }
    }
    ordered
}

/// A branch qualifies as "pure expression" (ternary-eligible) when every
/// instruction in it, apart from a trailing unconditional `JUMP` to the
/// merge block, is none of `STORE_VARIABLE`, `SET_PROPERTY`,
/// `UNARY_THROW`, `RETURN`, or `DEBUGGER` (spec.md §4.6).
fn is_ternary_shape(cfg: &Cfg, instrs: &[Instruction], true_blocks: &[BlockId], false_blocks: &[BlockId]) -> bool {
    if true_blocks.len() != 1 || false_blocks.len() != 1 {
        return false;
    }
    branch_is_pure(cfg, instrs, true_blocks[0]) && branch_is_pure(cfg, instrs, false_blocks[0])
}

fn branch_is_pure(cfg: &Cfg, instrs: &[Instruction], block: BlockId) -> bool {
    let b = cfg.block(block);
    for idx in b.instr_indexes() {
        let instr = &instrs[idx];
        let is_trailing_jump = idx == b.end_idx && instr.opcode == Some(Opcode::Jump);
        if is_trailing_jump {
            continue;
        }
        if matches!(
            instr.opcode,
            Some(Opcode::StoreVar)
                | Some(Opcode::SetProperty)
                | Some(Opcode::Throw)
                | Some(Opcode::Return)
                | Some(Opcode::Debugger)
        ) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Operand, OperandKind};

    fn instr(addr: u32, opcode: Opcode, jump_target: Option<u32>) -> Instruction {
        let mut args = Vec::new();
        if let Some(target) = jump_target {
            args.push(Operand::u32(OperandKind::Address, target));
        }
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

    #[test]
    fn recognizes_v2_pre_test_loop() {
        // LOAD_VAR; PUSH_INT; LESS; JUMP_IF_FALSE exit; LOAD_VAR; PUSH_INT; ADD;
        // ASSIGN_VAR; POP; JUMP back; RETURN
        let instrs = vec![
            instr(0, Opcode::LoadVar, None),
            instr(1, Opcode::PushInt, None),
            instr(2, Opcode::Less, None),
            instr(3, Opcode::JumpIfFalse, Some(9)),
            instr(4, Opcode::LoadVar, None),
            instr(5, Opcode::PushInt, None),
            instr(6, Opcode::Add, None),
            instr(7, Opcode::AssignVar, None),
            instr(8, Opcode::Jump, Some(0)),
            instr(9, Opcode::Return, None),
        ];
        let cfg = crate::cfg::build(&instrs);
        let dom = crate::dominators::compute(&cfg);
        let regions = recognize(&cfg, &dom, &instrs);
        assert_eq!(regions.loops.len(), 1);
        assert_eq!(regions.loops[0].pattern, LoopPattern::V2PreTest);
        assert_eq!(regions.loops[0].back_jump_idx, Some(8));
    }

    #[test]
    fn recognizes_short_circuit_and() {
        // LOAD_VAR; DUPLICATE; JUMP_IF_FALSE L; POP; LOAD_VAR; L: RETURN
        let instrs = vec![
            instr(0, Opcode::LoadVar, None),
            instr(1, Opcode::Duplicate, None),
            instr(2, Opcode::JumpIfFalse, Some(4)),
            instr(3, Opcode::Pop, None),
            instr(4, Opcode::LoadVar, None),
            instr(5, Opcode::Return, None),
        ];
        let cfg = crate::cfg::build(&instrs);
        let dom = crate::dominators::compute(&cfg);
        let regions = recognize(&cfg, &dom, &instrs);
        assert_eq!(regions.logicals.len(), 1);
        assert_eq!(regions.logicals[0].operator, LogicalOperator::And);
        assert_eq!(regions.logicals[0].right_start, 4);
    }

    #[test]
    fn recognizes_if_else_with_merge_block() {
        let instrs = vec![
            instr(0, Opcode::PushBool, None),
            instr(1, Opcode::JumpIfFalse, Some(4)),
            instr(2, Opcode::PushInt, None),
            instr(3, Opcode::Jump, Some(5)),
            instr(4, Opcode::PushInt, None),
            instr(5, Opcode::Return, None),
        ];
        let cfg = crate::cfg::build(&instrs);
        let dom = crate::dominators::compute(&cfg);
        let regions = recognize(&cfg, &dom, &instrs);
        assert_eq!(regions.if_elses.len(), 1);
        assert_eq!(regions.if_elses[0].merge_block, Some(cfg.block_for_instr(5)));
    }
}
