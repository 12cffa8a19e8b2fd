//! # Dominator and Post-Dominator Analysis
//!
//! Iterative data-flow to fixpoint over a [`Cfg`]'s block graph, computed in
//! both directions: dominators (forward, seeded from the entry block) and
//! post-dominators (backward, seeded from the exit-block set). The region
//! recognizer consults the result read-only to anchor merge blocks and loop
//! exits, so it is kept addressable by block id rather than as a one-shot
//! traversal result.

use std::collections::BTreeSet;

use crate::cfg::{BlockId, Cfg};

/// Dominance result for one function body's [`Cfg`]. `dom[b]` is the set of
/// blocks that dominate `b` (always including `b` itself); `idom[b]` is the
/// immediate dominator, `None` only for the entry block. `pdom`/`ipdom` are
/// the symmetric backward quantities.
#[derive(Debug, Clone)]
pub struct Dominators {
    pub dom: Vec<BTreeSet<BlockId>>,
    pub idom: Vec<Option<BlockId>>,
    pub pdom: Vec<BTreeSet<BlockId>>,
    pub ipdom: Vec<Option<BlockId>>,
}

impl Dominators {
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.dom[b].contains(&a)
    }

    pub fn post_dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.pdom[b].contains(&a)
    }
}

/// Compute dominators and post-dominators for `cfg`.
pub fn compute(cfg: &Cfg) -> Dominators {
    let n = cfg.num_blocks();
    if n == 0 {
        return Dominators {
            dom: Vec::new(),
            idom: Vec::new(),
            pdom: Vec::new(),
            ipdom: Vec::new(),
        };
    }

    let all: BTreeSet<BlockId> = (0..n).collect();
    let predecessors_of = |b: BlockId| cfg.block(b).predecessors.clone();
    let successors_of = |b: BlockId| cfg.block(b).successors.clone();

    let dom = fixpoint(n, cfg.entry, &all, predecessors_of);
    let idom = immediate(&dom, cfg.entry);

    let exits: BTreeSet<BlockId> = if cfg.exits.is_empty() {
        // A body with no RETURN (e.g. falls off the end) still needs a
        // post-dominator seed; fall back to whatever block has no
        // successors so the analysis always terminates.
        (0..n).filter(|&b| cfg.block(b).successors.is_empty()).collect()
    } else {
        cfg.exits.iter().copied().collect()
    };
    let pdom = fixpoint_multi_seed(n, &exits, &all, successors_of);
    let ipdom = immediate_multi_seed(&pdom, &exits);

    Dominators {
        dom,
        idom,
        pdom,
        ipdom,
    }
}

/// Shared fixpoint loop for a single-seed (dominator) direction: `Dom(seed) =
/// {seed}`; for every other block, `Dom(n) = {n} ∪ (⋂ Dom(p) over the blocks
/// `edges(n)` points back to)`.
fn fixpoint(
    n: usize,
    seed: BlockId,
    all: &BTreeSet<BlockId>,
    edges: impl Fn(BlockId) -> Vec<BlockId>,
) -> Vec<BTreeSet<BlockId>> {
    let mut sets = vec![all.clone(); n];
    sets[seed] = [seed].into_iter().collect();

    let mut changed = true;
    while changed {
        changed = false;
        for b in 0..n {
            if b == seed {
                continue;
            }
            let preds = edges(b);
            let mut next = intersect_all(preds.iter().map(|&p| &sets[p]));
            next.insert(b);
            if next != sets[b] {
                sets[b] = next;
                changed = true;
            }
        }
    }
    sets
}

/// Post-dominator variant seeded from a set of exit blocks rather than one
/// entry: every seed's own set is `{seed}`, and the fixpoint starts from
/// there. A block unreachable from any exit (dead code after an
/// always-taken branch) degenerates to "dominated by everything", which is
/// harmless: the region recognizer never consults post-dominance for blocks
/// that aren't on a structured path.
fn fixpoint_multi_seed(
    n: usize,
    seeds: &BTreeSet<BlockId>,
    all: &BTreeSet<BlockId>,
    edges: impl Fn(BlockId) -> Vec<BlockId>,
) -> Vec<BTreeSet<BlockId>> {
    let mut sets = vec![all.clone(); n];
    for &s in seeds {
        sets[s] = [s].into_iter().collect();
    }

    let mut changed = true;
    while changed {
        changed = false;
        for b in 0..n {
            if seeds.contains(&b) {
                continue;
            }
            let succs = edges(b);
            let mut next = intersect_all(succs.iter().map(|&s| &sets[s]));
            next.insert(b);
            if next != sets[b] {
                sets[b] = next;
                changed = true;
            }
        }
    }
    sets
}

fn intersect_all<'a>(mut sets: impl Iterator<Item = &'a BTreeSet<BlockId>>) -> BTreeSet<BlockId> {
    match sets.next() {
        None => BTreeSet::new(),
        Some(first) => sets.fold(first.clone(), |acc, s| acc.intersection(s).copied().collect()),
    }
}

/// The immediate dominator of `b` is, among `Dom(b) \ {b}`, the element
/// whose own `Dom` set is a superset of every other candidate's — i.e. the
/// closest in the dominance partial order.
fn immediate(dom: &[BTreeSet<BlockId>], seed: BlockId) -> Vec<Option<BlockId>> {
    (0..dom.len())
        .map(|b| {
            if b == seed {
                return None;
            }
            closest_strict_dominator(dom, b)
        })
        .collect()
}

fn immediate_multi_seed(pdom: &[BTreeSet<BlockId>], seeds: &BTreeSet<BlockId>) -> Vec<Option<BlockId>> {
    (0..pdom.len())
        .map(|b| {
            if seeds.contains(&b) {
                return None;
            }
            closest_strict_dominator(pdom, b)
        })
        .collect()
}

fn closest_strict_dominator(dom: &[BTreeSet<BlockId>], b: BlockId) -> Option<BlockId> {
    let candidates: Vec<BlockId> = dom[b].iter().copied().filter(|&c| c != b).collect();
    candidates
        .iter()
        .copied()
        .find(|&cand| candidates.iter().all(|&other| other == cand || dom[cand].contains(&other)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Instruction, Opcode, Operand, OperandKind};

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
    fn entry_dominates_only_itself() {
        let instrs = vec![instr(0, Opcode::Return, None)];
        let cfg = crate::cfg::build(&instrs);
        let dom = compute(&cfg);
        assert_eq!(dom.dom[0], [0].into_iter().collect());
        assert_eq!(dom.idom[0], None);
    }

    #[test]
    fn if_else_merge_is_post_dominated_by_merge_block() {
        // 0: JUMP_IF_FALSE -> 2 (else)
        // 1: PUSH_INT            (then)
        // 2: RETURN              (merge / exit)
        let instrs = vec![
            instr(0, Opcode::JumpIfFalse, Some(2)),
            instr(1, Opcode::PushInt, None),
            instr(2, Opcode::Return, None),
        ];
        let cfg = crate::cfg::build(&instrs);
        let dom = compute(&cfg);
        // Block 0 (the condition) is post-dominated by block 2 (the merge).
        assert!(dom.post_dominates(2, 0));
        assert_eq!(dom.idom[1], Some(0));
        assert_eq!(dom.idom[2], Some(0));
    }

    #[test]
    fn every_block_dominates_itself() {
        let instrs = vec![
            instr(0, Opcode::JumpIfFalse, Some(2)),
            instr(1, Opcode::PushInt, None),
            instr(2, Opcode::Return, None),
        ];
        let cfg = crate::cfg::build(&instrs);
        let dom = compute(&cfg);
        for b in 0..cfg.num_blocks() {
            assert!(dom.dominates(b, b));
        }
    }
}
