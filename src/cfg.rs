//! # Control-Flow Graph Builder
//!
//! Partitions a linear instruction stream into basic blocks and wires the
//! control-flow edges between them. Leaders are index 0, every jump target,
//! and the instruction immediately following any jump or `RETURN`; a block
//! spans from one leader up to (but not including) the next.

use std::collections::BTreeMap;

use crate::model::{Instruction, Opcode};

pub type BlockId = usize;

/// One basic block: a contiguous run of instructions with a single entry
/// and, apart from the implicit fallthrough at its end, a single exit.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub start_idx: usize,
    pub end_idx: usize,
    pub successors: Vec<BlockId>,
    pub predecessors: Vec<BlockId>,
    pub is_conditional: bool,
    pub true_successor: Option<BlockId>,
    pub false_successor: Option<BlockId>,
}

impl BasicBlock {
    pub fn instr_indexes(&self) -> std::ops::RangeInclusive<usize> {
        self.start_idx..=self.end_idx
    }
}

/// The control-flow graph for one function body.
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    pub exits: Vec<BlockId>,
    pub addr_to_index: BTreeMap<u32, usize>,
    pub index_to_block: Vec<BlockId>,
}

impl Cfg {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    pub fn block_for_instr(&self, instr_idx: usize) -> BlockId {
        self.index_to_block[instr_idx]
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}

/// Build a [`Cfg`] from a disassembled instruction stream.
pub fn build(instructions: &[Instruction]) -> Cfg {
    if instructions.is_empty() {
        return Cfg::default();
    }

    let addr_to_index: BTreeMap<u32, usize> = instructions
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.addr, i))
        .collect();

    let leader_list = find_leaders(instructions, &addr_to_index);
    let (blocks, index_to_block) = partition(instructions, &leader_list);

    let mut cfg = Cfg {
        blocks,
        entry: 0,
        exits: Vec::new(),
        addr_to_index,
        index_to_block,
    };

    wire_edges(instructions, &mut cfg);
    cfg
}

fn find_leaders(instructions: &[Instruction], addr_to_index: &BTreeMap<u32, usize>) -> Vec<usize> {
    let mut leaders = std::collections::BTreeSet::new();
    leaders.insert(0);

    for (i, instr) in instructions.iter().enumerate() {
        if instr.is_jump() {
            if let Some(target_idx) = instr.jump_target().and_then(|addr| addr_to_index.get(&addr)) {
                leaders.insert(*target_idx);
            }
            if i + 1 < instructions.len() {
                leaders.insert(i + 1);
            }
        } else if instr.is_return() && i + 1 < instructions.len() {
            leaders.insert(i + 1);
        }
    }

    leaders.into_iter().collect()
}

fn partition(instructions: &[Instruction], leaders: &[usize]) -> (Vec<BasicBlock>, Vec<BlockId>) {
    let mut blocks = Vec::with_capacity(leaders.len());
    let mut index_to_block = vec![0usize; instructions.len()];

    for (block_id, &start) in leaders.iter().enumerate() {
        let end = if block_id + 1 < leaders.len() {
            leaders[block_id + 1] - 1
        } else {
            instructions.len() - 1
        };
        for idx in start..=end {
            index_to_block[idx] = block_id;
        }
        blocks.push(BasicBlock {
            id: block_id,
            start_idx: start,
            end_idx: end,
            successors: Vec::new(),
            predecessors: Vec::new(),
            is_conditional: false,
            true_successor: None,
            false_successor: None,
        });
    }

    (blocks, index_to_block)
}

fn wire_edges(instructions: &[Instruction], cfg: &mut Cfg) {
    let num_blocks = cfg.blocks.len();

    for block_id in 0..num_blocks {
        let end_idx = cfg.blocks[block_id].end_idx;
        let last = &instructions[end_idx];

        if last.is_return() {
            cfg.exits.push(block_id);
            continue;
        }

        if last.is_jump() {
            let target_block = last
                .jump_target()
                .and_then(|addr| cfg.addr_to_index.get(&addr))
                .map(|&idx| cfg.index_to_block[idx]);
            let fallthrough_block = (end_idx + 1 < instructions.len()).then(|| cfg.index_to_block[end_idx + 1]);

            match last.opcode {
                Some(Opcode::Jump) => {
                    if let Some(target) = target_block {
                        cfg.blocks[block_id].successors.push(target);
                    }
                }
                Some(Opcode::JumpIfTrue) => {
                    cfg.blocks[block_id].is_conditional = true;
                    cfg.blocks[block_id].true_successor = target_block;
                    cfg.blocks[block_id].false_successor = fallthrough_block;
                    cfg.blocks[block_id].successors.extend(target_block);
                    cfg.blocks[block_id].successors.extend(fallthrough_block);
                }
                Some(Opcode::JumpIfFalse) => {
                    cfg.blocks[block_id].is_conditional = true;
                    cfg.blocks[block_id].false_successor = target_block;
                    cfg.blocks[block_id].true_successor = fallthrough_block;
                    cfg.blocks[block_id].successors.extend(target_block);
                    cfg.blocks[block_id].successors.extend(fallthrough_block);
                }
                _ => {}
            }
            continue;
        }

        if end_idx + 1 < instructions.len() {
            let fallthrough = cfg.index_to_block[end_idx + 1];
            cfg.blocks[block_id].successors.push(fallthrough);
        } else {
            cfg.exits.push(block_id);
        }
    }

    let edges: Vec<(BlockId, BlockId)> = cfg
        .blocks
        .iter()
        .flat_map(|b| b.successors.iter().map(move |&s| (b.id, s)))
        .collect();
    for (pred, succ) in edges {
        cfg.blocks[succ].predecessors.push(pred);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Instruction, Operand, OperandKind};

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
    fn straight_line_code_is_one_block() {
        let instrs = vec![
            instr(0, Opcode::PushInt, None),
            instr(5, Opcode::PushInt, None),
            instr(10, Opcode::Add, None),
            instr(11, Opcode::Return, None),
        ];
        let cfg = build(&instrs);
        assert_eq!(cfg.num_blocks(), 1);
        assert_eq!(cfg.exits, vec![0]);
    }

    #[test]
    fn conditional_jump_creates_two_successors() {
        // 0: JUMP_IF_FALSE -> 2  (block 0; false path skips the body)
        // 1: PUSH_INT            (block 1; true/fallthrough path, the body)
        // 2: RETURN              (block 2; merge point, the jump target)
        let instrs = vec![
            instr(0, Opcode::JumpIfFalse, Some(2)),
            instr(1, Opcode::PushInt, None),
            instr(2, Opcode::Return, None),
        ];
        let cfg = build(&instrs);
        assert_eq!(cfg.num_blocks(), 3);
        let b0 = cfg.block(0);
        assert!(b0.is_conditional);
        assert_eq!(b0.successors.len(), 2);
        assert_eq!(b0.false_successor, Some(2));
        assert_eq!(b0.true_successor, Some(1));
    }

    #[test]
    fn return_block_has_no_successors() {
        let instrs = vec![instr(0, Opcode::Return, None)];
        let cfg = build(&instrs);
        assert!(cfg.block(0).successors.is_empty());
        assert_eq!(cfg.exits, vec![0]);
    }

    #[test]
    fn predecessors_mirror_successors() {
        let instrs = vec![
            instr(0, Opcode::Jump, Some(1)),
            instr(1, Opcode::Return, None),
        ];
        let cfg = build(&instrs);
        assert_eq!(cfg.block(1).predecessors, vec![0]);
    }
}
