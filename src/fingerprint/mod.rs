//! # Opcode Fingerprinter
//!
//! Recovers the shuffled opcode numbering: for each handler subroutine,
//! extract a structural [`features::FeatureVector`] and run it through the
//! [`classify`] cascade to name its canonical operation. Also derives the
//! per-payload `SwappedOpcodes` set (operand order for binary operators)
//! and the RETURN opcode.
//!
//! Unclassified handlers are simply absent from the resulting [`OpcodeMap`]
//! — disassembly later renders them as `UNKNOWN_<n>` — per the "unclassified
//! handlers yield no entry" failure semantics. This is recorded with
//! `tracing::debug!`, not an error: a handful of unmapped opcodes does not
//! make the payload undecompilable.

pub mod ast;
pub mod classify;
pub mod features;

use std::collections::BTreeMap;

use crate::model::{Opcode, OpcodeMap, SwappedOpcodes};

use ast::HandlerNode;

/// Everything the fingerprinter recovers from one payload's handler table.
#[derive(Debug, Clone, Default)]
pub struct FingerprintResult {
    pub opcode_map: OpcodeMap,
    pub return_opcode: Option<Opcode>,
    pub swapped: SwappedOpcodes,
}

/// Fingerprint every handler in `handlers`, keyed by raw opcode number.
pub fn fingerprint(handlers: &BTreeMap<u32, HandlerNode>) -> FingerprintResult {
    let mut opcode_map = OpcodeMap::new();
    let mut swapped = SwappedOpcodes::new();

    for (&raw, handler) in handlers {
        let vector = features::extract(handler);
        match classify::classify(&vector) {
            Some(opcode) => {
                opcode_map.insert(raw, opcode);
                if opcode.is_binary_operator() && detect_swapped_operand_order(handler) {
                    swapped.insert(raw);
                }
            }
            None => {
                tracing::debug!(raw_opcode = raw, "handler did not match any classification rule");
            }
        }
    }

    let return_opcode = opcode_map.raw_of(Opcode::Return).and(Some(Opcode::Return));

    FingerprintResult {
        opcode_map,
        return_opcode,
        swapped,
    }
}

/// Detect whether a binary-operator handler evaluates `pop() OP pop()`
/// (canonical) or `const n = pop(); push(pop() OP n)` (swapped): a
/// statement binding a fresh name to a `pop()` call, whose name later
/// appears as the *right* operand of the handler's binary expression while
/// a fresh `pop()` call appears as the left operand.
fn detect_swapped_operand_order(handler: &HandlerNode) -> bool {
    let statements = top_level_statements(handler);

    let bound_from_pop = statements.iter().find_map(|stmt| match stmt {
        HandlerNode::VarDecl {
            name,
            init: Some(init),
        } if init.is_call_to("pop") => Some(name.as_str()),
        _ => None,
    });

    let Some(name) = bound_from_pop else {
        return false;
    };

    statements.iter().any(|stmt| {
        find_binary(stmt).is_some_and(|(left, right)| {
            left.is_call_to("pop") && matches!(right, HandlerNode::Identifier { name: n } if n == name)
        })
    })
}

fn top_level_statements(handler: &HandlerNode) -> Vec<&HandlerNode> {
    match handler {
        HandlerNode::Block { body } => body.iter().collect(),
        other => vec![other],
    }
}

fn find_binary(node: &HandlerNode) -> Option<(&HandlerNode, &HandlerNode)> {
    match node {
        HandlerNode::Binary { left, right, .. } => Some((left.as_ref(), right.as_ref())),
        HandlerNode::ExprStmt { expr } => find_binary(expr),
        HandlerNode::Return { argument: Some(arg) } => find_binary(arg),
        HandlerNode::Call { args, .. } => args.iter().find_map(find_binary),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::LiteralValue;

    fn pop_call() -> HandlerNode {
        HandlerNode::Call {
            callee: Box::new(HandlerNode::Identifier { name: "pop".into() }),
            args: vec![],
        }
    }

    fn push_call(arg: HandlerNode) -> HandlerNode {
        HandlerNode::Call {
            callee: Box::new(HandlerNode::Identifier { name: "push".into() }),
            args: vec![arg],
        }
    }

    #[test]
    fn canonical_add_is_not_swapped() {
        let handler = HandlerNode::Block {
            body: vec![HandlerNode::ExprStmt {
                expr: Box::new(push_call(HandlerNode::Binary {
                    operator: "+".into(),
                    left: Box::new(pop_call()),
                    right: Box::new(pop_call()),
                })),
            }],
        };
        assert!(!detect_swapped_operand_order(&handler));
    }

    #[test]
    fn swapped_add_binds_then_reuses_identifier() {
        let handler = HandlerNode::Block {
            body: vec![
                HandlerNode::VarDecl {
                    name: "n".into(),
                    init: Some(Box::new(pop_call())),
                },
                HandlerNode::ExprStmt {
                    expr: Box::new(push_call(HandlerNode::Binary {
                        operator: "+".into(),
                        left: Box::new(pop_call()),
                        right: Box::new(HandlerNode::Identifier { name: "n".into() }),
                    })),
                },
            ],
        };
        assert!(detect_swapped_operand_order(&handler));
    }

    #[test]
    fn fingerprint_maps_classified_handlers_and_skips_unknown() {
        let mut handlers = BTreeMap::new();
        handlers.insert(
            7,
            HandlerNode::Block {
                body: vec![HandlerNode::Debugger],
            },
        );
        handlers.insert(
            9,
            HandlerNode::Block {
                body: vec![HandlerNode::VarDecl {
                    name: "unused".into(),
                    init: Some(Box::new(HandlerNode::Literal {
                        value: LiteralValue::Undefined,
                    })),
                }],
            },
        );
        let result = fingerprint(&handlers);
        assert_eq!(result.opcode_map.canonical(7), Some(Opcode::Debugger));
        assert_eq!(result.opcode_map.len(), 1);
    }
}
