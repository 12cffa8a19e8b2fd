//! # Feature Extraction
//!
//! Turns a [`HandlerNode`] subtree into a [`FeatureVector`] by pure
//! structural inspection. Nothing here executes the handler or reasons
//! about values; it only counts and flags syntactic shapes, per the
//! fingerprinter's "never depend on opcode numbers" contract.

use std::collections::BTreeSet;

use super::ast::HandlerNode;

/// Structural summary of one handler body, sufficient for [`super::classify`]
/// to name its semantic operation.
#[derive(Debug, Clone, Default)]
pub struct FeatureVector {
    pub push_calls: u32,
    pub pop_calls: u32,
    pub statement_count: u32,
    pub computed_member_accesses: u32,
    pub nested_computed_accesses: u32,

    pub reads_string_table: bool,
    pub reads_dword: bool,
    pub reads_byte: bool,
    pub reads_double: bool,
    pub has_loop: bool,
    pub uses_apply: bool,
    pub uses_new: bool,
    pub accesses_this_ref: bool,
    pub accesses_arguments: bool,
    pub accesses_scopes: bool,
    pub accesses_global: bool,
    pub double_bracket_scope_access: bool,
    pub has_assignment: bool,
    pub has_nullish_assign: bool,
    pub has_update: bool,
    pub has_array_literal: bool,
    pub has_object_literal: bool,
    pub has_spread: bool,
    pub has_nested_function_literal: bool,
    pub has_try_finally: bool,
    pub has_throw: bool,
    pub has_debugger: bool,

    pub operators: BTreeSet<String>,

    pub equals_literal_one: bool,
    pub has_double_read_idiom: bool,
    pub has_array_from: bool,
}

/// Extract a [`FeatureVector`] from a handler body by walking its tree.
/// Never executes the handler.
pub fn extract(root: &HandlerNode) -> FeatureVector {
    let mut features = FeatureVector::default();
    root.walk(&mut |node| record(node, &mut features));
    features
}

fn record(node: &HandlerNode, f: &mut FeatureVector) {
    match node {
        HandlerNode::Call { callee, args } => {
            if node.is_call_to("push") {
                f.push_calls += 1;
            }
            if node.is_call_to("pop") {
                f.pop_calls += 1;
            }
            if node.is_call_to("readDword") {
                f.reads_dword = true;
            }
            if node.is_call_to("readByte") {
                f.reads_byte = true;
            }
            if node.is_call_to("readDouble") {
                f.reads_double = true;
                f.has_double_read_idiom = true;
            }
            if matches!(callee.as_ref(), HandlerNode::Member { property, computed: false, .. }
                if matches!(property.as_ref(), HandlerNode::Identifier { name } if name == "apply"))
            {
                f.uses_apply = true;
            }
            if let Some(name) = node.callee_name() {
                if name == "from" {
                    f.has_array_from = true;
                }
            }
            let _ = args;
        }
        HandlerNode::New { .. } => {
            f.uses_new = true;
        }
        HandlerNode::Member {
            object,
            property,
            computed,
        } => {
            if *computed {
                f.computed_member_accesses += 1;
                let nested = matches!(object.as_ref(), HandlerNode::Member { computed: true, .. })
                    || matches!(property.as_ref(), HandlerNode::Member { computed: true, .. });
                if nested {
                    f.nested_computed_accesses += 1;
                    f.double_bracket_scope_access = true;
                }
            }
            if let HandlerNode::Identifier { name } = object.as_ref() {
                match name.as_str() {
                    "strings" => {
                        if *computed {
                            f.reads_string_table = true;
                        }
                    }
                    "thisRef" => f.accesses_this_ref = true,
                    "arguments" => f.accesses_arguments = true,
                    "scopes" => f.accesses_scopes = true,
                    "global" => f.accesses_global = true,
                    _ => {}
                }
            }
        }
        HandlerNode::For { .. } | HandlerNode::While { .. } => {
            f.has_loop = true;
        }
        HandlerNode::Try { finalizer, .. } => {
            if finalizer.is_some() {
                f.has_try_finally = true;
            }
        }
        HandlerNode::Throw { .. } => {
            f.has_throw = true;
        }
        HandlerNode::Debugger => {
            f.has_debugger = true;
        }
        HandlerNode::Assign { operator, .. } => {
            f.has_assignment = true;
            if operator == "??=" {
                f.has_nullish_assign = true;
            }
        }
        HandlerNode::Update { .. } => {
            f.has_update = true;
        }
        HandlerNode::ArrayLiteral { .. } => {
            f.has_array_literal = true;
        }
        HandlerNode::ObjectLiteral { .. } => {
            f.has_object_literal = true;
        }
        HandlerNode::Spread { .. } => {
            f.has_spread = true;
        }
        HandlerNode::FunctionLiteral { .. } => {
            f.has_nested_function_literal = true;
        }
        HandlerNode::Binary { operator, .. } => {
            f.operators.insert(operator.clone());
        }
        HandlerNode::Logical { operator, .. } => {
            f.operators.insert(operator.clone());
        }
        HandlerNode::Unary { operator, .. } => {
            f.operators.insert(operator.clone());
        }
        HandlerNode::Block { body } => {
            f.statement_count += body.len() as u32;
        }
        _ => {}
    }

    // Equality-against-literal-1 can appear as either operand of a Binary.
    if let HandlerNode::Binary {
        operator,
        left,
        right,
    } = node
    {
        if operator == "===" || operator == "==" {
            let is_one = |n: &HandlerNode| {
                matches!(
                    n,
                    HandlerNode::Literal {
                        value: super::ast::LiteralValue::Number(x)
                    } if *x == 1.0
                )
            };
            if is_one(left) || is_one(right) {
                f.equals_literal_one = true;
            }
        }
    }
}
