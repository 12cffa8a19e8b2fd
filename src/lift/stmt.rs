//! # Statement-Shaped Instruction Semantics
//!
//! The half of spec.md §4.7 that produces textual statements rather than
//! pure stack transformations: variable declarations, the call/construct
//! "consume ops" decision, pending returns, and the fallback unstructured
//! form for jumps no region absorbed.

use crate::model::Opcode;

/// `true` for the opcode families spec.md §4.7 lists as consuming a
/// call/construct's pushed result in place — arithmetic, comparisons,
/// bitwise, property get/set, method call, store/assign. When the
/// instruction immediately following a `CALL_*`/`CONSTRUCT` is one of
/// these, the call's expression stays on the symbolic stack; otherwise it
/// is emitted as a statement on its own.
pub fn consumes_pushed_value(op: Option<Opcode>) -> bool {
    matches!(
        op,
        Some(
            Opcode::GetProperty
                | Opcode::SetProperty
                | Opcode::CallMethod
                | Opcode::StoreVar
                | Opcode::AssignVar
        )
    ) || op.is_some_and(|op| op.is_binary_operator())
}

/// The declaration line for a freshly-seen local: `var NAME = init;`. A
/// later store to the same name in the same scope is rewritten to a plain
/// assignment by [`super::emit::cleanup`], not here — this function always
/// renders the `var` form so the lifter doesn't need its own declared-names
/// bookkeeping duplicated from the emitter's.
pub fn declare(name: &str, init: &str) -> String {
    format!("var {} = {}", name, init)
}

pub fn assign(name: &str, init: &str) -> String {
    format!("{} = {}", name, init)
}

pub fn compound_assign(name: &str, operator: &str, init: &str) -> String {
    format!("{} {}= {}", name, operator, init)
}

/// `return expr;` or bare `return;` for `has_value = false`.
pub fn return_stmt(value: Option<String>) -> String {
    match value {
        Some(expr) => format!("return {}", expr),
        None => "return".to_string(),
    }
}

/// Fallback form (spec.md §7 item 7) for a control transfer no region
/// absorbed: rendered as a comment carrying the raw target address, since
/// there is no structured label/goto in the target language.
pub fn unstructured_jump_comment(target_addr: u32) -> String {
    format!("/* unstructured jump to {} */", target_addr)
}

/// Fallback form for an unclassified opcode (spec.md §4.1/§7 item 6).
pub fn unknown_opcode_comment(op_name: &str) -> String {
    format!("/* {} */", op_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_ops_consume_a_pending_call_result() {
        assert!(consumes_pushed_value(Some(Opcode::Add)));
        assert!(consumes_pushed_value(Some(Opcode::GetProperty)));
        assert!(!consumes_pushed_value(Some(Opcode::Jump)));
    }

    #[test]
    fn return_without_value_is_bare() {
        assert_eq!(return_stmt(None), "return");
        assert_eq!(return_stmt(Some("1".into())), "return 1");
    }
}
