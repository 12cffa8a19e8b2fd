//! # Pure-Expression Instruction Semantics
//!
//! Per-opcode rules for instructions that only transform the symbolic
//! stack: literal pushes, binary/unary operators (swapped-aware), property
//! access (dotted vs bracketed form), and call argument collection. No
//! statement text is produced here — see [`super::stmt`] for that half of
//! instruction semantics.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Instruction, Opcode, OperandKind, OperandValue, StringTable};

use super::stack::{default_for, SymbolicStack};

static SAFE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Render the literal source text an instruction's own operand pushes
/// (`PUSH_STRING`/`PUSH_INT`/`PUSH_DOUBLE`/`PUSH_BOOL`/`PUSH_NULL`/
/// `PUSH_UNDEFINED`). Callers have already matched on `instr.opcode`.
pub fn push_literal(instr: &Instruction, string_table: &StringTable) -> String {
    match instr.opcode {
        Some(Opcode::PushString) => {
            let text = instr
                .string_value
                .clone()
                .or_else(|| {
                    instr
                        .args
                        .first()
                        .and_then(|a| a.as_u32())
                        .and_then(|idx| string_table.get(idx).map(str::to_string))
                })
                .unwrap_or_default();
            format!("{:?}", text)
        }
        Some(Opcode::PushInt) => instr.args.first().and_then(|a| a.as_i32()).unwrap_or(0).to_string(),
        Some(Opcode::PushDouble) => format_double(instr.args.first().and_then(|a| a.as_f64()).unwrap_or(0.0)),
        Some(Opcode::PushBool) => instr.args.first().and_then(|a| a.as_bool()).unwrap_or(false).to_string(),
        Some(Opcode::PushNull) => "null".to_string(),
        Some(Opcode::PushUndefined) => "undefined".to_string(),
        _ => "undefined".to_string(),
    }
}

/// Rust's `f64` `Display` emits the shortest decimal string that parses
/// back to the exact same bit pattern, which is exactly what a round-trip
/// requirement asks for.
pub fn format_double(value: f64) -> String {
    if value == value.trunc() && value.is_finite() && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// `(left OP right)` for canonical operand order, `(right OP left)` for a
/// handler recorded as swapped in `SwappedOpcodes`.
pub fn binary_expr(opcode: Opcode, swapped: bool, left: String, right: String) -> String {
    let op = opcode.operator_str().unwrap_or("?");
    if swapped {
        format!("({} {} {})", right, op, left)
    } else {
        format!("({} {} {})", left, op, right)
    }
}

/// Pop two operands for a binary opcode, applying the per-operator
/// underflow default, and return `(left, right, underflowed)`.
pub fn pop_binary_operands(opcode: Opcode, stack: &mut SymbolicStack) -> (String, String, bool) {
    let default = match opcode {
        Opcode::In => default_for::IN_RIGHT,
        Opcode::InstanceOf => default_for::INSTANCEOF_RIGHT,
        _ => default_for::ARITHMETIC,
    };
    let (right, underflow_r) = stack.pop_or(default);
    let default_left = match opcode {
        Opcode::In => default_for::IN_LEFT,
        Opcode::InstanceOf => default_for::INSTANCEOF_LEFT,
        _ => default_for::ARITHMETIC,
    };
    let (left, underflow_l) = stack.pop_or(default_left);
    (left, right, underflow_l || underflow_r)
}

/// `+x`, `-x`, `!x`, `~x`, `typeof x`, `void x`.
pub fn unary_expr(opcode: Opcode, operand: String) -> String {
    match opcode {
        Opcode::UnaryPlus => format!("(+{})", operand),
        Opcode::UnaryMinus => format!("(-{})", operand),
        Opcode::UnaryNot => format!("(!{})", operand),
        Opcode::UnaryBitNot => format!("(~{})", operand),
        Opcode::Typeof => format!("(typeof {})", operand),
        Opcode::Void => format!("(void {})", operand),
        _ => operand,
    }
}

/// `obj.key` when `key` is a safe bare identifier literal, `obj[key]`
/// otherwise. `key` is the already-lifted expression text for the property
/// key, which may itself be a quoted string literal or an arbitrary
/// sub-expression.
pub fn property_access(object: &str, key: &str) -> String {
    if let Some(identifier) = string_literal_identifier(key) {
        format!("{}.{}", object, identifier)
    } else {
        format!("{}[{}]", object, key)
    }
}

/// If `key` renders as a quoted string literal whose contents are a safe
/// bare identifier, return the bare identifier.
fn string_literal_identifier(key: &str) -> Option<&str> {
    let inner = key.strip_prefix('"')?.strip_suffix('"')?;
    SAFE_IDENTIFIER.is_match(inner).then_some(inner)
}

/// `key` for an object-literal entry: bare (`name: value`) when it's a safe
/// identifier literal, computed (`[expr]: value`) otherwise.
pub fn object_literal_key(key: &str) -> String {
    match string_literal_identifier(key) {
        Some(ident) => ident.to_string(),
        None => format!("[{}]", key),
    }
}

/// Pop `argc` call arguments and restore the order the compiler originally
/// pushed them in. The interpreter pops one-by-one in LIFO order, which is
/// the reverse of source order; `pop_n_in_push_order` un-reverses that so
/// the emitted call reads `f(a, b, c)` rather than `f(c, b, a)` (spec.md
/// §4.7, documented explicitly per its "document this explicitly in tests"
/// note).
pub fn pop_n_in_push_order(stack: &mut SymbolicStack, argc: usize) -> Vec<String> {
    let mut args: Vec<String> = (0..argc).map(|_| stack.pop_or(default_for::GENERIC).0).collect();
    args.reverse();
    args
}

pub fn argc_of(instr: &Instruction) -> usize {
    instr
        .args
        .iter()
        .find(|a| a.kind == OperandKind::Argc)
        .and_then(|a| a.as_u32())
        .unwrap_or(0) as usize
}

/// The embedded compound-assign opcode on `ASSIGN_VARIABLE` when
/// `is_op=1`, already translated through the opcode map by the
/// disassembler.
pub fn assign_compound_opcode(instr: &Instruction) -> Option<Opcode> {
    instr.args.iter().find_map(|a| match (&a.kind, &a.value) {
        (OperandKind::AssignOp, OperandValue::OpcodeRef(op)) => *op,
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_round_trips_through_display() {
        let text = format_double(3.25);
        let parsed: f64 = text.parse().unwrap();
        assert_eq!(parsed, 3.25);
    }

    #[test]
    fn integral_double_keeps_a_decimal_point() {
        assert_eq!(format_double(2.0), "2.0");
    }

    #[test]
    fn safe_identifier_key_uses_dotted_form() {
        assert_eq!(property_access("obj", "\"name\""), "obj.name");
    }

    #[test]
    fn unsafe_key_uses_bracketed_form() {
        assert_eq!(property_access("obj", "\"not-safe\""), "obj[\"not-safe\"]");
        assert_eq!(property_access("obj", "i"), "obj[i]");
    }

    #[test]
    fn swapped_binary_reverses_operand_order() {
        assert_eq!(binary_expr(Opcode::Sub, false, "10".into(), "3".into()), "(10 - 3)");
        assert_eq!(binary_expr(Opcode::Sub, true, "10".into(), "3".into()), "(3 - 10)");
    }

    #[test]
    fn call_arguments_restore_push_order() {
        let mut stack = SymbolicStack::new();
        stack.push("a");
        stack.push("b");
        stack.push("c");
        assert_eq!(pop_n_in_push_order(&mut stack, 3), vec!["a", "b", "c"]);
    }
}
