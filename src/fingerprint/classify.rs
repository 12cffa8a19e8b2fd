//! # Classification Cascade
//!
//! Maps a [`FeatureVector`] to a canonical [`Opcode`] through an ordered
//! list of `(predicate, opcode)` rules, evaluated top to bottom. Priority is
//! lexical-specificity first — debugger, then string push, then boolean
//! push, then int push, then double push, and so on through the narrowest
//! special-purpose shapes — before falling back to generic arithmetic /
//! comparison / bitwise disambiguation by operator-set membership. Encoding
//! the cascade as data (a `Vec`, not a `match`) means each rule's predicate
//! can be unit-tested in isolation.

use crate::model::Opcode;

use super::features::FeatureVector;

type Predicate = fn(&FeatureVector) -> bool;

/// One cascade entry: if `predicate` matches, classification stops here.
pub struct Rule {
    pub opcode: Opcode,
    pub predicate: Predicate,
}

/// The full cascade, most specific first. `classify` walks this in order
/// and returns the first match.
pub fn cascade() -> Vec<Rule> {
    vec![
        Rule {
            opcode: Opcode::Debugger,
            predicate: |f| f.has_debugger,
        },
        Rule {
            opcode: Opcode::PushString,
            predicate: |f| f.reads_string_table && f.push_calls > 0 && f.pop_calls == 0,
        },
        Rule {
            opcode: Opcode::PushBool,
            predicate: |f| {
                f.push_calls > 0
                    && f.pop_calls == 0
                    && !f.reads_string_table
                    && !f.has_double_read_idiom
                    && f.reads_byte
                    && !f.reads_dword
            },
        },
        Rule {
            opcode: Opcode::PushInt,
            predicate: |f| {
                f.push_calls > 0
                    && f.pop_calls == 0
                    && f.reads_dword
                    && !f.reads_string_table
                    && !f.has_double_read_idiom
            },
        },
        Rule {
            opcode: Opcode::PushDouble,
            predicate: |f| f.push_calls > 0 && f.pop_calls == 0 && f.has_double_read_idiom,
        },
        Rule {
            opcode: Opcode::PushNull,
            predicate: |f| {
                f.push_calls > 0
                    && f.pop_calls == 0
                    && !f.reads_byte
                    && !f.reads_dword
                    && !f.reads_string_table
                    && !f.has_double_read_idiom
                    && f.statement_count <= 1
            },
        },
        Rule {
            opcode: Opcode::Duplicate,
            predicate: |f| f.push_calls > 0 && f.pop_calls > 0 && f.statement_count <= 2 && !f.has_assignment,
        },
        Rule {
            opcode: Opcode::Pop,
            predicate: |f| f.pop_calls > 0 && f.push_calls == 0 && !f.has_update && !f.has_assignment,
        },
        Rule {
            opcode: Opcode::Throw,
            predicate: |f| f.has_throw,
        },
        Rule {
            opcode: Opcode::BuildFunction,
            predicate: |f| f.has_nested_function_literal && (f.has_try_finally || f.has_array_from),
        },
        Rule {
            opcode: Opcode::BuildRegexp,
            predicate: |f| f.uses_new && f.pop_calls >= 1 && f.reads_byte,
        },
        Rule {
            opcode: Opcode::BuildArray,
            predicate: |f| f.has_array_literal || (f.has_array_from && !f.has_nested_function_literal),
        },
        Rule {
            opcode: Opcode::BuildObject,
            predicate: |f| f.has_object_literal,
        },
        Rule {
            opcode: Opcode::Construct,
            predicate: |f| f.uses_new && !f.reads_byte,
        },
        Rule {
            opcode: Opcode::CallMethod,
            predicate: |f| f.uses_apply && f.accesses_this_ref,
        },
        Rule {
            opcode: Opcode::CallFunction,
            predicate: |f| f.uses_apply && !f.accesses_this_ref,
        },
        Rule {
            opcode: Opcode::CallValue,
            predicate: |f| f.pop_calls >= 1 && f.push_calls == 1 && f.uses_apply,
        },
        Rule {
            opcode: Opcode::LoadThis,
            predicate: |f| f.accesses_this_ref && f.push_calls > 0 && f.pop_calls == 0,
        },
        Rule {
            opcode: Opcode::LoadArguments,
            predicate: |f| f.accesses_arguments && f.push_calls > 0 && f.pop_calls == 0 && !f.reads_dword,
        },
        Rule {
            opcode: Opcode::LoadArgument,
            predicate: |f| f.accesses_arguments && f.reads_dword && f.push_calls > 0,
        },
        Rule {
            opcode: Opcode::LoadGlobalProperty,
            predicate: |f| f.accesses_global && f.reads_string_table,
        },
        Rule {
            opcode: Opcode::LoadGlobal,
            predicate: |f| f.accesses_global && !f.reads_string_table,
        },
        Rule {
            opcode: Opcode::IncVar,
            predicate: |f| f.has_update && f.accesses_scopes && !f.double_bracket_scope_access,
        },
        Rule {
            opcode: Opcode::IncProp,
            predicate: |f| f.has_update && f.computed_member_accesses > 0,
        },
        Rule {
            opcode: Opcode::AssignVar,
            predicate: |f| {
                (f.has_assignment || f.has_nullish_assign)
                    && f.accesses_scopes
                    && f.double_bracket_scope_access
            },
        },
        Rule {
            opcode: Opcode::StoreVar,
            predicate: |f| f.accesses_scopes && f.pop_calls > 0 && !f.has_assignment,
        },
        Rule {
            opcode: Opcode::LoadVar,
            predicate: |f| f.accesses_scopes && f.push_calls > 0 && f.pop_calls == 0,
        },
        Rule {
            opcode: Opcode::SetProperty,
            predicate: |f| f.computed_member_accesses > 0 && f.pop_calls >= 2,
        },
        Rule {
            opcode: Opcode::GetProperty,
            predicate: |f| f.computed_member_accesses > 0 && f.pop_calls == 1 && f.push_calls == 1,
        },
        Rule {
            opcode: Opcode::TryPush,
            predicate: |f| f.has_try_finally && f.pop_calls == 0 && f.push_calls == 0,
        },
        Rule {
            opcode: Opcode::JumpIfTrue,
            predicate: |f| f.pop_calls == 1 && f.statement_count <= 2 && f.operators.is_empty() && f.push_calls == 0,
        },
        Rule {
            opcode: Opcode::Return,
            predicate: |f| f.statement_count == 0 && f.push_calls == 0 && f.pop_calls <= 1,
        },
        Rule {
            opcode: Opcode::SequencePop,
            predicate: |f| f.pop_calls == 1 && f.push_calls == 0 && f.equals_literal_one,
        },
        Rule {
            opcode: Opcode::InstanceOf,
            predicate: |f| f.operators.contains("instanceof"),
        },
        Rule {
            opcode: Opcode::In,
            predicate: |f| f.operators.contains("in"),
        },
        Rule {
            opcode: Opcode::Typeof,
            predicate: |f| f.operators.contains("typeof"),
        },
        Rule {
            opcode: Opcode::Void,
            predicate: |f| f.operators.contains("void"),
        },
        Rule {
            opcode: Opcode::UnaryNot,
            predicate: |f| f.operators.contains("!") && f.pop_calls == 1,
        },
        Rule {
            opcode: Opcode::UnaryBitNot,
            predicate: |f| f.operators.contains("~"),
        },
        Rule {
            opcode: Opcode::UnaryMinus,
            predicate: |f| f.operators.contains("-") && f.pop_calls == 1 && f.push_calls == 1,
        },
        Rule {
            opcode: Opcode::UnaryPlus,
            predicate: |f| f.operators.contains("+") && f.pop_calls == 1 && f.push_calls == 1,
        },
        Rule {
            opcode: Opcode::StrictEqual,
            predicate: |f| f.operators.contains("==="),
        },
        Rule {
            opcode: Opcode::StrictNotEqual,
            predicate: |f| f.operators.contains("!=="),
        },
        Rule {
            opcode: Opcode::Equal,
            predicate: |f| f.operators.contains("=="),
        },
        Rule {
            opcode: Opcode::NotEqual,
            predicate: |f| f.operators.contains("!="),
        },
        Rule {
            opcode: Opcode::LessEqual,
            predicate: |f| f.operators.contains("<="),
        },
        Rule {
            opcode: Opcode::GreaterEqual,
            predicate: |f| f.operators.contains(">="),
        },
        Rule {
            opcode: Opcode::Less,
            predicate: |f| f.operators.contains("<"),
        },
        Rule {
            opcode: Opcode::Greater,
            predicate: |f| f.operators.contains(">"),
        },
        Rule {
            opcode: Opcode::Ushr,
            predicate: |f| f.operators.contains(">>>"),
        },
        Rule {
            opcode: Opcode::Shr,
            predicate: |f| f.operators.contains(">>"),
        },
        Rule {
            opcode: Opcode::Shl,
            predicate: |f| f.operators.contains("<<"),
        },
        Rule {
            opcode: Opcode::BitAnd,
            predicate: |f| f.operators.contains("&"),
        },
        Rule {
            opcode: Opcode::BitOr,
            predicate: |f| f.operators.contains("|"),
        },
        Rule {
            opcode: Opcode::BitXor,
            predicate: |f| f.operators.contains("^"),
        },
        Rule {
            opcode: Opcode::Mod,
            predicate: |f| f.operators.contains("%"),
        },
        Rule {
            opcode: Opcode::Mul,
            predicate: |f| f.operators.contains("*"),
        },
        Rule {
            opcode: Opcode::Div,
            predicate: |f| f.operators.contains("/"),
        },
        Rule {
            opcode: Opcode::Sub,
            predicate: |f| f.operators.contains("-"),
        },
        Rule {
            opcode: Opcode::Add,
            predicate: |f| f.operators.contains("+"),
        },
        Rule {
            opcode: Opcode::Jump,
            predicate: |f| f.statement_count <= 1 && f.push_calls == 0 && f.pop_calls == 0,
        },
    ]
}

/// Run the cascade, returning the first matching opcode.
pub fn classify(features: &FeatureVector) -> Option<Opcode> {
    cascade()
        .into_iter()
        .find(|rule| (rule.predicate)(features))
        .map(|rule| rule.opcode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> FeatureVector {
        FeatureVector::default()
    }

    #[test]
    fn debugger_wins_over_everything() {
        let mut f = base();
        f.has_debugger = true;
        f.push_calls = 5;
        assert_eq!(classify(&f), Some(Opcode::Debugger));
    }

    #[test]
    fn string_push_requires_string_table_read() {
        let mut f = base();
        f.reads_string_table = true;
        f.push_calls = 1;
        assert_eq!(classify(&f), Some(Opcode::PushString));
    }

    #[test]
    fn plain_addition_falls_through_to_operator_set() {
        let mut f = base();
        f.pop_calls = 2;
        f.push_calls = 1;
        f.operators.insert("+".into());
        assert_eq!(classify(&f), Some(Opcode::Add));
    }

    #[test]
    fn instanceof_takes_priority_over_generic_arithmetic() {
        let mut f = base();
        f.operators.insert("instanceof".into());
        f.operators.insert("+".into());
        assert_eq!(classify(&f), Some(Opcode::InstanceOf));
    }
}
