//! # Shared Data Model for the Decompiler Pipeline
//!
//! This module defines the types every other stage of the pipeline shares:
//! the canonical [`Opcode`] enumeration, the typed [`Operand`] shape that
//! parameterizes it, the decoded [`Instruction`] record, and the three
//! read-only, constructed-once-per-payload artifacts ([`OpcodeMap`],
//! [`StringTable`], [`SwappedOpcodes`]) that flow unchanged from
//! fingerprinting through lifting.
//!
//! ## Design
//! - [`Opcode`] is a fixed, finite enumeration — the obfuscator shuffles the
//!   *numbers* assigned to these operations, never the operation set itself.
//!   Fingerprinting exists to recover the number-to-variant mapping; nothing
//!   downstream ever looks at a raw opcode number again once that mapping is
//!   built.
//! - [`operand_schema`] is the single static lookup table describing how many
//!   operands, of which [`OperandKind`], each opcode carries. It is
//!   parameterized by [`Version`] for the two opcodes whose operand layout
//!   actually changed between wire-format generations ([`Opcode::BuildRegexp`]
//!   and [`Opcode::TryPush`]); every other opcode's schema is
//!   version-independent. `ASSIGN_VAR`'s conditional trailing compound-op
//!   byte and `BUILD_FUNCTION`'s nested body are handled by the disassembler
//!   directly rather than the static schema, since their presence depends on
//!   a *value* read earlier in the same instruction, not on the wire version.
//! - Binary operators additionally carry a `swapped` flag on the decoded
//!   [`Instruction`], looked up from [`SwappedOpcodes`] at disassembly time.
//!   The spec is explicit that this is a derived property, not an operand.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

/// The two supported wire-format generations.
///
/// Propagated explicitly through every call in the pipeline (never stashed
/// in shared/global state) from the outer disassembler down into nested
/// `BUILD_FUNCTION` bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    /// Pre-change: zlib compression, `{catch_addr, finally_addr}` on
    /// `TRY_PUSH`, two string-index operands on `BUILD_REGEXP`, post-test
    /// loop shape.
    V1Legacy,
    /// Post-change: in-house LZ77 compression, `{catch_addr}` only on
    /// `TRY_PUSH`, a single `has_flags` byte on `BUILD_REGEXP` (pattern and
    /// flags taken from the stack at lift time), pre-test loop shape.
    V2Current,
}

/// Canonical, shuffle-proof names for every operation the interpreter can
/// perform. Raw opcode *numbers* are payload-specific and meaningless on
/// their own; [`OpcodeMap`] is the only bridge between a raw number and one
/// of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum Opcode {
    // --- stack pushes ---
    #[serde(rename = "PUSH_STRING")]
    PushString,
    #[serde(rename = "PUSH_INT")]
    PushInt,
    #[serde(rename = "PUSH_DOUBLE")]
    PushDouble,
    #[serde(rename = "PUSH_BOOL")]
    PushBool,
    #[serde(rename = "PUSH_NULL")]
    PushNull,
    #[serde(rename = "PUSH_UNDEFINED")]
    PushUndefined,
    #[serde(rename = "STACK_PUSH_DUPLICATE")]
    Duplicate,
    #[serde(rename = "STACK_POP")]
    Pop,
    // --- binary arithmetic ---
    #[serde(rename = "ADD")]
    Add,
    #[serde(rename = "SUB")]
    Sub,
    #[serde(rename = "MUL")]
    Mul,
    #[serde(rename = "DIV")]
    Div,
    #[serde(rename = "MOD")]
    Mod,
    // --- comparisons ---
    #[serde(rename = "LESS")]
    Less,
    #[serde(rename = "LESS_EQUAL")]
    LessEqual,
    #[serde(rename = "GREATER")]
    Greater,
    #[serde(rename = "GREATER_EQUAL")]
    GreaterEqual,
    #[serde(rename = "EQUAL")]
    Equal,
    #[serde(rename = "STRICT_EQUAL")]
    StrictEqual,
    #[serde(rename = "NOT_EQUAL")]
    NotEqual,
    #[serde(rename = "STRICT_NOT_EQUAL")]
    StrictNotEqual,
    // --- bitwise ---
    #[serde(rename = "SHL")]
    Shl,
    #[serde(rename = "SHR")]
    Shr,
    #[serde(rename = "USHR")]
    Ushr,
    #[serde(rename = "BIT_AND")]
    BitAnd,
    #[serde(rename = "BIT_OR")]
    BitOr,
    #[serde(rename = "BIT_XOR")]
    BitXor,
    // --- in / instanceof ---
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "INSTANCEOF")]
    InstanceOf,
    // --- unary ---
    #[serde(rename = "UNARY_PLUS")]
    UnaryPlus,
    #[serde(rename = "UNARY_MINUS")]
    UnaryMinus,
    #[serde(rename = "UNARY_NOT")]
    UnaryNot,
    #[serde(rename = "UNARY_BIT_NOT")]
    UnaryBitNot,
    #[serde(rename = "TYPEOF")]
    Typeof,
    #[serde(rename = "VOID")]
    Void,
    #[serde(rename = "UNARY_THROW")]
    Throw,
    // --- updates (pre/post ++/--) ---
    #[serde(rename = "INC_VAR")]
    IncVar,
    #[serde(rename = "DEC_VAR")]
    DecVar,
    #[serde(rename = "INC_PROP")]
    IncProp,
    #[serde(rename = "DEC_PROP")]
    DecProp,
    // --- variable load/store/assign ---
    #[serde(rename = "LOAD_VAR")]
    LoadVar,
    #[serde(rename = "STORE_VAR")]
    StoreVar,
    #[serde(rename = "ASSIGN_VAR")]
    AssignVar,
    // --- context loads ---
    #[serde(rename = "LOAD_GLOBAL")]
    LoadGlobal,
    #[serde(rename = "LOAD_GLOBAL_PROPERTY")]
    LoadGlobalProperty,
    #[serde(rename = "LOAD_THIS")]
    LoadThis,
    #[serde(rename = "LOAD_ARGUMENT")]
    LoadArgument,
    #[serde(rename = "LOAD_ARGUMENTS")]
    LoadArguments,
    // --- calls ---
    #[serde(rename = "CALL_FUNCTION")]
    CallFunction,
    #[serde(rename = "CALL_METHOD")]
    CallMethod,
    #[serde(rename = "CALL_VALUE")]
    CallValue,
    #[serde(rename = "CONSTRUCT")]
    Construct,
    // --- property get/set ---
    #[serde(rename = "GET_PROPERTY")]
    GetProperty,
    #[serde(rename = "SET_PROPERTY")]
    SetProperty,
    #[serde(rename = "DELETE_PROPERTY")]
    DeleteProperty,
    // --- builders ---
    #[serde(rename = "BUILD_ARRAY")]
    BuildArray,
    #[serde(rename = "BUILD_OBJECT")]
    BuildObject,
    #[serde(rename = "BUILD_FUNCTION")]
    BuildFunction,
    #[serde(rename = "BUILD_REGEXP")]
    BuildRegexp,
    // --- control transfers ---
    #[serde(rename = "JUMP")]
    Jump,
    #[serde(rename = "JUMP_IF_TRUE")]
    JumpIfTrue,
    #[serde(rename = "JUMP_IF_FALSE")]
    JumpIfFalse,
    // --- return ---
    #[serde(rename = "RETURN")]
    Return,
    // --- debugger ---
    #[serde(rename = "DEBUGGER")]
    Debugger,
    // --- try / catch / finally ---
    #[serde(rename = "TRY_PUSH")]
    TryPush,
    #[serde(rename = "TRY_POP")]
    TryPop,
    #[serde(rename = "TRY_FINALLY")]
    TryFinally,
    // --- sequence-pop (comma operator) ---
    #[serde(rename = "SEQUENCE_POP")]
    SequencePop,
}

impl Opcode {
    /// Every canonical opcode, in declaration order. Used by the
    /// fingerprinter's classification cascade to enumerate candidates and by
    /// tests that want to assert full coverage of `operand_schema`.
    pub const ALL: &'static [Opcode] = &[
        Opcode::PushString,
        Opcode::PushInt,
        Opcode::PushDouble,
        Opcode::PushBool,
        Opcode::PushNull,
        Opcode::PushUndefined,
        Opcode::Duplicate,
        Opcode::Pop,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Less,
        Opcode::LessEqual,
        Opcode::Greater,
        Opcode::GreaterEqual,
        Opcode::Equal,
        Opcode::StrictEqual,
        Opcode::NotEqual,
        Opcode::StrictNotEqual,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::Ushr,
        Opcode::BitAnd,
        Opcode::BitOr,
        Opcode::BitXor,
        Opcode::In,
        Opcode::InstanceOf,
        Opcode::UnaryPlus,
        Opcode::UnaryMinus,
        Opcode::UnaryNot,
        Opcode::UnaryBitNot,
        Opcode::Typeof,
        Opcode::Void,
        Opcode::Throw,
        Opcode::IncVar,
        Opcode::DecVar,
        Opcode::IncProp,
        Opcode::DecProp,
        Opcode::LoadVar,
        Opcode::StoreVar,
        Opcode::AssignVar,
        Opcode::LoadGlobal,
        Opcode::LoadGlobalProperty,
        Opcode::LoadThis,
        Opcode::LoadArgument,
        Opcode::LoadArguments,
        Opcode::CallFunction,
        Opcode::CallMethod,
        Opcode::CallValue,
        Opcode::Construct,
        Opcode::GetProperty,
        Opcode::SetProperty,
        Opcode::DeleteProperty,
        Opcode::BuildArray,
        Opcode::BuildObject,
        Opcode::BuildFunction,
        Opcode::BuildRegexp,
        Opcode::Jump,
        Opcode::JumpIfTrue,
        Opcode::JumpIfFalse,
        Opcode::Return,
        Opcode::Debugger,
        Opcode::TryPush,
        Opcode::TryPop,
        Opcode::TryFinally,
        Opcode::SequencePop,
    ];

    /// `true` for `ADD`/`SUB`/.../comparisons: the binary operators whose
    /// evaluation order can be swapped in a given payload (spec.md
    /// "SwappedOpcodes"). Unary, stack, and control-transfer opcodes are
    /// never swapped.
    pub fn is_binary_operator(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Less
                | Opcode::LessEqual
                | Opcode::Greater
                | Opcode::GreaterEqual
                | Opcode::Equal
                | Opcode::StrictEqual
                | Opcode::NotEqual
                | Opcode::StrictNotEqual
                | Opcode::Shl
                | Opcode::Shr
                | Opcode::Ushr
                | Opcode::BitAnd
                | Opcode::BitOr
                | Opcode::BitXor
                | Opcode::In
                | Opcode::InstanceOf
        )
    }

    /// The source-text operator for a binary opcode, if it is one.
    pub fn operator_str(self) -> Option<&'static str> {
        Some(match self {
            Opcode::Add => "+",
            Opcode::Sub => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::Mod => "%",
            Opcode::Less => "<",
            Opcode::LessEqual => "<=",
            Opcode::Greater => ">",
            Opcode::GreaterEqual => ">=",
            Opcode::Equal => "==",
            Opcode::StrictEqual => "===",
            Opcode::NotEqual => "!=",
            Opcode::StrictNotEqual => "!==",
            Opcode::Shl => "<<",
            Opcode::Shr => ">>",
            Opcode::Ushr => ">>>",
            Opcode::BitAnd => "&",
            Opcode::BitOr => "|",
            Opcode::BitXor => "^",
            Opcode::In => "in",
            Opcode::InstanceOf => "instanceof",
            _ => return None,
        })
    }

    /// `true` for `RETURN`: the one opcode whose canonical identity is
    /// payload-specific (detected from the dispatcher's terminating
    /// comparison rather than classified structurally).
    pub fn is_return(self) -> bool {
        matches!(self, Opcode::Return)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Opcode::PushString => "PUSH_STRING",
            Opcode::PushInt => "PUSH_INT",
            Opcode::PushDouble => "PUSH_DOUBLE",
            Opcode::PushBool => "PUSH_BOOL",
            Opcode::PushNull => "PUSH_NULL",
            Opcode::PushUndefined => "PUSH_UNDEFINED",
            Opcode::Duplicate => "STACK_PUSH_DUPLICATE",
            Opcode::Pop => "STACK_POP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Less => "LESS",
            Opcode::LessEqual => "LESS_EQUAL",
            Opcode::Greater => "GREATER",
            Opcode::GreaterEqual => "GREATER_EQUAL",
            Opcode::Equal => "EQUAL",
            Opcode::StrictEqual => "STRICT_EQUAL",
            Opcode::NotEqual => "NOT_EQUAL",
            Opcode::StrictNotEqual => "STRICT_NOT_EQUAL",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::Ushr => "USHR",
            Opcode::BitAnd => "BIT_AND",
            Opcode::BitOr => "BIT_OR",
            Opcode::BitXor => "BIT_XOR",
            Opcode::In => "IN",
            Opcode::InstanceOf => "INSTANCEOF",
            Opcode::UnaryPlus => "UNARY_PLUS",
            Opcode::UnaryMinus => "UNARY_MINUS",
            Opcode::UnaryNot => "UNARY_NOT",
            Opcode::UnaryBitNot => "UNARY_BIT_NOT",
            Opcode::Typeof => "TYPEOF",
            Opcode::Void => "VOID",
            Opcode::Throw => "UNARY_THROW",
            Opcode::IncVar => "INC_VAR",
            Opcode::DecVar => "DEC_VAR",
            Opcode::IncProp => "INC_PROP",
            Opcode::DecProp => "DEC_PROP",
            Opcode::LoadVar => "LOAD_VAR",
            Opcode::StoreVar => "STORE_VAR",
            Opcode::AssignVar => "ASSIGN_VAR",
            Opcode::LoadGlobal => "LOAD_GLOBAL",
            Opcode::LoadGlobalProperty => "LOAD_GLOBAL_PROPERTY",
            Opcode::LoadThis => "LOAD_THIS",
            Opcode::LoadArgument => "LOAD_ARGUMENT",
            Opcode::LoadArguments => "LOAD_ARGUMENTS",
            Opcode::CallFunction => "CALL_FUNCTION",
            Opcode::CallMethod => "CALL_METHOD",
            Opcode::CallValue => "CALL_VALUE",
            Opcode::Construct => "CONSTRUCT",
            Opcode::GetProperty => "GET_PROPERTY",
            Opcode::SetProperty => "SET_PROPERTY",
            Opcode::DeleteProperty => "DELETE_PROPERTY",
            Opcode::BuildArray => "BUILD_ARRAY",
            Opcode::BuildObject => "BUILD_OBJECT",
            Opcode::BuildFunction => "BUILD_FUNCTION",
            Opcode::BuildRegexp => "BUILD_REGEXP",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfTrue => "JUMP_IF_TRUE",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::Return => "RETURN",
            Opcode::Debugger => "DEBUGGER",
            Opcode::TryPush => "TRY_PUSH",
            Opcode::TryPop => "TRY_POP",
            Opcode::TryFinally => "TRY_FINALLY",
            Opcode::SequencePop => "SEQUENCE_POP",
        };
        f.write_str(name)
    }
}

/// Every kind of typed operand an instruction can carry, exactly the set
/// named in the spec's data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    StringIndex,
    Dword,
    SignedDword,
    Double,
    Boolean,
    Address,
    Argc,
    Length,
    HasValue,
    HasFlags,
    Scope,
    Dest,
    Prefix,
    IsOp,
    AssignOp,
    CatchAddr,
    FinallyAddr,
    VarSlot,
}

/// The concrete payload carried by an [`Operand`].
#[derive(Debug, Clone, PartialEq)]
pub enum OperandValue {
    U32(u32),
    I32(i32),
    F64(f64),
    Bool(bool),
    U8(u8),
    /// The compound-assign opcode embedded in `ASSIGN_VAR` when `is_op=1`,
    /// already translated through the active `OpcodeMap`. `None` if the raw
    /// byte had no entry in the map.
    OpcodeRef(Option<Opcode>),
}

/// One typed operand entry, `{kind, value}` per the spec's data model.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub kind: OperandKind,
    pub value: OperandValue,
}

impl Operand {
    pub fn u32(kind: OperandKind, value: u32) -> Self {
        Operand {
            kind,
            value: OperandValue::U32(value),
        }
    }

    pub fn i32(kind: OperandKind, value: i32) -> Self {
        Operand {
            kind,
            value: OperandValue::I32(value),
        }
    }

    pub fn f64(kind: OperandKind, value: f64) -> Self {
        Operand {
            kind,
            value: OperandValue::F64(value),
        }
    }

    pub fn bool(kind: OperandKind, value: bool) -> Self {
        Operand {
            kind,
            value: OperandValue::Bool(value),
        }
    }

    pub fn u8(kind: OperandKind, value: u8) -> Self {
        Operand {
            kind,
            value: OperandValue::U8(value),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self.value {
            OperandValue::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self.value {
            OperandValue::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            OperandValue::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            OperandValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// An immutable record produced by the disassembler: one decoded
/// instruction. `addr` is a byte offset into the *decoded* stream and also
/// serves as the jump-target identifier used throughout the CFG and region
/// recognizer.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub addr: u32,
    /// Raw shuffled opcode number as it appeared in the payload.
    pub raw_opcode: u32,
    /// Canonical opcode, or `None` if `raw_opcode` had no entry in the
    /// active `OpcodeMap` (disassembles as `UNKNOWN_<n>`).
    pub opcode: Option<Opcode>,
    /// Display name: the canonical mnemonic, or `UNKNOWN_<n>`.
    pub op_name: String,
    pub args: Vec<Operand>,
    /// `true` if this binary operator's operand order is reversed relative
    /// to the canonical pop order (from `SwappedOpcodes`). Always `false`
    /// for non-binary-operator instructions.
    pub swapped: bool,
    /// Decoded string literal, when the instruction is a string push and
    /// the string-table lookup succeeded.
    pub string_value: Option<String>,
    /// Raw bytes of a nested function body (`BUILD_FUNCTION` only).
    pub fn_body: Option<Vec<u8>>,
    /// Set when an operand read ran past the end of the decoded stream;
    /// disassembly of the enclosing body halts immediately after.
    pub error: Option<String>,
}

impl Instruction {
    /// The target address of a jump-shaped instruction (`JUMP`,
    /// `JUMP_IF_TRUE`, `JUMP_IF_FALSE`), if any.
    pub fn jump_target(&self) -> Option<u32> {
        self.args
            .iter()
            .find(|a| a.kind == OperandKind::Address)
            .and_then(|a| a.as_u32())
    }

    pub fn is_jump(&self) -> bool {
        matches!(
            self.opcode,
            Some(Opcode::Jump) | Some(Opcode::JumpIfTrue) | Some(Opcode::JumpIfFalse)
        )
    }

    pub fn is_conditional_jump(&self) -> bool {
        matches!(self.opcode, Some(Opcode::JumpIfTrue) | Some(Opcode::JumpIfFalse))
    }

    pub fn is_return(&self) -> bool {
        matches!(self.opcode, Some(Opcode::Return))
    }
}

/// Bijection between raw opcode numbers and canonical names, built once by
/// the fingerprinter and read-only for the rest of the pipeline. May be
/// partial: opcodes with no entry disassemble as `UNKNOWN_<n>`.
#[derive(Debug, Clone, Default)]
pub struct OpcodeMap {
    forward: BTreeMap<u32, Opcode>,
    reverse: BTreeMap<Opcode, u32>,
}

impl OpcodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping. Later insertions for the same raw number overwrite
    /// earlier ones (the fingerprinter only ever inserts once per number).
    pub fn insert(&mut self, raw: u32, opcode: Opcode) {
        self.forward.insert(raw, opcode);
        self.reverse.insert(opcode, raw);
    }

    pub fn canonical(&self, raw: u32) -> Option<Opcode> {
        self.forward.get(&raw).copied()
    }

    pub fn raw_of(&self, opcode: Opcode) -> Option<u32> {
        self.reverse.get(&opcode).copied()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Opcode)> + '_ {
        self.forward.iter().map(|(&raw, &op)| (raw, op))
    }
}

/// Set of raw opcode numbers whose binary-operator handler evaluates
/// `const n = pop(); push(pop() OP n)` (reversed) instead of the canonical
/// `push(pop() OP pop())`.
#[derive(Debug, Clone, Default)]
pub struct SwappedOpcodes(BTreeSet<u32>);

impl SwappedOpcodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, raw: u32) {
        self.0.insert(raw);
    }

    pub fn contains(&self, raw: u32) -> bool {
        self.0.contains(&raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

/// Ordered vector of strings decoded from the auxiliary byte array.
/// Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct StringTable(Vec<String>);

impl StringTable {
    pub fn new(strings: Vec<String>) -> Self {
        StringTable(strings)
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.0.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The static, per-opcode operand schema: how many operands, of which kind,
/// in what order. `BUILD_REGEXP` and `TRY_PUSH` are the only two entries
/// that depend on `version`; everything else ignores it.
///
/// `ASSIGN_VAR`'s conditional compound-op byte and `BUILD_FUNCTION`'s
/// length-prefixed nested body are intentionally absent here: their
/// presence depends on a value read earlier in the same instruction, so the
/// disassembler decodes them directly rather than through this static
/// table (spec.md 4.3).
pub fn operand_schema(opcode: Opcode, version: Version) -> Vec<OperandKind> {
    use OperandKind::*;
    match opcode {
        Opcode::PushString => vec![StringIndex],
        Opcode::PushInt => vec![SignedDword],
        Opcode::PushDouble => vec![Double],
        Opcode::PushBool => vec![Boolean],
        Opcode::PushNull
        | Opcode::PushUndefined
        | Opcode::Duplicate
        | Opcode::Pop
        | Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod
        | Opcode::Less
        | Opcode::LessEqual
        | Opcode::Greater
        | Opcode::GreaterEqual
        | Opcode::Equal
        | Opcode::StrictEqual
        | Opcode::NotEqual
        | Opcode::StrictNotEqual
        | Opcode::Shl
        | Opcode::Shr
        | Opcode::Ushr
        | Opcode::BitAnd
        | Opcode::BitOr
        | Opcode::BitXor
        | Opcode::In
        | Opcode::InstanceOf
        | Opcode::UnaryPlus
        | Opcode::UnaryMinus
        | Opcode::UnaryNot
        | Opcode::UnaryBitNot
        | Opcode::Typeof
        | Opcode::Void
        | Opcode::Throw => vec![],
        Opcode::IncVar | Opcode::DecVar => vec![Scope, VarSlot, Prefix],
        Opcode::IncProp | Opcode::DecProp => vec![Prefix],
        Opcode::LoadVar | Opcode::StoreVar => vec![Scope, VarSlot],
        Opcode::AssignVar => vec![IsOp, Scope, Dest],
        Opcode::LoadGlobal | Opcode::LoadThis | Opcode::LoadArguments => vec![],
        Opcode::LoadGlobalProperty => vec![StringIndex],
        Opcode::LoadArgument => vec![Dword],
        Opcode::CallFunction | Opcode::CallMethod | Opcode::CallValue | Opcode::Construct => {
            vec![Argc]
        }
        Opcode::GetProperty | Opcode::SetProperty | Opcode::DeleteProperty => vec![],
        Opcode::BuildArray | Opcode::BuildObject => vec![Length],
        Opcode::BuildFunction => vec![Length],
        Opcode::BuildRegexp => match version {
            Version::V1Legacy => vec![StringIndex, StringIndex],
            Version::V2Current => vec![HasFlags],
        },
        Opcode::Jump | Opcode::JumpIfTrue | Opcode::JumpIfFalse => vec![Address],
        Opcode::Return => vec![HasValue],
        Opcode::Debugger | Opcode::TryPop | Opcode::SequencePop => vec![],
        Opcode::TryPush => match version {
            Version::V1Legacy => vec![CatchAddr, FinallyAddr],
            Version::V2Current => vec![CatchAddr],
        },
        Opcode::TryFinally => vec![FinallyAddr],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_schema_covers_every_opcode() {
        for &op in Opcode::ALL {
            // Must not panic for either version.
            let _ = operand_schema(op, Version::V1Legacy);
            let _ = operand_schema(op, Version::V2Current);
        }
    }

    #[test]
    fn build_regexp_schema_differs_by_version() {
        assert_eq!(
            operand_schema(Opcode::BuildRegexp, Version::V1Legacy).len(),
            2
        );
        assert_eq!(
            operand_schema(Opcode::BuildRegexp, Version::V2Current).len(),
            1
        );
    }

    #[test]
    fn try_push_schema_differs_by_version() {
        assert_eq!(operand_schema(Opcode::TryPush, Version::V1Legacy).len(), 2);
        assert_eq!(operand_schema(Opcode::TryPush, Version::V2Current).len(), 1);
    }

    #[test]
    fn opcode_map_is_a_bijection() {
        let mut map = OpcodeMap::new();
        map.insert(42, Opcode::Add);
        assert_eq!(map.canonical(42), Some(Opcode::Add));
        assert_eq!(map.raw_of(Opcode::Add), Some(42));
        assert_eq!(map.canonical(7), None);
    }

    #[test]
    fn binary_operator_classification_excludes_unary_and_control() {
        assert!(Opcode::Add.is_binary_operator());
        assert!(Opcode::InstanceOf.is_binary_operator());
        assert!(!Opcode::UnaryNot.is_binary_operator());
        assert!(!Opcode::Jump.is_binary_operator());
    }
}
