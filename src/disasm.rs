//! # Disassembler
//!
//! Streams the decoded byte vector into an ordered [`Instruction`] list.
//! Operand shapes are table-driven via [`crate::model::operand_schema`];
//! the handful of instructions whose layout depends on a value read
//! earlier in the same instruction (`ASSIGN_VAR`'s conditional compound-op
//! byte, `BUILD_FUNCTION`'s length-prefixed nested body) are decoded
//! explicitly rather than through the static table.

use crate::model::{
    operand_schema, Instruction, Opcode, OpcodeMap, Operand, OperandKind, OperandValue,
    StringTable, SwappedOpcodes, Version,
};

/// Holds everything needed to decode one payload's instruction stream:
/// the wire version and the three read-only artifacts the fingerprinter
/// produced. Constructed once per payload; reused unchanged for every
/// nested `BUILD_FUNCTION` body.
pub struct Disassembler<'a> {
    version: Version,
    opcode_map: &'a OpcodeMap,
    string_table: &'a StringTable,
    swapped: &'a SwappedOpcodes,
    return_opcode: Option<Opcode>,
}

impl<'a> Disassembler<'a> {
    pub fn new(
        version: Version,
        opcode_map: &'a OpcodeMap,
        string_table: &'a StringTable,
        swapped: &'a SwappedOpcodes,
        return_opcode: Option<Opcode>,
    ) -> Self {
        Disassembler {
            version,
            opcode_map,
            string_table,
            swapped,
            return_opcode,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn return_opcode(&self) -> Option<Opcode> {
        self.return_opcode
    }

    /// Decode `code` into a linear instruction stream. An operand read past
    /// end-of-stream annotates the failing instruction with `error` and
    /// halts decoding of this body; every instruction decoded before it
    /// remains in the returned vector.
    pub fn disassemble(&self, code: &[u8]) -> Vec<Instruction> {
        let mut out = Vec::new();
        let mut pointer = 0usize;

        while pointer < code.len() {
            let addr = pointer as u32;
            let raw_opcode = code[pointer] as u32;
            pointer += 1;

            let opcode = self.opcode_map.canonical(raw_opcode);
            let op_name = opcode
                .map(|op| op.to_string())
                .unwrap_or_else(|| format!("UNKNOWN_{raw_opcode}"));

            let mut instr = Instruction {
                addr,
                raw_opcode,
                opcode,
                op_name,
                args: Vec::new(),
                swapped: false,
                string_value: None,
                fn_body: None,
                error: None,
            };

            if let Some(op) = opcode {
                if op.is_binary_operator() {
                    instr.swapped = self.swapped.contains(raw_opcode);
                }
                if let Err(message) = self.decode_operands(code, &mut pointer, op, &mut instr) {
                    instr.error = Some(message);
                    out.push(instr);
                    break;
                }
            }

            out.push(instr);
        }

        out
    }

    fn decode_operands(
        &self,
        code: &[u8],
        pointer: &mut usize,
        op: Opcode,
        instr: &mut Instruction,
    ) -> Result<(), String> {
        match op {
            Opcode::AssignVar => {
                let is_op = read_u8(code, pointer)?;
                let scope = read_u32(code, pointer)?;
                let dest = read_u32(code, pointer)?;
                instr.args.push(Operand::u8(OperandKind::IsOp, is_op));
                instr.args.push(Operand::u32(OperandKind::Scope, scope));
                instr.args.push(Operand::u32(OperandKind::Dest, dest));
                if is_op != 0 {
                    let raw_assign_op = read_u8(code, pointer)? as u32;
                    let resolved = self.opcode_map.canonical(raw_assign_op);
                    instr.args.push(Operand {
                        kind: OperandKind::AssignOp,
                        value: OperandValue::OpcodeRef(resolved),
                    });
                }
            }
            Opcode::BuildFunction => {
                let length = read_u32(code, pointer)?;
                instr.args.push(Operand::u32(OperandKind::Length, length));
                let start = *pointer;
                let end = start
                    .checked_add(length as usize)
                    .ok_or_else(|| "BUILD_FUNCTION body length overflowed".to_string())?;
                if end > code.len() {
                    return Err("BUILD_FUNCTION body length runs past end of stream".to_string());
                }
                instr.fn_body = Some(code[start..end].to_vec());
                *pointer = end;
            }
            Opcode::PushString => {
                let index = read_u32(code, pointer)?;
                instr.args.push(Operand::u32(OperandKind::StringIndex, index));
                instr.string_value = self.string_table.get(index).map(str::to_string);
            }
            _ => {
                for kind in operand_schema(op, self.version) {
                    let operand = self.read_operand_kind(code, pointer, kind)?;
                    instr.args.push(operand);
                }
            }
        }

        Ok(())
    }

    fn read_operand_kind(
        &self,
        code: &[u8],
        pointer: &mut usize,
        kind: OperandKind,
    ) -> Result<Operand, String> {
        use OperandKind::*;
        let operand = match kind {
            StringIndex | Dword | Address | Argc | Length | Scope | Dest | CatchAddr | FinallyAddr
            | VarSlot => Operand::u32(kind, read_u32(code, pointer)?),
            SignedDword => Operand::i32(kind, read_i32(code, pointer)?),
            Double => Operand::f64(kind, read_f64(code, pointer)?),
            Boolean | HasValue | HasFlags | Prefix => Operand::bool(kind, read_u8(code, pointer)? != 0),
            IsOp => Operand::u8(kind, read_u8(code, pointer)?),
            AssignOp => unreachable!("ASSIGN_VAR is handled explicitly in decode_operands"),
        };
        Ok(operand)
    }
}

fn read_u8(code: &[u8], pointer: &mut usize) -> Result<u8, String> {
    let byte = *code.get(*pointer).ok_or_else(overrun)?;
    *pointer += 1;
    Ok(byte)
}

fn read_u32(code: &[u8], pointer: &mut usize) -> Result<u32, String> {
    let bytes = read_n::<4>(code, pointer)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_i32(code: &[u8], pointer: &mut usize) -> Result<i32, String> {
    let bytes = read_n::<4>(code, pointer)?;
    Ok(i32::from_le_bytes(bytes))
}

fn read_f64(code: &[u8], pointer: &mut usize) -> Result<f64, String> {
    let bytes = read_n::<8>(code, pointer)?;
    Ok(f64::from_le_bytes(bytes))
}

fn read_n<const N: usize>(code: &[u8], pointer: &mut usize) -> Result<[u8; N], String> {
    if *pointer + N > code.len() {
        return Err(overrun());
    }
    let mut buf = [0u8; N];
    buf.copy_from_slice(&code[*pointer..*pointer + N]);
    *pointer += N;
    Ok(buf)
}

fn overrun() -> String {
    "operand read past end of stream".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OpcodeMap, StringTable, SwappedOpcodes};

    fn basic_map() -> OpcodeMap {
        let mut map = OpcodeMap::new();
        map.insert(0, Opcode::PushInt);
        map.insert(1, Opcode::Add);
        map.insert(2, Opcode::Return);
        map.insert(3, Opcode::JumpIfFalse);
        map
    }

    #[test]
    fn addresses_are_strictly_increasing() {
        let map = basic_map();
        let strings = StringTable::default();
        let swapped = SwappedOpcodes::new();
        let disasm = Disassembler::new(Version::V1Legacy, &map, &strings, &swapped, Some(Opcode::Return));

        // PUSH_INT 1; PUSH_INT 2; ADD; RETURN(false)
        let mut code = vec![0u8];
        code.extend_from_slice(&1i32.to_le_bytes());
        code.push(0);
        code.extend_from_slice(&2i32.to_le_bytes());
        code.push(1); // ADD
        code.push(2); // RETURN
        code.push(0); // has_value = false

        let instrs = disasm.disassemble(&code);
        let addrs: Vec<u32> = instrs.iter().map(|i| i.addr).collect();
        assert!(addrs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(instrs.last().unwrap().opcode, Some(Opcode::Return));
    }

    #[test]
    fn truncated_operand_sets_error_and_halts() {
        let map = basic_map();
        let strings = StringTable::default();
        let swapped = SwappedOpcodes::new();
        let disasm = Disassembler::new(Version::V1Legacy, &map, &strings, &swapped, Some(Opcode::Return));

        // PUSH_INT with only 2 of 4 required bytes.
        let code = vec![0u8, 0x01, 0x02];
        let instrs = disasm.disassemble(&code);
        assert_eq!(instrs.len(), 1);
        assert!(instrs[0].error.is_some());
    }

    #[test]
    fn build_function_extracts_nested_body_without_recursing() {
        let mut map = basic_map();
        map.insert(4, Opcode::BuildFunction);
        let strings = StringTable::default();
        let swapped = SwappedOpcodes::new();
        let disasm = Disassembler::new(Version::V1Legacy, &map, &strings, &swapped, Some(Opcode::Return));

        let mut code = vec![4u8];
        code.extend_from_slice(&3u32.to_le_bytes());
        code.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let instrs = disasm.disassemble(&code);
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].fn_body.as_deref(), Some(&[0xAA, 0xBB, 0xCC][..]));
    }
}
