//! # vmdecomp
//!
//! Static decompiler for a stack-based bytecode VM obfuscator. Wires the
//! pipeline's subsystems — opcode fingerprinter, transport/string
//! decoders, disassembler, control-flow graph, dominator analysis, region
//! recognizer, symbolic stack lifter — behind one entry point, [`decompile`].
//!
//! The pipeline never aborts partway because one instruction, one region,
//! or one opcode couldn't be resolved: anything short of a malformed
//! transport envelope or a missing opcode map degrades to a [`Diagnostic`]
//! collected alongside the best-effort source text.

mod cfg;
mod config;
mod decode;
mod disasm;
mod dominators;
mod error;
mod fingerprint;
mod lift;
mod model;
mod region;
mod strings;

pub use config::DecompilerConfig;
pub use error::{DecompileError, Diagnostic};
pub use fingerprint::ast::HandlerNode;
pub use model::{
    Instruction, Opcode, OpcodeMap, Operand, OperandKind, OperandValue, StringTable, SwappedOpcodes, Version,
};

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

/// Everything one `decompile` call needs: the two raw byte artifacts a
/// payload extractor would have produced, either a precomputed opcode
/// mapping or the handler ASTs to fingerprint one, and per-call overrides
/// and formatting knobs.
#[derive(Debug, Clone)]
pub struct DecompileInput {
    /// ASCII bytes of the base64-encoded, XOR-masked bytecode payload.
    pub bytecode: Vec<u8>,
    /// Raw string-table bytes, not base64-wrapped.
    pub string_table: Vec<u8>,
    /// Skip fingerprinting entirely when supplied.
    pub opcode_map: Option<OpcodeMap>,
    /// Synthetic handler subroutine ASTs to fingerprint; required when
    /// `opcode_map` is `None`.
    pub handlers: Option<BTreeMap<u32, HandlerNode>>,
    /// Raw opcode number known, from outside this call, to be `RETURN`;
    /// overrides whatever fingerprinting detects.
    pub return_opcode_override: Option<u32>,
    pub swapped_override: Option<SwappedOpcodes>,
    pub config: DecompilerConfig,
}

#[derive(Debug, Clone)]
pub struct DecompileOutput {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the full pipeline once: fingerprint (if no `opcode_map` was
/// supplied), decode the transport envelope, disassemble, build the
/// control-flow graph and dominators, recognize structured regions, and
/// lift to source text.
#[instrument(skip_all)]
pub fn decompile(input: DecompileInput) -> Result<DecompileOutput, DecompileError> {
    let DecompileInput {
        bytecode,
        string_table,
        opcode_map,
        handlers,
        return_opcode_override,
        swapped_override,
        config,
    } = input;

    if bytecode.is_empty() {
        return Err(DecompileError::MissingBytecode);
    }

    let (opcode_map, return_opcode, swapped) = match opcode_map {
        Some(map) => {
            let return_opcode = return_opcode_override.and_then(|raw| map.canonical(raw));
            (map, return_opcode, swapped_override.unwrap_or_default())
        }
        None => {
            let handlers = handlers.ok_or(DecompileError::MissingOpcodeMap)?;
            let result = fingerprint::fingerprint(&handlers);
            debug!(
                mapped = result.opcode_map.len(),
                total = handlers.len(),
                "fingerprinted opcode map"
            );
            let return_opcode = return_opcode_override
                .and_then(|raw| result.opcode_map.canonical(raw))
                .or(result.return_opcode);
            (result.opcode_map, return_opcode, swapped_override.unwrap_or(result.swapped))
        }
    };

    let raw_text =
        std::str::from_utf8(&bytecode).map_err(|e| DecompileError::Base64Decode(e.to_string()))?;
    let (code, version, version_diag) = decode::transport_decode(raw_text, &opcode_map)?;
    info!(?version, bytes = code.len(), "decoded bytecode payload");

    let string_table = strings::decode_string_table(&string_table);
    debug!(entries = string_table.len(), "decoded string table");

    let disassembler = disasm::Disassembler::new(version, &opcode_map, &string_table, &swapped, return_opcode);
    let instrs = disassembler.disassemble(&code);
    debug!(instructions = instrs.len(), "disassembled instruction stream");

    let mut diagnostics: Vec<Diagnostic> = version_diag.into_iter().collect();
    for instr in &instrs {
        if let Some(message) = &instr.error {
            warn!(addr = instr.addr, %message, "disassembly halted early");
            diagnostics.push(Diagnostic::OperandUnderrun { addr: instr.addr });
        }
    }

    let (source, lift_diagnostics) =
        lift::lift(&instrs, &opcode_map, &string_table, &swapped, return_opcode, version, &config);
    diagnostics.extend(lift_diagnostics);

    Ok(DecompileOutput { source, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use base64::Engine;

    fn opcode_map() -> OpcodeMap {
        let mut map = OpcodeMap::new();
        map.insert(0, Opcode::PushInt);
        map.insert(1, Opcode::Add);
        map.insert(2, Opcode::Return);
        map
    }

    #[test]
    fn missing_bytecode_is_a_fatal_error() {
        let input = DecompileInput {
            bytecode: Vec::new(),
            string_table: Vec::new(),
            opcode_map: Some(opcode_map()),
            handlers: None,
            return_opcode_override: None,
            swapped_override: None,
            config: DecompilerConfig::default(),
        };
        assert!(matches!(decompile(input), Err(DecompileError::MissingBytecode)));
    }

    #[test]
    fn missing_opcode_map_and_handlers_is_a_fatal_error() {
        let raw_text = BASE64_STANDARD.encode(vec![0x80, 0x80]);
        let input = DecompileInput {
            bytecode: raw_text.into_bytes(),
            string_table: Vec::new(),
            opcode_map: None,
            handlers: None,
            return_opcode_override: None,
            swapped_override: None,
            config: DecompilerConfig::default(),
        };
        assert!(matches!(decompile(input), Err(DecompileError::MissingOpcodeMap)));
    }

    #[test]
    fn decompiles_a_minimal_add_and_return() {
        let map = opcode_map();
        // PUSH_INT 1; PUSH_INT 2; ADD; RETURN(true)
        let mut body = vec![0u8];
        body.extend_from_slice(&1i32.to_le_bytes());
        body.push(0);
        body.extend_from_slice(&2i32.to_le_bytes());
        body.push(1); // ADD
        body.push(2); // RETURN
        body.push(1); // has_value = true

        // V1 layout: leading flag byte (0 = uncompressed), no trailing flag.
        let mut pre_xor = vec![0u8];
        pre_xor.extend_from_slice(&body);
        let xored: Vec<u8> = pre_xor.iter().map(|b| b ^ 0x80).collect();
        let raw_text = BASE64_STANDARD.encode(xored);

        let input = DecompileInput {
            bytecode: raw_text.into_bytes(),
            string_table: Vec::new(),
            opcode_map: Some(map),
            handlers: None,
            return_opcode_override: None,
            swapped_override: None,
            config: DecompilerConfig::default(),
        };

        let output = decompile(input).expect("decompile should succeed");
        assert_eq!(output.source, "return (1 + 2);");
        assert!(output.diagnostics.is_empty());
    }
}
