//! # Nested Function Bodies
//!
//! `BUILD_FUNCTION` carries a length-prefixed, fully self-contained nested
//! instruction stream (its bytes already extracted onto
//! `Instruction::fn_body` by the disassembler). Lifting one re-disassembles
//! it with the same `opcode_map`/`string_table`/`swapped`/`version` as its
//! enclosing body — there is exactly one opcode mapping and wire version per
//! payload, nested functions included, so none of that is re-detected — and
//! recurses through the ordinary region-recognize-then-lift pipeline.
//!
//! Variable naming is the one piece of state a nested function does *not*
//! get its own copy of: `(scope, slot)` pairs are unique across an entire
//! payload, not just within one function body, so the parent's
//! [`VarNaming`] is threaded through rather than reset to empty.

use crate::cfg;
use crate::config::DecompilerConfig;
use crate::disasm::Disassembler;
use crate::dominators;
use crate::error::Diagnostic;
use crate::model::{OpcodeMap, Opcode, StringTable, SwappedOpcodes, Version};
use crate::region;

use super::emit::render_lines;
use super::naming::VarNaming;

/// Lift a nested function body's raw bytes into `function () { ... }`
/// source text.
#[allow(clippy::too_many_arguments)]
pub fn lift_nested(
    body: &[u8],
    opcode_map: &OpcodeMap,
    string_table: &StringTable,
    swapped: &SwappedOpcodes,
    return_opcode: Option<Opcode>,
    version: Version,
    config: &DecompilerConfig,
    naming: &mut VarNaming,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    let disassembler = Disassembler::new(version, opcode_map, string_table, swapped, return_opcode);
    let instrs = disassembler.disassemble(body);

    if instrs.is_empty() {
        return "function () {\n}".to_string();
    }

    let cfg = cfg::build(&instrs);
    let dom = dominators::compute(&cfg);
    let regions = region::recognize(&cfg, &dom, &instrs);

    let (lines, mut nested_diagnostics) = super::lift_range_as_function(
        &instrs, &cfg, &regions, opcode_map, string_table, swapped, return_opcode, version, config, naming,
    );
    diagnostics.append(&mut nested_diagnostics);

    let body_text = render_lines(super::emit::cleanup(lines));
    if body_text.is_empty() {
        "function () {\n}".to_string()
    } else {
        let indented: String = body_text
            .lines()
            .map(|l| format!("  {}\n", l))
            .collect();
        format!("function () {{\n{}}}", indented)
    }
}
