//! # Decompiler Configuration
//!
//! Small, `Default`-constructible knobs that shape output formatting and
//! fallback behavior without touching the pipeline's actual decoding
//! semantics — the wire format, opcode schema, and region-recognition rules
//! are fixed by the spec, not configurable.

/// Tunables for one `decompile` call.
#[derive(Debug, Clone)]
pub struct DecompilerConfig {
    /// Spaces per indentation level in emitted source.
    pub indent_width: usize,
    /// Keep `/* UNKNOWN_<n> */`-style placeholder comments for opcodes the
    /// fingerprinter never classified. When `false`, the instruction is
    /// silently dropped from the output (still recorded as a
    /// [`crate::error::Diagnostic::UnknownOpcode`] either way).
    pub keep_unknown_opcode_comments: bool,
    /// When a conditional region's merge block can't be determined, fall
    /// back to unstructured `/* unstructured jump to N */` comments rather
    /// than aborting the decompile (spec.md §7 item 7). There is no other
    /// mode; this flag exists so callers can opt out of the comments in
    /// contexts that post-process the output (e.g. diffing two
    /// decompiles), not so the pipeline can fail hard instead.
    pub emit_structuring_fallback_comments: bool,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        DecompilerConfig {
            indent_width: 2,
            keep_unknown_opcode_comments: true,
            emit_structuring_fallback_comments: true,
        }
    }
}
