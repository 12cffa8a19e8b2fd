//! # Error Handling for the Decompiler Pipeline
//!
//! This module defines the **fatal error type** and the **non-fatal
//! diagnostic type** used throughout the decompiler core.
//!
//! ## Design
//! - [`DecompileError`] covers the failures that the pipeline cannot recover
//!   from on its own: a missing input artifact, a malformed transport
//!   envelope, or the absence of an opcode map when neither a precomputed map
//!   nor a handler set was supplied. These propagate to the caller via `?`.
//! - [`Diagnostic`] covers everything the spec treats as "best effort":
//!   version-detection ambiguity, a disassembly operand underrun, a lifter
//!   stack underflow, an unrecognized opcode, or a structuring ambiguity that
//!   falls back to unstructured output. These are collected, never
//!   propagated, and returned alongside the decompiled text.
//!
//! This mirrors the spec's error taxonomy one-for-one: taxonomy items 1-2
//! (extraction/transport) become [`DecompileError`] variants; items 3-7
//! (version ambiguity, disassembly/lifter/structuring recoverable failures,
//! unknown opcodes) become [`Diagnostic`] variants.

use thiserror::Error;

/// Fatal errors that abort the current decompile call.
#[derive(Debug, Error)]
pub enum DecompileError {
    /// The bytecode blob was not present in the input.
    #[error("bytecode payload not found")]
    MissingBytecode,

    /// The base64 transport envelope did not decode.
    #[error("base64 decode failed: {0}")]
    Base64Decode(String),

    /// The XOR-masked transport bytes were shorter than the minimum
    /// envelope (a single compression-flag byte).
    #[error("transport byte vector too short to contain a compression flag")]
    XorTableSizeMismatch,

    /// zlib (V1) or the in-house LZ77 scheme (V2) failed to decompress.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Neither a precomputed `OpcodeMap` nor a handler set to fingerprint
    /// was supplied.
    #[error("no opcode map available: supply either `opcode_map` or `handlers`")]
    MissingOpcodeMap,
}

/// Non-fatal conditions recorded during a best-effort decompile.
///
/// The pipeline never aborts because of one of these; it records the
/// diagnostic and keeps going, per the spec's "best effort rather than
/// all-or-nothing" propagation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Both V1 and V2 version heuristics plausibly matched; fell back to V1.
    VersionAmbiguous,
    /// An operand read ran past the end of the decoded byte stream.
    OperandUnderrun { addr: u32 },
    /// The lifter's symbolic stack underflowed while processing an
    /// instruction; an inline comment was emitted at that source point.
    LifterUnderflow { addr: u32, message: String },
    /// A raw opcode number had no entry in the `OpcodeMap`.
    UnknownOpcode { raw: u32 },
    /// A conditional region's merge block could not be determined; the
    /// region was emitted as unstructured label + conditional-goto comments.
    StructuringFallback { block_id: usize },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::VersionAmbiguous => {
                write!(f, "version detection ambiguous, assuming V1_LEGACY")
            }
            Diagnostic::OperandUnderrun { addr } => {
                write!(f, "operand read past end of stream at addr {addr}")
            }
            Diagnostic::LifterUnderflow { addr, message } => {
                write!(f, "stack underflow lifting addr {addr}: {message}")
            }
            Diagnostic::UnknownOpcode { raw } => {
                write!(f, "opcode {raw} has no fingerprinted name")
            }
            Diagnostic::StructuringFallback { block_id } => {
                write!(f, "block {block_id} could not be structured, emitted as goto")
            }
        }
    }
}
