//! Command-line front end for `vmdecomp`.
//!
//! Accepts a JSON manifest bundling the artifacts a payload extractor would
//! already have pulled out of a target binary: the bytecode blob (base64
//! transport text, exactly as it appeared in the source), the string table
//! (base64-wrapped raw bytes), and either a precomputed opcode map or a
//! synthetic handler-AST set for fingerprinting. This binary never parses
//! obfuscated scripts or locates an embedded interpreter itself — it only
//! wires pre-extracted bytes through the library and prints the resulting
//! source text.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use clap::Parser;
use serde::Deserialize;

use vmdecomp::{
    decompile, DecompileInput, DecompilerConfig, HandlerNode, Opcode, OpcodeMap, SwappedOpcodes,
};

/// Recover readable source from a stack-VM bytecode obfuscator's output.
#[derive(Parser, Debug)]
#[command(name = "vmdecomp", version, about)]
struct Cli {
    /// Path to a JSON manifest describing one payload to decompile.
    manifest: PathBuf,

    /// Indentation width, in spaces, for emitted source.
    #[arg(long, default_value_t = 2)]
    indent_width: usize,

    /// Drop `/* UNKNOWN_n */` placeholder comments for unclassified opcodes.
    #[arg(long)]
    drop_unknown_opcode_comments: bool,

    /// Fail rather than emit `/* unstructured jump to N */` fallback comments.
    #[arg(long)]
    no_structuring_fallback_comments: bool,
}

/// On-disk shape of one manifest file. Mirrors [`DecompileInput`] but with
/// the byte-array fields as transport-friendly text: the bytecode blob is
/// the transport text verbatim (it is itself the base64 envelope the
/// pipeline decodes), while the string table is wrapped in base64 purely as
/// a JSON-safe container for arbitrary bytes.
#[derive(Debug, Deserialize)]
struct Manifest {
    bytecode: String,
    string_table: String,
    #[serde(default)]
    opcode_map: Option<BTreeMap<u32, Opcode>>,
    #[serde(default)]
    handlers: Option<BTreeMap<u32, HandlerNode>>,
    #[serde(default)]
    return_opcode_override: Option<u32>,
    #[serde(default)]
    swapped_override: Option<Vec<u32>>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let manifest_text = match fs::read_to_string(&cli.manifest) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("failed to read manifest {}: {}", cli.manifest.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let manifest: Manifest = match serde_json::from_str(&manifest_text) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("malformed manifest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let string_table = match BASE64_STANDARD.decode(manifest.string_table.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("string_table is not valid base64: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let opcode_map = manifest.opcode_map.map(|entries| {
        let mut map = OpcodeMap::new();
        for (raw, opcode) in entries {
            map.insert(raw, opcode);
        }
        map
    });

    let swapped_override = manifest.swapped_override.map(|raws| {
        let mut swapped = SwappedOpcodes::new();
        for raw in raws {
            swapped.insert(raw);
        }
        swapped
    });

    let input = DecompileInput {
        bytecode: manifest.bytecode.into_bytes(),
        string_table,
        opcode_map,
        handlers: manifest.handlers,
        return_opcode_override: manifest.return_opcode_override,
        swapped_override,
        config: DecompilerConfig {
            indent_width: cli.indent_width,
            keep_unknown_opcode_comments: !cli.drop_unknown_opcode_comments,
            emit_structuring_fallback_comments: !cli.no_structuring_fallback_comments,
        },
    };

    match decompile(input) {
        Ok(output) => {
            println!("{}", output.source);
            for diagnostic in &output.diagnostics {
                tracing::warn!("{}", diagnostic);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("decompile failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
