//! # Byte Decoder
//!
//! Reverses the transport encoding wrapped around the bytecode payload:
//! base64 → byte-XOR(`0x80`) → optional decompression. Also senses which
//! of the two wire-format generations produced the payload, since the
//! compression flag byte sits at opposite ends of the buffer in V1 vs V2.

pub mod lz77;

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use flate2::read::ZlibDecoder;

use crate::error::{DecompileError, Diagnostic};
use crate::model::{OpcodeMap, Version};

/// Reverse the transport encoding and detect the wire-format version.
///
/// Returns the decoded (and decompressed) instruction bytes, the detected
/// version, and a diagnostic if version sensing was ambiguous.
pub fn transport_decode(
    raw_text: &str,
    opcode_map: &OpcodeMap,
) -> Result<(Vec<u8>, Version, Option<Diagnostic>), DecompileError> {
    let decoded = BASE64_STANDARD
        .decode(raw_text.trim())
        .map_err(|e| DecompileError::Base64Decode(e.to_string()))?;

    if decoded.is_empty() {
        return Err(DecompileError::XorTableSizeMismatch);
    }

    let xored: Vec<u8> = decoded.into_iter().map(|b| b ^ 0x80).collect();

    let (version, flag, payload, diagnostic) = sense_version(&xored, opcode_map);

    let bytes = match flag {
        0 => payload.to_vec(),
        _ => match version {
            Version::V1Legacy => inflate_zlib(payload)?,
            Version::V2Current => lz77::decompress(payload),
        },
    };

    Ok((bytes, version, diagnostic))
}

/// Apply the "plausible opcode-start" heuristic to both candidate layouts
/// and pick a version. Both candidates plausible, or neither, counts as
/// ambiguous: fall back to V1 and record a diagnostic either way, since both
/// cases mean the heuristic could not confidently pick a winner.
fn sense_version<'a>(
    xored: &'a [u8],
    opcode_map: &OpcodeMap,
) -> (Version, u8, &'a [u8], Option<Diagnostic>) {
    let v2_candidate = xored.last().copied().filter(|&b| b == 0 || b == 1).map(|flag| {
        let payload = &xored[..xored.len() - 1];
        (flag, payload, plausible_opcode_start(payload, opcode_map))
    });
    let v1_candidate = xored.first().copied().filter(|&b| b == 0 || b == 1).map(|flag| {
        let payload = &xored[1..];
        (flag, payload, plausible_opcode_start(payload, opcode_map))
    });

    let v2_plausible = v2_candidate.is_some_and(|(_, _, ok)| ok);
    let v1_plausible = v1_candidate.is_some_and(|(_, _, ok)| ok);

    match (v2_plausible, v1_plausible) {
        (true, false) => {
            let (flag, payload, _) = v2_candidate.unwrap();
            (Version::V2Current, flag, payload, None)
        }
        (false, true) => {
            let (flag, payload, _) = v1_candidate.unwrap();
            (Version::V1Legacy, flag, payload, None)
        }
        (true, true) => {
            let (flag, payload, _) = v1_candidate.unwrap();
            (Version::V1Legacy, flag, payload, Some(Diagnostic::VersionAmbiguous))
        }
        (false, false) => {
            // Neither candidate looked like a plausible opcode stream.
            // Fall back to whichever candidate layout is available, V1 first.
            let (flag, payload) = v1_candidate
                .map(|(flag, payload, _)| (flag, payload))
                .or_else(|| v2_candidate.map(|(flag, payload, _)| (flag, payload)))
                .unwrap_or((0, xored));
            (Version::V1Legacy, flag, payload, Some(Diagnostic::VersionAmbiguous))
        }
    }
}

/// First byte must be a known opcode, and at least 30% of the first twenty
/// bytes must fall inside the raw-opcode range the fingerprinter actually
/// populated. A heuristic for picking a version, nothing more — the
/// disassembler is the authority once a version is chosen.
fn plausible_opcode_start(payload: &[u8], opcode_map: &OpcodeMap) -> bool {
    if opcode_map.is_empty() || payload.is_empty() {
        return false;
    }
    if opcode_map.canonical(payload[0] as u32).is_none() {
        return false;
    }

    let max_raw = opcode_map.iter().map(|(raw, _)| raw).max().unwrap_or(0);
    let window = &payload[..payload.len().min(20)];
    let in_range = window.iter().filter(|&&b| (b as u32) <= max_raw).count();
    (in_range as f64) / (window.len() as f64) >= 0.3
}

fn inflate_zlib(compressed: &[u8]) -> Result<Vec<u8>, DecompileError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DecompileError::DecompressionFailed(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Opcode;

    fn sample_map() -> OpcodeMap {
        let mut map = OpcodeMap::new();
        map.insert(0, Opcode::PushInt);
        map.insert(1, Opcode::Add);
        map.insert(2, Opcode::Return);
        map
    }

    #[test]
    fn v1_layout_detected_from_leading_flag_byte() {
        let map = sample_map();
        // Pre-XOR bytes: [0x00 flag=raw][0x00 0x01 0x02 ... body].
        let pre_xor: Vec<u8> = vec![0x00, 0x00, 0x01, 0x02];
        let xored: Vec<u8> = pre_xor.iter().map(|b| b ^ 0x80).collect();
        let raw_text = BASE64_STANDARD.encode(xored);
        let (bytes, version, diag) = transport_decode(&raw_text, &map).unwrap();
        assert_eq!(version, Version::V1Legacy);
        assert_eq!(bytes, vec![0x00, 0x01, 0x02]);
        assert!(diag.is_none());
    }

    #[test]
    fn empty_payload_is_a_fatal_error() {
        let map = sample_map();
        let raw_text = BASE64_STANDARD.encode(Vec::<u8>::new());
        assert!(matches!(
            transport_decode(&raw_text, &map),
            Err(DecompileError::XorTableSizeMismatch)
        ));
    }

    #[test]
    fn malformed_base64_is_a_fatal_error() {
        let map = sample_map();
        assert!(matches!(
            transport_decode("not valid base64 !!", &map),
            Err(DecompileError::Base64Decode(_))
        ));
    }
}
