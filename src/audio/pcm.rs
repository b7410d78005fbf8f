use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use thiserror::Error;

/// Errors surfaced while decoding inbound audio payloads.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("PCM payload must contain a multiple of 4 bytes (got {0})")]
    TruncatedPcm(usize),
}

/// Decode a base64 payload of little-endian 32-bit float PCM samples.
pub fn decode_base64_pcm(payload: &str) -> Result<Vec<f32>, DecodeError> {
    let bytes = BASE64_STANDARD.decode(payload)?;
    if bytes.len() % 4 != 0 {
        return Err(DecodeError::TruncatedPcm(bytes.len()));
    }

    let samples = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(samples)
}

/// Encode f32 samples as base64 little-endian PCM, the inverse of
/// [`decode_base64_pcm`]. Used by the client harness.
pub fn encode_base64_pcm(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    BASE64_STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_truncated_payload() {
        // 6 bytes is not a whole number of f32 samples.
        let payload = BASE64_STANDARD.encode([0u8; 6]);
        let err = decode_base64_pcm(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedPcm(6)));
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode_base64_pcm("not!!base64"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn decodes_known_sample_pattern() {
        let samples = [0.0f32, 0.5, -1.0, 0.25];
        let decoded = decode_base64_pcm(&encode_base64_pcm(&samples)).unwrap();
        assert_eq!(decoded, samples);
    }
}
