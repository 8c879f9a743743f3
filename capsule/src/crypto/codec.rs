//! # Codec Utilities
//!
//! Base64 transport encoding and secure memory wiping. Every envelope field
//! that crosses a process boundary (ciphertext, nonce, tag, signature) goes
//! through these functions, so they are deliberately strict: malformed input
//! is an error, never a silently empty buffer. A caller that can't tell
//! "decode failed" from "decoded to nothing" will eventually trust garbage.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;
use zeroize::Zeroize;

/// Errors produced while decoding transport fields.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed base64 input")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded length mismatch: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// Encode bytes as standard (non-URL-safe) base64 without line wrapping.
///
/// This is the transport form for every binary envelope field. The output is
/// deterministic and padding is always present — peers must not have to
/// guess which base64 dialect we speak.
pub fn b64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64 into bytes.
///
/// Malformed input (bad characters, bad padding, truncation) is a
/// [`CodecError`], never an empty vector. Downstream length checks still
/// apply — base64 can't know that a nonce must be 12 bytes.
pub fn b64_decode(input: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(input)?)
}

/// Decode base64 into a fixed-size array, rejecting any other length.
///
/// Used for the envelope fields with a known wire size (nonce, tag,
/// signature, public keys). Combining the decode and the length check keeps
/// call sites from forgetting the second half.
pub fn b64_decode_exact<const N: usize>(input: &str) -> Result<[u8; N], CodecError> {
    let bytes = b64_decode(input)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| CodecError::Length {
        expected: N,
        actual,
    })
}

/// Best-effort, optimizer-resistant overwrite of sensitive bytes.
///
/// Call this on any transient symmetric key or shared secret the caller owns
/// once it is no longer needed. A plain `buf.fill(0)` can be elided by the
/// compiler when the buffer is about to be freed; `zeroize` uses volatile
/// writes and a compiler fence so the wipe actually happens.
pub fn secure_zero(buf: &mut [u8]) {
    buf.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let data = b"capsule transport bytes \x00\x01\xfe\xff";
        let encoded = b64_encode(data);
        let decoded = b64_decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn encode_empty() {
        assert_eq!(b64_encode(b""), "");
        assert!(b64_decode("").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_bad_characters() {
        assert!(b64_decode("not!valid@base64#").is_err());
    }

    #[test]
    fn decode_rejects_bad_padding() {
        // "QQ" alone is incomplete without padding under the strict engine.
        assert!(b64_decode("QQ=").is_err());
    }

    #[test]
    fn no_line_wrapping_in_output() {
        let data = vec![0xA5u8; 1024];
        let encoded = b64_encode(&data);
        assert!(!encoded.contains('\n'));
        assert!(!encoded.contains('\r'));
    }

    #[test]
    fn decode_exact_accepts_matching_length() {
        let nonce = [7u8; 12];
        let arr: [u8; 12] = b64_decode_exact(&b64_encode(&nonce)).unwrap();
        assert_eq!(arr, nonce);
    }

    #[test]
    fn decode_exact_rejects_wrong_length() {
        let encoded = b64_encode(&[1u8; 13]);
        let result: Result<[u8; 12], _> = b64_decode_exact(&encoded);
        match result {
            Err(CodecError::Length {
                expected: 12,
                actual: 13,
            }) => {}
            other => panic!("expected Length error, got {:?}", other),
        }
    }

    #[test]
    fn secure_zero_clears_buffer() {
        let mut key = [0xAAu8; 32];
        secure_zero(&mut key);
        assert_eq!(key, [0u8; 32]);
    }
}
