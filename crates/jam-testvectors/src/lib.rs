//! Test-vector file format (spec §6, §8): one file holds a concatenation of
//! codec-encoded records — an extrinsic/input, the pre-state, an optional
//! expected output, and the post-state — in that fixed order. Decoding is
//! parameterized over the three payload shapes so each `jam-stf` subsystem
//! can reuse the same framing without this crate knowing their field
//! layouts.

use std::fs;
use std::path::Path;

use jam_codec::{decode_option, CodecError, Reader, Result, Writer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVectorCase<I, O, S> {
    pub input: I,
    pub pre_state: S,
    pub output: Option<O>,
    pub post_state: S,
}

#[derive(Debug, Error)]
pub enum TestVectorError {
    #[error("codec error decoding test vector: {0}")]
    Codec(#[from] CodecError),
    #[error("failed to read test vector file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Decodes one `TestVectorCase` from `bytes`, given a decoder for each of
/// the three payload shapes. Returns an error if trailing bytes remain
/// after the fixed four-field sequence (codec convention: every record is
/// exactly as long as its fields, no padding).
pub fn decode_test_vector<I, O, S>(
    bytes: &[u8],
    decode_input: impl FnOnce(&mut Reader<'_>) -> Result<I>,
    decode_output: impl FnOnce(&mut Reader<'_>) -> Result<O>,
    decode_state: impl Fn(&mut Reader<'_>) -> Result<S>,
) -> Result<TestVectorCase<I, O, S>> {
    let mut r = Reader::new(bytes);
    let input = decode_input(&mut r)?;
    let pre_state = decode_state(&mut r)?;
    let output = decode_option(&mut r, decode_output)?;
    let post_state = decode_state(&mut r)?;
    r.finish()?;
    Ok(TestVectorCase {
        input,
        pre_state,
        output,
        post_state,
    })
}

/// Encodes a `TestVectorCase` back into the same four-field sequence, given
/// an encoder for each payload shape. Used by harnesses that generate
/// vectors rather than only consuming them.
pub fn encode_test_vector<I, O, S>(
    case: &TestVectorCase<I, O, S>,
    encode_input: impl FnOnce(&I, &mut Writer),
    encode_output: impl FnOnce(&O, &mut Writer),
    encode_state: impl Fn(&S, &mut Writer),
) -> Vec<u8> {
    let mut w = Writer::new();
    encode_input(&case.input, &mut w);
    encode_state(&case.pre_state, &mut w);
    jam_codec::encode_option(&case.output, &mut w, encode_output);
    encode_state(&case.post_state, &mut w);
    w.into_bytes()
}

/// Reads and decodes a test-vector file from disk.
pub fn load_test_vector<I, O, S>(
    path: impl AsRef<Path>,
    decode_input: impl FnOnce(&mut Reader<'_>) -> Result<I>,
    decode_output: impl FnOnce(&mut Reader<'_>) -> Result<O>,
    decode_state: impl Fn(&mut Reader<'_>) -> Result<S>,
) -> std::result::Result<TestVectorCase<I, O, S>, TestVectorError> {
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref).map_err(|source| TestVectorError::Io {
        path: path_ref.display().to_string(),
        source,
    })?;
    Ok(decode_test_vector(&bytes, decode_input, decode_output, decode_state)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_codec::{decode_fixed_u32, encode_fixed_u32};

    #[test]
    fn round_trips_through_encode_decode() {
        let case = TestVectorCase {
            input: 7u32,
            pre_state: 1u32,
            output: Some(42u32),
            post_state: 2u32,
        };
        let bytes = encode_test_vector(&case, encode_fixed_u32, encode_fixed_u32, encode_fixed_u32);
        let decoded = decode_test_vector(&bytes, decode_fixed_u32, decode_fixed_u32, decode_fixed_u32).unwrap();
        assert_eq!(decoded, case);
    }

    #[test]
    fn absent_output_round_trips_as_none() {
        let case: TestVectorCase<u32, u32, u32> = TestVectorCase {
            input: 1,
            pre_state: 2,
            output: None,
            post_state: 3,
        };
        let bytes = encode_test_vector(&case, encode_fixed_u32, encode_fixed_u32, encode_fixed_u32);
        let decoded = decode_test_vector(&bytes, decode_fixed_u32, decode_fixed_u32, decode_fixed_u32).unwrap();
        assert_eq!(decoded, case);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let case = TestVectorCase {
            input: 1u32,
            pre_state: 2u32,
            output: None::<u32>,
            post_state: 3u32,
        };
        let mut bytes = encode_test_vector(&case, encode_fixed_u32, encode_fixed_u32, encode_fixed_u32);
        bytes.push(0xff);
        let err = decode_test_vector(&bytes, decode_fixed_u32, decode_fixed_u32, decode_fixed_u32).unwrap_err();
        assert!(matches!(err, CodecError::TrailingBytes { .. }));
    }
}
