//! Program blob decode/encode (spec §4.3): jump-table length, per-entry byte
//! width, code length, jump table, code, and a bit-packed instruction-start
//! bitmask, in that order.
//!
//! Grounded on `pvm-rust/src/codec/impl_.rs::{decode_blob, encode_blob}` and
//! `pvm-rust/src/parser.rs::PvmParser`, built here on top of `jam_codec`'s
//! natural-number varint rather than re-deriving it.

use jam_codec::{decode_natural, encode_natural, CodecError, Reader, Writer};

#[derive(Debug, Clone)]
pub struct Program {
    pub code: Vec<u8>,
    /// One entry per code byte: 1 if that byte starts an instruction.
    pub bitmask: Vec<u8>,
    pub jump_table: Vec<u32>,
    pub element_size: u8,
}

impl Program {
    /// Decodes a program blob per spec §4.3's wire format. Rejects trailing
    /// bitmask padding bits that aren't zero, per the same section's "padding
    /// bits must be zero" validity rule.
    pub fn decode(blob: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(blob);

        let jump_table_length = decode_natural(&mut r)?;
        let jump_table_length =
            usize::try_from(jump_table_length).map_err(|_| CodecError::LengthOverflow(jump_table_length))?;

        let element_size = r.take_byte()?;

        let code_length = decode_natural(&mut r)?;
        let code_length =
            usize::try_from(code_length).map_err(|_| CodecError::LengthOverflow(code_length))?;

        let mut jump_table = Vec::with_capacity(jump_table_length);
        for _ in 0..jump_table_length {
            let entry = r.take(element_size as usize)?;
            let mut value: u32 = 0;
            for (j, &b) in entry.iter().enumerate() {
                value |= u32::from(b) << (j * 8);
            }
            jump_table.push(value);
        }

        let code = r.take(code_length)?.to_vec();

        let remaining_len = r.remaining();
        let packed = r.take(remaining_len)?;
        let mut bitmask = vec![0u8; code_length];
        let mut bit_index = 0usize;
        for &byte in packed {
            for i in 0..8 {
                if bit_index >= code_length {
                    break;
                }
                bitmask[bit_index] = (byte >> i) & 1;
                bit_index += 1;
            }
            if bit_index >= code_length {
                break;
            }
        }
        if bit_index < code_length {
            return Err(CodecError::ShortRead {
                needed: code_length - bit_index,
                available: 0,
            });
        }
        let consumed_packed_bytes = (code_length + 7) / 8;
        if let Some(&last) = packed.get(consumed_packed_bytes.saturating_sub(1)) {
            let used_bits = code_length - (consumed_packed_bytes - 1) * 8;
            if used_bits < 8 && (last >> used_bits) != 0 {
                return Err(CodecError::NonCanonicalOrder(consumed_packed_bytes - 1));
            }
        }

        Ok(Self {
            code,
            bitmask,
            jump_table,
            element_size,
        })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        encode_natural(self.jump_table.len() as u64, &mut w);
        w.push_byte(self.element_size);
        encode_natural(self.code.len() as u64, &mut w);
        for &entry in &self.jump_table {
            for i in 0..self.element_size {
                w.push_byte((entry >> (i * 8)) as u8);
            }
        }
        w.push_bytes(&self.code);
        let packed_len = (self.code.len() + 7) / 8;
        let mut packed = vec![0u8; packed_len];
        for (i, &bit) in self.bitmask.iter().enumerate() {
            if bit != 0 {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        w.push_bytes(&packed);
        w.into_bytes()
    }

    /// `Fskip(i)`: the distance from instruction `i` to the next
    /// instruction-start bit, capped at 24 per spec §4.3.
    #[must_use]
    pub fn skip(&self, instruction_index: usize) -> i32 {
        crate::operands::skip_distance(instruction_index, &self.bitmask)
    }

    #[must_use]
    pub fn is_instruction_start(&self, pc: u32) -> bool {
        (pc as usize) < self.bitmask.len() && self.bitmask[pc as usize] == 1
    }

    #[must_use]
    pub fn opcode_at(&self, pc: u32) -> Option<u8> {
        self.code.get(pc as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_program_decodes() {
        let blob = vec![0u8, 0, 0];
        let program = Program::decode(&blob).unwrap();
        assert!(program.code.is_empty());
        assert!(program.jump_table.is_empty());
    }

    #[test]
    fn round_trips_single_instruction() {
        let program = Program {
            code: vec![8, 7, 9],
            bitmask: vec![1, 0, 0],
            jump_table: vec![],
            element_size: 0,
        };
        let blob = program.encode();
        let decoded = Program::decode(&blob).unwrap();
        assert_eq!(decoded.code, program.code);
        assert_eq!(decoded.bitmask, program.bitmask);
    }

    #[test]
    fn rejects_truncated_code() {
        let mut w = Writer::new();
        encode_natural(0, &mut w);
        w.push_byte(0);
        encode_natural(10, &mut w);
        let blob = w.into_bytes();
        assert!(Program::decode(&blob).is_err());
    }
}
