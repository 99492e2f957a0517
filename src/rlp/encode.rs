//! RLP encoder.
//!
//! Lists are framed payload-first: item bytes are produced into a scratch
//! encoder, then the header is emitted once the payload length is known.

use primitive_types::{H256, U256};

use crate::types::Address;

/// Appends RLP items to an output buffer.
#[derive(Clone, Debug, Default)]
pub struct RlpEncoder {
    out: Vec<u8>,
}

impl RlpEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows the encoded output.
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Consumes the encoder, yielding the encoded output.
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// Discards everything encoded so far.
    pub fn clear(&mut self) {
        self.out.clear();
    }

    /// Emits a string or list header. `short_base` tags payloads under 56
    /// bytes; longer payloads get `long_base` plus big-endian length digits.
    fn write_header(&mut self, short_base: u8, long_base: u8, payload_len: usize) {
        if payload_len < 56 {
            self.out.push(short_base + payload_len as u8);
        } else {
            let digits = payload_len.to_be_bytes();
            let lead = digits.iter().position(|d| *d != 0).unwrap_or(digits.len() - 1);
            self.out.push(long_base + (digits.len() - lead) as u8);
            self.out.extend_from_slice(&digits[lead..]);
        }
    }

    /// Encodes a byte string.
    pub fn encode_bytes(&mut self, bytes: &[u8]) {
        match bytes {
            // A lone byte below 0x80 is its own encoding
            [b] if *b < 0x80 => self.out.push(*b),
            _ => {
                self.write_header(0x80, 0xb7, bytes.len());
                self.out.extend_from_slice(bytes);
            }
        }
    }

    /// Encodes the empty string (also the canonical zero scalar).
    pub fn encode_empty(&mut self) {
        self.out.push(0x80);
    }

    /// Appends pre-encoded RLP data without re-framing it.
    pub fn encode_raw(&mut self, raw: &[u8]) {
        self.out.extend_from_slice(raw);
    }

    /// Encodes a list whose items are produced by the closure.
    pub fn encode_list<F>(&mut self, items: F)
    where
        F: FnOnce(&mut Self),
    {
        let mut payload = RlpEncoder::new();
        items(&mut payload);
        self.write_header(0xc0, 0xf7, payload.out.len());
        self.out.append(&mut payload.out);
    }

    /// Encodes a u64 scalar: big-endian digits, no leading zeros, the
    /// empty string for zero.
    pub fn encode_u64(&mut self, value: u64) {
        let digits = value.to_be_bytes();
        match digits.iter().position(|d| *d != 0) {
            Some(lead) => self.encode_bytes(&digits[lead..]),
            None => self.encode_empty(),
        }
    }

    /// Encodes a U256 scalar in the same canonical form.
    pub fn encode_u256(&mut self, value: &U256) {
        let digits = value.to_big_endian();
        match digits.iter().position(|d| *d != 0) {
            Some(lead) => self.encode_bytes(&digits[lead..]),
            None => self.encode_empty(),
        }
    }

    /// Encodes a 20-byte address.
    pub fn encode_address(&mut self, address: &Address) {
        self.encode_bytes(address.as_bytes());
    }

    /// Encodes a 32-byte hash as a string (all bytes kept).
    pub fn encode_h256(&mut self, hash: &H256) {
        self.encode_bytes(hash.as_bytes());
    }

    /// Hex-prefix encodes a nibble path.
    ///
    /// The flag nibble carries the leaf bit and the parity bit; an odd path
    /// shares the flag byte with its first nibble, an even path pads with
    /// zero. The packed form is then framed as an ordinary byte string.
    pub fn encode_nibbles(&mut self, nibbles: &[u8], is_leaf: bool) {
        let odd = nibbles.len() % 2;
        let flag = if is_leaf { 0x2 } else { 0x0 } | odd as u8;

        let mut packed = Vec::with_capacity(1 + nibbles.len() / 2);
        let rest = if odd == 1 {
            packed.push(flag << 4 | nibbles[0]);
            &nibbles[1..]
        } else {
            packed.push(flag << 4);
            nibbles
        };
        for pair in rest.chunks_exact(2) {
            packed.push(pair[0] << 4 | pair[1]);
        }

        self.encode_bytes(&packed);
    }
}
