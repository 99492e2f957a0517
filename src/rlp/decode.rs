//! RLP decoder over a borrowed byte slice.

use primitive_types::{H256, U256};
use thiserror::Error;

use crate::types::Address;

/// RLP decoding errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RlpError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("expected a byte string, found a list")]
    ExpectedString,
    #[error("expected a list, found a byte string")]
    ExpectedList,
    #[error("scalar has leading zero bytes")]
    NonCanonical,
    #[error("scalar does not fit the target width")]
    ScalarOverflow,
    #[error("byte string has wrong length: expected {expected}, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("trailing bytes after value")]
    TrailingBytes,
    #[error("invalid length prefix")]
    InvalidPrefix,
}

/// Result type for decoding operations.
pub type Result<T> = std::result::Result<T, RlpError>;

/// Streaming RLP decoder.
///
/// Tracks list boundaries so callers can walk nested lists with
/// `enter_list`/`leave_list`, mirroring the encoder's framing.
pub struct RlpDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    /// End offsets of the lists currently entered, innermost last.
    list_ends: Vec<usize>,
}

impl<'a> RlpDecoder<'a> {
    /// Creates a decoder over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            list_ends: Vec::new(),
        }
    }

    /// Returns true if the decoder has consumed all input.
    pub fn is_done(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns true if the innermost entered list has no items left.
    pub fn is_list_finished(&self) -> bool {
        match self.list_ends.last() {
            Some(end) => self.pos >= *end,
            None => self.is_done(),
        }
    }

    /// Returns true if the next item is a list.
    pub fn next_is_list(&self) -> Result<bool> {
        let prefix = *self.data.get(self.pos).ok_or(RlpError::UnexpectedEof)?;
        Ok(prefix >= 0xc0)
    }

    fn read_length(&mut self, len_of_len: usize) -> Result<usize> {
        if self.pos + len_of_len > self.data.len() {
            return Err(RlpError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len_of_len];
        if bytes.first() == Some(&0) {
            return Err(RlpError::NonCanonical);
        }
        self.pos += len_of_len;
        let mut len = 0usize;
        for b in bytes {
            len = len.checked_mul(256).ok_or(RlpError::InvalidPrefix)? + *b as usize;
        }
        Ok(len)
    }

    /// Reads the next item as a byte string.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let prefix = *self.data.get(self.pos).ok_or(RlpError::UnexpectedEof)?;
        match prefix {
            0x00..=0x7f => {
                let item = &self.data[self.pos..self.pos + 1];
                self.pos += 1;
                Ok(item)
            }
            0x80..=0xb7 => {
                self.pos += 1;
                let len = (prefix - 0x80) as usize;
                if self.pos + len > self.data.len() {
                    return Err(RlpError::UnexpectedEof);
                }
                let item = &self.data[self.pos..self.pos + len];
                // A single byte below 0x80 must encode as itself
                if len == 1 && item[0] < 0x80 {
                    return Err(RlpError::NonCanonical);
                }
                self.pos += len;
                Ok(item)
            }
            0xb8..=0xbf => {
                self.pos += 1;
                let len = self.read_length((prefix - 0xb7) as usize)?;
                if len < 56 {
                    return Err(RlpError::NonCanonical);
                }
                if self.pos + len > self.data.len() {
                    return Err(RlpError::UnexpectedEof);
                }
                let item = &self.data[self.pos..self.pos + len];
                self.pos += len;
                Ok(item)
            }
            _ => Err(RlpError::ExpectedString),
        }
    }

    /// Enters the next item, which must be a list.
    pub fn enter_list(&mut self) -> Result<()> {
        let prefix = *self.data.get(self.pos).ok_or(RlpError::UnexpectedEof)?;
        let payload_len = match prefix {
            0xc0..=0xf7 => {
                self.pos += 1;
                (prefix - 0xc0) as usize
            }
            0xf8..=0xff => {
                self.pos += 1;
                let len = self.read_length((prefix - 0xf7) as usize)?;
                if len < 56 {
                    return Err(RlpError::NonCanonical);
                }
                len
            }
            _ => return Err(RlpError::ExpectedList),
        };
        let end = self.pos + payload_len;
        if end > self.data.len() {
            return Err(RlpError::UnexpectedEof);
        }
        self.list_ends.push(end);
        Ok(())
    }

    /// Leaves the innermost list; all of its items must have been consumed.
    pub fn leave_list(&mut self) -> Result<()> {
        let end = self.list_ends.pop().ok_or(RlpError::ExpectedList)?;
        if self.pos != end {
            return Err(RlpError::TrailingBytes);
        }
        Ok(())
    }

    /// Reads a u64 scalar (canonical form, no leading zeros).
    pub fn read_u64_scalar(&mut self) -> Result<u64> {
        let bytes = self.read_bytes()?;
        if bytes.first() == Some(&0) {
            return Err(RlpError::NonCanonical);
        }
        if bytes.len() > 8 {
            return Err(RlpError::ScalarOverflow);
        }
        let mut value = 0u64;
        for b in bytes {
            value = (value << 8) | *b as u64;
        }
        Ok(value)
    }

    /// Reads a U256 scalar (canonical form, no leading zeros).
    pub fn read_u256_scalar(&mut self) -> Result<U256> {
        let bytes = self.read_bytes()?;
        if bytes.first() == Some(&0) {
            return Err(RlpError::NonCanonical);
        }
        if bytes.len() > 32 {
            return Err(RlpError::ScalarOverflow);
        }
        Ok(U256::from_big_endian(bytes))
    }

    /// Reads a 32-byte hash.
    pub fn read_h256(&mut self) -> Result<H256> {
        let bytes = self.read_bytes()?;
        if bytes.len() != 32 {
            return Err(RlpError::WrongLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        Ok(H256::from_slice(bytes))
    }

    /// Reads a 20-byte address.
    pub fn read_address(&mut self) -> Result<Address> {
        let bytes = self.read_bytes()?;
        if bytes.len() != 20 {
            return Err(RlpError::WrongLength {
                expected: 20,
                actual: bytes.len(),
            });
        }
        Ok(Address::from_slice(bytes))
    }

    /// Reads an optional 20-byte address; the empty string means absent.
    pub fn read_optional_address(&mut self) -> Result<Option<Address>> {
        let bytes = self.read_bytes()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        if bytes.len() != 20 {
            return Err(RlpError::WrongLength {
                expected: 20,
                actual: bytes.len(),
            });
        }
        Ok(Some(Address::from_slice(bytes)))
    }
}
