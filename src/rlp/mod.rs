//! RLP (Recursive Length Prefix) codec.
//!
//! Canonical Ethereum RLP: scalars carry no leading zero bytes and the
//! empty byte string encodes zero.

mod decode;
mod encode;

pub use decode::{RlpDecoder, RlpError};
pub use encode::RlpEncoder;
