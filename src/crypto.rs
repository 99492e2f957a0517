//! Hashing helpers and injected cryptographic interfaces.
//!
//! Keccak-256 and SHA-256 are computed locally; ECDSA sender recovery and
//! KZG batch verification are native-call boundaries injected by the host.

use std::sync::OnceLock;

use primitive_types::{H256, U256};
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

use crate::types::{Address, Transaction};

/// Version byte of a KZG versioned hash (EIP-4844).
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// Keccak-256 hash of the empty byte string.
pub const EMPTY_KECCAK: [u8; 32] = [
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03,
    0xc0, 0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85,
    0xa4, 0x70,
];

/// Computes the Keccak-256 hash of data.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

/// Computes the SHA-256 hash of data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    digest.into()
}

/// Derives the versioned hash bound to a KZG commitment:
/// SHA-256 of the commitment with the first byte replaced by the version.
pub fn kzg_versioned_hash(commitment: &[u8]) -> H256 {
    let mut digest = sha256(commitment);
    digest[0] = VERSIONED_HASH_VERSION_KZG;
    H256::from(digest)
}

/// Curve constants of the process-wide signature algorithm.
///
/// The half curve order drives the signature malleability check: a
/// signature with s above it is rejected.
#[derive(Debug)]
pub struct SignatureAlgorithm {
    curve_order: U256,
    half_curve_order: U256,
}

impl SignatureAlgorithm {
    fn secp256k1() -> Self {
        let curve_order = U256::from_big_endian(&[
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c,
            0xd0, 0x36, 0x41, 0x41,
        ]);
        Self {
            curve_order,
            half_curve_order: curve_order / 2,
        }
    }

    /// The order n of the curve's base point.
    pub fn curve_order(&self) -> U256 {
        self.curve_order
    }

    /// n / 2, the upper bound for a canonical s value.
    pub fn half_curve_order(&self) -> U256 {
        self.half_curve_order
    }
}

/// Returns the process-wide signature algorithm, initialized on first use.
pub fn signature_algorithm() -> &'static SignatureAlgorithm {
    static INSTANCE: OnceLock<SignatureAlgorithm> = OnceLock::new();
    INSTANCE.get_or_init(SignatureAlgorithm::secp256k1)
}

/// Recovers the sender address from a transaction signature.
///
/// The concrete ECDSA implementation is supplied by the host; `None`
/// means the public key could not be recovered.
pub trait SenderRecovery {
    fn recover(&self, transaction: &Transaction) -> Option<Address>;
}

/// Batch verification of blob KZG proofs, treated as a blocking native call.
pub trait KzgVerifier {
    fn verify_blob_proof_batch(
        &self,
        blobs: &[Vec<u8>],
        commitments: &[[u8; 48]],
        proofs: &[[u8; 48]],
    ) -> bool;
}
