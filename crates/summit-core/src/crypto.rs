// crates/summit-core/src/crypto.rs

use sha3::{Digest, Keccak256};

use crate::types::Address;

/// Compute keccak-256 of the given bytes.
///
/// Returns a 32-byte hash.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the sealed-seed commitment: `keccak(preimage ‖ seeder_address)`.
///
/// Binding the seeder address into the seal prevents another party from
/// replaying an observed preimage through a different seeder account.
pub fn seal_seed(preimage: &[u8; 32], seeder: &Address) -> [u8; 32] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(preimage);
    buf[32..].copy_from_slice(seeder);
    keccak256(&buf)
}

/// Derive the resolved per-cycle seed by mixing the revealed preimage with
/// the future marker committed at seal time.
pub fn resolve_seed(preimage: &[u8; 32], marker: u64) -> [u8; 32] {
    let mut buf = [0u8; 40];
    buf[..32].copy_from_slice(preimage);
    buf[32..].copy_from_slice(&marker.to_be_bytes());
    keccak256(&buf)
}
