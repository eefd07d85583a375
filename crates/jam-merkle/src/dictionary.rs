//! State-dictionary key construction/deconstruction (spec §4.2).
//!
//! Grounded on `pvm-rust/src/codec/impl_.rs::{create_csh_key, create_storage_key,
//! create_preimage_key, create_request_key}` (the service-id/hash byte
//! interleaving scheme), generalized from the teacher's 31-byte keys to the
//! 32-byte keys spec.md §4.2's table specifies, and reconciled against the
//! teacher's `get/set_storage_value` et al. helpers for which namespace gets
//! which magic prefix. The storage-key input here is the already-hashed
//! `Blake2b256(service_id ‖ user_key)` from spec §4.4 ("Storage key
//! derivation"), not a second hash of it — see DESIGN.md for why the "24 vs
//! 28 bytes retained" distinction across storage/preimage/lookup rows is
//! resolved this way.

use jam_crypto::blake2b256;
use jam_types::ServiceId;

pub const TAG_SERVICE_BASE: u8 = 255;
const STORAGE_MAGIC: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
const PREIMAGE_MAGIC: [u8; 4] = [0xff, 0xff, 0xff, 0xfe];

/// A 32-byte trie key.
pub type DictKey = [u8; 32];

/// Retained-slice bounds into the original hash/key a dictionary key was
/// derived from, so a caller can verify an input hash against the stored
/// prefix (spec §4.2: "deconstruction returns the retained slice and its
/// `[start,end]`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetainedRange {
    pub start: usize,
    pub end: usize,
}

fn interleave8(service_id: ServiceId, head4: &[u8; 4], tail24: &[u8; 24]) -> DictKey {
    let sid = service_id.to_le_bytes();
    let mut key = [0u8; 32];
    key[0] = sid[0];
    key[1] = head4[0];
    key[2] = sid[1];
    key[3] = head4[1];
    key[4] = sid[2];
    key[5] = head4[2];
    key[6] = sid[3];
    key[7] = head4[3];
    key[8..32].copy_from_slice(tail24);
    key
}

fn deinterleave_service_id(key: &DictKey) -> ServiceId {
    let sid = [key[0], key[2], key[4], key[6]];
    ServiceId::from_le_bytes(sid)
}

/// Tagged component key for `i ∈ 1..15` (α..ξ except δ).
#[must_use]
pub fn component_key(tag: u8) -> DictKey {
    debug_assert!((1..=15).contains(&tag), "component tag out of range");
    let mut key = [0u8; 32];
    key[0] = tag;
    key
}

#[must_use]
pub fn deconstruct_component_key(key: &DictKey) -> Option<u8> {
    if key[0] == 0 || key[0] > 15 {
        return None;
    }
    if key[1..].iter().any(|&b| b != 0) {
        return None;
    }
    Some(key[0])
}

/// Service base key (tag 255): `s`'s 4 LE bytes placed at indices 1,3,5,7.
#[must_use]
pub fn service_base_key(service_id: ServiceId) -> DictKey {
    let sid = service_id.to_le_bytes();
    let mut key = [0u8; 32];
    key[0] = TAG_SERVICE_BASE;
    key[1] = sid[0];
    key[3] = sid[1];
    key[5] = sid[2];
    key[7] = sid[3];
    key
}

#[must_use]
pub fn deconstruct_service_base_key(key: &DictKey) -> Option<ServiceId> {
    if key[0] != TAG_SERVICE_BASE {
        return None;
    }
    let sid = [key[1], key[3], key[5], key[7]];
    Some(ServiceId::from_le_bytes(sid))
}

/// Service storage key: `key32` is `Blake2b256(encode_u32_le(service_id) ‖
/// user_key)` per spec §4.4; retains `key32[4..28]` (24 bytes).
#[must_use]
pub fn storage_key(service_id: ServiceId, key32: &[u8; 32]) -> DictKey {
    let mut tail = [0u8; 24];
    tail.copy_from_slice(&key32[4..28]);
    interleave8(service_id, &STORAGE_MAGIC, &tail)
}

#[must_use]
pub fn deconstruct_storage_key(key: &DictKey) -> (ServiceId, [u8; 24], RetainedRange) {
    let mut tail = [0u8; 24];
    tail.copy_from_slice(&key[8..32]);
    (
        deinterleave_service_id(key),
        tail,
        RetainedRange { start: 4, end: 28 },
    )
}

/// Service preimage key: `hash32` is the preimage's own Blake2b256 hash,
/// built **as storage** with `magic=0xFFFFFFFE` and source bytes
/// `hash32[1..29]` per spec §4.2 — the service id and the magic's 4 bytes
/// interleave into `k[0..8]` exactly like `storage_key`, and `k[8..32]` takes
/// `source[4..28]`, i.e. `hash32[5..29]` (24 bytes).
#[must_use]
pub fn preimage_key(service_id: ServiceId, hash32: &[u8; 32]) -> DictKey {
    let mut tail = [0u8; 24];
    tail.copy_from_slice(&hash32[5..29]);
    interleave8(service_id, &PREIMAGE_MAGIC, &tail)
}

#[must_use]
pub fn deconstruct_preimage_key(key: &DictKey) -> (ServiceId, [u8; 24], RetainedRange) {
    let mut tail = [0u8; 24];
    tail.copy_from_slice(&key[8..32]);
    (
        deinterleave_service_id(key),
        tail,
        RetainedRange { start: 5, end: 29 },
    )
}

/// Preimage lookup status key: `h' = Blake2b256(hash32)`; `length` LE bytes
/// plus `h'[2..30]` form a 32-byte buffer, which is then interleaved with the
/// service id exactly as the storage key is.
#[must_use]
pub fn preimage_lookup_key(service_id: ServiceId, hash32: &[u8; 32], length: u32) -> DictKey {
    let h_prime = blake2b256(hash32);
    let mut buffer = [0u8; 32];
    buffer[0..4].copy_from_slice(&length.to_le_bytes());
    buffer[4..32].copy_from_slice(&h_prime[2..30]);
    let mut head4 = [0u8; 4];
    head4.copy_from_slice(&buffer[0..4]);
    let mut tail24 = [0u8; 24];
    tail24.copy_from_slice(&buffer[4..28]);
    interleave8(service_id, &head4, &tail24)
}

#[must_use]
pub fn deconstruct_preimage_lookup_key(key: &DictKey) -> (ServiceId, u32, [u8; 24], RetainedRange) {
    let service_id = deinterleave_service_id(key);
    let length_bytes = [key[1], key[3], key[5], key[7]];
    let length = u32::from_le_bytes(length_bytes);
    let mut tail = [0u8; 24];
    tail.copy_from_slice(&key[8..32]);
    (service_id, length, tail, RetainedRange { start: 2, end: 26 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_key_roundtrips() {
        for tag in 1..=15u8 {
            let key = component_key(tag);
            assert_eq!(deconstruct_component_key(&key), Some(tag));
        }
    }

    #[test]
    fn service_base_key_roundtrips() {
        let key = service_base_key(0xAABBCCDD);
        assert_eq!(deconstruct_service_base_key(&key), Some(0xAABBCCDD));
        assert_eq!(key[0], TAG_SERVICE_BASE);
    }

    #[test]
    fn storage_key_recovers_service_id() {
        let key32 = [7u8; 32];
        let key = storage_key(42, &key32);
        let (sid, tail, range) = deconstruct_storage_key(&key);
        assert_eq!(sid, 42);
        assert_eq!(tail, key32[4..28]);
        assert_eq!(range, RetainedRange { start: 4, end: 28 });
    }

    #[test]
    fn preimage_key_recovers_service_id() {
        let hash32 = [3u8; 32];
        let key = preimage_key(99, &hash32);
        let (sid, tail, range) = deconstruct_preimage_key(&key);
        assert_eq!(sid, 99);
        assert_eq!(tail, hash32[5..29]);
        assert_eq!(range, RetainedRange { start: 5, end: 29 });
    }

    #[test]
    fn preimage_lookup_key_recovers_service_id_and_length() {
        let hash32 = [5u8; 32];
        let key = preimage_lookup_key(123, &hash32, 17);
        let (sid, length, _, _) = deconstruct_preimage_lookup_key(&key);
        assert_eq!(sid, 123);
        assert_eq!(length, 17);
    }

    #[test]
    fn different_namespaces_do_not_collide_for_same_service() {
        let key32 = [1u8; 32];
        let a = storage_key(5, &key32);
        let b = preimage_key(5, &key32);
        assert_ne!(a, b);
    }
}
