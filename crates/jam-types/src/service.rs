//! `ServiceAccount` (spec §3 "ServiceAccount invariants").
//!
//! Grounded on `pvm-rust/src/codec/impl_.rs::CompleteServiceAccount` and its
//! `get_storage_value`/`set_storage_value`/`get_preimage_value`/
//! `get_request_value`/`encode_request_timeslots` helpers, generalized from
//! the teacher's flat `raw_csh_keyvals: Vec<(Vec<u8>, Vec<u8>)>` encoding bag
//! into three typed `BTreeMap`s, since spec.md §3 calls out `storage`,
//! `preimages`, and `preimage_lookups` as three separate maps with distinct
//! key shapes rather than one undifferentiated key-value space.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::params::Params;
use crate::primitives::{Balance, Gas, OpaqueHash, ServiceId, TimeSlot};

/// Key into `preimage_lookups`: a preimage hash plus its claimed byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreimageLookupKey {
    pub hash: OpaqueHash,
    pub length: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceAccountError {
    #[error("preimage lookup entry already has the maximum of 3 timeslots")]
    LookupSlotsFull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub code_hash: OpaqueHash,
    pub balance: Balance,
    pub min_gas_accumulate: Gas,
    pub min_gas_on_transfer: Gas,
    pub creation_slot: TimeSlot,
    pub last_accumulation_slot: TimeSlot,
    pub parent_service: Option<ServiceId>,
    /// Gratis storage offset: bytes/items the account is not charged for
    /// (grounded on the teacher's `gratis` field in `CompleteServiceAccount`).
    pub gratis_storage_offset: u64,
    pub storage: BTreeMap<[u8; 32], Vec<u8>>,
    pub preimages: BTreeMap<OpaqueHash, Vec<u8>>,
    pub preimage_lookups: BTreeMap<PreimageLookupKey, Vec<TimeSlot>>,
}

impl ServiceAccount {
    #[must_use]
    pub fn new(code_hash: OpaqueHash, creation_slot: TimeSlot) -> Self {
        Self {
            code_hash,
            balance: 0,
            min_gas_accumulate: 0,
            min_gas_on_transfer: 0,
            creation_slot,
            last_accumulation_slot: creation_slot,
            parent_service: None,
            gratis_storage_offset: 0,
            storage: BTreeMap::new(),
            preimages: BTreeMap::new(),
            preimage_lookups: BTreeMap::new(),
        }
    }

    /// Storage footprint `(a_i, a_o)`: item count and byte count across all
    /// three maps, computed lazily (spec §3: "computed lazily from the maps").
    #[must_use]
    pub fn footprint(&self) -> (u64, u64) {
        let mut items = 0u64;
        let mut octets = 0u64;

        for (key, value) in &self.storage {
            items += 1;
            octets += key.len() as u64 + value.len() as u64;
        }
        for (hash, blob) in &self.preimages {
            items += 1;
            octets += hash.0.len() as u64 + blob.len() as u64;
        }
        for (key, slots) in &self.preimage_lookups {
            items += 1;
            octets += 32 + 4 + (slots.len() as u64 * 4);
            let _ = key;
        }

        (items, octets)
    }

    /// Threshold balance `a_t`: a deterministic function of the footprint via
    /// `min_balance_per_item`, `min_balance_per_octet`, `basic_service_balance`.
    ///
    /// Grounded on `host_functions/general/write.rs::calculate_min_balance`
    /// and `host_functions/accumulate/new.rs::minbalance`
    /// (`C_BASE_DEPOSIT + C_ITEM_DEPOSIT*items + C_BYTE_DEPOSIT*octets - gratis`).
    #[must_use]
    pub fn threshold_balance(&self, params: &Params) -> u64 {
        let (items, octets) = self.footprint();
        let raw = params.basic_service_balance
            + params.min_balance_per_item * items
            + params.min_balance_per_octet * octets;
        raw.saturating_sub(self.gratis_storage_offset)
    }

    /// Spec §3 invariant: "after every mutation producing a non-empty write,
    /// `balance ≥ a_t` or the mutation is rolled back." Callers use this to
    /// decide whether to commit or restore a prior snapshot.
    #[must_use]
    pub fn meets_threshold(&self, params: &Params) -> bool {
        self.balance >= self.threshold_balance(params)
    }

    pub fn push_lookup_slot(
        &mut self,
        key: PreimageLookupKey,
        slot: TimeSlot,
    ) -> Result<(), ServiceAccountError> {
        let slots = self.preimage_lookups.entry(key).or_default();
        if slots.len() >= 3 {
            return Err(ServiceAccountError::LookupSlotsFull);
        }
        slots.push(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_account() -> ServiceAccount {
        ServiceAccount::new(OpaqueHash::zero(), 0)
    }

    #[test]
    fn empty_account_footprint_is_zero() {
        let account = base_account();
        assert_eq!(account.footprint(), (0, 0));
    }

    #[test]
    fn threshold_grows_with_storage() {
        let params = Params::tiny();
        let mut account = base_account();
        let empty_threshold = account.threshold_balance(&params);
        account.storage.insert([1u8; 32], vec![1, 2, 3]);
        let grown_threshold = account.threshold_balance(&params);
        assert!(grown_threshold > empty_threshold);
    }

    #[test]
    fn gratis_offset_reduces_threshold() {
        let params = Params::tiny();
        let mut account = base_account();
        account.storage.insert([1u8; 32], vec![1, 2, 3]);
        let without_gratis = account.threshold_balance(&params);
        account.gratis_storage_offset = without_gratis;
        assert_eq!(account.threshold_balance(&params), 0);
    }

    #[test]
    fn lookup_slots_cap_at_three() {
        let mut account = base_account();
        let key = PreimageLookupKey {
            hash: OpaqueHash::zero(),
            length: 10,
        };
        account.push_lookup_slot(key, 1).unwrap();
        account.push_lookup_slot(key, 2).unwrap();
        account.push_lookup_slot(key, 3).unwrap();
        assert!(account.push_lookup_slot(key, 4).is_err());
    }
}
