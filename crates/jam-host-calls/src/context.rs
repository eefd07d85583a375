//! Shared execution context the accumulate host calls operate against.
//!
//! Grounded on `pvm-rust/src/host_functions/base.rs::HostFunctionContext`,
//! but consolidated into a single struct scoped to the accumulate subset this
//! crate implements — the teacher's context is a much larger bag of
//! `Option<...>` fields shared across refine, accumulate, and on-transfer
//! call sites; since refinement is out of scope here there is nothing left
//! to make optional.

use std::collections::BTreeMap;

use jam_types::{Gas, OpaqueHash, Params, Privileges, ServiceAccount, ServiceId, TimeSlot, ValidatorData};

/// A transfer queued by the TRANSFER host call, settled by the accumulation
/// driver once the invoking service's PVM run returns (spec §5.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredTransfer {
    pub source: ServiceId,
    pub dest: ServiceId,
    pub amount: u64,
    pub memo: Vec<u8>,
    pub gas_limit: Gas,
}

/// Everything a single host-call dispatch needs: the invoking PVM instance's
/// registers and RAM, the service ledger, and the privileged-service slots a
/// handful of calls (BLESS/ASSIGN/DESIGNATE) are allowed to mutate.
pub struct HostCallContext<'a> {
    pub registers: &'a mut [u64; 13],
    pub ram: &'a mut jam_pvm::Ram,
    pub gas: &'a mut i64,
    pub service_id: ServiceId,
    pub services: &'a mut BTreeMap<ServiceId, ServiceAccount>,
    pub privileges: &'a mut Privileges,
    pub auth_queues: &'a mut Vec<Vec<OpaqueHash>>,
    pub next_validators: &'a mut Vec<ValidatorData>,
    pub next_free_id: &'a mut ServiceId,
    pub timeslot: TimeSlot,
    pub checkpoint_requested: &'a mut bool,
    pub yield_hash: &'a mut Option<OpaqueHash>,
    pub transfers_out: &'a mut Vec<DeferredTransfer>,
    pub params: &'a Params,
    pub log: &'a mut Vec<String>,
}

// Deliberately no `account()`/`account_mut()` convenience methods: a method
// taking `&self`/`&mut self` borrows every field, which would force callers
// in `calls.rs` to hold a whole-context borrow alive across unrelated
// `ctx.registers`/`ctx.params` writes. Accessing `ctx.services.get(&ctx.service_id)`
// directly keeps the borrow scoped to the `services` field only.
