//! Checkpoint/rollback dimensions for a single service's accumulation
//! invocation (spec §4.4, §5.4): a CHECKPOINT host call snapshots the
//! "regular" dimension into "exceptional"; a trap or an explicit request to
//! discard restores it.

use std::collections::BTreeMap;

use jam_types::{OpaqueHash, Privileges, ServiceAccount, ServiceId, ValidatorData};

/// One mutable view of everything a service invocation can touch, besides
/// its own RAM/registers/gas (which live in the `PvmInstance` itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumDimension {
    pub services: BTreeMap<ServiceId, ServiceAccount>,
    pub privileges: Privileges,
    pub auth_queues: Vec<Vec<OpaqueHash>>,
    pub next_validators: Vec<ValidatorData>,
    pub next_free_id: ServiceId,
}

/// The two dimensions a single invocation runs against: `regular` is what
/// actually commits on success, `exceptional` is the last CHECKPOINT
/// snapshot a trap rolls back to.
pub struct AccumulationContext {
    pub regular: AccumDimension,
    pub exceptional: AccumDimension,
}

impl AccumulationContext {
    #[must_use]
    pub fn new(dimension: AccumDimension) -> Self {
        Self {
            exceptional: dimension.clone(),
            regular: dimension,
        }
    }

    /// CHECKPOINT host call: snapshot `regular` into `exceptional`.
    pub fn checkpoint(&mut self) {
        self.exceptional = self.regular.clone();
    }

    /// A trap (or `OutOfGas`/`Segfault`) discards everything `regular` did
    /// since the last checkpoint.
    pub fn rollback(&mut self) {
        self.regular = self.exceptional.clone();
    }
}
