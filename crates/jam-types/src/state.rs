//! `JamState` and its fifteen sub-components (spec §3 table, symbols α..δ
//! kept only as doc-comment annotations per spec: "use them only as
//! comments").

use std::collections::BTreeMap;

use jam_codec::{Reader, Result, Writer};

use crate::primitives::{
    BandersnatchPublic, BeefyRoot, CoreIndex, Entropy, EntropyBuffer, ExportsRoot, Gas,
    HeaderHash, OpaqueHash, ServiceId, StateRoot, TimeSlot, ValidatorData, ValidatorIndex,
    WorkPackageHash,
};
use crate::service::ServiceAccount;
use crate::work_report::WorkReport;

/// α: per-core bounded queue of authorization hashes.
pub type AuthPools = Vec<Vec<OpaqueHash>>;

/// φ: per-core queue of pending authorizations (fixed length).
pub type AuthQueues = Vec<Vec<OpaqueHash>>;

/// One entry of β, RecentHistory: a past block's summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub header_hash: HeaderHash,
    pub beefy_root: BeefyRoot,
    pub state_root: StateRoot,
    pub reported_packages: Vec<(WorkPackageHash, ExportsRoot)>,
}

impl BlockInfo {
    pub fn encode(&self, w: &mut Writer) {
        self.header_hash.encode(w);
        self.beefy_root.encode(w);
        self.state_root.encode(w);
        jam_codec::encode_seq(&self.reported_packages, w, |(pkg, root), w| {
            pkg.encode(w);
            root.encode(w);
        });
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            header_hash: HeaderHash::decode(r)?,
            beefy_root: BeefyRoot::decode(r)?,
            state_root: StateRoot::decode(r)?,
            reported_packages: jam_codec::decode_seq(r, |r| {
                Ok((WorkPackageHash::decode(r)?, ExportsRoot::decode(r)?))
            })?,
        })
    }
}

/// β: bounded ordered sequence of `BlockInfo`, head-evicted beyond
/// `recent_history_size`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecentHistory {
    pub entries: Vec<BlockInfo>,
}

impl RecentHistory {
    pub fn push(&mut self, entry: BlockInfo, recent_history_size: u32) {
        self.entries.push(entry);
        while self.entries.len() as u32 > recent_history_size {
            self.entries.remove(0);
        }
    }
}

/// A VRF-authenticated lottery entry for slot sealing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: OpaqueHash,
    pub attempt: u8,
}

/// The slot sealer series: either the accumulated tickets, in order, or a
/// deterministic fallback key series derived from η.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSealerSeries {
    Tickets(Vec<Ticket>),
    FallbackKeys(Vec<BandersnatchPublic>),
}

/// γ: Safrole's rotating state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafroleState {
    pub next_validators: Vec<ValidatorData>,
    pub ticket_accumulator: Vec<Ticket>,
    pub slot_sealer_series: SlotSealerSeries,
    pub ring_root: OpaqueHash,
}

impl Default for SafroleState {
    fn default() -> Self {
        Self {
            next_validators: Vec::new(),
            ticket_accumulator: Vec::new(),
            slot_sealer_series: SlotSealerSeries::Tickets(Vec::new()),
            ring_root: OpaqueHash::zero(),
        }
    }
}

/// ψ: four ordered sets of work-report hashes tracked by the disputes STF.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisputesRecords {
    pub good: Vec<OpaqueHash>,
    pub bad: Vec<OpaqueHash>,
    pub wonky: Vec<OpaqueHash>,
    pub punish: Vec<OpaqueHash>,
}

impl DisputesRecords {
    #[must_use]
    pub fn already_judged(&self, report_hash: &OpaqueHash) -> bool {
        self.good.contains(report_hash)
            || self.bad.contains(report_hash)
            || self.wonky.contains(report_hash)
    }
}

/// ρ: per-core optional pending assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub report: WorkReport,
    pub erasure_root: OpaqueHash,
    pub timeout_slot: TimeSlot,
}

pub type PendingReports = Vec<Option<Assignment>>;

/// χ: manager/assign/designate privileges and the always-accumulate map.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Privileges {
    pub manager: ServiceId,
    pub assigners: Vec<ServiceId>,
    pub designate: ServiceId,
    pub always_accumulate: BTreeMap<ServiceId, Gas>,
}

/// π: per-validator counters for a single epoch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorActivityRecord {
    pub blocks_produced: u32,
    pub tickets_submitted: u32,
    pub preimages_introduced: u32,
    pub preimage_bytes_introduced: u64,
    pub guarantees_issued: u32,
    pub assurances_issued: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoreActivityRecord {
    pub da_load: u64,
    pub popularity: u32,
    pub imports: u32,
    pub exports: u32,
    pub extrinsic_size: u64,
    pub bundle_size: u64,
    pub gas_used: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceActivityRecord {
    pub provided_count: u32,
    pub provided_size: u64,
    pub refinement_count: u32,
    pub refinement_gas_used: u64,
    pub imports: u32,
    pub exports: u32,
    pub extrinsic_size: u64,
    pub accumulate_count: u32,
    pub accumulate_gas_used: u64,
    pub on_transfers_count: u32,
    pub on_transfers_gas_used: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidatorStats {
    pub current: Vec<ValidatorActivityRecord>,
    pub previous: Vec<ValidatorActivityRecord>,
    pub cores: Vec<CoreActivityRecord>,
    pub services: BTreeMap<ServiceId, ServiceActivityRecord>,
}

/// A report awaiting its dependency set to clear before it becomes ready for
/// accumulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyRecord {
    pub work_report: WorkReport,
    pub dependencies: Vec<WorkPackageHash>,
}

/// ϑ: per-epoch-slot sequence of reports awaiting dependency resolution.
pub type ReportsReady = Vec<Vec<ReadyRecord>>;

/// ξ: per-epoch-slot set of work-package hashes already accumulated.
pub type AccumulatedReports = Vec<Vec<WorkPackageHash>>;

/// δ: every service account, keyed by id.
pub type Services = BTreeMap<ServiceId, ServiceAccount>;

/// The full JAM ledger state. Every STF in `jam-stf` takes a `&JamState`
/// (plus its extrinsic) and returns an owned post-state or the pre-state
/// unchanged on error (spec §9 "Ownership model").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JamState {
    pub auth_pools: AuthPools,
    pub auth_queues: AuthQueues,
    pub recent_history: RecentHistory,
    pub safrole: SafroleState,
    pub disputes: DisputesRecords,
    pub entropy: EntropyBuffer,
    pub next_validators: Vec<ValidatorData>,
    pub current_validators: Vec<ValidatorData>,
    pub previous_validators: Vec<ValidatorData>,
    pub pending_reports: PendingReports,
    pub time_slot: TimeSlot,
    pub privileges: Privileges,
    pub validator_stats: ValidatorStats,
    pub reports_ready: ReportsReady,
    pub accumulated_reports: AccumulatedReports,
    pub services: Services,
}

impl JamState {
    /// Construct an empty genesis-shaped state sized for `core_count`/
    /// `validators_count`/`epoch_length` from `params`.
    #[must_use]
    pub fn genesis(params: &crate::params::Params) -> Self {
        Self {
            auth_pools: vec![Vec::new(); params.core_count as usize],
            auth_queues: vec![Vec::new(); params.core_count as usize],
            recent_history: RecentHistory::default(),
            safrole: SafroleState::default(),
            disputes: DisputesRecords::default(),
            entropy: EntropyBuffer::default(),
            next_validators: vec![ValidatorData::default(); params.validators_count as usize],
            current_validators: vec![ValidatorData::default(); params.validators_count as usize],
            previous_validators: vec![ValidatorData::default(); params.validators_count as usize],
            pending_reports: vec![None; params.core_count as usize],
            time_slot: 0,
            privileges: Privileges::default(),
            validator_stats: ValidatorStats {
                current: vec![ValidatorActivityRecord::default(); params.validators_count as usize],
                previous: vec![ValidatorActivityRecord::default(); params.validators_count as usize],
                cores: vec![CoreActivityRecord::default(); params.core_count as usize],
                services: BTreeMap::new(),
            },
            reports_ready: vec![Vec::new(); params.epoch_length as usize],
            accumulated_reports: vec![Vec::new(); params.epoch_length as usize],
            services: BTreeMap::new(),
        }
    }
}

pub fn encode_core_index(value: CoreIndex, w: &mut Writer) {
    jam_codec::encode_fixed_u16(value, w);
}

pub fn decode_core_index(r: &mut Reader<'_>) -> Result<CoreIndex> {
    jam_codec::decode_fixed_u16(r)
}

pub fn encode_validator_index(value: ValidatorIndex, w: &mut Writer) {
    jam_codec::encode_fixed_u16(value, w);
}

pub fn decode_validator_index(r: &mut Reader<'_>) -> Result<ValidatorIndex> {
    jam_codec::decode_fixed_u16(r)
}

pub fn encode_entropy(value: &Entropy, w: &mut Writer) {
    value.encode(w);
}

pub fn decode_entropy(r: &mut Reader<'_>) -> Result<Entropy> {
    Entropy::decode(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;

    #[test]
    fn genesis_sizes_match_params() {
        let params = Params::tiny();
        let state = JamState::genesis(&params);
        assert_eq!(state.auth_pools.len(), params.core_count as usize);
        assert_eq!(state.current_validators.len(), params.validators_count as usize);
        assert_eq!(state.reports_ready.len(), params.epoch_length as usize);
    }

    #[test]
    fn recent_history_evicts_head() {
        let mut history = RecentHistory::default();
        for i in 0..5u8 {
            history.push(
                BlockInfo {
                    header_hash: HeaderHash([i; 32]),
                    beefy_root: BeefyRoot::zero(),
                    state_root: StateRoot::zero(),
                    reported_packages: vec![],
                },
                3,
            );
        }
        assert_eq!(history.entries.len(), 3);
        assert_eq!(history.entries[0].header_hash.0[0], 2);
    }

    #[test]
    fn disputes_already_judged() {
        let mut disputes = DisputesRecords::default();
        let h = OpaqueHash([9; 32]);
        assert!(!disputes.already_judged(&h));
        disputes.good.push(h);
        assert!(disputes.already_judged(&h));
    }
}
