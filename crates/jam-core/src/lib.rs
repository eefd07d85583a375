//! Block-level orchestration (spec §2, §4.5): drives the per-subsystem
//! state-transition functions in the fixed order the protocol requires —
//! disputes, history, reports, assurances, accumulation, preimages,
//! statistics, safrole — committing atomically: any subsystem error leaves
//! `pre` untouched and aborts the whole block.

use thiserror::Error;

use jam_accumulate::{apply_accumulation, AccumulateInput, AccumulateOutput};
use jam_crypto::VrfEngine;
use jam_stf::{
    apply_assurances, apply_disputes, apply_history, apply_preimages, apply_reports,
    apply_safrole, apply_statistics, AssuranceEntry, AssurancesError, AssurancesInput,
    AssurancesOutput, Culprit, DisputesError, DisputesInput, DisputesOutput, Fault,
    GuaranteeEntry, HistoryInput, PreimageEntry, PreimagesError, PreimagesInput, ReportsError,
    ReportsInput, ReportsOutput, SafroleError, SafroleOutput, StatisticsInput, TicketEnvelope,
    Verdict,
};
use jam_types::{
    BeefyRoot, Entropy, ExportsRoot, HeaderHash, JamState, OpaqueHash, Params, StateRoot,
    TimeSlot, ValidatorIndex, WorkPackageHash,
};

/// Everything one block contributes: the header fields `jam-stf::history`
/// absorbs verbatim, plus every subsystem's extrinsic. Header production
/// (including the state root the history component records) is an external
/// collaborator's responsibility, same as Safrole's `entropy` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header_hash: HeaderHash,
    pub beefy_root: BeefyRoot,
    pub state_root: StateRoot,
    pub reported_packages: Vec<(WorkPackageHash, ExportsRoot)>,

    pub slot: TimeSlot,
    pub entropy: Entropy,
    pub tickets: Vec<TicketEnvelope>,

    pub verdicts: Vec<Verdict>,
    pub culprits: Vec<Culprit>,
    pub faults: Vec<Fault>,
    pub bad_report_cores: Vec<(OpaqueHash, u16)>,

    pub guarantees: Vec<GuaranteeEntry>,
    pub assurances: Vec<AssuranceEntry>,
    pub preimages: Vec<PreimageEntry>,

    pub author_index: ValidatorIndex,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockOutput {
    pub disputes: DisputesOutput,
    pub reports: ReportsOutput,
    pub assurances: AssurancesOutput,
    pub accumulate: AccumulateOutput,
    pub safrole: SafroleOutput,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error(transparent)]
    Disputes(#[from] DisputesError),
    #[error(transparent)]
    Reports(#[from] ReportsError),
    #[error(transparent)]
    Assurances(#[from] AssurancesError),
    #[error(transparent)]
    Preimages(#[from] PreimagesError),
    #[error(transparent)]
    Safrole(#[from] SafroleError),
}

/// Applies one full block, in the protocol's fixed subsystem order. On any
/// `Err`, `pre` is returned untouched by the caller (this function never
/// mutates it — every intermediate `state` is a fresh value).
pub fn apply_block(
    pre: &JamState,
    block: &Block,
    params: &Params,
    vrf: &dyn VrfEngine,
) -> Result<(JamState, BlockOutput), BlockError> {
    tracing::debug!(slot = block.slot, guarantees = block.guarantees.len(), "applying block");
    let current_epoch = pre.time_slot / params.epoch_length;
    let epoch_changed = block.slot / params.epoch_length != current_epoch;

    let disputes_input = DisputesInput {
        verdicts: block.verdicts.clone(),
        culprits: block.culprits.clone(),
        faults: block.faults.clone(),
        bad_report_cores: block.bad_report_cores.clone(),
    };
    let (state, disputes_output) = apply_disputes(pre, &disputes_input, params, current_epoch)?;

    let history_input = HistoryInput {
        header_hash: block.header_hash,
        beefy_root: block.beefy_root,
        state_root: block.state_root,
        reported_packages: block.reported_packages.clone(),
    };
    let state = apply_history(&state, &history_input, params);

    let reports_input = ReportsInput {
        guarantees: block.guarantees.clone(),
    };
    let (state, reports_output) = apply_reports(&state, &reports_input, params)?;

    let assurances_input = AssurancesInput {
        assurances: block.assurances.clone(),
        slot: block.slot,
    };
    let (state, assurances_output) = apply_assurances(&state, &assurances_input, params)?;

    let accumulate_input = AccumulateInput { slot: block.slot };
    let (state, accumulate_output) = apply_accumulation(&state, &accumulate_input, params);

    let preimages_input = PreimagesInput {
        preimages: block.preimages.clone(),
        slot: block.slot,
    };
    let state = apply_preimages(&state, &preimages_input)?;

    let statistics_input = StatisticsInput {
        author_index: block.author_index,
        tickets_submitted: block.tickets.len() as u32,
        preimages_introduced: block.preimages.len() as u32,
        preimage_bytes_introduced: block.preimages.iter().map(|p| p.blob.len() as u64).sum(),
        guarantees_issued: block.guarantees.len() as u32,
        assurances_issued: block.assurances.len() as u32,
        epoch_changed,
    };
    let state = apply_statistics(&state, &statistics_input);

    let safrole_input = jam_stf::SafroleInput {
        slot: block.slot,
        entropy: block.entropy,
        tickets: block.tickets.clone(),
    };
    let (state, safrole_output) = apply_safrole(&state, &safrole_input, params, vrf)?;

    Ok((
        state,
        BlockOutput {
            disputes: disputes_output,
            reports: reports_output,
            assurances: assurances_output,
            accumulate: accumulate_output,
            safrole: safrole_output,
        },
    ))
}
