//! Assurances (spec §4.5, C5): validators attest that a core's assigned
//! report's erasure-coded chunks are available; once a core's attesting
//! weight crosses the super-majority the report becomes ready for
//! accumulation, with its dependency set resolved against the anchor's
//! `segment_root_lookup`/`prerequisites`.

use thiserror::Error;

use jam_crypto::ed25519_verify;
use jam_types::{
    Ed25519Signature, JamState, Params, ReadyRecord, TimeSlot, ValidatorIndex, WorkReport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssuranceEntry {
    pub validator_index: ValidatorIndex,
    pub anchor_header_hash: jam_types::HeaderHash,
    /// One bit per core, packed LSB-first; set when the validator attests
    /// that core's pending report is fully available.
    pub bitfield: Vec<u8>,
    pub signature: Ed25519Signature,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssurancesInput {
    pub assurances: Vec<AssuranceEntry>,
    pub slot: TimeSlot,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssurancesOutput {
    pub newly_available: Vec<WorkReport>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssurancesError {
    #[error("validator index out of range or assurances not strictly ascending")]
    BadValidatorIndex,
    #[error("assurances extrinsic is not sorted by strictly ascending validator index")]
    NotSortedUniqueAssurances,
    #[error("assurance anchor does not match the most recent history entry")]
    BadAttestationParent,
    #[error("ed25519 signature verification failed")]
    BadSignature,
    #[error("an assurance bit is set for a core with no pending assignment")]
    CoreNotEngaged,
}

fn bit_set(bitfield: &[u8], core: usize) -> bool {
    let byte = core / 8;
    let bit = core % 8;
    bitfield.get(byte).map_or(false, |b| b & (1 << bit) != 0)
}

pub fn apply_assurances(
    pre: &JamState,
    input: &AssurancesInput,
    params: &Params,
) -> Result<(JamState, AssurancesOutput), AssurancesError> {
    let mut post = pre.clone();
    let core_count = pre.auth_pools.len();

    let latest_anchor = pre.recent_history.entries.last().map(|e| e.header_hash);

    let mut prev_idx: Option<ValidatorIndex> = None;
    let mut attesters_per_core = vec![0u32; core_count];
    for assurance in &input.assurances {
        if let Some(prev) = prev_idx {
            if assurance.validator_index <= prev {
                return Err(AssurancesError::NotSortedUniqueAssurances);
            }
        }
        prev_idx = Some(assurance.validator_index);

        let Some(validator) = pre.current_validators.get(assurance.validator_index as usize) else {
            return Err(AssurancesError::BadValidatorIndex);
        };

        if let Some(anchor) = latest_anchor {
            if assurance.anchor_header_hash != anchor {
                return Err(AssurancesError::BadAttestationParent);
            }
        }

        let message = [assurance.anchor_header_hash.0.as_slice(), &assurance.bitfield].concat();
        let ok = ed25519_verify(&validator.ed25519.0, &message, &assurance.signature.0)
            .map_err(|_| AssurancesError::BadSignature)?;
        if !ok {
            return Err(AssurancesError::BadSignature);
        }

        for core in 0..core_count {
            if bit_set(&assurance.bitfield, core) {
                if pre.pending_reports[core].is_none() {
                    return Err(AssurancesError::CoreNotEngaged);
                }
                attesters_per_core[core] += 1;
            }
        }
    }

    let mut newly_available = Vec::new();
    for core in 0..core_count {
        let Some(assignment) = pre.pending_reports[core].clone() else {
            continue;
        };
        if attesters_per_core[core] >= params.validators_super_majority as u32 {
            let dependencies = assignment
                .report
                .context
                .prerequisites
                .clone()
                .into_iter()
                .chain(assignment.report.segment_root_lookup.iter().map(|(h, _)| *h))
                .collect();
            let slot_idx = (input.slot % params.epoch_length) as usize;
            post.reports_ready[slot_idx].push(ReadyRecord {
                work_report: assignment.report.clone(),
                dependencies,
            });
            newly_available.push(assignment.report);
            post.pending_reports[core] = None;
        } else if assignment.timeout_slot <= input.slot {
            post.pending_reports[core] = None;
        }
    }

    Ok((post, AssurancesOutput { newly_available }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_types::{
        Assignment, ErasureRoot, ExportsRoot, HeaderAnchor, HeaderHash, OpaqueHash, PackageSpec,
        RefineContext, StateRoot, WorkExecResult, WorkPackageHash, WorkResult,
    };

    fn sample_report() -> WorkReport {
        WorkReport {
            package_spec: PackageSpec {
                hash: WorkPackageHash::zero(),
                length: 0,
                erasure_root: ErasureRoot::zero(),
                exports_root: ExportsRoot::zero(),
                exports_count: 0,
            },
            context: RefineContext {
                anchor: HeaderAnchor {
                    header_hash: OpaqueHash::zero(),
                    state_root: StateRoot::zero(),
                    beefy_root: OpaqueHash::zero(),
                },
                lookup_anchor: HeaderAnchor {
                    header_hash: OpaqueHash::zero(),
                    state_root: StateRoot::zero(),
                    beefy_root: OpaqueHash::zero(),
                },
                lookup_anchor_slot: 0,
                prerequisites: vec![],
            },
            core_index: 0,
            authorizer_hash: OpaqueHash::zero(),
            auth_output: vec![],
            segment_root_lookup: vec![],
            results: vec![WorkResult {
                service_id: 1,
                code_hash: OpaqueHash::zero(),
                payload_hash: OpaqueHash::zero(),
                accumulate_gas: 10,
                result: WorkExecResult::Ok(vec![]),
                refine_load_gas_used: 0,
                refine_load_imports: 0,
                refine_load_extrinsic_count: 0,
                refine_load_extrinsic_size: 0,
                refine_load_exports: 0,
            }],
            auth_gas_used: 0,
        }
    }

    #[test]
    fn core_not_engaged_rejected_when_bit_set_without_assignment() {
        let params = Params::tiny();
        let state = JamState::genesis(&params);
        let input = AssurancesInput {
            assurances: vec![AssuranceEntry {
                validator_index: 0,
                anchor_header_hash: HeaderHash::zero(),
                bitfield: vec![0b0000_0001],
                signature: Ed25519Signature([0u8; 64]),
            }],
            slot: 1,
        };
        let err = apply_assurances(&state, &input, &params).unwrap_err();
        assert_eq!(err, AssurancesError::CoreNotEngaged);
    }

    #[test]
    fn timed_out_assignment_is_cleared_without_attesters() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        state.pending_reports[0] = Some(Assignment {
            report: sample_report(),
            erasure_root: OpaqueHash::zero(),
            timeout_slot: 1,
        });
        let input = AssurancesInput {
            assurances: vec![],
            slot: 2,
        };
        let (post, output) = apply_assurances(&state, &input, &params).unwrap();
        assert!(post.pending_reports[0].is_none());
        assert!(output.newly_available.is_empty());
    }
}
