//! Reports/Guarantees (spec §4.5, C4): validators attest to a core's work
//! report becoming the pending assignment for that core.
//!
//! New — transcribed from spec.md §4.5/§7. Signature verification reuses
//! `jam-crypto::ed25519_verify` the same way `jam-stf::disputes` does.

use thiserror::Error;

use jam_crypto::ed25519_verify;
use jam_types::{
    Assignment, Ed25519Signature, JamState, Params, ValidatorIndex, WorkReport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuaranteeEntry {
    pub report: WorkReport,
    pub slot: u32,
    pub signatures: Vec<(ValidatorIndex, Ed25519Signature)>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportsInput {
    pub guarantees: Vec<GuaranteeEntry>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportsOutput {
    pub reported: Vec<WorkReport>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportsError {
    #[error("core index {0} out of range")]
    BadCoreIndex(u16),
    #[error("core {0} already has a pending assignment")]
    CoreEngaged(u16),
    #[error("report anchor is older than max_lookup_anchorage")]
    AnchorNotRecent,
    #[error("report anchor state root does not match recent history")]
    BadStateRoot,
    #[error("report anchor beefy root does not match recent history")]
    BadBeefyRoot,
    #[error("a prerequisite or segment-root-lookup dependency is unresolved")]
    DependencyMissing,
    #[error("work package already reported")]
    DuplicatePackage,
    #[error("guarantee signature validator index out of range or not strictly ascending")]
    BadValidatorIndex,
    #[error("guarantees extrinsic is not sorted by ascending core index")]
    NotSortedUniqueGuarantees,
    #[error("fewer signatures than the super-majority threshold")]
    InsufficientGuarantors,
    #[error("ed25519 signature verification failed")]
    BadSignature,
    #[error("result count outside the 1..=4 bound")]
    BadResultCount,
    #[error("a work result's accumulate_gas is below the service's min_gas_accumulate")]
    ServiceItemGasTooLow(u32),
    #[error("report carries more dependencies than max_report_dependencies")]
    TooManyDependencies,
    #[error("report's authorizer hash is not present in the core's authorization pool")]
    BadAuthorizer,
}

pub fn apply_reports(
    pre: &JamState,
    input: &ReportsInput,
    params: &Params,
) -> Result<(JamState, ReportsOutput), ReportsError> {
    let mut post = pre.clone();
    let mut reported = Vec::new();

    let mut prev_core: Option<u16> = None;
    for guarantee in &input.guarantees {
        let core = guarantee.report.core_index;
        if let Some(prev) = prev_core {
            if core <= prev {
                return Err(ReportsError::NotSortedUniqueGuarantees);
            }
        }
        prev_core = Some(core);

        if core as usize >= pre.auth_pools.len() {
            return Err(ReportsError::BadCoreIndex(core));
        }
        if pre.pending_reports[core as usize].is_some() {
            return Err(ReportsError::CoreEngaged(core));
        }
        if !guarantee.report.has_valid_result_count() {
            return Err(ReportsError::BadResultCount);
        }
        if guarantee.report.context.prerequisites.len() as u32 > params.max_report_dependencies {
            return Err(ReportsError::TooManyDependencies);
        }

        let anchor_entry = pre
            .recent_history
            .entries
            .iter()
            .find(|entry| entry.header_hash == guarantee.report.context.anchor.header_hash);
        if !pre.recent_history.entries.is_empty() && anchor_entry.is_none() {
            return Err(ReportsError::AnchorNotRecent);
        }
        if let Some(entry) = anchor_entry {
            if entry.state_root != guarantee.report.context.anchor.state_root {
                return Err(ReportsError::BadStateRoot);
            }
            if entry.beefy_root.0 != guarantee.report.context.anchor.beefy_root.0 {
                return Err(ReportsError::BadBeefyRoot);
            }
        }

        if !pre.auth_pools[core as usize].contains(&guarantee.report.authorizer_hash) {
            return Err(ReportsError::BadAuthorizer);
        }

        for (pkg_hash, exports_root) in &guarantee.report.segment_root_lookup {
            let resolved = pre.recent_history.entries.iter().any(|entry| {
                entry
                    .reported_packages
                    .iter()
                    .any(|(h, r)| h == pkg_hash && r == exports_root)
            });
            if !resolved {
                return Err(ReportsError::DependencyMissing);
            }
        }

        let reported_already = pre
            .recent_history
            .entries
            .iter()
            .any(|e| e.reported_packages.iter().any(|(h, _)| *h == guarantee.report.package_spec.hash));
        if reported_already {
            return Err(ReportsError::DuplicatePackage);
        }

        let mut prev_idx: Option<ValidatorIndex> = None;
        for (idx, signature) in &guarantee.signatures {
            if let Some(prev) = prev_idx {
                if *idx <= prev {
                    return Err(ReportsError::BadValidatorIndex);
                }
            }
            prev_idx = Some(*idx);
            let Some(validator) = pre.current_validators.get(*idx as usize) else {
                return Err(ReportsError::BadValidatorIndex);
            };
            let message = guarantee_message(&guarantee.report);
            let ok = ed25519_verify(&validator.ed25519.0, &message, &signature.0)
                .map_err(|_| ReportsError::BadSignature)?;
            if !ok {
                return Err(ReportsError::BadSignature);
            }
        }
        if (guarantee.signatures.len() as u16) < params.validators_super_majority {
            return Err(ReportsError::InsufficientGuarantors);
        }

        for result in &guarantee.report.results {
            let Some(service) = pre.services.get(&result.service_id) else {
                continue;
            };
            if result.accumulate_gas < service.min_gas_accumulate {
                return Err(ReportsError::ServiceItemGasTooLow(result.service_id));
            }
        }

        reported.push(guarantee.report.clone());
        post.pending_reports[core as usize] = Some(Assignment {
            report: guarantee.report.clone(),
            erasure_root: guarantee.report.package_spec.erasure_root.0.into(),
            timeout_slot: guarantee.slot + params.assurance_timeout_period,
        });
    }

    Ok((post, ReportsOutput { reported }))
}

fn guarantee_message(report: &WorkReport) -> Vec<u8> {
    let mut w = jam_codec::Writer::new();
    report.encode(&mut w);
    w.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_types::{
        ErasureRoot, ExportsRoot, HeaderAnchor, OpaqueHash, PackageSpec, RefineContext, StateRoot,
        WorkExecResult, WorkPackageHash, WorkResult,
    };

    fn sample_report(core: u16) -> WorkReport {
        WorkReport {
            package_spec: PackageSpec {
                hash: WorkPackageHash([core as u8 + 1; 32]),
                length: 10,
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
            core_index: core,
            authorizer_hash: OpaqueHash::zero(),
            auth_output: vec![],
            segment_root_lookup: vec![],
            results: vec![WorkResult {
                service_id: 1,
                code_hash: OpaqueHash::zero(),
                payload_hash: OpaqueHash::zero(),
                accumulate_gas: 100,
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
    fn bad_core_index_rejected() {
        let params = Params::tiny();
        let state = JamState::genesis(&params);
        let report = sample_report(params.core_count as u16 + 5);
        let input = ReportsInput {
            guarantees: vec![GuaranteeEntry {
                report,
                slot: 1,
                signatures: vec![],
            }],
        };
        let err = apply_reports(&state, &input, &params).unwrap_err();
        assert!(matches!(err, ReportsError::BadCoreIndex(_)));
    }

    #[test]
    fn insufficient_guarantors_rejected() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        state.auth_pools[0].push(OpaqueHash::zero());
        let report = sample_report(0);
        let input = ReportsInput {
            guarantees: vec![GuaranteeEntry {
                report,
                slot: 1,
                signatures: vec![],
            }],
        };
        let err = apply_reports(&state, &input, &params).unwrap_err();
        assert_eq!(err, ReportsError::InsufficientGuarantors);
    }

    #[test]
    fn engaged_core_rejected() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        state.pending_reports[0] = Some(Assignment {
            report: sample_report(0),
            erasure_root: OpaqueHash::zero(),
            timeout_slot: 10,
        });
        let report = sample_report(0);
        let input = ReportsInput {
            guarantees: vec![GuaranteeEntry {
                report,
                slot: 1,
                signatures: vec![],
            }],
        };
        let err = apply_reports(&state, &input, &params).unwrap_err();
        assert_eq!(err, ReportsError::CoreEngaged(0));
    }

    #[test]
    fn missing_authorizer_rejected() {
        let params = Params::tiny();
        let state = JamState::genesis(&params);
        let report = sample_report(0);
        let input = ReportsInput {
            guarantees: vec![GuaranteeEntry {
                report,
                slot: 1,
                signatures: vec![],
            }],
        };
        let err = apply_reports(&state, &input, &params).unwrap_err();
        assert_eq!(err, ReportsError::BadAuthorizer);
    }

    #[test]
    fn unresolved_segment_root_lookup_rejected() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        state.auth_pools[0].push(OpaqueHash::zero());
        let mut report = sample_report(0);
        report
            .segment_root_lookup
            .push((WorkPackageHash([0xAB; 32]), ExportsRoot::zero()));
        let input = ReportsInput {
            guarantees: vec![GuaranteeEntry {
                report,
                slot: 1,
                signatures: vec![],
            }],
        };
        let err = apply_reports(&state, &input, &params).unwrap_err();
        assert_eq!(err, ReportsError::DependencyMissing);
    }
}
