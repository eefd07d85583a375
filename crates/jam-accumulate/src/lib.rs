//! Accumulation (spec §4.5, C4): drives each ready work report's services
//! through the PVM, applying checkpoint/rollback semantics per invocation.

pub mod context;
pub mod driver;

pub use context::{AccumDimension, AccumulationContext};
pub use driver::{apply_accumulation, AccumulateInput, AccumulateOutput};

#[cfg(test)]
mod tests {
    use super::*;
    use jam_pvm::{Program, HALT_ADDRESS};
    use jam_types::{
        ErasureRoot, ExportsRoot, HeaderAnchor, JamState, OpaqueHash, PackageSpec, Params,
        RefineContext, ReadyRecord, ServiceAccount, StateRoot, WorkExecResult, WorkPackageHash,
        WorkReport, WorkResult,
    };

    fn halting_program() -> Vec<u8> {
        // jump_table_length=0, element_size=0, code_length=0, no bitmask bytes:
        // `PvmInstance::step` halts immediately once `pc` reaches the (empty)
        // code's end, per `interpreter.rs::halt_at_end_of_code`.
        vec![0, 0, 0]
    }

    fn sample_report(service_id: u32, code_hash: OpaqueHash) -> WorkReport {
        WorkReport {
            package_spec: PackageSpec {
                hash: WorkPackageHash([service_id as u8 + 1; 32]),
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
                service_id,
                code_hash,
                payload_hash: OpaqueHash::zero(),
                accumulate_gas: 1_000,
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
    fn halting_invocation_accumulates_its_package() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        let code = halting_program();
        assert!(Program::decode(&code).is_ok());
        let code_hash = OpaqueHash([7u8; 32]);
        let mut account = ServiceAccount::new(code_hash, 0);
        account.preimages.insert(code_hash, code);
        state.services.insert(1, account);

        let report = sample_report(1, code_hash);
        state.reports_ready[0].push(ReadyRecord {
            work_report: report.clone(),
            dependencies: vec![],
        });

        let input = AccumulateInput { slot: 0 };
        let (post, output) = apply_accumulation(&state, &input, &params);
        assert_eq!(output.accumulated, vec![report.package_spec.hash]);
        assert!(post.accumulated_reports[0].contains(&report.package_spec.hash));
        assert!(post.reports_ready[0].is_empty());
    }

    #[test]
    fn unresolved_dependency_stays_queued() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        let code_hash = OpaqueHash([7u8; 32]);
        let mut account = ServiceAccount::new(code_hash, 0);
        account.preimages.insert(code_hash, halting_program());
        state.services.insert(1, account);

        let report = sample_report(1, code_hash);
        state.reports_ready[0].push(ReadyRecord {
            work_report: report,
            dependencies: vec![WorkPackageHash([99u8; 32])],
        });

        let input = AccumulateInput { slot: 0 };
        let (post, output) = apply_accumulation(&state, &input, &params);
        assert!(output.accumulated.is_empty());
        assert_eq!(post.reports_ready[0].len(), 1);
    }

    #[test]
    fn bad_code_hash_yields_nothing_without_panicking() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        let report = sample_report(1, OpaqueHash([1u8; 32]));
        state.services.insert(1, ServiceAccount::new(OpaqueHash::zero(), 0));
        state.reports_ready[0].push(ReadyRecord {
            work_report: report.clone(),
            dependencies: vec![],
        });

        let input = AccumulateInput { slot: 0 };
        let (post, output) = apply_accumulation(&state, &input, &params);
        assert_eq!(output.accumulated, vec![report.package_spec.hash]);
        assert_eq!(output.root, OpaqueHash::zero());
        let _ = post;
        let _ = HALT_ADDRESS;
    }
}
