//! The accumulation driver (spec §4.5, C4 "Accumulation"): invokes each
//! ready report's services against the PVM, one code-hash invocation per
//! `WorkResult`, committing or rolling back per spec §5.4's checkpoint rule.
//!
//! Grounded on `pvm-rust/src/state_wrapper.rs`'s step-and-dispatch loop,
//! generalized from a single fixed machine to one fresh `PvmInstance` per
//! invocation — accumulation is the only STF that runs service code, so this
//! is the one place `jam-pvm`/`jam-host-calls` are driven together.

use std::collections::{BTreeSet, HashSet};

use jam_crypto::blake2b256;
use jam_host_calls::{dispatch, DeferredTransfer, HostCallContext, HostCallOutcome};
use jam_pvm::{Outcome, PageAccess, Program, PvmInstance, Terminal};
use jam_types::{
    JamState, OpaqueHash, Params, ReadyRecord, ServiceId, TimeSlot, WorkPackageHash, WorkResult,
};

use crate::context::{AccumDimension, AccumulationContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulateInput {
    pub slot: TimeSlot,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccumulateOutput {
    /// Accumulate-root commitment over this block's yielded hashes, in
    /// ascending service-id order (spec §4.5's accumulate-root output).
    pub root: OpaqueHash,
    pub accumulated: Vec<WorkPackageHash>,
}

fn dimension_from_state(state: &JamState) -> AccumDimension {
    AccumDimension {
        services: state.services.clone(),
        privileges: state.privileges.clone(),
        auth_queues: state.auth_queues.clone(),
        next_validators: state.next_validators.clone(),
        next_free_id: state.services.keys().copied().max().map_or(0, |m| m + 1),
    }
}

fn write_into_state(state: &mut JamState, dimension: AccumDimension) {
    state.services = dimension.services;
    state.privileges = dimension.privileges;
    state.auth_queues = dimension.auth_queues;
    state.next_validators = dimension.next_validators;
}

/// Runs one service invocation (one `WorkResult`'s code hash) to completion
/// against `ctx`'s regular dimension, returning the yielded hash on success.
/// Any trap/out-of-gas/segfault/run-error rolls `ctx.regular` back to its
/// last checkpoint and yields nothing.
fn invoke(
    ctx: &mut AccumulationContext,
    result: &WorkResult,
    slot: TimeSlot,
    params: &Params,
) -> Option<OpaqueHash> {
    let Some(service) = ctx.regular.services.get(&result.service_id) else {
        return None;
    };
    let Some(code) = service.preimages.get(&result.code_hash) else {
        return None;
    };
    let Ok(program) = Program::decode(code) else {
        return None;
    };

    let mut vm = PvmInstance::new(program, result.accumulate_gas as i64, params.pvm_page_size);
    vm.ram.init_region(0, params.pvm_zone_size, PageAccess::ReadWrite);

    let mut checkpoint_requested = false;
    let mut yield_hash: Option<OpaqueHash> = None;
    let mut transfers_out: Vec<DeferredTransfer> = Vec::new();
    let mut log = Vec::new();

    loop {
        match vm.step() {
            Outcome::Continue => continue,
            Outcome::Terminal(Terminal::HostCall { id }) => {
                let mut call_ctx = HostCallContext {
                    registers: &mut vm.registers,
                    ram: &mut vm.ram,
                    gas: &mut vm.gas,
                    service_id: result.service_id,
                    services: &mut ctx.regular.services,
                    privileges: &mut ctx.regular.privileges,
                    auth_queues: &mut ctx.regular.auth_queues,
                    next_validators: &mut ctx.regular.next_validators,
                    next_free_id: &mut ctx.regular.next_free_id,
                    timeslot: slot,
                    checkpoint_requested: &mut checkpoint_requested,
                    yield_hash: &mut yield_hash,
                    transfers_out: &mut transfers_out,
                    params,
                    log: &mut log,
                };
                match dispatch(id, &mut call_ctx) {
                    HostCallOutcome::Continue => {
                        if checkpoint_requested {
                            ctx.checkpoint();
                            checkpoint_requested = false;
                        }
                    }
                    HostCallOutcome::OutOfGas => {
                        ctx.rollback();
                        return None;
                    }
                    HostCallOutcome::Trap => {
                        ctx.rollback();
                        return None;
                    }
                }
            }
            Outcome::Terminal(Terminal::Halt) => break,
            Outcome::Terminal(Terminal::Trap)
            | Outcome::Terminal(Terminal::OutOfGas)
            | Outcome::Terminal(Terminal::Segfault { .. })
            | Outcome::Terminal(Terminal::InstanceRunError(_)) => {
                ctx.rollback();
                return None;
            }
        }
    }

    for transfer in transfers_out {
        if let Some(dest) = ctx.regular.services.get_mut(&transfer.dest) {
            dest.balance += transfer.amount;
        }
    }

    yield_hash
}

/// Applies accumulation: every report in `pre.reports_ready[slot_idx]` whose
/// dependencies are already accumulated gets invoked; the rest stay queued.
/// Infallible — a failing invocation rolls back to its own checkpoint rather
/// than aborting the whole block (spec §5.4).
pub fn apply_accumulation(pre: &JamState, input: &AccumulateInput, params: &Params) -> (JamState, AccumulateOutput) {
    let mut post = pre.clone();
    let slot_idx = (input.slot % params.epoch_length) as usize;

    let already_accumulated: HashSet<WorkPackageHash> = pre
        .accumulated_reports
        .iter()
        .flatten()
        .copied()
        .collect();

    let pending: Vec<ReadyRecord> = pre.reports_ready[slot_idx].clone();
    let (mut satisfied, unsatisfied): (Vec<ReadyRecord>, Vec<ReadyRecord>) = pending
        .into_iter()
        .partition(|record| record.dependencies.iter().all(|d| already_accumulated.contains(d)));
    satisfied.sort_by(|a, b| a.work_report.package_spec.hash.0.cmp(&b.work_report.package_spec.hash.0));
    post.reports_ready[slot_idx] = unsatisfied;

    let mut dimension = dimension_from_state(&post);
    let mut yields: Vec<(ServiceId, OpaqueHash)> = Vec::new();
    let mut accumulated_hashes = Vec::new();

    for record in &satisfied {
        let mut ctx = AccumulationContext::new(dimension.clone());
        for result in &record.work_report.results {
            if let Some(hash) = invoke(&mut ctx, result, input.slot, params) {
                yields.push((result.service_id, hash));
            }
        }
        dimension = ctx.regular;
        accumulated_hashes.push(record.work_report.package_spec.hash);
    }

    write_into_state(&mut post, dimension);

    let existing: BTreeSet<WorkPackageHash> = post.accumulated_reports[slot_idx].iter().copied().collect();
    for hash in &accumulated_hashes {
        if !existing.contains(hash) {
            post.accumulated_reports[slot_idx].push(*hash);
        }
    }

    yields.sort_by(|a, b| a.0.cmp(&b.0));
    let mut buf = Vec::new();
    for (_, hash) in &yields {
        buf.extend_from_slice(&hash.0);
    }
    let root = OpaqueHash(blake2b256(&buf));

    (post, AccumulateOutput { root, accumulated: accumulated_hashes })
}
