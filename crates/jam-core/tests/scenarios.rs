//! Block-level scenario tests. These favor determinism/ordering/atomicity
//! checks over byte-exact fixture replay: this workspace's internal PVM
//! opcode numbering and codec choices are its own, not a literal transcript
//! of any external test-vector corpus, so only behavioral properties (not
//! specific encoded bytes) are asserted here.

use jam_core::{apply_block, Block, BlockError};
use jam_crypto::NullEngine;
use jam_stf::{DisputesError, PreimageEntry, PreimagesError, SafroleError, TicketEnvelope};
use jam_types::{BandersnatchRingVrfSignature, BeefyRoot, Entropy, HeaderHash, JamState, Params, StateRoot};

fn empty_block(_params: &Params, slot: u32) -> Block {
    Block {
        header_hash: HeaderHash([slot as u8; 32]),
        beefy_root: BeefyRoot::zero(),
        state_root: StateRoot::zero(),
        reported_packages: vec![],
        slot,
        entropy: Entropy([slot as u8; 32]),
        tickets: vec![],
        verdicts: vec![],
        culprits: vec![],
        faults: vec![],
        bad_report_cores: vec![],
        guarantees: vec![],
        assurances: vec![],
        preimages: vec![],
        author_index: 0,
    }
}

#[test]
fn empty_block_advances_slot_and_history() {
    let params = Params::tiny();
    let state = JamState::genesis(&params);
    let block = empty_block(&params, 1);
    let (post, output) = apply_block(&state, &block, &params, &NullEngine).unwrap();
    assert_eq!(post.time_slot, 1);
    assert_eq!(post.recent_history.entries.len(), 1);
    assert!(output.safrole.epoch_mark.is_none());
}

#[test]
fn non_advancing_slot_rejected_and_state_untouched() {
    let params = Params::tiny();
    let state = JamState::genesis(&params);
    let block = empty_block(&params, 0);
    let err = apply_block(&state, &block, &params, &NullEngine).unwrap_err();
    assert_eq!(
        err,
        BlockError::Safrole(SafroleError::BadSlot {
            current_slot: 0,
            new_slot: 0
        })
    );
}

#[test]
fn duplicate_tickets_in_one_block_are_rejected_as_unordered() {
    let params = Params::tiny();
    let state = JamState::genesis(&params);
    let mut block = empty_block(&params, 1);
    let envelope = TicketEnvelope {
        attempt: 0,
        signature: BandersnatchRingVrfSignature([5u8; 784]),
    };
    block.tickets = vec![envelope.clone(), envelope];
    let err = apply_block(&state, &block, &params, &NullEngine).unwrap_err();
    assert_eq!(err, BlockError::Safrole(SafroleError::BadTicketOrder));
}

#[test]
fn unsorted_preimages_reject_whole_block() {
    let params = Params::tiny();
    let state = JamState::genesis(&params);
    let mut block = empty_block(&params, 1);
    block.preimages = vec![
        PreimageEntry { requester: 7, blob: vec![9] },
        PreimageEntry { requester: 7, blob: vec![1] },
    ];
    let err = apply_block(&state, &block, &params, &NullEngine).unwrap_err();
    assert_eq!(
        err,
        BlockError::Preimages(PreimagesError::PreimagesNotSortedUnique)
    );
}

#[test]
fn epoch_rollover_produces_epoch_mark() {
    let params = Params::tiny();
    let state = JamState::genesis(&params);
    let block = empty_block(&params, params.epoch_length);
    let (_post, output) = apply_block(&state, &block, &params, &NullEngine).unwrap();
    assert!(output.safrole.epoch_mark.is_some());
}

#[test]
fn disputes_already_judged_report_rejected() {
    let params = Params::tiny();
    let mut state = JamState::genesis(&params);
    let target = jam_types::OpaqueHash([3u8; 32]);
    state.disputes.good.push(target);
    let mut block = empty_block(&params, 1);
    block.verdicts = vec![jam_stf::Verdict {
        target,
        age: 0,
        votes: vec![],
    }];
    let err = apply_block(&state, &block, &params, &NullEngine).unwrap_err();
    assert_eq!(
        err,
        BlockError::Disputes(DisputesError::AlreadyJudged(target))
    );
}
