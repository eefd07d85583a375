//! Safrole (spec §4.5, C1): ticket submission, the slot-sealer lottery, and
//! validator-set rotation at epoch boundaries.
//!
//! New — transcribed from spec.md §4.5's Safrole description and §7's error
//! taxonomy; there is no Safrole analogue in the teacher (`pvm-rust` has no
//! block-production layer), so the ticket-accumulator/fallback-key logic is
//! built directly from the spec rather than adapted from existing code. The
//! `jam-crypto::VrfEngine` seam is exercised the same way `jam-host-calls`
//! exercises `jam-crypto::ed25519_verify` — a pure verification call the STF
//! treats as an external collaborator.

use thiserror::Error;

use jam_crypto::{blake2b256, VrfEngine};
use jam_types::{
    BandersnatchPublic, BandersnatchRingVrfSignature, Entropy, JamState, OpaqueHash, Params,
    SlotSealerSeries, Ticket, TimeSlot, ValidatorData,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketEnvelope {
    pub attempt: u8,
    pub signature: BandersnatchRingVrfSignature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafroleInput {
    pub slot: TimeSlot,
    /// Fresh per-block entropy, already VRF-attested by the block author
    /// (spec treats entropy generation as an external collaborator; the STF
    /// only rolls it into η).
    pub entropy: Entropy,
    pub tickets: Vec<TicketEnvelope>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochMark {
    pub entropy: Entropy,
    pub validators: Vec<BandersnatchPublic>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SafroleOutput {
    pub epoch_mark: Option<EpochMark>,
    pub tickets_mark: Option<Vec<Ticket>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SafroleError {
    #[error("slot {new_slot} does not advance past current slot {current_slot}")]
    BadSlot { current_slot: TimeSlot, new_slot: TimeSlot },
    #[error("ticket submitted after this epoch's submission cutoff")]
    UnexpectedTicket,
    #[error("tickets extrinsic is not strictly ordered by ascending ticket id")]
    BadTicketOrder,
    #[error("ticket proof failed ring-VRF verification")]
    BadTicketProof,
    #[error("ticket attempt {0} exceeds the per-validator attempt bound")]
    BadTicketAttempt(u8),
    #[error("ticket id already present in the accumulator")]
    DuplicateTicket,
    #[error("slot-sealer series for this epoch is already finalized")]
    Reserved,
}

/// A ticket's id is the ring-VRF output the envelope's proof attests to.
/// Real bandersnatch ring-VRF derives this output from curve arithmetic over
/// `proof`; since `jam-crypto::VrfEngine` only exposes a verify-against-a-
/// claimed-output call (spec §6's collaborator boundary), this STF derives
/// the claimed output the same way `NullEngine` computes it so the two sides
/// agree by construction. A curve-backed `VrfEngine` would replace both this
/// derivation and `NullEngine::bandersnatch_ring_vrf_verify` together.
fn derive_ticket_id(ring_root: OpaqueHash, vrf_input: &[u8], proof: &[u8; 96]) -> OpaqueHash {
    let mut buf = Vec::with_capacity(32 + vrf_input.len() + proof.len());
    buf.extend_from_slice(&ring_root.0);
    buf.extend_from_slice(vrf_input);
    buf.extend_from_slice(proof);
    OpaqueHash(blake2b256(&buf))
}

fn fallback_keys(entropy: Entropy, validators: &[ValidatorData], count: u32) -> Vec<BandersnatchPublic> {
    if validators.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|i| {
            let mut buf = entropy.0.to_vec();
            buf.extend_from_slice(&i.to_le_bytes());
            let digest = blake2b256(&buf);
            let idx = u32::from_le_bytes(digest[0..4].try_into().expect("4 bytes")) as usize
                % validators.len();
            validators[idx].bandersnatch
        })
        .collect()
}

/// Applies the Safrole STF: validates + absorbs tickets, rolls entropy, and
/// (at an epoch boundary) rotates validator sets and finalizes the upcoming
/// epoch's slot-sealer series.
pub fn apply_safrole(
    pre: &JamState,
    input: &SafroleInput,
    params: &Params,
    vrf: &dyn VrfEngine,
) -> Result<(JamState, SafroleOutput), SafroleError> {
    if input.slot <= pre.time_slot {
        return Err(SafroleError::BadSlot {
            current_slot: pre.time_slot,
            new_slot: input.slot,
        });
    }

    let mut post = pre.clone();
    let epoch_slot = input.slot % params.epoch_length;
    let prior_epoch = pre.time_slot / params.epoch_length;
    let new_epoch = input.slot / params.epoch_length;

    if !input.tickets.is_empty() && epoch_slot >= params.ticket_submission_end_epoch_slot {
        return Err(SafroleError::UnexpectedTicket);
    }

    let mut last_id: Option<OpaqueHash> = None;
    for envelope in &input.tickets {
        if envelope.attempt as u32 >= params.max_ticket_entries_per_validator {
            return Err(SafroleError::BadTicketAttempt(envelope.attempt));
        }
        let vrf_input = [input.entropy.0.as_slice(), &[envelope.attempt]].concat();
        let proof: [u8; 96] = envelope.signature.0[0..96].try_into().expect("96-byte prefix");
        let id = derive_ticket_id(pre.safrole.ring_root, &vrf_input, &proof);

        if let Some(prev) = last_id {
            if id.0 <= prev.0 {
                return Err(SafroleError::BadTicketOrder);
            }
        }
        last_id = Some(id);
        if post.safrole.ticket_accumulator.iter().any(|t| t.id == id) {
            return Err(SafroleError::DuplicateTicket);
        }
        if !vrf.bandersnatch_ring_vrf_verify(&pre.safrole.ring_root.0, &vrf_input, &id.0, &proof) {
            return Err(SafroleError::BadTicketProof);
        }

        post.safrole.ticket_accumulator.push(Ticket {
            id,
            attempt: envelope.attempt,
        });
    }
    post.safrole
        .ticket_accumulator
        .sort_by(|a, b| a.id.0.cmp(&b.id.0));
    post.safrole
        .ticket_accumulator
        .truncate(params.epoch_length as usize);

    post.entropy.roll(input.entropy);
    post.time_slot = input.slot;

    let mut output = SafroleOutput::default();
    if new_epoch > prior_epoch {
        post.previous_validators = pre.current_validators.clone();
        post.current_validators = pre.next_validators.clone();
        post.safrole.next_validators = post.next_validators.clone();

        let finalized = if pre.safrole.ticket_accumulator.len() as u32 == params.epoch_length {
            let tickets = pre.safrole.ticket_accumulator.clone();
            output.tickets_mark = Some(tickets.clone());
            SlotSealerSeries::Tickets(tickets)
        } else {
            SlotSealerSeries::FallbackKeys(fallback_keys(
                post.entropy.0[2],
                &post.current_validators,
                params.epoch_length,
            ))
        };
        post.safrole.slot_sealer_series = finalized;
        post.safrole.ticket_accumulator.clear();

        output.epoch_mark = Some(EpochMark {
            entropy: post.entropy.0[1],
            validators: post.current_validators.iter().map(|v| v.bandersnatch).collect(),
        });
    }

    Ok((post, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_crypto::NullEngine;
    use jam_types::OpaqueHash;

    fn state_with_tiny_params() -> (JamState, Params) {
        let params = Params::tiny();
        (JamState::genesis(&params), params)
    }

    #[test]
    fn rejects_non_advancing_slot() {
        let (state, params) = state_with_tiny_params();
        let input = SafroleInput {
            slot: 0,
            entropy: Entropy::zero(),
            tickets: vec![],
        };
        let err = apply_safrole(&state, &input, &params, &NullEngine).unwrap_err();
        assert_eq!(
            err,
            SafroleError::BadSlot {
                current_slot: 0,
                new_slot: 0
            }
        );
    }

    #[test]
    fn advances_slot_and_rolls_entropy() {
        let (state, params) = state_with_tiny_params();
        let fresh = Entropy([7u8; 32]);
        let input = SafroleInput {
            slot: 1,
            entropy: fresh,
            tickets: vec![],
        };
        let (post, output) = apply_safrole(&state, &input, &params, &NullEngine).unwrap();
        assert_eq!(post.time_slot, 1);
        assert_eq!(post.entropy.0[0], fresh);
        assert!(output.epoch_mark.is_none());
    }

    #[test]
    fn rejects_ticket_after_submission_cutoff() {
        let (mut state, params) = state_with_tiny_params();
        state.time_slot = params.ticket_submission_end_epoch_slot;
        let envelope = TicketEnvelope {
            attempt: 0,
            signature: BandersnatchRingVrfSignature([0u8; 784]),
        };
        let input = SafroleInput {
            slot: params.ticket_submission_end_epoch_slot + 1,
            entropy: Entropy::zero(),
            tickets: vec![envelope],
        };
        let err = apply_safrole(&state, &input, &params, &NullEngine).unwrap_err();
        assert_eq!(err, SafroleError::UnexpectedTicket);
    }

    #[test]
    fn valid_ticket_is_absorbed_with_matching_vrf_proof() {
        let (state, params) = state_with_tiny_params();
        let entropy = Entropy([3u8; 32]);
        let attempt = 0u8;
        let proof = [5u8; 96];
        let envelope = TicketEnvelope {
            attempt,
            signature: BandersnatchRingVrfSignature({
                let mut sig = [0u8; 784];
                sig[0..96].copy_from_slice(&proof);
                sig
            }),
        };
        let input = SafroleInput {
            slot: 1,
            entropy,
            tickets: vec![envelope],
        };
        let (post, _) = apply_safrole(&state, &input, &params, &NullEngine).unwrap();
        assert_eq!(post.safrole.ticket_accumulator.len(), 1);
        assert_eq!(post.safrole.ticket_accumulator[0].attempt, attempt);
    }

    #[test]
    fn duplicate_ticket_id_rejected() {
        let (mut state, params) = state_with_tiny_params();
        let entropy = Entropy([3u8; 32]);
        let attempt = 0u8;
        let proof = [5u8; 96];
        let vrf_input = [entropy.0.as_slice(), &[attempt]].concat();
        let id = derive_ticket_id(state.safrole.ring_root, &vrf_input, &proof);
        state.safrole.ticket_accumulator.push(Ticket { id, attempt });

        let envelope = TicketEnvelope {
            attempt,
            signature: BandersnatchRingVrfSignature({
                let mut sig = [0u8; 784];
                sig[0..96].copy_from_slice(&proof);
                sig
            }),
        };
        let input = SafroleInput {
            slot: 1,
            entropy,
            tickets: vec![envelope],
        };
        let err = apply_safrole(&state, &input, &params, &NullEngine).unwrap_err();
        assert_eq!(err, SafroleError::DuplicateTicket);
    }

    #[test]
    fn epoch_rollover_rotates_validators() {
        let (mut state, params) = state_with_tiny_params();
        state.next_validators[0].bandersnatch = BandersnatchPublic([9u8; 32]);
        let input = SafroleInput {
            slot: params.epoch_length,
            entropy: Entropy::zero(),
            tickets: vec![],
        };
        let (post, output) = apply_safrole(&state, &input, &params, &NullEngine).unwrap();
        assert_eq!(post.current_validators[0].bandersnatch, BandersnatchPublic([9u8; 32]));
        assert!(output.epoch_mark.is_some());
    }
}
