//! Disputes (spec §4.5, C2): judges verdicts on disputed work reports and
//! punishes guarantors/auditors whose votes disagree with the outcome.
//!
//! New — transcribed from spec.md §4.5/§7; no disputes analogue exists in
//! the teacher. Ed25519 verification reuses `jam-crypto::ed25519_verify`
//! exactly as `jam-host-calls` does for host-call signatures.

use thiserror::Error;

use jam_crypto::ed25519_verify;
use jam_types::{Ed25519Public, Ed25519Signature, JamState, OpaqueHash, Params, ValidatorIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgement {
    pub validator_index: ValidatorIndex,
    pub vote: bool,
    pub signature: Ed25519Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub target: OpaqueHash,
    /// Epoch index the judging validator set is drawn from: must be the
    /// current epoch or the one immediately prior.
    pub age: u32,
    pub votes: Vec<Judgement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Culprit {
    pub target: OpaqueHash,
    pub key: Ed25519Public,
    pub signature: Ed25519Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub target: OpaqueHash,
    pub vote: bool,
    pub key: Ed25519Public,
    pub signature: Ed25519Signature,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisputesInput {
    pub verdicts: Vec<Verdict>,
    pub culprits: Vec<Culprit>,
    pub faults: Vec<Fault>,
    /// Cleared pending-report slots a bad verdict should vacate, identified
    /// by the core index whose assignment's report hash matches the target
    /// (the caller precomputes these since `jam-stf` crates don't cross-call
    /// each other).
    pub bad_report_cores: Vec<(OpaqueHash, u16)>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisputesOutput {
    pub offenders: Vec<Ed25519Public>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisputesError {
    #[error("work report {0:?} has already been judged")]
    AlreadyJudged(OpaqueHash),
    #[error("verdict vote count does not match the judging validator set size")]
    BadVoteSplit,
    #[error("verdicts extrinsic is not sorted by strictly ascending target")]
    VerdictsNotSortedUnique,
    #[error("culprits extrinsic is not sorted by strictly ascending (target, key)")]
    CulpritsNotSortedUnique,
    #[error("faults extrinsic is not sorted by strictly ascending (target, key)")]
    FaultsNotSortedUnique,
    #[error("a bad verdict requires at least two distinct culprits")]
    NotEnoughCulprits,
    #[error("a good verdict requires a fault for every validator that voted bad")]
    NotEnoughFaults,
    #[error("culprit reported against a verdict that did not resolve bad")]
    CulpritsVerdictNotBad,
    #[error("fault vote does not contradict the verdict it targets")]
    FaultVerdictWrong,
    #[error("offender already recorded as punished")]
    OffenderAlreadyReported,
    #[error("verdict age is neither the current epoch nor the prior one")]
    BadJudgementAge,
    #[error("validator index out of range or votes not strictly ascending")]
    BadValidatorIndex,
    #[error("ed25519 signature verification failed")]
    BadSignature,
    #[error("culprit key is not a current or previous validator key")]
    BadGuarantorKey,
    #[error("fault key is not a current or previous validator key")]
    BadAuditorKey,
}

pub fn apply_disputes(
    pre: &JamState,
    input: &DisputesInput,
    params: &Params,
    current_epoch: u32,
) -> Result<(JamState, DisputesOutput), DisputesError> {
    let mut post = pre.clone();
    let mut offenders: Vec<Ed25519Public> = Vec::new();

    let mut prev_target: Option<OpaqueHash> = None;
    for verdict in &input.verdicts {
        if let Some(prev) = prev_target {
            if verdict.target.0 <= prev.0 {
                return Err(DisputesError::VerdictsNotSortedUnique);
            }
        }
        prev_target = Some(verdict.target);

        if pre.disputes.already_judged(&verdict.target) {
            return Err(DisputesError::AlreadyJudged(verdict.target));
        }
        if verdict.age != current_epoch && verdict.age + 1 != current_epoch {
            return Err(DisputesError::BadJudgementAge);
        }
        if verdict.votes.len() != params.validators_count as usize {
            return Err(DisputesError::BadVoteSplit);
        }

        let judging_set = if verdict.age == current_epoch {
            &pre.current_validators
        } else {
            &pre.previous_validators
        };

        let mut prev_idx: Option<ValidatorIndex> = None;
        let mut count_good = 0u32;
        for judgement in &verdict.votes {
            if let Some(prev) = prev_idx {
                if judgement.validator_index <= prev {
                    return Err(DisputesError::BadValidatorIndex);
                }
            }
            prev_idx = Some(judgement.validator_index);
            let Some(validator) = judging_set.get(judgement.validator_index as usize) else {
                return Err(DisputesError::BadValidatorIndex);
            };
            let message = [verdict.target.0.as_slice(), &[judgement.vote as u8]].concat();
            let ok = ed25519_verify(&validator.ed25519.0, &message, &judgement.signature.0)
                .map_err(|_| DisputesError::BadSignature)?;
            if !ok {
                return Err(DisputesError::BadSignature);
            }
            if judgement.vote {
                count_good += 1;
            }
        }

        if count_good >= params.validators_super_majority as u32 {
            post.disputes.good.push(verdict.target);

            let bad_voters: Vec<ValidatorIndex> = verdict
                .votes
                .iter()
                .filter(|j| !j.vote)
                .map(|j| j.validator_index)
                .collect();
            for voter in &bad_voters {
                let key = judging_set[*voter as usize].ed25519;
                let has_fault = input.faults.iter().any(|f| {
                    f.target == verdict.target && f.key == key
                });
                if !has_fault {
                    return Err(DisputesError::NotEnoughFaults);
                }
            }
            for fault in input.faults.iter().filter(|f| f.target == verdict.target) {
                if fault.vote {
                    return Err(DisputesError::FaultVerdictWrong);
                }
                let belongs = pre.current_validators.iter().any(|v| v.ed25519 == fault.key)
                    || pre.previous_validators.iter().any(|v| v.ed25519 == fault.key);
                if !belongs {
                    return Err(DisputesError::BadAuditorKey);
                }
                let ok = ed25519_verify(&fault.key.0, &verdict.target.0, &fault.signature.0)
                    .map_err(|_| DisputesError::BadSignature)?;
                if !ok {
                    return Err(DisputesError::BadSignature);
                }
                if !offenders.contains(&fault.key) && !post.disputes.punish.contains(&OpaqueHash(fault.key.0)) {
                    offenders.push(fault.key);
                    post.disputes.punish.push(OpaqueHash(fault.key.0));
                } else if post.disputes.punish.contains(&OpaqueHash(fault.key.0)) {
                    return Err(DisputesError::OffenderAlreadyReported);
                }
            }
        } else if count_good == 0 {
            post.disputes.bad.push(verdict.target);

            let culprits: Vec<&Culprit> = input.culprits.iter().filter(|c| c.target == verdict.target).collect();
            if culprits.len() < 2 {
                return Err(DisputesError::NotEnoughCulprits);
            }
            for culprit in &culprits {
                let belongs = pre.current_validators.iter().any(|v| v.ed25519 == culprit.key)
                    || pre.previous_validators.iter().any(|v| v.ed25519 == culprit.key);
                if !belongs {
                    return Err(DisputesError::BadGuarantorKey);
                }
                let ok = ed25519_verify(&culprit.key.0, &culprit.target.0, &culprit.signature.0)
                    .map_err(|_| DisputesError::BadSignature)?;
                if !ok {
                    return Err(DisputesError::BadSignature);
                }
                if post.disputes.punish.contains(&OpaqueHash(culprit.key.0)) {
                    return Err(DisputesError::OffenderAlreadyReported);
                }
                if !offenders.contains(&culprit.key) {
                    offenders.push(culprit.key);
                    post.disputes.punish.push(OpaqueHash(culprit.key.0));
                }
            }

            for (target, core) in &input.bad_report_cores {
                if *target == verdict.target {
                    if let Some(slot) = post.pending_reports.get_mut(*core as usize) {
                        *slot = None;
                    }
                }
            }
        } else {
            post.disputes.wonky.push(verdict.target);
        }
    }

    let mut prev_culprit: Option<(OpaqueHash, Ed25519Public)> = None;
    for culprit in &input.culprits {
        let key = (culprit.target, culprit.key);
        if let Some(prev) = prev_culprit {
            if key <= prev {
                return Err(DisputesError::CulpritsNotSortedUnique);
            }
        }
        prev_culprit = Some(key);
        if !post.disputes.bad.contains(&culprit.target) {
            return Err(DisputesError::CulpritsVerdictNotBad);
        }
    }

    let mut prev_fault: Option<(OpaqueHash, Ed25519Public)> = None;
    for fault in &input.faults {
        let key = (fault.target, fault.key);
        if let Some(prev) = prev_fault {
            if key <= prev {
                return Err(DisputesError::FaultsNotSortedUnique);
            }
        }
        prev_fault = Some(key);
    }

    Ok((post, DisputesOutput { offenders }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use jam_types::ValidatorData;

    fn validator_from_seed(seed: u8) -> (ValidatorData, SigningKey) {
        let signing_key = SigningKey::from_bytes(&[seed; 32]);
        let mut validator = ValidatorData::default();
        validator.ed25519 = Ed25519Public(signing_key.verifying_key().to_bytes());
        (validator, signing_key)
    }

    fn tiny_state_with_validators() -> (JamState, Params, Vec<SigningKey>) {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        let mut keys = Vec::new();
        for i in 0..params.validators_count {
            let (validator, key) = validator_from_seed(i as u8 + 1);
            state.current_validators[i as usize] = validator;
            state.previous_validators[i as usize] = state.current_validators[i as usize];
            keys.push(key);
        }
        (state, params, keys)
    }

    #[test]
    fn unanimous_good_verdict_needs_no_culprits() {
        let (state, params, keys) = tiny_state_with_validators();
        let target = OpaqueHash([1u8; 32]);
        let votes: Vec<Judgement> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let message = [target.0.as_slice(), &[1u8]].concat();
                let sig = key.sign(&message);
                Judgement {
                    validator_index: i as u16,
                    vote: true,
                    signature: Ed25519Signature(sig.to_bytes()),
                }
            })
            .collect();
        let input = DisputesInput {
            verdicts: vec![Verdict { target, age: 0, votes }],
            ..Default::default()
        };
        let (post, output) = apply_disputes(&state, &input, &params, 0).unwrap();
        assert!(post.disputes.good.contains(&target));
        assert!(output.offenders.is_empty());
    }

    #[test]
    fn unanimous_bad_verdict_requires_two_culprits() {
        let (state, params, keys) = tiny_state_with_validators();
        let target = OpaqueHash([2u8; 32]);
        let votes: Vec<Judgement> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let message = [target.0.as_slice(), &[0u8]].concat();
                let sig = key.sign(&message);
                Judgement {
                    validator_index: i as u16,
                    vote: false,
                    signature: Ed25519Signature(sig.to_bytes()),
                }
            })
            .collect();
        let input = DisputesInput {
            verdicts: vec![Verdict { target, age: 0, votes }],
            ..Default::default()
        };
        let err = apply_disputes(&state, &input, &params, 0).unwrap_err();
        assert_eq!(err, DisputesError::NotEnoughCulprits);
    }

    #[test]
    fn already_judged_report_rejected() {
        let (mut state, params, _keys) = tiny_state_with_validators();
        let target = OpaqueHash([3u8; 32]);
        state.disputes.good.push(target);
        let input = DisputesInput {
            verdicts: vec![Verdict {
                target,
                age: 0,
                votes: vec![],
            }],
            ..Default::default()
        };
        let err = apply_disputes(&state, &input, &params, 0).unwrap_err();
        assert_eq!(err, DisputesError::AlreadyJudged(target));
    }
}
