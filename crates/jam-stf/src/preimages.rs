//! Preimages (spec §4.5, C6): fulfils preimage requests a service has
//! already solicited, recording the providing slot.

use thiserror::Error;

use jam_crypto::blake2b256;
use jam_types::{JamState, PreimageLookupKey, ServiceId, TimeSlot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreimageEntry {
    pub requester: ServiceId,
    pub blob: Vec<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreimagesInput {
    pub preimages: Vec<PreimageEntry>,
    pub slot: TimeSlot,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreimagesError {
    #[error("service {service} did not solicit preimage {hash:?}")]
    PreimageUnneeded { service: ServiceId, hash: jam_types::OpaqueHash },
    #[error("preimages extrinsic is not sorted by strictly ascending (requester, blob)")]
    PreimagesNotSortedUnique,
    #[error("requester {0} is not a known service")]
    UnknownService(ServiceId),
}

pub fn apply_preimages(
    pre: &JamState,
    input: &PreimagesInput,
) -> Result<JamState, PreimagesError> {
    let mut post = pre.clone();

    let mut prev_key: Option<(ServiceId, &Vec<u8>)> = None;
    for entry in &input.preimages {
        let key = (entry.requester, &entry.blob);
        if let Some(prev) = prev_key {
            if key <= prev {
                return Err(PreimagesError::PreimagesNotSortedUnique);
            }
        }
        prev_key = Some(key);

        let hash = jam_types::OpaqueHash(blake2b256(&entry.blob));
        let lookup_key = PreimageLookupKey {
            hash,
            length: entry.blob.len() as u32,
        };

        let service = post
            .services
            .get_mut(&entry.requester)
            .ok_or(PreimagesError::UnknownService(entry.requester))?;

        let solicited_empty = service
            .preimage_lookups
            .get(&lookup_key)
            .is_some_and(Vec::is_empty);
        if !solicited_empty {
            return Err(PreimagesError::PreimageUnneeded {
                service: entry.requester,
                hash,
            });
        }

        service.preimages.insert(hash, entry.blob.clone());
        service
            .push_lookup_slot(lookup_key, input.slot)
            .expect("freshly-emptied lookup slots always have room");
    }

    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_types::{OpaqueHash, Params, ServiceAccount};

    #[test]
    fn unsolicited_preimage_rejected() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        state.services.insert(7, ServiceAccount::new(OpaqueHash::zero(), 0));
        let input = PreimagesInput {
            preimages: vec![PreimageEntry {
                requester: 7,
                blob: vec![1, 2, 3],
            }],
            slot: 1,
        };
        let err = apply_preimages(&state, &input).unwrap_err();
        assert!(matches!(err, PreimagesError::PreimageUnneeded { .. }));
    }

    #[test]
    fn solicited_preimage_is_absorbed() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        let mut account = ServiceAccount::new(OpaqueHash::zero(), 0);
        let blob = vec![1, 2, 3];
        let hash = OpaqueHash(blake2b256(&blob));
        let key = PreimageLookupKey {
            hash,
            length: blob.len() as u32,
        };
        account.preimage_lookups.insert(key, vec![]);
        state.services.insert(7, account);

        let input = PreimagesInput {
            preimages: vec![PreimageEntry { requester: 7, blob: blob.clone() }],
            slot: 3,
        };
        let post = apply_preimages(&state, &input).unwrap();
        let service = post.services.get(&7).unwrap();
        assert_eq!(service.preimages.get(&hash), Some(&blob));
        assert_eq!(service.preimage_lookups.get(&key), Some(&vec![3]));
    }

    #[test]
    fn unsorted_preimages_rejected() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        state.services.insert(7, ServiceAccount::new(OpaqueHash::zero(), 0));
        let input = PreimagesInput {
            preimages: vec![
                PreimageEntry { requester: 7, blob: vec![9] },
                PreimageEntry { requester: 7, blob: vec![1] },
            ],
            slot: 1,
        };
        let err = apply_preimages(&state, &input).unwrap_err();
        assert_eq!(err, PreimagesError::PreimagesNotSortedUnique);
    }
}
