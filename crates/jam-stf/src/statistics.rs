//! Statistics (spec §4.5, C7): per-validator activity counters for the
//! current epoch, rotated to `previous` at each epoch boundary.

use jam_types::{JamState, ValidatorIndex};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatisticsInput {
    pub author_index: ValidatorIndex,
    pub tickets_submitted: u32,
    pub preimages_introduced: u32,
    pub preimage_bytes_introduced: u64,
    pub guarantees_issued: u32,
    pub assurances_issued: u32,
    /// Set by the caller (`jam-core`) when this block crosses an epoch
    /// boundary: `current` rotates into `previous` and resets to zero before
    /// this block's counters are recorded.
    pub epoch_changed: bool,
}

/// Infallible: updates the author's counters and, on an epoch boundary,
/// rotates `current` into `previous`.
pub fn apply_statistics(pre: &JamState, input: &StatisticsInput) -> JamState {
    let mut post = pre.clone();

    if input.epoch_changed {
        post.validator_stats.previous = post.validator_stats.current.clone();
        for record in &mut post.validator_stats.current {
            *record = Default::default();
        }
    }

    if let Some(record) = post
        .validator_stats
        .current
        .get_mut(input.author_index as usize)
    {
        record.blocks_produced += 1;
        record.tickets_submitted += input.tickets_submitted;
        record.preimages_introduced += input.preimages_introduced;
        record.preimage_bytes_introduced += input.preimage_bytes_introduced;
        record.guarantees_issued += input.guarantees_issued;
        record.assurances_issued += input.assurances_issued;
    }

    post
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_types::Params;

    #[test]
    fn records_author_activity() {
        let params = Params::tiny();
        let state = JamState::genesis(&params);
        let input = StatisticsInput {
            author_index: 1,
            tickets_submitted: 2,
            preimages_introduced: 1,
            preimage_bytes_introduced: 100,
            guarantees_issued: 1,
            assurances_issued: 1,
            epoch_changed: false,
        };
        let post = apply_statistics(&state, &input);
        let record = &post.validator_stats.current[1];
        assert_eq!(record.blocks_produced, 1);
        assert_eq!(record.tickets_submitted, 2);
    }

    #[test]
    fn epoch_boundary_rotates_current_into_previous() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        state.validator_stats.current[0].blocks_produced = 5;

        let input = StatisticsInput {
            author_index: 0,
            epoch_changed: true,
            ..Default::default()
        };
        let post = apply_statistics(&state, &input);
        assert_eq!(post.validator_stats.previous[0].blocks_produced, 5);
        assert_eq!(post.validator_stats.current[0].blocks_produced, 1);
    }
}
