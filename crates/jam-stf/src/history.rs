//! History (spec §4.5, C3): appends the prior block's summary to β,
//! `RecentHistory`. Infallible — there is no extrinsic to validate, only a
//! header-derived record to absorb.

use jam_types::{
    BeefyRoot, BlockInfo, ExportsRoot, HeaderHash, JamState, Params, StateRoot, WorkPackageHash,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryInput {
    pub header_hash: HeaderHash,
    pub beefy_root: BeefyRoot,
    pub state_root: StateRoot,
    pub reported_packages: Vec<(WorkPackageHash, ExportsRoot)>,
}

/// Appends one entry to `recent_history`, evicting the oldest once the
/// window exceeds `params.recent_history_size`.
pub fn apply_history(pre: &JamState, input: &HistoryInput, params: &Params) -> JamState {
    let mut post = pre.clone();
    post.recent_history.push(
        BlockInfo {
            header_hash: input.header_hash,
            beefy_root: input.beefy_root,
            state_root: input.state_root,
            reported_packages: input.reported_packages.clone(),
        },
        params.recent_history_size,
    );
    post
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn pushes_entry_and_evicts_beyond_window() {
        let params = Params::tiny();
        let mut state = JamState::genesis(&params);
        for i in 0..(params.recent_history_size + 3) {
            let input = HistoryInput {
                header_hash: HeaderHash([i as u8; 32]),
                beefy_root: BeefyRoot([0u8; 32]),
                state_root: StateRoot([0u8; 32]),
                reported_packages: vec![],
            };
            state = apply_history(&state, &input, &params);
        }
        assert_eq!(state.recent_history.entries.len() as u32, params.recent_history_size);
        assert_eq!(
            state.recent_history.entries.last().unwrap().header_hash.0[0],
            (params.recent_history_size + 2) as u8
        );
    }
}
