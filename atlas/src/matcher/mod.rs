//! Translation estimation between keypoint grids.
//!
//! Offsets are accumulated by voting over descriptor co-occurrences: every
//! point pair sharing a descriptor votes for its coordinate difference.
//! Frame-to-frame matching combines per-region tickets with ranked voting;
//! fragment-to-fragment matching adds cellular overlap verification.

mod fragment;
#[cfg(test)]
mod tests;

pub use fragment::{match_blends, OverlapParams};

use std::collections::HashMap;

use common::FnvBuildHasher;
use glam::IVec2;
use smallvec::SmallVec;

use crate::keypoint::{Grid, Region, MAX_WEIGHT};

/// Matching tunables shared by both matcher levels.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// Once both regions carry this many weight-2 points, only weight-2
    /// descriptors are enumerated.
    pub weight_switch: usize,
    /// Offsets retained per region ticket.
    pub region_votes: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            weight_switch: 10,
            region_votes: 3,
        }
    }
}

/// Candidate offset with its supporting keypoint count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub offset: IVec2,
    pub count: usize,
}

pub(crate) type Totals = HashMap<IVec2, usize, FnvBuildHasher>;

/// Ticket of the best offsets from one region pair, best first.
pub(crate) type Ticket = SmallVec<[Vote; 4]>;

/// Count offset votes between two regions, optionally restricted to
/// strong-edge descriptors.
pub(crate) fn count_offsets(previous: &Region, current: &Region, all_weights: bool) -> Totals {
    let mut totals = Totals::default();

    for (code, current_points) in current.points() {
        if !all_weights && code.weight() != 2 {
            continue;
        }
        let Some(previous_points) = previous.points().get(code) else {
            continue;
        };

        for prev in previous_points {
            for cur in current_points {
                let offset = prev.as_ivec2() - cur.as_ivec2();
                *totals.entry(offset).or_insert(0) += 1;
            }
        }
    }

    totals
}

/// Top `top` offsets by count; ties resolved by offset for reproducibility.
pub(crate) fn top_offsets(totals: &Totals, top: usize) -> Ticket {
    let mut votes: Vec<Vote> = totals
        .iter()
        .map(|(&offset, &count)| Vote { offset, count })
        .collect();

    votes.sort_unstable_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| (a.offset.y, a.offset.x).cmp(&(b.offset.y, b.offset.x)))
    });
    votes.truncate(top);

    Ticket::from_vec(votes)
}

/// One region pair's ticket, applying the weight-switch rule.
pub(crate) fn cast_vote(config: &MatchConfig, previous: &Region, current: &Region) -> Ticket {
    let strong = MAX_WEIGHT - 1;
    let all_weights = previous.counts()[strong] < config.weight_switch
        || current.counts()[strong] <= config.weight_switch;

    top_offsets(
        &count_offsets(previous, current, all_weights),
        config.region_votes,
    )
}

/// Estimate the translation between two frames' keypoint grids.
///
/// Returns `None` when too few regions are active or the winning offset does
/// not lead the runner-up decisively; both are normal outcomes.
pub fn match_grids(config: &MatchConfig, previous: &Grid, current: &Grid) -> Option<IVec2> {
    assert_eq!(previous.layout(), current.layout(), "grid layout mismatch");

    let region_count = previous.layout().region_count();
    let active = current.active_regions();
    if active * 4 < region_count {
        return None;
    }

    // Ranked voting: a ticket's k-th choice contributes region_votes - k.
    let mut totals = Totals::default();
    for (prev, cur) in previous.regions().iter().zip(current.regions()) {
        let ticket = cast_vote(config, prev, cur);
        let mut rank = config.region_votes;
        for vote in &ticket {
            *totals.entry(vote.offset).or_insert(0) += rank;
            rank -= 1;
        }
    }

    let top = top_offsets(&totals, 2);
    match top.as_slice() {
        [] => None,
        [winner] => Some(winner.offset),
        [winner, runner_up, ..] => {
            (winner.count >= runner_up.count + active / 2).then_some(winner.offset)
        }
    }
}
