//! Fragment-to-fragment matching over blend keypoints.
//!
//! Candidate offsets are binned twice: by offset, then by the 15x15 cell the
//! supporting current-side point falls in. The cell spread separates a
//! genuine wide overlap from a lucky cluster of repeating texture.

use std::collections::{HashMap, HashSet};

use common::{Buffer2, FnvBuildHasher};
use glam::IVec2;

use crate::keypoint::Region;
use crate::types::{Dimensions, Rect};

use super::{MatchConfig, Vote, MAX_WEIGHT};

/// Verification tunables for fragment matching.
#[derive(Debug, Clone, Copy)]
pub struct OverlapParams {
    /// Side length of the spatial-spread cells.
    pub cell_size: usize,
    /// Minimum matched-cell share of the active overlap cells.
    pub cell_support: f32,
    /// Minimum overlap area as a share of either fragment.
    pub min_area_rate: f32,
    /// Minimum matched keypoints per overlap pixel.
    pub min_density: f32,
    /// Slack of the matched-keypoint rate requirement.
    pub match_slack: f32,
}

impl Default for OverlapParams {
    fn default() -> Self {
        Self {
            cell_size: 15,
            cell_support: 0.66,
            min_area_rate: 0.015,
            min_density: 1.0 / 1024.0,
            match_slack: 0.35,
        }
    }
}

#[derive(Debug, Default)]
struct Bucket {
    count: usize,
    cells: HashSet<u32, FnvBuildHasher>,
}

/// Match two fragment blends, returning the verified best offset mapping
/// current coordinates into previous coordinates.
pub fn match_blends(
    config: &MatchConfig,
    params: &OverlapParams,
    previous: &Region,
    previous_mask: &Buffer2<u8>,
    current: &Region,
    current_mask: &Buffer2<u8>,
) -> Option<Vote> {
    let strong = MAX_WEIGHT - 1;
    let all_weights = previous.counts()[strong] < config.weight_switch
        || current.counts()[strong] <= config.weight_switch;

    let cells_wide = current_mask.width().div_ceil(params.cell_size).max(1);

    let mut buckets: HashMap<IVec2, Bucket, FnvBuildHasher> = HashMap::default();
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
                let cell = (cur.y as usize / params.cell_size) * cells_wide
                    + cur.x as usize / params.cell_size;

                let bucket = buckets.entry(offset).or_default();
                bucket.count += 1;
                bucket.cells.insert(cell as u32);
            }
        }
    }

    let (&offset, bucket) = buckets.iter().max_by(|(ao, a), (bo, b)| {
        (a.count, a.cells.len())
            .cmp(&(b.count, b.cells.len()))
            .then_with(|| (bo.y, bo.x).cmp(&(ao.y, ao.x)))
    })?;

    let active = active_cells(previous_mask, current_mask, offset, params.cell_size);
    if active == 0 {
        return None;
    }
    if (bucket.cells.len() as f32) < params.cell_support * active as f32 {
        return None;
    }

    let vote = Vote {
        offset,
        count: bucket.count,
    };
    is_overlapping(params, &vote, previous, previous_mask, current, current_mask)
        .then_some(vote)
}

/// Count current-blend cells that carry content and land on previous-blend
/// content when translated by `offset`. Cells are sampled at their centers.
fn active_cells(
    previous_mask: &Buffer2<u8>,
    current_mask: &Buffer2<u8>,
    offset: IVec2,
    cell_size: usize,
) -> usize {
    let cur_dims = Dimensions::new(current_mask.width(), current_mask.height());
    let prev_dims = Dimensions::new(previous_mask.width(), previous_mask.height());

    let mut active = 0;
    for cy in 0..cur_dims.height.div_ceil(cell_size) {
        for cx in 0..cur_dims.width.div_ceil(cell_size) {
            let center = IVec2::new(
                ((cx * cell_size + cell_size / 2).min(cur_dims.width - 1)) as i32,
                ((cy * cell_size + cell_size / 2).min(cur_dims.height - 1)) as i32,
            );
            if current_mask[cur_dims.index(center)] == 0 {
                continue;
            }
            let translated = center + offset;
            if prev_dims.contains(translated) && previous_mask[prev_dims.index(translated)] != 0 {
                active += 1;
            }
        }
    }
    active
}

struct OverlapSide {
    overlap_keypoints: usize,
    overlap_rate: f32,
    match_rate: f32,
    density: f32,
    area_rate: f32,
}

fn overlap_side(
    vote: &Vote,
    region: &Region,
    own_dims: Dimensions,
    other_mask: &Buffer2<u8>,
    to_other: IVec2,
) -> OverlapSide {
    let other_dims = Dimensions::new(other_mask.width(), other_mask.height());

    // Window of this blend that lands inside the other one.
    let own = Rect::from_origin_dims(IVec2::ZERO, own_dims);
    let other = Rect::from_origin_dims(-to_other, other_dims);
    let window = own.intersect(&other);
    let area = window.area().max(0) as f32;

    let mut inside = 0usize;
    for points in region.points().values() {
        for point in points {
            let point = point.as_ivec2();
            if !window.contains(point) {
                continue;
            }
            let translated = point + to_other;
            if other_dims.contains(translated) && other_mask[other_dims.index(translated)] != 0 {
                inside += 1;
            }
        }
    }

    let total = region.total_count().max(1) as f32;
    OverlapSide {
        overlap_keypoints: inside,
        overlap_rate: inside as f32 / total,
        match_rate: if inside == 0 {
            0.0
        } else {
            vote.count as f32 / inside as f32
        },
        density: if area > 0.0 {
            vote.count as f32 / area
        } else {
            0.0
        },
        area_rate: area / own_dims.area().max(1) as f32,
    }
}

/// Overlap verification with the tunable rate thresholds.
fn is_overlapping(
    params: &OverlapParams,
    vote: &Vote,
    previous: &Region,
    previous_mask: &Buffer2<u8>,
    current: &Region,
    current_mask: &Buffer2<u8>,
) -> bool {
    let prev_dims = Dimensions::new(previous_mask.width(), previous_mask.height());
    let cur_dims = Dimensions::new(current_mask.width(), current_mask.height());

    let prev_side = overlap_side(vote, previous, prev_dims, current_mask, -vote.offset);
    let cur_side = overlap_side(vote, current, cur_dims, previous_mask, vote.offset);

    if prev_side.overlap_keypoints == 0 && cur_side.overlap_keypoints == 0 {
        return false;
    }

    let area_rate = prev_side.area_rate.max(cur_side.area_rate);
    let overlap_rate = prev_side.overlap_rate.max(cur_side.overlap_rate);
    let match_rate = prev_side.match_rate.max(cur_side.match_rate);

    area_rate >= params.min_area_rate
        && prev_side.density >= params.min_density
        && match_rate >= 1.0 - params.match_slack * overlap_rate.hypot(1.0 - area_rate)
}
