//! Pairwise fragment matching and greedy agglomerative merging.

#[cfg(test)]
mod tests;

use rayon::prelude::*;
use tracing::{debug, info};

use common::Buffer2;
use glam::IVec2;

use crate::fragment::Fragment;
use crate::keypoint::{Extractor, Grid, GridLayout};
use crate::matcher::{self, MatchConfig, OverlapParams};

/// Splicing tunables. Fragment blends carry far more strong keypoints than
/// single frames, hence the higher weight switch.
#[derive(Debug, Clone, Copy)]
pub struct SplicerConfig {
    pub match_config: MatchConfig,
    pub overlap: OverlapParams,
}

impl Default for SplicerConfig {
    fn default() -> Self {
        Self {
            match_config: MatchConfig {
                weight_switch: 100,
                region_votes: 3,
            },
            overlap: OverlapParams::default(),
        }
    }
}

/// A fragment with the keypoints and coverage mask of its blend.
struct Snippet {
    fragment: Fragment,
    grid: Grid,
    mask: Buffer2<u8>,
}

fn snip(fragment: Fragment) -> Snippet {
    let blend = fragment.blend();
    let dims = fragment.dimensions();
    let mut extractor = Extractor::new(dims, GridLayout::SINGLE);
    let (grid, _) = extractor
        .extract(&blend.image)
        .expect("snippet dimensions match its own blend");
    Snippet {
        fragment,
        grid,
        mask: blend.mask,
    }
}

/// Matching edge between two live snippets; `offset` maps `b` coordinates
/// into `a` coordinates.
#[derive(Debug, Clone, Copy)]
struct MergeEdge {
    a: usize,
    b: usize,
    offset: IVec2,
    count: usize,
}

fn match_pair(config: &SplicerConfig, slab: &[Option<Snippet>], a: usize, b: usize) -> Option<MergeEdge> {
    let (prev, cur) = (slab[a].as_ref()?, slab[b].as_ref()?);
    matcher::match_blends(
        &config.match_config,
        &config.overlap,
        prev.grid.region(0),
        &prev.mask,
        cur.grid.region(0),
        &cur.mask,
    )
    .map(|vote| MergeEdge {
        a,
        b,
        offset: vote.offset,
        count: vote.count,
    })
}

/// Merge fragments pairwise until no acceptable match remains.
///
/// Edges are consumed best-score first with a deterministic id tie-break, so
/// the result does not depend on thread scheduling.
pub fn splice(fragments: Vec<Fragment>, config: &SplicerConfig) -> Vec<Fragment> {
    if fragments.len() <= 1 {
        return fragments;
    }

    let mut slab: Vec<Option<Snippet>> = fragments
        .into_par_iter()
        .map(|fragment| Some(snip(fragment)))
        .collect();

    let initial: Vec<(usize, usize)> = (0..slab.len())
        .flat_map(|a| (a + 1..slab.len()).map(move |b| (a, b)))
        .collect();
    let mut edges: Vec<MergeEdge> = initial
        .par_iter()
        .filter_map(|&(a, b)| match_pair(config, &slab, a, b))
        .collect();

    while let Some(best) = take_best_edge(&mut edges) {
        let source = slab[best.b].take().expect("edge endpoints are live");
        let target = slab[best.a].take().expect("edge endpoints are live");
        edges.retain(|e| e.a != best.a && e.b != best.a && e.a != best.b && e.b != best.b);

        let mut merged = target.fragment;
        merged.blit_fragment(merged.origin() + best.offset, source.fragment);
        merged.normalize();
        debug!(a = best.a, b = best.b, count = best.count, "fragments merged");

        let id = slab.len();
        slab.push(Some(snip(merged)));

        let candidates: Vec<usize> = (0..id).filter(|&i| slab[i].is_some()).collect();
        let mut fresh: Vec<MergeEdge> = candidates
            .par_iter()
            .filter_map(|&other| match_pair(config, &slab, other, id))
            .collect();
        edges.append(&mut fresh);
    }

    let survivors: Vec<Fragment> = slab
        .into_iter()
        .flatten()
        .map(|snippet| snippet.fragment)
        .collect();
    info!(fragments = survivors.len(), "splicing finished");
    survivors
}

/// Remove and return the highest-count edge; ties break on the lower pair of
/// fragment ids.
fn take_best_edge(edges: &mut Vec<MergeEdge>) -> Option<MergeEdge> {
    let best = edges
        .iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| {
            x.count
                .cmp(&y.count)
                .then_with(|| (y.a, y.b).cmp(&(x.a, x.b)))
        })?
        .0;
    Some(edges.swap_remove(best))
}
