use common::Buffer2;
use glam::IVec2;

use super::*;
use crate::keypoint::{Extractor, Grid, GridLayout};
use crate::palette::Nat;
use crate::testing;
use crate::types::Dimensions;

fn grid_of(image: &Buffer2<Nat>, layout: GridLayout) -> Grid {
    let dims = Dimensions::new(image.width(), image.height());
    let mut extractor = Extractor::new(dims, layout);
    let (grid, _) = extractor.extract(image).unwrap();
    grid
}

fn full_mask(width: usize, height: usize) -> Buffer2<u8> {
    Buffer2::new_filled(width, height, 1)
}

#[test]
fn test_identical_frames_match_at_zero() {
    let frame = testing::noise_image(100, 80, 1);
    let previous = grid_of(&frame, GridLayout::COLLECTOR);
    let current = grid_of(&frame, GridLayout::COLLECTOR);

    let offset = match_grids(&MatchConfig::default(), &previous, &current);
    assert_eq!(offset, Some(IVec2::ZERO));
}

#[test]
fn test_translated_crops_recover_offset() {
    let scene = testing::noise_image(220, 140, 2);
    let previous = grid_of(&scene.crop(30, 20, 100, 80), GridLayout::COLLECTOR);
    let current = grid_of(&scene.crop(45, 28, 100, 80), GridLayout::COLLECTOR);

    let offset = match_grids(&MatchConfig::default(), &previous, &current);
    assert_eq!(offset, Some(IVec2::new(15, 8)));
}

#[test]
fn test_unrelated_content_yields_no_match() {
    let previous = grid_of(&testing::noise_image(100, 80, 3), GridLayout::COLLECTOR);
    let current = grid_of(&testing::noise_image(100, 80, 4), GridLayout::COLLECTOR);

    assert_eq!(match_grids(&MatchConfig::default(), &previous, &current), None);
}

#[test]
fn test_empty_grid_fails_active_check() {
    let uniform = Buffer2::new_filled(100, 80, Nat(6));
    let noisy = testing::noise_image(100, 80, 5);
    let previous = grid_of(&noisy, GridLayout::COLLECTOR);
    let current = grid_of(&uniform, GridLayout::COLLECTOR);

    assert_eq!(match_grids(&MatchConfig::default(), &previous, &current), None);
}

#[test]
fn test_match_symmetry() {
    let scene = testing::noise_image(220, 140, 6);
    let a = grid_of(&scene.crop(10, 12, 100, 80), GridLayout::COLLECTOR);
    let b = grid_of(&scene.crop(40, 24, 100, 80), GridLayout::COLLECTOR);

    let config = MatchConfig::default();
    let forward = match_grids(&config, &a, &b);
    let backward = match_grids(&config, &b, &a);

    let offset = forward.expect("forward match");
    assert_eq!(offset, IVec2::new(30, 12));
    // The reverse may reject, but must never contradict.
    if let Some(reverse) = backward {
        assert_eq!(reverse, -offset);
    }
}

#[test]
fn test_ticket_ranking_prefers_common_offset() {
    let mut totals = Totals::default();
    totals.insert(IVec2::new(5, 0), 12);
    totals.insert(IVec2::new(-3, 1), 20);
    totals.insert(IVec2::new(0, 0), 7);

    let top = top_offsets(&totals, 2);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].offset, IVec2::new(-3, 1));
    assert_eq!(top[0].count, 20);
    assert_eq!(top[1].offset, IVec2::new(5, 0));
}

#[test]
fn test_top_offsets_tie_break_is_deterministic() {
    let mut totals = Totals::default();
    totals.insert(IVec2::new(4, 2), 9);
    totals.insert(IVec2::new(-1, 2), 9);
    totals.insert(IVec2::new(3, 1), 9);

    let top = top_offsets(&totals, 3);
    assert_eq!(top[0].offset, IVec2::new(3, 1));
    assert_eq!(top[1].offset, IVec2::new(-1, 2));
    assert_eq!(top[2].offset, IVec2::new(4, 2));
}

#[test]
fn test_blend_match_recovers_offset() {
    let scene = testing::noise_image(240, 160, 7);
    let previous = scene.crop(0, 0, 140, 120);
    let current = scene.crop(25, 30, 140, 120);

    let prev_grid = grid_of(&previous, GridLayout::SINGLE);
    let cur_grid = grid_of(&current, GridLayout::SINGLE);

    let vote = match_blends(
        &MatchConfig {
            weight_switch: 100,
            region_votes: 3,
        },
        &OverlapParams::default(),
        prev_grid.region(0),
        &full_mask(140, 120),
        cur_grid.region(0),
        &full_mask(140, 120),
    );

    let vote = vote.expect("overlapping blends must match");
    assert_eq!(vote.offset, IVec2::new(25, 30));
    assert!(vote.count > 0);
}

#[test]
fn test_blend_match_rejects_disjoint_content() {
    let prev_image = testing::noise_image(120, 100, 8);
    let cur_image = testing::noise_image(120, 100, 9);

    let prev_grid = grid_of(&prev_image, GridLayout::SINGLE);
    let cur_grid = grid_of(&cur_image, GridLayout::SINGLE);

    let vote = match_blends(
        &MatchConfig::default(),
        &OverlapParams::default(),
        prev_grid.region(0),
        &full_mask(120, 100),
        cur_grid.region(0),
        &full_mask(120, 100),
    );
    assert!(vote.is_none());
}

#[test]
fn test_blend_match_requires_mask_support() {
    let scene = testing::noise_image(240, 160, 10);
    let previous = scene.crop(0, 0, 140, 120);
    let current = scene.crop(25, 30, 140, 120);

    let prev_grid = grid_of(&previous, GridLayout::SINGLE);
    let cur_grid = grid_of(&current, GridLayout::SINGLE);

    // An empty previous mask means no cell can find support.
    let vote = match_blends(
        &MatchConfig::default(),
        &OverlapParams::default(),
        prev_grid.region(0),
        &Buffer2::new_filled(140, 120, 0u8),
        cur_grid.region(0),
        &full_mask(140, 120),
    );
    assert!(vote.is_none());
}
