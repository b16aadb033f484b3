use glam::IVec2;

use super::*;
use crate::testing;
use crate::types::Dimensions;

/// Fragment holding one crop of `scene`, already normalized.
fn crop_fragment(
    scene: &common::Buffer2<crate::palette::Nat>,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> Fragment {
    let mut fragment = Fragment::new(Dimensions::new(width, height));
    fragment.blit(IVec2::ZERO, &scene.crop(x, y, width, height), 0, None);
    fragment
}

fn covered_cells(fragment: &Fragment) -> usize {
    fragment.blend().mask.iter().filter(|&&m| m != 0).count()
}

#[test]
fn test_trivial_inputs_pass_through() {
    let config = SplicerConfig::default();
    assert!(splice(Vec::new(), &config).is_empty());

    let scene = testing::noise_image(120, 120, 50);
    let single = vec![crop_fragment(&scene, 0, 0, 120, 120)];
    assert_eq!(splice(single, &config).len(), 1);
}

#[test]
fn test_overlapping_fragments_merge() {
    let scene = testing::noise_image(300, 140, 51);
    let left = crop_fragment(&scene, 0, 0, 180, 140);
    let right = crop_fragment(&scene, 120, 0, 180, 140);
    let total_before = left.total_count() + right.total_count();

    let spliced = splice(vec![left, right], &SplicerConfig::default());
    assert_eq!(spliced.len(), 1);

    let merged = &spliced[0];
    assert_eq!(merged.origin(), IVec2::ZERO);
    // Merging preserved every counter.
    assert_eq!(merged.total_count(), total_before);

    // The merged blend reproduces the scene over its covered area.
    let blend = merged.blend();
    let mut covered = 0;
    for y in 0..blend.image.height().min(140) {
        for x in 0..blend.image.width().min(300) {
            if *blend.mask.get(x, y) != 0 {
                assert_eq!(blend.image.get(x, y), scene.get(x, y), "at ({x},{y})");
                covered += 1;
            }
        }
    }
    assert_eq!(covered, 300 * 140);
}

#[test]
fn test_disjoint_fragments_stay_apart() {
    let a = testing::noise_image(100, 100, 52);
    let b = testing::noise_image(100, 100, 53);
    let fragments = vec![crop_fragment(&a, 0, 0, 100, 100), crop_fragment(&b, 0, 0, 100, 100)];

    let spliced = splice(fragments, &SplicerConfig::default());
    assert_eq!(spliced.len(), 2);
}

#[test]
fn test_three_strips_merge_into_one() {
    let scene = testing::noise_image(360, 120, 54);
    let fragments = vec![
        crop_fragment(&scene, 0, 0, 160, 120),
        crop_fragment(&scene, 100, 0, 160, 120),
        crop_fragment(&scene, 200, 0, 160, 120),
    ];
    let cells_before: usize = fragments.iter().map(covered_cells).sum();
    let counts_before: u64 = fragments.iter().map(|f| f.total_count()).sum();

    let spliced = splice(fragments, &SplicerConfig::default());
    assert_eq!(spliced.len(), 1);

    // No content was lost: counters conserved, union coverage spans the scene.
    let merged = &spliced[0];
    assert_eq!(merged.total_count(), counts_before);
    assert_eq!(covered_cells(merged), 360 * 120);
    assert!(covered_cells(merged) <= cells_before);

    // All three source frames are attributed.
    assert_eq!(merged.frames().len(), 3);
}

#[test]
fn test_mixed_set_merges_only_related() {
    let scene = testing::noise_image(260, 120, 55);
    let stranger = testing::noise_image(100, 100, 56);

    let fragments = vec![
        crop_fragment(&scene, 0, 0, 150, 120),
        crop_fragment(&scene, 110, 0, 150, 120),
        crop_fragment(&stranger, 0, 0, 100, 100),
    ];

    let spliced = splice(fragments, &SplicerConfig::default());
    assert_eq!(spliced.len(), 2);

    let areas: Vec<usize> = spliced.iter().map(covered_cells).collect();
    assert!(areas.contains(&(260 * 120)));
    assert!(areas.contains(&(100 * 100)));
}
