use common::Buffer2;

use super::*;
use crate::palette::Nat;
use crate::types::{Dimensions, Rect};

fn image(width: usize, height: usize, pixels: &[u8]) -> Buffer2<Nat> {
    Buffer2::new(width, height, pixels.iter().map(|&p| Nat(p)).collect())
}

fn uniform(width: usize, height: usize, color: u8) -> Buffer2<Nat> {
    Buffer2::new_filled(width, height, Nat(color))
}

#[test]
fn test_uniform_image_yields_single_contour() {
    let img = uniform(8, 6, 3);
    let mut extractor = ContourExtractor::new(Dimensions::new(8, 6));

    let contours = extractor.extract(&img);
    assert_eq!(contours.len(), 1);

    let contour = &contours[0];
    assert_eq!(contour.color(), Nat(3));
    assert_eq!(contour.area(), 6 * 4);
    assert_eq!(contour.enclosure(), Rect::new(1, 1, 7, 5));
}

#[test]
fn test_inner_square() {
    let mut img = uniform(7, 7, 0);
    for y in 2..4 {
        for x in 2..4 {
            img[(x, y)] = Nat(5);
        }
    }
    let mut extractor = ContourExtractor::new(Dimensions::new(7, 7));

    let contours = extractor.extract(&img);
    assert_eq!(contours.len(), 2);

    let square = contours.iter().find(|c| c.color() == Nat(5)).unwrap();
    assert_eq!(square.area(), 4);
    assert_eq!(square.enclosure(), Rect::new(2, 2, 4, 4));
    assert!(square.edges().windows(2).all(|w| w[0] <= w[1]));

    let background = contours.iter().find(|c| c.color() == Nat(0)).unwrap();
    assert_eq!(background.area(), 25 - 4);
}

#[test]
fn test_recover_fills_spans() {
    let mut img = uniform(8, 8, 0);
    for y in 2..5 {
        for x in 3..6 {
            img[(x, y)] = Nat(9);
        }
    }
    let mut extractor = ContourExtractor::new(Dimensions::new(8, 8));
    let contours = extractor.extract(&img);
    let square = contours.iter().find(|c| c.color() == Nat(9)).unwrap();

    let mut mask = vec![0u8; 8 * 8];
    square.recover(&mut mask, 1);

    for y in 0..8 {
        for x in 0..8 {
            let expected = (2..5).contains(&y) && (3..6).contains(&x);
            assert_eq!(mask[y * 8 + x] == 1, expected, "at ({x},{y})");
        }
    }
}

#[test]
fn test_single_pixel_contour() {
    let mut img = uniform(5, 5, 0);
    img[(2, 2)] = Nat(7);
    let mut extractor = ContourExtractor::new(Dimensions::new(5, 5));

    let contours = extractor.extract(&img);
    let dot = contours.iter().find(|c| c.color() == Nat(7)).unwrap();
    assert_eq!(dot.area(), 1);
    assert_eq!(dot.enclosure(), Rect::new(2, 2, 3, 3));

    let mut mask = vec![0u8; 25];
    dot.recover(&mut mask, 1);
    assert_eq!(mask.iter().filter(|&&m| m == 1).count(), 1);
    assert_eq!(mask[2 * 5 + 2], 1);
}

#[test]
fn test_disconnected_same_color_regions_get_distinct_ids() {
    let img = image(
        7,
        5,
        &[
            0, 0, 0, 0, 0, 0, 0, //
            0, 4, 0, 0, 0, 4, 0, //
            0, 4, 0, 0, 0, 4, 0, //
            0, 4, 0, 0, 0, 4, 0, //
            0, 0, 0, 0, 0, 0, 0, //
        ],
    );
    let mut extractor = ContourExtractor::new(Dimensions::new(7, 5));

    let contours = extractor.extract(&img);
    let bars: Vec<_> = contours.iter().filter(|c| c.color() == Nat(4)).collect();
    assert_eq!(bars.len(), 2);
    assert_ne!(bars[0].id(), bars[1].id());
    assert!(bars.iter().all(|c| c.area() == 3));
}

#[test]
fn test_filter_predicate_marks_contours() {
    let mut img = uniform(6, 6, 0);
    img[(2, 2)] = Nat(3);
    img[(4, 3)] = Nat(5);
    let mut extractor = ContourExtractor::new(Dimensions::new(6, 6));

    // Reject the pixel the second dot sits on.
    let rejected = 3 * 6 + 4;
    let contours = extractor.extract_filtered(&img, |idx| idx != rejected);

    let clean = contours.iter().find(|c| c.color() == Nat(3)).unwrap();
    let tainted = contours.iter().find(|c| c.color() == Nat(5)).unwrap();
    assert!(clean.all_accepted());
    assert!(!tainted.all_accepted());
}

#[test]
fn test_no_contours_when_too_small() {
    let img = uniform(2, 2, 1);
    let mut extractor = ContourExtractor::new(Dimensions::new(2, 2));
    assert!(extractor.extract(&img).is_empty());
}

#[test]
fn test_extractor_reuse_between_images() {
    let mut extractor = ContourExtractor::new(Dimensions::new(6, 6));

    let first = extractor.extract(&uniform(6, 6, 2));
    assert_eq!(first.len(), 1);

    let mut img = uniform(6, 6, 2);
    img[(3, 3)] = Nat(8);
    let second = extractor.extract(&img);
    assert_eq!(second.len(), 2);
}
