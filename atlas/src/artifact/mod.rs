//! Artifact filtering: remove isolated wrong-color pixels from a consensus
//! image while preserving edges.
//!
//! A 1-D window slid along every row and column counts how often each window
//! content occurs; pixels inside repeated patterns score low on the combined
//! heatmap and pass through, while pixels whose neighborhoods are unique get
//! their dot histograms smoothed with a Gaussian before the argmax.


use std::collections::HashMap;

use common::parallel::for_each_row_chunk;
use common::{Buffer2, FnvBuildHasher};
use rayon::prelude::*;

use crate::fragment::{Blend, Dot, Fragment};
use crate::palette::Nat;

/// Artifact filter tunables.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactConfig {
    /// Gaussian standard deviation.
    pub dev: f32,
    /// 1-D repetition window length; odd.
    pub size: usize,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self { dev: 2.0, size: 15 }
    }
}

/// Heatmap value above which a pixel is considered isolated and smoothed.
const HEAT_THRESHOLD: f32 = 0.25;

/// Stand-in for `1/sqrt(0)` where neither direction saw a full window.
const HEAT_MAX: f32 = 1e6;

/// Filter one fragment into a cleaned palette-indexed image.
pub fn filter(fragment: &Fragment, config: &ArtifactConfig) -> Buffer2<Nat> {
    assert!(config.size % 2 == 1, "window size must be odd");
    assert!((3..=31).contains(&config.size), "window size out of range");

    let blend = fragment.blend();
    let heat = heatmap(&blend, config.size);
    blur(fragment.dots(), &heat, config.dev)
}

/// Combined row/column repetition heatmap of a blend.
pub fn heatmap(blend: &Blend, size: usize) -> Buffer2<f32> {
    let horizontal = directional_counts(blend, size, true);
    let vertical = directional_counts(blend, size, false);
    combine(&horizontal, &vertical)
}

/// Count window occurrences along rows (`horizontal`) or columns, then map
/// each full window's center to its content's total count.
fn directional_counts(blend: &Blend, size: usize, horizontal: bool) -> Buffer2<u32> {
    let width = blend.image.width();
    let height = blend.image.height();
    let (lines, stride, step) = if horizontal {
        (height, width, 1usize)
    } else {
        (width, height, width)
    };
    let window_mask: u128 = (1u128 << (4 * size)) - 1;

    let mut counts: HashMap<u128, u32, FnvBuildHasher> = HashMap::default();
    let mut out = Buffer2::new_default(width, height);

    for pass in 0..2 {
        for line in 0..lines {
            let base = if horizontal { line * width } else { line };
            let mut window = 0u128;
            let mut filled = 0usize;

            for i in 0..stride {
                let index = base + i * step;
                if blend.mask[index] == 0 {
                    filled = 0;
                    window = 0;
                    continue;
                }

                window = (window << 4 | blend.image[index].0 as u128) & window_mask;
                filled += 1;
                if filled < size {
                    continue;
                }

                if pass == 0 {
                    *counts.entry(window).or_insert(0) += 1;
                } else {
                    let center = index - (size / 2) * step;
                    out[center] = counts[&window];
                }
            }
        }
    }

    out
}

/// Per-pixel `1/sqrt((h + v) / 2)`, clamped where no window covered the
/// pixel at all.
fn combine(horizontal: &Buffer2<u32>, vertical: &Buffer2<u32>) -> Buffer2<f32> {
    let mut out = Buffer2::new_default(horizontal.width(), horizontal.height());

    out.pixels_mut()
        .par_iter_mut()
        .zip(horizontal.pixels().par_iter())
        .zip(vertical.pixels().par_iter())
        .for_each(|((out, &h), &v)| {
            let sum = h + v;
            *out = if sum == 0 {
                HEAT_MAX
            } else {
                1.0 / (sum as f32 / 2.0).sqrt()
            };
        });

    out
}

/// Gaussian kernel; side length is `6 * dev` rounded up to odd.
fn gauss_kernel(dev: f32) -> (Vec<f32>, usize) {
    let size = (6.0 * dev).ceil() as usize | 1;
    let half = (size / 2) as f32;

    let d = 2.0 * dev * dev;
    let a = 1.0 / (std::f32::consts::PI * d);

    let mut kernel = Vec::with_capacity(size * size);
    for y in 0..size {
        let dy = y as f32 - half;
        for x in 0..size {
            let dx = x as f32 - half;
            kernel.push(a * (-(dy * dy + dx * dx) / d).exp());
        }
    }

    (kernel, size)
}

/// Rows below this are blurred sequentially.
const PARALLEL_THRESHOLD: usize = 64;

/// Selective smoothing: isolated interior pixels get their 16-channel dot
/// histograms convolved before the argmax, everything else passes through.
fn blur(dots: &Buffer2<Dot>, heat: &Buffer2<f32>, dev: f32) -> Buffer2<Nat> {
    let (kernel, ksize) = gauss_kernel(dev);
    let margin = ksize / 2;

    let width = dots.width();
    let height = dots.height();
    let mut out = Buffer2::new_default(width, height);

    for_each_row_chunk(out.pixels_mut(), width, PARALLEL_THRESHOLD, |y_start, chunk| {
        for (row_idx, row) in chunk.chunks_mut(width).enumerate() {
            let y = y_start + row_idx;
            let interior_y = y >= margin && y + margin < height;
            for (x, out) in row.iter_mut().enumerate() {
                let interior = interior_y && x >= margin && x + margin < width;
                *out = if interior && *heat.get(x, y) > HEAT_THRESHOLD {
                    convolved_argmax(dots, &kernel, ksize, x - margin, y - margin)
                } else {
                    argmax(dots.get(x, y))
                };
            }
        }
    });

    out
}

#[inline]
fn argmax(dot: &Dot) -> Nat {
    let mut best = 0usize;
    let mut best_count = 0u16;
    for (color, &count) in dot.iter().enumerate() {
        if count > best_count {
            best = color;
            best_count = count;
        }
    }
    Nat(best as u8)
}

fn convolved_argmax(dots: &Buffer2<Dot>, kernel: &[f32], ksize: usize, left: usize, top: usize) -> Nat {
    let mut temp = [0.0f32; 16];

    for ky in 0..ksize {
        let weights = &kernel[ky * ksize..(ky + 1) * ksize];
        for (kx, &weight) in weights.iter().enumerate() {
            let dot = dots.get(left + kx, top + ky);
            for (acc, &count) in temp.iter_mut().zip(dot) {
                *acc += count as f32 * weight;
            }
        }
    }

    let mut best = 0usize;
    let mut best_value = 0.0f32;
    for (color, &value) in temp.iter().enumerate() {
        if value > best_value {
            best = color;
            best_value = value;
        }
    }
    Nat(best as u8)
}
