//! Keypoint extraction via rank-space median filtering.
//!
//! For every interior pixel two medians are taken over the luminance-rank
//! image: `m3` over the 3x3 window and `m5` over the 5x5 window. The raw
//! pixel's relation to the two medians decides whether a keypoint is emitted
//! and with which salience weight; `m3` is always written to the median
//! output. Histograms are 16-lane byte totals built by rolling a 5-wide
//! horizontal window along each row and combining five rows vertically.

use common::Buffer2;

use crate::error::{Error, Result};
use crate::palette::{self, Nat};
use crate::types::Dimensions;

use super::{Code, Grid, GridLayout, Point, CODE_PIXELS};

const KERNEL: usize = 5;
const MARGIN: usize = KERNEL / 2;

/// 16-lane color-rank histogram.
type Hist = [u8; 16];

/// Cumulative count threshold for the 3x3 median (half of 9).
const HALF3: u32 = 4;
/// Cumulative count threshold for the 5x5 median (half of 25).
const HALF5: u32 = 12;

/// Keypoint extractor with reusable row-histogram scratch.
#[derive(Debug)]
pub struct Extractor {
    dims: Dimensions,
    layout: GridLayout,
    /// Ring of the last 5 rows' 3-wide histograms, one per column.
    rows3: Vec<Hist>,
    /// Ring of the last 5 rows' 5-wide histograms, one per column.
    rows5: Vec<Hist>,
    ranks: Vec<u8>,
}

impl Extractor {
    pub fn new(dims: Dimensions, layout: GridLayout) -> Self {
        Self {
            dims,
            layout,
            rows3: vec![[0; 16]; KERNEL * dims.width],
            rows5: vec![[0; 16]; KERNEL * dims.width],
            ranks: vec![0; dims.width],
        }
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    #[inline]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Extract keypoints and the median image in one pass.
    pub fn extract(&mut self, image: &Buffer2<Nat>) -> Result<(Grid, Buffer2<Nat>)> {
        let mut grid = Grid::new(self.layout, self.dims);
        let mut median = Buffer2::new_default(self.dims.width, self.dims.height);
        self.extract_into(image, &mut median, &mut grid)?;
        Ok((grid, median))
    }

    /// Extract into caller-owned buffers, clearing `grid` first.
    pub fn extract_into(
        &mut self,
        image: &Buffer2<Nat>,
        median: &mut Buffer2<Nat>,
        grid: &mut Grid,
    ) -> Result<()> {
        let actual = Dimensions::new(image.width(), image.height());
        if actual != self.dims {
            return Err(Error::FrameDimensions {
                expected: self.dims,
                actual,
            });
        }
        assert_eq!(grid.layout(), self.layout, "grid layout mismatch");
        assert_eq!(grid.dimensions(), self.dims, "grid dimensions mismatch");
        assert_eq!(median.width(), self.dims.width, "median buffer mismatch");
        assert_eq!(median.height(), self.dims.height, "median buffer mismatch");

        grid.clear();
        median.copy_from(image);

        let width = self.dims.width;
        let height = self.dims.height;
        if width < KERNEL || height < KERNEL {
            return Ok(());
        }

        for y in 0..height {
            self.sum_row(image.row(y), y % KERNEL);
            if y + 1 >= KERNEL {
                self.process_row(image, median, grid, y - MARGIN);
            }
        }

        Ok(())
    }

    /// Fill one ring slot with the row's rolling 3- and 5-wide histograms.
    fn sum_row(&mut self, row: &[Nat], slot: usize) {
        let width = row.len();
        for (rank, &pixel) in self.ranks.iter_mut().zip(row) {
            *rank = palette::ordered(pixel).0;
        }
        let ranks = &self.ranks;

        let base = slot * width;
        let row3 = &mut self.rows3[base..base + width];
        let mut hist3 = [0u8; 16];
        for &r in &ranks[..2] {
            hist3[r as usize] += 1;
        }
        for x in 1..width - 1 {
            hist3[ranks[x + 1] as usize] += 1;
            row3[x] = hist3;
            hist3[ranks[x - 1] as usize] -= 1;
        }

        let row5 = &mut self.rows5[base..base + width];
        let mut hist5 = [0u8; 16];
        for &r in &ranks[..4] {
            hist5[r as usize] += 1;
        }
        for x in 2..width - 2 {
            hist5[ranks[x + 2] as usize] += 1;
            row5[x] = hist5;
            hist5[ranks[x - 2] as usize] -= 1;
        }
    }

    /// Emit medians and keypoints for output row `y` once its five source
    /// rows are in the ring.
    fn process_row(&mut self, image: &Buffer2<Nat>, median: &mut Buffer2<Nat>, grid: &mut Grid, y: usize) {
        let width = self.dims.width;
        let slot = |row: usize| (row % KERNEL) * width;

        let inner = [slot(y - 1), slot(y), slot(y + 1)];
        let outer = [slot(y - 2), slot(y + 2)];

        let out = median.row_mut(y);
        for x in MARGIN..width - MARGIN {
            let mut sum3 = [0u8; 16];
            for s in inner {
                add_hist(&mut sum3, &self.rows3[s + x]);
            }

            let m3 = median_rank(&sum3, HALF3);
            out[x] = palette::coded(palette::Ordered(m3));

            let p = palette::ordered(*image.get(x, y)).0;
            if p == m3 {
                continue;
            }

            let mut sum5 = [0u8; 16];
            for &s in inner.iter().chain(&outer) {
                add_hist(&mut sum5, &self.rows5[s + x]);
            }
            let m5 = median_rank(&sum5, HALF5);
            if m3 == m5 {
                continue;
            }

            let weight = if p == m5 { 1 } else { 2 };
            grid.add(encode_window(image, x, y, weight), Point::new(x as u32, y as u32));
        }
    }
}

#[inline]
fn add_hist(dst: &mut Hist, src: &Hist) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += s;
    }
}

/// Smallest rank whose cumulative count, scanning high to low, reaches
/// `half` of the window.
#[inline]
fn median_rank(hist: &Hist, half: u32) -> u8 {
    let mut total = 0u32;
    for rank in (0..16).rev() {
        total += hist[rank] as u32;
        if total >= half {
            return rank as u8;
        }
    }
    0
}

/// Pack the raw 5x5 window around `(x, y)` into a descriptor.
fn encode_window(image: &Buffer2<Nat>, x: usize, y: usize, weight: u8) -> Code {
    let mut window = [Nat(0); CODE_PIXELS];
    let mut i = 0;
    for wy in y - MARGIN..=y + MARGIN {
        let row = image.row(wy);
        window[i..i + KERNEL].copy_from_slice(&row[x - MARGIN..=x + MARGIN]);
        i += KERNEL;
    }
    Code::pack(&window, weight)
}
