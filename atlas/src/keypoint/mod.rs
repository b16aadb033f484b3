//! Keypoint descriptors and the region grid they are collected into.

mod extractor;

pub use extractor::Extractor;

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use common::FnvBuildHasher;
use glam::UVec2;

use crate::error::{Error, Result};
use crate::palette::Nat;
use crate::types::Dimensions;

/// Descriptor length in bytes: 25 nibble-packed palette indices plus the
/// salience weight in the low nibble of the last byte.
pub const CODE_LENGTH: usize = 13;

/// Number of pixels a descriptor encodes (the 5x5 window).
pub const CODE_PIXELS: usize = 25;

/// Keypoint salience: 1 for a soft edge, 2 for a strong edge.
pub const MAX_WEIGHT: usize = 3;

/// 13-byte keypoint descriptor. Two descriptors match iff byte-equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code([u8; CODE_LENGTH]);

impl Code {
    /// Pack a row-major 5x5 window of palette indices and a salience weight.
    pub fn pack(window: &[Nat; CODE_PIXELS], weight: u8) -> Self {
        debug_assert!(weight > 0 && weight < MAX_WEIGHT as u8 + 1);

        let mut bytes = [0u8; CODE_LENGTH];
        for (i, chunk) in window[..CODE_PIXELS - 1].chunks_exact(2).enumerate() {
            bytes[i] = chunk[0].0 | chunk[1].0 << 4;
        }
        bytes[CODE_LENGTH - 1] = window[CODE_PIXELS - 1].0 << 4 | weight;

        Code(bytes)
    }

    /// Rebuild the pixel window and weight from `bytes`.
    pub fn unpack(bytes: &[u8]) -> Result<([Nat; CODE_PIXELS], u8)> {
        if bytes.len() < CODE_LENGTH {
            return Err(Error::DescriptorUnderrun {
                pixels: bytes.len() * 2,
            });
        }

        let mut window = [Nat(0); CODE_PIXELS];
        for i in 0..CODE_PIXELS - 1 {
            let byte = bytes[i / 2];
            window[i] = Nat(if i % 2 == 0 { byte & 0xf } else { byte >> 4 });
        }
        window[CODE_PIXELS - 1] = Nat(bytes[CODE_LENGTH - 1] >> 4);

        Ok((window, bytes[CODE_LENGTH - 1] & 0xf))
    }

    #[inline]
    pub fn weight(&self) -> u8 {
        self.0[CODE_LENGTH - 1] & 0xf
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; CODE_LENGTH] {
        &self.0
    }
}

impl Hash for Code {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.0);
    }
}

/// Keypoint location within a frame.
pub type Point = UVec2;

/// One grid region: descriptor -> points, plus per-weight point counts.
#[derive(Debug, Default, Clone)]
pub struct Region {
    points: HashMap<Code, Vec<Point>, FnvBuildHasher>,
    weight_counts: [usize; MAX_WEIGHT],
}

impl Region {
    pub fn add(&mut self, code: Code, point: Point) {
        self.points.entry(code).or_default().push(point);
        self.weight_counts[code.weight() as usize] += 1;
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.weight_counts = [0; MAX_WEIGHT];
    }

    #[inline]
    pub fn points(&self) -> &HashMap<Code, Vec<Point>, FnvBuildHasher> {
        &self.points
    }

    #[inline]
    pub fn counts(&self) -> &[usize; MAX_WEIGHT] {
        &self.weight_counts
    }

    #[inline]
    pub fn total_count(&self) -> usize {
        self.weight_counts.iter().sum()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !self.points.is_empty()
    }
}

/// Tiling of a frame into keypoint regions with overlap bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub width: usize,
    pub height: usize,
    /// Total width of the band straddling a region border; a point within
    /// `overlap / 2` of the border lands in both regions.
    pub overlap: usize,
}

impl GridLayout {
    /// Collector default: 4x2 regions with a 16-pixel overlap band.
    pub const COLLECTOR: GridLayout = GridLayout {
        width: 4,
        height: 2,
        overlap: 16,
    };

    /// Whole-image single region, used for fragment blends.
    pub const SINGLE: GridLayout = GridLayout {
        width: 1,
        height: 1,
        overlap: 0,
    };

    #[inline]
    pub fn region_count(&self) -> usize {
        self.width * self.height
    }
}

/// Keypoint grid over one frame.
#[derive(Debug, Clone)]
pub struct Grid {
    layout: GridLayout,
    dims: Dimensions,
    regions: Vec<Region>,
}

impl Grid {
    pub fn new(layout: GridLayout, dims: Dimensions) -> Self {
        assert!(layout.width > 0 && layout.height > 0);
        Self {
            layout,
            dims,
            regions: vec![Region::default(); layout.region_count()],
        }
    }

    #[inline]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[inline]
    pub fn region(&self, index: usize) -> &Region {
        &self.regions[index]
    }

    pub fn active_regions(&self) -> usize {
        self.regions.iter().filter(|r| r.is_active()).count()
    }

    pub fn clear(&mut self) {
        for region in &mut self.regions {
            region.clear();
        }
    }

    /// Insert a keypoint into its region and any neighbors whose overlap
    /// band contains it.
    pub fn add(&mut self, code: Code, point: Point) {
        let (col_lo, col_hi) = self.span(point.x as usize, self.dims.width, self.layout.width);
        let (row_lo, row_hi) = self.span(point.y as usize, self.dims.height, self.layout.height);

        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                self.regions[row * self.layout.width + col].add(code, point);
            }
        }
    }

    /// Inclusive range of region slots along one axis for coordinate `v`.
    fn span(&self, v: usize, extent: usize, slots: usize) -> (usize, usize) {
        let size = (extent / slots).max(1);
        let slot = (v / size).min(slots - 1);
        let band = self.layout.overlap / 2;

        let mut lo = slot;
        let mut hi = slot;
        if slot > 0 && v < slot * size + band {
            lo = slot - 1;
        }
        if slot + 1 < slots && v + band >= (slot + 1) * size {
            hi = slot + 1;
        }
        (lo, hi)
    }
}
