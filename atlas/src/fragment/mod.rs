//! Consensus fragments: per-pixel color histograms accumulated from many
//! imperfectly aligned frames.


use common::Buffer2;
use glam::IVec2;

use crate::palette::Nat;
use crate::types::Dimensions;

/// Per-cell counters, one lane per palette color.
pub type Dot = [u16; 16];

/// Compressed raw and median images of one attributed frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramePayload {
    pub image: Vec<u8>,
    pub median: Vec<u8>,
}

/// Attribution of one source frame to a fragment.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub number: usize,
    /// World position of the frame's top-left corner.
    pub position: IVec2,
    pub payload: Option<FramePayload>,
}

/// Consensus projection of a fragment: argmax color per cell plus a coverage
/// mask (nonzero where any counter is set).
#[derive(Debug, Clone)]
pub struct Blend {
    pub image: Buffer2<Nat>,
    pub mask: Buffer2<u8>,
}

/// Growable dot grid with an origin in world coordinates.
#[derive(Debug, Clone)]
pub struct Fragment {
    dots: Buffer2<Dot>,
    origin: IVec2,
    step: Dimensions,
    frames: Vec<FrameRecord>,
}

impl Fragment {
    /// New fragment sized to one `step`; the grid later grows in `step`
    /// multiples.
    pub fn new(step: Dimensions) -> Self {
        assert!(step.width > 0 && step.height > 0, "step must be nonzero");
        Self {
            dots: Buffer2::new_default(step.width, step.height),
            origin: IVec2::ZERO,
            step,
            frames: Vec::new(),
        }
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.dots.width(), self.dots.height())
    }

    #[inline]
    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    #[inline]
    pub fn step(&self) -> Dimensions {
        self.step
    }

    #[inline]
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    #[inline]
    pub fn dots(&self) -> &Buffer2<Dot> {
        &self.dots
    }

    /// Rebuild a fragment from its persisted parts.
    pub fn from_parts(
        dots: Buffer2<Dot>,
        origin: IVec2,
        step: Dimensions,
        frames: Vec<FrameRecord>,
    ) -> Self {
        Self {
            dots,
            origin,
            step,
            frames,
        }
    }

    /// Total of all counters; equals blitted frame area minus masked pixels.
    pub fn total_count(&self) -> u64 {
        self.dots
            .iter()
            .map(|dot| dot.iter().map(|&c| c as u64).sum::<u64>())
            .sum()
    }

    /// Accumulate a frame at world position `pos`.
    pub fn blit(
        &mut self,
        pos: IVec2,
        image: &Buffer2<Nat>,
        number: usize,
        payload: Option<FramePayload>,
    ) {
        self.ensure(pos, Dimensions::new(image.width(), image.height()));

        let base = self.local_index(pos);
        let stride = self.dots.width();
        for y in 0..image.height() {
            let row = image.row(y);
            let dots = &mut self.dots.pixels_mut()[base + y * stride..];
            for (dot, &pixel) in dots.iter_mut().zip(row) {
                dot[pixel.0 as usize] = dot[pixel.0 as usize].saturating_add(1);
            }
        }

        self.frames.push(FrameRecord {
            number,
            position: pos,
            payload,
        });
    }

    /// As [`blit`](Self::blit), skipping pixels whose mask byte is nonzero.
    pub fn blit_masked(
        &mut self,
        pos: IVec2,
        image: &Buffer2<Nat>,
        mask: &Buffer2<u8>,
        number: usize,
        payload: Option<FramePayload>,
    ) {
        assert_eq!(image.width(), mask.width(), "mask dimensions mismatch");
        assert_eq!(image.height(), mask.height(), "mask dimensions mismatch");

        self.ensure(pos, Dimensions::new(image.width(), image.height()));

        let base = self.local_index(pos);
        let stride = self.dots.width();
        for y in 0..image.height() {
            let row = image.row(y);
            let mask_row = mask.row(y);
            let dots = &mut self.dots.pixels_mut()[base + y * stride..];
            for ((dot, &pixel), &masked) in dots.iter_mut().zip(row).zip(mask_row) {
                if masked == 0 {
                    dot[pixel.0 as usize] = dot[pixel.0 as usize].saturating_add(1);
                }
            }
        }

        self.frames.push(FrameRecord {
            number,
            position: pos,
            payload,
        });
    }

    /// Merge another fragment whose grid cell (0,0) lands at world position
    /// `pos`; counters add cell-wise and the frame list is translated by
    /// `pos - other.origin`.
    pub fn blit_fragment(&mut self, pos: IVec2, other: Fragment) {
        self.ensure(pos, other.dimensions());

        let base = self.local_index(pos);
        let stride = self.dots.width();
        for y in 0..other.dots.height() {
            let src = other.dots.row(y);
            let dst = &mut self.dots.pixels_mut()[base + y * stride..];
            for (dot, other_dot) in dst.iter_mut().zip(src) {
                for (lane, &count) in dot.iter_mut().zip(other_dot) {
                    *lane = lane.saturating_add(count);
                }
            }
        }

        let shift = pos - other.origin;
        self.frames.extend(other.frames.into_iter().map(|mut frame| {
            frame.position += shift;
            frame
        }));
    }

    /// Argmax projection. Ties pick the lowest palette index; empty cells get
    /// color 0 with a zero mask byte.
    pub fn blend(&self) -> Blend {
        let width = self.dots.width();
        let height = self.dots.height();
        let mut image = Buffer2::new_default(width, height);
        let mut mask = Buffer2::new_default(width, height);

        for (i, dot) in self.dots.iter().enumerate() {
            let mut best = 0usize;
            let mut best_count = 0u16;
            for (color, &count) in dot.iter().enumerate() {
                if count > best_count {
                    best = color;
                    best_count = count;
                }
            }
            if best_count > 0 {
                image[i] = Nat(best as u8);
                mask[i] = 1;
            }
        }

        Blend { image, mask }
    }

    /// Translate every frame position so the origin becomes `(0, 0)`.
    pub fn normalize(&mut self) {
        let shift = self.origin;
        for frame in &mut self.frames {
            frame.position -= shift;
        }
        self.origin = IVec2::ZERO;
    }

    #[inline]
    fn local_index(&self, pos: IVec2) -> usize {
        let local = pos - self.origin;
        debug_assert!(local.x >= 0 && local.y >= 0);
        local.y as usize * self.dots.width() + local.x as usize
    }

    /// Grow the grid so `[pos, pos + dims)` fits, extending by whole `step`
    /// multiples in each deficient direction.
    fn ensure(&mut self, pos: IVec2, dims: Dimensions) {
        let grow = |deficit: i64, step: usize| -> usize {
            if deficit <= 0 {
                0
            } else {
                (deficit as usize).div_ceil(step) * step
            }
        };

        let left = grow(i64::from(self.origin.x) - i64::from(pos.x), self.step.width);
        let top = grow(i64::from(self.origin.y) - i64::from(pos.y), self.step.height);
        let right = grow(
            i64::from(pos.x) + dims.width as i64
                - (i64::from(self.origin.x) + self.dots.width() as i64),
            self.step.width,
        );
        let bottom = grow(
            i64::from(pos.y) + dims.height as i64
                - (i64::from(self.origin.y) + self.dots.height() as i64),
            self.step.height,
        );

        if left + right + top + bottom > 0 {
            self.dots = self.dots.extend(left, right, top, bottom, Dot::default());
            self.origin -= IVec2::new(left as i32, top as i32);
        }
    }
}
