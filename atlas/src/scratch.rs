//! Per-frame scratch reuse.
//!
//! All scratch for one frame comes out of a [`FramePool`] and goes back when
//! the frame is done, so a frame's working set releases together without
//! churning the allocator. The collector keeps its keypoint grids in a
//! [`Swing`] pair: the previous frame's grid stays readable while the current
//! frame fills the other slot, and the roles swap at frame end.

use common::Buffer2;

use crate::palette::Nat;
use crate::types::Dimensions;

/// Pool of recycled frame-sized image buffers.
#[derive(Debug)]
pub struct FramePool {
    dims: Dimensions,
    buffers: Vec<Buffer2<Nat>>,
}

impl FramePool {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            buffers: Vec::new(),
        }
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Acquire a zeroed frame buffer, reusing a released one when available.
    pub fn acquire(&mut self) -> Buffer2<Nat> {
        match self.buffers.pop() {
            Some(mut buffer) => {
                buffer.fill(Nat(0));
                buffer
            }
            None => Buffer2::new_default(self.dims.width, self.dims.height),
        }
    }

    /// Return a buffer to the pool. Buffers of foreign dimensions are dropped.
    pub fn release(&mut self, buffer: Buffer2<Nat>) {
        if buffer.width() == self.dims.width && buffer.height() == self.dims.height {
            self.buffers.push(buffer);
        }
    }

    /// Drop all pooled buffers and retarget the pool.
    pub fn reset(&mut self, dims: Dimensions) {
        if self.dims != dims {
            self.buffers.clear();
            self.dims = dims;
        }
    }
}

/// Double-buffered pair rotated between adjacent frames.
#[derive(Debug)]
pub struct Swing<T> {
    current: T,
    previous: T,
}

impl<T> Swing<T> {
    pub fn new(current: T, previous: T) -> Self {
        Self { current, previous }
    }

    #[inline]
    pub fn current(&self) -> &T {
        &self.current
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    #[inline]
    pub fn previous(&self) -> &T {
        &self.previous
    }

    /// Swap roles: the current slot becomes the readable previous one and the
    /// old previous slot becomes scratch for the next frame.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }
}
