//! Test utilities: deterministic synthetic scenes and an in-memory feed.

#![allow(dead_code)]

use common::Buffer2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::feed::{Feed, Frame};
use crate::palette::Nat;
use crate::scratch::FramePool;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Seeded random 16-color image; rich in distinctive keypoints.
pub fn noise_image(width: usize, height: usize, seed: u64) -> Buffer2<Nat> {
    let mut rng = StdRng::seed_from_u64(seed);
    Buffer2::new(
        width,
        height,
        (0..width * height).map(|_| Nat(rng.gen_range(0..16))).collect(),
    )
}

/// Seeded random image restricted to the given colors.
pub fn noise_image_of(width: usize, height: usize, seed: u64, colors: &[Nat]) -> Buffer2<Nat> {
    let mut rng = StdRng::seed_from_u64(seed);
    Buffer2::new(
        width,
        height,
        (0..width * height)
            .map(|_| colors[rng.gen_range(0..colors.len())])
            .collect(),
    )
}

/// Feed over pre-built frames, numbered from zero.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    frames: Vec<Buffer2<Nat>>,
    next: usize,
}

impl MemoryFeed {
    pub fn new(frames: Vec<Buffer2<Nat>>) -> Self {
        Self { frames, next: 0 }
    }
}

impl Feed for MemoryFeed {
    fn has_more(&self) -> bool {
        self.next < self.frames.len()
    }

    fn produce(&mut self, pool: &mut FramePool) -> Result<Frame> {
        let source = self.frames.get(self.next).ok_or(Error::FeedExhausted)?;

        let image = if pool.dimensions().width == source.width()
            && pool.dimensions().height == source.height()
        {
            let mut buffer = pool.acquire();
            buffer.copy_from(source);
            buffer
        } else {
            source.clone()
        };

        let frame = Frame {
            number: self.next,
            image,
        };
        self.next += 1;
        Ok(frame)
    }
}
