//! Shared primitives for the atlas pipeline.

pub mod buffer2;
pub mod cpu_features;
pub mod fnv;
pub mod parallel;

pub use buffer2::Buffer2;
pub use fnv::FnvBuildHasher;
