//! Atlas - world map reconstruction from panning game-screen captures.
//!
//! This library stitches a long sequence of small 16-color frames into a
//! coherent 2-D map of the explored world:
//! - Keypoint extraction with rank-median salience descriptors
//! - Translation-only frame registration by offset voting
//! - Consensus accumulation into growable dot-grid fragments
//! - Fragment splicing, sprite removal and artifact filtering
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use atlas::{Adapter, Builder};
//!
//! let builder = Builder::new(my_adapter);
//! let maps = builder.build()?;
//!
//! for (i, map) in maps.iter().enumerate() {
//!     atlas::imageio::write_png(format!("map_{i}.png").as_ref(), map)?;
//! }
//! ```

pub mod artifact;
mod builder;
pub mod codec;
pub mod collector;
pub mod contour;
mod error;
mod feed;
pub mod foreground;
pub mod fragment;
pub mod imageio;
pub mod keypoint;
pub mod matcher;
pub mod palette;
mod persist;
mod scratch;
pub mod splicer;
mod types;
pub mod window;

#[cfg(test)]
pub mod testing;

pub mod prelude;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Error, Result};
pub use palette::{Bit, Nat, Ordered, Pixel};
pub use types::{Dimensions, Limits, Rect};

// ============================================================================
// Pipeline stages
// ============================================================================

pub use codec::{Codec, RleCodec};
pub use collector::Collector;
pub use feed::{Feed, Frame};
pub use fragment::{Blend, Dot, Fragment, FramePayload, FrameRecord};
pub use keypoint::{Code, Extractor as KeypointExtractor, Grid as KeypointGrid, GridLayout};
pub use matcher::{MatchConfig, OverlapParams, Vote};
pub use scratch::{FramePool, Swing};
pub use splicer::SplicerConfig;

// ============================================================================
// Orchestration
// ============================================================================

pub use artifact::ArtifactConfig;
pub use builder::{Adapter, Builder, Callbacks, NoCallbacks};
pub use imageio::FileFeed;
pub use persist::{read_fragments, write_fragments};
