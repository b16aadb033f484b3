//! Build orchestration: window scan, collection, splicing, foreground
//! removal, artifact filtering.

use common::Buffer2;
use rayon::prelude::*;
use tracing::info;

use crate::artifact::{self, ArtifactConfig};
use crate::codec::Codec;
use crate::collector::Collector;
use crate::error::Result;
use crate::feed::Feed;
use crate::foreground;
use crate::palette::Nat;
use crate::scratch::FramePool;
use crate::splicer::{self, SplicerConfig};
use crate::types::{Dimensions, Rect};
use crate::window;

/// Progress hooks; every method defaults to a no-op.
pub trait Callbacks: Sync {
    fn on_window(&self, _window: Option<&Rect>) {}
    fn on_collected(&self, _fragments: usize) {}
    fn on_spliced(&self, _fragments: usize) {}
    fn on_filtered(&self, _fragments: usize) {}
}

/// Callbacks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCallbacks;

impl Callbacks for NoCallbacks {}

/// Environment the builder runs against: frame sources, payload codec and
/// filter parameters.
pub trait Adapter {
    type Feed: Feed;
    type Codec: Codec;
    type Callbacks: Callbacks;

    /// Artifact filter 1-D window length; odd.
    const ARTIFACT_FILTER_SIZE: usize;

    fn screen_dimensions(&self) -> Dimensions;
    fn feed(&self) -> Result<Self::Feed>;
    fn cropped_feed(&self, window: Rect) -> Result<Self::Feed>;
    fn codec(&self) -> Self::Codec;
    fn artifact_filter_dev(&self) -> f32;
    fn callbacks(&self) -> Self::Callbacks;
}

/// Threads the pipeline stages over an adapter.
#[derive(Debug)]
pub struct Builder<A> {
    adapter: A,
    splicer_config: SplicerConfig,
}

impl<A: Adapter> Builder<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            splicer_config: SplicerConfig::default(),
        }
    }

    pub fn with_splicer_config(mut self, config: SplicerConfig) -> Self {
        self.splicer_config = config;
        self
    }

    /// Run the full pipeline, returning one cleaned image per surviving
    /// fragment. An empty result means no action window was found.
    pub fn build(&self) -> Result<Vec<Buffer2<Nat>>> {
        let screen = self.adapter.screen_dimensions();
        let callbacks = self.adapter.callbacks();

        let mut pool = FramePool::new(screen);
        let mut feed = self.adapter.feed()?;
        let window = window::scan(&mut feed, &mut pool, screen)?;
        callbacks.on_window(window.as_ref());
        let Some(window) = window else {
            return Ok(Vec::new());
        };

        let window_dims = window.dimensions();
        let codec = self.adapter.codec();

        pool.reset(window_dims);
        let mut feed = self.adapter.cropped_feed(window)?;
        let mut collector = Collector::new(window_dims);
        let fragments = collector.collect(&mut feed, &codec, &mut pool)?;
        callbacks.on_collected(fragments.len());

        let spliced = splicer::splice(fragments, &self.splicer_config);
        callbacks.on_spliced(spliced.len());

        let filtered = foreground::filter_fragments(spliced, window_dims, &codec)?;
        callbacks.on_filtered(filtered.len());

        let config = ArtifactConfig {
            dev: self.adapter.artifact_filter_dev(),
            size: A::ARTIFACT_FILTER_SIZE,
        };
        let cleaned: Vec<Buffer2<Nat>> = filtered
            .par_iter()
            .map(|fragment| artifact::filter(fragment, &config))
            .collect();

        info!(maps = cleaned.len(), "build finished");
        Ok(cleaned)
    }
}
