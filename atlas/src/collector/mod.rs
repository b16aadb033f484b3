//! Frame collection: drives the extractor and matcher across a frame stream,
//! accumulating fragments.


use glam::IVec2;
use tracing::{debug, info};

use crate::codec::Codec;
use crate::error::Result;
use crate::feed::Feed;
use crate::fragment::{Fragment, FramePayload};
use crate::keypoint::{Extractor, Grid, GridLayout};
use crate::matcher::{self, MatchConfig};
use crate::scratch::{FramePool, Swing};
use crate::types::Dimensions;

/// Collects a linear frame stream into one or more fragments.
///
/// Consecutive frames are registered against each other; an unmatched frame
/// closes the running fragment and starts a new one at the origin.
#[derive(Debug)]
pub struct Collector {
    dims: Dimensions,
    extractor: Extractor,
    match_config: MatchConfig,
    position: IVec2,
    fragments: Vec<Fragment>,
}

impl Collector {
    pub fn new(dims: Dimensions) -> Self {
        Self::with_config(dims, GridLayout::COLLECTOR, MatchConfig::default())
    }

    pub fn with_config(dims: Dimensions, layout: GridLayout, match_config: MatchConfig) -> Self {
        Self {
            dims,
            extractor: Extractor::new(dims, layout),
            match_config,
            position: IVec2::ZERO,
            fragments: Vec::new(),
        }
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Drain `feed`, returning the accumulated fragments, normalized.
    ///
    /// Raw and median images of every frame are stored compressed on the
    /// fragment records for the later foreground pass.
    pub fn collect<F, C>(
        &mut self,
        feed: &mut F,
        codec: &C,
        pool: &mut FramePool,
    ) -> Result<Vec<Fragment>>
    where
        F: Feed,
        C: Codec,
    {
        if !feed.has_more() {
            return Ok(Vec::new());
        }

        let layout = self.extractor.layout();
        let mut grids = Swing::new(
            Grid::new(layout, self.dims),
            Grid::new(layout, self.dims),
        );
        let mut median = pool.acquire();
        let mut collected = 0usize;

        while feed.has_more() {
            let frame = feed.produce(pool)?;
            self.extractor
                .extract_into(&frame.image, &mut median, grids.current_mut())?;

            if collected == 0 {
                self.start_fragment();
            } else {
                match matcher::match_grids(&self.match_config, grids.previous(), grids.current()) {
                    Some(offset) => {
                        self.position += offset;
                        debug!(frame = frame.number, ?offset, "frame registered");
                    }
                    None => {
                        debug!(frame = frame.number, "no match, starting new fragment");
                        self.close_fragment();
                        self.start_fragment();
                    }
                }
            }

            let payload = FramePayload {
                image: codec.compress(&frame.image),
                median: codec.compress(&median),
            };
            let position = self.position;
            self.current().blit(position, &frame.image, frame.number, Some(payload));

            grids.rotate();
            pool.release(frame.image);
            collected += 1;
        }

        pool.release(median);
        self.close_fragment();

        let fragments = std::mem::take(&mut self.fragments);
        info!(
            frames = collected,
            fragments = fragments.len(),
            "collection finished"
        );
        Ok(fragments)
    }

    fn start_fragment(&mut self) {
        self.fragments.push(Fragment::new(self.dims));
        self.position = IVec2::ZERO;
    }

    fn close_fragment(&mut self) {
        if let Some(fragment) = self.fragments.last_mut() {
            fragment.normalize();
        }
    }

    fn current(&mut self) -> &mut Fragment {
        self.fragments.last_mut().expect("no open fragment")
    }
}
