//! Frame feed contract consumed by the scan and collect stages.

use common::Buffer2;

use crate::error::Result;
use crate::palette::Nat;
use crate::scratch::FramePool;

/// One produced frame. Numbers are strictly increasing from zero.
#[derive(Debug, Clone)]
pub struct Frame {
    pub number: usize,
    pub image: Buffer2<Nat>,
}

/// Sequential frame source. Frame buffers come from the caller's pool so a
/// frame's scratch releases together at frame end.
pub trait Feed {
    fn has_more(&self) -> bool;
    fn produce(&mut self, pool: &mut FramePool) -> Result<Frame>;
}
