//! Action-window scan: find the sub-rectangle of the screen where the game
//! actually happens by accumulating frame-to-frame differences.

use common::Buffer2;
use tracing::{debug, info};

use crate::contour::ContourExtractor;
use crate::error::{Error, Result};
use crate::feed::Feed;
use crate::palette::{Bit, Pixel};
use crate::scratch::FramePool;
use crate::types::{Dimensions, Rect};

/// Frames to keep scanning after a window was found without the best
/// changed-area growing.
const STAGNATION_LIMIT: usize = 100;

/// Scan the feed for the action window.
///
/// Returns `None` when the feed never shows a window-sized changing region;
/// an accepted window is shrunk by one pixel on each side.
pub fn scan<F: Feed>(feed: &mut F, pool: &mut FramePool, dims: Dimensions) -> Result<Option<Rect>> {
    if !feed.has_more() {
        return Ok(None);
    }

    let min_area = dims.area() / 3;
    let min_height = (2 * dims.height / 5) as i32;
    let min_width = (2 * dims.width / 3) as i32;

    let mut extractor = ContourExtractor::new(dims);
    let mut heatmap: Buffer2<Bit> = Buffer2::new_default(dims.width, dims.height);

    let mut previous = produce_checked(feed, pool, dims)?;
    let mut best_area = 0u32;
    let mut stagnation = 0usize;
    let mut result: Option<Rect> = None;

    while feed.has_more() && stagnation <= STAGNATION_LIMIT {
        let current = produce_checked(feed, pool, dims)?;

        for ((flag, prev), cur) in heatmap.iter_mut().zip(previous.iter()).zip(current.iter()) {
            if prev != cur {
                *flag = Bit(1);
            }
        }

        let contours = extractor.extract(&heatmap);
        if let Some(best) = contours
            .iter()
            .max_by_key(|c| c.area() as u64 * c.color().scalar() as u64)
        {
            if best.color() != Bit(0) && best.area() > best_area {
                stagnation = 0;
                best_area = best.area();

                let window = best.enclosure();
                if result.is_some()
                    || (best_area as usize > min_area
                        && window.height() > min_height
                        && window.width() > min_width)
                {
                    debug!(?window, area = best_area, "action window candidate");
                    result = Some(window);
                }
            }
        }

        if result.is_some() {
            stagnation += 1;
        }

        pool.release(previous);
        previous = current;
    }

    pool.release(previous);

    let window = result.map(|r| r.shrink(1));
    info!(?window, "window scan finished");
    Ok(window)
}

fn produce_checked<F: Feed>(
    feed: &mut F,
    pool: &mut FramePool,
    dims: Dimensions,
) -> Result<Buffer2<crate::palette::Nat>> {
    let frame = feed.produce(pool)?;
    let actual = Dimensions::new(frame.image.width(), frame.image.height());
    if actual != dims {
        return Err(Error::FrameDimensions {
            expected: dims,
            actual,
        });
    }
    Ok(frame.image)
}
