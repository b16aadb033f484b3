//! Foreground (sprite) removal.
//!
//! Each fragment is rebuilt frame by frame: pixels that disagree with the
//! fragment's consensus background are foreground candidates, and small
//! contours made up entirely of candidates are masked out of the re-blit.
//! Large mismatching regions survive, so genuine scenery that the consensus
//! got wrong is not destroyed wholesale.

mod mask;

pub use mask::mismatch_mask;

use common::Buffer2;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::contour::ContourExtractor;
use crate::error::Result;
use crate::fragment::Fragment;
use crate::types::Dimensions;

/// Share of the frame area above which a contour is too large to be a
/// sprite.
const SPRITE_AREA_DIVISOR: usize = 5;

/// Strip moving sprites from every fragment, in parallel across fragments.
///
/// `frame_dims` are the capture window dimensions all attributed frames
/// share; payloads are decompressed with `codec`.
pub fn filter_fragments<C: Codec>(
    fragments: Vec<Fragment>,
    frame_dims: Dimensions,
    codec: &C,
) -> Result<Vec<Fragment>> {
    fragments
        .into_par_iter()
        .map(|fragment| filter_fragment(fragment, frame_dims, codec))
        .collect()
}

/// Rebuild one fragment without its moving foreground.
pub fn filter_fragment<C: Codec>(
    fragment: Fragment,
    frame_dims: Dimensions,
    codec: &C,
) -> Result<Fragment> {
    let background = fragment.blend();
    let area_limit = frame_dims.area() / SPRITE_AREA_DIVISOR;

    let mut order: Vec<usize> = (0..fragment.frames().len()).collect();
    order.sort_unstable_by_key(|&i| fragment.frames()[i].number);

    let mut rebuilt = Fragment::new(frame_dims);
    let mut extractor = ContourExtractor::new(frame_dims);
    let mut mismatch = Buffer2::new_default(frame_dims.width, frame_dims.height);
    let mut foreground = Buffer2::new_default(frame_dims.width, frame_dims.height);

    for index in order {
        let record = &fragment.frames()[index];
        let Some(payload) = record.payload.as_ref() else {
            warn!(frame = record.number, "frame without payload skipped");
            continue;
        };

        let raw = codec.decompress(&payload.image, frame_dims)?;
        let median = codec.decompress(&payload.median, frame_dims)?;

        mismatch_mask(&background.image, record.position, &raw, &mut mismatch);

        let contours = extractor.extract_filtered(&median, |idx| mismatch[idx] == 0);

        foreground.fill(0);
        let mut masked = 0usize;
        for contour in &contours {
            if !contour.all_accepted() || contour.area() as usize > area_limit {
                continue;
            }
            let enclosure = contour.enclosure();
            for y in enclosure.top..enclosure.bottom {
                let row = foreground.row_mut(y as usize);
                row[enclosure.left as usize..enclosure.right as usize].fill(1);
            }
            masked += 1;
        }
        debug!(frame = record.number, contours = masked, "foreground masked");

        rebuilt.blit_masked(
            record.position,
            &raw,
            &foreground,
            record.number,
            Some(payload.clone()),
        );
    }

    rebuilt.normalize();
    Ok(rebuilt)
}
