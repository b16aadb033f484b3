//! Parallel processing utilities.

use rayon::prelude::*;

/// Multiplier for number of chunks relative to CPU threads.
/// Using 3x threads provides good load balancing when some chunks finish faster.
const CHUNKS_PER_THREAD: usize = 3;

/// Compute optimal chunk size for the given length.
#[inline]
fn auto_chunk_size(len: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (len / num_chunks).max(1)
}

/// Compute optimal rows per chunk for parallel image processing.
#[inline]
pub fn rows_per_chunk(height: usize) -> usize {
    auto_chunk_size(height)
}

/// Run `f(y_start, rows)` over row-aligned chunks of a row-major slice,
/// in parallel when the image is tall enough to amortize the fork.
pub fn for_each_row_chunk<T, F>(data: &mut [T], width: usize, parallel_threshold: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if width == 0 || data.is_empty() {
        return;
    }
    let height = data.len() / width;

    if height >= parallel_threshold {
        let chunk_rows = rows_per_chunk(height);
        data.par_chunks_mut(width * chunk_rows)
            .enumerate()
            .for_each(|(idx, chunk)| f(idx * chunk_rows, chunk));
    } else {
        f(0, data);
    }
}
