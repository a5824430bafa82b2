//! Overlapping window planning over context tokens.

use std::ops::Range;

/// Plans the context token ranges covered by each window.
///
/// Windows hold at most `window_size` tokens and start `stride` tokens
/// apart; the last window always ends at `context_len`. With
/// `0 < stride <= window_size` consecutive windows leave no gap, and any run
/// of at most `window_size - stride + 1` tokens lies entirely inside one
/// window. A context that fits (including an empty one) yields one window.
///
/// # Examples
///
/// ```
/// use qa_rs::sequence::plan_windows;
///
/// assert_eq!(plan_windows(10, 4, 3), vec![0..4, 3..7, 6..10]);
/// assert_eq!(plan_windows(3, 4, 3), vec![0..3]);
/// ```
#[must_use]
pub fn plan_windows(context_len: usize, window_size: usize, stride: usize) -> Vec<Range<usize>> {
    if context_len <= window_size || window_size == 0 {
        return vec![0..context_len];
    }

    let stride = stride.clamp(1, window_size);
    let mut windows = Vec::with_capacity(context_len.div_ceil(stride));
    let mut start = 0;

    loop {
        let end = (start + window_size).min(context_len);
        windows.push(start..end);
        if end >= context_len {
            break;
        }
        start += stride;
    }

    windows
}

/// Stride actually used so that answers up to `max_answer_length` fit in a window.
///
/// A span with `end - start <= max_answer_length` is `max_answer_length + 1`
/// tokens long, which [`plan_windows`] only guarantees for
/// `stride <= window_size - max_answer_length`.
#[must_use]
pub fn effective_stride(doc_stride: usize, window_size: usize, max_answer_length: usize) -> usize {
    doc_stride
        .min(window_size.saturating_sub(max_answer_length))
        .max(1)
}
