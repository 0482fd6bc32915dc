//! Reversed-loop composer
//!
//! Appends a reversed copy of a frame sequence so the animation plays
//! forward then backward and loops without a visible jump cut.
//!
//! For N frames `0..N` the result has `2N` frames: the originals untouched,
//! followed by copies `N..2N` where frame `N + k` is a copy of frame
//! `N - 1 - k`. The boundary frame is duplicated: frame N-1 appears twice
//! in a row and the turnaround holds for two ticks.
//!
//! - N = 0: no-op.
//! - N = 1: a single-frame repeat, two identical frames.

use std::fs;
use tracing::debug;

use crate::error::{PostSocialError, Result};
use crate::frames::{FrameId, FrameSequence, FrameSet};

/// One planned copy: `src` index is duplicated to `dst` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopCopy {
    pub src: FrameId,
    pub dst: FrameId,
}

/// Plan the forward-then-backward sequence without touching disk.
pub fn reversed_loop(sequence: &FrameSequence) -> (FrameSequence, Vec<LoopCopy>) {
    let mut composed = sequence.clone();
    let Some(max_index) = sequence.max_index() else {
        return (composed, Vec::new());
    };

    let copies: Vec<LoopCopy> = sequence
        .iter()
        .rev()
        .zip(max_index + 1..)
        .map(|(src, dst_index)| LoopCopy {
            src: *src,
            dst: FrameId::new(dst_index, src.format),
        })
        .collect();

    for copy in &copies {
        composed.append(copy.dst);
    }
    (composed, copies)
}

/// Execute the plan inside the frame set's own directory.
///
/// Only new files are written; the forward frames are left byte-for-byte
/// as they were.
pub fn compose_reversed_loop(frames: &FrameSet) -> Result<FrameSet> {
    let (composed, copies) = reversed_loop(&frames.sequence);
    debug!(
        dir = %frames.dir.display(),
        forward = frames.len(),
        total = composed.len(),
        "Composing reversed loop"
    );

    for copy in &copies {
        let from = frames.path_of(&copy.src);
        let to = frames.path_of(&copy.dst);
        fs::copy(&from, &to).map_err(|e| PostSocialError::io(&from, e))?;
    }

    Ok(FrameSet::new(&frames.dir, composed))
}
