//! Frame stabilization: turn a raw frame stream into one representative
//! frame per quiescent run.
//!
//! Every incoming frame is blurred and compared against the previous blurred
//! frame. Frames whose mean absolute difference stays under
//! `motion_threshold` extend the current run. A motion spike closes the run;
//! runs of at least `min_stable_frames` emit their middle element, shorter
//! runs are dropped. The pending run is flushed the same way when the stream
//! ends.

use crate::{Frame, StableFrame};
use boardwatch_core::{gaussian_blur, mean_abs_diff, GrayImage};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Motion score assigned to a frame with no predecessor (or a predecessor of
/// a different size), so it can never join a run.
pub const FIRST_FRAME_SCORE: f64 = f64::INFINITY;

/// Stabilizer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerParams {
    /// Mean absolute intensity difference below which a frame counts as still.
    pub motion_threshold: f64,
    /// How long the board must stay still to count as settled, in seconds.
    pub stable_duration_s: f64,
    /// Stream frame rate. Non-positive values fall back to 30.
    pub fps: f64,
    /// Gaussian kernel size applied before differencing (odd).
    pub blur_kernel: usize,
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self {
            motion_threshold: 5.0,
            stable_duration_s: 0.5,
            fps: 30.0,
            blur_kernel: 21,
        }
    }
}

impl StabilizerParams {
    pub fn effective_fps(&self) -> f64 {
        if self.fps > 0.0 {
            self.fps
        } else {
            30.0
        }
    }

    /// Minimum run length, `floor(stable_duration_s * fps)`.
    pub fn min_stable_frames(&self) -> usize {
        let n = (self.stable_duration_s * self.effective_fps()).floor();
        if n.is_finite() && n > 0.0 {
            n as usize
        } else {
            0
        }
    }
}

/// Run-length bookkeeping, independent of how scores are produced.
#[derive(Debug)]
pub struct StableRunDetector<T> {
    threshold: f64,
    min_len: usize,
    run: Vec<(T, f64)>,
}

impl<T> StableRunDetector<T> {
    pub fn new(threshold: f64, min_len: usize) -> Self {
        Self {
            threshold,
            min_len,
            run: Vec::new(),
        }
    }

    /// Feed one scored item. Returns the middle of the run this item closed,
    /// if that run was long enough.
    pub fn push(&mut self, item: T, score: f64) -> Option<(T, f64)> {
        if score < self.threshold {
            self.run.push((item, score));
            return None;
        }
        self.take_run()
    }

    /// Flush the pending run at end of stream.
    pub fn finish(&mut self) -> Option<(T, f64)> {
        self.take_run()
    }

    /// Number of items in the in-progress run.
    pub fn pending(&self) -> usize {
        self.run.len()
    }

    fn take_run(&mut self) -> Option<(T, f64)> {
        let run = std::mem::take(&mut self.run);
        if run.is_empty() || run.len() < self.min_len {
            return None;
        }
        let mid = run.len() / 2;
        run.into_iter().nth(mid)
    }
}

/// Lazy iterator of stable frames over a raw frame source.
pub struct FrameStabilizer<I> {
    frames: I,
    blur_kernel: usize,
    prev_blurred: Option<GrayImage>,
    runs: StableRunDetector<Frame>,
    exhausted: bool,
}

impl<I> FrameStabilizer<I>
where
    I: Iterator<Item = Frame>,
{
    pub fn new(frames: I, params: &StabilizerParams) -> Self {
        Self {
            frames,
            blur_kernel: params.blur_kernel,
            prev_blurred: None,
            runs: StableRunDetector::new(params.motion_threshold, params.min_stable_frames()),
            exhausted: false,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self, frame), fields(index = frame.index))
    )]
    fn score(&mut self, frame: &Frame) -> f64 {
        let blurred = gaussian_blur(&frame.image.view(), self.blur_kernel);
        let score = self
            .prev_blurred
            .as_ref()
            .and_then(|prev| mean_abs_diff(&prev.view(), &blurred.view()))
            .unwrap_or(FIRST_FRAME_SCORE);
        self.prev_blurred = Some(blurred);
        score
    }
}

impl<I> Iterator for FrameStabilizer<I>
where
    I: Iterator<Item = Frame>,
{
    type Item = StableFrame;

    fn next(&mut self) -> Option<StableFrame> {
        if self.exhausted {
            return None;
        }
        while let Some(frame) = self.frames.next() {
            let score = self.score(&frame);
            log::trace!("frame {} motion score {:.3}", frame.index, score);
            if let Some((frame, score)) = self.runs.push(frame, score) {
                log::debug!("stable frame {} at {:.2}s", frame.index, frame.timestamp);
                return Some(StableFrame::new(frame, score));
            }
        }
        self.exhausted = true;
        self.runs
            .finish()
            .map(|(frame, score)| StableFrame::new(frame, score))
    }
}
