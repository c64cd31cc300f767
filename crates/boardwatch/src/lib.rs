//! Chessboard game tracking from camera frames.
//!
//! Pieces and board corners carry fiducial markers. Given a stream of
//! frames and a marker detector, [`BoardTracker`] waits for the board to
//! settle, rectifies it from the corner markers, reads which tag sits on
//! which square and infers the legal move that explains each change.
//!
//! ## Quickstart
//!
//! ```no_run
//! use boardwatch::{Frame, MarkerObservation, TrackerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrackerConfig::load_json("tracker.json")?;
//! let detector = |_frame: &Frame| -> Vec<MarkerObservation> {
//!     // plug a fiducial detector in here
//!     Vec::new()
//! };
//! let mut tracker = config.build_tracker(detector)?;
//! # let frames: Vec<Frame> = Vec::new();
//! let summary = tracker.run(frames, &config.stabilizer)?;
//! println!("{}", summary.record.to_pgn());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `boardwatch::core`: rasters, blur, homography, logger.
//! - `boardwatch::board`: stabilizer, calibrator, square mapper, snapshots.
//! - `boardwatch::moves`: rules oracle, piece map, move inference, game record.
//! - `boardwatch::frames` (feature `image`): adapters from `image::GrayImage`.

pub use boardwatch_board as board;
pub use boardwatch_core as core;
pub use boardwatch_moves as moves;

pub use boardwatch_board::{
    CornerIds, Frame, MarkerDetector, MarkerObservation, Orientation, Snapshot, Square,
    StabilizerParams, StableFrame,
};
pub use boardwatch_moves::{CommittedMove, GameRecord, InferenceOutcome, PieceMap};

mod config;
mod tracker;

pub use config::{ConfigError, TrackerConfig};
pub use tracker::{
    track, BoardTracker, CalibrationStatus, FrameOutcome, TrackError, TrackSummary,
};

#[cfg(feature = "image")]
pub mod frames;

/// Install the `tracing` subscriber and route `log` records into it.
#[cfg(feature = "tracing")]
pub fn init_tracing(format: boardwatch_core::TracingFormat) {
    let _ = tracing_log::LogTracer::init();
    boardwatch_core::init_tracing(format);
}
