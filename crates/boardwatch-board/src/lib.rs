//! Board tracking: from raw camera frames to discrete occupancy snapshots.
//!
//! Pipeline, leaf-first:
//! 1. [`FrameStabilizer`] picks one representative frame per quiescent run.
//! 2. [`BoardCalibrator`] keeps a sticky image-to-board homography computed
//!    from four corner markers.
//! 3. [`SquareMapper`] maps canonical board pixels to squares and back.
//! 4. [`SnapshotBuilder`] turns warped marker observations into a
//!    [`Snapshot`] (square -> tag id).
//!
//! Marker detection itself is left to a [`MarkerDetector`] implementation.
//!
//! ```
//! use boardwatch_board::{MarkerObservation, Orientation, SnapshotBuilder, SquareMapper};
//!
//! let builder = SnapshotBuilder::new(SquareMapper::new(800, Orientation::WhiteAtBottom));
//! let built = builder.build(&[MarkerObservation::new(12, 450.0, 450.0)], 0.0, 0);
//! assert_eq!(built.snapshot.tag_at("e4".parse().unwrap()), Some(12));
//! ```

mod calibrator;
mod frame;
mod mapper;
mod marker;
mod snapshot;
mod square;
mod stabilizer;

pub use calibrator::{
    BoardCalibrator, Calibration, CalibrationError, CornerIds, CornerIdsError,
    DEFAULT_OUTPUT_SIZE,
};
pub use frame::{Frame, StableFrame};
pub use mapper::{Orientation, SquareMapper};
pub use marker::{MarkerDetector, MarkerObservation, TagId};
pub use snapshot::{Placement, Snapshot, SnapshotBuild, SnapshotBuilder, SnapshotHistory};
pub use square::{ParseSquareError, Square};
pub use stabilizer::{FrameStabilizer, StabilizerParams, StableRunDetector, FIRST_FRAME_SCORE};
