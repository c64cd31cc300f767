//! End-to-end driver: raw frames in, committed moves out.

use crate::config::{ConfigError, TrackerConfig};
use boardwatch_board::{
    BoardCalibrator, CalibrationError, CornerIds, Frame, FrameStabilizer, MarkerDetector,
    MarkerObservation, Orientation, SnapshotBuilder, SnapshotHistory, SquareMapper,
    StabilizerParams, StableFrame, DEFAULT_OUTPUT_SIZE,
};
use boardwatch_moves::{
    GameRecord, InferenceOutcome, MoveInferrer, PieceMap, RulesError, RulesOracle, ShakmatyRules,
};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum TrackError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Which homography a snapshot was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Recomputed from this frame's corner markers.
    Fresh,
    /// Corners unusable in this frame; the last good homography was reused.
    Sticky,
}

/// Result of feeding one stable frame to the tracker.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// The board has never been calibrated; no snapshot was built.
    Skipped,
    Snapshot {
        calibration: CalibrationStatus,
        /// Piece markers that fell outside the board.
        unassigned: usize,
        /// `None` for the first snapshot of a run.
        inference: Option<InferenceOutcome>,
    },
}

#[derive(Clone, Debug)]
pub struct TrackSummary {
    pub record: GameRecord,
    pub stable_frames: usize,
    pub skipped_frames: usize,
    /// The run stopped because the game reached a position with no legal moves.
    pub terminal: bool,
}

/// Wires stabilizer, calibrator, snapshot builder and move inference
/// around one marker detector.
pub struct BoardTracker<D, R: RulesOracle = ShakmatyRules> {
    detector: D,
    corner_ids: CornerIds,
    calibrator: BoardCalibrator,
    builder: SnapshotBuilder,
    history: SnapshotHistory,
    inferrer: MoveInferrer<R>,
    terminal: bool,
}

impl<D: MarkerDetector> BoardTracker<D> {
    /// Standard chess, 900 px canonical board, White at the bottom.
    pub fn new(detector: D, corner_ids: CornerIds, piece_map: PieceMap) -> Self {
        Self::with_parts(
            detector,
            corner_ids,
            BoardCalibrator::new(DEFAULT_OUTPUT_SIZE),
            SquareMapper::new(DEFAULT_OUTPUT_SIZE, Orientation::WhiteAtBottom),
            MoveInferrer::standard(piece_map),
        )
    }
}

impl<D: MarkerDetector, R: RulesOracle> BoardTracker<D, R> {
    pub fn with_parts(
        detector: D,
        corner_ids: CornerIds,
        calibrator: BoardCalibrator,
        mapper: SquareMapper,
        inferrer: MoveInferrer<R>,
    ) -> Self {
        Self {
            detector,
            corner_ids,
            calibrator,
            builder: SnapshotBuilder::new(mapper),
            history: SnapshotHistory::new(),
            inferrer,
            terminal: false,
        }
    }

    pub fn calibrator(&self) -> &BoardCalibrator {
        &self.calibrator
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn inferrer(&self) -> &MoveInferrer<R> {
        &self.inferrer
    }

    pub fn record(&self) -> &GameRecord {
        self.inferrer.record()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Detect, calibrate, snapshot and infer for one stable frame.
    ///
    /// Corner markers are used for calibration only and never enter the
    /// snapshot.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, stable), fields(frame = stable.frame_index))
    )]
    pub fn process_stable(&mut self, stable: &StableFrame) -> Result<FrameOutcome, TrackError> {
        let observations = self.detector.detect(&stable.frame);

        let calibration = if self
            .calibrator
            .calibrate_from_observations(&observations, self.corner_ids)
        {
            CalibrationStatus::Fresh
        } else if self.calibrator.is_calibrated() {
            log::debug!(
                "frame {}: reusing previous board calibration",
                stable.frame_index
            );
            CalibrationStatus::Sticky
        } else {
            log::warn!(
                "frame {}: board not calibrated yet, skipping",
                stable.frame_index
            );
            return Ok(FrameOutcome::Skipped);
        };

        let pieces: Vec<&MarkerObservation> = observations
            .iter()
            .filter(|obs| !self.corner_ids.contains(obs.tag_id))
            .collect();
        let centers: Vec<Point2<f32>> = pieces.iter().map(|obs| obs.center).collect();
        let warped = self.calibrator.warp_points(&centers)?;
        let canonical: Vec<MarkerObservation> = pieces
            .iter()
            .zip(warped)
            .map(|(obs, center)| MarkerObservation {
                tag_id: obs.tag_id,
                center,
            })
            .collect();

        let built = self
            .builder
            .build(&canonical, stable.timestamp, stable.frame_index);

        let inference = match self.history.last() {
            Some(prev) => Some(self.inferrer.observe(prev, &built.snapshot)?),
            None => None,
        };
        if matches!(inference, Some(InferenceOutcome::NoLegalMoves)) {
            self.terminal = true;
        }
        self.history.push(built.snapshot);

        Ok(FrameOutcome::Snapshot {
            calibration,
            unassigned: built.unassigned.len(),
            inference,
        })
    }

    /// Stabilize a raw frame stream and track it to the end, or until the
    /// game has no legal moves left.
    pub fn run<I>(&mut self, frames: I, params: &StabilizerParams) -> Result<TrackSummary, TrackError>
    where
        I: IntoIterator<Item = Frame>,
    {
        let mut stable_frames = 0;
        let mut skipped_frames = 0;

        for stable in FrameStabilizer::new(frames.into_iter(), params) {
            stable_frames += 1;
            if self.process_stable(&stable)? == FrameOutcome::Skipped {
                skipped_frames += 1;
            }
            if self.terminal {
                log::info!("frame {}: game over, stopping", stable.frame_index);
                break;
            }
        }

        log::info!(
            "tracked {} stable frame(s), {} skipped, {} move(s)",
            stable_frames,
            skipped_frames,
            self.record().len()
        );
        Ok(TrackSummary {
            record: self.record().clone(),
            stable_frames,
            skipped_frames,
            terminal: self.terminal,
        })
    }
}

/// Build a tracker from `config` and run it over `frames`.
pub fn track<D, I>(
    config: &TrackerConfig,
    detector: D,
    frames: I,
) -> Result<TrackSummary, TrackError>
where
    D: MarkerDetector,
    I: IntoIterator<Item = Frame>,
{
    let mut tracker = config.build_tracker(detector)?;
    tracker.run(frames, &config.stabilizer)
}
