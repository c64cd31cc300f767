//! Board calibration from the four corner markers.
//!
//! The calibrator owns a single "sticky" homography: a failed recalibration
//! (missing or degenerate corners) leaves the last good one in place, so a
//! hand briefly covering a corner does not interrupt tracking.

use crate::{Frame, MarkerDetector, MarkerObservation, TagId};
use boardwatch_core::{homography_from_4pt, warp_perspective_gray, GrayImage, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Default side length of the canonical (rectified) board image, in pixels.
pub const DEFAULT_OUTPUT_SIZE: u32 = 900;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("no successful board calibration yet")]
    NoCalibration,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CornerIdsError {
    #[error("expected exactly 4 corner tag ids, got {0}")]
    WrongCount(usize),
    #[error("invalid corner tag id {0:?}")]
    InvalidId(String),
}

/// Corner marker ids in top-left, top-right, bottom-right, bottom-left order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CornerIds(pub [TagId; 4]);

impl CornerIds {
    pub fn new(top_left: TagId, top_right: TagId, bottom_right: TagId, bottom_left: TagId) -> Self {
        Self([top_left, top_right, bottom_right, bottom_left])
    }

    pub fn contains(&self, tag: TagId) -> bool {
        self.0.contains(&tag)
    }
}

impl Default for CornerIds {
    fn default() -> Self {
        Self([0, 1, 2, 3])
    }
}

impl FromStr for CornerIds {
    type Err = CornerIdsError;

    /// Parse `"TL,TR,BR,BL"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ids = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<TagId>()
                    .map_err(|_| CornerIdsError::InvalidId(part.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ids: [TagId; 4] = ids
            .as_slice()
            .try_into()
            .map_err(|_| CornerIdsError::WrongCount(ids.len()))?;
        Ok(Self(ids))
    }
}

impl fmt::Display for CornerIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a},{b},{c},{d}")
    }
}

/// A successful calibration: image pixels -> canonical board pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub board_from_image: Homography,
    pub image_from_board: Homography,
    pub output_size: u32,
}

/// Computes and keeps the sticky image-to-board homography.
#[derive(Debug)]
pub struct BoardCalibrator {
    output_size: u32,
    calibration: Option<Calibration>,
}

impl Default for BoardCalibrator {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_SIZE)
    }
}

impl BoardCalibrator {
    pub fn new(output_size: u32) -> Self {
        Self {
            output_size,
            calibration: None,
        }
    }

    #[inline]
    pub fn output_size(&self) -> u32 {
        self.output_size
    }

    #[inline]
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Run the detector on `frame` and recalibrate from its corner markers.
    pub fn try_calibrate<D: MarkerDetector + ?Sized>(
        &mut self,
        detector: &D,
        frame: &Frame,
        corner_ids: CornerIds,
    ) -> bool {
        let observations = detector.detect(frame);
        self.calibrate_from_observations(&observations, corner_ids)
    }

    /// Recalibrate from already-detected markers.
    ///
    /// Returns `false`, leaving any previous calibration untouched, unless all
    /// four corner ids are present and span a non-degenerate quad. When a
    /// corner id appears more than once, the last observation is used.
    pub fn calibrate_from_observations(
        &mut self,
        observations: &[MarkerObservation],
        corner_ids: CornerIds,
    ) -> bool {
        let mut found: [Option<Point2<f32>>; 4] = [None; 4];
        for obs in observations {
            if let Some(slot) = corner_ids.0.iter().position(|&id| id == obs.tag_id) {
                found[slot] = Some(obs.center);
            }
        }

        let [Some(tl), Some(tr), Some(br), Some(bl)] = found else {
            let missing: Vec<TagId> = corner_ids
                .0
                .iter()
                .zip(found.iter())
                .filter(|(_, p)| p.is_none())
                .map(|(&id, _)| id)
                .collect();
            log::debug!("calibration skipped, corner tags {missing:?} not visible");
            return false;
        };

        let s = self.output_size as f32;
        let src = [tl, tr, br, bl];
        let dst = [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ];

        let Some(board_from_image) = homography_from_4pt(&src, &dst) else {
            log::debug!("calibration skipped, corner quad is degenerate");
            return false;
        };
        let Some(image_from_board) = board_from_image.inverse() else {
            log::debug!("calibration skipped, homography not invertible");
            return false;
        };

        self.calibration = Some(Calibration {
            board_from_image,
            image_from_board,
            output_size: self.output_size,
        });
        true
    }

    /// Rectify `frame` into the canonical `output_size × output_size` board image.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, frame)))]
    pub fn warp(&self, frame: &GrayImage) -> Result<GrayImage, CalibrationError> {
        let cal = self.calibration.ok_or(CalibrationError::NoCalibration)?;
        let size = cal.output_size as usize;
        Ok(warp_perspective_gray(
            &frame.view(),
            cal.image_from_board,
            size,
            size,
        ))
    }

    /// Map image-space points into canonical board space.
    pub fn warp_points(&self, points: &[Point2<f32>]) -> Result<Vec<Point2<f32>>, CalibrationError> {
        let cal = self.calibration.ok_or(CalibrationError::NoCalibration)?;
        Ok(cal.board_from_image.apply_all(points))
    }
}
