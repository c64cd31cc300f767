use crate::Frame;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Identifier decoded from a fiducial marker.
pub type TagId = u32;

/// One decoded marker in a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    pub tag_id: TagId,
    /// Marker center, in the pixel space of the frame it was detected in
    /// (or in canonical board space once warped).
    pub center: Point2<f32>,
}

impl MarkerObservation {
    pub fn new(tag_id: TagId, x: f32, y: f32) -> Self {
        Self {
            tag_id,
            center: Point2::new(x, y),
        }
    }
}

/// Fiducial marker detector.
///
/// Implementations return every marker they can decode in the frame; an
/// empty vector is a normal answer.
pub trait MarkerDetector {
    fn detect(&self, frame: &Frame) -> Vec<MarkerObservation>;
}

impl<F> MarkerDetector for F
where
    F: Fn(&Frame) -> Vec<MarkerObservation>,
{
    fn detect(&self, frame: &Frame) -> Vec<MarkerObservation> {
        self(frame)
    }
}
