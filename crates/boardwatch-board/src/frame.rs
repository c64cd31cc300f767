use boardwatch_core::GrayImage;

/// One raw camera frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: GrayImage,
    /// Position of the frame in its source stream.
    pub index: u64,
    /// Seconds since the start of the stream.
    pub timestamp: f64,
}

impl Frame {
    pub fn new(image: GrayImage, index: u64, timestamp: f64) -> Self {
        Self {
            image,
            index,
            timestamp,
        }
    }

    /// Frame whose timestamp is derived from a constant frame rate.
    pub fn at_rate(image: GrayImage, index: u64, fps: f64) -> Self {
        let timestamp = if fps > 0.0 { index as f64 / fps } else { 0.0 };
        Self::new(image, index, timestamp)
    }
}

/// The representative frame of a quiescent run.
#[derive(Clone, Debug)]
pub struct StableFrame {
    pub frame: Frame,
    pub frame_index: u64,
    pub timestamp: f64,
    /// Motion score of the chosen frame against its predecessor.
    pub motion_score: f64,
}

impl StableFrame {
    pub fn new(frame: Frame, motion_score: f64) -> Self {
        Self {
            frame_index: frame.index,
            timestamp: frame.timestamp,
            frame,
            motion_score,
        }
    }
}
