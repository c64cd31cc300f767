//! JSON configuration for a tracking run.

use crate::tracker::BoardTracker;
use boardwatch_board::{
    BoardCalibrator, CornerIds, MarkerDetector, Orientation, SquareMapper, StabilizerParams,
    DEFAULT_OUTPUT_SIZE,
};
use boardwatch_moves::{MoveInferrer, PieceMap, PieceMapError};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("corner tag ids must be distinct, got {0}")]
    InvalidCornerIds(CornerIds),
    #[error("invalid parameter: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    PieceMap(#[from] PieceMapError),
}

fn default_board_size() -> u32 {
    DEFAULT_OUTPUT_SIZE
}

/// Everything needed to track one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Corner marker ids, top-left, top-right, bottom-right, bottom-left.
    pub corner_ids: CornerIds,
    /// Side of the canonical board image in pixels.
    #[serde(default = "default_board_size")]
    pub board_size: u32,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub stabilizer: StabilizerParams,
    /// Inline tag -> label table. Takes precedence over `piece_map_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece_map: Option<PieceMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece_map_path: Option<String>,
}

impl TrackerConfig {
    pub fn new(corner_ids: CornerIds) -> Self {
        Self {
            corner_ids,
            board_size: DEFAULT_OUTPUT_SIZE,
            orientation: Orientation::default(),
            stabilizer: StabilizerParams::default(),
            piece_map: None,
            piece_map_path: None,
        }
    }

    /// Load and validate a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ids = self.corner_ids.0;
        for (i, id) in ids.iter().enumerate() {
            if ids[i + 1..].contains(id) {
                return Err(ConfigError::InvalidCornerIds(self.corner_ids));
            }
        }
        if self.board_size < 8 {
            return Err(ConfigError::InvalidParams(format!(
                "board_size must be at least 8 pixels, got {}",
                self.board_size
            )));
        }
        let s = &self.stabilizer;
        if !s.motion_threshold.is_finite() || s.motion_threshold < 0.0 {
            return Err(ConfigError::InvalidParams(format!(
                "stabilizer.motion_threshold must be finite and non-negative, got {}",
                s.motion_threshold
            )));
        }
        if !s.stable_duration_s.is_finite() || s.stable_duration_s < 0.0 {
            return Err(ConfigError::InvalidParams(format!(
                "stabilizer.stable_duration_s must be finite and non-negative, got {}",
                s.stable_duration_s
            )));
        }
        if s.blur_kernel % 2 == 0 {
            return Err(ConfigError::InvalidParams(format!(
                "stabilizer.blur_kernel must be odd, got {}",
                s.blur_kernel
            )));
        }
        Ok(())
    }

    /// The configured piece map: inline, then `piece_map_path`, else empty.
    pub fn load_piece_map(&self) -> Result<PieceMap, ConfigError> {
        if let Some(map) = &self.piece_map {
            return Ok(map.clone());
        }
        match &self.piece_map_path {
            Some(path) => Ok(PieceMap::load_json(path)?),
            None => Ok(PieceMap::default()),
        }
    }

    pub fn mapper(&self) -> SquareMapper {
        SquareMapper::new(self.board_size, self.orientation)
    }

    /// Validate, resolve the piece map and assemble a standard-chess tracker.
    pub fn build_tracker<D: MarkerDetector>(
        &self,
        detector: D,
    ) -> Result<BoardTracker<D>, ConfigError> {
        self.validate()?;
        let piece_map = self.load_piece_map()?;
        Ok(BoardTracker::with_parts(
            detector,
            self.corner_ids,
            BoardCalibrator::new(self.board_size),
            self.mapper(),
            MoveInferrer::standard(piece_map),
        ))
    }
}
