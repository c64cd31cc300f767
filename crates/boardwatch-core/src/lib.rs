//! Core raster and geometry utilities for board tracking.
//!
//! This crate is intentionally small: an owned/borrowed 8-bit grayscale
//! raster, the blur and differencing used for motion scoring, and the
//! 4-point homography solver plus perspective warp used for board
//! calibration. It knows nothing about chess.

mod homography;
mod image;
mod logger;

pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{
    gaussian_blur, gaussian_kernel, mean_abs_diff, sample_bilinear, sample_bilinear_u8,
    GrayImage, GrayImageView, ImageError,
};

#[cfg(feature = "tracing")]
pub use logger::{init_tracing, TracingFormat};

pub use logger::{init_from_env, init_with_level, LOG_ENV};

pub use nalgebra::Point2;
