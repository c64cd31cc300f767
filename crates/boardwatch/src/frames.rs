//! Adapters between `image` crate buffers and tracker frames.

use boardwatch_board::Frame;
use boardwatch_core::{GrayImage, ImageError};

/// Copy an `image::GrayImage` into the tracker's raster type.
pub fn gray_from_luma(img: &::image::GrayImage) -> Result<GrayImage, ImageError> {
    GrayImage::from_raw(
        img.width() as usize,
        img.height() as usize,
        img.as_raw().clone(),
    )
}

/// Wrap a decoded video frame, timestamped from a constant frame rate.
pub fn frame_from_luma(
    img: &::image::GrayImage,
    index: u64,
    fps: f64,
) -> Result<Frame, ImageError> {
    Ok(Frame::at_rate(gray_from_luma(img)?, index, fps))
}

/// Turn a sequence of decoded frames into a frame source for the tracker.
pub fn luma_frames<I>(images: I, fps: f64) -> impl Iterator<Item = Result<Frame, ImageError>>
where
    I: IntoIterator<Item = ::image::GrayImage>,
{
    images
        .into_iter()
        .zip(0u64..)
        .map(move |(img, index)| frame_from_luma(&img, index, fps))
}

/// Convert back, e.g. to save a rectified board with `image`.
pub fn to_luma(img: &GrayImage) -> Option<::image::GrayImage> {
    let width = u32::try_from(img.width).ok()?;
    let height = u32::try_from(img.height).ok()?;
    ::image::GrayImage::from_raw(width, height, img.data.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_buffers_convert_both_ways() {
        let img = ::image::GrayImage::from_fn(5, 3, |x, y| ::image::Luma([(x + 10 * y) as u8]));
        let frame = frame_from_luma(&img, 60, 30.0).unwrap();
        assert_eq!(frame.image.width, 5);
        assert_eq!(frame.image.get(4, 2), Some(24));
        assert_eq!(frame.timestamp, 2.0);
        assert_eq!(to_luma(&frame.image).unwrap(), img);
    }

    #[test]
    fn sequences_are_indexed_in_order() {
        let images = (0..3).map(|v| ::image::GrayImage::from_pixel(2, 2, ::image::Luma([v])));
        let frames: Vec<Frame> = luma_frames(images, 10.0)
            .collect::<Result<_, _>>()
            .unwrap();
        let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(frames[2].image.get(1, 1), Some(2));
    }
}
