//! Lightweight 8-bit grayscale rasters plus the handful of pixel operations
//! the tracker needs (bilinear sampling, Gaussian blur, frame differencing).

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid grayscale buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
    #[error("invalid grayscale dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image filled with a single intensity.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap a row-major buffer, checking that its length matches the dimensions.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width
            .checked_mul(height)
            .ok_or(ImageError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}

/// Normalized 1-D Gaussian taps for an odd kernel size.
///
/// Even sizes are bumped to the next odd size. Sigma follows the usual
/// "derive from kernel size" rule: `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    let size = if size % 2 == 0 { size + 1 } else { size.max(1) };
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;
    let denom = 2.0 * sigma * sigma;

    let mut taps: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

// Mirror without repeating the edge pixel: -1 -> 1, n -> n-2.
#[inline]
fn reflect101(mut i: i32, n: i32) -> usize {
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Separable Gaussian blur with reflected borders.
pub fn gaussian_blur(src: &GrayImageView<'_>, kernel_size: usize) -> GrayImage {
    let (w, h) = (src.width, src.height);
    if w == 0 || h == 0 {
        return GrayImage::filled(w, h, 0);
    }
    let taps = gaussian_kernel(kernel_size);
    let half = (taps.len() / 2) as i32;

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (k, t) in taps.iter().enumerate() {
                let sx = reflect101(x as i32 + k as i32 - half, w as i32);
                acc += t * row[sx] as f32;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, t) in taps.iter().enumerate() {
                let sy = reflect101(y as i32 + k as i32 - half, h as i32);
                acc += t * horizontal[sy * w + x];
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}

/// Mean absolute per-pixel difference. `None` if the shapes differ or the
/// images are empty.
pub fn mean_abs_diff(a: &GrayImageView<'_>, b: &GrayImageView<'_>) -> Option<f64> {
    if a.width != b.width || a.height != b.height || a.data.is_empty() {
        return None;
    }
    let total: u64 = a
        .data
        .iter()
        .zip(b.data)
        .map(|(&p, &q)| p.abs_diff(q) as u64)
        .sum();
    Some(total as f64 / a.data.len() as f64)
}
