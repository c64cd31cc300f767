use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{Matrix3, Point2, Vector3};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Planar projective transform acting on homogeneous pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    /// Map every point; an empty slice yields an empty vector.
    pub fn apply_all(&self, pts: &[Point2<f32>]) -> Vec<Point2<f32>> {
        pts.iter().map(|&p| self.apply(p)).collect()
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

// Any three collinear corners make the 4-point system singular.
fn has_collinear_triple(pts: &[Point2<f32>; 4]) -> bool {
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for p in pts {
        min_x = min_x.min(p.x as f64);
        min_y = min_y.min(p.y as f64);
        max_x = max_x.max(p.x as f64);
        max_y = max_y.max(p.y as f64);
    }
    let extent = (max_x - min_x).max(max_y - min_y);
    if extent <= 1e-9 {
        return true;
    }
    let eps = 1e-6 * extent * extent;

    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[i, j, k]| {
        let (a, b, c) = (pts[i], pts[j], pts[k]);
        let cross = (b.x as f64 - a.x as f64) * (c.y as f64 - a.y as f64)
            - (b.y as f64 - a.y as f64) * (c.x as f64 - a.x as f64);
        cross.abs() <= eps
    })
}

/// Projective map taking the unit square corners `(0,0), (1,0), (1,1), (0,1)`
/// onto `quad`, in that order (Heckbert's closed form).
fn unit_square_to_quad(quad: &[Point2<f32>; 4]) -> Option<Matrix3<f64>> {
    let [(x0, y0), (x1, y1), (x2, y2), (x3, y3)] =
        quad.map(|p| (p.x as f64, p.y as f64));

    let sx = x0 - x1 + x2 - x3;
    let sy = y0 - y1 + y2 - y3;
    let (g, h) = if sx.abs() < 1e-12 && sy.abs() < 1e-12 {
        // parallelogram: the map is affine
        (0.0, 0.0)
    } else {
        let (dx1, dx2) = (x1 - x2, x3 - x2);
        let (dy1, dy2) = (y1 - y2, y3 - y2);
        let den = dx1 * dy2 - dx2 * dy1;
        if den.abs() < 1e-12 {
            return None;
        }
        ((sx * dy2 - dx2 * sy) / den, (dx1 * sy - sx * dy1) / den)
    };

    Some(Matrix3::new(
        x1 - x0 + g * x1, x3 - x0 + h * x3, x0, //
        y1 - y0 + g * y1, y3 - y0 + h * y3, y0, //
        g, h, 1.0,
    ))
}

/// Compute H such that `dst ~ H * src` from exactly four correspondences.
///
/// Both quads go through the unit square: `H = Q_dst * Q_src⁻¹`. Corner order
/// must match between `src` and `dst`. Returns `None` for degenerate
/// configurations (three collinear points, repeated points, non-finite input).
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    if src
        .iter()
        .chain(dst.iter())
        .any(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        return None;
    }
    if has_collinear_triple(src) || has_collinear_triple(dst) {
        return None;
    }

    let src_from_unit = unit_square_to_quad(src)?;
    let dst_from_unit = unit_square_to_quad(dst)?;
    let h = dst_from_unit * src_from_unit.try_inverse()?;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    let h = h / scale;
    if h.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(Homography::new(h))
}

/// Warp into an `out_w × out_h` raster: each output pixel center is mapped
/// back into `src` through `h_src_from_dst` and sampled bilinearly.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, h_src_from_dst))
)]
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_src_from_dst: Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = vec![0u8; out_w * out_h];

    for y in 0..out_h {
        for x in 0..out_w {
            let pd = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let ps = h_src_from_dst.apply(pd);
            out[y * out_w + x] = sample_bilinear_u8(src, ps.x - 0.5, ps.y - 0.5);
        }
    }

    GrayImage {
        width: out_w,
        height: out_h,
        data: out,
    }
}
