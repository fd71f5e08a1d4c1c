use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Projective map of the plane, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
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

    /// Axis-aligned scale `(x, y) -> (sx * x, sy * y)`.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0))
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let q = self.apply_f64(p.x as f64, p.y as f64);
        Point2::new(q.x as f32, q.y as f32)
    }

    #[inline]
    pub fn apply_f64(&self, x: f64, y: f64) -> Point2<f64> {
        let v = self.h * Vector3::new(x, y, 1.0);
        let w = v[2];
        Point2::new(v[0] / w, v[1] / w)
    }

    pub fn inverse(&self) -> Option<Self> {
        let inv = self.h.try_inverse()?;
        normalize_homography(inv).map(Self::new)
    }

    /// `self ∘ other`: apply `other` first.
    pub fn compose(&self, other: &Homography) -> Homography {
        Homography::new(self.h * other.h)
    }

    /// True when the projective row is `[0, 0, 1]` (up to `eps`).
    pub fn is_affine(&self, eps: f64) -> bool {
        self.h[(2, 0)].abs() <= eps
            && self.h[(2, 1)].abs() <= eps
            && (self.h[(2, 2)] - 1.0).abs() <= eps
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points(pts: &[Point2<f32>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    // Hartley normalization: translate to centroid, scale so mean distance = sqrt(2)
    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let t = hartley_normalization(cx, cy, mean_dist);

    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

/// Estimate H such that `dst ~ H * src` from N >= 4 correspondences.
///
/// Four points use the exact solver, more points the normalized DLT.
pub fn estimate_homography(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    if src.len() == 4 {
        let s: &[Point2<f32>; 4] = src.try_into().ok()?;
        let d: &[Point2<f32>; 4] = dst.try_into().ok()?;
        return homography_from_4pt(s, d);
    }

    let (r, tr) = normalize_points(src);
    let (i, ti) = normalize_points(dst);

    // Build A (2N x 9)
    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);

    for k in 0..n {
        let x = r[k].x;
        let y = r[k].y;
        let u = i[k].x;
        let v = i[k].y;

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Solve Ah = 0 -> h is right singular vector with smallest singular value
    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = vt.row(min_idx);

    let hn =
        Matrix3::<f64>::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // Denormalize: H = Ti^{-1} * Hn * Tr
    let h_den = denormalize_homography(hn, tr, ti)?;
    let h_den = normalize_homography(h_den)?;

    Some(Homography::new(h_den))
}

/// Compute H such that `dst ~ H * src` from exactly 4 correspondences.
///
/// Corner order must be consistent between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    // h11 x + h12 y + h13 - u h31 x - u h32 y = u
    // h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let (src_n, t_src) = normalize_points(src);
    let (dst_n, t_dst) = normalize_points(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let x = src_n[k].x;
        let y = src_n[k].y;
        let u = dst_n[k].x;
        let v = dst_n[k].y;

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    let h_den = denormalize_homography(hn, t_src, t_dst)?;
    let h_den = normalize_homography(h_den)?;

    Some(Homography::new(h_den))
}

/// Exact affine map (as a homography with last row `[0, 0, 1]`) from 3 correspondences.
///
/// Returns `None` when either triangle is degenerate.
pub fn affine_from_3pt(src: &[Point2<f32>; 3], dst: &[Point2<f32>; 3]) -> Option<Homography> {
    let mut a = SMatrix::<f64, 6, 6>::zeros();
    let mut b = SVector::<f64, 6>::zeros();
    for k in 0..3 {
        let x = src[k].x as f64;
        let y = src[k].y as f64;
        a[(2 * k, 0)] = x;
        a[(2 * k, 1)] = y;
        a[(2 * k, 2)] = 1.0;
        b[2 * k] = dst[k].x as f64;
        a[(2 * k + 1, 3)] = x;
        a[(2 * k + 1, 4)] = y;
        a[(2 * k + 1, 5)] = 1.0;
        b[2 * k + 1] = dst[k].y as f64;
    }
    let x = a.lu().solve(&b)?;
    let h = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], 0.0, 0.0, 1.0);
    h.try_inverse()?;
    Some(Homography::new(h))
}

/// Warp into a new image: each destination pixel center is mapped into the
/// source with `h_src_from_dst` and sampled bilinearly.
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
