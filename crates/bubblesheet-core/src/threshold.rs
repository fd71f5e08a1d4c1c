//! Global and local binarization.

use crate::{GrayImage, GrayImageView};

/// Compute Otsu threshold from a set of sample intensities.
///
/// Pixels `< threshold` belong to the dark class.
pub fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut hist = [0u32; 256];
    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        hist[v as usize] += 1;
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16 + 1) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        sum_b += (t as f64) * (h as f64);
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            // class boundary sits just above bin `t`
            best_t = (t + 1).min(255) as u8;
        }
    }

    best_t
}

/// Summed-area table with one row/column of zero padding.
pub struct IntegralImage {
    width: usize,
    height: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    pub fn new(src: &GrayImageView<'_>) -> Self {
        let w = src.width + 1;
        let mut sums = vec![0u64; w * (src.height + 1)];
        for y in 0..src.height {
            let mut row_sum = 0u64;
            for x in 0..src.width {
                row_sum += src.data[y * src.width + x] as u64;
                sums[(y + 1) * w + x + 1] = sums[y * w + x + 1] + row_sum;
            }
        }
        Self {
            width: src.width,
            height: src.height,
            sums,
        }
    }

    /// Mean over the window of `radius` around `(x, y)`, clipped to the image.
    pub fn window_mean(&self, x: usize, y: usize, radius: usize) -> f32 {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(self.width);
        let y1 = (y + radius + 1).min(self.height);
        let w = self.width + 1;
        let sum = self.sums[y1 * w + x1] + self.sums[y0 * w + x0]
            - self.sums[y0 * w + x1]
            - self.sums[y1 * w + x0];
        let area = ((x1 - x0) * (y1 - y0)) as f32;
        sum as f32 / area
    }
}

/// Local-mean binarization tolerant of uneven lighting.
///
/// A pixel becomes foreground (255) when it is darker than the mean of its
/// `(2r+1)²` neighbourhood by more than `offset`; everything else is 0.
pub fn adaptive_threshold_dark(src: &GrayImageView<'_>, block_radius: usize, offset: f32) -> GrayImage {
    let integral = IntegralImage::new(src);
    let mut data = vec![0u8; src.width * src.height];
    for y in 0..src.height {
        for x in 0..src.width {
            let mean = integral.window_mean(x, y, block_radius);
            let v = src.data[y * src.width + x] as f32;
            if v < mean - offset {
                data[y * src.width + x] = 255;
            }
        }
    }
    GrayImage {
        width: src.width,
        height: src.height,
        data,
    }
}
