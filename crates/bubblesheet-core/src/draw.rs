//! Synthetic rendering helpers for tests and examples.
//!
//! Coordinates are continuous: a pixel is painted when its center
//! `(x + 0.5, y + 0.5)` falls inside the shape.

use crate::GrayImage;

/// Paint a filled disc.
pub fn fill_disc(img: &mut GrayImage, cx: f32, cy: f32, radius: f32, value: u8) {
    fill_ring(img, cx, cy, radius, 0.0, value);
}

/// Paint an annulus `inner <= d <= outer`.
pub fn fill_ring(img: &mut GrayImage, cx: f32, cy: f32, outer: f32, inner: f32, value: u8) {
    let x0 = (cx - outer).floor().max(0.0) as usize;
    let y0 = (cy - outer).floor().max(0.0) as usize;
    let x1 = ((cx + outer).ceil().max(0.0) as usize).min(img.width);
    let y1 = ((cy + outer).ceil().max(0.0) as usize).min(img.height);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d <= outer && d >= inner {
                img.data[y * img.width + x] = value;
            }
        }
    }
}

/// Paint an axis-aligned rectangle given in pixels.
pub fn fill_rect(img: &mut GrayImage, x: f32, y: f32, w: f32, h: f32, value: u8) {
    let x0 = x.round().max(0.0) as usize;
    let y0 = y.round().max(0.0) as usize;
    let x1 = ((x + w).round().max(0.0) as usize).min(img.width);
    let y1 = ((y + h).round().max(0.0) as usize).min(img.height);
    for yy in y0..y1 {
        for xx in x0..x1 {
            img.data[yy * img.width + xx] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disc_area_is_close_to_pi_r_squared() {
        let mut img = GrayImage::filled(64, 64, 255);
        fill_disc(&mut img, 32.0, 32.0, 10.0, 0);
        let dark = img.data.iter().filter(|&&v| v == 0).count() as f32;
        let expected = std::f32::consts::PI * 100.0;
        assert!((dark - expected).abs() / expected < 0.05);
    }

    #[test]
    fn rect_is_clipped_to_image() {
        let mut img = GrayImage::filled(10, 10, 255);
        fill_rect(&mut img, 8.0, 8.0, 5.0, 5.0, 0);
        assert_eq!(img.data.iter().filter(|&&v| v == 0).count(), 4);
    }
}
