//! Lightweight image buffers.
//!
//! Pixel `(x, y)` covers the continuous square `[x, x+1) × [y, y+1)`, so its
//! center sits at `(x + 0.5, y + 0.5)`. Homographies and marker centers use
//! these continuous coordinates; the samplers below take *index* coordinates
//! (integer = pixel center).

use serde::{Deserialize, Serialize};

/// Errors raised when wrapping raw pixel memory.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(u8),
}

/// Luma weights applied when collapsing color input to gray.
pub const LUMA_WEIGHTS: [f32; 3] = [0.298_912, 0.586_611, 0.114_478];

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

/// Size of an image in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

/// Integer pixel rectangle, `x..x+width` × `y..y+height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl GrayImage {
    /// Wrap an owned row-major buffer, validating its length.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions { width, height });
        }
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

    /// Uniform image of the given value.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
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
    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Copy a sub-rectangle. Returns `None` if it does not fit inside the image.
    pub fn crop(&self, rect: PixelRect) -> Option<GrayImage> {
        self.view().crop(rect)
    }
}

impl<'a> GrayImageView<'a> {
    #[inline]
    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn to_owned_image(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }

    pub fn crop(&self, rect: PixelRect) -> Option<GrayImage> {
        if rect.width == 0 || rect.height == 0 {
            return None;
        }
        if rect.x.checked_add(rect.width)? > self.width
            || rect.y.checked_add(rect.height)? > self.height
        {
            return None;
        }
        let mut data = Vec::with_capacity(rect.width * rect.height);
        for y in rect.y..rect.y + rect.height {
            let row = y * self.width;
            data.extend_from_slice(&self.data[row + rect.x..row + rect.x + rect.width]);
        }
        Some(GrayImage {
            width: rect.width,
            height: rect.height,
            data,
        })
    }
}

/// Decoded interleaved 8-bit pixels with 1 (gray), 3 (RGB) or 4 (RGBA) channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, channels: u8, data: Vec<u8>) -> Result<Self, ImageError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(ImageError::UnsupportedChannels(channels));
        }
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions { width, height });
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels as usize))
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
            channels,
            data,
        })
    }

    /// Collapse to a single gray channel (alpha is ignored).
    pub fn to_gray(&self) -> GrayImage {
        let data = match self.channels {
            1 => self.data.clone(),
            c => self
                .data
                .chunks_exact(c as usize)
                .map(|px| {
                    let v = LUMA_WEIGHTS[0] * px[0] as f32
                        + LUMA_WEIGHTS[1] * px[1] as f32
                        + LUMA_WEIGHTS[2] * px[2] as f32;
                    v.round().clamp(0.0, 255.0) as u8
                })
                .collect(),
        };
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

#[inline]
fn get_gray_clamped(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    let x = x.clamp(0, src.width as i32 - 1) as usize;
    let y = y.clamp(0, src.height as i32 - 1) as usize;
    src.data[y * src.width + x]
}

/// Bilinear sample at index coordinates; borders are clamped.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray_clamped(src, x0, y0) as f32;
    let p10 = get_gray_clamped(src, x0 + 1, y0) as f32;
    let p01 = get_gray_clamped(src, x0, y0 + 1) as f32;
    let p11 = get_gray_clamped(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffers() {
        assert_eq!(
            GrayImage::new(4, 4, vec![0; 15]),
            Err(ImageError::InvalidBuffer {
                expected: 16,
                got: 15
            })
        );
        assert!(matches!(
            GrayImage::new(0, 4, vec![]),
            Err(ImageError::InvalidDimensions { .. })
        ));
        assert_eq!(
            PixelBuffer::new(2, 2, 2, vec![0; 8]),
            Err(ImageError::UnsupportedChannels(2))
        );
    }

    #[test]
    fn rgb_to_gray_uses_luma_weights() {
        let buf = PixelBuffer::new(2, 1, 3, vec![255, 255, 255, 255, 0, 0]).unwrap();
        let gray = buf.to_gray();
        assert_eq!(gray.data[0], 255);
        assert_eq!(gray.data[1], 76);
    }

    #[test]
    fn crop_copies_rows() {
        let img = GrayImage::new(3, 3, (0..9).collect()).unwrap();
        let sub = img
            .crop(PixelRect {
                x: 1,
                y: 1,
                width: 2,
                height: 2,
            })
            .unwrap();
        assert_eq!(sub.data, vec![4, 5, 7, 8]);
        assert!(img
            .crop(PixelRect {
                x: 2,
                y: 0,
                width: 2,
                height: 1
            })
            .is_none());
    }

    #[test]
    fn bilinear_hits_pixels_exactly_at_integer_coords() {
        let img = GrayImage::new(2, 2, vec![0, 100, 200, 50]).unwrap();
        let v = img.view();
        assert_eq!(sample_bilinear_u8(&v, 1.0, 0.0), 100);
        assert_eq!(sample_bilinear_u8(&v, 0.5, 0.0), 50);
        assert_eq!(sample_bilinear_u8(&v, -3.0, 5.0), 200);
    }
}
