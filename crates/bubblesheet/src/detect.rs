//! Adapters from the `image` crate and one-call scanning helpers.

use bubblesheet_core::{GrayImage, GrayImageView, ImageError, PixelBuffer};

use crate::{Pipeline, PipelineError, PipelineResult, ScanContext, Stages};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Borrow an `image::GrayImage` as a core view.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Copy an 8-bit gray buffer into a core image, validating its length.
pub fn gray_image_from_slice(width: u32, height: u32, data: &[u8]) -> Result<GrayImage, ImageError> {
    GrayImage::new(width as usize, height as usize, data.to_vec())
}

/// Convert any decoded image to gray with the sheet luma weights.
pub fn gray_from_dynamic(img: &::image::DynamicImage) -> Result<GrayImage, ImageError> {
    let (width, height, channels, data) = match img {
        ::image::DynamicImage::ImageLuma8(gray) => {
            return gray_image_from_slice(gray.width(), gray.height(), gray.as_raw());
        }
        ::image::DynamicImage::ImageRgba8(rgba) => (rgba.width(), rgba.height(), 4, rgba.as_raw().clone()),
        other => {
            let rgb = other.to_rgb8();
            (rgb.width(), rgb.height(), 3, rgb.into_raw())
        }
    };
    let buffer = PixelBuffer::new(width as usize, height as usize, channels, data)?;
    Ok(buffer.to_gray())
}

/// Detect, crop and parse one decoded photo.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(pipeline, img), fields(width = img.width(), height = img.height()))
)]
pub fn scan_image(
    pipeline: &Pipeline,
    img: &::image::DynamicImage,
) -> Result<PipelineResult, PipelineError> {
    let gray = gray_from_dynamic(img)?;
    let mut ctx = ScanContext::sheet(&gray);
    pipeline.run(&mut ctx, Stages::Parse)
}
