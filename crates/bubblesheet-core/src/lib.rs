//! Core types and utilities for answer-sheet recognition.
//!
//! This crate is intentionally small: gray image buffers, bilinear sampling,
//! homographies, thresholding and a couple of polygon helpers. It does *not*
//! depend on any image codec.

pub mod draw;
mod geom;
mod homography;
mod image;
mod logger;
mod threshold;

pub use geom::{closed_perimeter, distance, polygon_area, signed_polygon_area, NormRect};
pub use homography::{
    affine_from_3pt, estimate_homography, homography_from_4pt, warp_perspective_gray, Homography,
};
pub use image::{
    sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, ImageError, ImageSize,
    PixelBuffer, PixelRect, LUMA_WEIGHTS,
};
pub use threshold::{adaptive_threshold_dark, otsu_threshold_from_samples, IntegralImage};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, parse_level, LOG_ENV};

pub use nalgebra::Point2;
