use bubblesheet_core::{warp_perspective_gray, GrayImage, GrayImageView, Homography, ImageSize};
use bubblesheet_markers::Marker;
use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

use crate::MarkerLayout;

/// Reference frame of a photographed sheet.
///
/// Normalized sheet coordinates span `[0,1]²`; image coordinates are
/// continuous pixels of the source photo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetGeometry {
    /// Markers matched to the layout anchors, in anchor order.
    pub markers: Vec<Marker>,
    /// Anchors in the order the markers were matched to.
    pub layout: MarkerLayout,
    pub h_img_from_sheet: Homography,
    pub h_sheet_from_img: Homography,
    pub image_size: ImageSize,
}

impl SheetGeometry {
    /// Treat the whole image as the sheet (already rectified input).
    pub fn identity(width: usize, height: usize) -> Self {
        let h_img_from_sheet = Homography::scale(width as f64, height as f64);
        let h_sheet_from_img =
            Homography::scale(1.0 / width.max(1) as f64, 1.0 / height.max(1) as f64);
        Self {
            markers: Vec::new(),
            layout: MarkerLayout::four_corners(),
            h_img_from_sheet,
            h_sheet_from_img,
            image_size: ImageSize { width, height },
        }
    }

    /// True when the frame is affine (resolved from three anchors or identity).
    pub fn is_affine(&self) -> bool {
        self.h_img_from_sheet.is_affine(1e-12)
    }

    #[inline]
    pub fn sheet_to_image(&self, p: Point2<f32>) -> Point2<f32> {
        self.h_img_from_sheet.apply(p)
    }

    #[inline]
    pub fn image_to_sheet(&self, p: Point2<f32>) -> Point2<f32> {
        self.h_sheet_from_img.apply(p)
    }

    /// Perspective-corrected sheet of `width x height` pixels.
    pub fn rectify(&self, src: &GrayImageView<'_>, width: usize, height: usize) -> GrayImage {
        let sheet_from_out = Homography::new(Matrix3::new(
            1.0 / width.max(1) as f64,
            0.0,
            0.0,
            0.0,
            1.0 / height.max(1) as f64,
            0.0,
            0.0,
            0.0,
            1.0,
        ));
        let h = self.h_img_from_sheet.compose(&sheet_from_out);
        warp_perspective_gray(src, h, width, height)
    }
}
