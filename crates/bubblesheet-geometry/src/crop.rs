//! Per-question region extraction.

use bubblesheet_core::{
    distance, warp_perspective_gray, GrayImage, GrayImageView, Homography, ImageSize, NormRect,
    PixelRect,
};
use nalgebra::{Matrix3, Point2};
use serde::{Serialize, Serializer};

use crate::{GeometryError, SheetGeometry};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Cropped image of one question.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuestionRegion {
    /// Index of the question in the caller's list.
    pub index: usize,
    /// Serialized as its dimensions only.
    #[serde(rename = "size", serialize_with = "image_dims")]
    pub image: GrayImage,
    /// Box in normalized sheet coordinates.
    pub bbox: NormRect,
    /// Box corners (TL, TR, BR, BL) in source-image pixels.
    pub quad: [Point2<f32>; 4],
}

fn image_dims<S: Serializer>(img: &GrayImage, s: S) -> Result<S::Ok, S::Error> {
    img.size().serialize(s)
}

impl QuestionRegion {
    /// Region for a crop supplied by the caller; nothing is validated.
    pub fn from_image(index: usize, image: GrayImage) -> Self {
        let (w, h) = (image.width as f32, image.height as f32);
        Self {
            index,
            image,
            bbox: NormRect::UNIT,
            quad: [
                Point2::new(0.0, 0.0),
                Point2::new(w, 0.0),
                Point2::new(w, h),
                Point2::new(0.0, h),
            ],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        self.image.view()
    }
}

const BOUNDS_TOL: f32 = 0.5;
const AXIS_TOL: f32 = 1e-3;

fn check_inside(corner: Point2<f32>, size: ImageSize) -> Result<(), GeometryError> {
    let ok = corner.x.is_finite()
        && corner.y.is_finite()
        && corner.x >= -BOUNDS_TOL
        && corner.y >= -BOUNDS_TOL
        && corner.x <= size.width as f32 + BOUNDS_TOL
        && corner.y <= size.height as f32 + BOUNDS_TOL;
    if ok {
        Ok(())
    } else {
        Err(GeometryError::RegionOutOfBounds {
            corner,
            width: size.width,
            height: size.height,
        })
    }
}

/// Integer pixel rectangle when the quad is axis aligned on pixel edges.
fn pixel_aligned_rect(quad: &[Point2<f32>; 4], size: ImageSize) -> Option<PixelRect> {
    let [tl, tr, br, bl] = *quad;
    let near_int = |v: f32| (v - v.round()).abs() <= AXIS_TOL;
    let aligned = (tl.y - tr.y).abs() <= AXIS_TOL
        && (bl.y - br.y).abs() <= AXIS_TOL
        && (tl.x - bl.x).abs() <= AXIS_TOL
        && (tr.x - br.x).abs() <= AXIS_TOL
        && [tl.x, tl.y, br.x, br.y].into_iter().all(near_int);
    if !aligned {
        return None;
    }
    let x0 = tl.x.round().max(0.0) as usize;
    let y0 = tl.y.round().max(0.0) as usize;
    let x1 = (br.x.round().max(0.0) as usize).min(size.width);
    let y1 = (br.y.round().max(0.0) as usize).min(size.height);
    (x1 > x0 && y1 > y0).then(|| PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Crop the image area covered by a normalized sheet box.
///
/// The output size follows the longer of each pair of opposite mapped edges.
/// Axis-aligned boxes on whole pixels are copied; anything else is
/// resampled bilinearly.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, geometry), fields(index = index))
)]
pub fn crop_region(
    src: &GrayImageView<'_>,
    geometry: &SheetGeometry,
    index: usize,
    bbox: &NormRect,
) -> Result<QuestionRegion, GeometryError> {
    let size = src.size();
    let quad = bbox.corners().map(|c| geometry.sheet_to_image(c));
    for corner in quad {
        check_inside(corner, size)?;
    }

    if let Some(rect) = pixel_aligned_rect(&quad, size) {
        if let Some(image) = src.crop(rect) {
            return Ok(QuestionRegion {
                index,
                image,
                bbox: *bbox,
                quad,
            });
        }
    }

    let [tl, tr, br, bl] = quad;
    let out_w = distance(tl, tr).max(distance(bl, br)).round().max(1.0) as usize;
    let out_h = distance(tl, bl).max(distance(tr, br)).round().max(1.0) as usize;

    let sheet_from_out = Homography::new(Matrix3::new(
        bbox.width as f64 / out_w as f64,
        0.0,
        bbox.x as f64,
        0.0,
        bbox.height as f64 / out_h as f64,
        bbox.y as f64,
        0.0,
        0.0,
        1.0,
    ));
    let h_src_from_out = geometry.h_img_from_sheet.compose(&sheet_from_out);
    let image = warp_perspective_gray(src, h_src_from_out, out_w, out_h);

    Ok(QuestionRegion {
        index,
        image,
        bbox: *bbox,
        quad,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubblesheet_core::draw::fill_rect;

    fn gradient(w: usize, h: usize) -> GrayImage {
        let data = (0..w * h).map(|i| ((i % w) * 7 + (i / w) * 3) as u8).collect();
        GrayImage::new(w, h, data).unwrap()
    }

    #[test]
    fn full_box_under_identity_is_pixel_identical() {
        let img = gradient(120, 80);
        let geom = SheetGeometry::identity(120, 80);
        let region = crop_region(&img.view(), &geom, 0, &NormRect::UNIT).unwrap();
        assert_eq!(region.image, img);
    }

    #[test]
    fn aligned_sub_box_is_copied() {
        let img = gradient(100, 100);
        let geom = SheetGeometry::identity(100, 100);
        let bbox = NormRect::new(0.2, 0.3, 0.5, 0.4);
        let region = crop_region(&img.view(), &geom, 3, &bbox).unwrap();
        let expected = img
            .crop(PixelRect {
                x: 20,
                y: 30,
                width: 50,
                height: 40,
            })
            .unwrap();
        assert_eq!(region.index, 3);
        assert_eq!(region.image, expected);
    }

    #[test]
    fn scaled_frame_resamples_to_mapped_size() {
        let mut img = GrayImage::filled(200, 200, 255);
        fill_rect(&mut img, 50.0, 50.0, 100.0, 100.0, 0);
        let mut geom = SheetGeometry::identity(200, 200);
        // sheet occupies the centre square at a non-integer offset
        geom.h_img_from_sheet = Homography::new(Matrix3::new(
            100.0, 0.0, 50.25, 0.0, 100.0, 50.25, 0.0, 0.0, 1.0,
        ));
        geom.h_sheet_from_img = geom.h_img_from_sheet.inverse().unwrap();
        let region = crop_region(&img.view(), &geom, 0, &NormRect::new(0.1, 0.1, 0.8, 0.8)).unwrap();
        assert_eq!((region.image.width, region.image.height), (80, 80));
        let mean = region.image.data.iter().map(|&v| v as f32).sum::<f32>()
            / region.image.data.len() as f32;
        assert!(mean < 5.0, "mean {mean}");
    }

    #[test]
    fn box_outside_image_is_rejected() {
        let img = gradient(50, 50);
        let mut geom = SheetGeometry::identity(50, 50);
        geom.h_img_from_sheet = Homography::scale(80.0, 80.0);
        let err = crop_region(&img.view(), &geom, 1, &NormRect::new(0.5, 0.5, 0.5, 0.5))
            .unwrap_err();
        assert!(matches!(err, GeometryError::RegionOutOfBounds { width: 50, .. }));
    }

    #[test]
    fn supplied_crop_keeps_its_pixels() {
        let img = gradient(10, 6);
        let region = QuestionRegion::from_image(4, img.clone());
        assert_eq!(region.image, img);
        assert_eq!(region.bbox, NormRect::UNIT);
        let json = serde_json::to_value(&region).unwrap();
        assert_eq!(json["size"]["width"], 10);
    }
}
