use bubblesheet_core::{distance, homography_from_4pt, ImageSize, NormRect};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{GeometryError, MarkerLayout, SheetGeometry};

/// Sheet outline in image pixels: TL, TR, BR, BL.
///
/// Useful when several frames of the same sheet are captured: corners can be
/// averaged or median-filtered before resolving a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetQuad {
    pub corners: [Point2<f32>; 4],
}

impl SheetQuad {
    pub fn new(corners: [Point2<f32>; 4]) -> Self {
        Self { corners }
    }

    /// Image-space outline of the unit sheet square.
    pub fn from_geometry(geometry: &SheetGeometry) -> Self {
        Self::new(NormRect::UNIT.corners().map(|c| geometry.sheet_to_image(c)))
    }

    pub fn average(quads: &[SheetQuad]) -> Option<SheetQuad> {
        if quads.is_empty() {
            return None;
        }
        let n = quads.len() as f32;
        let mut corners = [Point2::origin(); 4];
        for (k, c) in corners.iter_mut().enumerate() {
            c.x = quads.iter().map(|q| q.corners[k].x).sum::<f32>() / n;
            c.y = quads.iter().map(|q| q.corners[k].y).sum::<f32>() / n;
        }
        Some(SheetQuad::new(corners))
    }

    /// Per-coordinate median; a single outlier frame does not move it.
    pub fn median(quads: &[SheetQuad]) -> Option<SheetQuad> {
        if quads.is_empty() {
            return None;
        }
        let mut corners = [Point2::origin(); 4];
        for (k, c) in corners.iter_mut().enumerate() {
            c.x = median_of(quads.iter().map(|q| q.corners[k].x).collect());
            c.y = median_of(quads.iter().map(|q| q.corners[k].y).collect());
        }
        Some(SheetQuad::new(corners))
    }

    /// Mean over frames of the summed corner distance to the average quad.
    pub fn jitter(quads: &[SheetQuad]) -> Option<f32> {
        let avg = Self::average(quads)?;
        let total: f32 = quads
            .iter()
            .map(|q| {
                q.corners
                    .iter()
                    .zip(avg.corners.iter())
                    .map(|(a, b)| distance(*a, *b))
                    .sum::<f32>()
            })
            .sum();
        Some(total / quads.len() as f32)
    }

    /// Resolve a perspective frame with this outline as the unit square.
    pub fn to_geometry(&self, image_size: ImageSize) -> Result<SheetGeometry, GeometryError> {
        let h_img_from_sheet = homography_from_4pt(&NormRect::UNIT.corners(), &self.corners)
            .ok_or_else(|| GeometryError::degenerate("sheet quad is singular"))?;
        let h_sheet_from_img = h_img_from_sheet
            .inverse()
            .ok_or_else(|| GeometryError::degenerate("sheet quad is not invertible"))?;
        Ok(SheetGeometry {
            markers: Vec::new(),
            layout: MarkerLayout::four_corners(),
            h_img_from_sheet,
            h_sheet_from_img,
            image_size,
        })
    }
}

fn median_of(mut values: Vec<f32>) -> f32 {
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}
