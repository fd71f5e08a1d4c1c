use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Detected fiducial circle.
///
/// `center` is in continuous source-image pixel coordinates (pixel `(x, y)`
/// has its center at `(x + 0.5, y + 0.5)`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub center: Point2<f32>,
    /// Radius of the minimum enclosing circle, in pixels.
    pub radius: f32,
    /// `4·π·area / perimeter²`, clamped to `[0, 1]`.
    pub circularity: f32,
    /// Contour polygon area in pixels².
    pub area: f32,
}

/// Inclusive radius bounds in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiusRange {
    pub min: f32,
    pub max: f32,
}

impl RadiusRange {
    /// Default bounds relative to the shorter image side.
    pub fn for_image(width: usize, height: usize) -> Self {
        let short = width.min(height) as f32;
        Self {
            min: (0.004 * short).max(3.0),
            max: (0.08 * short).max(6.0),
        }
    }

    #[inline]
    pub fn contains(&self, r: f32) -> bool {
        r >= self.min && r <= self.max
    }
}

/// Shape detector settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerDetectParams {
    /// Local-mean window radius for binarization; `None` derives it from the image size.
    pub block_radius: Option<usize>,
    /// How much darker than the local mean a pixel must be to count as ink.
    pub threshold_offset: f32,
    /// Minimum circularity score to accept a candidate.
    pub min_circularity: f32,
    /// Minimum ratio between contour area and enclosing-circle area.
    pub min_enclosing_fill: f32,
    /// Accepted radius range; `None` derives it from the image size.
    pub radius_range: Option<RadiusRange>,
    /// Contours with fewer points are skipped.
    pub min_contour_points: usize,
    /// Candidates closer than this are duplicates; `None` uses the larger radius of the pair.
    pub dedup_distance: Option<f32>,
    /// Keep at most this many markers (best score first); `0` keeps all.
    pub max_markers: usize,
}

impl Default for MarkerDetectParams {
    fn default() -> Self {
        Self {
            block_radius: None,
            threshold_offset: 12.0,
            min_circularity: 0.8,
            min_enclosing_fill: 0.75,
            radius_range: None,
            min_contour_points: 8,
            dedup_distance: None,
            max_markers: 16,
        }
    }
}

impl MarkerDetectParams {
    pub fn resolved_block_radius(&self, width: usize, height: usize) -> usize {
        self.block_radius
            .unwrap_or_else(|| (width.min(height) / 16).max(7))
    }

    pub fn resolved_radius_range(&self, width: usize, height: usize) -> RadiusRange {
        self.radius_range
            .unwrap_or_else(|| RadiusRange::for_image(width, height))
    }
}
