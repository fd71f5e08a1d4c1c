use bubblesheet_core::{adaptive_threshold_dark, distance, GrayImageView};
use imageproc::contours::{find_contours, BorderType, Contour};
use nalgebra::Point2;

use crate::circle_fit::measure_contour;
use crate::types::{Marker, MarkerDetectParams, RadiusRange};
use crate::MarkerDetectError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Single-pass stream of marker candidates over one image.
///
/// Binarization and contour tracing happen up front; shape scoring and
/// filtering run lazily as the iterator is advanced. Candidates are *not*
/// deduplicated; see [`dedup_markers`].
pub struct MarkerCandidates {
    contours: std::vec::IntoIter<Contour<i32>>,
    radius_range: RadiusRange,
    min_circularity: f32,
    min_enclosing_fill: f32,
    min_contour_points: usize,
}

impl MarkerCandidates {
    pub fn new(image: &GrayImageView<'_>, params: &MarkerDetectParams) -> Self {
        let block_radius = params.resolved_block_radius(image.width, image.height);
        let binary = adaptive_threshold_dark(image, block_radius, params.threshold_offset);
        let contours = ::image::GrayImage::from_raw(
            binary.width as u32,
            binary.height as u32,
            binary.data,
        )
        .map(|bin| find_contours::<i32>(&bin))
        .unwrap_or_default();

        log::debug!(
            "marker scan: {}x{} block_radius={} contours={}",
            image.width,
            image.height,
            block_radius,
            contours.len()
        );

        Self {
            contours: contours.into_iter(),
            radius_range: params.resolved_radius_range(image.width, image.height),
            min_circularity: params.min_circularity,
            min_enclosing_fill: params.min_enclosing_fill,
            min_contour_points: params.min_contour_points.max(3),
        }
    }

    fn score(&self, contour: &Contour<i32>) -> Option<Marker> {
        if contour.border_type != BorderType::Outer || contour.points.len() < self.min_contour_points
        {
            return None;
        }
        let pts: Vec<Point2<f32>> = contour
            .points
            .iter()
            .map(|p| Point2::new(p.x as f32, p.y as f32))
            .collect();
        let shape = measure_contour(&pts)?;
        // contour points are pixel indices; the blob extends half a pixel past them
        let radius = shape.enclosing.radius + 0.5;
        if !self.radius_range.contains(radius)
            || shape.circularity < self.min_circularity
            || shape.enclosing_fill() < self.min_enclosing_fill
        {
            return None;
        }
        Some(Marker {
            center: Point2::new(shape.enclosing.center.x + 0.5, shape.enclosing.center.y + 0.5),
            radius,
            circularity: shape.circularity,
            area: shape.area as f32,
        })
    }
}

impl Iterator for MarkerCandidates {
    type Item = Marker;

    fn next(&mut self) -> Option<Marker> {
        loop {
            let contour = self.contours.next()?;
            if let Some(marker) = self.score(&contour) {
                return Some(marker);
            }
        }
    }
}

impl std::iter::FusedIterator for MarkerCandidates {}

/// Keep the highest-scoring candidate among overlapping ones.
///
/// Ties are broken by position so the result never depends on input order.
pub fn dedup_markers(mut markers: Vec<Marker>, distance_tol: Option<f32>) -> Vec<Marker> {
    markers.sort_by(|a, b| {
        b.circularity
            .total_cmp(&a.circularity)
            .then(b.area.total_cmp(&a.area))
            .then(a.center.x.total_cmp(&b.center.x))
            .then(a.center.y.total_cmp(&b.center.y))
    });

    let mut kept: Vec<Marker> = Vec::with_capacity(markers.len());
    for m in markers {
        let duplicate = kept.iter().any(|k| {
            let tol = distance_tol.unwrap_or_else(|| k.radius.max(m.radius));
            distance(k.center, m.center) < tol
        });
        if !duplicate {
            kept.push(m);
        }
    }
    kept
}

/// Detect, deduplicate and rank circular markers.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, params), fields(width = image.width, height = image.height))
)]
pub fn detect_markers(image: &GrayImageView<'_>, params: &MarkerDetectParams) -> Vec<Marker> {
    let candidates: Vec<Marker> = MarkerCandidates::new(image, params).collect();
    let raw = candidates.len();
    let mut markers = dedup_markers(candidates, params.dedup_distance);
    if params.max_markers > 0 {
        markers.truncate(params.max_markers);
    }
    log::debug!("marker scan: {raw} candidates, {} accepted", markers.len());
    markers
}

/// Fail with [`MarkerDetectError::InsufficientMarkers`] when fewer than `required` were found.
pub fn require_markers(markers: &[Marker], required: usize) -> Result<(), MarkerDetectError> {
    if markers.len() < required {
        log::warn!(
            "found {} markers, {} required",
            markers.len(),
            required
        );
        return Err(MarkerDetectError::InsufficientMarkers {
            found: markers.len(),
            required,
        });
    }
    Ok(())
}

/// [`detect_markers`] followed by [`require_markers`].
pub fn detect_at_least(
    image: &GrayImageView<'_>,
    params: &MarkerDetectParams,
    required: usize,
) -> Result<Vec<Marker>, MarkerDetectError> {
    let markers = detect_markers(image, params);
    require_markers(&markers, required)?;
    Ok(markers)
}
