use bubblesheet_core::{
    affine_from_3pt, estimate_homography, homography_from_4pt, signed_polygon_area, Homography,
    ImageSize,
};
use bubblesheet_markers::{convex_hull, Marker};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{GeometryError, MarkerLayout, SheetGeometry};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Geometry resolver settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveParams {
    /// Every consecutive corner triangle must span at least this fraction of
    /// the squared marker spread.
    pub min_area_ratio: f32,
    /// Upper bound on the hull vertices searched when there are more markers
    /// than anchors.
    pub max_candidates: usize,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.02,
            max_candidates: 16,
        }
    }
}

/// Order points clockwise (image coordinates, y down) around their centroid,
/// starting from the point with the smallest `x + y`.
pub fn order_clockwise(points: &[Point2<f32>]) -> Vec<Point2<f32>> {
    if points.is_empty() {
        return Vec::new();
    }
    let n = points.len() as f32;
    let cx = points.iter().map(|p| p.x).sum::<f32>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f32>() / n;

    let mut keyed: Vec<(f32, Point2<f32>)> = points
        .iter()
        .map(|p| ((p.y - cy).atan2(p.x - cx), *p))
        .collect();
    keyed.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.x.total_cmp(&b.1.x))
            .then(a.1.y.total_cmp(&b.1.y))
    });

    let start = keyed
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (a.1.x + a.1.y).total_cmp(&(b.1.x + b.1.y)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    keyed.rotate_left(start);
    keyed.into_iter().map(|(_, p)| p).collect()
}

fn for_each_combination(n: usize, k: usize, mut f: impl FnMut(&[usize])) {
    if k == 0 || k > n {
        return;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        f(&idx);
        let mut i = k;
        while i > 0 && idx[i - 1] == n - k + i - 1 {
            i -= 1;
        }
        if i == 0 {
            return;
        }
        idx[i - 1] += 1;
        for j in i..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Pick `k` markers spanning the largest convex polygon, ordered clockwise.
///
/// The largest polygon has its corners on the convex hull, so only hull
/// vertices are searched, and at most `max_candidates` of them (the ones
/// farthest from the centroid). Candidates are sorted by position first so the
/// choice never depends on the order the detector produced them in.
pub fn select_outer_markers(markers: &[Marker], k: usize, max_candidates: usize) -> Vec<Marker> {
    let mut sorted = markers.to_vec();
    sorted.sort_by(|a, b| {
        a.center
            .x
            .total_cmp(&b.center.x)
            .then(a.center.y.total_cmp(&b.center.y))
    });
    if sorted.len() <= k {
        return order_markers(&sorted);
    }

    let centers: Vec<Point2<f32>> = sorted.iter().map(|m| m.center).collect();
    let mut hull = convex_hull(&centers);
    let cap = max_candidates.max(k);
    if hull.len() > cap {
        let n = hull.len() as f32;
        let cx = hull.iter().map(|p| p.x).sum::<f32>() / n;
        let cy = hull.iter().map(|p| p.y).sum::<f32>() / n;
        let d2 = |p: &Point2<f32>| (p.x - cx).powi(2) + (p.y - cy).powi(2);
        let mut rank: Vec<usize> = (0..hull.len()).collect();
        rank.sort_by(|&a, &b| d2(&hull[b]).total_cmp(&d2(&hull[a])).then(a.cmp(&b)));
        rank.truncate(cap);
        rank.sort_unstable();
        hull = rank.into_iter().map(|i| hull[i]).collect();
        log::debug!("marker hull capped at {cap} of {} vertices", n);
    }
    if hull.len() < k {
        return Vec::new();
    }

    // hull order keeps every subset convex and ordered, so no per-subset sort
    let mut pts: Vec<Point2<f32>> = Vec::with_capacity(k);
    let mut best_idx: Vec<usize> = Vec::with_capacity(k);
    let mut best_area = f64::NEG_INFINITY;
    for_each_combination(hull.len(), k, |idx| {
        pts.clear();
        pts.extend(idx.iter().map(|&i| hull[i]));
        let area = signed_polygon_area(&pts).abs();
        if area > best_area {
            best_area = area;
            best_idx.clear();
            best_idx.extend_from_slice(idx);
        }
    });

    let chosen: Vec<Marker> = best_idx
        .iter()
        .filter_map(|&i| sorted.iter().find(|m| m.center == hull[i]).copied())
        .collect();
    order_markers(&chosen)
}

fn order_markers(markers: &[Marker]) -> Vec<Marker> {
    let pts: Vec<Point2<f32>> = markers.iter().map(|m| m.center).collect();
    order_clockwise(&pts)
        .into_iter()
        .filter_map(|p| markers.iter().find(|m| m.center == p).copied())
        .collect()
}

fn check_spread(pts: &[Point2<f32>], min_area_ratio: f32) -> Result<(), GeometryError> {
    let mut spread = 0.0_f64;
    for (i, a) in pts.iter().enumerate() {
        for b in &pts[i + 1..] {
            let d2 = ((a.x - b.x) as f64).powi(2) + ((a.y - b.y) as f64).powi(2);
            spread = spread.max(d2);
        }
    }
    if spread <= f64::EPSILON {
        return Err(GeometryError::degenerate("markers coincide"));
    }

    let min_area = min_area_ratio as f64 * spread;
    let n = pts.len();
    for i in 0..n {
        let tri = [pts[(i + n - 1) % n], pts[i], pts[(i + 1) % n]];
        let area = signed_polygon_area(&tri);
        if area < min_area {
            log::debug!("corner {i}: triangle area {area:.2} below {min_area:.2}");
            return Err(GeometryError::degenerate(
                "markers are collinear or do not form a convex polygon",
            ));
        }
    }
    Ok(())
}

fn sheet_transform(
    anchors: &[Point2<f32>],
    image_pts: &[Point2<f32>],
) -> Option<Homography> {
    match (anchors, image_pts) {
        ([a0, a1, a2], [p0, p1, p2]) => affine_from_3pt(&[*a0, *a1, *a2], &[*p0, *p1, *p2]),
        ([a0, a1, a2, a3], [p0, p1, p2, p3]) => {
            homography_from_4pt(&[*a0, *a1, *a2, *a3], &[*p0, *p1, *p2, *p3])
        }
        _ => estimate_homography(anchors, image_pts),
    }
}

/// Match detected markers to the layout anchors and derive the sheet frame.
///
/// Three anchors give an affine frame, four the exact homography and more a
/// least-squares homography. Identical marker sets in any order produce the
/// same result.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(markers, layout, params), fields(markers = markers.len()))
)]
pub fn resolve_geometry(
    markers: &[Marker],
    layout: &MarkerLayout,
    image_size: ImageSize,
    params: &ResolveParams,
) -> Result<SheetGeometry, GeometryError> {
    let anchors = layout.ordered_anchors();
    if anchors.len() < 3 {
        return Err(GeometryError::degenerate(format!(
            "layout has {} anchors, at least 3 required",
            anchors.len()
        )));
    }
    let required = layout.required_markers();
    if markers.len() < required {
        return Err(GeometryError::InsufficientMarkers {
            found: markers.len(),
            required,
        });
    }

    let chosen = select_outer_markers(markers, anchors.len(), params.max_candidates);
    if chosen.len() != anchors.len() {
        return Err(GeometryError::degenerate(
            "markers share a position or do not span a convex polygon",
        ));
    }
    let image_pts: Vec<Point2<f32>> = chosen.iter().map(|m| m.center).collect();
    check_spread(&image_pts, params.min_area_ratio)?;

    let h_img_from_sheet = sheet_transform(&anchors, &image_pts)
        .ok_or_else(|| GeometryError::degenerate("marker transform is singular"))?;
    let h_sheet_from_img = h_img_from_sheet
        .inverse()
        .ok_or_else(|| GeometryError::degenerate("marker transform is not invertible"))?;

    log::debug!(
        "resolved sheet frame from {} of {} markers ({})",
        chosen.len(),
        markers.len(),
        if anchors.len() == 3 { "affine" } else { "perspective" }
    );

    Ok(SheetGeometry {
        markers: chosen,
        layout: MarkerLayout::new(anchors),
        h_img_from_sheet,
        h_sheet_from_img,
        image_size,
    })
}
