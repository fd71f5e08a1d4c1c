use bubblesheet_core::{otsu_threshold_from_samples, GrayImageView, NormRect};

/// Intensity cut for a whole region: pixels below it are ink.
///
/// A region whose spread is below `min_contrast` holds no mark; the cut is
/// its darkest value so no pixel counts as ink, however dim the exposure.
pub fn region_threshold(region: &GrayImageView<'_>, min_contrast: u8) -> u8 {
    if region.data.is_empty() {
        return 0;
    }
    let (lo, hi) = region
        .data
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi.saturating_sub(lo) < min_contrast {
        return lo;
    }
    otsu_threshold_from_samples(region.data)
}

/// Fraction of ink pixels inside the ellipse inscribed in `cell`, shrunk by
/// `mask_scale`. `cell` is relative to the region.
pub fn fill_ratio(region: &GrayImageView<'_>, cell: &NormRect, cut: u8, mask_scale: f32) -> f32 {
    let w = region.width as f32;
    let h = region.height as f32;
    let cx = (cell.x + 0.5 * cell.width) * w;
    let cy = (cell.y + 0.5 * cell.height) * h;
    let rx = 0.5 * cell.width * w * mask_scale;
    let ry = 0.5 * cell.height * h * mask_scale;
    if rx <= 0.0 || ry <= 0.0 {
        return 0.0;
    }

    let x0 = (cx - rx).floor().max(0.0) as usize;
    let y0 = (cy - ry).floor().max(0.0) as usize;
    let x1 = ((cx + rx).ceil() as usize).min(region.width);
    let y1 = ((cy + ry).ceil() as usize).min(region.height);

    let mut inside = 0usize;
    let mut ink = 0usize;
    for y in y0..y1 {
        let dy = (y as f32 + 0.5 - cy) / ry;
        for x in x0..x1 {
            let dx = (x as f32 + 0.5 - cx) / rx;
            if dx * dx + dy * dy > 1.0 {
                continue;
            }
            inside += 1;
            if region.get(x, y) < cut {
                ink += 1;
            }
        }
    }
    if inside == 0 {
        return 0.0;
    }
    ink as f32 / inside as f32
}
