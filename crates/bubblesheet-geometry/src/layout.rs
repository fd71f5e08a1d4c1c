use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::resolve::order_clockwise;

/// Where the fiducial markers sit on the printed sheet, in normalized sheet
/// coordinates.
///
/// Anchors may be listed in any order; [`MarkerLayout::ordered_anchors`]
/// returns them clockwise starting from the one closest to the top-left, which
/// is the order detected markers are matched in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerLayout {
    pub anchors: Vec<Point2<f32>>,
}

impl MarkerLayout {
    pub fn new(anchors: Vec<Point2<f32>>) -> Self {
        Self { anchors }
    }

    /// One marker in each sheet corner.
    pub fn four_corners() -> Self {
        Self::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
    }

    /// Top-left, top-right and bottom-left corners; resolves to an affine frame.
    pub fn three_corners() -> Self {
        Self::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ])
    }

    /// Number of markers a detection must provide.
    pub fn required_markers(&self) -> usize {
        self.anchors.len().max(3)
    }

    pub fn ordered_anchors(&self) -> Vec<Point2<f32>> {
        order_clockwise(&self.anchors)
    }
}

impl Default for MarkerLayout {
    fn default() -> Self {
        Self::four_corners()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_are_reordered_clockwise_from_top_left() {
        let layout = MarkerLayout::new(vec![
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 0.0),
        ]);
        assert_eq!(layout.ordered_anchors(), MarkerLayout::four_corners().anchors);
    }

    #[test]
    fn layout_json_is_a_plain_point_list() {
        let json = serde_json::to_string(&MarkerLayout::three_corners()).unwrap();
        let back: MarkerLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MarkerLayout::three_corners());
        assert_eq!(back.required_markers(), 3);
    }
}
