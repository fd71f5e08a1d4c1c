use nalgebra::Point2;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("found {found} markers, at least {required} required")]
    InsufficientMarkers { found: usize, required: usize },

    #[error("degenerate marker geometry: {reason}")]
    DegenerateGeometry { reason: String },

    #[error(
        "region corner ({:.1}, {:.1}) falls outside the {width}x{height} image",
        .corner.x,
        .corner.y
    )]
    RegionOutOfBounds {
        corner: Point2<f32>,
        width: usize,
        height: usize,
    },
}

impl GeometryError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }
}
