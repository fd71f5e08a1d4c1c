use bubblesheet_core::ImageError;
use bubblesheet_geometry::GeometryError;
use bubblesheet_markers::MarkerDetectError;

/// Whole-invocation failures. These abort before any question is cropped.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("found {found} markers, at least {required} required")]
    InsufficientMarkers { found: usize, required: usize },

    #[error("degenerate sheet geometry: {reason}")]
    DegenerateGeometry { reason: String },

    #[error("the requested stages need a sheet image, but pre-cropped regions were supplied")]
    NoSheetImage,

    #[error(transparent)]
    Image(#[from] ImageError),
}

impl From<MarkerDetectError> for PipelineError {
    fn from(err: MarkerDetectError) -> Self {
        match err {
            MarkerDetectError::InsufficientMarkers { found, required } => {
                Self::InsufficientMarkers { found, required }
            }
        }
    }
}

impl From<GeometryError> for PipelineError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::InsufficientMarkers { found, required } => {
                Self::InsufficientMarkers { found, required }
            }
            GeometryError::DegenerateGeometry { reason } => Self::DegenerateGeometry { reason },
            other @ GeometryError::RegionOutOfBounds { .. } => Self::DegenerateGeometry {
                reason: other.to_string(),
            },
        }
    }
}

/// Reading or writing a JSON template/config file.
#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
