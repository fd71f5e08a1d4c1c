use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure confined to a single question; the rest of the batch still runs.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum QuestionError {
    #[error("invalid question spec: {reason}")]
    InvalidQuestionSpec { reason: String },

    #[error("question region out of bounds: {reason}")]
    RegionOutOfBounds { reason: String },

    #[error("no region supplied for this question")]
    MissingRegion,
}

impl QuestionError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidQuestionSpec {
            reason: reason.into(),
        }
    }
}

impl From<bubblesheet_geometry::GeometryError> for QuestionError {
    fn from(err: bubblesheet_geometry::GeometryError) -> Self {
        Self::RegionOutOfBounds {
            reason: err.to_string(),
        }
    }
}
