use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MarkerDetectError {
    #[error("found {found} markers, at least {required} required")]
    InsufficientMarkers { found: usize, required: usize },
}
