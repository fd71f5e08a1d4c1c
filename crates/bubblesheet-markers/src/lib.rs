//! Circular fiducial marker detection.
//!
//! The detector binarizes the sheet photo with a local-mean threshold, traces
//! outer contours and keeps those whose shape is close to a filled disc:
//!
//! 1. circularity `4·π·A / P²` above [`MarkerDetectParams::min_circularity`],
//! 2. minimum-enclosing-circle radius inside the configured range,
//! 3. contour area covering most of the enclosing circle.
//!
//! Overlapping candidates are merged by [`dedup_markers`].
//!
//! ```no_run
//! use bubblesheet_core::GrayImage;
//! use bubblesheet_markers::{detect_markers, MarkerDetectParams};
//!
//! let img = GrayImage::filled(640, 480, 255);
//! let markers = detect_markers(&img.view(), &MarkerDetectParams::default());
//! println!("{} markers", markers.len());
//! ```

mod circle_fit;
mod detect;
mod error;
mod types;

pub use circle_fit::{circularity, convex_hull, measure_contour, min_enclosing_circle, Circle, ContourShape};
pub use detect::{dedup_markers, detect_at_least, detect_markers, require_markers, MarkerCandidates};
pub use error::MarkerDetectError;
pub use types::{Marker, MarkerDetectParams, RadiusRange};
