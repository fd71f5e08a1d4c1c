//! Optical mark recognition for photographed answer sheets.
//!
//! The pipeline runs in stages:
//!
//! 1. find the circular fiducial markers printed on the sheet,
//! 2. resolve the sheet frame from them and crop each question box,
//! 3. classify filled bubbles; text and info regions are passed through
//!    (optionally to a caller-supplied [`TextRecognizer`](answers::TextRecognizer)).
//!
//! All stages go through [`Pipeline::run`]; [`Stages`] selects how far to go.
//!
//! ## Quickstart
//!
//! ```no_run
//! use bubblesheet::{Pipeline, PipelineConfig, ScanContext, SheetTemplate, Stages};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = SheetTemplate::load_json("template.json")?;
//! let pipeline = Pipeline::new(template, PipelineConfig::default());
//!
//! let img = image::open("sheet.jpg")?;
//! let gray = bubblesheet::detect::gray_from_dynamic(&img)?;
//! let mut ctx = ScanContext::sheet(&gray);
//! let result = pipeline.run(&mut ctx, Stages::Parse)?;
//! println!("{}", result.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `bubblesheet::core`: gray images, homographies, thresholding, logging.
//! - `bubblesheet::markers`: fiducial circle detection.
//! - `bubblesheet::geometry`: sheet frame resolution and region cropping.
//! - `bubblesheet::answers`: question templates and bubble classification.
//! - `bubblesheet::detect` (feature `image`): adapters from `image` types.

pub use bubblesheet_answers as answers;
pub use bubblesheet_core as core;
pub use bubblesheet_geometry as geometry;
pub use bubblesheet_markers as markers;

mod config;
mod error;
mod pipeline;
mod result;

#[cfg(feature = "image")]
pub mod detect;

pub use config::{PipelineConfig, SheetTemplate};
pub use error::{ConfigIoError, PipelineError};
pub use pipeline::{Pipeline, PipelineInput, ScanContext, Stages};
pub use result::{PipelineResult, RESULT_FORMAT_VERSION};

pub use bubblesheet_answers::{
    Answer, AnswerResult, OptionLayout, OptionSet, QuestionError, QuestionSpec, SingleChoice,
    TemplateQuestion,
};
pub use bubblesheet_core::{GrayImage, NormRect};
pub use bubblesheet_geometry::{MarkerLayout, QuestionRegion, SheetGeometry};
pub use bubblesheet_markers::Marker;

/// Install a `tracing` subscriber and route `log` records into it.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let _ = tracing_log::LogTracer::init();
    bubblesheet_core::init_tracing(json);
}
