//! Question templates and answer classification.
//!
//! A [`TemplateQuestion`] is validated into a [`QuestionPlan`] before any
//! pixel is touched; the [`Classifier`] then turns a cropped
//! [`QuestionRegion`](bubblesheet_geometry::QuestionRegion) into an
//! [`AnswerResult`]:
//!
//! - `single`: one selected option, `none`, or `ambiguous` with candidates,
//! - `multiple`: the sorted set of marked options,
//! - `text` / `info`: passed through, optionally read by a [`TextRecognizer`].

mod classify;
mod error;
mod fill;
mod question;
mod recognizer;

pub use classify::{Answer, AnswerResult, Classifier, ClassifyParams, SingleChoice};
pub use error::QuestionError;
pub use fill::{fill_ratio, region_threshold};
pub use question::{OptionLayout, OptionSet, QuestionPlan, QuestionSpec, TemplateQuestion};
pub use recognizer::{field_rows, normalize_whitespace, RecognizeError, TextRecognizer};
