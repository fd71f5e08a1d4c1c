use bubblesheet_answers::{AnswerResult, QuestionError};
use bubblesheet_core::GrayImage;
use bubblesheet_geometry::{QuestionRegion, SheetGeometry};
use bubblesheet_markers::Marker;
use serde::{Serialize, Serializer};

use crate::SheetTemplate;

/// Bumped whenever the serialized shape of [`PipelineResult`] changes.
pub const RESULT_FORMAT_VERSION: u32 = 1;

/// Everything one pipeline run produced.
///
/// `regions` and `answers` are index-aligned with the template questions;
/// a failed question keeps its slot as an error entry. `answers` is empty
/// unless parsing was requested.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineResult {
    pub version: u32,
    pub markers: Vec<Marker>,
    pub geometry: Option<SheetGeometry>,
    /// Rectified sheet; serialized as its dimensions only.
    #[serde(serialize_with = "image_dims")]
    pub corrected: Option<GrayImage>,
    pub regions: Vec<Option<QuestionRegion>>,
    pub answers: Vec<Result<AnswerResult, QuestionError>>,
}

fn image_dims<S: Serializer>(img: &Option<GrayImage>, s: S) -> Result<S::Ok, S::Error> {
    img.as_ref().map(|i| i.size()).serialize(s)
}

impl PipelineResult {
    pub(crate) fn empty() -> Self {
        Self {
            version: RESULT_FORMAT_VERSION,
            markers: Vec::new(),
            geometry: None,
            corrected: None,
            regions: Vec::new(),
            answers: Vec::new(),
        }
    }

    /// Marked option indices per question; empty for errors and text questions.
    pub fn selected_indices(&self) -> Vec<Vec<usize>> {
        self.answers
            .iter()
            .map(|a| a.as_ref().map(|r| r.selected_indices()).unwrap_or_default())
            .collect()
    }

    /// Failed questions with their index.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &QuestionError)> {
        self.answers
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.as_ref().err().map(|e| (i, e)))
    }

    /// True when answers were produced and none of them failed.
    pub fn is_complete(&self) -> bool {
        !self.answers.is_empty() && self.answers.iter().all(Result::is_ok)
    }

    /// Rendered answer strings (labels or recognized text), one per question.
    pub fn display(&self, template: &SheetTemplate) -> Vec<String> {
        self.answers
            .iter()
            .zip(template.specs())
            .map(|(a, spec)| a.as_ref().map(|r| r.display(spec)).unwrap_or_default())
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
