use std::sync::Arc;

use bubblesheet_core::{GrayImageView, PixelRect};
use bubblesheet_geometry::QuestionRegion;
use serde::{Deserialize, Serialize};

use crate::fill::{fill_ratio, region_threshold};
use crate::recognizer::{field_rows, recognize_region, TextRecognizer};
use crate::{QuestionPlan, QuestionSpec};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Bubble classification settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyParams {
    /// A cell is marked when its fill ratio reaches this value.
    pub fill_threshold: f32,
    /// A single-choice mark must beat the runner-up by this much.
    pub ambiguity_margin: f32,
    /// Sampling ellipse size relative to the cell.
    pub mask_scale: f32,
    /// Below this `max - min` spread the region is treated as unmarked.
    pub min_contrast: u8,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            fill_threshold: 0.45,
            ambiguity_margin: 0.15,
            mask_scale: 0.8,
            min_contrast: 40,
        }
    }
}

/// Outcome of a single-choice question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SingleChoice {
    Selected { index: usize },
    None,
    /// Reported, never silently resolved.
    Ambiguous { candidates: Vec<usize> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    Single(SingleChoice),
    Multiple {
        selected: Vec<usize>,
    },
    /// Text and info questions: the region is handed on untouched.
    Unclassified {
        region: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        field_rows: Vec<PixelRect>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: Answer,
    /// Per-option fill ratios, in option order; empty for text/info.
    pub fills: Vec<f32>,
    /// How clear-cut the decision was, in `[0, 1]`.
    pub confidence: f32,
}

impl AnswerResult {
    pub fn selected(&self) -> Option<usize> {
        match self.answer {
            Answer::Single(SingleChoice::Selected { index }) => Some(index),
            _ => None,
        }
    }

    /// Marked option indices for either choice type.
    pub fn selected_indices(&self) -> Vec<usize> {
        match &self.answer {
            Answer::Single(SingleChoice::Selected { index }) => vec![*index],
            Answer::Multiple { selected } => selected.clone(),
            _ => Vec::new(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.answer, Answer::Single(SingleChoice::Ambiguous { .. }))
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self.answer, Answer::Unclassified { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.answer {
            Answer::Unclassified { text, .. } => text.as_deref(),
            _ => None,
        }
    }

    /// Human-readable answer: option labels (1-based numbers for counted
    /// options) joined with `,`, or the recognized text.
    pub fn display(&self, spec: &QuestionSpec) -> String {
        let labels = |indices: &[usize]| -> String {
            match spec.options() {
                Some(options) => indices
                    .iter()
                    .map(|&i| options.label(i))
                    .collect::<Vec<_>>()
                    .join(","),
                None => String::new(),
            }
        };
        match &self.answer {
            Answer::Single(SingleChoice::Selected { index }) => labels(&[*index]),
            Answer::Single(SingleChoice::None) => String::new(),
            Answer::Single(SingleChoice::Ambiguous { candidates }) => labels(candidates),
            Answer::Multiple { selected } => labels(selected),
            Answer::Unclassified { text, .. } => text.clone().unwrap_or_default(),
        }
    }
}

/// Classifies cropped question regions.
#[derive(Clone, Default)]
pub struct Classifier {
    params: ClassifyParams,
    recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("params", &self.params)
            .field("recognizer", &self.recognizer.is_some())
            .finish()
    }
}

impl Classifier {
    pub fn new(params: ClassifyParams) -> Self {
        Self {
            params,
            recognizer: None,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn params(&self) -> &ClassifyParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, plan, region), fields(index = region.index))
    )]
    pub fn classify(&self, plan: &QuestionPlan, region: &QuestionRegion) -> AnswerResult {
        let view = region.view();
        match &plan.spec {
            QuestionSpec::Single { .. } => {
                let fills = self.cell_fills(&view, plan);
                let (answer, confidence) = decide_single(&fills, &self.params);
                AnswerResult {
                    answer: Answer::Single(answer),
                    fills,
                    confidence,
                }
            }
            QuestionSpec::Multiple { .. } => {
                let fills = self.cell_fills(&view, plan);
                let (selected, confidence) = decide_multiple(&fills, &self.params);
                AnswerResult {
                    answer: Answer::Multiple { selected },
                    fills,
                    confidence,
                }
            }
            QuestionSpec::Text => self.unclassified(&view, region.index, Vec::new()),
            QuestionSpec::Info { fields } => {
                let rows = if fields.is_empty() {
                    Vec::new()
                } else {
                    field_rows(view.width, view.height, fields.len())
                };
                self.unclassified(&view, region.index, rows)
            }
        }
    }

    fn cell_fills(&self, view: &GrayImageView<'_>, plan: &QuestionPlan) -> Vec<f32> {
        let cut = region_threshold(view, self.params.min_contrast);
        plan.cells
            .iter()
            .map(|cell| fill_ratio(view, cell, cut, self.params.mask_scale))
            .collect()
    }

    fn unclassified(
        &self,
        view: &GrayImageView<'_>,
        index: usize,
        field_rows: Vec<PixelRect>,
    ) -> AnswerResult {
        let text = self
            .recognizer
            .as_deref()
            .and_then(|r| recognize_region(r, view, &field_rows, index));
        AnswerResult {
            answer: Answer::Unclassified {
                region: index,
                field_rows,
                text,
            },
            fills: Vec::new(),
            confidence: 0.0,
        }
    }
}

fn decide_single(fills: &[f32], params: &ClassifyParams) -> (SingleChoice, f32) {
    let marked: Vec<usize> = (0..fills.len())
        .filter(|&i| fills[i] >= params.fill_threshold)
        .collect();
    if marked.len() > 1 {
        return (SingleChoice::Ambiguous { candidates: marked }, 0.0);
    }
    let Some(&only) = marked.first() else {
        let max = fills.iter().copied().fold(0.0_f32, f32::max);
        let confidence = if params.fill_threshold > 0.0 {
            (1.0 - max / params.fill_threshold).clamp(0.0, 1.0)
        } else {
            0.0
        };
        return (SingleChoice::None, confidence);
    };

    let runner = fills
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != only)
        .map(|(_, &f)| f)
        .fold(0.0_f32, f32::max);
    let margin = fills[only] - runner;
    if margin >= params.ambiguity_margin {
        return (
            SingleChoice::Selected { index: only },
            margin.clamp(0.0, 1.0),
        );
    }

    // a lone mark too close to the runner-up is reported together with it
    let runner_idx = (0..fills.len())
        .filter(|&i| i != only)
        .max_by(|&a, &b| fills[a].total_cmp(&fills[b]).then(b.cmp(&a)));
    let mut candidates = vec![only];
    candidates.extend(runner_idx);
    candidates.sort_unstable();
    (SingleChoice::Ambiguous { candidates }, 0.0)
}

fn decide_multiple(fills: &[f32], params: &ClassifyParams) -> (Vec<usize>, f32) {
    let t = params.fill_threshold;
    let selected = (0..fills.len()).filter(|&i| fills[i] >= t).collect();
    let span = t.max(1.0 - t).max(f32::EPSILON);
    let confidence = if fills.is_empty() {
        0.0
    } else {
        fills
            .iter()
            .map(|f| ((f - t).abs() / span).clamp(0.0, 1.0))
            .sum::<f32>()
            / fills.len() as f32
    };
    (selected, confidence)
}
