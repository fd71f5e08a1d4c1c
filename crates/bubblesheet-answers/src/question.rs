//! Question templates and their validation.

use bubblesheet_core::NormRect;
use serde::{Deserialize, Serialize};

use crate::QuestionError;

/// Options of a choice question: a bare count or an ordered label list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionSet {
    Count(usize),
    Labels(Vec<String>),
}

impl OptionSet {
    pub fn len(&self) -> usize {
        match self {
            OptionSet::Count(n) => *n,
            OptionSet::Labels(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label of option `index`; counts render as 1-based numbers.
    pub fn label(&self, index: usize) -> String {
        match self {
            OptionSet::Labels(labels) => labels
                .get(index)
                .cloned()
                .unwrap_or_else(|| (index + 1).to_string()),
            OptionSet::Count(_) => (index + 1).to_string(),
        }
    }
}

/// What kind of answer a question expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionSpec {
    Single {
        options: OptionSet,
    },
    Multiple {
        options: OptionSet,
    },
    Text,
    Info {
        /// One label per printed line; empty means a single block.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<String>,
    },
}

impl QuestionSpec {
    pub fn single(n: usize) -> Self {
        Self::Single {
            options: OptionSet::Count(n),
        }
    }

    pub fn multiple(n: usize) -> Self {
        Self::Multiple {
            options: OptionSet::Count(n),
        }
    }

    pub fn options(&self) -> Option<&OptionSet> {
        match self {
            QuestionSpec::Single { options } | QuestionSpec::Multiple { options } => Some(options),
            QuestionSpec::Text | QuestionSpec::Info { .. } => None,
        }
    }

    pub fn is_choice(&self) -> bool {
        self.options().is_some()
    }

    pub fn validate(&self) -> Result<(), QuestionError> {
        match self.options() {
            Some(OptionSet::Count(0)) => Err(QuestionError::invalid(
                "choice question needs a positive option count",
            )),
            Some(OptionSet::Labels(labels)) if labels.is_empty() => Err(QuestionError::invalid(
                "choice question needs at least one option label",
            )),
            _ => Ok(()),
        }
    }
}

/// How option bubbles are arranged inside the question box.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptionLayout {
    /// Equal-width cells left to right.
    #[default]
    Row,
    /// Equal-height cells top to bottom.
    Column,
    /// Row-major grid with `cols` columns.
    Grid { cols: usize },
    /// Explicit cells, normalized to the question box.
    Cells { cells: Vec<NormRect> },
}

impl OptionLayout {
    /// Option cells in the question box's local `[0,1]²` frame.
    pub fn cells(&self, n: usize) -> Result<Vec<NormRect>, QuestionError> {
        match self {
            OptionLayout::Row => Ok((0..n)
                .map(|i| NormRect::new(i as f32 / n as f32, 0.0, 1.0 / n as f32, 1.0))
                .collect()),
            OptionLayout::Column => Ok((0..n)
                .map(|i| NormRect::new(0.0, i as f32 / n as f32, 1.0, 1.0 / n as f32))
                .collect()),
            OptionLayout::Grid { cols: 0 } => {
                Err(QuestionError::invalid("grid layout needs at least one column"))
            }
            OptionLayout::Grid { cols } => {
                let cols = *cols;
                let rows = n.div_ceil(cols);
                let (w, h) = (1.0 / cols as f32, 1.0 / rows as f32);
                Ok((0..n)
                    .map(|i| NormRect::new((i % cols) as f32 * w, (i / cols) as f32 * h, w, h))
                    .collect())
            }
            OptionLayout::Cells { cells } => {
                if cells.len() != n {
                    return Err(QuestionError::invalid(format!(
                        "{} cells given for {} options",
                        cells.len(),
                        n
                    )));
                }
                if let Some(bad) = cells.iter().position(|c| !c.is_valid()) {
                    return Err(QuestionError::invalid(format!("cell {bad} is not a valid box")));
                }
                Ok(cells.clone())
            }
        }
    }
}

/// One question of a sheet template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateQuestion {
    #[serde(flatten)]
    pub spec: QuestionSpec,
    /// Question box in normalized sheet coordinates.
    pub bbox: NormRect,
    #[serde(default)]
    pub layout: OptionLayout,
}

impl TemplateQuestion {
    pub fn new(spec: QuestionSpec, bbox: NormRect) -> Self {
        Self {
            spec,
            bbox,
            layout: OptionLayout::Row,
        }
    }

    pub fn with_layout(mut self, layout: OptionLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Validate the question and lay out its option cells.
    ///
    /// Runs before any pixel is read.
    pub fn plan(&self) -> Result<QuestionPlan, QuestionError> {
        if !self.bbox.is_valid() {
            return Err(QuestionError::invalid(
                "question box must be a non-empty rectangle inside the sheet",
            ));
        }
        self.spec.validate()?;
        let cells = match self.spec.options() {
            Some(options) => self.layout.cells(options.len())?,
            None => Vec::new(),
        };
        Ok(QuestionPlan {
            spec: self.spec.clone(),
            bbox: self.bbox,
            cells,
        })
    }
}

/// A validated question, ready for classification.
#[derive(Clone, Debug, PartialEq)]
pub struct QuestionPlan {
    pub spec: QuestionSpec,
    pub bbox: NormRect,
    /// Option cells relative to the cropped region; empty for text/info.
    pub cells: Vec<NormRect>,
}
