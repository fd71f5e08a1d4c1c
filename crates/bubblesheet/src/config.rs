//! Sheet templates and pipeline settings, with JSON helpers.

use std::{fs, path::Path};

use bubblesheet_answers::{ClassifyParams, QuestionSpec, TemplateQuestion};
use bubblesheet_core::ImageSize;
use bubblesheet_geometry::{MarkerLayout, ResolveParams};
use bubblesheet_markers::MarkerDetectParams;
use serde::{Deserialize, Serialize};

use crate::ConfigIoError;

/// Printed sheet description: where the markers are and what each question asks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetTemplate {
    #[serde(default)]
    pub layout: MarkerLayout,
    pub questions: Vec<TemplateQuestion>,
}

impl SheetTemplate {
    pub fn new(layout: MarkerLayout, questions: Vec<TemplateQuestion>) -> Self {
        Self { layout, questions }
    }

    pub fn specs(&self) -> impl Iterator<Item = &QuestionSpec> {
        self.questions.iter().map(|q| &q.spec)
    }

    /// Load a JSON template from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this template to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Tuning for every stage. All fields have defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub markers: MarkerDetectParams,
    pub resolve: ResolveParams,
    pub classify: ClassifyParams,
    /// Classification threads; `None` uses the global rayon pool.
    pub workers: Option<usize>,
    /// When set, crop runs also produce a rectified sheet of this size.
    pub rectified_size: Option<ImageSize>,
}

impl PipelineConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
