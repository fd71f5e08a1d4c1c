//! The single pipeline entry point.

use std::sync::Arc;

use bubblesheet_answers::{
    AnswerResult, Classifier, QuestionError, QuestionPlan, TextRecognizer,
};
use bubblesheet_core::{GrayImage, GrayImageView};
use bubblesheet_geometry::{
    crop_region, resolve_geometry, MarkerLayout, QuestionRegion, ResolveParams, SheetGeometry,
};
use bubblesheet_markers::{detect_markers, require_markers, Marker, MarkerDetectParams};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::{PipelineConfig, PipelineError, PipelineResult, SheetTemplate};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How far a run goes. Each stage includes the ones before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stages {
    /// Find fiducial markers.
    Detect,
    /// Resolve the sheet frame and crop every question region.
    Crop,
    /// Classify every region.
    Parse,
}

/// Pixels a run starts from.
#[derive(Clone, Debug)]
pub enum PipelineInput<'a> {
    /// A photographed sheet.
    Sheet(&'a GrayImage),
    /// Question crops produced by the caller, paired to questions by index.
    Cropped(Vec<GrayImage>),
}

/// Per-invocation state owned by the caller.
///
/// Detected markers and the resolved geometry are kept, so a deeper stage
/// request on the same context does not detect again. Each cached value
/// remembers the settings it was computed with; a pipeline with different
/// detector settings, marker layout or resolver settings recomputes it.
#[derive(Debug)]
pub struct ScanContext<'a> {
    input: PipelineInput<'a>,
    markers: Option<CachedMarkers>,
    geometry: Option<CachedGeometry>,
}

#[derive(Debug)]
struct CachedMarkers {
    params: MarkerDetectParams,
    markers: Vec<Marker>,
}

#[derive(Debug)]
struct CachedGeometry {
    layout: MarkerLayout,
    params: ResolveParams,
    geometry: SheetGeometry,
}

impl<'a> ScanContext<'a> {
    pub fn new(input: PipelineInput<'a>) -> Self {
        Self {
            input,
            markers: None,
            geometry: None,
        }
    }

    pub fn sheet(image: &'a GrayImage) -> Self {
        Self::new(PipelineInput::Sheet(image))
    }

    pub fn cropped(regions: Vec<GrayImage>) -> Self {
        Self::new(PipelineInput::Cropped(regions))
    }

    pub fn input(&self) -> &PipelineInput<'a> {
        &self.input
    }

    pub fn markers(&self) -> Option<&[Marker]> {
        self.markers.as_ref().map(|c| c.markers.as_slice())
    }

    pub fn geometry(&self) -> Option<&SheetGeometry> {
        self.geometry.as_ref().map(|c| &c.geometry)
    }
}

/// Sheet template plus settings; reusable across many scans.
///
/// With `workers` set, the classification pool is built once here and shared
/// by every run and every clone.
#[derive(Debug, Clone)]
pub struct Pipeline {
    template: SheetTemplate,
    config: PipelineConfig,
    classifier: Classifier,
    pool: Option<Arc<ThreadPool>>,
}

type Slot = Result<(QuestionPlan, QuestionRegion), QuestionError>;

impl Pipeline {
    pub fn new(template: SheetTemplate, config: PipelineConfig) -> Self {
        let classifier = Classifier::new(config.classify.clone());
        let pool = config.workers.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|err| log::warn!("falling back to the global pool: {err}"))
                .ok()
                .map(Arc::new)
        });
        Self {
            template,
            config,
            classifier,
            pool,
        }
    }

    /// Attach an external text recognizer for text and info questions.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.classifier = self.classifier.with_recognizer(recognizer);
        self
    }

    pub fn template(&self) -> &SheetTemplate {
        &self.template
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the requested stages.
    ///
    /// Marker and geometry failures abort the whole run. Per-question
    /// failures land in their slot of [`PipelineResult::answers`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, ctx), fields(questions = self.template.questions.len()))
    )]
    pub fn run(
        &self,
        ctx: &mut ScanContext<'_>,
        stages: Stages,
    ) -> Result<PipelineResult, PipelineError> {
        let mut result = PipelineResult::empty();
        let plans: Vec<Result<QuestionPlan, QuestionError>> =
            self.template.questions.iter().map(|q| q.plan()).collect();

        let sheet = match &ctx.input {
            PipelineInput::Sheet(image) => Some(*image),
            PipelineInput::Cropped(_) => None,
        };

        let slots: Vec<Slot> = if let Some(image) = sheet {
            let view = image.view();
            result.markers = self.markers(ctx, &view)?;
            if stages == Stages::Detect {
                return Ok(result);
            }

            let geometry = self.geometry(ctx, &view)?;
            if let Some(size) = self.config.rectified_size {
                result.corrected = Some(geometry.rectify(&view, size.width, size.height));
            }
            let slots = plans
                .into_iter()
                .enumerate()
                .map(|(i, plan)| {
                    let plan = plan?;
                    let region = crop_region(&view, &geometry, i, &plan.bbox)?;
                    Ok((plan, region))
                })
                .collect();
            result.geometry = Some(geometry);
            slots
        } else {
            if stages != Stages::Parse {
                return Err(PipelineError::NoSheetImage);
            }
            let crops: &[GrayImage] = match &ctx.input {
                PipelineInput::Cropped(crops) => crops,
                PipelineInput::Sheet(_) => &[],
            };
            if crops.len() != plans.len() {
                log::warn!(
                    "{} crops supplied for {} questions",
                    crops.len(),
                    plans.len()
                );
            }
            plans
                .into_iter()
                .enumerate()
                .map(|(i, plan)| {
                    let plan = plan?;
                    let crop = crops.get(i).ok_or(QuestionError::MissingRegion)?;
                    Ok((plan, QuestionRegion::from_image(i, crop.clone())))
                })
                .collect()
        };

        for (i, slot) in slots.iter().enumerate() {
            if let Err(err) = slot {
                log::warn!("question {i}: {err}");
            }
        }

        if stages == Stages::Parse {
            result.answers = self.classify_all(&slots);
        }
        result.regions = slots
            .into_iter()
            .map(|s| s.ok().map(|(_, region)| region))
            .collect();
        Ok(result)
    }

    fn markers(
        &self,
        ctx: &mut ScanContext<'_>,
        view: &GrayImageView<'_>,
    ) -> Result<Vec<Marker>, PipelineError> {
        let params = &self.config.markers;
        let cached = ctx
            .markers
            .as_ref()
            .filter(|c| c.params == *params)
            .map(|c| c.markers.clone());
        let markers = match cached {
            Some(markers) => markers,
            None => {
                let found = detect_markers(view, params);
                ctx.markers = Some(CachedMarkers {
                    params: params.clone(),
                    markers: found.clone(),
                });
                ctx.geometry = None;
                found
            }
        };
        require_markers(&markers, self.template.layout.required_markers())?;
        Ok(markers)
    }

    fn geometry(
        &self,
        ctx: &mut ScanContext<'_>,
        view: &GrayImageView<'_>,
    ) -> Result<SheetGeometry, PipelineError> {
        let markers = self.markers(ctx, view)?;
        let layout = &self.template.layout;
        let params = &self.config.resolve;
        if let Some(cached) = &ctx.geometry {
            if cached.layout == *layout && cached.params == *params {
                return Ok(cached.geometry.clone());
            }
        }
        let geometry = resolve_geometry(&markers, layout, view.size(), params)?;
        ctx.geometry = Some(CachedGeometry {
            layout: layout.clone(),
            params: params.clone(),
            geometry: geometry.clone(),
        });
        Ok(geometry)
    }

    fn classify_all(&self, slots: &[Slot]) -> Vec<Result<AnswerResult, QuestionError>> {
        let classify = || -> Vec<Result<AnswerResult, QuestionError>> {
            slots
                .par_iter()
                .map(|slot| {
                    let (plan, region) = slot.as_ref().map_err(Clone::clone)?;
                    Ok(self.classifier.classify(plan, region))
                })
                .collect()
        };

        match &self.pool {
            Some(pool) => pool.install(classify),
            None => classify(),
        }
    }
}
