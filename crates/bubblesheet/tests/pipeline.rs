use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use bubblesheet::answers::{RecognizeError, TextRecognizer};
use bubblesheet::core::draw::{fill_disc, fill_rect};
use bubblesheet::core::{warp_perspective_gray, GrayImageView, Homography, ImageSize, Point2};
use bubblesheet::markers::RadiusRange;
use bubblesheet::{
    Answer, GrayImage, MarkerLayout, NormRect, OptionSet, Pipeline, PipelineConfig,
    PipelineError, QuestionError, QuestionSpec, ScanContext, SheetTemplate, SingleChoice, Stages,
    TemplateQuestion, RESULT_FORMAT_VERSION,
};

const WIDTH: usize = 800;
const HEIGHT: usize = 600;
const MARKERS: [(f32, f32); 4] = [(60.0, 60.0), (740.0, 60.0), (740.0, 540.0), (60.0, 540.0)];
const PAPER: u8 = 240;
const INK: u8 = 20;

/// Pixel rectangle on the synthetic sheet to normalized sheet coordinates.
fn sheet_rect(x: f32, y: f32, w: f32, h: f32) -> NormRect {
    let (sx, sy) = (MARKERS[0].0, MARKERS[0].1);
    let (sw, sh) = (MARKERS[2].0 - sx, MARKERS[2].1 - sy);
    NormRect::new((x - sx) / sw, (y - sy) / sh, w / sw, h / sh)
}

/// Top-left pixel of a question slot; two columns of five rows.
fn slot_origin(slot: usize) -> (f32, f32) {
    (120.0 + 300.0 * (slot / 5) as f32, 100.0 + 80.0 * (slot % 5) as f32)
}

fn sheet_with_markers(markers: &[(f32, f32)]) -> GrayImage {
    let mut img = GrayImage::filled(WIDTH, HEIGHT, PAPER);
    for &(x, y) in markers {
        fill_disc(&mut img, x, y, 16.0, INK);
    }
    img
}

fn blank_sheet() -> GrayImage {
    sheet_with_markers(&MARKERS)
}

fn mark(img: &mut GrayImage, slot: usize, options: &[usize]) {
    let (x, y) = slot_origin(slot);
    for &i in options {
        fill_disc(img, x + 30.0 + 60.0 * i as f32, y + 30.0, 22.0, INK);
    }
}

fn choice(spec: QuestionSpec, slot: usize) -> TemplateQuestion {
    let (x, y) = slot_origin(slot);
    TemplateQuestion::new(spec, sheet_rect(x, y, 240.0, 60.0))
}

fn text_box(spec: QuestionSpec, slot: usize) -> TemplateQuestion {
    let (x, y) = slot_origin(slot);
    TemplateQuestion::new(spec, sheet_rect(x, y, 280.0, 60.0))
}

fn scribble(img: &mut GrayImage, slot: usize) {
    let (x, y) = slot_origin(slot);
    fill_rect(img, x + 10.0, y + 20.0, 120.0, 4.0, INK);
    fill_rect(img, x + 40.0, y + 12.0, 4.0, 30.0, INK);
}

fn config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.markers.radius_range = Some(RadiusRange {
        min: 10.0,
        max: 19.0,
    });
    cfg
}

fn pipeline(questions: Vec<TemplateQuestion>) -> Pipeline {
    Pipeline::new(
        SheetTemplate::new(MarkerLayout::four_corners(), questions),
        config(),
    )
}

#[test]
fn end_to_end_single_choice_and_text() {
    let mut img = blank_sheet();
    mark(&mut img, 0, &[2]);
    scribble(&mut img, 5);

    let pipeline = pipeline(vec![
        choice(QuestionSpec::single(4), 0),
        text_box(QuestionSpec::Text, 5),
    ]);
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    assert_eq!(result.version, RESULT_FORMAT_VERSION);
    assert_eq!(result.answers.len(), 2);
    assert_eq!(result.regions.len(), 2);

    let first = result.answers[0].as_ref().unwrap();
    assert_eq!(first.answer, Answer::Single(SingleChoice::Selected { index: 2 }));

    let second = result.answers[1].as_ref().unwrap();
    assert!(matches!(second.answer, Answer::Unclassified { region: 1, .. }));
    let region = result.regions[1].as_ref().unwrap();
    assert_eq!(region.index, 1);
    assert!(region.image.data.iter().any(|&v| v < 100));
    assert!(result.is_complete());
}

#[test]
fn detected_markers_match_ground_truth() {
    let img = blank_sheet();
    let pipeline = pipeline(Vec::new());
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Detect).unwrap();

    assert_eq!(result.markers.len(), 4);
    for &(x, y) in &MARKERS {
        let hit = result
            .markers
            .iter()
            .find(|m| (m.center.x - x).abs() < 1.0 && (m.center.y - y).abs() < 1.0);
        let hit = hit.unwrap_or_else(|| panic!("no marker at ({x}, {y})"));
        assert!(hit.circularity >= 0.8);
        assert_abs_diff_eq!(hit.radius, 16.0, epsilon = 1.5);
    }
    assert!(result.geometry.is_none());
    assert!(result.regions.is_empty());
    assert!(result.answers.is_empty());
}

#[test]
fn missing_marker_aborts_the_run() {
    let img = sheet_with_markers(&MARKERS[..3]);
    let pipeline = pipeline(vec![choice(QuestionSpec::single(4), 0)]);
    let mut ctx = ScanContext::sheet(&img);
    for stages in [Stages::Detect, Stages::Crop, Stages::Parse] {
        let err = pipeline.run(&mut ctx, stages).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InsufficientMarkers {
                found: 3,
                required: 4
            }
        );
    }
}

#[test]
fn invalid_question_does_not_block_the_others() {
    let mut img = blank_sheet();
    mark(&mut img, 0, &[1]);
    mark(&mut img, 2, &[1, 3]);

    let pipeline = pipeline(vec![
        choice(QuestionSpec::single(4), 0),
        choice(QuestionSpec::single(0), 1),
        choice(QuestionSpec::multiple(4), 2),
    ]);
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    assert_eq!(result.answers.len(), 3);
    assert_eq!(result.answers[0].as_ref().unwrap().selected(), Some(1));
    assert!(matches!(
        result.answers[1],
        Err(QuestionError::InvalidQuestionSpec { .. })
    ));
    assert_eq!(
        result.answers[2].as_ref().unwrap().answer,
        Answer::Multiple {
            selected: vec![1, 3]
        }
    );
    assert!(result.regions[1].is_none());
    assert_eq!(result.errors().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);
    assert!(!result.is_complete());
}

#[test]
fn out_of_bounds_region_fails_alone() {
    // markers printed inset, so the sheet frame extends past the photo
    let layout = MarkerLayout::new(vec![
        Point2::new(0.25, 0.25),
        Point2::new(0.75, 0.25),
        Point2::new(0.75, 0.75),
        Point2::new(0.25, 0.75),
    ]);
    let (sw, sh) = (2.0 * (MARKERS[2].0 - MARKERS[0].0), 2.0 * (MARKERS[2].1 - MARKERS[0].1));
    let (ox, oy) = (MARKERS[0].0 - 0.25 * sw, MARKERS[0].1 - 0.25 * sh);
    let (x, y) = slot_origin(0);
    let inside = NormRect::new((x - ox) / sw, (y - oy) / sh, 240.0 / sw, 60.0 / sh);

    let mut img = blank_sheet();
    mark(&mut img, 0, &[2]);
    let pipeline = Pipeline::new(
        SheetTemplate::new(
            layout,
            vec![
                TemplateQuestion::new(QuestionSpec::Text, NormRect::new(0.0, 0.0, 0.1, 0.1)),
                TemplateQuestion::new(QuestionSpec::single(4), inside),
            ],
        ),
        config(),
    );
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    assert_eq!(result.answers.len(), 2);
    assert!(matches!(
        result.answers[0],
        Err(QuestionError::RegionOutOfBounds { .. })
    ));
    assert!(result.regions[0].is_none());
    assert_eq!(result.answers[1].as_ref().unwrap().selected(), Some(2));
    assert_eq!(result.errors().map(|(i, _)| i).collect::<Vec<_>>(), vec![0]);
}

#[test]
fn blank_and_double_marks_are_reported() {
    let mut img = blank_sheet();
    mark(&mut img, 1, &[0, 3]);

    let pipeline = pipeline(vec![
        choice(QuestionSpec::single(4), 0),
        choice(QuestionSpec::single(4), 1),
        choice(QuestionSpec::multiple(4), 2),
    ]);
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    assert_eq!(
        result.answers[0].as_ref().unwrap().answer,
        Answer::Single(SingleChoice::None)
    );
    assert_eq!(
        result.answers[1].as_ref().unwrap().answer,
        Answer::Single(SingleChoice::Ambiguous {
            candidates: vec![0, 3]
        })
    );
    assert_eq!(
        result.answers[2].as_ref().unwrap().answer,
        Answer::Multiple { selected: vec![] }
    );
}

#[test]
fn crop_stage_stops_before_classification() {
    let img = blank_sheet();
    let cfg = PipelineConfig {
        rectified_size: Some(ImageSize {
            width: 340,
            height: 240,
        }),
        ..config()
    };
    let pipeline = Pipeline::new(
        SheetTemplate::new(
            MarkerLayout::four_corners(),
            vec![choice(QuestionSpec::single(4), 0)],
        ),
        cfg,
    );
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Crop).unwrap();

    assert!(result.answers.is_empty());
    let region = result.regions[0].as_ref().unwrap();
    assert!((region.image.width as i64 - 240).abs() <= 1);
    assert!((region.image.height as i64 - 60).abs() <= 1);
    let corrected = result.corrected.as_ref().unwrap();
    assert_eq!((corrected.width, corrected.height), (340, 240));
    assert!(ctx.geometry().is_some());
}

#[test]
fn deeper_stage_reuses_the_context() {
    let mut img = blank_sheet();
    mark(&mut img, 0, &[3]);
    let pipeline = pipeline(vec![choice(QuestionSpec::single(4), 0)]);
    let mut ctx = ScanContext::sheet(&img);

    let detected = pipeline.run(&mut ctx, Stages::Detect).unwrap();
    assert_eq!(ctx.markers().map(|m| m.len()), Some(4));
    assert!(ctx.geometry().is_none());

    let parsed = pipeline.run(&mut ctx, Stages::Parse).unwrap();
    assert_eq!(parsed.markers, detected.markers);
    assert_eq!(parsed.answers[0].as_ref().unwrap().selected(), Some(3));
    assert_eq!(parsed.geometry.as_ref(), ctx.geometry());
}

#[test]
fn context_follows_the_pipeline_layout() {
    let img = blank_sheet();
    let inset = MarkerLayout::new(vec![
        Point2::new(0.25, 0.25),
        Point2::new(0.75, 0.25),
        Point2::new(0.75, 0.75),
        Point2::new(0.25, 0.75),
    ]);
    let corners = pipeline(vec![]);
    let inset_pipeline = Pipeline::new(SheetTemplate::new(inset, vec![]), config());

    let mut ctx = ScanContext::sheet(&img);
    let first = corners.run(&mut ctx, Stages::Crop).unwrap();
    let second = inset_pipeline.run(&mut ctx, Stages::Crop).unwrap();
    assert_eq!(first.markers, second.markers);
    assert_ne!(first.geometry, second.geometry);

    let mut fresh = ScanContext::sheet(&img);
    let expected = inset_pipeline.run(&mut fresh, Stages::Crop).unwrap();
    assert_eq!(second.geometry, expected.geometry);
    assert_eq!(ctx.geometry(), expected.geometry.as_ref());
}

#[test]
fn rotated_photo_still_reads() {
    let mut sheet = blank_sheet();
    mark(&mut sheet, 0, &[1]);

    let (s, c) = 5.0_f64.to_radians().sin_cos();
    let (cx, cy) = (WIDTH as f64 / 2.0, HEIGHT as f64 / 2.0);
    // photo_from_sheet: rotate about the image centre
    let photo_from_sheet = Homography::from_array([
        [c, -s, cx - c * cx + s * cy],
        [s, c, cy - s * cx - c * cy],
        [0.0, 0.0, 1.0],
    ]);
    let sheet_from_photo = photo_from_sheet.inverse().unwrap();
    let photo = warp_perspective_gray(&sheet.view(), sheet_from_photo, WIDTH, HEIGHT);

    let pipeline = pipeline(vec![choice(QuestionSpec::single(4), 0)]);
    let mut ctx = ScanContext::sheet(&photo);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    let geometry = result.geometry.as_ref().unwrap();
    let tl = geometry.sheet_to_image(Point2::new(0.0, 0.0));
    let expected = photo_from_sheet.apply(Point2::new(MARKERS[0].0, MARKERS[0].1));
    assert_abs_diff_eq!(tl.x, expected.x, epsilon = 1.5);
    assert_abs_diff_eq!(tl.y, expected.y, epsilon = 1.5);
    assert_eq!(result.answers[0].as_ref().unwrap().selected(), Some(1));
}

#[test]
fn answers_keep_question_order_on_a_sized_pool() {
    let mut img = blank_sheet();
    let mut questions = Vec::new();
    for slot in 0..10 {
        mark(&mut img, slot, &[slot % 4]);
        questions.push(choice(QuestionSpec::single(4), slot));
    }
    let cfg = PipelineConfig {
        workers: Some(3),
        ..config()
    };
    let pipeline = Pipeline::new(
        SheetTemplate::new(MarkerLayout::four_corners(), questions),
        cfg,
    );
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    let expected: Vec<Vec<usize>> = (0..10).map(|slot| vec![slot % 4]).collect();
    assert_eq!(result.selected_indices(), expected);
    for (i, region) in result.regions.iter().enumerate() {
        assert_eq!(region.as_ref().unwrap().index, i);
    }
}

#[test]
fn caller_crops_skip_detection() {
    let mut sheet = blank_sheet();
    mark(&mut sheet, 0, &[0]);
    mark(&mut sheet, 1, &[2, 3]);
    let crop = |slot: usize| {
        let (x, y) = slot_origin(slot);
        sheet
            .crop(bubblesheet::core::PixelRect {
                x: x as usize,
                y: y as usize,
                width: 240,
                height: 60,
            })
            .unwrap()
    };

    let pipeline = pipeline(vec![
        choice(QuestionSpec::single(4), 0),
        choice(QuestionSpec::multiple(4), 1),
        choice(QuestionSpec::single(4), 2),
    ]);
    let mut ctx = ScanContext::cropped(vec![crop(0), crop(1)]);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    assert!(result.markers.is_empty());
    assert!(result.geometry.is_none());
    assert_eq!(result.answers[0].as_ref().unwrap().selected(), Some(0));
    assert_eq!(result.selected_indices()[1], vec![2, 3]);
    assert_eq!(result.answers[2], Err(QuestionError::MissingRegion));
}

#[test]
fn caller_crops_cannot_be_detected() {
    let pipeline = pipeline(vec![choice(QuestionSpec::single(4), 0)]);
    let mut ctx = ScanContext::cropped(vec![GrayImage::filled(240, 60, PAPER)]);
    assert_eq!(
        pipeline.run(&mut ctx, Stages::Crop).unwrap_err(),
        PipelineError::NoSheetImage
    );
}

struct NameReader {
    calls: AtomicUsize,
}

impl TextRecognizer for NameReader {
    fn recognize(&self, _image: &GrayImageView<'_>) -> Result<String, RecognizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("  Jane \t Doe ".to_string())
    }
}

#[test]
fn info_fields_are_read_row_by_row() {
    let mut img = blank_sheet();
    scribble(&mut img, 6);
    let reader = Arc::new(NameReader {
        calls: AtomicUsize::new(0),
    });
    let template = SheetTemplate::new(
        MarkerLayout::four_corners(),
        vec![
            choice(
                QuestionSpec::Single {
                    options: OptionSet::Labels(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
                },
                0,
            ),
            text_box(
                QuestionSpec::Info {
                    fields: vec!["name".into(), "class".into()],
                },
                6,
            ),
        ],
    );
    let pipeline = Pipeline::new(template.clone(), config()).with_recognizer(reader.clone());
    mark(&mut img, 0, &[3]);
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    let info = result.answers[1].as_ref().unwrap();
    assert_eq!(info.text(), Some("Jane Doe\nJane Doe"));
    assert_eq!(result.display(&template), vec!["d".to_string(), "Jane Doe\nJane Doe".to_string()]);
}

#[test]
fn template_and_config_round_trip_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let template = SheetTemplate::new(
        MarkerLayout::three_corners(),
        vec![
            choice(QuestionSpec::single(4), 0),
            text_box(QuestionSpec::Info { fields: vec!["name".into()] }, 5),
        ],
    );
    let path = dir.path().join("template.json");
    template.write_json(&path).unwrap();
    assert_eq!(SheetTemplate::load_json(&path).unwrap(), template);

    let cfg = PipelineConfig {
        workers: Some(2),
        ..config()
    };
    let cfg_path = dir.path().join("config.json");
    cfg.write_json(&cfg_path).unwrap();
    let back = PipelineConfig::load_json(&cfg_path).unwrap();
    assert_eq!(back.workers, Some(2));
    assert_eq!(back.markers.radius_range, cfg.markers.radius_range);

    assert!(SheetTemplate::load_json(dir.path().join("missing.json")).is_err());
}

#[test]
fn result_serializes_images_as_sizes() {
    let mut img = blank_sheet();
    mark(&mut img, 0, &[0]);
    let pipeline = pipeline(vec![choice(QuestionSpec::single(4), 0)]);
    let mut ctx = ScanContext::sheet(&img);
    let result = pipeline.run(&mut ctx, Stages::Parse).unwrap();

    let json: serde_json::Value = serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["version"], RESULT_FORMAT_VERSION);
    assert!(json["regions"][0]["size"]["width"].as_u64().is_some());
    assert!(json["regions"][0].get("image").is_none());
    assert_eq!(json["answers"][0]["Ok"]["answer"]["type"], "single");
    assert_eq!(json["answers"][0]["Ok"]["answer"]["status"], "selected");
}
