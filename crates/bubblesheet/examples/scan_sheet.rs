//! Scan one photographed answer sheet and print the result as JSON.
//!
//! ```text
//! BUBBLESHEET_LOG=debug cargo run --example scan_sheet -- template.json sheet.jpg [config.json]
//! ```

use std::{env, error::Error, process::ExitCode};

use bubblesheet::detect::gray_from_dynamic;
use bubblesheet::{Pipeline, PipelineConfig, ScanContext, SheetTemplate, Stages};

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let (Some(template_path), Some(image_path)) = (args.next(), args.next()) else {
        return Err("usage: scan_sheet <template.json> <image> [config.json]".into());
    };
    let config = match args.next() {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };

    let template = SheetTemplate::load_json(&template_path)?;
    let img = image::open(&image_path)?;
    let gray = gray_from_dynamic(&img)?;
    log::info!(
        "loaded {} ({}x{}), {} questions",
        image_path,
        gray.width,
        gray.height,
        template.questions.len()
    );

    let pipeline = Pipeline::new(template, config);
    let mut ctx = ScanContext::sheet(&gray);
    let result = pipeline.run(&mut ctx, Stages::Parse)?;

    for (i, line) in result.display(pipeline.template()).iter().enumerate() {
        log::info!("q{}: {}", i + 1, line);
    }
    for (i, err) in result.errors() {
        log::warn!("q{}: {}", i + 1, err);
    }
    println!("{}", result.to_json_pretty()?);
    Ok(())
}

fn init_logging() {
    #[cfg(feature = "tracing")]
    bubblesheet::init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    let _ = bubblesheet::core::init_from_env(log::LevelFilter::Info);
}
