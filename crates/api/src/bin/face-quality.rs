//! Batch CLI: face quality report for each image file.
//!
//! Usage:
//!   face-quality <images>...               # one JSON report per line
//!   face-quality <images>... --pretty      # indented JSON
//!   face-quality <images>... -v            # also print contrast, cheeks and head top to stderr

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use face_analysis::{FaceAnalyzer, FaceReport};
use face_geometry::{estimate_top_of_head, round_to};
use face_models::ModelHandles;
use face_quality_api::{init_logging, ServiceConfig};
use image_input::ImageFrame;

#[derive(Parser, Debug)]
#[command(name = "face-quality")]
#[command(author, version, about = "Face quality report for still images", long_about = None)]
struct Args {
    /// Input image files
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,

    /// Config file (default: config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Face detector model path (overrides config)
    #[arg(long)]
    detector: Option<PathBuf>,

    /// Landmark model path (overrides config)
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Upsample before detection (overrides config)
    #[arg(long)]
    upsample: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every file was analysed
fn run(args: &Args) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = ServiceConfig::load_from(args.config.as_deref())?;
    if let Some(path) = &args.detector {
        config.detector_model_path = path.clone();
    }
    if let Some(path) = &args.landmarks {
        config.landmark_model_path = path.clone();
    }
    config.analysis.upsample |= args.upsample;

    let level = if args.verbose { "debug" } else { "warn" };
    init_logging(level, false)?;

    let models = ModelHandles::load(&config.model_paths(), config.detector)?;
    let analyzer = FaceAnalyzer::new(config.analysis.clone(), models.detector, models.predictor);

    let mut all_ok = true;
    for path in &args.images {
        match analyze_file(&analyzer, path) {
            Ok(report) => {
                let json = if args.pretty {
                    serde_json::to_string_pretty(&report)?
                } else {
                    serde_json::to_string(&report)?
                };
                println!("{}", json);
                if args.verbose {
                    print_extras(path, &report, config.analysis.decimal_precision);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

fn analyze_file(
    analyzer: &FaceAnalyzer,
    path: &Path,
) -> Result<FaceReport, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(analyzer.analyze_blob(&file_name, &bytes)?)
}

/// Measurements kept out of the report: image contrast, cheek points and the
/// estimated top of the head
fn print_extras(path: &Path, report: &FaceReport, decimal_precision: u32) {
    if let Ok(frame) = ImageFrame::open(path) {
        let contrast = frame.to_grayscale().contrast_percent();
        eprintln!(
            "{}: contrast {}%",
            path.display(),
            round_to(contrast, decimal_precision)
        );
    }
    if let Some(details) = &report.face_details {
        let (cheek_left, cheek_right) = details.full_facial_landmarks.cheeks();
        eprintln!(
            "{}: cheeks at ({}, {}) and ({}, {})",
            path.display(),
            cheek_left.x,
            cheek_left.y,
            cheek_right.x,
            cheek_right.y
        );
        let named = &details.landmarks;
        match estimate_top_of_head(named.left_eye_left, named.right_eye_right, named.chin) {
            Ok(top) => eprintln!("{}: head top at ({}, {})", path.display(), top.x, top.y),
            Err(e) => eprintln!("{}: no head top estimate: {}", path.display(), e),
        }
    }
}
