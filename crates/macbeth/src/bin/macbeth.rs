//! macbeth CLI: detect a MacBeth chart and re-sample it from later frames.

use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use macbeth::chart::{patch_name, ChartDetectConfig, ChartDetectReport, CHART_COLS};
use macbeth::core::Color3f;
use macbeth::detect;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "macbeth")]
#[command(about = "Detect MacBeth ColorChecker charts and sample their patches")]
#[command(version)]
struct Cli {
    /// Log debug output from every pipeline stage.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the chart in an image and write a JSON report.
    Detect(DetectArgs),

    /// Sample patch colors from an image using a previous detection report.
    Sample(SampleArgs),
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image.
    image: PathBuf,

    /// JSON config with detector parameters and output paths.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the debug overlay (working resolution) to this PNG.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct SampleArgs {
    /// Path to the frame to sample.
    image: PathBuf,

    /// Report written by `macbeth detect`.
    #[arg(long)]
    report: PathBuf,

    /// Write the sampled colors here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SampledPatch {
    row: usize,
    col: usize,
    name: String,
    color: Option<Color3f>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Sample(args) => run_sample(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = macbeth::core::init_from_env(level);
}

#[cfg(feature = "tracing")]
fn init_logging(verbose: bool) {
    macbeth::core::init_tracing(false);
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
}

// ── detect ────────────────────────────────────────────────────────────

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let mut config = match &args.config {
        Some(path) => ChartDetectConfig::load_json(path)?,
        None => ChartDetectConfig::default(),
    };
    config.image_path = args.image.display().to_string();
    if let Some(report) = &args.report {
        config.output_path = Some(report.display().to_string());
    }
    if let Some(overlay) = &args.overlay {
        config.overlay_path = Some(overlay.display().to_string());
    }

    let img = image::open(&args.image)?.to_rgba8();
    info!(
        "loaded {} ({}x{})",
        config.image_path,
        img.width(),
        img.height()
    );
    let params = config.build_params();

    let result = match &config.overlay_path {
        Some(path) => {
            let (result, overlay) = detect::detect_chart_with_overlay(&img, params)?;
            overlay.save(path)?;
            info!("overlay written to {path}");
            result
        }
        None => detect::detect_chart(&img, params),
    };

    let mut report =
        ChartDetectReport::new(&config.image_path, img.width() as usize, img.height() as usize);
    match &result {
        Ok(detection) => {
            info!("chart found, {} patches matched", detection.matched);
            report.set_detection(detection.clone());
        }
        Err(err) => report.set_error(err),
    }

    match &config.output_path {
        Some(path) => {
            report.write_json(path)?;
            info!("report written to {path}");
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    result?;
    Ok(())
}

// ── sample ────────────────────────────────────────────────────────────

fn run_sample(args: &SampleArgs) -> CliResult<()> {
    let report = ChartDetectReport::load_json(&args.report)?;
    let detection = report
        .detection
        .ok_or_else(|| missing_detection(&args.report, report.error.as_deref()))?;

    let img = image::open(&args.image)?.to_rgba8();
    let colors = detect::sample_chart(&img, &detection)?;
    let patches: Vec<SampledPatch> = colors
        .into_iter()
        .enumerate()
        .map(|(i, color)| {
            let (row, col) = (i / CHART_COLS, i % CHART_COLS);
            SampledPatch {
                row,
                col,
                name: patch_name(row, col).unwrap_or_default().to_string(),
                color,
            }
        })
        .collect();

    let json = serde_json::to_string_pretty(&patches)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("sampled colors written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn missing_detection(path: &Path, error: Option<&str>) -> CliError {
    match error {
        Some(error) => format!("{} holds no detection: {error}", path.display()).into(),
        None => format!("{} holds no detection", path.display()).into(),
    }
}
