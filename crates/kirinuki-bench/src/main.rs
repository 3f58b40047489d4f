//! kirinuki-bench: CLI tool for reprocessing parameter experimentation
//! and diagnostics.
//!
//! Runs the recompositing pipeline on a processed/original image pair
//! with configurable slider parameters, printing detailed per-step
//! diagnostics. Useful for:
//!
//! - Tuning background sensitivity and edge refinement values
//! - Measuring per-step durations to identify bottlenecks
//! - Understanding how parameter changes affect pixel counts
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin kirinuki-bench -- [OPTIONS] <PROCESSED_PATH> <ORIGINAL_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use kirinuki_engine::diagnostics::{Clock, ReprocessDiagnostics, recomposite_with_diagnostics};
use kirinuki_engine::{GrayAlphaImage, RefineParams, RgbaImage, raster};

/// Reprocessing parameter experimentation and diagnostics for kirinuki.
///
/// Runs the recompositing pipeline on an image pair with configurable
/// slider parameters and prints per-step timing and count diagnostics.
#[derive(Parser)]
#[command(name = "kirinuki-bench", version)]
struct Cli {
    /// Path to the processed cutout image (PNG, JPEG, BMP, WebP).
    processed_path: PathBuf,

    /// Path to the original photo (same dimensions as the cutout).
    original_path: PathBuf,

    /// Background sensitivity (0-100).
    #[arg(long, default_value_t = RefineParams::DEFAULT_SENSITIVITY)]
    sensitivity: u8,

    /// Edge refinement strength (0-100).
    #[arg(long, default_value_t = RefineParams::DEFAULT_EDGE_REFINEMENT)]
    edge_refinement: u8,

    /// Composite on top of the original photo instead of the cutout.
    #[arg(long)]
    show_original: bool,

    /// Write the composited preview to a PNG file (first run only).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full parameters as a JSON string.
    ///
    /// When provided, the individual parameter flags are ignored. The
    /// JSON must be a valid `RefineParams` serialization.
    #[arg(long)]
    params_json: Option<String>,
}

/// Build [`RefineParams`] from CLI arguments.
///
/// If `--params-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored. Otherwise the parameters
/// are assembled from the flags.
fn params_from_cli(cli: &Cli) -> Result<RefineParams, String> {
    if let Some(ref json) = cli.params_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --params-json: {e}"));
    }

    Ok(RefineParams {
        sensitivity: cli.sensitivity,
        edge_refinement: cli.edge_refinement,
        show_original: cli.show_original,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let params = match params_from_cli(&cli) {
        Ok(p) => p.clamped(),
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let processed = match read_rgba(&cli.processed_path) {
        Ok(image) => image,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let original = match read_rgba(&cli.original_path) {
        Ok(image) => image,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if processed.dimensions() != original.dimensions() {
        eprintln!(
            "Error: image sizes differ ({}x{} vs {}x{})",
            processed.width(),
            processed.height(),
            original.width(),
            original.height(),
        );
        return ExitCode::FAILURE;
    }

    // Bench runs with a neutral (untouched) mask: this exercises the
    // slider-driven steps, which are the hot path.
    let mask = GrayAlphaImage::new(processed.width(), processed.height());

    eprintln!(
        "Processed: {} | Original: {}",
        cli.processed_path.display(),
        cli.original_path.display(),
    );
    eprintln!("Params: {params:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (preview, diagnostics) =
            recomposite_with_diagnostics(&processed, &original, &mask, &params, &StdClock);

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        // Write the preview on the first run only.
        if run == 0
            && let Some(ref out_path) = cli.out
        {
            match raster::encode_png(&preview) {
                Ok(png) => match std::fs::write(out_path, &png) {
                    Ok(()) => {
                        eprintln!(
                            "Preview written to {} ({} bytes)",
                            out_path.display(),
                            png.len(),
                        );
                    }
                    Err(e) => {
                        eprintln!("Error writing preview to {}: {e}", out_path.display());
                    }
                },
                Err(e) => {
                    eprintln!("Error encoding preview: {e}");
                }
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Read and decode an image file into an RGBA buffer.
fn read_rgba(path: &std::path::Path) -> Result<RgbaImage, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    raster::decode_rgba(&bytes).map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a step duration from diagnostics.
type StepExtractor = fn(&ReprocessDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[ReprocessDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-step means.
    println!();
    println!("{:<20} {:>12}", "Step", "Mean (ms)");
    println!("{}", "-".repeat(36));

    let step_extractors: &[(&str, StepExtractor)] = &[
        ("Sensitivity", |d| d.sensitivity.duration),
        ("Edge Refinement", |d| d.edge_refinement.duration),
        ("Mask Intent", |d| d.mask_intent.duration),
    ];

    for (name, extractor) in step_extractors {
        let step_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<20} {step_mean:>10.3}ms");
    }
}
