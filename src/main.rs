//! `orientcrop` CLI - crop images to model input size and run batched predictions.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orientcrop::image::{save_image, ColorMode, CropMethod, ImageSpec, ImageTransformer, Interpolation, TargetSize};
use orientcrop::{Manifest, OnnxModel, OrientationBatchPredictor, PredictorConfig};

/// Aspect-preserving resize and crop, and orientation-aware batched inference.
#[derive(Parser, Debug)]
#[command(name = "orientcrop")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resize and crop a single image.
    Transform {
        /// Input image path.
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output image path.
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Target size as HEIGHTxWIDTH. Omit to keep the native size.
        #[arg(short, long, value_name = "HxW")]
        size: Option<TargetSize>,

        /// Interpolation and crop, e.g. "bicubic:center_full" or "lanczos:random".
        #[arg(short, long, default_value = "nearest", value_name = "INTERP[:CROP]")]
        method: String,

        /// Pixel format: grayscale, rgb or rgba.
        #[arg(long, default_value = "rgb", value_name = "MODE")]
        color_mode: ColorMode,

        /// Output JPEG quality (1-100).
        #[arg(short, long, default_value = "95", value_name = "INT")]
        quality: u8,

        /// Random seed for reproducible random crops.
        #[arg(long, value_name = "INT")]
        seed: Option<u64>,
    },

    /// Run a model over every image in a manifest.
    Predict {
        /// JSON manifest listing the images.
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,

        /// Directory holding the images named in the manifest.
        #[arg(long, value_name = "DIR")]
        images: PathBuf,

        /// ONNX model file.
        #[arg(long, value_name = "FILE")]
        model: PathBuf,

        /// Write JSON lines here instead of stdout.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Interpolation method.
        #[arg(long, default_value = "bicubic", value_name = "NAME")]
        interpolation: Interpolation,

        /// Crop method.
        #[arg(long, default_value = "center_full", value_name = "NAME")]
        crop: CropMethod,

        /// Random seed for reproducible random crops.
        #[arg(long, value_name = "INT")]
        seed: Option<u64>,
    },
}

/// One line of `predict` output.
#[derive(Serialize)]
struct PredictionLine<'a> {
    index: usize,
    filename: &'a str,
    prediction: Vec<f32>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("orientcrop={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();

    let result = match args.command {
        Command::Transform {
            input,
            output,
            size,
            method,
            color_mode,
            quality,
            seed,
        } => transform(&input, &output, size, &method, color_mode, quality, seed),
        Command::Predict {
            manifest,
            images,
            model,
            output,
            interpolation,
            crop,
            seed,
        } => predict(&manifest, &images, &model, output.as_deref(), interpolation, crop, seed),
    };

    if let Err(err) = result {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn transform(
    input: &Path,
    output: &Path,
    size: Option<TargetSize>,
    method: &str,
    color_mode: ColorMode,
    quality: u8,
    seed: Option<u64>,
) -> Result<()> {
    if !(1..=100).contains(&quality) {
        anyhow::bail!("JPEG quality must be between 1 and 100, got {quality}");
    }

    let spec = ImageSpec::from_token(input, size, color_mode, method).context("Invalid transform")?;
    let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

    let img = ImageTransformer::new()
        .transform(&spec, &mut rng)
        .context("Failed to transform image")?;
    save_image(&img, output, quality).context("Failed to save image")?;

    println!(
        "Successfully processed {} -> {} ({}x{})",
        input.display(),
        output.display(),
        img.height(),
        img.width()
    );

    Ok(())
}

fn predict(
    manifest_path: &Path,
    image_dir: &Path,
    model_path: &Path,
    output: Option<&Path>,
    interpolation: Interpolation,
    crop: CropMethod,
    seed: Option<u64>,
) -> Result<()> {
    let manifest = Manifest::from_path(manifest_path).context("Failed to read manifest")?;
    let records = manifest.records(image_dir).context("Failed to build records")?;

    let config = PredictorConfig {
        interpolation,
        crop,
        seed,
        ..PredictorConfig::default()
    };
    let predictor = OrientationBatchPredictor::new(config).context("Failed to initialize predictor")?;
    let mut model = OnnxModel::load(model_path).context("Failed to load model")?;

    let predictions = predictor
        .predict(&records, &mut model)
        .context("Prediction failed")?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for record in &records {
        let row = predictions.index_axis(Axis(0), record.index);
        let filename = record.image.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let line = PredictionLine {
            index: record.index,
            filename,
            prediction: row.iter().copied().collect(),
        };
        serde_json::to_writer(&mut writer, &line)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} predictions", records.len());
    Ok(())
}
