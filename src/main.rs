use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mattecut::matting::{threshold_silhouette, DEFAULT_REF_SIZE, DEFAULT_THRESHOLD};
use mattecut::{
    ExecutionProvider, MattingPipeline, ModelProfile, Normalization, OutputPolicy, SizePolicy,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the matting model (ONNX file)
    #[arg(short, long)]
    model: PathBuf,

    /// Input image path
    #[arg(short, long)]
    input: PathBuf,

    /// Output PNG path (defaults to <input stem>_cutout.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the alpha matte as an 8-bit grayscale PNG
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Binarize the matte at this threshold instead of keeping soft alpha
    #[arg(long)]
    threshold: Option<f32>,

    /// Reference size for aspect-preserving model input resizing
    #[arg(long, default_value_t = DEFAULT_REF_SIZE)]
    ref_size: u32,

    /// Exact model input size as WIDTHxHEIGHT (e.g. 512x512); overrides --ref-size
    #[arg(long)]
    fixed_size: Option<String>,

    /// Channel normalization the model expects
    #[arg(long, value_enum, default_value = "signed-unit")]
    normalization: NormalizationArg,

    /// Execution provider preference
    #[arg(long, value_enum, default_value = "auto")]
    provider: ProviderArg,

    /// Write a white-on-transparent silhouette instead of the source colors
    /// (binarized at --threshold, default 0.65)
    #[arg(long)]
    silhouette: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NormalizationArg {
    /// v / 255 into [0, 1]
    ZeroOne,
    /// 2 * (v / 255) - 1 into [-1, 1]
    SignedUnit,
}

impl From<NormalizationArg> for Normalization {
    fn from(arg: NormalizationArg) -> Self {
        match arg {
            NormalizationArg::ZeroOne => Normalization::ZeroToOne,
            NormalizationArg::SignedUnit => Normalization::SignedUnit,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProviderArg {
    Auto,
    Cpu,
    Cuda,
    Tensorrt,
}

impl From<ProviderArg> for ExecutionProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Auto => ExecutionProvider::Auto,
            ProviderArg::Cpu => ExecutionProvider::Cpu,
            ProviderArg::Cuda => ExecutionProvider::Cuda,
            ProviderArg::Tensorrt => ExecutionProvider::TensorRt,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Mattecut starting");

    let profile = build_profile(&args)?;
    tracing::debug!("Model profile: {:?}", profile);

    // Load the source image
    let decode_start = Instant::now();
    let image = image::open(&args.input)
        .with_context(|| format!("Failed to open input image {}", args.input.display()))?
        .to_rgba8();
    let decode_time = decode_start.elapsed();
    tracing::info!(
        "Loaded {} ({}x{})",
        args.input.display(),
        image.width(),
        image.height()
    );

    // Load the model
    let mut pipeline = MattingPipeline::new(profile)?;
    pipeline
        .initialize(&args.model, args.provider.into())
        .context("Failed to load matting model")?;

    // Run the pipeline
    let matte_start = Instant::now();
    let cutout = pipeline.process(&image).context("Matting failed")?;
    let matte_time = matte_start.elapsed();

    // Write results
    let write_start = Instant::now();
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    if args.silhouette {
        let threshold = args.threshold.unwrap_or(DEFAULT_THRESHOLD);
        let alpha = pipeline
            .last_alpha()
            .context("No alpha map was produced")?;
        threshold_silhouette(alpha, threshold)
            .save(&output_path)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    } else {
        cutout
            .save(&output_path)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    }
    tracing::info!("Wrote {}", output_path.display());

    if let Some(mask_path) = &args.mask {
        let alpha = pipeline
            .last_alpha()
            .context("No alpha map was produced")?;
        alpha
            .to_gray_image()
            .save(mask_path)
            .with_context(|| format!("Failed to write {}", mask_path.display()))?;
        tracing::info!("Wrote matte {}", mask_path.display());
    }
    let write_time = write_start.elapsed();

    let decode_ms = decode_time.as_secs_f64() * 1000.0;
    let matte_ms = matte_time.as_secs_f64() * 1000.0;
    let write_ms = write_time.as_secs_f64() * 1000.0;
    tracing::info!(
        "Done: decode={:.1}ms, matte={:.1}ms, write={:.1}ms, total={:.1}ms",
        decode_ms,
        matte_ms,
        write_ms,
        decode_ms + matte_ms + write_ms
    );

    Ok(())
}

/// Assemble the model profile from the command line flags
fn build_profile(args: &Args) -> Result<ModelProfile> {
    let size_policy = match &args.fixed_size {
        Some(value) => {
            let (width, height) = parse_size(value)?;
            SizePolicy::Fixed { width, height }
        }
        None => SizePolicy::AspectMultipleOf32 {
            ref_size: args.ref_size,
        },
    };

    let output_policy = match args.threshold {
        Some(threshold) => OutputPolicy::Thresholded { threshold },
        None => OutputPolicy::Continuous,
    };

    Ok(ModelProfile::new(
        size_policy,
        args.normalization.into(),
        output_policy,
    ))
}

fn parse_size(value: &str) -> Result<(u32, u32)> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("invalid size '{}', expected WIDTHxHEIGHT", value))?;
    let width = w
        .trim()
        .parse()
        .with_context(|| format!("invalid width in '{}'", value))?;
    let height = h
        .trim()
        .parse()
        .with_context(|| format!("invalid height in '{}'", value))?;
    Ok((width, height))
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_cutout.png", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_flag_parses_both_separators() {
        assert_eq!(parse_size("512x512").unwrap(), (512, 512));
        assert_eq!(parse_size("640X480").unwrap(), (640, 480));
        assert_eq!(parse_size(" 320 x 240 ").unwrap(), (320, 240));
        assert!(parse_size("512").is_err());
        assert!(parse_size("ax512").is_err());
    }

    #[test]
    fn default_output_sits_next_to_the_input() {
        assert_eq!(
            default_output_path(Path::new("/photos/me.jpg")),
            PathBuf::from("/photos/me_cutout.png")
        );
    }
}
