//! Classify materials in orthorectified images.
//!
//! Every image is classified pixel by pixel with an ONNX model, the per-image
//! probability maps are fused with the selected strategy and the fused label
//! map is written as `<output-dir>/<output-base><strategy>.tif`.
//!
//! # Usage
//!
//! ```bash
//! classify_materials --image-paths a.tif b.tif --info-paths a.tar b.IMD \
//!     --output-dir out/ --model-path materials.onnx [--cuda] [--batch-size 1024]
//! ```
//!
//! Settings may also come from a TOML or JSON file passed with `--config`;
//! command-line flags override it. Any failure is logged with its causes and
//! the process exits with status 1.

use clap::Parser;
use matclass::core::{MaterialError, MaterialResult};
use matclass::fusion::FusionStrategy;
use matclass::pipeline::{ConfigLoader, MaterialPipeline, PipelineConfig};
use matclass::utils::{error_chain, init_tracing};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "classify_materials")]
#[command(about = "Classify materials in orthorectified images and fuse the results")]
struct Args {
    /// Image paths
    #[arg(long, alias = "image_paths", num_args = 1.., required = true)]
    image_paths: Vec<PathBuf>,

    /// Metadata file for each image (.tar or .IMD), in the same order
    #[arg(long, alias = "info_paths", num_args = 1.., required = true)]
    info_paths: Vec<PathBuf>,

    /// Directory where result images will be saved
    #[arg(long, alias = "output_dir")]
    output_dir: Option<PathBuf>,

    /// Path to the ONNX model used for evaluation
    #[arg(long, alias = "model_path")]
    model_path: Option<PathBuf>,

    /// Run the model on the GPU (may need a smaller batch size)
    #[arg(long)]
    cuda: bool,

    /// Number of pixels classified at a time [default: 1024]
    #[arg(long, alias = "batch_size")]
    batch_size: Option<usize>,

    /// Fusion strategy: max_prob, mean_prob or weighted_vote [default: max_prob]
    #[arg(long)]
    strategy: Option<String>,

    /// TOML or JSON pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Prefix of the output file names
    #[arg(long)]
    output_base: Option<String>,

    /// Also write the fused per-class probabilities
    #[arg(long)]
    write_probabilities: bool,

    /// Also write a colour PNG preview of the label map
    #[arg(long)]
    preview: bool,

    /// Size of the worker thread pool
    #[arg(long)]
    threads: Option<usize>,

    /// Evaluate several images at the same time
    #[arg(long)]
    concurrent_images: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> MaterialResult<()> {
    MaterialPipeline::validate_inputs(&args.image_paths, &args.info_paths)?;
    let config = resolve_config(&args)?;
    info!(
        model = %config.classifier.model_path.display(),
        accelerator = config.classifier.use_accelerator,
        batch_size = config.batch_size,
        strategy = %config.strategy,
        "configuration resolved"
    );

    let pipeline = MaterialPipeline::from_config(&config)?;
    let outcome = pipeline.run(&args.image_paths, &args.info_paths)?;

    info!("{}", outcome.stats);
    for path in &outcome.written {
        info!(path = %path.display(), "output written");
    }
    Ok(())
}

/// Merges the optional config file with command-line overrides.
fn resolve_config(args: &Args) -> MaterialResult<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => {
            let model_path = args.model_path.clone().ok_or_else(|| {
                MaterialError::config_error("--model-path is required without --config")
            })?;
            let output_dir = args.output_dir.clone().ok_or_else(|| {
                MaterialError::config_error("--output-dir is required without --config")
            })?;
            PipelineConfig::new(model_path, output_dir)
        }
    };

    if let Some(model_path) = &args.model_path {
        config.classifier.model_path = model_path.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if args.cuda {
        config = config.with_accelerator(true);
    }
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(strategy) = &args.strategy {
        config = config.with_strategy(strategy.parse::<FusionStrategy>()?);
    }
    if let Some(base) = &args.output_base {
        config = config.with_output_base(base.clone());
    }
    config.write_probabilities |= args.write_probabilities;
    config.preview |= args.preview;
    if let Some(threads) = args.threads {
        config.parallel.max_threads = Some(threads);
    }
    config.parallel.concurrent_images |= args.concurrent_images;
    Ok(config)
}
