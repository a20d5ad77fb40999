use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gifstamp::codec::has_gif_signature;
use gifstamp::config::Config;
use gifstamp::pipeline::{status_message, suggested_filename, GifJob, Orchestrator};
use gifstamp::watermark::WatermarkDescriptor;

/// gifstamp - stamp text or image watermarks onto animated GIFs
#[derive(Parser, Debug)]
#[command(name = "gifstamp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for watermarked files (default: next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Override the configured watermark text
    #[arg(long)]
    text: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Skip the processing cache
    #[arg(long)]
    no_cache: bool,

    /// GIF, PNG, JPEG or WebP files to watermark
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).map_err(anyhow::Error::msg)?,
        None => Config::default(),
    };
    if let Some(text) = &args.text {
        config.watermark.defaults.text = text.clone();
    }
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn output_path(args: &Args, input: &Path, is_gif: bool) -> PathBuf {
    let name = suggested_filename(input, is_gif);
    match &args.output_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

fn watermark_still(
    orchestrator: &Orchestrator,
    descriptor: &WatermarkDescriptor,
    input: &Path,
    bytes: &[u8],
    target: &Path,
) -> Result<()> {
    let bitmap = image::load_from_memory(bytes)
        .with_context(|| format!("{} is neither a GIF nor a supported image", input.display()))?
        .to_rgba8();
    let stamped = orchestrator.watermark_static_image(&bitmap, descriptor)?;
    stamped
        .save_with_format(target, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    gifstamp::logging::init_subscriber(args.json_logs)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    let config = load_config(&args).context("Failed to load configuration")?;
    let descriptor = Arc::new(
        config
            .watermark
            .descriptor()
            .map_err(anyhow::Error::msg)
            .context("Invalid watermark settings")?,
    );

    tracing::info!(
        config_file = ?args.config,
        inputs = args.inputs.len(),
        kind = %descriptor.kind(),
        workers = config.pipeline.workers,
        "Configuration loaded successfully"
    );

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let orchestrator = Orchestrator::new(&config);
    let mut options = orchestrator.default_options();
    if args.no_cache {
        options.use_cache = false;
    }

    // Submit every GIF first so they share the worker pool.
    let mut pending: Vec<(PathBuf, GifJob)> = Vec::new();
    let mut failures = 0usize;

    for input in &args.inputs {
        let bytes = match std::fs::read(input) {
            Ok(bytes) => bytes,
            Err(e) => {
                println!("{}: cannot read file ({})", input.display(), e);
                failures += 1;
                continue;
            }
        };

        if has_gif_signature(&bytes) {
            let job = orchestrator.watermark_gif(bytes, descriptor.clone(), options);
            pending.push((input.clone(), job));
            continue;
        }

        let target = output_path(&args, input, false);
        match watermark_still(&orchestrator, &descriptor, input, &bytes, &target) {
            Ok(()) => println!("{}: Done -> {}", input.display(), target.display()),
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "static image failed");
                println!("{}: {:#}", input.display(), e);
                failures += 1;
            }
        }
    }

    for (input, job) in pending {
        let result = job.wait().await;
        let status = status_message(&result);

        match result {
            Ok(output) => {
                let target = output_path(&args, &input, true);
                match std::fs::write(&target, &output.bytes) {
                    Ok(()) => {
                        println!("{}: {} -> {}", input.display(), status, target.display())
                    }
                    Err(e) => {
                        tracing::warn!(
                            input = %input.display(),
                            target = %target.display(),
                            error = %e,
                            "failed to write GIF output"
                        );
                        println!(
                            "{}: cannot write {} ({})",
                            input.display(),
                            target.display(),
                            e
                        );
                        failures += 1;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "GIF job failed");
                println!("{}: {}", input.display(), status);
                failures += 1;
            }
        }
    }

    let stats = orchestrator.cache_stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate(),
        "Finished"
    );

    if failures > 0 {
        bail!("{} of {} inputs failed", failures, args.inputs.len());
    }
    Ok(())
}
