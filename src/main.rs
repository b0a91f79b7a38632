use clap::{Parser, Subcommand};
use pixel_squeeze::config::{self, SqueezeConfig};
use pixel_squeeze::export;
use pixel_squeeze::imaging::{RequestedFormat, RustBackend};
use pixel_squeeze::output::{self, ConsoleNotifier};
use pixel_squeeze::process::{self, Notifier};
use pixel_squeeze::search::CompressionSettings;
use pixel_squeeze::session::BatchSession;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pixel-squeeze")]
#[command(about = "Batch image compressor that searches formats and quality for the smallest output")]
#[command(long_about = "\
Batch image compressor that searches formats and quality for the smallest output

For every input image, each candidate format (AVIF, WebP, JPEG, PNG, BMP) is
encoded and the smallest result wins. With smart optimize on, lossy formats
that don't beat the original are retried at progressively lower quality.
When nothing is smaller than a JPEG/PNG/... source in its own format, the
original is kept unchanged. SVG files are minified instead.

Outputs:

  optimized/
  ├── photo_optimized.avif       # winner for photo.png
  ├── shot.jpg                   # original kept, nothing was smaller
  ├── logo.min.svg               # minified SVG
  └── photo_diff.png             # with --diffs: changed pixels in red

Limits: 20 images per batch, 100 MiB per image, 1 GiB in total.

Run 'pixel-squeeze gen-config' to generate a documented squeeze.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: squeeze.toml in the working directory, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize images (files or directories)
    Optimize(OptimizeArgs),
    /// List the output formats this build can encode
    Formats,
    /// Print a stock squeeze.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct OptimizeArgs {
    /// Image files or directories to optimize
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for optimized files and diff overlays
    #[arg(long, default_value = "optimized")]
    out: PathBuf,

    /// Output format: auto, svg, jpeg, png, webp, avif, bmp
    #[arg(long)]
    format: Option<RequestedFormat>,

    /// Quality ceiling for lossy encoders (clamped to 10-100)
    #[arg(long)]
    quality: Option<u32>,

    /// Encode each format once, without stepping quality down
    #[arg(long)]
    no_smart: bool,

    /// Write all results into this zip archive instead of the output directory
    #[arg(long)]
    zip: Option<PathBuf>,

    /// Also write each diff overlay as <stem>_diff.png
    #[arg(long)]
    diffs: bool,

    /// Write a JSON report of the batch to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Optimize(args) => {
            let config = config::load_config(cli.config.as_deref(), Path::new("."))?;
            run_optimize(&args, &config)?;
        }
        Command::Formats => {
            output::print_formats(&RustBackend::new());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Config values with command-line overrides applied.
fn resolve_settings(
    args: &OptimizeArgs,
    config: &SqueezeConfig,
) -> Result<CompressionSettings, config::ConfigError> {
    let base = config.settings()?;
    Ok(CompressionSettings::new(
        args.format.unwrap_or(base.format),
        args.quality.unwrap_or(base.quality.value()),
        base.smart_optimize && !args.no_smart,
    ))
}

fn run_optimize(args: &OptimizeArgs, config: &SqueezeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let settings = resolve_settings(args, config)?;
    let options = config.search_options();
    let notifier = ConsoleNotifier;

    let mut session = BatchSession::new(config.limits);
    let intake = process::add_inputs(&mut session, &args.inputs)?;
    for line in output::format_intake_report(&intake) {
        notifier.notify(&line, true);
    }
    if session.is_empty() {
        return Err("no images to optimize".into());
    }

    println!(
        "==> Optimizing {} image{} ({}, quality {})",
        session.len(),
        if session.len() == 1 { "" } else { "s" },
        settings.format,
        settings.quality.value()
    );
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let summary = process::process_batch(
        &mut session,
        &RustBackend::new(),
        &settings,
        &options,
        Some(tx),
    );
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;

    println!();
    output::print_results(&session, &summary);

    match &args.zip {
        Some(path) => {
            let archive = export::save_archive(&session, path)?;
            output::print_archive_summary(&archive, path);
        }
        None => {
            let written = export::save_downloads(&session, &args.out)?;
            notifier.notify(
                &format!("Wrote {} files to {}", written.len(), args.out.display()),
                false,
            );
        }
    }

    if args.diffs {
        let written = export::save_diffs(&session, &args.out)?;
        notifier.notify(
            &format!("Wrote {} diff overlays to {}", written.len(), args.out.display()),
            false,
        );
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&output::batch_report(&session, &summary))?;
        std::fs::write(path, json)?;
    }

    process::announce_summary(&summary, &notifier);
    Ok(())
}
