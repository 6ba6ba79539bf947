use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;

use yuvpsnr_core::config::{config_path, AppConfig};
use yuvpsnr_core::convert::{self, ConversionRequest};
use yuvpsnr_core::logging::{self, LoggingInitOptions, DEFAULT_LOG_FILTER};
use yuvpsnr_core::session::{self, ComparisonRequest, PsnrSummary};

#[derive(Parser, Debug)]
#[command(
    name = "yuvpsnr",
    about = "PSNR between two raw YUV files",
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    compare: CompareArgs,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Increase log verbosity (-v: debug, -vv: trace)"
    )]
    verbose: u8,

    #[arg(
        long = "log-filter",
        value_name = "FILTER",
        global = true,
        help = "Explicit tracing filter (overrides RUST_LOG and -v)"
    )]
    log_filter: Option<String>,

    #[arg(
        long = "config",
        value_name = "PATH",
        global = true,
        help = "TOML config file (defaults to $YUVPSNR_CONFIG)"
    )]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompareArgs {
    #[arg(required = true, help = "Reference YUV file")]
    filename: Option<PathBuf>,
    #[arg(required = true, help = "Frame width in pixels")]
    width: Option<u32>,
    #[arg(required = true, help = "Frame height in pixels")]
    height: Option<u32>,
    #[arg(
        required = true,
        value_name = "FORMAT",
        help = "Pixel format of both files: IYUV UYVY YV12 NV12 YVYU YUY2 422"
    )]
    format: Option<String>,
    #[arg(required = true, help = "YUV file to compare against the reference")]
    filename_diff: Option<PathBuf>,
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Compare at most N frames"
    )]
    num: Option<u64>,
    #[arg(long = "format-out", value_name = "FORMAT", help = "Output pixel format")]
    format_out: Option<String>,
    #[arg(long, help = "Print the result as JSON")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite a raw YUV file in another pixel format with the same plane sizes.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    input: PathBuf,
    width: u32,
    height: u32,
    format_in: String,
    format_out: String,
    output: PathBuf,
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Convert at most N frames"
    )]
    num: Option<u64>,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before logging so its filter can take part in selection;
    // a load failure is reported once the subscriber is up.
    let config = AppConfig::load(cli.config.as_deref());
    init_logging(
        cli.verbose,
        cli.log_filter.as_deref(),
        config
            .as_ref()
            .ok()
            .and_then(|config| config.logging.filter.as_deref()),
    );
    log_startup_metadata(cli.config.as_deref());
    let config = config.context("failed to load configuration")?;

    match cli.command {
        Some(Commands::Convert(args)) => {
            if cli.compare.filename.is_some() {
                bail!("comparison arguments cannot be combined with `convert`");
            }
            run_convert(args, &config)
        }
        None => run_compare(cli.compare, &config),
    }
}

fn init_logging(verbose: u8, cli_log_filter: Option<&str>, config_log_filter: Option<&str>) {
    let options = LoggingInitOptions {
        verbose,
        cli_log_filter: cli_log_filter.map(ToString::to_string),
        rust_log_env: std::env::var("RUST_LOG").ok(),
        config_log_filter: config_log_filter.map(ToString::to_string),
        ..Default::default()
    };
    let filter = parse_env_filter_with_fallback(&logging::select_log_filter(&options));

    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter),
    );

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!(
            "Failed to initialize tracing subscriber: {error}. Continuing without structured tracing."
        );
    }
}

fn parse_env_filter_with_fallback(filter: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_new(filter).unwrap_or_else(|error| {
        eprintln!("Invalid log filter '{filter}': {error}. Falling back to '{DEFAULT_LOG_FILTER}'.");
        tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)
    })
}

fn log_startup_metadata(cli_config: Option<&Path>) {
    let cfg_path = config_path(cli_config)
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<none>".to_string());
    debug!(
        pid = std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
        config_path = %cfg_path,
        "Runtime startup metadata"
    );
}

fn comparison_request(args: &CompareArgs, config: &AppConfig) -> Result<ComparisonRequest> {
    let (Some(reference), Some(width), Some(height), Some(format), Some(distorted)) = (
        args.filename.clone(),
        args.width,
        args.height,
        args.format.clone(),
        args.filename_diff.clone(),
    ) else {
        bail!("expected <FILENAME> <WIDTH> <HEIGHT> <FORMAT> <FILENAME_DIFF>");
    };

    let mut request = ComparisonRequest::new(reference, distorted, width, height, format);
    request.format_out = args.format_out.clone();
    request.num_frames = config.frame_cap(args.num);
    request.skip_blank_frames = config.comparison.skip_blank_frames;
    Ok(request)
}

fn run_compare(args: CompareArgs, config: &AppConfig) -> Result<()> {
    let request = comparison_request(&args, config)?;
    let summary = session::run(&request).with_context(|| {
        format!(
            "failed to compare {} with {}",
            request.reference.display(),
            request.distorted.display()
        )
    })?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("failed to encode result")?;
        println!("{json}");
    } else {
        println!("{}", format_summary(&summary));
    }
    Ok(())
}

fn run_convert(args: ConvertArgs, config: &AppConfig) -> Result<()> {
    let request = ConversionRequest {
        input: args.input,
        output: args.output,
        width: args.width,
        height: args.height,
        format_in: args.format_in,
        format_out: args.format_out,
        num_frames: config.frame_cap(args.num),
    };
    let written = convert::convert(&request).with_context(|| {
        format!(
            "failed to convert {} into {}",
            request.input.display(),
            request.output.display()
        )
    })?;
    info!(frames = written, "Done");
    Ok(())
}

/// Six decimals, left-aligned in a 10-wide field.
fn format_db(value: f64) -> String {
    if value.is_nan() {
        format!("{:<10}", "nan")
    } else {
        format!("{value:<10.6}")
    }
}

fn format_summary(summary: &PsnrSummary) -> String {
    format!(
        "PSNR(Y)=         {}\nPSNR(Y,U,V)=     ( {}, {}, {})\nPSNR(composite)= {}",
        format_db(summary.y),
        format_db(summary.y),
        format_db(summary.cb),
        format_db(summary.cr),
        format_db(summary.composite),
    )
}
