pub mod config;
pub mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use config::{load_config, TasConfig};
use pipeline::Pipeline;

/// Read the documents on a Papers, Please desk.
#[derive(Parser, Debug)]
#[command(name = "papers-tas")]
#[command(about = "Reads Papers, Please documents straight off the screen")]
pub struct Args {
    /// Configuration file (TOML); defaults are used if it does not exist
    #[arg(short, long, default_value = "papers-tas.toml")]
    pub config: PathBuf,

    /// Override the asset directory from the config
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Scan a saved screenshot instead of capturing the game window
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Document variant to read, skipping identification
    #[arg(long)]
    pub document: Option<String>,

    /// Left edge of the document in the screenshot
    #[arg(long, default_value = "0")]
    pub origin_x: u32,

    /// Top edge of the document in the screenshot
    #[arg(long, default_value = "0")]
    pub origin_y: u32,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn init_tracing(config: &TasConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();
}

pub fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    init_tracing(&config);

    let pipeline = Pipeline::from_config(&config)?;

    let screenshot = match &args.image {
        Some(path) => image::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .to_rgb8(),
        None => pipeline.capture()?,
    };
    info!("Screenshot {}x{}", screenshot.width(), screenshot.height());

    let report = pipeline.scan_image(
        &screenshot,
        (args.origin_x, args.origin_y),
        args.document.as_deref(),
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({})", report.variant, report.kind.map_or("unknown", |k| k.as_str()));
    for (field, outcome) in &report.fields {
        match outcome {
            pp_state::FieldOutcome::Ok(value) => println!("  {field}: {value}"),
            pp_state::FieldOutcome::Err(e) => println!("  {field}: ERROR {e}"),
        }
    }
    if let Some(forged) = report.forged {
        println!("  forged: {forged}");
    }
    if let Some((x, y)) = report.seal_position {
        println!("  seal at: ({x}, {y})");
    }
    Ok(())
}
