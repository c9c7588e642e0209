use anyhow::Result;
use clap::{Arg, Command};
use dub_core::FillerLexicon;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use filler_dub::{Config, DubPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("filler-dub")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Silence filler words in a video and re-dub it with a corrected synthetic voice")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("VIDEO")
                .help("Video file to process")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("VIDEO")
                .help("Path of the dubbed video [default: final_output_video.mp4]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("TOML")
                .help("Configuration file"),
        )
        .arg(
            Arg::new("cleaned-audio")
                .long("cleaned-audio")
                .value_name("WAV")
                .help("Also save the filler-silenced audio"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .value_name("JSON")
                .help("Write a JSON run report"),
        )
        .arg(
            Arg::new("fillers")
                .long("fillers")
                .value_name("WORDS")
                .help("Comma-separated filler words (case-sensitive)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let loaded = match &config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let log_level = match &loaded {
        Ok(config) => config.output.log_level.clone(),
        Err(_) => "info".to_string(),
    };
    let verbose = matches.get_flag("verbose");
    let filter = if verbose {
        EnvFilter::new("filler_dub=debug,dub_core=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("filler_dub={0},dub_core={0},warn", log_level))
        })
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) if config_path.is_none() => {
            warn!("Failed to load config, using defaults: {:#}", e);
            Config::from_env()
        }
        Err(e) => {
            error!("❌ {:#}", e);
            std::process::exit(1);
        }
    };

    if let Some(output) = matches.get_one::<String>("output") {
        config.output.output_path = PathBuf::from(output);
    }
    if let Some(path) = matches.get_one::<String>("cleaned-audio") {
        config.output.cleaned_audio_path = Some(PathBuf::from(path));
    }
    if let Some(path) = matches.get_one::<String>("report") {
        config.output.report_path = Some(PathBuf::from(path));
    }
    if let Some(fillers) = matches.get_one::<String>("fillers") {
        config.fillers.words = FillerLexicon::parse_list(fillers);
    }

    let input = PathBuf::from(matches.get_one::<String>("input").map(String::as_str).unwrap_or_default());
    let output = config.output.output_path.clone();

    info!("🚀 Filler Dub starting...");
    info!("📁 Input: {}", input.display());
    info!("📂 Output: {}", output.display());
    info!("{}", config.summary());

    let pipeline = match DubPipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("❌ {:#}", e);
            std::process::exit(1);
        }
    };

    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupt received, cancelling...");
            cancel.cancel();
        }
    });

    match pipeline.run(&input, &output).await {
        Ok(report) => {
            info!("✅ Output: {}", report.output.display());
            info!(
                "📊 {} segments, {} fillers silenced ({:.2}s), speed ratio {:.3}",
                report.reassembly.segments,
                report.reassembly.filler_segments,
                report.reassembly.silenced_seconds,
                report.speed_ratio
            );
            for failure in &report.cleanup_failures {
                warn!("🧹 {}", failure);
            }
            Ok(())
        }
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
