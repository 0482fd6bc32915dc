use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn, Level};

use post_social::config::DEFAULT_OUTPUT_DIR_NAME;
use post_social::{
    default_targets, load_targets, run, size_probe_for, ExternalEncoder, RunConfig, SizeProbeKind,
    EXIT_SETUP_FAILURE,
};
use shared_utils::{check_tools, init_logging, LogConfig};

#[derive(Parser)]
#[command(name = "post-social")]
#[command(
    version,
    about = "Turn a folder of frame####.<ext> images into looping GIFs and MP4s sized for social platforms",
    long_about = None
)]
struct Cli {
    /// Directory holding frame0000.png, frame0001.png, ...
    #[arg(value_name = "INPUT_DIR")]
    input: PathBuf,

    /// JSON file with platform targets, replacing the built-in table
    #[arg(long, value_name = "FILE")]
    targets: Option<PathBuf>,

    /// Name of the output directory created inside INPUT_DIR
    #[arg(long, value_name = "NAME", default_value = DEFAULT_OUTPUT_DIR_NAME)]
    output_name: String,

    /// Per external call timeout
    #[arg(long, value_name = "SECS", default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    tool_timeout: u64,

    /// How artifact sizes are measured
    #[arg(long, value_enum, default_value_t = SizeProbeKind::Du)]
    size_probe: SizeProbeKind,

    /// Leave the scratch directory behind for inspection
    #[arg(long)]
    keep_scratch: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    if let Err(e) = init_logging("post_social", LogConfig::default().with_level(level)) {
        eprintln!("⚠️  Could not initialize logging: {:#}", e);
    }

    match execute(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("❌ {:#}", e);
            std::process::exit(EXIT_SETUP_FAILURE);
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<i32> {
    if cli.output_name.is_empty() || cli.output_name.contains(std::path::is_separator) {
        anyhow::bail!("--output-name must be a plain directory name, got {:?}", cli.output_name);
    }

    let targets = match &cli.targets {
        Some(path) => load_targets(path)
            .with_context(|| format!("Failed to load targets from {}", path.display()))?,
        None => default_targets(),
    };

    let config = RunConfig::with_output_name(&cli.input, &cli.output_name)
        .tool_timeout(Duration::from_secs(cli.tool_timeout))
        .size_probe(cli.size_probe)
        .keep_scratch(cli.keep_scratch);

    info!("🎞️  post-social");
    info!("   📂 Input: {}", config.input_dir.display());
    info!("   📦 Output: {}", config.output_dir.display());
    info!(
        "   🎯 Targets: {}",
        targets.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
    );

    let mut required: Vec<&str> = ExternalEncoder::REQUIRED_TOOLS.to_vec();
    if config.size_probe == SizeProbeKind::Du {
        required.push("du");
    }
    let missing: Vec<String> = check_tools(&required)
        .into_iter()
        .filter(|t| !t.is_available())
        .map(|t| t.name)
        .collect();
    if !missing.is_empty() {
        for target in &targets {
            let blocked: Vec<&str> = ExternalEncoder::tools_for(target)
                .into_iter()
                .chain((config.size_probe == SizeProbeKind::Du).then_some("du"))
                .filter(|tool| missing.iter().any(|m| m == tool))
                .collect();
            if !blocked.is_empty() {
                warn!(platform = %target.name, missing = ?blocked, "⚠️ Target cannot be produced without these tools");
            }
        }
    }

    let encoder = ExternalEncoder::new(config.tool_timeout);
    let probe = size_probe_for(config.size_probe, config.tool_timeout);
    let report = run(&config, &targets, &encoder, probe.as_ref())?;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        report.print_summary();
    }
    Ok(report.exit_code())
}
