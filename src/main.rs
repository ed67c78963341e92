use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use switches::AppConfig;

#[derive(Parser)]
#[command(name = "switches", about = "Turn every switch back into place")]
struct Cli {
    /// Scene-description file with the switch model (.stl or .usda)
    #[arg(long, default_value = "assets/switch.stl")]
    asset: PathBuf,

    /// Seed for the deals; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("switches starting");

    switches::run(
        AppConfig::new()
            .size(cli.width, cli.height)
            .asset(cli.asset)
            .seed(cli.seed),
    )
}
