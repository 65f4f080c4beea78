// Replaybench CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Legacy single-dash flags (-gcN, -nocache, -log, -path, -svl) are
//   split off before clap sees the arguments, so they can appear anywhere.
// Design Decision: Support text/json/yaml output formats for scripting.

mod client;
mod commands;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use replaybench_core::config::config_search_path;
use replaybench_core::telemetry::{init_telemetry, TelemetryConfig};
use replaybench_core::LegacyFlags;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "replaybench")]
#[command(about = "Replay named request sets against an app and time them")]
#[command(version)]
pub struct Cli {
    /// Benchmark config file
    #[arg(long, short, global = true, env = "REPLAYBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory of the target app
    #[arg(long, global = true, env = "REPLAYBENCH_APP_ROOT")]
    pub app_root: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a benchmark
    Run(commands::run::RunArgs),

    /// List the benchmarks in the url spec
    List,

    /// Write sample config files into the app's config directory
    Install {
        /// Show what would be written without touching any file
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let (flags, args) = LegacyFlags::extract(std::env::args());
    let cli = Cli::parse_from(args);

    init_telemetry(TelemetryConfig::from_env());

    if flags.path {
        for path in config_search_path(cli.config.as_deref(), cli.app_root.as_deref()) {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let output_format = output::OutputFormat::from_str(&cli.output);

    match cli.command {
        Some(Commands::Run(args)) => {
            let config =
                commands::load_config(cli.config.as_deref(), cli.app_root.as_deref(), &flags)?;
            commands::run::run(config, args, output_format).await
        }
        Some(Commands::List) => {
            let config =
                commands::load_config(cli.config.as_deref(), cli.app_root.as_deref(), &flags)?;
            commands::list::run(&config, output_format)
        }
        Some(Commands::Install { dry_run }) => {
            commands::install::run(cli.app_root.as_deref(), dry_run, output_format)
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
