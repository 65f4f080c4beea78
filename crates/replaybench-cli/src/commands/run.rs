// Benchmark run command

use crate::client::HttpDispatcher;
use crate::output::{print_field, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use replaybench_core::memory::InMemorySessionStore;
use replaybench_core::{
    BenchmarkConfig, BenchmarkRunner, IterationMode, ResourceMonitor, RunMode, RunSummary,
    SessionManager,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Benchmark name from the url spec
    pub benchmark: String,

    /// Iteration order
    #[arg(long, default_value = "per-url", value_parser = ["per-url", "mix"])]
    pub mode: String,

    /// Iterate without timing (for profilers)
    #[arg(long)]
    pub unmeasured: bool,

    /// Dispatch every url once and stop
    #[arg(long, conflicts_with = "unmeasured")]
    pub warmup_only: bool,

    /// Override the configured iteration count
    #[arg(long, short = 'n')]
    pub iterations: Option<u64>,

    /// Send requests here instead of http://<http_host>:<server_port>
    #[arg(long)]
    pub base_url: Option<String>,

    /// Keep sessions in Postgres instead of process memory
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Session table used with --database-url
    #[arg(long, default_value = replaybench_storage::DEFAULT_SESSION_TABLE)]
    pub session_table: String,
}

impl RunArgs {
    pub fn run_mode(&self) -> RunMode {
        let order = match self.mode.as_str() {
            "mix" => IterationMode::UrlMix,
            _ => IterationMode::PerUrl,
        };
        if self.warmup_only {
            RunMode::Warmup
        } else if self.unmeasured {
            RunMode::Unmeasured(order)
        } else {
            RunMode::Measured(order)
        }
    }
}

pub async fn run(mut config: BenchmarkConfig, args: RunArgs, output: OutputFormat) -> Result<()> {
    if let Some(iterations) = args.iterations {
        anyhow::ensure!(iterations > 0, "--iterations must be at least 1");
        config.iterations = iterations;
    }
    if config.gc_frequency > 0 {
        tracing::warn!(
            gc_frequency = config.gc_frequency,
            "HTTP targets cannot be told to collect; forced collections are counted but have no effect"
        );
    }

    let mut dispatcher = HttpDispatcher::new();
    if let Some(base_url) = &args.base_url {
        dispatcher = dispatcher.with_base_url(base_url.clone());
    }

    let sessions = session_manager(&args).await?;
    let monitor = Arc::new(ResourceMonitor::new());
    let profile = config.profile;
    let runner = BenchmarkRunner::new(config, Arc::new(dispatcher), sessions)
        .with_collector(monitor.clone());

    let summary = runner
        .run(&args.benchmark, args.run_mode())
        .await
        .with_context(|| format!("benchmark '{}' failed", args.benchmark))?;

    if !output.is_text() {
        return output.print_value(&summary);
    }
    print_summary(&summary);
    if profile && matches!(summary.mode, RunMode::Unmeasured(_)) {
        let usage = monitor.summary();
        print_field("Peak memory", &format!("{:.1} MB", usage.peak_rss_mb));
        print_field("Memory growth", &format!("{:.1} MB", usage.rss_growth_mb));
        print_field("Peak CPU", &format!("{:.1} %", usage.peak_cpu_percent));
    }
    Ok(())
}

async fn session_manager(args: &RunArgs) -> Result<SessionManager> {
    match &args.database_url {
        Some(url) => {
            let (store, cleanup) = replaybench_storage::connect(url, Some(&args.session_table))
                .await
                .context("failed to connect to the session database")?;
            Ok(SessionManager::new(Arc::new(store)).with_cleanup(Arc::new(cleanup)))
        }
        None => {
            let store = Arc::new(InMemorySessionStore::new());
            Ok(SessionManager::new(store.clone()).with_cleanup(store))
        }
    }
}

fn print_summary(summary: &RunSummary) {
    print_field("Benchmark", &summary.benchmark);
    print_field("Mode", &summary.mode.to_string());
    print_field("Urls", &summary.urls.to_string());
    if !matches!(summary.mode, RunMode::Warmup) {
        print_field("Iterations", &summary.iterations.to_string());
        print_field("GC frequency", &summary.gc_frequency.to_string());
    }
    if let Some(warmup) = &summary.warmup {
        print_field("Warm-up requests", &warmup.dispatches.to_string());
    }
    print_field("Requests", &summary.stats.dispatches.to_string());
    print_field("Collections", &summary.stats.forced_collections.to_string());
    print_field("Stale sessions", &summary.stale_sessions_removed.to_string());
    print_field(
        "Elapsed",
        &format!(
            "{:.3} s",
            (summary.finished_at - summary.started_at)
                .to_std()
                .map(|d| d.as_secs_f64())
                .unwrap_or_default()
        ),
    );

    if let Some(report) = &summary.report {
        println!();
        print!("{}", report.render_text());
    }
}
