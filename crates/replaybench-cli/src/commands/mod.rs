// CLI subcommands

pub mod install;
pub mod list;
pub mod run;

use anyhow::{bail, Context, Result};
use replaybench_core::config::config_search_path;
use replaybench_core::{BenchmarkConfig, BenchmarkOptions, LegacyFlags};
use std::path::{Path, PathBuf};

/// First existing config file on the search path
pub fn locate_config(explicit: Option<&Path>, app_root: Option<&Path>) -> Result<PathBuf> {
    let candidates = config_search_path(explicit, app_root);
    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }

    let searched = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    bail!("no benchmark config found (searched: {})", searched)
}

/// Load and resolve the benchmark config against the legacy flags
pub fn load_config(
    explicit: Option<&Path>,
    app_root: Option<&Path>,
    flags: &LegacyFlags,
) -> Result<BenchmarkConfig> {
    let path = locate_config(explicit, app_root)?;
    tracing::debug!(path = %path.display(), "Loading benchmark config");

    let options = BenchmarkOptions::load(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    BenchmarkConfig::resolve(options, flags)
        .with_context(|| format!("invalid benchmark config in {}", path.display()))
}
