// Benchmark configuration
//
// BenchmarkOptions is the on-disk shape (every field optional). It is resolved
// against the legacy command-line flags into a BenchmarkConfig, with the
// precedence: explicit option > flag > default.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::environment::RequestBase;
use crate::error::{BenchError, Result};
use crate::session::SessionData;
use crate::spec::UrlSpec;

/// Config file looked up in the app's config directory
pub const CONFIG_FILE_NAME: &str = "benchmark_config.yml";

/// Url spec file looked up next to the config file
pub const URL_SPEC_FILE_NAME: &str = "benchmarks.yml";

fn default_iterations() -> u64 {
    100
}

/// Options as written in `benchmark_config.yml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOptions {
    #[serde(default)]
    pub gc_frequency: Option<u64>,

    #[serde(default)]
    pub iterations: Option<u64>,

    #[serde(default)]
    pub remote_addr: Option<String>,

    #[serde(default)]
    pub http_host: Option<String>,

    /// Accepts `80` as well as `"80"`
    #[serde(default, deserialize_with = "deserialize_port")]
    pub server_port: Option<String>,

    #[serde(default)]
    pub relative_url_root: Option<String>,

    #[serde(default)]
    pub session_data: Option<SessionData>,

    /// Inline url spec; takes priority over `url_spec_file`
    #[serde(default)]
    pub url_spec: Option<UrlSpec>,

    /// Url spec file, relative to the config file's directory
    #[serde(default)]
    pub url_spec_file: Option<PathBuf>,

    #[serde(default)]
    pub log: Option<bool>,

    #[serde(default)]
    pub perform_caching: Option<bool>,

    #[serde(default)]
    pub cache_template_loading: Option<bool>,

    /// Dispatch every url once, unmeasured, before the measured run
    #[serde(default)]
    pub warmup: Option<bool>,
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    Ok(Option::<Port>::deserialize(deserializer)?.map(|port| match port {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
    }))
}

impl BenchmarkOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load options from `path`, pulling in the url spec file when the url spec
    /// is not given inline
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BenchError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut options = Self::from_yaml_str(&contents)?;

        if options.url_spec.is_none() {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            match &options.url_spec_file {
                Some(file) => {
                    let spec_path = dir.join(file);
                    let spec = std::fs::read_to_string(&spec_path).map_err(|e| {
                        BenchError::config(format!(
                            "cannot read url spec file {}: {}",
                            spec_path.display(),
                            e
                        ))
                    })?;
                    options.url_spec = Some(serde_yaml::from_str(&spec)?);
                }
                None => {
                    let spec_path = dir.join(URL_SPEC_FILE_NAME);
                    if spec_path.exists() {
                        let spec = std::fs::read_to_string(&spec_path)?;
                        options.url_spec = Some(serde_yaml::from_str(&spec)?);
                    }
                }
            }
        }
        Ok(options)
    }
}

/// Legacy single-dash flags that adjust defaults before a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyFlags {
    /// `-gcN`
    pub gc_frequency: Option<u64>,
    /// `-nocache`
    pub nocache: bool,
    /// `-log`
    pub log: bool,
    /// `-path`
    pub path: bool,
    /// `-svl`
    pub svl: bool,
}

fn gc_flag() -> &'static Regex {
    static GC_FLAG: OnceLock<Regex> = OnceLock::new();
    GC_FLAG.get_or_init(|| Regex::new(r"^-gc(\d+)$").expect("valid regex"))
}

impl LegacyFlags {
    /// Scan `args` for legacy flags, ignoring everything else
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::extract(args).0
    }

    /// Split `args` into the legacy flags and the remaining arguments
    pub fn extract<I, S>(args: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = Self::default();
        let mut rest = Vec::new();

        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "-nocache" => flags.nocache = true,
                "-log" => flags.log = true,
                "-path" => flags.path = true,
                "-svl" => flags.svl = true,
                _ => match gc_flag().captures(arg).and_then(|c| c[1].parse().ok()) {
                    Some(frequency) => flags.gc_frequency = Some(frequency),
                    None => rest.push(arg.to_string()),
                },
            }
        }

        (flags, rest)
    }
}

/// Toggles handed through to the target application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOptions {
    /// Keep the target's own logging on
    pub log: bool,
    pub perform_caching: bool,
    pub cache_template_loading: bool,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            log: false,
            perform_caching: true,
            cache_template_loading: true,
        }
    }
}

/// Fully resolved run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    pub gc_frequency: u64,
    pub iterations: u64,
    pub request_base: RequestBase,
    pub session_data: SessionData,
    pub url_spec: UrlSpec,
    pub target: TargetOptions,
    pub warmup: bool,
    /// Wrap unmeasured runs in the data collection hook
    pub profile: bool,
}

impl BenchmarkConfig {
    /// Configuration with defaults for everything but the url spec
    pub fn new(url_spec: UrlSpec) -> Self {
        Self {
            gc_frequency: 0,
            iterations: default_iterations(),
            request_base: RequestBase::default(),
            session_data: SessionData::new(),
            url_spec,
            target: TargetOptions::default(),
            warmup: false,
            profile: false,
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_gc_frequency(mut self, gc_frequency: u64) -> Self {
        self.gc_frequency = gc_frequency;
        self
    }

    pub fn with_session_data(mut self, session_data: SessionData) -> Self {
        self.session_data = session_data;
        self
    }

    pub fn with_request_base(mut self, request_base: RequestBase) -> Self {
        self.request_base = request_base;
        self
    }

    pub fn with_warmup(mut self, warmup: bool) -> Self {
        self.warmup = warmup;
        self
    }

    /// Resolve file options against legacy flags
    pub fn resolve(options: BenchmarkOptions, flags: &LegacyFlags) -> Result<Self> {
        let url_spec = options
            .url_spec
            .ok_or_else(|| BenchError::config("url_spec is required"))?;

        let iterations = options.iterations.unwrap_or_else(default_iterations);
        if iterations == 0 {
            return Err(BenchError::config("iterations must be at least 1"));
        }

        let defaults = RequestBase::default();
        let request_base = RequestBase {
            remote_addr: options.remote_addr.unwrap_or(defaults.remote_addr),
            http_host: options.http_host.unwrap_or(defaults.http_host),
            server_port: options.server_port.unwrap_or(defaults.server_port),
            relative_url_root: options
                .relative_url_root
                .unwrap_or(defaults.relative_url_root),
        };

        Ok(Self {
            gc_frequency: options
                .gc_frequency
                .or(flags.gc_frequency)
                .unwrap_or(0),
            iterations,
            request_base,
            session_data: options.session_data.unwrap_or_default(),
            url_spec,
            target: TargetOptions {
                log: options.log.unwrap_or(false) || flags.log,
                perform_caching: options.perform_caching.unwrap_or(!flags.nocache),
                cache_template_loading: options.cache_template_loading.unwrap_or(true),
            },
            warmup: options.warmup.unwrap_or(false),
            profile: flags.svl,
        })
    }
}

/// Places a config file is looked for, in order
pub fn config_search_path(explicit: Option<&Path>, app_root: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(explicit) = explicit {
        paths.push(explicit.to_path_buf());
    }
    if let Some(root) = app_root {
        paths.push(root.join("config").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}
