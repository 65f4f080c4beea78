// Config scaffolding for a target application
//
// Writes the sample benchmark files into the app's config directory and adds
// a `benchmarking` database environment cloned from `development`. Existing
// files and an existing `benchmarking` entry are never touched, so running the
// installer twice is harmless.

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE_NAME, URL_SPEC_FILE_NAME};
use crate::error::{BenchError, Result};

/// Database environment added by the installer
pub const BENCHMARK_ENVIRONMENT: &str = "benchmarking";

/// Keys copied from the `development` database entry
pub const DATABASE_KEYS: [&str; 5] = ["adapter", "database", "host", "username", "password"];

const SAMPLE_URL_SPEC: &str = r#"# Benchmark name -> request(s), or a comma separated list of other names
home:
  uri: /

login:
  uri: /login
  new_session: true

search:
  - uri: /search
    query_string: q=first
  - uri: /search
    query_string: q=second

all: home, login, search
"#;

const SAMPLE_CONFIG: &str = r#"# Options for replaybench runs; command-line flags fill in what is left unset.
# gc_frequency, log and perform_caching are left commented out so that
# -gcN, -log and -nocache keep working.
iterations: 100
# gc_frequency: 0
remote_addr: 127.0.0.1
http_host: 127.0.0.1
server_port: 80
relative_url_root: ""
session_data: {}
url_spec_file: benchmarks.yml
# log: false
# perform_caching: true
cache_template_loading: true
warmup: false
"#;

/// One step the installer took or skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InstallAction {
    Created { path: PathBuf },
    Skipped { path: PathBuf },
    AppendedEnvironment { path: PathBuf, environment: String },
}

/// Scaffolds benchmark config into `<app root>/config`
#[derive(Debug, Clone)]
pub struct Installer {
    config_dir: PathBuf,
    dry_run: bool,
}

impl Installer {
    /// Installer for the app at `app_root`; fails when no root is configured
    pub fn for_app_root(app_root: Option<&Path>) -> Result<Self> {
        let root = app_root.ok_or_else(|| {
            BenchError::config("REPLAYBENCH_APP_ROOT must be defined in your environment")
        })?;
        Ok(Self {
            config_dir: root.join("config"),
            dry_run: false,
        })
    }

    /// Report what would happen without writing anything
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn install(&self) -> Result<Vec<InstallAction>> {
        let mut actions = vec![
            self.install_file(URL_SPEC_FILE_NAME, SAMPLE_URL_SPEC)?,
            self.install_file(CONFIG_FILE_NAME, SAMPLE_CONFIG)?,
        ];
        if let Some(action) = self.add_database_environment()? {
            actions.push(action);
        }
        Ok(actions)
    }

    fn install_file(&self, name: &str, contents: &str) -> Result<InstallAction> {
        let path = self.config_dir.join(name);
        if path.exists() {
            return Ok(InstallAction::Skipped { path });
        }

        if !self.dry_run {
            fs::create_dir_all(&self.config_dir)?;
            fs::write(&path, contents)?;
        }
        tracing::info!(path = %path.display(), dry_run = self.dry_run, "Installed config file");
        Ok(InstallAction::Created { path })
    }

    fn add_database_environment(&self) -> Result<Option<InstallAction>> {
        let path = self.config_dir.join("database.yml");
        let contents = fs::read_to_string(&path)
            .map_err(|e| BenchError::config(format!("cannot read {}: {}", path.display(), e)))?;
        let database: Value = serde_yaml::from_str(&contents)?;

        if database.get(BENCHMARK_ENVIRONMENT).is_some() {
            return Ok(None);
        }

        let development = database.get("development").ok_or_else(|| {
            BenchError::config(format!("{} has no development entry", path.display()))
        })?;

        let mut settings = Mapping::new();
        for key in DATABASE_KEYS {
            let value = development.get(key).cloned().unwrap_or(Value::Null);
            settings.insert(Value::from(key), value);
        }
        let mut environment = Mapping::new();
        environment.insert(Value::from(BENCHMARK_ENVIRONMENT), Value::Mapping(settings));
        let block = format!("\n{}", serde_yaml::to_string(&environment)?);

        if !self.dry_run {
            let mut file = fs::OpenOptions::new().append(true).open(&path)?;
            file.write_all(block.as_bytes())?;
        }
        tracing::info!(path = %path.display(), dry_run = self.dry_run, "Created database configuration: benchmarking");

        Ok(Some(InstallAction::AppendedEnvironment {
            path,
            environment: BENCHMARK_ENVIRONMENT.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BenchmarkConfig, BenchmarkOptions, LegacyFlags};
    use crate::spec::UrlSpec;

    const DATABASE_YML: &str = "development:\n  adapter: postgresql\n  database: shop_dev\n  host: localhost\n  username: shop\n  password:\n";

    fn app_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/database.yml"), DATABASE_YML).unwrap();
        dir
    }

    #[test]
    fn test_missing_root_is_config_error() {
        assert!(matches!(
            Installer::for_app_root(None),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn test_install_writes_files_and_environment() {
        let root = app_root();
        let installer = Installer::for_app_root(Some(root.path())).unwrap();

        let actions = installer.install().unwrap();

        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], InstallAction::Created { .. }));
        let spec: UrlSpec =
            serde_yaml::from_str(&fs::read_to_string(root.path().join("config/benchmarks.yml")).unwrap())
                .unwrap();
        assert_eq!(spec.resolve("all").unwrap().len(), 4);

        let options = BenchmarkOptions::load(&root.path().join("config/benchmark_config.yml")).unwrap();
        assert_eq!(options.iterations, Some(100));
        assert!(options.url_spec.is_some());

        let database: Value =
            serde_yaml::from_str(&fs::read_to_string(root.path().join("config/database.yml")).unwrap())
                .unwrap();
        let bench = &database["benchmarking"];
        assert_eq!(bench["adapter"].as_str(), Some("postgresql"));
        assert_eq!(bench["database"].as_str(), Some("shop_dev"));
        assert_eq!(database["development"]["username"].as_str(), Some("shop"));
    }

    #[test]
    fn test_installed_config_leaves_flags_in_charge() {
        let root = app_root();
        Installer::for_app_root(Some(root.path())).unwrap().install().unwrap();

        let options = BenchmarkOptions::load(&root.path().join("config/benchmark_config.yml")).unwrap();
        let config =
            BenchmarkConfig::resolve(options, &LegacyFlags::parse(["-gc10", "-nocache", "-log"])).unwrap();

        assert_eq!(config.gc_frequency, 10);
        assert!(!config.target.perform_caching);
        assert!(config.target.log);
        assert_eq!(config.iterations, 100);
    }

    #[test]
    fn test_database_values_are_quoted() {
        let root = app_root();
        fs::write(
            root.path().join("config/database.yml"),
            "development:\n  adapter: postgresql\n  database: \"123\"\n  host: '%db'\n  username: shop\n  password: \"p: w #1\"\n",
        )
        .unwrap();

        Installer::for_app_root(Some(root.path())).unwrap().install().unwrap();

        let database: Value =
            serde_yaml::from_str(&fs::read_to_string(root.path().join("config/database.yml")).unwrap())
                .unwrap();
        let bench = &database["benchmarking"];
        assert_eq!(bench["password"].as_str(), Some("p: w #1"));
        assert_eq!(bench["database"].as_str(), Some("123"));
        assert_eq!(bench["host"].as_str(), Some("%db"));
        assert_eq!(database["development"]["password"].as_str(), Some("p: w #1"));
    }

    #[test]
    fn test_install_is_idempotent() {
        let root = app_root();
        let installer = Installer::for_app_root(Some(root.path())).unwrap();
        installer.install().unwrap();
        let database_after_first = fs::read_to_string(root.path().join("config/database.yml")).unwrap();

        let actions = installer.install().unwrap();

        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| matches!(a, InstallAction::Skipped { .. })));
        let database_after_second = fs::read_to_string(root.path().join("config/database.yml")).unwrap();
        assert_eq!(database_after_first, database_after_second);
    }

    #[test]
    fn test_existing_files_are_not_overwritten() {
        let root = app_root();
        fs::write(root.path().join("config/benchmarks.yml"), "mine:\n  uri: /mine\n").unwrap();

        Installer::for_app_root(Some(root.path())).unwrap().install().unwrap();

        let contents = fs::read_to_string(root.path().join("config/benchmarks.yml")).unwrap();
        assert_eq!(contents, "mine:\n  uri: /mine\n");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let root = app_root();
        let installer = Installer::for_app_root(Some(root.path())).unwrap().dry_run(true);

        let actions = installer.install().unwrap();

        assert_eq!(actions.len(), 3);
        assert!(!root.path().join("config/benchmarks.yml").exists());
        let database = fs::read_to_string(root.path().join("config/database.yml")).unwrap();
        assert_eq!(database, DATABASE_YML);
    }
}
