// Error types for benchmark runs

use thiserror::Error;

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that can occur while preparing or executing a benchmark run
#[derive(Debug, Error)]
pub enum BenchError {
    /// Missing or invalid configuration (unset app root, bad option values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Benchmark name not present in the url spec
    #[error("There is no benchmark named '{0}'")]
    UnknownBenchmark(String),

    /// Alias resolution loops back onto itself
    #[error("Cyclic url spec: {}", .chain.join(" -> "))]
    CyclicSpec { chain: Vec<String> },

    /// Resolved url list is empty
    #[error("No urls given for benchmark '{0}'")]
    NoUrls(String),

    /// The target dispatcher failed
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Session store error
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BenchError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        BenchError::Configuration(msg.into())
    }

    /// Create a dispatch error
    pub fn dispatch(msg: impl Into<String>) -> Self {
        BenchError::Dispatch(msg.into())
    }

    /// Create a session store error
    pub fn store(msg: impl Into<String>) -> Self {
        BenchError::SessionStore(msg.into())
    }

    /// Create an unknown benchmark error
    pub fn unknown_benchmark(name: impl Into<String>) -> Self {
        BenchError::UnknownBenchmark(name.into())
    }

    /// Create a no urls error
    pub fn no_urls(name: impl Into<String>) -> Self {
        BenchError::NoUrls(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_spec_message_shows_chain() {
        let err = BenchError::CyclicSpec {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic url spec: a -> b -> a");
    }

    #[test]
    fn test_unknown_benchmark_message() {
        let err = BenchError::unknown_benchmark("home");
        assert_eq!(err.to_string(), "There is no benchmark named 'home'");
    }
}
