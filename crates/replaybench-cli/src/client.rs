// HTTP dispatcher replaying request environments against a running app

use async_trait::async_trait;
use parking_lot::RwLock;
use replaybench_core::{BenchError, Dispatcher, RequestEnvironment, TargetOptions};
use reqwest::header::{HeaderValue, CACHE_CONTROL, COOKIE};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{uri} returned {status}")]
    Status { uri: String, status: u16 },

    #[error("Invalid header value for {name}: {value}")]
    Header { name: &'static str, value: String },
}

impl From<ClientError> for BenchError {
    fn from(err: ClientError) -> Self {
        BenchError::dispatch(err.to_string())
    }
}

/// Dispatcher that sends every environment as an HTTP GET
pub struct HttpDispatcher {
    base_url: Option<String>,
    http: reqwest::Client,
    options: RwLock<TargetOptions>,
}

impl HttpDispatcher {
    pub fn new() -> Self {
        Self {
            base_url: None,
            http: reqwest::Client::new(),
            options: RwLock::new(TargetOptions::default()),
        }
    }

    /// Send requests to `base_url` instead of `http://<host>:<port>`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Full URL for an environment
    pub fn request_url(&self, env: &RequestEnvironment) -> String {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("http://{}:{}", env.http_host, env.server_port),
        };
        format!("{}{}", base, env.path_and_query())
    }

    fn build_request(&self, env: &RequestEnvironment) -> Result<reqwest::Request, ClientError> {
        let options = *self.options.read();
        let mut request = self
            .http
            .get(self.request_url(env))
            .header("X-Forwarded-For", header_value("X-Forwarded-For", &env.remote_addr)?);

        if !env.http_cookie.is_empty() {
            request = request.header(COOKIE, header_value("Cookie", &env.http_cookie)?);
        }
        if !options.perform_caching {
            request = request.header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }

        Ok(request.build()?)
    }

    async fn send(&self, env: &RequestEnvironment) -> Result<(), ClientError> {
        let request = self.build_request(env)?;
        let response = self.http.execute(request).await?;
        let status = response.status();
        // read the body so transfer time is part of the measurement
        let body = response.bytes().await?;

        if self.options.read().log {
            tracing::info!(
                uri = %env.path_and_query(),
                status = status.as_u16(),
                bytes = body.len(),
                "Replayed request"
            );
        }

        check_status(&env.path_and_query(), status)
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn prepare(&self, options: &TargetOptions) -> replaybench_core::Result<()> {
        *self.options.write() = *options;
        tracing::debug!(
            perform_caching = options.perform_caching,
            log = options.log,
            "Prepared HTTP target"
        );
        Ok(())
    }

    async fn dispatch(&self, env: &RequestEnvironment) -> replaybench_core::Result<()> {
        self.send(env).await.map_err(BenchError::from)
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|_| ClientError::Header {
        name,
        value: value.to_string(),
    })
}

fn check_status(uri: &str, status: StatusCode) -> Result<(), ClientError> {
    // redirects count as handled; reqwest has already followed them unless capped
    if status.is_success() || status.is_redirection() {
        return Ok(());
    }
    Err(ClientError::Status {
        uri: uri.to_string(),
        status: status.as_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(uri: &str, query: &str, cookie: &str) -> RequestEnvironment {
        RequestEnvironment {
            remote_addr: "127.0.0.1".into(),
            http_host: "localhost".into(),
            server_port: "3000".into(),
            request_method: "GET".into(),
            request_uri: uri.into(),
            query_string: query.into(),
            content_length: query.len(),
            http_cookie: cookie.into(),
        }
    }

    #[test]
    fn test_request_url_from_host_and_port() {
        let dispatcher = HttpDispatcher::new();
        assert_eq!(
            dispatcher.request_url(&env("/search", "q=boots", "")),
            "http://localhost:3000/search?q=boots"
        );
    }

    #[test]
    fn test_request_url_with_base_override() {
        let dispatcher = HttpDispatcher::new().with_base_url("https://staging.example.com/");
        assert_eq!(
            dispatcher.request_url(&env("/", "", "")),
            "https://staging.example.com/"
        );
    }

    #[test]
    fn test_cookie_header_only_for_existing_session() {
        let dispatcher = HttpDispatcher::new();

        let with_cookie = dispatcher
            .build_request(&env("/", "", "_session_id=abc"))
            .unwrap();
        assert_eq!(with_cookie.headers()[COOKIE], "_session_id=abc");
        assert_eq!(with_cookie.headers()["X-Forwarded-For"], "127.0.0.1");

        let fresh = dispatcher.build_request(&env("/login", "", "")).unwrap();
        assert!(fresh.headers().get(COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_nocache_adds_cache_control() {
        let dispatcher = HttpDispatcher::new();
        let request = dispatcher.build_request(&env("/", "", "")).unwrap();
        assert!(request.headers().get(CACHE_CONTROL).is_none());

        dispatcher
            .prepare(&TargetOptions {
                perform_caching: false,
                ..TargetOptions::default()
            })
            .await
            .unwrap();

        let request = dispatcher.build_request(&env("/", "", "")).unwrap();
        assert_eq!(request.headers()[CACHE_CONTROL], "no-cache");
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status("/", StatusCode::OK).is_ok());
        assert!(check_status("/", StatusCode::FOUND).is_ok());

        let err: BenchError = check_status("/missing", StatusCode::NOT_FOUND).unwrap_err().into();
        assert!(matches!(err, BenchError::Dispatch(msg) if msg == "/missing returned 404"));
    }
}
