// Request environment construction
//
// The base attributes (address, host, port, method) are fixed once per run;
// the per-request attributes are rebuilt from a descriptor before every
// dispatch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::session::SessionHandle;
use crate::spec::RequestDescriptor;

/// Cookie name the session identifier travels under
pub const SESSION_COOKIE_NAME: &str = "_session_id";

/// Per-run request attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBase {
    pub remote_addr: String,
    pub http_host: String,
    pub server_port: String,
    pub relative_url_root: String,
}

impl Default for RequestBase {
    fn default() -> Self {
        Self {
            remote_addr: "127.0.0.1".to_string(),
            http_host: "127.0.0.1".to_string(),
            server_port: "80".to_string(),
            relative_url_root: String::new(),
        }
    }
}

/// Everything the dispatcher needs to handle one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvironment {
    pub remote_addr: String,
    pub http_host: String,
    pub server_port: String,
    pub request_method: String,
    pub request_uri: String,
    pub query_string: String,
    pub content_length: usize,
    pub http_cookie: String,
}

impl RequestEnvironment {
    /// The environment as CGI variables, for targets that read them by name
    pub fn cgi_variables(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("REMOTE_ADDR", self.remote_addr.clone()),
            ("HTTP_HOST", self.http_host.clone()),
            ("SERVER_PORT", self.server_port.clone()),
            ("REQUEST_METHOD", self.request_method.clone()),
            ("REQUEST_URI", self.request_uri.clone()),
            ("QUERY_STRING", self.query_string.clone()),
            ("CONTENT_LENGTH", self.content_length.to_string()),
            ("HTTP_COOKIE", self.http_cookie.clone()),
        ])
    }

    /// Request URI with the query string appended, if any
    pub fn path_and_query(&self) -> String {
        if self.query_string.is_empty() {
            self.request_uri.clone()
        } else {
            format!("{}?{}", self.request_uri, self.query_string)
        }
    }
}

/// Builds a fresh [`RequestEnvironment`] per dispatch
#[derive(Debug, Clone)]
pub struct EnvironmentBuilder {
    base: RequestBase,
    request_method: String,
}

impl EnvironmentBuilder {
    /// Fix the per-run defaults. Every request is a GET.
    pub fn new(base: RequestBase) -> Self {
        Self {
            base,
            request_method: "GET".to_string(),
        }
    }

    pub fn base(&self) -> &RequestBase {
        &self.base
    }

    pub fn build(&self, descriptor: &RequestDescriptor, session: &SessionHandle) -> RequestEnvironment {
        let query_string = descriptor.query_string.clone().unwrap_or_default();
        let http_cookie = if descriptor.new_session {
            String::new()
        } else {
            format!("{}={}", SESSION_COOKIE_NAME, session.session_id())
        };

        RequestEnvironment {
            remote_addr: self.base.remote_addr.clone(),
            http_host: self.base.http_host.clone(),
            server_port: self.base.server_port.clone(),
            request_method: self.request_method.clone(),
            request_uri: format!("{}{}", self.base.relative_url_root, descriptor.uri),
            content_length: query_string.len(),
            query_string,
            http_cookie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySessionStore;
    use crate::session::{SessionData, SessionManager};
    use std::sync::Arc;

    async fn session() -> SessionHandle {
        SessionManager::new(Arc::new(InMemorySessionStore::new()))
            .create_session(&SessionData::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_defaults_and_cookie() {
        let session = session().await;
        let builder = EnvironmentBuilder::new(RequestBase::default());

        let env = builder.build(&RequestDescriptor::new("/posts"), &session);

        assert_eq!(env.remote_addr, "127.0.0.1");
        assert_eq!(env.http_host, "127.0.0.1");
        assert_eq!(env.server_port, "80");
        assert_eq!(env.request_method, "GET");
        assert_eq!(env.request_uri, "/posts");
        assert_eq!(env.query_string, "");
        assert_eq!(env.content_length, 0);
        assert_eq!(env.http_cookie, format!("_session_id={}", session.session_id()));
    }

    #[tokio::test]
    async fn test_new_session_sends_empty_cookie() {
        let session = session().await;
        let builder = EnvironmentBuilder::new(RequestBase::default());

        let env = builder.build(&RequestDescriptor::new("/login").with_new_session(), &session);

        assert_eq!(env.http_cookie, "");
    }

    #[tokio::test]
    async fn test_relative_root_and_query_length() {
        let session = session().await;
        let builder = EnvironmentBuilder::new(RequestBase {
            relative_url_root: "/app".into(),
            ..RequestBase::default()
        });

        let env = builder.build(&RequestDescriptor::new("/search").with_query("q=caf%C3%A9"), &session);

        assert_eq!(env.request_uri, "/app/search");
        assert_eq!(env.query_string, "q=caf%C3%A9");
        assert_eq!(env.content_length, 11);
        assert_eq!(env.path_and_query(), "/app/search?q=caf%C3%A9");
    }

    #[tokio::test]
    async fn test_cgi_variables() {
        let session = session().await;
        let builder = EnvironmentBuilder::new(RequestBase::default());

        let vars = builder
            .build(&RequestDescriptor::new("/").with_query("a=1"), &session)
            .cgi_variables();

        assert_eq!(vars["REQUEST_URI"], "/");
        assert_eq!(vars["QUERY_STRING"], "a=1");
        assert_eq!(vars["CONTENT_LENGTH"], "3");
        assert_eq!(vars.len(), 8);
    }
}
