//! HTTP transport seam and its reqwest implementation.
//!
//! A [`Transport`] only moves bytes: it reports every HTTP status as a
//! response and fails only when no response arrived. Status handling and
//! authentication live in the gateway.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// An outbound request, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl ApiRequest {
    /// Creates a request with no query, headers, or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a `POST` request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Sets a header, replacing any existing value.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Serializes `body` as the JSON request body.
    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let json = serde_json::to_string(body).map_err(|e| ApiError::InvalidRequest {
            reason: format!("failed to serialize request body: {e}"),
        })?;
        self.body = Some(json);
        Ok(self)
    }

    /// Sets a header in place. Header names compare case-insensitively.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the path relative to the base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns query parameters in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns all headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the serialized body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// A response with any status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl ApiResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode {
            reason: e.to_string(),
        })
    }

    /// Turns a non-success response into an error.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Sends requests to the API.
#[async_trait(?Send)]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response, whatever its status.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a transport for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the base URL does not parse.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        reqwest::Url::parse(&config.base_url).map_err(|e| ApiError::InvalidRequest {
            reason: format!("invalid API base URL '{}': {e}", config.base_url),
        })?;

        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::InvalidRequest {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(request.path());
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &url);
        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| ApiError::Transport {
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ApiError::Transport {
            reason: format!("failed to read response body: {e}"),
        })?;

        debug!(method = request.method().as_str(), %url, status, "response received");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_replace_case_insensitively() {
        let request = ApiRequest::get("/questions/")
            .with_header("Authorization", "Bearer one")
            .with_header("authorization", "Bearer two");

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer two"));
    }

    #[test]
    fn query_values_are_stringified() {
        let request = ApiRequest::get("/questions/")
            .with_query("skip", 20)
            .with_query("limit", 10);

        assert_eq!(
            request.query(),
            &[
                ("skip".to_string(), "20".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        );
    }

    #[test]
    fn error_for_status_keeps_body() {
        let err = ApiResponse::new(404, "missing").error_for_status().unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 404,
                body: "missing".to_string()
            }
        );
        assert!(ApiResponse::new(204, "").error_for_status().is_ok());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ReqwestTransport::new(&ApiConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest { .. }));
    }

    #[test]
    fn paths_join_base_url() {
        let transport = ReqwestTransport::new(&ApiConfig::new("http://localhost:8000/")).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000");
        assert_eq!(
            transport.url_for("/questions/"),
            "http://localhost:8000/questions/"
        );
        assert_eq!(
            transport.url_for("questions/"),
            "http://localhost:8000/questions/"
        );
    }
}
