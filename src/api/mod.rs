//! Authenticated HTTP client for the court operations backend

pub mod auth;
pub mod endpoints;
pub mod models;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{normalize_base_url, ApiConfig};
use crate::credentials::CredentialStore;
use crate::error::ClientError;

/// One outbound call: a path relative to the base URL plus method, body, and headers
#[derive(Debug, Clone)]
pub struct RequestSpec {
    path: String,
    method: Method,
    body: Option<String>,
    headers: Vec<(String, String)>,
}

impl RequestSpec {
    /// GET request for `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::POST)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::PATCH)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Attach an already-serialized body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as the JSON request body
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ClientError> {
        let encoded = serde_json::to_string(body)
            .map_err(|e| ClientError::Parse(format!("failed to encode request body: {}", e)))?;
        Ok(self.body(encoded))
    }

    /// Extra header; a caller-supplied Content-Type replaces the JSON default
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method_ref(&self) -> &Method {
        &self.method
    }
}

/// Client bound to one base URL and one credential store
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl ApiClient {
    /// Create a client with the transport's default (unbounded) timeout
    pub fn new(base_url: &str, credentials: CredentialStore) -> Self {
        Self {
            http: Client::new(),
            base_url: normalize_base_url(base_url),
            credentials,
        }
    }

    /// Create a client whose every request is bounded by `timeout`
    pub fn with_timeout(
        base_url: &str,
        credentials: CredentialStore,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::network)?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
            credentials,
        })
    }

    pub fn from_config(config: &ApiConfig, credentials: CredentialStore) -> Result<Self, ClientError> {
        Self::with_timeout(&config.resolved_base_url(), credentials, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base endpoint report links are composed against
    pub fn reports_base(&self) -> String {
        format!("{}/reports", self.base_url)
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Absolute URL for a relative path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// `Authorization` value for the stored token, if there is one
    pub(crate) fn bearer_header(&self) -> Option<HeaderValue> {
        let token = self.credentials.get()?;
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Stored token is not a valid header value; sending request without it");
                None
            }
        }
    }

    fn build_headers(&self, extra: &[(String, String)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in extra {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Skipping invalid request header '{}'", name),
            }
        }

        if let Some(auth) = self.bearer_header() {
            headers.insert(AUTHORIZATION, auth);
        }
        headers
    }

    /// Issue `spec` and decode a successful JSON body as `T`
    pub async fn request<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, ClientError> {
        let url = self.url(&spec.path);
        let headers = self.build_headers(&spec.headers);

        let mut builder = self.http.request(spec.method.clone(), &url).headers(headers);
        if let Some(body) = spec.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            debug!("{} {} failed before a response: {}", spec.method, spec.path, e);
            ClientError::from(e)
        })?;

        let status = response.status();
        debug!("{} {} -> {}", spec.method, spec.path, status.as_u16());
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(ClientError::from)?;
        serde_json::from_slice(&body).map_err(ClientError::parse)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request(RequestSpec::get(path)).await
    }

    /// POST with an optional JSON body
    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let spec = RequestSpec::post(path);
        let spec = match body {
            Some(body) => spec.json(body)?,
            None => spec,
        };
        self.request(spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with(token: Option<&str>) -> ApiClient {
        let credentials = CredentialStore::in_memory();
        if let Some(token) = token {
            credentials.set(token);
        }
        ApiClient::new("http://localhost:8000/", credentials)
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let client = client_with(None);
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/cases/"), "http://localhost:8000/cases/");
        assert_eq!(client.reports_base(), "http://localhost:8000/reports");
    }

    #[test]
    fn test_headers_without_token() {
        let headers = client_with(None).build_headers(&[]);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_headers_with_token() {
        let headers = client_with(Some("abc.def")).build_headers(&[]);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc.def");
    }

    #[test]
    fn test_caller_overrides_content_type() {
        let extra = vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("X-Request-Source".to_string(), "console".to_string()),
        ];
        let headers = client_with(None).build_headers(&extra);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers.get("x-request-source").unwrap(), "console");
    }

    #[test]
    fn test_token_wins_over_caller_authorization() {
        let extra = vec![("Authorization".to_string(), "Basic xyz".to_string())];
        let headers = client_with(Some("tok")).build_headers(&extra);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
    }

    #[test]
    fn test_request_spec_defaults_to_get() {
        let spec = RequestSpec::new("/tickets");
        assert_eq!(spec.method_ref(), &Method::GET);
        assert_eq!(spec.path(), "/tickets");

        let spec = RequestSpec::post("/tickets")
            .json(&serde_json::json!({"title": "Printer jam"}))
            .unwrap();
        assert_eq!(spec.method_ref(), &Method::POST);
        assert_eq!(spec.body.as_deref(), Some(r#"{"title":"Printer jam"}"#));
    }
}
