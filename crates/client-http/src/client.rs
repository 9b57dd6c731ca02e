// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP request wrapper.
//!
//! Every request goes through the same pipeline:
//!
//! ```text
//!   RequestParts ── log "API request" ── attach bearer token ── user interceptors
//!        │
//!        v  reqwest
//!   2xx ──── log "API response" ── user response interceptors ── Ok(body)
//!   !2xx ─── log "API error response" ── notify ── on_error ── Err(Status)
//!   no answer ── log "API request got no response" ── notify ── Err(Network)
//! ```
//!
//! Log calls go through the [`Logger`], so error responses are forwarded to
//! the backend like any other error record.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use client_logger::{Logger, TokenStore};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{multipart, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ApiError, HttpFailure};
use crate::interceptor::{
    InterceptorId, Interceptors, RequestInterceptor, RequestMeta, RequestParts,
    ResponseInterceptor, ResponseParts,
};
use crate::notifier::Notifier;
use crate::report::report_api_error;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
const FALLBACK_FILE_NAME: &str = "download";

lazy_static! {
    /// Quoted file name in a `Content-Disposition` header.
    static ref DISPOSITION_FILE_NAME: Option<Regex> = Regex::new(r#"filename="(.+)""#).ok();
}

pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub logger: Logger,
    pub notifier: Arc<dyn Notifier>,
    pub token_store: Option<Arc<dyn TokenStore>>,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(logger: Logger, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            logger,
            notifier,
            token_store: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Settings {
    base_url: String,
    timeout: Duration,
    headers: HeaderMap,
}

/// A downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

enum Body {
    Empty,
    Json(Value),
    File { file_name: String, bytes: Vec<u8> },
}

struct Received {
    parts: ResponseParts,
    bytes: Vec<u8>,
}

pub struct ApiClient {
    http: reqwest::Client,
    settings: RwLock<Settings>,
    logger: Logger,
    notifier: Arc<dyn Notifier>,
    token_store: Option<Arc<dyn TokenStore>>,
    request_interceptors: RwLock<Interceptors<dyn RequestInterceptor>>,
    response_interceptors: RwLock<Interceptors<dyn ResponseInterceptor>>,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build http client: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            http,
            settings: RwLock::new(Settings {
                base_url: config.base_url,
                timeout: config.timeout,
                headers,
            }),
            logger: config.logger,
            notifier: config.notifier,
            token_store: config.token_store,
            request_interceptors: RwLock::new(Interceptors::default()),
            response_interceptors: RwLock::new(Interceptors::default()),
        })
    }

    pub async fn get(&self, path: &str, params: Option<Value>) -> Result<Value, ApiError> {
        self.execute(Method::GET, path, params, Body::Empty, false)
            .await
            .map(|r| r.parts.body)
    }

    /// GET, decoding the body into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<Value>,
    ) -> Result<T, ApiError> {
        let body = self.get(path, params).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.execute(Method::POST, path, None, Body::Json(body), false)
            .await
            .map(|r| r.parts.body)
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.execute(Method::PUT, path, None, Body::Json(body), false)
            .await
            .map(|r| r.parts.body)
    }

    pub async fn delete(&self, path: &str, params: Option<Value>) -> Result<Value, ApiError> {
        self.execute(Method::DELETE, path, params, Body::Empty, false)
            .await
            .map(|r| r.parts.body)
    }

    /// POSTs `bytes` as the multipart field `file`.
    pub async fn upload(
        &self,
        path: &str,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Value, ApiError> {
        let body = Body::File {
            file_name: file_name.into(),
            bytes,
        };
        self.execute(Method::POST, path, None, body, false)
            .await
            .map(|r| r.parts.body)
    }

    /// GETs a file. The name comes from `Content-Disposition: filename="..."`,
    /// falling back to `download`.
    pub async fn download(&self, path: &str, params: Option<Value>) -> Result<Download, ApiError> {
        let received = self
            .execute(Method::GET, path, params, Body::Empty, true)
            .await?;
        Ok(Download {
            file_name: file_name_from_headers(&received.parts.headers),
            bytes: received.bytes,
        })
    }

    pub fn set_base_url(&self, base_url: impl Into<String>) {
        self.write_settings().base_url = base_url.into();
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.write_settings().timeout = timeout;
    }

    /// Merges `headers` into the default headers sent with every request.
    pub fn set_headers(&self, headers: HeaderMap) {
        self.write_settings().headers.extend(headers);
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        self.read_settings().base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.read_settings().timeout
    }

    pub fn add_request_interceptor<I: RequestInterceptor + 'static>(
        &self,
        interceptor: I,
    ) -> InterceptorId {
        #[allow(clippy::expect_used)]
        let mut chain = self.request_interceptors.write().expect("lock poisoned");
        chain.add(Arc::new(interceptor))
    }

    pub fn add_response_interceptor<I: ResponseInterceptor + 'static>(
        &self,
        interceptor: I,
    ) -> InterceptorId {
        #[allow(clippy::expect_used)]
        let mut chain = self.response_interceptors.write().expect("lock poisoned");
        chain.add(Arc::new(interceptor))
    }

    pub fn eject_request_interceptor(&self, id: InterceptorId) -> bool {
        #[allow(clippy::expect_used)]
        let mut chain = self.request_interceptors.write().expect("lock poisoned");
        chain.eject(id)
    }

    pub fn eject_response_interceptor(&self, id: InterceptorId) -> bool {
        #[allow(clippy::expect_used)]
        let mut chain = self.response_interceptors.write().expect("lock poisoned");
        chain.eject(id)
    }

    /// Logs `error` and shows the best available message to the user.
    pub fn report_error(&self, error: &ApiError, custom_message: Option<&str>, context: Value) {
        report_api_error(
            &self.logger,
            self.notifier.as_ref(),
            error,
            custom_message,
            context,
        );
    }

    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        params: Option<Value>,
        body: Body,
        binary: bool,
    ) -> Result<Received, ApiError> {
        let settings = self.read_settings();
        let mut request = RequestParts {
            method,
            url: join_url(&settings.base_url, path),
            headers: settings.headers.clone(),
            params,
            body: match &body {
                Body::Empty => None,
                Body::Json(value) => Some(value.clone()),
                Body::File { file_name, bytes } => {
                    Some(json!({"file": file_name, "size": bytes.len()}))
                }
            },
            meta: RequestMeta::new(),
        };

        self.logger.info(
            format!("API request: {} {}", request.method, request.url),
            Some(json!({
                "requestId": request.meta.request_id,
                "params": request.params.clone().unwrap_or_else(|| json!({})),
                "data": request.body.clone().unwrap_or_else(|| json!({})),
            })),
        );

        if let Some(authorization) = self.token_store.as_ref().and_then(|s| s.authorization()) {
            match HeaderValue::from_str(&authorization) {
                Ok(value) => {
                    request.headers.insert(AUTHORIZATION, value);
                }
                Err(e) => return Err(self.fail_config(&request, format!("invalid token: {e}"))),
            }
        }

        for interceptor in self.request_chain() {
            if let Err(e) = interceptor.on_request(&mut request) {
                let message = match e {
                    ApiError::Config(message) => message,
                    other => other.to_string(),
                };
                return Err(self.fail_config(&request, message));
            }
        }

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .timeout(settings.timeout);
        if let Some(params) = &request.params {
            builder = builder.query(params);
        }
        builder = match body {
            Body::Empty => builder.headers(request.headers.clone()),
            Body::Json(_) => {
                let builder = builder.headers(request.headers.clone());
                match &request.body {
                    Some(value) => builder.json(value),
                    None => builder,
                }
            }
            Body::File { file_name, bytes } => {
                // reqwest sets the multipart content type with its boundary.
                let mut headers = request.headers.clone();
                headers.remove(CONTENT_TYPE);
                let part = multipart::Part::bytes(bytes).file_name(file_name);
                builder
                    .headers(headers)
                    .multipart(multipart::Form::new().part("file", part))
            }
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Err(self.fail_config(&request, e.to_string())),
            Err(e) => return Err(self.fail_network(&request, &e)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return Err(self.fail_network(&request, &e)),
        };
        let elapsed = request.meta.elapsed();

        if !status.is_success() {
            return Err(self.fail_status(&request, status, decode_body(&bytes), elapsed));
        }

        let body = if binary {
            json!({"size": bytes.len()})
        } else {
            decode_body(&bytes)
        };
        self.logger.info(
            format!(
                "API response: {} {} - status: {} - elapsed: {}ms",
                request.method,
                request.url,
                status.as_u16(),
                elapsed.as_millis()
            ),
            Some(json!({
                "requestId": request.meta.request_id,
                "status": status.as_u16(),
                "responseTime": millis(elapsed),
                "data": body,
            })),
        );

        let mut parts = ResponseParts {
            status,
            headers,
            body,
            elapsed,
        };
        for interceptor in self.response_chain() {
            interceptor.on_response(&request, &mut parts);
        }
        Ok(Received { parts, bytes })
    }

    fn fail_status(
        &self,
        request: &RequestParts,
        status: StatusCode,
        body: Value,
        elapsed: Duration,
    ) -> ApiError {
        self.logger.error(
            format!(
                "API error response: {} {} - status: {}",
                request.method,
                request.url,
                status.as_u16()
            ),
            Some(
                json!({
                    "requestId": request.meta.request_id,
                    "method": request.method.as_str(),
                    "url": request.url,
                    "status": status.as_u16(),
                    "data": body,
                    "responseTime": millis(elapsed),
                })
                .into(),
            ),
        );
        self.finish_failure(request, ApiError::Status { status, body })
    }

    fn fail_network(&self, request: &RequestParts, err: &reqwest::Error) -> ApiError {
        self.logger.error(
            "API request got no response",
            Some(
                json!({
                    "requestId": request.meta.request_id,
                    "method": request.method.as_str(),
                    "url": request.url,
                    "error": err.to_string(),
                })
                .into(),
            ),
        );
        self.finish_failure(request, ApiError::Network(err.to_string()))
    }

    fn fail_config(&self, request: &RequestParts, message: String) -> ApiError {
        self.logger.error(
            format!("API request configuration error: {message}"),
            Some(
                json!({
                    "requestId": request.meta.request_id,
                    "method": request.method.as_str(),
                    "url": request.url,
                })
                .into(),
            ),
        );
        self.finish_failure(request, ApiError::Config(message))
    }

    fn finish_failure(&self, request: &RequestParts, error: ApiError) -> ApiError {
        match error.failure() {
            HttpFailure::Unauthorized => {
                if self.notifier.confirm_reauthentication() {
                    if let Some(store) = &self.token_store {
                        debug!("Clearing token after re-authentication prompt");
                        store.clear();
                    }
                }
            }
            failure => {
                if let Some(message) = failure.interceptor_message() {
                    self.notifier.error(&message);
                }
            }
        }

        for interceptor in self.response_chain() {
            interceptor.on_error(request, &error);
        }
        error
    }

    fn request_chain(&self) -> Vec<Arc<dyn RequestInterceptor>> {
        #[allow(clippy::expect_used)]
        self.request_interceptors
            .read()
            .expect("lock poisoned")
            .snapshot()
    }

    fn response_chain(&self) -> Vec<Arc<dyn ResponseInterceptor>> {
        #[allow(clippy::expect_used)]
        self.response_interceptors
            .read()
            .expect("lock poisoned")
            .snapshot()
    }

    fn read_settings(&self) -> Settings {
        #[allow(clippy::expect_used)]
        self.settings.read().expect("lock poisoned").clone()
    }

    fn write_settings(&self) -> std::sync::RwLockWriteGuard<'_, Settings> {
        #[allow(clippy::expect_used)]
        self.settings.write().expect("lock poisoned")
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// JSON when the body parses, the raw text otherwise, `null` when empty.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn file_name_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(file_name_from_disposition)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

fn file_name_from_disposition(disposition: &str) -> Option<String> {
    DISPOSITION_FILE_NAME
        .as_ref()?
        .captures(disposition)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
