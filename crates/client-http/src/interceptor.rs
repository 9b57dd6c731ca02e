// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request and response interceptor chains.
//!
//! Interceptors run in registration order, after the client's built-in
//! logging and token handling. Registering returns an id that can later be
//! ejected; ids are never reused.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::ApiError;

pub type InterceptorId = usize;

const REQUEST_ID_LEN: usize = 13;
const REQUEST_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Per-request correlation data.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    pub started_at: Instant,
}

impl RequestMeta {
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: new_request_id(),
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// 13 random lowercase alphanumeric characters.
#[must_use]
pub fn new_request_id() -> String {
    let mut rng = rand::thread_rng();
    (0..REQUEST_ID_LEN)
        .map(|_| char::from(REQUEST_ID_ALPHABET[rng.gen_range(0..REQUEST_ID_ALPHABET.len())]))
        .collect()
}

/// Outbound request, as seen and modified by request interceptors.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub params: Option<Value>,
    pub body: Option<Value>,
    pub meta: RequestMeta,
}

/// Decoded response passed to response interceptors.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub elapsed: Duration,
}

pub trait RequestInterceptor: Send + Sync {
    /// Returning an error aborts the request as a configuration error.
    fn on_request(&self, request: &mut RequestParts) -> Result<(), ApiError>;
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut RequestParts) -> Result<(), ApiError> + Send + Sync,
{
    fn on_request(&self, request: &mut RequestParts) -> Result<(), ApiError> {
        self(request)
    }
}

pub trait ResponseInterceptor: Send + Sync {
    /// Called for 2xx responses. The body may be rewritten.
    fn on_response(&self, _request: &RequestParts, _response: &mut ResponseParts) {}

    /// Called for every failed request, whatever the cause.
    fn on_error(&self, _request: &RequestParts, _error: &ApiError) {}
}

impl<T: ResponseInterceptor + ?Sized> ResponseInterceptor for Arc<T> {
    fn on_response(&self, request: &RequestParts, response: &mut ResponseParts) {
        (**self).on_response(request, response);
    }

    fn on_error(&self, request: &RequestParts, error: &ApiError) {
        (**self).on_error(request, error);
    }
}

pub struct Interceptors<T: ?Sized> {
    next_id: InterceptorId,
    entries: Vec<(InterceptorId, Arc<T>)>,
}

impl<T: ?Sized> Default for Interceptors<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> Interceptors<T> {
    pub fn add(&mut self, interceptor: Arc<T>) -> InterceptorId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, interceptor));
        id
    }

    /// Returns `false` when no interceptor was registered under `id`.
    pub fn eject(&mut self, id: InterceptorId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Interceptors in registration order, detached from the registry so the
    /// chain can run without holding a lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.iter().map(|(_, i)| Arc::clone(i)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_shape() {
        let id = new_request_id();
        assert_eq!(id.len(), 13);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(id, new_request_id());
    }

    #[test]
    fn test_ids_are_not_reused_after_eject() {
        let mut chain: Interceptors<dyn RequestInterceptor> = Interceptors::default();
        let noop = |_: &mut RequestParts| -> Result<(), ApiError> { Ok(()) };

        let first = chain.add(Arc::new(noop));
        let second = chain.add(Arc::new(noop));
        assert!(chain.eject(first));
        assert!(!chain.eject(first));

        let third = chain.add(Arc::new(noop));
        assert_ne!(third, first);
        assert_ne!(third, second);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_snapshot_keeps_registration_order() {
        let mut chain: Interceptors<dyn RequestInterceptor> = Interceptors::default();
        chain.add(Arc::new(|r: &mut RequestParts| -> Result<(), ApiError> {
            r.url.push_str("/a");
            Ok(())
        }));
        chain.add(Arc::new(|r: &mut RequestParts| -> Result<(), ApiError> {
            r.url.push_str("/b");
            Ok(())
        }));

        let mut request = RequestParts {
            method: Method::GET,
            url: "http://localhost".to_string(),
            headers: HeaderMap::new(),
            params: None,
            body: None,
            meta: RequestMeta::new(),
        };
        for interceptor in chain.snapshot() {
            interceptor.on_request(&mut request).unwrap();
        }
        assert_eq!(request.url, "http://localhost/a/b");
    }
}
