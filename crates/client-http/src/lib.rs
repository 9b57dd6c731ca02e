// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP request wrapper whose requests, responses and failures are logged
//! through [`client_logger::Logger`] and surfaced to the user through a
//! [`Notifier`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod error;
pub mod interceptor;
pub mod notifier;
pub mod report;

pub use client::{ApiClient, ApiClientConfig, Download};
pub use error::{ApiError, HttpFailure};
pub use interceptor::{
    InterceptorId, RequestInterceptor, RequestParts, ResponseInterceptor, ResponseParts,
};
pub use notifier::{Notifier, TracingNotifier};
pub use report::report_api_error;
