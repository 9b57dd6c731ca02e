// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;

use tracing::{error, info, warn};

pub const NOTIFY_TARGET: &str = "client_http::notify";

/// User-facing notification surface.
///
/// Implementations decide how messages reach the user (toast, dialog,
/// terminal). The HTTP client only ever calls these methods.
pub trait Notifier: Send + Sync + Debug {
    fn error(&self, message: &str);

    fn success(&self, message: &str);

    fn warning(&self, message: &str);

    fn info(&self, message: &str);

    /// Asks the user to log in again after a 401. Returns `true` when they
    /// accept, in which case the stored token is cleared.
    fn confirm_reauthentication(&self) -> bool;

    fn show_success(&self, message: Option<&str>) {
        self.success(message.unwrap_or("Operation succeeded"));
    }

    fn show_warning(&self, message: Option<&str>) {
        self.warning(message.unwrap_or("Warning"));
    }

    fn show_info(&self, message: Option<&str>) {
        self.info(message.unwrap_or("Notice"));
    }
}

/// Notifier that writes to the local tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier {
    /// Answer given to re-authentication prompts.
    pub accept_reauthentication: bool,
}

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        error!(target: NOTIFY_TARGET, "{message}");
    }

    fn success(&self, message: &str) {
        info!(target: NOTIFY_TARGET, "{message}");
    }

    fn warning(&self, message: &str) {
        warn!(target: NOTIFY_TARGET, "{message}");
    }

    fn info(&self, message: &str) {
        info!(target: NOTIFY_TARGET, "{message}");
    }

    fn confirm_reauthentication(&self) -> bool {
        warn!(
            target: NOTIFY_TARGET,
            "Your session has expired, please log in again"
        );
        self.accept_reauthentication
    }
}
