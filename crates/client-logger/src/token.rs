// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::sync::{Arc, RwLock};

/// Source of the bearer token attached to outbound requests.
///
/// Read on every request, so a token set or cleared at runtime applies to the
/// next request.
pub trait TokenStore: Send + Sync + Debug {
    fn token(&self) -> Option<String>;

    fn set_token(&self, token: String);

    fn clear(&self);

    /// `Bearer <token>` when a non-empty token is present.
    fn authorization(&self) -> Option<String> {
        self.token()
            .filter(|token| !token.is_empty())
            .map(|token| format!("Bearer {token}"))
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new(token: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            token: RwLock::new(token),
        })
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        #[allow(clippy::expect_used)]
        self.token.read().expect("lock poisoned").clone()
    }

    fn set_token(&self, token: String) {
        #[allow(clippy::expect_used)]
        let mut guard = self.token.write().expect("lock poisoned");
        *guard = Some(token);
    }

    fn clear(&self) {
        #[allow(clippy::expect_used)]
        let mut guard = self.token.write().expect("lock poisoned");
        *guard = None;
    }
}

impl Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryTokenStore")
    }
}
