// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Credential storage

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Current credential pair
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token attached to authenticated requests
    pub access_token: Option<String>,
    /// Token exchanged for a new pair by the refresh endpoint
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// In-memory token store shared by the request builder and the refresh coordinator
#[derive(Clone, Default)]
pub struct TokenManager {
    credentials: Arc<RwLock<Credentials>>,
}

impl TokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new access token and, optionally, a refresh token
    ///
    /// Passing `None` for the refresh token clears any stored one.
    pub fn set_tokens(&self, access_token: impl Into<String>, refresh_token: Option<String>) {
        let mut credentials = self.credentials.write();
        credentials.access_token = Some(access_token.into());
        credentials.refresh_token = refresh_token;
    }

    /// Forget all credentials
    pub fn clear_tokens(&self) {
        *self.credentials.write() = Credentials::default();
    }

    pub fn access_token(&self) -> Option<String> {
        self.credentials.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.credentials.read().refresh_token.clone()
    }

    pub fn has_access_token(&self) -> bool {
        self.credentials.read().access_token.is_some()
    }

    /// Snapshot of both tokens
    pub fn credentials(&self) -> Credentials {
        self.credentials.read().clone()
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenManager").field(&*self.credentials.read()).finish()
    }
}
