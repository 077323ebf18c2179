// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Credentials and token refresh

mod refresh;
mod tokens;

pub use refresh::RefreshCoordinator;
pub use tokens::{Credentials, TokenManager};
