// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request/response interception
//!
//! Interceptors run around every exchange the client performs.

mod interceptor_trait;

pub use interceptor_trait::{
    Exchange, FnInterceptor, HeaderInjector, Interceptor, InterceptorChain, LoggingInterceptor,
    NoopInterceptor,
};
