//! Stream URL providers
//!
//! Stream URLs are usually short-lived (signed, tokenized), so a fresh base
//! URL is requested before every re-acquisition.

use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;

/// Source of fresh base stream URLs
#[async_trait]
pub trait StreamUrlProvider: Send + Sync {
    async fn stream_url(&self) -> Result<String>;
}

/// Always returns the same URL
#[derive(Debug, Clone)]
pub struct StaticUrl(String);

impl StaticUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

#[async_trait]
impl StreamUrlProvider for StaticUrl {
    async fn stream_url(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Provider backed by an async closure
pub struct FnUrlProvider<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> StreamUrlProvider for FnUrlProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn stream_url(&self) -> Result<String> {
        (self.f)().await
    }
}

/// Provider backed by a synchronous closure
pub struct SyncFnUrlProvider<F> {
    f: F,
}

#[async_trait]
impl<F> StreamUrlProvider for SyncFnUrlProvider<F>
where
    F: Fn() -> Result<String> + Send + Sync,
{
    async fn stream_url(&self) -> Result<String> {
        (self.f)()
    }
}

/// Wrap an async closure as a provider
pub fn from_fn<F, Fut>(f: F) -> FnUrlProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    FnUrlProvider { f }
}

/// Wrap a synchronous closure as a provider
pub fn from_sync_fn<F>(f: F) -> SyncFnUrlProvider<F>
where
    F: Fn() -> Result<String> + Send + Sync,
{
    SyncFnUrlProvider { f }
}
