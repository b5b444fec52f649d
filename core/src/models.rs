//! Model directory: the provider's model list, cached for a fixed time window.
//!
//! The cache is a plain value owned by the directory. Each call checks the
//! age of the cached list and only re-queries the provider once it is older
//! than the TTL. Failed lookups are reported but never cached, so the next
//! call after the provider comes back picks up the real list.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::client::CompletionProvider;
use crate::config::DEFAULT_MODEL_CACHE_TTL_SECS;

/// Result of a model lookup as the presentation layer sees it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelListing {
    pub names: Vec<String>,
    /// Set when the provider could not be queried; `names` is then empty
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedModels {
    fetched_at: Instant,
    names: Vec<String>,
}

impl CachedModels {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

pub struct ModelDirectory {
    provider: Arc<dyn CompletionProvider>,
    ttl: Duration,
    cache: Option<CachedModels>,
}

impl ModelDirectory {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::with_ttl(provider, Duration::from_secs(DEFAULT_MODEL_CACHE_TTL_SECS))
    }

    pub fn with_ttl(provider: Arc<dyn CompletionProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cache: None,
        }
    }

    /// Model names, served from the cache while it is fresh
    pub async fn fetch_models(&mut self) -> ModelListing {
        self.fetch_models_at(Instant::now()).await
    }

    /// Same as `fetch_models` with an explicit clock reading
    pub async fn fetch_models_at(&mut self, now: Instant) -> ModelListing {
        if let Some(cached) = &self.cache {
            if cached.is_fresh(now, self.ttl) {
                debug!(count = cached.names.len(), "Serving model list from cache");
                return ModelListing {
                    names: cached.names.clone(),
                    warning: None,
                };
            }
        }

        match self.provider.list_models().await {
            Ok(models) => {
                let names: Vec<String> = models.into_iter().map(|m| m.name).collect();
                debug!(count = names.len(), "Fetched model list from provider");
                self.cache = Some(CachedModels {
                    fetched_at: now,
                    names: names.clone(),
                });
                ModelListing {
                    names,
                    warning: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch models");
                ModelListing {
                    names: Vec::new(),
                    warning: Some(format!(
                        "Error fetching models: {}. Is Ollama running?",
                        e
                    )),
                }
            }
        }
    }

    /// Forget the cached list so the next call queries the provider
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TextStream;
    use crate::errors::{PlaygroundError, PlaygroundResult};
    use crate::types::ModelDescriptor;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl CompletionProvider for CountingProvider {
        async fn list_models(&self) -> PlaygroundResult<Vec<ModelDescriptor>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(PlaygroundError::RequestError("connection refused".to_string()));
            }
            Ok(vec![ModelDescriptor {
                name: format!("model-{}", n),
            }])
        }

        async fn stream_generate(
            &self,
            _model: &str,
            _prompt: &str,
            _cancel: CancellationToken,
        ) -> PlaygroundResult<TextStream> {
            unreachable!("model directory never generates")
        }
    }

    fn directory(provider: &Arc<CountingProvider>) -> ModelDirectory {
        ModelDirectory::with_ttl(provider.clone(), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_cached_within_ttl() {
        let provider = Arc::new(CountingProvider::default());
        let mut dir = directory(&provider);
        let start = Instant::now();

        let first = dir.fetch_models_at(start).await;
        let second = dir.fetch_models_at(start + Duration::from_secs(3599)).await;

        assert_eq!(first.names, vec!["model-0"]);
        assert_eq!(second, first);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refreshed_after_ttl() {
        let provider = Arc::new(CountingProvider::default());
        let mut dir = directory(&provider);
        let start = Instant::now();

        dir.fetch_models_at(start).await;
        let later = dir.fetch_models_at(start + Duration::from_secs(3600)).await;

        assert_eq!(later.names, vec!["model-1"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_not_cached() {
        let provider = Arc::new(CountingProvider::default());
        provider.failing.store(true, Ordering::SeqCst);
        let mut dir = directory(&provider);
        let start = Instant::now();

        let failed = dir.fetch_models_at(start).await;
        assert!(failed.names.is_empty());
        assert!(failed.warning.as_deref().unwrap().contains("Is Ollama running?"));

        provider.failing.store(false, Ordering::SeqCst);
        let recovered = dir.fetch_models_at(start + Duration::from_secs(1)).await;
        assert_eq!(recovered.names, vec!["model-1"]);
        assert_eq!(recovered.warning, None);
    }

    #[tokio::test]
    async fn test_invalidate_forces_requery() {
        let provider = Arc::new(CountingProvider::default());
        let mut dir = directory(&provider);
        let start = Instant::now();

        dir.fetch_models_at(start).await;
        dir.invalidate();
        let again = dir.fetch_models_at(start).await;

        assert_eq!(again.names, vec!["model-1"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
