use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

use crate::error::TryOnError;

/// Source of garment reference image bytes.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TryOnError>;
}

/// Fetches reference images over HTTP.
pub struct HttpAssetFetcher {
    http: Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TryOnError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TryOnError::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TryOnError::Fetch(format!("{} returned {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TryOnError::Fetch(format!("{}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

/// Base64 encodings of reference images, keyed by URL.
///
/// Entries live for the whole process and are never recomputed once set.
/// Concurrent misses on one URL share a single fetch; a failed fetch leaves
/// the slot empty so the next call tries again.
#[derive(Default)]
pub struct EncodingCache {
    slots: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl EncodingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch(
        &self,
        url: &str,
        fetcher: &dyn AssetFetcher,
    ) -> Result<String, TryOnError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(url.to_string()).or_default().clone()
        };

        if let Some(encoded) = slot.get() {
            metrics::counter!("tryon_asset_cache_hits_total").increment(1);
            tracing::debug!(url, "Reference image cache hit");
            return Ok(encoded.clone());
        }

        let encoded = slot
            .get_or_try_init(|| async {
                metrics::counter!("tryon_asset_cache_misses_total").increment(1);
                tracing::debug!(url, "Fetching reference image");
                let bytes = fetcher.fetch(url).await?;
                tracing::info!(url, size = bytes.len(), "Cached reference image");
                Ok::<_, TryOnError>(base64::engine::general_purpose::STANDARD.encode(bytes))
            })
            .await?;

        Ok(encoded.clone())
    }

    pub async fn contains(&self, url: &str) -> bool {
        let slots = self.slots.lock().await;
        slots.get(url).is_some_and(|slot| slot.initialized())
    }

    /// Number of populated entries.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the URL itself as the image bytes and counts calls.
    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AssetFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, TryOnError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(TryOnError::Fetch(format!("{} returned 503", url)));
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_fresh_cache_is_empty() {
        let cache = EncodingCache::new();
        assert!(tokio_test::block_on(cache.is_empty()));
        assert!(!tokio_test::block_on(cache.contains("http://a/black.png")));
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cache = EncodingCache::new();
        let fetcher = CountingFetcher::default();

        let first = cache.get_or_fetch("http://a/black.png", &fetcher).await.unwrap();
        let second = cache.get_or_fetch("http://a/black.png", &fetcher).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first,
            base64::engine::general_purpose::STANDARD.encode("http://a/black.png")
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains("http://a/black.png").await);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache = EncodingCache::new();
        let fetcher = CountingFetcher::default();

        let calls = (0..8).map(|_| cache.get_or_fetch("http://a/cream.png", &fetcher));
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.as_ref().unwrap() == results[0].as_ref().unwrap()));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_urls_fetch_separately() {
        let cache = EncodingCache::new();
        let fetcher = CountingFetcher::default();

        cache.get_or_fetch("http://a/black.png", &fetcher).await.unwrap();
        cache.get_or_fetch("http://a/maroon.png", &fetcher).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = EncodingCache::new();
        let fetcher = CountingFetcher {
            fail: true,
            ..Default::default()
        };

        let err = cache.get_or_fetch("http://a/navy.png", &fetcher).await.unwrap_err();
        assert!(matches!(err, TryOnError::Fetch(_)));
        assert!(cache.is_empty().await);

        cache.get_or_fetch("http://a/navy.png", &fetcher).await.unwrap_err();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
