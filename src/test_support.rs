use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;

use crate::services::http_fetcher::{HttpFetcher, RetryPolicy};
use crate::services::response_cache::ResponseCache;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn temp_cache_dir() -> PathBuf {
    std::env::temp_dir().join(format!("pv-visualizer-test-{}", uuid::Uuid::new_v4()))
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(4))
}

pub fn fetcher(cache_dir: PathBuf) -> HttpFetcher {
    let cache = ResponseCache::new(cache_dir, Duration::from_secs(3600));
    HttpFetcher::new(Duration::from_secs(5), cache, fast_retry()).unwrap()
}

#[derive(Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
