//! Article persistence.
//!
//! Every backend implements [`ArticleStore`]. Each operation acquires its own
//! connection, performs one logical step, and releases the connection before
//! returning, whatever the outcome.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::types::Article;

/// Failure of a single store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No article is stored under the requested title
    NotFound,
    /// The backend could not be reached, failed mid-operation or timed out
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => f.write_str("article not found"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence contract for articles.
///
/// Titles are not validated here; callers must only pass titles that have
/// already been accepted by [`crate::title::is_valid_title`].
#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    /// Store `body` under `title`, replacing any previous body
    async fn save(&self, title: &str, body: &str) -> Result<(), StoreError>;

    /// Fetch the article stored under `title`
    async fn load(&self, title: &str) -> Result<Article, StoreError>;

    /// Number of stored articles
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Wraps a store so that no single operation can run longer than `limit`.
pub struct Bounded<S> {
    inner: S,
    limit: Duration,
}

impl<S: ArticleStore> Bounded<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn run<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Store {} timed out after {}ms", op, self.limit.as_millis());
                Err(StoreError::Unavailable(format!(
                    "{} timed out after {}ms",
                    op,
                    self.limit.as_millis()
                )))
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: ArticleStore> ArticleStore for Bounded<S> {
    async fn save(&self, title: &str, body: &str) -> Result<(), StoreError> {
        self.run("save", self.inner.save(title, body)).await
    }

    async fn load(&self, title: &str) -> Result<Article, StoreError> {
        self.run("load", self.inner.load(title)).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.run("count", self.inner.count()).await
    }
}
