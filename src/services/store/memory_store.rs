use std::collections::HashMap;

use log::debug;
use tokio::sync::RwLock;

use super::{ArticleStore, StoreError};
use crate::types::Article;

/// Process-local store; contents are lost on exit
#[derive(Default)]
pub struct MemoryStore {
    articles: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArticleStore for MemoryStore {
    async fn save(&self, title: &str, body: &str) -> Result<(), StoreError> {
        // The write guard is this operation's connection; it is released on return.
        let mut articles = self.articles.write().await;
        articles.insert(title.to_string(), body.to_string());
        debug!("Saved article '{}' in memory ({} bytes)", title, body.len());
        Ok(())
    }

    async fn load(&self, title: &str) -> Result<Article, StoreError> {
        let articles = self.articles.read().await;
        articles
            .get(title)
            .map(|body| Article::new(title, body.as_str()))
            .ok_or(StoreError::NotFound)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.articles.read().await.len() as u64)
    }
}
