use std::path::PathBuf;
use std::sync::Arc;

use crate::components::{PageComposer, TemplateSet};
use crate::services::{ArticleStore, MarkdownService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub composer: PageComposer,
    pub markdown: MarkdownService,
    pub asset_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(store: Arc<dyn ArticleStore>, templates: TemplateSet, asset_dir: PathBuf) -> Self {
        Self {
            store,
            composer: PageComposer::new(Arc::new(templates)),
            markdown: MarkdownService::new(),
            asset_dir: Arc::new(asset_dir),
        }
    }
}

/// A stored article as handed between components.
///
/// Instances are plain values; the store owns the persisted copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Markdown source exactly as it was entered
    pub body: String,
}

impl Article {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into() }
    }

    /// An article that has not been written yet
    pub fn blank(title: impl Into<String>) -> Self {
        Self::new(title, String::new())
    }
}

/// Article body in the form a template fragment should receive it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyContent {
    /// Raw markdown, escaped on output
    Source(String),
    /// Rendered HTML, written verbatim
    Html(String),
}

/// Data a page is rendered against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContext {
    Article { title: String, body: BodyContent },
    Count(u64),
}

impl PageContext {
    /// Context for the edit form, which shows the unrendered source
    pub fn source(article: Article) -> Self {
        PageContext::Article { title: article.title, body: BodyContent::Source(article.body) }
    }

    /// Context for the view page, carrying already rendered HTML
    pub fn rendered(title: impl Into<String>, html: String) -> Self {
        PageContext::Article { title: title.into(), body: BodyContent::Html(html) }
    }
}
