//! Folio - a small markdown wiki
//!
//! Articles are stored by title, rendered from markdown on every view, and
//! wrapped in a shared header and footer. The HTTP surface is an axum router
//! with index, view, edit and save routes.

pub mod components;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod logger;
pub mod server;
pub mod services;
pub mod title;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::{Config, StoreBackend};
pub use errors::WikiError;
pub use types::{AppState, Article, BodyContent, PageContext};
pub use services::{ArticleStore, Bounded, FileStore, MarkdownService, MemoryStore, StoreError};
pub use components::{Fragment, Page, PageComposer, TemplateSet};
pub use title::{is_valid_title, Title};
