pub mod markdown_service;
pub mod store;

pub use markdown_service::MarkdownService;
pub use store::{ArticleStore, Bounded, FileStore, MemoryStore, StoreError};
