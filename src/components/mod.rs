pub mod templates;

pub use templates::{Fragment, Page, PageComposer, Template, TemplateSet};
