use std::borrow::Cow;
use std::fmt::{self, Write};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::errors::WikiError;
use crate::types::{BodyContent, PageContext};
use crate::utils::escape_html;

/// Named template fragments making up every page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Header,
    Footer,
    Index,
    Edit,
    View,
}

impl Fragment {
    pub const ALL: [Fragment; 5] =
        [Fragment::Header, Fragment::Footer, Fragment::Index, Fragment::Edit, Fragment::View];

    pub fn name(self) -> &'static str {
        match self {
            Fragment::Header => "header",
            Fragment::Footer => "footer",
            Fragment::Index => "index",
            Fragment::Edit => "edit",
            Fragment::View => "view",
        }
    }

    fn file_name(self) -> String {
        format!("{}.html", self.name())
    }

    fn builtin(self) -> &'static str {
        match self {
            Fragment::Header => include_str!("../../tmpl/header.html"),
            Fragment::Footer => include_str!("../../tmpl/footer.html"),
            Fragment::Index => include_str!("../../tmpl/index.html"),
            Fragment::Edit => include_str!("../../tmpl/edit.html"),
            Fragment::View => include_str!("../../tmpl/view.html"),
        }
    }
}

/// The route-specific fragment placed between header and footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Index,
    Edit,
    View,
}

impl Page {
    fn fragment(self) -> Fragment {
        match self {
            Page::Index => Fragment::Index,
            Page::Edit => Fragment::Edit,
            Page::View => Fragment::View,
        }
    }
}

/// Placeholder names understood inside `{{...}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Site,
    Title,
    Body,
    Count,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "SITE" => Some(Field::Site),
            "TITLE" => Some(Field::Title),
            "BODY" => Some(Field::Body),
            "COUNT" => Some(Field::Count),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Site => "SITE",
            Field::Title => "TITLE",
            Field::Body => "BODY",
            Field::Count => "COUNT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed fragment, ready to be rendered any number of times
#[derive(Debug, Clone)]
pub struct Template {
    name: &'static str,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse fragment source, rejecting unknown placeholders and unclosed `{{`
    pub fn parse(name: &'static str, source: &str) -> Result<Self, WikiError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| {
                WikiError::TemplateError(format!("{}: unterminated placeholder", name))
            })?;
            let key = after[..close].trim();
            let field = Field::parse(key).ok_or_else(|| {
                WikiError::TemplateError(format!("{}: unknown placeholder {{{{{}}}}}", name, key))
            })?;
            segments.push(Segment::Field(field));
            rest = &after[close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { name, segments })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn render<W: Write>(&self, out: &mut W, site: &str, ctx: &PageContext) -> Result<(), WikiError> {
        for segment in &self.segments {
            let written = match segment {
                Segment::Literal(text) => out.write_str(text),
                Segment::Field(field) => self.write_field(out, *field, site, ctx)?,
            };
            written.map_err(|fmt::Error| {
                WikiError::RenderError(format!("{}: failed to write output", self.name))
            })?;
        }
        Ok(())
    }

    fn write_field<W: Write>(
        &self,
        out: &mut W,
        field: Field,
        site: &str,
        ctx: &PageContext,
    ) -> Result<fmt::Result, WikiError> {
        let written = match (field, ctx) {
            (Field::Site, _) => out.write_str(&escape_html(site)),
            (Field::Title, PageContext::Article { title, .. }) => out.write_str(&escape_html(title)),
            (Field::Body, PageContext::Article { body: BodyContent::Source(src), .. }) => {
                out.write_str(&escape_html(src))
            }
            (Field::Body, PageContext::Article { body: BodyContent::Html(html), .. }) => {
                out.write_str(html)
            }
            (Field::Count, PageContext::Count(n)) => write!(out, "{}", n),
            (field, PageContext::Article { .. }) => {
                return Err(WikiError::RenderError(format!(
                    "{}: {{{{{}}}}} is not available when rendering an article",
                    self.name,
                    field.name()
                )));
            }
            (field, PageContext::Count(_)) => {
                return Err(WikiError::RenderError(format!(
                    "{}: {{{{{}}}}} is not available when rendering the article count",
                    self.name,
                    field.name()
                )));
            }
        };
        Ok(written)
    }
}

/// Every fragment, parsed once at startup and never modified afterwards
#[derive(Debug)]
pub struct TemplateSet {
    site_name: String,
    header: Template,
    footer: Template,
    index: Template,
    edit: Template,
    view: Template,
}

impl TemplateSet {
    /// Build the set from the fragments compiled into the binary
    pub fn builtin(site_name: impl Into<String>) -> Result<Self, WikiError> {
        Self::from_sources(site_name, |fragment| Ok(Cow::Borrowed(fragment.builtin())))
    }

    /// Load `<dir>/<fragment>.html` for each fragment, using the built-in
    /// fragment for any file that does not exist
    pub fn load(dir: &Path, site_name: impl Into<String>) -> Result<Self, WikiError> {
        Self::from_sources(site_name, |fragment| {
            let path = dir.join(fragment.file_name());
            match fs::read_to_string(&path) {
                Ok(source) => {
                    debug!("Loaded template fragment {:?}", path);
                    Ok(Cow::Owned(source))
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    info!("No {:?}, using built-in '{}' fragment", path, fragment.name());
                    Ok(Cow::Borrowed(fragment.builtin()))
                }
                Err(e) => Err(WikiError::TemplateError(format!("failed to read {}: {}", path.display(), e))),
            }
        })
    }

    /// Build the set from arbitrary fragment sources
    pub fn from_sources<'a, F>(site_name: impl Into<String>, mut source: F) -> Result<Self, WikiError>
    where
        F: FnMut(Fragment) -> Result<Cow<'a, str>, WikiError>,
    {
        let mut parse = |fragment: Fragment| -> Result<Template, WikiError> {
            Template::parse(fragment.name(), &source(fragment)?)
        };
        Ok(Self {
            site_name: site_name.into(),
            header: parse(Fragment::Header)?,
            footer: parse(Fragment::Footer)?,
            index: parse(Fragment::Index)?,
            edit: parse(Fragment::Edit)?,
            view: parse(Fragment::View)?,
        })
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn get(&self, fragment: Fragment) -> &Template {
        match fragment {
            Fragment::Header => &self.header,
            Fragment::Footer => &self.footer,
            Fragment::Index => &self.index,
            Fragment::Edit => &self.edit,
            Fragment::View => &self.view,
        }
    }
}

/// Assembles header, page fragment and footer into one response body
#[derive(Debug, Clone)]
pub struct PageComposer {
    templates: Arc<TemplateSet>,
}

impl PageComposer {
    pub fn new(templates: Arc<TemplateSet>) -> Self {
        Self { templates }
    }

    /// Write header, `page` and footer to `out`, in that order, against `ctx`.
    ///
    /// Stops at the first failing fragment; whatever was already written stays
    /// in `out`.
    pub fn compose<W: Write>(&self, out: &mut W, page: Page, ctx: &PageContext) -> Result<(), WikiError> {
        let site = self.templates.site_name();
        for fragment in [Fragment::Header, page.fragment(), Fragment::Footer] {
            self.templates.get(fragment).render(out, site, ctx)?;
        }
        Ok(())
    }

    /// Compose into a private buffer and hand it back only if every fragment rendered
    pub fn render_page(&self, page: Page, ctx: &PageContext) -> Result<String, WikiError> {
        let mut buf = String::new();
        self.compose(&mut buf, page, ctx)?;
        Ok(buf)
    }
}
