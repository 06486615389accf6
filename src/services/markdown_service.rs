use std::collections::HashSet;

use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Service for turning article markdown into HTML.
///
/// Rendering is pure: no I/O and nothing kept between calls. Every input
/// produces output; constructs the parser does not understand come out as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownService;

impl MarkdownService {
    /// Create a new markdown service
    pub fn new() -> Self {
        Self
    }

    /// Render raw bytes, replacing invalid UTF-8 sequences
    pub fn render_bytes(&self, source: &[u8]) -> String {
        self.render(&String::from_utf8_lossy(source))
    }

    /// Render markdown to HTML
    pub fn render(&self, source: &str) -> String {
        let mut events: Vec<Event<'_>> = Parser::new_ext(source, Self::options())
            .map(neutralize_html)
            .collect();

        // Give every heading an anchor id derived from its text
        let mut used_ids: HashSet<String> = HashSet::new();
        for i in 0..events.len() {
            let level = match &events[i] {
                Event::Start(Tag::Heading { level, .. }) => *level,
                _ => continue,
            };
            let text = heading_text(&events[i + 1..]);
            let anchor = unique_id(&mut used_ids, slugify(&text), heading_level_to_u32(level));
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
                *id = Some(CowStr::from(anchor));
            }
        }

        let mut out = String::with_capacity(source.len() + source.len() / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options
    }
}

/// Raw HTML in an article is shown as text rather than injected into the page
fn neutralize_html(ev: Event<'_>) -> Event<'_> {
    match ev {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    }
}

/// Plain text of the heading whose content starts at `events[0]`
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for ev in events {
        match ev {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// First of `base`, `base-1`, `base-2`, ... not already taken on this page
fn unique_id(used: &mut HashSet<String>, slug: String, level: u32) -> String {
    let base = if slug.is_empty() { format!("h{}", level) } else { slug };
    let mut id = base.clone();
    let mut n = 1;
    while used.contains(&id) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    used.insert(id.clone());
    id
}

/// Convert heading level to u32
fn heading_level_to_u32(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Create URL-friendly slug from text
fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = false;
    for ch in text.chars() {
        let c = ch.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if (c.is_ascii_whitespace() || c == '-' || c == '_') && !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    if out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_renders_as_h1() {
        let html = MarkdownService::new().render("# Hi");
        assert_eq!(html, "<h1 id=\"hi\">Hi</h1>\n");
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(MarkdownService::new().render(""), "");
        assert_eq!(MarkdownService::new().render_bytes(b""), "");
    }

    #[test]
    fn rendering_is_deterministic() {
        let md = MarkdownService::new();
        let source = "# Title\n\nSome *text* with `code`.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert_eq!(md.render(source), md.render(source));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = MarkdownService::new().render("<script>alert(1)</script>\n\ninline <b>bold</b>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn malformed_markdown_degrades_to_text() {
        let html = MarkdownService::new().render("**unclosed [link](\n```\nunterminated fence");
        assert!(html.contains("unclosed"));
        assert!(html.contains("unterminated fence"));
    }

    #[test]
    fn invalid_utf8_is_rendered_lossily() {
        let html = MarkdownService::new().render_bytes(&[b'a', 0xff, b'b']);
        assert_eq!(html, "<p>a\u{fffd}b</p>\n");
    }

    #[test]
    fn duplicate_headings_get_distinct_ids() {
        let html = MarkdownService::new().render("## Notes\n\n## Notes\n\n## !!!\n");
        assert!(html.contains("<h2 id=\"notes\">Notes</h2>"));
        assert!(html.contains("<h2 id=\"notes-1\">Notes</h2>"));
        assert!(html.contains("<h2 id=\"h2\">!!!</h2>"));
    }

    #[test]
    fn suffixed_ids_skip_ids_already_taken() {
        let html = MarkdownService::new().render("## Notes\n\n## Notes 1\n\n## Notes\n\n## Notes\n");
        assert!(html.contains("<h2 id=\"notes\">Notes</h2>"));
        assert!(html.contains("<h2 id=\"notes-1\">Notes 1</h2>"));
        assert!(html.contains("<h2 id=\"notes-2\">Notes</h2>"));
        assert!(html.contains("<h2 id=\"notes-3\">Notes</h2>"));
        assert_eq!(html.matches("id=\"notes-1\"").count(), 1);
    }

    #[test]
    fn extensions_are_enabled() {
        let html = MarkdownService::new().render("~~gone~~\n\n- [x] done\n\n| a |\n|---|\n| 1 |\n");
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("<table>"));
    }
}
