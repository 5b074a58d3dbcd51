//! Markdown-to-HTML conversion used by [`crate::Response::markdown`].
//!
//! The default [`CommonMarkRenderer`] strips raw HTML from the input and
//! blanks out links with script-capable schemes, so handler-supplied Markdown
//! cannot inject markup.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Converts Markdown source into an HTML fragment.
pub trait MarkdownRenderer: Send + Sync {
    /// Render `markdown` to HTML.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the input cannot be converted.
    fn render(&self, markdown: &str) -> anyhow::Result<String>;
}

/// CommonMark renderer backed by `pulldown-cmark`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

const UNSAFE_SCHEMES: [&str; 4] = ["javascript:", "vbscript:", "file:", "data:"];

fn is_unsafe_link(dest: &str) -> bool {
    let dest = dest.trim_start().to_ascii_lowercase();
    UNSAFE_SCHEMES.iter().any(|scheme| dest.starts_with(scheme))
}

fn sanitize(event: Event<'_>) -> Option<Event<'_>> {
    match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if is_unsafe_link(&dest_url) => Some(Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        })),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if is_unsafe_link(&dest_url) => Some(Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        })),
        other => Some(other),
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> anyhow::Result<String> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let parser = Parser::new_ext(markdown, options).filter_map(sanitize);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_link() {
        let html = CommonMarkRenderer
            .render("# Home\n[Hello](http://x/?_=hello)")
            .unwrap();
        assert!(html.contains("<h1>Home</h1>"));
        assert!(html.contains(r#"<a href="http://x/?_=hello">Hello</a>"#));
    }

    #[test]
    fn test_raw_html_is_stripped() {
        let html = CommonMarkRenderer
            .render("before <script>alert(1)</script> after\n\n<div>block</div>\n")
            .unwrap();
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<div>"));
        assert!(html.contains("before"));
    }

    #[test]
    fn test_unsafe_links_are_blanked() {
        let html = CommonMarkRenderer
            .render("[click](javascript:alert(1))")
            .unwrap();
        assert!(!html.contains("javascript:"));
        assert!(html.contains("click"));
    }
}
