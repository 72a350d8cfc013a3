//! Markdown to HTML conversion using pulldown-cmark.
//!
//! The parser's event stream is rewritten before it reaches
//! `pulldown_cmark::html::push_html`:
//!
//! ```text
//! Parser → heading ids → alerts / highlighted code blocks → push_html
//! ```

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

use super::RenderError;
use super::alerts;
use super::heading::Slugger;
use super::highlight::Highlighter;

/// Options for markdown conversion
#[derive(Debug, Clone, Default)]
pub struct MarkdownOptions {
    /// Enable tables extension
    pub tables: bool,
    /// Enable footnotes extension
    pub footnotes: bool,
    /// Enable strikethrough extension
    pub strikethrough: bool,
    /// Enable task lists extension
    pub task_lists: bool,
    /// Enable heading attributes extension (e.g., `# Heading {#custom-id}`)
    pub heading_attributes: bool,
    /// Enable GitHub alerts (`> [!NOTE]`)
    pub alerts: bool,
}

impl MarkdownOptions {
    /// Create options with all extensions enabled
    pub fn all() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            task_lists: true,
            heading_attributes: true,
            alerts: true,
        }
    }

    /// Convert to pulldown-cmark Options
    fn to_pulldown_options(&self) -> Options {
        let mut opts = Options::empty();
        if self.tables {
            opts.insert(Options::ENABLE_TABLES);
        }
        if self.footnotes {
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        if self.strikethrough {
            opts.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            opts.insert(Options::ENABLE_TASKLISTS);
        }
        if self.heading_attributes {
            opts.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        }
        if self.alerts {
            opts.insert(Options::ENABLE_GFM);
        }
        opts
    }
}

/// Convert markdown to an HTML fragment.
///
/// Code blocks in languages the highlighter knows are replaced by
/// inline-styled `<pre>` blocks; everything else keeps the default output.
pub fn to_html(
    markdown: &str,
    options: &MarkdownOptions,
    highlighter: Option<&Highlighter>,
) -> Result<String, RenderError> {
    to_html_with_assets(markdown, options, highlighter, None)
}

/// Like [`to_html`], but local image and link targets get `asset_query`
/// (e.g. `file=%2Fdocs%2Fa.md`) appended so the preview server can find
/// them next to the source file.
pub fn to_html_with_assets(
    markdown: &str,
    options: &MarkdownOptions,
    highlighter: Option<&Highlighter>,
    asset_query: Option<&str>,
) -> Result<String, RenderError> {
    let mut events: Vec<Event<'_>> =
        Parser::new_ext(markdown, options.to_pulldown_options()).collect();

    assign_heading_ids(&mut events);
    if let Some(query) = asset_query {
        rewrite_local_urls(&mut events, query);
    }
    let events = rewrite_blocks(events, highlighter)?;

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    Ok(html)
}

/// Give every heading without an explicit `{#id}` a unique slug.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut slugger = Slugger::new();

    // explicit ids first, so generated ones never shadow them
    for event in events.iter() {
        if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
            slugger.reserve(id);
        }
    }

    let mut i = 0;
    while i < events.len() {
        if !matches!(events[i], Event::Start(Tag::Heading { id: None, .. })) {
            i += 1;
            continue;
        }

        let mut text = String::new();
        let mut end = i + 1;
        while end < events.len() && !matches!(events[end], Event::End(TagEnd::Heading(_))) {
            if let Event::Text(t) | Event::Code(t) = &events[end] {
                text.push_str(t);
            }
            end += 1;
        }

        let slug = slugger.slug(&text);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slug));
        }
        i = end;
    }
}

/// Append `query` to every image and link target that is a local path.
fn rewrite_local_urls(events: &mut [Event<'_>], query: &str) {
    for event in events.iter_mut() {
        if let Event::Start(Tag::Image { dest_url, .. } | Tag::Link { dest_url, .. }) = event {
            if let Some(url) = with_query(dest_url, query) {
                *dest_url = CowStr::from(url);
            }
        }
    }
}

/// `None` for targets that are not local paths: absolute URLs,
/// scheme-relative URLs and in-page anchors.
fn with_query(dest: &str, query: &str) -> Option<String> {
    if dest.is_empty()
        || dest.starts_with('#')
        || dest.starts_with("//")
        || url::Url::parse(dest).is_ok()
    {
        return None;
    }

    let (target, fragment) = dest.split_at(dest.find('#').unwrap_or(dest.len()));
    let separator = if target.contains('?') { '&' } else { '?' };
    Some(format!("{target}{separator}{query}{fragment}"))
}

/// Swap alert blockquotes and highlightable code blocks for raw HTML.
fn rewrite_blocks<'a>(
    events: Vec<Event<'a>>,
    highlighter: Option<&Highlighter>,
) -> Result<Vec<Event<'a>>, RenderError> {
    let mut out = Vec::with_capacity(events.len());
    // (language token, buffered code) while inside a highlighted block
    let mut code: Option<(String, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::BlockQuote(Some(kind))) => {
                out.push(Event::Html(CowStr::from(alerts::open_tag(kind))));
            }
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info)))
                if code.is_none() =>
            {
                let lang = info.split_whitespace().next().unwrap_or_default();
                match highlighter.filter(|_| !lang.is_empty()).and_then(|h| h.find(lang)) {
                    Some(_) => code = Some((lang.to_string(), String::new())),
                    None => out.push(event),
                }
            }
            Event::Text(ref text) if code.is_some() => {
                if let Some((_, buffer)) = code.as_mut() {
                    buffer.push_str(text);
                }
            }
            Event::End(TagEnd::CodeBlock) if code.is_some() => {
                let Some((lang, buffer)) = code.take() else {
                    continue;
                };
                // both were checked when the block opened
                let Some((highlighter, syntax)) =
                    highlighter.and_then(|h| h.find(&lang).map(|s| (h, s)))
                else {
                    continue;
                };
                let html = highlighter
                    .highlight(syntax, &lang, &buffer)
                    .map_err(|source| RenderError::Highlight { lang, source })?;
                out.push(Event::Html(CowStr::from(html)));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query() {
        let q = "file=%2Fdocs%2Fa.md";
        assert_eq!(
            with_query("img/logo.png", q).as_deref(),
            Some("img/logo.png?file=%2Fdocs%2Fa.md")
        );
        assert_eq!(
            with_query("/abs/x.png", q).as_deref(),
            Some("/abs/x.png?file=%2Fdocs%2Fa.md")
        );
        assert_eq!(
            with_query("notes.pdf#page=2", q).as_deref(),
            Some("notes.pdf?file=%2Fdocs%2Fa.md#page=2")
        );
        assert_eq!(
            with_query("x.svg?v=1", q).as_deref(),
            Some("x.svg?v=1&file=%2Fdocs%2Fa.md")
        );
        assert_eq!(with_query("https://example.com/a.png", q), None);
        assert_eq!(with_query("mailto:me@example.com", q), None);
        assert_eq!(with_query("//cdn.example.com/a.png", q), None);
        assert_eq!(with_query("#section", q), None);
    }

    #[test]
    fn test_local_targets_rewritten() {
        let html = to_html_with_assets(
            "![logo](img/logo.png) [site](https://example.com) [up](#top)",
            &MarkdownOptions::all(),
            None,
            Some("file=%2Fdocs%2Fa.md"),
        )
        .unwrap();
        assert!(html.contains(r#"src="img/logo.png?file=%2Fdocs%2Fa.md""#));
        assert!(html.contains(r#"href="https://example.com""#));
        assert!(html.contains(r##"href="#top""##));
    }

    #[test]
    fn test_targets_untouched_without_query() {
        let html = to_html("![logo](img/logo.png)", &MarkdownOptions::all(), None).unwrap();
        assert!(html.contains(r#"src="img/logo.png""#));
    }

    fn render(markdown: &str) -> String {
        let highlighter = Highlighter::new("InspiredGitHub").unwrap();
        to_html(markdown, &MarkdownOptions::all(), Some(&highlighter)).unwrap()
    }

    #[test]
    fn test_basic_markdown() {
        let html = render(
            "# Hello World\n\n## Section\n\nThis is **bold** and *italic*.\n\n\
             - List item 1\n- List item 2\n",
        );
        assert!(html.contains("<h1"));
        assert!(html.contains("<h2"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(html.contains("<li>List item 1</li>"));
    }

    #[test]
    fn test_heading_ids() {
        let html = render("# Hello World\n\n# Hello World\n\n## Custom {#mine}\n");
        assert!(html.contains(r#"<h1 id="hello-world">"#));
        assert!(html.contains(r#"<h1 id="hello-world-1">"#));
        assert!(html.contains(r#"<h2 id="mine">"#));
    }

    #[test]
    fn test_code_block_highlighted() {
        let html = render("```go\npackage main\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n```\n");
        assert!(html.contains("<pre style="));
        assert!(html.contains(r#"<code class="language-go">"#));
        assert!(html.contains("Println"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let html = render("```nope\n<b>x</b>\n```\n");
        assert!(html.contains(r#"<pre><code class="language-nope">"#));
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
    }

    #[test]
    fn test_without_highlighter() {
        let html = to_html("```rust\nfn main() {}\n```\n", &MarkdownOptions::all(), None).unwrap();
        assert!(html.contains(r#"<code class="language-rust">"#));
    }

    #[test]
    fn test_gfm_extensions() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains(r#"type="checkbox""#));
    }

    #[test]
    fn test_alerts() {
        let html = render("> [!NOTE]\n> Useful information.\n\n> [!CAUTION]\n> Careful.\n");
        assert!(html.contains(r#"<blockquote class="markdown-alert markdown-alert-note">"#));
        assert!(html.contains(r#"<blockquote class="markdown-alert markdown-alert-caution">"#));
        assert!(html.contains("<svg"));
        assert!(html.contains("Useful information."));
        assert_eq!(html.matches("</blockquote>").count(), 2);
    }

    #[test]
    fn test_alerts_disabled() {
        let options = MarkdownOptions {
            alerts: false,
            ..MarkdownOptions::all()
        };
        let html = to_html("> [!NOTE]\n> text\n", &options, None).unwrap();
        assert!(!html.contains("markdown-alert"));
        assert!(html.contains("<blockquote>"));
    }

    #[test]
    fn test_plain_blockquote_untouched() {
        let html = render("> just a quote\n");
        assert!(html.contains("<blockquote>"));
        assert!(!html.contains("markdown-alert"));
    }

    #[test]
    fn test_raw_html_passes_through() {
        let html = render("<div class=\"x\">raw</div>\n");
        assert!(html.contains("<div class=\"x\">raw</div>"));
    }
}
