//! Syntax highlighting for fenced code blocks, backed by syntect.

use std::sync::LazyLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{
    IncludeBackground, append_highlighted_html_for_styled_line, start_highlighted_html_snippet,
};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

use crate::utils::html::escape_attr;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

#[derive(Debug, Error)]
#[error("unknown highlight theme `{name}` (available: {available})")]
pub struct UnknownTheme {
    pub name: String,
    pub available: String,
}

/// Inline-styled HTML highlighter for one theme.
#[derive(Debug, Clone, Copy)]
pub struct Highlighter {
    theme: &'static Theme,
}

impl Highlighter {
    pub fn new(theme: &str) -> Result<Self, UnknownTheme> {
        let themes: &'static ThemeSet = &THEMES;
        match themes.themes.get(theme) {
            Some(theme) => Ok(Self { theme }),
            None => Err(UnknownTheme {
                name: theme.to_string(),
                available: themes.themes.keys().cloned().collect::<Vec<_>>().join(", "),
            }),
        }
    }

    /// Syntax for a fence info token (`rust`, `rs`, `Python`, ...).
    pub fn find(&self, token: &str) -> Option<&'static SyntaxReference> {
        let syntaxes: &'static SyntaxSet = &SYNTAXES;
        syntaxes
            .find_syntax_by_token(token)
            .or_else(|| syntaxes.find_syntax_by_token(&token.to_ascii_lowercase()))
    }

    /// Highlight `code` as `<pre style=..><code class="language-..">` with
    /// inline span styles.
    pub fn highlight(
        &self,
        syntax: &SyntaxReference,
        lang: &str,
        code: &str,
    ) -> Result<String, syntect::Error> {
        let mut lines = HighlightLines::new(syntax, self.theme);
        let (pre, _) = start_highlighted_html_snippet(self.theme);

        let mut html = String::with_capacity(code.len() * 4);
        html.push_str(pre.trim_end());
        html.push_str("<code class=\"language-");
        html.push_str(&escape_attr(lang));
        html.push_str("\">");
        for line in LinesWithEndings::from(code) {
            let regions = lines.highlight_line(line, &SYNTAXES)?;
            append_highlighted_html_for_styled_line(&regions, IncludeBackground::No, &mut html)?;
        }
        html.push_str("</code></pre>\n");
        Ok(html)
    }
}
