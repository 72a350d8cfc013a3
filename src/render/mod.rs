//! Renderer Adapter: file path in, HTML fragment out.
//!
//! The registry and the change detector only see the [`Render`] trait, so
//! tests can swap in doubles that fail, count calls, or go missing.
//!
//! [`RenderError::is_retryable`] is the split the change detector's retry
//! loop depends on: a missing file is expected mid atomic-save, anything
//! else is final.

mod alerts;
mod heading;
mod highlight;
mod markdown;

pub use highlight::{Highlighter, UnknownTheme};
pub use markdown::MarkdownOptions;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::RenderConfig;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("file does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read `{}`", .0.display())]
    Read(PathBuf, #[source] io::Error),

    #[error("failed to highlight `{lang}` code block")]
    Highlight {
        lang: String,
        #[source]
        source: syntect::Error,
    },

    /// The blocking render task panicked or was cancelled
    #[error("rendering `{}` was interrupted", .0.display())]
    Aborted(PathBuf),
}

impl RenderError {
    /// Missing files may reappear (editor replace-via-rename); retry those.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

/// Turns a file on disk into an HTML fragment.
pub trait Render: Send + Sync {
    fn render(&self, path: &Path) -> Result<Vec<u8>, RenderError>;
}

/// The production renderer: pulldown-cmark plus syntect.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
    highlighter: Option<Highlighter>,
}

impl MarkdownRenderer {
    pub fn new(config: &RenderConfig) -> Result<Self, UnknownTheme> {
        let options = MarkdownOptions {
            alerts: config.alerts,
            ..MarkdownOptions::all()
        };
        Ok(Self {
            options,
            highlighter: Some(Highlighter::new(&config.theme)?),
        })
    }

    /// Renderer without syntax highlighting.
    pub fn plain(options: MarkdownOptions) -> Self {
        Self {
            options,
            highlighter: None,
        }
    }
}

impl Render for MarkdownRenderer {
    fn render(&self, path: &Path) -> Result<Vec<u8>, RenderError> {
        let bytes = std::fs::read(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => RenderError::Missing(path.to_path_buf()),
            _ => RenderError::Read(path.to_path_buf(), err),
        })?;
        let source = String::from_utf8_lossy(&bytes);

        let html = markdown::to_html_with_assets(
            &source,
            &self.options,
            self.highlighter.as_ref(),
            Some(&asset_query(path)),
        )?;
        Ok(html.into_bytes())
    }
}

/// `file=<path>` query that routes relative asset requests back to `path`.
fn asset_query(path: &Path) -> String {
    let encoded: String =
        url::form_urlencoded::byte_serialize(path.to_string_lossy().as_bytes()).collect();
    format!("file={encoded}")
}
