//! Embedded page templates and assets for the preview server.
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{FILE_HTML, FileVars};
//!
//! let html = FILE_HTML.render(&FileVars { title, events_url, content });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// Shared stylesheet, inlined into every page.
    pub const STYLE_CSS: &str = include_str!("serve/style.css");

    /// Live-reload client: reloads the page on a `reload` event.
    pub const LIVE_JS: &str = include_str!("serve/live.js");

    /// Variables for file.html.
    ///
    /// `title` must already be HTML-escaped; `events_url` is a raw URL.
    pub struct FileVars<'a> {
        pub title: &'a str,
        pub events_url: &'a str,
        pub content: &'a str,
    }

    impl TemplateVars for FileVars<'_> {
        fn apply(&self, content: &str) -> String {
            // content last: rendered markdown may contain placeholder-like text
            content
                .replace("__LUM_TITLE__", self.title)
                .replace("__LUM_STYLE__", STYLE_CSS)
                .replace("__LUM_EVENTS__", &script_string(self.events_url))
                .replace("__LUM_SCRIPT__", LIVE_JS)
                .replace("__LUM_CONTENT__", self.content)
        }
    }

    /// Rendered Markdown page.
    pub const FILE_HTML: Template<FileVars<'static>> =
        Template::new(include_str!("serve/file.html"));

    /// Variables for index.html.
    ///
    /// `files` is pre-rendered, escaped list markup.
    pub struct IndexVars<'a> {
        pub count: usize,
        pub files: &'a str,
    }

    impl TemplateVars for IndexVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__LUM_STYLE__", STYLE_CSS)
                .replace("__LUM_EVENTS__", &script_string("/events/index"))
                .replace("__LUM_SCRIPT__", LIVE_JS)
                .replace("__LUM_COUNT__", &self.count.to_string())
                .replace("__LUM_FILES__", self.files)
        }
    }

    /// File-list page.
    pub const INDEX_HTML: Template<IndexVars<'static>> =
        Template::new(include_str!("serve/index.html"));

    /// JSON string literal safe to place inside `<script>`.
    fn script_string(value: &str) -> String {
        serde_json::to_string(value)
            .unwrap_or_else(|_| "\"\"".into())
            .replace("</", "<\\/")
    }

}
