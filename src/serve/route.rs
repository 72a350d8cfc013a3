//! Request URL → route.

use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/` without `file`: the file list
    Index,
    /// `/?file=<path>`
    Page(PathBuf),
    /// `/events?file=<path>` (`None` when `file` is missing)
    FileEvents(Option<PathBuf>),
    /// `/events/index`
    IndexEvents,
    /// `/<rel>?file=<path>`: asset next to a tracked file
    Asset { rel: String, file: PathBuf },
    NotFound,
}

impl Route {
    pub fn parse(raw_url: &str) -> Self {
        let Ok(url) = Url::parse("http://localhost").and_then(|base| base.join(raw_url)) else {
            return Self::NotFound;
        };

        let file = url
            .query_pairs()
            .find(|(key, _)| key == "file")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        match (url.path(), file) {
            ("/events", file) => Self::FileEvents(file),
            ("/events/index", _) => Self::IndexEvents,
            ("/", Some(file)) => Self::Page(file),
            ("/", None) => Self::Index,
            (path, Some(file)) => {
                let rel = percent_decode_str(path.trim_start_matches('/'))
                    .decode_utf8_lossy()
                    .into_owned();
                Self::Asset { rel, file }
            }
            (_, None) => Self::NotFound,
        }
    }

    /// Long-lived event stream?
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::FileEvents(Some(_)) | Self::IndexEvents)
    }
}
