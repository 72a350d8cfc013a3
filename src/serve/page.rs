//! HTML page assembly.

use std::path::Path;

use url::form_urlencoded;

use crate::embed::serve::{FILE_HTML, FileVars, INDEX_HTML, IndexVars};
use crate::registry::TrackedFile;
use crate::utils::html::{escape, escape_attr};

/// `<query value>` form of a path, for links we generate ourselves.
fn encode_param(path: &Path) -> String {
    form_urlencoded::byte_serialize(path.to_string_lossy().as_bytes()).collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Full document for one tracked file.
pub fn file_page(file: &TrackedFile) -> String {
    let content = file.content();
    let content = String::from_utf8_lossy(&content);
    let title = display_name(file.path());
    let events_url = format!("/events?file={}", encode_param(file.path()));

    FILE_HTML.render(&FileVars {
        title: &escape(&title),
        events_url: &events_url,
        content: &content,
    })
}

/// File list, one entry per tracked path (already sorted).
pub fn index_page(paths: &[impl AsRef<Path>]) -> String {
    let files = if paths.is_empty() {
        "<p class=\"lum-empty\">No files tracked yet. Run <code>lum -d FILE</code> to add one.</p>"
            .to_string()
    } else {
        let mut list = String::from("<ul class=\"lum-files\">\n");
        for path in paths {
            let path = path.as_ref();
            let display = path.display().to_string();
            list.push_str(&format!(
                "<li><a href=\"/?file={}\">{}</a><span class=\"path\">{}</span></li>\n",
                escape_attr(&encode_param(path)),
                escape(&display_name(path)),
                escape(&display),
            ));
        }
        list.push_str("</ul>");
        list
    };

    INDEX_HTML.render(&IndexVars {
        count: paths.len(),
        files: &files,
    })
}
