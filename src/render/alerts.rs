//! GitHub-style alerts (`> [!NOTE]` and friends).

use pulldown_cmark::BlockQuoteKind;

const INFO_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><circle cx="12" cy="12" r="10"/><path d="M12 16v-4"/><path d="M12 8h.01"/></svg>"#;
const TIP_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M15 14c.2-1 .7-1.7 1.5-2.5 1-.9 1.5-2.2 1.5-3.5A6 6 0 0 0 6 8c0 1 .2 2.2 1.5 3.5.7.7 1.3 1.5 1.5 2.5"/><path d="M9 18h6"/><path d="M10 22h4"/></svg>"#;
const IMPORTANT_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M22 17a2 2 0 0 1-2 2H6.828a2 2 0 0 0-1.414.586l-2.202 2.202A.71.71 0 0 1 2 21.286V5a2 2 0 0 1 2-2h16a2 2 0 0 1 2 2z"/><path d="M12 15h.01"/><path d="M12 7v4"/></svg>"#;
const WARNING_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="m21.73 18-8-14a2 2 0 0 0-3.48 0l-8 14A2 2 0 0 0 4 21h16a2 2 0 0 0 1.73-3"/><path d="M12 9v4"/><path d="M12 17h.01"/></svg>"#;
const CAUTION_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M12 16h.01"/><path d="M12 8v4"/><path d="M15.312 2a2 2 0 0 1 1.414.586l4.688 4.688A2 2 0 0 1 22 8.688v6.624a2 2 0 0 1-.586 1.414l-4.688 4.688a2 2 0 0 1-1.414.586H8.688a2 2 0 0 1-1.414-.586l-4.688-4.688A2 2 0 0 1 2 15.312V8.688a2 2 0 0 1 .586-1.414l4.688-4.688A2 2 0 0 1 8.688 2z"/></svg>"#;

/// Lowercase name used in the CSS class.
pub fn name(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "note",
        BlockQuoteKind::Tip => "tip",
        BlockQuoteKind::Important => "important",
        BlockQuoteKind::Warning => "warning",
        BlockQuoteKind::Caution => "caution",
    }
}

fn title(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "Note",
        BlockQuoteKind::Tip => "Tip",
        BlockQuoteKind::Important => "Important",
        BlockQuoteKind::Warning => "Warning",
        BlockQuoteKind::Caution => "Caution",
    }
}

fn icon(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => INFO_ICON,
        BlockQuoteKind::Tip => TIP_ICON,
        BlockQuoteKind::Important => IMPORTANT_ICON,
        BlockQuoteKind::Warning => WARNING_ICON,
        BlockQuoteKind::Caution => CAUTION_ICON,
    }
}

/// Opening markup: the `<blockquote>` plus its title paragraph.
///
/// The matching `</blockquote>` is emitted by the regular end tag.
pub fn open_tag(kind: BlockQuoteKind) -> String {
    let name = name(kind);
    format!(
        "<blockquote class=\"markdown-alert markdown-alert-{name}\">\n\
         <p class=\"markdown-alert-title\">{}{}</p>\n",
        icon(kind),
        title(kind),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_tag() {
        let html = open_tag(BlockQuoteKind::Warning);
        assert!(html.starts_with(
            "<blockquote class=\"markdown-alert markdown-alert-warning\">"
        ));
        assert!(html.contains("<p class=\"markdown-alert-title\"><svg"));
        assert!(html.contains("</svg>Warning</p>"));
    }

    #[test]
    fn test_every_kind_has_icon() {
        for kind in [
            BlockQuoteKind::Note,
            BlockQuoteKind::Tip,
            BlockQuoteKind::Important,
            BlockQuoteKind::Warning,
            BlockQuoteKind::Caution,
        ] {
            assert!(icon(kind).starts_with("<svg"));
            assert!(open_tag(kind).contains(name(kind)));
        }
    }
}
