//! Earliest-point filtering of raw directory events.

use std::ffi::OsStr;

use notify::EventKind;
use notify::event::ModifyKind;

/// Does `event` describe a write, create or rename of the file called `name`?
///
/// The watch covers the whole parent directory, so siblings are dropped
/// here. Metadata-only changes (mtime/chmod noise), removals and access
/// events never trigger a reload.
pub(super) fn is_relevant(event: &notify::Event, name: &OsStr) -> bool {
    let kind_matches = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(modify) => !matches!(modify, ModifyKind::Metadata(_)),
        EventKind::Any => true,
        _ => false,
    };

    kind_matches
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(name))
}
