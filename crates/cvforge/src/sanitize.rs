//! Keeps personal data out of span fields and log lines.
//!
//! Résumé labels are usually the candidate's name, so a source is logged as
//! its file name (when it came from disk) plus an opaque fingerprint, and
//! stored outputs as their file name only.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::collab::SourceDocument;

/// Shown instead of a label for documents that were passed in as text.
pub const INLINE_SOURCE: &str = "<inline>";

/// Loggable stand-ins for a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFields {
    /// File name of the origin, or [`INLINE_SOURCE`].
    pub name: String,
    /// Stable fingerprint of the origin path, or of the label for inline text.
    pub id: String,
}

pub fn source_fields(doc: &SourceDocument) -> SourceFields {
    match &doc.origin {
        Some(path) => SourceFields {
            name: file_name(path),
            id: fingerprint(path),
        },
        None => SourceFields {
            name: INLINE_SOURCE.to_string(),
            id: fingerprint(&doc.label),
        },
    }
}

/// File name of a written artifact, without the directories above it.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

fn fingerprint<T: Hash + ?Sized>(value: &T) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
