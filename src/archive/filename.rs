//! Filename sanitization, derivation, and batch collision resolution.
//!
//! Collision resolution is deterministic within a batch: the first item
//! keeps its desired name, later collisions receive ` (1)`, ` (2)`, …
//! disambiguators inserted before the extension, so every name in the
//! batch stays unique while retaining its original extension.

use std::collections::HashSet;
use std::path::{Component, Path};

use url::Url;

/// Sanitizes a filename for filesystem and archive safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            // Also handle null and control characters
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Splits a filename into stem and extension (extension includes the dot;
/// empty when there is none). A leading dot alone is not an extension.
pub(crate) fn split_stem_ext(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(0) | None => (filename, ""),
        Some(pos) => (&filename[..pos], &filename[pos..]),
    }
}

/// Picks a batch-unique name for `desired`, recording it in `used`.
pub(crate) fn resolve_collision(desired: &str, used: &mut HashSet<String>) -> String {
    if used.insert(desired.to_string()) {
        return desired.to_string();
    }

    let (stem, ext) = split_stem_ext(desired);
    let mut counter = 1usize;
    loop {
        let candidate = format!("{stem} ({counter}){ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Derives a filename from the last URL path segment, percent-decoded and
/// sanitized. Returns `None` when the URL has no usable segment.
pub(crate) fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    let sanitized = sanitize_filename(&decoded);
    (!sanitized.trim_matches('_').is_empty()).then_some(sanitized)
}
