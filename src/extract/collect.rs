//! Collection and raw-extraction stages of the media pipeline.
//!
//! `collect` walks the subtree and gathers candidate elements; `extract`
//! reads the raw URL and media kind from each candidate. Neither stage
//! touches the network.

use tracing::trace;

use super::descriptor::MediaKind;
use super::node::DomNode;

/// Tags considered media candidates.
const CANDIDATE_TAGS: [&str; 3] = ["img", "video", "source"];

/// A candidate element paired with the tag of its parent element.
///
/// The parent tag disambiguates `<source>` children of `<video>` from
/// `<source>` children of `<picture>`.
#[derive(Debug)]
pub(crate) struct Candidate<'a> {
    node: &'a DomNode,
    parent_tag: Option<&'a str>,
}

/// Raw media reference read off a candidate, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCandidate {
    pub url: String,
    pub kind: MediaKind,
}

/// Stage 1: depth-first walk gathering `img`, `video`, and `source` elements.
pub(crate) fn collect_candidates(root: &DomNode) -> Vec<Candidate<'_>> {
    let mut out = Vec::new();
    walk(root, None, &mut out);
    out
}

fn walk<'a>(node: &'a DomNode, parent_tag: Option<&'a str>, out: &mut Vec<Candidate<'a>>) {
    if let Some(tag) = node.tag() {
        if CANDIDATE_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t)) {
            out.push(Candidate { node, parent_tag });
        }
        for child in node.children() {
            walk(child, Some(tag), out);
        }
    }
}

/// Stage 2: reads raw URL and kind per candidate; candidates without a
/// resolvable URL are dropped.
pub(crate) fn extract_raw(candidates: &[Candidate<'_>]) -> Vec<RawCandidate> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let url = raw_url(candidate.node)?;
            let kind = raw_kind(candidate)?;
            trace!(%url, %kind, "extracted raw candidate");
            Some(RawCandidate { url, kind })
        })
        .collect()
}

/// Reads `src`, falling back to `data-src` for lazily-loaded elements.
fn raw_url(node: &DomNode) -> Option<String> {
    let raw = node.attribute("src").or_else(|| node.attribute("data-src"))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn raw_kind(candidate: &Candidate<'_>) -> Option<MediaKind> {
    let tag = candidate.node.tag()?;
    if tag.eq_ignore_ascii_case("img") {
        Some(MediaKind::Image)
    } else if tag.eq_ignore_ascii_case("video") {
        Some(MediaKind::Video)
    } else if tag.eq_ignore_ascii_case("source") {
        // A <source> inherits its meaning from its parent element.
        let parent_is_video = candidate
            .parent_tag
            .is_some_and(|p| p.eq_ignore_ascii_case("video"));
        Some(if parent_is_video {
            MediaKind::Video
        } else {
            MediaKind::Image
        })
    } else {
        None
    }
}
