//! Extraction pipeline: document fragment in, media descriptors out.
//!
//! Five pure stages run in sequence, each over the previous stage's output:
//!
//! 1. **collect** - walk the subtree gathering `img`/`video`/`source` nodes
//! 2. **extract** - read raw URL and kind; URL-less nodes are dropped
//! 3. **normalize** - build quality variants, canonicalize recognized URLs
//! 4. **dedupe** - collapse entries sharing a canonical URL, first wins
//! 5. **validate** - drop unsupported schemes, blocked hosts, over-long URLs
//!
//! Each stage's output count is reported through the optional progress
//! sink. No stage performs network access or mutates the input tree.
//!
//! # Example
//!
//! ```
//! use mediagrab_core::extract::{DomNode, ExtractOptions, extract_media};
//! use mediagrab_core::progress::ProgressSink;
//!
//! let root = DomNode::element("div")
//!     .child(DomNode::element("img").attr("src", "https://example.com/a.jpg"));
//! let media = extract_media(&root, &ExtractOptions::default(), &ProgressSink::disabled());
//! assert_eq!(media.map(|m| m.len()), Ok(1));
//! ```

mod collect;
mod descriptor;
mod error;
mod node;
mod normalize;
mod validate;

pub use descriptor::{MediaDescriptor, MediaKind, MediaVariant, VariantQuality};
pub use error::ExtractError;
pub use node::DomNode;
pub use validate::{DEFAULT_MAX_URL_LEN, ExtractOptions};

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::progress::ProgressSink;

/// Runs the full extraction pipeline over a document subtree.
///
/// # Arguments
///
/// * `root` - Root of the subtree to scan; must be an element node
/// * `options` - Validation tuning (URL length ceiling, blocked hosts)
/// * `progress` - Optional per-stage count reporting
///
/// # Returns
///
/// The ordered, deduplicated, validated descriptor list. An empty subtree
/// yields `Ok(vec![])`, not an error.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidRoot`] when `root` is a text node. All
/// other conditions are handled by filtering within the stages.
#[instrument(skip_all, fields(blocked_hosts = options.blocked_hosts.len()))]
pub fn extract_media(
    root: &DomNode,
    options: &ExtractOptions,
    progress: &ProgressSink,
) -> Result<Vec<MediaDescriptor>, ExtractError> {
    if !root.is_element() {
        return Err(ExtractError::invalid_root("root is a text node"));
    }

    let candidates = collect::collect_candidates(root);
    progress.stage("collect", candidates.len());

    let raw = collect::extract_raw(&candidates);
    progress.stage("extract", raw.len());

    let normalized = normalize::normalize(raw);
    progress.stage("normalize", normalized.len());

    let unique = dedupe(normalized);
    progress.stage("dedupe", unique.len());

    let valid = validate::validate(unique, options);
    progress.stage("validate", valid.len());

    debug!(descriptors = valid.len(), "extraction pipeline complete");
    Ok(valid)
}

/// Stage 4: collapses descriptors whose canonical URL (quality parameter
/// ignored) is identical. First occurrence wins, including its kind.
fn dedupe(descriptors: Vec<MediaDescriptor>) -> Vec<MediaDescriptor> {
    let mut seen = HashSet::new();
    descriptors
        .into_iter()
        .filter(|descriptor| seen.insert(normalize::canonical_key(&descriptor.url)))
        .collect()
}
