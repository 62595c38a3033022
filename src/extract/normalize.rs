//! Normalization stage: quality-variant generation and URL canonicalization.
//!
//! Recognized image-hosting URLs (`pbs.twimg.com/media/…`) carry their
//! quality axis in the `name` query parameter. Normalization rewrites such
//! URLs into explicit `small`/`large`/`orig` variants and canonicalizes the
//! descriptor URL to the `orig` rendition. Everything else passes through
//! with a single `orig` variant.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use url::Url;

use super::collect::RawCandidate;
use super::descriptor::{MediaDescriptor, MediaKind, MediaVariant, VariantQuality};

/// Query parameter carrying the quality level on recognized hosts.
const QUALITY_PARAM: &str = "name";

/// Image CDN host whose URLs support explicit quality parameters.
const RECOGNIZED_HOST: &str = "pbs.twimg.com";

/// Path markers identifying animated-GIF thumbnails.
const GIF_THUMB_MARKERS: [&str; 3] = ["/tweet_video_thumb/", "/ext_tw_video_thumb/", "/video_thumb/"];

/// Path shape of quality-addressable media on the recognized host.
#[allow(clippy::expect_used)]
static MEDIA_PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/media/[A-Za-z0-9_-]+").expect("media path regex is valid") // Static pattern, safe to panic
});

/// Stage 3: turns raw candidates into normalized descriptors.
pub(crate) fn normalize(raw: Vec<RawCandidate>) -> Vec<MediaDescriptor> {
    raw.into_iter().map(normalize_one).collect()
}

fn normalize_one(candidate: RawCandidate) -> MediaDescriptor {
    // GIF thumbnails override the tag-derived kind.
    let kind = if is_gif_thumb_url(&candidate.url) {
        MediaKind::Gif
    } else {
        candidate.kind
    };

    if kind == MediaKind::Image
        && let Ok(parsed) = Url::parse(&candidate.url)
        && is_quality_addressable(&parsed)
    {
        let variants: Vec<MediaVariant> = VariantQuality::ALL
            .iter()
            .map(|&quality| MediaVariant {
                quality,
                url: with_quality(&parsed, quality),
            })
            .collect();
        let canonical = variants
            .last()
            .map_or_else(|| candidate.url.clone(), |v| v.url.clone());
        trace!(url = %candidate.url, canonical = %canonical, "built quality variants");
        return MediaDescriptor {
            url: canonical,
            kind,
            variants,
        };
    }

    MediaDescriptor::single(candidate.url, kind)
}

/// Canonical identity of a URL for deduplication.
///
/// For quality-addressable URLs this is the URL with the `name` query
/// parameter removed; every other parameter is kept in its original order
/// and compared case-sensitively. Anything unparseable (relative paths,
/// `data:` URLs) is compared as a trimmed string.
pub(crate) fn canonical_key(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url)
        && is_quality_addressable(&parsed)
    {
        return without_quality(&parsed);
    }
    url.trim().to_string()
}

fn is_quality_addressable(parsed: &Url) -> bool {
    parsed.host_str() == Some(RECOGNIZED_HOST) && MEDIA_PATH_PATTERN.is_match(parsed.path())
}

fn is_gif_thumb_url(url: &str) -> bool {
    let path = Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string());
    GIF_THUMB_MARKERS.iter().any(|marker| path.contains(marker))
}

/// Rewrites the quality parameter, preserving all other query parameters.
fn with_quality(parsed: &Url, quality: VariantQuality) -> String {
    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if let Some(pair) = pairs.iter_mut().find(|(k, _)| k == QUALITY_PARAM) {
        pair.1 = quality.as_str().to_string();
    } else {
        pairs.push((QUALITY_PARAM.to_string(), quality.as_str().to_string()));
    }
    rebuild_query(parsed, pairs)
}

/// Removes the quality parameter entirely.
fn without_quality(parsed: &Url) -> String {
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != QUALITY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    rebuild_query(parsed, pairs)
}

fn rebuild_query(parsed: &Url, pairs: Vec<(String, String)>) -> String {
    let mut rebuilt = parsed.clone();
    if pairs.is_empty() {
        rebuilt.set_query(None);
    } else {
        rebuilt.query_pairs_mut().clear().extend_pairs(pairs);
    }
    rebuilt.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(url: &str, kind: MediaKind) -> RawCandidate {
        RawCandidate {
            url: url.to_string(),
            kind,
        }
    }

    #[test]
    fn test_recognized_image_gets_three_variants() {
        let descriptors = normalize(vec![raw(
            "https://pbs.twimg.com/media/AbC123?format=jpg&name=small",
            MediaKind::Image,
        )]);

        assert_eq!(descriptors.len(), 1);
        let descriptor = &descriptors[0];
        assert_eq!(descriptor.variants.len(), 3);
        assert_eq!(
            descriptor.variants[0].url,
            "https://pbs.twimg.com/media/AbC123?format=jpg&name=small"
        );
        assert_eq!(
            descriptor.variants[1].url,
            "https://pbs.twimg.com/media/AbC123?format=jpg&name=large"
        );
        assert_eq!(
            descriptor.variants[2].url,
            "https://pbs.twimg.com/media/AbC123?format=jpg&name=orig"
        );
        // Canonical URL is the orig variant.
        assert_eq!(descriptor.url, descriptor.variants[2].url);
    }

    #[test]
    fn test_quality_param_appended_when_absent() {
        let descriptors = normalize(vec![raw(
            "https://pbs.twimg.com/media/AbC123",
            MediaKind::Image,
        )]);
        assert_eq!(
            descriptors[0].url,
            "https://pbs.twimg.com/media/AbC123?name=orig"
        );
    }

    #[test]
    fn test_unrecognized_host_passes_through() {
        let descriptors = normalize(vec![raw(
            "https://example.com/photo.jpg?name=small",
            MediaKind::Image,
        )]);
        let descriptor = &descriptors[0];
        assert_eq!(descriptor.variants.len(), 1);
        assert_eq!(descriptor.variants[0].quality, VariantQuality::Orig);
        assert_eq!(descriptor.url, "https://example.com/photo.jpg?name=small");
    }

    #[test]
    fn test_video_url_not_rewritten() {
        let descriptors = normalize(vec![raw(
            "https://video.twimg.com/ext_tw_video/123/pu/vid/720x720/clip.mp4",
            MediaKind::Video,
        )]);
        assert_eq!(descriptors[0].variants.len(), 1);
        assert_eq!(descriptors[0].kind, MediaKind::Video);
    }

    #[test]
    fn test_gif_thumb_detected_from_path() {
        for path in [
            "https://pbs.twimg.com/tweet_video_thumb/AbC.jpg",
            "https://pbs.twimg.com/ext_tw_video_thumb/1/pu/img/x.jpg",
            "https://pbs.twimg.com/video_thumb/AbC.jpg",
        ] {
            let descriptors = normalize(vec![raw(path, MediaKind::Image)]);
            assert_eq!(descriptors[0].kind, MediaKind::Gif, "for {path}");
            // Thumb paths are not quality-addressable.
            assert_eq!(descriptors[0].variants.len(), 1);
        }
    }

    #[test]
    fn test_relative_url_passes_through() {
        let descriptors = normalize(vec![raw("/static/pic.png", MediaKind::Image)]);
        assert_eq!(descriptors[0].url, "/static/pic.png");
        assert_eq!(descriptors[0].variants.len(), 1);
    }

    #[test]
    fn test_canonical_key_ignores_quality_only() {
        let small = canonical_key("https://pbs.twimg.com/media/AbC?format=jpg&name=small");
        let orig = canonical_key("https://pbs.twimg.com/media/AbC?format=jpg&name=orig");
        let other_format = canonical_key("https://pbs.twimg.com/media/AbC?format=png&name=orig");

        assert_eq!(small, orig);
        assert_ne!(small, other_format);
    }

    #[test]
    fn test_canonical_key_drops_empty_query() {
        let key = canonical_key("https://pbs.twimg.com/media/AbC?name=large");
        assert_eq!(key, "https://pbs.twimg.com/media/AbC");
    }

    #[test]
    fn test_canonical_key_for_unrecognized_is_trimmed_string() {
        assert_eq!(
            canonical_key(" https://example.com/a.jpg?name=small "),
            "https://example.com/a.jpg?name=small"
        );
        assert_eq!(canonical_key("/rel/a.jpg"), "/rel/a.jpg");
    }
}
