//! Media descriptor types produced by the extraction pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of media a descriptor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A still image.
    Image,
    /// A video.
    Video,
    /// An animated GIF (served as a looping video thumbnail by some hosts).
    Gif,
}

impl MediaKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Gif => "gif",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quality level of a variant, ordered from smallest to original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantQuality {
    /// Reduced-size rendition.
    Small,
    /// Large rendition.
    Large,
    /// Original upload quality.
    Orig,
}

impl VariantQuality {
    /// Returns the quality parameter value used on recognized media hosts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Large => "large",
            Self::Orig => "orig",
        }
    }

    /// All qualities in ascending order.
    pub(crate) const ALL: [Self; 3] = [Self::Small, Self::Large, Self::Orig];
}

impl fmt::Display for VariantQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One quality-specific URL for a media asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaVariant {
    /// Quality level of this variant.
    pub quality: VariantQuality,
    /// URL serving this rendition.
    pub url: String,
}

/// A normalized record describing one logical media asset.
///
/// Invariants maintained by the pipeline:
/// - `variants` is ordered by ascending quality and never empty;
/// - every variant URL resolves to the same logical asset;
/// - `url` equals the canonical (highest-quality) variant URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Canonical URL for the asset.
    pub url: String,
    /// Kind of media.
    pub kind: MediaKind,
    /// Quality variants, ascending; at least one entry.
    pub variants: Vec<MediaVariant>,
}

impl MediaDescriptor {
    /// Creates a descriptor for an asset with no recognized quality axis:
    /// a single `orig` variant equal to the asset URL.
    #[must_use]
    pub fn single(url: impl Into<String>, kind: MediaKind) -> Self {
        let url = url.into();
        Self {
            variants: vec![MediaVariant {
                quality: VariantQuality::Orig,
                url: url.clone(),
            }],
            url,
            kind,
        }
    }

    /// Returns the highest-quality variant.
    ///
    /// The pipeline guarantees at least one variant; a constructed-by-hand
    /// descriptor with none falls back to the canonical URL.
    #[must_use]
    pub fn best_variant_url(&self) -> &str {
        self.variants.last().map_or(self.url.as_str(), |v| v.url.as_str())
    }
}
