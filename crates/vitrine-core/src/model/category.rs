// ── Categories and lifecycle status ──
//
// A category has three spellings: the URL slug (`graphics`), the value
// stored in the collection (`Graphics`), and the heading shown to people
// (`Graphic Design`). Status is stored lower-case.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Work category of a project or service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Website,
    Graphics,
    Video,
    Ads,
}

impl Category {
    /// URL slug, e.g. `graphics`.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Graphics => "graphics",
            Self::Video => "video",
            Self::Ads => "ads",
        }
    }

    /// Value as stored in the `category` column, e.g. `Graphics`.
    pub fn stored_value(self) -> &'static str {
        match self {
            Self::Website => "Website",
            Self::Graphics => "Graphics",
            Self::Video => "Video",
            Self::Ads => "Ads",
        }
    }

    /// Human-readable heading, e.g. `Graphic Design`.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Website => "Web Development",
            Self::Graphics => "Graphic Design",
            Self::Video => "Video Production",
            Self::Ads => "Digital Marketing",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        slug.parse().ok()
    }

    pub fn from_stored(value: &str) -> Option<Self> {
        Self::iter().find(|c| c.stored_value() == value)
    }

    /// Every category, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// Map a service name to the category slug its detail page lives under.
///
/// Matching is by keyword; a name matching none becomes its own hyphenated
/// lower-case slug.
pub fn service_slug(name: &str) -> String {
    let lower = name.to_lowercase();
    let keyword = if lower.contains("website") {
        Some(Category::Website)
    } else if lower.contains("graphic") {
        Some(Category::Graphics)
    } else if lower.contains("video") {
        Some(Category::Video)
    } else if lower.contains("ads") || lower.contains("social") {
        Some(Category::Ads)
    } else {
        None
    };

    match keyword {
        Some(category) => category.slug().to_owned(),
        None => lower.split_whitespace().collect::<Vec<_>>().join("-"),
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemStatus {
    Ongoing,
    Completed,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        }
    }
}
