// ── Icon registry ──
//
// Services store an icon by name. Names resolve through a static table;
// anything unknown falls back to `Code`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A named icon a view can render.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Icon {
    #[default]
    Code,
    Globe,
    Monitor,
    Smartphone,
    Palette,
    PenTool,
    Image,
    Camera,
    Video,
    Film,
    Megaphone,
    TrendingUp,
    BarChart,
    Share2,
    Search,
    Mail,
    Star,
    Briefcase,
}

impl Icon {
    /// Look up an icon by its stored name, falling back to [`Icon::Code`].
    pub fn resolve(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn known_names_resolve() {
        assert_eq!(Icon::resolve("Palette"), Icon::Palette);
        assert_eq!(Icon::resolve("Share2"), Icon::Share2);
    }

    #[test]
    fn unknown_names_fall_back_to_code() {
        assert_eq!(Icon::resolve("Rocketship"), Icon::Code);
        assert_eq!(Icon::resolve(""), Icon::Code);
        assert_eq!(Icon::resolve("palette"), Icon::Code);
    }

    #[test]
    fn every_icon_resolves_to_itself() {
        for icon in Icon::iter() {
            assert_eq!(Icon::resolve(icon.name()), icon);
        }
    }
}
