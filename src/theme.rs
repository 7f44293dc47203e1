//! Theme and font-size tables.
//!
//! `ThemeName` selects the navigation chrome colors, `FontSize` the body text
//! size in points. Both are stored by name in the user settings; names the
//! client does not recognize degrade to fallbacks instead of failing.

use serde::{Deserialize, Serialize};

// ============================================================================
// Theme Name
// ============================================================================

/// Available themes.
///
/// `Unknown` carries a stored name this build does not know, so it is
/// written back unchanged while rendering with the fallback colors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThemeName {
    #[default]
    Green,
    Blue,
    Pink,
    Purple,
    Dark,
    Unknown(String),
}

impl ThemeName {
    /// Every selectable theme, in settings display order.
    pub const KNOWN: [ThemeName; 5] = [
        Self::Green,
        Self::Blue,
        Self::Pink,
        Self::Purple,
        Self::Dark,
    ];

    /// Parse a known theme name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "green" => Some(Self::Green),
            "blue" => Some(Self::Blue),
            "pink" => Some(Self::Pink),
            "purple" => Some(Self::Purple),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Pink => "pink",
            Self::Purple => "purple",
            Self::Dark => "dark",
            Self::Unknown(name) => name,
        }
    }

    /// Human-readable name for the settings surface.
    pub fn label(&self) -> &str {
        match self {
            Self::Green => "清新绿",
            Self::Blue => "天空蓝",
            Self::Pink => "浪漫粉",
            Self::Purple => "优雅紫",
            Self::Dark => "深色主题",
            Self::Unknown(name) => name,
        }
    }

    /// Navigation bar colors for this theme.
    pub fn navigation_colors(&self) -> NavigationColors {
        let background = match self {
            Self::Green => "#4CAF50",
            Self::Blue => "#2196F3",
            Self::Pink => "#E91E63",
            Self::Purple => "#9C27B0",
            Self::Dark => "#212121",
            Self::Unknown(_) => return NavigationColors::FALLBACK,
        };
        NavigationColors {
            front_color: "#ffffff",
            background_color: background,
        }
    }
}

/// A blank name means "unset" and reads as the default theme.
impl From<String> for ThemeName {
    fn from(s: String) -> Self {
        if s.trim().is_empty() {
            return Self::default();
        }
        Self::from_str_name(&s).unwrap_or(Self::Unknown(s))
    }
}

impl From<ThemeName> for String {
    fn from(theme: ThemeName) -> Self {
        match theme {
            ThemeName::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

// ============================================================================
// Navigation Colors
// ============================================================================

/// Foreground and background of the navigation chrome, as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationColors {
    pub front_color: &'static str,
    pub background_color: &'static str,
}

impl NavigationColors {
    /// Colors for theme names outside the table.
    pub const FALLBACK: NavigationColors = NavigationColors {
        front_color: "#000000",
        background_color: "#ffffff",
    };

    pub fn front_rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(self.front_color)
    }

    pub fn background_rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(self.background_color)
    }
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

// ============================================================================
// Font Size
// ============================================================================

/// Body text size. Unrecognized stored names read as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl FontSize {
    pub const ALL: [FontSize; 3] = [Self::Small, Self::Medium, Self::Large];

    /// Parse a size name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    /// Rendered size in points.
    pub fn points(self) -> u32 {
        match self {
            Self::Small => 24,
            Self::Medium => 28,
            Self::Large => 32,
        }
    }
}

impl From<String> for FontSize {
    fn from(s: String) -> Self {
        Self::from_str_name(&s).unwrap_or_default()
    }
}

impl From<FontSize> for String {
    fn from(size: FontSize) -> Self {
        size.as_str().to_string()
    }
}
