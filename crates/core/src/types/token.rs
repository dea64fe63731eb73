//! Presentation tokens stored on products.
//!
//! The renderer picks a card background and a fallback icon from these
//! tokens. Both are closed sets: an unknown string in the document maps to the
//! default variant instead of being carried around as an open key.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Card background color token (a Tailwind utility class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ColorToken {
    #[default]
    Gray,
    Pink,
    Rose,
    Red,
    Orange,
    Amber,
    Yellow,
    Green,
    Emerald,
    Teal,
    Blue,
    Sky,
    Indigo,
    Purple,
    Violet,
}

impl ColorToken {
    /// Every color token, in palette order.
    pub const ALL: [Self; 15] = [
        Self::Gray,
        Self::Pink,
        Self::Rose,
        Self::Red,
        Self::Orange,
        Self::Amber,
        Self::Yellow,
        Self::Green,
        Self::Emerald,
        Self::Teal,
        Self::Blue,
        Self::Sky,
        Self::Indigo,
        Self::Purple,
        Self::Violet,
    ];

    /// The CSS class this token renders as.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gray => "bg-gray-50",
            Self::Pink => "bg-pink-50",
            Self::Rose => "bg-rose-50",
            Self::Red => "bg-red-50",
            Self::Orange => "bg-orange-50",
            Self::Amber => "bg-amber-50",
            Self::Yellow => "bg-yellow-50",
            Self::Green => "bg-green-50",
            Self::Emerald => "bg-emerald-50",
            Self::Teal => "bg-teal-50",
            Self::Blue => "bg-blue-50",
            Self::Sky => "bg-sky-50",
            Self::Indigo => "bg-indigo-50",
            Self::Purple => "bg-purple-50",
            Self::Violet => "bg-violet-50",
        }
    }

    /// Look up a token by its CSS class, falling back to the default.
    #[must_use]
    pub fn from_class(class: &str) -> Self {
        let class = class.trim();
        Self::ALL
            .into_iter()
            .find(|token| token.as_str() == class)
            .unwrap_or_default()
    }
}

impl From<String> for ColorToken {
    fn from(class: String) -> Self {
        Self::from_class(&class)
    }
}

impl From<ColorToken> for &'static str {
    fn from(token: ColorToken) -> Self {
        token.as_str()
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Icon shown on a product card that has no image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum IconToken {
    Search,
    Smile,
    #[default]
    Heart,
    Sun,
    Coffee,
    Phone,
    Palette,
    Gift,
    Truck,
    Star,
}

impl IconToken {
    /// Every icon token.
    pub const ALL: [Self; 10] = [
        Self::Search,
        Self::Smile,
        Self::Heart,
        Self::Sun,
        Self::Coffee,
        Self::Phone,
        Self::Palette,
        Self::Gift,
        Self::Truck,
        Self::Star,
    ];

    /// The icon name as stored in the document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "Search",
            Self::Smile => "Smile",
            Self::Heart => "Heart",
            Self::Sun => "Sun",
            Self::Coffee => "Coffee",
            Self::Phone => "Phone",
            Self::Palette => "Palette",
            Self::Gift => "Gift",
            Self::Truck => "Truck",
            Self::Star => "Star",
        }
    }

    /// Look up an icon by name, falling back to the default.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|icon| icon.as_str() == name)
            .unwrap_or_default()
    }
}

impl From<String> for IconToken {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<IconToken> for &'static str {
    fn from(icon: IconToken) -> Self {
        icon.as_str()
    }
}

impl fmt::Display for IconToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
