//! Engine version tuple and game-variant tags.
//!
//! Every optional field in the serialized clip is gated on one of these two
//! values; `FieldPlan` turns them into a flat set of booleans once per decode.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ClipError;

/// Three-part engine version (`2019.4.31f1` parses as `(2019, 4, 31)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EngineVersion {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl EngineVersion {
    pub const fn new(major: i32, minor: i32, patch: i32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Lexicographic `(major, minor) >= (major, minor)`; the patch level never
    /// changes the serialized layout.
    pub const fn at_least(&self, major: i32, minor: i32) -> bool {
        self.major > major || (self.major == major && self.minor >= minor)
    }

    pub const fn below(&self, major: i32, minor: i32) -> bool {
        !self.at_least(major, minor)
    }

    pub fn as_tuple(&self) -> (i32, i32, i32) {
        (self.major, self.minor, self.patch)
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for EngineVersion {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ClipError::MalformedHeader {
            reason: format!("unrecognized engine version '{}'", s),
        };

        // Release suffixes (f1, p3, b12, a4, c1, x2) end the numeric part.
        let mut parts = s
            .trim()
            .split(|c: char| c == '.' || c.is_ascii_alphabetic())
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<i32>().map_err(|_| malformed()));

        let major = parts.next().ok_or_else(malformed)??;
        let minor = parts.next().transpose()?.unwrap_or(0);
        let patch = parts.next().transpose()?.unwrap_or(0);

        if major <= 0 || minor < 0 || patch < 0 {
            return Err(malformed());
        }
        Ok(Self::new(major, minor, patch))
    }
}

impl Serialize for EngineVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EngineVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Game-specific fork of the serialized format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameVariant {
    /// Stock engine layout
    #[default]
    Standard,
    /// Genshin Impact
    GI,
    /// Honkai Impact 3rd
    BH3,
    /// Honkai: Star Rail
    SR,
    /// Tears of Themis
    TOT,
}

impl GameVariant {
    pub const ALL: [GameVariant; 5] = [
        GameVariant::Standard,
        GameVariant::GI,
        GameVariant::BH3,
        GameVariant::SR,
        GameVariant::TOT,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GameVariant::Standard => "Standard",
            GameVariant::GI => "GI",
            GameVariant::BH3 => "BH3",
            GameVariant::SR => "SR",
            GameVariant::TOT => "TOT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GameVariant::Standard => "Standard engine layout",
            GameVariant::GI => "Genshin Impact",
            GameVariant::BH3 => "Honkai Impact 3rd",
            GameVariant::SR => "Honkai: Star Rail",
            GameVariant::TOT => "Tears of Themis",
        }
    }

    /// Container extension the fork ships its bundles under.
    pub fn extension(&self) -> &'static str {
        match self {
            GameVariant::Standard => ".assets",
            GameVariant::GI => ".blk",
            GameVariant::BH3 => ".wmv",
            GameVariant::SR => ".unity3d",
            GameVariant::TOT => ".blk",
        }
    }
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameVariant {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameVariant::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ClipError::UnknownVariant {
                name: s.to_string(),
            })
    }
}
