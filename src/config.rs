//! Decoder settings, loaded from JSON and overridden from the command line.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    binary::Endian,
    error::{ClipError, Result},
    field_plan::FieldPlan,
    version::{EngineVersion, GameVariant},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Engine release the buffers were written by, e.g. `"2019.4.31f1"`
    pub version: EngineVersion,
    pub variant: GameVariant,
    pub endian: Endian,
    /// Fail instead of falling back to numeric paths when TOS resolution is incomplete
    pub strict_tos: bool,
    /// Synthesize editor curves from the muscle clip before export
    pub convert: bool,
    /// Also export the raw muscle clip and ACL sections
    pub raw: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            version: EngineVersion::default(),
            variant: GameVariant::Standard,
            endian: Endian::Little,
            strict_tos: false,
            convert: true,
            raw: false,
        }
    }
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfigOverrides {
    pub version: Option<EngineVersion>,
    pub variant: Option<GameVariant>,
    pub endian: Option<Endian>,
    pub strict_tos: Option<bool>,
    pub convert: Option<bool>,
    pub raw: Option<bool>,
}

impl DecoderConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn with_overrides(self, overrides: &ConfigOverrides) -> Self {
        Self {
            version: overrides.version.unwrap_or(self.version),
            variant: overrides.variant.unwrap_or(self.variant),
            endian: overrides.endian.unwrap_or(self.endian),
            strict_tos: overrides.strict_tos.unwrap_or(self.strict_tos),
            convert: overrides.convert.unwrap_or(self.convert),
            raw: overrides.raw.unwrap_or(self.raw),
        }
    }

    /// Field plan for the configured version. A missing version is
    /// `MalformedHeader`.
    pub fn plan(&self) -> Result<FieldPlan> {
        if self.version.major <= 0 {
            return Err(ClipError::MalformedHeader {
                reason: "no engine version configured".to_string(),
            });
        }
        Ok(FieldPlan::new(self.version, self.variant))
    }
}
