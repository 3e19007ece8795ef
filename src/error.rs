//! Error type shared by every decoding stage.

use crate::version::{EngineVersion, GameVariant};

/// Everything that can go wrong while turning an object buffer into a clip.
///
/// Structural errors (`BufferUnderrun`, `MalformedHeader`, `InvalidBitWidth`,
/// `InvalidLength`) abort the current clip. `IncompleteTos` is only raised when
/// the caller asked for strict path resolution.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ClipError {
    /// Version or variant information the field plan cannot interpret
    #[error("Malformed header: {reason}")]
    MalformedHeader { reason: String },

    /// A read ran past the end of the buffer
    #[error("Buffer underrun at offset {offset}: wanted {wanted} bytes, {available} available")]
    BufferUnderrun {
        offset: u64,
        wanted: u64,
        available: u64,
    },

    /// Packed vector bit width outside 1..=32
    #[error("Invalid bit width {bit_size} (expected 1..=32)")]
    InvalidBitWidth { bit_size: u32 },

    /// An element count that cannot be right for the remaining data
    #[error("Invalid element count {count} at offset {offset}")]
    InvalidLength { offset: u64, count: i64 },

    /// Channel index past the end of the binding table
    #[error("Channel index {index} out of range (clip has {total} channels)")]
    ChannelIndexOutOfRange { index: i64, total: usize },

    /// Path hashes no collaborator graph could resolve
    #[error("Incomplete TOS: {} path hash(es) unresolved", missing.len())]
    IncompleteTos { missing: Vec<u32> },

    /// Game fork name that is not registered
    #[error("Unknown game variant: {name}")]
    UnknownVariant { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Configuration or asset-graph JSON that does not parse
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Structural failure with the context needed to diagnose a new format revision
    #[error("Failed to decode clip (version {version}, variant {variant}, offset {offset}): {source}")]
    Decode {
        version: EngineVersion,
        variant: GameVariant,
        offset: u64,
        #[source]
        source: Box<ClipError>,
    },
}

impl ClipError {
    /// The innermost error, skipping `Decode` context wrappers.
    pub fn root_cause(&self) -> &ClipError {
        match self {
            ClipError::Decode { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Structural errors are fatal for the clip being decoded.
    pub fn is_structural(&self) -> bool {
        matches!(
            self.root_cause(),
            ClipError::MalformedHeader { .. }
                | ClipError::BufferUnderrun { .. }
                | ClipError::InvalidBitWidth { .. }
                | ClipError::InvalidLength { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_context() {
        let err = ClipError::Decode {
            version: EngineVersion::new(2019, 4, 0),
            variant: GameVariant::Standard,
            offset: 12,
            source: Box::new(ClipError::BufferUnderrun {
                offset: 12,
                wanted: 4,
                available: 0,
            }),
        };
        assert!(matches!(
            err.root_cause(),
            ClipError::BufferUnderrun { offset: 12, .. }
        ));
        assert!(err.is_structural());
        assert!(err.to_string().contains("2019.4.0"));
    }

    #[test]
    fn test_soft_errors_are_not_structural() {
        let err = ClipError::IncompleteTos { missing: vec![1, 2] };
        assert!(!err.is_structural());
        assert_eq!(err.to_string(), "Incomplete TOS: 2 path hash(es) unresolved");
    }
}
