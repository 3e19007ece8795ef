//! Decoder for serialized animation clips across engine releases and game forks.

pub mod animation_clip;
pub mod binary;
pub mod binding;
pub mod clip;
pub mod config;
pub mod converter;
pub mod curve;
pub mod document;
pub mod error;
pub mod field_plan;
pub mod humanoid;
pub mod muscle;
pub mod packed;
pub mod pipeline;
pub mod shared_formats;
pub mod streamed;
pub mod tos;
pub mod version;

pub use animation_clip::AnimationClip;
pub use config::{ConfigOverrides, DecoderConfig};
pub use document::{Node, ToDocument};
pub use error::{ClipError, Result};
pub use field_plan::FieldPlan;
pub use pipeline::{decode_batch, decode_clip, export_clip, Decrypt, IdentityDecrypt};
pub use tos::{AssetGraph, MemoryAssetGraph, TosResolver, TosTable};
pub use version::{EngineVersion, GameVariant};
