//! Buffer-to-document entry points.

use std::io::Cursor;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    animation_clip::AnimationClip,
    binary::BinaryReader,
    config::DecoderConfig,
    document::{Node, ToDocument},
    error::{ClipError, Result},
    tos::{AssetGraph, TosResolver},
};

/// Game-specific unwrapping applied to an object buffer before decoding.
pub trait Decrypt: Send + Sync {
    fn decrypt(&self, bytes: Vec<u8>) -> Result<Vec<u8>>;
}

/// Buffers that need no unwrapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDecrypt;

impl Decrypt for IdentityDecrypt {
    fn decrypt(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        Ok(bytes)
    }
}

/// Decodes one clip. Structural failures come back wrapped in
/// [`ClipError::Decode`] with the version, variant and byte offset.
pub fn decode_clip<D: Decrypt + ?Sized>(
    bytes: Vec<u8>,
    config: &DecoderConfig,
    decrypt: &D,
) -> Result<AnimationClip> {
    let plan = config.plan()?;
    let bytes = decrypt.decrypt(bytes)?;
    let wrap = |offset: u64, source: ClipError| ClipError::Decode {
        version: plan.version,
        variant: plan.variant,
        offset,
        source: Box::new(source),
    };

    let mut br = BinaryReader::new(Cursor::new(bytes), config.endian).map_err(|e| wrap(0, e))?;
    let clip = AnimationClip::read_from(&mut br, &plan).map_err(|e| wrap(br.position(), e))?;
    if br.bytes_left() > 0 {
        debug!(name = %clip.name, trailing = br.bytes_left(), "bytes left after clip");
    }
    clip.check_channel_coverage();
    Ok(clip)
}

/// Decodes independent buffers on the rayon pool. Results keep input order.
pub fn decode_batch<D: Decrypt + ?Sized>(
    buffers: Vec<Vec<u8>>,
    config: &DecoderConfig,
    decrypt: &D,
) -> Vec<Result<AnimationClip>> {
    let results: Vec<Result<AnimationClip>> = buffers
        .into_par_iter()
        .map(|bytes| decode_clip(bytes, config, decrypt))
        .collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(clips = results.len(), failed, "decoded batch");
    results
}

/// Resolves transform paths, optionally converts, and renders the document.
pub fn export_clip(
    clip: &mut AnimationClip,
    config: &DecoderConfig,
    graph: Option<&dyn AssetGraph>,
) -> Result<Node> {
    let bindings = clip.bindings().into_owned();
    let mut tos = TosResolver::new(graph).resolve(&clip.name, &bindings);
    if config.strict_tos {
        tos = tos.require_complete()?;
    }
    if config.convert {
        clip.convert(&tos)?;
    }
    Ok(if config.raw {
        clip.to_raw_document()
    } else {
        clip.to_document()
    })
}
