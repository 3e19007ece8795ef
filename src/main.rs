//! clipdecode - decode serialized animation clips to JSON documents
//!
//! # Commands
//!
//! - `clipdecode decode` - Decode raw clip buffers, one JSON document per clip
//! - `clipdecode plan` - Print the field plan of a version bracket
//! - `clipdecode variants` - List supported game variants

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use clipdecode::{
    binary::Endian, decode_batch, export_clip, AssetGraph, ConfigOverrides, DecoderConfig,
    EngineVersion, GameVariant, IdentityDecrypt, MemoryAssetGraph,
};

/// Decoder for serialized animation clips
#[derive(Parser)]
#[command(name = "clipdecode")]
#[command(about = "Decode serialized animation clips across engine versions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode raw AnimationClip object buffers
    Decode(DecodeArgs),

    /// Print which optional fields a version bracket reads
    Plan(PlanArgs),

    /// List supported game variants
    Variants,
}

#[derive(Args)]
struct DecodeArgs {
    /// Raw object buffers, one clip each
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Engine version, e.g. 2019.4.31f1
    #[arg(long)]
    version: Option<EngineVersion>,

    /// Game variant (Standard, GI, BH3, SR, TOT)
    #[arg(long)]
    variant: Option<GameVariant>,

    /// Read big-endian buffers
    #[arg(long)]
    big_endian: bool,

    /// JSON decoder configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON asset graph used to resolve transform paths
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Output directory (defaults to next to each input)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Include the raw muscle clip and ACL sections
    #[arg(long)]
    raw: bool,

    /// Skip curve synthesis
    #[arg(long)]
    no_convert: bool,

    /// Fail clips whose transform paths do not all resolve
    #[arg(long)]
    strict_tos: bool,
}

#[derive(Args)]
struct PlanArgs {
    #[arg(long)]
    version: EngineVersion,

    #[arg(long, default_value = "Standard")]
    variant: GameVariant,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Decode(args) => decode(args),
        Commands::Plan(args) => {
            let plan = clipdecode::FieldPlan::new(args.version, args.variant);
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Commands::Variants => {
            for variant in GameVariant::ALL {
                println!("{:<10} {:<24} {}", variant.name(), variant.display_name(), variant.extension());
            }
            Ok(())
        }
    }
}

fn load_config(args: &DecodeArgs) -> Result<DecoderConfig> {
    let base = match &args.config {
        Some(path) => DecoderConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DecoderConfig::default(),
    };
    let overrides = ConfigOverrides {
        version: args.version,
        variant: args.variant,
        endian: args.big_endian.then_some(Endian::Big),
        strict_tos: args.strict_tos.then_some(true),
        convert: args.no_convert.then_some(false),
        raw: args.raw.then_some(true),
    };
    Ok(base.with_overrides(&overrides))
}

fn output_path(input: &Path, out: Option<&Path>) -> PathBuf {
    let file_name = input.with_extension("json");
    match (out, file_name.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => file_name,
    }
}

fn decode(args: DecodeArgs) -> Result<()> {
    let config = load_config(&args)?;
    let graph = match &args.graph {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read asset graph {}", path.display()))?;
            Some(MemoryAssetGraph::from_json(&text)?)
        }
        None => None,
    };
    if let Some(out) = &args.out {
        fs::create_dir_all(out)?;
    }

    let buffers = args
        .files
        .iter()
        .map(|path| fs::read(path).with_context(|| format!("Failed to read {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let results = decode_batch(buffers, &config, &IdentityDecrypt);
    let mut failed = 0;
    for (path, result) in args.files.iter().zip(results) {
        let exported = result.and_then(|mut clip| {
            export_clip(
                &mut clip,
                &config,
                graph.as_ref().map(|g| g as &dyn AssetGraph),
            )
        });
        match exported {
            Ok(doc) => {
                let target = output_path(path, args.out.as_deref());
                fs::write(&target, serde_json::to_string_pretty(&doc)?)?;
                info!(input = %path.display(), output = %target.display(), "exported clip");
            }
            Err(e) => {
                failed += 1;
                error!(input = %path.display(), error = %e, "failed to decode clip");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} clips failed", args.files.len());
    }
    Ok(())
}
