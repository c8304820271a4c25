use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sr_models::{Checkpoint, checksum};
use tracing_subscriber::EnvFilter;

/// Inspect and migrate super-resolution checkpoints.
#[derive(Parser)]
#[command(name = "sr-models", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the format, envelope, digest and tensors of a checkpoint
    Inspect {
        checkpoint: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// Strip a key prefix (left by `torch.compile`) and write a bare safetensors mapping
    RenameKeys {
        input: PathBuf,

        output: PathBuf,

        #[arg(long, default_value = "_orig_mod.")]
        prefix: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { checkpoint, json } => inspect(&checkpoint, json),
        Command::RenameKeys {
            input,
            output,
            prefix,
        } => rename_keys(&input, &output, &prefix),
    }
}

fn inspect(path: &Path, json: bool) -> anyhow::Result<()> {
    let checkpoint = Checkpoint::load(path)
        .with_context(|| format!("Failed to load checkpoint {}", path.display()))?;
    let digest = checksum::sha256_hex(path)?;

    let tensors = checkpoint
        .names()
        .into_iter()
        .filter_map(|name| checkpoint.get(name).map(|t| (name, t)))
        .map(|(name, tensor)| (name, tensor.dims().to_vec(), tensor.dtype().as_str()))
        .collect::<Vec<_>>();

    if json {
        let report = serde_json::json!({
            "format": checkpoint.format().to_string(),
            "envelope": checkpoint.envelope().to_string(),
            "sha256": digest,
            "tensors": tensors
                .iter()
                .map(|(name, shape, dtype)| serde_json::json!({ "name": name, "shape": shape, "dtype": dtype }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("format:   {}", checkpoint.format());
    println!("envelope: {}", checkpoint.envelope());
    println!("sha256:   {digest}");
    println!("tensors:  {}", tensors.len());
    for (name, shape, dtype) in tensors {
        println!("  {name} {shape:?} {dtype}");
    }

    Ok(())
}

fn rename_keys(input: &Path, output: &Path, prefix: &str) -> anyhow::Result<()> {
    let mut checkpoint = Checkpoint::load(input)
        .with_context(|| format!("Failed to load checkpoint {}", input.display()))?;
    tracing::info!(
        "Read {} keys from {} ({})",
        checkpoint.len(),
        input.display(),
        checkpoint.envelope()
    );
    for name in checkpoint.names() {
        tracing::info!("original key: {name}");
    }

    let renamed = checkpoint.strip_prefix(prefix);
    for name in checkpoint.names() {
        tracing::info!("renamed key: {name}");
    }

    checkpoint
        .save(output)
        .with_context(|| format!("Failed to save checkpoint {}", output.display()))?;

    println!(
        "Renamed {renamed} of {} keys, saved to {}",
        checkpoint.len(),
        output.display()
    );

    Ok(())
}
