use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::{Error, Result};

pub fn sha256_hex(path: &Path) -> Result<String> {
    let content = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&content)))
}

pub fn sidecar_path(weights: &Path) -> PathBuf {
    let mut name = weights.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Validates `weights` against a `<weights>.sha256` sidecar in `sha256sum`
/// format. Weights without a sidecar are accepted as is.
pub fn verify(weights: &Path) -> Result<()> {
    let sidecar = sidecar_path(weights);
    if !sidecar.exists() {
        return Ok(());
    }

    let expected = fs::read_to_string(&sidecar)?
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let actual = sha256_hex(weights)?;
    if actual != expected {
        return Err(Error::ChecksumMismatch {
            path: weights.to_path_buf(),
            expected,
            actual,
        });
    }

    tracing::debug!("Checksum verified for {}", weights.display());
    Ok(())
}
