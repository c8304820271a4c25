use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Architecture hyperparameters. Checkpoints trained with non-default widths
/// or depths ship them in a `<weights>.json` sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Feature channels of the first convolution.
    pub channels: usize,
    /// Residual blocks in the trunk (EDSR, SRResNet).
    pub num_blocks: usize,
    /// Residual scaling applied inside EDSR blocks.
    pub res_scale: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            channels: 64,
            num_blocks: 16,
            res_scale: 0.1,
        }
    }
}

impl ModelConfig {
    pub fn sidecar_path(weights: &Path) -> PathBuf {
        let mut name = weights.as_os_str().to_owned();
        name.push(".json");
        PathBuf::from(name)
    }

    /// Reads the sidecar next to `weights`, falling back to the defaults
    /// when there is none.
    pub fn for_weights(weights: &Path) -> Result<Self> {
        let path = Self::sidecar_path(weights);
        if !path.exists() {
            return Ok(Self::default());
        }

        let file = std::fs::File::open(&path)?;
        let config: Self =
            serde_json::from_reader(file).map_err(|source| Error::Config { path: path.clone(), source })?;
        tracing::info!("Using model config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sidecar_means_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = ModelConfig::for_weights(&dir.path().join("espcn_x2.pth"))?;
        assert_eq!(config, ModelConfig::default());
        Ok(())
    }

    #[test]
    fn partial_sidecar_keeps_other_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let weights = dir.path().join("edsr_x4.pth");
        std::fs::write(dir.path().join("edsr_x4.pth.json"), r#"{ "num_blocks": 32 }"#)?;

        let config = ModelConfig::for_weights(&weights)?;
        assert_eq!(config.num_blocks, 32);
        assert_eq!(config.channels, 64);
        assert_eq!(config.res_scale, 0.1);
        Ok(())
    }

    #[test]
    fn malformed_sidecar_is_a_config_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let weights = dir.path().join("srgan_x4.pth");
        std::fs::write(ModelConfig::sidecar_path(&weights), "{ channels: ")?;

        let err = ModelConfig::for_weights(&weights).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.is_weight_load());
        Ok(())
    }
}
