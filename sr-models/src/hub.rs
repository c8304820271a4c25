use std::path::{Path, PathBuf};

use hf_hub::api::sync::Api;

use crate::{Error, Result};

const HUB_SCHEME: &str = "hf://";

/// Where a weights argument points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsLocation {
    Local(PathBuf),
    /// `hf://owner/repo/path/in/repo.pth`
    Hub { repo: String, file: String },
}

impl WeightsLocation {
    pub fn parse(weights: &Path) -> Self {
        let Some(rest) = weights.to_str().and_then(|s| s.strip_prefix(HUB_SCHEME)) else {
            return Self::Local(weights.to_path_buf());
        };

        let mut parts = rest.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), Some(file))
                if !owner.is_empty() && !name.is_empty() && !file.is_empty() =>
            {
                Self::Hub {
                    repo: format!("{owner}/{name}"),
                    file: file.to_string(),
                }
            }
            _ => Self::Local(weights.to_path_buf()),
        }
    }

    /// Returns a local path, downloading into the Hugging Face cache when
    /// needed.
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            Self::Local(path) => {
                if !path.is_file() {
                    return Err(Error::CheckpointNotFound(path.clone()));
                }
                Ok(path.clone())
            }
            Self::Hub { repo, file } => {
                let target = format!("{repo}/{file}");
                tracing::info!("Fetching {target} from the Hugging Face Hub");
                let api = Api::new().map_err(|e| Error::Hub(target.clone(), e))?;
                api.model(repo.clone())
                    .get(file)
                    .map_err(|e| Error::Hub(target, e))
            }
        }
    }
}
