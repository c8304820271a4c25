use std::path::PathBuf;

use crate::Architecture;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown model '{0}', expected one of: espcn, edsr, srgan")]
    UnknownModel(String),

    #[error("{arch} cannot upscale by a factor of {scale}")]
    UnsupportedScale { arch: Architecture, scale: usize },

    #[error("checkpoint not found: {}", .0.display())]
    CheckpointNotFound(PathBuf),

    #[error("failed to read checkpoint {}", path.display())]
    CheckpointRead {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },

    #[error("checkpoint {} contains no tensors", .0.display())]
    EmptyCheckpoint(PathBuf),

    #[error("checkpoint does not match {arch}: {detail}")]
    Mismatch { arch: Architecture, detail: String },

    #[error("failed to load weights into {arch}")]
    Weights {
        arch: Architecture,
        #[source]
        source: candle_core::Error,
    },

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("invalid model config {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to fetch {0} from the Hugging Face Hub")]
    Hub(String, #[source] hf_hub::api::sync::ApiError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}

impl Error {
    /// Whether the error comes from the weights file rather than from the
    /// caller's choice of model or scale.
    pub fn is_weight_load(&self) -> bool {
        matches!(
            self,
            Error::CheckpointRead { .. }
                | Error::EmptyCheckpoint(_)
                | Error::Mismatch { .. }
                | Error::Weights { .. }
                | Error::ChecksumMismatch { .. }
                | Error::Config { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
