use std::io::{self, Write};
use std::path::PathBuf;

/// Everything that can end an upscaling run. Each variant maps to exit code 1
/// with its own message; only `Other` carries a full trace.
#[derive(Debug, thiserror::Error)]
pub enum UpscaleError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("failed to load weights")]
    WeightLoad(#[source] sr_models::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sr_models::Error> for UpscaleError {
    fn from(err: sr_models::Error) -> Self {
        match err {
            sr_models::Error::UnknownModel(_) | sr_models::Error::UnsupportedScale { .. } => {
                UpscaleError::InvalidParameter(err.to_string())
            }
            sr_models::Error::CheckpointNotFound(path) => UpscaleError::FileNotFound(path),
            err if err.is_weight_load() => UpscaleError::WeightLoad(err),
            err => UpscaleError::Other(err.into()),
        }
    }
}

impl UpscaleError {
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Writes the diagnostic for the calling process.
    pub fn report(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            UpscaleError::FileNotFound(path) => {
                writeln!(out, "error: file not found: {}", path.display())
            }
            UpscaleError::InvalidParameter(detail) => writeln!(out, "parameter error: {detail}"),
            UpscaleError::WeightLoad(err) => {
                writeln!(out, "error: failed to load weights: {}", chain(err))
            }
            UpscaleError::Other(err) => {
                writeln!(out, "error: upscaling failed: {err:#}")?;
                writeln!(out, "{err:?}")
            }
        }
    }
}

fn chain(err: &(dyn std::error::Error + 'static)) -> String {
    anyhow::Chain::new(err)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_models::Architecture;

    fn reported(err: &UpscaleError) -> String {
        let mut out = Vec::new();
        err.report(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn model_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            UpscaleError::from(sr_models::Error::UnknownModel("foo".into())),
            UpscaleError::InvalidParameter(_)
        ));
        assert!(matches!(
            UpscaleError::from(sr_models::Error::UnsupportedScale {
                arch: Architecture::SrResNet,
                scale: 3
            }),
            UpscaleError::InvalidParameter(_)
        ));
        assert!(matches!(
            UpscaleError::from(sr_models::Error::CheckpointNotFound("w.pth".into())),
            UpscaleError::FileNotFound(_)
        ));
        assert!(matches!(
            UpscaleError::from(sr_models::Error::Mismatch {
                arch: Architecture::Edsr,
                detail: "missing keys [conv1.weight]".into()
            }),
            UpscaleError::WeightLoad(_)
        ));
        assert!(matches!(
            UpscaleError::from(sr_models::Error::Io(io::Error::other("disk on fire"))),
            UpscaleError::Other(_)
        ));
    }

    #[test]
    fn reports_are_distinguishable() {
        let not_found = reported(&UpscaleError::FileNotFound("in.png".into()));
        assert_eq!(not_found, "error: file not found: in.png\n");

        let param = reported(&UpscaleError::InvalidParameter("unknown model/method 'foo'".into()));
        assert!(param.starts_with("parameter error: "));

        let weights = reported(&UpscaleError::WeightLoad(sr_models::Error::Mismatch {
            arch: Architecture::Espcn,
            detail: "missing keys [sub_pixel.0.weight]".into(),
        }));
        assert_eq!(
            weights,
            "error: failed to load weights: checkpoint does not match espcn: missing keys [sub_pixel.0.weight]\n"
        );
    }

    #[test]
    fn weight_load_report_follows_the_source_chain() {
        let err = UpscaleError::WeightLoad(sr_models::Error::CheckpointRead {
            path: "SRGAN_4x.pth.tar".into(),
            source: candle_core::Error::Msg("invalid zip archive".into()),
        });
        assert_eq!(
            reported(&err),
            "error: failed to load weights: failed to read checkpoint SRGAN_4x.pth.tar: invalid zip archive\n"
        );
    }

    #[test]
    fn other_errors_carry_a_trace() {
        let err = UpscaleError::Other(anyhow::anyhow!("decoder exploded").context("Failed to run model"));
        let text = reported(&err);
        assert!(text.starts_with("error: upscaling failed: Failed to run model: decoder exploded\n"));
        assert!(text.contains("Caused by:"));
    }
}
