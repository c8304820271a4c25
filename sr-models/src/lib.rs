pub mod checkpoint;
pub mod checksum;
mod config;
pub mod device;
pub mod edsr;
mod error;
pub mod espcn;
pub mod hub;
pub mod ops;
pub mod srresnet;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{VarBuilder, VarMap};

pub use checkpoint::{Checkpoint, Envelope, Format};
pub use config::ModelConfig;
pub use device::select_device;
pub use error::{Error, Result};

use crate::edsr::Edsr;
use crate::espcn::Espcn;
use crate::hub::WeightsLocation;
use crate::srresnet::SrResNet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    Espcn,
    Edsr,
    /// The SRGAN generator.
    SrResNet,
}

impl Architecture {
    pub const ALL: [Architecture; 3] = [Architecture::Espcn, Architecture::Edsr, Architecture::SrResNet];

    pub fn name(self) -> &'static str {
        match self {
            Architecture::Espcn => "espcn",
            Architecture::Edsr => "edsr",
            Architecture::SrResNet => "srgan",
        }
    }

    /// Factors of the successive sub-pixel upsampling stages for `scale`.
    pub fn upsample_steps(self, scale: usize) -> Result<Vec<usize>> {
        let doublings = || {
            (scale >= 2 && scale.is_power_of_two()).then(|| vec![2; scale.trailing_zeros() as usize])
        };
        let steps = match self {
            Architecture::Espcn => (scale >= 1).then(|| vec![scale]),
            Architecture::Edsr if scale == 3 => Some(vec![3]),
            Architecture::Edsr | Architecture::SrResNet => doublings(),
        };
        steps.ok_or(Error::UnsupportedScale { arch: self, scale })
    }

    /// Buffers a checkpoint may carry that the network does not need.
    fn is_optional_key(self, name: &str) -> bool {
        name.ends_with("num_batches_tracked") || (self == Architecture::Edsr && name == "mean")
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Architecture {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "espcn" => Ok(Architecture::Espcn),
            "edsr" => Ok(Architecture::Edsr),
            "srgan" | "srresnet" => Ok(Architecture::SrResNet),
            _ => Err(Error::UnknownModel(name.to_string())),
        }
    }
}

#[derive(Debug)]
enum Network {
    Espcn(Espcn),
    Edsr(Edsr),
    SrResNet(SrResNet),
}

/// A super-resolution network with its weights, ready for inference.
///
/// There is no training mode: batch norm layers always use their running
/// statistics.
#[derive(Debug)]
pub struct SrModel {
    arch: Architecture,
    scale: usize,
    network: Network,
}

impl SrModel {
    pub fn new(arch: Architecture, scale: usize, config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let steps = arch.upsample_steps(scale)?;
        let network = match arch {
            Architecture::Espcn => Espcn::new(scale, config, vb).map(Network::Espcn),
            Architecture::Edsr => Edsr::new(&steps, config, vb).map(Network::Edsr),
            Architecture::SrResNet => SrResNet::new(steps.len(), config, vb).map(Network::SrResNet),
        }
        .map_err(|source| Error::Weights { arch, source })?;

        Ok(Self {
            arch,
            scale,
            network,
        })
    }

    /// Builds `arch` for `scale` and fills it from the checkpoint at
    /// `weights` (a local path or `hf://owner/repo/file`).
    pub fn load(
        arch: Architecture,
        scale: usize,
        weights: impl AsRef<Path>,
        device: &Device,
    ) -> Result<Self> {
        arch.upsample_steps(scale)?;

        let path = WeightsLocation::parse(weights.as_ref()).resolve()?;
        checksum::verify(&path)?;
        let config = ModelConfig::for_weights(&path)?;
        let checkpoint = Checkpoint::load(&path)?;
        tracing::info!(
            "Loading {arch} x{scale} from {} ({} tensors, {}, {})",
            path.display(),
            checkpoint.len(),
            checkpoint.format(),
            checkpoint.envelope()
        );

        let expected = Self::expected_keys(arch, scale, &config)?;
        check_keys(arch, &expected, &checkpoint)?;

        Self::new(arch, scale, &config, checkpoint.into_var_builder(device))
    }

    /// Parameter names `arch` reads for `scale`, without optional buffers.
    pub fn expected_keys(arch: Architecture, scale: usize, config: &ModelConfig) -> Result<BTreeSet<String>> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        Self::new(arch, scale, config, vb)?;

        let data = varmap
            .data()
            .lock()
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;
        Ok(data.keys().cloned().collect())
    }

    pub fn architecture(&self) -> Architecture {
        self.arch
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Input channels the network expects: 1 for ESPCN (luma), 3 otherwise.
    pub fn in_channels(&self) -> usize {
        match self.arch {
            Architecture::Espcn => 1,
            Architecture::Edsr | Architecture::SrResNet => 3,
        }
    }
}

impl Module for SrModel {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match &self.network {
            Network::Espcn(net) => net.forward(xs),
            Network::Edsr(net) => net.forward(xs),
            Network::SrResNet(net) => net.forward(xs),
        }
    }
}

/// Rejects checkpoints whose names do not line up with the architecture,
/// the way a strict `load_state_dict` does.
fn check_keys(arch: Architecture, expected: &BTreeSet<String>, checkpoint: &Checkpoint) -> Result<()> {
    let missing: Vec<&str> = expected
        .iter()
        .map(String::as_str)
        .filter(|name| checkpoint.get(name).is_none())
        .collect();
    let unexpected: Vec<&str> = checkpoint
        .names()
        .into_iter()
        .filter(|name| !expected.contains(*name) && !arch.is_optional_key(name))
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }

    let mut detail = Vec::new();
    if !missing.is_empty() {
        detail.push(format!("missing keys {}", summarize(&missing)));
    }
    if !unexpected.is_empty() {
        detail.push(format!("unexpected keys {}", summarize(&unexpected)));
    }
    Err(Error::Mismatch {
        arch,
        detail: detail.join(", "),
    })
}

fn summarize(names: &[&str]) -> String {
    const SHOWN: usize = 5;
    let mut out = names.iter().take(SHOWN).copied().collect::<Vec<_>>().join(", ");
    if names.len() > SHOWN {
        out.push_str(&format!(" and {} more", names.len() - SHOWN));
    }
    format!("[{out}]")
}
