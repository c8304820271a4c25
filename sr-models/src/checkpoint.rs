use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;

use crate::{Error, Result};

/// Keys under which training scripts nest the parameter mapping.
pub const ENVELOPE_KEYS: [&str; 2] = ["state_dict", "model_state_dict"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `torch.save` output (`.pth`, `.pt`, `.pth.tar`).
    Pickle,
    SafeTensors,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Pickle => write!(f, "pytorch"),
            Format::SafeTensors => write!(f, "safetensors"),
        }
    }
}

/// How the parameter mapping was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Bare,
    Nested(&'static str),
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Envelope::Bare => write!(f, "bare"),
            Envelope::Nested(key) => write!(f, "nested under '{key}'"),
        }
    }
}

/// A flat parameter-name to tensor mapping, whatever envelope it came in.
#[derive(Debug)]
pub struct Checkpoint {
    format: Format,
    envelope: Envelope,
    tensors: HashMap<String, Tensor>,
}

impl Checkpoint {
    pub fn new(tensors: HashMap<String, Tensor>) -> Self {
        Self {
            format: Format::SafeTensors,
            envelope: Envelope::Bare,
            tensors,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::CheckpointNotFound(path.to_path_buf()));
        }

        let format = sniff_format(path)?;
        let read_error = |source| Error::CheckpointRead {
            path: path.to_path_buf(),
            source,
        };
        let (envelope, tensors) = match format {
            Format::Pickle => read_pickle(path).map_err(read_error)?,
            Format::SafeTensors => {
                let tensors = candle_core::safetensors::load(path, &Device::Cpu).map_err(read_error)?;
                unwrap_dotted(tensors)
            }
        };

        if tensors.is_empty() {
            return Err(Error::EmptyCheckpoint(path.to_path_buf()));
        }

        tracing::debug!(
            "Read {} tensors from {} ({format}, {envelope})",
            tensors.len(),
            path.display()
        );

        Ok(Self {
            format,
            envelope,
            tensors,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Parameter names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Removes `prefix` from every key that starts with it, returning how many
    /// keys were renamed.
    pub fn strip_prefix(&mut self, prefix: &str) -> usize {
        let mut renamed = 0;
        self.tensors = std::mem::take(&mut self.tensors)
            .into_iter()
            .map(|(name, tensor)| match name.strip_prefix(prefix) {
                Some(stripped) => {
                    renamed += 1;
                    (stripped.to_string(), tensor)
                }
                None => (name, tensor),
            })
            .collect();
        renamed
    }

    /// Writes the bare mapping as safetensors.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        candle_core::safetensors::save(&self.tensors, path)?;
        Ok(())
    }

    pub fn into_var_builder(self, device: &Device) -> VarBuilder<'static> {
        VarBuilder::from_tensors(self.tensors, DType::F32, device)
    }
}

fn sniff_format(path: &Path) -> Result<Format> {
    // safetensors: u64 little-endian header length followed by a JSON object.
    let mut head = [0u8; 9];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < head.len() {
        match file.read(&mut head[filled..])? {
            0 => break,
            n => filled += n,
        }
    }

    if filled == head.len() && head[8] == b'{' {
        let header_len = u64::from_le_bytes([
            head[0], head[1], head[2], head[3], head[4], head[5], head[6], head[7],
        ]);
        if header_len < std::fs::metadata(path)?.len() {
            return Ok(Format::SafeTensors);
        }
    }

    Ok(Format::Pickle)
}

fn read_pickle(path: &Path) -> candle_core::Result<(Envelope, HashMap<String, Tensor>)> {
    for key in ENVELOPE_KEYS {
        if let Ok(tensors) = candle_core::pickle::read_all_with_key(path, Some(key)) {
            if !tensors.is_empty() {
                return Ok((Envelope::Nested(key), tensors.into_iter().collect()));
            }
        }
    }

    let tensors = candle_core::pickle::read_all_with_key(path, None)?;
    Ok((Envelope::Bare, tensors.into_iter().collect()))
}

/// Flat formats spell a nested mapping as dotted keys (`state_dict.conv1.weight`).
fn unwrap_dotted(tensors: HashMap<String, Tensor>) -> (Envelope, HashMap<String, Tensor>) {
    for key in ENVELOPE_KEYS {
        let prefix = format!("{key}.");
        if tensors.keys().any(|name| name.starts_with(&prefix)) {
            let nested = tensors
                .into_iter()
                .filter_map(|(name, tensor)| {
                    name.strip_prefix(&prefix)
                        .map(|stripped| (stripped.to_string(), tensor))
                })
                .collect();
            return (Envelope::Nested(key), nested);
        }
    }
    (Envelope::Bare, tensors)
}
