pub mod color;
mod error;
pub mod image_io;
mod method;
pub mod pipeline;

use std::path::PathBuf;

use anyhow::Context;
use image::DynamicImage;
use image::imageops::FilterType;
use sr_models::{Architecture, SrModel};
use sr_models::device::describe;

pub use error::UpscaleError;
pub use method::Method;

/// One upscaling request, built from the command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Ignored by the interpolation methods.
    pub weights: PathBuf,
    pub method: Method,
    pub scale: u32,
}

impl Invocation {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        weights: impl Into<PathBuf>,
        method: &str,
        scale: u32,
    ) -> Result<Self, UpscaleError> {
        let method = method.parse()?;
        if scale == 0 {
            return Err(UpscaleError::InvalidParameter(
                "scale must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            input: input.into(),
            output: output.into(),
            weights: weights.into(),
            method,
            scale,
        })
    }
}

/// Upscales `invocation.input` and writes the result to `invocation.output`.
pub fn run(invocation: &Invocation) -> Result<(), UpscaleError> {
    match invocation.method {
        Method::Bilinear => interpolate_file(invocation, FilterType::Triangle),
        Method::Bicubic => interpolate_file(invocation, FilterType::CatmullRom),
        Method::Espcn => super_resolve_file(invocation, Architecture::Espcn),
        Method::Edsr => super_resolve_file(invocation, Architecture::Edsr),
        Method::Srgan => super_resolve_file(invocation, Architecture::SrResNet),
    }?;

    tracing::info!(
        "{} x{} wrote {}",
        invocation.method,
        invocation.scale,
        invocation.output.display()
    );
    Ok(())
}

/// Classical resampling. The weights path is never looked at.
fn interpolate_file(invocation: &Invocation, filter: FilterType) -> Result<(), UpscaleError> {
    let source = image_io::read_image(&invocation.input)?;
    let upscaled = pipeline::interpolate(&source.image, invocation.scale, filter)?;
    image_io::write_image(&upscaled, &invocation.output, source.format)?;
    Ok(())
}

/// Device, then model, then image.
fn super_resolve_file(invocation: &Invocation, arch: Architecture) -> Result<(), UpscaleError> {
    let device = sr_models::select_device().context("Failed to select a compute device")?;
    tracing::info!("Using device: {}", describe(&device));

    let model = SrModel::load(arch, invocation.scale as usize, &invocation.weights, &device)?;
    let source = image_io::read_image(&invocation.input)?;

    let upscaled = pipeline::super_resolve(&model, &source.image, &device)?;
    image_io::write_image(&DynamicImage::ImageRgb8(upscaled), &invocation.output, source.format)?;
    Ok(())
}
