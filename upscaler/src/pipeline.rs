//! The per-method processors: classical resampling and the colour handling
//! each network expects around its forward pass.

use std::time::Instant;

use anyhow::Context;
use candle_core::{DType, Device, Module, Tensor};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::{Array3, ArrayView3, Axis, s};
use sr_models::{Architecture, SrModel};

use crate::UpscaleError;
use crate::color::{self, planes_to_rgb, rgb_planes};

/// Input size times `scale` in both axes.
pub fn target_size(width: u32, height: u32, scale: u32) -> Result<(u32, u32), UpscaleError> {
    match (width.checked_mul(scale), height.checked_mul(scale)) {
        (Some(w), Some(h)) if scale > 0 => Ok((w, h)),
        _ => Err(UpscaleError::InvalidParameter(format!(
            "cannot scale a {width}x{height} image by {scale}"
        ))),
    }
}

/// Resizes with a classical filter. The colour type of `image` is kept.
pub fn interpolate(
    image: &DynamicImage,
    scale: u32,
    filter: FilterType,
) -> Result<DynamicImage, UpscaleError> {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = target_size(width, height, scale)?;
    Ok(image.resize_exact(new_width, new_height, filter))
}

/// Runs `model` with the colour pipeline its architecture was trained with.
pub fn super_resolve(model: &SrModel, image: &DynamicImage, device: &Device) -> anyhow::Result<RgbImage> {
    let rgb = image.to_rgb8();
    let start = Instant::now();

    let output = match model.architecture() {
        Architecture::Espcn => upscale_luma(model, &rgb, device),
        Architecture::Edsr => upscale_full_range(model, &rgb, device),
        Architecture::SrResNet => upscale_unit_range(model, &rgb, device),
    }?;

    tracing::info!(
        "{} x{} inference {}x{} -> {}x{} took {:?}",
        model.architecture(),
        model.scale(),
        rgb.width(),
        rgb.height(),
        output.width(),
        output.height(),
        start.elapsed()
    );
    Ok(output)
}

/// Network on luma only; chroma is upsampled with a cubic filter to the
/// network's output size.
pub fn upscale_luma(model: &SrModel, image: &RgbImage, device: &Device) -> anyhow::Result<RgbImage> {
    let ycrcb = color::rgb_to_ycrcb(rgb_planes(image, 255.0).view());

    let mut luma = forward(model, ycrcb.slice(s![0..1, .., ..]), device)?;
    luma.mapv_inplace(|v| v.clamp(0.0, 1.0));
    let (_, height, width) = luma.dim();

    let cr = color::resize_plane(ycrcb.index_axis(Axis(0), 1), width, height, FilterType::CatmullRom)?;
    let cb = color::resize_plane(ycrcb.index_axis(Axis(0), 2), width, height, FilterType::CatmullRom)?;
    let merged = ndarray::stack(Axis(0), &[luma.index_axis(Axis(0), 0), cr.view(), cb.view()])?;

    planes_to_rgb(color::ycrcb_to_rgb(merged.view()).view(), 255.0)
}

/// RGB in [0, 255] in and out, clamped to [0, 255].
pub fn upscale_full_range(model: &SrModel, image: &RgbImage, device: &Device) -> anyhow::Result<RgbImage> {
    let mut output = forward(model, rgb_planes(image, 1.0).view(), device)?;
    output.mapv_inplace(|v| v.clamp(0.0, 255.0));
    planes_to_rgb(output.view(), 1.0)
}

/// RGB in the unit range in and out. The output is not clamped; only the
/// final 8-bit conversion saturates.
pub fn upscale_unit_range(model: &SrModel, image: &RgbImage, device: &Device) -> anyhow::Result<RgbImage> {
    let output = forward(model, rgb_planes(image, 255.0).view(), device)?;
    planes_to_rgb(output.view(), 255.0)
}

fn forward(model: &SrModel, planes: ArrayView3<f32>, device: &Device) -> anyhow::Result<Array3<f32>> {
    let (channels, height, width) = planes.dim();
    anyhow::ensure!(
        channels == model.in_channels(),
        "{} expects {} input channels, got {channels}",
        model.architecture(),
        model.in_channels()
    );

    let xs = Tensor::from_iter(planes.iter().copied(), device)?.reshape((1, channels, height, width))?;
    let ys = model
        .forward(&xs)
        .with_context(|| format!("Failed to run {}", model.architecture()))?;

    let ys = ys.squeeze(0)?.to_dtype(DType::F32)?.to_device(&Device::Cpu)?;
    let dims = ys.dims3()?;
    let data = ys.flatten_all()?.to_vec1::<f32>()?;
    Ok(Array3::from_shape_vec(dims, data)?)
}
