//! Planar float images and the luma/chroma conversions around the networks.
//!
//! Planes are `(channels, height, width)` arrays. YCrCb follows the usual
//! full-range definition with the chroma offset at the middle of the unit
//! range, so a unit-range RGB image maps onto unit-range YCrCb.

use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

const CHROMA_OFFSET: f32 = 0.5;

/// RGB samples divided by `divisor`.
pub fn rgb_planes(image: &RgbImage, divisor: f32) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut planes = Array3::zeros((3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        planes[[0, y, x]] = pixel[0] as f32 / divisor;
        planes[[1, y, x]] = pixel[1] as f32 / divisor;
        planes[[2, y, x]] = pixel[2] as f32 / divisor;
    }
    planes
}

/// Multiplies by `gain`, rounds and saturates to 8 bits.
pub fn planes_to_rgb(planes: ArrayView3<f32>, gain: f32) -> anyhow::Result<RgbImage> {
    let (channels, height, width) = planes.dim();
    anyhow::ensure!(channels == 3, "expected 3 channels, got {channels}");

    let mut image = RgbImage::new(width as u32, height as u32);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let (x, y) = (x as usize, y as usize);
        *pixel = Rgb([
            quantize(planes[[0, y, x]] * gain),
            quantize(planes[[1, y, x]] * gain),
            quantize(planes[[2, y, x]] * gain),
        ]);
    }
    Ok(image)
}

/// Rounds to the nearest integer, saturating at the ends of the 8-bit range.
pub fn quantize(value: f32) -> u8 {
    // float-to-int `as` saturates and maps NaN to 0
    value.round() as u8
}

pub fn rgb_to_ycrcb(rgb: ArrayView3<f32>) -> Array3<f32> {
    let mut ycrcb = Array3::zeros(rgb.raw_dim());
    let (mut y, mut rest) = ycrcb.view_mut().split_at(Axis(0), 1);
    let (mut cr, mut cb) = rest.view_mut().split_at(Axis(0), 1);

    Zip::from(y.index_axis_mut(Axis(0), 0))
        .and(cr.index_axis_mut(Axis(0), 0))
        .and(cb.index_axis_mut(Axis(0), 0))
        .and(rgb.index_axis(Axis(0), 0))
        .and(rgb.index_axis(Axis(0), 1))
        .and(rgb.index_axis(Axis(0), 2))
        .for_each(|y, cr, cb, &r, &g, &b| {
            *y = 0.299 * r + 0.587 * g + 0.114 * b;
            *cr = (r - *y) * 0.713 + CHROMA_OFFSET;
            *cb = (b - *y) * 0.564 + CHROMA_OFFSET;
        });
    ycrcb
}

pub fn ycrcb_to_rgb(ycrcb: ArrayView3<f32>) -> Array3<f32> {
    let mut rgb = Array3::zeros(ycrcb.raw_dim());
    let (mut r, mut rest) = rgb.view_mut().split_at(Axis(0), 1);
    let (mut g, mut b) = rest.view_mut().split_at(Axis(0), 1);

    Zip::from(r.index_axis_mut(Axis(0), 0))
        .and(g.index_axis_mut(Axis(0), 0))
        .and(b.index_axis_mut(Axis(0), 0))
        .and(ycrcb.index_axis(Axis(0), 0))
        .and(ycrcb.index_axis(Axis(0), 1))
        .and(ycrcb.index_axis(Axis(0), 2))
        .for_each(|r, g, b, &y, &cr, &cb| {
            let (cr, cb) = (cr - CHROMA_OFFSET, cb - CHROMA_OFFSET);
            *r = y + 1.403 * cr;
            *g = y - 0.714 * cr - 0.344 * cb;
            *b = y + 1.773 * cb;
        });
    rgb
}

/// Resamples a single unit-range plane to `width` x `height`. Values are kept
/// inside [0, 1].
pub fn resize_plane(
    plane: ArrayView2<f32>,
    width: usize,
    height: usize,
    filter: FilterType,
) -> anyhow::Result<Array2<f32>> {
    let (rows, cols) = plane.dim();
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(cols as u32, rows as u32, plane.iter().copied().collect())
            .context("plane does not fit an image buffer")?;

    let resized = imageops::resize(&buffer, width as u32, height as u32, filter);
    Ok(Array2::from_shape_vec((height, width), resized.into_raw())?)
}
