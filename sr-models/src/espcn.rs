//! ESPCN: efficient sub-pixel convolution on the luma channel.

use candle_core::{Module, Result, Tensor};
use candle_nn::{Conv2d, VarBuilder};

use crate::ModelConfig;
use crate::ops::{pixel_shuffle, same_conv2d};

#[derive(Debug)]
pub struct Espcn {
    feature_maps_0: Conv2d,
    feature_maps_2: Conv2d,
    sub_pixel: Conv2d,
    scale: usize,
}

impl Espcn {
    pub fn new(scale: usize, config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let channels = config.channels;
        let hidden = channels / 2;

        let features = vb.pp("feature_maps");
        let feature_maps_0 = same_conv2d(1, channels, 5, true, features.pp("0"))?;
        let feature_maps_2 = same_conv2d(channels, hidden, 3, true, features.pp("2"))?;
        let sub_pixel = same_conv2d(hidden, scale * scale, 3, true, vb.pp("sub_pixel").pp("0"))?;

        Ok(Self {
            feature_maps_0,
            feature_maps_2,
            sub_pixel,
            scale,
        })
    }
}

impl Module for Espcn {
    /// `(b, 1, h, w)` luma in the unit range to `(b, 1, h * s, w * s)`.
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = xs.apply(&self.feature_maps_0)?.tanh()?;
        let xs = xs.apply(&self.feature_maps_2)?.tanh()?;
        let xs = xs.apply(&self.sub_pixel)?;
        pixel_shuffle(&xs, self.scale)
    }
}
