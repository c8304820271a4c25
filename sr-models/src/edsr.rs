//! EDSR: enhanced deep residual network, operating on RGB in [0, 255].

use candle_core::{Module, Result, Tensor};
use candle_nn::{Conv2d, VarBuilder};

use crate::ModelConfig;
use crate::ops::{pixel_shuffle, same_conv2d};

/// DIV2K RGB mean, used when the checkpoint carries no `mean` buffer.
pub const DIV2K_MEAN: [f32; 3] = [0.4488, 0.4371, 0.4040];

const PIXEL_RANGE: f64 = 255.0;

#[derive(Debug)]
struct ResidualBlock {
    conv1: Conv2d,
    conv2: Conv2d,
    res_scale: f64,
}

impl ResidualBlock {
    fn new(channels: usize, res_scale: f64, vb: VarBuilder) -> Result<Self> {
        let vb = vb.pp("rb");
        Ok(Self {
            conv1: same_conv2d(channels, channels, 3, true, vb.pp("0"))?,
            conv2: same_conv2d(channels, channels, 3, true, vb.pp("2"))?,
            res_scale,
        })
    }
}

impl Module for ResidualBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = xs.apply(&self.conv1)?.relu()?.apply(&self.conv2)?;
        ys.affine(self.res_scale, 0.)?.add(xs)
    }
}

#[derive(Debug)]
struct UpsampleBlock {
    conv: Conv2d,
    factor: usize,
}

impl UpsampleBlock {
    fn new(channels: usize, factor: usize, vb: VarBuilder) -> Result<Self> {
        let conv = same_conv2d(
            channels,
            channels * factor * factor,
            3,
            true,
            vb.pp("upsample_block").pp("0"),
        )?;
        Ok(Self { conv, factor })
    }
}

impl Module for UpsampleBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        pixel_shuffle(&xs.apply(&self.conv)?, self.factor)
    }
}

#[derive(Debug)]
pub struct Edsr {
    conv1: Conv2d,
    trunk: Vec<ResidualBlock>,
    conv2: Conv2d,
    upsampling: Vec<UpsampleBlock>,
    conv3: Conv2d,
    /// `(1, 3, 1, 1)`, already multiplied by the pixel range.
    mean: Tensor,
}

impl Edsr {
    pub fn new(steps: &[usize], config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let channels = config.channels;

        let mean = if vb.contains_tensor("mean") {
            vb.get((1, 3, 1, 1), "mean")?
        } else {
            Tensor::new(&DIV2K_MEAN, vb.device())?.reshape((1, 3, 1, 1))?
        };
        let mean = mean.affine(PIXEL_RANGE, 0.)?;

        let conv1 = same_conv2d(3, channels, 3, true, vb.pp("conv1"))?;
        let trunk = (0..config.num_blocks)
            .map(|i| ResidualBlock::new(channels, config.res_scale, vb.pp("trunk").pp(i)))
            .collect::<Result<Vec<_>>>()?;
        let conv2 = same_conv2d(channels, channels, 3, true, vb.pp("conv2"))?;
        let upsampling = steps
            .iter()
            .enumerate()
            .map(|(i, &factor)| UpsampleBlock::new(channels, factor, vb.pp("upsampling").pp(i)))
            .collect::<Result<Vec<_>>>()?;
        let conv3 = same_conv2d(channels, 3, 3, true, vb.pp("conv3"))?;

        Ok(Self {
            conv1,
            trunk,
            conv2,
            upsampling,
            conv3,
            mean,
        })
    }
}

impl Module for Edsr {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = xs.broadcast_sub(&self.mean)?;
        let head = xs.apply(&self.conv1)?;

        let mut ys = head.clone();
        for block in &self.trunk {
            ys = ys.apply(block)?;
        }
        let mut ys = ys.apply(&self.conv2)?.add(&head)?;

        for block in &self.upsampling {
            ys = ys.apply(block)?;
        }
        ys.apply(&self.conv3)?.broadcast_add(&self.mean)
    }
}
