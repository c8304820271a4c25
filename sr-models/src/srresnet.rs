//! SRResNet, the SRGAN generator. Works on RGB in the unit range and leaves
//! its output unclamped.

use candle_core::{Module, Result, Tensor};
use candle_nn::{BatchNorm, Conv2d, PReLU, VarBuilder};

use crate::ModelConfig;
use crate::ops::{pixel_shuffle, same_conv2d};

const BN_EPS: f64 = 1e-5;

#[derive(Debug)]
struct ResidualConvBlock {
    conv1: Conv2d,
    bn1: BatchNorm,
    prelu: PReLU,
    conv2: Conv2d,
    bn2: BatchNorm,
}

impl ResidualConvBlock {
    fn new(channels: usize, vb: VarBuilder) -> Result<Self> {
        let vb = vb.pp("rcb");
        Ok(Self {
            conv1: same_conv2d(channels, channels, 3, false, vb.pp("0"))?,
            bn1: candle_nn::batch_norm(channels, BN_EPS, vb.pp("1"))?,
            prelu: candle_nn::prelu(None, vb.pp("2"))?,
            conv2: same_conv2d(channels, channels, 3, false, vb.pp("3"))?,
            bn2: candle_nn::batch_norm(channels, BN_EPS, vb.pp("4"))?,
        })
    }
}

impl Module for ResidualConvBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = xs
            .apply(&self.conv1)?
            .apply_t(&self.bn1, false)?
            .apply(&self.prelu)?
            .apply(&self.conv2)?
            .apply_t(&self.bn2, false)?;
        ys.add(xs)
    }
}

#[derive(Debug)]
struct UpsampleBlock {
    conv: Conv2d,
    prelu: PReLU,
}

impl UpsampleBlock {
    fn new(channels: usize, vb: VarBuilder) -> Result<Self> {
        let vb = vb.pp("upsample_block");
        Ok(Self {
            conv: same_conv2d(channels, channels * 4, 3, true, vb.pp("0"))?,
            prelu: candle_nn::prelu(None, vb.pp("2"))?,
        })
    }
}

impl Module for UpsampleBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        pixel_shuffle(&xs.apply(&self.conv)?, 2)?.apply(&self.prelu)
    }
}

#[derive(Debug)]
pub struct SrResNet {
    conv1: Conv2d,
    prelu1: PReLU,
    trunk: Vec<ResidualConvBlock>,
    conv2: Conv2d,
    bn2: BatchNorm,
    upsampling: Vec<UpsampleBlock>,
    conv3: Conv2d,
}

impl SrResNet {
    /// `doublings` is log2 of the scale factor.
    pub fn new(doublings: usize, config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let channels = config.channels;

        let conv1 = same_conv2d(3, channels, 9, true, vb.pp("conv1").pp("0"))?;
        let prelu1 = candle_nn::prelu(None, vb.pp("conv1").pp("1"))?;
        let trunk = (0..config.num_blocks)
            .map(|i| ResidualConvBlock::new(channels, vb.pp("trunk").pp(i)))
            .collect::<Result<Vec<_>>>()?;
        let conv2 = same_conv2d(channels, channels, 3, false, vb.pp("conv2").pp("0"))?;
        let bn2 = candle_nn::batch_norm(channels, BN_EPS, vb.pp("conv2").pp("1"))?;
        let upsampling = (0..doublings)
            .map(|i| UpsampleBlock::new(channels, vb.pp("upsampling").pp(i)))
            .collect::<Result<Vec<_>>>()?;
        let conv3 = same_conv2d(channels, 3, 9, true, vb.pp("conv3"))?;

        Ok(Self {
            conv1,
            prelu1,
            trunk,
            conv2,
            bn2,
            upsampling,
            conv3,
        })
    }
}

impl Module for SrResNet {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let head = xs.apply(&self.conv1)?.apply(&self.prelu1)?;

        let mut ys = head.clone();
        for block in &self.trunk {
            ys = ys.apply(block)?;
        }
        let mut ys = ys
            .apply(&self.conv2)?
            .apply_t(&self.bn2, false)?
            .add(&head)?;

        for block in &self.upsampling {
            ys = ys.apply(block)?;
        }
        ys.apply(&self.conv3)
    }
}
