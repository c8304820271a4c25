use candle_core::{Result, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, VarBuilder};

/// Stride-1 convolution padded to keep the spatial size, like
/// `nn.Conv2d(c_in, c_out, k, 1, k // 2)`.
pub fn same_conv2d(
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    bias: bool,
    vb: VarBuilder,
) -> Result<Conv2d> {
    let config = Conv2dConfig {
        padding: kernel / 2,
        ..Default::default()
    };
    if bias {
        candle_nn::conv2d(in_channels, out_channels, kernel, config, vb)
    } else {
        candle_nn::conv2d_no_bias(in_channels, out_channels, kernel, config, vb)
    }
}

/// Rearranges `(b, c * r * r, h, w)` into `(b, c, h * r, w * r)`, matching
/// `torch.nn.PixelShuffle`.
pub fn pixel_shuffle(xs: &Tensor, upscale: usize) -> Result<Tensor> {
    let (b, c, h, w) = xs.dims4()?;
    let out_c = c / (upscale * upscale);
    if out_c * upscale * upscale != c {
        candle_core::bail!("pixel_shuffle: {c} channels are not divisible by {upscale}^2");
    }

    xs.reshape(vec![b, out_c, upscale, upscale, h, w])?
        .permute(vec![0, 1, 4, 2, 5, 3])?
        .contiguous()?
        .reshape((b, out_c, h * upscale, w * upscale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn interleaves_sub_pixels() -> Result<()> {
        // 4 channels of a single pixel become one 2x2 block, row-major.
        let xs = Tensor::new(&[1f32, 2., 3., 4.], &Device::Cpu)?.reshape((1, 4, 1, 1))?;
        let ys = pixel_shuffle(&xs, 2)?;
        assert_eq!(ys.dims4()?, (1, 1, 2, 2));
        assert_eq!(ys.flatten_all()?.to_vec1::<f32>()?, vec![1., 2., 3., 4.]);
        Ok(())
    }

    #[test]
    fn keeps_pixels_in_their_blocks() -> Result<()> {
        // channel k holds value 10 * k + column, over a 1x2 input.
        let data: Vec<f32> = (0..4)
            .flat_map(|k| (0..2).map(move |x| (10 * k + x) as f32))
            .collect();
        let xs = Tensor::from_vec(data, (1, 4, 1, 2), &Device::Cpu)?;
        let ys = pixel_shuffle(&xs, 2)?;
        assert_eq!(ys.dims4()?, (1, 1, 2, 4));
        assert_eq!(
            ys.flatten_all()?.to_vec1::<f32>()?,
            vec![0., 10., 1., 11., 20., 30., 21., 31.]
        );
        Ok(())
    }

    #[test]
    fn rejects_indivisible_channels() -> Result<()> {
        let xs = Tensor::zeros((1, 3, 2, 2), candle_core::DType::F32, &Device::Cpu)?;
        assert!(pixel_shuffle(&xs, 2).is_err());
        Ok(())
    }
}
