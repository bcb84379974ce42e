//! Conversions between images and the float tensors models consume and produce

use crate::{utils, Dims, Error};
use tract_onnx::prelude::tract_ndarray::{Array4, ArrayViewD, Axis, Ix4};

/// Memory layout of a rank 4 image tensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[batch, height, width, channels]`, what TensorFlow exports use
    Nhwc,
    /// `[batch, channels, height, width]`, what PyTorch exports use
    Nchw,
}

impl Default for TensorLayout {
    fn default() -> Self {
        Self::Nhwc
    }
}

/// Per-channel normalization applied to `pixel / 255`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }
}

impl Normalization {
    /// The ImageNet statistics most torchvision backbones were trained with
    pub fn imagenet() -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }

    #[inline]
    fn apply(&self, value: u8, channel: usize) -> f32 {
        (f32::from(value) / 255.0 - self.mean[channel]) / self.std[channel]
    }
}

/// Converts an image to a single-batch RGB tensor of `size`, the alpha
/// channel is dropped
pub fn image_to_tensor(
    img: &image::RgbaImage,
    size: Dims,
    layout: TensorLayout,
    norm: Normalization,
) -> Array4<f32> {
    let img = utils::resize_exact(img, size, image::imageops::FilterType::Triangle);
    let (w, h) = (size.width as usize, size.height as usize);

    match layout {
        TensorLayout::Nhwc => Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| {
            norm.apply(img.get_pixel(x as u32, y as u32)[c], c)
        }),
        TensorLayout::Nchw => Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
            norm.apply(img.get_pixel(x as u32, y as u32)[c], c)
        }),
    }
}

/// Converts a `[1, h, w, 3]` tensor of values in `[0, 1]` to an opaque image
pub fn tensor_to_image(view: ArrayViewD<'_, f32>) -> Result<image::RgbaImage, Error> {
    let shape = view.shape().to_vec();
    let invalid = || Error::InvalidTensorShape {
        expected: "[1, h, w, 3]",
        actual: shape.clone(),
    };

    if shape.len() != 4 || shape[0] != 1 || shape[3] != 3 {
        return Err(invalid());
    }

    let view = view.into_dimensionality::<Ix4>().map_err(|_| invalid())?;
    let (h, w) = (shape[1] as u32, shape[2] as u32);

    let to_u8 = |v: f32| (v.max(0.0).min(1.0) * 255.0).round() as u8;

    Ok(image::RgbaImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgba([
            to_u8(view[[0, y, x, 0]]),
            to_u8(view[[0, y, x, 1]]),
            to_u8(view[[0, y, x, 2]]),
            255,
        ])
    }))
}

/// Pulls a single channel out of a rank 4 model output as a row-major
/// probability map. `channel` of `None` selects the last channel.
pub fn tensor_to_probabilities(
    view: ArrayViewD<'_, f32>,
    layout: TensorLayout,
    channel: Option<usize>,
    apply_sigmoid: bool,
) -> Result<(Vec<f32>, Dims), Error> {
    let shape = view.shape().to_vec();
    let invalid = || Error::InvalidTensorShape {
        expected: match layout {
            TensorLayout::Nhwc => "[1, h, w, c]",
            TensorLayout::Nchw => "[1, c, h, w]",
        },
        actual: shape.clone(),
    };

    // Some exports squeeze the channel axis away entirely
    let view = match shape.len() {
        3 if shape[0] == 1 => match layout {
            TensorLayout::Nhwc => view.insert_axis(Axis(3)),
            TensorLayout::Nchw => view.insert_axis(Axis(1)),
        },
        4 if shape[0] == 1 => view,
        _ => return Err(invalid()),
    };

    let view = view.into_dimensionality::<Ix4>().map_err(|_| invalid())?;

    let (channels, h, w) = match layout {
        TensorLayout::Nhwc => (view.shape()[3], view.shape()[1], view.shape()[2]),
        TensorLayout::Nchw => (view.shape()[1], view.shape()[2], view.shape()[3]),
    };

    let channel = channel.unwrap_or_else(|| channels.saturating_sub(1));
    if channel >= channels || h == 0 || w == 0 {
        return Err(invalid());
    }

    let mut probs = Vec::with_capacity(h * w);
    for y in 0..h {
        for x in 0..w {
            let v = match layout {
                TensorLayout::Nhwc => view[[0, y, x, channel]],
                TensorLayout::Nchw => view[[0, channel, y, x]],
            };

            probs.push(if apply_sigmoid {
                1.0 / (1.0 + (-v).exp())
            } else {
                v
            });
        }
    }

    Ok((probs, Dims::new(w as u32, h as u32)))
}
