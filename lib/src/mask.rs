//! Binary person masks, built from a segmentation model's output or loaded
//! from a precomputed image.

use crate::{errors, Dims, Error};

/// A per-pixel foreground/background mask, where foreground is the person.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonMask {
    dims: Dims,
    // 1 for the person, 0 for the background
    data: Vec<u8>,
}

impl PersonMask {
    /// Creates a mask from one entry per pixel in row-major order, any
    /// non-zero entry marks a person pixel.
    pub fn from_segmentation(data: &[u8], dims: Dims) -> Result<Self, Error> {
        let expected = dims.width as usize * dims.height as usize;
        if data.len() != expected {
            return Err(Error::LengthMismatch {
                what: "segmentation",
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            dims,
            data: data.iter().map(|v| u8::from(*v != 0)).collect(),
        })
    }

    /// Creates a mask of `out_dims` from a probability map of `prob_dims`,
    /// using bilinear sampling. A pixel belongs to the person when its sampled
    /// probability is strictly above `threshold`.
    pub fn from_probabilities(
        probs: &[f32],
        prob_dims: Dims,
        out_dims: Dims,
        threshold: f32,
    ) -> Result<Self, Error> {
        let (pw, ph) = (prob_dims.width as usize, prob_dims.height as usize);
        if probs.len() != pw * ph || pw == 0 || ph == 0 {
            return Err(Error::LengthMismatch {
                what: "probability map",
                expected: pw * ph,
                actual: probs.len(),
            });
        }

        let sx = pw as f32 / out_dims.width as f32;
        let sy = ph as f32 / out_dims.height as f32;

        let mut data = Vec::with_capacity(out_dims.width as usize * out_dims.height as usize);

        for y in 0..out_dims.height {
            // sample at pixel centers
            let fy = ((y as f32 + 0.5) * sy - 0.5).max(0.0);
            let y0 = (fy as usize).min(ph - 1);
            let y1 = (y0 + 1).min(ph - 1);
            let ty = fy - y0 as f32;

            for x in 0..out_dims.width {
                let fx = ((x as f32 + 0.5) * sx - 0.5).max(0.0);
                let x0 = (fx as usize).min(pw - 1);
                let x1 = (x0 + 1).min(pw - 1);
                let tx = fx - x0 as f32;

                let top = probs[y0 * pw + x0] * (1.0 - tx) + probs[y0 * pw + x1] * tx;
                let bottom = probs[y1 * pw + x0] * (1.0 - tx) + probs[y1 * pw + x1] * tx;
                let p = top * (1.0 - ty) + bottom * ty;

                data.push(u8::from(p > threshold));
            }
        }

        Ok(Self {
            dims: out_dims,
            data,
        })
    }

    /// Reads a mask back from an image. Images written by `to_alpha_image`
    /// carry the mask in alpha with black colour channels, anything else is
    /// read by luma, where light pixels are the person.
    ///
    /// Only images that actually have an alpha channel are read by alpha, an
    /// all black luma mask is an empty mask.
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let alpha_form = img.color().has_alpha()
            && rgba.pixels().all(|p| p[0] == 0 && p[1] == 0 && p[2] == 0)
            && rgba.pixels().any(|p| p[3] > 0);

        let data = if alpha_form {
            rgba.pixels().map(|p| u8::from(p[3] > 0)).collect()
        } else {
            img.to_luma8().pixels().map(|p| u8::from(p[0] > 127)).collect()
        };

        Self {
            dims: Dims::new(rgba.width(), rgba.height()),
            data,
        }
    }

    #[inline]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.dims.width + x) as usize] != 0
    }

    /// The fraction of pixels that belong to the person, in `[0, 1]`
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }

        let set = self.data.iter().filter(|v| **v != 0).count();
        set as f32 / self.data.len() as f32
    }

    /// Swaps person and background
    pub fn invert(&self) -> Self {
        Self {
            dims: self.dims,
            data: self.data.iter().map(|v| 1 - *v).collect(),
        }
    }

    /// Nearest-neighbour resize, used to fit a precomputed mask to the photo.
    ///
    /// An empty mask can't be sampled, so resizing one to a non-empty size is
    /// a `SizeMismatch`.
    pub fn resize(&self, dims: Dims) -> Result<Self, Error> {
        if dims == self.dims {
            return Ok(self.clone());
        }

        if self.data.is_empty() && dims.width > 0 && dims.height > 0 {
            return Err(Error::SizeMismatch(errors::SizeMismatch {
                what: "mask",
                expected: (dims.width, dims.height),
                actual: (self.dims.width, self.dims.height),
            }));
        }

        let mut data = Vec::with_capacity(dims.width as usize * dims.height as usize);
        for y in 0..dims.height {
            let sy = (u64::from(y) * u64::from(self.dims.height) / u64::from(dims.height)) as u32;
            for x in 0..dims.width {
                let sx = (u64::from(x) * u64::from(self.dims.width) / u64::from(dims.width)) as u32;
                data.push(self.data[(sy * self.dims.width + sx) as usize]);
            }
        }

        Ok(Self { dims, data })
    }

    /// An RGBA image whose alpha is fully opaque over the person and fully
    /// transparent elsewhere, with all colour channels zeroed
    pub fn to_alpha_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.dims.width, self.dims.height, |x, y| {
            let a = if self.is_foreground(x, y) { 255 } else { 0 };
            image::Rgba([0, 0, 0, a])
        })
    }

    /// White person on a black background
    pub fn to_luma_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.dims.width, self.dims.height, |x, y| {
            image::Luma([if self.is_foreground(x, y) { 255 } else { 0 }])
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn segmentation_length_must_match() {
        let err = PersonMask::from_segmentation(&[0, 1, 1], Dims::new(2, 2))
            .err()
            .unwrap();

        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 4,
                actual: 3,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "expected 4 segmentation values, one per pixel, but got 3"
        );
    }

    #[test]
    fn alpha_image_matches_segmentation() {
        let mask = PersonMask::from_segmentation(&[0, 1, 7, 0], Dims::new(2, 2)).unwrap();
        let img = mask.to_alpha_image();

        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 0]);
        assert!((mask.coverage() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn probabilities_are_thresholded_strictly() {
        let probs = [0.7, 0.71, 0.0, 1.0];
        let mask =
            PersonMask::from_probabilities(&probs, Dims::new(2, 2), Dims::new(2, 2), 0.7).unwrap();

        assert!(!mask.is_foreground(0, 0));
        assert!(mask.is_foreground(1, 0));
        assert!(!mask.is_foreground(0, 1));
        assert!(mask.is_foreground(1, 1));
    }

    #[test]
    fn probabilities_upsample_to_photo() {
        // left half person, right half background
        let probs = [1.0, 0.0, 1.0, 0.0];
        let mask =
            PersonMask::from_probabilities(&probs, Dims::new(2, 2), Dims::new(8, 4), 0.5).unwrap();

        assert_eq!(mask.dims(), Dims::new(8, 4));
        for y in 0..4 {
            assert!(mask.is_foreground(0, y));
            assert!(mask.is_foreground(2, y));
            assert!(!mask.is_foreground(5, y));
            assert!(!mask.is_foreground(7, y));
        }
    }

    #[test]
    fn reads_back_its_own_images() {
        let mask = PersonMask::from_segmentation(&[1, 0, 0, 1, 1, 0], Dims::new(3, 2)).unwrap();

        let alpha = image::DynamicImage::ImageRgba8(mask.to_alpha_image());
        assert_eq!(PersonMask::from_image(&alpha), mask);

        let luma = image::DynamicImage::ImageLuma8(mask.to_luma_image());
        assert_eq!(PersonMask::from_image(&luma), mask);
    }

    #[test]
    fn invert_and_resize() {
        let mask = PersonMask::from_segmentation(&[1, 0], Dims::new(2, 1)).unwrap();
        let inv = mask.invert();
        assert!(!inv.is_foreground(0, 0));
        assert!(inv.is_foreground(1, 0));

        let big = mask.resize(Dims::new(4, 2)).unwrap();
        assert!(big.is_foreground(1, 1));
        assert!(!big.is_foreground(2, 0));
    }

    #[test]
    fn empty_luma_mask_is_empty() {
        let mask = PersonMask::from_segmentation(&[0; 16], Dims::square(4)).unwrap();

        let luma = image::DynamicImage::ImageLuma8(mask.to_luma_image());
        let read = PersonMask::from_image(&luma);
        assert_eq!(read, mask);
        assert!(read.coverage().abs() < f32::EPSILON);

        // Black RGB, eg a JPEG export, has no alpha channel either
        let rgb = image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        assert!(PersonMask::from_image(&rgb).coverage().abs() < f32::EPSILON);
    }

    #[test]
    fn empty_mask_cant_be_resized_up() {
        let empty = PersonMask::from_image(&image::DynamicImage::ImageRgba8(
            image::RgbaImage::new(0, 0),
        ));
        assert_eq!(empty.dims(), Dims::square(0));

        assert!(matches!(
            empty.resize(Dims::square(4)),
            Err(Error::SizeMismatch(_))
        ));
        assert_eq!(empty.resize(Dims::square(0)).unwrap(), empty);
    }
}
