use crate::{Dims, Error};
use std::path::Path;

/// Helper type used to define the source of `ImageSource`'s data
#[derive(Clone)]
pub enum ImageSource<'a> {
    /// A raw buffer of image data, see `image::load_from_memory` for details
    /// on what is supported
    Memory(&'a [u8]),
    /// The path to an image to load from disk. The image format is inferred
    /// from the file extension, see `image::open` for details
    Path(&'a Path),
    /// An already loaded image that is passed directly to the pipeline
    Image(image::DynamicImage),
}

impl<'a> ImageSource<'a> {
    pub fn from_path(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<image::DynamicImage> for ImageSource<'a> {
    fn from(img: image::DynamicImage) -> Self {
        Self::Image(img)
    }
}

impl<'a> From<image::RgbaImage> for ImageSource<'a> {
    fn from(img: image::RgbaImage) -> Self {
        Self::Image(image::DynamicImage::ImageRgba8(img))
    }
}

impl<'a, S> From<&'a S> for ImageSource<'a>
where
    S: AsRef<Path> + 'a,
{
    fn from(path: &'a S) -> Self {
        Self::Path(path.as_ref())
    }
}

pub fn load_dynamic_image(src: ImageSource<'_>) -> Result<image::DynamicImage, image::ImageError> {
    match src {
        ImageSource::Memory(data) => image::load_from_memory(data),
        ImageSource::Path(path) => image::open(path),
        ImageSource::Image(img) => Ok(img),
    }
}

/// Loads an image as RGBA, shrinking it so that its longest side is no
/// larger than `max_size`. Images are never enlarged.
pub fn load_image(src: ImageSource<'_>, max_size: Option<u32>) -> Result<image::RgbaImage, Error> {
    let img = load_dynamic_image(src)?.to_rgba8();

    Ok(match max_size {
        Some(max) => fit_within(img, max),
        None => img,
    })
}

pub(crate) fn fit_within(img: image::RgbaImage, max: u32) -> image::RgbaImage {
    let (w, h) = img.dimensions();
    let longest = w.max(h);

    if longest <= max || max == 0 {
        return img;
    }

    let scale = f64::from(max) / f64::from(longest);
    let nw = ((f64::from(w) * scale).round() as u32).max(1);
    let nh = ((f64::from(h) * scale).round() as u32).max(1);

    image::imageops::resize(&img, nw, nh, image::imageops::FilterType::CatmullRom)
}

/// Resizes to exactly `dims`, or hands the image back untouched if it's
/// already that size
pub(crate) fn resize_exact(
    img: &image::RgbaImage,
    dims: Dims,
    filter: image::imageops::FilterType,
) -> image::RgbaImage {
    if img.width() == dims.width && img.height() == dims.height {
        img.clone()
    } else {
        image::imageops::resize(img, dims.width, dims.height, filter)
    }
}
