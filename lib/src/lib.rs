// BEGIN - Embark standard lints v0.4
// do not change or add/remove here, but one can add exceptions after this section
// for more info see: <https://github.com/EmbarkStudios/rust-ecosystem/issues/59>
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::float_cmp_const,
    clippy::fn_params_excessive_bools,
    clippy::if_let_mutex,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::linkedlist,
    clippy::lossy_float_literal,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_on_vec_items,
    clippy::match_same_arms,
    clippy::match_wildcard_for_single_variants,
    clippy::mem_forget,
    clippy::mismatched_target_os,
    clippy::mut_mut,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::path_buf_push_overwrite,
    clippy::ptr_as_ptr,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_functions_in_if_condition,
    clippy::semicolon_if_nothing_returned,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_to_string,
    clippy::todo,
    clippy::trait_duplication_in_bounds,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::useless_transmute,
    clippy::verbose_file_reads,
    clippy::zero_sized_map_values,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]
// END - Embark standard lints v0.4

//! `portrait-stylize` applies an artistic style to the person in a photo,
//! leaving the background as it was.
//!
//! Three steps make up the pipeline:
//!
//! 1. A person segmentation model produces a `PersonMask` for the photo
//! 2. An arbitrary style transfer model repaints the whole photo in the style
//!    of a second image
//! 3. The stylized pixels under the mask are composited over the original
//!
//! Both models are pretrained networks exported to ONNX and run on the CPU
//! with [tract](https://github.com/sonos/tract), see `OnnxSegmenter` and
//! `OnnxStylizer`. Either can be swapped for anything implementing the
//! `Segmenter` or `Stylizer` traits, including plain closures.
//!
//! ## Usage
//! Session follows a "builder pattern" for defining parameters, meaning you chain functions together.
//!
//! ```no_run
//! use portrait_stylize as ps;
//!
//! let session = ps::Session::builder()
//!     .photo(&"imgs/portrait.jpg")
//!     .style(&"imgs/wave.jpg")
//!     // A mask made earlier, so no segmentation model is needed
//!     .mask(&"imgs/portrait_mask.png")
//!     .stylizer(
//!         ps::OnnxStylizer::load("models/stylize.onnx", Default::default())
//!             .expect("failed to load model"),
//!     )
//!     .build().expect("failed to build session");
//!
//! let stylized = session.run(None).expect("failed to stylize");
//!
//! stylized.save("out/portrait.png").expect("failed to save image");
//! ```
pub mod composite;
mod errors;
mod mask;
pub mod segment;
pub mod session;
pub mod stylize;
pub mod tensor;
mod utils;
use utils::*;

pub use image;
use std::path::Path;

pub use composite::{composite, CompositeMode};
pub use errors::{Error, ModelKind};
pub use mask::PersonMask;
pub use segment::{OnnxSegmenter, Segmenter, SegmenterConfig};
pub use session::{
    PipelineProgress, ProgressStat, ProgressUpdate, Session, SessionBuilder, Stage,
};
pub use stylize::{OnnxStylizer, Stylizer, StylizerConfig};
pub use tensor::{Normalization, TensorLayout};
pub use utils::{load_dynamic_image, load_image, ImageSource};

/// Simple dimensions struct
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

struct Parameters {
    max_size: Option<u32>,
    composite_mode: CompositeMode,
    max_thread_count: Option<usize>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            max_size: None,
            composite_mode: CompositeMode::Foreground,
            max_thread_count: None,
        }
    }
}

impl Parameters {
    fn thread_count(&self) -> usize {
        self.max_thread_count.unwrap_or_else(num_cpus::get)
    }
}

/// An image produced by `Session::run()`
pub struct StylizedImage {
    image: image::RgbaImage,
    styled: image::RgbaImage,
    mask: PersonMask,
}

impl StylizedImage {
    /// Saves the composited image to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent_path) = path.parent() {
            std::fs::create_dir_all(&parent_path)?;
        }

        self.image.save(&path)?;
        Ok(())
    }

    /// Writes the composited image to the specified stream
    pub fn write<W: std::io::Write>(
        self,
        writer: &mut W,
        fmt: image::ImageOutputFormat,
    ) -> Result<(), Error> {
        write_image(self.into_image(), writer, fmt)
    }

    /// Saves the intermediate images, the person mask as `mask.png` and the
    /// fully stylized photo, before compositing, as `styled.png`
    pub fn save_debug<P: AsRef<Path>>(&self, dir: P) -> Result<(), Error> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(&dir)?;

        self.mask.to_luma_image().save(&dir.join("mask.png"))?;
        self.styled.save(&dir.join("styled.png"))?;

        Ok(())
    }

    /// The mask used when compositing
    pub fn mask(&self) -> &PersonMask {
        &self.mask
    }

    /// The photo stylized in its entirety
    pub fn styled(&self) -> &image::RgbaImage {
        &self.styled
    }

    /// Returns the composited output image
    pub fn into_image(self) -> image::DynamicImage {
        image::DynamicImage::ImageRgba8(self.image)
    }
}

impl AsRef<image::RgbaImage> for StylizedImage {
    fn as_ref(&self) -> &image::RgbaImage {
        &self.image
    }
}

/// Encodes an image to a stream that doesn't need to be seekable, eg stdout
pub fn write_image<W: std::io::Write>(
    img: image::DynamicImage,
    writer: &mut W,
    fmt: image::ImageOutputFormat,
) -> Result<(), Error> {
    let mut encoded = std::io::Cursor::new(Vec::new());
    img.write_to(&mut encoded, fmt)?;
    writer.write_all(encoded.get_ref())?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn writes_to_unseekable_streams() {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(4, 2));

        let mut out = Vec::new();
        write_image(img, &mut out, image::ImageOutputFormat::Png).unwrap();

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
    }
}
