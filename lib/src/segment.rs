use crate::{
    errors::{self, ModelKind},
    tensor::{self, Normalization, TensorLayout},
    Dims, Error, PersonMask,
};
use std::path::Path;
use tract_onnx::prelude::*;

/// Finds the person in a photo.
///
/// Implemented for `OnnxSegmenter`, and for any closure with a matching
/// signature, which is handy for tests or for plugging in a different runtime.
pub trait Segmenter: Send {
    fn segment(&mut self, photo: &image::RgbaImage) -> Result<PersonMask, Error>;
}

impl<F> Segmenter for F
where
    F: FnMut(&image::RgbaImage) -> Result<PersonMask, Error> + Send,
{
    fn segment(&mut self, photo: &image::RgbaImage) -> Result<PersonMask, Error> {
        self(photo)
    }
}

/// How to feed a segmentation model and read its output
#[derive(Clone, Debug)]
pub struct SegmenterConfig {
    /// The fixed input resolution of the model
    pub input_size: Dims,
    pub layout: TensorLayout,
    pub normalization: Normalization,
    /// Pixels with a person probability strictly above this are foreground
    pub threshold: f32,
    /// Output channel holding the person probability, the last one if `None`
    pub person_channel: Option<usize>,
    /// The model outputs raw logits rather than probabilities
    pub sigmoid: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            input_size: Dims::square(256),
            layout: TensorLayout::Nhwc,
            normalization: Normalization::default(),
            threshold: 0.7,
            person_channel: None,
            sigmoid: false,
        }
    }
}

fn model_err(e: TractError) -> Error {
    Error::Inference(ModelKind::Segmentation, format!("{:#}", e))
}

/// A person segmentation model in ONNX format, run with tract
pub struct OnnxSegmenter {
    plan: TypedRunnableModel<TypedModel>,
    config: SegmenterConfig,
}

impl OnnxSegmenter {
    /// Loads and optimizes the model at `path` for the configured input size
    pub fn load<P: AsRef<Path>>(path: P, config: SegmenterConfig) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&config.threshold) {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 0.0,
                max: 1.0,
                value: config.threshold,
                name: "threshold",
            }));
        }

        let path = path.as_ref();
        let Dims { width, height } = config.input_size;
        let (w, h) = (width as usize, height as usize);

        let input_shape = match config.layout {
            TensorLayout::Nhwc => [1, h, w, 3],
            TensorLayout::Nchw => [1, 3, h, w],
        };

        tracing::debug!(path = %path.display(), ?input_shape, "loading segmentation model");

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(input_shape).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(model_err)?;

        Ok(Self { plan, config })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }
}

impl Segmenter for OnnxSegmenter {
    fn segment(&mut self, photo: &image::RgbaImage) -> Result<PersonMask, Error> {
        let cfg = &self.config;
        let input = tensor::image_to_tensor(photo, cfg.input_size, cfg.layout, cfg.normalization);

        let outputs = self
            .plan
            .run(tvec!(Tensor::from(input).into()))
            .map_err(model_err)?;

        let output = outputs[0].to_array_view::<f32>().map_err(model_err)?;
        let (probs, prob_dims) =
            tensor::tensor_to_probabilities(output, cfg.layout, cfg.person_channel, cfg.sigmoid)?;

        PersonMask::from_probabilities(
            &probs,
            prob_dims,
            Dims::new(photo.width(), photo.height()),
            cfg.threshold,
        )
    }
}
