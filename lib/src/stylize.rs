use crate::{
    errors::ModelKind,
    tensor::{self, TensorLayout},
    utils, Dims, Error,
};
use std::path::Path;
use tract_onnx::prelude::*;

/// Repaints a content image in the style of another image.
///
/// Implemented for `OnnxStylizer`, and for any closure with a matching
/// signature.
pub trait Stylizer: Send {
    fn stylize(
        &mut self,
        content: &image::RgbaImage,
        style: &image::RgbaImage,
    ) -> Result<image::RgbaImage, Error>;
}

impl<F> Stylizer for F
where
    F: FnMut(&image::RgbaImage, &image::RgbaImage) -> Result<image::RgbaImage, Error> + Send,
{
    fn stylize(
        &mut self,
        content: &image::RgbaImage,
        style: &image::RgbaImage,
    ) -> Result<image::RgbaImage, Error> {
        self(content, style)
    }
}

#[derive(Clone, Debug)]
pub struct StylizerConfig {
    /// The style image is resized to a square of this size, arbitrary
    /// stylization networks are trained on 256x256 styles
    pub style_size: u32,
    /// Shrinks the content so its longest side is at most this many pixels
    /// before running the model, the result is scaled back up afterwards
    pub max_content_size: Option<u32>,
    /// The model takes the style image as its first input instead of its second
    pub style_first: bool,
}

impl Default for StylizerConfig {
    fn default() -> Self {
        Self {
            style_size: 256,
            max_content_size: None,
            style_first: false,
        }
    }
}

/// Orders a content and style value the way the model takes its inputs
fn model_inputs<T>(style_first: bool, content: T, style: T) -> (T, T) {
    if style_first {
        (style, content)
    } else {
        (content, style)
    }
}

fn model_err(e: TractError) -> Error {
    Error::Inference(ModelKind::StyleTransfer, format!("{:#}", e))
}

/// An arbitrary image stylization model in ONNX format, taking a content and
/// a style image in `[0, 1]` NHWC and producing the stylized content.
///
/// The content input is dynamically sized, so the model is optimized for each
/// new content size, the last plan is kept around for reuse.
pub struct OnnxStylizer {
    model: InferenceModel,
    config: StylizerConfig,
    cached: Option<(Dims, TypedRunnableModel<TypedModel>)>,
}

impl OnnxStylizer {
    pub fn load<P: AsRef<Path>>(path: P, config: StylizerConfig) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading style transfer model");

        let model = tract_onnx::onnx().model_for_path(path).map_err(model_err)?;

        Ok(Self {
            model,
            config,
            cached: None,
        })
    }

    pub fn config(&self) -> &StylizerConfig {
        &self.config
    }

    fn plan_for(&mut self, content: Dims) -> Result<&TypedRunnableModel<TypedModel>, Error> {
        let stale = match self.cached {
            Some((dims, _)) => dims != content,
            None => true,
        };

        if stale {
            let s = self.config.style_size as usize;
            let content_fact = f32::fact([1, content.height as usize, content.width as usize, 3]);
            let style_fact = f32::fact([1, s, s, 3]);

            let (first, second) = model_inputs(self.config.style_first, content_fact, style_fact);

            tracing::debug!(
                width = content.width,
                height = content.height,
                "optimizing style transfer model"
            );

            let plan = self
                .model
                .clone()
                .with_input_fact(0, first.into())
                .and_then(|model| model.with_input_fact(1, second.into()))
                .and_then(|model| model.into_optimized())
                .and_then(|model| model.into_runnable())
                .map_err(model_err)?;

            self.cached = Some((content, plan));
        }

        match self.cached {
            Some((_, ref plan)) => Ok(plan),
            None => Err(Error::MissingModel(ModelKind::StyleTransfer)),
        }
    }
}

impl Stylizer for OnnxStylizer {
    fn stylize(
        &mut self,
        content: &image::RgbaImage,
        style: &image::RgbaImage,
    ) -> Result<image::RgbaImage, Error> {
        let original = Dims::new(content.width(), content.height());

        let model_content = match self.config.max_content_size {
            Some(max) => utils::fit_within(content.clone(), max),
            None => content.clone(),
        };
        let content_dims = Dims::new(model_content.width(), model_content.height());

        let content_tensor = tensor::image_to_tensor(
            &model_content,
            content_dims,
            TensorLayout::Nhwc,
            Default::default(),
        );
        let style_tensor = tensor::image_to_tensor(
            style,
            Dims::square(self.config.style_size),
            TensorLayout::Nhwc,
            Default::default(),
        );

        let (first, second) =
            model_inputs(self.config.style_first, content_tensor, style_tensor);

        let plan = self.plan_for(content_dims)?;
        let outputs = plan
            .run(tvec!(Tensor::from(first).into(), Tensor::from(second).into()))
            .map_err(model_err)?;

        let output = outputs[0].to_array_view::<f32>().map_err(model_err)?;
        let styled = tensor::tensor_to_image(output)?;

        // The networks pad and stride, so the output is often a few pixels off
        Ok(utils::resize_exact(
            &styled,
            original,
            image::imageops::FilterType::CatmullRom,
        ))
    }
}
