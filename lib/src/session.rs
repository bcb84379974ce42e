use crate::*;
use std::time::Instant;

/// Person stylization session.
///
/// Calling `run()` segments the photo, stylizes it, and composites the
/// result, consuming the session in the process. You can provide a
/// `PipelineProgress` implementation to get told when each stage starts.
///
/// # Example
/// ```no_run
/// use portrait_stylize as ps;
///
/// let session = ps::Session::builder()
///     .photo(&"imgs/portrait.jpg")
///     .style(&"imgs/starry_night.jpg")
///     .segmenter(
///         ps::OnnxSegmenter::load("models/selfie.onnx", Default::default())
///             .expect("failed to load segmentation model"),
///     )
///     .stylizer(
///         ps::OnnxStylizer::load("models/stylize.onnx", Default::default())
///             .expect("failed to load style model"),
///     )
///     .build()
///     .expect("failed to build session");
///
/// let stylized = session.run(None).expect("failed to stylize");
/// stylized.save("out/portrait.png").expect("failed to save image");
/// ```
pub struct Session {
    photo: image::RgbaImage,
    style: image::RgbaImage,
    mask: Option<PersonMask>,
    segmenter: Option<Box<dyn Segmenter>>,
    stylizer: Box<dyn Stylizer>,
    params: Parameters,
}

impl Session {
    /// Creates a new session with default parameters.
    pub fn builder<'a>() -> SessionBuilder<'a> {
        SessionBuilder::default()
    }

    /// The photo, after any `max_size` resizing
    pub fn photo(&self) -> &image::RgbaImage {
        &self.photo
    }

    /// Runs the full pipeline and outputs the composited image.
    pub fn run(
        mut self,
        mut progress: Option<Box<dyn PipelineProgress>>,
    ) -> Result<StylizedImage, Error> {
        let mut report = |stage: Stage| {
            tracing::info!("{}", stage);
            if let Some(ref mut progress) = progress {
                progress.update(ProgressUpdate {
                    stage,
                    total: ProgressStat {
                        current: stage.index(),
                        total: Stage::COUNT,
                    },
                });
            }
        };

        let photo_dims = Dims::new(self.photo.width(), self.photo.height());

        report(Stage::Segmenting);
        let start = Instant::now();
        let mask = match (self.mask.take(), self.segmenter.as_mut()) {
            (Some(mask), _) => mask.resize(photo_dims)?,
            (None, Some(segmenter)) => segmenter.segment(&self.photo)?,
            (None, None) => return Err(Error::MissingModel(errors::ModelKind::Segmentation)),
        };
        tracing::debug!(
            coverage = mask.coverage(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "mask ready"
        );

        if mask.dims() != photo_dims {
            return Err(Error::SizeMismatch(errors::SizeMismatch {
                what: "mask",
                expected: (photo_dims.width, photo_dims.height),
                actual: (mask.dims().width, mask.dims().height),
            }));
        }

        report(Stage::Stylizing);
        let start = Instant::now();
        let styled = self.stylizer.stylize(&self.photo, &self.style)?;
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "stylized");

        report(Stage::Compositing);
        let image = composite::composite(
            &self.photo,
            &styled,
            &mask,
            self.params.composite_mode,
            self.params.thread_count(),
        )?;

        report(Stage::Done);

        Ok(StylizedImage {
            image,
            styled,
            mask,
        })
    }
}

/// Builds a session by setting parameters and adding input images, calling
/// `build` will check all of the provided inputs and load the images.
#[derive(Default)]
pub struct SessionBuilder<'a> {
    photo: Option<ImageSource<'a>>,
    style: Option<ImageSource<'a>>,
    mask: Option<ImageSource<'a>>,
    segmenter: Option<Box<dyn Segmenter>>,
    stylizer: Option<Box<dyn Stylizer>>,
    params: Parameters,
}

impl<'a> SessionBuilder<'a> {
    /// Creates a new `SessionBuilder`, can also be created via
    /// `Session::builder()`
    pub fn new() -> Self {
        Self::default()
    }

    /// The photo whose subject will be stylized
    pub fn photo<I: Into<ImageSource<'a>>>(mut self, photo: I) -> Self {
        self.photo = Some(photo.into());
        self
    }

    /// The image the style is sourced from
    pub fn style<I: Into<ImageSource<'a>>>(mut self, style: I) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Uses a precomputed person mask instead of running a segmenter. The
    /// mask is resized to the photo with nearest neighbor sampling.
    ///
    /// See `PersonMask::from_image` for how the image is interpreted.
    pub fn mask<I: Into<ImageSource<'a>>>(mut self, mask: I) -> Self {
        self.mask = Some(mask.into());
        self
    }

    /// The segmenter used to find the person in the photo
    pub fn segmenter<S: Segmenter + 'static>(mut self, segmenter: S) -> Self {
        self.segmenter = Some(Box::new(segmenter));
        self
    }

    /// The stylizer used to repaint the photo
    pub fn stylizer<S: Stylizer + 'static>(mut self, stylizer: S) -> Self {
        self.stylizer = Some(Box::new(stylizer));
        self
    }

    /// Shrinks the photo so that its longest side is at most `size` pixels.
    /// Models get slow (and hungry) quickly on large photos.
    pub fn max_size(mut self, size: u32) -> Self {
        self.params.max_size = Some(size);
        self
    }

    /// Chooses whether the person or the background gets stylized.
    ///
    /// Default: `CompositeMode::Foreground`
    pub fn composite_mode(mut self, mode: CompositeMode) -> Self {
        self.params.composite_mode = mode;
        self
    }

    /// The maximum number of threads used when compositing.
    ///
    /// Default: the number of logical cores
    pub fn max_thread_count(mut self, count: usize) -> Self {
        self.params.max_thread_count = Some(count);
        self
    }

    /// Creates a `Session`, or returns an error if invalid parameters or
    /// inputs were specified.
    pub fn build(self) -> Result<Session, Error> {
        self.check_parameters_validity()?;

        let photo_src = self.photo.ok_or(Error::MissingInput("photo"))?;
        let style_src = self.style.ok_or(Error::MissingInput("style"))?;

        if self.mask.is_none() && self.segmenter.is_none() {
            return Err(Error::MissingModel(errors::ModelKind::Segmentation));
        }

        let stylizer = self
            .stylizer
            .ok_or(Error::MissingModel(errors::ModelKind::StyleTransfer))?;

        let photo = load_image(photo_src, self.params.max_size)?;
        let style = load_image(style_src, None)?;

        let mask = match self.mask {
            Some(src) => Some(PersonMask::from_image(&load_dynamic_image(src)?)),
            None => None,
        };

        tracing::debug!(
            width = photo.width(),
            height = photo.height(),
            precomputed_mask = mask.is_some(),
            "session built"
        );

        Ok(Session {
            photo,
            style,
            mask,
            segmenter: self.segmenter,
            stylizer,
            params: self.params,
        })
    }

    fn check_parameters_validity(&self) -> Result<(), Error> {
        if let Some(max_count) = self.params.max_thread_count {
            if max_count == 0 {
                return Err(Error::InvalidRange(errors::InvalidRange {
                    min: 1.0,
                    max: 1024.0,
                    value: max_count as f32,
                    name: "max-thread-count",
                }));
            }
        }

        if let Some(max_size) = self.params.max_size {
            if max_size == 0 {
                return Err(Error::InvalidRange(errors::InvalidRange {
                    min: 1.0,
                    max: u32::MAX as f32,
                    value: 0.0,
                    name: "max-size",
                }));
            }
        }

        Ok(())
    }
}

/// A step of the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Segmenting,
    Stylizing,
    Compositing,
    Done,
}

impl Stage {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            Self::Segmenting => 0,
            Self::Stylizing => 1,
            Self::Compositing => 2,
            Self::Done => 3,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Segmenting => "segmenting",
            Self::Stylizing => "stylizing",
            Self::Compositing => "compositing",
            Self::Done => "done",
        })
    }
}

/// Helper struct for passing progress information to external callers
pub struct ProgressStat {
    /// The number of stages already finished
    pub current: usize,
    /// The total number of stages
    pub total: usize,
}

/// The current state of the pipeline
pub struct ProgressUpdate {
    /// The stage that is starting
    pub stage: Stage,
    pub total: ProgressStat,
}

/// Allows the pipeline to update external callers as it moves through
/// its stages
pub trait PipelineProgress {
    fn update(&mut self, info: ProgressUpdate);
}

impl<G> PipelineProgress for G
where
    G: FnMut(ProgressUpdate) + Send,
{
    fn update(&mut self, info: ProgressUpdate) {
        self(info)
    }
}
