use std::fmt;

#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) value: f32,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' - value '{}' is outside the range of {}-{}",
            self.name, self.value, self.min, self.max
        )
    }
}

#[derive(Debug)]
pub struct SizeMismatch {
    pub(crate) what: &'static str,
    pub(crate) expected: (u32, u32),
    pub(crate) actual: (u32, u32),
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the {} size ({}x{}) must match the photo size ({}x{})",
            self.what, self.actual.0, self.actual.1, self.expected.0, self.expected.1
        )
    }
}

/// The pipeline stage that produced an inference error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Segmentation,
    StyleTransfer,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Segmentation => "segmentation",
            Self::StyleTransfer => "style transfer",
        })
    }
}

#[derive(Debug)]
pub enum Error {
    /// An error in the image library occurred, eg failed to load/save
    Image(image::ImageError),
    /// An input parameter had an invalid range specified
    InvalidRange(InvalidRange),
    /// The styled image or the mask doesn't have the same dimensions as the photo
    SizeMismatch(SizeMismatch),
    /// Per-pixel data didn't have one entry for every pixel
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Io is notoriously error free with no problems, but we cover it just in case!
    Io(std::io::Error),
    /// The user specified an image format we don't support as the output
    UnsupportedOutputFormat(String),
    /// A required input image was never provided, either the photo or the style
    MissingInput(&'static str),
    /// No model (or precomputed mask) was provided for a pipeline stage
    MissingModel(ModelKind),
    /// The inference runtime failed to load or run a model
    Inference(ModelKind, String),
    /// A model produced a tensor we don't know how to interpret
    InvalidTensorShape {
        expected: &'static str,
        actual: Vec<usize>,
    },
    /// A compositing worker thread panicked
    WorkerPanicked,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(ie) => write!(f, "{}", ie),
            Self::InvalidRange(ir) => write!(f, "{}", ir),
            Self::SizeMismatch(sm) => write!(f, "{}", sm),
            Self::LengthMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "expected {} {} values, one per pixel, but got {}",
                expected, what, actual
            ),
            Self::Io(io) => write!(f, "{}", io),
            Self::UnsupportedOutputFormat(fmt) => {
                write!(f, "the output format '{}' is not supported", fmt)
            }
            Self::MissingInput(which) => write!(f, "a {} image must be provided", which),
            Self::MissingModel(kind) => match kind {
                ModelKind::Segmentation => write!(
                    f,
                    "either a segmentation model or a precomputed mask must be provided"
                ),
                ModelKind::StyleTransfer => {
                    write!(f, "a style transfer model must be provided")
                }
            },
            Self::Inference(kind, msg) => write!(f, "{} model failed: {}", kind, msg),
            Self::InvalidTensorShape { expected, actual } => write!(
                f,
                "expected a model output of shape {}, but got {:?}",
                expected, actual
            ),
            Self::WorkerPanicked => write!(f, "a compositing worker thread panicked"),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(ie: image::ImageError) -> Self {
        Self::Image(ie)
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::Io(io)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn size_mismatch_names_the_offender() {
        let err = Error::SizeMismatch(SizeMismatch {
            what: "mask",
            expected: (10, 20),
            actual: (5, 5),
        });

        assert_eq!(
            err.to_string(),
            "the mask size (5x5) must match the photo size (10x20)"
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert!(Error::WorkerPanicked.source().is_none());
    }
}
