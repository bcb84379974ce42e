mod composite;
mod mask;
mod progress;

use structopt::StructOpt;

use portrait_stylize::{
    self as ps, image::ImageOutputFormat as ImgFmt, CompositeMode, Error, ModelKind,
    Normalization, SegmenterConfig, StylizerConfig, TensorLayout,
};
use std::path::PathBuf;

fn parse_size(input: &str) -> Result<(u32, u32), std::num::ParseIntError> {
    let mut i = input.splitn(2, 'x');

    let x: u32 = i.next().unwrap_or("").parse()?;
    let y: u32 = match i.next() {
        Some(num) => num.parse()?,
        None => x,
    };
    Ok((x, y))
}

fn parse_img_fmt(input: &str) -> Result<ImgFmt, String> {
    let fmt = match input {
        "png" => ImgFmt::Png,
        "jpg" => ImgFmt::Jpeg(75),
        "bmp" => ImgFmt::Bmp,
        other => {
            return Err(format!(
                "image format `{}` not one of: 'png', 'jpg', 'bmp'",
                other
            ))
        }
    };

    Ok(fmt)
}

fn parse_layout(input: &str) -> Result<TensorLayout, String> {
    match input {
        "nhwc" => Ok(TensorLayout::Nhwc),
        "nchw" => Ok(TensorLayout::Nchw),
        other => Err(format!("tensor layout `{}` not one of: 'nhwc', 'nchw'", other)),
    }
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Run {
    /// The image from which the style will be sourced
    #[structopt(long, parse(from_os_str))]
    style: PathBuf,
    /// A precomputed mask of the person, white on black or an alpha mask,
    /// used instead of running the segmentation model
    #[structopt(long, parse(from_os_str))]
    mask: Option<PathBuf>,
    /// The photo whose subject will be stylized
    #[structopt(parse(from_os_str))]
    photo: PathBuf,
}

#[derive(StructOpt)]
enum Subcommand {
    /// Stylizes the person in a photo and composites them over the original background
    #[structopt(name = "run")]
    Run(Run),
    /// Segments the person in a photo and writes out the mask
    #[structopt(name = "mask")]
    Mask(mask::Args),
    /// Composites an already stylized image over a photo using a mask
    #[structopt(name = "composite")]
    Composite(composite::Args),
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub(crate) struct Models {
    /// Path to an ONNX person segmentation model
    #[structopt(long, parse(from_os_str))]
    segmentation_model: Option<PathBuf>,
    /// Path to an ONNX arbitrary style transfer model, taking a content and a
    /// style image and producing the stylized content
    #[structopt(long, parse(from_os_str))]
    style_model: Option<PathBuf>,
    /// Input size of the segmentation model, in `width x height`, or a single
    /// number for both dimensions
    #[structopt(long, default_value = "256", parse(try_from_str = parse_size))]
    seg_size: (u32, u32),
    /// Tensor layout of the segmentation model, 'nhwc' or 'nchw'
    #[structopt(long, default_value = "nhwc", parse(try_from_str = parse_layout))]
    seg_layout: TensorLayout,
    /// Normalize segmentation input with the ImageNet mean and standard
    /// deviation instead of just scaling to [0, 1]
    #[structopt(long)]
    imagenet_norm: bool,
    /// Pixels with a person probability above this are considered part of
    /// the person. Range (0.0 - 1.0)
    #[structopt(long, default_value = "0.7")]
    threshold: f32,
    /// The segmentation output channel holding the person, defaults to the last
    #[structopt(long)]
    person_channel: Option<usize>,
    /// The segmentation model outputs logits, not probabilities
    #[structopt(long)]
    sigmoid: bool,
    /// The size the style image is resized to before stylization
    #[structopt(long, default_value = "256")]
    style_size: u32,
    /// Stylize at most at this resolution, the result is scaled back up to
    /// the photo's size
    #[structopt(long)]
    style_max_content: Option<u32>,
    /// The style model takes the style image as its first input
    #[structopt(long)]
    style_first: bool,
}

impl Models {
    pub(crate) fn segmenter(&self) -> Result<ps::OnnxSegmenter, Error> {
        let path = self
            .segmentation_model
            .as_ref()
            .ok_or(Error::MissingModel(ModelKind::Segmentation))?;

        ps::OnnxSegmenter::load(
            path,
            SegmenterConfig {
                input_size: ps::Dims::new(self.seg_size.0, self.seg_size.1),
                layout: self.seg_layout,
                normalization: if self.imagenet_norm {
                    Normalization::imagenet()
                } else {
                    Normalization::default()
                },
                threshold: self.threshold,
                person_channel: self.person_channel,
                sigmoid: self.sigmoid,
            },
        )
    }

    fn stylizer(&self) -> Result<ps::OnnxStylizer, Error> {
        let path = self
            .style_model
            .as_ref()
            .ok_or(Error::MissingModel(ModelKind::StyleTransfer))?;

        ps::OnnxStylizer::load(
            path,
            StylizerConfig {
                style_size: self.style_size,
                max_content_size: self.style_max_content,
                style_first: self.style_first,
            },
        )
    }
}

#[derive(StructOpt)]
#[structopt(
    name = "portrait-stylize",
    about = "Stylizes the person in a photo, leaving the background untouched",
    rename_all = "kebab-case"
)]
pub(crate) struct Opt {
    /// The path to save the output image to, the file extensions of the path determines
    /// the image format used. You may use `-` for stdout.
    #[structopt(long = "out", short, parse(from_os_str))]
    output_path: PathBuf,
    /// The format to save the output image as.
    ///
    /// NOTE: this will only apply when stdout is specified via `-o -`, otherwise the image
    /// format is determined by the file extension of the path provided to `-o`
    #[structopt(
        long,
        default_value = "png",
        parse(try_from_str = parse_img_fmt)
    )]
    out_fmt: ImgFmt,
    /// Shrinks the photo so its longest side is at most this many pixels
    #[structopt(long)]
    max_size: Option<u32>,
    /// Stylize the background instead of the person
    #[structopt(long)]
    invert: bool,
    /// A directory into which debug images are also saved.
    ///
    /// * `mask.png` - The person mask, white on black
    /// * `styled.png` - The whole photo stylized, before compositing
    #[structopt(long, parse(from_os_str))]
    debug_out_dir: Option<PathBuf>,
    /// The maximum number of worker threads used while compositing.
    /// Defaults to the logical core count.
    #[structopt(short = "t", long = "threads")]
    max_threads: Option<usize>,
    /// Don't show progress
    #[structopt(long)]
    no_progress: bool,
    #[structopt(flatten)]
    models: Models,
    #[structopt(subcommand)]
    cmd: Subcommand,
}

impl Opt {
    pub(crate) fn composite_mode(&self) -> CompositeMode {
        if self.invert {
            CompositeMode::Background
        } else {
            CompositeMode::Foreground
        }
    }

    pub(crate) fn thread_count(&self) -> usize {
        self.max_threads.unwrap_or_else(num_cpus::get)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        if atty::is(atty::Stream::Stderr) {
            eprintln!("\x1b[31merror\x1b[0m: {}", e);
        } else {
            eprintln!("error: {}", e);
        }

        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Error> {
    let args = Opt::from_args();

    check_output_format(&args.output_path)?;

    match &args.cmd {
        Subcommand::Run(run) => run_pipeline(run, &args),
        Subcommand::Mask(mask_args) => mask::cmd(mask_args, &args),
        Subcommand::Composite(comp_args) => composite::cmd(comp_args, &args),
    }
}

/// Check that the extension for the path supplied by the user is one of the ones we support
fn check_output_format(path: &std::path::Path) -> Result<(), Error> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") | Some("jpg") | Some("bmp") | None => Ok(()),
        Some(other) => Err(Error::UnsupportedOutputFormat(other.to_owned())),
    }
}

fn run_pipeline(run: &Run, args: &Opt) -> Result<(), Error> {
    let mut sb = ps::Session::builder()
        .photo(&run.photo)
        .style(&run.style)
        .composite_mode(args.composite_mode());

    // A precomputed mask makes the segmentation model unnecessary
    sb = match run.mask {
        Some(ref mask) => sb.mask(mask),
        None => sb.segmenter(args.models.segmenter()?),
    };

    sb = sb.stylizer(args.models.stylizer()?);

    if let Some(mt) = args.max_threads {
        sb = sb.max_thread_count(mt);
    }

    if let Some(max_size) = args.max_size {
        sb = sb.max_size(max_size);
    }

    let session = sb.build()?;

    let progress: Option<Box<dyn ps::PipelineProgress>> = if !args.no_progress {
        Some(Box::new(progress::StageProgress::new()))
    } else {
        None
    };

    let stylized = session.run(progress)?;

    if let Some(ref dir) = args.debug_out_dir {
        stylized.save_debug(dir)?;
    }

    write_output(stylized.into_image(), args)
}

/// Writes the final image to wherever the user asked for it
pub(crate) fn write_output(img: ps::image::DynamicImage, args: &Opt) -> Result<(), Error> {
    if args.output_path.to_str() == Some("-") {
        let out = std::io::stdout();
        let mut out = out.lock();
        ps::write_image(img, &mut out, args.out_fmt.clone())
    } else {
        // This won't respect the output format specified by the user,
        // only the extension on the path they specify, but that makes
        // more sense, and is probably better than detecting and emitting
        // an error
        if let Some(parent) = args.output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        img.save(&args.output_path)?;
        Ok(())
    }
}
