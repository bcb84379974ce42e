use std::path::PathBuf;
use structopt::StructOpt;
use portrait_stylize::{self as ps, Error, ImageSource, Segmenter};

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub(crate) struct Args {
    /// Write the mask as white on black instead of as an alpha mask
    #[structopt(long)]
    luma: bool,
    /// The photo to segment
    #[structopt(parse(from_os_str))]
    photo: PathBuf,
}

pub(crate) fn cmd(args: &Args, global_opts: &crate::Opt) -> Result<(), Error> {
    let photo = ps::load_image(ImageSource::from_path(&args.photo), global_opts.max_size)?;

    let mut segmenter = global_opts.models.segmenter()?;
    let mut mask = segmenter.segment(&photo)?;

    if global_opts.invert {
        mask = mask.invert();
    }

    tracing::info!(
        coverage = mask.coverage(),
        "segmented '{}'",
        args.photo.display()
    );

    let img = if args.luma {
        ps::image::DynamicImage::ImageLuma8(mask.to_luma_image())
    } else {
        ps::image::DynamicImage::ImageRgba8(mask.to_alpha_image())
    };

    crate::write_output(img, global_opts)
}
