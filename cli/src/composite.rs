use portrait_stylize::{self as ps, Error, ImageSource, PersonMask};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub(crate) struct Args {
    /// The stylized version of the photo, which must be the same size
    #[structopt(long, parse(from_os_str))]
    styled: PathBuf,
    /// The person mask, either white on black or an alpha mask. It is resized
    /// to the photo if needed.
    #[structopt(long, parse(from_os_str))]
    mask: PathBuf,
    /// The original photo
    #[structopt(parse(from_os_str))]
    photo: PathBuf,
}

pub(crate) fn cmd(args: &Args, global_opts: &crate::Opt) -> Result<(), Error> {
    let photo = ps::load_image(ImageSource::from_path(&args.photo), None)?;
    let styled = ps::load_image(ImageSource::from_path(&args.styled), None)?;

    let mask = ps::load_dynamic_image(ImageSource::from_path(&args.mask))?;
    let mask = PersonMask::from_image(&mask).resize(ps::Dims::new(photo.width(), photo.height()))?;

    let composited = ps::composite(
        &photo,
        &styled,
        &mask,
        global_opts.composite_mode(),
        global_opts.thread_count(),
    )?;

    crate::write_output(
        ps::image::DynamicImage::ImageRgba8(composited),
        global_opts,
    )
}
