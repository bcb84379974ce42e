use portrait_stylize::{self as ps, Segmenter};

fn main() -> Result<(), ps::Error> {
    let photo = ps::load_image(ps::ImageSource::from_path("imgs/portrait.jpg".as_ref()), None)?;

    // a PyTorch export, so channels first with ImageNet statistics, whose
    // second output channel is the person logit
    let mut segmenter = ps::OnnxSegmenter::load(
        "models/person_segmentation_nchw.onnx",
        ps::SegmenterConfig {
            input_size: ps::Dims::square(320),
            layout: ps::TensorLayout::Nchw,
            normalization: ps::Normalization::imagenet(),
            threshold: 0.5,
            person_channel: Some(1),
            sigmoid: true,
        },
    )?;

    let mask = segmenter.segment(&photo)?;
    println!("person covers {:.1}% of the photo", mask.coverage() * 100.0);

    // transparent background, opaque person
    std::fs::create_dir_all("out")?;
    mask.to_alpha_image().save("out/04.png")?;
    Ok(())
}
