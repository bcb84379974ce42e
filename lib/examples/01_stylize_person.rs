use portrait_stylize as ps;

fn main() -> Result<(), ps::Error> {
    let session = ps::Session::builder()
        // the photo whose subject we want to stylize
        .photo(&"imgs/portrait.jpg")
        // the image the style is taken from
        .style(&"imgs/styles/wave.jpg")
        // finds the person in the photo, this one takes 256x256 NHWC input
        .segmenter(ps::OnnxSegmenter::load(
            "models/selfie_segmentation.onnx",
            ps::SegmenterConfig::default(),
        )?)
        // repaints the photo in the style of the style image
        .stylizer(ps::OnnxStylizer::load(
            "models/arbitrary_stylization.onnx",
            ps::StylizerConfig::default(),
        )?)
        // keep inference times reasonable
        .max_size(1024)
        .build()?;

    let stylized = session.run(None)?;

    // save the result to the disk
    stylized.save("out/01.png")
}
