use portrait_stylize as ps;

fn main() -> Result<(), ps::Error> {
    let session = ps::Session::builder()
        .photo(&"imgs/portrait.jpg")
        .style(&"imgs/styles/wave.jpg")
        .segmenter(ps::OnnxSegmenter::load(
            "models/selfie_segmentation.onnx",
            ps::SegmenterConfig::default(),
        )?)
        .stylizer(ps::OnnxStylizer::load(
            "models/arbitrary_stylization.onnx",
            ps::StylizerConfig::default(),
        )?)
        // leave the person as is and stylize everything around them
        .composite_mode(ps::CompositeMode::Background)
        .build()?;

    let stylized = session.run(None)?;
    stylized.save("out/03.png")
}
