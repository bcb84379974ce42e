use portrait_stylize as ps;

fn main() -> Result<(), ps::Error> {
    let session = ps::Session::builder()
        .photo(&"imgs/portrait.jpg")
        .style(&"imgs/styles/mosaic.jpg")
        // white where the person is, black elsewhere, no segmentation
        // model is needed when a mask is provided
        .mask(&"imgs/masks/portrait.png")
        .stylizer(ps::OnnxStylizer::load(
            "models/arbitrary_stylization.onnx",
            ps::StylizerConfig {
                // stylize at a lower resolution, the result is scaled back up
                max_content_size: Some(512),
                ..Default::default()
            },
        )?)
        .build()?;

    let stylized = session.run(None)?;

    // also save the mask and the un-composited stylization
    stylized.save_debug("out/02_debug")?;
    stylized.save("out/02.png")
}
