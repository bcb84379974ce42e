use portrait_stylize as ps;
use ps::image::{self, Rgba, RgbaImage};

const W: u32 = 48;
const H: u32 = 32;

// The "person" occupies the middle of the photo
fn in_person(x: u32, y: u32) -> bool {
    (12..36).contains(&x) && (8..24).contains(&y)
}

fn photo() -> RgbaImage {
    RgbaImage::from_fn(W, H, |x, y| Rgba([(x * 5) as u8, (y * 7) as u8, 90, 255]))
}

fn style() -> RgbaImage {
    RgbaImage::from_pixel(16, 16, Rgba([200, 40, 160, 255]))
}

// Stands in for a segmentation network, emitting soft probabilities rather
// than a hard mask
fn fake_segmenter(photo: &RgbaImage) -> Result<ps::PersonMask, ps::Error> {
    let (w, h) = (photo.width(), photo.height());
    let probs: Vec<f32> = (0..h)
        .flat_map(|y| (0..w).map(move |x| if in_person(x, y) { 0.95 } else { 0.05 }))
        .collect();

    ps::PersonMask::from_probabilities(&probs, ps::Dims::new(w, h), ps::Dims::new(w, h), 0.7)
}

// Paints every pixel in the average colour of the style
fn fake_stylizer(content: &RgbaImage, style: &RgbaImage) -> Result<RgbaImage, ps::Error> {
    let n = u64::from(style.width() * style.height());
    let mut sum = [0u64; 3];
    for px in style.pixels() {
        for c in 0..3 {
            sum[c] += u64::from(px[c]);
        }
    }

    let avg = Rgba([
        (sum[0] / n) as u8,
        (sum[1] / n) as u8,
        (sum[2] / n) as u8,
        255,
    ]);
    Ok(RgbaImage::from_pixel(content.width(), content.height(), avg))
}

macro_rules! pipeline_runs {
    ($name:ident, $session:expr, |$out:ident, $orig:ident| $check:block) => {
        #[test]
        fn $name() {
            let stylized = $session
                // Results must not depend on the thread count
                .max_thread_count(3)
                .build()
                .unwrap()
                .run(None)
                .unwrap();

            let $out = stylized.as_ref();
            let $orig = photo();
            $check
        }
    };
}

pipeline_runs!(
    stylizes_person_only,
    ps::Session::builder()
        .photo(photo())
        .style(style())
        .segmenter(fake_segmenter)
        .stylizer(fake_stylizer),
    |out, orig| {
        for (x, y, px) in out.enumerate_pixels() {
            if in_person(x, y) {
                assert_eq!(px.0, [200, 40, 160, 255], "({}, {})", x, y);
            } else {
                assert_eq!(px, orig.get_pixel(x, y), "({}, {})", x, y);
            }
        }
    }
);

pipeline_runs!(
    stylizes_background_only,
    ps::Session::builder()
        .photo(photo())
        .style(style())
        .segmenter(fake_segmenter)
        .stylizer(fake_stylizer)
        .composite_mode(ps::CompositeMode::Background),
    |out, orig| {
        for (x, y, px) in out.enumerate_pixels() {
            if in_person(x, y) {
                assert_eq!(px, orig.get_pixel(x, y), "({}, {})", x, y);
            } else {
                assert_eq!(px.0, [200, 40, 160, 255], "({}, {})", x, y);
            }
        }
    }
);

// A half resolution mask in the same alpha form `PersonMask::to_alpha_image`
// writes, loaded from encoded bytes
fn encoded_half_mask() -> Vec<u8> {
    let mask = RgbaImage::from_fn(W / 2, H / 2, |x, y| {
        Rgba([0, 0, 0, if in_person(x * 2, y * 2) { 255 } else { 0 }])
    });

    let mut bytes = Vec::new();
    ps::write_image(
        image::DynamicImage::ImageRgba8(mask),
        &mut bytes,
        image::ImageOutputFormat::Png,
    )
    .unwrap();
    bytes
}

#[test]
fn precomputed_mask_is_scaled_to_photo() {
    let bytes = encoded_half_mask();

    let stylized = ps::Session::builder()
        .photo(photo())
        .style(style())
        .mask(ps::ImageSource::Memory(&bytes))
        .stylizer(fake_stylizer)
        .build()
        .unwrap()
        .run(None)
        .unwrap();

    let mask = stylized.mask();
    assert_eq!(mask.dims(), ps::Dims::new(W, H));
    for y in 0..H {
        for x in 0..W {
            assert_eq!(mask.is_foreground(x, y), in_person(x, y), "({}, {})", x, y);
        }
    }

    assert_eq!(stylized.styled().dimensions(), (W, H));
}

#[test]
fn saves_debug_images() {
    let dir = std::env::temp_dir().join(format!("portrait-stylize-debug-{}", std::process::id()));

    let stylized = ps::Session::builder()
        .photo(photo())
        .style(style())
        .segmenter(fake_segmenter)
        .stylizer(fake_stylizer)
        .build()
        .unwrap()
        .run(None)
        .unwrap();

    stylized.save_debug(&dir).unwrap();
    stylized.save(dir.join("nested").join("out.png")).unwrap();

    let mask = image::open(dir.join("mask.png")).unwrap().to_luma8();
    assert_eq!(mask.get_pixel(20, 16).0, [255]);
    assert_eq!(mask.get_pixel(0, 0).0, [0]);

    let out = image::open(dir.join("nested").join("out.png")).unwrap().to_rgba8();
    assert_eq!(&out, stylized.as_ref());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn stylizer_size_mismatch_is_an_error() {
    let result = ps::Session::builder()
        .photo(photo())
        .style(style())
        .segmenter(fake_segmenter)
        .stylizer(|content: &RgbaImage, _: &RgbaImage| -> Result<RgbaImage, ps::Error> {
            Ok(RgbaImage::new(content.width() / 2, content.height()))
        })
        .build()
        .unwrap()
        .run(None);

    assert!(matches!(result, Err(ps::Error::SizeMismatch(_))));
}
