use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use portrait_stylize as ps;

fn inputs(dim: u32) -> (ps::image::RgbaImage, ps::image::RgbaImage, ps::PersonMask) {
    let original = ps::image::RgbaImage::from_fn(dim, dim, |x, y| {
        ps::image::Rgba([x as u8, y as u8, 128, 255])
    });
    let styled = ps::image::RgbaImage::from_fn(dim, dim, |x, y| {
        ps::image::Rgba([y as u8, 64, x as u8, 255])
    });

    // A centered disc, roughly what a portrait's mask looks like
    let r = dim as f32 / 3.0;
    let c = dim as f32 / 2.0;
    let data: Vec<u8> = (0..dim)
        .flat_map(|y| {
            (0..dim).map(move |x| {
                let (dx, dy) = (x as f32 - c, y as f32 - c);
                u8::from(dx * dx + dy * dy < r * r)
            })
        })
        .collect();
    let mask = ps::PersonMask::from_segmentation(&data, ps::Dims::square(dim)).unwrap();

    (original, styled, mask)
}

fn composite(c: &mut Criterion) {
    static DIM: u32 = 256;

    let mut group = c.benchmark_group("composite");
    group.sample_size(20);

    for dim in [DIM, 2 * DIM, 4 * DIM, 8 * DIM].iter() {
        let (original, styled, mask) = inputs(*dim);

        for threads in [1, num_cpus::get()].iter() {
            group.bench_with_input(
                BenchmarkId::new(format!("{}_threads", threads), dim),
                dim,
                |b, _| {
                    b.iter(|| {
                        black_box(
                            ps::composite(
                                &original,
                                &styled,
                                &mask,
                                ps::CompositeMode::Foreground,
                                *threads,
                            )
                            .unwrap(),
                        )
                    });
                },
            );
        }
    }
    group.finish();
}

fn mask_from_probabilities(c: &mut Criterion) {
    // Typical segmentation output resolution, upsampled to photo sizes
    let probs: Vec<f32> = (0..256 * 256).map(|i| (i % 256) as f32 / 255.0).collect();

    let mut group = c.benchmark_group("mask_from_probabilities");
    group.sample_size(20);

    for dim in [512u32, 1024, 2048].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, &dim| {
            b.iter(|| {
                black_box(
                    ps::PersonMask::from_probabilities(
                        &probs,
                        ps::Dims::square(256),
                        ps::Dims::square(dim),
                        0.7,
                    )
                    .unwrap(),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, composite, mask_from_probabilities);
criterion_main!(benches);
