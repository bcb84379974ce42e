use crate::{errors, Error, PersonMask};

/// Which side of the mask receives the stylized pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeMode {
    /// The person is stylized, the background is left untouched
    Foreground,
    /// The background is stylized, the person is left untouched
    Background,
}

impl Default for CompositeMode {
    fn default() -> Self {
        Self::Foreground
    }
}

fn check_size(
    original: &image::RgbaImage,
    what: &'static str,
    dims: (u32, u32),
) -> Result<(), Error> {
    if original.dimensions() != dims {
        return Err(Error::SizeMismatch(errors::SizeMismatch {
            what,
            expected: original.dimensions(),
            actual: dims,
        }));
    }

    Ok(())
}

/// Copies every pixel of `styled` selected by the mask (all four channels)
/// over a copy of `original`.
///
/// Rows are split into bands that are composited on up to `max_threads`
/// worker threads. Every pixel is independent, so the output doesn't depend
/// on the thread count.
pub fn composite(
    original: &image::RgbaImage,
    styled: &image::RgbaImage,
    mask: &PersonMask,
    mode: CompositeMode,
    max_threads: usize,
) -> Result<image::RgbaImage, Error> {
    check_size(original, "styled image", styled.dimensions())?;
    let md = mask.dims();
    check_size(original, "mask", (md.width, md.height))?;

    let mut result = original.clone();
    let (width, height) = result.dimensions();
    if width == 0 || height == 0 {
        return Ok(result);
    }

    let take_styled = mode == CompositeMode::Foreground;
    let row_len = width as usize * 4;

    let composite_band = |first_row: u32, band: &mut [u8]| {
        for (i, row) in band.chunks_exact_mut(row_len).enumerate() {
            let y = first_row + i as u32;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let x = x as u32;
                if mask.is_foreground(x, y) == take_styled {
                    px.copy_from_slice(&styled.get_pixel(x, y).0);
                }
            }
        }
    };

    let threads = max_threads.max(1).min(height as usize);
    let rows_per_band = (height as usize + threads - 1) / threads;

    // for WASM we do not have threads, just do it all on this one
    #[cfg(target_arch = "wasm32")]
    {
        let _ = rows_per_band;
        composite_band(0, &mut *result);
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        if threads == 1 {
            composite_band(0, &mut *result);
        } else {
            let composite_band = &composite_band;
            crossbeam_utils::thread::scope(|scope| {
                for (i, band) in result.chunks_mut(rows_per_band * row_len).enumerate() {
                    let first_row = (i * rows_per_band) as u32;
                    scope.spawn(move |_| composite_band(first_row, band));
                }
            })
            .map_err(|_| Error::WorkerPanicked)?;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Dims;

    fn checker_mask(dims: Dims) -> PersonMask {
        let data: Vec<u8> = (0..dims.height)
            .flat_map(|y| (0..dims.width).map(move |x| ((x + y) % 2) as u8))
            .collect();
        PersonMask::from_segmentation(&data, dims).unwrap()
    }

    #[test]
    fn masked_pixels_take_all_styled_channels() {
        let original = image::RgbaImage::from_pixel(2, 1, image::Rgba([1, 2, 3, 255]));
        let styled = image::RgbaImage::from_pixel(2, 1, image::Rgba([9, 8, 7, 100]));
        let mask = PersonMask::from_segmentation(&[0, 1], Dims::new(2, 1)).unwrap();

        let out = composite(&original, &styled, &mask, CompositeMode::Foreground, 1).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [9, 8, 7, 100]);

        let out = composite(&original, &styled, &mask, CompositeMode::Background, 1).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [9, 8, 7, 100]);
        assert_eq!(out.get_pixel(1, 0).0, [1, 2, 3, 255]);
    }

    #[test]
    fn thread_count_doesnt_change_output() {
        let dims = Dims::new(37, 23);
        let original = image::RgbaImage::from_fn(dims.width, dims.height, |x, y| {
            image::Rgba([x as u8, y as u8, 0, 255])
        });
        let styled = image::RgbaImage::from_fn(dims.width, dims.height, |x, y| {
            image::Rgba([0, x as u8, y as u8, 255])
        });
        let mask = checker_mask(dims);

        let single = composite(&original, &styled, &mask, CompositeMode::Foreground, 1).unwrap();
        for threads in &[2, 3, 8, 64] {
            let multi =
                composite(&original, &styled, &mask, CompositeMode::Foreground, *threads).unwrap();
            assert_eq!(single, multi, "differed with {} threads", threads);
        }
    }

    #[test]
    fn rejects_mismatched_sizes() {
        let original = image::RgbaImage::new(4, 4);
        let styled = image::RgbaImage::new(4, 3);
        let mask = checker_mask(Dims::square(4));

        assert!(matches!(
            composite(&original, &styled, &mask, CompositeMode::Foreground, 1),
            Err(Error::SizeMismatch(_))
        ));

        let small_mask = checker_mask(Dims::square(2));
        assert!(matches!(
            composite(&original, &original, &small_mask, CompositeMode::Foreground, 1),
            Err(Error::SizeMismatch(_))
        ));
    }

    #[test]
    fn empty_mask_is_identity() {
        let original = image::RgbaImage::from_pixel(5, 5, image::Rgba([10, 20, 30, 40]));
        let styled = image::RgbaImage::new(5, 5);
        let mask = PersonMask::from_segmentation(&[0; 25], Dims::square(5)).unwrap();

        let out = composite(&original, &styled, &mask, CompositeMode::Foreground, 4).unwrap();
        assert_eq!(out, original);
    }
}
