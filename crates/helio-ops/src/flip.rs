//! Horizontal and vertical mirrors.
//!
//! `hflip` maps `out[y][x] = in[y][w-1-x]`, `vflip` maps
//! `out[y][x] = in[h-1-y][x]`. Both are involutions, bit-exact on pixels.
//! The geometric log always records the flip that was applied: an hflip
//! appends an hflip op carrying the width, a vflip appends a vflip op
//! carrying the height.

use helio_core::{CoordOp, Image, MonoImage, Point2D, RgbImage};

use crate::affine::updated_bag;

/// Mirrors an image left-right.
pub fn hflip(image: &Image) -> Image {
    let (w, h) = image.dimensions();
    let s = w as f64 - 1.0;
    let metadata = updated_bag(
        image.metadata(),
        move |p: Point2D| Point2D::new(s - p.x, p.y),
        |e| e.hflip(w),
        CoordOp::HFlip { width: w as f64 },
        "Horizontal flip",
    );

    let flip_plane = |src: &[f32]| -> Vec<f32> {
        let mut dst = vec![0.0f32; src.len()];
        for y in 0..h {
            let row = y * w;
            for x in 0..w {
                dst[row + x] = src[row + (w - 1 - x)];
            }
        }
        dst
    };

    match image {
        Image::Mono(img) => Image::Mono(
            MonoImage::from_data(w, h, flip_plane(img.data()), metadata)
                .expect("flip preserves shape"),
        ),
        Image::Rgb(img) => {
            let [r, g, b] = img.planes();
            Image::Rgb(
                RgbImage::from_planes(w, h, flip_plane(r), flip_plane(g), flip_plane(b), metadata)
                    .expect("flip preserves shape"),
            )
        }
    }
}

/// Mirrors an image top-bottom.
pub fn vflip(image: &Image) -> Image {
    let (w, h) = image.dimensions();
    let t = h as f64 - 1.0;
    let metadata = updated_bag(
        image.metadata(),
        move |p: Point2D| Point2D::new(p.x, t - p.y),
        |e| e.vflip(h),
        CoordOp::VFlip { height: h as f64 },
        "Vertical flip",
    );

    let flip_plane = |src: &[f32]| -> Vec<f32> {
        let mut dst = vec![0.0f32; src.len()];
        for y in 0..h {
            dst[y * w..(y + 1) * w].copy_from_slice(&src[(h - 1 - y) * w..(h - y) * w]);
        }
        dst
    };

    match image {
        Image::Mono(img) => Image::Mono(
            MonoImage::from_data(w, h, flip_plane(img.data()), metadata)
                .expect("flip preserves shape"),
        ),
        Image::Rgb(img) => {
            let [r, g, b] = img.planes();
            Image::Rgb(
                RgbImage::from_planes(w, h, flip_plane(r), flip_plane(g), flip_plane(b), metadata)
                    .expect("flip preserves shape"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::{Ellipse, MetadataKind, MetadataValue};

    fn gradient_image(w: usize, h: usize) -> Image {
        let mut img = MonoImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set_pixel(x, y, (y * w + x) as f32);
            }
        }
        Image::Mono(img)
    }

    #[test]
    fn test_hflip_mirrors_pixels() {
        let img = gradient_image(3, 2);
        let Image::Mono(out) = hflip(&img) else { panic!() };
        assert_eq!(out.row(0), &[2.0, 1.0, 0.0]);
        assert_eq!(out.row(1), &[5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_vflip_mirrors_rows() {
        let img = gradient_image(3, 2);
        let Image::Mono(out) = vflip(&img) else { panic!() };
        assert_eq!(out.row(0), &[3.0, 4.0, 5.0]);
        assert_eq!(out.row(1), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_involution_pixels_and_geometry() {
        let mut img = MonoImage::new(8, 6);
        for (i, v) in img.data_mut().iter_mut().enumerate() {
            *v = (i as f32).sin() * 1000.0;
        }
        img.metadata_mut()
            .insert(MetadataValue::Ellipse(Ellipse::circle(3.0, 2.0, 1.5)));
        img.metadata_mut()
            .insert(MetadataValue::ActiveRegions(vec![Point2D::new(5.0, 1.0)]));
        let img = Image::Mono(img);

        for flip in [hflip as fn(&Image) -> Image, vflip] {
            let twice = flip(&flip(&img));
            let Image::Mono(ref back) = twice else { panic!() };
            let Image::Mono(ref orig) = img else { panic!() };
            assert_eq!(back.data(), orig.data());
            assert_eq!(
                twice.metadata().get(MetadataKind::Ellipse),
                img.metadata().get(MetadataKind::Ellipse)
            );
            assert_eq!(
                twice.metadata().get(MetadataKind::ActiveRegions),
                img.metadata().get(MetadataKind::ActiveRegions)
            );
        }
    }

    #[test]
    fn test_flip_appends_matching_op() {
        let img = gradient_image(4, 4);
        let out = hflip(&img);
        assert_eq!(
            out.metadata().reference_coords().unwrap(),
            &[CoordOp::HFlip { width: 4.0 }]
        );

        let out = vflip(&out);
        assert_eq!(
            out.metadata().reference_coords().unwrap(),
            &[
                CoordOp::HFlip { width: 4.0 },
                CoordOp::VFlip { height: 4.0 }
            ]
        );
        assert_eq!(
            out.metadata().transformation_history().unwrap(),
            &["Horizontal flip", "Vertical flip"]
        );
    }

    #[test]
    fn test_rgb_flip() {
        let rgb = RgbImage::from_planes(
            2,
            1,
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 6.0],
            Default::default(),
        )
        .unwrap();
        let Image::Rgb(out) = hflip(&Image::Rgb(rgb)) else { panic!() };
        let [r, g, b] = out.planes();
        assert_eq!(r, &[2.0, 1.0]);
        assert_eq!(g, &[4.0, 3.0]);
        assert_eq!(b, &[6.0, 5.0]);
    }
}
