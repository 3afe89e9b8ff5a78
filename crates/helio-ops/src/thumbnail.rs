//! Preview thumbnails.
//!
//! Nearest-neighbor downscale preserving aspect ratio. Thumbnails are
//! previews, not data products: they carry a fresh empty metadata bag.

use helio_core::{Image, MetadataBag, MonoImage, RgbImage};

/// Downscales `image` to fit within `max_width x max_height`.
///
/// The scale is `min(max_width/w, max_height/h)`; when it is 1 or larger
/// the source is returned unchanged (including its metadata).
pub fn thumbnail(image: &Image, max_width: usize, max_height: usize) -> Image {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.copy();
    }
    let scale = (max_width as f64 / w as f64).min(max_height as f64 / h as f64);
    if scale >= 1.0 {
        return image.copy();
    }
    let out_w = ((w as f64 * scale) as usize).max(1);
    let out_h = ((h as f64 * scale) as usize).max(1);

    let shrink = |src: &[f32]| -> Vec<f32> {
        let mut dst = Vec::with_capacity(out_w * out_h);
        for y in 0..out_h {
            let sy = ((y as f64 / scale) as usize).min(h - 1);
            for x in 0..out_w {
                let sx = ((x as f64 / scale) as usize).min(w - 1);
                dst.push(src[sy * w + sx]);
            }
        }
        dst
    };

    match image {
        Image::Mono(img) => Image::Mono(
            MonoImage::from_data(out_w, out_h, shrink(img.data()), MetadataBag::new())
                .expect("thumbnail preserves shape"),
        ),
        Image::Rgb(img) => {
            let [r, g, b] = img.planes();
            Image::Rgb(
                RgbImage::from_planes(
                    out_w,
                    out_h,
                    shrink(r),
                    shrink(g),
                    shrink(b),
                    MetadataBag::new(),
                )
                .expect("thumbnail preserves shape"),
            )
        }
    }
}
