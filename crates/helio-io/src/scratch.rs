//! The spill format of the image memory manager.
//!
//! Layout, all little-endian:
//!
//! ```text
//! u8   kind (0 = mono, 2 = rgb)
//! i32  height
//! i32  width
//! f32  pixels, row-major (1 or 3 interleaved per pixel)
//! ```
//!
//! The choice of little-endian matches the native order of every deployment
//! target, so a spill is a plain memory dump. This is a private cache
//! format: no magic, no checksum, and readers reject anything whose kind
//! byte or length does not match.
//!
//! The metadata bag is not spilled; it stays on the file-backed handle.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use helio_core::{Image, MetadataBag, MonoImage, RgbImage};

use crate::error::{IoError, IoResult};

/// Kind byte for a mono spill.
pub const KIND_MONO: u8 = 0;
/// Kind byte for an RGB spill.
pub const KIND_RGB: u8 = 2;

/// Writes the pixel planes of `image` to `path`.
pub fn write<P: AsRef<Path>>(path: P, image: &Image) -> IoResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    let (w, h) = image.dimensions();
    match image {
        Image::Mono(img) => {
            writer.write_u8(KIND_MONO)?;
            writer.write_i32::<LittleEndian>(h as i32)?;
            writer.write_i32::<LittleEndian>(w as i32)?;
            for &v in img.data() {
                writer.write_f32::<LittleEndian>(v)?;
            }
        }
        Image::Rgb(img) => {
            writer.write_u8(KIND_RGB)?;
            writer.write_i32::<LittleEndian>(h as i32)?;
            writer.write_i32::<LittleEndian>(w as i32)?;
            let [r, g, b] = img.planes();
            for i in 0..w * h {
                writer.write_f32::<LittleEndian>(r[i])?;
                writer.write_f32::<LittleEndian>(g[i])?;
                writer.write_f32::<LittleEndian>(b[i])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Reads a spill back into an image with an empty metadata bag.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<Image> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);

    let kind = reader.read_u8()?;
    let height = reader.read_i32::<LittleEndian>()?;
    let width = reader.read_i32::<LittleEndian>()?;
    if height < 0 || width < 0 {
        return Err(IoError::InvalidFile(format!(
            "negative spill dimensions: {width}x{height}"
        )));
    }
    let (w, h) = (width as usize, height as usize);
    let pixels = w * h;

    match kind {
        KIND_MONO => {
            let data = read_f32_exact(&mut reader, pixels)?;
            Ok(Image::Mono(
                MonoImage::from_data(w, h, data, MetadataBag::new())
                    .map_err(IoError::Core)?,
            ))
        }
        KIND_RGB => {
            let interleaved = read_f32_exact(&mut reader, pixels * 3)?;
            let mut r = Vec::with_capacity(pixels);
            let mut g = Vec::with_capacity(pixels);
            let mut b = Vec::with_capacity(pixels);
            for chunk in interleaved.chunks_exact(3) {
                r.push(chunk[0]);
                g.push(chunk[1]);
                b.push(chunk[2]);
            }
            Ok(Image::Rgb(
                RgbImage::from_planes(w, h, r, g, b, MetadataBag::new())
                    .map_err(IoError::Core)?,
            ))
        }
        other => Err(IoError::InvalidFile(format!(
            "unknown spill kind byte: {other}"
        ))),
    }
}

fn read_f32_exact<R: Read>(reader: &mut R, count: usize) -> IoResult<Vec<f32>> {
    let mut data = vec![0.0f32; count];
    reader
        .read_f32_into::<LittleEndian>(&mut data)
        .map_err(|e| IoError::DecodeError(format!("truncated spill: {e}")))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mono_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spill.bin");

        let mut img = MonoImage::new(5, 3);
        for (i, v) in img.data_mut().iter_mut().enumerate() {
            *v = i as f32 * 1.5;
        }
        let image = Image::Mono(img);
        write(&path, &image).unwrap();
        let back = read(&path).unwrap();

        let (Image::Mono(a), Image::Mono(b)) = (&image, &back) else {
            panic!()
        };
        assert_eq!(a.dimensions(), b.dimensions());
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_rgb_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spill.bin");

        let rgb = RgbImage::from_planes(
            2,
            2,
            vec![1.0, 2.0, 3.0, 4.0],
            vec![5.0, 6.0, 7.0, 8.0],
            vec![9.0, 10.0, 11.0, 12.0],
            MetadataBag::new(),
        )
        .unwrap();
        write(&path, &Image::Rgb(rgb.clone())).unwrap();
        let Image::Rgb(back) = read(&path).unwrap() else {
            panic!()
        };
        assert_eq!(back.planes()[0], rgb.planes()[0]);
        assert_eq!(back.planes()[2], rgb.planes()[2]);
    }

    #[test]
    fn test_byte_layout_is_little_endian() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spill.bin");

        let mut img = MonoImage::new(1, 1);
        img.set_pixel(0, 0, 1.0);
        write(&path, &Image::Mono(img)).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes[0], KIND_MONO);
        // height = 1, width = 1 as little-endian i32.
        assert_eq!(&bytes[1..5], &[1, 0, 0, 0]);
        assert_eq!(&bytes[5..9], &[1, 0, 0, 0]);
        // 1.0f32 = 0x3F800000, little-endian.
        assert_eq!(&bytes[9..13], &[0x00, 0x00, 0x80, 0x3F]);
    }

    #[test]
    fn test_foreign_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foreign.bin");
        std::fs::write(&path, b"\x07not a spill at all").unwrap();
        assert!(matches!(read(&path), Err(IoError::InvalidFile(_))));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trunc.bin");

        let img = Image::Mono(MonoImage::new(8, 8));
        write(&path, &img).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(read(&path), Err(IoError::DecodeError(_))));
    }
}
