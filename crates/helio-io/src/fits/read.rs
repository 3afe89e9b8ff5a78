//! FITS reader.
//!
//! Reads the primary image HDU and every JSOLEX-tagged binary table back
//! into an [`Image`] with a populated metadata bag. Files written by other
//! software still decode (pixels plus the INTI disk synthesis); their
//! untagged extensions are skipped.

use byteorder::{BigEndian, ByteOrder};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::warn;

use helio_core::{
    CoordOp, Ellipse, Image, MetadataBag, MetadataKind, MetadataValue, MonoImage, Point2D,
    RedshiftArea, RgbImage, SourceInfo, UtcDateTime,
};

use crate::error::{IoError, IoResult};
use crate::fits::bintable::BinTable;
use crate::fits::header::Header;
use crate::fits::padding_for;

/// Reads a FITS file into an image with its metadata bag.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<Image> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);

    let primary = Header::read_from(&mut reader)?
        .ok_or_else(|| IoError::InvalidFile("empty FITS file".to_string()))?;

    let bitpix = primary.require_int("BITPIX")?;
    if bitpix != 16 {
        return Err(IoError::UnsupportedBitDepth(format!(
            "BITPIX {bitpix} (only 16-bit images are supported)"
        )));
    }
    let naxis = primary.require_int("NAXIS")?;
    let width = primary.require_int("NAXIS1")? as usize;
    let height = primary.require_int("NAXIS2")? as usize;
    let plane_count = match naxis {
        2 => 1,
        3 => {
            let n3 = primary.require_int("NAXIS3")?;
            if n3 != 3 {
                return Err(IoError::DecodeError(format!(
                    "unsupported NAXIS3 = {n3}, expected 3"
                )));
            }
            3
        }
        other => {
            return Err(IoError::DecodeError(format!(
                "unsupported NAXIS = {other}"
            )));
        }
    };

    let data_len = width * height * plane_count * 2;
    let mut raw = vec![0u8; data_len];
    reader.read_exact(&mut raw)?;
    skip_padding(&mut reader, data_len)?;

    // Collect every tagged binary table before decoding pixels: the BZERO
    // compatibility rule depends on whether the file is ours at all.
    let mut tables: Vec<(MetadataKind, BinTable)> = Vec::new();
    let mut jsolex_origin = false;
    while let Some(ext) = Header::read_from(&mut reader)? {
        let ext_len = (ext.get_int("NAXIS1").unwrap_or(0) * ext.get_int("NAXIS2").unwrap_or(0))
            .max(0) as usize
            + ext.get_int("PCOUNT").unwrap_or(0).max(0) as usize;
        let mut data = vec![0u8; ext_len];
        reader.read_exact(&mut data)?;
        skip_padding(&mut reader, ext_len)?;

        if ext.get_str("XTENSION") != Some("BINTABLE") {
            continue;
        }
        let Some(tag) = ext.get_str("JSOLEX") else {
            continue;
        };
        jsolex_origin = true;
        match MetadataKind::from_fits_tag(tag) {
            Some(kind) => tables.push((kind, BinTable::read_from(&ext, &data)?)),
            None => warn!(tag, "unknown JSOLEX metadata tag, skipping table"),
        }
    }

    let mut bzero = primary.get_real("BZERO").unwrap_or(0.0);
    if jsolex_origin && bzero == 0.0 {
        // Old files of our own origin predate the BZERO card.
        bzero = 32768.0;
    }

    let mut bag = MetadataBag::new();
    for (kind, table) in &tables {
        match value_from_table(*kind, table) {
            Ok(value) => {
                bag.insert(value);
            }
            Err(e) => warn!(kind = kind.fits_tag(), error = %e, "skipping undecodable metadata table"),
        }
    }

    // INTI compatibility: synthesize the disk ellipse from header cards.
    if bag.ellipse().is_none() {
        if let (Some(cx), Some(cy), Some(r)) = (
            primary.get_real("CENTER_X"),
            primary.get_real("CENTER_Y"),
            primary.get_real("SOLAR_R"),
        ) {
            bag.insert(MetadataValue::Ellipse(Ellipse::circle(cx, cy, r)));
        }
    }

    let decode_plane = |index: usize| -> Vec<f32> {
        let offset = index * width * height * 2;
        (0..width * height)
            .map(|i| {
                let s = BigEndian::read_i16(&raw[offset + i * 2..offset + i * 2 + 2]);
                (f64::from(s) + bzero) as f32
            })
            .collect()
    };

    if plane_count == 1 {
        Ok(Image::Mono(
            MonoImage::from_data(width, height, decode_plane(0), bag).map_err(IoError::Core)?,
        ))
    } else {
        Ok(Image::Rgb(
            RgbImage::from_planes(
                width,
                height,
                decode_plane(0),
                decode_plane(1),
                decode_plane(2),
                bag,
            )
            .map_err(IoError::Core)?,
        ))
    }
}

/// Consumes the zero padding after a data unit, tolerating EOF.
fn skip_padding<R: Read>(reader: &mut R, data_len: usize) -> IoResult<()> {
    let pad = padding_for(data_len);
    if pad == 0 {
        return Ok(());
    }
    let mut sink = vec![0u8; pad];
    match reader.read_exact(&mut sink) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Decodes one metadata payload from its table.
fn value_from_table(kind: MetadataKind, table: &BinTable) -> IoResult<MetadataValue> {
    let row = |i: usize| -> IoResult<&Vec<_>> {
        table
            .rows()
            .get(i)
            .ok_or_else(|| IoError::MissingData(format!("{} table row {i}", kind.fits_tag())))
    };

    match kind {
        MetadataKind::PixelShift => Ok(MetadataValue::PixelShift(row(0)?[0].as_f64()?)),
        MetadataKind::Ellipse => {
            let r = row(0)?;
            if r.len() != 6 {
                return Err(IoError::DecodeError(format!(
                    "ellipse table has {} columns, expected 6",
                    r.len()
                )));
            }
            let mut coeffs = [0.0f64; 6];
            for (c, cell) in coeffs.iter_mut().zip(r) {
                *c = cell.as_f64()?;
            }
            Ellipse::from_cartesian(coeffs)
                .map(MetadataValue::Ellipse)
                .map_err(|e| IoError::DecodeError(e.to_string()))
        }
        MetadataKind::Redshifts => {
            let has_ids = table.columns().iter().any(|(name, _)| name == "ID");
            let mut areas = Vec::with_capacity(table.rows().len());
            for r in table.rows() {
                if r.len() < 9 {
                    return Err(IoError::DecodeError(format!(
                        "redshift row has {} columns, expected at least 9",
                        r.len()
                    )));
                }
                let id = if has_ids {
                    match r.last().map(|c| c.as_i32()).transpose()? {
                        Some(-1) | None => None,
                        Some(v) => Some(v),
                    }
                } else {
                    None
                };
                areas.push(RedshiftArea {
                    id,
                    pixel_shift: r[0].as_f64()?,
                    rel_shift: r[1].as_f64()?,
                    kms_per_s: r[2].as_f64()?,
                    x1: r[3].as_f64()?,
                    y1: r[4].as_f64()?,
                    x2: r[5].as_f64()?,
                    y2: r[6].as_f64()?,
                    max_x: r[7].as_f64()?,
                    max_y: r[8].as_f64()?,
                });
            }
            Ok(MetadataValue::Redshifts(areas))
        }
        MetadataKind::ActiveRegions | MetadataKind::EllermanBombs => {
            let mut points = Vec::with_capacity(table.rows().len());
            for r in table.rows() {
                points.push(Point2D::new(r[0].as_f64()?, r[1].as_f64()?));
            }
            Ok(if kind == MetadataKind::ActiveRegions {
                MetadataValue::ActiveRegions(points)
            } else {
                MetadataValue::EllermanBombs(points)
            })
        }
        MetadataKind::ReferenceCoords => {
            let mut ops = Vec::with_capacity(table.rows().len());
            for r in table.rows() {
                let operand = r[1].as_f64()?;
                ops.push(match r[0].as_i32()? {
                    0 => CoordOp::Rotate { angle: operand },
                    1 => CoordOp::HFlip { width: operand },
                    2 => CoordOp::VFlip { height: operand },
                    other => {
                        return Err(IoError::DecodeError(format!(
                            "unknown reference-coords op code: {other}"
                        )));
                    }
                });
            }
            Ok(MetadataValue::ReferenceCoords(ops))
        }
        MetadataKind::TransformationHistory => {
            let mut names = Vec::with_capacity(table.rows().len());
            for r in table.rows() {
                names.push(r[0].as_text()?.to_string());
            }
            Ok(MetadataValue::TransformationHistory(names))
        }
        MetadataKind::SourceInfo => {
            let r = row(0)?;
            let date = UtcDateTime::parse_iso8601(r[2].as_text()?)
                .map_err(|e| IoError::DecodeError(e.to_string()))?;
            Ok(MetadataValue::SourceInfo(SourceInfo {
                ser_file_name: r[0].as_text()?.to_string(),
                parent_dir: r[1].as_text()?.to_string(),
                date_time: date,
            }))
        }
        MetadataKind::MetadataTable => {
            let mut map = BTreeMap::new();
            for r in table.rows() {
                map.insert(r[0].as_text()?.to_string(), r[1].as_text()?.to_string());
            }
            Ok(MetadataValue::MetadataTable(map))
        }
        MetadataKind::DistorsionMap | MetadataKind::ProcessParams | MetadataKind::SolarParameters => {
            let r = row(0)?;
            let len = r[0].as_i32()?.max(0) as usize;
            let blob = r[1].as_blob()?;
            let bytes = blob[..len.min(blob.len())].to_vec();
            Ok(match kind {
                MetadataKind::DistorsionMap => MetadataValue::DistorsionMap(bytes),
                MetadataKind::ProcessParams => MetadataValue::ProcessParams(bytes),
                _ => MetadataValue::SolarParameters(bytes),
            })
        }
    }
}
