//! FITS writer.
//!
//! The primary HDU stores pixels as 16-bit integers
//! (`s = clip(round(v), 0, 65535) - 32768`, big-endian) under
//! `BZERO = 32768` so unsigned-minded clients see the nominal domain.
//! Every metadata kind in the bag then becomes one binary-table HDU tagged
//! `JSOLEX = <tag>`.

use byteorder::{BigEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use helio_core::{
    CoordOp, Ellipse, Image, MetadataValue, RedshiftArea, SourceInfo, UtcDateTime,
};

use crate::error::IoResult;
use crate::fits::bintable::{BinTable, Field, TForm};
use crate::fits::header::{Card, Header};
use crate::fits::padding_for;
use crate::text::sanitize;

/// Well-known metadata-table keys mirrored into observer header cards.
const STRING_CARDS: [(&str, &str); 3] = [
    ("OBSERVER", "OBSERVER"),
    ("INSTRUME", "INSTRUME"),
    ("CAMERA", "CAMERA"),
];
const NUMERIC_CARDS: [(&str, &str); 4] = [
    ("APTDIA", "APTDIA"),
    ("FOCLEN", "FOCLEN"),
    ("SITELAT", "SITELAT"),
    ("SITELONG", "SITELONG"),
];

/// Optional context the upstream processing supplies for the header.
#[derive(Debug, Clone, Default)]
pub struct FitsWriteOptions {
    /// Base (line-center) wavelength, nanometers.
    pub wavelength_nm: Option<f64>,
    /// Spectral dispersion, nanometers per pixel.
    pub dispersion_nm_per_px: Option<f64>,
    /// Observation timestamp; falls back to the `SourceInfo` metadata,
    /// then to the current time.
    pub date_obs: Option<UtcDateTime>,
}

/// Writes `image` and its metadata bag to a FITS file.
pub fn write<P: AsRef<Path>>(path: P, image: &Image, options: &FitsWriteOptions) -> IoResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    write_primary(&mut writer, image, options)?;

    for (kind, value) in image.metadata().iter() {
        let table = table_for(value);
        table.write_to(&mut writer, kind.fits_tag())?;
    }

    writer.flush()?;
    Ok(())
}

fn write_primary<W: Write>(
    writer: &mut W,
    image: &Image,
    options: &FitsWriteOptions,
) -> IoResult<()> {
    let (w, h) = image.dimensions();
    let planes: Vec<&[f32]> = match image {
        Image::Mono(img) => vec![img.data()],
        Image::Rgb(img) => img.planes().to_vec(),
    };

    let mut header = Header::new();
    header.push(Card::logical("SIMPLE", true).with_comment("standard FITS"));
    header.push(Card::int("BITPIX", 16));
    header.push(Card::int("NAXIS", if planes.len() == 1 { 2 } else { 3 }));
    header.push(Card::int("NAXIS1", w as i64));
    header.push(Card::int("NAXIS2", h as i64));
    if planes.len() == 3 {
        header.push(Card::int("NAXIS3", 3));
    }
    header.push(Card::int("BZERO", 32768).with_comment("unsigned 16-bit offset"));
    header.push(Card::int("BSCALE", 1));
    header.push(Card::string("OBJECT", "Sun"));

    let date_obs = options
        .date_obs
        .or_else(|| image.metadata().source_info().map(|s| s.date_time))
        .unwrap_or_else(UtcDateTime::now);
    header.push(Card::string("DATE-OBS", &date_obs.iso8601()).with_comment("UTC"));
    header.push(Card::string("CREATOR", "JSol'Ex"));

    if let Some(base_nm) = options.wavelength_nm {
        let adjusted = match (
            image.metadata().pixel_shift(),
            options.dispersion_nm_per_px,
        ) {
            (Some(shift), Some(dispersion)) => base_nm + shift * dispersion,
            _ => base_nm,
        };
        header.push(Card::real("WAVELNTH", adjusted).with_comment("nm"));
    }

    if let Some(table) = image.metadata().table() {
        for (key, card) in STRING_CARDS {
            if let Some(v) = table.get(key) {
                header.push(Card::string(card, &sanitize(v)));
            }
        }
        for (key, card) in NUMERIC_CARDS {
            if let Some(v) = table.get(key) {
                match v.parse::<f64>() {
                    Ok(num) => header.push(Card::real(card, num)),
                    Err(_) => header.push(Card::string(card, &sanitize(v))),
                }
            }
        }
    }

    header.write_to(writer)?;

    let mut written = 0usize;
    for plane in planes {
        for &v in plane {
            writer.write_i16::<BigEndian>(quantize(v))?;
            written += 2;
        }
    }
    writer.write_all(&vec![0u8; padding_for(written)])?;
    Ok(())
}

/// Float to stored 16-bit: clip to the nominal domain, round, recenter.
#[inline]
pub(crate) fn quantize(v: f32) -> i16 {
    let clipped = (f64::from(v).round()).clamp(0.0, 65535.0);
    (clipped as i32 - 32768) as i16
}

/// Builds the binary table for one metadata payload.
fn table_for(value: &MetadataValue) -> BinTable {
    match value {
        MetadataValue::PixelShift(v) => {
            let mut t = BinTable::with_columns(vec![("SHIFT".to_string(), TForm::Double)]);
            t.push_row(vec![Field::Double(*v)]);
            t
        }
        MetadataValue::Ellipse(e) => ellipse_table(e),
        MetadataValue::Redshifts(areas) => redshift_table(areas),
        MetadataValue::ActiveRegions(points) | MetadataValue::EllermanBombs(points) => {
            let mut t = BinTable::with_columns(vec![
                ("X".to_string(), TForm::Double),
                ("Y".to_string(), TForm::Double),
            ]);
            for p in points {
                t.push_row(vec![Field::Double(p.x), Field::Double(p.y)]);
            }
            t
        }
        MetadataValue::ReferenceCoords(ops) => {
            let mut t = BinTable::with_columns(vec![
                ("OP".to_string(), TForm::Int32),
                ("VALUE".to_string(), TForm::Double),
            ]);
            for op in ops {
                let (code, operand) = match op {
                    CoordOp::Rotate { angle } => (0, *angle),
                    CoordOp::HFlip { width } => (1, *width),
                    CoordOp::VFlip { height } => (2, *height),
                };
                t.push_row(vec![Field::Int(code), Field::Double(operand)]);
            }
            t
        }
        MetadataValue::TransformationHistory(names) => {
            let clean: Vec<String> = names.iter().map(|n| sanitize(n)).collect();
            let width = clean.iter().map(String::len).max().unwrap_or(0).max(1);
            let mut t =
                BinTable::with_columns(vec![("NAME".to_string(), TForm::Ascii(width))]);
            for name in clean {
                t.push_row(vec![Field::Text(name)]);
            }
            t
        }
        MetadataValue::SourceInfo(info) => source_info_table(info),
        MetadataValue::MetadataTable(map) => {
            let kw = map.keys().map(String::len).max().unwrap_or(0).max(1);
            let vw = map.values().map(String::len).max().unwrap_or(0).max(1);
            let mut t = BinTable::with_columns(vec![
                ("KEY".to_string(), TForm::Ascii(kw)),
                ("VALUE".to_string(), TForm::Ascii(vw)),
            ]);
            for (k, v) in map {
                t.push_row(vec![
                    Field::Text(sanitize(k)),
                    Field::Text(sanitize(v)),
                ]);
            }
            t
        }
        MetadataValue::DistorsionMap(bytes)
        | MetadataValue::ProcessParams(bytes)
        | MetadataValue::SolarParameters(bytes) => {
            // A length column makes the zero-length payload representable
            // despite the padded blob column.
            let mut t = BinTable::with_columns(vec![
                ("LEN".to_string(), TForm::Int32),
                ("DATA".to_string(), TForm::Bytes(bytes.len().max(1))),
            ]);
            t.push_row(vec![
                Field::Int(bytes.len() as i32),
                Field::Blob(if bytes.is_empty() {
                    vec![0]
                } else {
                    bytes.clone()
                }),
            ]);
            t
        }
    }
}

fn ellipse_table(e: &Ellipse) -> BinTable {
    let names = ["A", "B", "C", "D", "E", "F"];
    let columns = names
        .iter()
        .map(|n| (n.to_string(), TForm::Double))
        .collect();
    let mut t = BinTable::with_columns(columns);
    t.push_row(e.coefficients().iter().map(|&v| Field::Double(v)).collect());
    t
}

fn redshift_table(areas: &[RedshiftArea]) -> BinTable {
    let has_ids = areas.iter().any(|a| a.id.is_some());
    let mut columns: Vec<(String, TForm)> = [
        "PIXSHIFT", "RELSHIFT", "KMS", "X1", "Y1", "X2", "Y2", "MAXX", "MAXY",
    ]
    .iter()
    .map(|n| (n.to_string(), TForm::Double))
    .collect();
    if has_ids {
        // The id is a trailing optional column.
        columns.push(("ID".to_string(), TForm::Int32));
    }
    let mut t = BinTable::with_columns(columns);
    for a in areas {
        let mut row = vec![
            Field::Double(a.pixel_shift),
            Field::Double(a.rel_shift),
            Field::Double(a.kms_per_s),
            Field::Double(a.x1),
            Field::Double(a.y1),
            Field::Double(a.x2),
            Field::Double(a.y2),
            Field::Double(a.max_x),
            Field::Double(a.max_y),
        ];
        if has_ids {
            row.push(Field::Int(a.id.unwrap_or(-1)));
        }
        t.push_row(row);
    }
    t
}

fn source_info_table(info: &SourceInfo) -> BinTable {
    let file = sanitize(&info.ser_file_name);
    let dir = sanitize(&info.parent_dir);
    let date = info.date_time.iso8601();
    let mut t = BinTable::with_columns(vec![
        ("FILENAME".to_string(), TForm::Ascii(file.len().max(1))),
        ("DIRECTORY".to_string(), TForm::Ascii(dir.len().max(1))),
        ("DATEOBS".to_string(), TForm::Ascii(date.len().max(1))),
    ]);
    t.push_row(vec![
        Field::Text(file),
        Field::Text(dir),
        Field::Text(date),
    ]);
    t
}
