//! Binary-table HDU encoding.
//!
//! A small fixed-layout table engine: each metadata kind serializes to one
//! table whose column set is known at both ends, so the encoder writes
//! `TTYPEn`/`TFORMn` cards and big-endian row data, and the decoder only
//! needs the forms to slice rows back apart.

use byteorder::{BigEndian, ByteOrder};
use std::io::Write;

use crate::error::{IoError, IoResult};
use crate::fits::header::{Card, Header};
use crate::fits::padding_for;

/// Column data form, mirroring the FITS `TFORM` codes used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TForm {
    /// `1D` - one big-endian f64.
    Double,
    /// `1J` - one big-endian i32.
    Int32,
    /// `nA` - fixed-width ASCII, space padded.
    Ascii(usize),
    /// `nB` - fixed-width byte blob, zero padded.
    Bytes(usize),
}

impl TForm {
    fn code(self) -> String {
        match self {
            TForm::Double => "1D".to_string(),
            TForm::Int32 => "1J".to_string(),
            TForm::Ascii(n) => format!("{n}A"),
            TForm::Bytes(n) => format!("{n}B"),
        }
    }

    fn byte_len(self) -> usize {
        match self {
            TForm::Double => 8,
            TForm::Int32 => 4,
            TForm::Ascii(n) | TForm::Bytes(n) => n,
        }
    }

    fn parse(code: &str) -> Option<TForm> {
        let code = code.trim();
        let split = code.find(|c: char| c.is_ascii_alphabetic())?;
        let (count, letter) = code.split_at(split);
        let count: usize = if count.is_empty() { 1 } else { count.parse().ok()? };
        match letter {
            "D" => (count == 1).then_some(TForm::Double),
            "J" => (count == 1).then_some(TForm::Int32),
            "A" => Some(TForm::Ascii(count)),
            "B" => Some(TForm::Bytes(count)),
            _ => None,
        }
    }
}

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Field {
    Double(f64),
    Int(i32),
    Text(String),
    Blob(Vec<u8>),
}

impl Field {
    pub(crate) fn as_f64(&self) -> IoResult<f64> {
        match self {
            Field::Double(v) => Ok(*v),
            Field::Int(v) => Ok(f64::from(*v)),
            _ => Err(IoError::DecodeError("expected a numeric cell".to_string())),
        }
    }

    pub(crate) fn as_i32(&self) -> IoResult<i32> {
        match self {
            Field::Int(v) => Ok(*v),
            _ => Err(IoError::DecodeError("expected an integer cell".to_string())),
        }
    }

    pub(crate) fn as_text(&self) -> IoResult<&str> {
        match self {
            Field::Text(v) => Ok(v),
            _ => Err(IoError::DecodeError("expected a text cell".to_string())),
        }
    }

    pub(crate) fn as_blob(&self) -> IoResult<&[u8]> {
        match self {
            Field::Blob(v) => Ok(v),
            _ => Err(IoError::DecodeError("expected a blob cell".to_string())),
        }
    }
}

/// A decoded or under-construction binary table.
#[derive(Debug, Clone, Default)]
pub(crate) struct BinTable {
    columns: Vec<(String, TForm)>,
    rows: Vec<Vec<Field>>,
}

impl BinTable {
    /// Starts a table with the given column layout.
    pub(crate) fn with_columns(columns: Vec<(String, TForm)>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; the cell count must match the column count.
    pub(crate) fn push_row(&mut self, row: Vec<Field>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub(crate) fn columns(&self) -> &[(String, TForm)] {
        &self.columns
    }

    pub(crate) fn rows(&self) -> &[Vec<Field>] {
        &self.rows
    }

    pub(crate) fn row_bytes(&self) -> usize {
        self.columns.iter().map(|(_, f)| f.byte_len()).sum()
    }

    /// Writes the extension header (with the `JSOLEX` tag card) and the
    /// padded row data.
    pub(crate) fn write_to<W: Write>(&self, writer: &mut W, tag: &str) -> IoResult<()> {
        let row_bytes = self.row_bytes();

        let mut header = Header::new();
        header.push(Card::string("XTENSION", "BINTABLE").with_comment("binary table extension"));
        header.push(Card::int("BITPIX", 8));
        header.push(Card::int("NAXIS", 2));
        header.push(Card::int("NAXIS1", row_bytes as i64));
        header.push(Card::int("NAXIS2", self.rows.len() as i64));
        header.push(Card::int("PCOUNT", 0));
        header.push(Card::int("GCOUNT", 1));
        header.push(Card::int("TFIELDS", self.columns.len() as i64));
        for (i, (name, form)) in self.columns.iter().enumerate() {
            header.push(Card::string(&format!("TTYPE{}", i + 1), name));
            header.push(Card::string(&format!("TFORM{}", i + 1), &form.code()));
        }
        header.push(Card::string("JSOLEX", tag).with_comment("metadata kind"));
        header.write_to(writer)?;

        let mut written = 0usize;
        for row in &self.rows {
            for (field, (_, form)) in row.iter().zip(&self.columns) {
                written += encode_field(writer, field, *form)?;
            }
        }
        writer.write_all(&vec![0u8; padding_for(written)])?;
        Ok(())
    }

    /// Decodes a table from its parsed extension header and raw row data.
    pub(crate) fn read_from(header: &Header, data: &[u8]) -> IoResult<BinTable> {
        let field_count = header.require_int("TFIELDS")? as usize;
        let row_count = header.require_int("NAXIS2")? as usize;

        let mut columns = Vec::with_capacity(field_count);
        for i in 1..=field_count {
            let name = header
                .get_str(&format!("TTYPE{i}"))
                .unwrap_or_default()
                .to_string();
            let code = header
                .get_str(&format!("TFORM{i}"))
                .ok_or_else(|| IoError::MissingData(format!("TFORM{i}")))?;
            let form = TForm::parse(code).ok_or_else(|| {
                IoError::DecodeError(format!("unsupported column form: {code}"))
            })?;
            columns.push((name, form));
        }

        let row_bytes: usize = columns.iter().map(|(_, f)| f.byte_len()).sum();
        if data.len() < row_bytes * row_count {
            return Err(IoError::DecodeError(format!(
                "table data truncated: need {} bytes, have {}",
                row_bytes * row_count,
                data.len()
            )));
        }

        let mut rows = Vec::with_capacity(row_count);
        for r in 0..row_count {
            let mut offset = r * row_bytes;
            let mut row = Vec::with_capacity(field_count);
            for (_, form) in &columns {
                let cell = &data[offset..offset + form.byte_len()];
                row.push(decode_field(cell, *form));
                offset += form.byte_len();
            }
            rows.push(row);
        }
        Ok(BinTable { columns, rows })
    }
}

fn encode_field<W: Write>(writer: &mut W, field: &Field, form: TForm) -> IoResult<usize> {
    match (field, form) {
        (Field::Double(v), TForm::Double) => {
            let mut buf = [0u8; 8];
            BigEndian::write_f64(&mut buf, *v);
            writer.write_all(&buf)?;
            Ok(8)
        }
        (Field::Int(v), TForm::Int32) => {
            let mut buf = [0u8; 4];
            BigEndian::write_i32(&mut buf, *v);
            writer.write_all(&buf)?;
            Ok(4)
        }
        (Field::Text(v), TForm::Ascii(n)) => {
            let mut buf = vec![b' '; n];
            let bytes = v.as_bytes();
            let len = bytes.len().min(n);
            buf[..len].copy_from_slice(&bytes[..len]);
            writer.write_all(&buf)?;
            Ok(n)
        }
        (Field::Blob(v), TForm::Bytes(n)) => {
            let mut buf = vec![0u8; n];
            let len = v.len().min(n);
            buf[..len].copy_from_slice(&v[..len]);
            writer.write_all(&buf)?;
            Ok(n)
        }
        _ => Err(IoError::EncodeError(
            "cell type does not match its column form".to_string(),
        )),
    }
}

fn decode_field(cell: &[u8], form: TForm) -> Field {
    match form {
        TForm::Double => Field::Double(BigEndian::read_f64(cell)),
        TForm::Int32 => Field::Int(BigEndian::read_i32(cell)),
        TForm::Ascii(_) => Field::Text(
            String::from_utf8_lossy(cell).trim_end().to_string(),
        ),
        TForm::Bytes(_) => Field::Blob(cell.to_vec()),
    }
}
