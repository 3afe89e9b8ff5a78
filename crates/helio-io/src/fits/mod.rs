//! FITS persistence.
//!
//! Files are standard FITS: a 16-bit integer primary image HDU
//! (`BITPIX=16`, `BZERO=32768`, `BSCALE=1`) followed by one binary-table
//! HDU per metadata kind present, each tagged with a `JSOLEX = <tag>`
//! header card. Any FITS client reads the image; only the tagged tables
//! round-trip the pipeline's own metadata.
//!
//! On read, a file is recognized as ours by the presence of any `JSOLEX`
//! card; legacy files of that origin written with `BZERO = 0` are decoded
//! as if `BZERO = 32768`. Headers carrying the INTI convention
//! (`CENTER_X`, `CENTER_Y`, `SOLAR_R`) synthesize a circular disk ellipse.

mod bintable;
mod header;
mod read;
mod write;

pub use header::{Card, CardValue, Header};
pub use read::read;
pub use write::{write, FitsWriteOptions};

/// FITS block size; headers and data pad to a multiple of this.
pub(crate) const BLOCK_SIZE: usize = 2880;

/// Bytes needed to pad `len` to a whole block.
pub(crate) fn padding_for(len: usize) -> usize {
    (BLOCK_SIZE - len % BLOCK_SIZE) % BLOCK_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(1), 2879);
        assert_eq!(padding_for(2880), 0);
        assert_eq!(padding_for(2881), 2879);
    }
}
