//! String sanitization for FITS headers and tables.
//!
//! FITS header strings are restricted ASCII. Observer names and site
//! descriptions routinely carry accents, so strings are decomposed (NFKD),
//! combining marks dropped, and whatever still is not printable ASCII is
//! replaced by `_`.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Sanitizes a string for embedding in a FITS file.
///
/// # Example
///
/// ```rust
/// assert_eq!(helio_io::text::sanitize("Observatoire de Mäkelä"), "Observatoire de Makela");
/// assert_eq!(helio_io::text::sanitize("line\u{1}break"), "line_break");
/// ```
pub fn sanitize(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if (' '..='~').contains(&c) { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_untouched() {
        assert_eq!(sanitize("Sun at 656.28nm"), "Sun at 656.28nm");
    }

    #[test]
    fn test_diacritics_stripped() {
        assert_eq!(sanitize("Véronique Ångström"), "Veronique Angstrom");
        assert_eq!(sanitize("čšž"), "csz");
    }

    #[test]
    fn test_non_printables_replaced() {
        assert_eq!(sanitize("a\tb\nc"), "a_b_c");
        assert_eq!(sanitize("日本"), "__");
    }
}
