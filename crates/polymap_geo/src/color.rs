//! Stable label colors.
//!
//! Feature categories are colored by hashing their label, so a category keeps
//! its color across re-renders and across processes.

use std::fmt;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

/// Formats as `#rrggbb`.
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Derive a color from a label.
///
/// Rolling hash `hash = unit + (hash << 5) - hash` over the UTF-16 code units
/// of the label in wrapping 32-bit arithmetic; the three low bytes become
/// red, green and blue in that order.
pub fn color_for_label(label: &str) -> Rgb {
    let hash = label.encode_utf16().fold(0i32, |hash, unit| {
        i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    });

    let channel = |i: u32| ((hash >> (8 * i)) & 0xff) as u8;
    Rgb([channel(0), channel(1), channel(2)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_colors() {
        assert_eq!(color_for_label("cafe").to_string(), "#9d792e");
        assert_eq!(color_for_label("bench").to_string(), "#309294");
        assert_eq!(color_for_label("a").to_string(), "#610000");
    }

    #[test]
    fn test_empty_label_is_black() {
        assert_eq!(color_for_label(""), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_negative_hash_and_overflow() {
        // Both hashes end up negative, exercising the arithmetic shift.
        assert_eq!(color_for_label("restaurant").to_string(), "#3d4b5a");
        assert_eq!(
            color_for_label("a very long label that will overflow the hash many times").to_string(),
            "#245f9f"
        );
    }

    #[test]
    fn test_non_ascii_uses_utf16_units() {
        assert_eq!(color_for_label("café").to_string(), "#217a2e");
    }

    #[test]
    fn test_same_label_same_color() {
        assert_eq!(color_for_label("Park A"), color_for_label("Park A"));
        assert_ne!(color_for_label("cafe"), color_for_label("bench"));
    }
}
