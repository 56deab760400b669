//! RGB color used by the classifiers and render batches.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Linear RGB color with components in `[0, 1]`.
///
/// Equality and ordering are total (component-wise `f32::total_cmp`), so colors can key
/// ordered maps when batching draws.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Color(pub [f32; 3]);

impl Color {
    pub const BLACK: Color = Color([0.0, 0.0, 0.0]);
    pub const WHITE: Color = Color([1.0, 1.0, 1.0]);
    /// Fallback for ids missing from a color table.
    pub const NEUTRAL: Color = Color([0.5, 0.5, 0.5]);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self([r, g, b])
    }

    pub fn r(&self) -> f32 {
        self.0[0]
    }

    pub fn g(&self) -> f32 {
        self.0[1]
    }

    pub fn b(&self) -> f32 {
        self.0[2]
    }

    pub fn to_array(self) -> [f32; 3] {
        self.0
    }

    pub fn to_rgba(self, alpha: f32) -> [f32; 4] {
        [self.0[0], self.0[1], self.0[2], alpha]
    }

    /// Parse a `#RRGGBB` (or `RRGGBB`) string.
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .ok()
                .map(|v| f32::from(v) / 255.0)
        };
        Some(Self([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }

    /// Format as `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            byte(self.0[0]),
            byte(self.0[1]),
            byte(self.0[2])
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 3]> for Color {
    fn from(value: [f32; 3]) -> Self {
        Self(value)
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Color {}

impl PartialOrd for Color {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Color {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        let c = Color::from_hex("#FF8000").unwrap();
        assert_eq!(c.r(), 1.0);
        assert!((c.g() - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b(), 0.0);
        assert_eq!(c.to_hex(), "#FF8000");

        assert!(Color::from_hex("#FFF").is_none());
        assert!(Color::from_hex("#GG0000").is_none());
    }

    #[test]
    fn test_lexicographic_ordering() {
        let a = Color::new(0.1, 0.9, 0.9);
        let b = Color::new(0.2, 0.0, 0.0);
        let c = Color::new(0.2, 0.0, 0.5);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b, Color::new(0.2, 0.0, 0.0));
    }
}
