use serde::{Deserialize, Serialize};
use tracing::error;

use crate::color::Color;
use crate::error::CoreError;

/// A named, ordered ring of color stops.
///
/// Insertion order is significant: coloring algorithms index the ring with
/// `iteration mod size`, so reordering stops changes the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub name: String,
    colors: Vec<Color>,
}

impl ColorPalette {
    pub fn new(name: impl Into<String>, colors: Vec<Color>) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    /// The palette used when a settings file does not supply any.
    pub fn fallback() -> Self {
        Self::new(
            "Default",
            vec![
                Color::rgb(0.0, 0.03, 0.39),
                Color::rgb(0.13, 0.42, 0.8),
                Color::rgb(0.93, 1.0, 1.0),
                Color::rgb(1.0, 0.67, 0.0),
                Color::rgb(0.0, 0.01, 0.0),
            ],
        )
    }

    pub fn add_color(&mut self, color: Color) {
        self.colors.push(color);
    }

    pub fn size(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Checked lookup. An out-of-range index is logged and reported as
    /// [`CoreError::PaletteIndex`].
    pub fn get(&self, index: usize) -> crate::Result<Color> {
        self.colors.get(index).copied().ok_or_else(|| {
            error!(palette = %self.name, index, size = self.size(), "palette index out of range");
            CoreError::PaletteIndex {
                index,
                size: self.size(),
            }
        })
    }

    pub fn get_mut(&mut self, index: usize) -> crate::Result<&mut Color> {
        let size = self.size();
        let name = &self.name;
        match self.colors.get_mut(index) {
            Some(c) => Ok(c),
            None => {
                error!(palette = %name, index, size, "palette index out of range");
                Err(CoreError::PaletteIndex { index, size })
            }
        }
    }

    /// Lookup at `index mod size`. An empty palette yields opaque black.
    #[inline]
    pub fn wrapping(&self, index: usize) -> Color {
        if self.colors.is_empty() {
            return Color::BLACK;
        }
        self.colors[index % self.colors.len()]
    }

    /// Linear interpolation `a·(1 − t) + b·t`. `t` is not clamped.
    #[inline]
    pub fn merge(a: Color, b: Color, t: f32) -> Color {
        a * (1.0 - t) + b * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_palette() -> ColorPalette {
        ColorPalette::new(
            "rgb",
            vec![
                Color::rgb(1.0, 0.0, 0.0),
                Color::rgb(0.0, 1.0, 0.0),
                Color::rgb(0.0, 0.0, 1.0),
            ],
        )
    }

    #[test]
    fn add_color_grows_palette() {
        let mut p = ColorPalette::new("p", Vec::new());
        assert!(p.is_empty());
        p.add_color(Color::WHITE);
        p.add_color(Color::BLACK);
        assert_eq!(p.size(), 2);
        assert_eq!(p.get(1).unwrap(), Color::BLACK);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut p = rgb_palette();
        assert!(matches!(
            p.get(3),
            Err(CoreError::PaletteIndex { index: 3, size: 3 })
        ));
        assert!(p.get_mut(10).is_err());
        *p.get_mut(0).unwrap() = Color::WHITE;
        assert_eq!(p.get(0).unwrap(), Color::WHITE);
    }

    #[test]
    fn wrapping_lookup() {
        let p = rgb_palette();
        assert_eq!(p.wrapping(4), Color::rgb(0.0, 1.0, 0.0));
        assert_eq!(ColorPalette::new("empty", Vec::new()).wrapping(7), Color::BLACK);
    }

    #[test]
    fn merge_boundaries() {
        let a = Color::new(0.2, 0.4, 0.6, 1.0);
        let b = Color::new(0.6, 0.0, 1.0, 0.0);
        assert_eq!(ColorPalette::merge(a, b, 0.0), a);
        assert_eq!(ColorPalette::merge(a, b, 1.0), b);
        let mid = ColorPalette::merge(a, b, 0.5);
        assert!((mid.r - 0.4).abs() < 1e-6);
        assert!((mid.g - 0.2).abs() < 1e-6);
        assert!((mid.b - 0.8).abs() < 1e-6);
        assert!((mid.a - 0.5).abs() < 1e-6);
    }

    #[test]
    fn merge_does_not_clamp() {
        let m = ColorPalette::merge(Color::BLACK, Color::WHITE, 2.0);
        assert!((m.r - 2.0).abs() < 1e-6);
    }
}
