//! Coloring algorithms: pure maps from `(final z, iteration count, palette)` to a color.
//!
//! Every algorithm has a machine-precision form and a high-precision form. The
//! high-precision forms truncate `z` to `f64` first; the colorings only need a
//! visually approximate escape magnitude, so nothing is lost that would show.

use crate::color::Color;
use crate::complex::Complex;
use crate::complex_big::ComplexBig;
use crate::palette::ColorPalette;

pub type ColorFnLow = fn(Complex, u64, &ColorPalette) -> Color;
pub type ColorFnHigh = fn(&ComplexBig, u64, &ColorPalette) -> Color;

/// A named coloring algorithm with one entry point per precision tier.
#[derive(Clone, Copy)]
pub struct ColoringAlgorithm {
    pub name: &'static str,
    pub low: ColorFnLow,
    pub high: ColorFnHigh,
}

impl std::fmt::Debug for ColoringAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColoringAlgorithm")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub const LOGARITHMIC_SCALING: &str = "Logarithmic Scaling";
pub const PALETTED_LOGARITHMIC_SCALING: &str = "Paletted Logarithmic Scaling";
pub const STEPPED_GRADIENTS: &str = "Stepped Gradients";
pub const FIXED_ITERATION_PALETTE: &str = "Fixed Iteration Palette";
pub const ROOT_COLORS: &str = "Root Colors";

/// The continuous escape-time algorithms, in menu order.
pub fn smooth_algorithms() -> Vec<ColoringAlgorithm> {
    vec![
        ColoringAlgorithm {
            name: LOGARITHMIC_SCALING,
            low: logarithmic_scaling,
            high: |z, iters, palette| logarithmic_scaling(z.to_complex(), iters, palette),
        },
        ColoringAlgorithm {
            name: PALETTED_LOGARITHMIC_SCALING,
            low: paletted_logarithmic_scaling,
            high: |z, iters, palette| paletted_logarithmic_scaling(z.to_complex(), iters, palette),
        },
        ColoringAlgorithm {
            name: STEPPED_GRADIENTS,
            low: stepped_gradients,
            high: |z, iters, palette| stepped_gradients(z.to_complex(), iters, palette),
        },
        fixed_iteration_palette_algorithm(),
    ]
}

pub fn fixed_iteration_palette_algorithm() -> ColoringAlgorithm {
    ColoringAlgorithm {
        name: FIXED_ITERATION_PALETTE,
        low: fixed_iteration_palette,
        high: |z, iters, palette| fixed_iteration_palette(z.to_complex(), iters, palette),
    }
}

/// Discrete coloring for root-finding fractals, where the "iteration count" is a root index.
pub fn root_colors_algorithm() -> ColoringAlgorithm {
    ColoringAlgorithm {
        name: ROOT_COLORS,
        low: root_colors,
        high: |z, iters, palette| root_colors(z.to_complex(), iters, palette),
    }
}

/// Continuous iteration count `n + 1 − log₂(log₂ |z|²)`.
///
/// Points whose final magnitude is too small for the double logarithm (only
/// possible for interior points) fall back to the raw count.
pub fn smooth_iteration(z: Complex, iters: u64) -> f64 {
    let log_zn = z.norm_sq().log2();
    if log_zn.is_finite() && log_zn > 0.0 {
        iters as f64 + 1.0 - log_zn.log2()
    } else {
        iters as f64
    }
}

pub fn logarithmic_scaling(z: Complex, iters: u64, _palette: &ColorPalette) -> Color {
    let s = smooth_iteration(z, iters) + 3.0;
    let channel = |phase: f64| (0.5 + 0.5 * (3.0 + s * 0.15 + phase).cos()) as f32;
    Color::rgb(channel(0.0), channel(0.6), channel(1.0))
}

pub fn paletted_logarithmic_scaling(z: Complex, iters: u64, palette: &ColorPalette) -> Color {
    let s = smooth_iteration(z, iters) + 4.0;
    let base = s.floor();
    let index = if palette.is_empty() {
        0
    } else {
        (base as i64).rem_euclid(palette.size() as i64) as usize
    };
    let t = s.rem_euclid(1.0) as f32;
    let merged = ColorPalette::merge(palette.wrapping(index), palette.wrapping(index + 1), t);
    Color { a: 1.0, ..merged }
}

pub fn stepped_gradients(_z: Complex, iters: u64, _palette: &ColorPalette) -> Color {
    Color::rgb(
        (iters % 2) as f32 / 2.0,
        (iters % 3) as f32 / 3.0,
        (iters % 7) as f32 / 7.0,
    )
}

pub fn fixed_iteration_palette(_z: Complex, iters: u64, palette: &ColorPalette) -> Color {
    let c = palette.wrapping((iters % palette.size().max(1) as u64) as usize);
    Color { a: 1.0, ..c }
}

pub fn root_colors(_z: Complex, root: u64, _palette: &ColorPalette) -> Color {
    match root {
        0 => Color::rgb(1.0, 0.0, 0.0),
        1 => Color::rgb(0.0, 1.0, 0.0),
        2 => Color::rgb(0.0, 0.0, 1.0),
        _ => Color::WHITE,
    }
}
