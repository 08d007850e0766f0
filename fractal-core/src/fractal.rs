use dyn_clone::DynClone;
use tracing::warn;

use crate::bigfloat::BigFloat;
use crate::color::Color;
use crate::coloring::ColoringAlgorithm;
use crate::complex::Complex;
use crate::complex_big::ComplexBig;
use crate::config::RenderConfig;
use crate::error::CoreError;
use crate::julia::Julia;
use crate::mandelbrot::Mandelbrot;
use crate::newton::Newton;
use crate::palette::ColorPalette;

/// Bit set of render shortcuts a variant allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Optimisations(u32);

impl Optimisations {
    pub const NONE: Self = Self(0);
    /// An all-black tile border implies an all-black interior.
    pub const OUTLINE: Self = Self(1);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Optimisations {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// An escape-time fractal with a machine-precision and an arbitrary-precision
/// evaluation path.
///
/// Implementors hold their own copy of the [`RenderConfig`]. Boxed variants
/// are clonable (via [`dyn_clone`]); every render pass works on its own clone.
pub trait Fractal: Send + Sync + DynClone {
    /// Display name, also used as the key in settings files.
    fn name(&self) -> &'static str;

    fn supported_optimisations(&self) -> Optimisations;

    fn config(&self) -> &RenderConfig;

    fn update_render_config(&mut self, config: &RenderConfig);

    /// Iterate from `coord` until the orbit passes the bailout or the
    /// iteration cap. Returns the count and the final value.
    fn iter_coord_low(&self, coord: Complex) -> (u64, Complex);

    /// Same recurrence and bailout test as [`iter_coord_low`](Self::iter_coord_low),
    /// carried out at the precision of `coord`.
    fn iter_coord_high(&self, coord: &ComplexBig) -> (u64, ComplexBig);

    fn color_low(
        &self,
        z: Complex,
        iters: u64,
        palette: &ColorPalette,
        coloring: &ColoringAlgorithm,
    ) -> Color {
        (coloring.low)(z, iters, palette)
    }

    fn color_high(
        &self,
        z: &ComplexBig,
        iters: u64,
        palette: &ColorPalette,
        coloring: &ColoringAlgorithm,
    ) -> Color {
        (coloring.high)(z, iters, palette)
    }

    /// Coloring algorithms that make sense for this variant, in menu order.
    fn coloring_algorithms(&self) -> Vec<ColoringAlgorithm>;

    fn coloring(&self, name: &str) -> crate::Result<ColoringAlgorithm> {
        self.coloring_algorithms()
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CoreError::UnknownColoring(name.to_string()))
    }
}

dyn_clone::clone_trait_object!(Fractal);

/// `z ← z² + c` from `z`, until `|z|² > bail` or `max_iters` steps.
#[inline]
pub(crate) fn escape_time_low(mut z: Complex, c: Complex, max_iters: u64, bail: f64) -> (u64, Complex) {
    let mut iters = 0;
    while z.norm_sq() <= bail && iters < max_iters {
        z = Complex::new(z.re * z.re - z.im * z.im + c.re, 2.0 * z.re * z.im + c.im);
        iters += 1;
    }
    (iters, z)
}

pub(crate) fn escape_time_high(
    mut z: ComplexBig,
    c: &ComplexBig,
    max_iters: u64,
    bail: f64,
) -> (u64, ComplexBig) {
    let bail = BigFloat::from_f64(bail, c.precision_bits());
    let mut iters = 0;
    while z.norm_sq() <= bail && iters < max_iters {
        z = z.square().add(c);
        iters += 1;
    }
    (iters, z)
}

/// Points that end with `|z|² < 4` are taken to be inside the set and drawn black.
#[inline]
pub(crate) fn probably_inside(z: Complex) -> bool {
    z.norm_sq() < 4.0
}

/// The built-in variants, addressable by display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FractalKind {
    Mandelbrot,
    Julia,
    Newton,
}

impl FractalKind {
    pub const ALL: [FractalKind; 3] = [Self::Mandelbrot, Self::Julia, Self::Newton];

    pub fn name(self) -> &'static str {
        match self {
            Self::Mandelbrot => Mandelbrot::NAME,
            Self::Julia => Julia::NAME,
            Self::Newton => Newton::NAME,
        }
    }

    pub fn from_name(name: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| CoreError::UnknownFractal(name.to_string()))
    }

    /// Like [`from_name`](Self::from_name), falling back to Mandelbrot.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|_| {
            warn!(fractal = name, "unknown fractal type, using Mandelbrot");
            Self::Mandelbrot
        })
    }

    pub fn build(self, config: &RenderConfig) -> Box<dyn Fractal> {
        match self {
            Self::Mandelbrot => Box::new(Mandelbrot::new(config.clone())),
            Self::Julia => Box::new(Julia::new(config.clone())),
            Self::Newton => Box::new(Newton::new(config.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimisation_flags() {
        assert!(Optimisations::OUTLINE.contains(Optimisations::OUTLINE));
        assert!(!Optimisations::NONE.contains(Optimisations::OUTLINE));
        assert!(Optimisations::NONE.contains(Optimisations::NONE));
        assert_eq!((Optimisations::NONE | Optimisations::OUTLINE).bits(), 1);
    }

    #[test]
    fn registry_round_trips_names() {
        for kind in FractalKind::ALL {
            assert_eq!(FractalKind::from_name(kind.name()).unwrap(), kind);
            let f = kind.build(&RenderConfig::default());
            assert_eq!(f.name(), kind.name());
        }
    }

    #[test]
    fn unknown_name_falls_back_to_mandelbrot() {
        assert!(matches!(
            FractalKind::from_name("Burning Ship"),
            Err(CoreError::UnknownFractal(_))
        ));
        assert_eq!(FractalKind::from_name_or_default("Burning Ship"), FractalKind::Mandelbrot);
    }

    #[test]
    fn boxed_fractals_clone_independently() {
        let mut a = FractalKind::Julia.build(&RenderConfig::default());
        let b = dyn_clone::clone_box(&*a);
        let cfg = RenderConfig {
            max_iters: 7,
            ..RenderConfig::default()
        };
        a.update_render_config(&cfg);
        assert_eq!(a.config().max_iters, 7);
        assert_eq!(b.config().max_iters, 256);
    }

    #[test]
    fn unknown_coloring_is_an_error() {
        let f = FractalKind::Mandelbrot.build(&RenderConfig::default());
        assert!(f.coloring("Logarithmic Scaling").is_ok());
        assert!(matches!(
            f.coloring("Nope"),
            Err(CoreError::UnknownColoring(_))
        ));
    }
}
