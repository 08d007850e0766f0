use crate::color::Color;
use crate::coloring::{self, ColoringAlgorithm};
use crate::complex::Complex;
use crate::complex_big::ComplexBig;
use crate::config::RenderConfig;
use crate::fractal::{escape_time_high, escape_time_low, probably_inside, Fractal, Optimisations};
use crate::palette::ColorPalette;

/// A Julia set: `z_{n+1} = z_n² + c`, where `c` is a fixed constant
/// and `z₀` is the point on the complex plane.
#[derive(Debug, Clone)]
pub struct Julia {
    config: RenderConfig,
}

impl Julia {
    pub const NAME: &'static str = "Julia Set";

    /// The constant `c` defining this Julia set.
    pub const C: Complex = Complex {
        re: -0.8,
        im: 0.156,
    };

    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

impl Default for Julia {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl Fractal for Julia {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supported_optimisations(&self) -> Optimisations {
        Optimisations::OUTLINE
    }

    fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn update_render_config(&mut self, config: &RenderConfig) {
        self.config = config.clone();
    }

    fn iter_coord_low(&self, z: Complex) -> (u64, Complex) {
        escape_time_low(z, Self::C, self.config.max_iters, self.config.bail)
    }

    fn iter_coord_high(&self, z: &ComplexBig) -> (u64, ComplexBig) {
        let c = ComplexBig::from_complex(Self::C, z.precision_bits());
        escape_time_high(z.clone(), &c, self.config.max_iters, self.config.bail)
    }

    fn color_low(
        &self,
        z: Complex,
        iters: u64,
        palette: &ColorPalette,
        coloring: &ColoringAlgorithm,
    ) -> Color {
        if probably_inside(z) {
            return Color::BLACK;
        }
        (coloring.low)(z, iters, palette)
    }

    fn color_high(
        &self,
        z: &ComplexBig,
        iters: u64,
        palette: &ColorPalette,
        coloring: &ColoringAlgorithm,
    ) -> Color {
        if probably_inside(z.to_complex()) {
            return Color::BLACK;
        }
        (coloring.high)(z, iters, palette)
    }

    fn coloring_algorithms(&self) -> Vec<ColoringAlgorithm> {
        coloring::smooth_algorithms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn julia() -> Julia {
        Julia::new(RenderConfig {
            max_iters: 200,
            ..RenderConfig::default()
        })
    }

    #[test]
    fn far_point_escapes_without_iterating() {
        // |z₀|² = 100 is already past the bailout.
        let (iters, z) = julia().iter_coord_low(Complex::new(10.0, 0.0));
        assert_eq!(iters, 0);
        assert_eq!(z, Complex::new(10.0, 0.0));
    }

    #[test]
    fn first_step_adds_the_constant() {
        let j = Julia::new(RenderConfig {
            max_iters: 1,
            ..RenderConfig::default()
        });
        let (iters, z) = j.iter_coord_low(Complex::ZERO);
        assert_eq!(iters, 1);
        assert_eq!(z, Julia::C);
    }

    #[test]
    fn critical_orbit_lingers() {
        // The orbit of 0 stays bounded for roughly 250 steps before escaping.
        let (iters, _) = julia().iter_coord_low(Complex::ZERO);
        assert_eq!(iters, 200);
    }

    #[test]
    fn symmetric_under_negation() {
        let j = julia();
        for z in [Complex::new(0.4, 0.3), Complex::new(-1.1, 0.2), Complex::new(1.5, -0.9)] {
            assert_eq!(j.iter_coord_low(z).0, j.iter_coord_low(Complex::new(-z.re, -z.im)).0);
        }
    }

    #[test]
    fn high_precision_matches_low_precision_counts() {
        let j = julia();
        for z in [Complex::new(1.0, 1.0), Complex::new(1.5, -0.9), Complex::new(10.0, 0.0)] {
            let (low, _) = j.iter_coord_low(z);
            let (high, _) = j.iter_coord_high(&ComplexBig::from_complex(z, 160));
            assert_eq!(low, high, "iteration count differs at {z}");
        }
    }

    #[test]
    fn lingering_orbit_is_black() {
        let j = julia();
        let algo = coloring::smooth_algorithms()[0];
        let palette = ColorPalette::fallback();
        let (iters, z) = j.iter_coord_low(Complex::ZERO);
        assert_eq!(j.color_low(z, iters, &palette, &algo), Color::BLACK);
    }
}
