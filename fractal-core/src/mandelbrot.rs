use crate::color::Color;
use crate::coloring::{self, ColoringAlgorithm};
use crate::complex::Complex;
use crate::complex_big::ComplexBig;
use crate::config::RenderConfig;
use crate::fractal::{escape_time_high, escape_time_low, probably_inside, Fractal, Optimisations};
use crate::palette::ColorPalette;

/// The Mandelbrot set: `z_{n+1} = z_n² + c`, starting from `z₀ = 0`.
///
/// The point `c` is the coordinate on the complex plane.
#[derive(Debug, Clone)]
pub struct Mandelbrot {
    config: RenderConfig,
}

impl Mandelbrot {
    pub const NAME: &'static str = "Mandelbrot";

    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

impl Default for Mandelbrot {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl Fractal for Mandelbrot {
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

    fn iter_coord_low(&self, c: Complex) -> (u64, Complex) {
        escape_time_low(Complex::ZERO, c, self.config.max_iters, self.config.bail)
    }

    fn iter_coord_high(&self, c: &ComplexBig) -> (u64, ComplexBig) {
        let z0 = ComplexBig::zero(c.precision_bits());
        escape_time_high(z0, c, self.config.max_iters, self.config.bail)
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

    fn mb() -> Mandelbrot {
        Mandelbrot::new(RenderConfig {
            max_iters: 100,
            ..RenderConfig::default()
        })
    }

    #[test]
    fn origin_reaches_max_iters() {
        let (iters, z) = mb().iter_coord_low(Complex::ZERO);
        assert_eq!(iters, 100);
        assert_eq!(z, Complex::ZERO);
    }

    #[test]
    fn three_escapes_immediately() {
        // z₁ = 3, |z₁|² = 9 > 4.
        let (iters, z) = mb().iter_coord_low(Complex::new(3.0, 0.0));
        assert!(iters <= 2);
        assert_eq!(iters, 1);
        assert_eq!(z, Complex::new(3.0, 0.0));
    }

    #[test]
    fn known_escape_count() {
        // c = 1: z = 1, 2, 5. |2|² = 4 is not > 4, so the third step escapes.
        let (iters, z) = mb().iter_coord_low(Complex::new(1.0, 0.0));
        assert_eq!(iters, 3);
        assert_eq!(z, Complex::new(5.0, 0.0));
    }

    #[test]
    fn minus_one_is_periodic_interior() {
        let (iters, _) = mb().iter_coord_low(Complex::new(-1.0, 0.0));
        assert_eq!(iters, 100);
    }

    #[test]
    fn deterministic_results() {
        let m = mb();
        let points = [
            Complex::new(0.0, 0.0),
            Complex::new(-0.75, 0.1),
            Complex::new(0.3, 0.5),
            Complex::new(-2.0, 0.0),
            Complex::new(1.0, 1.0),
        ];
        let run1: Vec<_> = points.iter().map(|&c| m.iter_coord_low(c)).collect();
        let run2: Vec<_> = points.iter().map(|&c| m.iter_coord_low(c)).collect();
        assert_eq!(run1, run2, "iteration results must be deterministic");
    }

    #[test]
    fn high_precision_matches_low_precision_counts() {
        let m = mb();
        for c in [
            Complex::new(0.0, 0.0),
            Complex::new(0.5, 0.5),
            Complex::new(-1.5, 0.25),
            Complex::new(1.0, 0.0),
            Complex::new(3.0, 0.0),
        ] {
            let (low, _) = m.iter_coord_low(c);
            let (high, _) = m.iter_coord_high(&ComplexBig::from_complex(c, 128));
            assert_eq!(low, high, "iteration count differs at {c}");
        }
    }

    #[test]
    fn interior_points_are_black() {
        let m = mb();
        let algo = coloring::smooth_algorithms()[2];
        let palette = ColorPalette::fallback();
        let (iters, z) = m.iter_coord_low(Complex::ZERO);
        assert_eq!(m.color_low(z, iters, &palette, &algo), Color::BLACK);
        let (iters, z) = m.iter_coord_low(Complex::new(3.0, 0.0));
        assert!(!m.color_low(z, iters, &palette, &algo).is_black());
    }

    #[test]
    fn respects_bailout_from_config() {
        let m = Mandelbrot::new(RenderConfig {
            bail: 100.0,
            ..RenderConfig::default()
        });
        // c = 3: z = 3 (9), 12 (144 > 100).
        assert_eq!(m.iter_coord_low(Complex::new(3.0, 0.0)).0, 2);
    }
}
