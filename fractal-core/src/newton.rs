use crate::bigfloat::BigFloat;
use crate::coloring::{self, ColoringAlgorithm};
use crate::complex::Complex;
use crate::complex_big::ComplexBig;
use crate::config::RenderConfig;
use crate::fractal::{Fractal, Optimisations};

const SQRT_3_OVER_2: f64 = 0.866_025_403_784_438_6;

/// The cube roots of unity, in root-index order.
const ROOTS: [Complex; 3] = [
    Complex { re: 1.0, im: 0.0 },
    Complex {
        re: -0.5,
        im: SQRT_3_OVER_2,
    },
    Complex {
        re: -0.5,
        im: -SQRT_3_OVER_2,
    },
];

/// Per-component distance at which an iterate counts as having reached a root.
const TOLERANCE: f64 = 1e-4;

/// Newton's method on `f(z) = z³ − 1`.
///
/// The "iteration count" reported by [`Fractal::iter_coord_low`] is the index
/// of the root the orbit converged to (0, 1 or 2). Orbits that never get
/// within [`TOLERANCE`] of a root, or that hit a zero derivative, return
/// `(0, 0 + 0i)`. Only discrete coloring algorithms are offered, since the
/// count is a label rather than an escape time.
#[derive(Debug, Clone)]
pub struct Newton {
    config: RenderConfig,
}

impl Newton {
    pub const NAME: &'static str = "Newton's Fractal";

    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    fn root_index_low(z: Complex) -> Option<usize> {
        ROOTS.iter().position(|root| {
            let d = z - *root;
            d.re.abs() < TOLERANCE && d.im.abs() < TOLERANCE
        })
    }
}

impl Default for Newton {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl Fractal for Newton {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supported_optimisations(&self) -> Optimisations {
        // Basin boundaries do not nest, so a uniform border says nothing
        // about the interior.
        Optimisations::NONE
    }

    fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn update_render_config(&mut self, config: &RenderConfig) {
        self.config = config.clone();
    }

    fn iter_coord_low(&self, coord: Complex) -> (u64, Complex) {
        let mut z = coord;
        for _ in 0..self.config.max_iters {
            let z2 = z * z;
            let derivative = z2 * 3.0;
            if derivative.norm_sq() == 0.0 {
                break;
            }
            z -= (z2 * z - Complex::ONE) / derivative;
            if let Some(root) = Self::root_index_low(z) {
                return (root as u64, z);
            }
        }
        (0, Complex::ZERO)
    }

    fn iter_coord_high(&self, coord: &ComplexBig) -> (u64, ComplexBig) {
        let bits = coord.precision_bits();
        let one = ComplexBig::from_f64(1.0, 0.0, bits);
        let three = ComplexBig::from_f64(3.0, 0.0, bits);
        let tolerance = BigFloat::from_f64(TOLERANCE, bits);
        let roots = ROOTS.map(|r| ComplexBig::from_complex(r, bits));

        let mut z = coord.clone();
        for _ in 0..self.config.max_iters {
            let z2 = z.square();
            let f = z2.mul(&z).sub(&one);
            let Some(step) = f.checked_div(&z2.mul(&three)) else {
                break;
            };
            z = z.sub(&step);
            let hit = roots.iter().position(|root| {
                let d = z.sub(root);
                d.re.abs() < tolerance && d.im.abs() < tolerance
            });
            if let Some(root) = hit {
                return (root as u64, z);
            }
        }
        (0, ComplexBig::zero(bits))
    }

    fn coloring_algorithms(&self) -> Vec<ColoringAlgorithm> {
        vec![
            coloring::root_colors_algorithm(),
            coloring::fixed_iteration_palette_algorithm(),
        ]
    }
}
