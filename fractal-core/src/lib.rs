pub mod bigfloat;
pub mod color;
pub mod coloring;
pub mod complex;
pub mod complex_big;
pub mod config;
pub mod error;
pub mod fractal;
pub mod julia;
pub mod mandelbrot;
pub mod newton;
pub mod palette;

// Re-export primary types for convenience.
pub use bigfloat::{BigFloat, LOW_PRECISION_BITS};
pub use color::Color;
pub use coloring::ColoringAlgorithm;
pub use complex::Complex;
pub use complex_big::ComplexBig;
pub use config::{PixelSize, RenderConfig, Settings};
pub use error::CoreError;
pub use fractal::{Fractal, FractalKind, Optimisations};
pub use julia::Julia;
pub use mandelbrot::Mandelbrot;
pub use newton::Newton;
pub use palette::ColorPalette;

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
