use crate::bigfloat::BigFloat;
use crate::complex::Complex;

/// A complex number with [`BigFloat`] components, used on the high-precision
/// iteration path and for fractal-space coordinates in the render configuration.
///
/// Also serves as a 2-vector (`re` = x, `im` = y) for viewport corners and sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexBig {
    pub re: BigFloat,
    pub im: BigFloat,
}

impl ComplexBig {
    pub fn new(re: BigFloat, im: BigFloat) -> Self {
        Self { re, im }
    }

    pub fn zero(precision_bits: u32) -> Self {
        Self::new(BigFloat::zero(precision_bits), BigFloat::zero(precision_bits))
    }

    pub fn from_f64(re: f64, im: f64, precision_bits: u32) -> Self {
        Self::new(
            BigFloat::from_f64(re, precision_bits),
            BigFloat::from_f64(im, precision_bits),
        )
    }

    pub fn from_complex(c: Complex, precision_bits: u32) -> Self {
        Self::from_f64(c.re, c.im, precision_bits)
    }

    /// Parse a pair of decimal strings.
    pub fn parse(re: &str, im: &str, precision_bits: u32) -> crate::Result<Self> {
        Ok(Self::new(
            BigFloat::parse(re, precision_bits)?,
            BigFloat::parse(im, precision_bits)?,
        ))
    }

    /// Downcast to machine precision.
    pub fn to_complex(&self) -> Complex {
        Complex::new(self.re.to_f64(), self.im.to_f64())
    }

    pub fn precision_bits(&self) -> u32 {
        self.re.precision_bits().max(self.im.precision_bits())
    }

    pub fn with_precision(&self, precision_bits: u32) -> Self {
        Self::new(
            self.re.with_precision(precision_bits),
            self.im.with_precision(precision_bits),
        )
    }

    pub fn norm_sq(&self) -> BigFloat {
        &(&self.re * &self.re) + &(&self.im * &self.im)
    }

    /// `z²`, computed as `(re² − im²) + 2·re·im·i`.
    pub fn square(&self) -> Self {
        let re = &(&self.re * &self.re) - &(&self.im * &self.im);
        let re_im = &self.re * &self.im;
        let im = &re_im + &re_im;
        Self::new(re, im)
    }

    pub fn add(&self, rhs: &Self) -> Self {
        Self::new(&self.re + &rhs.re, &self.im + &rhs.im)
    }

    pub fn sub(&self, rhs: &Self) -> Self {
        Self::new(&self.re - &rhs.re, &self.im - &rhs.im)
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        Self::new(
            &(&self.re * &rhs.re) - &(&self.im * &rhs.im),
            &(&self.re * &rhs.im) + &(&self.im * &rhs.re),
        )
    }

    /// Complex division; `None` when `rhs` is exactly zero.
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        let denom = rhs.norm_sq();
        let re = &(&self.re * &rhs.re) + &(&self.im * &rhs.im);
        let im = &(&self.im * &rhs.re) - &(&self.re * &rhs.im);
        Some(Self::new(re.checked_div(&denom)?, im.checked_div(&denom)?))
    }

    /// Component-wise product, used to scale a pixel offset by a per-axis step.
    pub fn scale_by(&self, step: &Self) -> Self {
        Self::new(&self.re * &step.re, &self.im * &step.im)
    }

    /// Component-wise quotient; `None` if either divisor component is zero.
    pub fn div_components(&self, divisor: &Self) -> Option<Self> {
        Some(Self::new(
            self.re.checked_div(&divisor.re)?,
            self.im.checked_div(&divisor.im)?,
        ))
    }
}
