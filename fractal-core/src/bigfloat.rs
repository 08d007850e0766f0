use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use dashu_base::Abs;
use dashu_float::round::mode::Zero;
use dashu_float::{DBig, FBig};

use crate::error::CoreError;

/// Precision (in bits) at or below which arithmetic runs on plain `f64`.
///
/// The renderer uses the same threshold to pick its iteration path, so a
/// configuration never mixes backends within one render.
pub const LOW_PRECISION_BITS: u32 = 64;

/// A real number whose backend is chosen by the requested precision.
///
/// `precision_bits <= 64` stores an `f64`; anything wider stores a binary
/// `FBig` rounded to exactly that many bits. Mixed operations promote to the
/// wider operand.
#[derive(Clone, Debug)]
pub struct BigFloat {
    value: Backend,
    precision_bits: u32,
}

#[derive(Clone, Debug)]
enum Backend {
    Machine(f64),
    Arbitrary(FBig),
}

fn fbig_from_f64(val: f64, precision_bits: u32) -> FBig {
    // Non-finite values have no FBig representation; they collapse to zero.
    let base: FBig = if val == 0.0 {
        FBig::ZERO
    } else {
        FBig::try_from(val).unwrap_or(FBig::ZERO)
    };
    base.with_precision(precision_bits as usize).value()
}

impl BigFloat {
    pub fn from_f64(val: f64, precision_bits: u32) -> Self {
        let value = if precision_bits <= LOW_PRECISION_BITS {
            Backend::Machine(val)
        } else {
            Backend::Arbitrary(fbig_from_f64(val, precision_bits))
        };
        Self {
            value,
            precision_bits,
        }
    }

    pub fn zero(precision_bits: u32) -> Self {
        Self::from_f64(0.0, precision_bits)
    }

    /// Parse a decimal string (e.g. `"-0.743643887037158704752191506114774"`).
    ///
    /// Wide precisions convert decimal → binary in one rounding step, so
    /// coordinates beyond `f64` range or resolution survive intact.
    pub fn parse(text: &str, precision_bits: u32) -> crate::Result<Self> {
        let text = text.trim();
        let parse_err = |reason: String| CoreError::ParseNumber {
            value: text.to_string(),
            reason,
        };

        if precision_bits <= LOW_PRECISION_BITS {
            let val = text
                .parse::<f64>()
                .map_err(|e| parse_err(e.to_string()))?;
            if !val.is_finite() {
                return Err(parse_err("value is not finite".to_string()));
            }
            return Ok(Self::from_f64(val, precision_bits));
        }

        let decimal = text
            .parse::<DBig>()
            .map_err(|e| parse_err(e.to_string()))?;
        let binary = decimal
            .with_base_and_precision::<2>(precision_bits as usize)
            .value()
            .with_rounding::<Zero>();
        Ok(Self {
            value: Backend::Arbitrary(binary),
            precision_bits,
        })
    }

    #[inline]
    pub fn precision_bits(&self) -> u32 {
        self.precision_bits
    }

    /// `true` when this value is backed by arbitrary-precision arithmetic.
    pub fn is_arbitrary(&self) -> bool {
        matches!(self.value, Backend::Arbitrary(_))
    }

    /// Re-round to a new precision, switching backend if the threshold is crossed.
    pub fn with_precision(&self, precision_bits: u32) -> Self {
        if precision_bits <= LOW_PRECISION_BITS {
            return Self::from_f64(self.to_f64(), precision_bits);
        }
        let big = self.to_fbig().with_precision(precision_bits as usize).value();
        Self {
            value: Backend::Arbitrary(big),
            precision_bits,
        }
    }

    /// Nearest `f64`. Lossy for values that need more than 53 bits.
    pub fn to_f64(&self) -> f64 {
        match &self.value {
            Backend::Machine(v) => *v,
            Backend::Arbitrary(v) => v.to_f64().value(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match &self.value {
            Backend::Machine(v) => *v == 0.0,
            Backend::Arbitrary(v) => *v == FBig::<Zero>::ZERO,
        }
    }

    pub fn abs(&self) -> Self {
        let value = match &self.value {
            Backend::Machine(v) => Backend::Machine(v.abs()),
            Backend::Arbitrary(v) => Backend::Arbitrary(v.clone().abs()),
        };
        Self {
            value,
            precision_bits: self.precision_bits,
        }
    }

    /// Division that refuses a zero divisor instead of panicking.
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        Some(self.binary(rhs, |a, b| a / b, |a, b| a / b))
    }

    /// Decimal rendering, suitable for writing back to a settings file.
    ///
    /// Wide values carry enough digits that [`BigFloat::parse`] at the same
    /// precision gives back the identical binary value.
    pub fn to_decimal_string(&self) -> String {
        match &self.value {
            Backend::Machine(v) => v.to_string(),
            Backend::Arbitrary(v) => {
                let digits =
                    (self.precision_bits as f64 * std::f64::consts::LOG10_2).ceil() as usize + 2;
                v.clone()
                    .with_base_and_precision::<10>(digits)
                    .value()
                    .to_string()
            }
        }
    }

    fn to_fbig(&self) -> FBig {
        match &self.value {
            Backend::Machine(v) => fbig_from_f64(*v, self.precision_bits.max(LOW_PRECISION_BITS)),
            Backend::Arbitrary(v) => v.clone(),
        }
    }

    fn binary(
        &self,
        rhs: &Self,
        machine: impl Fn(f64, f64) -> f64,
        arbitrary: impl Fn(&FBig, &FBig) -> FBig,
    ) -> Self {
        let precision_bits = self.precision_bits.max(rhs.precision_bits);
        let value = match (&self.value, &rhs.value) {
            (Backend::Machine(a), Backend::Machine(b)) if precision_bits <= LOW_PRECISION_BITS => {
                Backend::Machine(machine(*a, *b))
            }
            (Backend::Arbitrary(a), Backend::Arbitrary(b)) => Backend::Arbitrary(arbitrary(a, b)),
            _ => Backend::Arbitrary(arbitrary(&self.to_fbig(), &rhs.to_fbig())),
        };
        Self {
            value,
            precision_bits,
        }
    }
}

impl Add for &BigFloat {
    type Output = BigFloat;

    fn add(self, rhs: Self) -> BigFloat {
        self.binary(rhs, |a, b| a + b, |a, b| a + b)
    }
}

impl Sub for &BigFloat {
    type Output = BigFloat;

    fn sub(self, rhs: Self) -> BigFloat {
        self.binary(rhs, |a, b| a - b, |a, b| a - b)
    }
}

impl Mul for &BigFloat {
    type Output = BigFloat;

    fn mul(self, rhs: Self) -> BigFloat {
        self.binary(rhs, |a, b| a * b, |a, b| a * b)
    }
}

impl Neg for &BigFloat {
    type Output = BigFloat;

    fn neg(self) -> BigFloat {
        let value = match &self.value {
            Backend::Machine(v) => Backend::Machine(-v),
            Backend::Arbitrary(v) => Backend::Arbitrary(-v.clone()),
        };
        BigFloat {
            value,
            precision_bits: self.precision_bits,
        }
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (Backend::Machine(a), Backend::Machine(b)) => a == b,
            _ => self.to_fbig() == other.to_fbig(),
        }
    }
}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.value, &other.value) {
            (Backend::Machine(a), Backend::Machine(b)) => a.partial_cmp(b),
            _ => self.to_fbig().partial_cmp(&other.to_fbig()),
        }
    }
}

impl fmt::Display for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}
