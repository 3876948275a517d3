use super::signal::*;

use std::fmt;

/// An integer literal used wherever the graph API accepts a constant.
///
/// This type isn't typically used explicitly, as the graph API takes literal parameters as `Into<Value>` (or `Into<Operand>`), and `Value` implements `From` for Rust's integer types and `bool`. Prefer passing integer values/literals directly.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let a = c.constant(true, 16).unwrap();
/// let b = c.constant(0xdeadbeefu32, 47).unwrap();
/// let d = c.signed_constant(-3, 4).unwrap();
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Value {
    // Sign and magnitude, so every `u128` and every `i128` is represented exactly.
    // Zero is never negative.
    negative: bool,
    magnitude: u128,
}

impl Value {
    /// Returns the numeric value of this literal, or `None` if it's above `i128::MAX`.
    pub fn numeric_value(&self) -> Option<i128> {
        if self.negative {
            Some((self.magnitude as i128).wrapping_neg())
        } else {
            i128::try_from(self.magnitude).ok()
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Absolute value of this literal.
    pub fn magnitude(&self) -> u128 {
        self.magnitude
    }

    /// The low `width` bits of this literal's two's complement representation.
    pub(crate) fn to_bits(&self, width: u32) -> u128 {
        let bits = if self.negative {
            self.magnitude.wrapping_neg()
        } else {
            self.magnitude
        };
        if width >= 128 {
            bits
        } else {
            bits & ((1u128 << width) - 1)
        }
    }

    /// Number of bits needed to hold this value as an unsigned number, or `None` if it's negative.
    pub(crate) fn required_unsigned_bits(&self) -> Option<u32> {
        if self.negative {
            None
        } else {
            Some(128 - self.magnitude.leading_zeros())
        }
    }

    /// Number of bits needed to hold this value as a two's complement number.
    pub(crate) fn required_signed_bits(&self) -> u32 {
        if self.negative {
            129 - (self.magnitude - 1).leading_zeros()
        } else {
            129 - self.magnitude.leading_zeros()
        }
    }

    /// Bit length used when no signal dictates the width of a literal (minimum 1).
    pub(crate) fn natural_bits(&self) -> u32 {
        let bits = match self.required_unsigned_bits() {
            Some(bits) => bits,
            None => self.required_signed_bits(),
        };
        bits.max(1)
    }

    pub(crate) fn fits(&self, width: u32, signed: bool) -> bool {
        if width == 0 {
            return false;
        }
        if signed {
            self.required_signed_bits() <= width
        } else {
            match self.required_unsigned_bits() {
                Some(bits) => bits <= width,
                None => false,
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

macro_rules! operand_from {
    ($($t:ty),*) => {
        $(
            impl<'a> From<$t> for Operand<'a> {
                fn from(value: $t) -> Self {
                    Operand::Literal(value.into())
                }
            }
        )*
    };
}

macro_rules! value_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value {
                        negative: false,
                        magnitude: value as u128,
                    }
                }
            }
        )*
        operand_from!($($t),*);
    };
}

macro_rules! value_from_signed {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    let value = value as i128;
                    Value {
                        negative: value < 0,
                        magnitude: value.unsigned_abs(),
                    }
                }
            }
        )*
        operand_from!($($t),*);
    };
}

value_from_unsigned!(u8, u16, u32, u64, u128, usize, bool);
value_from_signed!(i8, i16, i32, i64, i128, isize);

/// Either an existing [`Signal`] or a literal that will be promoted to a matching constant.
///
/// Every builder that takes an operand accepts `impl Into<Operand>`, so both `&Signal`s and bare integers can be passed.
///
/// [`Signal`]: ./struct.Signal.html
#[derive(Clone, Copy)]
pub enum Operand<'a> {
    Signal(&'a Signal<'a>),
    Literal(Value),
}

impl<'a> Operand<'a> {
    pub(crate) fn as_signal(&self) -> Option<&'a Signal<'a>> {
        match *self {
            Operand::Signal(s) => Some(s),
            Operand::Literal(_) => None,
        }
    }
}

impl<'a> From<&'a Signal<'a>> for Operand<'a> {
    fn from(signal: &'a Signal<'a>) -> Self {
        Operand::Signal(signal)
    }
}

impl<'a> From<Value> for Operand<'a> {
    fn from(value: Value) -> Self {
        Operand::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_bits() {
        assert_eq!(Value::from(0u32).required_unsigned_bits(), Some(0));
        assert_eq!(Value::from(255u32).required_unsigned_bits(), Some(8));
        assert_eq!(Value::from(256u32).required_unsigned_bits(), Some(9));
        assert_eq!(Value::from(-1).required_unsigned_bits(), None);

        assert_eq!(Value::from(0).required_signed_bits(), 1);
        assert_eq!(Value::from(-1).required_signed_bits(), 1);
        assert_eq!(Value::from(127).required_signed_bits(), 8);
        assert_eq!(Value::from(-128).required_signed_bits(), 8);
        assert_eq!(Value::from(128).required_signed_bits(), 9);
    }

    #[test]
    fn natural_bits_has_minimum_of_one() {
        assert_eq!(Value::from(false).natural_bits(), 1);
        assert_eq!(Value::from(5u8).natural_bits(), 3);
        assert_eq!(Value::from(-4).natural_bits(), 3);
    }

    #[test]
    fn full_128_bit_range() {
        let max = Value::from(u128::MAX);
        assert_eq!(max.numeric_value(), None);
        assert_eq!(max.required_unsigned_bits(), Some(128));
        assert!(max.fits(128, false));
        assert!(!max.fits(128, true));
        assert_eq!(max.to_string(), u128::MAX.to_string());

        let top = Value::from(1u128 << 127);
        assert!(!top.is_negative());
        assert!(!top.fits(128, true));
        assert_eq!(top.required_signed_bits(), 129);

        let min = Value::from(i128::MIN);
        assert_eq!(min.numeric_value(), Some(i128::MIN));
        assert_eq!(min.magnitude(), 1u128 << 127);
        assert!(min.fits(128, true));
        assert_ne!(min, top);
    }

    #[test]
    fn signed_and_unsigned_literals_compare_equal() {
        assert_eq!(Value::from(16u32), Value::from(16i64));
        assert_eq!(Value::from(0i8), Value::from(false));
        assert_eq!(Value::from(-3).numeric_value(), Some(-3));
    }

    #[test]
    fn twos_complement_bits() {
        assert_eq!(Value::from(-1).to_bits(8), 0xff);
        assert_eq!(Value::from(-3).to_bits(4), 0xd);
        assert_eq!(Value::from(0x1ffu32).to_bits(8), 0xff);
        assert_eq!(Value::from(i128::MIN).to_bits(128), 1u128 << 127);
    }

    #[test]
    fn fits() {
        assert!(Value::from(0xffu8).fits(8, false));
        assert!(!Value::from(0xffu8).fits(8, true));
        assert!(Value::from(-128).fits(8, true));
        assert!(!Value::from(-1).fits(8, false));
        assert!(!Value::from(0).fits(0, false));
    }
}
