//! NaN-boxed value representation.
//!
//! Every runtime value fits in one 64-bit word. Doubles are stored as their raw
//! IEEE 754 bits; everything else lives inside the quiet-NaN space.
//!
//! # Value Encoding (64 bits)
//!
//! - **Number**: any bit pattern where `bits & QNAN != QNAN`
//! - **True / False / Null / Undefined**: `QNAN | tag` with tags 0, 1, 2 and 5
//! - **Object**: `SIGN_BIT | QNAN | handle`, the low 32 bits hold the heap handle
//!
//! Equality is raw bit comparison. That makes interned strings and singletons
//! compare by identity, but it also means a NaN produced by arithmetic compares
//! by its bit pattern, and a NaN whose payload lands inside the tag space reads
//! back as a tagged value.

use std::fmt;

use super::heap::ObjRef;

pub(crate) const QNAN: u64 = 0x7ffc_0000_0000_0000;
pub(crate) const SIGN_BIT: u64 = 0x8000_0000_0000_0000;

const TAG_TRUE: u64 = 0;
const TAG_FALSE: u64 = 1;
const TAG_NULL: u64 = 2;
const TAG_UNDEFINED: u64 = 5;

const OBJECT_MASK: u64 = SIGN_BIT | QNAN;
const HANDLE_MASK: u64 = 0xffff_ffff;

/// Coarse classification of a value, mostly for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Number,
    True,
    False,
    Null,
    Undefined,
    Object,
}

#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Value(u64);

impl Value {
    pub const TRUE: Value = Value(QNAN | TAG_TRUE);
    pub const FALSE: Value = Value(QNAN | TAG_FALSE);
    pub const NULL: Value = Value(QNAN | TAG_NULL);
    /// Marks a global slot that has been named but never assigned.
    pub const UNDEFINED: Value = Value(QNAN | TAG_UNDEFINED);

    /// Box a double. The bits are stored untouched.
    #[inline]
    pub fn number(n: f64) -> Self {
        Self(n.to_bits())
    }

    #[inline]
    pub fn boolean(b: bool) -> Self {
        if b {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    #[inline]
    pub fn object(handle: ObjRef) -> Self {
        Self(OBJECT_MASK | handle.index() as u64)
    }

    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub fn to_bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_number(self) -> bool {
        self.0 & QNAN != QNAN
    }

    #[inline]
    pub fn is_bool(self) -> bool {
        self == Self::TRUE || self == Self::FALSE
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    pub fn is_undefined(self) -> bool {
        self == Self::UNDEFINED
    }

    #[inline]
    pub fn is_object(self) -> bool {
        self.0 & OBJECT_MASK == OBJECT_MASK
    }

    /// Unbox a number. The caller must have checked `is_number` first.
    #[inline]
    pub fn as_number(self) -> f64 {
        debug_assert!(self.is_number(), "value is not a number: {:?}", self);
        f64::from_bits(self.0)
    }

    /// Unbox an object handle. The caller must have checked `is_object` first.
    #[inline]
    pub fn as_object(self) -> ObjRef {
        debug_assert!(self.is_object(), "value is not an object: {:?}", self);
        ObjRef::new((self.0 & HANDLE_MASK) as u32)
    }

    #[inline]
    pub fn try_number(self) -> Option<f64> {
        if self.is_number() {
            Some(self.as_number())
        } else {
            None
        }
    }

    #[inline]
    pub fn try_object(self) -> Option<ObjRef> {
        if self.is_object() {
            Some(self.as_object())
        } else {
            None
        }
    }

    /// False, null and 0 are falsy; everything else is truthy.
    #[inline]
    pub fn is_truthy(self) -> bool {
        !(self == Self::FALSE || self == Self::NULL || (self.is_number() && self.as_number() == 0.0))
    }

    pub fn value_type(self) -> ValueType {
        if self.is_number() {
            ValueType::Number
        } else if self.is_object() {
            ValueType::Object
        } else {
            match self.0 & !QNAN {
                TAG_TRUE => ValueType::True,
                TAG_FALSE => ValueType::False,
                TAG_NULL => ValueType::Null,
                _ => ValueType::Undefined,
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::NULL
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::boolean(b)
    }
}

impl From<ObjRef> for Value {
    fn from(handle: ObjRef) -> Self {
        Self::object(handle)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value_type() {
            ValueType::Number => write!(f, "Number({})", self.as_number()),
            ValueType::True => write!(f, "True"),
            ValueType::False => write!(f, "False"),
            ValueType::Null => write!(f, "Null"),
            ValueType::Undefined => write!(f, "Undefined"),
            ValueType::Object => write!(f, "Object({})", self.as_object().index()),
        }
    }
}

/// Format a number the way C's `%g` does: six significant digits, trailing
/// zeros stripped, exponent form for very large or very small magnitudes.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    const PRECISION: i32 = 6;
    // Rounding to the precision first decides which notation %g picks.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= PRECISION {
        let mantissa = strip_trailing_zeros(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
