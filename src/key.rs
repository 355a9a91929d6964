//! Ordering keys for [`HashTree`](crate::HashTree).
//!
//! A [`Value`] is rendered to a canonical string and hashed with FNV-1a
//! (32-bit). The resulting [`OrderingKey`] places the value in the tree.
//!
//! Canonical forms:
//!
//! | Kind | Canonical string |
//! |------|------------------|
//! | `Text` | the text itself |
//! | `Integer` | base 10, leading `-` for negatives |
//! | `Decimal` | exactly 6 fractional digits (`NaN`, `+Inf`, `-Inf` for non-finite) |
//!
//! Keys are reproducible across runs and across implementations that use
//! the same canonical strings. Different values may share a key; the tree
//! detects that case instead of assuming it away.
//!
//! ```rust
//! use hashtree::key::{Value, derive_key};
//!
//! assert_eq!(derive_key(&Value::from(2)), 923_577_301);
//! assert_eq!(derive_key(&Value::from(1.5)), derive_key(&Value::from("1.500000")));
//! ```

use std::any::Any;
use std::fmt as StdFmt;
use std::hash::{Hash, Hasher};

use crate::error::TreeError;

/// Fixed-width key that orders values in the tree.
pub type OrderingKey = u32;

/// FNV-1a 32-bit offset basis.
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1a 32-bit prime.
const FNV_PRIME: u32 = 0x0100_0193;

/// Fractional digits kept in the canonical form of a decimal.
pub const DECIMAL_PRECISION: usize = 6;

/// FNV-1a over raw bytes.
#[inline]
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = FNV_OFFSET_BASIS;
    let mut i: usize = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

// ============================================================================
//  Value
// ============================================================================

/// A value that can be stored in a [`HashTree`](crate::HashTree).
///
/// `Decimal` values compare by bit pattern: a value always equals itself
/// (`NaN` included) and `0.0` differs from `-0.0`, which also differ in
/// canonical form.
#[derive(Debug, Clone)]
pub enum Value {
    /// UTF-8 text.
    Text(String),
    /// Signed integer.
    Integer(i64),
    /// 64-bit float, keyed by its 6-digit decimal rendering.
    Decimal(f64),
}

impl Value {
    /// Convert a dynamically typed value.
    ///
    /// Accepts `String`, `&'static str`, `char`, `i64`, `i32`, `isize`,
    /// `u32`, `f64`, and `Value` itself.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnsupportedValueKind`] for any other type, `f32`
    /// included.
    ///
    /// ```rust
    /// use hashtree::{TreeError, Value};
    ///
    /// assert_eq!(Value::from_any(&7_i32), Ok(Value::Integer(7)));
    /// assert!(matches!(
    ///     Value::from_any(&1.0_f32),
    ///     Err(TreeError::UnsupportedValueKind { .. })
    /// ));
    /// ```
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_any<T: Any>(value: &T) -> Result<Self, TreeError> {
        let any: &dyn Any = value;

        if let Some(v) = any.downcast_ref::<Self>() {
            return Ok(v.clone());
        }
        if let Some(s) = any.downcast_ref::<String>() {
            return Ok(Self::Text(s.clone()));
        }
        if let Some(s) = any.downcast_ref::<&'static str>() {
            return Ok(Self::Text((*s).to_owned()));
        }
        if let Some(c) = any.downcast_ref::<char>() {
            return Ok(Self::from(*c));
        }
        if let Some(n) = any.downcast_ref::<i64>() {
            return Ok(Self::Integer(*n));
        }
        if let Some(n) = any.downcast_ref::<i32>() {
            return Ok(Self::from(*n));
        }
        if let Some(n) = any.downcast_ref::<u32>() {
            return Ok(Self::from(*n));
        }
        if let Some(n) = any.downcast_ref::<isize>() {
            // isize is at most 64 bits on every supported target.
            return Ok(Self::Integer(*n as i64));
        }
        if let Some(x) = any.downcast_ref::<f64>() {
            return Ok(Self::Decimal(*x));
        }

        Err(TreeError::UnsupportedValueKind {
            type_name: std::any::type_name::<T>(),
        })
    }

    /// The string that gets hashed into this value's ordering key.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// This value's ordering key. Shorthand for [`derive_key`].
    #[inline]
    #[must_use]
    pub fn ordering_key(&self) -> OrderingKey {
        derive_key(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Text(s) => s.hash(state),
            Self::Integer(n) => n.hash(state),
            Self::Decimal(x) => x.to_bits().hash(state),
        }
    }
}

impl StdFmt::Display for Value {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(x) if x.is_nan() => f.write_str("NaN"),
            Self::Decimal(x) if x.is_infinite() => {
                f.write_str(if x.is_sign_positive() { "+Inf" } else { "-Inf" })
            }
            Self::Decimal(x) => write!(f, "{x:.prec$}", prec = DECIMAL_PRECISION),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Self::Text(c.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Decimal(x)
    }
}

// ============================================================================
//  Key derivation
// ============================================================================

/// Derive the ordering key of a value.
#[must_use]
pub fn derive_key(value: &Value) -> OrderingKey {
    match value {
        Value::Text(s) => fnv1a_32(s.as_bytes()),
        other => fnv1a_32(other.to_string().as_bytes()),
    }
}

/// Derive the ordering key of a dynamically typed value.
///
/// # Errors
///
/// [`TreeError::UnsupportedValueKind`] when `value` is not one of the types
/// accepted by [`Value::from_any`].
pub fn derive_key_any<T: Any>(value: &T) -> Result<OrderingKey, TreeError> {
    Value::from_any(value).map(|v: Value| derive_key(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    //  FNV-1a
    // ========================================================================

    #[test]
    fn test_fnv1a_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_integer_keys_match_known_hashes() {
        assert_eq!(derive_key(&Value::from(1)), 873_244_444);
        assert_eq!(derive_key(&Value::from(2)), 923_577_301);
        assert_eq!(derive_key(&Value::from(8)), 1_024_243_015);
        assert_eq!(derive_key(&Value::from(9)), 1_007_465_396);
        assert_eq!(derive_key(&Value::from(-1)), 348_981_803);
    }

    // ========================================================================
    //  Canonical forms
    // ========================================================================

    #[test]
    fn test_decimal_canonical_six_digits() {
        assert_eq!(Value::from(1.5).canonical(), "1.500000");
        assert_eq!(Value::from(-0.25).canonical(), "-0.250000");
        assert_eq!(Value::from(2.0).canonical(), "2.000000");
        assert_eq!(derive_key(&Value::from(1.5)), 334_493_723);
    }

    #[test]
    fn test_decimal_non_finite_canonical() {
        assert_eq!(Value::from(f64::NAN).canonical(), "NaN");
        assert_eq!(Value::from(f64::INFINITY).canonical(), "+Inf");
        assert_eq!(Value::from(f64::NEG_INFINITY).canonical(), "-Inf");
    }

    #[test]
    fn test_decimals_equal_to_six_places_share_key() {
        let a = Value::from(1.000_000_1);
        let b = Value::from(1.000_000_2);

        assert_ne!(a, b);
        assert_eq!(derive_key(&a), derive_key(&b));
    }

    #[test]
    fn test_integer_and_text_share_key_but_differ() {
        let n = Value::from(42);
        let s = Value::from("42");

        assert_ne!(n, s);
        assert_eq!(derive_key(&n), derive_key(&s));
    }

    #[test]
    fn test_nan_equals_itself() {
        let nan = Value::from(f64::NAN);

        assert_eq!(nan, nan.clone());
        assert_ne!(Value::from(0.0), Value::from(-0.0));
    }

    // ========================================================================
    //  Dynamic conversion
    // ========================================================================

    #[test]
    fn test_from_any_supported() {
        assert_eq!(Value::from_any(&"x"), Ok(Value::from("x")));
        assert_eq!(Value::from_any(&String::from("y")), Ok(Value::from("y")));
        assert_eq!(Value::from_any(&3_i64), Ok(Value::Integer(3)));
        assert_eq!(Value::from_any(&-3_isize), Ok(Value::Integer(-3)));
        assert_eq!(Value::from_any(&2.5_f64), Ok(Value::Decimal(2.5)));
        assert_eq!(Value::from_any(&Value::from(1)), Ok(Value::Integer(1)));
    }

    #[test]
    fn test_from_any_unsupported() {
        let err = Value::from_any(&vec![1_u8]).unwrap_err();

        assert!(matches!(err, TreeError::UnsupportedValueKind { .. }));
        assert!(derive_key_any(&1.0_f32).is_err());
        assert!(derive_key_any(&(1, 2)).is_err());
    }

    #[test]
    fn test_derive_key_any_matches_typed() {
        assert_eq!(derive_key_any(&2_i32), Ok(derive_key(&Value::from(2))));
    }
}
