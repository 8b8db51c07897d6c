//! Coercion of loosely-shaped estimator outputs into `Option<f64>`.
//!
//! Tempo backends report confidence as a native scalar, a short series, or a
//! plain float depending on the code path taken. [`to_f64_or_none`] folds all
//! of them into "a float, or cleanly absent" and never fails.

/// Numeric-like value produced by an estimator.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    /// Estimator-native single precision scalar
    Boxed(f32),
    /// Series of values; only the first one is meaningful
    Sequence(Vec<Numeric>),
    /// Plain double precision number
    Float(f64),
    /// Anything that is not numerically convertible
    Opaque,
}

impl From<f32> for Numeric {
    fn from(value: f32) -> Self {
        Numeric::Boxed(value)
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Float(value)
    }
}

impl From<Vec<f64>> for Numeric {
    fn from(values: Vec<f64>) -> Self {
        Numeric::Sequence(values.into_iter().map(Numeric::Float).collect())
    }
}

/// Coerce `value` to a finite float.
///
/// Order of attempts: boxed scalar, first element of a sequence, plain
/// number. Empty sequences, nested sequences, opaque values and non-finite
/// numbers are absent. Zero is a valid result.
pub fn to_f64_or_none(value: &Numeric) -> Option<f64> {
    let coerced = match value {
        Numeric::Boxed(x) => Some(f64::from(*x)),
        Numeric::Sequence(items) => match items.first() {
            Some(Numeric::Boxed(x)) => Some(f64::from(*x)),
            Some(Numeric::Float(x)) => Some(*x),
            Some(_) | None => None,
        },
        Numeric::Float(x) => Some(*x),
        Numeric::Opaque => None,
    };
    coerced.filter(|x| x.is_finite())
}
