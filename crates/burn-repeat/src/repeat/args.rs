use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};

use crate::{NdArray, Operand, RepeatError};

/// A numeric argument, either integral or floating point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// An integer value. Wide enough for every primitive integer up to 64 bits.
    Int(i128),
    /// A floating point value.
    Float(f64),
}

impl Number {
    /// Converts the number to a repeat count, truncating toward zero.
    ///
    /// The result may be negative; callers decide whether that is an error.
    pub fn to_count(self) -> Result<i64, RepeatError> {
        match self {
            Number::Int(value) => i64::try_from(value).map_err(|_| {
                RepeatError::InvalidValue(format!("repeat count {value} is out of range"))
            }),
            Number::Float(value) if value.is_finite() => Ok(value as i64),
            Number::Float(value) => Err(RepeatError::InvalidValue(format!(
                "cannot convert {value} to a repeat count"
            ))),
        }
    }
}

macro_rules! number_from {
    ($variant:ident, $($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Number::$variant(value as _)
                }
            }
        )*
    };
}

number_from!(Int, i8, i16, i32, i64, u8, u16, u32, usize, isize);
number_from!(Float, f32, f64);

/// The array argument of [`repeat`](crate::repeat()).
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayArg<E> {
    /// No array. Repeating it yields default elements.
    None,
    /// A bare scalar, treated as a 0-d array of size one.
    Scalar(E),
    /// An N-dimensional array.
    Array(NdArray<E>),
}

impl<E> ArrayArg<E> {
    /// Shape-level view of the argument.
    pub fn operand(&self) -> Operand<'_> {
        match self {
            ArrayArg::None => Operand::Null,
            ArrayArg::Scalar(_) => Operand::Scalar,
            ArrayArg::Array(array) => array.operand(),
        }
    }
}

impl<E> From<NdArray<E>> for ArrayArg<E> {
    fn from(array: NdArray<E>) -> Self {
        ArrayArg::Array(array)
    }
}

impl<E> From<Vec<E>> for ArrayArg<E> {
    fn from(values: Vec<E>) -> Self {
        ArrayArg::Array(NdArray::from_vec(values))
    }
}

/// The `repeats` argument of [`repeat`](crate::repeat()).
#[derive(Clone, Debug, PartialEq)]
pub enum RepeatsArg {
    /// No repeat counts were supplied. Always a type error.
    None,
    /// A single count applied to every element.
    Scalar(Number),
    /// Counts of arbitrary rank, in row-major order.
    Array {
        /// Shape of the counts.
        shape: Vec<usize>,
        /// Row-major counts.
        values: Vec<Number>,
    },
}

impl RepeatsArg {
    /// Builds a 1-D sequence of counts.
    pub fn sequence<N: Into<Number>, I: IntoIterator<Item = N>>(values: I) -> Self {
        let values: Vec<Number> = values.into_iter().map(Into::into).collect();
        RepeatsArg::Array {
            shape: vec![values.len()],
            values,
        }
    }

    /// Builds counts of any shape.
    pub fn nested<N: Into<Number>, I: IntoIterator<Item = N>, S: Into<Vec<usize>>>(
        values: I,
        shape: S,
    ) -> Result<Self, RepeatError> {
        let shape = shape.into();
        let values: Vec<Number> = values.into_iter().map(Into::into).collect();
        if values.len() != shape.iter().product::<usize>() {
            return Err(RepeatError::InvalidValue(format!(
                "cannot build repeats of shape {:?} from {} values",
                shape,
                values.len()
            )));
        }

        Ok(RepeatsArg::Array { shape, values })
    }

    /// Number of dimensions of the counts; scalars are rank 0.
    pub fn rank(&self) -> Option<usize> {
        match self {
            RepeatsArg::None => None,
            RepeatsArg::Scalar(_) => Some(0),
            RepeatsArg::Array { shape, .. } => Some(shape.len()),
        }
    }
}

macro_rules! repeats_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RepeatsArg {
                fn from(value: $ty) -> Self {
                    RepeatsArg::Scalar(value.into())
                }
            }

            impl From<Vec<$ty>> for RepeatsArg {
                fn from(values: Vec<$ty>) -> Self {
                    RepeatsArg::sequence(values)
                }
            }

            impl<const N: usize> From<[$ty; N]> for RepeatsArg {
                fn from(values: [$ty; N]) -> Self {
                    RepeatsArg::sequence(values)
                }
            }

            impl From<&[$ty]> for RepeatsArg {
                fn from(values: &[$ty]) -> Self {
                    RepeatsArg::sequence(values.iter().copied())
                }
            }

            impl From<NdArray<$ty>> for RepeatsArg {
                fn from(array: NdArray<$ty>) -> Self {
                    let shape = array.shape().to_vec();
                    RepeatsArg::Array {
                        shape,
                        values: array.into_vec().into_iter().map(Into::into).collect(),
                    }
                }
            }
        )*
    };
}

repeats_from!(i32, i64, u32, usize, f32, f64);

/// The `axis` argument of [`repeat`](crate::repeat()).
///
/// Only [`AxisArg::None`] and [`AxisArg::Int`] are accepted; the other variants exist so that
/// loosely typed callers get the same type error as the reference library.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisArg {
    /// Flatten the array and repeat along the single remaining axis.
    None,
    /// Repeat along this axis. Negative values count from the last axis.
    Int(i128),
    /// A floating point axis. Always rejected, even when integral.
    Float(f64),
    /// A string axis. Always rejected.
    Str(String),
}

impl AxisArg {
    pub(crate) fn resolve(&self) -> Result<Option<i128>, RepeatError> {
        match self {
            AxisArg::None => Ok(None),
            AxisArg::Int(axis) => Ok(Some(*axis)),
            AxisArg::Float(value) => Err(RepeatError::TypeKind(format!(
                "axis must be an integer, got float {value}"
            ))),
            AxisArg::Str(value) => Err(RepeatError::TypeKind(format!(
                "axis must be an integer, got string {value:?}"
            ))),
        }
    }
}

macro_rules! axis_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AxisArg {
                fn from(axis: $ty) -> Self {
                    AxisArg::Int(axis as i128)
                }
            }
        )*
    };
}

axis_from_int!(i32, i64, isize, usize);

impl From<Option<isize>> for AxisArg {
    fn from(axis: Option<isize>) -> Self {
        axis.map_or(AxisArg::None, Into::into)
    }
}

impl From<f64> for AxisArg {
    fn from(value: f64) -> Self {
        AxisArg::Float(value)
    }
}

impl From<&str> for AxisArg {
    fn from(value: &str) -> Self {
        AxisArg::Str(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_counts_truncate_toward_zero() {
        assert_eq!(Number::from(4.7).to_count(), Ok(4));
        assert_eq!(Number::from(-0.5).to_count(), Ok(0));
        assert_eq!(Number::from(-3).to_count(), Ok(-3));
        assert!(Number::Float(f64::NAN).to_count().unwrap_err().is_value_error());
    }

    #[test]
    fn test_unsigned_counts_keep_their_sign() {
        assert_eq!(Number::from(u32::MAX).to_count(), Ok(i64::from(u32::MAX)));
        match Number::from(usize::MAX).to_count() {
            Err(RepeatError::InvalidValue(msg)) => assert!(msg.contains("out of range"), "{msg}"),
            other => panic!("expected an out of range count, got {other:?}"),
        }
    }

    #[test]
    fn test_repeats_rank() {
        assert_eq!(RepeatsArg::None.rank(), None);
        assert_eq!(RepeatsArg::from(3).rank(), Some(0));
        assert_eq!(RepeatsArg::from(vec![1, 2]).rank(), Some(1));
        let nested = RepeatsArg::nested([2, 3, 3, 3], [2, 2]).unwrap();
        assert_eq!(nested.rank(), Some(2));
    }

    #[test]
    fn test_nested_checks_value_count() {
        assert!(RepeatsArg::nested([1, 2, 3], [2, 2]).is_err());
    }

    #[test]
    fn test_axis_resolution() {
        assert_eq!(AxisArg::None.resolve(), Ok(None));
        assert_eq!(AxisArg::from(-1).resolve(), Ok(Some(-1)));
        assert!(AxisArg::from(1.0).resolve().unwrap_err().is_type_error());
        assert!(AxisArg::from("hello").resolve().unwrap_err().is_type_error());
        assert_eq!(AxisArg::from(usize::MAX).resolve(), Ok(Some(usize::MAX as i128)));
    }
}
