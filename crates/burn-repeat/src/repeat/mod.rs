//! Replication of array elements along one axis.
//!
//! A repeat runs in two steps: [`validate_and_plan`] checks the arguments and classifies the
//! input into a [`Plan`], then [`execute`] builds the output. Every error is raised by the
//! first step, so a failing call never produces partial output.

mod args;
mod executor;
mod planner;
mod scan;

pub use args::*;
pub use executor::*;
pub use planner::*;
pub use scan::*;

use crate::{ArrayElement, NdArray, RepeatError};

/// Repeats the elements of `array`.
///
/// With an axis, each index along that axis is repeated according to `repeats`; every other
/// dimension is unchanged. Without one, the array is flattened in row-major order first.
///
/// # Arguments
/// * `array` - The input: absent, a scalar, or an N-dimensional array.
/// * `repeats` - A single count, or one count per index along the target axis.
/// * `axis` - The axis to repeat along, or [`AxisArg::None`] to flatten.
///
/// # Example
///
/// ```rust
/// use burn_repeat::{AxisArg, NdArray, repeat};
///
/// let array = NdArray::from_vec(vec![1, 2, 3]);
/// let out = repeat(array, vec![1, 2, 3], AxisArg::None).unwrap();
/// assert_eq!(out.as_slice(), &[1, 2, 2, 3, 3, 3]);
/// ```
pub fn repeat<E, A, R, X>(array: A, repeats: R, axis: X) -> Result<NdArray<E>, RepeatError>
where
    E: ArrayElement,
    A: Into<ArrayArg<E>>,
    R: Into<RepeatsArg>,
    X: Into<AxisArg>,
{
    let array = array.into();
    let plan = validate_and_plan(array.operand(), &repeats.into(), &axis.into())?;
    execute(array, &plan)
}
