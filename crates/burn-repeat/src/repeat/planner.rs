use alloc::{format, vec, vec::Vec};
use core::ops::Range;

use super::{AxisArg, Number, RepeatsArg};
use crate::{Operand, RepeatError};

/// Resolved repeat counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepeatSpec {
    /// Every index along the target axis is repeated the same number of times.
    Uniform(usize),
    /// Index `i` along the target axis is repeated `counts[i]` times.
    PerIndex(Vec<usize>),
}

impl RepeatSpec {
    /// Output extent along the target axis for an input extent, or `None` on overflow.
    pub fn total(&self, extent: usize) -> Option<usize> {
        match self {
            RepeatSpec::Uniform(count) => count.checked_mul(extent),
            RepeatSpec::PerIndex(counts) => counts
                .iter()
                .try_fold(0usize, |total, &count| total.checked_add(count)),
        }
    }

    /// The counts covering the input indices `range` of the target axis.
    pub fn local(&self, range: Range<usize>) -> LocalCounts<'_> {
        match self {
            RepeatSpec::Uniform(count) => LocalCounts::Uniform(*count),
            RepeatSpec::PerIndex(counts) => LocalCounts::Slice(&counts[range]),
        }
    }
}

/// The counts a single partition needs: one uniform count, or its slice of the count vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalCounts<'a> {
    /// Same count for every local index.
    Uniform(usize),
    /// One count per local index.
    Slice(&'a [usize]),
}

impl LocalCounts<'_> {
    /// Count of the local index `i`.
    pub fn get(&self, i: usize) -> usize {
        match self {
            LocalCounts::Uniform(count) => *count,
            LocalCounts::Slice(counts) => counts[i],
        }
    }

    /// Output extent produced from `extent` local indices.
    pub fn total(&self, extent: usize) -> usize {
        match self {
            LocalCounts::Uniform(count) => count * extent,
            LocalCounts::Slice(counts) => counts.iter().sum(),
        }
    }
}

/// How the input was classified during planning.
///
/// Resolved once, in the order the checks are listed; execution never re-inspects the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeClass {
    /// No array; output holds default elements.
    Null,
    /// An array without elements; output is empty.
    Empty,
    /// A 0-d input of size one.
    Scalar,
    /// A non-empty array repeated after row-major flattening.
    Flattened,
    /// A non-empty array repeated along one of its axes.
    Axis,
}

/// A validated repeat, ready for execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    /// Classification of the input.
    pub class: ShapeClass,
    /// Shape the input is viewed as during execution (flattened or unchanged).
    pub view_shape: Vec<usize>,
    /// Target axis within `view_shape`.
    pub axis: usize,
    /// Resolved counts.
    pub spec: RepeatSpec,
    /// Shape of the result.
    pub output_shape: Vec<usize>,
}

impl Plan {
    fn new(
        class: ShapeClass,
        view_shape: Vec<usize>,
        axis: usize,
        spec: RepeatSpec,
    ) -> Result<Self, RepeatError> {
        let mut output_shape = view_shape.clone();
        let total = spec.total(view_shape[axis]);
        let numel = total.and_then(|total| {
            output_shape[axis] = total;
            output_shape
                .iter()
                .try_fold(1usize, |numel, &dim| numel.checked_mul(dim))
        });
        if numel.is_none() {
            return Err(RepeatError::InvalidValue(format!(
                "repeating an array of shape {view_shape:?} along axis {axis} overflows the output size"
            )));
        }

        Ok(Self {
            class,
            view_shape,
            axis,
            spec,
            output_shape,
        })
    }

    /// Extent of the target axis in the input view.
    pub fn extent(&self) -> usize {
        self.view_shape[self.axis]
    }
}

/// Repeat counts after the rank check, before they are matched against an extent.
enum Counts {
    Scalar(i64),
    Sequence(Vec<i64>),
}

impl Counts {
    fn parse(repeats: &RepeatsArg) -> Result<Self, RepeatError> {
        match repeats {
            RepeatsArg::None => Err(RepeatError::TypeKind(
                "repeats must be a number or a sequence of numbers, not None".into(),
            )),
            RepeatsArg::Scalar(value) => Ok(Counts::Scalar(value.to_count()?)),
            RepeatsArg::Array { shape, values } => match shape.len() {
                0 => {
                    let value = values.first().ok_or_else(|| {
                        RepeatError::InvalidValue("0-d repeats must hold one value".into())
                    })?;
                    Ok(Counts::Scalar(value.to_count()?))
                }
                1 => Ok(Counts::Sequence(
                    values
                        .iter()
                        .map(|value: &Number| value.to_count())
                        .collect::<Result<_, _>>()?,
                )),
                rank => Err(RepeatError::InvalidValue(format!(
                    "repeats should be scalar or 1D array, got a {rank}D array"
                ))),
            },
        }
    }

    /// The single count of a scalar or length-one sequence.
    fn single(&self) -> Option<i64> {
        match self {
            Counts::Scalar(count) => Some(*count),
            Counts::Sequence(counts) if counts.len() == 1 => Some(counts[0]),
            Counts::Sequence(_) => None,
        }
    }

    /// Matches the counts against the target extent.
    fn resolve(&self, extent: usize) -> Result<RepeatSpec, RepeatError> {
        match self {
            Counts::Scalar(count) => Ok(RepeatSpec::Uniform(non_negative(*count)?)),
            Counts::Sequence(counts) if counts.len() == 1 => {
                Ok(RepeatSpec::Uniform(non_negative(counts[0])?))
            }
            Counts::Sequence(counts) if counts.len() != extent => {
                Err(RepeatError::InvalidValue(format!(
                    "operands could not be broadcast together with shape ({extent},) ({},)",
                    counts.len()
                )))
            }
            Counts::Sequence(counts) => counts
                .iter()
                .map(|&count| non_negative(count))
                .collect::<Result<_, _>>()
                .map(RepeatSpec::PerIndex),
        }
    }
}

fn non_negative(count: i64) -> Result<usize, RepeatError> {
    usize::try_from(count).map_err(|_| {
        RepeatError::InvalidValue(format!(
            "repeats may not contain negative values, got {count}"
        ))
    })
}

fn normalize_axis(axis: i128, rank: usize) -> Result<usize, RepeatError> {
    let rank = rank as i128;
    let normalized = if axis < 0 { axis + rank } else { axis };
    if normalized < 0 || normalized >= rank {
        return Err(RepeatError::InvalidValue(format!(
            "axis {axis} is out of bounds for array of dimension {rank}"
        )));
    }

    Ok(normalized as usize)
}

/// Validates the arguments of a repeat and resolves them into a [`Plan`].
///
/// Argument kinds are checked first (missing repeats, repeats of rank two or more, a
/// non-integer axis), then the axis range. The input is then classified, first match wins:
/// absent, empty, scalar, general. An empty target axis absorbs any repeat counts, even
/// counts the reference library would reject as a broadcast mismatch; an empty array
/// repeated along a non-empty axis is checked like any other.
pub fn validate_and_plan(
    operand: Operand<'_>,
    repeats: &RepeatsArg,
    axis: &AxisArg,
) -> Result<Plan, RepeatError> {
    let counts = Counts::parse(repeats)?;
    let axis = axis.resolve()?;

    let shape: &[usize] = match operand {
        Operand::Array(shape) => shape,
        Operand::Null | Operand::Scalar => &[],
    };
    // 0-d inputs behave as one-element 1-D arrays when an axis is given.
    let axis = axis
        .map(|axis| normalize_axis(axis, shape.len().max(1)))
        .transpose()?;

    let plan = match operand {
        Operand::Null | Operand::Scalar | Operand::Array([]) => {
            let count = counts.single().ok_or_else(|| {
                RepeatError::InvalidValue(
                    "repeats for a scalar input must be a scalar or a one-element sequence".into(),
                )
            })?;
            let class = match operand {
                Operand::Null => ShapeClass::Null,
                _ => ShapeClass::Scalar,
            };
            Plan::new(class, vec![1], 0, RepeatSpec::Uniform(non_negative(count)?))?
        }
        Operand::Array(shape) if shape.iter().product::<usize>() == 0 => {
            let (view_shape, axis) = match axis {
                Some(axis) => (shape.to_vec(), axis),
                None => (vec![0], 0),
            };
            let spec = match view_shape[axis] {
                0 => counts.resolve(0).unwrap_or(RepeatSpec::Uniform(1)),
                extent => counts.resolve(extent)?,
            };
            Plan::new(ShapeClass::Empty, view_shape, axis, spec)?
        }
        Operand::Array(shape) => match axis {
            Some(axis) => {
                let spec = counts.resolve(shape[axis])?;
                Plan::new(ShapeClass::Axis, shape.to_vec(), axis, spec)?
            }
            None => {
                let numel = shape.iter().product();
                let spec = counts.resolve(numel)?;
                Plan::new(ShapeClass::Flattened, vec![numel], 0, spec)?
            }
        },
    };

    log::debug!(
        "Planned repeat: {:?} view {:?} along axis {} -> {:?}",
        plan.class,
        plan.view_shape,
        plan.axis,
        plan.output_shape
    );

    Ok(plan)
}
