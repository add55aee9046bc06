use alloc::{format, vec::Vec};

use super::{LocalCounts, Plan, ShapeClass, exclusive_scan};
use crate::{ArrayArg, ArrayElement, NdArray, RepeatError, array::split_at_dim};

/// The output of one partition, placed at `offset` along the target axis of the result.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionOutput<E> {
    /// First output index along the target axis.
    pub offset: usize,
    /// The expanded local data.
    pub data: NdArray<E>,
}

/// Runs a validated plan, producing a new array. The input is never modified.
///
/// # Returns
/// An error if `array` is not the input the plan was made for.
pub fn execute<E: ArrayElement>(
    array: ArrayArg<E>,
    plan: &Plan,
) -> Result<NdArray<E>, RepeatError> {
    let total = plan.output_shape[plan.axis];

    let output = match (plan.class, array) {
        (ShapeClass::Null, ArrayArg::None) => {
            NdArray::from_parts(plan.output_shape.clone(), filled(E::default(), total)?)
        }
        (ShapeClass::Scalar, ArrayArg::Scalar(value)) => {
            NdArray::from_parts(plan.output_shape.clone(), filled(value, total)?)
        }
        (ShapeClass::Null, _) => return Err(mismatch(plan)),
        (_, ArrayArg::Array(array))
            if array.len() == plan.view_shape.iter().product::<usize>() =>
        {
            let view = NdArray::from_parts(plan.view_shape.clone(), array.into_vec());
            let counts = plan.spec.local(0..plan.extent());
            execute_partition(&view, plan.axis, counts, 0)?.data
        }
        _ => return Err(mismatch(plan)),
    };

    Ok(output)
}

fn mismatch(plan: &Plan) -> RepeatError {
    RepeatError::InvalidValue(format!(
        "input does not match a {:?} plan over shape {:?}",
        plan.class, plan.view_shape
    ))
}

/// `len` copies of `value`, or an error when the buffer cannot be allocated.
fn filled<E: Clone>(value: E, len: usize) -> Result<Vec<E>, RepeatError> {
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|err| {
        RepeatError::InvalidValue(format!("cannot allocate {len} output elements: {err}"))
    })?;
    out.resize(len, value);
    Ok(out)
}

/// Expands one partition of the input along `axis`.
///
/// `counts` covers exactly the local indices of `axis`; `base_offset` is the exclusive
/// prefix sum of all counts before the partition and is only recorded in the output.
///
/// # Returns
/// An error if the output buffer cannot be allocated.
pub fn execute_partition<E: ArrayElement>(
    local: &NdArray<E>,
    axis: usize,
    counts: LocalCounts<'_>,
    base_offset: usize,
) -> Result<PartitionOutput<E>, RepeatError> {
    let (outer, extent, inner) = split_at_dim(local.shape(), axis);
    let (offsets, total) = exclusive_scan((0..extent).map(|i| counts.get(i)));

    let mut shape = local.shape().to_vec();
    shape[axis] = total;
    let row = total * inner;
    let mut out = filled(E::default(), outer * row)?;

    log::trace!(
        "Expanding partition of shape {:?} along axis {axis} at offset {base_offset}",
        local.shape()
    );

    if row > 0 {
        let src = local.as_slice();
        let fill = |(o, dst): (usize, &mut [E])| {
            let base = o * extent * inner;
            for (i, &offset) in offsets.iter().enumerate() {
                let block = &src[base + i * inner..base + (i + 1) * inner];
                let start = offset * inner;
                for k in 0..counts.get(i) {
                    let at = start + k * inner;
                    dst[at..at + inner].clone_from_slice(block);
                }
            }
        };

        #[cfg(feature = "std")]
        {
            use rayon::prelude::*;
            out.par_chunks_mut(row).enumerate().for_each(fill);
        }
        #[cfg(not(feature = "std"))]
        out.chunks_mut(row).enumerate().for_each(fill);
    }

    Ok(PartitionOutput {
        offset: base_offset,
        data: NdArray::from_parts(shape, out),
    })
}
