use alloc::{borrow::Cow, vec::Vec};
use core::ops::Range;

use crate::{
    ArrayElement, AxisArg, NdArray, Operand, RepeatError, RepeatsArg,
    repeat::{
        LocalCounts, PartitionOutput, ShapeClass, execute_partition, scan_partitions,
        validate_and_plan,
    },
    sharding::{ShardingError, ShardingSpec},
};

/// Represents an array that is distributed (sharded or replicated) across multiple devices.
///
/// A `ShardedArray` holds every shard of a global array, along with metadata describing
/// how the full array is partitioned across devices. The distribution is defined by a
/// `ShardingSpec`: at most one dimension is split into contiguous blocks, each block
/// living on the devices at one coordinate of its mesh dimension.
#[derive(Clone, Debug)]
pub struct ShardedArray<E, T> {
    /// Local shards, in order along the sharded dimension
    shards: Vec<Shard<E>>,
    /// Specification of how this array is sharded
    sharding_spec: ShardingSpec<T>,
    /// Global shape of the array (across all devices)
    global_shape: Vec<usize>,
}

/// A contiguous block of a [`ShardedArray`].
#[derive(Clone, Debug, PartialEq)]
pub struct Shard<E> {
    /// Global index of the first element along the sharded dimension.
    pub offset: usize,
    /// The local data.
    pub data: NdArray<E>,
}

impl<E> From<PartitionOutput<E>> for Shard<E> {
    fn from(output: PartitionOutput<E>) -> Self {
        Shard {
            offset: output.offset,
            data: output.data,
        }
    }
}

impl<E: ArrayElement, T: Clone> ShardedArray<E, T> {
    /// Splits `array` into shards as described by `sharding_spec`.
    pub fn distribute(
        array: &NdArray<E>,
        sharding_spec: ShardingSpec<T>,
    ) -> Result<Self, ShardingError> {
        if sharding_spec.rank() != array.rank() {
            return Err(ShardingError::RankMismatch {
                expected: sharding_spec.rank(),
                got: array.rank(),
            });
        }

        let shards = match sharding_spec.sharded_dim() {
            Some((dim, _)) => sharding_spec
                .partition(array.shape()[dim])
                .into_iter()
                .map(|range| Shard {
                    offset: range.start,
                    data: array.slice_dim(dim, range),
                })
                .collect(),
            None => alloc::vec![Shard {
                offset: 0,
                data: array.clone(),
            }],
        };

        Ok(Self {
            shards,
            sharding_spec,
            global_shape: array.shape().to_vec(),
        })
    }

    /// Reassembles the global array.
    pub fn gather(&self) -> NdArray<E> {
        match self.sharding_spec.sharded_dim() {
            Some((dim, _)) => {
                let parts: Vec<NdArray<E>> =
                    self.shards.iter().map(|shard| shard.data.clone()).collect();
                NdArray::concat(&parts, dim, self.global_shape.clone())
            }
            None => self.shards[0].data.clone(),
        }
    }

    /// Repeats the elements of the array, shard by shard.
    ///
    /// Planning and validation run once against the global shape. When the target axis is
    /// the sharded one, the shards' count totals are scanned into base offsets first; every
    /// shard then expands independently. The result is laid out like the input, or along
    /// the single flattened axis when `axis` is [`AxisArg::None`].
    ///
    /// `gather()` of the result equals [`repeat`](crate::repeat()) on the gathered input.
    pub fn repeat<R, X>(&self, repeats: R, axis: X) -> Result<Self, RepeatError>
    where
        R: Into<RepeatsArg>,
        X: Into<AxisArg>,
    {
        let plan = validate_and_plan(
            Operand::Array(&self.global_shape),
            &repeats.into(),
            &axis.into(),
        )?;

        let input: Cow<'_, Self> = match plan.class {
            ShapeClass::Flattened | ShapeClass::Empty if plan.view_shape != self.global_shape => {
                Cow::Owned(self.flatten()?)
            }
            ShapeClass::Scalar => {
                let spec = ShardingSpec::replicated(1, self.sharding_spec.device_mesh().clone());
                let data = self.gather().flatten();
                Cow::Owned(Self::distribute(&data, spec)?)
            }
            _ => Cow::Borrowed(self),
        };

        let outputs = match input.sharding_spec.sharded_dim() {
            Some((dim, _)) if dim == plan.axis => {
                let scan = scan_partitions(&plan.spec, &input.ranges(dim));
                input.expand(plan.axis, |i| {
                    let part = &scan.partitions[i];
                    (plan.spec.local(part.range.clone()), part.base_offset)
                })?
            }
            _ => {
                let counts = plan.spec.local(0..plan.extent());
                let offsets: Vec<usize> = input.shards.iter().map(|shard| shard.offset).collect();
                input.expand(plan.axis, |i| (counts, offsets[i]))?
            }
        };

        Ok(Self {
            shards: outputs,
            sharding_spec: input.sharding_spec.clone(),
            global_shape: plan.output_shape,
        })
    }

    /// Expands every shard along `axis`; `local(i)` supplies the counts and base offset of
    /// shard `i`.
    fn expand<'a, F>(&self, axis: usize, local: F) -> Result<Vec<Shard<E>>, RepeatError>
    where
        F: Fn(usize) -> (LocalCounts<'a>, usize) + Sync,
    {
        let run = |(i, shard): (usize, &Shard<E>)| -> Result<Shard<E>, RepeatError> {
            let (counts, base_offset) = local(i);
            execute_partition(&shard.data, axis, counts, base_offset).map(Shard::from)
        };

        #[cfg(feature = "std")]
        let shards = {
            use rayon::prelude::*;
            self.shards.par_iter().enumerate().map(run).collect()
        };
        #[cfg(not(feature = "std"))]
        let shards = self.shards.iter().enumerate().map(run).collect();

        shards
    }

    /// The same elements as a 1-D array, sharded over the same mesh dimension.
    ///
    /// Arrays sharded along their leading dimension flatten shard by shard; any other
    /// layout is gathered and redistributed.
    fn flatten(&self) -> Result<Self, ShardingError> {
        let spec = self.sharding_spec.flattened();
        let numel = self.global_shape.iter().product::<usize>();

        match self.sharding_spec.sharded_dim() {
            Some((0, _)) => {
                let inner = self.global_shape[1..].iter().product::<usize>();
                let shards = self
                    .shards
                    .iter()
                    .map(|shard| Shard {
                        offset: shard.offset * inner,
                        data: shard.data.clone().flatten(),
                    })
                    .collect();

                Ok(Self {
                    shards,
                    sharding_spec: spec,
                    global_shape: alloc::vec![numel],
                })
            }
            _ => {
                log::debug!(
                    "Redistributing array of shape {:?} before flattening",
                    self.global_shape
                );
                Self::distribute(&self.gather().flatten(), spec)
            }
        }
    }

    /// Global index ranges of the shards along `dim`.
    fn ranges(&self, dim: usize) -> Vec<Range<usize>> {
        self.shards
            .iter()
            .map(|shard| shard.offset..shard.offset + shard.data.shape()[dim])
            .collect()
    }
}

impl<E, T> ShardedArray<E, T> {
    /// The shards, in order along the sharded dimension.
    pub fn shards(&self) -> &[Shard<E>] {
        &self.shards
    }

    /// How the array is laid out.
    pub fn sharding_spec(&self) -> &ShardingSpec<T> {
        &self.sharding_spec
    }

    /// Global shape of the array.
    pub fn shape(&self) -> &[usize] {
        &self.global_shape
    }

    /// Devices holding the shard at position `shard`.
    pub fn devices_for(&self, shard: usize) -> Vec<&T> {
        self.sharding_spec.devices_for(shard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharding::{DeviceMesh, DeviceMeshBuilder, DimDistribution, MeshDim};
    use alloc::vec;

    fn mesh(n: usize) -> DeviceMesh<usize> {
        DeviceMeshBuilder::new((0..n).collect(), [n])
            .with_dim(0, MeshDim::new("x"))
            .build()
            .unwrap()
    }

    fn sharded_along(dim: usize, array: &NdArray<i32>, n: usize) -> ShardedArray<i32, usize> {
        let mut dists = vec![DimDistribution::Replicated; array.rank()];
        dists[dim] = DimDistribution::Sharded(MeshDim::new("x"));
        let spec = ShardingSpec::new(dists, mesh(n)).unwrap();
        ShardedArray::distribute(array, spec).unwrap()
    }

    #[test]
    fn test_distribute_and_gather() {
        let array = NdArray::new((0..24).collect(), [4, 3, 2]).unwrap();
        for dim in 0..3 {
            let sharded = sharded_along(dim, &array, 2);
            assert_eq!(sharded.shards().len(), 2);
            assert_eq!(sharded.gather(), array);
        }
    }

    #[test]
    fn test_distribute_rank_mismatch() {
        let array = NdArray::from_vec(vec![1, 2, 3]);
        let spec = ShardingSpec::replicated(2, mesh(2));
        let err = ShardedArray::distribute(&array, spec).unwrap_err();
        assert_eq!(err, ShardingError::RankMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn test_repeat_along_sharded_axis_offsets() {
        let array = NdArray::from_vec(vec![1, 2, 3, 4, 5]);
        let sharded = sharded_along(0, &array, 2);
        let out = sharded.repeat(vec![1, 0, 2, 3, 1], 0).unwrap();

        let offsets: Vec<usize> = out.shards().iter().map(|shard| shard.offset).collect();
        assert_eq!(offsets, vec![0, 3]);
        assert_eq!(out.shape(), &[7]);
        assert_eq!(out.gather().as_slice(), &[1, 3, 3, 4, 4, 4, 5]);
    }

    #[test]
    fn test_repeat_across_sharded_axis_keeps_offsets() {
        let array = NdArray::new((0..6).collect(), [3, 2]).unwrap();
        let sharded = sharded_along(0, &array, 2);
        let out = sharded.repeat(vec![2, 1], 1).unwrap();

        let offsets: Vec<usize> = out.shards().iter().map(|shard| shard.offset).collect();
        assert_eq!(offsets, vec![0, 2]);
        assert_eq!(out.shape(), &[3, 3]);
        assert_eq!(out.gather().as_slice(), &[0, 0, 1, 2, 2, 3, 4, 4, 5]);
    }

    #[test]
    fn test_repeat_flattened_inner_sharding() {
        let array = NdArray::new(vec![1, 3, 2, 4], [2, 2]).unwrap();
        let sharded = sharded_along(1, &array, 2);
        let out = sharded.repeat(3, AxisArg::None).unwrap();

        assert_eq!(out.sharding_spec().rank(), 1);
        assert_eq!(
            out.gather().as_slice(),
            &[1, 1, 1, 3, 3, 3, 2, 2, 2, 4, 4, 4]
        );
    }

    #[test]
    fn test_repeat_validates_globally() {
        let array = NdArray::from_vec(vec![1, 2, 3, 4]);
        let sharded = sharded_along(0, &array, 2);
        assert!(sharded.repeat(vec![1, 2], 0).unwrap_err().is_value_error());
        assert!(sharded.repeat(RepeatsArg::None, 0).unwrap_err().is_type_error());
    }

    #[test]
    fn test_repeat_borrows_unchanged_layout() {
        let array = NdArray::new((0..6).collect(), [3, 2]).unwrap();
        let sharded = sharded_along(0, &array, 2);
        let out = sharded.repeat(2, 1).unwrap();

        assert_eq!(sharded.gather(), array);
        assert_eq!(out.sharding_spec().sharded_dim(), Some((0, &MeshDim::new("x"))));
        assert_eq!(out.shape(), &[3, 4]);
    }

    #[test]
    fn test_repeat_rank_0_is_replicated() {
        let spec = ShardingSpec::replicated(0, mesh(2));
        let sharded = ShardedArray::distribute(&NdArray::scalar(5), spec).unwrap();
        let out = sharded.repeat(3, AxisArg::None).unwrap();

        assert_eq!(out.sharding_spec().rank(), 1);
        assert_eq!(out.sharding_spec().sharded_dim(), None);
        assert_eq!(out.gather().as_slice(), &[5, 5, 5]);
    }

    #[test]
    fn test_repeat_unallocatable_output_is_an_error() {
        let array = NdArray::from_vec(vec![1, 2, 3, 4]);
        let sharded = sharded_along(0, &array, 2);
        let err = sharded.repeat(i64::MAX / 2, 0).unwrap_err();
        assert!(err.is_value_error(), "{err}");
    }

    #[test]
    fn test_devices_follow_shards() {
        let array = NdArray::from_vec(vec![1, 2, 3, 4]);
        let sharded = sharded_along(0, &array, 2);
        assert_eq!(sharded.devices_for(1), vec![&1]);
    }
}
