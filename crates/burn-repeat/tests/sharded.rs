use burn_repeat::{
    ArrayArg, AxisArg, NdArray, ShardedArray, repeat,
    sharding::{DeviceMeshBuilder, DimDistribution, MeshDim, ShardingSpec},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const MAX_DIM: usize = 4;

fn seq_array(shape: &[usize]) -> NdArray<i64> {
    let numel = shape.iter().product::<usize>() as i64;
    NdArray::new((0..numel).collect(), shape).unwrap()
}

fn random_shape(rng: &mut StdRng, ndim: usize) -> Vec<usize> {
    (0..ndim).map(|_| rng.random_range(1..9)).collect()
}

/// Element-by-element reference: output index `j` along `axis` reads the input index whose
/// block of copies contains `j`.
fn reference(array: &NdArray<i64>, counts: &[usize], axis: usize) -> NdArray<i64> {
    let mut ends = Vec::with_capacity(counts.len());
    let mut total = 0;
    for count in counts {
        total += count;
        ends.push(total);
    }

    let mut out_shape = array.shape().to_vec();
    out_shape[axis] = total;
    let numel = out_shape.iter().product::<usize>();

    let mut data = Vec::with_capacity(numel);
    let mut index = vec![0; out_shape.len()];
    for flat in 0..numel {
        let mut rest = flat;
        for d in (0..out_shape.len()).rev() {
            index[d] = rest % out_shape[d];
            rest /= out_shape[d];
        }
        let mut src = index.clone();
        src[axis] = ends.partition_point(|&end| end <= index[axis]);
        data.push(*array.get(&src).unwrap());
    }

    NdArray::new(data, out_shape).unwrap()
}

fn sharded(
    array: &NdArray<i64>,
    dim: Option<usize>,
    shards: usize,
) -> ShardedArray<i64, usize> {
    let mesh = DeviceMeshBuilder::new((0..shards).collect(), [shards])
        .with_dim(0, MeshDim::new("data"))
        .build()
        .unwrap();
    let mut dists = vec![DimDistribution::Replicated; array.rank()];
    if let Some(dim) = dim {
        dists[dim] = DimDistribution::Sharded(MeshDim::new("data"));
    }

    ShardedArray::distribute(array, ShardingSpec::new(dists, mesh).unwrap()).unwrap()
}

#[test]
fn nd_basic_matches_flattened_reference() {
    let mut rng = StdRng::seed_from_u64(12345);
    for ndim in 1..=MAX_DIM {
        let shape = random_shape(&mut rng, ndim);
        let array = seq_array(&shape);
        let count: usize = rng.random_range(0..15);

        let out = repeat(array.clone(), count, AxisArg::None).unwrap();
        let flat = array.flatten();
        let expected = reference(&flat, &vec![count; flat.len()], 0);
        assert_eq!(out, expected, "shape {shape:?}, repeats {count}");
    }
}

#[test]
fn nd_axis_uniform_matches_reference() {
    let mut rng = StdRng::seed_from_u64(12345);
    for ndim in 1..=MAX_DIM {
        for axis in 0..ndim {
            let shape = random_shape(&mut rng, ndim);
            let array = seq_array(&shape);
            let count: usize = rng.random_range(0..15);

            let out = repeat(array.clone(), count, axis).unwrap();
            let expected = reference(&array, &vec![count; shape[axis]], axis);
            assert_eq!(out, expected, "shape {shape:?}, axis {axis}, repeats {count}");
        }
    }
}

#[test]
fn nd_axis_per_index_matches_reference() {
    let mut rng = StdRng::seed_from_u64(12345);
    for ndim in 1..=MAX_DIM {
        let shape = random_shape(&mut rng, ndim);
        let array = seq_array(&shape);
        for axis in 0..ndim {
            let counts: Vec<usize> = (0..shape[axis]).collect();

            let out = repeat(array.clone(), counts.clone(), axis).unwrap();
            let expected = reference(&array, &counts, axis);
            assert_eq!(out.shape()[axis], counts.iter().sum::<usize>());
            assert_eq!(out, expected, "shape {shape:?}, axis {axis}");
        }
    }
}

#[test]
fn sharded_repeat_matches_local_repeat() {
    let mut rng = StdRng::seed_from_u64(7);
    for ndim in 1..=MAX_DIM {
        let shape = random_shape(&mut rng, ndim);
        let array = seq_array(&shape);
        let shards = rng.random_range(1..5);

        for sharded_dim in (0..ndim).map(Some).chain([None]) {
            let input = sharded(&array, sharded_dim, shards);

            for axis in 0..ndim {
                let counts: Vec<usize> =
                    (0..shape[axis]).map(|_| rng.random_range(0..4)).collect();
                let local = repeat(array.clone(), counts.clone(), axis).unwrap();
                let out = input.repeat(counts, axis).unwrap();
                assert_eq!(out.shape(), local.shape());
                assert_eq!(out.gather(), local, "sharded {sharded_dim:?}, axis {axis}");
            }

            let count: usize = rng.random_range(0..4);
            let local = repeat(array.clone(), count, AxisArg::None).unwrap();
            let out = input.repeat(count, AxisArg::None).unwrap();
            assert_eq!(out.gather(), local, "sharded {sharded_dim:?}, flattened");
        }
    }
}

#[test]
fn sharded_offsets_are_disjoint_and_ordered() {
    let array = seq_array(&[10, 3]);
    let input = sharded(&array, Some(0), 4);
    let counts: Vec<usize> = (0..10).map(|i| i % 3).collect();
    let out = input.repeat(counts, 0).unwrap();

    let mut next = 0;
    for shard in out.shards() {
        assert_eq!(shard.offset, next);
        next += shard.data.shape()[0];
    }
    assert_eq!(next, out.shape()[0]);
}

#[test]
fn sharded_empty_absorbs_mismatched_repeats() {
    let array = seq_array(&[0]);
    let input = sharded(&array, Some(0), 2);
    let out = input.repeat(vec![1, 2, 3], AxisArg::None).unwrap();
    assert!(out.gather().is_empty());
}

#[test]
fn sharded_empty_matrix_checks_non_empty_axis() {
    let array = seq_array(&[4, 0]);
    let input = sharded(&array, Some(0), 2);
    assert!(input.repeat(vec![1, 2, 3], 0).unwrap_err().is_value_error());

    let out = input.repeat(vec![1, 2, 3], 1).unwrap();
    assert_eq!(out.shape(), &[4, 0]);
    let out = input.repeat(vec![1, 0, 2, 1], 0).unwrap();
    assert_eq!(out.gather(), repeat(array, vec![1, 0, 2, 1], 0).unwrap());
}

#[test]
fn sharded_rank_0_matches_scalar_repeat() {
    let mesh = DeviceMeshBuilder::new(vec![0, 1, 2], [3])
        .with_dim(0, MeshDim::new("data"))
        .build()
        .unwrap();
    let input =
        ShardedArray::distribute(&NdArray::scalar(9i64), ShardingSpec::replicated(0, mesh))
            .unwrap();

    for count in [0, 1, 4] {
        let local = repeat(ArrayArg::Scalar(9i64), count, AxisArg::None).unwrap();
        assert_eq!(input.repeat(count, AxisArg::None).unwrap().gather(), local);
        assert_eq!(input.repeat(count, 0).unwrap().gather(), local);
        assert_eq!(input.repeat(vec![count], -1).unwrap().gather(), local);
    }
}
