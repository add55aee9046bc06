use alloc::{format, vec, vec::Vec};
use core::fmt::Debug;

use burn_tensor::TensorData;

use crate::RepeatError;

/// Element types an [`NdArray`] can hold.
///
/// `Default` doubles as the null element: repeating an absent array yields default values.
pub trait ArrayElement: Clone + Default + Debug + Send + Sync {}

impl<E: Clone + Default + Debug + Send + Sync> ArrayElement for E {}

/// A dense, row-major N-dimensional array held in host memory.
///
/// A rank-0 array (empty shape) holds exactly one element.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray<E> {
    shape: Vec<usize>,
    data: Vec<E>,
}

/// Shape-level view of a repeat input, used by the planner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand<'a> {
    /// No array was supplied.
    Null,
    /// A bare scalar value.
    Scalar,
    /// An array with the given shape.
    Array(&'a [usize]),
}

impl<E> NdArray<E> {
    /// Creates an array from row-major data and a shape.
    ///
    /// # Returns
    /// An error if the number of elements does not match the shape.
    pub fn new<S: Into<Vec<usize>>>(data: Vec<E>, shape: S) -> Result<Self, RepeatError> {
        let shape = shape.into();
        let numel = shape.iter().product::<usize>();
        if data.len() != numel {
            return Err(RepeatError::InvalidValue(format!(
                "cannot build an array of shape {:?} from {} elements",
                shape,
                data.len()
            )));
        }

        Ok(Self { shape, data })
    }

    /// Creates a 1-D array.
    pub fn from_vec(data: Vec<E>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Creates a rank-0 array holding a single value.
    pub fn scalar(value: E) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub(crate) fn from_parts(shape: Vec<usize>, data: Vec<E>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    /// The extent of every dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements in row-major order.
    pub fn as_slice(&self) -> &[E] {
        &self.data
    }

    /// Consumes the array, returning its row-major elements.
    pub fn into_vec(self) -> Vec<E> {
        self.data
    }

    /// Reshapes the array to 1-D without moving any element.
    pub fn flatten(self) -> Self {
        Self {
            shape: vec![self.data.len()],
            data: self.data,
        }
    }

    /// Returns the element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<&E> {
        if index.len() != self.shape.len() {
            return None;
        }

        let mut offset = 0;
        for (&i, &extent) in index.iter().zip(self.shape.iter()) {
            if i >= extent {
                return None;
            }
            offset = offset * extent + i;
        }

        self.data.get(offset)
    }

    /// Shape descriptor handed to the planner.
    pub fn operand(&self) -> Operand<'_> {
        Operand::Array(&self.shape)
    }
}

impl<E: Clone> NdArray<E> {
    /// Copies the indices `range` of dimension `dim` into a new array.
    pub(crate) fn slice_dim(&self, dim: usize, range: core::ops::Range<usize>) -> Self {
        let (outer, extent, inner) = split_at_dim(&self.shape, dim);
        let mut data = Vec::with_capacity(outer * range.len() * inner);
        for o in 0..outer {
            let start = (o * extent + range.start) * inner;
            let end = (o * extent + range.end) * inner;
            data.extend_from_slice(&self.data[start..end]);
        }

        let mut shape = self.shape.clone();
        shape[dim] = range.len();
        Self { shape, data }
    }

    /// Joins arrays along dimension `dim`. All other extents must agree.
    pub(crate) fn concat(parts: &[Self], dim: usize, shape: Vec<usize>) -> Self {
        let (outer, _, inner) = split_at_dim(&shape, dim);
        let mut data = Vec::with_capacity(shape.iter().product());
        for o in 0..outer {
            for part in parts {
                let row = part.shape[dim] * inner;
                data.extend_from_slice(&part.data[o * row..(o + 1) * row]);
            }
        }

        Self::from_parts(shape, data)
    }
}

/// Splits a shape into `(outer, extent, inner)` around dimension `dim`.
pub(crate) fn split_at_dim(shape: &[usize], dim: usize) -> (usize, usize, usize) {
    let outer = shape[..dim].iter().product();
    let inner = shape[dim + 1..].iter().product();
    (outer, shape[dim], inner)
}

impl<E: burn_tensor::Element> NdArray<E> {
    /// Reads an array out of Burn tensor data.
    pub fn from_data(data: &TensorData) -> Result<Self, RepeatError> {
        let values = data.to_vec::<E>().map_err(|err| {
            RepeatError::InvalidValue(format!("cannot read tensor data: {err:?}"))
        })?;
        Self::new(values, data.shape.clone())
    }
}

impl<E: burn_tensor::Element> From<NdArray<E>> for TensorData {
    fn from(array: NdArray<E>) -> Self {
        TensorData::new(array.data, array.shape)
    }
}
