use alloc::{vec, vec::Vec};
use core::ops::Range;

use super::{DeviceMesh, MeshDim};

/// Specifies how a single dimension is distributed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DimDistribution {
    /// Dimension is sharded across a specific mesh dimension.
    Sharded(MeshDim),
    /// Dimension is replicated (not sharded).
    Replicated,
}

/// Errors raised when laying an array out over a device mesh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShardingError {
    /// More than one array dimension is sharded.
    #[error("at most one dimension may be sharded, got {0}")]
    TooManyShardedDims(usize),
    /// A sharded dimension refers to a mesh dimension that does not exist.
    #[error("mesh has no dimension named {0}")]
    UnknownMeshDim(MeshDim),
    /// The spec does not describe an array of this rank.
    #[error("sharding spec covers {expected} dimensions, array has {got}")]
    RankMismatch {
        /// Rank described by the spec.
        expected: usize,
        /// Rank of the array.
        got: usize,
    },
}

/// Describes how an array is distributed across devices.
///
/// At most one dimension is sharded; it is split into contiguous blocks, one per device
/// coordinate along its mesh dimension.
#[derive(Clone, Debug)]
pub struct ShardingSpec<T> {
    /// Distribution pattern for each array dimension
    dim_distributions: Vec<DimDistribution>,
    /// Description of the device mesh
    device_mesh: DeviceMesh<T>,
}

impl<T> ShardingSpec<T> {
    /// Creates a spec from one distribution per array dimension.
    pub fn new(
        dim_distributions: Vec<DimDistribution>,
        device_mesh: DeviceMesh<T>,
    ) -> Result<Self, ShardingError> {
        let sharded: Vec<&MeshDim> = dim_distributions
            .iter()
            .filter_map(|dist| match dist {
                DimDistribution::Sharded(dim) => Some(dim),
                DimDistribution::Replicated => None,
            })
            .collect();

        if sharded.len() > 1 {
            return Err(ShardingError::TooManyShardedDims(sharded.len()));
        }
        if let Some(dim) = sharded.first() {
            if device_mesh.dim_size(dim).is_none() {
                return Err(ShardingError::UnknownMeshDim((*dim).clone()));
            }
        }

        Ok(Self {
            dim_distributions,
            device_mesh,
        })
    }

    /// A spec replicating every dimension of a rank-`rank` array.
    pub fn replicated(rank: usize, device_mesh: DeviceMesh<T>) -> Self {
        Self {
            dim_distributions: vec![DimDistribution::Replicated; rank],
            device_mesh,
        }
    }

    /// Number of array dimensions described.
    pub fn rank(&self) -> usize {
        self.dim_distributions.len()
    }

    /// Distribution of every array dimension.
    pub fn dim_distributions(&self) -> &[DimDistribution] {
        &self.dim_distributions
    }

    /// The device mesh.
    pub fn device_mesh(&self) -> &DeviceMesh<T> {
        &self.device_mesh
    }

    /// The sharded array dimension and the mesh dimension it is split over.
    pub fn sharded_dim(&self) -> Option<(usize, &MeshDim)> {
        self.dim_distributions
            .iter()
            .enumerate()
            .find_map(|(idx, dist)| match dist {
                DimDistribution::Sharded(dim) => Some((idx, dim)),
                DimDistribution::Replicated => None,
            })
    }

    /// Number of partitions the array is split into.
    pub fn num_shards(&self) -> usize {
        self.sharded_dim()
            .and_then(|(_, dim)| self.device_mesh.dim_size(dim))
            .unwrap_or(1)
    }

    /// Splits `extent` indices into one contiguous block per shard.
    ///
    /// The first `extent % n` blocks hold one extra index; trailing blocks may be empty.
    pub fn partition(&self, extent: usize) -> Vec<Range<usize>> {
        let parts = self.num_shards();
        let (size, rest) = (extent / parts, extent % parts);

        let mut start = 0;
        (0..parts)
            .map(|i| {
                let len = size + usize::from(i < rest);
                let range = start..start + len;
                start += len;
                range
            })
            .collect()
    }

    /// Devices holding the shard at position `shard`.
    pub fn devices_for(&self, shard: usize) -> Vec<&T> {
        match self.sharded_dim() {
            Some((_, dim)) => self.device_mesh.devices_at(dim, shard),
            None => self.device_mesh.devices().iter().collect(),
        }
    }
}

impl<T: Clone> ShardingSpec<T> {
    /// A spec for the 1-D array obtained by flattening, keeping this spec's partition count.
    pub fn flattened(&self) -> Self {
        let dist = match self.sharded_dim() {
            Some((_, dim)) => DimDistribution::Sharded(dim.clone()),
            None => DimDistribution::Replicated,
        };

        Self {
            dim_distributions: vec![dist],
            device_mesh: self.device_mesh.clone(),
        }
    }
}
