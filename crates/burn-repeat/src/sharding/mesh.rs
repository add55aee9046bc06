use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;
use hashbrown::{HashMap, HashSet};

/// A named axis of a [`DeviceMesh`].
///
/// Sharding specs refer to mesh axes by name, so an array dimension can be split over
/// e.g. the `"data"` axis without knowing where that axis sits in the mesh shape.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct MeshDim {
    name: String,
}

impl MeshDim {
    /// Constructs a new [`MeshDim`] with the given name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        MeshDim { name: name.into() }
    }

    /// The name of the dimension.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MeshDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for MeshDim {
    fn from(name: &str) -> Self {
        MeshDim::new(name.to_string())
    }
}

/// Devices arranged on an N-dimensional logical grid with named axes.
///
/// Devices are stored in row-major order of their mesh coordinates. A mesh of shape
/// `[2, 3]` with axes `["dp", "tp"]` holds six devices; the devices at `dp = 1` are the
/// last three.
#[derive(Clone, Debug)]
pub struct DeviceMesh<T> {
    /// Devices, row-major over the mesh coordinates
    devices: Vec<T>,
    /// Extent of every mesh axis
    shape: Vec<usize>,
    /// Position of every named axis in `shape`
    dims: HashMap<MeshDim, usize>,
}

/// Errors raised by [`DeviceMeshBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceMeshError {
    /// An axis name is mapped to a missing or already used position.
    #[error("invalid mesh dimension: {0}")]
    InvalidDimension(String),
    /// The axes or the devices do not cover the mesh shape.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
}

impl<T> DeviceMesh<T> {
    /// Devices, in row-major order of the mesh coordinates.
    pub fn devices(&self) -> &[T] {
        &self.devices
    }

    /// Shape of the logical mesh.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of devices along a mesh dimension.
    pub fn dim_size(&self, dim: &MeshDim) -> Option<usize> {
        self.dims.get(dim).map(|&idx| self.shape[idx])
    }

    /// Devices whose coordinate along `dim` equals `coord`.
    ///
    /// A shard placed at `coord` lives on all of them, replicated across the other mesh
    /// dimensions.
    pub fn devices_at(&self, dim: &MeshDim, coord: usize) -> Vec<&T> {
        let Some(&idx) = self.dims.get(dim) else {
            return Vec::new();
        };
        let inner = self.shape[idx + 1..].iter().product::<usize>();
        let extent = self.shape[idx];

        self.devices
            .iter()
            .enumerate()
            .filter(|(i, _)| (i / inner) % extent == coord)
            .map(|(_, device)| device)
            .collect()
    }
}

/// Builder for a [`DeviceMesh`].
///
/// # Example
///
/// ```rust
/// use burn_repeat::sharding::{DeviceMeshBuilder, MeshDim};
///
/// let mesh = DeviceMeshBuilder::new(vec![0, 1, 2, 3], [2, 2])
///     .with_dim(0, MeshDim::new("data"))
///     .with_dim(1, MeshDim::new("model"))
///     .build()
///     .unwrap();
///
/// assert_eq!(mesh.dim_size(&MeshDim::new("data")), Some(2));
/// ```
#[derive(Clone, Debug)]
pub struct DeviceMeshBuilder<T> {
    devices: Vec<T>,
    shape: Vec<usize>,
    dims: HashMap<MeshDim, usize>,
}

impl<T> DeviceMeshBuilder<T> {
    /// Starts a mesh of the given shape over `devices`.
    pub fn new<S: Into<Vec<usize>>>(devices: Vec<T>, shape: S) -> Self {
        Self {
            devices,
            shape: shape.into(),
            dims: HashMap::new(),
        }
    }

    /// Names the mesh axis at position `idx`.
    ///
    /// Reusing a name remaps it; the previous position is left unnamed.
    pub fn with_dim(mut self, idx: usize, dim: MeshDim) -> Self {
        self.dims.insert(dim, idx);
        self
    }

    /// Builds the mesh.
    ///
    /// Every axis must be named exactly once, hold at least one device, and the device count
    /// must match the shape.
    pub fn build(self) -> Result<DeviceMesh<T>, DeviceMeshError> {
        self.check_dims()?;

        if let Some(idx) = self.shape.iter().position(|&size| size == 0) {
            return Err(DeviceMeshError::InvalidMesh(format!(
                "Mesh dimension {idx} has no devices in shape {:?}",
                self.shape
            )));
        }

        let expected_devices = self.shape.iter().product::<usize>();
        if self.devices.len() != expected_devices {
            return Err(DeviceMeshError::InvalidMesh(format!(
                "Device count ({}) doesn't match mesh shape {:?}",
                self.devices.len(),
                self.shape,
            )));
        }

        Ok(DeviceMesh {
            devices: self.devices,
            shape: self.shape,
            dims: self.dims,
        })
    }

    fn check_dims(&self) -> Result<(), DeviceMeshError> {
        let ndim = self.shape.len();
        let mut seen = HashSet::new();

        for &idx in self.dims.values() {
            if idx >= ndim {
                return Err(DeviceMeshError::InvalidDimension(format!(
                    "Index {} exceeds mesh shape {:?}",
                    idx, self.shape
                )));
            }
            if !seen.insert(idx) {
                return Err(DeviceMeshError::InvalidDimension(format!(
                    "Dimension {idx} already mapped"
                )));
            }
        }

        if seen.len() != ndim {
            return Err(DeviceMeshError::InvalidMesh(format!(
                "Not all mesh dimensions are mapped. Got {}, expected {}",
                seen.len(),
                ndim
            )));
        }

        Ok(())
    }
}
