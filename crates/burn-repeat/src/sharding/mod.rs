//! Device meshes and the layout of arrays over them.

mod mesh;
mod spec;

pub use mesh::*;
pub use spec::*;
