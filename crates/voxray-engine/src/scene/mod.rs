//! Scene data model: voxel grid, material palette, and camera.
//!
//! These are plain host-side containers. Packing them into the device layout
//! happens in `render::pack`.

mod camera;
mod grid;
mod material;

pub use camera::Camera;
pub use grid::{Cell, SceneStore, EMPTY_CELL};
pub use material::{Material, MaterialId, MaterialKind, MaterialPalette};
