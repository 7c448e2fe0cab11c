//! Voxray engine crate.
//!
//! GPU-dispatched progressive voxel renderer: a scene data model, the device
//! layout it is packed into, a compute context that runs the trace kernel, and
//! the sample-accumulation loop that turns passes into an image.

pub mod device;
pub mod logging;
pub mod render;
pub mod scene;

#[cfg(test)]
mod testing;

pub use device::{ComputeBackend, ContextConfig, EmbeddedSource, GpuContext, KernelProgram};
pub use render::{Image, ImageFileWriter, Renderer};
pub use scene::{Camera, Cell, Material, MaterialPalette, SceneStore};
