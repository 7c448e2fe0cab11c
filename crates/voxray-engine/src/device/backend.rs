use crate::render::pack::PackedScene;

use super::error::DispatchError;

/// `@group(0)` bindings every kernel must declare, with the role each one plays.
///
/// Byte layouts are documented on the types in `render::pack`.
pub const KERNEL_BINDINGS: [(u32, &str); 6] = [
    (0, "accumulation buffer"),
    (1, "scene header"),
    (2, "scene cells"),
    (3, "material palette"),
    (4, "camera"),
    (5, "frame parameters"),
];

/// The device side of a render: buffers, dispatch, and readback.
///
/// [`GpuContext`](super::GpuContext) is the production implementation. Every
/// method blocks until the device has finished the requested work.
pub trait ComputeBackend {
    /// Binds a zeroed accumulation buffer of `width * height` pixels.
    ///
    /// Rebinding replaces the previous buffer; binding the same size again reuses it.
    fn bind_accumulation(&mut self, width: u32, height: u32) -> Result<(), DispatchError>;

    /// Zeroes the bound accumulation buffer.
    fn clear_accumulation(&mut self) -> Result<(), DispatchError>;

    /// Uploads scene header, cells, palette, and camera.
    fn upload_scene(&mut self, scene: &PackedScene) -> Result<(), DispatchError>;

    /// Runs one 1-D kernel invocation over `work_items` and waits for completion.
    ///
    /// `sample_index` is handed to the kernel through the frame parameters.
    fn dispatch(&mut self, work_items: u32, sample_index: u32) -> Result<(), DispatchError>;

    /// Copies the accumulation buffer back to the host.
    fn read_accumulation(&mut self) -> Result<Vec<[f32; 4]>, DispatchError>;

    /// Releases kernel, queue, device, then buffers.
    fn teardown(&mut self);
}
