use super::select::{first_gpu, SelectionPolicy};

/// Initialization parameters for the compute context.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Backends enumerated when looking for a device.
    pub backends: wgpu::Backends,

    /// Picks one device from the enumeration.
    ///
    /// Injectable so that tests and headless hosts can pin a device deterministically.
    pub selection: SelectionPolicy,

    /// Limits requested from the adapter/device.
    ///
    /// The default keeps portability; raise storage binding limits for very large grids.
    pub required_limits: wgpu::Limits,

    /// Whether workgroup memory is zeroed before each dispatch.
    ///
    /// The built-in kernel does not use workgroup memory, so this is off by default.
    pub zero_initialize_workgroup_memory: bool,

    /// Debug label attached to the logical device.
    pub label: &'static str,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            selection: first_gpu,
            required_limits: wgpu::Limits::default(),
            zero_initialize_workgroup_memory: false,
            label: "voxray device",
        }
    }
}
