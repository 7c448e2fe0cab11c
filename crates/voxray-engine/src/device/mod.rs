//! Compute device management.
//!
//! This module is responsible for:
//! - enumerating devices and selecting one through an injectable policy
//! - building the trace kernel (host-side validation, then pipeline creation)
//! - owning device buffers, dispatching the kernel, and reading results back
//! - classifying dispatch failures into coarse categories

mod backend;
mod context;
mod error;
mod init;
mod program;
mod select;

pub use backend::{ComputeBackend, KERNEL_BINDINGS};
pub use context::{GpuContext, WORKGROUP_SIZE};
pub use error::{BuildError, DeviceStatus, DispatchError, DispatchErrorCategory, BUILD_LOG_CAP};
pub use init::ContextConfig;
pub use program::{
    EmbeddedSource, FileSource, KernelProgram, SourceLoader, BUILTIN_ENTRY_POINT, BUILTIN_KERNEL,
};
pub use select::{first_gpu, gpu_only, DeviceCandidate, DeviceClass, SelectionPolicy};
