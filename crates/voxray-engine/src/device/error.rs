use std::fmt;

use thiserror::Error;

/// Upper bound on the build log carried by [`BuildError::Compile`].
pub const BUILD_LOG_CAP: usize = 1 << 20;

/// Failure while selecting a device or building the kernel program.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Enumeration returned nothing, or the selection policy declined every candidate.
    #[error("no compute device available")]
    NoDevice,

    /// The adapter refused to create a logical device.
    #[error("failed to create device: {0}")]
    DeviceRequest(String),

    /// The program source loader could not supply the source text.
    #[error("failed to load program source '{name}': {source}")]
    Source {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The program failed to parse or validate. `log` is the full compiler diagnostic.
    #[error("program build failed:\n{log}")]
    Compile { log: String },

    /// The program has no compute entry point with the requested name.
    #[error("program has no compute entry point named '{0}'")]
    MissingEntryPoint(String),

    /// The program does not declare a binding required by the packing contract.
    #[error("program does not declare @group(0) @binding({binding}) ({role})")]
    InterfaceMismatch { binding: u32, role: &'static str },
}

impl BuildError {
    /// Wraps compiler output, truncating it at [`BUILD_LOG_CAP`] on a char boundary.
    pub(crate) fn compile(mut log: String) -> Self {
        if log.len() > BUILD_LOG_CAP {
            let mut end = BUILD_LOG_CAP;
            while !log.is_char_boundary(end) {
                end -= 1;
            }
            log.truncate(end);
            log.push_str("\n[build log truncated]");
        }
        BuildError::Compile { log }
    }
}

/// Raw condition observed by the compute context when an operation could not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    /// A device allocation exceeded what the device can hold.
    OutOfDeviceMemory { requested: u64, limit: u64 },
    /// A host-side staging allocation failed.
    OutOfHostMemory { requested: usize },
    /// A dispatch was requested with no work items.
    ZeroWorkItems,
    /// The work range cannot be folded into the device's workgroup grid.
    WorkItemsExceedLimit { work_items: u64, limit: u64 },
    /// A buffer is larger than a single storage/uniform binding may be.
    BindingTooLarge { size: u64, limit: u64 },
    /// A kernel input has not been bound.
    MissingBinding(&'static str),
    /// The accumulation buffer does not hold one element per work item.
    BindingSizeMismatch { expected: u64, actual: u64 },
    /// The device was lost or the wait for completion failed.
    DeviceLost(String),
    /// Mapping the accumulation buffer for readback failed.
    MapFailed(String),
    /// The context has been torn down.
    Released,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::OutOfDeviceMemory { requested, limit } => {
                write!(f, "device allocation of {requested} bytes exceeds {limit} bytes")
            }
            DeviceStatus::OutOfHostMemory { requested } => {
                write!(f, "host allocation of {requested} bytes failed")
            }
            DeviceStatus::ZeroWorkItems => f.write_str("zero work items"),
            DeviceStatus::WorkItemsExceedLimit { work_items, limit } => {
                write!(f, "{work_items} work items exceed the device limit of {limit}")
            }
            DeviceStatus::BindingTooLarge { size, limit } => {
                write!(f, "binding of {size} bytes exceeds the {limit} byte binding limit")
            }
            DeviceStatus::MissingBinding(what) => write!(f, "{what} is not bound"),
            DeviceStatus::BindingSizeMismatch { expected, actual } => {
                write!(f, "accumulation buffer holds {actual} pixels, dispatch expects {expected}")
            }
            DeviceStatus::DeviceLost(msg) => write!(f, "device lost: {msg}"),
            DeviceStatus::MapFailed(msg) => write!(f, "buffer map failed: {msg}"),
            DeviceStatus::Released => f.write_str("compute context has been torn down"),
        }
    }
}

/// Closed classification of dispatch failures.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DispatchErrorCategory {
    ResourceExhaustion,
    InvalidArguments,
    InvalidWorkGeometry,
    UnsupportedConfiguration,
    HostAllocation,
    Other,
}

impl DispatchErrorCategory {
    /// Maps a raw status onto its category. Pure; no logging.
    pub fn classify(status: &DeviceStatus) -> Self {
        match status {
            DeviceStatus::OutOfDeviceMemory { .. } => Self::ResourceExhaustion,
            DeviceStatus::OutOfHostMemory { .. } => Self::HostAllocation,
            DeviceStatus::ZeroWorkItems | DeviceStatus::WorkItemsExceedLimit { .. } => {
                Self::InvalidWorkGeometry
            }
            DeviceStatus::BindingTooLarge { .. } => Self::UnsupportedConfiguration,
            DeviceStatus::MissingBinding(_) | DeviceStatus::BindingSizeMismatch { .. } => {
                Self::InvalidArguments
            }
            DeviceStatus::DeviceLost(_) | DeviceStatus::MapFailed(_) | DeviceStatus::Released => {
                Self::Other
            }
        }
    }

    /// Human-readable explanation, used by verbose rendering.
    pub fn description(self) -> &'static str {
        match self {
            Self::ResourceExhaustion => {
                "the device does not have enough resources to hold or run the kernel inputs"
            }
            Self::InvalidArguments => {
                "kernel arguments are missing or do not match the dispatch size"
            }
            Self::InvalidWorkGeometry => {
                "the requested work size cannot be expressed as a dispatch on this device"
            }
            Self::UnsupportedConfiguration => {
                "a buffer size or memory configuration is not supported by the device"
            }
            Self::HostAllocation => "the host failed to allocate memory for the operation",
            Self::Other => "the device failed for a reason outside the known categories",
        }
    }
}

impl fmt::Display for DispatchErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResourceExhaustion => "resource exhaustion",
            Self::InvalidArguments => "invalid arguments",
            Self::InvalidWorkGeometry => "invalid work geometry",
            Self::UnsupportedConfiguration => "unsupported configuration",
            Self::HostAllocation => "host allocation failure",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A dispatch (or dispatch-related buffer operation) the device could not carry out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dispatch failed ({category}): {status}")]
pub struct DispatchError {
    pub status: DeviceStatus,
    pub category: DispatchErrorCategory,
}

impl DispatchError {
    pub fn new(status: DeviceStatus) -> Self {
        let category = DispatchErrorCategory::classify(&status);
        Self { status, category }
    }
}

impl From<DeviceStatus> for DispatchError {
    fn from(status: DeviceStatus) -> Self {
        Self::new(status)
    }
}
