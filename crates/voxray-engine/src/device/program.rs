use std::path::PathBuf;

use super::backend::KERNEL_BINDINGS;
use super::error::BuildError;

/// Name under which the built-in kernel is served by [`EmbeddedSource`].
pub const BUILTIN_KERNEL: &str = "voxel_trace.wgsl";

/// Entry point of the built-in kernel.
pub const BUILTIN_ENTRY_POINT: &str = "trace";

const VOXEL_TRACE_WGSL: &str = include_str!("../render/shaders/voxel_trace.wgsl");

/// Supplies kernel source text by name.
pub trait SourceLoader {
    fn load(&self, name: &str) -> Result<String, BuildError>;
}

/// Serves kernels compiled into the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedSource;

impl SourceLoader for EmbeddedSource {
    fn load(&self, name: &str) -> Result<String, BuildError> {
        match name {
            BUILTIN_KERNEL => Ok(VOXEL_TRACE_WGSL.to_owned()),
            _ => Err(BuildError::Source {
                name: name.to_owned(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no embedded kernel with this name",
                ),
            }),
        }
    }
}

/// Loads kernels from files below a root directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceLoader for FileSource {
    fn load(&self, name: &str) -> Result<String, BuildError> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).map_err(|source| BuildError::Source {
            name: path.display().to_string(),
            source,
        })
    }
}

/// Identifies a kernel: which source to load and which entry point to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelProgram {
    pub source_name: String,
    pub entry_point: String,
}

impl KernelProgram {
    pub fn new(source_name: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            entry_point: entry_point.into(),
        }
    }

    /// The path tracer shipped with the crate.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_KERNEL, BUILTIN_ENTRY_POINT)
    }
}

impl Default for KernelProgram {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Parses and validates WGSL, then checks the entry point and the binding interface.
///
/// Runs entirely on the host, so a broken program never reaches the device.
pub(crate) fn check_program(source: &str, entry_point: &str) -> Result<(), BuildError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| BuildError::compile(err.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    if let Err(err) = validator.validate(&module) {
        return Err(BuildError::compile(error_chain(&err)));
    }

    let has_entry = module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry_point && ep.stage == naga::ShaderStage::Compute);
    if !has_entry {
        return Err(BuildError::MissingEntryPoint(entry_point.to_owned()));
    }

    for &(binding, role) in KERNEL_BINDINGS.iter() {
        let declared = module.global_variables.iter().any(|(_, var)| {
            var.binding
                .as_ref()
                .is_some_and(|rb| rb.group == 0 && rb.binding == binding)
        });
        if !declared {
            return Err(BuildError::InterfaceMismatch { binding, role });
        }
    }

    Ok(())
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut log = err.to_string();
    let mut cur = err.source();
    while let Some(cause) = cur {
        log.push_str("\n  caused by: ");
        log.push_str(&cause.to_string());
        cur = cause.source();
    }
    log
}
