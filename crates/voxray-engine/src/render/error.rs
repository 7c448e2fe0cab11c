use thiserror::Error;

use crate::device::{BuildError, DispatchError};

use super::writer::ImageWriteError;

/// Anything that can stop a render from producing an image.
///
/// No variant is ever paired with a partial image: a render either returns a
/// complete [`Image`](super::Image) or one of these.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A cell references a palette entry that does not exist. Detected before any dispatch.
    #[error(
        "cell {cell} holds value {value}, which refers to material {} but the palette has {palette_len} entries",
        .value - 1
    )]
    InvalidScene {
        cell: usize,
        value: i32,
        palette_len: usize,
    },

    /// The host could not allocate memory for a step that runs off the device.
    #[error("failed to allocate {requested} bytes on the host")]
    HostAllocation { requested: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required configuration step was skipped.
    #[error("renderer is not configured: {0} must be set before rendering")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Write(#[from] ImageWriteError),
}

impl RenderError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        RenderError::InvalidArgument(msg.into())
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
