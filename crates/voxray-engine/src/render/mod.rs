//! Render loop and image output.
//!
//! The [`Renderer`] packs the scene data model into the device layout (see
//! [`pack`]), drives a [`ComputeBackend`](crate::device::ComputeBackend)
//! through the sample passes, and tone maps the read-back accumulator into an
//! 8-bit [`Image`].

mod error;
mod image;
pub mod pack;
mod renderer;
mod writer;

pub use error::{RenderError, RenderResult};
pub use image::{tone_map_channel, Image, RadianceBuffer, CHANNELS};
pub use renderer::Renderer;
pub use writer::{ImageFileWriter, ImageWriteError, ImageWriter};
