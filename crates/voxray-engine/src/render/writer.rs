use std::path::Path;

use thiserror::Error;

use super::image::Image;

#[derive(Error, Debug)]
pub enum ImageWriteError {
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image buffer does not match {width}x{height}")]
    BufferSize { width: u32, height: u32 },
}

/// Persists a finished image.
pub trait ImageWriter {
    fn write(&self, image: &Image, path: &Path) -> Result<(), ImageWriteError>;
}

/// Writes through the `image` crate; the encoding follows the file extension
/// (`.png`, `.bmp`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileWriter;

impl ImageWriter for ImageFileWriter {
    fn write(&self, img: &Image, path: &Path) -> Result<(), ImageWriteError> {
        let (width, height) = (img.width(), img.height());
        let buf = image::RgbImage::from_raw(width, height, img.as_bytes().to_vec())
            .ok_or(ImageWriteError::BufferSize { width, height })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        buf.save(path)?;
        log::debug!("wrote {width}x{height} image to {}", path.display());
        Ok(())
    }
}
