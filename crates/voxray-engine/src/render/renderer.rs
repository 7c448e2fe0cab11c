use std::path::Path;

use crate::device::{ComputeBackend, DispatchError};
use crate::scene::{Camera, Material, MaterialId, MaterialPalette, SceneStore};

use super::error::{RenderError, RenderResult};
use super::image::{Image, RadianceBuffer};
use super::pack::PackedScene;
use super::writer::ImageWriter;

/// Progressive voxel renderer.
///
/// Owns the scene, palette, and camera, and drives a [`ComputeBackend`] through
/// the sample-accumulation loop:
/// - validate the scene against the palette, then the camera
/// - upload the packed scene and clear the accumulator
/// - dispatch once per sample, each pass after the previous one completed
/// - read the accumulator back and tone map it
///
/// Every entry point takes `&mut self`, so a render has exclusive use of its
/// inputs and the device for its whole duration.
pub struct Renderer<B: ComputeBackend> {
    backend: B,
    palette: MaterialPalette,
    scene: Option<SceneStore>,
    camera: Camera,
    image_size: Option<(u32, u32)>,

    /// Samples in the device accumulator that [`refine`](Self::refine) may extend.
    /// Cleared by any configuration change or failed pass.
    accumulated: Option<u32>,
}

impl<B: ComputeBackend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            palette: MaterialPalette::new(),
            scene: None,
            camera: Camera::default(),
            image_size: None,
            accumulated: None,
        }
    }

    // ── configuration ─────────────────────────────────────────────────────

    /// Binds a zeroed `width * height` accumulator on the device.
    ///
    /// Configuring the same size again reuses the existing buffer.
    pub fn configure_image(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::invalid_argument(format!(
                "image dimensions must be > 0, got {width}x{height}"
            )));
        }
        if u32::try_from(width as u64 * height as u64).is_err() {
            return Err(RenderError::invalid_argument(format!(
                "{width}x{height} exceeds the work range of one dispatch"
            )));
        }

        self.accumulated = None;
        self.image_size = None;
        self.backend.bind_accumulation(width, height)?;
        self.image_size = Some((width, height));
        log::debug!("configured {width}x{height} image");
        Ok(())
    }

    pub fn configure_scene(&mut self, scene: SceneStore) {
        self.accumulated = None;
        self.scene = Some(scene);
    }

    pub fn configure_camera(&mut self, camera: Camera) {
        self.accumulated = None;
        self.camera = camera;
    }

    /// Appends `material` to the palette; the returned id never changes.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.accumulated = None;
        self.palette.add(material)
    }

    #[inline]
    pub fn palette(&self) -> &MaterialPalette {
        &self.palette
    }

    #[inline]
    pub fn scene(&self) -> Option<&SceneStore> {
        self.scene.as_ref()
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    /// Samples accumulated by the last successful render or refinement.
    #[inline]
    pub fn accumulated_samples(&self) -> Option<u32> {
        self.accumulated
    }

    // ── rendering ─────────────────────────────────────────────────────────

    /// Renders `samples` passes from a cleared accumulator and tone maps the result.
    pub fn render(&mut self, samples: u32, verbose: bool) -> RenderResult<Image> {
        let radiance = self.render_radiance(samples, verbose)?;
        radiance.tone_map(self.camera.exposure)
    }

    /// Like [`render`](Self::render) but returns the raw per-pixel sums.
    pub fn render_radiance(&mut self, samples: u32, verbose: bool) -> RenderResult<RadianceBuffer> {
        if samples == 0 {
            return Err(RenderError::invalid_argument("sample count must be > 0"));
        }
        let (width, height) = self.image_size.ok_or(RenderError::NotConfigured("image"))?;
        let scene = self.scene.as_ref().ok_or(RenderError::NotConfigured("scene"))?;

        scene.validate(&self.palette)?;
        self.camera.validate()?;
        let packed = PackedScene::pack(scene, &self.palette, &self.camera);

        self.accumulated = None;
        log::debug!(
            "rendering {width}x{height}, {samples} sample(s), {} filled cell(s), {} material(s)",
            scene.filled_count(),
            self.palette.len()
        );

        self.backend
            .upload_scene(&packed)
            .and_then(|()| self.backend.clear_accumulation())
            .map_err(|e| dispatch_failed(e, verbose))?;

        self.accumulate(0, samples, verbose)?;
        self.accumulated = Some(samples);
        self.read_back(samples, verbose)
    }

    /// Adds `additional` passes on top of the previous render without clearing.
    ///
    /// Sample indices continue where the previous call stopped. The returned
    /// image covers all accumulated samples.
    pub fn refine(&mut self, additional: u32, verbose: bool) -> RenderResult<Image> {
        if additional == 0 {
            return Err(RenderError::invalid_argument("sample count must be > 0"));
        }
        let done = self
            .accumulated
            .ok_or(RenderError::NotConfigured("a completed render"))?;
        let total = done
            .checked_add(additional)
            .ok_or_else(|| RenderError::invalid_argument("total sample count overflows u32"))?;

        self.accumulated = None;
        self.accumulate(done, additional, verbose)?;
        self.accumulated = Some(total);

        let radiance = self.read_back(total, verbose)?;
        radiance.tone_map(self.camera.exposure)
    }

    /// Renders and hands the image to `writer`.
    pub fn render_to_file(
        &mut self,
        samples: u32,
        path: &Path,
        writer: &impl ImageWriter,
        verbose: bool,
    ) -> RenderResult<()> {
        let image = self.render(samples, verbose)?;
        writer.write(&image, path)?;
        if verbose {
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }

    /// Releases device resources. Later renders fail with a released-context error.
    pub fn teardown(&mut self) {
        self.accumulated = None;
        self.backend.teardown();
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Dispatches passes `start .. start + count`, one at a time.
    fn accumulate(&mut self, start: u32, count: u32, verbose: bool) -> RenderResult<()> {
        let (width, height) = self.image_size.ok_or(RenderError::NotConfigured("image"))?;
        let work_items = width * height;
        let level = if verbose { log::Level::Info } else { log::Level::Debug };

        for pass in 0..count {
            let index = start + pass;
            self.backend
                .dispatch(work_items, index)
                .map_err(|e| dispatch_failed(e, verbose))?;
            log::log!(level, "sample {}/{} done", pass + 1, count);
        }
        Ok(())
    }

    fn read_back(&mut self, samples: u32, verbose: bool) -> RenderResult<RadianceBuffer> {
        let (width, height) = self.image_size.ok_or(RenderError::NotConfigured("image"))?;
        let sums = self
            .backend
            .read_accumulation()
            .map_err(|e| dispatch_failed(e, verbose))?;

        let expected = width as usize * height as usize;
        if sums.len() != expected {
            let err = DispatchError::new(crate::device::DeviceStatus::BindingSizeMismatch {
                expected: expected as u64,
                actual: sums.len() as u64,
            });
            return Err(dispatch_failed(err, verbose));
        }

        Ok(RadianceBuffer { width, height, samples, sums })
    }
}

fn dispatch_failed(err: DispatchError, verbose: bool) -> RenderError {
    if verbose {
        log::error!("{}: {}", err.category.description(), err.status);
    }
    err.into()
}
