use std::sync::mpsc;

use wgpu::util::DeviceExt;

use crate::render::pack::{FrameParams, GpuCamera, PackedScene, SceneHeader};

use super::backend::ComputeBackend;
use super::error::{BuildError, DeviceStatus, DispatchError};
use super::init::ContextConfig;
use super::program::{check_program, KernelProgram, SourceLoader};
use super::select::DeviceCandidate;

/// Threads per workgroup. Must match `@workgroup_size` in the kernel.
pub const WORKGROUP_SIZE: u32 = 64;

/// Bytes per accumulation element (`vec4<f32>`).
const ACCUM_STRIDE: u64 = 16;

/// Owns the selected device, the built kernel, and the buffers bound to it.
///
/// This type is the production [`ComputeBackend`]:
/// - selects one adapter through the configured policy and opens a device/queue
/// - builds the kernel after validating it on the host
/// - owns the accumulation, scene, and frame-parameter buffers
/// - dispatches synchronously and reads the accumulator back
///
/// Resources are released by [`teardown`](ComputeBackend::teardown) or on drop,
/// whichever comes first.
pub struct GpuContext {
    /// `None` once torn down.
    live: Option<Live>,

    /// Device chosen at construction.
    candidate: DeviceCandidate,
}

struct Live {
    bind_group: Option<wgpu::BindGroup>,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    queue: wgpu::Queue,
    device: wgpu::Device,
    limits: wgpu::Limits,
    frame_ubo: wgpu::Buffer,
    accumulation: Option<Accumulation>,
    scene: Option<SceneBuffers>,
}

struct Accumulation {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl Accumulation {
    #[inline]
    fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

struct SceneBuffers {
    header: wgpu::Buffer,
    cells: wgpu::Buffer,
    materials: wgpu::Buffer,
    camera: wgpu::Buffer,
}

impl SceneBuffers {
    fn destroy(self) {
        self.header.destroy();
        self.cells.destroy();
        self.materials.destroy();
        self.camera.destroy();
    }
}

impl GpuContext {
    /// Selects a device and builds `program` on it.
    ///
    /// The program is parsed and validated before any device is opened, so build
    /// failures do not depend on the hardware present.
    pub async fn new(
        program: &KernelProgram,
        loader: &dyn SourceLoader,
        config: ContextConfig,
    ) -> Result<Self, BuildError> {
        let source = loader.load(&program.source_name)?;
        check_program(&source, &program.entry_point)?;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let adapters = instance.enumerate_adapters(config.backends).await;
        let candidates: Vec<DeviceCandidate> = adapters
            .iter()
            .map(|a| DeviceCandidate::from_info(&a.get_info()))
            .collect();
        log::debug!("enumerated {} compute device(s)", candidates.len());

        let index = (config.selection)(&candidates).ok_or(BuildError::NoDevice)?;
        let candidate = candidates.get(index).cloned().ok_or(BuildError::NoDevice)?;
        let adapter = adapters.into_iter().nth(index).ok_or(BuildError::NoDevice)?;
        log::info!(
            "using {} ({:?}, {})",
            candidate.name,
            candidate.class,
            candidate.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(config.label),
                required_features: wgpu::Features::empty(),
                required_limits: config.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| BuildError::DeviceRequest(e.to_string()))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("voxray kernel"),
            source: wgpu::ShaderSource::Wgsl(source.as_str().into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("voxray kernel bgl"),
            entries: &[
                storage_entry(0, false),
                uniform_entry(1),
                storage_entry(2, true),
                storage_entry(3, true),
                uniform_entry(4),
                uniform_entry(5),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("voxray kernel pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("voxray kernel pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(program.entry_point.as_str()),
            compilation_options: wgpu::PipelineCompilationOptions {
                zero_initialize_workgroup_memory: config.zero_initialize_workgroup_memory,
                ..Default::default()
            },
            cache: None,
        });

        let frame_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxray frame ubo"),
            size: std::mem::size_of::<FrameParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let limits = device.limits();
        log::debug!("kernel '{}' built", program.entry_point);

        Ok(Self {
            live: Some(Live {
                bind_group: None,
                pipeline,
                bind_group_layout,
                queue,
                device,
                limits,
                frame_ubo,
                accumulation: None,
                scene: None,
            }),
            candidate,
        })
    }

    /// Blocking wrapper around [`new`](Self::new).
    pub fn new_blocking(
        program: &KernelProgram,
        loader: &dyn SourceLoader,
        config: ContextConfig,
    ) -> Result<Self, BuildError> {
        pollster::block_on(Self::new(program, loader, config))
    }

    /// The device selected at construction.
    pub fn device_info(&self) -> &DeviceCandidate {
        &self.candidate
    }

    /// Whether [`teardown`](ComputeBackend::teardown) has run.
    pub fn is_released(&self) -> bool {
        self.live.is_none()
    }

    fn live(&mut self) -> Result<&mut Live, DispatchError> {
        self.live.as_mut().ok_or_else(|| DeviceStatus::Released.into())
    }
}

impl Live {
    /// Checks a buffer size against the device's binding and allocation limits.
    fn check_binding(&self, bytes: u64) -> Result<(), DispatchError> {
        let binding_limit = u64::from(self.limits.max_storage_buffer_binding_size);
        let buffer_limit = self.limits.max_buffer_size;
        if bytes > buffer_limit {
            return Err(DeviceStatus::OutOfDeviceMemory { requested: bytes, limit: buffer_limit }.into());
        }
        if bytes > binding_limit {
            return Err(DeviceStatus::BindingTooLarge { size: bytes, limit: binding_limit }.into());
        }
        Ok(())
    }

    fn wait(&self) -> Result<(), DispatchError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| DeviceStatus::DeviceLost(e.to_string()).into())
    }

    fn clear(&self) -> Result<(), DispatchError> {
        let acc = self
            .accumulation
            .as_ref()
            .ok_or(DeviceStatus::MissingBinding("accumulation buffer"))?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("voxray clear encoder"),
        });
        encoder.clear_buffer(&acc.buffer, 0, None);
        self.queue.submit(std::iter::once(encoder.finish()));
        self.wait()
    }

    fn ensure_bind_group(&mut self) -> Result<(), DispatchError> {
        if self.bind_group.is_some() {
            return Ok(());
        }
        let acc = self
            .accumulation
            .as_ref()
            .ok_or(DeviceStatus::MissingBinding("accumulation buffer"))?;
        let scene = self.scene.as_ref().ok_or(DeviceStatus::MissingBinding("scene"))?;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("voxray kernel bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: acc.buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: scene.header.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: scene.cells.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: scene.materials.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 4, resource: scene.camera.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 5, resource: self.frame_ubo.as_entire_binding() },
            ],
        });
        self.bind_group = Some(bind_group);
        Ok(())
    }

    /// Folds `work_items` into an (x, y) workgroup grid within the per-dimension limit.
    fn workgroup_grid(&self, work_items: u32) -> Result<(u32, u32), DispatchError> {
        let max = self.limits.max_compute_workgroups_per_dimension.max(1);
        fold_workgroups(work_items, max)
    }
}

/// Splits `ceil(work_items / WORKGROUP_SIZE)` workgroups over x and y.
pub(crate) fn fold_workgroups(work_items: u32, max_per_dim: u32) -> Result<(u32, u32), DispatchError> {
    if work_items == 0 {
        return Err(DeviceStatus::ZeroWorkItems.into());
    }
    let groups = work_items.div_ceil(WORKGROUP_SIZE);
    if groups <= max_per_dim {
        return Ok((groups, 1));
    }
    let y = groups.div_ceil(max_per_dim);
    if y > max_per_dim {
        return Err(DeviceStatus::WorkItemsExceedLimit {
            work_items: work_items as u64,
            limit: max_per_dim as u64 * max_per_dim as u64 * WORKGROUP_SIZE as u64,
        }
        .into());
    }
    Ok((max_per_dim, y))
}

impl ComputeBackend for GpuContext {
    fn bind_accumulation(&mut self, width: u32, height: u32) -> Result<(), DispatchError> {
        let live = self.live()?;
        let pixels = width as u64 * height as u64;
        let bytes = pixels * ACCUM_STRIDE;
        live.check_binding(bytes)?;

        if let Some(acc) = live.accumulation.as_mut().filter(|a| a.pixels() == pixels) {
            acc.width = width;
            acc.height = height;
            return live.clear();
        }

        if let Some(old) = live.accumulation.take() {
            old.buffer.destroy();
        }
        live.bind_group = None;

        // New buffers are zero-initialized by wgpu.
        let buffer = live.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxray accumulation"),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        live.accumulation = Some(Accumulation { buffer, width, height });
        log::debug!("bound {width}x{height} accumulation buffer ({bytes} bytes)");
        Ok(())
    }

    fn clear_accumulation(&mut self) -> Result<(), DispatchError> {
        self.live()?.clear()
    }

    fn upload_scene(&mut self, scene: &PackedScene) -> Result<(), DispatchError> {
        let live = self.live()?;
        let cell_bytes = scene.cell_bytes();
        let material_bytes = scene.material_bytes();
        live.check_binding(cell_bytes.len() as u64)?;
        live.check_binding(material_bytes.len() as u64)?;

        let reusable = live.scene.as_ref().is_some_and(|s| {
            s.cells.size() == cell_bytes.len() as u64
                && s.materials.size() == material_bytes.len() as u64
        });

        if reusable {
            if let Some(bufs) = live.scene.as_ref() {
                live.queue.write_buffer(&bufs.header, 0, bytemuck::bytes_of(&scene.header));
                live.queue.write_buffer(&bufs.cells, 0, cell_bytes);
                live.queue.write_buffer(&bufs.materials, 0, material_bytes);
                live.queue.write_buffer(&bufs.camera, 0, bytemuck::bytes_of(&scene.camera));
            }
        } else {
            if let Some(old) = live.scene.take() {
                old.destroy();
            }
            live.bind_group = None;

            let device = &live.device;
            let init = |label: &'static str, contents: &[u8], usage: wgpu::BufferUsages| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: usage | wgpu::BufferUsages::COPY_DST,
                })
            };
            live.scene = Some(SceneBuffers {
                header: init(
                    "voxray scene header",
                    bytemuck::bytes_of::<SceneHeader>(&scene.header),
                    wgpu::BufferUsages::UNIFORM,
                ),
                cells: init("voxray scene cells", cell_bytes, wgpu::BufferUsages::STORAGE),
                materials: init("voxray materials", material_bytes, wgpu::BufferUsages::STORAGE),
                camera: init(
                    "voxray camera",
                    bytemuck::bytes_of::<GpuCamera>(&scene.camera),
                    wgpu::BufferUsages::UNIFORM,
                ),
            });
        }

        live.queue.submit(std::iter::empty());
        live.wait()
    }

    fn dispatch(&mut self, work_items: u32, sample_index: u32) -> Result<(), DispatchError> {
        let live = self.live()?;
        let (gx, gy) = live.workgroup_grid(work_items)?;

        let acc = live
            .accumulation
            .as_ref()
            .ok_or(DeviceStatus::MissingBinding("accumulation buffer"))?;
        if acc.pixels() != work_items as u64 {
            return Err(DeviceStatus::BindingSizeMismatch {
                expected: work_items as u64,
                actual: acc.pixels(),
            }
            .into());
        }
        let params = FrameParams {
            width: acc.width,
            height: acc.height,
            sample_index,
            work_items,
        };

        live.ensure_bind_group()?;
        let Some(bind_group) = live.bind_group.as_ref() else {
            return Err(DeviceStatus::MissingBinding("bind group").into());
        };

        live.queue.write_buffer(&live.frame_ubo, 0, bytemuck::bytes_of(&params));

        let mut encoder = live.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("voxray dispatch encoder"),
        });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("voxray trace pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&live.pipeline);
            cpass.set_bind_group(0, bind_group, &[]);
            cpass.dispatch_workgroups(gx, gy, 1);
        }
        live.queue.submit(std::iter::once(encoder.finish()));
        live.wait()
    }

    fn read_accumulation(&mut self) -> Result<Vec<[f32; 4]>, DispatchError> {
        let live = self.live()?;
        let acc = live
            .accumulation
            .as_ref()
            .ok_or(DeviceStatus::MissingBinding("accumulation buffer"))?;
        let pixels = acc.pixels() as usize;
        let bytes = acc.pixels() * ACCUM_STRIDE;

        let mut out: Vec<[f32; 4]> = Vec::new();
        out.try_reserve_exact(pixels)
            .map_err(|_| DeviceStatus::OutOfHostMemory { requested: bytes as usize })?;

        let staging = live.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxray readback"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = live.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("voxray readback encoder"),
        });
        encoder.copy_buffer_to_buffer(&acc.buffer, 0, &staging, 0, bytes);
        live.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        live.wait()?;
        rx.recv()
            .map_err(|_| DeviceStatus::MapFailed("map callback was dropped".into()))?
            .map_err(|e| DeviceStatus::MapFailed(e.to_string()))?;

        {
            let view = slice.get_mapped_range();
            out.extend(
                view.chunks_exact(ACCUM_STRIDE as usize)
                    .map(bytemuck::pod_read_unaligned::<[f32; 4]>),
            );
        }
        staging.unmap();
        staging.destroy();

        Ok(out)
    }

    fn teardown(&mut self) {
        let Some(live) = self.live.take() else {
            log::warn!("teardown called on a released compute context");
            return;
        };

        let Live {
            bind_group,
            pipeline,
            bind_group_layout,
            queue,
            device,
            limits: _,
            frame_ubo,
            accumulation,
            scene,
        } = live;

        // Kernel, then queue, then device, then the buffers it owned.
        drop(bind_group);
        drop(pipeline);
        drop(bind_group_layout);
        drop(queue);
        device.destroy();
        drop(device);

        frame_ubo.destroy();
        if let Some(acc) = accumulation {
            acc.buffer.destroy();
        }
        if let Some(scene) = scene {
            scene.destroy();
        }

        log::debug!("compute context on {} released", self.candidate.name);
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        if self.live.is_some() {
            self.teardown();
        }
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DispatchErrorCategory;

    // ── workgroup folding ─────────────────────────────────────────────────

    #[test]
    fn small_ranges_use_one_row() {
        assert_eq!(fold_workgroups(1, 65_535).unwrap(), (1, 1));
        assert_eq!(fold_workgroups(64, 65_535).unwrap(), (1, 1));
        assert_eq!(fold_workgroups(65, 65_535).unwrap(), (2, 1));
    }

    #[test]
    fn large_ranges_fold_into_rows() {
        // 3840x2160 needs 129_600 groups.
        let (x, y) = fold_workgroups(3840 * 2160, 65_535).unwrap();
        assert_eq!((x, y), (65_535, 2));
        assert!(x as u64 * y as u64 * WORKGROUP_SIZE as u64 >= 3840 * 2160);
    }

    #[test]
    fn zero_work_items_is_invalid_geometry() {
        let err = fold_workgroups(0, 65_535).unwrap_err();
        assert_eq!(err.status, DeviceStatus::ZeroWorkItems);
        assert_eq!(err.category, DispatchErrorCategory::InvalidWorkGeometry);
    }

    #[test]
    fn unfoldable_range_is_invalid_geometry() {
        let err = fold_workgroups(u32::MAX, 4).unwrap_err();
        assert!(matches!(err.status, DeviceStatus::WorkItemsExceedLimit { limit: 1024, .. }));
        assert_eq!(err.category, DispatchErrorCategory::InvalidWorkGeometry);
    }
}
