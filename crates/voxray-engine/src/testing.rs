//! Recording [`ComputeBackend`] double for host-side tests.

use crate::device::{ComputeBackend, DeviceStatus, DispatchError};
use crate::render::pack::PackedScene;

/// CPU stand-in for the trace kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeKernel {
    /// Adds `[1, 1, 1, 1]` to every pixel per pass.
    AddOne,
    /// Adds `(bg_color, 1)` from the uploaded header, as if every ray missed.
    Background,
}

#[derive(Debug)]
pub(crate) struct FakeBackend {
    pub kernel: FakeKernel,
    pub dispatches: u32,
    pub sample_indices: Vec<u32>,
    /// Buffers currently held (accumulation and scene count one each).
    pub live_allocations: usize,
    pub total_allocations: usize,
    /// Fail the dispatch with this zero-based ordinal.
    pub fail_dispatch_at: Option<u32>,
    pub teardowns: u32,

    accum: Option<Vec<[f32; 4]>>,
    bg_color: Option<[f32; 3]>,
    released: bool,
}

impl FakeBackend {
    pub fn new(kernel: FakeKernel) -> Self {
        Self {
            kernel,
            dispatches: 0,
            sample_indices: Vec::new(),
            live_allocations: 0,
            total_allocations: 0,
            fail_dispatch_at: None,
            teardowns: 0,
            accum: None,
            bg_color: None,
            released: false,
        }
    }

    pub fn accumulation_len(&self) -> Option<usize> {
        self.accum.as_ref().map(Vec::len)
    }

    fn check_live(&self) -> Result<(), DispatchError> {
        if self.released {
            return Err(DeviceStatus::Released.into());
        }
        Ok(())
    }

    fn allocate(&mut self) {
        self.live_allocations += 1;
        self.total_allocations += 1;
    }
}

impl ComputeBackend for FakeBackend {
    fn bind_accumulation(&mut self, width: u32, height: u32) -> Result<(), DispatchError> {
        self.check_live()?;
        let len = width as usize * height as usize;
        match self.accum.as_mut() {
            Some(acc) if acc.len() == len => acc.fill([0.0; 4]),
            Some(acc) => {
                *acc = vec![[0.0; 4]; len];
                self.live_allocations -= 1;
                self.allocate();
            }
            None => {
                self.accum = Some(vec![[0.0; 4]; len]);
                self.allocate();
            }
        }
        Ok(())
    }

    fn clear_accumulation(&mut self) -> Result<(), DispatchError> {
        self.check_live()?;
        let acc = self
            .accum
            .as_mut()
            .ok_or(DeviceStatus::MissingBinding("accumulation buffer"))?;
        acc.fill([0.0; 4]);
        Ok(())
    }

    fn upload_scene(&mut self, scene: &PackedScene) -> Result<(), DispatchError> {
        self.check_live()?;
        if self.bg_color.is_none() {
            self.allocate();
        }
        self.bg_color = Some(scene.header.bg_color);
        Ok(())
    }

    fn dispatch(&mut self, work_items: u32, sample_index: u32) -> Result<(), DispatchError> {
        self.check_live()?;
        if work_items == 0 {
            return Err(DeviceStatus::ZeroWorkItems.into());
        }
        let bg = self.bg_color.ok_or(DeviceStatus::MissingBinding("scene"))?;
        let acc = self
            .accum
            .as_mut()
            .ok_or(DeviceStatus::MissingBinding("accumulation buffer"))?;
        if acc.len() != work_items as usize {
            return Err(DeviceStatus::BindingSizeMismatch {
                expected: work_items as u64,
                actual: acc.len() as u64,
            }
            .into());
        }
        if self.fail_dispatch_at == Some(self.dispatches) {
            return Err(DeviceStatus::OutOfDeviceMemory { requested: 1 << 40, limit: 1 << 30 }.into());
        }

        let add = match self.kernel {
            FakeKernel::AddOne => [1.0; 4],
            FakeKernel::Background => [bg[0], bg[1], bg[2], 1.0],
        };
        for px in acc.iter_mut() {
            for (c, a) in px.iter_mut().zip(add) {
                *c += a;
            }
        }

        self.dispatches += 1;
        self.sample_indices.push(sample_index);
        Ok(())
    }

    fn read_accumulation(&mut self) -> Result<Vec<[f32; 4]>, DispatchError> {
        self.check_live()?;
        self.accum
            .clone()
            .ok_or_else(|| DeviceStatus::MissingBinding("accumulation buffer").into())
    }

    fn teardown(&mut self) {
        self.teardowns += 1;
        if self.released {
            return;
        }
        self.released = true;
        self.accum = None;
        self.bg_color = None;
        self.live_allocations = 0;
    }
}
