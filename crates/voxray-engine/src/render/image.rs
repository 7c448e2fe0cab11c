use super::error::{RenderError, RenderResult};

/// Bytes per pixel in an [`Image`] (8-bit RGB).
pub const CHANNELS: usize = 3;

const GAMMA: f32 = 1.0 / 2.2;

/// Final 8-bit RGB image, row-major, top row first.
///
/// Owned by the caller; shares nothing with device memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Image {
    pub(crate) fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * CHANNELS);
        Self { width, height, data }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGB of pixel `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

/// Read-back accumulator: per-pixel radiance sums over `samples` passes.
///
/// `xyz` of each entry is the summed radiance; `w` is whatever the kernel
/// accumulates there (the built-in kernel adds one per pass).
#[derive(Debug, Clone, PartialEq)]
pub struct RadianceBuffer {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub sums: Vec<[f32; 4]>,
}

impl RadianceBuffer {
    /// Mean radiance of pixel `(x, y)`.
    pub fn mean(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        if x >= self.width || y >= self.height || self.samples == 0 {
            return None;
        }
        let s = self.sums[y as usize * self.width as usize + x as usize];
        let n = self.samples as f32;
        Some([s[0] / n, s[1] / n, s[2] / n])
    }

    /// Averages, scales by `exposure`, and tone maps into an 8-bit image.
    pub fn tone_map(&self, exposure: f32) -> RenderResult<Image> {
        if self.samples == 0 {
            return Err(RenderError::invalid_argument("cannot tone map zero samples"));
        }

        let len = self.sums.len() * CHANNELS;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| RenderError::HostAllocation { requested: len })?;

        let inv = 1.0 / self.samples as f32;
        for s in &self.sums {
            for &c in &s[..CHANNELS] {
                data.push(tone_map_channel(c * inv, exposure));
            }
        }

        Ok(Image::from_raw(self.width, self.height, data))
    }
}

/// Maps one mean radiance channel to display range.
///
/// `1 - exp(-radiance * exposure)`, gamma encoded with 1/2.2, scaled to 0..=255.
/// Non-finite or negative input maps to 0.
pub fn tone_map_channel(radiance: f32, exposure: f32) -> u8 {
    let v = radiance * exposure;
    if !v.is_finite() || v <= 0.0 {
        return 0;
    }
    let mapped = 1.0 - (-v).exp();
    (mapped.powf(GAMMA).clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(w: u32, h: u32, samples: u32, value: [f32; 4]) -> RadianceBuffer {
        RadianceBuffer {
            width: w,
            height: h,
            samples,
            sums: vec![value; (w * h) as usize],
        }
    }

    // ── tone_map_channel ──────────────────────────────────────────────────

    #[test]
    fn black_and_invalid_inputs_map_to_zero() {
        assert_eq!(tone_map_channel(0.0, 1.0), 0);
        assert_eq!(tone_map_channel(-3.0, 1.0), 0);
        assert_eq!(tone_map_channel(f32::NAN, 1.0), 0);
        assert_eq!(tone_map_channel(f32::INFINITY, 1.0), 0);
    }

    #[test]
    fn bright_input_saturates() {
        assert_eq!(tone_map_channel(1000.0, 1.0), 255);
    }

    #[test]
    fn mapping_is_monotonic_in_exposure() {
        let mut last = 0;
        for e in [0.1, 0.5, 1.0, 2.0, 4.0] {
            let v = tone_map_channel(0.3, e);
            assert!(v >= last);
            last = v;
        }
    }

    // ── RadianceBuffer ────────────────────────────────────────────────────

    #[test]
    fn tone_map_averages_over_samples() {
        let one = buffer(2, 1, 1, [0.5, 0.5, 0.5, 1.0]).tone_map(1.0).unwrap();
        let four = buffer(2, 1, 4, [2.0, 2.0, 2.0, 4.0]).tone_map(1.0).unwrap();
        assert_eq!(one, four);
        assert_eq!(one.as_bytes().len(), 6);
    }

    #[test]
    fn zero_samples_cannot_be_tone_mapped() {
        assert!(buffer(1, 1, 0, [0.0; 4]).tone_map(1.0).is_err());
    }

    #[test]
    fn host_allocation_failure_is_not_a_dispatch_error() {
        let err = RenderError::HostAllocation { requested: 12 };
        assert_eq!(err.to_string(), "failed to allocate 12 bytes on the host");
        assert!(!matches!(err, RenderError::Dispatch(_)));
    }

    #[test]
    fn mean_divides_by_sample_count() {
        let b = buffer(1, 1, 4, [4.0, 8.0, 2.0, 4.0]);
        assert_eq!(b.mean(0, 0), Some([1.0, 2.0, 0.5]));
        assert_eq!(b.mean(1, 0), None);
    }

    // ── Image ─────────────────────────────────────────────────────────────

    #[test]
    fn pixel_reads_row_major_rgb() {
        let img = Image::from_raw(2, 2, (0u8..12).collect());
        assert_eq!(img.pixel(0, 0), Some([0, 1, 2]));
        assert_eq!(img.pixel(1, 0), Some([3, 4, 5]));
        assert_eq!(img.pixel(0, 1), Some([6, 7, 8]));
        assert_eq!(img.pixel(2, 0), None);
        assert_eq!(img.into_raw().len(), 12);
    }
}
