/// Broad class of a compute device as reported by the platform.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceClass {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}

impl DeviceClass {
    #[inline]
    pub fn is_gpu(self) -> bool {
        matches!(self, Self::DiscreteGpu | Self::IntegratedGpu | Self::VirtualGpu)
    }
}

impl From<wgpu::DeviceType> for DeviceClass {
    fn from(ty: wgpu::DeviceType) -> Self {
        match ty {
            wgpu::DeviceType::DiscreteGpu => Self::DiscreteGpu,
            wgpu::DeviceType::IntegratedGpu => Self::IntegratedGpu,
            wgpu::DeviceType::VirtualGpu => Self::VirtualGpu,
            wgpu::DeviceType::Cpu => Self::Cpu,
            wgpu::DeviceType::Other => Self::Other,
        }
    }
}

/// One entry of the platform's device enumeration, in enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCandidate {
    pub name: String,
    pub class: DeviceClass,
    pub backend: String,
}

impl DeviceCandidate {
    pub(crate) fn from_info(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            class: info.device_type.into(),
            backend: format!("{:?}", info.backend),
        }
    }
}

/// Chooses one device out of the enumeration. Returns an index into `candidates`.
pub type SelectionPolicy = fn(&[DeviceCandidate]) -> Option<usize>;

/// Default policy: the first GPU-class device, otherwise the first device of any class.
pub fn first_gpu(candidates: &[DeviceCandidate]) -> Option<usize> {
    candidates
        .iter()
        .position(|c| c.class.is_gpu())
        .or_else(|| (!candidates.is_empty()).then_some(0))
}

/// Strict policy: the first GPU-class device or nothing.
pub fn gpu_only(candidates: &[DeviceCandidate]) -> Option<usize> {
    candidates.iter().position(|c| c.class.is_gpu())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(name: &str, class: DeviceClass) -> DeviceCandidate {
        DeviceCandidate { name: name.into(), class, backend: "Vulkan".into() }
    }

    #[test]
    fn first_gpu_skips_leading_cpu_devices() {
        let list = [
            dev("llvmpipe", DeviceClass::Cpu),
            dev("igpu", DeviceClass::IntegratedGpu),
            dev("dgpu", DeviceClass::DiscreteGpu),
        ];
        assert_eq!(first_gpu(&list), Some(1));
    }

    #[test]
    fn first_gpu_falls_back_to_first_device() {
        let list = [dev("llvmpipe", DeviceClass::Cpu), dev("other", DeviceClass::Other)];
        assert_eq!(first_gpu(&list), Some(0));
    }

    #[test]
    fn empty_enumeration_selects_nothing() {
        assert_eq!(first_gpu(&[]), None);
        assert_eq!(gpu_only(&[]), None);
    }

    #[test]
    fn gpu_only_rejects_cpu_devices() {
        let list = [dev("llvmpipe", DeviceClass::Cpu)];
        assert_eq!(gpu_only(&list), None);
    }
}
