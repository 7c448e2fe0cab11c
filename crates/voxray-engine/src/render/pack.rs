//! Device-visible layouts.
//!
//! Every struct here is `#[repr(C)]`, little endian, and laid out to match WGSL
//! uniform/storage rules: each `vec3` occupies 12 bytes and the scalar after it
//! fills the fourth lane. Reordering or resizing a field is a protocol break
//! with the kernel.

use bytemuck::{Pod, Zeroable};

use crate::scene::{Camera, Material, MaterialPalette, SceneStore};

// ── scene header (binding 1) ──────────────────────────────────────────────

/// Offsets: `size` 0, `cell_count` 12, `bg_color` 16, `material_count` 28. 32 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SceneHeader {
    pub size: [i32; 3],
    pub cell_count: u32,
    pub bg_color: [f32; 3],
    pub material_count: u32,
}

// ── material (binding 3, array element) ───────────────────────────────────

/// Offsets: `color` 0, `kind` 12, `reflectance` 16, `fuzzyness` 20,
/// `refractive_index` 24, padding 28. 32 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub color: [f32; 3],
    pub kind: u32,
    pub reflectance: f32,
    pub fuzzyness: f32,
    pub refractive_index: f32,
    pub _pad: f32,
}

impl From<&Material> for GpuMaterial {
    fn from(m: &Material) -> Self {
        Self {
            color: m.color().to_array(),
            kind: m.kind() as u32,
            reflectance: m.reflectance(),
            fuzzyness: m.fuzzyness(),
            refractive_index: m.refractive_index(),
            _pad: 0.0,
        }
    }
}

// ── camera (binding 4) ────────────────────────────────────────────────────

/// Offsets: `position` 0, `sensor_width` 12, `rotation` 16, `focal_length` 28,
/// `aperture` 32, `exposure` 36, padding 40. 48 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuCamera {
    pub position: [f32; 3],
    pub sensor_width: f32,
    pub rotation: [f32; 3],
    pub focal_length: f32,
    pub aperture: f32,
    pub exposure: f32,
    pub _pad: [f32; 2],
}

impl From<&Camera> for GpuCamera {
    fn from(c: &Camera) -> Self {
        Self {
            position: c.position.to_array(),
            sensor_width: c.sensor_width,
            rotation: c.rotation.to_array(),
            focal_length: c.focal_length,
            aperture: c.aperture,
            exposure: c.exposure,
            _pad: [0.0; 2],
        }
    }
}

// ── frame parameters (binding 5) ──────────────────────────────────────────

/// Offsets: `width` 0, `height` 4, `sample_index` 8, `work_items` 12. 16 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameParams {
    pub width: u32,
    pub height: u32,
    pub sample_index: u32,
    pub work_items: u32,
}

const _: () = assert!(std::mem::size_of::<SceneHeader>() == 32);
const _: () = assert!(std::mem::size_of::<GpuMaterial>() == 32);
const _: () = assert!(std::mem::size_of::<GpuCamera>() == 48);
const _: () = assert!(std::mem::size_of::<FrameParams>() == 16);

// ── packed scene ──────────────────────────────────────────────────────────

/// Everything the kernel reads besides the accumulation buffer and frame parameters.
///
/// `cells` and `materials` always hold at least one element; empty inputs are
/// padded with a zeroed entry because zero-sized bindings are not allowed.
/// `header` still reports the real counts.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedScene {
    pub header: SceneHeader,
    pub cells: Vec<i32>,
    pub materials: Vec<GpuMaterial>,
    pub camera: GpuCamera,
}

impl PackedScene {
    /// Packs host data. Callers validate the scene against the palette first.
    pub fn pack(scene: &SceneStore, palette: &MaterialPalette, camera: &Camera) -> Self {
        let size = scene.size();
        let header = SceneHeader {
            size: [size.x as i32, size.y as i32, size.z as i32],
            cell_count: scene.raw_cells().len() as u32,
            bg_color: scene.bg_color().to_array(),
            material_count: palette.len() as u32,
        };

        let mut materials: Vec<GpuMaterial> = palette.as_slice().iter().map(GpuMaterial::from).collect();
        if materials.is_empty() {
            materials.push(GpuMaterial::zeroed());
        }

        Self {
            header,
            cells: scene.raw_cells().to_vec(),
            materials,
            camera: camera.into(),
        }
    }

    /// Bytes uploaded for the cell binding.
    #[inline]
    pub fn cell_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    /// Bytes uploaded for the material binding.
    #[inline]
    pub fn material_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.materials)
    }
}

#[cfg(test)]
mod tests {
    use glam::{UVec3, Vec3};

    use super::*;
    use crate::scene::{Cell, MaterialKind};

    // ── byte layout ───────────────────────────────────────────────────────

    #[test]
    fn material_fields_land_at_documented_offsets() {
        let m = GpuMaterial::from(&Material::dielectric(Vec3::new(0.1, 0.2, 0.3), 0.4, 0.5, 1.5));
        let bytes = bytemuck::bytes_of(&m);
        let f = |off: usize| f32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        let u = |off: usize| u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());

        assert_eq!((f(0), f(4), f(8)), (0.1, 0.2, 0.3));
        assert_eq!(u(12), MaterialKind::Dielectric as u32);
        assert_eq!((f(16), f(20), f(24), f(28)), (0.4, 0.5, 1.5, 0.0));
    }

    #[test]
    fn camera_fields_land_at_documented_offsets() {
        let cam = Camera {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.1, 0.2, 0.3),
            sensor_width: 4.0,
            focal_length: 5.0,
            aperture: 0.25,
            exposure: 2.0,
        };
        let g = GpuCamera::from(&cam);
        let bytes = bytemuck::bytes_of(&g);
        let f = |off: usize| f32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());

        assert_eq!((f(0), f(4), f(8), f(12)), (1.0, 2.0, 3.0, 4.0));
        assert_eq!((f(16), f(20), f(24), f(28)), (0.1, 0.2, 0.3, 5.0));
        assert_eq!((f(32), f(36)), (0.25, 2.0));
    }

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn pack_copies_cells_and_palette_in_order() {
        let mut palette = MaterialPalette::new();
        let a = palette.add(Material::lambertian(Vec3::X));
        let b = palette.add(Material::light_source(Vec3::splat(3.0)));

        let mut scene = SceneStore::new(UVec3::new(2, 1, 1), Vec3::splat(0.2)).unwrap();
        scene.set_cell(0, 0, 0, Cell::Material(b)).unwrap();
        scene.set_cell(1, 0, 0, Cell::Material(a)).unwrap();

        let packed = PackedScene::pack(&scene, &palette, &Camera::default());
        assert_eq!(packed.cells, vec![2, 1]);
        assert_eq!(packed.materials.len(), 2);
        assert_eq!(packed.materials[0].kind, MaterialKind::Lambertian as u32);
        assert_eq!(packed.materials[1].kind, MaterialKind::LightSource as u32);
        assert_eq!(packed.header.size, [2, 1, 1]);
        assert_eq!(packed.header.cell_count, 2);
        assert_eq!(packed.header.material_count, 2);
        assert_eq!(packed.header.bg_color, [0.2, 0.2, 0.2]);
        assert_eq!(packed.cell_bytes().len(), 8);
    }

    #[test]
    fn empty_palette_is_padded_but_counted_as_zero() {
        let scene = SceneStore::new(UVec3::splat(2), Vec3::ZERO).unwrap();
        let packed = PackedScene::pack(&scene, &MaterialPalette::new(), &Camera::default());
        assert_eq!(packed.materials.len(), 1);
        assert_eq!(packed.header.material_count, 0);
        assert_eq!(packed.material_bytes().len(), 32);
    }
}
