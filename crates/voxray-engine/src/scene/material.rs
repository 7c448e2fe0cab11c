use glam::Vec3;

/// Surface model tag. The discriminant is the value the kernel receives.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum MaterialKind {
    LightSource = 0,
    Lambertian = 1,
    Metal = 2,
    Dielectric = 3,
}

/// A surface description referenced by scene cells through the palette.
///
/// Constructed only through the factory functions, which zero every field the
/// kind does not use. The kind never changes afterwards.
///
/// `reflectance` is passed through to the kernel untouched; its optical meaning
/// for metals and dielectrics is defined by the kernel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    kind: MaterialKind,
    color: Vec3,
    reflectance: f32,
    fuzzyness: f32,
    refractive_index: f32,
}

impl Material {
    /// Emissive surface; `color` is the emitted radiance.
    pub fn light_source(color: Vec3) -> Self {
        Self::with_kind(MaterialKind::LightSource, color, 0.0, 0.0, 0.0)
    }

    /// Ideal diffuse surface.
    pub fn lambertian(color: Vec3) -> Self {
        Self::with_kind(MaterialKind::Lambertian, color, 0.0, 0.0, 0.0)
    }

    /// Specular reflector. `fuzzyness == 0` is a perfect mirror.
    pub fn metal(color: Vec3, reflectance: f32, fuzzyness: f32) -> Self {
        Self::with_kind(MaterialKind::Metal, color, reflectance, fuzzyness, 0.0)
    }

    /// Refractive surface such as glass (`refractive_index` ≈ 1.5) or water (≈ 1.33).
    pub fn dielectric(color: Vec3, reflectance: f32, fuzzyness: f32, refractive_index: f32) -> Self {
        Self::with_kind(
            MaterialKind::Dielectric,
            color,
            reflectance,
            fuzzyness,
            refractive_index,
        )
    }

    fn with_kind(
        kind: MaterialKind,
        color: Vec3,
        reflectance: f32,
        fuzzyness: f32,
        refractive_index: f32,
    ) -> Self {
        Self { kind, color, reflectance, fuzzyness, refractive_index }
    }

    #[inline]
    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    #[inline]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    #[inline]
    pub fn reflectance(&self) -> f32 {
        self.reflectance
    }

    #[inline]
    pub fn fuzzyness(&self) -> f32 {
        self.fuzzyness
    }

    #[inline]
    pub fn refractive_index(&self) -> f32 {
        self.refractive_index
    }
}

/// Permanent position of a material within its palette.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MaterialId(u32);

impl MaterialId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Append-only, insertion-ordered table of materials.
///
/// Performance characteristics:
/// - `add()` is O(1) amortized
/// - existing entries are never moved, replaced, or removed
#[derive(Debug, Default, Clone)]
pub struct MaterialPalette {
    entries: Vec<Material>,
}

impl MaterialPalette {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `material` and returns its id.
    pub fn add(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.entries.len() as u32);
        self.entries.push(material);
        id
    }

    #[inline]
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.entries.get(id.0 as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns materials in id order.
    #[inline]
    pub fn as_slice(&self) -> &[Material] {
        &self.entries
    }
}
