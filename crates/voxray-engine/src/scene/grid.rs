use glam::{UVec3, Vec3};

use crate::render::{RenderError, RenderResult};

use super::material::{MaterialId, MaterialPalette};

/// Raw cell value reserved for "no surface".
pub const EMPTY_CELL: i32 = 0;

/// Decoded cell content.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Cell {
    Empty,
    Material(MaterialId),
}

impl Cell {
    /// Raw value stored in the grid: `0` for empty, `1 + index` otherwise.
    ///
    /// `None` when `1 + index` does not fit in an `i32`.
    #[inline]
    pub fn encode(self) -> Option<i32> {
        match self {
            Cell::Empty => Some(EMPTY_CELL),
            Cell::Material(id) => i32::try_from(id.index()).ok().and_then(|v| v.checked_add(1)),
        }
    }

    /// Inverse of [`encode`](Self::encode). Negative values are not valid cells.
    #[inline]
    pub fn decode(raw: i32) -> Option<Self> {
        match raw {
            EMPTY_CELL => Some(Cell::Empty),
            v if v > 0 => Some(Cell::Material(MaterialId::new((v - 1) as u32))),
            _ => None,
        }
    }
}

/// Dense voxel grid of material references plus the background radiance.
///
/// Cells are stored X fastest, then Y, then Z. Every raw value is either
/// [`EMPTY_CELL`] or `1 + palette index`.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneStore {
    size: UVec3,
    cells: Vec<i32>,
    bg_color: Vec3,
}

impl SceneStore {
    /// Creates an all-empty grid.
    ///
    /// Every dimension must be positive and the cell count must fit in an `i32`
    /// index on the device.
    pub fn new(size: UVec3, bg_color: Vec3) -> RenderResult<Self> {
        if size.min_element() == 0 {
            return Err(RenderError::invalid_argument(format!(
                "scene dimensions must be positive, got {}x{}x{}",
                size.x, size.y, size.z
            )));
        }

        let count = size.x as u64 * size.y as u64 * size.z as u64;
        if count > i32::MAX as u64 {
            return Err(RenderError::invalid_argument(format!(
                "scene of {count} cells is too large"
            )));
        }

        Ok(Self {
            size,
            cells: vec![EMPTY_CELL; count as usize],
            bg_color,
        })
    }

    #[inline]
    pub fn size(&self) -> UVec3 {
        self.size
    }

    #[inline]
    pub fn bg_color(&self) -> Vec3 {
        self.bg_color
    }

    #[inline]
    pub fn set_bg_color(&mut self, color: Vec3) {
        self.bg_color = color;
    }

    /// Raw cell values in storage order.
    #[inline]
    pub fn raw_cells(&self) -> &[i32] {
        &self.cells
    }

    /// Returns the storage index of `(x, y, z)`, or `None` if outside the grid.
    #[inline]
    pub fn linear_index(&self, x: u32, y: u32, z: u32) -> Option<usize> {
        let s = self.size;
        if x >= s.x || y >= s.y || z >= s.z {
            return None;
        }
        Some(x as usize + s.x as usize * (y as usize + s.y as usize * z as usize))
    }

    pub fn cell(&self, x: u32, y: u32, z: u32) -> Option<Cell> {
        self.linear_index(x, y, z)
            .and_then(|i| Cell::decode(self.cells[i]))
    }

    pub fn set_cell(&mut self, x: u32, y: u32, z: u32, cell: Cell) -> RenderResult<()> {
        let i = self.linear_index(x, y, z).ok_or_else(|| {
            RenderError::invalid_argument(format!(
                "cell ({x}, {y}, {z}) is outside the {}x{}x{} grid",
                self.size.x, self.size.y, self.size.z
            ))
        })?;
        self.cells[i] = encode_checked(cell)?;
        Ok(())
    }

    /// Writes `cell` into every position of the inclusive box `min..=max`.
    pub fn fill_box(&mut self, min: UVec3, max: UVec3, cell: Cell) -> RenderResult<()> {
        if min.cmpgt(max).any() || max.cmpge(self.size).any() {
            return Err(RenderError::invalid_argument(format!(
                "box {min}..={max} does not fit in a {} grid",
                self.size
            )));
        }

        let raw = encode_checked(cell)?;
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                let row = x_row(self.size, y, z);
                self.cells[row + min.x as usize..=row + max.x as usize].fill(raw);
            }
        }
        Ok(())
    }

    /// Number of non-empty cells.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v != EMPTY_CELL).count()
    }

    /// Checks that every non-empty cell names an entry of `palette`.
    ///
    /// Reports the first offending cell in storage order.
    pub fn validate(&self, palette: &MaterialPalette) -> RenderResult<()> {
        let palette_len = palette.len();
        let bad = self.cells.iter().enumerate().find(|&(_, &v)| match Cell::decode(v) {
            Some(Cell::Empty) => false,
            Some(Cell::Material(id)) => palette.get(id).is_none(),
            None => true,
        });

        match bad {
            None => Ok(()),
            Some((cell, &value)) => Err(RenderError::InvalidScene { cell, value, palette_len }),
        }
    }
}

fn encode_checked(cell: Cell) -> RenderResult<i32> {
    cell.encode().ok_or_else(|| {
        RenderError::invalid_argument(format!("{cell:?} cannot be encoded as a grid cell"))
    })
}

#[inline]
fn x_row(size: UVec3, y: u32, z: u32) -> usize {
    size.x as usize * (y as usize + size.y as usize * z as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Material;

    fn grid(x: u32, y: u32, z: u32) -> SceneStore {
        SceneStore::new(UVec3::new(x, y, z), Vec3::splat(0.5)).unwrap()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn new_grid_is_empty() {
        let s = grid(3, 2, 4);
        assert_eq!(s.raw_cells().len(), 24);
        assert_eq!(s.filled_count(), 0);
        assert_eq!(s.cell(2, 1, 3), Some(Cell::Empty));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let err = SceneStore::new(UVec3::new(4, 0, 4), Vec3::ZERO).unwrap_err();
        assert!(matches!(err, RenderError::InvalidArgument(_)));
    }

    // ── indexing ──────────────────────────────────────────────────────────

    #[test]
    fn x_is_fastest_then_y_then_z() {
        let s = grid(4, 3, 2);
        assert_eq!(s.linear_index(0, 0, 0), Some(0));
        assert_eq!(s.linear_index(1, 0, 0), Some(1));
        assert_eq!(s.linear_index(0, 1, 0), Some(4));
        assert_eq!(s.linear_index(0, 0, 1), Some(12));
        assert_eq!(s.linear_index(3, 2, 1), Some(23));
        assert_eq!(s.linear_index(4, 0, 0), None);
    }

    #[test]
    fn cell_encoding_reserves_zero_for_empty() {
        assert_eq!(Cell::Empty.encode(), Some(0));
        assert_eq!(Cell::Material(MaterialId::new(0)).encode(), Some(1));
        assert_eq!(Cell::decode(5), Some(Cell::Material(MaterialId::new(4))));
        assert_eq!(Cell::decode(-1), None);
    }

    #[test]
    fn set_cell_round_trips_and_bounds_checks() {
        let mut s = grid(2, 2, 2);
        let id = MaterialId::new(3);
        s.set_cell(1, 0, 1, Cell::Material(id)).unwrap();
        assert_eq!(s.cell(1, 0, 1), Some(Cell::Material(id)));
        assert_eq!(s.raw_cells()[5], 4);

        assert!(s.set_cell(2, 0, 0, Cell::Empty).is_err());
    }

    #[test]
    fn unencodable_material_ids_are_rejected() {
        let mut s = grid(2, 2, 2);
        for index in [i32::MAX as u32, u32::MAX] {
            let cell = Cell::Material(MaterialId::new(index));
            assert_eq!(cell.encode(), None);
            assert!(matches!(s.set_cell(0, 0, 0, cell), Err(RenderError::InvalidArgument(_))));
            assert!(matches!(
                s.fill_box(UVec3::ZERO, UVec3::ONE, cell),
                Err(RenderError::InvalidArgument(_))
            ));
        }
        assert_eq!(s.filled_count(), 0);

        let largest = Cell::Material(MaterialId::new(i32::MAX as u32 - 1));
        assert_eq!(largest.encode(), Some(i32::MAX));
        s.set_cell(1, 1, 1, largest).unwrap();
        assert_eq!(s.cell(1, 1, 1), Some(largest));
    }

    #[test]
    fn fill_box_is_inclusive() {
        let mut s = grid(4, 4, 4);
        let id = MaterialId::new(0);
        s.fill_box(UVec3::new(1, 1, 1), UVec3::new(2, 3, 1), Cell::Material(id))
            .unwrap();
        assert_eq!(s.filled_count(), 2 * 3);
        assert_eq!(s.cell(2, 3, 1), Some(Cell::Material(id)));
        assert_eq!(s.cell(3, 3, 1), Some(Cell::Empty));
    }

    #[test]
    fn fill_box_rejects_out_of_range_or_inverted_boxes() {
        let mut s = grid(4, 4, 4);
        assert!(s.fill_box(UVec3::ZERO, UVec3::splat(4), Cell::Empty).is_err());
        assert!(s.fill_box(UVec3::splat(2), UVec3::splat(1), Cell::Empty).is_err());
    }

    // ── validation ────────────────────────────────────────────────────────

    #[test]
    fn empty_scene_validates_against_empty_palette() {
        grid(2, 2, 2).validate(&MaterialPalette::new()).unwrap();
    }

    #[test]
    fn out_of_range_material_is_reported() {
        let mut palette = MaterialPalette::new();
        let ok = palette.add(Material::lambertian(Vec3::ONE));

        let mut s = grid(2, 2, 2);
        s.set_cell(0, 0, 0, Cell::Material(ok)).unwrap();
        s.set_cell(1, 1, 0, Cell::Material(MaterialId::new(1))).unwrap();

        match s.validate(&palette).unwrap_err() {
            RenderError::InvalidScene { cell, value, palette_len } => {
                assert_eq!(cell, 3);
                assert_eq!(value, 2);
                assert_eq!(palette_len, 1);
            }
            other => panic!("expected InvalidScene, got {other:?}"),
        }
    }
}
