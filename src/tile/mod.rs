use crate::{
    view::CellCoord,
    world::MapGeometry
};

pub mod cache;
pub mod raster;

pub use cache::{TileCache, TileCacheStats};
pub use raster::TileImage;


pub const DEFAULT_TILE_SIZE_CELLS: u32 = 16;

// ----------------------------------------------
// TileKey
// ----------------------------------------------

// Identifies one block of cells by its tile column/row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub tile_col: u32,
    pub tile_row: u32,
}

impl TileKey {
    #[inline]
    pub const fn new(tile_col: u32, tile_row: u32) -> Self {
        Self { tile_col, tile_row }
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "T[{},{}]", self.tile_col, self.tile_row)
    }
}

// ----------------------------------------------
// TileLayout
// ----------------------------------------------

// How a map is split into tiles. Tile edges are powers of two no larger
// than the map, so tiles cover the map exactly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileLayout {
    geometry: MapGeometry,
    tile_cols: u32, // cells per tile, horizontally
    tile_rows: u32, // cells per tile, vertically
}

impl TileLayout {
    pub fn new(geometry: MapGeometry, tile_size_cells: u32) -> Self {
        let size = floor_power_of_two(tile_size_cells.max(1));
        Self {
            geometry,
            tile_cols: size.min(geometry.cols()),
            tile_rows: size.min(geometry.rows()),
        }
    }

    #[inline]
    pub fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    #[inline]
    pub fn tile_cols(&self) -> u32 {
        self.tile_cols
    }

    #[inline]
    pub fn tile_rows(&self) -> u32 {
        self.tile_rows
    }

    // Number of tiles horizontally.
    #[inline]
    pub fn tiles_x(&self) -> u32 {
        self.geometry.cols() / self.tile_cols
    }

    // Number of tiles vertically.
    #[inline]
    pub fn tiles_y(&self) -> u32 {
        self.geometry.rows() / self.tile_rows
    }

    #[inline]
    pub fn key_of(&self, cell: CellCoord) -> TileKey {
        TileKey {
            tile_col: (cell.col & self.geometry.col_mask()) / self.tile_cols,
            tile_row: (cell.row & self.geometry.row_mask()) / self.tile_rows,
        }
    }

    // Top-left cell of the tile.
    #[inline]
    pub fn anchor(&self, key: TileKey) -> CellCoord {
        debug_assert!(self.contains(key));
        CellCoord::new(key.tile_col * self.tile_cols, key.tile_row * self.tile_rows)
    }

    #[inline]
    pub fn contains(&self, key: TileKey) -> bool {
        key.tile_col < self.tiles_x() && key.tile_row < self.tiles_y()
    }

    // Neighbouring tile, wrapping around the map.
    #[inline]
    pub fn offset_key(&self, key: TileKey, d_col: i32, d_row: i32) -> TileKey {
        TileKey {
            tile_col: (key.tile_col as i32 + d_col).rem_euclid(self.tiles_x() as i32) as u32,
            tile_row: (key.tile_row as i32 + d_row).rem_euclid(self.tiles_y() as i32) as u32,
        }
    }
}

#[inline]
fn floor_power_of_two(value: u32) -> u32 {
    debug_assert!(value != 0);
    1 << (u32::BITS - 1 - value.leading_zeros())
}
