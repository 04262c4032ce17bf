use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    bitflags_with_display,
    log,
    utils::{self, Color}
};

pub mod entities;
pub mod grid;

pub use entities::EntityTable;
pub use grid::GridMap;

#[cfg(test)]
mod tests;

// Highest terrain height a cell can have.
pub const MAX_HEIGHT: u32 = 31;

// ----------------------------------------------
// MapPos
// ----------------------------------------------

// Opaque cell handle issued by a MapStore. The encoding belongs to the store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapPos(pub u32);

impl MapPos {
    #[inline]
    pub const fn invalid() -> Self {
        Self(u32::MAX)
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Default for MapPos {
    #[inline]
    fn default() -> Self {
        Self::invalid()
    }
}

impl std::fmt::Display for MapPos {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "<invalid>")
        }
    }
}

// ----------------------------------------------
// MapGeometry
// ----------------------------------------------

// Cell dimensions of a loaded map. Both are powers of two so wrapping is a mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MapGeometry {
    cols: u32,
    rows: u32,
}

impl MapGeometry {
    pub fn new(cols: u32, rows: u32) -> Option<Self> {
        if !utils::is_power_of_two(cols) || !utils::is_power_of_two(rows) {
            log::error!(log::channel!("view"), "Invalid map dimensions {cols}x{rows}: must be non-zero powers of two.");
            return None;
        }
        // Keeps every map-pixel coordinate well inside i32 at the largest cell sizes.
        if cols > (1 << 16) || rows > (1 << 16) {
            log::error!(log::channel!("view"), "Map dimensions {cols}x{rows} too large.");
            return None;
        }
        Some(Self { cols, rows })
    }

    // Geometry reported by a map store, if it is a valid one.
    pub fn of(map: &dyn MapStore) -> Option<Self> {
        let geometry = Self::new(map.cols(), map.rows())?;
        if map.col_mask() != geometry.col_mask() || map.row_mask() != geometry.row_mask() {
            log::error!(log::channel!("view"), "Map store masks do not match its dimensions.");
            return None;
        }
        Some(geometry)
    }

    #[inline]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[inline]
    pub fn col_mask(&self) -> u32 {
        self.cols - 1
    }

    #[inline]
    pub fn row_mask(&self) -> u32 {
        self.rows - 1
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.cols as usize) * (self.rows as usize)
    }

    // True if `map` still has this geometry (i.e. it was not swapped out).
    #[inline]
    pub fn matches(&self, map: &dyn MapStore) -> bool {
        map.cols() == self.cols && map.rows() == self.rows
    }
}

impl std::fmt::Display for MapGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

// ----------------------------------------------
// Direction / Directions
// ----------------------------------------------

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, EnumCount, EnumIter)]
pub enum Direction {
    Right,
    DownRight,
    Down,
    Left,
    UpLeft,
    Up,
}

impl Direction {
    #[inline]
    pub const fn flag(self) -> Directions {
        Directions::from_bits_retain(1 << (self as u8))
    }
}

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Directions: u8 {
        const Right     = 1 << 0;
        const DownRight = 1 << 1;
        const Down      = 1 << 2;
        const Left      = 1 << 3;
        const UpLeft    = 1 << 4;
        const Up        = 1 << 5;
    }
}

impl Directions {
    #[inline]
    pub fn iter_directions(self) -> impl Iterator<Item = Direction> {
        Direction::iter().filter(move |dir| self.contains(dir.flag()))
    }
}

// ----------------------------------------------
// TerrainType / Triangle
// ----------------------------------------------

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, EnumCount, EnumIter)]
pub enum TerrainType {
    Water0,
    Water1,
    Water2,
    Water3,
    Grass0,
    Grass1,
    Grass2,
    Grass3,
    Desert0,
    Desert1,
    Desert2,
    Tundra0,
    Tundra1,
    Tundra2,
    Snow0,
    Snow1,
}

// Each cell is split in an "up" triangle (apex at the cell's vertex) and a
// "down" triangle (flat top edge at the cell's vertex row).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum Triangle {
    Up,
    Down,
}

// ----------------------------------------------
// MapObject
// ----------------------------------------------

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, EnumCount, EnumIter)]
pub enum MapObject {
    None,
    Flag,
    SmallBuilding,
    LargeBuilding,
    Castle,
    Tree,
    Pine,
    Palm,
    Cactus,
    Stone,
    Sandstone,
    Stub,
    Field,
    Sign,
    Cross,
}

impl MapObject {
    // Raw object values strictly above Flag and up to Castle hold a building.
    #[inline]
    pub fn is_building_raw(raw: u8) -> bool {
        raw > (Self::Flag as u8) && raw <= (Self::Castle as u8)
    }

    #[inline]
    pub fn is_building(self) -> bool {
        Self::is_building_raw(self as u8)
    }
}

// ----------------------------------------------
// BuildingKind
// ----------------------------------------------

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, EnumCount, EnumIter, Serialize, Deserialize)]
pub enum BuildingKind {
    Fisher,
    Lumberjack,
    Boatbuilder,
    Stonecutter,
    Stonemine,
    Coalmine,
    Ironmine,
    Goldmine,
    Forester,
    Stock,
    Hut,
    Farm,
    Butcher,
    Pigfarm,
    Mill,
    Baker,
    Sawmill,
    Steelsmelter,
    Toolmaker,
    Weaponsmith,
    Tower,
    Fortress,
    Goldsmelter,
    Castle,
}

// ----------------------------------------------
// Entities
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BuildingInfo {
    pub kind: BuildingKind,
    // Construction progress in [0,1]. 1 means finished.
    pub progress: f32,
    pub burning: bool,
}

impl BuildingInfo {
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.progress >= 1.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SerfInfo {
    pub owner: PlayerId,
    pub facing: Direction,
}

// ----------------------------------------------
// MapStore
// ----------------------------------------------

// Read-only access to the map data. Cell arguments are handles obtained
// from `pos()`; passing a handle from another map is allowed but meaningless.
pub trait MapStore {
    fn cols(&self) -> u32;
    fn rows(&self) -> u32;

    fn col_mask(&self) -> u32 {
        self.cols().wrapping_sub(1)
    }

    fn row_mask(&self) -> u32 {
        self.rows().wrapping_sub(1)
    }

    // Column and row wrap with the masks.
    fn pos(&self, col: u32, row: u32) -> MapPos;
    fn pos_col(&self, pos: MapPos) -> u32;
    fn pos_row(&self, pos: MapPos) -> u32;

    fn height(&self, pos: MapPos) -> u32;
    // Raw terrain value, decoded with TerrainType::try_from().
    fn terrain(&self, pos: MapPos, triangle: Triangle) -> u8;

    fn owner(&self, pos: MapPos) -> Option<PlayerId>;

    fn has_owner(&self, pos: MapPos) -> bool {
        self.owner(pos).is_some()
    }

    // Raw object value, decoded with MapObject::try_from().
    fn object(&self, pos: MapPos) -> u8;

    fn paths(&self, pos: MapPos) -> Directions;

    fn has_path(&self, pos: MapPos) -> bool {
        !self.paths(pos).is_empty()
    }

    fn idle_serf(&self, pos: MapPos) -> bool;

    // Wrapping neighbour of `pos`.
    fn move_in_direction(&self, pos: MapPos, dir: Direction) -> MapPos {
        let col = self.pos_col(pos);
        let row = self.pos_row(pos);
        let (dc, dr): (i32, i32) = match dir {
            Direction::Right     => (1, 0),
            Direction::DownRight => (1, 1),
            Direction::Down      => (0, 1),
            Direction::Left      => (-1, 0),
            Direction::UpLeft    => (-1, -1),
            Direction::Up        => (0, -1),
        };
        self.pos(col.wrapping_add_signed(dc) & self.col_mask(),
                 row.wrapping_add_signed(dr) & self.row_mask())
    }
}

// ----------------------------------------------
// EntityStore
// ----------------------------------------------

pub trait EntityStore {
    fn player_color(&self, player: PlayerId) -> Option<Color>;
    fn building_at(&self, pos: MapPos) -> Option<BuildingInfo>;
    fn serf_at(&self, pos: MapPos) -> Option<SerfInfo>;
}
