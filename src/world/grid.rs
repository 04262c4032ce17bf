use bitvec::vec::BitVec;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use super::{
    Direction,
    Directions,
    MapGeometry,
    MapObject,
    MapPos,
    MapStore,
    MAX_HEIGHT,
    PlayerId,
    TerrainType,
    Triangle
};

// ----------------------------------------------
// GridMap
// ----------------------------------------------

// In-memory toroidal map store. Positions encode `row * cols + col`.
pub struct GridMap {
    geometry: MapGeometry,
    heights: Vec<u8>,
    terrain_up: Vec<u8>,
    terrain_down: Vec<u8>,
    owners: Vec<Option<PlayerId>>,
    objects: Vec<u8>,
    paths: Vec<Directions>,
    idle_serfs: BitVec,
    // Cells whose height changed since the last take_height_changes().
    height_changes: Vec<MapPos>,
}

impl GridMap {
    // Flat grass map with nothing on it.
    pub fn new(geometry: MapGeometry) -> Self {
        let cell_count = geometry.cell_count();
        Self {
            geometry,
            heights: vec![0; cell_count],
            terrain_up: vec![TerrainType::Grass1 as u8; cell_count],
            terrain_down: vec![TerrainType::Grass1 as u8; cell_count],
            owners: vec![None; cell_count],
            objects: vec![MapObject::None as u8; cell_count],
            paths: vec![Directions::empty(); cell_count],
            idle_serfs: BitVec::repeat(false, cell_count),
            height_changes: Vec::new(),
        }
    }

    // Deterministic pseudo-random landscape: same seed, same map.
    pub fn with_random_terrain(geometry: MapGeometry, seed: u64) -> Self {
        let mut map = Self::new(geometry);
        let mut rng = Pcg64::seed_from_u64(seed);

        for height in &mut map.heights {
            *height = rng.random_range(0..=MAX_HEIGHT) as u8;
        }

        // Smooth each height toward its up-left neighbour so slopes look like hills.
        for row in 0..geometry.rows() {
            for col in 0..geometry.cols() {
                let index = map.index_of(col, row);
                let neighbour = map.index_of(col.wrapping_sub(1) & geometry.col_mask(),
                                             row.wrapping_sub(1) & geometry.row_mask());
                let average = (map.heights[index] as u32 + map.heights[neighbour] as u32) / 2;
                map.heights[index] = average as u8;
            }
        }

        for index in 0..geometry.cell_count() {
            let height = map.heights[index] as u32;
            map.terrain_up[index] = terrain_for_height(height, rng.random_range(0..4)) as u8;
            map.terrain_down[index] = terrain_for_height(height, rng.random_range(0..4)) as u8;
        }

        map
    }

    #[inline]
    pub fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    #[inline]
    fn index_of(&self, col: u32, row: u32) -> usize {
        ((row & self.geometry.row_mask()) as usize) * (self.geometry.cols() as usize)
            + ((col & self.geometry.col_mask()) as usize)
    }

    #[inline]
    fn index(&self, pos: MapPos) -> Option<usize> {
        let index = pos.0 as usize;
        if pos.is_valid() && index < self.geometry.cell_count() {
            Some(index)
        } else {
            None
        }
    }

    // ----------------------
    // Mutation:
    // ----------------------

    // Returns true if the height actually changed.
    pub fn set_height(&mut self, pos: MapPos, height: u32) -> bool {
        let Some(index) = self.index(pos) else {
            return false;
        };
        let height = height.min(MAX_HEIGHT) as u8;
        if self.heights[index] == height {
            return false;
        }
        self.heights[index] = height;
        self.height_changes.push(pos);
        true
    }

    pub fn take_height_changes(&mut self) -> Vec<MapPos> {
        std::mem::take(&mut self.height_changes)
    }

    pub fn set_terrain(&mut self, pos: MapPos, up: TerrainType, down: TerrainType) {
        if let Some(index) = self.index(pos) {
            self.terrain_up[index] = up as u8;
            self.terrain_down[index] = down as u8;
        }
    }

    // Stores a raw terrain value as is. Useful to simulate corrupt map data.
    pub fn set_raw_terrain(&mut self, pos: MapPos, triangle: Triangle, raw: u8) {
        if let Some(index) = self.index(pos) {
            match triangle {
                Triangle::Up   => self.terrain_up[index] = raw,
                Triangle::Down => self.terrain_down[index] = raw,
            }
        }
    }

    pub fn set_owner(&mut self, pos: MapPos, owner: Option<PlayerId>) {
        if let Some(index) = self.index(pos) {
            self.owners[index] = owner;
        }
    }

    pub fn set_object(&mut self, pos: MapPos, object: MapObject) {
        if let Some(index) = self.index(pos) {
            self.objects[index] = object as u8;
        }
    }

    // Adds a path segment in both cells it connects.
    pub fn add_path(&mut self, pos: MapPos, dir: Direction) {
        let other = self.move_in_direction(pos, dir);
        let reverse = match dir {
            Direction::Right     => Direction::Left,
            Direction::DownRight => Direction::UpLeft,
            Direction::Down      => Direction::Up,
            Direction::Left      => Direction::Right,
            Direction::UpLeft    => Direction::DownRight,
            Direction::Up        => Direction::Down,
        };
        if let (Some(a), Some(b)) = (self.index(pos), self.index(other)) {
            self.paths[a] |= dir.flag();
            self.paths[b] |= reverse.flag();
        }
    }

    pub fn set_idle_serf(&mut self, pos: MapPos, idle: bool) {
        if let Some(index) = self.index(pos) {
            self.idle_serfs.set(index, idle);
        }
    }
}

fn terrain_for_height(height: u32, variant: u32) -> TerrainType {
    let band = match height {
        0..=3   => [TerrainType::Water0, TerrainType::Water1, TerrainType::Water2, TerrainType::Water3],
        4..=15  => [TerrainType::Grass0, TerrainType::Grass1, TerrainType::Grass2, TerrainType::Grass3],
        16..=21 => [TerrainType::Desert0, TerrainType::Desert1, TerrainType::Desert2, TerrainType::Desert0],
        22..=27 => [TerrainType::Tundra0, TerrainType::Tundra1, TerrainType::Tundra2, TerrainType::Tundra0],
        _       => [TerrainType::Snow0, TerrainType::Snow1, TerrainType::Snow0, TerrainType::Snow1],
    };
    band[(variant as usize) % band.len()]
}

// ----------------------------------------------
// MapStore for GridMap
// ----------------------------------------------

impl MapStore for GridMap {
    #[inline]
    fn cols(&self) -> u32 {
        self.geometry.cols()
    }

    #[inline]
    fn rows(&self) -> u32 {
        self.geometry.rows()
    }

    #[inline]
    fn pos(&self, col: u32, row: u32) -> MapPos {
        MapPos(self.index_of(col, row) as u32)
    }

    #[inline]
    fn pos_col(&self, pos: MapPos) -> u32 {
        pos.0 & self.geometry.col_mask()
    }

    #[inline]
    fn pos_row(&self, pos: MapPos) -> u32 {
        (pos.0 / self.geometry.cols()) & self.geometry.row_mask()
    }

    #[inline]
    fn height(&self, pos: MapPos) -> u32 {
        self.index(pos).map_or(0, |index| self.heights[index] as u32)
    }

    #[inline]
    fn terrain(&self, pos: MapPos, triangle: Triangle) -> u8 {
        self.index(pos).map_or(TerrainType::Water0 as u8, |index| match triangle {
            Triangle::Up   => self.terrain_up[index],
            Triangle::Down => self.terrain_down[index],
        })
    }

    #[inline]
    fn owner(&self, pos: MapPos) -> Option<PlayerId> {
        self.index(pos).and_then(|index| self.owners[index])
    }

    #[inline]
    fn object(&self, pos: MapPos) -> u8 {
        self.index(pos).map_or(MapObject::None as u8, |index| self.objects[index])
    }

    #[inline]
    fn paths(&self, pos: MapPos) -> Directions {
        self.index(pos).map_or(Directions::empty(), |index| self.paths[index])
    }

    #[inline]
    fn idle_serf(&self, pos: MapPos) -> bool {
        self.index(pos).is_some_and(|index| self.idle_serfs[index])
    }
}
