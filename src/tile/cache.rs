use std::collections::HashMap;
use smallvec::SmallVec;

use crate::{
    log,
    engine::config::TerrainPalette,
    view::{CellCoord, CellMetrics},
    world::{MapGeometry, MapStore}
};

use super::{
    TileKey,
    TileLayout,
    raster::{self, TileImage}
};

// ----------------------------------------------
// TileCacheStats
// ----------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    pub hits: u32,
    pub misses: u32,
    pub renders: u32,
    pub failures: u32,
    pub invalidations: u32,
}

// ----------------------------------------------
// TileCache
// ----------------------------------------------

// Lazily rendered terrain tiles of one viewport. Entries are only removed
// by invalidation; a tile that fails to render is not stored and will be
// attempted again on the next request.
pub struct TileCache {
    layout: Option<TileLayout>,
    tile_size_cells: u32,
    metrics: CellMetrics,
    palette_fingerprint: u64,
    tiles: HashMap<TileKey, TileImage>,
    render_counts: HashMap<TileKey, u32>,
    stats: TileCacheStats,
}

impl TileCache {
    pub fn new(tile_size_cells: u32, metrics: CellMetrics) -> Self {
        Self {
            layout: None,
            tile_size_cells,
            metrics,
            palette_fingerprint: 0,
            tiles: HashMap::new(),
            render_counts: HashMap::new(),
            stats: TileCacheStats::default(),
        }
    }

    // Drops every entry and lays tiles out for a new map.
    pub fn bind(&mut self, geometry: MapGeometry) {
        self.invalidate_all();
        self.layout = Some(TileLayout::new(geometry, self.tile_size_cells));
        self.render_counts.clear();
    }

    pub fn unbind(&mut self) {
        self.invalidate_all();
        self.layout = None;
    }

    #[inline]
    pub fn layout(&self) -> Option<&TileLayout> {
        self.layout.as_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    #[inline]
    pub fn stats(&self) -> TileCacheStats {
        self.stats
    }

    // Number of times `key` was rendered since the map was bound.
    #[inline]
    pub fn render_count(&self, key: TileKey) -> u32 {
        self.render_counts.get(&key).copied().unwrap_or(0)
    }

    // Clears the cache if the palette differs from the one tiles were rendered with.
    pub fn sync_palette(&mut self, palette: &TerrainPalette) {
        let fingerprint = palette.fingerprint();
        if fingerprint != self.palette_fingerprint {
            if !self.tiles.is_empty() {
                log::info!(log::channel!("tiles"), "Terrain palette changed; dropping {} cached tiles.", self.tiles.len());
            }
            self.invalidate_all();
            self.palette_fingerprint = fingerprint;
        }
    }

    // ----------------------
    // Lookup:
    // ----------------------

    pub fn get_or_render(&mut self,
                         map: &dyn MapStore,
                         palette: &TerrainPalette,
                         key: TileKey) -> Option<&TileImage> {

        let layout = self.layout?;
        if !layout.contains(key) || !layout.geometry().matches(map) {
            return None;
        }

        if self.tiles.contains_key(&key) {
            self.stats.hits += 1;
            return self.tiles.get(&key);
        }

        self.stats.misses += 1;

        match raster::render_tile(map, palette, &layout, self.metrics, key) {
            Some(tile) => {
                self.stats.renders += 1;
                *self.render_counts.entry(key).or_insert(0) += 1;
                Some(&*self.tiles.entry(key).or_insert(tile))
            }
            None => {
                self.stats.failures += 1;
                None
            }
        }
    }

    // ----------------------
    // Invalidation:
    // ----------------------

    // Drops the tile covering `cell`. A vertex on a tile's left or top seam
    // is also shared by triangles of the tiles to the left, above and
    // above-left, which are dropped too.
    pub fn invalidate(&mut self, cell: CellCoord) {
        let Some(layout) = self.layout else {
            return;
        };

        for key in Self::tiles_touching_vertex(&layout, cell) {
            if self.tiles.remove(&key).is_some() {
                self.stats.invalidations += 1;
                log::verbose!(log::channel!("tiles"), "Invalidated tile {key} (cell {cell}).");
            }
        }
    }

    pub fn invalidate_all(&mut self) {
        self.stats.invalidations += self.tiles.len() as u32;
        self.tiles.clear();
    }

    fn tiles_touching_vertex(layout: &TileLayout, cell: CellCoord) -> SmallVec<[TileKey; 4]> {
        let key = layout.key_of(cell);
        let geometry = layout.geometry();
        let on_left_seam = (cell.col & geometry.col_mask()) % layout.tile_cols() == 0;
        let on_top_seam  = (cell.row & geometry.row_mask()) % layout.tile_rows() == 0;

        let mut keys: SmallVec<[TileKey; 4]> = SmallVec::new();
        keys.push(key);

        let mut push_unique = |k: TileKey| {
            if !keys.contains(&k) {
                keys.push(k);
            }
        };

        if on_left_seam {
            push_unique(layout.offset_key(key, -1, 0));
        }
        if on_top_seam {
            push_unique(layout.offset_key(key, 0, -1));
        }
        if on_left_seam && on_top_seam {
            push_unique(layout.offset_key(key, -1, -1));
        }

        keys
    }
}
