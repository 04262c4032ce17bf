use crate::world::MapGeometry;

// ----------------------------------------------
// PixelPoint
// ----------------------------------------------

// Integer pixel coordinates, either in map-pixel or screen-pixel space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }
}

impl std::fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

// ----------------------------------------------
// CellCoord
// ----------------------------------------------

// Wrapped column/row of a cell. Only used transiently, positions that
// leave the view module are MapPos handles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub col: u32,
    pub row: u32,
}

impl CellCoord {
    #[inline]
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}]", self.col, self.row)
    }
}

// ----------------------------------------------
// CellMetrics
// ----------------------------------------------

// Map-pixel extents of one cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellMetrics {
    pub width: i32,
    pub height: i32,
}

impl CellMetrics {
    // Viewport cell rhombus.
    pub const MAP_TILE_WIDTH: i32 = 32;
    pub const MAP_TILE_HEIGHT: i32 = 20;
    // Pixels a vertex is lifted per height unit.
    pub const HEIGHT_STEP: i32 = 4;

    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    // Square cells of `scale` pixels, as the minimap uses.
    #[inline]
    pub const fn scaled(scale: i32) -> Self {
        Self { width: scale, height: scale }
    }

    #[inline]
    pub const fn viewport() -> Self {
        Self { width: Self::MAP_TILE_WIDTH, height: Self::MAP_TILE_HEIGHT }
    }
}

// ----------------------------------------------
// Transform
// ----------------------------------------------

// Sheared hex projection on a torus:
//
//   mx = col*cw - (row*cw)/2
//   my = row*ch
//
// Moving down by one full map height (R*ch) shifts x right by (R*cw)/2,
// so every vertical wrap carries a horizontal compensation. All wraps are
// floor-style, results are never negative.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transform {
    geometry: MapGeometry,
    metrics: CellMetrics,
}

impl Transform {
    #[inline]
    pub fn new(geometry: MapGeometry, metrics: CellMetrics) -> Self {
        debug_assert!(metrics.width > 0 && metrics.height > 0);
        Self { geometry, metrics }
    }

    #[inline]
    pub fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    #[inline]
    pub fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    // Map width in map-pixels (C * cw).
    #[inline]
    pub fn map_width(&self) -> i32 {
        self.geometry.cols() as i32 * self.metrics.width
    }

    // Map height in map-pixels (R * ch).
    #[inline]
    pub fn map_height(&self) -> i32 {
        self.geometry.rows() as i32 * self.metrics.height
    }

    // Horizontal shift of one vertical wrap ((R * cw) / 2).
    #[inline]
    pub fn shear(&self) -> i32 {
        (self.geometry.rows() as i32 * self.metrics.width) / 2
    }

    // ----------------------
    // Wrapping:
    // ----------------------

    #[inline]
    pub fn wrap_x(&self, x: i32) -> i32 {
        x.rem_euclid(self.map_width())
    }

    // Brings `y` into [0, H), compensating x by the shear once per map height crossed.
    #[inline]
    pub fn wrap_vertical(&self, point: PixelPoint) -> PixelPoint {
        let wraps = point.y.div_euclid(self.map_height());
        PixelPoint {
            x: point.x + wraps * self.shear(),
            y: point.y - wraps * self.map_height(),
        }
    }

    // Vertical wrap followed by horizontal wrap. Result is in [0,W) x [0,H).
    #[inline]
    pub fn normalize(&self, point: PixelPoint) -> PixelPoint {
        let point = self.wrap_vertical(point);
        PixelPoint { x: self.wrap_x(point.x), y: point.y }
    }

    // ----------------------
    // Forward:
    // ----------------------

    #[inline]
    pub fn map_pixel_from_cell(&self, cell: CellCoord) -> PixelPoint {
        self.map_pixel_from_cell_lifted(cell, 0)
    }

    // Map-pixel of a cell's vertex raised by `lift` pixels.
    pub fn map_pixel_from_cell_lifted(&self, cell: CellCoord, lift: i32) -> PixelPoint {
        let col = (cell.col & self.geometry.col_mask()) as i32;
        let row = (cell.row & self.geometry.row_mask()) as i32;
        let raw = PixelPoint {
            x: col * self.metrics.width - (row * self.metrics.width) / 2,
            y: row * self.metrics.height - lift,
        };
        self.normalize(raw)
    }

    #[inline]
    pub fn screen_pixel_from_map_pixel(&self, map_pixel: PixelPoint, offset: PixelPoint) -> PixelPoint {
        self.normalize(PixelPoint {
            x: map_pixel.x - offset.x,
            y: map_pixel.y - offset.y,
        })
    }

    // ----------------------
    // Inverse:
    // ----------------------

    // Cell whose parallelogram contains the map-pixel. The shear is removed
    // before dividing so the result is exact at every cell size.
    pub fn cell_from_map_pixel(&self, map_pixel: PixelPoint) -> CellCoord {
        let (cw, ch) = (self.metrics.width as i64, self.metrics.height as i64);
        let (mx, my) = (map_pixel.x as i64, map_pixel.y as i64);

        let row = my.div_euclid(ch);
        let col = (mx + (my * cw).div_euclid(2 * ch)).div_euclid(cw);

        CellCoord {
            col: (col as u32) & self.geometry.col_mask(),
            row: (row as u32) & self.geometry.row_mask(),
        }
    }

    #[inline]
    pub fn cell_from_screen_pixel(&self, screen_pixel: PixelPoint, offset: PixelPoint) -> CellCoord {
        self.cell_from_map_pixel(PixelPoint {
            x: screen_pixel.x + offset.x,
            y: screen_pixel.y + offset.y,
        })
    }

    // ----------------------
    // Centering:
    // ----------------------

    // Offset that puts `cell` (raised by `lift`) at the center of a `width` x `height` screen.
    pub fn recentered_offset(&self, cell: CellCoord, lift: i32, width: i32, height: i32) -> PixelPoint {
        let center = self.map_pixel_from_cell_lifted(cell, lift);
        self.normalize(PixelPoint {
            x: center.x - width / 2,
            y: center.y - height / 2,
        })
    }
}
