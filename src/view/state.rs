use crate::{
    log,
    utils::Size,
    world::MapGeometry
};

use super::transform::{
    CellCoord,
    CellMetrics,
    PixelPoint,
    Transform
};

// ----------------------------------------------
// ViewState
// ----------------------------------------------

// Scroll position and scale of a view onto a toroidal map.
//
// `offset` is the map-pixel shown at the screen origin. After every
// mutation it satisfies 0 <= x < C*cw and 0 <= y < R*ch for the current
// cell size. The dirty flag coalesces redraw requests.
#[derive(Clone, Debug)]
pub struct ViewState {
    geometry: Option<MapGeometry>,
    base_metrics: CellMetrics,
    scale: i32,
    min_scale: i32,
    max_scale: i32,
    offset: PixelPoint,
    size: Size,
    dirty: bool,
}

impl ViewState {
    // `base_metrics` is the cell size at scale 1.
    pub fn new(base_metrics: CellMetrics, min_scale: i32, max_scale: i32) -> Self {
        debug_assert!(min_scale >= 1 && min_scale <= max_scale);
        Self {
            geometry: None,
            base_metrics,
            scale: min_scale,
            min_scale,
            max_scale,
            offset: PixelPoint::zero(),
            size: Size::zero(),
            dirty: true,
        }
    }

    // ----------------------
    // Binding:
    // ----------------------

    pub fn bind(&mut self, geometry: MapGeometry) {
        self.geometry = Some(geometry);
        self.scale = self.min_scale;
        self.offset = PixelPoint::zero();
        self.dirty = true;
    }

    pub fn unbind(&mut self) {
        self.geometry = None;
        self.offset = PixelPoint::zero();
        self.dirty = true;
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.geometry.is_some()
    }

    #[inline]
    pub fn geometry(&self) -> Option<MapGeometry> {
        self.geometry
    }

    #[inline]
    pub fn transform(&self) -> Option<Transform> {
        self.geometry.map(|geometry| Transform::new(geometry, self.metrics()))
    }

    // ----------------------
    // Accessors:
    // ----------------------

    #[inline]
    pub fn metrics(&self) -> CellMetrics {
        CellMetrics::new(self.base_metrics.width * self.scale, self.base_metrics.height * self.scale)
    }

    #[inline]
    pub fn scale(&self) -> i32 {
        self.scale
    }

    #[inline]
    pub fn offset(&self) -> PixelPoint {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn center(&self) -> PixelPoint {
        PixelPoint::new(self.size.width / 2, self.size.height / 2)
    }

    // ----------------------
    // Redraw flag:
    // ----------------------

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn set_redraw(&mut self) {
        self.dirty = true;
    }

    // Returns the dirty flag and clears it.
    #[inline]
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    // ----------------------
    // Mutation:
    // ----------------------

    // Clamps to the scale range. The cell at the center stays centered.
    // Returns false if the clamped scale equals the current one.
    pub fn set_scale(&mut self, new_scale: i32) -> bool {
        let new_scale = new_scale.clamp(self.min_scale, self.max_scale);
        if new_scale == self.scale {
            return false;
        }

        let center = self.query_center_cell();
        self.scale = new_scale;
        if let Some(center) = center {
            self.center_on(center, 0);
        }

        log::verbose!(log::channel!("view"), "View scale set to {new_scale}.");
        self.dirty = true;
        true
    }

    // Returns false for a zero delta, which leaves the dirty flag untouched.
    pub fn shift_by_pixels(&mut self, dx: i32, dy: i32) -> bool {
        if dx == 0 && dy == 0 {
            return false;
        }

        let Some(transform) = self.transform() else {
            return false;
        };

        self.offset = transform.normalize(PixelPoint::new(self.offset.x + dx, self.offset.y + dy));
        self.dirty = true;
        true
    }

    // Centers the view on `cell`, whose vertex is drawn `lift` pixels up.
    pub fn center_on(&mut self, cell: CellCoord, lift: i32) -> bool {
        let Some(transform) = self.transform() else {
            return false;
        };

        self.offset = transform.recentered_offset(cell, lift, self.size.width, self.size.height);
        self.dirty = true;
        true
    }

    // Cell under the geometric center of the view, ignoring terrain height.
    #[inline]
    pub fn query_center_cell(&self) -> Option<CellCoord> {
        self.cell_at_screen_pixel(self.center())
    }

    // Keeps the center cell centered across the resize.
    pub fn resize(&mut self, size: Size) {
        if size == self.size {
            return;
        }

        let center = self.query_center_cell();
        self.size = size;
        if let Some(center) = center {
            self.center_on(center, 0);
        }
        self.dirty = true;
    }

    // ----------------------
    // Queries:
    // ----------------------

    #[inline]
    pub fn cell_at_screen_pixel(&self, screen_pixel: PixelPoint) -> Option<CellCoord> {
        let transform = self.transform()?;
        Some(transform.cell_from_screen_pixel(screen_pixel, self.offset))
    }

    // Screen position of a cell's vertex raised by `lift`, normalized into [0,W) x [0,H).
    // Callers add or subtract map extents to get the other visible replicas.
    #[inline]
    pub fn screen_pixel_of_cell(&self, cell: CellCoord, lift: i32) -> Option<PixelPoint> {
        let transform = self.transform()?;
        let map_pixel = transform.map_pixel_from_cell_lifted(cell, lift);
        Some(transform.screen_pixel_from_map_pixel(map_pixel, self.offset))
    }
}
