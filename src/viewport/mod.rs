use serde::{Deserialize, Serialize};

use crate::{
    bitflags_with_display,
    log,
    app::{MapAction, MapWidget, input::{InputModifiers, MouseButton}},
    engine::config::{MapViewConfigs, TerrainPalette, ViewportConfigs},
    render::{DrawContext, DrawStats},
    tile::{TileCache, TileCacheStats},
    utils::{self, PixelRect, Size},
    view::{self, CellCoord, CellMetrics, PixelPoint, ToroidalView, ViewState},
    world::{MapGeometry, MapPos, MapStore, MAX_HEIGHT}
};

mod draw;


// Highest a vertex can be drawn above its flat position.
const MAX_LIFT_PX: i32 = MAX_HEIGHT as i32 * CellMetrics::HEIGHT_STEP;

// Candidate rows below the flat guess that a lifted vertex may reach.
const PICK_ROWS_BELOW: i32 = (MAX_LIFT_PX + CellMetrics::MAP_TILE_HEIGHT - 1) / CellMetrics::MAP_TILE_HEIGHT + 1;

// ----------------------------------------------
// ViewportLayers
// ----------------------------------------------

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ViewportLayers: u8 {
        const Landscape   = 1 << 0;
        const Paths       = 1 << 1;
        const Objects     = 1 << 2;
        const Serfs       = 1 << 3;
        const Cursor      = 1 << 4;
        const Grid        = 1 << 5;
        const DebugCoords = 1 << 6;
    }
}

impl Default for ViewportLayers {
    fn default() -> Self {
        Self::Landscape | Self::Paths | Self::Objects | Self::Serfs | Self::Cursor
    }
}

// ----------------------------------------------
// Viewport
// ----------------------------------------------

// Full detail scrolling view of the map.
//
// The viewport renders a frame of `window_size * zoom` pixels which the
// map interface presents scaled to the widget's window rect. Input arrives in
// window pixels relative to the widget and is converted to frame pixels.
pub struct Viewport {
    view: ViewState,
    tiles: TileCache,
    layers: ViewportLayers,

    window_size: Size,
    zoom: f32,
    target_zoom: f32,
    // Fraction of a frame pixel left over from the last drag motion.
    drag_remainder: (f32, f32),

    cursor: MapPos,
    anim_tick: u32,

    configs: ViewportConfigs,
    palette: TerrainPalette,
    stats: DrawStats,
}

impl Viewport {
    pub fn new(configs: &MapViewConfigs) -> Self {
        let zoom = 1.0_f32.clamp(configs.viewport.min_zoom, configs.viewport.max_zoom);
        Self {
            view: ViewState::new(CellMetrics::viewport(), 1, 1),
            tiles: TileCache::new(configs.viewport.tile_size_cells.max(1) as u32, CellMetrics::viewport()),
            layers: configs.viewport.default_layers,
            window_size: Size::zero(),
            zoom,
            target_zoom: zoom,
            drag_remainder: (0.0, 0.0),
            cursor: MapPos::invalid(),
            anim_tick: 0,
            configs: configs.viewport.clone(),
            palette: configs.palette.clone(),
            stats: DrawStats::default(),
        }
    }

    // ----------------------
    // Map binding:
    // ----------------------

    pub fn bind_map(&mut self, map: &dyn MapStore) {
        match MapGeometry::of(map) {
            Some(geometry) => {
                self.view.bind(geometry);
                self.tiles.bind(geometry);
                self.cursor = MapPos::invalid();
                log::info!(log::channel!("viewport"), "Viewport bound to {geometry} map.");
            }
            None => self.unbind_map(),
        }
    }

    pub fn unbind_map(&mut self) {
        self.view.unbind();
        self.tiles.unbind();
        self.cursor = MapPos::invalid();
    }

    // ----------------------
    // Layers & palette:
    // ----------------------

    #[inline]
    pub fn layers(&self) -> ViewportLayers {
        self.layers
    }

    pub fn set_layers(&mut self, layers: ViewportLayers) {
        if layers != self.layers {
            self.layers = layers;
            self.view.set_redraw();
        }
    }

    pub fn toggle_layer(&mut self, layer: ViewportLayers) {
        self.set_layers(self.layers ^ layer);
    }

    // Cached tiles are dropped on the next draw if the colors differ.
    pub fn set_palette(&mut self, palette: TerrainPalette) {
        self.palette = palette;
        self.view.set_redraw();
    }

    #[inline]
    pub fn stats(&self) -> &DrawStats {
        &self.stats
    }

    #[inline]
    pub fn tile_stats(&self) -> TileCacheStats {
        self.tiles.stats()
    }

    #[inline]
    pub fn tile_cache(&self) -> &TileCache {
        &self.tiles
    }

    // ----------------------
    // Window & zoom:
    // ----------------------

    #[inline]
    pub fn window_size(&self) -> Size {
        self.window_size
    }

    // Size of the rendered frame in pixels.
    #[inline]
    pub fn frame_size(&self) -> Size {
        self.view.size()
    }

    pub fn resize(&mut self, window_size: Size) {
        self.window_size = window_size;
        self.apply_frame_size();
    }

    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    #[inline]
    pub fn target_zoom(&self) -> f32 {
        self.target_zoom
    }

    #[inline]
    pub fn zoom_range(&self) -> (f32, f32) {
        (self.configs.min_zoom, self.configs.max_zoom)
    }

    #[inline]
    pub fn zoom_step(&self) -> f32 {
        self.configs.zoom_step
    }

    // Applies a zoom factor immediately. Returns false if the clamped factor is unchanged.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        let zoom = zoom.clamp(self.configs.min_zoom, self.configs.max_zoom);
        self.target_zoom = zoom;
        if utils::approx_equal(zoom, self.zoom, f32::EPSILON) {
            return false;
        }

        self.zoom = zoom;
        self.apply_frame_size();
        log::verbose!(log::channel!("viewport"), "Viewport zoom set to {zoom:.2}.");
        true
    }

    // Zoom request from keys or the wheel. Interpolated over the next
    // steps when smooth zoom is enabled, applied at once otherwise.
    pub fn zoom_by(&mut self, delta: f32) -> bool {
        if !self.configs.smooth_zoom {
            return self.set_zoom(self.zoom + delta);
        }

        let target = (self.target_zoom + delta).clamp(self.configs.min_zoom, self.configs.max_zoom);
        if utils::approx_equal(target, self.target_zoom, f32::EPSILON) {
            return false;
        }
        self.target_zoom = target;
        true
    }

    fn update_zooming(&mut self) {
        if utils::approx_equal(self.zoom, self.target_zoom, 0.001) {
            if self.zoom != self.target_zoom {
                self.zoom = self.target_zoom;
                self.apply_frame_size();
            }
            return;
        }

        self.zoom = utils::lerp(self.zoom, self.target_zoom, self.configs.zoom_speed);
        if utils::approx_equal(self.zoom, self.target_zoom, 0.001) {
            self.zoom = self.target_zoom;
        }
        self.apply_frame_size();
    }

    fn apply_frame_size(&mut self) {
        let frame_size = if self.window_size.is_valid() {
            self.window_size.scaled(self.zoom)
        } else {
            Size::zero()
        };
        self.view.resize(frame_size);
    }

    // Converts a window pixel (relative to the widget) to a frame pixel.
    #[inline]
    pub fn frame_pixel(&self, x: i32, y: i32) -> PixelPoint {
        PixelPoint::new((x as f32 * self.zoom) as i32, (y as f32 * self.zoom) as i32)
    }

    // ----------------------
    // Step & animation:
    // ----------------------

    // Advances animations by `ticks` step signals.
    pub fn step(&mut self, ticks: u32) {
        if ticks == 0 {
            return;
        }

        if self.configs.smooth_zoom {
            for _ in 0..ticks {
                self.update_zooming();
            }
        }

        let frame_ticks = self.configs.burning_frame_ticks.max(1);
        let prev_frame = self.anim_tick / frame_ticks;
        self.anim_tick = self.anim_tick.wrapping_add(ticks);
        if self.anim_tick / frame_ticks != prev_frame && self.layers.intersects(ViewportLayers::Objects) {
            self.view.set_redraw();
        }
    }

    #[inline]
    pub fn anim_tick(&self) -> u32 {
        self.anim_tick
    }

    // ----------------------
    // Cursor:
    // ----------------------

    #[inline]
    pub fn cursor(&self) -> MapPos {
        self.cursor
    }

    pub fn set_cursor(&mut self, pos: MapPos) {
        if pos != self.cursor {
            self.cursor = pos;
            if self.layers.intersects(ViewportLayers::Cursor | ViewportLayers::DebugCoords) {
                self.view.set_redraw();
            }
        }
    }

    // ----------------------
    // Map changes:
    // ----------------------

    // Terrain height of `pos` changed; its tiles are rendered again on the next draw.
    pub fn on_height_changed(&mut self, map: &dyn MapStore, pos: MapPos) {
        let Some(cell) = view::cell_of(&self.view, map, pos) else {
            return;
        };
        self.tiles.invalidate(cell);
        self.view.set_redraw();
    }

    pub fn invalidate_tiles(&mut self) {
        self.tiles.invalidate_all();
        self.view.set_redraw();
    }

    // ----------------------
    // Picking:
    // ----------------------

    // Cell whose lifted vertex is nearest to a frame pixel. Heights can
    // raise vertices of rows below the flat guess into the pixel, so those
    // rows are searched too. Ties go to the lower row, which draws in front.
    pub fn cell_at_frame_pixel(&self, map: &dyn MapStore, frame_pixel: PixelPoint) -> Option<CellCoord> {
        if !view::is_map_valid(&self.view, map) {
            return None;
        }

        let metrics = self.view.metrics();
        let (cw, ch) = (metrics.width as i64, metrics.height as i64);
        let offset = self.view.offset();
        let mx = frame_pixel.x as i64 + offset.x as i64;
        let my = frame_pixel.y as i64 + offset.y as i64;
        let (cols, rows) = (map.cols() as i64, map.rows() as i64);

        let flat_row = my.div_euclid(ch);
        let mut best: Option<(i64, CellCoord)> = None;

        for row in (flat_row - 1)..=(flat_row + PICK_ROWS_BELOW as i64) {
            let shear = (row * cw).div_euclid(2);
            let flat_col = (mx + shear).div_euclid(cw);

            for col in (flat_col - 1)..=(flat_col + 2) {
                let cell = CellCoord::new(col.rem_euclid(cols) as u32, row.rem_euclid(rows) as u32);
                let lift = map.height(map.pos(cell.col, cell.row)) as i64 * CellMetrics::HEIGHT_STEP as i64;

                let dx = col * cw - shear - mx;
                let dy = row * ch - lift - my;
                let dist = dx * dx + dy * dy;

                if best.is_none_or(|(best_dist, _)| dist <= best_dist) {
                    best = Some((dist, cell));
                }
            }
        }

        best.map(|(_, cell)| cell)
    }

    #[inline]
    fn lift_of(map: &dyn MapStore, pos: MapPos) -> i32 {
        map.height(pos) as i32 * CellMetrics::HEIGHT_STEP
    }

    // ----------------------
    // Input:
    // ----------------------

    // Left click moves the map cursor. Coordinates are window pixels relative to the widget.
    pub fn handle_click(&mut self, map: &dyn MapStore, x: i32, y: i32, button: MouseButton) -> MapAction {
        if button != MouseButton::Left {
            return MapAction::None;
        }

        let frame_pixel = self.frame_pixel(x, y);
        let pos = self.map_pos_from_screen_pix(map, frame_pixel.x, frame_pixel.y);
        if !pos.is_valid() {
            return MapAction::None;
        }

        self.set_cursor(pos);
        MapAction::CursorMoved(pos)
    }

    pub fn handle_double_click(&mut self, map: &dyn MapStore, x: i32, y: i32, button: MouseButton) -> MapAction {
        let frame_pixel = self.frame_pixel(x, y);
        let pos = self.map_pos_from_screen_pix(map, frame_pixel.x, frame_pixel.y);
        if !pos.is_valid() {
            return MapAction::None;
        }

        self.set_cursor(pos);
        MapAction::Activate { pos, button }
    }

    // Drag delta in window pixels. Scaled to frame pixels so the map tracks the pointer.
    // Fractions carry over to the next motion until the drag ends.
    pub fn handle_drag(&mut self, dx: i32, dy: i32) -> bool {
        let fx = dx as f32 * self.zoom + self.drag_remainder.0;
        let fy = dy as f32 * self.zoom + self.drag_remainder.1;
        let (px, py) = (fx.trunc(), fy.trunc());
        self.drag_remainder = (fx - px, fy - py);
        self.move_by_pixels(px as i32, py as i32)
    }

    #[inline]
    pub fn end_drag(&mut self) {
        self.drag_remainder = (0.0, 0.0);
    }

    // Wheel zooms while Control is held; plain wheel does nothing here.
    pub fn handle_scroll(&mut self, up: bool, modifiers: InputModifiers) -> bool {
        if !modifiers.intersects(InputModifiers::Control) {
            return false;
        }
        let step = self.configs.zoom_step;
        self.zoom_by(if up { step } else { -step })
    }

    // ----------------------
    // Drawing:
    // ----------------------

    pub fn draw(&mut self, ctx: &mut DrawContext) {
        self.stats.begin_frame();

        let bounds = PixelRect::from_size(self.view.size());
        ctx.surface.fill_rect(bounds, self.configs.background_color);

        if view::is_map_valid(&self.view, ctx.map) {
            self.tiles.sync_palette(&self.palette);
            draw::draw_layers(self, ctx);
        }

        self.stats.end_frame();
    }
}

impl ToroidalView for Viewport {
    #[inline]
    fn view(&self) -> &ViewState {
        &self.view
    }

    #[inline]
    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    // Centers on the cell's lifted vertex.
    fn move_to_map_pos(&mut self, map: &dyn MapStore, pos: MapPos) -> bool {
        let Some(cell) = view::cell_of(&self.view, map, pos) else {
            return false;
        };
        self.view.center_on(cell, Self::lift_of(map, pos))
    }

    fn map_pos_from_screen_pix(&self, map: &dyn MapStore, x: i32, y: i32) -> MapPos {
        self.cell_at_frame_pixel(map, PixelPoint::new(x, y))
            .map_or(MapPos::invalid(), |cell| map.pos(cell.col, cell.row))
    }
}

impl MapWidget for Viewport {
    fn bind_map(&mut self, map: &dyn MapStore) { Viewport::bind_map(self, map) }
    fn unbind_map(&mut self) { Viewport::unbind_map(self) }

    fn resize(&mut self, size: Size) { Viewport::resize(self, size) }
    fn frame_size(&self) -> Size { Viewport::frame_size(self) }

    fn handle_click(&mut self, map: &dyn MapStore, x: i32, y: i32, button: MouseButton) -> MapAction {
        Viewport::handle_click(self, map, x, y, button)
    }

    fn handle_double_click(&mut self, map: &dyn MapStore, x: i32, y: i32, button: MouseButton) -> MapAction {
        Viewport::handle_double_click(self, map, x, y, button)
    }

    fn handle_drag(&mut self, dx: i32, dy: i32) -> bool { Viewport::handle_drag(self, dx, dy) }
    fn handle_drag_end(&mut self) { Viewport::end_drag(self) }
    fn handle_scroll(&mut self, up: bool, modifiers: InputModifiers) -> bool { Viewport::handle_scroll(self, up, modifiers) }

    fn on_height_changed(&mut self, map: &dyn MapStore, pos: MapPos) { Viewport::on_height_changed(self, map, pos) }
    fn step(&mut self, ticks: u32) { Viewport::step(self, ticks) }

    fn is_dirty(&self) -> bool { self.view.is_dirty() }
    fn take_redraw(&mut self) -> bool { self.view.take_redraw() }
    fn draw(&mut self, ctx: &mut DrawContext) { Viewport::draw(self, ctx) }
}
