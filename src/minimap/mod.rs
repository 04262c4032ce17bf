use serde::{Deserialize, Serialize};

use crate::{
    bitflags_with_display,
    log,
    app::{MapAction, MapWidget, input::{InputModifiers, MouseButton}},
    engine::config::{MapViewConfigs, MinimapConfigs, TerrainPalette},
    render::{sprites, DrawContext, DrawStats, DrawSurface, SpriteFlags, SpriteOptions},
    utils::{Color, PixelRect, Size},
    view::{self, CellCoord, CellMetrics, PixelPoint, ToroidalView, Transform, ViewState},
    world::{BuildingKind, EntityStore, MapGeometry, MapObject, MapPos, MapStore, TerrainType, Triangle, MAX_HEIGHT}
};


// ----------------------------------------------
// MinimapLayers
// ----------------------------------------------

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MinimapLayers: u8 {
        // Player territory plotted over the terrain.
        const Ownership     = 1 << 0;
        // Player territory only, on a plain background.
        const OwnershipOnly = 1 << 1;
        const Roads         = 1 << 2;
        const Buildings     = 1 << 3;
        const Grid          = 1 << 4;
    }
}

impl Default for MinimapLayers {
    fn default() -> Self {
        Self::Buildings
    }
}

// ----------------------------------------------
// BuildingFilter
// ----------------------------------------------

// Building kinds selectable by the advanced minimap filter, by index.
// Index 0 is never a filter (indices <= 0 show every building).
pub const BUILDING_FILTER_REMAP: [BuildingKind; 24] = [
    BuildingKind::Castle,
    BuildingKind::Stock,
    BuildingKind::Tower,
    BuildingKind::Hut,
    BuildingKind::Fortress,
    BuildingKind::Toolmaker,
    BuildingKind::Sawmill,
    BuildingKind::Weaponsmith,
    BuildingKind::Stonecutter,
    BuildingKind::Boatbuilder,
    BuildingKind::Forester,
    BuildingKind::Lumberjack,
    BuildingKind::Pigfarm,
    BuildingKind::Farm,
    BuildingKind::Fisher,
    BuildingKind::Mill,
    BuildingKind::Butcher,
    BuildingKind::Baker,
    BuildingKind::Stonemine,
    BuildingKind::Coalmine,
    BuildingKind::Ironmine,
    BuildingKind::Goldmine,
    BuildingKind::Steelsmelter,
    BuildingKind::Goldsmelter,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildingFilter {
    All,
    Only(BuildingKind),
    // Index past the end of the remap table.
    Nothing,
}

impl BuildingFilter {
    pub fn from_index(index: i32) -> Self {
        if index <= 0 {
            return Self::All;
        }
        match BUILDING_FILTER_REMAP.get(index as usize) {
            Some(kind) => Self::Only(*kind),
            None => Self::Nothing,
        }
    }

    // Any filter other than All also enables the traffic layer.
    #[inline]
    pub fn is_active(self) -> bool {
        self != Self::All
    }
}

// ----------------------------------------------
// Minimap
// ----------------------------------------------

pub struct Minimap {
    view: ViewState,
    layers: MinimapLayers,
    advanced: i32,
    configs: MinimapConfigs,
    palette: TerrainPalette,
    stats: DrawStats,
}

impl Minimap {
    pub fn new(configs: &MapViewConfigs) -> Self {
        Self {
            view: ViewState::new(CellMetrics::scaled(1), configs.minimap.min_scale, configs.minimap.max_scale),
            layers: configs.minimap.default_layers,
            advanced: -1,
            configs: configs.minimap.clone(),
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
                log::info!(log::channel!("minimap"), "Minimap bound to {geometry} map.");
            }
            None => self.view.unbind(),
        }
    }

    #[inline]
    pub fn unbind_map(&mut self) {
        self.view.unbind();
    }

    // ----------------------
    // Layers & filter:
    // ----------------------

    #[inline]
    pub fn layers(&self) -> MinimapLayers {
        self.layers
    }

    pub fn set_layers(&mut self, layers: MinimapLayers) {
        if layers != self.layers {
            self.layers = layers;
            self.view.set_redraw();
        }
    }

    pub fn toggle_layer(&mut self, layer: MinimapLayers) {
        self.set_layers(self.layers ^ layer);
    }

    #[inline]
    pub fn advanced(&self) -> i32 {
        self.advanced
    }

    // Raw advanced filter index as chosen in the UI. See BuildingFilter::from_index().
    pub fn set_advanced(&mut self, index: i32) {
        if index != self.advanced {
            if let BuildingFilter::Nothing = BuildingFilter::from_index(index) {
                log::warn!(log::channel!("minimap"), "Building filter index {index} out of range; no buildings shown.");
            }
            self.advanced = index;
            self.view.set_redraw();
        }
    }

    #[inline]
    pub fn building_filter(&self) -> BuildingFilter {
        BuildingFilter::from_index(self.advanced)
    }

    pub fn set_palette(&mut self, palette: TerrainPalette) {
        self.palette = palette;
        self.view.set_redraw();
    }

    #[inline]
    pub fn stats(&self) -> &DrawStats {
        &self.stats
    }

    // ----------------------
    // Input:
    // ----------------------

    // Left click recenters the main viewport on the clicked cell.
    pub fn handle_click(&mut self, map: &dyn MapStore, x: i32, y: i32, button: MouseButton) -> MapAction {
        if button != MouseButton::Left {
            return MapAction::None;
        }
        let pos = self.map_pos_from_screen_pix(map, x, y);
        if !pos.is_valid() {
            return MapAction::None;
        }
        MapAction::CenterViewport(pos)
    }

    pub fn handle_drag(&mut self, dx: i32, dy: i32) -> bool {
        self.move_by_pixels(dx, dy)
    }

    // Wheel up zooms in one scale step. Returns false when already at the limit.
    pub fn handle_scroll(&mut self, up: bool, _modifiers: InputModifiers) -> bool {
        let step = if up { 1 } else { -1 };
        self.view.set_scale(self.view.scale() + step)
    }

    // ----------------------
    // Drawing:
    // ----------------------

    pub fn draw(&mut self, ctx: &mut DrawContext) {
        self.stats.begin_frame();

        let size = self.view.size();
        let bounds = PixelRect::from_size(size);

        let transform = match self.view.transform() {
            Some(transform) if view::is_map_valid(&self.view, ctx.map) => transform,
            _ => {
                ctx.surface.fill_rect(bounds, self.configs.background_color);
                self.stats.end_frame();
                return;
            }
        };

        let mut plotter = PointPlotter {
            surface: &mut *ctx.surface,
            transform,
            offset: self.view.offset(),
            size,
            cells_plotted: 0,
        };
        let scale = self.view.scale();
        let map = ctx.map;
        let entities = ctx.entities;
        let filter = self.building_filter();

        // Terrain and ownership.
        if self.layers.intersects(MinimapLayers::OwnershipOnly) {
            plotter.surface.fill_rect(bounds, self.configs.background_color);
            draw_ownership(&mut plotter, map, entities, 2);
        } else {
            draw_terrain(&mut plotter, map, &self.palette, scale);
            if self.layers.intersects(MinimapLayers::Ownership) {
                draw_ownership(&mut plotter, map, entities, 1);
            }
        }

        if self.layers.intersects(MinimapLayers::Roads) {
            for_each_cell(map, |cell, pos| {
                if map.has_path(pos) {
                    plotter.plot_cell(cell, self.configs.road_color, scale);
                }
            });
        }

        if self.layers.intersects(MinimapLayers::Buildings) {
            for_each_cell(map, |cell, pos| {
                if !MapObject::is_building_raw(map.object(pos)) {
                    return;
                }
                let shown = match filter {
                    BuildingFilter::All => true,
                    BuildingFilter::Only(kind) => entities.building_at(pos).is_some_and(|b| b.kind == kind),
                    BuildingFilter::Nothing => false,
                };
                if shown {
                    if let Some(color) = owner_color(map, entities, pos) {
                        plotter.plot_cell(cell, color, scale);
                    }
                }
            });
        }

        // Traffic: idle serfs, only while a building filter is active.
        // The Nothing filter hides buildings only, so traffic still shows.
        if filter.is_active() {
            for_each_cell(map, |cell, pos| {
                if map.idle_serf(pos) {
                    if let Some(color) = owner_color(map, entities, pos) {
                        plotter.plot_cell(cell, color, scale);
                    }
                }
            });
        }

        if self.layers.intersects(MinimapLayers::Grid) {
            draw_grid(&mut plotter, self.configs.grid_colors);
        }

        self.stats.cells_plotted = plotter.cells_plotted;

        // Position of the main viewport, always at the center.
        let drawn = ctx.surface.draw_sprite(
            sprites::MINIMAP_VIEW_RECT,
            size.width / 2,
            size.height / 2,
            SpriteOptions::transparent().with_flags(SpriteFlags::Centered));
        self.stats.sprite(drawn);

        self.stats.end_frame();
    }
}

impl ToroidalView for Minimap {
    #[inline]
    fn view(&self) -> &ViewState {
        &self.view
    }

    #[inline]
    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }
}

impl MapWidget for Minimap {
    fn bind_map(&mut self, map: &dyn MapStore) { Minimap::bind_map(self, map) }
    fn unbind_map(&mut self) { Minimap::unbind_map(self) }

    fn resize(&mut self, size: Size) { self.view.resize(size) }
    fn frame_size(&self) -> Size { self.view.size() }

    fn handle_click(&mut self, map: &dyn MapStore, x: i32, y: i32, button: MouseButton) -> MapAction {
        Minimap::handle_click(self, map, x, y, button)
    }

    fn handle_double_click(&mut self, _map: &dyn MapStore, _x: i32, _y: i32, _button: MouseButton) -> MapAction {
        MapAction::None
    }

    fn handle_drag(&mut self, dx: i32, dy: i32) -> bool { Minimap::handle_drag(self, dx, dy) }
    fn handle_drag_end(&mut self) {}
    fn handle_scroll(&mut self, up: bool, modifiers: InputModifiers) -> bool { Minimap::handle_scroll(self, up, modifiers) }

    // Points are recolored by height.
    fn on_height_changed(&mut self, _map: &dyn MapStore, _pos: MapPos) { self.view.set_redraw() }
    fn step(&mut self, _ticks: u32) {}

    fn is_dirty(&self) -> bool { self.view.is_dirty() }
    fn take_redraw(&mut self) -> bool { self.view.take_redraw() }
    fn draw(&mut self, ctx: &mut DrawContext) { Minimap::draw(self, ctx) }
}

// ----------------------------------------------
// Layers
// ----------------------------------------------

fn draw_terrain(plotter: &mut PointPlotter, map: &dyn MapStore, palette: &TerrainPalette, scale: i32) {
    for_each_cell(map, |cell, pos| {
        let Ok(terrain) = TerrainType::try_from(map.terrain(pos, Triangle::Up)) else {
            return;
        };
        if let Some(color) = palette.color(terrain) {
            let brightness = 0.7 + 0.6 * (map.height(pos) as f32 / MAX_HEIGHT as f32);
            plotter.plot_cell(cell, color.shaded(brightness), scale);
        }
    });
}

fn draw_ownership(plotter: &mut PointPlotter,
                  map: &dyn MapStore,
                  entities: &dyn EntityStore,
                  density: i32) {
    for_each_cell(map, |cell, pos| {
        if let Some(color) = owner_color(map, entities, pos) {
            plotter.plot_cell(cell, color, density);
        }
    });
}

// Dashes along the seams of column 0 and row 0, in map-pixel space.
fn draw_grid(plotter: &mut PointPlotter, colors: [Color; 2]) {
    let map_width = plotter.transform.map_width();
    let map_height = plotter.transform.map_height();
    let metrics = plotter.transform.metrics();

    for y in 0..map_height {
        let x = -(y * metrics.width).div_euclid(2 * metrics.height);
        plotter.plot_map_pixel(PixelPoint::new(x, y), colors[(y & 1) as usize], 1);
    }

    for x in 0..map_width {
        plotter.plot_map_pixel(PixelPoint::new(x, 0), colors[(x & 1) as usize], 1);
    }
}

#[inline]
fn owner_color(map: &dyn MapStore, entities: &dyn EntityStore, pos: MapPos) -> Option<Color> {
    map.owner(pos).and_then(|owner| entities.player_color(owner))
}

// Visits every cell of the map once.
#[inline]
fn for_each_cell<F>(map: &dyn MapStore, mut visitor: F)
    where F: FnMut(CellCoord, MapPos)
{
    for row in 0..map.rows() {
        for col in 0..map.cols() {
            visitor(CellCoord::new(col, row), map.pos(col, row));
        }
    }
}

// ----------------------------------------------
// PointPlotter
// ----------------------------------------------

// Plots square points of a given density at every visible replica of a
// map-pixel on the torus.
struct PointPlotter<'a> {
    surface: &'a mut dyn DrawSurface,
    transform: Transform,
    offset: PixelPoint,
    size: Size,
    cells_plotted: u32,
}

impl PointPlotter<'_> {
    #[inline]
    fn plot_cell(&mut self, cell: CellCoord, color: Color, density: i32) {
        let map_pixel = self.transform.map_pixel_from_cell(cell);
        self.plot_map_pixel(map_pixel, color, density);
    }

    fn plot_map_pixel(&mut self, map_pixel: PixelPoint, color: Color, density: i32) {
        let map_width = self.transform.map_width();
        let map_height = self.transform.map_height();
        let shear = self.transform.shear();

        // Screen position in [0,W) x [0,H), then start one map height above.
        let screen = self.transform.screen_pixel_from_map_pixel(map_pixel, self.offset);
        let mut y = screen.y - map_height;
        let mut x = screen.x - shear;

        while y < self.size.height {
            if y > -density {
                let mut px = x.rem_euclid(map_width) - map_width;
                while px < self.size.width {
                    if px > -density {
                        self.surface.fill_rect(PixelRect::new(px, y, density, density), color);
                        self.cells_plotted += 1;
                    }
                    px += map_width;
                }
            }
            y += map_height;
            x += shear;
        }
    }
}
