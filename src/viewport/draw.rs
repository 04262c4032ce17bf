use crate::{
    log,
    render::{sprites, DrawContext, DrawStats, SpriteFlags, SpriteId, SpriteOptions},
    tile::TileKey,
    utils::{Color, PixelRect},
    view::{CellCoord, CellMetrics, PixelPoint, ViewState},
    world::{BuildingInfo, Direction, MapObject, MapPos, MapStore}
};

use super::{Viewport, ViewportLayers, MAX_LIFT_PX};

// Sprites anchored at a vertex may reach this far from it.
const SPRITE_MARGIN_PX: i64 = 2 * CellMetrics::MAP_TILE_WIDTH as i64;

// Path segments and borders are drawn once, from the cell they start at.
const FORWARD_DIRECTIONS: [Direction; 3] = [Direction::Right, Direction::DownRight, Direction::Down];

// ----------------------------------------------
// VisibleCell
// ----------------------------------------------

// A cell replica whose lifted vertex falls inside the frame (plus margin).
// The same cell appears more than once when the frame is larger than the map.
struct VisibleCell {
    cell: CellCoord,
    pos: MapPos,
    vertex: PixelPoint,
}

// Back to front: rows top to bottom, columns left to right.
fn visible_cells(view: &ViewState, map: &dyn MapStore) -> Vec<VisibleCell> {
    let metrics = view.metrics();
    let offset = view.offset();
    let size = view.size();

    let (cw, ch) = (metrics.width as i64, metrics.height as i64);
    let (ox, oy) = (offset.x as i64, offset.y as i64);
    let (width, height) = (size.width as i64, size.height as i64);
    let (cols, rows) = (map.cols() as i64, map.rows() as i64);

    let first_row = (oy - SPRITE_MARGIN_PX).div_euclid(ch);
    let last_row = (oy + height + MAX_LIFT_PX as i64 + SPRITE_MARGIN_PX).div_euclid(ch);

    let mut cells = Vec::new();

    for row in first_row..=last_row {
        let shear = (row * cw).div_euclid(2);
        let first_col = (ox + shear - SPRITE_MARGIN_PX).div_euclid(cw);
        let last_col = (ox + shear + width + SPRITE_MARGIN_PX).div_euclid(cw);

        for col in first_col..=last_col {
            let cell = CellCoord::new(col.rem_euclid(cols) as u32, row.rem_euclid(rows) as u32);
            let pos = map.pos(cell.col, cell.row);
            let lift = map.height(pos) as i64 * CellMetrics::HEIGHT_STEP as i64;

            let x = col * cw - shear - ox;
            let y = row * ch - lift - oy;
            if y < -SPRITE_MARGIN_PX || y >= height + SPRITE_MARGIN_PX {
                continue;
            }

            cells.push(VisibleCell { cell, pos, vertex: PixelPoint::new(x as i32, y as i32) });
        }
    }

    cells
}

// ----------------------------------------------
// Layers
// ----------------------------------------------

pub(super) fn draw_layers(viewport: &mut Viewport, ctx: &mut DrawContext) {
    let layers = viewport.layers;

    if layers.intersects(ViewportLayers::Landscape) {
        draw_landscape(viewport, ctx);
    }

    let cells = visible_cells(&viewport.view, ctx.map);
    let stats = &mut viewport.stats;
    stats.cells_plotted = cells.len() as u32;

    if layers.intersects(ViewportLayers::Paths) {
        draw_paths_and_borders(&cells, ctx, stats);
    }

    if layers.intersects(ViewportLayers::Objects) {
        let burning_frame = (viewport.anim_tick / viewport.configs.burning_frame_ticks.max(1)) % sprites::BURNING_FRAME_COUNT;
        draw_objects(&cells, ctx, stats, burning_frame);
    }

    if layers.intersects(ViewportLayers::Serfs) {
        draw_serfs(&cells, ctx, stats);
    }

    if layers.intersects(ViewportLayers::Grid) {
        draw_grid(&cells, ctx, viewport.configs.grid_colors);
    }

    if layers.intersects(ViewportLayers::DebugCoords) {
        draw_debug_coords(viewport.cursor, ctx, viewport.configs.grid_colors[0]);
    }

    if layers.intersects(ViewportLayers::Cursor) && viewport.cursor.is_valid() {
        for visible in cells.iter().filter(|visible| visible.pos == viewport.cursor) {
            let drawn = ctx.surface.draw_sprite(
                sprites::CURSOR,
                visible.vertex.x,
                visible.vertex.y,
                SpriteOptions::transparent().with_flags(SpriteFlags::Centered));
            stats.sprite(drawn);
        }
    }
}

// Blits every cached tile that overlaps the frame, rendering missing ones.
fn draw_landscape(viewport: &mut Viewport, ctx: &mut DrawContext) {
    let Some(layout) = viewport.tiles.layout().copied() else {
        return;
    };

    let metrics = viewport.view.metrics();
    let offset = viewport.view.offset();
    let size = viewport.view.size();
    let bounds = PixelRect::from_size(size);

    let (cw, ch) = (metrics.width as i64, metrics.height as i64);
    let (ox, oy) = (offset.x as i64, offset.y as i64);
    let (width, height) = (size.width as i64, size.height as i64);
    let max_lift = MAX_LIFT_PX as i64;

    let tile_width = layout.tile_cols() as i64 * cw;
    let tile_height = layout.tile_rows() as i64 * ch;
    let tile_shear = (layout.tile_rows() as i64 * cw) / 2;
    let (tiles_x, tiles_y) = (layout.tiles_x() as i64, layout.tiles_y() as i64);

    let first_row = (oy - tile_height).div_euclid(tile_height);
    let last_row = (oy + height + max_lift).div_euclid(tile_height);

    for tile_row in first_row..=last_row {
        let anchor_row = tile_row * layout.tile_rows() as i64;
        let shear = (anchor_row * cw).div_euclid(2);
        let anchor_y = anchor_row * ch - oy;

        // Heights only lift vertices, so a tile spans [anchor - max lift, anchor + tile height].
        if anchor_y - max_lift >= height || anchor_y + tile_height < 0 {
            continue;
        }

        let first_col = (ox + shear - tile_width).div_euclid(tile_width);
        let last_col = (ox + shear + width + tile_shear).div_euclid(tile_width);

        for tile_col in first_col..=last_col {
            let anchor_x = tile_col * tile_width - shear - ox;
            if anchor_x - tile_shear >= width || anchor_x + tile_width < 0 {
                continue;
            }

            let key = TileKey::new(tile_col.rem_euclid(tiles_x) as u32, tile_row.rem_euclid(tiles_y) as u32);
            let Some(tile) = viewport.tiles.get_or_render(ctx.map, &viewport.palette, key) else {
                continue;
            };

            let x = anchor_x as i32 + tile.origin.x;
            let y = anchor_y as i32 + tile.origin.y;
            let rect = PixelRect::new(x, y, tile.image.width() as i32, tile.image.height() as i32);
            if rect.intersects(&bounds) {
                ctx.surface.draw_image(&tile.image, x, y);
                viewport.stats.tiles_drawn += 1;
            }
        }
    }
}

// Pixel step from a vertex to its neighbour's flat vertex.
#[inline]
fn neighbour_step(dir: Direction) -> PixelPoint {
    let (cw, ch) = (CellMetrics::MAP_TILE_WIDTH, CellMetrics::MAP_TILE_HEIGHT);
    match dir {
        Direction::Right     => PixelPoint::new(cw, 0),
        Direction::DownRight => PixelPoint::new(cw / 2, ch),
        Direction::Down      => PixelPoint::new(-cw / 2, ch),
        Direction::Left      => PixelPoint::new(-cw, 0),
        Direction::UpLeft    => PixelPoint::new(-cw / 2, -ch),
        Direction::Up        => PixelPoint::new(cw / 2, -ch),
    }
}

fn draw_paths_and_borders(cells: &[VisibleCell], ctx: &mut DrawContext, stats: &mut DrawStats) {
    let map = ctx.map;

    for visible in cells {
        let paths = map.paths(visible.pos);
        let owner = map.owner(visible.pos);
        let lift = map.height(visible.pos) as i32 * CellMetrics::HEIGHT_STEP;

        for dir in FORWARD_DIRECTIONS {
            if paths.contains(dir.flag()) {
                let drawn = ctx.surface.draw_sprite(
                    sprites::PATH_SEGMENT_BASE.offset(dir as u32),
                    visible.vertex.x,
                    visible.vertex.y,
                    SpriteOptions::transparent());
                stats.sprite(drawn);
            }

            // Border dot halfway to a neighbour owned by someone else.
            let neighbour = map.move_in_direction(visible.pos, dir);
            if map.owner(neighbour) != owner {
                let step = neighbour_step(dir);
                let neighbour_lift = map.height(neighbour) as i32 * CellMetrics::HEIGHT_STEP;
                let x = visible.vertex.x + step.x / 2;
                let y = visible.vertex.y + (step.y + lift - neighbour_lift) / 2;
                let drawn = ctx.surface.draw_sprite(
                    sprites::BORDER_DOT,
                    x,
                    y,
                    SpriteOptions::transparent().with_flags(SpriteFlags::Centered));
                stats.sprite(drawn);
            }
        }
    }
}

fn draw_objects(cells: &[VisibleCell], ctx: &mut DrawContext, stats: &mut DrawStats, burning_frame: u32) {
    for visible in cells {
        let raw = ctx.map.object(visible.pos);
        let Ok(object) = MapObject::try_from(raw) else {
            log::verbose!(log::channel!("viewport"), "Skipping undecodable object {raw} at {}.", visible.cell);
            continue;
        };

        let sprite = match object {
            MapObject::None => continue,
            MapObject::Flag => Some((sprites::FLAG, SpriteOptions::transparent())),
            object if object.is_building() => {
                ctx.entities.building_at(visible.pos).map(|building| building_sprite(&building, burning_frame))
            }
            object => Some((sprites::MAP_OBJECT_BASE.offset(object as u32), SpriteOptions::transparent())),
        };

        if let Some((sprite, options)) = sprite {
            let drawn = ctx.surface.draw_sprite(sprite, visible.vertex.x, visible.vertex.y, options);
            stats.sprite(drawn);
        }
    }
}

fn building_sprite(building: &BuildingInfo, burning_frame: u32) -> (SpriteId, SpriteOptions) {
    let kind = building.kind as u32;
    if building.burning {
        (sprites::BURNING_BASE.offset(burning_frame), SpriteOptions::transparent())
    } else if building.is_finished() {
        (sprites::BUILDING_BASE.offset(kind), SpriteOptions::transparent())
    } else {
        // Construction frame rises from the ground as work progresses.
        (sprites::FRAME_BASE.offset(kind), SpriteOptions::transparent().with_reveal(building.progress))
    }
}

fn draw_serfs(cells: &[VisibleCell], ctx: &mut DrawContext, stats: &mut DrawStats) {
    for visible in cells {
        let Some(serf) = ctx.entities.serf_at(visible.pos) else {
            continue;
        };

        let mut options = SpriteOptions::transparent();
        if let Some(color) = ctx.entities.player_color(serf.owner) {
            options = options.with_tint(color);
        }

        let drawn = ctx.surface.draw_sprite(
            sprites::SERF.offset(serf.facing as u32),
            visible.vertex.x,
            visible.vertex.y,
            options);
        stats.sprite(drawn);
    }
}

fn draw_grid(cells: &[VisibleCell], ctx: &mut DrawContext, colors: [Color; 2]) {
    for visible in cells {
        let color = colors[((visible.cell.col + visible.cell.row) & 1) as usize];
        ctx.surface.fill_rect(PixelRect::new(visible.vertex.x, visible.vertex.y, 1, 1), color);
    }
}

fn draw_debug_coords(cursor: MapPos, ctx: &mut DrawContext, color: Color) {
    if !cursor.is_valid() {
        return;
    }

    let map = ctx.map;
    let text = format!("{},{} h{}", map.pos_col(cursor), map.pos_row(cursor), map.height(cursor));
    ctx.surface.draw_text(4, 4, &text, color);
}
