use image::{Rgba, RgbaImage};

use crate::{
    log,
    engine::config::TerrainPalette,
    utils::Color,
    view::{CellMetrics, PixelPoint},
    world::{MapPos, MapStore, TerrainType, Triangle}
};

use super::{TileKey, TileLayout};

// ----------------------------------------------
// TileImage
// ----------------------------------------------

// Prerendered terrain of one tile.
pub struct TileImage {
    pub image: RgbaImage,
    // Top-left of the image relative to the anchor cell's flat vertex, in map-pixels.
    pub origin: PixelPoint,
}

// ----------------------------------------------
// Tile rasterization
// ----------------------------------------------

struct ShadedTriangle {
    vertices: [PixelPoint; 3],
    color: Color,
}

// Renders every cell of the tile as an up and a down triangle with flat
// slope shading. Vertices reference the heights of the neighbouring cells
// to the right and below, which may belong to other tiles.
//
// Returns None if a terrain value cannot be decoded or has no palette color.
pub fn render_tile(map: &dyn MapStore,
                   palette: &TerrainPalette,
                   layout: &TileLayout,
                   metrics: CellMetrics,
                   key: TileKey) -> Option<TileImage> {

    let anchor = layout.anchor(key);
    let (tile_cols, tile_rows) = (layout.tile_cols(), layout.tile_rows());
    let stride = (tile_cols + 1) as usize;

    // Height of each cell vertex, (tile_cols + 1) x (tile_rows + 1).
    let heights: Vec<i32> = (0..=tile_rows)
        .flat_map(|j| (0..=tile_cols).map(move |i| (i, j)))
        .map(|(i, j)| map.height(map.pos(anchor.col + i, anchor.row + j)) as i32)
        .collect();

    let vertex = |i: u32, j: u32| -> PixelPoint {
        let row = (anchor.row + j) as i32;
        PixelPoint {
            x: i as i32 * metrics.width - (row * metrics.width) / 2 + (anchor.row as i32 * metrics.width) / 2,
            y: j as i32 * metrics.height - heights[(j as usize) * stride + i as usize] * CellMetrics::HEIGHT_STEP,
        }
    };
    let height_at = |i: u32, j: u32| heights[(j as usize) * stride + i as usize];

    let mut triangles = Vec::with_capacity((tile_cols * tile_rows * 2) as usize);

    for j in 0..tile_rows {
        for i in 0..tile_cols {
            let pos = map.pos(anchor.col + i, anchor.row + j);

            let up_color = terrain_color(map, palette, key, pos, Triangle::Up)?;
            triangles.push(ShadedTriangle {
                vertices: [vertex(i, j), vertex(i, j + 1), vertex(i + 1, j + 1)],
                color: up_color.shaded(slope_shade(height_at(i, j + 1), height_at(i + 1, j + 1))),
            });

            let down_color = terrain_color(map, palette, key, pos, Triangle::Down)?;
            triangles.push(ShadedTriangle {
                vertices: [vertex(i, j), vertex(i + 1, j), vertex(i + 1, j + 1)],
                color: down_color.shaded(slope_shade(height_at(i, j), height_at(i + 1, j))),
            });
        }
    }

    let mut min = PixelPoint::new(i32::MAX, i32::MAX);
    let mut max = PixelPoint::new(i32::MIN, i32::MIN);
    for point in triangles.iter().flat_map(|triangle| triangle.vertices) {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }

    let mut image = RgbaImage::new((max.x - min.x + 1) as u32, (max.y - min.y + 1) as u32);
    for triangle in &triangles {
        let local = triangle.vertices.map(|v| PixelPoint::new(v.x - min.x, v.y - min.y));
        fill_triangle(&mut image, local, triangle.color);
    }

    Some(TileImage { image, origin: min })
}

fn terrain_color(map: &dyn MapStore,
                 palette: &TerrainPalette,
                 key: TileKey,
                 pos: MapPos,
                 triangle: Triangle) -> Option<Color> {

    let raw = map.terrain(pos, triangle);
    let Ok(terrain) = TerrainType::try_from(raw) else {
        log::warn!(log::channel!("tiles"), "Tile {key}: invalid terrain value {raw} at {pos}.");
        return None;
    };

    let color = palette.color(terrain);
    if color.is_none() {
        log::warn!(log::channel!("tiles"), "Tile {key}: no palette color for {terrain:?}.");
    }
    color
}

// Light comes from the left: slopes rising to the right are darker.
#[inline]
fn slope_shade(left_height: i32, right_height: i32) -> f32 {
    (1.0 + 0.06 * (left_height - right_height) as f32).clamp(0.55, 1.45)
}

#[inline]
fn edge(a: PixelPoint, b: PixelPoint, p: PixelPoint) -> i64 {
    (b.x - a.x) as i64 * (p.y - a.y) as i64 - (b.y - a.y) as i64 * (p.x - a.x) as i64
}

// Fills all pixels whose corner lies inside or on the triangle.
pub fn fill_triangle(image: &mut RgbaImage, vertices: [PixelPoint; 3], color: Color) {
    let [a, b, c] = vertices;
    let area = edge(a, b, c);
    if area == 0 {
        return; // Degenerate.
    }

    let min_x = a.x.min(b.x).min(c.x).max(0);
    let min_y = a.y.min(b.y).min(c.y).max(0);
    let max_x = a.x.max(b.x).max(c.x).min(image.width() as i32 - 1);
    let max_y = a.y.max(b.y).max(c.y).min(image.height() as i32 - 1);

    let pixel = Rgba(color.to_array());

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = PixelPoint::new(x, y);
            let w0 = edge(b, c, p);
            let w1 = edge(c, a, p);
            let w2 = edge(a, b, p);
            let inside = if area > 0 {
                w0 >= 0 && w1 >= 0 && w2 >= 0
            } else {
                w0 <= 0 && w1 <= 0 && w2 <= 0
            };
            if inside {
                image.put_pixel(x as u32, y as u32, pixel);
            }
        }
    }
}
