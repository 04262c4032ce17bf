use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use super::*;
use crate::{
    utils::Size,
    world::{GridMap, MapGeometry}
};

fn geometry(cols: u32, rows: u32) -> MapGeometry {
    MapGeometry::new(cols, rows).unwrap()
}

fn minimap_view(geo: MapGeometry, size: Size) -> ViewState {
    let mut view = ViewState::new(CellMetrics::scaled(1), 1, 8);
    view.resize(size);
    view.bind(geo);
    view
}

struct TestView {
    view: ViewState,
}

impl ToroidalView for TestView {
    fn view(&self) -> &ViewState {
        &self.view
    }
    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }
}

// ----------------------------------------------
// Transform
// ----------------------------------------------

#[test]
fn test_map_pixel_from_cell_scenarios() {
    let transform = Transform::new(geometry(64, 64), CellMetrics::scaled(1));

    assert_eq!(transform.map_pixel_from_cell(CellCoord::new(0, 0)), PixelPoint::new(0, 0));
    // mx = 0 - 63/2 = -31, wrapped into [0,64).
    assert_eq!(transform.map_pixel_from_cell(CellCoord::new(0, 63)), PixelPoint::new(33, 63));
    assert_eq!(transform.map_pixel_from_cell(CellCoord::new(10, 4)), PixelPoint::new(8, 4));
}

#[test]
fn test_round_trip_all_scales() {
    let geo = geometry(64, 32);
    for scale in 1..=8 {
        let transform = Transform::new(geo, CellMetrics::scaled(scale));
        for row in 0..geo.rows() {
            for col in 0..geo.cols() {
                let cell = CellCoord::new(col, row);
                let map_pixel = transform.map_pixel_from_cell(cell);
                let screen_pixel = transform.screen_pixel_from_map_pixel(map_pixel, PixelPoint::zero());
                assert_eq!(transform.cell_from_screen_pixel(screen_pixel, PixelPoint::zero()), cell,
                           "scale {scale}, cell {cell}");
            }
        }
    }
}

#[test]
fn test_round_trip_viewport_metrics_and_lift() {
    let geo = geometry(32, 32);
    let transform = Transform::new(geo, CellMetrics::viewport());

    for row in 0..geo.rows() {
        for col in 0..geo.cols() {
            let cell = CellCoord::new(col, row);
            let map_pixel = transform.map_pixel_from_cell(cell);
            assert!(map_pixel.x >= 0 && map_pixel.x < transform.map_width());
            assert!(map_pixel.y >= 0 && map_pixel.y < transform.map_height());
            assert_eq!(transform.cell_from_map_pixel(map_pixel), cell);

            // Lifting a vertex moves it up but it stays the same point on the torus.
            let lifted = transform.map_pixel_from_cell_lifted(cell, 31 * CellMetrics::HEIGHT_STEP);
            assert!(lifted.y >= 0 && lifted.y < transform.map_height());
            let dropped = transform.normalize(PixelPoint::new(lifted.x, lifted.y + 31 * CellMetrics::HEIGHT_STEP));
            assert_eq!(dropped, map_pixel);
        }
    }
}

#[test]
fn test_pixels_inside_cell_pick_that_cell() {
    let geo = geometry(16, 16);
    for metrics in [CellMetrics::scaled(3), CellMetrics::viewport()] {
        let transform = Transform::new(geo, metrics);
        let (cw, ch) = (metrics.width, metrics.height);

        for cell in [CellCoord::new(0, 0), CellCoord::new(5, 7), CellCoord::new(15, 15)] {
            let vertex = transform.map_pixel_from_cell(cell);
            for j in 0..ch {
                let shear = ((vertex.y + j) * cw).div_euclid(2 * ch) - (vertex.y * cw).div_euclid(2 * ch);
                for i in 0..cw {
                    let pixel = PixelPoint::new(vertex.x + i - shear, vertex.y + j);
                    assert_eq!(transform.cell_from_map_pixel(pixel), cell, "pixel {pixel}");
                }
            }
        }
    }
}

#[test]
fn test_screen_pixel_wraps_with_shear() {
    let transform = Transform::new(geometry(32, 32), CellMetrics::scaled(2));
    assert_eq!(transform.map_width(), 64);
    assert_eq!(transform.map_height(), 64);
    assert_eq!(transform.shear(), 32);

    // One map height above is the same as the origin shifted by the shear.
    let screen = transform.screen_pixel_from_map_pixel(PixelPoint::new(0, 0), PixelPoint::new(0, 1));
    assert_eq!(screen, PixelPoint::new(64 - 32, 63));

    let screen = transform.screen_pixel_from_map_pixel(PixelPoint::new(10, 10), PixelPoint::new(-500, 300));
    assert!(screen.x >= 0 && screen.x < 64);
    assert!(screen.y >= 0 && screen.y < 64);
}

#[test]
fn test_recentered_offset() {
    let transform = Transform::new(geometry(64, 64), CellMetrics::scaled(1));

    let offset = transform.recentered_offset(CellCoord::new(0, 0), 0, 128, 128);
    assert!(offset.x >= 0 && offset.x < 64);
    assert!(offset.y >= 0 && offset.y < 64);
    assert_eq!(transform.cell_from_screen_pixel(PixelPoint::new(64, 64), offset), CellCoord::new(0, 0));
}

// ----------------------------------------------
// ViewState
// ----------------------------------------------

#[test]
fn test_bind_resets_state() {
    let mut view = minimap_view(geometry(32, 32), Size::new(128, 128));
    view.set_scale(4);
    view.shift_by_pixels(7, 9);
    view.take_redraw();

    view.bind(geometry(64, 64));
    assert_eq!(view.scale(), 1);
    assert_eq!(view.offset(), PixelPoint::zero());
    assert!(view.is_dirty());
}

#[test]
fn test_shift_zero_is_a_no_op() {
    let mut view = minimap_view(geometry(32, 32), Size::new(128, 128));
    view.shift_by_pixels(3, 4);
    assert!(view.take_redraw());

    let before = view.offset();
    assert!(!view.shift_by_pixels(0, 0));
    assert_eq!(view.offset(), before);
    assert!(!view.is_dirty());
}

#[test]
fn test_shift_drag_scenario() {
    let mut view = minimap_view(geometry(32, 32), Size::new(128, 128));
    view.set_scale(2);
    view.center_on(CellCoord::new(0, 0), 0);
    let start = view.offset();
    // Bring the offset to (5,5).
    view.shift_by_pixels(5 - start.x, 5 - start.y);
    assert_eq!(view.offset(), PixelPoint::new(5, 5));

    assert!(view.shift_by_pixels(10, 0));
    assert_eq!(view.offset(), PixelPoint::new(15, 5));
}

#[test]
fn test_wrap_invariant_under_shifts_and_scales() {
    let mut rng = Pcg64::seed_from_u64(1234);
    let mut view = minimap_view(geometry(64, 32), Size::new(128, 96));

    for _ in 0..2000 {
        if rng.random_range(0..10) == 0 {
            view.set_scale(rng.random_range(-2..12));
        } else {
            view.shift_by_pixels(rng.random_range(-5000..5000), rng.random_range(-5000..5000));
        }

        let transform = view.transform().unwrap();
        let offset = view.offset();
        assert!(offset.x >= 0 && offset.x < transform.map_width(), "offset {offset}");
        assert!(offset.y >= 0 && offset.y < transform.map_height(), "offset {offset}");
        assert!(view.scale() >= 1 && view.scale() <= 8);
    }
}

#[test]
fn test_shift_there_and_back() {
    let mut view = minimap_view(geometry(32, 64), Size::new(100, 100));
    view.set_scale(3);
    let start = view.offset();

    view.shift_by_pixels(-777, 1234);
    view.shift_by_pixels(777, -1234);
    assert_eq!(view.offset(), start);
}

#[test]
fn test_zoom_keeps_center_cell() {
    let geo = geometry(64, 64);
    for start_scale in 1..=8 {
        for target_scale in 1..=8 {
            let mut view = minimap_view(geo, Size::new(128, 128));
            view.set_scale(start_scale);
            view.shift_by_pixels(start_scale * 37, start_scale * 11);

            let center = view.query_center_cell().unwrap();
            view.set_scale(target_scale);
            assert_eq!(view.query_center_cell(), Some(center),
                       "scale {start_scale} -> {target_scale}");
        }
    }
}

#[test]
fn test_set_scale_clamped_no_op() {
    let mut view = minimap_view(geometry(32, 32), Size::new(128, 128));
    assert!(view.set_scale(8));
    view.shift_by_pixels(3, 3);
    view.take_redraw();

    let before = view.offset();
    assert!(!view.set_scale(9));
    assert_eq!(view.scale(), 8);
    assert_eq!(view.offset(), before);
    assert!(!view.is_dirty());

    assert!(view.set_scale(-3));
    assert_eq!(view.scale(), 1);
}

#[test]
fn test_resize_keeps_center_cell() {
    let mut view = minimap_view(geometry(64, 64), Size::new(128, 128));
    view.set_scale(3);
    view.shift_by_pixels(51, 13);
    let center = view.query_center_cell();

    view.resize(Size::new(200, 90));
    assert_eq!(view.query_center_cell(), center);
}

#[test]
fn test_unbound_view() {
    let mut view = ViewState::new(CellMetrics::scaled(1), 1, 8);
    assert!(!view.is_bound());
    assert!(!view.shift_by_pixels(4, 4));
    assert!(view.query_center_cell().is_none());
    assert!(view.set_scale(3));
    assert_eq!(view.scale(), 3);
}

// ----------------------------------------------
// ToroidalView
// ----------------------------------------------

#[test]
fn test_toroidal_view_positions() {
    let map = GridMap::new(geometry(32, 32));
    let mut test_view = TestView { view: minimap_view(map.geometry(), Size::new(64, 64)) };

    let pos = map.pos(12, 20);
    assert!(test_view.move_to_map_pos(&map, pos));
    assert_eq!(test_view.current_map_pos(&map), pos);

    assert!(test_view.move_by_pixels(1, 0));
    assert!(!test_view.move_by_pixels(0, 0));

    assert!(!test_view.move_to_map_pos(&map, MapPos::invalid()));
}

#[test]
fn test_toroidal_view_rejects_swapped_map() {
    let map = GridMap::new(geometry(32, 32));
    let other = GridMap::new(geometry(64, 32));
    let mut test_view = TestView { view: minimap_view(map.geometry(), Size::new(64, 64)) };

    assert!(test_view.map_pos_from_screen_pix(&map, 10, 10).is_valid());
    assert_eq!(test_view.map_pos_from_screen_pix(&other, 10, 10), MapPos::invalid());
    assert_eq!(test_view.current_map_pos(&other), MapPos::invalid());
    assert!(!test_view.move_to_map_pos(&other, other.pos(1, 1)));
}
