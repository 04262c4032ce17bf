use super::*;
use super::input::{DragDelta, DragState, NoWarpDevice};
use crate::{
    render::{sprites, CommandRecorder, DrawCommand},
    utils::approx_equal,
    view::PixelPoint,
    world::{EntityTable, GridMap, MapGeometry}
};

const WINDOW: Size = Size::new(320, 200);

#[derive(Default)]
struct RecordingDevice {
    warps: Vec<(i32, i32)>,
}

impl InputDevice for RecordingDevice {
    fn warp_cursor(&mut self, x: i32, y: i32) {
        self.warps.push((x, y));
    }
}

fn make_map() -> GridMap {
    GridMap::new(MapGeometry::new(64, 64).unwrap())
}

fn make_interface(map: &GridMap) -> MapInterface {
    let mut interface = MapInterface::new(&MapViewConfigs::default(), WINDOW);
    interface.bind_map(map);
    interface
}

fn standalone_viewport(map: &GridMap) -> Viewport {
    let mut viewport = Viewport::new(&MapViewConfigs::default());
    viewport.resize(WINDOW);
    viewport.bind_map(map);
    viewport
}

fn click(interface: &mut MapInterface, map: &GridMap, x: i32, y: i32, time_millis: u64) -> MapActionList {
    let mut device = RecordingDevice::default();
    let down = interface.handle_event(map, InputEvent::MouseDown { x, y, button: MouseButton::Left }, &mut device);
    assert!(down.is_empty());
    interface.handle_event(map, InputEvent::MouseUp { x, y, button: MouseButton::Left, time_millis }, &mut device)
}

fn key(interface: &mut MapInterface, map: &GridMap, key: Key) {
    let actions = interface.handle_event(map, InputEvent::KeyDown { key, modifiers: InputModifiers::empty() }, &mut NoWarpDevice);
    assert!(actions.is_empty());
}

fn viewport_offset(interface: &MapInterface) -> PixelPoint {
    interface.viewport().unwrap().view().offset()
}

// ----------------------------------------------
// DragTracker
// ----------------------------------------------

#[test]
fn test_drag_starts_on_first_motion() {
    let mut tracker = DragTracker::new(true);
    let mut device = RecordingDevice::default();

    assert!(tracker.motion(3, 3, &mut device).is_none());
    assert_eq!(tracker.state(), DragState::Idle);

    tracker.press(MouseButton::Left, 5, 5);
    assert_eq!(tracker.state(), DragState::Idle);

    // Motion that lands on the press position is not a drag.
    assert!(tracker.motion(5, 5, &mut device).is_none());
    assert_eq!(tracker.state(), DragState::Idle);
    assert!(device.warps.is_empty());

    let delta = tracker.motion(8, 1, &mut device).unwrap();
    assert_eq!(delta, DragDelta { button: MouseButton::Left, anchor: PixelPoint::new(5, 5), dx: 3, dy: -4 });
    assert_eq!(tracker.state(), DragState::Dragging { button: MouseButton::Left, anchor: PixelPoint::new(5, 5) });
    assert_eq!(device.warps, vec![(5, 5)]);

    // Pointer was warped back, deltas stay relative to the anchor.
    let delta = tracker.motion(6, 6, &mut device).unwrap();
    assert_eq!((delta.dx, delta.dy), (1, 1));
}

#[test]
fn test_drag_ignores_other_buttons() {
    let mut tracker = DragTracker::new(true);
    let mut device = RecordingDevice::default();

    tracker.press(MouseButton::Right, 10, 10);
    tracker.motion(12, 10, &mut device).unwrap();

    tracker.press(MouseButton::Left, 0, 0);
    let delta = tracker.motion(10, 13, &mut device).unwrap();
    assert_eq!(delta.button, MouseButton::Right);
    assert_eq!((delta.dx, delta.dy), (0, 3));

    assert!(!tracker.release(MouseButton::Left));
    assert!(tracker.is_dragging());

    assert!(tracker.release(MouseButton::Right));
    assert_eq!(tracker.state(), DragState::Idle);

    // Nothing held anymore.
    assert!(tracker.motion(40, 40, &mut device).is_none());
}

#[test]
fn test_drag_without_warp_follows_pointer() {
    let mut tracker = DragTracker::new(false);
    let mut device = RecordingDevice::default();

    tracker.press(MouseButton::Middle, 0, 0);
    let first = tracker.motion(4, 0, &mut device).unwrap();
    assert_eq!((first.dx, first.dy), (4, 0));

    let second = tracker.motion(6, 0, &mut device).unwrap();
    assert_eq!(second.anchor, PixelPoint::new(4, 0));
    assert_eq!((second.dx, second.dy), (2, 0));

    assert!(device.warps.is_empty());
}

// ----------------------------------------------
// ClickDetector
// ----------------------------------------------

#[test]
fn test_double_click_window_and_radius() {
    let mut clicks = ClickDetector::new(&InputConfigs::default());

    assert!(!clicks.release(MouseButton::Left, 0, 0, 1000));
    assert!(clicks.release(MouseButton::Left, 5, -8, 1500));

    // Too late.
    assert!(!clicks.release(MouseButton::Left, 5, -8, 2200));

    // Each button keeps its own history.
    assert!(!clicks.release(MouseButton::Right, 5, -8, 2300));

    // Too far.
    assert!(!clicks.release(MouseButton::Left, 20, 0, 2300));
}

// ----------------------------------------------
// MapInterface
// ----------------------------------------------

#[test]
fn test_layout() {
    let map = make_map();
    let mut interface = make_interface(&map);

    assert_eq!(interface.widget_rect(VIEWPORT_INDEX), Some(PixelRect::new(0, 0, 320, 200)));
    assert_eq!(interface.widget_rect(MINIMAP_INDEX), Some(PixelRect::new(192, 72, 128, 128)));

    assert_eq!(interface.widget_at(0, 0), Some(VIEWPORT_INDEX));
    assert_eq!(interface.widget_at(300, 190), Some(MINIMAP_INDEX));
    assert_eq!(interface.widget_at(320, 0), None);

    // Minimap shrinks to fit a small window.
    interface.resize(Size::new(100, 50));
    assert_eq!(interface.widget_rect(MINIMAP_INDEX), Some(PixelRect::new(0, 0, 100, 50)));
    assert_eq!(interface.minimap().unwrap().view().size(), Size::new(100, 50));
    assert_eq!(interface.viewport().unwrap().window_size(), Size::new(100, 50));
}

#[test]
fn test_minimap_click_recenters_viewport() {
    let map = make_map();
    let mut interface = make_interface(&map);

    let expected = interface.minimap().unwrap().map_pos_from_screen_pix(&map, 10, 20);
    assert!(expected.is_valid());

    let actions = click(&mut interface, &map, 192 + 10, 72 + 20, 0);
    assert_eq!(actions.as_slice(), &[MapAction::CenterViewport(expected)]);

    let viewport = interface.viewport().unwrap();
    assert_eq!(viewport.cursor(), expected);
    assert_eq!(viewport.current_map_pos(&map), expected);

    // The minimap follows the viewport.
    assert_eq!(interface.minimap().unwrap().current_map_pos(&map), expected);
}

#[test]
fn test_viewport_click_and_double_click() {
    let map = make_map();
    let mut interface = make_interface(&map);

    let pos = interface.viewport().unwrap().map_pos_from_screen_pix(&map, 100, 50);
    assert!(pos.is_valid());

    let actions = click(&mut interface, &map, 100, 50, 0);
    assert_eq!(actions.as_slice(), &[MapAction::CursorMoved(pos)]);
    assert_eq!(interface.viewport().unwrap().cursor(), pos);

    let actions = click(&mut interface, &map, 100, 50, 200);
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[1], MapAction::Activate { pos, button: MouseButton::Left });
}

#[test]
fn test_click_with_motion_in_place() {
    let map = make_map();
    let mut interface = make_interface(&map);
    let mut device = RecordingDevice::default();

    let pos = interface.viewport().unwrap().map_pos_from_screen_pix(&map, 50, 50);
    let offset = viewport_offset(&interface);

    interface.handle_event(&map, InputEvent::MouseDown { x: 50, y: 50, button: MouseButton::Left }, &mut device);
    let actions = interface.handle_event(&map, InputEvent::MouseMotion { x: 50, y: 50 }, &mut device);
    assert!(actions.is_empty());
    let actions = interface.handle_event(
        &map,
        InputEvent::MouseUp { x: 50, y: 50, button: MouseButton::Left, time_millis: 0 },
        &mut device);

    assert_eq!(actions.as_slice(), &[MapAction::CursorMoved(pos)]);
    assert_eq!(viewport_offset(&interface), offset);
    assert!(device.warps.is_empty());
}

#[test]
fn test_drag_stays_with_starting_widget() {
    let map = make_map();
    let mut interface = make_interface(&map);
    let mut device = RecordingDevice::default();

    let minimap_scale = interface.minimap().unwrap().view().scale();

    interface.handle_event(&map, InputEvent::MouseDown { x: 10, y: 10, button: MouseButton::Left }, &mut device);
    interface.handle_event(&map, InputEvent::MouseMotion { x: 30, y: 25 }, &mut device);
    // Into the minimap's rect.
    interface.handle_event(&map, InputEvent::MouseMotion { x: 250, y: 150 }, &mut device);

    let mut expected = standalone_viewport(&map);
    expected.handle_drag(20, 15);
    expected.handle_drag(240, 140);
    assert_eq!(viewport_offset(&interface), expected.view().offset());
    assert_eq!(device.warps, vec![(10, 10), (10, 10)]);

    // Ending the drag over the minimap is not a click.
    let actions = interface.handle_event(
        &map,
        InputEvent::MouseUp { x: 250, y: 150, button: MouseButton::Left, time_millis: 0 },
        &mut device);
    assert!(actions.is_empty());
    assert!(!interface.viewport().unwrap().cursor().is_valid());
    assert_eq!(interface.minimap().unwrap().view().scale(), minimap_scale);
}

#[test]
fn test_release_clears_partial_drag() {
    let map = make_map();
    let mut interface = make_interface(&map);
    let mut device = RecordingDevice::default();
    interface.viewport_mut().unwrap().set_zoom(0.5);
    let offset = viewport_offset(&interface);

    for time_millis in [0, 1000] {
        interface.handle_event(&map, InputEvent::MouseDown { x: 10, y: 10, button: MouseButton::Left }, &mut device);
        interface.handle_event(&map, InputEvent::MouseMotion { x: 11, y: 10 }, &mut device);
        interface.handle_event(
            &map,
            InputEvent::MouseUp { x: 11, y: 10, button: MouseButton::Left, time_millis },
            &mut device);
    }

    // Half a frame pixel per drag, dropped when each drag ends.
    assert_eq!(viewport_offset(&interface), offset);
    assert_eq!(device.warps, vec![(10, 10), (10, 10)]);
}

#[test]
fn test_scroll_routing() {
    let map = make_map();
    let mut interface = make_interface(&map);
    let mut device = RecordingDevice::default();

    // Control+wheel zooms the viewport wherever the pointer is.
    interface.handle_event(&map, InputEvent::Scroll { x: 300, y: 190, up: true, modifiers: InputModifiers::Control }, &mut device);
    assert!(approx_equal(interface.viewport().unwrap().target_zoom(), 1.2, 0.001));
    assert_eq!(interface.minimap().unwrap().view().scale(), 1);

    // Plain wheel over the minimap changes its scale only.
    interface.handle_event(&map, InputEvent::Scroll { x: 300, y: 190, up: true, modifiers: InputModifiers::empty() }, &mut device);
    assert_eq!(interface.minimap().unwrap().view().scale(), 2);
    assert!(approx_equal(interface.viewport().unwrap().target_zoom(), 1.2, 0.001));

    // Plain wheel over the viewport does nothing.
    interface.handle_event(&map, InputEvent::Scroll { x: 10, y: 10, up: false, modifiers: InputModifiers::empty() }, &mut device);
    assert!(approx_equal(interface.viewport().unwrap().target_zoom(), 1.2, 0.001));
}

#[test]
fn test_keys_scroll_and_zoom() {
    let map = make_map();
    let mut interface = make_interface(&map);

    key(&mut interface, &map, Key::Right);
    let mut expected = standalone_viewport(&map);
    expected.move_by_pixels(32, 0);
    assert_eq!(viewport_offset(&interface), expected.view().offset());

    key(&mut interface, &map, Key::Up);
    expected.move_by_pixels(0, -32);
    assert_eq!(viewport_offset(&interface), expected.view().offset());

    key(&mut interface, &map, Key::Minus);
    assert!(approx_equal(interface.viewport().unwrap().target_zoom(), 1.2, 0.001));

    key(&mut interface, &map, Key::RightBracket);
    assert!(approx_equal(interface.viewport().unwrap().target_zoom(), 1.0, 0.001));
}

#[test]
fn test_update_drains_steps() {
    let map = make_map();
    let mut interface = make_interface(&map);

    let sender = interface.step_sender();
    let timer_thread = std::thread::spawn(move || {
        for _ in 0..3 {
            assert!(sender.post());
        }
    });
    timer_thread.join().unwrap();

    assert_eq!(interface.update(0.016), 3);
    assert_eq!(interface.viewport().unwrap().anim_tick(), 3);
    assert_eq!(interface.update(0.016), 0);

    interface.set_fallback_timer(Some(0.5));
    assert_eq!(interface.update(0.3), 0);
    assert_eq!(interface.update(0.3), 1);
    assert_eq!(interface.viewport().unwrap().anim_tick(), 4);
}

#[test]
fn test_draw_only_dirty_widgets() {
    let map = make_map();
    let entities = EntityTable::new();
    let mut interface = make_interface(&map);
    let mut recorder = CommandRecorder::new(WINDOW);

    assert_eq!(interface.draw(&mut recorder, &map, &entities), 2);
    recorder.clear();
    assert_eq!(interface.draw(&mut recorder, &map, &entities), 0);
    assert!(recorder.commands().is_empty());

    // The minimap sits on top of the viewport and is drawn again with it.
    interface.viewport_mut().unwrap().set_cursor(map.pos(3, 3));
    assert_eq!(interface.draw(&mut recorder, &map, &entities), 2);

    recorder.clear();
    interface.minimap_mut().unwrap().view_mut().set_redraw();
    assert_eq!(interface.draw(&mut recorder, &map, &entities), 1);

    let minimap_rect = PixelRect::new(192, 72, 128, 128);
    let fills: Vec<PixelRect> = recorder.commands().iter().filter_map(|cmd| match cmd {
        DrawCommand::FillRect { rect, .. } => Some(*rect),
        _ => None,
    }).collect();
    assert!(!fills.is_empty());
    assert!(fills.iter().all(|rect| rect.intersection(&minimap_rect) == *rect));
}

#[test]
fn test_zoomed_viewport_fits_its_rect() {
    let map = make_map();
    let entities = EntityTable::new();
    let mut interface = make_interface(&map);
    let mut recorder = CommandRecorder::new(WINDOW);

    assert!(interface.viewport_mut().unwrap().set_zoom(2.0));
    assert_eq!(interface.viewport().unwrap().frame_size(), Size::new(640, 400));
    assert_eq!(interface.draw(&mut recorder, &map, &entities), 2);

    let window_rect = PixelRect::from_size(WINDOW);
    let commands = recorder.commands();
    assert!(matches!(commands.first(), Some(DrawCommand::FillRect { rect, .. }) if *rect == window_rect));

    for cmd in commands {
        let bounds = match cmd {
            DrawCommand::FillRect { rect, .. } => *rect,
            DrawCommand::Image { x, y, width, height } => PixelRect::new(*x, *y, *width as i32, *height as i32),
            _ => continue,
        };
        assert!(bounds.is_valid());
        assert_eq!(bounds.intersection(&window_rect), bounds, "{cmd:?} outside the window");
    }

    // The minimap is not zoomed; its view rect marker stays at its center.
    let minimap_rect = interface.widget_rect(MINIMAP_INDEX).unwrap();
    assert!(commands.iter().any(|cmd| matches!(cmd,
        DrawCommand::Sprite { sprite, x, y, .. }
            if *sprite == sprites::MINIMAP_VIEW_RECT
            && (*x, *y) == (minimap_rect.x + minimap_rect.width / 2, minimap_rect.y + minimap_rect.height / 2))));
}

#[test]
fn test_height_change_redraws_both() {
    let mut map = make_map();
    let entities = EntityTable::new();
    let mut interface = make_interface(&map);
    let mut recorder = CommandRecorder::new(WINDOW);

    interface.draw(&mut recorder, &map, &entities);
    assert_eq!(interface.draw(&mut recorder, &map, &entities), 0);

    let pos = map.pos(2, 2);
    assert!(map.set_height(pos, 10));
    interface.on_height_changed(&map, pos);
    assert_eq!(interface.draw(&mut recorder, &map, &entities), 2);
}
