use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    bitflags_with_display,
    log,
    engine::config::InputConfigs,
    view::PixelPoint
};

// ----------------------------------------------
// MouseButton / InputModifiers / Key
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct InputModifiers: u8 {
        const Shift   = 1 << 0;
        const Control = 1 << 1;
        const Alt     = 1 << 2;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Plus,
    Minus,
    LeftBracket,
    RightBracket,
}

impl Key {
    // Arrow keys scroll the viewport by this many frame pixels per press.
    pub fn scroll_delta(self, step: i32) -> Option<(i32, i32)> {
        match self {
            Key::Up    => Some((0, -step)),
            Key::Down  => Some((0, step)),
            Key::Left  => Some((-step, 0)),
            Key::Right => Some((step, 0)),
            _ => None,
        }
    }

    // Sign of the zoom factor change. A larger factor shows more of the map.
    pub fn zoom_direction(self) -> Option<f32> {
        match self {
            Key::Plus  | Key::RightBracket => Some(-1.0),
            Key::Minus | Key::LeftBracket  => Some(1.0),
            _ => None,
        }
    }
}

// ----------------------------------------------
// InputEvent
// ----------------------------------------------

// Raw events in window pixels, as delivered by the host's event loop.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InputEvent {
    MouseDown   { x: i32, y: i32, button: MouseButton },
    MouseUp     { x: i32, y: i32, button: MouseButton, time_millis: u64 },
    MouseMotion { x: i32, y: i32 },
    Scroll      { x: i32, y: i32, up: bool, modifiers: InputModifiers },
    KeyDown     { key: Key, modifiers: InputModifiers },
}

// ----------------------------------------------
// InputDevice
// ----------------------------------------------

// Pointer control offered by the host.
pub trait InputDevice {
    // Moves the pointer to a window position without generating a drag.
    fn warp_cursor(&mut self, x: i32, y: i32);
}

// Device for hosts that cannot move the pointer.
#[derive(Default)]
pub struct NoWarpDevice;

impl InputDevice for NoWarpDevice {
    fn warp_cursor(&mut self, _x: i32, _y: i32) {}
}

// ----------------------------------------------
// DragTracker
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { button: MouseButton, anchor: PixelPoint },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DragDelta {
    pub button: MouseButton,
    // Window position where the drag began.
    pub anchor: PixelPoint,
    pub dx: i32,
    pub dy: i32,
}

// Per pointer drag state machine: Idle -> Dragging(button) -> Idle.
//
// A press only records where the button went down. The first motion away
// from the press position with a button held starts dragging that button from its press position; other
// buttons are ignored until it is released. With cursor warping the pointer
// is put back on the anchor after every motion, so deltas stay relative to
// it; without, the anchor follows the pointer.
pub struct DragTracker {
    state: DragState,
    press_positions: [Option<PixelPoint>; MouseButton::COUNT],
    warp_cursor: bool,
}

impl DragTracker {
    pub fn new(warp_cursor: bool) -> Self {
        Self {
            state: DragState::Idle,
            press_positions: [None; MouseButton::COUNT],
            warp_cursor,
        }
    }

    #[inline]
    pub fn state(&self) -> DragState {
        self.state
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn press(&mut self, button: MouseButton, x: i32, y: i32) {
        self.press_positions[button as usize] = Some(PixelPoint::new(x, y));
    }

    // Returns true if the release ended a drag.
    pub fn release(&mut self, button: MouseButton) -> bool {
        self.press_positions[button as usize] = None;

        match self.state {
            DragState::Dragging { button: dragging, .. } if dragging == button => {
                self.state = DragState::Idle;
                log::verbose!(log::channel!("input"), "Drag with {button:?} button ended.");
                true
            }
            _ => false,
        }
    }

    // Pointer moved to window position (x,y). Returns the delta to forward, if any.
    pub fn motion(&mut self, x: i32, y: i32, device: &mut dyn InputDevice) -> Option<DragDelta> {
        let (button, anchor) = match self.state {
            DragState::Dragging { button, anchor } => (button, anchor),
            DragState::Idle => {
                let (button, anchor) = MouseButton::iter()
                    .find_map(|button| self.press_positions[button as usize].map(|pos| (button, pos)))?;
                if x == anchor.x && y == anchor.y {
                    return None;
                }
                self.state = DragState::Dragging { button, anchor };
                log::verbose!(log::channel!("input"), "Drag with {button:?} button started at {anchor}.");
                (button, anchor)
            }
        };

        let (dx, dy) = (x - anchor.x, y - anchor.y);
        if dx == 0 && dy == 0 {
            return None;
        }

        if self.warp_cursor {
            device.warp_cursor(anchor.x, anchor.y);
        } else {
            self.state = DragState::Dragging { button, anchor: PixelPoint::new(x, y) };
        }

        Some(DragDelta { button, anchor, dx, dy })
    }
}

// ----------------------------------------------
// ClickDetector
// ----------------------------------------------

#[derive(Copy, Clone, Debug)]
struct LastClick {
    time_millis: u64,
    pos: PixelPoint,
}

// A release is a double click if the same button was released within the
// time window and the position radius of its previous release.
pub struct ClickDetector {
    last_clicks: [Option<LastClick>; MouseButton::COUNT],
    window_millis: u64,
    radius_px: i32,
}

impl ClickDetector {
    pub fn new(configs: &InputConfigs) -> Self {
        Self {
            last_clicks: [None; MouseButton::COUNT],
            window_millis: configs.double_click_millis,
            radius_px: configs.double_click_radius_px,
        }
    }

    // Returns true if this release completes a double click.
    pub fn release(&mut self, button: MouseButton, x: i32, y: i32, time_millis: u64) -> bool {
        let pos = PixelPoint::new(x, y);
        let slot = &mut self.last_clicks[button as usize];

        let is_double = slot.is_some_and(|last| {
            time_millis.saturating_sub(last.time_millis) < self.window_millis
                && (pos.x - last.pos.x).abs() <= self.radius_px
                && (pos.y - last.pos.y).abs() <= self.radius_px
        });

        *slot = Some(LastClick { time_millis, pos });
        is_double
    }
}
