use arrayvec::ArrayVec;
use enum_dispatch::enum_dispatch;
use smallvec::SmallVec;

pub mod input;

use crate::{
    log,
    engine::{
        config::{InputConfigs, MapViewConfigs},
        time::{Seconds, StepChannel, StepReceiver, StepSender, UpdateTimer}
    },
    minimap::Minimap,
    render::{ClippedSurface, DrawContext, DrawSurface, ScaledSurface},
    utils::{PixelRect, Size},
    view::ToroidalView,
    viewport::Viewport,
    world::{EntityStore, MapPos, MapStore}
};

use input::{
    ClickDetector,
    DragTracker,
    InputDevice,
    InputEvent,
    InputModifiers,
    Key,
    MouseButton
};

#[cfg(test)]
mod tests;

// ----------------------------------------------
// MapAction
// ----------------------------------------------

// Outcome of an input event that the rest of the game may react to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapAction {
    None,
    CursorMoved(MapPos),
    CenterViewport(MapPos),
    Activate { pos: MapPos, button: MouseButton },
}

pub type MapActionList = SmallVec<[MapAction; 4]>;

// ----------------------------------------------
// MapWidget / MapWidgetImpl
// ----------------------------------------------

// Widget side of the map interface. Coordinates are window pixels
// relative to the widget's rect.
#[enum_dispatch(MapWidgetImpl)]
pub trait MapWidget {
    fn bind_map(&mut self, map: &dyn MapStore);
    fn unbind_map(&mut self);

    fn resize(&mut self, size: Size);
    // Pixel size of what draw() emits.
    fn frame_size(&self) -> Size;

    fn handle_click(&mut self, map: &dyn MapStore, x: i32, y: i32, button: MouseButton) -> MapAction;
    fn handle_double_click(&mut self, map: &dyn MapStore, x: i32, y: i32, button: MouseButton) -> MapAction;
    fn handle_drag(&mut self, dx: i32, dy: i32) -> bool;
    fn handle_drag_end(&mut self);
    fn handle_scroll(&mut self, up: bool, modifiers: InputModifiers) -> bool;

    fn on_height_changed(&mut self, map: &dyn MapStore, pos: MapPos);
    fn step(&mut self, ticks: u32);

    fn is_dirty(&self) -> bool;
    fn take_redraw(&mut self) -> bool;
    fn draw(&mut self, ctx: &mut DrawContext);
}

#[enum_dispatch]
pub enum MapWidgetImpl {
    Viewport,
    Minimap,
}

// ----------------------------------------------
// MapInterface
// ----------------------------------------------

const MAX_WIDGETS: usize = 2;
const VIEWPORT_INDEX: usize = 0;
const MINIMAP_INDEX: usize = 1;

struct WidgetSlot {
    rect: PixelRect,
    widget: MapWidgetImpl,
}

// Owns the viewport and the minimap laid out in one window. Routes input
// to the widget under the pointer, applies actions that cross widgets,
// funnels the step signal and redraws dirty widgets.
pub struct MapInterface {
    // Back to front.
    widgets: ArrayVec<WidgetSlot, MAX_WIDGETS>,
    window_size: Size,
    minimap_size: Size,

    drag: DragTracker,
    drag_target: Option<usize>,
    clicks: ClickDetector,

    step_sender: StepSender,
    step_receiver: StepReceiver,
    fallback_timer: Option<UpdateTimer>,

    configs: InputConfigs,
}

impl MapInterface {
    pub fn new(configs: &MapViewConfigs, window_size: Size) -> Self {
        let (step_sender, step_receiver) = StepChannel::new();

        let mut widgets = ArrayVec::new();
        widgets.push(WidgetSlot { rect: PixelRect::default(), widget: Viewport::new(configs).into() });
        widgets.push(WidgetSlot { rect: PixelRect::default(), widget: Minimap::new(configs).into() });

        let mut interface = Self {
            widgets,
            window_size: Size::zero(),
            minimap_size: configs.minimap.widget_size,
            drag: DragTracker::new(configs.input.warp_cursor_on_drag),
            drag_target: None,
            clicks: ClickDetector::new(&configs.input),
            step_sender,
            step_receiver,
            fallback_timer: None,
            configs: configs.input.clone(),
        };

        interface.resize(window_size);
        interface
    }

    // ----------------------
    // Widgets:
    // ----------------------

    pub fn viewport(&self) -> Option<&Viewport> {
        match &self.widgets.get(VIEWPORT_INDEX)?.widget {
            MapWidgetImpl::Viewport(viewport) => Some(viewport),
            _ => None,
        }
    }

    pub fn viewport_mut(&mut self) -> Option<&mut Viewport> {
        match &mut self.widgets.get_mut(VIEWPORT_INDEX)?.widget {
            MapWidgetImpl::Viewport(viewport) => Some(viewport),
            _ => None,
        }
    }

    pub fn minimap(&self) -> Option<&Minimap> {
        match &self.widgets.get(MINIMAP_INDEX)?.widget {
            MapWidgetImpl::Minimap(minimap) => Some(minimap),
            _ => None,
        }
    }

    pub fn minimap_mut(&mut self) -> Option<&mut Minimap> {
        match &mut self.widgets.get_mut(MINIMAP_INDEX)?.widget {
            MapWidgetImpl::Minimap(minimap) => Some(minimap),
            _ => None,
        }
    }

    pub fn widget_rect(&self, index: usize) -> Option<PixelRect> {
        self.widgets.get(index).map(|slot| slot.rect)
    }

    // Topmost widget containing the window position.
    pub fn widget_at(&self, x: i32, y: i32) -> Option<usize> {
        self.widgets.iter().rposition(|slot| slot.rect.contains_point(x, y))
    }

    // ----------------------
    // Map & window:
    // ----------------------

    pub fn bind_map(&mut self, map: &dyn MapStore) {
        for slot in &mut self.widgets {
            slot.widget.bind_map(map);
        }
        self.drag_target = None;
        self.sync_minimap(map);
        log::info!(log::channel!("input"), "Map interface bound to {}x{} map.", map.cols(), map.rows());
    }

    pub fn unbind_map(&mut self) {
        for slot in &mut self.widgets {
            slot.widget.unbind_map();
        }
        self.drag_target = None;
    }

    #[inline]
    pub fn window_size(&self) -> Size {
        self.window_size
    }

    // Viewport fills the window, the minimap sits in the bottom-right corner.
    pub fn resize(&mut self, window_size: Size) {
        self.window_size = window_size;

        let minimap_width = self.minimap_size.width.min(window_size.width).max(0);
        let minimap_height = self.minimap_size.height.min(window_size.height).max(0);
        let rects = [
            PixelRect::from_size(window_size),
            PixelRect::new(window_size.width - minimap_width,
                           window_size.height - minimap_height,
                           minimap_width,
                           minimap_height),
        ];

        for (slot, rect) in self.widgets.iter_mut().zip(rects) {
            slot.rect = rect;
            slot.widget.resize(rect.size());
        }
    }

    // Terrain height of `pos` changed.
    pub fn on_height_changed(&mut self, map: &dyn MapStore, pos: MapPos) {
        for slot in &mut self.widgets {
            slot.widget.on_height_changed(map, pos);
        }
    }

    // ----------------------
    // Step signal:
    // ----------------------

    // Sender for a timer context on another thread.
    #[inline]
    pub fn step_sender(&self) -> StepSender {
        self.step_sender.clone()
    }

    // Ticks once every `frequency_secs` of frame time, for hosts without an external timer.
    pub fn set_fallback_timer(&mut self, frequency_secs: Option<Seconds>) {
        self.fallback_timer = frequency_secs.map(UpdateTimer::new);
    }

    // Called once per loop iteration. Drains pending steps and forwards them to the widgets.
    pub fn update(&mut self, delta_time_secs: Seconds) -> u32 {
        let mut ticks = self.step_receiver.drain();

        if let Some(timer) = &mut self.fallback_timer {
            if timer.tick(delta_time_secs).should_update() {
                ticks += 1;
            }
        }

        if ticks != 0 {
            for slot in &mut self.widgets {
                slot.widget.step(ticks);
            }
        }

        ticks
    }

    // ----------------------
    // Input:
    // ----------------------

    pub fn handle_event(&mut self,
                        map: &dyn MapStore,
                        event: InputEvent,
                        device: &mut dyn InputDevice) -> MapActionList {

        let mut actions = MapActionList::new();
        let viewport_offset = self.viewport().map(|viewport| viewport.view().offset());

        match event {
            InputEvent::MouseDown { x, y, button } => {
                self.drag.press(button, x, y);
            }
            InputEvent::MouseUp { x, y, button, time_millis } => {
                let ended_drag = self.drag.release(button);
                if ended_drag {
                    if let Some(index) = self.drag_target {
                        self.widgets[index].widget.handle_drag_end();
                    }
                }
                if !self.drag.is_dragging() {
                    self.drag_target = None;
                }

                let is_double = self.clicks.release(button, x, y, time_millis);
                if !ended_drag {
                    if let Some(index) = self.widget_at(x, y) {
                        let slot = &mut self.widgets[index];
                        let (lx, ly) = (x - slot.rect.x, y - slot.rect.y);
                        actions.push(slot.widget.handle_click(map, lx, ly, button));
                        if is_double {
                            actions.push(slot.widget.handle_double_click(map, lx, ly, button));
                        }
                    }
                }
            }
            InputEvent::MouseMotion { x, y } => {
                if let Some(delta) = self.drag.motion(x, y, device) {
                    // Drags stay with the widget they started on.
                    if self.drag_target.is_none() {
                        self.drag_target = self.widget_at(delta.anchor.x, delta.anchor.y);
                    }
                    if let Some(index) = self.drag_target {
                        self.widgets[index].widget.handle_drag(delta.dx, delta.dy);
                    }
                }
            }
            InputEvent::Scroll { x, y, up, modifiers } => {
                let target = if modifiers.intersects(InputModifiers::Control) {
                    Some(VIEWPORT_INDEX)
                } else {
                    self.widget_at(x, y)
                };
                if let Some(index) = target {
                    self.widgets[index].widget.handle_scroll(up, modifiers);
                }
            }
            InputEvent::KeyDown { key, .. } => {
                self.handle_key(key);
            }
        }

        actions.retain(|action| *action != MapAction::None);
        for action in &actions {
            self.apply_action(map, *action);
        }

        if self.viewport().map(|viewport| viewport.view().offset()) != viewport_offset {
            self.sync_minimap(map);
        }

        actions
    }

    // Keeps the minimap centered on what the viewport shows.
    fn sync_minimap(&mut self, map: &dyn MapStore) {
        let Some(pos) = self.viewport().map(|viewport| viewport.current_map_pos(map)) else {
            return;
        };
        if let Some(minimap) = self.minimap_mut() {
            minimap.move_to_map_pos(map, pos);
        }
    }

    fn handle_key(&mut self, key: Key) -> bool {
        let scroll_px = self.configs.key_scroll_px;
        let Some(viewport) = self.viewport_mut() else {
            return false;
        };

        if let Some((dx, dy)) = key.scroll_delta(scroll_px) {
            return viewport.move_by_pixels(dx, dy);
        }
        if let Some(direction) = key.zoom_direction() {
            let step = viewport.zoom_step();
            return viewport.zoom_by(direction * step);
        }
        false
    }

    fn apply_action(&mut self, map: &dyn MapStore, action: MapAction) {
        if let MapAction::CenterViewport(pos) = action {
            if let Some(viewport) = self.viewport_mut() {
                viewport.move_to_map_pos(map, pos);
                viewport.set_cursor(pos);
            }
            log::verbose!(log::channel!("input"), "Viewport centered on {pos}.");
        }
    }

    // ----------------------
    // Drawing:
    // ----------------------

    // Draws dirty widgets back to front, plus any widget overlapping one
    // drawn before it. Returns the number of widgets drawn.
    pub fn draw(&mut self,
                surface: &mut dyn DrawSurface,
                map: &dyn MapStore,
                entities: &dyn EntityStore) -> usize {

        let mut drawn: ArrayVec<PixelRect, MAX_WIDGETS> = ArrayVec::new();

        for slot in &mut self.widgets {
            let dirty = slot.widget.take_redraw();
            if !dirty && !drawn.iter().any(|rect| rect.intersects(&slot.rect)) {
                continue;
            }

            // A zoomed viewport frame is scaled to fit the widget's rect.
            let frame = slot.widget.frame_size();
            let mut clipped = ClippedSurface::new(&mut *surface, slot.rect);
            if frame == slot.rect.size() || !frame.is_valid() {
                let mut ctx = DrawContext::new(&mut clipped, map, entities);
                slot.widget.draw(&mut ctx);
            } else {
                let mut scaled = ScaledSurface::new(&mut clipped, frame, slot.rect.size());
                let mut ctx = DrawContext::new(&mut scaled, map, entities);
                slot.widget.draw(&mut ctx);
            }
            drawn.push(slot.rect);
        }

        drawn.len()
    }
}
