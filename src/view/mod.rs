use crate::world::{MapPos, MapStore};

pub mod state;
pub mod transform;

pub use state::ViewState;
pub use transform::{CellCoord, CellMetrics, PixelPoint, Transform};

#[cfg(test)]
mod tests;

// ----------------------------------------------
// ToroidalView
// ----------------------------------------------

// Operations shared by every view onto a toroidal map, expressed with
// MapPos handles. A map whose geometry differs from the bound one is
// treated as invalid: moves are no-ops and picks return MapPos::invalid().
pub trait ToroidalView {
    fn view(&self) -> &ViewState;
    fn view_mut(&mut self) -> &mut ViewState;

    fn move_to_map_pos(&mut self, map: &dyn MapStore, pos: MapPos) -> bool {
        let Some(cell) = cell_of(self.view(), map, pos) else {
            return false;
        };
        self.view_mut().center_on(cell, 0)
    }

    fn move_by_pixels(&mut self, dx: i32, dy: i32) -> bool {
        self.view_mut().shift_by_pixels(dx, dy)
    }

    fn current_map_pos(&self, map: &dyn MapStore) -> MapPos {
        let center = self.view().center();
        self.map_pos_from_screen_pix(map, center.x, center.y)
    }

    fn map_pos_from_screen_pix(&self, map: &dyn MapStore, x: i32, y: i32) -> MapPos {
        if !is_map_valid(self.view(), map) {
            return MapPos::invalid();
        }
        self.view()
            .cell_at_screen_pixel(PixelPoint::new(x, y))
            .map_or(MapPos::invalid(), |cell| map.pos(cell.col, cell.row))
    }
}

// True if `map` is the kind of map the view is bound to.
#[inline]
pub fn is_map_valid(view: &ViewState, map: &dyn MapStore) -> bool {
    view.geometry().is_some_and(|geometry| geometry.matches(map))
}

// Column/row of `pos`, if both the handle and the map are valid for `view`.
#[inline]
pub fn cell_of(view: &ViewState, map: &dyn MapStore, pos: MapPos) -> Option<CellCoord> {
    if !pos.is_valid() || !is_map_valid(view, map) {
        return None;
    }
    Some(CellCoord::new(map.pos_col(pos), map.pos_row(pos)))
}
