use std::collections::HashMap;
use arrayvec::ArrayVec;
use slab::Slab;

use crate::{
    log,
    utils::Color
};

use super::{
    BuildingInfo,
    BuildingKind,
    Direction,
    EntityStore,
    MapPos,
    PlayerId,
    SerfInfo
};

pub const MAX_PLAYERS: usize = 4;

// ----------------------------------------------
// EntityTable
// ----------------------------------------------

// In-memory entity store: players, buildings and serfs keyed by map position.
#[derive(Default)]
pub struct EntityTable {
    players: ArrayVec<Color, MAX_PLAYERS>,
    buildings: Slab<(MapPos, BuildingInfo)>,
    building_by_pos: HashMap<MapPos, usize>,
    serfs: HashMap<MapPos, SerfInfo>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Returns None once all player slots are taken.
    pub fn add_player(&mut self, color: Color) -> Option<PlayerId> {
        if self.players.try_push(color).is_err() {
            log::warn!(log::channel!("world"), "Cannot add more than {MAX_PLAYERS} players.");
            return None;
        }
        Some(PlayerId((self.players.len() - 1) as u8))
    }

    #[inline]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // Replaces any building already at `pos`.
    pub fn add_building(&mut self, pos: MapPos, kind: BuildingKind, progress: f32) {
        debug_assert!(pos.is_valid());
        self.remove_building(pos);
        let info = BuildingInfo { kind, progress: progress.clamp(0.0, 1.0), burning: false };
        let index = self.buildings.insert((pos, info));
        self.building_by_pos.insert(pos, index);
    }

    pub fn remove_building(&mut self, pos: MapPos) -> Option<BuildingInfo> {
        let index = self.building_by_pos.remove(&pos)?;
        Some(self.buildings.remove(index).1)
    }

    // Returns false if there is no building at `pos`.
    pub fn set_building_progress(&mut self, pos: MapPos, progress: f32) -> bool {
        self.building_mut(pos).map(|info| info.progress = progress.clamp(0.0, 1.0)).is_some()
    }

    pub fn set_building_burning(&mut self, pos: MapPos, burning: bool) -> bool {
        self.building_mut(pos).map(|info| info.burning = burning).is_some()
    }

    #[inline]
    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn add_serf(&mut self, pos: MapPos, owner: PlayerId, facing: Direction) {
        debug_assert!(pos.is_valid());
        self.serfs.insert(pos, SerfInfo { owner, facing });
    }

    pub fn remove_serf(&mut self, pos: MapPos) -> Option<SerfInfo> {
        self.serfs.remove(&pos)
    }

    fn building_mut(&mut self, pos: MapPos) -> Option<&mut BuildingInfo> {
        let index = *self.building_by_pos.get(&pos)?;
        self.buildings.get_mut(index).map(|(_, info)| info)
    }
}

impl EntityStore for EntityTable {
    #[inline]
    fn player_color(&self, player: PlayerId) -> Option<Color> {
        self.players.get(player.0 as usize).copied()
    }

    #[inline]
    fn building_at(&self, pos: MapPos) -> Option<BuildingInfo> {
        let index = *self.building_by_pos.get(&pos)?;
        self.buildings.get(index).map(|(_, info)| *info)
    }

    #[inline]
    fn serf_at(&self, pos: MapPos) -> Option<SerfInfo> {
        self.serfs.get(&pos).copied()
    }
}
