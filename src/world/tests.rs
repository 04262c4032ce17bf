use super::*;
use crate::utils::Color;

fn geometry(cols: u32, rows: u32) -> MapGeometry {
    MapGeometry::new(cols, rows).unwrap()
}

#[test]
fn test_map_geometry_validation() {
    assert!(MapGeometry::new(64, 32).is_some());
    assert!(MapGeometry::new(1, 1).is_some());
    assert!(MapGeometry::new(0, 32).is_none());
    assert!(MapGeometry::new(48, 32).is_none());
    assert!(MapGeometry::new(32, 100).is_none());

    let geo = geometry(64, 32);
    assert_eq!(geo.col_mask(), 63);
    assert_eq!(geo.row_mask(), 31);
    assert_eq!(geo.cell_count(), 64 * 32);
}

#[test]
fn test_grid_map_positions_wrap() {
    let map = GridMap::new(geometry(32, 16));

    let pos = map.pos(5, 7);
    assert_eq!(map.pos_col(pos), 5);
    assert_eq!(map.pos_row(pos), 7);

    assert_eq!(map.pos(32 + 5, 16 + 7), pos);
    assert_eq!(map.pos(u32::MAX, 0), map.pos(31, 0));

    assert_eq!(MapGeometry::of(&map), Some(map.geometry()));
    assert!(map.geometry().matches(&map));
    assert!(!geometry(64, 16).matches(&map));
}

#[test]
fn test_grid_map_move_in_direction() {
    let map = GridMap::new(geometry(8, 8));
    let origin = map.pos(0, 0);

    assert_eq!(map.move_in_direction(origin, Direction::Right), map.pos(1, 0));
    assert_eq!(map.move_in_direction(origin, Direction::Left), map.pos(7, 0));
    assert_eq!(map.move_in_direction(origin, Direction::UpLeft), map.pos(7, 7));
    assert_eq!(map.move_in_direction(origin, Direction::DownRight), map.pos(1, 1));
    assert_eq!(map.move_in_direction(origin, Direction::Up), map.pos(0, 7));
    assert_eq!(map.move_in_direction(origin, Direction::Down), map.pos(0, 1));
}

#[test]
fn test_grid_map_cell_data() {
    let mut map = GridMap::new(geometry(16, 16));
    let pos = map.pos(3, 4);

    assert!(map.set_height(pos, 12));
    assert!(!map.set_height(pos, 12));
    assert!(map.set_height(pos, 100));
    assert_eq!(map.height(pos), MAX_HEIGHT);
    assert_eq!(map.take_height_changes(), vec![pos, pos]);
    assert!(map.take_height_changes().is_empty());

    map.set_owner(pos, Some(PlayerId(1)));
    assert!(map.has_owner(pos));
    assert_eq!(map.owner(pos), Some(PlayerId(1)));
    assert!(!map.has_owner(map.pos(0, 0)));

    map.set_object(pos, MapObject::LargeBuilding);
    assert!(MapObject::is_building_raw(map.object(pos)));
    assert!(!MapObject::Flag.is_building());
    assert!(MapObject::Castle.is_building());
    assert!(!MapObject::Tree.is_building());

    map.add_path(pos, Direction::Right);
    assert_eq!(map.paths(pos), Directions::Right);
    assert_eq!(map.paths(map.pos(4, 4)), Directions::Left);
    assert!(map.has_path(pos));

    map.set_idle_serf(pos, true);
    assert!(map.idle_serf(pos));
    assert!(!map.idle_serf(map.pos(0, 0)));

    // Invalid handles read as empty cells.
    assert_eq!(map.height(MapPos::invalid()), 0);
    assert!(!map.set_height(MapPos::invalid(), 3));
}

#[test]
fn test_random_terrain_is_deterministic() {
    let a = GridMap::with_random_terrain(geometry(32, 32), 42);
    let b = GridMap::with_random_terrain(geometry(32, 32), 42);
    let c = GridMap::with_random_terrain(geometry(32, 32), 7);

    let mut differs = false;
    for row in 0..32 {
        for col in 0..32 {
            let pos = a.pos(col, row);
            assert_eq!(a.height(pos), b.height(pos));
            assert_eq!(a.terrain(pos, Triangle::Up), b.terrain(pos, Triangle::Up));
            assert!(a.height(pos) <= MAX_HEIGHT);
            assert!(TerrainType::try_from(a.terrain(pos, Triangle::Down)).is_ok());
            differs |= a.height(pos) != c.height(pos);
        }
    }
    assert!(differs);
}

#[test]
fn test_directions_display_and_iteration() {
    let dirs = Directions::Right | Directions::Up;
    assert_eq!(dirs.to_string(), "Right | Up");
    assert_eq!(Directions::empty().to_string(), "(empty)");

    let list: Vec<Direction> = dirs.iter_directions().collect();
    assert_eq!(list, vec![Direction::Right, Direction::Up]);
}

#[test]
fn test_entity_table() {
    let mut entities = EntityTable::new();

    let red = entities.add_player(Color::rgb(255, 0, 0)).unwrap();
    for _ in 1..entities::MAX_PLAYERS {
        assert!(entities.add_player(Color::WHITE).is_some());
    }
    assert!(entities.add_player(Color::BLACK).is_none());
    assert_eq!(entities.player_color(red), Some(Color::rgb(255, 0, 0)));
    assert_eq!(entities.player_color(PlayerId(9)), None);

    let pos = MapPos(17);
    entities.add_building(pos, BuildingKind::Sawmill, 0.5);
    let info = entities.building_at(pos).unwrap();
    assert_eq!(info.kind, BuildingKind::Sawmill);
    assert!(!info.is_finished());

    assert!(entities.set_building_progress(pos, 2.0));
    assert!(entities.set_building_burning(pos, true));
    let info = entities.building_at(pos).unwrap();
    assert!(info.is_finished());
    assert!(info.burning);

    entities.add_building(pos, BuildingKind::Farm, 1.0);
    assert_eq!(entities.building_count(), 1);
    assert_eq!(entities.building_at(pos).unwrap().kind, BuildingKind::Farm);

    assert!(entities.remove_building(pos).is_some());
    assert!(entities.building_at(pos).is_none());
    assert!(!entities.set_building_burning(pos, true));

    entities.add_serf(pos, red, Direction::Left);
    assert_eq!(entities.serf_at(pos), Some(SerfInfo { owner: red, facing: Direction::Left }));
    assert!(entities.remove_serf(pos).is_some());
    assert!(entities.serf_at(pos).is_none());
}
