use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize, de::DeserializeOwned};
use strum::EnumCount;

use crate::{
    log,
    minimap::MinimapLayers,
    viewport::ViewportLayers,
    world::TerrainType,
    utils::{Color, Size}
};

// ----------------------------------------------
// Configs
// ----------------------------------------------

pub const CONFIGS_DIR_PATH: &str = "assets/configs";

pub trait Configs {
    fn post_load(&mut self) {
    }

    // Saves current configs to `assets/configs/<name>.json`.
    fn save_file(&self, config_file_name: &str) -> bool
        where Self: Configs + Sized + Serialize
    {
        debug_assert!(!config_file_name.is_empty());

        // First make sure the save directory exists. Ignore any errors since
        // this function might fail if any element of the path already exists.
        let _ = std::fs::create_dir_all(CONFIGS_DIR_PATH);

        self.save_path(&config_json_path(config_file_name))
    }

    fn save_path(&self, config_json_path: &Path) -> bool
        where Self: Configs + Sized + Serialize
    {
        let json = match serde_json::to_string_pretty(self) {
            Ok(json) => json,
            Err(err) => {
                log::error!(log::channel!("config"), "Failed to save config file {config_json_path:?}: {err}");
                return false;
            }
        };

        if let Err(err) = std::fs::write(config_json_path, json) {
            log::error!(log::channel!("config"), "Failed to write config file {config_json_path:?}: {err}");
            return false;
        }

        true
    }

    // Either succeeds loading the config file or returns a default config.
    fn load_file<T>(config_file_name: &str) -> T
        where T: Configs + Sized + Default + DeserializeOwned
    {
        debug_assert!(!config_file_name.is_empty());
        Self::load_path(&config_json_path(config_file_name))
    }

    fn load_path<T>(config_json_path: &Path) -> T
        where T: Configs + Sized + Default + DeserializeOwned
    {
        let json = match std::fs::read_to_string(config_json_path) {
            Ok(json) => json,
            Err(err) => {
                log::error!(log::channel!("config"), "Failed to read config file from path {config_json_path:?}: {err}");
                return T::default();
            }
        };

        Self::load_str(&json).unwrap_or_else(|err| {
            log::error!(log::channel!("config"), "Failed to deserialize config file from path {config_json_path:?}: {err}");
            T::default()
        })
    }

    fn load_str<T>(json: &str) -> Result<T, serde_json::Error>
        where T: Configs + Sized + Default + DeserializeOwned
    {
        let mut configs: T = serde_json::from_str(json)?;
        configs.post_load();
        Ok(configs)
    }
}

fn config_json_path(config_file_name: &str) -> PathBuf {
    Path::new(CONFIGS_DIR_PATH)
        .join(config_file_name)
        .with_extension("json")
}

// ----------------------------------------------
// MinimapConfigs
// ----------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapConfigs {
    pub min_scale: i32,
    pub max_scale: i32,
    pub default_layers: MinimapLayers,

    // Placed at the bottom-right corner of the window.
    pub widget_size: Size,

    pub background_color: Color,
    pub road_color: Color,
    pub grid_colors: [Color; 2],
}

impl Default for MinimapConfigs {
    fn default() -> Self {
        Self {
            min_scale: 1,
            max_scale: 8,
            default_layers: MinimapLayers::default(),

            widget_size: Size::new(128, 128),

            background_color: Color::BLACK,
            road_color: Color::LIGHT_BROWN,
            grid_colors: [Color::LIGHT_YELLOW, Color::BLACK],
        }
    }
}

// ----------------------------------------------
// ViewportConfigs
// ----------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfigs {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,

    // If set, zoom requests interpolate toward the target on each step.
    pub smooth_zoom: bool,
    pub zoom_speed: f32,

    pub tile_size_cells: i32,
    pub default_layers: ViewportLayers,

    pub background_color: Color,
    pub grid_colors: [Color; 2],

    // Ticks of the step signal per burning animation frame.
    pub burning_frame_ticks: u32,
}

impl Default for ViewportConfigs {
    fn default() -> Self {
        Self {
            min_zoom: 0.4,
            max_zoom: 2.0,
            zoom_step: 0.2,

            smooth_zoom: false,
            zoom_speed: 0.25,

            tile_size_cells: 16,
            default_layers: ViewportLayers::default(),

            background_color: Color::BLACK,
            grid_colors: [Color::WHITE, Color::DARK_GRAY],

            burning_frame_ticks: 4,
        }
    }
}

// ----------------------------------------------
// InputConfigs
// ----------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfigs {
    pub double_click_millis: u64,
    pub double_click_radius_px: i32,
    pub key_scroll_px: i32,
    pub warp_cursor_on_drag: bool,
}

impl Default for InputConfigs {
    fn default() -> Self {
        Self {
            double_click_millis: 600,
            double_click_radius_px: 8,
            key_scroll_px: 32,
            warp_cursor_on_drag: true,
        }
    }
}

// ----------------------------------------------
// TerrainPalette
// ----------------------------------------------

// A color per terrain type. An entry set to `null` in the config file marks
// that terrain as unavailable; tiles that need it fail to render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainPalette {
    pub colors: [Option<Color>; TerrainType::COUNT],
}

impl TerrainPalette {
    #[inline]
    pub fn color(&self, terrain: TerrainType) -> Option<Color> {
        self.colors[terrain as usize]
    }

    #[inline]
    pub fn set_color(&mut self, terrain: TerrainType, color: Option<Color>) {
        self.colors[terrain as usize] = color;
    }

    // Changes whenever any entry changes. Used to detect stale cached tiles.
    pub fn fingerprint(&self) -> u64 {
        let mut bytes = [0u8; TerrainType::COUNT * 5];
        for (index, entry) in self.colors.iter().enumerate() {
            let chunk = &mut bytes[index * 5..(index + 1) * 5];
            if let Some(color) = entry {
                chunk[0] = 1;
                chunk[1..].copy_from_slice(&color.to_array());
            }
        }
        crate::utils::hash::fnv1a_from_bytes(&bytes)
    }
}

impl Default for TerrainPalette {
    fn default() -> Self {
        Self {
            colors: [
                // Water:
                Some(Color::rgb(0,   56,  140)),
                Some(Color::rgb(0,   72,  160)),
                Some(Color::rgb(16,  92,  176)),
                Some(Color::rgb(32,  112, 188)),
                // Grass:
                Some(Color::rgb(72,  132, 40)),
                Some(Color::rgb(88,  148, 44)),
                Some(Color::rgb(104, 160, 52)),
                Some(Color::rgb(120, 172, 64)),
                // Desert:
                Some(Color::rgb(196, 176, 108)),
                Some(Color::rgb(208, 188, 124)),
                Some(Color::rgb(220, 204, 144)),
                // Tundra:
                Some(Color::rgb(132, 124, 100)),
                Some(Color::rgb(148, 140, 120)),
                Some(Color::rgb(164, 156, 140)),
                // Snow:
                Some(Color::rgb(224, 228, 236)),
                Some(Color::rgb(244, 248, 252)),
            ],
        }
    }
}

// ----------------------------------------------
// MapViewConfigs
// ----------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)] // Missing fields in the config file get defaults from MapViewConfigs::default().
pub struct MapViewConfigs {
    pub minimap: MinimapConfigs,
    pub viewport: ViewportConfigs,
    pub input: InputConfigs,
    pub palette: TerrainPalette,
    pub log_level: log::Level,
}

impl Default for MapViewConfigs {
    fn default() -> Self {
        Self {
            minimap: MinimapConfigs::default(),
            viewport: ViewportConfigs::default(),
            input: InputConfigs::default(),
            palette: TerrainPalette::default(),
            log_level: log::Level::Info,
        }
    }
}

impl Configs for MapViewConfigs {
    fn post_load(&mut self) {
        if self.minimap.min_scale < 1 || self.minimap.min_scale > self.minimap.max_scale {
            log::warn!(log::channel!("config"), "Invalid minimap scale range [{}, {}]; using defaults.",
                       self.minimap.min_scale, self.minimap.max_scale);
            let defaults = MinimapConfigs::default();
            self.minimap.min_scale = defaults.min_scale;
            self.minimap.max_scale = defaults.max_scale;
        }

        if !(self.viewport.min_zoom > 0.0 && self.viewport.min_zoom <= self.viewport.max_zoom) {
            log::warn!(log::channel!("config"), "Invalid viewport zoom range [{}, {}]; using defaults.",
                       self.viewport.min_zoom, self.viewport.max_zoom);
            let defaults = ViewportConfigs::default();
            self.viewport.min_zoom = defaults.min_zoom;
            self.viewport.max_zoom = defaults.max_zoom;
        }

        self.viewport.tile_size_cells = self.viewport.tile_size_cells.max(1);
        self.viewport.zoom_speed = self.viewport.zoom_speed.clamp(0.01, 1.0);
        self.viewport.burning_frame_ticks = self.viewport.burning_frame_ticks.max(1);

        log::set_level(self.log_level);
    }
}
