// NOTE: Allow these for the whole project.
#![allow(clippy::collapsible_if)]
#![allow(clippy::too_many_arguments)]

pub mod log;
pub mod app;
pub mod engine;
pub mod minimap;
pub mod render;
pub mod tile;
pub mod utils;
pub mod view;
pub mod viewport;
pub mod world;

// Commonly used types, re-exported at the crate root.
pub use app::{MapAction, MapInterface};
pub use minimap::{Minimap, MinimapLayers};
pub use view::{ToroidalView, ViewState};
pub use viewport::{Viewport, ViewportLayers};
pub use world::{EntityStore, MapPos, MapStore};
