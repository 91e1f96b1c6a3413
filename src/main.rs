use bevy::prelude::*;
use bevy_egui::EguiPlugin;

mod camera;
mod config;
mod export;
mod geo;
mod input;
mod keyboard;
mod paths;
mod scene;
mod tile_cache;
mod tiles;
mod toolbar;
mod tools;

use camera::CameraPlugin;
use config::ConfigPlugin;
use export::ExportPlugin;
use input::InputPlugin;
use keyboard::KeyboardPlugin;
use scene::ScenePlugin;
use tiles::MapOverlayPlugin;
use toolbar::ToolbarPlugin;
use tools::ToolsPlugin;

// =============================================================================
// Constants
// =============================================================================

mod constants {
    // Mercator projection limits
    pub const MERCATOR_LAT_LIMIT: f64 = 85.0511;

    // Geographic position of the model origin
    pub const DEFAULT_LATITUDE: f64 = 35.9849112;
    pub const DEFAULT_LONGITUDE: f64 = -78.9922438;

    // Tile zoom
    pub const DEFAULT_TILE_ZOOM: u8 = 20;
    pub const MAX_TILE_ZOOM: u8 = 20;

    // Tiles loaded in each direction around the model origin
    pub const TILE_DOWNLOAD_RADIUS: u8 = 3;

    // Pointer travel (logical pixels) beyond which a press becomes a drag
    pub const CLICK_DRAG_THRESHOLD: f32 = 5.0;
}

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Model Ruler".to_string(),
                        resolution: (1280, 720).into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    file_path: paths::assets_dir().to_string_lossy().into_owned(),
                    ..default()
                }),
            EguiPlugin::default(),
            ConfigPlugin,
        ))
        .add_plugins((
            ScenePlugin,
            CameraPlugin,
            InputPlugin,
            ToolsPlugin,
            MapOverlayPlugin,
            ExportPlugin,
            KeyboardPlugin,
            ToolbarPlugin,
        ))
        .run();
}
