mod controller;
mod measurement;
mod ndc;
mod raycast;

pub use controller::*;
pub use measurement::*;
pub use ndc::*;
pub use raycast::*;

use bevy::prelude::*;

pub struct ToolsPlugin;

impl Plugin for ToolsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_measurement)
            .add_systems(
                Update,
                (
                    handle_measurement_clicks.after(crate::input::detect_surface_clicks),
                    sync_measurement_visuals.after(handle_measurement_clicks),
                ),
            )
            .add_systems(
                bevy_egui::EguiPrimaryContextPass,
                render_distance_readout.run_if(crate::export::capture_idle),
            );
    }
}
