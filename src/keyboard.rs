use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::camera::OrbitCamera;
use crate::export::SaveImageRequest;
use crate::tile_cache::TileCache;
use crate::tiles::MapOverlayState;

const HELP_TITLE: &str = "Keyboard Shortcuts";

pub const HELP_TEXT: &str = "\
Click       Place measurement point
Drag        Orbit camera
Right-drag  Pan camera
Scroll      Zoom
R           Reset camera
M           Toggle map
P           Save image
H           Toggle this help
Esc         Close help

Shift+C     Clear tile cache";

/// Resource for help overlay visibility
#[derive(Resource, Default)]
pub struct HelpOverlayState {
    pub visible: bool,
}

pub struct KeyboardPlugin;

impl Plugin for KeyboardPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HelpOverlayState>()
            .add_systems(Update, handle_keyboard_shortcuts)
            .add_systems(
                bevy_egui::EguiPrimaryContextPass,
                render_help_overlay.run_if(crate::export::capture_idle),
            );
    }
}

/// System to handle keyboard shortcuts
pub fn handle_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut help_state: ResMut<HelpOverlayState>,
    mut orbit: Option<ResMut<OrbitCamera>>,
    mut map_state: Option<ResMut<MapOverlayState>>,
    mut save_requests: MessageWriter<SaveImageRequest>,
    mut contexts: EguiContexts,
) {
    // Check if egui wants keyboard input (e.g., typing in a text field)
    let mut shift_held = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    if let Ok(ctx) = contexts.ctx_mut() {
        if ctx.wants_keyboard_input() {
            return;
        }
        // bevy_egui can absorb modifier keys from ButtonInput
        shift_held |= ctx.input(|i| i.modifiers.shift);
    }

    // H - Toggle help overlay
    if keyboard.just_pressed(KeyCode::KeyH) {
        help_state.visible = !help_state.visible;
    }

    if keyboard.just_pressed(KeyCode::Escape) && help_state.visible {
        help_state.visible = false;
    }

    // R - Reset camera to the configured start pose
    if keyboard.just_pressed(KeyCode::KeyR) {
        if let Some(ref mut orbit) = orbit {
            orbit.reset();
        }
    }

    // M - Toggle map overlay
    if keyboard.just_pressed(KeyCode::KeyM) {
        match map_state {
            Some(ref mut state) => state.toggle_visibility(),
            None => info!("Map overlay is disabled"),
        }
    }

    // P - Save image
    if keyboard.just_pressed(KeyCode::KeyP) {
        save_requests.write(SaveImageRequest);
    }

    // Shift+C - Clear tile cache on disk; loaded tiles stay on screen
    if shift_held && keyboard.just_pressed(KeyCode::KeyC) {
        TileCache::default().clear();
    }
}

/// Draw the help window while it is toggled on. It is an egui window so
/// clicks on it never reach the scene.
pub fn render_help_overlay(mut contexts: EguiContexts, mut help_state: ResMut<HelpOverlayState>) {
    if !help_state.visible {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };
    draw_help_window(ctx, &mut help_state.visible);
}

pub fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new(HELP_TITLE)
        .open(open)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.monospace(HELP_TEXT);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui_kittest::{kittest::Queryable, Harness};

    fn help_harness() -> Harness<'static, bool> {
        Harness::new_state(|ctx, open: &mut bool| draw_help_window(ctx, open), true)
    }

    #[test]
    fn help_window_shows_shortcuts() {
        let harness = help_harness();
        harness.get_by_label(HELP_TITLE);
        harness.get_by_label(HELP_TEXT);
    }

    #[test]
    fn pointer_over_help_counts_as_ui() {
        // Harness screen is 800x600; the window is anchored at its center
        let mut harness = help_harness();
        harness.hover_at(egui::pos2(400.0, 300.0));
        harness.run();
        assert!(harness.ctx.is_pointer_over_area());

        harness.hover_at(egui::pos2(5.0, 5.0));
        harness.run();
        assert!(!harness.ctx.is_pointer_over_area());
    }

    #[test]
    fn close_button_hides_help() {
        let mut harness = help_harness();
        harness.get_by_label("Close window").click();
        harness.run();
        assert!(!*harness.state());
    }

    #[test]
    fn help_lists_every_shortcut() {
        for key in ["R ", "M ", "P ", "H ", "Shift+C", "Right-drag"] {
            assert!(HELP_TEXT.contains(key), "missing {}", key);
        }
        assert!(!HELP_TEXT.contains("R-Drag"));
    }
}
