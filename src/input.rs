use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::constants;

// =============================================================================
// Messages and Resources
// =============================================================================

/// A left click on the 3D viewport that was not part of a camera drag.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct SurfaceClick {
    /// Cursor position in logical window pixels, origin top-left
    pub position: Vec2,
    /// Logical size of the window at the time of the click
    pub viewport: Vec2,
}

/// Tracks whether egui wants pointer input this frame, used to keep
/// clicks and camera drags over UI panels away from the scene.
#[derive(Resource, Default)]
pub struct EguiWantsPointer(pub bool);

/// Tracks the press half of a potential click.
#[derive(Resource, Default)]
pub(crate) struct ClickTracker {
    press_position: Option<Vec2>,
}

// =============================================================================
// Plugin
// =============================================================================

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SurfaceClick>()
            .init_resource::<EguiWantsPointer>()
            .init_resource::<ClickTracker>()
            .add_systems(
                Update,
                (
                    check_egui_wants_input,
                    detect_surface_clicks.after(check_egui_wants_input),
                ),
            );
    }
}

// =============================================================================
// Input Systems
// =============================================================================

pub fn check_egui_wants_input(
    mut contexts: EguiContexts,
    mut egui_wants: ResMut<EguiWantsPointer>,
) {
    egui_wants.0 = contexts
        .ctx_mut()
        .map(|ctx| ctx.is_pointer_over_area() || ctx.wants_pointer_input())
        .unwrap_or(false);
}

/// Emit a [`SurfaceClick`] for each left press/release pair that stayed
/// within the drag dead zone. Longer movements belong to the orbit camera.
pub fn detect_surface_clicks(
    mouse_button: Res<ButtonInput<MouseButton>>,
    window_query: Query<&Window>,
    egui_wants: Res<EguiWantsPointer>,
    mut tracker: ResMut<ClickTracker>,
    mut clicks: MessageWriter<SurfaceClick>,
) {
    let Ok(window) = window_query.single() else {
        return;
    };
    let cursor = window.cursor_position();

    if mouse_button.just_pressed(MouseButton::Left) {
        // Presses that start over a panel never become scene clicks
        tracker.press_position = if egui_wants.0 { None } else { cursor };
    }

    if mouse_button.just_released(MouseButton::Left) {
        let press = tracker.press_position.take();
        if let (Some(press), Some(release)) = (press, cursor) {
            if is_click(press, release) {
                clicks.write(SurfaceClick {
                    position: release,
                    viewport: Vec2::new(window.width(), window.height()),
                });
            }
        }
    }
}

/// `true` when the pointer moved less than the drag threshold between
/// press and release.
pub fn is_click(press: Vec2, release: Vec2) -> bool {
    press.distance(release) < constants::CLICK_DRAG_THRESHOLD
}
