//! Top-left egui toolbar with the image export button, map toggle and
//! help toggle. Export status is shown next to the buttons.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::export::{ExportState, SaveImageRequest};
use crate::keyboard::HelpOverlayState;
use crate::tiles::MapOverlayState;

const TOOLBAR_POS: egui::Pos2 = egui::pos2(10.0, 10.0);

/// Buttons pressed this frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ToolbarActions {
    pub save_image: bool,
    pub toggle_map: bool,
    pub toggle_help: bool,
}

/// What the toolbar displays.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ToolbarView {
    /// `None` when the map overlay is disabled
    pub map_visible: Option<bool>,
    pub help_visible: bool,
    pub saving: bool,
    pub status: Option<String>,
}

pub fn render_toolbar(
    mut contexts: EguiContexts,
    mut help_state: ResMut<HelpOverlayState>,
    mut map_state: Option<ResMut<MapOverlayState>>,
    export_state: Res<ExportState>,
    mut save_requests: MessageWriter<SaveImageRequest>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let view = ToolbarView {
        map_visible: map_state.as_ref().map(|state| state.visible),
        help_visible: help_state.visible,
        saving: export_state.pending,
        status: export_state.status_message.clone(),
    };
    let mut actions = ToolbarActions::default();

    egui::Area::new(egui::Id::new("toolbar"))
        .fixed_pos(TOOLBAR_POS)
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                draw_toolbar(ui, &view, &mut actions);
            });
        });

    if actions.save_image {
        save_requests.write(SaveImageRequest);
    }
    if actions.toggle_map {
        if let Some(ref mut state) = map_state {
            state.toggle_visibility();
        }
    }
    if actions.toggle_help {
        help_state.visible = !help_state.visible;
    }
}

/// Draw the toolbar row, recording presses into `actions`.
pub fn draw_toolbar(ui: &mut egui::Ui, view: &ToolbarView, actions: &mut ToolbarActions) {
    ui.horizontal(|ui| {
        let save = ui
            .add_enabled(!view.saving, egui::Button::new("Save Image"))
            .on_hover_text("Save the current view as PNG (P)");
        actions.save_image |= save.clicked();

        if let Some(visible) = view.map_visible {
            let map = ui
                .selectable_label(visible, "Map")
                .on_hover_text("Toggle map overlay (M)");
            actions.toggle_map |= map.clicked();
        }

        let help = ui
            .selectable_label(view.help_visible, "Help")
            .on_hover_text("Keyboard shortcuts (H)");
        actions.toggle_help |= help.clicked();

        if let Some(ref status) = view.status {
            let color = if status.starts_with("Error") {
                egui::Color32::RED
            } else {
                egui::Color32::DARK_GREEN
            };
            ui.colored_label(color, status);
        }
    });
}

pub struct ToolbarPlugin;

impl Plugin for ToolbarPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            bevy_egui::EguiPrimaryContextPass,
            render_toolbar.run_if(crate::export::capture_idle),
        );
    }
}
