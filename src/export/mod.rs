//! Image export.
//!
//! Captures the primary window and writes it as a PNG into the data
//! directory. Triggered by the `P` key or the toolbar's "Save Image" button.

use bevy::prelude::*;
use bevy::render::view::screenshot::{Screenshot, ScreenshotCaptured};
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::paths;

/// Request to capture the current frame.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct SaveImageRequest;

/// Resource for export state
#[derive(Resource, Default)]
pub struct ExportState {
    /// A capture is in flight
    pub pending: bool,
    /// Status message shown in the toolbar
    pub status_message: Option<String>,
}

/// Run condition for egui overlays. They are left out of the frame while a
/// capture is in flight so the image shows only the 3D view.
pub fn capture_idle(export_state: Option<Res<ExportState>>) -> bool {
    export_state.is_none_or(|state| !state.pending)
}

/// Path in `dir` for `file_name` that does not overwrite an earlier export.
/// `rendered_model.png` becomes `rendered_model_1.png`, `rendered_model_2.png`, ...
pub fn unique_export_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let file = Path::new(file_name);
    let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("export");
    let extension = file.extension().and_then(|s| s.to_str()).unwrap_or("png");
    (1..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, extension)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Encode a captured frame as PNG.
pub fn save_png(image: &Image, path: &Path) -> Result<(), String> {
    let dynamic = image
        .clone()
        .try_into_dynamic()
        .map_err(|e| format!("Failed to convert screenshot: {:?}", e))?;
    dynamic
        .to_rgba8()
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

/// Start a window capture for each request, one at a time.
pub fn handle_save_requests(
    mut commands: Commands,
    mut requests: MessageReader<SaveImageRequest>,
    mut export_state: ResMut<ExportState>,
    config: Res<AppConfig>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();
    if export_state.pending {
        return;
    }

    let dir = paths::data_dir();
    paths::ensure_dir(&dir);
    let path = unique_export_path(&dir, &config.export.file_name);
    info!("Capturing screenshot to {}", path.display());

    export_state.pending = true;
    export_state.status_message = Some("Saving...".to_string());
    commands
        .spawn(Screenshot::primary_window())
        .observe(move |captured: On<ScreenshotCaptured>, mut export_state: ResMut<ExportState>| {
            export_state.pending = false;
            match save_png(&captured.image, &path) {
                Ok(()) => {
                    info!("Saved image to {}", path.display());
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    export_state.status_message = Some(format!("Saved {}", name));
                }
                Err(e) => {
                    error!("{}", e);
                    export_state.status_message = Some(format!("Error: {}", e));
                }
            }
        });
}

/// Plugin for export functionality
pub struct ExportPlugin;

impl Plugin for ExportPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SaveImageRequest>()
            .init_resource::<ExportState>()
            .add_systems(Update, handle_save_requests);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("model_ruler_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[derive(Resource, Default)]
    struct OverlayFrames(u32);

    fn draw_overlay(mut frames: ResMut<OverlayFrames>) {
        frames.0 += 1;
    }

    #[test]
    fn overlays_skipped_while_capture_pending() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ExportState>()
            .init_resource::<OverlayFrames>()
            .add_systems(Update, draw_overlay.run_if(capture_idle));

        app.update();
        assert_eq!(app.world().resource::<OverlayFrames>().0, 1);

        app.world_mut().resource_mut::<ExportState>().pending = true;
        app.update();
        assert_eq!(app.world().resource::<OverlayFrames>().0, 1);

        app.world_mut().resource_mut::<ExportState>().pending = false;
        app.update();
        assert_eq!(app.world().resource::<OverlayFrames>().0, 2);
    }

    #[test]
    fn first_export_uses_configured_name() {
        let dir = temp_dir("export_first");
        assert_eq!(unique_export_path(&dir, "rendered_model.png"), dir.join("rendered_model.png"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn later_exports_get_numeric_suffix() {
        let dir = temp_dir("export_suffix");
        fs::write(dir.join("rendered_model.png"), b"").unwrap();
        fs::write(dir.join("rendered_model_1.png"), b"").unwrap();

        assert_eq!(unique_export_path(&dir, "rendered_model.png"), dir.join("rendered_model_2.png"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn captured_frame_written_as_png() {
        let dir = temp_dir("export_png");
        let path = dir.join("frame.png");
        // Screenshots arrive in the surface format, commonly BGRA
        let frame = Image::new(
            Extent3d {
                width: 2,
                height: 1,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            vec![0, 0, 255, 255, 255, 0, 0, 255],
            TextureFormat::Bgra8UnormSrgb,
            default(),
        );

        save_png(&frame, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255, 255]);
        let _ = fs::remove_dir_all(&dir);
    }
}
