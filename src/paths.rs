/// Path resolution for development runs and macOS `.app` bundles.
///
/// Inside a bundle the working directory is whatever Finder chose (usually
/// `/`), so config, exports and logs go to the per-user platform
/// directories. Under `cargo run` everything stays in the project directory.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "model-ruler";

/// `true` when the executable sits under `*.app/Contents/MacOS/`.
pub fn is_bundled() -> bool {
    bundle_contents_dir().is_some()
}

fn bundle_contents_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    find_bundle_contents(&exe)
}

/// Walk up from `exe` looking for a `Contents/MacOS` pair.
fn find_bundle_contents(exe: &Path) -> Option<PathBuf> {
    exe.ancestors().find_map(|dir| {
        let parent = dir.parent()?;
        let is_macos = dir.file_name().is_some_and(|n| n == "MacOS");
        let is_contents = parent.file_name().is_some_and(|n| n == "Contents");
        (is_macos && is_contents).then(|| parent.to_path_buf())
    })
}

/// Directory the binary and its `assets/` folder are resolved from.
pub fn base_dir() -> PathBuf {
    match bundle_contents_dir() {
        Some(contents) => contents.join("MacOS"),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

pub fn assets_dir() -> PathBuf {
    base_dir().join("assets")
}

/// Where `config.toml` lives. The working directory during development.
pub fn config_dir() -> PathBuf {
    if is_bundled() {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR)
    } else {
        std::env::current_dir().unwrap_or_default()
    }
}

/// Where exported images are written.
///
/// - **macOS**: `~/Library/Application Support/model-ruler/data/`
/// - **Linux**: `~/.local/share/model-ruler/data/`
/// - **Dev**: `<cwd>/tmp/`
pub fn data_dir() -> PathBuf {
    if is_bundled() {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(APP_DIR)
            .join("data")
    } else {
        base_dir().join("tmp")
    }
}

/// Platform cache directory for downloaded map tiles.
pub fn tile_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(APP_DIR)
        .join("tiles")
}

/// Create `path` and its parents if missing. Returns it for chaining.
pub fn ensure_dir(path: &Path) -> &Path {
    let _ = std::fs::create_dir_all(path);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_bundled_under_cargo_test() {
        assert!(!is_bundled());
    }

    #[test]
    fn dev_paths_follow_working_directory() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(base_dir(), cwd);
        assert_eq!(assets_dir(), cwd.join("assets"));
        assert_eq!(config_dir(), cwd);
        assert_eq!(data_dir(), cwd.join("tmp"));
    }

    #[test]
    fn bundle_contents_found_from_executable_path() {
        let exe = Path::new("/Applications/Model Ruler.app/Contents/MacOS/model_ruler");
        assert_eq!(
            find_bundle_contents(exe),
            Some(PathBuf::from("/Applications/Model Ruler.app/Contents"))
        );
        assert_eq!(find_bundle_contents(Path::new("/usr/local/bin/model_ruler")), None);
    }

    #[test]
    fn tile_cache_is_app_specific() {
        assert!(tile_cache_dir().ends_with("model-ruler/tiles"));
    }
}
