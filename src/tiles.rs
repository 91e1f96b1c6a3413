use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy_egui::{egui, EguiContexts};
use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;

use crate::config::AppConfig;
use crate::geo::{CoordinateConverter, TileId};
use crate::tile_cache::TileCache;

const FETCH_TIMEOUT_SECS: u64 = 15;
pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

// =============================================================================
// Components and Resources
// =============================================================================

/// Parent of every map tile quad. Hiding it hides the whole map.
#[derive(Component)]
pub struct MapRoot;

/// A textured ground quad for one raster tile.
#[derive(Component, Debug)]
pub struct MapTile(pub TileId);

/// Shared quad mesh sized to one tile at the configured zoom.
#[derive(Resource)]
struct TileQuadMesh(Handle<Mesh>);

#[derive(Resource, Debug)]
pub struct MapOverlayState {
    pub visible: bool,
    pub converter: CoordinateConverter,
    pub requested: usize,
    pub loaded: usize,
    pub failed: usize,
}

impl MapOverlayState {
    pub fn toggle_visibility(&mut self) {
        self.visible = !self.visible;
        info!("Map overlay {}", if self.visible { "shown" } else { "hidden" });
    }
}

/// Decoded tile handed back from the fetch worker.
pub struct TileResult {
    pub tile: TileId,
    pub image: Result<Image, String>,
}

/// Channel ends of the background tile worker.
#[derive(Resource)]
pub struct TileFetcher {
    requests: Sender<TileId>,
    results: Receiver<TileResult>,
}

impl TileFetcher {
    pub fn request(&self, tile: TileId) {
        if self.requests.send(tile).is_err() {
            warn!("Tile worker has stopped, dropping request for {:?}", tile);
        }
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct MapOverlayPlugin;

impl Plugin for MapOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_map_overlay)
            .add_systems(
                Update,
                (receive_tiles, apply_map_visibility).run_if(resource_exists::<MapOverlayState>),
            )
            .add_systems(
                bevy_egui::EguiPrimaryContextPass,
                render_attribution.run_if(resource_exists::<MapOverlayState>),
            );
    }
}

// =============================================================================
// Fetch Worker
// =============================================================================

/// Start the background thread that serves tile requests from the disk
/// cache, falling back to the network. The thread exits when the
/// [`TileFetcher`] is dropped.
pub fn spawn_tile_worker(endpoint: String, user_agent: String, cache: TileCache) -> TileFetcher {
    let (request_tx, request_rx) = crossbeam_channel::unbounded::<TileId>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<TileResult>();

    std::thread::spawn(move || {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| error!("Failed to create tile HTTP client: {}", e))
            .ok();

        for tile in request_rx.iter() {
            let image = load_tile(client.as_ref(), &endpoint, &cache, tile);
            if result_tx.send(TileResult { tile, image }).is_err() {
                break;
            }
        }
    });

    TileFetcher {
        requests: request_tx,
        results: result_rx,
    }
}

fn load_tile(
    client: Option<&reqwest::blocking::Client>,
    endpoint: &str,
    cache: &TileCache,
    tile: TileId,
) -> Result<Image, String> {
    if let Some(bytes) = cache.read(tile) {
        match decode_tile(&bytes) {
            Ok(image) => return Ok(image),
            Err(e) => {
                // Corrupt cache entry: drop it and download again
                warn!("Discarding cached tile {:?}: {}", tile, e);
                let _ = std::fs::remove_file(cache.path_for(tile));
            }
        }
    }

    let client = client.ok_or_else(|| "No HTTP client available".to_string())?;
    let bytes = fetch_tile(client, &tile.url(endpoint))?;
    let image = decode_tile(&bytes)?;
    if let Err(e) = cache.store(tile, &bytes) {
        warn!("{}", e);
    }
    Ok(image)
}

/// Download one tile (blocking, for use on the worker thread)
fn fetch_tile(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, String> {
    debug!("Fetching tile {}", url);
    let response = client
        .get(url)
        .send()
        .map_err(|e| format!("Tile download failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("HTTP error {} for {}", response.status(), url));
    }

    let bytes = response
        .bytes()
        .map_err(|e| format!("Failed to read tile response: {}", e))?;
    Ok(bytes.to_vec())
}

/// Decode an encoded tile into an sRGB texture.
pub fn decode_tile(bytes: &[u8]) -> Result<Image, String> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| format!("Failed to decode tile: {}", e))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        rgba.into_raw(),
        TextureFormat::Rgba8UnormSrgb,
        default(),
    ))
}

// =============================================================================
// Map Systems
// =============================================================================

fn setup_map_overlay(
    mut commands: Commands,
    config: Res<AppConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let map = &config.map;
    if !map.enabled {
        info!("Map overlay disabled in config");
        return;
    }

    let converter = CoordinateConverter::new(map.latitude, map.longitude, map.zoom, map.units_per_meter);
    let tiles = converter.origin_tile().neighborhood(map.tile_radius);
    let fetcher = spawn_tile_worker(map.endpoint.clone(), map.user_agent.clone(), TileCache::default());
    for tile in &tiles {
        fetcher.request(*tile);
    }
    info!(
        "Requested {} map tiles around ({:.6}, {:.6}) at zoom {}",
        tiles.len(),
        map.latitude,
        map.longitude,
        map.zoom
    );

    let half_size = converter.tile_world_size() / 2.0;
    commands.insert_resource(TileQuadMesh(meshes.add(Plane3d::new(Vec3::Y, Vec2::splat(half_size)))));
    commands.spawn((
        Name::new("Map"),
        Transform::from_xyz(0.0, map.elevation, 0.0),
        Visibility::Visible,
        MapRoot,
    ));
    commands.insert_resource(MapOverlayState {
        visible: true,
        converter,
        requested: tiles.len(),
        loaded: 0,
        failed: 0,
    });
    commands.insert_resource(fetcher);
}

/// Turn finished downloads into unlit ground quads under the [`MapRoot`].
fn receive_tiles(
    mut commands: Commands,
    fetcher: Option<Res<TileFetcher>>,
    quad_mesh: Option<Res<TileQuadMesh>>,
    mut state: ResMut<MapOverlayState>,
    root_query: Query<Entity, With<MapRoot>>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let (Some(fetcher), Some(quad_mesh)) = (fetcher, quad_mesh) else {
        return;
    };
    let Ok(root) = root_query.single() else {
        return;
    };

    for result in fetcher.results.try_iter() {
        match result.image {
            Ok(image) => {
                let material = materials.add(StandardMaterial {
                    base_color_texture: Some(images.add(image)),
                    base_color: Color::WHITE,
                    unlit: true,
                    ..default()
                });
                let center = state.converter.tile_center(result.tile);
                commands.spawn((
                    Name::new(format!("Tile {}/{}/{}", result.tile.zoom, result.tile.x, result.tile.y)),
                    MapTile(result.tile),
                    Mesh3d(quad_mesh.0.clone()),
                    MeshMaterial3d(material),
                    Transform::from_xyz(center.x, 0.0, center.y),
                    ChildOf(root),
                ));
                state.loaded += 1;
            }
            Err(e) => {
                warn!("Map tile {:?} unavailable: {}", result.tile, e);
                state.failed += 1;
            }
        }

        if state.loaded + state.failed == state.requested {
            info!("Map tiles finished: {} loaded, {} failed", state.loaded, state.failed);
        }
    }
}

fn apply_map_visibility(
    state: Res<MapOverlayState>,
    mut root_query: Query<&mut Visibility, With<MapRoot>>,
) {
    if !state.is_changed() {
        return;
    }
    let target = if state.visible {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };
    for mut visibility in root_query.iter_mut() {
        visibility.set_if_neq(target);
    }
}

fn render_attribution(mut contexts: EguiContexts, state: Res<MapOverlayState>) {
    if !state.visible {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    egui::Area::new(egui::Id::new("map_attribution"))
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-6.0, -4.0))
        .interactable(false)
        .show(ctx, draw_attribution);
}

pub fn draw_attribution(ui: &mut egui::Ui) {
    ui.label(
        egui::RichText::new(ATTRIBUTION)
            .small()
            .color(egui::Color32::from_gray(60)),
    );
}
