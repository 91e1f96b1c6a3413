use bevy::asset::{LoadState, RenderAssetUsages};
use bevy::gltf::{Gltf, GltfExtras, GltfLoaderSettings};
use bevy::prelude::*;

use crate::config::AppConfig;

// =============================================================================
// Components and Resources
// =============================================================================

/// Root entity of the spawned glTF scene.
#[derive(Component)]
pub struct ModelRoot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLoadStatus {
    Loading,
    Loaded,
    Failed,
}

#[derive(Resource)]
pub struct ModelAsset {
    pub path: String,
    pub gltf: Handle<Gltf>,
    pub status: ModelLoadStatus,
}

// =============================================================================
// Plugin
// =============================================================================

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::WHITE))
            .add_systems(Startup, (setup_lighting, load_model))
            .add_systems(Update, (poll_model_load, log_model_materials, log_model_extras));
    }
}

pub fn setup_lighting(mut commands: Commands, config: Res<AppConfig>) {
    let lighting = &config.lighting;

    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            color: Color::WHITE,
            illuminance: lighting.directional_illuminance,
            ..default()
        },
        Transform::from_translation(Vec3::from_array(lighting.directional_position))
            .looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(GlobalAmbientLight {
        color: Color::WHITE,
        brightness: lighting.ambient_brightness,
        ..default()
    });
}

/// Start loading the configured model and spawn its scene root.
///
/// Meshes are kept in the main world as well as the render world so the
/// measurement ray cast can hit them.
pub fn load_model(mut commands: Commands, asset_server: Res<AssetServer>, config: Res<AppConfig>) {
    let path = config.model.path.clone();
    let keep_meshes = |settings: &mut GltfLoaderSettings| {
        settings.load_meshes = RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD;
    };

    let gltf: Handle<Gltf> = asset_server.load_with_settings(path.clone(), keep_meshes);
    let scene: Handle<Scene> =
        asset_server.load_with_settings(GltfAssetLabel::Scene(0).from_asset(path.clone()), keep_meshes);
    info!("Loading model {}", path);

    commands.spawn((
        Name::new("Model"),
        SceneRoot(scene),
        Transform::from_translation(config.model_offset()),
        ModelRoot,
    ));
    commands.insert_resource(ModelAsset {
        path,
        gltf,
        status: ModelLoadStatus::Loading,
    });
}

/// Report the outcome of the model load once.
pub fn poll_model_load(
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
    model: Option<ResMut<ModelAsset>>,
) {
    let Some(mut model) = model else {
        return;
    };
    if model.status != ModelLoadStatus::Loading {
        return;
    }

    match asset_server.get_load_state(&model.gltf) {
        Some(LoadState::Loaded) => {
            model.status = ModelLoadStatus::Loaded;
            match gltfs.get(&model.gltf) {
                Some(gltf) => info!(
                    "Model loaded: {} ({} scenes, {} meshes, {} materials)",
                    model.path,
                    gltf.scenes.len(),
                    gltf.meshes.len(),
                    gltf.materials.len()
                ),
                None => info!("Model loaded: {}", model.path),
            }
        }
        Some(LoadState::Failed(err)) => {
            error!("Failed to load model {}: {}", model.path, err);
            model.status = ModelLoadStatus::Failed;
        }
        _ => {}
    }
}

/// Log each material of the model as its meshes appear.
pub fn log_model_materials(
    added: Query<(Entity, &MeshMaterial3d<StandardMaterial>), Added<MeshMaterial3d<StandardMaterial>>>,
    parents: Query<&ChildOf>,
    roots: Query<(), With<ModelRoot>>,
    materials: Res<Assets<StandardMaterial>>,
) {
    for (entity, material) in added.iter() {
        if !parents.iter_ancestors(entity).any(|ancestor| roots.contains(ancestor)) {
            continue;
        }
        if let Some(material) = materials.get(&material.0) {
            debug!("Model material on {:?}: {}", entity, describe_material(material));
        }
    }
}

/// Log glTF extras ("user data") attached to model nodes.
pub fn log_model_extras(added: Query<(Entity, Option<&Name>, &GltfExtras), Added<GltfExtras>>) {
    for (entity, name, extras) in added.iter() {
        let label = name.map(|n| n.as_str().to_string()).unwrap_or_else(|| format!("{:?}", entity));
        debug!("Model user data on {}: {}", label, extras.value);
    }
}

pub fn describe_material(material: &StandardMaterial) -> String {
    let color = material.base_color.to_srgba();
    format!(
        "color=({:.2}, {:.2}, {:.2}, {:.2}) metallic={:.2} roughness={:.2} alpha={:?}",
        color.red,
        color.green,
        color.blue,
        color.alpha,
        material.metallic,
        material.perceptual_roughness,
        material.alpha_mode
    )
}
