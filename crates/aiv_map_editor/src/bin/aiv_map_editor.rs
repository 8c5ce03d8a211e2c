//! Standalone AIV map editor binary
//!
//! Run with: aiv_map_editor [map.aiv | map.json]

use aiv_map_editor::commands::PendingAction;
use aiv_map_editor::preferences::EditorPreferences;
use aiv_map_editor::{EditorPlugin, EditorState};
use bevy::prelude::*;
use bevy::window::WindowResolution;
use std::path::PathBuf;

/// Map named on the command line
#[derive(Resource)]
struct StartupMap(Option<PathBuf>);

fn main() {
    let startup_map = std::env::args_os().nth(1).map(PathBuf::from);

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "AIV Map Editor".to_string(),
                resolution: WindowResolution::new(1600, 1000),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EditorPlugin::default())
        .insert_resource(StartupMap(startup_map))
        .add_systems(Startup, open_startup_map)
        .run();
}

/// Open the map given on the command line, or else the last map if enabled
/// in preferences
fn open_startup_map(
    startup_map: Res<StartupMap>,
    preferences: Res<EditorPreferences>,
    mut editor_state: ResMut<EditorState>,
) {
    let path = match &startup_map.0 {
        Some(path) => path.clone(),
        None if preferences.auto_open_last_map => match preferences.last_map() {
            Some(recent) => PathBuf::from(&recent.path),
            None => return,
        },
        None => return,
    };

    if path.exists() {
        info!("Opening {}", path.display());
        editor_state.pending_action = Some(PendingAction::Open(path));
    } else {
        warn!("Map file not found: {}", path.display());
    }
}
