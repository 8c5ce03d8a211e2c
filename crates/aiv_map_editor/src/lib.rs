//! aiv_map_editor - Stroke-based map editor for Stronghold AIV castle files
//!
//! This crate provides:
//! - A stroke history with a movable cursor (undo/redo without losing work)
//! - A brush engine turning drag gestures into strokes
//! - Import/export of `.aiv` files through an external converter
//! - A Bevy plugin wiring input, commands and a gizmo overlay together
//!
//! # Usage
//!
//! ```rust,ignore
//! use bevy::prelude::*;
//! use aiv_map_editor::EditorPlugin;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(EditorPlugin::new().with_catalog_dir("catalog"))
//!         .run();
//! }
//! ```

pub mod commands;
pub mod convert;
pub mod document;
pub mod history;
pub mod preferences;
pub mod render;
pub mod tools;

pub use aiv_map_core;

use aiv_map_core::Catalog;
use bevy::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use commands::{
    handle_keyboard_shortcuts, handle_pending_actions, process_document_updates, PendingAction,
};
use convert::Converter;
use document::MapDocument;
use preferences::EditorPreferences;
use render::MapRenderPlugin;
use tools::{Brush, EditorToolsPlugin, MapEditor};

/// Items available to paint with
#[derive(Resource, Clone)]
pub struct ItemCatalog(pub Arc<Catalog>);

/// Converter used for `.aiv` files
#[derive(Resource, Clone, Debug)]
pub struct MapConverter(pub Converter);

/// Global editor state
#[derive(Resource, Default)]
pub struct EditorState {
    pub pending_action: Option<PendingAction>,
    /// Last failure, for display
    pub error_message: Option<String>,
}

/// Configuration for initial editor state
///
/// Anything set here takes precedence over saved preferences.
#[derive(Clone, Debug, Default)]
pub struct EditorStateConfig {
    pub catalog_dir: Option<PathBuf>,
    pub converter: Option<Converter>,
    /// Initial zoom level (0.25 to 4.0)
    pub initial_zoom: Option<f32>,
    pub insert_mode: Option<bool>,
}

/// Main editor plugin
///
/// # Example
///
/// ```rust,ignore
/// use bevy::prelude::*;
/// use aiv_map_editor::convert::Converter;
/// use aiv_map_editor::EditorPlugin;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(
///         EditorPlugin::new()
///             .with_catalog_dir("assets/catalog")
///             .with_converter(Converter::new("python3").with_args(["-m", "sourcehold"]))
///             .with_initial_zoom(2.0)
///             .with_insert_mode(true)
///     )
///     .run();
/// ```
#[derive(Default)]
pub struct EditorPlugin {
    pub initial_state: EditorStateConfig,
}

impl EditorPlugin {
    /// Create an editor plugin with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory of item records (`<id>.json`)
    pub fn with_catalog_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.initial_state.catalog_dir = Some(path.into());
        self
    }

    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.initial_state.converter = Some(converter);
        self
    }

    /// Set the initial zoom level (0.25 to 4.0, default: 1.0)
    pub fn with_initial_zoom(mut self, zoom: f32) -> Self {
        self.initial_state.initial_zoom = Some(zoom.clamp(tools::MIN_ZOOM, tools::MAX_ZOOM));
        self
    }

    /// Start with insert mode on or off
    pub fn with_insert_mode(mut self, insert_mode: bool) -> Self {
        self.initial_state.insert_mode = Some(insert_mode);
        self
    }
}

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        let preferences = EditorPreferences::load();
        let config = &self.initial_state;

        let catalog_dir = config
            .catalog_dir
            .clone()
            .unwrap_or_else(|| preferences.catalog_dir());
        let catalog = load_catalog(&catalog_dir);

        let converter = config
            .converter
            .clone()
            .unwrap_or_else(|| preferences.converter());
        bevy::log::info!("EditorPlugin: Using converter {:?}", converter.program());

        let mut viewport = preferences.viewport();
        if let Some(zoom) = config.initial_zoom {
            viewport.set_zoom(zoom);
        }
        let mut editor = MapEditor::new(viewport);
        for brush in load_brushes(&preferences.brush_masks) {
            editor.add_brush(brush);
        }

        let mut document = MapDocument::default();
        document
            .handle
            .set_insert_mode(config.insert_mode.unwrap_or(preferences.insert_mode));

        app.add_plugins(MapRenderPlugin)
            .add_plugins(EditorToolsPlugin)
            .insert_resource(EditorState::default())
            .insert_resource(preferences)
            .insert_resource(ItemCatalog(Arc::new(catalog)))
            .insert_resource(MapConverter(converter))
            .insert_resource(document)
            .insert_resource(editor)
            .add_systems(Startup, setup_editor_camera)
            .add_systems(
                Update,
                (
                    handle_keyboard_shortcuts,
                    handle_pending_actions,
                    process_document_updates,
                    update_window_title,
                )
                    .chain(),
            );
    }
}

/// Load the item catalog, logging records that could not be read
pub fn load_catalog(dir: &Path) -> Catalog {
    match Catalog::load_dir(dir) {
        Ok(load) => {
            for (path, e) in &load.skipped {
                bevy::log::warn!("Skipped item record {}: {}", path.display(), e);
            }
            bevy::log::info!(
                "Loaded {} item(s) from {}",
                load.catalog.len(),
                dir.display()
            );
            load.catalog
        }
        Err(e) => {
            bevy::log::warn!(
                "Could not load item catalog from {}: {}. Starting with no items.",
                dir.display(),
                e
            );
            Catalog::new()
        }
    }
}

/// Load the configured mask brushes, logging the ones that could not be read
pub fn load_brushes(paths: &[PathBuf]) -> Vec<Brush> {
    let (brushes, failed) = tools::load_mask_brushes(paths);
    for (path, e) in &failed {
        bevy::log::warn!("Skipped brush mask {}: {}", path.display(), e);
    }
    if !brushes.is_empty() {
        bevy::log::info!("Loaded {} mask brush(es)", brushes.len());
    }
    brushes
}

/// Spawns the editor camera if one doesn't exist
fn setup_editor_camera(mut commands: Commands, camera_query: Query<&Camera2d>) {
    if camera_query.is_empty() {
        commands.spawn(Camera2d);
    }
}

fn update_window_title(document: Res<MapDocument>, mut windows: Query<&mut Window>) {
    let mode = if document.handle.insert_mode() {
        " [insert]"
    } else {
        ""
    };
    let title = format!("AIV Map Editor - {}{}", document.title(), mode);
    for mut window in windows.iter_mut() {
        if window.title != title {
            window.title = title.clone();
        }
    }
}
