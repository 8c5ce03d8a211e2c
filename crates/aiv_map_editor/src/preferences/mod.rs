//! User preferences, persisted between sessions

mod file;

pub use file::*;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::convert::{Converter, DEFAULT_CONVERTER};
use crate::tools::Viewport;

/// Most recent maps remembered
pub const MAX_RECENT_MAPS: usize = 10;

/// A recently opened or saved map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentMap {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct EditorPreferences {
    /// Program run as `<program> convert aiv ...`
    pub converter_program: PathBuf,
    /// Arguments placed before the `convert` subcommand
    pub converter_args: Vec<String>,
    /// Directory of item records. `None` uses `./catalog`.
    pub catalog_dir: Option<PathBuf>,
    /// Start with insert mode on
    pub insert_mode: bool,
    pub zoom: f32,
    /// Pixels between the window edge and the map
    pub border_gap: f32,
    /// On-screen size of one tile at zoom 1.0
    pub tile_pixels: f32,
    pub auto_open_last_map: bool,
    /// Image files loaded as extra mask brushes
    pub brush_masks: Vec<PathBuf>,
    /// Most recent first
    pub recent_maps: Vec<RecentMap>,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            converter_program: PathBuf::from(DEFAULT_CONVERTER),
            converter_args: Vec::new(),
            catalog_dir: None,
            insert_mode: false,
            zoom: viewport.zoom(),
            border_gap: viewport.border_gap,
            tile_pixels: viewport.tile_pixels,
            auto_open_last_map: false,
            brush_masks: Vec::new(),
            recent_maps: Vec::new(),
        }
    }
}

impl EditorPreferences {
    /// Converter described by these preferences
    pub fn converter(&self) -> Converter {
        Converter::new(self.converter_program.clone()).with_args(self.converter_args.clone())
    }

    /// Viewport described by these preferences
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.tile_pixels, self.border_gap, self.zoom)
    }

    /// Catalog directory, falling back to `catalog` in the working directory
    pub fn catalog_dir(&self) -> PathBuf {
        self.catalog_dir.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .map(|dir| dir.join("catalog"))
                .unwrap_or_else(|_| PathBuf::from("catalog"))
        })
    }

    /// Move a map to the front of the recent list
    pub fn add_recent_map(&mut self, path: PathBuf, name: String) {
        let path = path.to_string_lossy().to_string();
        self.recent_maps.retain(|recent| recent.path != path);
        self.recent_maps.insert(0, RecentMap { path, name });
        self.recent_maps.truncate(MAX_RECENT_MAPS);
    }

    pub fn remove_recent_map(&mut self, path: &str) {
        self.recent_maps.retain(|recent| recent.path != path);
    }

    pub fn clear_recent_maps(&mut self) {
        self.recent_maps.clear();
    }

    pub fn last_map(&self) -> Option<&RecentMap> {
        self.recent_maps.first()
    }
}
