//! Item catalog loaded from a directory of JSON records
//!
//! Each record lives in `<item-id>.json` and holds exactly the recognized
//! keys below. A record that fails to parse is skipped; the loader reports it
//! back so the caller can log it, and keeps going.
//!
//! ```json
//! {
//!     "name": "Granary",
//!     "description": "Stores food",
//!     "kind": "building",
//!     "tile-width": 4,
//!     "tile-height": 4,
//!     "thumbnail-resource": "thumbnails/granary.png"
//! }
//! ```

use crate::{Item, ItemId, ItemKind, MAX_MAP_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const RECORD_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    IoError(String),
    ParseError(String),
    InvalidRecord(String),
    DuplicateId(ItemId),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::IoError(e) => write!(f, "IO error: {}", e),
            CatalogError::ParseError(e) => write!(f, "Parse error: {}", e),
            CatalogError::InvalidRecord(e) => write!(f, "Invalid record: {}", e),
            CatalogError::DuplicateId(id) => write!(f, "Duplicate item id: {}", id),
        }
    }
}

impl std::error::Error for CatalogError {}

/// On-disk item definition record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ItemRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_icon_resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_resource: Option<String>,
    pub kind: ItemKind,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl ItemRecord {
    /// Validate the record and turn it into an item with the given id
    pub fn into_item(self, id: ItemId) -> Result<Item, CatalogError> {
        if self.tile_width < 1 || self.tile_height < 1 {
            return Err(CatalogError::InvalidRecord(format!(
                "'{}' has a tile size of {}x{}, both sides must be at least 1",
                self.name, self.tile_width, self.tile_height
            )));
        }
        if self.tile_width > MAX_MAP_SIZE || self.tile_height > MAX_MAP_SIZE {
            return Err(CatalogError::InvalidRecord(format!(
                "'{}' has a tile size of {}x{}, larger than any map ({})",
                self.name, self.tile_width, self.tile_height, MAX_MAP_SIZE
            )));
        }

        Ok(Item {
            id,
            name: self.name,
            description: self.description,
            kind: self.kind,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            thumbnail_resource: self.thumbnail_resource,
            section_icon_resource: self.section_icon_resource,
            tile_resource: self.tile_resource,
        })
    }
}

/// Result of loading a catalog directory
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub catalog: Catalog,
    /// Records that were skipped, with the reason
    pub skipped: Vec<(PathBuf, CatalogError)>,
}

/// Registry of every placeable item, keyed by numeric id
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: BTreeMap<ItemId, Arc<Item>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from items, rejecting duplicate ids
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for item in items {
            catalog.insert(item)?;
        }
        Ok(catalog)
    }

    /// Add an item. Fails if another item already uses its id.
    pub fn insert(&mut self, item: Item) -> Result<Arc<Item>, CatalogError> {
        if self.items.contains_key(&item.id) {
            return Err(CatalogError::DuplicateId(item.id));
        }
        let item = Arc::new(item);
        self.items.insert(item.id, Arc::clone(&item));
        Ok(item)
    }

    /// Get an item by numeric id
    pub fn get(&self, id: ItemId) -> Option<&Arc<Item>> {
        self.items.get(&id)
    }

    /// All items in id order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Item>> {
        self.items.values()
    }

    /// Items of one kind, in id order
    pub fn of_kind(&self, kind: ItemKind) -> impl Iterator<Item = &Arc<Item>> {
        self.items.values().filter(move |item| item.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parse a single record's content
    pub fn parse_record(id: ItemId, content: &str) -> Result<Item, CatalogError> {
        let record: ItemRecord = serde_json::from_str(content)
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;
        record.into_item(id)
    }

    /// Load every `<id>.json` record in a directory
    ///
    /// Only a missing or unreadable directory is an error. Individual
    /// records that fail are collected in [`CatalogLoad::skipped`].
    pub fn load_dir(dir: &Path) -> Result<CatalogLoad, CatalogError> {
        let entries =
            std::fs::read_dir(dir).map_err(|e| CatalogError::IoError(format!("{:?}: {}", dir, e)))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
            })
            .collect();
        paths.sort();

        let mut load = CatalogLoad::default();
        for path in paths {
            match Self::load_record(&path) {
                Ok(item) => {
                    if let Err(e) = load.catalog.insert(item) {
                        load.skipped.push((path, e));
                    }
                }
                Err(e) => load.skipped.push((path, e)),
            }
        }

        Ok(load)
    }

    fn load_record(path: &Path) -> Result<Item, CatalogError> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let id: ItemId = stem.parse().map_err(|_| {
            CatalogError::InvalidRecord(format!("file name '{}' is not a numeric item id", stem))
        })?;

        let content =
            std::fs::read_to_string(path).map_err(|e| CatalogError::IoError(e.to_string()))?;
        Self::parse_record(id, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("aiv_catalog_{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_record() {
        let item = Catalog::parse_record(
            30,
            r#"{"name": "Granary", "kind": "building", "tile-width": 4, "tile-height": 3,
                "tile-resource": "tiles/granary.png"}"#,
        )
        .unwrap();

        assert_eq!(item.id, 30);
        assert_eq!(item.name, "Granary");
        assert_eq!(item.kind, ItemKind::Building);
        assert_eq!((item.tile_width, item.tile_height), (4, 3));
        assert_eq!(item.tile_resource.as_deref(), Some("tiles/granary.png"));
        assert!(item.description.is_empty());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Catalog::parse_record(
            1,
            r#"{"name": "Wall", "kind": "wall", "tile-width": 1, "tile-height": 1, "colour": "red"}"#,
        );
        assert!(matches!(result, Err(CatalogError::ParseError(_))));
    }

    #[test]
    fn test_zero_size_rejected() {
        let result = Catalog::parse_record(
            1,
            r#"{"name": "Wall", "kind": "wall", "tile-width": 0, "tile-height": 1}"#,
        );
        assert!(matches!(result, Err(CatalogError::InvalidRecord(_))));
    }

    #[test]
    fn test_oversized_record_rejected() {
        let result = Catalog::parse_record(
            1,
            r#"{"name": "Keep", "kind": "building", "tile-width": 3000000000, "tile-height": 2}"#,
        );
        assert!(matches!(result, Err(CatalogError::InvalidRecord(_))));

        let largest = format!(
            r#"{{"name": "Lake", "kind": "moat", "tile-width": {0}, "tile-height": {0}}}"#,
            MAX_MAP_SIZE
        );
        assert!(Catalog::parse_record(2, &largest).is_ok());
    }

    #[test]
    fn test_duplicate_id() {
        let mut catalog = Catalog::new();
        catalog
            .insert(Item::new(5, "Pikeman", ItemKind::Unit, 1, 1))
            .unwrap();
        let result = catalog.insert(Item::new(5, "Archer", ItemKind::Unit, 1, 1));
        assert_eq!(result.unwrap_err(), CatalogError::DuplicateId(5));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_of_kind_and_order() {
        let catalog = Catalog::from_items([
            Item::new(9, "Moat", ItemKind::Moat, 1, 1),
            Item::new(2, "Wall", ItemKind::Wall, 1, 1),
            Item::new(4, "Tower", ItemKind::Wall, 3, 3),
        ])
        .unwrap();

        let ids: Vec<_> = catalog.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![2, 4, 9]);

        let walls: Vec<_> = catalog.of_kind(ItemKind::Wall).map(|i| i.id).collect();
        assert_eq!(walls, vec![2, 4]);
    }

    #[test]
    fn test_load_dir_skips_bad_records() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("1.json"),
            r#"{"name": "Wall", "kind": "wall", "tile-width": 1, "tile-height": 1}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("2.json"),
            r#"{"name": "Keep", "kind": "castle", "tile-width": 7, "tile-height": 7}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("tower.json"),
            r#"{"name": "Tower", "kind": "wall", "tile-width": 3, "tile-height": 3}"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "not a record").unwrap();

        let load = Catalog::load_dir(&dir).unwrap();
        assert_eq!(load.catalog.len(), 1);
        assert!(load.catalog.get(1).is_some());
        assert_eq!(load.skipped.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = std::env::temp_dir().join("aiv_catalog_does_not_exist_4f1c");
        assert!(matches!(
            Catalog::load_dir(&dir),
            Err(CatalogError::IoError(_))
        ));
    }
}
