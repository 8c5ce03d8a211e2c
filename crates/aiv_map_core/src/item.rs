//! Placeable item definitions
//!
//! Items are immutable once loaded into a [`Catalog`](crate::Catalog) and are
//! shared by reference (`Arc<Item>`) from every stroke that paints them.

use serde::{Deserialize, Serialize};

/// Numeric item type id, as stored in AIV files
pub type ItemId = u32;

/// Broad category of a placeable item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Building,
    Unit,
    Wall,
    Moat,
}

impl ItemKind {
    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemKind::Building => "Building",
            ItemKind::Unit => "Unit",
            ItemKind::Wall => "Wall",
            ItemKind::Moat => "Moat",
        }
    }

    /// All kinds, in section order
    pub fn all() -> &'static [ItemKind] {
        &[
            ItemKind::Building,
            ItemKind::Unit,
            ItemKind::Wall,
            ItemKind::Moat,
        ]
    }
}

/// A catalog entry describing something that can be placed on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: ItemKind,
    /// Footprint width in tiles (at least 1)
    pub tile_width: u32,
    /// Footprint height in tiles (at least 1)
    pub tile_height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_icon_resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_resource: Option<String>,
}

impl Item {
    /// Create a new item. Sizes below one tile are raised to one.
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        kind: ItemKind,
        tile_width: u32,
        tile_height: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            kind,
            tile_width: tile_width.max(1),
            tile_height: tile_height.max(1),
            thumbnail_resource: None,
            section_icon_resource: None,
            tile_resource: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Number of tiles covered by one placement
    pub fn area(&self) -> u32 {
        self.tile_width * self.tile_height
    }

    /// Footprint cells relative to the placement tile, row-major
    pub fn tile_offsets(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.tile_height).flat_map(move |y| (0..self.tile_width).map(move |x| (x, y)))
    }
}
