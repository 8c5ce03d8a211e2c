//! Core data structures for aiv_map_editor
//!
//! This crate provides the data model behind the stroke-based map editor:
//! - `Item` / `Catalog` - Placeable item definitions loaded from JSON records
//! - `Stroke` - One atomic placement of an item at non-overlapping positions
//! - `Map` - A fixed-size map and its committed timeline of strokes
//! - `TileGrid` / `RasterCache` - The item-per-tile grid derived from the strokes
//! - `AivDocument` - The JSON shape exchanged with the external AIV converter

mod aiv;
mod catalog;
mod grid;
mod item;
mod map;
mod stroke;

pub use aiv::{
    pack_offset, unpack_offset, AivDocument, AivFrame, ExportedDocument, ImportedMap,
    InterchangeError, AIV_GRID_SIZE,
};
pub use catalog::{Catalog, CatalogError, CatalogLoad, ItemRecord};
pub use grid::{RasterCache, TileGrid};
pub use item::{Item, ItemId, ItemKind};
pub use map::{Map, StrokesChanged, MAX_MAP_SIZE, MIN_MAP_SIZE};
pub use stroke::{Stroke, StrokeInstance, TileRect};
