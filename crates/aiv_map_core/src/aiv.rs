//! AIV interchange document
//!
//! The external converter turns `.aiv` castle files into this JSON shape and
//! back. Each frame is one stroke; tile positions are packed as
//! `y * 100 + x`, which only addresses a 100x100 grid.

use crate::{Catalog, ItemId, Map, Stroke, StrokeInstance};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Side of the grid addressable by a packed tile offset
pub const AIV_GRID_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum InterchangeError {
    ParseError(String),
    InvalidStructure(String),
    SerializeError(String),
}

impl std::fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterchangeError::ParseError(e) => write!(f, "Parse error: {}", e),
            InterchangeError::InvalidStructure(e) => write!(f, "Invalid structure: {}", e),
            InterchangeError::SerializeError(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for InterchangeError {}

/// Pack a tile position into an AIV offset. `None` if it does not fit.
pub fn pack_offset(x: i32, y: i32) -> Option<i32> {
    let size = AIV_GRID_SIZE as i32;
    if (0..size).contains(&x) && (0..size).contains(&y) {
        Some(y * size + x)
    } else {
        None
    }
}

/// Unpack an AIV offset into `(x, y)`. `None` if it is out of range.
pub fn unpack_offset(offset: i32) -> Option<(i32, i32)> {
    let size = AIV_GRID_SIZE as i32;
    if (0..size * size).contains(&offset) {
        Some((offset % size, offset / size))
    } else {
        None
    }
}

/// One placement step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AivFrame {
    /// Kept wide so ids the catalog can never hold still parse and get skipped
    pub item_type: i64,
    // Field name matches the converter's spelling.
    #[serde(rename = "tilePositionOfsets")]
    pub tile_position_offsets: Vec<i32>,
    #[serde(default)]
    pub should_pause: bool,
}

/// The whole intermediate document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AivDocument {
    pub frames: Vec<AivFrame>,
    #[serde(default)]
    pub misc_items: Vec<serde_json::Value>,
    pub pause_delay_amount: i32,
}

/// A map built from an [`AivDocument`]
#[derive(Debug)]
pub struct ImportedMap {
    pub map: Map,
    /// Frames dropped because the catalog has no item with their type id
    pub skipped_frames: usize,
}

/// An [`AivDocument`] taken from a map
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub document: AivDocument,
    /// Instances dropped because they lie outside the packable grid
    pub skipped_instances: usize,
}

impl AivDocument {
    /// Parse and validate converter output
    pub fn from_json(content: &str) -> Result<Self, InterchangeError> {
        let document: AivDocument = serde_json::from_str(content).map_err(|e| {
            if e.is_data() {
                InterchangeError::InvalidStructure(e.to_string())
            } else {
                InterchangeError::ParseError(e.to_string())
            }
        })?;
        document.validate()?;
        Ok(document)
    }

    pub fn to_json_pretty(&self) -> Result<String, InterchangeError> {
        serde_json::to_string_pretty(self).map_err(|e| InterchangeError::SerializeError(e.to_string()))
    }

    /// Check that every packed offset addresses the grid
    pub fn validate(&self) -> Result<(), InterchangeError> {
        for (index, frame) in self.frames.iter().enumerate() {
            if let Some(bad) = frame
                .tile_position_offsets
                .iter()
                .find(|&&offset| unpack_offset(offset).is_none())
            {
                return Err(InterchangeError::InvalidStructure(format!(
                    "frame {} has tile offset {} outside the {}x{} grid",
                    index, bad, AIV_GRID_SIZE, AIV_GRID_SIZE
                )));
            }
        }
        Ok(())
    }

    /// Snapshot a map's committed strokes
    pub fn from_map(map: &Map) -> ExportedDocument {
        let mut skipped_instances = 0;
        let frames = map
            .strokes()
            .iter()
            .map(|stroke| {
                let mut offsets = Vec::with_capacity(stroke.len());
                for pos in stroke.instances() {
                    match pack_offset(pos.x, pos.y) {
                        Some(offset) => offsets.push(offset),
                        None => skipped_instances += 1,
                    }
                }
                AivFrame {
                    item_type: i64::from(stroke.item().id),
                    tile_position_offsets: offsets,
                    should_pause: stroke.pause(),
                }
            })
            .collect();

        ExportedDocument {
            document: AivDocument {
                frames,
                misc_items: Vec::new(),
                pause_delay_amount: map.pause_delay_amount,
            },
            skipped_instances,
        }
    }

    /// Build a map from the document, resolving item ids through `catalog`
    ///
    /// Frames with an unknown or out-of-range item id are skipped. Positions that overlap
    /// earlier ones in the same frame are dropped by [`Stroke::add_instance`].
    pub fn to_map(&self, catalog: &Catalog, name: impl Into<String>) -> ImportedMap {
        let mut map = Map::new(name, AIV_GRID_SIZE, AIV_GRID_SIZE);
        map.pause_delay_amount = self.pause_delay_amount;

        let mut skipped_frames = 0;
        for frame in &self.frames {
            let item = ItemId::try_from(frame.item_type)
                .ok()
                .and_then(|id| catalog.get(id));
            let Some(item) = item else {
                skipped_frames += 1;
                continue;
            };

            let mut stroke = Stroke::new(Arc::clone(item));
            stroke.set_pause(frame.should_pause);
            for (x, y) in frame
                .tile_position_offsets
                .iter()
                .filter_map(|&offset| unpack_offset(offset))
            {
                stroke.add_instance(StrokeInstance::new(x, y));
            }
            map.append_stroke(stroke);
        }

        // A freshly built map has no history to report.
        map.take_changes();

        ImportedMap {
            map,
            skipped_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Item, ItemKind};

    fn catalog() -> Catalog {
        Catalog::from_items([
            Item::new(1, "Wall", ItemKind::Wall, 1, 1),
            Item::new(30, "Granary", ItemKind::Building, 4, 4),
        ])
        .unwrap()
    }

    #[test]
    fn test_offset_packing() {
        assert_eq!(pack_offset(3, 2), Some(203));
        assert_eq!(unpack_offset(203), Some((3, 2)));
        assert_eq!(unpack_offset(9999), Some((99, 99)));
        assert_eq!(pack_offset(100, 0), None);
        assert_eq!(pack_offset(-1, 0), None);
        assert_eq!(unpack_offset(10000), None);
        assert_eq!(unpack_offset(-5), None);
    }

    #[test]
    fn test_import_skips_unknown_items() {
        let json = r#"{
            "frames": [
                {"itemType": 1, "tilePositionOfsets": [0, 1, 102], "shouldPause": false},
                {"itemType": 77, "tilePositionOfsets": [5], "shouldPause": false},
                {"itemType": 30, "tilePositionOfsets": [505], "shouldPause": true}
            ],
            "miscItems": [],
            "pauseDelayAmount": 1000
        }"#;

        let document = AivDocument::from_json(json).unwrap();
        let imported = document.to_map(&catalog(), "castle");

        assert_eq!(imported.skipped_frames, 1);
        let map = &imported.map;
        assert_eq!(map.name, "castle");
        assert_eq!((map.width(), map.height()), (100, 100));
        assert_eq!(map.pause_delay_amount, 1000);
        assert_eq!(map.stroke_count(), 2);
        assert!(!map.has_pending_changes());

        let walls = &map.strokes()[0];
        assert_eq!(
            walls.instances(),
            &[
                StrokeInstance::new(0, 0),
                StrokeInstance::new(1, 0),
                StrokeInstance::new(2, 1)
            ]
        );
        assert!(map.strokes()[1].pause());
        assert_eq!(map.strokes()[1].instances()[0], StrokeInstance::new(5, 5));
    }

    #[test]
    fn test_import_skips_out_of_range_item_ids() {
        let json = r#"{
            "frames": [
                {"itemType": 1, "tilePositionOfsets": [0]},
                {"itemType": -1, "tilePositionOfsets": [1]},
                {"itemType": 5000000000, "tilePositionOfsets": [2]}
            ],
            "pauseDelayAmount": 0
        }"#;

        let imported = AivDocument::from_json(json).unwrap().to_map(&catalog(), "castle");
        assert_eq!(imported.skipped_frames, 2);
        assert_eq!(imported.map.stroke_count(), 1);
        assert_eq!(imported.map.strokes()[0].item().id, 1);
    }

    #[test]
    fn test_export_reverses_import() {
        let json = r#"{"frames": [{"itemType": 1, "tilePositionOfsets": [42, 9901], "shouldPause": true}],
                       "miscItems": [], "pauseDelayAmount": 250}"#;
        let document = AivDocument::from_json(json).unwrap();
        let imported = document.to_map(&catalog(), "castle");

        let exported = AivDocument::from_map(&imported.map);
        assert_eq!(exported.skipped_instances, 0);
        assert_eq!(exported.document, document);
    }

    #[test]
    fn test_export_skips_unpackable_instances() {
        let wall = catalog().get(1).cloned().unwrap();
        let mut map = Map::new("Big", 200, 200);
        let mut stroke = Stroke::new(wall);
        stroke.add_instance((10, 10));
        stroke.add_instance((150, 10));
        map.append_stroke(stroke);

        let exported = AivDocument::from_map(&map);
        assert_eq!(exported.skipped_instances, 1);
        assert_eq!(exported.document.frames[0].tile_position_offsets, vec![1010]);
    }

    #[test]
    fn test_structural_errors() {
        let missing_frames = r#"{"miscItems": [], "pauseDelayAmount": 0}"#;
        assert!(matches!(
            AivDocument::from_json(missing_frames),
            Err(InterchangeError::InvalidStructure(_))
        ));

        let bad_offset = r#"{"frames": [{"itemType": 1, "tilePositionOfsets": [10000]}],
                             "pauseDelayAmount": 0}"#;
        assert!(matches!(
            AivDocument::from_json(bad_offset),
            Err(InterchangeError::InvalidStructure(_))
        ));

        assert!(matches!(
            AivDocument::from_json("{ not json"),
            Err(InterchangeError::ParseError(_))
        ));
    }
}
