//! Map - a fixed-size tile grid plus the ordered strokes committed to it

use crate::{Stroke, TileGrid};
use std::ops::Range;
use uuid::Uuid;

/// Smallest allowed map side, in tiles
pub const MIN_MAP_SIZE: u32 = 16;
/// Largest allowed map side, in tiles
pub const MAX_MAP_SIZE: u32 = 16384;

/// Record of one change to a map's stroke sequence
///
/// `removed` strokes starting at `position` were replaced by `added` new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokesChanged {
    pub position: usize,
    pub removed: usize,
    pub added: usize,
}

/// A map and its committed timeline of strokes
///
/// The strokes are the source of truth for what is painted; the tile grid is
/// derived from them by [`Map::rasterize`]. Every mutation is recorded as a
/// [`StrokesChanged`] until someone drains it with [`Map::take_changes`].
#[derive(Debug)]
pub struct Map {
    pub id: Uuid,
    pub name: String,
    width: u32,
    height: u32,
    /// AIV `pauseDelayAmount`, carried through import/export untouched
    pub pause_delay_amount: i32,
    strokes: Vec<Stroke>,
    changes: Vec<StrokesChanged>,
    revision: u64,
    layout_revision: u64,
}

impl Map {
    /// Create a new empty map. Sides are clamped to
    /// [`MIN_MAP_SIZE`]..=[`MAX_MAP_SIZE`].
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            width: width.clamp(MIN_MAP_SIZE, MAX_MAP_SIZE),
            height: height.clamp(MIN_MAP_SIZE, MAX_MAP_SIZE),
            pause_delay_amount: 0,
            strokes: Vec::new(),
            changes: Vec::new(),
            revision: 0,
            layout_revision: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether a tile coordinate lies on the map
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Committed strokes, in commit order
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// Bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bumped on every mutation other than a pure append
    pub fn layout_revision(&self) -> u64 {
        self.layout_revision
    }

    /// Commit a finished stroke to the end of the timeline
    pub fn append_stroke(&mut self, stroke: Stroke) {
        let position = self.strokes.len();
        self.strokes.push(stroke);
        self.record(StrokesChanged {
            position,
            removed: 0,
            added: 1,
        });
    }

    /// Insert strokes at `at` (clamped to the current length), keeping order
    pub fn insert_strokes(&mut self, at: usize, strokes: impl IntoIterator<Item = Stroke>) {
        let at = at.min(self.strokes.len());
        let before = self.strokes.len();
        self.strokes.splice(at..at, strokes);
        let added = self.strokes.len() - before;
        self.record(StrokesChanged {
            position: at,
            removed: 0,
            added,
        });
    }

    /// Remove and return the strokes in `range` (clamped to the current length)
    pub fn remove_strokes(&mut self, range: Range<usize>) -> Vec<Stroke> {
        let end = range.end.min(self.strokes.len());
        let start = range.start.min(end);
        let removed: Vec<Stroke> = self.strokes.drain(start..end).collect();
        self.record(StrokesChanged {
            position: start,
            removed: removed.len(),
            added: 0,
        });
        removed
    }

    /// Remove every stroke
    pub fn clear_strokes(&mut self) -> Vec<Stroke> {
        self.remove_strokes(0..self.strokes.len())
    }

    /// Drain the change records accumulated since the last call
    pub fn take_changes(&mut self) -> Vec<StrokesChanged> {
        std::mem::take(&mut self.changes)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Replay every stroke in commit order onto a fresh grid
    pub fn rasterize(&self) -> TileGrid {
        let mut grid = TileGrid::new(self.width, self.height);
        for stroke in &self.strokes {
            grid.stamp(stroke);
        }
        grid
    }

    fn record(&mut self, change: StrokesChanged) {
        if change.removed == 0 && change.added == 0 {
            return;
        }
        self.revision += 1;
        let is_append = change.removed == 0 && change.position + change.added == self.strokes.len();
        if !is_append {
            self.layout_revision += 1;
        }
        self.changes.push(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Item, ItemKind};
    use std::sync::Arc;

    fn stroke_at(item: &Arc<Item>, x: i32, y: i32) -> Stroke {
        let mut stroke = Stroke::new(Arc::clone(item));
        stroke.add_instance((x, y));
        stroke
    }

    #[test]
    fn test_new_map_clamps_size() {
        let map = Map::new("Tiny", 4, 20000);
        assert_eq!(map.width(), MIN_MAP_SIZE);
        assert_eq!(map.height(), MAX_MAP_SIZE);
        assert_eq!(map.stroke_count(), 0);
    }

    #[test]
    fn test_contains() {
        let map = Map::new("Test", 16, 32);
        assert!(map.contains(0, 0));
        assert!(map.contains(15, 31));
        assert!(!map.contains(16, 0));
        assert!(!map.contains(-1, 4));
    }

    #[test]
    fn test_change_records() {
        let item = Arc::new(Item::new(1, "Wall", ItemKind::Wall, 1, 1));
        let mut map = Map::new("Test", 16, 16);

        map.append_stroke(stroke_at(&item, 0, 0));
        map.append_stroke(stroke_at(&item, 1, 0));
        assert_eq!(map.layout_revision(), 0);
        assert_eq!(map.revision(), 2);

        let removed = map.remove_strokes(1..5);
        assert_eq!(removed.len(), 1);
        assert_eq!(map.layout_revision(), 1);

        map.insert_strokes(0, removed);
        assert_eq!(map.layout_revision(), 2);

        assert_eq!(
            map.take_changes(),
            vec![
                StrokesChanged {
                    position: 0,
                    removed: 0,
                    added: 1
                },
                StrokesChanged {
                    position: 1,
                    removed: 0,
                    added: 1
                },
                StrokesChanged {
                    position: 1,
                    removed: 1,
                    added: 0
                },
                StrokesChanged {
                    position: 0,
                    removed: 0,
                    added: 1
                },
            ]
        );
        assert!(!map.has_pending_changes());
        assert_eq!(map.strokes()[0].instances()[0].x, 1);
    }

    #[test]
    fn test_empty_mutations_not_recorded() {
        let mut map = Map::new("Test", 16, 16);
        map.clear_strokes();
        map.insert_strokes(3, std::iter::empty());
        assert!(!map.has_pending_changes());
        assert_eq!(map.revision(), 0);
    }

    #[test]
    fn test_rasterize_later_stroke_wins() {
        let a = Arc::new(Item::new(1, "A", ItemKind::Building, 1, 1));
        let b = Arc::new(Item::new(2, "B", ItemKind::Building, 1, 1));
        let mut map = Map::new("Test", 4, 4);
        map.append_stroke(stroke_at(&a, 0, 0));
        map.append_stroke(stroke_at(&b, 0, 0));

        let grid = map.rasterize();
        assert_eq!(grid.get(0, 0).map(|item| item.id), Some(2));
        for y in 0..grid.height() as i32 {
            for x in 0..grid.width() as i32 {
                if (x, y) != (0, 0) {
                    assert!(grid.get(x, y).is_none());
                }
            }
        }
        assert_eq!(grid.occupied_count(), 1);
    }
}
