//! Strokes - one atomic placement of a single item at many positions

use crate::Item;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A tile-grid coordinate where one copy of the stroke's item is placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeInstance {
    pub x: i32,
    pub y: i32,
}

impl StrokeInstance {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for StrokeInstance {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in tile units, `[x, x + width) x [y, y + height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl TileRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangles with a non-positive side cover nothing
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Exclusive right edge, widened so it cannot overflow
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge, widened so it cannot overflow
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Whether the two rectangles share at least one tile
    pub fn intersects(&self, other: &TileRect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        (self.x as i64) < other.right()
            && (other.x as i64) < self.right()
            && (self.y as i64) < other.bottom()
            && (other.y as i64) < self.bottom()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && (x as i64) < self.right() && y >= self.y && (y as i64) < self.bottom()
    }

    /// Smallest rectangle covering both, saturating at `i32::MAX` per side
    pub fn union(&self, other: &TileRect) -> TileRect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());
        let width = (max_x - min_x as i64).min(i32::MAX as i64) as i32;
        let height = (max_y - min_y as i64).min(i32::MAX as i64) as i32;
        TileRect::new(min_x, min_y, width, height)
    }
}

/// One painting operation: an item plus the positions it was placed at
///
/// Instances never overlap each other. The footprint size is captured from
/// the item when the stroke is created; everything else is read through the
/// shared item reference.
///
/// A stroke is owned by exactly one collection at a time and moves between
/// collections; it is never copied.
#[derive(Debug, PartialEq)]
pub struct Stroke {
    id: Uuid,
    item: Arc<Item>,
    tile_width: i32,
    tile_height: i32,
    instances: Vec<StrokeInstance>,
    pause: bool,
}

impl Stroke {
    /// Create an empty stroke painting `item`
    pub fn new(item: Arc<Item>) -> Self {
        let tile_width = i32::try_from(item.tile_width).unwrap_or(i32::MAX);
        let tile_height = i32::try_from(item.tile_height).unwrap_or(i32::MAX);
        Self {
            id: Uuid::new_v4(),
            item,
            tile_width,
            tile_height,
            instances: Vec::new(),
            pause: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn item(&self) -> &Arc<Item> {
        &self.item
    }

    /// Footprint width captured at creation
    pub fn tile_width(&self) -> i32 {
        self.tile_width
    }

    /// Footprint height captured at creation
    pub fn tile_height(&self) -> i32 {
        self.tile_height
    }

    /// Placed positions, in insertion order
    pub fn instances(&self) -> &[StrokeInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Whether playback pauses after this stroke (AIV `shouldPause`)
    pub fn pause(&self) -> bool {
        self.pause
    }

    pub fn set_pause(&mut self, pause: bool) {
        self.pause = pause;
    }

    /// Area covered by one copy of the item placed at `pos`
    pub fn footprint(&self, pos: StrokeInstance) -> TileRect {
        TileRect::new(pos.x, pos.y, self.tile_width, self.tile_height)
    }

    /// Try to place another copy of the item at `pos`
    ///
    /// Returns `false` and leaves the stroke untouched when the new footprint
    /// overlaps any instance already in the stroke. Drag gestures call this
    /// for every hovered tile, so rejection is routine.
    pub fn add_instance(&mut self, pos: impl Into<StrokeInstance>) -> bool {
        let pos = pos.into();
        let candidate = self.footprint(pos);

        if self
            .instances
            .iter()
            .any(|existing| self.footprint(*existing).intersects(&candidate))
        {
            return false;
        }

        self.instances.push(pos);
        true
    }

    /// Rectangle covering every instance's footprint
    pub fn bounds(&self) -> Option<TileRect> {
        self.instances
            .iter()
            .map(|pos| self.footprint(*pos))
            .reduce(|acc, rect| acc.union(&rect))
    }
}
