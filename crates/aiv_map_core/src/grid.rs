//! Derived item-per-tile grid and its incremental cache

use crate::{Item, Map, Stroke};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Sentinel for a cell no item covers
const EMPTY_CELL: u32 = 0;

/// Width x height grid where each cell holds the item painted there, if any
///
/// Cells store an index into a small palette of the items seen so far
/// (0 = empty), so a cell costs four bytes whatever the item. Palette entries
/// are keyed by item identity, not id, so items from different catalogs that
/// share an id stay distinct.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: u32,
    height: u32,
    cells: Vec<u32>,
    palette: Vec<Arc<Item>>,
    /// Keyed by `Arc` address
    palette_index: HashMap<usize, u32>,
}

impl TileGrid {
    /// Create an empty grid
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![EMPTY_CELL; width as usize * height as usize],
            palette: Vec::new(),
            palette_index: HashMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Item covering the cell, `None` when empty or out of bounds
    pub fn get(&self, x: i32, y: i32) -> Option<&Arc<Item>> {
        let index = self.index(x, y)?;
        match self.cells[index] {
            EMPTY_CELL => None,
            slot => self.palette.get(slot as usize - 1),
        }
    }

    /// Paint every instance of a stroke, overwriting whatever was there.
    /// Footprints are clipped to the grid.
    pub fn stamp(&mut self, stroke: &Stroke) {
        let slot = self.palette_slot(stroke.item());
        for pos in stroke.instances() {
            let rect = stroke.footprint(*pos);
            let min_x = (rect.x as i64).max(0);
            let min_y = (rect.y as i64).max(0);
            let max_x = rect.right().min(self.width as i64);
            let max_y = rect.bottom().min(self.height as i64);

            for y in min_y..max_y {
                let row = y as usize * self.width as usize;
                for x in min_x..max_x {
                    self.cells[row + x as usize] = slot;
                }
            }
        }
    }

    /// Empty every cell
    pub fn clear(&mut self) {
        self.cells.fill(EMPTY_CELL);
        self.palette.clear();
        self.palette_index.clear();
    }

    /// Number of cells covered by some item
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell != EMPTY_CELL).count()
    }

    /// Every covered cell with its item, row-major
    pub fn iter_occupied(&self) -> impl Iterator<Item = (u32, u32, &Arc<Item>)> + '_ {
        let width = self.width.max(1) as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &cell)| cell != EMPTY_CELL)
            .filter_map(move |(index, &cell)| {
                let item = self.palette.get(cell as usize - 1)?;
                Some(((index % width) as u32, (index / width) as u32, item))
            })
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn palette_slot(&mut self, item: &Arc<Item>) -> u32 {
        // The palette holds a clone, so the address is not reused while indexed
        let key = Arc::as_ptr(item) as usize;
        if let Some(&slot) = self.palette_index.get(&key) {
            return slot;
        }
        self.palette.push(Arc::clone(item));
        let slot = self.palette.len() as u32;
        self.palette_index.insert(key, slot);
        slot
    }
}

/// Keeps a [`TileGrid`] in step with a [`Map`]
///
/// When the map has only had strokes appended since the last sync, just the
/// new strokes are stamped. Any other change replays the whole timeline.
#[derive(Debug, Default)]
pub struct RasterCache {
    grid: Option<TileGrid>,
    map_id: Option<Uuid>,
    revision: u64,
    layout_revision: u64,
    synced_strokes: usize,
}

impl RasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the grid up to date with `map` and return it
    pub fn sync(&mut self, map: &Map) -> &TileGrid {
        let needs_rebuild = match &self.grid {
            None => true,
            Some(grid) => {
                self.map_id != Some(map.id)
                    || grid.width() != map.width()
                    || grid.height() != map.height()
                    || self.layout_revision != map.layout_revision()
                    || self.synced_strokes > map.stroke_count()
            }
        };

        if needs_rebuild {
            self.grid = Some(map.rasterize());
        } else if self.revision != map.revision() {
            if let Some(grid) = self.grid.as_mut() {
                for stroke in &map.strokes()[self.synced_strokes..] {
                    grid.stamp(stroke);
                }
            }
        }

        self.map_id = Some(map.id);
        self.revision = map.revision();
        self.layout_revision = map.layout_revision();
        self.synced_strokes = map.stroke_count();

        self.grid.get_or_insert_with(|| map.rasterize())
    }

    /// Current grid without syncing
    pub fn grid(&self) -> Option<&TileGrid> {
        self.grid.as_ref()
    }

    /// Force a full replay on the next sync
    pub fn invalidate(&mut self) {
        self.grid = None;
    }
}
