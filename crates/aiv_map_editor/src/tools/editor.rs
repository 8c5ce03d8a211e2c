//! Gesture-to-stroke translation
//!
//! A drag gesture with the left button builds one [`Stroke`]: every tile the
//! pointer crosses is expanded through the current brush and fed to
//! [`Stroke::add_instance`]. Releasing the button commits the stroke through
//! the [`MapHandle`]; cancelling throws it away.

use aiv_map_core::{Item, Map, Stroke};
use bevy::math::Vec2;
use bevy::prelude::Resource;
use std::sync::Arc;

use super::brush::{Brush, Brushable};
use super::viewport::Viewport;
use crate::history::MapHandle;

/// Brush engine state: selection, viewport, hover and the stroke being drawn
#[derive(Debug, Default, Resource)]
pub struct MapEditor {
    pub viewport: Viewport,
    selected_item: Option<Arc<Item>>,
    brush: Brush,
    /// Brushes waiting their turn, in cycling order
    spare_brushes: Vec<Brush>,
    stroke: Option<Stroke>,
    hovered: Option<(i32, i32)>,
    /// Last tile fed to the stroke, for filling gaps in fast drags
    last_tile: Option<(i32, i32)>,
}

impl MapEditor {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    pub fn selected_item(&self) -> Option<&Arc<Item>> {
        self.selected_item.as_ref()
    }

    /// Choose the item new strokes paint. A stroke already in progress keeps
    /// its item.
    pub fn select_item(&mut self, item: Option<Arc<Item>>) {
        self.selected_item = item;
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    pub fn brush_mut(&mut self) -> &mut Brush {
        &mut self.brush
    }

    /// Make another brush available to [`MapEditor::next_brush`]
    pub fn add_brush(&mut self, brush: Brush) {
        self.spare_brushes.push(brush);
    }

    /// Every brush the editor can cycle through, the current one first
    pub fn brush_count(&self) -> usize {
        1 + self.spare_brushes.len()
    }

    /// Switch to the next brush. The current one, with its adjustment, goes
    /// to the back of the queue. Returns `false` when there is only one brush.
    pub fn next_brush(&mut self) -> bool {
        if self.spare_brushes.is_empty() {
            return false;
        }
        let next = self.spare_brushes.remove(0);
        let current = std::mem::replace(&mut self.brush, next);
        self.spare_brushes.push(current);
        true
    }

    /// Tile under the pointer, `None` when it is off the map
    pub fn hovered_tile(&self) -> Option<(i32, i32)> {
        self.hovered
    }

    /// The stroke being drawn, if any
    pub fn in_progress(&self) -> Option<&Stroke> {
        self.stroke.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    /// Track the pointer without drawing
    pub fn pointer_moved(&mut self, pointer: Vec2, map: &Map) {
        self.hovered = self
            .viewport
            .screen_to_tile(pointer, map.width(), map.height());
    }

    /// Pointer left the viewport
    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    /// Start a stroke at the pointer. Ignored when no item is selected.
    pub fn begin(&mut self, pointer: Vec2, map: &Map) -> bool {
        self.pointer_moved(pointer, map);

        let Some(item) = self.selected_item.clone() else {
            return false;
        };

        self.stroke = Some(Stroke::new(item));
        self.last_tile = None;
        if let Some(tile) = self.hovered {
            self.paint_at(tile, map);
            self.last_tile = Some(tile);
        }
        true
    }

    /// Continue the stroke to the pointer's tile
    pub fn update(&mut self, pointer: Vec2, map: &Map) {
        self.pointer_moved(pointer, map);
        if self.stroke.is_none() {
            return;
        }
        let Some(tile) = self.hovered else {
            return;
        };
        if self.last_tile == Some(tile) {
            return;
        }

        let from = self.last_tile.unwrap_or(tile);
        for step in LineTiles::new(from, tile) {
            if map.contains(step.0, step.1) {
                self.paint_at(step, map);
            }
        }
        self.last_tile = Some(tile);
    }

    /// Finish the stroke and commit it. Returns whether anything was committed.
    ///
    /// Strokes that never received an instance are dropped.
    pub fn end(&mut self, handle: &mut MapHandle) -> bool {
        self.last_tile = None;
        let Some(stroke) = self.stroke.take() else {
            return false;
        };
        if stroke.is_empty() {
            return false;
        }
        handle.append_stroke(stroke).is_ok()
    }

    /// Abandon the stroke in progress
    pub fn cancel(&mut self) -> bool {
        self.last_tile = None;
        self.stroke.take().is_some()
    }

    fn paint_at(&mut self, tile: (i32, i32), map: &Map) {
        let Some(stroke) = self.stroke.as_mut() else {
            return;
        };
        let step_x = stroke.tile_width();
        let step_y = stroke.tile_height();
        for (dx, dy) in self.brush.mask().offsets() {
            // Offsets that leave the i32 range are off the map anyway
            let x = dx.checked_mul(step_x).and_then(|dx| tile.0.checked_add(dx));
            let y = dy.checked_mul(step_y).and_then(|dy| tile.1.checked_add(dy));
            if let (Some(x), Some(y)) = (x, y) {
                if map.contains(x, y) {
                    stroke.add_instance((x, y));
                }
            }
        }
    }
}

/// Tiles visited walking a grid line from `from` to `to`, both inclusive
struct LineTiles {
    current: (i32, i32),
    end: (i32, i32),
    delta: (i32, i32),
    step: (i32, i32),
    err: i32,
    done: bool,
}

impl LineTiles {
    fn new(from: (i32, i32), to: (i32, i32)) -> Self {
        let delta = ((to.0 - from.0).abs(), -(to.1 - from.1).abs());
        Self {
            current: from,
            end: to,
            delta,
            step: ((to.0 - from.0).signum(), (to.1 - from.1).signum()),
            err: delta.0 + delta.1,
            done: false,
        }
    }
}

impl Iterator for LineTiles {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        if self.done {
            return None;
        }
        let tile = self.current;
        if tile == self.end {
            self.done = true;
            return Some(tile);
        }

        let doubled = 2 * self.err;
        if doubled >= self.delta.1 {
            self.err += self.delta.1;
            self.current.0 += self.step.0;
        }
        if doubled <= self.delta.0 {
            self.err += self.delta.0;
            self.current.1 += self.step.1;
        }
        Some(tile)
    }
}
