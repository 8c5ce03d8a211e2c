//! Stroke history - a movable cursor over a map's timeline
//!
//! Instead of an undo stack of inverse commands, the handle splits the
//! timeline in two: the strokes committed to the map (the *active* part) and a
//! *memory* of strokes taken back off it. Moving the cursor backward moves
//! strokes from the end of the map to the front of memory; moving it forward
//! moves them back. Nothing is lost until a new edit overwrites the future.
//!
//! ```text
//!  map strokes          memory
//! [s0 s1 s2 s3] | [s4 s5]
//!               ^ cursor = 4
//! ```

use aiv_map_core::{Map, Stroke};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};

/// Notification sent to subscribers of a [`MapHandle`]
///
/// Positions are indices into the merged timeline (active strokes followed by
/// memory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A map was attached; its strokes are all active
    Attached { strokes: usize },
    /// The map was detached and memory discarded
    Detached,
    /// The cursor moved
    CursorMoved { from: usize, to: usize },
    /// Strokes were removed from and/or added to the merged timeline
    TimelineChanged {
        position: usize,
        removed: usize,
        added: usize,
    },
}

/// Owns a map and the redo memory split off its timeline
///
/// The cursor always equals the number of active strokes, and lies in
/// `0..=strokes + memory`. Every mutation of the map goes through the handle
/// (see [`MapHandle::edit`]) so it can observe the change afterwards.
#[derive(Debug, Default)]
pub struct MapHandle {
    map: Option<Map>,
    memory: VecDeque<Stroke>,
    cursor: usize,
    insert_mode: bool,
    subscribers: Vec<Sender<HistoryEvent>>,
}

impl MapHandle {
    /// Create a handle with no map attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle attached to `map`
    pub fn with_map(map: Map) -> Self {
        let mut handle = Self::new();
        handle.attach(map);
        handle
    }

    /// Attach a new map, returning the previous one
    ///
    /// Memory is discarded and the cursor placed after the map's last stroke.
    pub fn attach(&mut self, mut map: Map) -> Option<Map> {
        let previous = self.release();

        map.take_changes();
        self.cursor = map.stroke_count();
        self.map = Some(map);

        self.notify(HistoryEvent::Attached {
            strokes: self.cursor,
        });
        previous
    }

    /// Detach the current map, discarding memory
    pub fn detach(&mut self) -> Option<Map> {
        let map = self.release();
        if map.is_some() {
            self.notify(HistoryEvent::Detached);
        }
        map
    }

    pub fn is_attached(&self) -> bool {
        self.map.is_some()
    }

    pub fn map(&self) -> Option<&Map> {
        self.map.as_ref()
    }

    /// Current cursor position
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of strokes committed to the map
    pub fn stroke_count(&self) -> usize {
        self.map.as_ref().map_or(0, Map::stroke_count)
    }

    /// Number of strokes held in memory
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Length of the merged timeline
    pub fn timeline_len(&self) -> usize {
        self.stroke_count() + self.memory.len()
    }

    /// Strokes currently on the map
    pub fn active(&self) -> &[Stroke] {
        match &self.map {
            Some(map) => map.strokes(),
            None => &[],
        }
    }

    /// Strokes held back for redo, next one first
    pub fn memory(&self) -> impl Iterator<Item = &Stroke> {
        self.memory.iter()
    }

    /// Active strokes followed by memory
    pub fn timeline(&self) -> impl Iterator<Item = &Stroke> {
        self.active().iter().chain(self.memory.iter())
    }

    /// Stroke at a merged-timeline index
    pub fn timeline_get(&self, index: usize) -> Option<&Stroke> {
        let active = self.active();
        match active.get(index) {
            Some(stroke) => Some(stroke),
            None => self.memory.get(index - active.len()),
        }
    }

    pub fn insert_mode(&self) -> bool {
        self.insert_mode
    }

    /// When set, new strokes no longer discard memory
    pub fn set_insert_mode(&mut self, insert_mode: bool) {
        self.insert_mode = insert_mode;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.memory.is_empty()
    }

    /// Receive every future [`HistoryEvent`]
    pub fn subscribe(&mut self) -> Receiver<HistoryEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Move the cursor, clamped to `0..=strokes + memory`
    ///
    /// Moving back takes strokes off the end of the map and puts them, in
    /// order, at the front of memory. Moving forward does the reverse.
    pub fn set_cursor(&mut self, new_cursor: i64) {
        self.sync();

        let Some(map) = self.map.as_mut() else {
            return;
        };

        let total = i64::try_from(map.stroke_count() + self.memory.len()).unwrap_or(i64::MAX);
        let new_cursor = new_cursor.clamp(0, total) as usize;
        let old_cursor = self.cursor;
        if new_cursor == old_cursor {
            return;
        }

        if new_cursor < old_cursor {
            let moved = map.remove_strokes(new_cursor..old_cursor);
            for stroke in moved.into_iter().rev() {
                self.memory.push_front(stroke);
            }
        } else {
            let moved: Vec<Stroke> = self.memory.drain(..new_cursor - old_cursor).collect();
            map.insert_strokes(old_cursor, moved);
        }

        // Our own splice; observation must not treat it as an edit.
        map.take_changes();

        self.cursor = new_cursor;
        self.notify(HistoryEvent::CursorMoved {
            from: old_cursor,
            to: new_cursor,
        });
    }

    /// Step the cursor back by one. Returns whether it moved.
    pub fn undo(&mut self) -> bool {
        let before = self.cursor;
        self.set_cursor(before as i64 - 1);
        self.cursor != before
    }

    /// Step the cursor forward by one. Returns whether it moved.
    pub fn redo(&mut self) -> bool {
        let before = self.cursor;
        self.set_cursor(before as i64 + 1);
        self.cursor != before
    }

    /// Mutate the map, then observe the change
    ///
    /// Returns `None` without calling `f` when no map is attached.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Map) -> R) -> Option<R> {
        let map = self.map.as_mut()?;
        let result = f(map);
        self.sync();
        Some(result)
    }

    /// Commit a finished stroke. Gives the stroke back when no map is attached.
    pub fn append_stroke(&mut self, stroke: Stroke) -> Result<(), Stroke> {
        if self.map.is_none() {
            return Err(stroke);
        }
        self.edit(move |map| map.append_stroke(stroke));
        Ok(())
    }

    /// Discard every stroke, active and in memory
    pub fn clear(&mut self) {
        if self.map.is_none() {
            return;
        }
        self.discard_memory();
        self.edit(|map| {
            map.clear_strokes();
        });
    }

    /// React to changes made to the map from outside the handle
    fn sync(&mut self) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        let changes = map.take_changes();
        if changes.is_empty() {
            return;
        }
        let stroke_count = map.stroke_count();

        let mut added = 0;
        for change in changes {
            added += change.added;
            self.notify(HistoryEvent::TimelineChanged {
                position: change.position,
                removed: change.removed,
                added: change.added,
            });
        }

        if !self.insert_mode && added > 0 {
            self.discard_memory();
        }

        let old_cursor = self.cursor;
        self.cursor = stroke_count;
        if old_cursor != self.cursor {
            self.notify(HistoryEvent::CursorMoved {
                from: old_cursor,
                to: self.cursor,
            });
        }
    }

    fn discard_memory(&mut self) {
        if self.memory.is_empty() {
            return;
        }
        let removed = self.memory.len();
        self.memory.clear();
        self.notify(HistoryEvent::TimelineChanged {
            position: self.stroke_count(),
            removed,
            added: 0,
        });
    }

    fn release(&mut self) -> Option<Map> {
        self.memory.clear();
        self.cursor = 0;
        self.map.take()
    }

    fn notify(&mut self, event: HistoryEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiv_map_core::{Item, ItemKind};
    use std::sync::Arc;
    use uuid::Uuid;

    fn wall() -> Arc<Item> {
        Arc::new(Item::new(1, "Wall", ItemKind::Wall, 1, 1))
    }

    fn stroke_at(item: &Arc<Item>, x: i32) -> Stroke {
        let mut stroke = Stroke::new(Arc::clone(item));
        stroke.add_instance((x, 0));
        stroke
    }

    /// Map with `count` single-instance strokes
    fn handle_with_strokes(count: usize) -> MapHandle {
        let item = wall();
        let mut map = Map::new("Test", 32, 32);
        for x in 0..count {
            map.append_stroke(stroke_at(&item, x as i32));
        }
        MapHandle::with_map(map)
    }

    fn active_ids(handle: &MapHandle) -> Vec<Uuid> {
        handle.active().iter().map(Stroke::id).collect()
    }

    fn timeline_ids(handle: &MapHandle) -> Vec<Uuid> {
        handle.timeline().map(Stroke::id).collect()
    }

    #[test]
    fn test_attach_places_cursor_at_end() {
        let handle = handle_with_strokes(3);
        assert_eq!(handle.cursor(), 3);
        assert_eq!(handle.memory_len(), 0);
        assert!(handle.can_undo());
        assert!(!handle.can_redo());
    }

    #[test]
    fn test_detached_handle_is_inert() {
        let mut handle = MapHandle::new();
        handle.set_cursor(5);
        assert_eq!(handle.cursor(), 0);
        assert!(!handle.undo());
        assert!(handle.append_stroke(stroke_at(&wall(), 0)).is_err());
        assert!(handle.edit(|map| map.stroke_count()).is_none());
    }

    #[test]
    fn test_move_back_then_restore() {
        for k in 0..=4 {
            let mut handle = handle_with_strokes(4);
            let original = active_ids(&handle);

            handle.set_cursor(k);
            assert_eq!(handle.cursor(), k as usize);
            assert_eq!(handle.stroke_count(), k as usize);
            assert_eq!(handle.memory_len(), 4 - k as usize);

            handle.set_cursor(4);
            assert_eq!(active_ids(&handle), original);
            assert_eq!(handle.memory_len(), 0);
        }
    }

    #[test]
    fn test_back_and_forth_preserves_timeline() {
        let mut handle = handle_with_strokes(6);
        handle.set_cursor(4);
        let merged = timeline_ids(&handle);

        for d in 0..=4 {
            handle.set_cursor(4 - d);
            assert_eq!(timeline_ids(&handle), merged);
            handle.set_cursor(4);
            assert_eq!(timeline_ids(&handle), merged);
            assert_eq!(handle.stroke_count(), 4);
            assert_eq!(handle.memory_len(), 2);
        }
    }

    #[test]
    fn test_memory_order() {
        let mut handle = handle_with_strokes(4);
        let ids = active_ids(&handle);

        handle.set_cursor(3);
        handle.set_cursor(1);
        let memory: Vec<_> = handle.memory().map(Stroke::id).collect();
        assert_eq!(memory, ids[1..].to_vec());

        assert!(handle.redo());
        assert_eq!(active_ids(&handle), ids[..2].to_vec());
        assert_eq!(handle.timeline_get(3).map(Stroke::id), Some(ids[3]));
        assert!(handle.timeline_get(4).is_none());
    }

    #[test]
    fn test_set_cursor_clamps() {
        let mut handle = handle_with_strokes(3);
        handle.set_cursor(1);

        handle.set_cursor(100);
        assert_eq!(handle.cursor(), 3);

        handle.set_cursor(-7);
        assert_eq!(handle.cursor(), 0);
        assert_eq!(handle.memory_len(), 3);
    }

    #[test]
    fn test_new_stroke_discards_memory() {
        let item = wall();
        let mut handle = handle_with_strokes(3);
        handle.set_cursor(1);
        assert_eq!(handle.memory_len(), 2);

        handle.append_stroke(stroke_at(&item, 10)).unwrap();
        assert_eq!(handle.memory_len(), 0);
        assert_eq!(handle.stroke_count(), 2);
        assert_eq!(handle.cursor(), 2);
        assert!(!handle.can_redo());
    }

    #[test]
    fn test_insert_mode_keeps_memory() {
        let item = wall();
        let mut handle = handle_with_strokes(3);
        handle.set_cursor(1);
        let memory: Vec<_> = handle.memory().map(Stroke::id).collect();

        handle.set_insert_mode(true);
        handle.append_stroke(stroke_at(&item, 10)).unwrap();

        assert_eq!(handle.memory().map(Stroke::id).collect::<Vec<_>>(), memory);
        assert_eq!(handle.stroke_count(), 2);
        assert_eq!(handle.cursor(), 2);
        assert_eq!(handle.timeline_len(), 4);
    }

    #[test]
    fn test_external_removal_keeps_memory() {
        let mut handle = handle_with_strokes(3);
        handle.set_cursor(2);

        handle.edit(|map| map.remove_strokes(0..1));
        assert_eq!(handle.memory_len(), 1);
        assert_eq!(handle.cursor(), 1);
    }

    #[test]
    fn test_cursor_moves_do_not_clear_memory() {
        let mut handle = handle_with_strokes(5);
        handle.set_cursor(0);
        handle.set_cursor(2);
        handle.set_cursor(1);
        assert_eq!(handle.memory_len(), 4);
        assert_eq!(handle.timeline_len(), 5);
    }

    #[test]
    fn test_notifications() {
        let mut handle = handle_with_strokes(2);
        let rx = handle.subscribe();

        handle.set_cursor(2);
        assert!(rx.try_recv().is_err());

        handle.set_cursor(0);
        assert_eq!(
            rx.try_recv().unwrap(),
            HistoryEvent::CursorMoved { from: 2, to: 0 }
        );
        assert!(rx.try_recv().is_err());

        handle.append_stroke(stroke_at(&wall(), 9)).unwrap();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                HistoryEvent::TimelineChanged {
                    position: 0,
                    removed: 0,
                    added: 1
                },
                HistoryEvent::TimelineChanged {
                    position: 1,
                    removed: 2,
                    added: 0
                },
                HistoryEvent::CursorMoved { from: 0, to: 1 },
            ]
        );
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut handle = handle_with_strokes(2);
        drop(handle.subscribe());
        handle.set_cursor(1);
        assert!(handle.subscribers.is_empty());
    }

    #[test]
    fn test_attach_resets_memory() {
        let mut handle = handle_with_strokes(3);
        handle.set_cursor(0);

        let mut replacement = Map::new("Other", 16, 16);
        replacement.append_stroke(stroke_at(&wall(), 0));
        let previous = handle.attach(replacement).unwrap();

        assert_eq!(previous.stroke_count(), 0);
        assert_eq!(handle.memory_len(), 0);
        assert_eq!(handle.cursor(), 1);
        assert_eq!(handle.map().unwrap().name, "Other");
    }

    #[test]
    fn test_clear() {
        let mut handle = handle_with_strokes(3);
        handle.set_cursor(1);
        handle.clear();
        assert_eq!(handle.timeline_len(), 0);
        assert_eq!(handle.cursor(), 0);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let item = Arc::new(Item::new(1, "A", ItemKind::Building, 2, 2));
        let mut map = Map::new("Scenario", 32, 32);

        let mut stroke = Stroke::new(Arc::clone(&item));
        assert!(stroke.add_instance((0, 0)));
        assert!(stroke.add_instance((2, 0)));
        assert!(!stroke.add_instance((0, 0)));
        assert_eq!(stroke.len(), 2);
        let stroke_id = stroke.id();

        map.append_stroke(stroke);
        let mut handle = MapHandle::with_map(map);
        assert_eq!(handle.cursor(), 1);

        handle.set_cursor(0);
        assert!(handle.active().is_empty());
        assert_eq!(handle.memory().map(Stroke::id).collect::<Vec<_>>(), vec![stroke_id]);
        assert_eq!(timeline_ids(&handle), vec![stroke_id]);

        handle.set_cursor(1);
        assert_eq!(active_ids(&handle), vec![stroke_id]);
        assert_eq!(handle.memory_len(), 0);
    }
}
