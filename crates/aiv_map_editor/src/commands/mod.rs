//! Editor commands
//!
//! Shortcuts and other input record a [`PendingAction`] on the
//! [`EditorState`]; [`handle_pending_actions`] carries it out against the
//! document.

mod shortcuts;

pub use shortcuts::handle_keyboard_shortcuts;

use aiv_map_core::{Catalog, Item};
use bevy::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

use crate::convert::Converter;
use crate::document::{DocumentError, DocumentOutcome, MapDocument};
use crate::preferences::EditorPreferences;
use crate::tools::{Brushable, MapEditor};
use crate::{EditorState, ItemCatalog, MapConverter};

/// Something the user asked for, processed once per frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    /// Start an empty map
    New,
    Open(PathBuf),
    /// Save to a new path
    Save(PathBuf),
    /// Save to the document's current path
    SaveCurrent,
    Undo,
    Redo,
    ToggleInsertMode,
    /// Remove every stroke, including redo memory
    ClearMap,
    /// Drop the stroke being drawn, or else stop a running load/save
    Cancel,
    NextItem,
    PreviousItem,
    GrowBrush,
    ShrinkBrush,
    /// Switch to the next loaded brush
    NextBrush,
}

/// Resources an action works on
pub struct ActionContext<'a> {
    pub document: &'a mut MapDocument,
    pub editor: &'a mut MapEditor,
    pub catalog: &'a Arc<Catalog>,
    pub converter: &'a Converter,
}

/// Carry out an action
///
/// Returns the outcome of a load or save that finished immediately.
pub fn apply_action(
    action: PendingAction,
    ctx: ActionContext<'_>,
) -> Result<Option<DocumentOutcome>, DocumentError> {
    let ActionContext {
        document,
        editor,
        catalog,
        converter,
    } = ctx;

    match action {
        PendingAction::New => {
            if document.is_busy() {
                return Err(DocumentError::Busy);
            }
            editor.cancel();
            document.reset();
        }
        PendingAction::Open(path) => {
            editor.cancel();
            return document.open(path, converter, Arc::clone(catalog));
        }
        PendingAction::Save(path) => {
            return document.save_as(path, converter);
        }
        PendingAction::SaveCurrent => {
            let path = document
                .path()
                .map(|path| path.to_path_buf())
                .ok_or(DocumentError::NoPath)?;
            return document.save_as(path, converter);
        }
        PendingAction::Undo => {
            document.handle.undo();
        }
        PendingAction::Redo => {
            document.handle.redo();
        }
        PendingAction::ToggleInsertMode => {
            let insert_mode = !document.handle.insert_mode();
            document.handle.set_insert_mode(insert_mode);
            info!("Insert mode {}", if insert_mode { "on" } else { "off" });
        }
        PendingAction::ClearMap => {
            editor.cancel();
            document.handle.clear();
        }
        PendingAction::Cancel => {
            if !editor.cancel() && document.cancel_job() {
                info!("Cancelling load/save");
            }
        }
        PendingAction::NextItem => {
            let item = cycle_item(catalog, editor.selected_item(), true);
            select(editor, item);
        }
        PendingAction::PreviousItem => {
            let item = cycle_item(catalog, editor.selected_item(), false);
            select(editor, item);
        }
        PendingAction::GrowBrush => adjust_brush(editor, 1),
        PendingAction::ShrinkBrush => adjust_brush(editor, -1),
        PendingAction::NextBrush => {
            if editor.next_brush() {
                info!("Brush: {}", editor.brush().name());
            }
        }
    }
    Ok(None)
}

fn select(editor: &mut MapEditor, item: Option<Arc<Item>>) {
    if let Some(item) = &item {
        info!(
            "Selected {} ({}, {}x{})",
            item.name,
            item.kind.display_name(),
            item.tile_width,
            item.tile_height
        );
    }
    editor.select_item(item);
}

/// The catalog item after (or before) `current`, wrapping around
fn cycle_item(catalog: &Catalog, current: Option<&Arc<Item>>, forward: bool) -> Option<Arc<Item>> {
    let items: Vec<&Arc<Item>> = catalog.iter().collect();
    if items.is_empty() {
        return None;
    }

    let position = current.and_then(|current| items.iter().position(|item| item.id == current.id));
    let index = match (position, forward) {
        (None, true) => 0,
        (None, false) => items.len() - 1,
        (Some(i), true) => (i + 1) % items.len(),
        (Some(i), false) => (i + items.len() - 1) % items.len(),
    };
    Some(Arc::clone(items[index]))
}

fn adjust_brush(editor: &mut MapEditor, delta: i64) {
    let brush = editor.brush_mut();
    let Some(adjustment) = brush.adjustment() else {
        return;
    };
    let value = (adjustment.value as i64 + delta).clamp(adjustment.min as i64, adjustment.max as i64);
    brush.set_adjustment(value as u32);
}

/// Log a finished load/save and remember the map in the recent list
pub fn record_outcome(
    outcome: &DocumentOutcome,
    document: &MapDocument,
    preferences: &mut EditorPreferences,
) {
    let name = document
        .map()
        .map(|map| map.name.clone())
        .unwrap_or_default();

    let path = match outcome {
        DocumentOutcome::Loaded {
            path,
            skipped_frames,
        } => {
            info!("Loaded map from {}", path.display());
            if *skipped_frames > 0 {
                warn!(
                    "Skipped {} frame(s) with item types missing from the catalog",
                    skipped_frames
                );
            }
            path
        }
        DocumentOutcome::Saved {
            path,
            skipped_instances,
        } => {
            info!("Saved map to {}", path.display());
            if *skipped_instances > 0 {
                warn!(
                    "Dropped {} placement(s) outside the {}x{} area the format can address",
                    skipped_instances,
                    aiv_map_core::AIV_GRID_SIZE,
                    aiv_map_core::AIV_GRID_SIZE
                );
            }
            path
        }
    };

    preferences.add_recent_map(path.clone(), name);
    if let Err(e) = preferences.save() {
        error!("Failed to save preferences: {}", e);
    }
}

/// System to process the pending action
pub fn handle_pending_actions(
    mut editor_state: ResMut<EditorState>,
    mut document: ResMut<MapDocument>,
    mut editor: ResMut<MapEditor>,
    mut preferences: ResMut<EditorPreferences>,
    catalog: Res<ItemCatalog>,
    converter: Res<MapConverter>,
) {
    let Some(action) = editor_state.pending_action.take() else {
        return;
    };

    let ctx = ActionContext {
        document: &mut *document,
        editor: &mut *editor,
        catalog: &catalog.0,
        converter: &converter.0,
    };
    match apply_action(action.clone(), ctx) {
        Ok(Some(outcome)) => record_outcome(&outcome, &document, &mut preferences),
        Ok(None) => {}
        Err(e) => {
            error!("{:?} failed: {}", action, e);
            editor_state.error_message = Some(e.to_string());
            if let (PendingAction::Open(path), DocumentError::IoError(_)) = (&action, &e) {
                preferences.remove_recent_map(&path.to_string_lossy());
            }
        }
    }
}

/// System to apply history notifications and finished load/save jobs
pub fn process_document_updates(
    mut editor_state: ResMut<EditorState>,
    mut document: ResMut<MapDocument>,
    mut preferences: ResMut<EditorPreferences>,
) {
    for event in document.drain_events() {
        debug!("History: {:?}", event);
    }

    match document.poll_job() {
        Some(Ok(outcome)) => record_outcome(&outcome, &document, &mut preferences),
        Some(Err(e)) => {
            error!("{}", e);
            editor_state.error_message = Some(e.to_string());
        }
        None => {}
    }
}
