//! Keyboard shortcut handling

use bevy::prelude::*;

use super::PendingAction;
use crate::EditorState;

/// Map the keys pressed this frame to an action
pub fn shortcut_action(keyboard: &ButtonInput<KeyCode>) -> Option<PendingAction> {
    let ctrl = keyboard.pressed(KeyCode::ControlLeft) || keyboard.pressed(KeyCode::ControlRight);
    let shift = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);

    if ctrl {
        // Ctrl+Shift+Z or Ctrl+Y - Redo
        if (keyboard.just_pressed(KeyCode::KeyZ) && shift) || keyboard.just_pressed(KeyCode::KeyY) {
            return Some(PendingAction::Redo);
        }
        // Ctrl+Z - Undo
        if keyboard.just_pressed(KeyCode::KeyZ) {
            return Some(PendingAction::Undo);
        }
        // Ctrl+S - Save
        if keyboard.just_pressed(KeyCode::KeyS) {
            return Some(PendingAction::SaveCurrent);
        }
        // Ctrl+N - New
        if keyboard.just_pressed(KeyCode::KeyN) {
            return Some(PendingAction::New);
        }
        return None;
    }

    if keyboard.just_pressed(KeyCode::Insert) {
        return Some(PendingAction::ToggleInsertMode);
    }
    if keyboard.just_pressed(KeyCode::Delete) {
        return Some(PendingAction::ClearMap);
    }
    if keyboard.just_pressed(KeyCode::Escape) {
        return Some(PendingAction::Cancel);
    }

    // Item and brush selection
    if keyboard.just_pressed(KeyCode::BracketRight) {
        return Some(PendingAction::NextItem);
    }
    if keyboard.just_pressed(KeyCode::BracketLeft) {
        return Some(PendingAction::PreviousItem);
    }
    if keyboard.just_pressed(KeyCode::Equal) {
        return Some(PendingAction::GrowBrush);
    }
    if keyboard.just_pressed(KeyCode::Minus) {
        return Some(PendingAction::ShrinkBrush);
    }
    if keyboard.just_pressed(KeyCode::Backslash) {
        return Some(PendingAction::NextBrush);
    }

    None
}

/// Handle keyboard shortcuts
pub fn handle_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut editor_state: ResMut<EditorState>,
) {
    if let Some(action) = shortcut_action(&keyboard) {
        editor_state.pending_action = Some(action);
    }
}
