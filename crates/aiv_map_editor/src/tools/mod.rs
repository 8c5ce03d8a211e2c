//! Editor tools - stroke drawing, pan/zoom
//!
//! Handles viewport input and feeds it to the [`MapEditor`].

mod brush;
mod editor;
mod viewport;

pub use brush::*;
pub use editor::MapEditor;
pub use viewport::*;

use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;

use crate::document::MapDocument;

/// Plugin for editor tools and viewport input
pub struct EditorToolsPlugin;

impl Plugin for EditorToolsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewportInputState>()
            .init_resource::<MapEditor>()
            .add_systems(Update, (handle_viewport_input, handle_zoom_input));
    }
}

/// State for viewport input handling
#[derive(Resource, Default)]
pub struct ViewportInputState {
    /// Last cursor position while panning
    pub pan_start_pos: Option<Vec2>,
}

fn handle_viewport_input(
    mut editor: ResMut<MapEditor>,
    mut document: ResMut<MapDocument>,
    mut input_state: ResMut<ViewportInputState>,
    windows: Query<&Window>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
) {
    // The map is about to be replaced; a stroke against it is meaningless
    if document.is_busy() && editor.cancel() {
        debug!("Stroke cancelled by running load/save");
    }

    // Release and cancel are honored even when the cursor left the window
    if mouse_buttons.just_released(MouseButton::Left) && editor.is_drawing() {
        let instances = editor.in_progress().map_or(0, |stroke| stroke.len());
        if editor.end(&mut document.handle) {
            debug!("Committed stroke with {} instances", instances);
        }
    }
    if mouse_buttons.just_pressed(MouseButton::Right) && editor.cancel() {
        debug!("Stroke cancelled");
    }

    let Some(window) = windows.iter().next() else {
        return;
    };
    let Some(cursor_position) = window.cursor_position() else {
        editor.clear_hover();
        input_state.pan_start_pos = None;
        return;
    };

    // Panning (middle mouse)
    if mouse_buttons.pressed(MouseButton::Middle) {
        if let Some(start_pos) = input_state.pan_start_pos {
            editor.viewport.pan += cursor_position - start_pos;
        }
        input_state.pan_start_pos = Some(cursor_position);
    } else {
        input_state.pan_start_pos = None;
    }

    let Some(map) = document.handle.map() else {
        editor.clear_hover();
        return;
    };

    if mouse_buttons.just_pressed(MouseButton::Left) && !document.is_busy() {
        editor.begin(cursor_position, map);
    } else if mouse_buttons.pressed(MouseButton::Left) && editor.is_drawing() {
        editor.update(cursor_position, map);
    } else {
        editor.pointer_moved(cursor_position, map);
    }
}

#[allow(deprecated)]
fn handle_zoom_input(
    mut editor: ResMut<MapEditor>,
    mut scroll_events: bevy::ecs::event::EventReader<MouseWheel>,
) {
    for event in scroll_events.read() {
        editor.viewport.zoom_by(event.y);
    }
}
