//! Map overlay for the editor viewport
//!
//! Draws the map with gizmos: the border, every occupied tile of the
//! rasterized map colored by item kind, the stroke being drawn, and the
//! brush footprint under the cursor.

use aiv_map_core::{ItemKind, RasterCache, Stroke};
use bevy::prelude::*;

use crate::document::MapDocument;
use crate::tools::{Brushable, MapEditor, Viewport};

/// Plugin for map rendering
pub struct MapRenderPlugin;

impl Plugin for MapRenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderState>()
            .add_systems(Update, draw_map_overlay);
    }
}

/// Rasterized map kept between frames
#[derive(Resource, Default)]
pub struct RenderState {
    pub cache: RasterCache,
}

/// Fill color for an item kind
pub fn kind_color(kind: ItemKind) -> Color {
    match kind {
        ItemKind::Building => Color::srgb(0.85, 0.65, 0.3),
        ItemKind::Unit => Color::srgb(0.9, 0.25, 0.25),
        ItemKind::Wall => Color::srgb(0.6, 0.6, 0.65),
        ItemKind::Moat => Color::srgb(0.2, 0.45, 0.85),
    }
}

/// Maps tile coordinates to world space through the camera
struct TileProjector {
    /// World position of tile (0, 0)'s top-left corner
    origin: Vec2,
    /// World-space extent of one tile; y is negative since screen y grows down
    step: Vec2,
}

impl TileProjector {
    fn new(
        viewport: &Viewport,
        camera: &Camera,
        camera_transform: &GlobalTransform,
    ) -> Option<Self> {
        let origin = camera
            .viewport_to_world_2d(camera_transform, viewport.tile_to_screen(0, 0))
            .ok()?;
        let unit = camera
            .viewport_to_world_2d(camera_transform, viewport.tile_to_screen(1, 1))
            .ok()?;
        Some(Self {
            origin,
            step: unit - origin,
        })
    }

    /// Center and size of a `width` x `height` tile area at `(x, y)`
    fn area(&self, x: i32, y: i32, width: i32, height: i32) -> (Vec2, Vec2) {
        let min = self.origin + Vec2::new(x as f32, y as f32) * self.step;
        let size = Vec2::new(width as f32, height as f32) * self.step;
        (min + size / 2.0, size.abs())
    }
}

fn draw_stroke(gizmos: &mut Gizmos, projector: &TileProjector, stroke: &Stroke, color: Color) {
    for instance in stroke.instances() {
        let (center, size) = projector.area(
            instance.x,
            instance.y,
            stroke.tile_width(),
            stroke.tile_height(),
        );
        gizmos.rect_2d(Isometry2d::from_translation(center), size, color);
    }
}

fn draw_map_overlay(
    mut render_state: ResMut<RenderState>,
    document: Res<MapDocument>,
    editor: Res<MapEditor>,
    camera_q: Query<(&Camera, &GlobalTransform), With<Camera2d>>,
    mut gizmos: Gizmos,
) {
    let Some(map) = document.map() else {
        return;
    };
    let Some((camera, camera_transform)) = camera_q.iter().next() else {
        return;
    };
    let Some(projector) = TileProjector::new(&editor.viewport, camera, camera_transform) else {
        return;
    };

    // Map border
    let (center, size) = projector.area(0, 0, map.width() as i32, map.height() as i32);
    gizmos.rect_2d(
        Isometry2d::from_translation(center),
        size,
        Color::srgba(1.0, 1.0, 1.0, 0.4),
    );

    // Committed strokes, as rasterized (later strokes win)
    let grid = render_state.cache.sync(map);
    for (x, y, item) in grid.iter_occupied() {
        let (center, size) = projector.area(x as i32, y as i32, 1, 1);
        gizmos.rect_2d(
            Isometry2d::from_translation(center),
            size * 0.9,
            kind_color(item.kind),
        );
    }

    // Stroke being drawn
    if let Some(stroke) = editor.in_progress() {
        draw_stroke(
            &mut gizmos,
            &projector,
            stroke,
            Color::srgba(1.0, 1.0, 0.4, 0.9),
        );
    }

    // Brush footprint under the cursor
    let Some((hover_x, hover_y)) = editor.hovered_tile() else {
        return;
    };
    let hover_color = Color::srgba(0.25, 0.45, 0.95, 0.85);
    match editor.selected_item() {
        Some(item) => {
            let width = i32::try_from(item.tile_width).unwrap_or(i32::MAX);
            let height = i32::try_from(item.tile_height).unwrap_or(i32::MAX);
            for (dx, dy) in editor.brush().mask().offsets() {
                let x = hover_x.saturating_add(dx.saturating_mul(width));
                let y = hover_y.saturating_add(dy.saturating_mul(height));
                let (center, size) = projector.area(x, y, width, height);
                gizmos.rect_2d(Isometry2d::from_translation(center), size, hover_color);
            }
        }
        None => {
            let (center, size) = projector.area(hover_x, hover_y, 1, 1);
            gizmos.rect_2d(Isometry2d::from_translation(center), size, hover_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_colors_differ() {
        let colors: Vec<Color> = ItemKind::all().iter().map(|&kind| kind_color(kind)).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_projector_area() {
        let projector = TileProjector {
            origin: Vec2::new(-100.0, 100.0),
            step: Vec2::new(10.0, -10.0),
        };
        let (center, size) = projector.area(1, 2, 2, 3);
        assert_eq!(size, Vec2::new(20.0, 30.0));
        assert_eq!(center, Vec2::new(-80.0, 65.0));
    }
}
