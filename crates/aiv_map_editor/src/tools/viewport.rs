//! Screen <-> tile coordinate mapping

use bevy::math::Vec2;

/// Smallest zoom factor
pub const MIN_ZOOM: f32 = 0.25;
/// Largest zoom factor
pub const MAX_ZOOM: f32 = 4.0;
/// Zoom change per unit of mouse wheel
pub const ZOOM_STEP: f32 = 0.1;

/// Where the map sits on screen
///
/// Screen positions are window pixels with the origin at the top-left, as
/// reported by the window's cursor position. The map's top-left tile starts
/// `border_gap` pixels in from `pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub pan: Vec2,
    pub border_gap: f32,
    pub tile_pixels: f32,
    zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            border_gap: 16.0,
            tile_pixels: 16.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(tile_pixels: f32, border_gap: f32, zoom: f32) -> Self {
        Self {
            pan: Vec2::ZERO,
            border_gap: border_gap.max(0.0),
            tile_pixels: tile_pixels.max(1.0),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom factor, clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`]
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Apply a mouse wheel delta
    pub fn zoom_by(&mut self, wheel_delta: f32) {
        self.set_zoom(self.zoom * (1.0 + wheel_delta * ZOOM_STEP));
    }

    /// On-screen side of one tile
    pub fn tile_extent(&self) -> f32 {
        self.tile_pixels * self.zoom
    }

    /// Tile under a screen position, or `None` when it falls off a
    /// `width` x `height` map
    pub fn screen_to_tile(&self, screen: Vec2, width: u32, height: u32) -> Option<(i32, i32)> {
        let local = (screen - self.pan - Vec2::splat(self.border_gap)) / self.tile_extent();
        let x = local.x.floor();
        let y = local.y.floor();
        if x < 0.0 || y < 0.0 || x >= width as f32 || y >= height as f32 {
            return None;
        }
        Some((x as i32, y as i32))
    }

    /// Screen position of a tile's top-left corner
    pub fn tile_to_screen(&self, x: i32, y: i32) -> Vec2 {
        self.pan + Vec2::splat(self.border_gap) + Vec2::new(x as f32, y as f32) * self.tile_extent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_to_tile() {
        let viewport = Viewport::new(16.0, 8.0, 1.0);
        assert_eq!(viewport.screen_to_tile(Vec2::new(8.0, 8.0), 32, 32), Some((0, 0)));
        assert_eq!(viewport.screen_to_tile(Vec2::new(23.9, 40.0), 32, 32), Some((0, 2)));
        assert_eq!(viewport.screen_to_tile(Vec2::new(7.0, 8.0), 32, 32), None);
        assert_eq!(viewport.screen_to_tile(Vec2::new(8.0 + 16.0 * 32.0, 8.0), 32, 32), None);
    }

    #[test]
    fn test_pan_and_zoom() {
        let mut viewport = Viewport::new(16.0, 0.0, 2.0);
        viewport.pan = Vec2::new(-64.0, 0.0);
        // 32px tiles shifted left by two tiles
        assert_eq!(viewport.screen_to_tile(Vec2::new(0.0, 0.0), 32, 32), Some((2, 0)));
        assert_eq!(viewport.tile_to_screen(2, 1), Vec2::new(0.0, 32.0));
    }

    #[test]
    fn test_zoom_clamped() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(10.0);
        assert_eq!(viewport.zoom(), MAX_ZOOM);
        for _ in 0..100 {
            viewport.zoom_by(-5.0);
        }
        assert_eq!(viewport.zoom(), MIN_ZOOM);
    }
}
