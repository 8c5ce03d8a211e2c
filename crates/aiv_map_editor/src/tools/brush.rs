//! Brushes - the pattern of placements a single dab produces
//!
//! A brush mask is centered on the hovered tile. Each set cell becomes one
//! candidate placement, spaced by the selected item's footprint so a 3x3 mask
//! with a 2x2 item tries nine adjacent, non-overlapping placements.

use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Largest square brush side
pub const SQUARE_BRUSH_MAX: u32 = 16;
/// Largest accepted mask image side, in pixels
pub const MASK_IMAGE_MAX: u32 = 64;

#[derive(Debug)]
pub enum BrushError {
    ImageError(String),
    TooLarge(u32, u32),
    EmptyMask,
}

impl std::fmt::Display for BrushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrushError::ImageError(e) => write!(f, "Image error: {}", e),
            BrushError::TooLarge(w, h) => write!(
                f,
                "Mask image is {}x{}, at most {}x{} is supported",
                w, h, MASK_IMAGE_MAX, MASK_IMAGE_MAX
            ),
            BrushError::EmptyMask => write!(f, "Mask image has no painted pixels"),
        }
    }
}

impl std::error::Error for BrushError {}

/// Boolean grid of brush cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrushMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl BrushMask {
    /// Mask with every cell set
    pub fn filled(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![true; (width * height) as usize],
        }
    }

    /// Mask from row-major cells. Missing cells are unset.
    pub fn from_cells(width: u32, height: u32, mut cells: Vec<bool>) -> Self {
        cells.resize((width * height) as usize, false);
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.cells[(y * self.width + x) as usize]
    }

    /// Number of set cells
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    /// Offsets of set cells relative to the mask center, row-major
    pub fn offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let center_x = (self.width / 2) as i32;
        let center_y = (self.height / 2) as i32;
        (0..self.height).flat_map(move |y| {
            (0..self.width)
                .filter(move |&x| self.get(x, y))
                .map(move |x| (x as i32 - center_x, y as i32 - center_y))
        })
    }
}

/// A bounded integer setting exposed by a brush (e.g. its size)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushAdjustment {
    pub value: u32,
    pub min: u32,
    pub max: u32,
}

/// Something that can shape a dab
pub trait Brushable {
    /// Display name
    fn name(&self) -> &str;

    fn mask(&self) -> &BrushMask;

    /// Adjustable setting, if the brush has one
    fn adjustment(&self) -> Option<BrushAdjustment> {
        None
    }

    /// Change the adjustable setting. Values are clamped to its range.
    fn set_adjustment(&mut self, _value: u32) {}

    /// Image to show in a brush picker
    fn thumbnail(&self) -> Option<&Path> {
        None
    }
}

/// Solid square, adjustable from 1 to [`SQUARE_BRUSH_MAX`]
#[derive(Debug, Clone, PartialEq)]
pub struct SquareBrush {
    size: u32,
    mask: BrushMask,
}

impl SquareBrush {
    pub fn new(size: u32) -> Self {
        let size = size.clamp(1, SQUARE_BRUSH_MAX);
        Self {
            size,
            mask: BrushMask::filled(size, size),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

impl Default for SquareBrush {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Brushable for SquareBrush {
    fn name(&self) -> &str {
        "Square"
    }

    fn mask(&self) -> &BrushMask {
        &self.mask
    }

    fn adjustment(&self) -> Option<BrushAdjustment> {
        Some(BrushAdjustment {
            value: self.size,
            min: 1,
            max: SQUARE_BRUSH_MAX,
        })
    }

    fn set_adjustment(&mut self, value: u32) {
        *self = SquareBrush::new(value);
    }
}

/// Brush whose mask comes from an image: dark, opaque pixels are set
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMaskBrush {
    name: String,
    path: Option<PathBuf>,
    mask: BrushMask,
}

impl ImageMaskBrush {
    /// Load a mask image from disk
    pub fn load(path: &Path) -> Result<Self, BrushError> {
        let image = image::open(path).map_err(|e| BrushError::ImageError(e.to_string()))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "Mask".to_string());

        let mut brush = Self::from_image(name, &image)?;
        brush.path = Some(path.to_path_buf());
        Ok(brush)
    }

    /// Build a mask from an in-memory image
    pub fn from_image(name: impl Into<String>, image: &DynamicImage) -> Result<Self, BrushError> {
        let pixels = image.to_luma_alpha8();
        let (width, height) = pixels.dimensions();
        if width > MASK_IMAGE_MAX || height > MASK_IMAGE_MAX {
            return Err(BrushError::TooLarge(width, height));
        }

        let cells = pixels
            .pixels()
            .map(|pixel| {
                let [luma, alpha] = pixel.0;
                alpha >= 128 && luma < 128
            })
            .collect();
        let mask = BrushMask::from_cells(width, height, cells);
        if mask.count() == 0 {
            return Err(BrushError::EmptyMask);
        }

        Ok(Self {
            name: name.into(),
            path: None,
            mask,
        })
    }
}

impl Brushable for ImageMaskBrush {
    fn name(&self) -> &str {
        &self.name
    }

    fn mask(&self) -> &BrushMask {
        &self.mask
    }

    fn thumbnail(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Load a mask brush from each path, collecting the ones that fail
pub fn load_mask_brushes(paths: &[PathBuf]) -> (Vec<Brush>, Vec<(PathBuf, BrushError)>) {
    let mut brushes = Vec::new();
    let mut failed = Vec::new();
    for path in paths {
        match ImageMaskBrush::load(path) {
            Ok(brush) => brushes.push(Brush::ImageMask(brush)),
            Err(e) => failed.push((path.clone(), e)),
        }
    }
    (brushes, failed)
}

/// The brushes the editor can paint with
#[derive(Debug, Clone, PartialEq)]
pub enum Brush {
    Square(SquareBrush),
    ImageMask(ImageMaskBrush),
}

impl Default for Brush {
    fn default() -> Self {
        Brush::Square(SquareBrush::default())
    }
}

impl Brushable for Brush {
    fn name(&self) -> &str {
        match self {
            Brush::Square(brush) => brush.name(),
            Brush::ImageMask(brush) => brush.name(),
        }
    }

    fn mask(&self) -> &BrushMask {
        match self {
            Brush::Square(brush) => brush.mask(),
            Brush::ImageMask(brush) => brush.mask(),
        }
    }

    fn adjustment(&self) -> Option<BrushAdjustment> {
        match self {
            Brush::Square(brush) => brush.adjustment(),
            Brush::ImageMask(brush) => brush.adjustment(),
        }
    }

    fn set_adjustment(&mut self, value: u32) {
        match self {
            Brush::Square(brush) => brush.set_adjustment(value),
            Brush::ImageMask(brush) => brush.set_adjustment(value),
        }
    }

    fn thumbnail(&self) -> Option<&Path> {
        match self {
            Brush::Square(brush) => brush.thumbnail(),
            Brush::ImageMask(brush) => brush.thumbnail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, LumaA};
    use uuid::Uuid;

    #[test]
    fn test_square_offsets() {
        let single = SquareBrush::new(1);
        assert_eq!(single.mask().offsets().collect::<Vec<_>>(), vec![(0, 0)]);

        let three = SquareBrush::new(3);
        let offsets: Vec<_> = three.mask().offsets().collect();
        assert_eq!(offsets.len(), 9);
        assert_eq!(offsets.first(), Some(&(-1, -1)));
        assert_eq!(offsets.last(), Some(&(1, 1)));
    }

    #[test]
    fn test_square_adjustment_clamps() {
        let mut brush = Brush::default();
        brush.set_adjustment(40);
        assert_eq!(
            brush.adjustment(),
            Some(BrushAdjustment {
                value: SQUARE_BRUSH_MAX,
                min: 1,
                max: SQUARE_BRUSH_MAX
            })
        );
        brush.set_adjustment(0);
        assert_eq!(brush.mask().count(), 1);
    }

    #[test]
    fn test_image_mask() {
        // Dark plus-shape on a white background, plus one transparent dark pixel
        let buffer = ImageBuffer::from_fn(3, 3, |x, y| {
            if (x, y) == (0, 0) {
                LumaA([0u8, 0u8])
            } else if x == 1 || y == 1 {
                LumaA([0u8, 255u8])
            } else {
                LumaA([255u8, 255u8])
            }
        });
        let image = DynamicImage::ImageLumaA8(buffer);
        let brush = ImageMaskBrush::from_image("plus", &image).unwrap();

        assert_eq!(brush.name(), "plus");
        assert_eq!(brush.mask().count(), 5);
        assert!(!brush.mask().get(0, 0));
        assert!(brush.mask().get(1, 1));
        assert!(brush.adjustment().is_none());
        assert!(brush.thumbnail().is_none());

        let offsets: Vec<_> = brush.mask().offsets().collect();
        assert_eq!(offsets, vec![(0, -1), (-1, 0), (0, 0), (1, 0), (0, 1)]);
    }

    #[test]
    fn test_blank_image_rejected() {
        let buffer = ImageBuffer::from_pixel(4, 4, LumaA([255u8, 255u8]));
        let result = ImageMaskBrush::from_image("blank", &DynamicImage::ImageLumaA8(buffer));
        assert!(matches!(result, Err(BrushError::EmptyMask)));
    }

    #[test]
    fn test_load_mask_from_png() {
        let dir = std::env::temp_dir().join(format!("aiv_brush_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let diagonal = dir.join("diagonal.png");
        GrayImage::from_fn(4, 4, |x, y| if x == y { Luma([0u8]) } else { Luma([255u8]) })
            .save(&diagonal)
            .unwrap();

        let brush = ImageMaskBrush::load(&diagonal).unwrap();
        assert_eq!(brush.name(), "diagonal");
        assert_eq!(brush.mask().count(), 4);
        assert_eq!(brush.thumbnail(), Some(diagonal.as_path()));

        let missing = dir.join("missing.png");
        let (brushes, failed) = load_mask_brushes(&[diagonal.clone(), missing.clone()]);
        assert_eq!(brushes.len(), 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, missing);
        assert!(matches!(failed[0].1, BrushError::ImageError(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
