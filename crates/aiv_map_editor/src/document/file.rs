//! Map file open/save operations

use super::{DocumentOutcome, MapDocument};
use crate::convert::{ConvertError, Converter};
use aiv_map_core::{AivDocument, Catalog, ImportedMap, InterchangeError, Map};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub enum DocumentError {
    IoError(String),
    Interchange(InterchangeError),
    Convert(ConvertError),
    /// Another load or save is still running
    Busy,
    NoPath,
    NoMap,
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::IoError(e) => write!(f, "IO error: {}", e),
            DocumentError::Interchange(e) => write!(f, "{}", e),
            DocumentError::Convert(e) => write!(f, "{}", e),
            DocumentError::Busy => write!(f, "A load or save is already in progress"),
            DocumentError::NoPath => write!(f, "No file path set"),
            DocumentError::NoMap => write!(f, "No map is open"),
        }
    }
}

impl std::error::Error for DocumentError {}

impl From<InterchangeError> for DocumentError {
    fn from(e: InterchangeError) -> Self {
        DocumentError::Interchange(e)
    }
}

impl From<ConvertError> for DocumentError {
    fn from(e: ConvertError) -> Self {
        DocumentError::Convert(e)
    }
}

/// On-disk map formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    /// Stronghold castle file, read and written through the converter
    Aiv,
    /// The interchange document itself
    Json,
}

impl MapFormat {
    /// Pick the format from a file extension. Anything not `.json` is AIV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => MapFormat::Json,
            _ => MapFormat::Aiv,
        }
    }
}

/// Read an interchange document straight from a JSON file
pub fn read_json_map(path: &Path, catalog: &Catalog) -> Result<ImportedMap, DocumentError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| DocumentError::IoError(e.to_string()))?;
    let document = AivDocument::from_json(&content)?;
    Ok(document.to_map(catalog, map_name(path)))
}

/// Write a map as an interchange document. Returns the skipped instance count.
pub fn write_json_map(map: &Map, path: &Path) -> Result<usize, DocumentError> {
    let exported = AivDocument::from_map(map);
    let content = exported.document.to_json_pretty()?;
    std::fs::write(path, content).map_err(|e| DocumentError::IoError(e.to_string()))?;
    Ok(exported.skipped_instances)
}

fn map_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string())
}

impl MapDocument {
    /// Load a map file, blocking until done
    pub fn load(
        &mut self,
        path: &Path,
        converter: &Converter,
        catalog: &Catalog,
    ) -> Result<DocumentOutcome, DocumentError> {
        if self.is_busy() {
            return Err(DocumentError::Busy);
        }

        let (map, skipped_frames) = match MapFormat::from_path(path) {
            MapFormat::Json => {
                let imported = read_json_map(path, catalog)?;
                (imported.map, imported.skipped_frames)
            }
            MapFormat::Aiv => converter.import(path, catalog)?,
        };

        self.replace(map, Some(path.to_path_buf()));
        Ok(DocumentOutcome::Loaded {
            path: path.to_path_buf(),
            skipped_frames,
        })
    }

    /// Save the map, blocking until done
    pub fn save(
        &mut self,
        path: &Path,
        converter: &Converter,
    ) -> Result<DocumentOutcome, DocumentError> {
        if self.is_busy() {
            return Err(DocumentError::Busy);
        }
        let map = self.map().ok_or(DocumentError::NoMap)?;

        let skipped_instances = match MapFormat::from_path(path) {
            MapFormat::Json => write_json_map(map, path)?,
            MapFormat::Aiv => {
                let exported = AivDocument::from_map(map);
                converter.export(&exported.document, path)?;
                exported.skipped_instances
            }
        };

        self.drain_events();
        self.path = Some(path.to_path_buf());
        self.dirty = false;
        Ok(DocumentOutcome::Saved {
            path: path.to_path_buf(),
            skipped_instances,
        })
    }

    /// Save to the current path if set
    pub fn save_current(&mut self, converter: &Converter) -> Result<DocumentOutcome, DocumentError> {
        let path = self.path.clone().ok_or(DocumentError::NoPath)?;
        self.save(&path, converter)
    }

    /// Open a map file
    ///
    /// JSON files load immediately and return `Some`. AIV files start a
    /// background conversion and return `None`; the result arrives through
    /// [`MapDocument::poll_job`].
    pub fn open(
        &mut self,
        path: PathBuf,
        converter: &Converter,
        catalog: Arc<Catalog>,
    ) -> Result<Option<DocumentOutcome>, DocumentError> {
        if self.is_busy() {
            return Err(DocumentError::Busy);
        }
        match MapFormat::from_path(&path) {
            MapFormat::Json => self.load(&path, converter, &catalog).map(Some),
            MapFormat::Aiv => {
                let handle = converter.import_async(path.clone(), catalog);
                self.begin_load(path, handle);
                Ok(None)
            }
        }
    }

    /// Save the map to `path`, in the background for AIV files
    pub fn save_as(
        &mut self,
        path: PathBuf,
        converter: &Converter,
    ) -> Result<Option<DocumentOutcome>, DocumentError> {
        if self.is_busy() {
            return Err(DocumentError::Busy);
        }
        match MapFormat::from_path(&path) {
            MapFormat::Json => self.save(&path, converter).map(Some),
            MapFormat::Aiv => {
                let map = self.map().ok_or(DocumentError::NoMap)?;
                let handle = converter.export_async(map, path.clone());
                self.begin_save(path, handle);
                Ok(None)
            }
        }
    }
}
