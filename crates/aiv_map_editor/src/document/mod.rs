//! The open map document
//!
//! Holds the [`MapHandle`] for the map being edited together with where it
//! lives on disk, whether it has unsaved edits, and the conversion job
//! currently loading or saving it.

mod file;

pub use file::*;

use aiv_map_core::Map;
use bevy::prelude::Resource;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Mutex;

use crate::convert::{AsyncConvertHandle, ConvertOutput};
use crate::history::{HistoryEvent, MapHandle};

/// Size of a new, empty map
pub const NEW_MAP_SIZE: u32 = aiv_map_core::AIV_GRID_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Load,
    Save,
}

/// A background load or save
#[derive(Debug)]
pub struct DocumentJob {
    pub kind: JobKind,
    pub path: PathBuf,
    handle: AsyncConvertHandle,
    /// Edit generation when a save started
    generation: u64,
}

/// What a finished load or save did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Loaded {
        path: PathBuf,
        /// Frames dropped for unknown item ids
        skipped_frames: usize,
    },
    Saved {
        path: PathBuf,
        /// Instances dropped for lying outside the packable grid
        skipped_instances: usize,
    },
}

/// The map being edited
#[derive(Debug, Resource)]
pub struct MapDocument {
    pub handle: MapHandle,
    path: Option<PathBuf>,
    dirty: bool,
    /// Bumped on every edit, so a save can tell whether it is still current
    generation: u64,
    job: Option<DocumentJob>,
    events: Mutex<Receiver<HistoryEvent>>,
}

impl Default for MapDocument {
    fn default() -> Self {
        Self::new(Map::new("Untitled", NEW_MAP_SIZE, NEW_MAP_SIZE))
    }
}

impl MapDocument {
    pub fn new(map: Map) -> Self {
        let mut handle = MapHandle::with_map(map);
        let events = handle.subscribe();
        Self {
            handle,
            path: None,
            dirty: false,
            generation: 0,
            job: None,
            events: Mutex::new(events),
        }
    }

    pub fn map(&self) -> Option<&Map> {
        self.handle.map()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Title for the window: map name, path and an unsaved marker
    pub fn title(&self) -> String {
        let name = self.map().map_or("No map", |map| map.name.as_str());
        let marker = if self.dirty { "*" } else { "" };
        match &self.path {
            Some(path) => format!("{}{} - {}", name, marker, path.display()),
            None => format!("{}{}", name, marker),
        }
    }

    /// Replace the document with a new map
    pub fn replace(&mut self, map: Map, path: Option<PathBuf>) {
        self.drain_events();
        let insert_mode = self.handle.insert_mode();
        self.handle.attach(map);
        self.handle.set_insert_mode(insert_mode);
        self.path = path;
        self.drain_events();
        self.dirty = false;
    }

    /// Start over with an empty map
    pub fn reset(&mut self) {
        self.replace(Map::new("Untitled", NEW_MAP_SIZE, NEW_MAP_SIZE), None);
    }

    /// Apply pending history notifications, returning them
    ///
    /// Cursor moves and timeline changes mark the document dirty.
    pub fn drain_events(&mut self) -> Vec<HistoryEvent> {
        let events: Vec<HistoryEvent> = match self.events.lock() {
            Ok(receiver) => receiver.try_iter().collect(),
            Err(_) => Vec::new(),
        };

        for event in &events {
            match event {
                HistoryEvent::CursorMoved { .. } | HistoryEvent::TimelineChanged { .. } => {
                    self.dirty = true;
                    self.generation += 1;
                }
                HistoryEvent::Attached { .. } | HistoryEvent::Detached => {}
            }
        }
        events
    }

    pub fn job(&self) -> Option<&DocumentJob> {
        self.job.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    /// Track a background load
    pub fn begin_load(&mut self, path: PathBuf, handle: AsyncConvertHandle) {
        self.job = Some(DocumentJob {
            kind: JobKind::Load,
            path,
            handle,
            generation: self.generation,
        });
    }

    /// Track a background save of the current map
    pub fn begin_save(&mut self, path: PathBuf, handle: AsyncConvertHandle) {
        self.drain_events();
        self.job = Some(DocumentJob {
            kind: JobKind::Save,
            path,
            handle,
            generation: self.generation,
        });
    }

    /// Ask the running job to stop. Its result still arrives through
    /// [`MapDocument::poll_job`].
    pub fn cancel_job(&self) -> bool {
        match &self.job {
            Some(job) => {
                job.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Check the running job and apply its result once it finishes
    ///
    /// A failed or cancelled job leaves the document untouched.
    pub fn poll_job(&mut self) -> Option<Result<DocumentOutcome, DocumentError>> {
        let output = self.job.as_ref()?.handle.try_recv()?;
        let job = self.job.take()?;
        Some(self.finish_job(job, output))
    }

    fn finish_job(
        &mut self,
        job: DocumentJob,
        output: ConvertOutput,
    ) -> Result<DocumentOutcome, DocumentError> {
        match output {
            ConvertOutput::Loaded {
                map,
                skipped_frames,
            } => {
                self.replace(map, Some(job.path.clone()));
                Ok(DocumentOutcome::Loaded {
                    path: job.path,
                    skipped_frames,
                })
            }
            ConvertOutput::Saved {
                path,
                skipped_instances,
            } => {
                self.path = Some(path.clone());
                self.drain_events();
                if self.generation == job.generation {
                    self.dirty = false;
                }
                Ok(DocumentOutcome::Saved {
                    path,
                    skipped_instances,
                })
            }
            ConvertOutput::Failed(e) => Err(DocumentError::Convert(e)),
        }
    }
}
