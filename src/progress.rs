//! Progress reporting for corpus building and encoding.
//!
//! The collector, model manager and encoder report milestones through a
//! [`ProgressObserver`] instead of printing directly, so callers decide
//! whether progress is drawn as a bar, logged, or dropped.

use std::{cell::RefCell, path::PathBuf};

use kdam::{Bar, BarExt, tqdm};

/// A single progress milestone.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The directory walk finished.
    FilesDiscovered { count: usize },
    /// File contents were read into memory.
    FilesRead { read: usize, skipped: usize },
    /// The embedding model is being loaded.
    ModelLoading { model: String, cached: bool },
    /// The embedding model is ready.
    ModelLoaded { model: String, dimension: usize },
    /// A batch of documents was encoded.
    Encoding { done: usize, total: usize },
    /// An artifact was written to disk.
    Persisted { path: PathBuf, rows: usize },
}

/// Receives progress events from the core pipeline.
pub trait ProgressObserver {
    fn report(&self, event: ProgressEvent);
}

/// Drops every event.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Emits every event as a `tracing` record.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FilesDiscovered { count } => {
                tracing::info!(count, "discovered text files");
            }
            ProgressEvent::FilesRead { read, skipped } => {
                tracing::info!(read, skipped, "read file contents");
            }
            ProgressEvent::ModelLoading { model, cached } => {
                if cached {
                    tracing::info!(%model, "loading cached model");
                } else {
                    tracing::info!(%model, "retrieving model");
                }
            }
            ProgressEvent::ModelLoaded { model, dimension } => {
                tracing::info!(%model, dimension, "model ready");
            }
            ProgressEvent::Encoding { done, total } => {
                tracing::debug!(done, total, "encoding corpus");
            }
            ProgressEvent::Persisted { path, rows } => {
                tracing::info!(path = %path.display(), rows, "wrote table");
            }
        }
    }
}

/// Draws a progress bar on stderr while encoding and logs everything else.
#[derive(Default)]
pub struct BarProgress {
    bar: RefCell<Option<Bar>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for BarProgress {
    fn report(&self, event: ProgressEvent) {
        let ProgressEvent::Encoding { done, total } = event else {
            LogProgress.report(event);
            return;
        };

        let mut slot = self.bar.borrow_mut();
        let bar = slot.get_or_insert_with(|| {
            tqdm!(total = total, desc = "Encoding")
        });
        bar.counter = done;
        let _ = bar.refresh();

        if done >= total {
            let _ = bar.clear();
            *slot = None;
        }
    }
}
