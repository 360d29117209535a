//! bioannot - polygon annotation engine for pyramidal biomedical images
//!
//! The engine keeps segment annotations of one mask in an authoritative
//! feature store, edits them through a small set of geometry operations,
//! records every edit as an undoable batch, and synchronizes the result with
//! a persistence backend and an export sink. Rendering concerns (projection,
//! tiles, the rendered feature layer, the viewport) live in `bioannot_view`.

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod geometry;
pub mod mode;
pub mod model;
pub mod session;
pub mod store;
pub mod undo;

pub use backend::{AnnotationBackend, FileBackend, MaskKey, MemoryBackend};
pub use config::{AppConfig, ConfigError, LogLevel};
pub use error::{BackendError, ExportError, SessionError, SessionResult};
pub use export::{ExportDocument, ExportSink, FileExportSink, MemoryExportSink, RasterOptions};
pub use mode::{Affordances, Mode, ModeMachine};
pub use session::{AnnotationSession, FeatureActions, FeatureClick, Notice, SessionControls, UndoReport};
pub use store::FeatureStore;
pub use undo::{FeatureSnapshot, UndoBatch, UndoStack};
