//! Motif Engine — recurring-motif selection with per-listener history.
//!
//! Given a catalog of reusable motifs (archetypal figures, sensory anchors)
//! and a listener's exposure history, selects a diverse, non-repetitive set
//! of motifs for a new session, then updates the relationship history once
//! the session has been produced.
//!
//! Archetype and anchor selection share one engine; they differ only in
//! [`EngineConfig`](core::config::EngineConfig) presets.

pub mod core;
pub mod schema;

pub use crate::core::catalog::{load_catalog, Catalog, CatalogError};
pub use crate::core::config::EngineConfig;
pub use crate::core::engine::{EngineError, MotifEngine};
pub use crate::core::history_store::{load_history, load_history_with, save_history, HistoryError};
pub use crate::core::selector::{SelectionError, Selector};
pub use crate::core::updater::HistoryUpdater;
pub use crate::schema::history::{HistoryState, SessionStamp};
pub use crate::schema::motif::{EncounterStage, MotifEntry};
pub use crate::schema::request::{SelectedMotif, SelectionOutcome, SelectionRequest};
