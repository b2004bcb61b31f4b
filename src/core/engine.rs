/// The motif engine: catalog + history loaded once, selection on demand,
/// usage recorded and persisted after each completed session.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::catalog::{Catalog, CatalogError};
use crate::core::config::{ConfigError, EngineConfig};
use crate::core::history_store::{self, HistoryError};
use crate::core::selector::{SelectionError, Selector};
use crate::core::updater::HistoryUpdater;
use crate::schema::history::{HistoryState, SessionStamp};
use crate::schema::motif::MotifEntry;
use crate::schema::request::{SelectedMotif, SelectionOutcome, SelectionRequest};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no catalog provided")]
    MissingCatalog,
}

/// Selection engine for one listener. Built via `MotifEngine::builder()`.
pub struct MotifEngine {
    config: EngineConfig,
    catalog: Catalog,
    history: HistoryState,
    history_path: Option<PathBuf>,
}

/// Builder for constructing a `MotifEngine`.
pub struct MotifEngineBuilder {
    config: EngineConfig,
    config_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
    history_path: Option<PathBuf>,
    /// Directly provided catalog entries (for testing without files).
    entries: Option<Vec<MotifEntry>>,
    /// Directly provided history (for testing without files).
    history: Option<HistoryState>,
}

impl MotifEngine {
    pub fn builder() -> MotifEngineBuilder {
        MotifEngineBuilder {
            config: EngineConfig::default(),
            config_path: None,
            catalog_path: None,
            history_path: None,
            entries: None,
            history: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    /// Select motifs for a new session. Has no side effects.
    pub fn select(&self, req: &SelectionRequest) -> Result<SelectionOutcome, EngineError> {
        Ok(Selector::new(&self.config).select(&self.catalog, req, &self.history)?)
    }

    /// Record the motifs a completed session used and persist the result
    /// when a history path is configured.
    pub fn record_session(
        &mut self,
        session: &SessionStamp,
        used: &[SelectedMotif],
    ) -> Result<(), EngineError> {
        let updater = HistoryUpdater::new(&self.config);
        let updated = updater.record_usage(self.history.clone(), session, used);
        self.commit(updated)
    }

    /// Same as [`record_session`](Self::record_session), from bare motif ids.
    pub fn record_session_ids<S: AsRef<str>>(
        &mut self,
        session: &SessionStamp,
        ids: &[S],
    ) -> Result<(), EngineError> {
        let updater = HistoryUpdater::new(&self.config);
        let updated = updater.record_usage_by_id(self.history.clone(), session, ids, &self.catalog);
        self.commit(updated)
    }

    // Persist first so in-memory state never runs ahead of the file.
    fn commit(&mut self, updated: HistoryState) -> Result<(), EngineError> {
        if let Some(path) = &self.history_path {
            history_store::save_history(path, &updated)?;
        }
        self.history = updated;
        Ok(())
    }
}

impl MotifEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn catalog_path(mut self, path: impl AsRef<Path>) -> Self {
        self.catalog_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn history_path(mut self, path: impl AsRef<Path>) -> Self {
        self.history_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide catalog entries directly (for testing without files).
    pub fn with_entries(mut self, entries: Vec<MotifEntry>) -> Self {
        self.entries = Some(entries);
        self
    }

    /// Provide history directly. Overrides loading from `history_path`,
    /// which is still used for saving.
    pub fn with_history(mut self, history: HistoryState) -> Self {
        self.history = Some(history);
        self
    }

    pub fn build(self) -> Result<MotifEngine, EngineError> {
        let config = match &self.config_path {
            Some(path) => EngineConfig::load_from_ron(path)?,
            None => {
                self.config.validate()?;
                self.config
            }
        };

        let catalog = match (self.entries, &self.catalog_path) {
            (Some(entries), _) => Catalog::from_entries(entries, &config)?,
            (None, Some(path)) => Catalog::load_from_ron(path, &config)?,
            (None, None) => return Err(EngineError::MissingCatalog),
        };

        let history = match (self.history, &self.history_path) {
            (Some(history), _) => history,
            (None, Some(path)) => history_store::load_history_with(path, &config.thresholds)?,
            (None, None) => HistoryState::default(),
        };

        Ok(MotifEngine {
            config,
            catalog,
            history,
            history_path: self.history_path,
        })
    }
}
