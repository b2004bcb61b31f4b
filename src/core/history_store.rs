/// History persistence — RON on disk, replaced atomically on save.

use chrono::Utc;
use log::{info, warn};
use ron::ser::PrettyConfig;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::core::encounter::EncounterThresholds;
use crate::schema::history::HistoryState;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Load a listener's history. A missing file yields an empty history.
pub fn load_history(path: &Path) -> Result<HistoryState, HistoryError> {
    load_history_with(path, &EncounterThresholds::default())
}

/// Load a history written under `thresholds`. Every stored relationship
/// level must match the level those thresholds give its encounter count.
pub fn load_history_with(
    path: &Path,
    thresholds: &EncounterThresholds,
) -> Result<HistoryState, HistoryError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no history at {}, starting fresh", path.display());
            return Ok(HistoryState::default());
        }
        Err(e) => return Err(e.into()),
    };

    let state: HistoryState = ron::from_str(&contents).map_err(|e| HistoryError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    check_consistency(&state, thresholds).map_err(|reason| HistoryError::Corrupt {
        path: path.to_path_buf(),
        reason,
    })?;

    info!(
        "loaded history from {} ({} relationships, {} sessions)",
        path.display(),
        state.relationships.len(),
        state.sessions_recorded
    );
    Ok(state)
}

/// Load for read-only use: a corrupt file is reported alongside an empty
/// history instead of failing, so selection can still proceed.
pub fn load_or_default(path: &Path) -> (HistoryState, Option<HistoryError>) {
    match load_history(path) {
        Ok(state) => (state, None),
        Err(e) => {
            warn!("using empty history: {}", e);
            (HistoryState::default(), Some(e))
        }
    }
}

/// Write the history to a temp file next to `path`, then rename it over
/// `path`. A crash mid-write leaves the previous file intact.
pub fn save_history(path: &Path, state: &HistoryState) -> Result<(), HistoryError> {
    let text = ron::ser::to_string_pretty(state, PrettyConfig::default())?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(
        "saved history to {} ({} sessions)",
        path.display(),
        state.sessions_recorded
    );
    Ok(())
}

/// Move a corrupt history file aside as `<name>.corrupt-<timestamp>` and
/// return the new path. Only ever called at the caller's request.
pub fn quarantine(path: &Path) -> Result<PathBuf, HistoryError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "history".to_string());
    let backup = path.with_file_name(format!(
        "{}.corrupt-{}",
        file_name,
        Utc::now().format("%Y%m%dT%H%M%S")
    ));
    std::fs::rename(path, &backup)?;
    warn!(
        "moved corrupt history {} to {}",
        path.display(),
        backup.display()
    );
    Ok(backup)
}

fn check_consistency(state: &HistoryState, thresholds: &EncounterThresholds) -> Result<(), String> {
    for (key, record) in &state.relationships {
        if key != &record.motif_id {
            return Err(format!(
                "relationship keyed '{}' belongs to motif '{}'",
                key, record.motif_id
            ));
        }
        if record.encounter_history.len() as u64 > u64::from(record.total_encounters) {
            return Err(format!(
                "motif '{}' lists {} encounters but counts {}",
                key,
                record.encounter_history.len(),
                record.total_encounters
            ));
        }
        let expected = thresholds.level(record.total_encounters);
        if record.relationship_level() != expected {
            return Err(format!(
                "motif '{}' has relationship level {} but {} encounters give level {}",
                key,
                record.relationship_level(),
                record.total_encounters,
                expected
            ));
        }
    }
    Ok(())
}
