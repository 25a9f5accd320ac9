//! Local state file.
//!
//! The store is written as its snapshot document. Writes go to a sibling
//! temp file first and are renamed into place, so a crash mid-write leaves
//! the previous file intact.

use statesync_engine::{Error as EngineError, StoreSnapshot};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read the snapshot at `path`. A missing file is `Ok(None)`.
///
/// The document is parsed but not validated; `RecordStore::import` does that.
pub async fn load_state(path: &Path) -> Result<Option<StoreSnapshot>, PersistError> {
    let json = match fs::read_to_string(path).await {
        Ok(json) => json,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state file");
            return Ok(None);
        }
        Err(err) => return Err(io_error(path)(err)),
    };

    Ok(Some(StoreSnapshot::from_json(&json)?))
}

/// Write `snapshot` to `path`, replacing any previous file.
pub async fn save_state(path: &Path, snapshot: &StoreSnapshot) -> Result<(), PersistError> {
    let json = snapshot.to_json_pretty()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_error(parent))?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).await.map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).await.map_err(io_error(path))?;

    debug!(path = %path.display(), records = snapshot.record_count(), "state saved");
    Ok(())
}
