//! # State Files
//!
//! Reading and writing States on disk, as pretty JSON or binary snapshots.
//!
//! Reading detects the format from the snapshot magic bytes, so every
//! command accepts either. Input paths are canonicalized and size-checked
//! before any bytes are read.

use grower_core::primitives::MAGIC_BYTES;
use grower_core::{GrowerError, State, state_from_bytes, state_to_bytes};
use std::path::{Path, PathBuf};

/// Maximum size of a State file (64 MB).
pub const MAX_STATE_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// On-disk encoding of a State.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    /// Pretty-printed JSON.
    Json,
    /// `GROW` header followed by the postcard payload.
    Snapshot,
}

impl StateFormat {
    /// Detect the format from file contents.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(MAGIC_BYTES) {
            Self::Snapshot
        } else {
            Self::Json
        }
    }

    /// Lowercase name for output.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Snapshot => "snapshot",
        }
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> GrowerError {
    GrowerError::IoError(format!("{} '{}': {}", action, path.display(), e))
}

/// Resolve `path` to an existing regular file of at most `limit` bytes.
///
/// Symlinks and `..` are resolved before anything is opened.
fn resolve_input(path: &Path, limit: u64) -> Result<PathBuf, GrowerError> {
    let resolved = path
        .canonicalize()
        .map_err(|e| io_error("Cannot resolve state file", path, e))?;
    let metadata =
        std::fs::metadata(&resolved).map_err(|e| io_error("Cannot stat state file", path, e))?;

    if !metadata.is_file() {
        return Err(GrowerError::IoError(format!(
            "'{}' is not a State file",
            path.display()
        )));
    }
    if metadata.len() > limit {
        return Err(GrowerError::DeserializationError(format!(
            "'{}' is {} bytes, over the {} byte State file limit",
            path.display(),
            metadata.len(),
            limit
        )));
    }
    Ok(resolved)
}

/// Resolve where a State will be written. The directory must already exist.
fn resolve_output(path: &Path) -> Result<PathBuf, GrowerError> {
    let name = path.file_name().ok_or_else(|| {
        GrowerError::IoError(format!("'{}' does not name a file", path.display()))
    })?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let dir = dir
        .canonicalize()
        .map_err(|e| io_error("Cannot resolve output directory", dir, e))?;
    if !dir.is_dir() {
        return Err(GrowerError::IoError(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }
    Ok(dir.join(name))
}

/// Read and validate a State in either format.
pub fn read_state(path: &Path) -> Result<(State, StateFormat), GrowerError> {
    let path = resolve_input(path, MAX_STATE_FILE_SIZE)?;

    let bytes = std::fs::read(&path)
        .map_err(|e| GrowerError::IoError(format!("Cannot read '{}': {}", path.display(), e)))?;

    let format = StateFormat::detect(&bytes);
    let state = match format {
        StateFormat::Snapshot => state_from_bytes(&bytes)?,
        StateFormat::Json => {
            let state: State = serde_json::from_slice(&bytes)
                .map_err(|e| GrowerError::DeserializationError(e.to_string()))?;
            state.validate()?;
            state
        }
    };

    tracing::debug!(path = %path.display(), ?format, "loaded state");
    Ok((state, format))
}

/// Write a State in `format`, replacing any existing file.
pub fn write_state(state: &State, path: &Path, format: StateFormat) -> Result<(), GrowerError> {
    let path = resolve_output(path)?;

    let bytes = match format {
        StateFormat::Json => {
            let mut text = serde_json::to_vec_pretty(state)
                .map_err(|e| GrowerError::SerializationError(e.to_string()))?;
            text.push(b'\n');
            text
        }
        StateFormat::Snapshot => state_to_bytes(state)?,
    };

    std::fs::write(&path, bytes)
        .map_err(|e| GrowerError::IoError(format!("Cannot write '{}': {}", path.display(), e)))?;

    tracing::debug!(path = %path.display(), ?format, "saved state");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
