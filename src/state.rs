use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::db::{DealDb, WorkspaceSnapshot};
use crate::error::DealError;
use crate::types::{Config, SyncState};

/// Per-workspace mutual exclusion for reconciliation passes.
///
/// Each pass loads a whole workspace, works in memory and writes the whole
/// workspace back, so two passes on one workspace must not interleave.
#[derive(Default)]
pub struct WorkspaceLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WorkspaceLocks {
    /// The lock guarding `workspace_id`, created on first use.
    pub fn lock_for(&self, workspace_id: &str) -> Arc<Mutex<()>> {
        let mut guard = self.locks.lock();
        guard
            .entry(workspace_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Process-wide state shared by the CLI commands.
pub struct AppState {
    pub config: Mutex<Config>,
    pub config_path: PathBuf,
    pub db: Mutex<DealDb>,
    pub locks: WorkspaceLocks,
}

impl AppState {
    /// Load config (defaults when the file is missing) and open the database.
    pub fn open(config_override: Option<PathBuf>) -> Result<Self, DealError> {
        let config_path = match config_override {
            Some(path) => path,
            None => config_path()?,
        };
        let config = load_config(&config_path)?;
        let db_path = resolve_db_path(&config)?;
        let db = DealDb::open_at(db_path)?;
        Ok(Self::with_parts(config, config_path, db))
    }

    pub fn with_parts(config: Config, config_path: PathBuf, db: DealDb) -> Self {
        Self {
            config: Mutex::new(config),
            config_path,
            db: Mutex::new(db),
            locks: WorkspaceLocks::default(),
        }
    }

    /// Clone of the current config.
    pub fn config(&self) -> Config {
        self.config.lock().clone()
    }

    /// Google token file from config, or the default location.
    pub fn token_path(&self) -> PathBuf {
        match self.config.lock().google_token_path.as_deref() {
            Some(p) if !p.trim().is_empty() => expand_home(p),
            _ => crate::google_api::default_token_path(),
        }
    }

    /// Workspace from an explicit argument or the configured default.
    pub fn workspace_or_default(&self, workspace: Option<&str>) -> String {
        match workspace.map(str::trim).filter(|w| !w.is_empty()) {
            Some(w) => w.to_string(),
            None => self.config.lock().default_workspace.clone(),
        }
    }
}

// =============================================================================
// Config file
// =============================================================================

/// Default config location: `~/.dealgraph/config.json`.
pub fn config_path() -> Result<PathBuf, DealError> {
    let home = dirs::home_dir().ok_or_else(|| DealError::Config("Could not find home directory".into()))?;
    Ok(home.join(".dealgraph").join("config.json"))
}

/// Load configuration. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<Config, DealError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| DealError::Config(format!("Failed to read config: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| DealError::Config(format!("Failed to parse config: {}", e)))
}

/// Apply `mutator` to the in-memory config and write it back atomically.
pub fn create_or_update_config(
    state: &AppState,
    mutator: impl FnOnce(&mut Config),
) -> Result<Config, DealError> {
    let mut guard = state.config.lock();
    let mut config = guard.clone();
    mutator(&mut config);

    let content = serde_json::to_string_pretty(&config)
        .map_err(|e| DealError::Config(format!("Failed to serialize config: {}", e)))?;
    crate::util::atomic_write_str(&state.config_path, &content)?;

    *guard = config.clone();
    Ok(config)
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().unwrap_or_default().join(rest),
        None => PathBuf::from(raw),
    }
}

fn resolve_db_path(config: &Config) -> Result<PathBuf, DealError> {
    match config.database_path.as_deref() {
        Some(p) if !p.trim().is_empty() => Ok(expand_home(p)),
        _ => Ok(DealDb::default_path()?),
    }
}

// =============================================================================
// Reconciliation passes
// =============================================================================

/// Run `f` against an in-memory snapshot of a workspace and commit the result.
///
/// The workspace lock is held for the whole pass. The database lock is held
/// only while loading and committing. An `Err` from `f` discards the snapshot.
pub fn with_workspace<T>(
    state: &AppState,
    workspace_id: &str,
    f: impl FnOnce(&mut WorkspaceSnapshot) -> Result<T, DealError>,
) -> Result<T, DealError> {
    with_workspace_sync(state, workspace_id, |snapshot| Ok((f(snapshot)?, None)))
}

/// As [`with_workspace`], also committing the sync state `f` returns in the
/// same transaction.
pub fn with_workspace_sync<T>(
    state: &AppState,
    workspace_id: &str,
    f: impl FnOnce(&mut WorkspaceSnapshot) -> Result<(T, Option<SyncState>), DealError>,
) -> Result<T, DealError> {
    let lock = state.locks.lock_for(workspace_id);
    let _held = lock.lock();

    let mut snapshot = {
        let db = state.db.lock();
        if !db.workspace_exists(workspace_id)? {
            return Err(DealError::not_found("workspace", workspace_id));
        }
        db.load_snapshot(workspace_id)?
    };

    let (value, sync) = f(&mut snapshot)?;

    state.db.lock().commit_snapshot(&snapshot, sync.as_ref())?;
    Ok(value)
}

/// Read-only snapshot of a workspace.
pub fn read_workspace(state: &AppState, workspace_id: &str) -> Result<WorkspaceSnapshot, DealError> {
    let db = state.db.lock();
    if !db.workspace_exists(workspace_id)? {
        return Err(DealError::not_found("workspace", workspace_id));
    }
    Ok(db.load_snapshot(workspace_id)?)
}
