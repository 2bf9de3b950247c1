use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub saved_at_utc: String,
}

/// Bearer token shared by every request, optionally mirrored to a file so a
/// session survives restarts. Clones share the same token.
#[derive(Clone, Debug, Default)]
pub struct TokenStore {
    path: Option<PathBuf>,
    current: Arc<Mutex<Option<StoredToken>>>,
}

impl TokenStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a file-backed store, picking up a token saved by an earlier run.
    pub fn persistent(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let current = read_token_file(&path)?;
        Ok(Self {
            path: Some(path),
            current: Arc::new(Mutex::new(current)),
        })
    }

    pub fn get(&self) -> Option<String> {
        self.current
            .lock()
            .ok()
            .and_then(|g| g.as_ref().map(|t| t.access_token.clone()))
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    pub fn set(&self, access_token: &str, token_type: &str) -> io::Result<()> {
        let token = StoredToken {
            access_token: access_token.to_string(),
            token_type: token_type.to_string(),
            saved_at_utc: Utc::now().to_rfc3339(),
        };
        if let Some(path) = &self.path {
            write_token_file(path, &token)?;
        }
        if let Ok(mut guard) = self.current.lock() {
            *guard = Some(token);
        }
        Ok(())
    }

    pub fn clear(&self) -> io::Result<()> {
        if let Ok(mut guard) = self.current.lock() {
            *guard = None;
        }
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)?;
                debug!("removed {}", path.display());
            }
        }
        Ok(())
    }
}

fn read_token_file(path: &Path) -> io::Result<Option<StoredToken>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid {}: {e}", path.display())))
}

fn write_token_file(path: &Path, token: &StoredToken) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(token)?;
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // Owner-only, even when the file predates this run.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(payload.as_bytes())?;
    file.flush()
}
