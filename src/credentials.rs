//! Persisted API credential.
//!
//! The store is a single named entry in a small JSON key-value file, the
//! on-disk counterpart of browser local storage. Only the wizard session
//! reads it; the completion client receives the loaded [`Credential`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::error::{Result, WizardError};

/// Key under which the credential is persisted.
pub const CREDENTIAL_KEY: &str = "openaiApiKey";

/// Non-empty API token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank tokens; a credential is either absent or non-empty.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short form for status output, e.g. `sk-t…test`.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "…".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

pub trait CredentialStore: Send + Sync {
    /// Called once at session start.
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// File-backed store shared by every session on this machine
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) | Err(_) => Err(WizardError::Storage {
                message: format!("{} is not a JSON object", self.path.display()),
            }),
        }
    }

    /// Entries for a rewrite; an unreadable file is replaced rather than kept.
    fn entries_for_write(&self) -> Result<Map<String, Value>> {
        match self.read_entries() {
            Ok(entries) => Ok(entries),
            Err(WizardError::Storage { message }) => {
                tracing::warn!("resetting unreadable credential store: {}", message);
                Ok(Map::new())
            }
            Err(e) => Err(e),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(entries).map_err(|e| WizardError::Storage {
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(CREDENTIAL_KEY)
            .and_then(|v| v.as_str())
            .and_then(Credential::new))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let mut entries = self.entries_for_write()?;
        entries.insert(
            CREDENTIAL_KEY.to_string(),
            Value::String(credential.expose().to_string()),
        );
        self.write_entries(&entries)?;
        tracing::info!(path = %self.path.display(), "credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries_for_write()?;
        entries.remove(CREDENTIAL_KEY);
        self.write_entries(&entries)?;
        tracing::info!(path = %self.path.display(), "credential cleared");
        Ok(())
    }
}

/// In-process store for tests and embedders that manage persistence themselves
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        // A poisoned slot still holds a valid Option.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot().clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
