//! Key registry for values that must not live in configuration files
//!
//! Lookups consult the process environment first and then a YAML file that
//! maps each key to a list of stored values (the first one is current).
//! The file is read and rewritten as a whole on every mutation. There is no
//! locking: with concurrent writers the last one wins.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::env::{self, VarError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};

pub(crate) mod provenance;

pub use provenance::{
    get_required_registration, required_registrations, Provenance, Registrations,
};

/// Environment variable naming the registry file when none was set in-process.
pub const REGISTRY_FILE_ENV: &str = "YAMLPARSER_REGISTRY";

/// Persisted registry content: key to stored values, current value first.
pub type RegistryContent = BTreeMap<String, Vec<String>>;

static REGISTRY_FILE: Lazy<RwLock<Option<PathBuf>>> = Lazy::new(|| RwLock::new(None));

/// Select the registry file used by [`Registry::global`] for this process.
pub fn set_registry_file(path: impl Into<PathBuf>) {
    let mut guard = REGISTRY_FILE.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(path.into());
}

/// The registry file in effect: the one set in-process, else the default.
pub fn registry_file() -> PathBuf {
    let guard = REGISTRY_FILE.read().unwrap_or_else(PoisonError::into_inner);
    guard.clone().unwrap_or_else(default_registry_path)
}

pub fn default_registry_path() -> PathBuf {
    if let Some(path) = env::var_os(REGISTRY_FILE_ENV) {
        return PathBuf::from(path);
    }
    let config_dir = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
    match config_dir {
        Some(dir) => dir.join("yamlparser").join("registry.yaml"),
        None => PathBuf::from(".yamlparser_registry.yaml"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry backed by the process-wide registry file.
    pub fn global() -> Self {
        Self::new(registry_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current value for `key`: environment first, then the file.
    pub fn lookup(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = env_value(key) {
            return Ok(Some(value));
        }
        let content = self.content()?;
        Ok(content.get(key).and_then(|values| values.first().cloned()))
    }

    pub fn get(&self, key: &str) -> Result<String> {
        self.lookup(key)?.ok_or_else(|| Error::RegistryKeyNotFound {
            key: key.to_string(),
            registry: self.path.clone(),
        })
    }

    pub fn get_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.lookup(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Store `value` as the current value of `key`. Earlier distinct values
    /// are kept after it.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut content = self.content()?;
        let values = content.entry(key.to_string()).or_default();
        values.retain(|v| v != value);
        values.insert(0, value.to_string());
        self.write(&content)?;
        tracing::info!("Registered '{}' in {}", key, self.path.display());
        Ok(())
    }

    /// Remove every stored value of `key`. Deleting an absent key is an
    /// error. Environment variables are never touched.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut content = self.content()?;
        if content.remove(key).is_none() {
            return Err(Error::RegistryKeyNotFound {
                key: key.to_string(),
                registry: self.path.clone(),
            });
        }
        self.write(&content)?;
        tracing::info!("Deleted '{}' from {}", key, self.path.display());
        Ok(())
    }

    /// Everything stored in the file. A missing or empty file is empty.
    pub fn content(&self) -> Result<RegistryContent> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RegistryContent::new()),
            Err(e) => return Err(Error::io(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(RegistryContent::new());
        }
        serde_yaml::from_str(&text)
            .map_err(|e| Error::Parse { path: self.path.clone(), reason: e.to_string() })
    }

    fn write(&self, content: &RegistryContent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }
        let text = serde_yaml::to_string(content)
            .map_err(|e| Error::Serialize { path: self.path.clone(), reason: e.to_string() })?;
        fs::write(&self.path, text).map_err(|e| Error::io(&self.path, e))
    }
}

fn env_value(key: &str) -> Option<String> {
    if key.is_empty() || key.contains(['=', '\0']) {
        return None;
    }
    match env::var(key) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(_)) => {
            tracing::warn!("Ignoring non-unicode environment variable {}", key);
            None
        }
    }
}

pub fn get_registered_variable(key: &str) -> Result<String> {
    Registry::global().get(key)
}

pub fn get_registered_variable_or(key: &str, default: &str) -> Result<String> {
    Registry::global().get_or(key, default)
}

pub fn set_registered_variable(key: &str, value: &str) -> Result<()> {
    Registry::global().set(key, value)
}

pub fn delete_registered_variable(key: &str) -> Result<()> {
    Registry::global().delete(key)
}

pub fn registry_content() -> Result<RegistryContent> {
    Registry::global().content()
}
