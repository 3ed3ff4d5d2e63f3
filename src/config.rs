//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then `<state dir>/config.json` if
//! present, then `FATECRAFT_*` environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::{MockAuthProvider, SessionStore};
use crate::storage::{FileStorage, MemoryStorage, SharedStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the persisted session and the optional config.json.
    /// Comes from `FATECRAFT_STATE_DIR` only, never from the file it locates.
    #[serde(skip)]
    pub state_dir: PathBuf,
    pub storage: StorageKind,
    /// Simulated provider latency for sign-in and sign-up.
    pub sign_in_delay_ms: u64,
    pub sign_out_delay_ms: u64,
    /// Give up on a provider call after this long. None waits indefinitely.
    pub auth_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".fatecraft"),
            storage: StorageKind::File,
            sign_in_delay_ms: 500,
            sign_out_delay_ms: 200,
            auth_timeout_ms: None,
        }
    }
}

impl Config {
    pub const FILE_NAME: &'static str = "config.json";

    /// Resolve configuration from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let state_dir = lookup("FATECRAFT_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| Config::default().state_dir);
        let mut cfg = Self::load_file(&state_dir)?;
        cfg.state_dir = state_dir;

        if let Some(v) = lookup("FATECRAFT_STORAGE") {
            cfg.storage = match v.trim().to_ascii_lowercase().as_str() {
                "file" => StorageKind::File,
                "memory" => StorageKind::Memory,
                other => return Err(anyhow!("FATECRAFT_STORAGE must be 'file' or 'memory', got '{}'", other)),
            };
        }
        if let Some(ms) = parse_ms(&lookup, "FATECRAFT_SIGNIN_DELAY_MS")? { cfg.sign_in_delay_ms = ms; }
        if let Some(ms) = parse_ms(&lookup, "FATECRAFT_SIGNOUT_DELAY_MS")? { cfg.sign_out_delay_ms = ms; }
        if let Some(ms) = parse_ms(&lookup, "FATECRAFT_AUTH_TIMEOUT_MS")? {
            cfg.auth_timeout_ms = if ms == 0 { None } else { Some(ms) };
        }
        Ok(cfg)
    }

    /// Read `<dir>/config.json`, or defaults when the file does not exist.
    pub fn load_file(dir: &Path) -> Result<Self> {
        let path = dir.join(Self::FILE_NAME);
        match std::fs::read(&path) {
            Ok(bytes) => {
                let mut cfg = serde_json::from_slice::<Config>(&bytes)
                    .with_context(|| format!("invalid config file '{}'", path.display()))?;
                cfg.state_dir = dir.to_path_buf();
                debug!(target: "fatecraft::config", "loaded '{}'", path.display());
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self { state_dir: dir.to_path_buf(), ..Self::default() }),
            Err(e) => Err(e).with_context(|| format!("reading '{}'", path.display())),
        }
    }

    pub fn auth_timeout(&self) -> Option<Duration> { self.auth_timeout_ms.map(Duration::from_millis) }

    pub fn provider(&self) -> MockAuthProvider {
        MockAuthProvider::with_latency(
            Duration::from_millis(self.sign_in_delay_ms),
            Duration::from_millis(self.sign_out_delay_ms),
        )
    }

    pub fn open_storage(&self) -> Result<SharedStorage> {
        Ok(match self.storage {
            StorageKind::File => {
                let fs = FileStorage::open(&self.state_dir)
                    .with_context(|| format!("opening state dir '{}'", self.state_dir.display()))?;
                Arc::new(fs)
            }
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
        })
    }

    /// Session store wired from this configuration.
    pub fn build_store(&self) -> Result<SessionStore> {
        Ok(SessionStore::builder(self.open_storage()?)
            .provider(Arc::new(self.provider()))
            .auth_timeout(self.auth_timeout())
            .build())
    }
}

fn parse_ms<F>(lookup: &F, name: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{} must be a whole number of milliseconds, got '{}'", name, v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_string_lossy().to_string();
        let cfg = Config::from_vars(vars(&[("FATECRAFT_STATE_DIR", &dir)])).unwrap();
        assert_eq!(cfg.state_dir, tmp.path());
        assert_eq!(cfg.storage, StorageKind::File);
        assert_eq!(cfg.sign_in_delay_ms, 500);
        assert_eq!(cfg.sign_out_delay_ms, 200);
        assert_eq!(cfg.auth_timeout(), None);
    }

    #[test]
    fn env_overrides_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.json"), r#"{"sign_in_delay_ms": 50, "storage": "memory"}"#).unwrap();
        let dir = tmp.path().to_string_lossy().to_string();
        let cfg = Config::from_vars(vars(&[
            ("FATECRAFT_STATE_DIR", &dir),
            ("FATECRAFT_SIGNOUT_DELAY_MS", "0"),
            ("FATECRAFT_AUTH_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(cfg.sign_in_delay_ms, 50);
        assert_eq!(cfg.sign_out_delay_ms, 0);
        assert_eq!(cfg.storage, StorageKind::Memory);
        assert_eq!(cfg.auth_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn bad_values_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_string_lossy().to_string();
        let err = Config::from_vars(vars(&[("FATECRAFT_STATE_DIR", &dir), ("FATECRAFT_SIGNIN_DELAY_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("FATECRAFT_SIGNIN_DELAY_MS"));
        assert!(Config::from_vars(vars(&[("FATECRAFT_STATE_DIR", &dir), ("FATECRAFT_STORAGE", "s3")])).is_err());

        std::fs::write(tmp.path().join("config.json"), "{ nope").unwrap();
        assert!(Config::from_vars(vars(&[("FATECRAFT_STATE_DIR", &dir)])).is_err());
    }

    #[test]
    fn state_dir_in_file_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.json"), r#"{"state_dir": "/elsewhere", "sign_out_delay_ms": 10}"#).unwrap();
        let cfg = Config::load_file(tmp.path()).unwrap();
        assert_eq!(cfg.state_dir, tmp.path());
        assert_eq!(cfg.sign_out_delay_ms, 10);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_string_lossy().to_string();
        let cfg = Config::from_vars(vars(&[("FATECRAFT_STATE_DIR", &dir), ("FATECRAFT_AUTH_TIMEOUT_MS", "0")])).unwrap();
        assert_eq!(cfg.auth_timeout_ms, None);
    }
}
