//! Key/value settings the generator reads (`ENABLE_AI`, API keys).

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// "1" enables the LLM path; anything else forces the template fallback.
pub const ENABLE_AI: &str = "ENABLE_AI";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const HF_API_TOKEN: &str = "HF_API_TOKEN";

pub fn postwright_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".postwright")
}

pub fn default_settings_path() -> PathBuf {
    postwright_dir().join("settings.json")
}

pub trait SettingsStore: Send + Sync {
    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettings {
    pub fn with(pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            values: Mutex::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::settings("settings lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::settings("settings lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object. The file is created on first write.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(s) => serde_json::from_str(&s).map_err(|e| {
                Error::settings(format!("corrupt settings file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SettingsStore for FileSettings {
    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::settings("settings lock poisoned"))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::settings("settings lock poisoned"))?;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip() {
        let store = MemorySettings::with([(ENABLE_AI, "1")]);
        assert_eq!(store.get_setting(ENABLE_AI).unwrap().as_deref(), Some("1"));
        assert_eq!(store.get_setting(OPENAI_API_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettings::new(dir.path().join("nested/settings.json"));
        assert_eq!(store.get_setting(ENABLE_AI).unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        FileSettings::new(&path).set_setting(ENABLE_AI, "1").unwrap();
        FileSettings::new(&path)
            .set_setting(HF_API_TOKEN, "hf_abc")
            .unwrap();

        let reopened = FileSettings::new(&path);
        assert_eq!(reopened.get_setting(ENABLE_AI).unwrap().as_deref(), Some("1"));
        assert_eq!(
            reopened.get_setting(HF_API_TOKEN).unwrap().as_deref(),
            Some("hf_abc")
        );
    }

    #[test]
    fn corrupt_file_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        let err = FileSettings::new(&path).get_setting(ENABLE_AI).unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }
}
