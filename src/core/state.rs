use crate::error::Result;
use crate::utils::fs;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Last-seen update identifier per channel, kept in a small JSON file.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole mapping. A missing file is an empty store.
    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn last_seen(&self, channel: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(channel))
    }

    /// Stores `update_id` for `channel`, keeping every other channel as is.
    pub fn record(&self, channel: &str, update_id: &str) -> Result<()> {
        let mut state = self.load()?;
        state.insert(channel.to_string(), update_id.to_string());

        debug!(channel, update_id, path = %self.path.display(), "recording state");
        fs::write_atomic(&self.path, &to_pretty_json(&state)?)
    }
}

/// Pretty JSON with four-space indentation.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path().join("built.json"));
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.last_seen("beta").unwrap(), None);
    }

    #[test]
    fn test_record_preserves_other_channels() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("built.json");
        std::fs::write(&path, r#"{"retail": "r1", "beta": "abc"}"#).unwrap();

        let store = StateStore::new(&path);
        store.record("beta", "xyz").unwrap();

        assert_eq!(store.last_seen("beta").unwrap().as_deref(), Some("xyz"));
        assert_eq!(store.last_seen("retail").unwrap().as_deref(), Some("r1"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\n    \"beta\": \"xyz\",\n    \"retail\": \"r1\"\n}\n"
        );
    }

    #[test]
    fn test_record_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("built.json");
        let store = StateStore::new(&path);

        store.record("beta", "xyz").unwrap();
        let first = std::fs::read(&path).unwrap();
        store.record("beta", "xyz").unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }
}
