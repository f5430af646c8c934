use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};

/// Persisted outcome of a completed authorization flow.
///
/// Written wholesale by the Authorizer and read once at Extractor startup.
/// The expiry fields are provider metadata carried along for the operator's
/// benefit; nothing in this tool enforces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Bearer credential presented on every API read.
    pub access_token: String,
    /// Opaque refresh credential; persisted but never used further.
    pub refresh_token: String,
    /// Provider-assigned tenant the token is scoped to.
    pub realm_id: String,
    /// Access token lifetime in seconds, as reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Refresh token lifetime in seconds, as reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_refresh_token_expires_in: Option<u64>,
}

/// File-backed credential store holding exactly one [`TokenRecord`].
///
/// Single writer, single reader: the Authorizer saves, the Extractor
/// loads, and the two are never run concurrently.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store handle over the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted record.
    ///
    /// A missing file is surfaced as [`ToolError::MissingToken`] so the
    /// operator is pointed at the authorize step.
    pub fn load(&self) -> Result<TokenRecord> {
        if !self.path.exists() {
            return Err(ToolError::MissingToken(self.path.clone()));
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Writes the record, fully replacing any prior content.
    pub fn save(&self, record: &TokenRecord) -> Result<()> {
        let data = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(access: &str) -> TokenRecord {
        TokenRecord {
            access_token: access.to_string(),
            refresh_token: "refresh".to_string(),
            realm_id: "1234".to_string(),
            expires_in: Some(3600),
            x_refresh_token_expires_in: Some(8_726_400),
        }
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().expect("temporary directory");
        let store = TokenStore::new(dir.path().join("token.json"));
        let record = sample("first");
        store.save(&record).expect("token saved");
        assert_eq!(store.load().expect("token loaded"), record);
    }

    #[test]
    fn save_overwrites_prior_content() {
        let dir = tempdir().expect("temporary directory");
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample("first")).expect("first save");
        store.save(&sample("second")).expect("second save");
        let loaded = store.load().expect("token loaded");
        assert_eq!(loaded.access_token, "second");
        let raw = fs::read_to_string(store.path()).expect("raw file");
        assert!(!raw.contains("first"));
    }

    #[test]
    fn load_without_file_names_the_path() {
        let dir = tempdir().expect("temporary directory");
        let store = TokenStore::new(dir.path().join("token.json"));
        let error = store.load().expect_err("missing file should fail");
        assert!(matches!(error, ToolError::MissingToken(_)));
    }
}
