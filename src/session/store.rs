//! Client-local persistence for the last credential that signed in.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key under which the credential is remembered
pub const CREDENTIAL_KEY: &str = "flexhire.apiKey";

const STORE_FILE: &str = "session_store.json";

/// Opaque string key-value store
pub trait CredentialStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<(), String>;
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| "store lock poisoned".to_string())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, one string entry per key
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Store in the data directory
    pub fn in_data_dir() -> Result<Self, String> {
        let data_dir = crate::modules::get_data_dir()?;
        Ok(Self::new(data_dir.join(STORE_FILE)))
    }

    fn read_entries(&self) -> Result<HashMap<String, String>, String> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read store file: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse store file: {}", e))
    }
}

impl CredentialStore for JsonFileStore {
    fn load(&self, key: &str) -> Option<String> {
        match self.read_entries() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), String> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| "store lock poisoned".to_string())?;

        // An unreadable file is replaced rather than blocking sign-in
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());

        let content = serde_json::to_string_pretty(&entries)
            .map_err(|e| format!("Failed to serialize store: {}", e))?;

        write_private(&self.path, &content).map_err(|e| format!("Failed to save store: {}", e))
    }
}

/// Write `content` readable by the owner only on Unix
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::with_entry(CREDENTIAL_KEY, "abc123");
        assert_eq!(store.load(CREDENTIAL_KEY).as_deref(), Some("abc123"));
        store.save(CREDENTIAL_KEY, "def456").unwrap();
        assert_eq!(store.load(CREDENTIAL_KEY).as_deref(), Some("def456"));
        assert_eq!(store.load("other"), None);
    }

    #[test]
    fn test_file_store_round_trip_and_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE);
        let store = JsonFileStore::new(path.clone());

        assert_eq!(store.load(CREDENTIAL_KEY), None);
        store.save("theme", "dark").unwrap();
        store.save(CREDENTIAL_KEY, "abc123").unwrap();

        let reopened = JsonFileStore::new(path);
        assert_eq!(reopened.load(CREDENTIAL_KEY).as_deref(), Some("abc123"));
        assert_eq!(reopened.load("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE);
        fs::write(&path, "not json").unwrap();
        let store = JsonFileStore::new(path);

        assert_eq!(store.load(CREDENTIAL_KEY), None);
        store.save(CREDENTIAL_KEY, "abc123").unwrap();
        assert_eq!(store.load(CREDENTIAL_KEY).as_deref(), Some("abc123"));
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE);
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        JsonFileStore::new(path.clone()).save(CREDENTIAL_KEY, "abc123").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
