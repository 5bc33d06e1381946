//! Credential store implementations

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};

use crate::KeystoreError;

/// Check that a credential looks like an API key
///
/// Accepts exactly values starting with `sk-` or `Bearer `.
pub fn validate_api_key(value: &str) -> Result<(), KeystoreError> {
    debug!(len = value.len(), "validate_api_key: called");
    if value.starts_with("sk-") || value.starts_with("Bearer ") {
        Ok(())
    } else {
        debug!("validate_api_key: rejected");
        Err(KeystoreError::InvalidFormat)
    }
}

/// Key/value storage for credentials
pub trait CredentialStore: Send {
    /// Fetch a stored value, `None` when the key was never set
    fn get(&self, key: &str) -> Result<Option<String>, KeystoreError>;

    /// Validate and persist a value
    fn set(&mut self, key: &str, value: &str) -> Result<(), KeystoreError>;
}

/// Credential store backed by a JSON file
///
/// The whole file is one JSON object. Writes take an exclusive lock,
/// reads a shared one.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Open a store at the given file path, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeystoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| KeystoreError::io(parent, e))?;
        }
        debug!(?path, "Opened credential store");
        Ok(Self { path })
    }

    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self, KeystoreError> {
        let dir = dirs::data_dir().ok_or(KeystoreError::NoDataDir)?;
        Self::open(dir.join("planframe").join(crate::DEFAULT_FILE_NAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge one entry into the locked file; a corrupt file is left as it was
    fn rewrite(&self, file: &mut File, key: &str, value: &str) -> Result<(), KeystoreError> {
        let io = |e: std::io::Error| KeystoreError::io(&self.path, e);

        let mut content = String::new();
        file.read_to_string(&mut content).map_err(io)?;
        let mut map = self.parse(&content)?;
        map.insert(key.to_string(), value.to_string());

        let serialized = serde_json::to_string_pretty(&map).map_err(|e| io(std::io::Error::other(e)))?;
        file.set_len(0).map_err(io)?;
        file.seek(SeekFrom::Start(0)).map_err(io)?;
        file.write_all(serialized.as_bytes()).map_err(io)?;
        file.sync_all().map_err(io)
    }

    fn parse(&self, content: &str) -> Result<BTreeMap<String, String>, KeystoreError> {
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(content).map_err(|source| KeystoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeystoreError> {
        debug!(%key, "FileCredentialStore::get: called");
        if !self.path.exists() {
            debug!("FileCredentialStore::get: no file yet");
            return Ok(None);
        }

        let mut file = File::open(&self.path).map_err(|e| KeystoreError::io(&self.path, e))?;
        file.lock_shared().map_err(|e| KeystoreError::io(&self.path, e))?;
        let mut content = String::new();
        let read = file.read_to_string(&mut content);
        let _ = FileExt::unlock(&file);
        read.map_err(|e| KeystoreError::io(&self.path, e))?;

        let map = self.parse(&content)?;
        Ok(map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KeystoreError> {
        debug!(%key, "FileCredentialStore::set: called");
        validate_api_key(value)?;

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|e| KeystoreError::io(&self.path, e))?;
        file.lock_exclusive().map_err(|e| KeystoreError::io(&self.path, e))?;

        let result = self.rewrite(&mut file, key, value);
        let _ = FileExt::unlock(&file);
        result?;

        // `mode` only applies on creation; tighten a file that already existed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| KeystoreError::io(&self.path, e))?;
        }

        info!(%key, "Stored credential");
        Ok(())
    }
}

/// In-process credential store
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    values: HashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeystoreError> {
        debug!(%key, "MemoryCredentialStore::get: called");
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KeystoreError> {
        debug!(%key, "MemoryCredentialStore::set: called");
        validate_api_key(value)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
