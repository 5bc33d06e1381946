//! KeyStore - small persistent credential store
//!
//! Holds API credentials between runs so a key only has to be verified once.
//! Values are checked with [`validate_api_key`] before they are written.
//!
//! # Layout
//!
//! ```text
//! ~/.local/share/planframe/
//! └── credentials.json    # {"openai-api-key": "sk-..."}
//! ```
//!
//! # Example
//!
//! ```ignore
//! use keystore::{CredentialStore, FileCredentialStore, OPENAI_API_KEY};
//!
//! let mut store = FileCredentialStore::open_default()?;
//! store.set(OPENAI_API_KEY, "sk-test")?;
//! assert_eq!(store.get(OPENAI_API_KEY)?.as_deref(), Some("sk-test"));
//! ```

mod error;
mod store;

pub use error::KeystoreError;
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, validate_api_key};

/// Storage key used for the OpenAI credential
pub const OPENAI_API_KEY: &str = "openai-api-key";

/// Default file name inside the data directory
pub const DEFAULT_FILE_NAME: &str = "credentials.json";
