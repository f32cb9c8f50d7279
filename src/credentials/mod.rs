//! Credential persistence.
//!
//! # Data Flow
//! ```text
//! login / register / refresh
//!     → CredentialStore::save_pair / set_access_token
//!     → MemoryStore (process lifetime) or FileStore (JSON on disk)
//!
//! every outbound request
//!     → CredentialStore::access_token (bearer header)
//!
//! logout / refresh failure / missing refresh token
//!     → CredentialStore::clear
//! ```

pub mod store;

use serde::{Deserialize, Serialize};

pub use store::{CredentialStore, FileStore, MemoryStore};

/// Key of the access credential.
pub const ACCESS_TOKEN_KEY: &str = "bf_token";

/// Key of the refresh credential.
pub const REFRESH_TOKEN_KEY: &str = "bf_refresh_token";

/// Onboarding flag cleared on every login. Unrelated to authorization.
pub const TOUR_COMPLETED_KEY: &str = "bizflow_tour_completed";

/// Access and refresh credentials issued together by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}
