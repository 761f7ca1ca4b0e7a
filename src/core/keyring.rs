//! Persistent storage for the bearer token.
//!
//! The token lives in the platform keyring under a fixed service/entry pair.
//! A store built with keyring access disabled keeps the token in memory only.

use std::error::Error;
use std::fmt;
use std::sync::Mutex;

use keyring::Entry;
use tracing::{debug, warn};

const KEYRING_SERVICE: &str = "jerry";
const TOKEN_ENTRY: &str = "token";

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors indicate that the credential backend was
/// temporarily unavailable (for example when the keychain service is
/// locked or inaccessible). Permanent errors surface the underlying
/// cause directly so callers can report them to the user.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keyring unavailable: {}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

pub struct TokenStore {
    use_keyring: bool,
    memory: Mutex<Option<String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    /// Construct a store, optionally disabling keyring access (tests, env-only runs).
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self {
            use_keyring,
            memory: Mutex::new(None),
        }
    }

    pub fn uses_keyring(&self) -> bool {
        self.use_keyring
    }

    fn entry() -> Result<Entry, KeyringAccessError> {
        Entry::new(KEYRING_SERVICE, TOKEN_ENTRY).map_err(KeyringAccessError::from)
    }

    fn remember(&self, token: Option<String>) {
        if let Ok(mut guard) = self.memory.lock() {
            *guard = token;
        }
    }

    /// Read the stored token, if any.
    pub fn load(&self) -> Result<Option<String>, KeyringAccessError> {
        if let Some(token) = self.memory.lock().ok().and_then(|guard| guard.clone()) {
            return Ok(Some(token));
        }
        if !self.use_keyring {
            return Ok(None);
        }

        match Self::entry()?.get_password() {
            Ok(token) => {
                debug!("loaded stored token from keyring");
                self.remember(Some(token.clone()));
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("no stored token in keyring");
                Ok(None)
            }
            Err(err) => {
                let err = KeyringAccessError::from(err);
                warn!(recoverable = err.is_recoverable(), error = %err, "token lookup failed");
                Err(err)
            }
        }
    }

    pub fn store(&self, token: &str) -> Result<(), KeyringAccessError> {
        if self.use_keyring {
            Self::entry()?.set_password(token)?;
            debug!("stored token in keyring");
        }
        self.remember(Some(token.to_string()));
        Ok(())
    }

    /// Forget the token. Clearing an absent token is not an error.
    pub fn clear(&self) -> Result<(), KeyringAccessError> {
        self.remember(None);
        if !self.use_keyring {
            return Ok(());
        }
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!("cleared stored token");
                Ok(())
            }
            Err(err) => Err(KeyringAccessError::from(err)),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
