//! Read-only access to the secure token store.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use warden_types::BearerToken;

/// Source of the caller's bearer credential. The control plane never writes to it.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<BearerToken>;
}

/// In-memory credential, replaceable at runtime (sign-in / sign-out).
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: Mutex<Option<BearerToken>>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(token: Option<BearerToken>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    pub fn replace(&self, token: Option<BearerToken>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<BearerToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredentials {
    fn token(&self) -> Option<BearerToken> {
        env::var(&self.var).ok().and_then(BearerToken::new)
    }
}

/// Reads the token from a file on every call, so a rotated token is picked up.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for FileCredentials {
    fn token(&self) -> Option<BearerToken> {
        match fs::read_to_string(&self.path) {
            Ok(content) => BearerToken::new(content),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Token file unreadable");
                None
            }
        }
    }
}

/// First provider that yields a token wins.
pub struct ChainedCredentials {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl ChainedCredentials {
    #[must_use]
    pub fn new(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }
}

impl CredentialProvider for ChainedCredentials {
    fn token(&self) -> Option<BearerToken> {
        self.providers.iter().find_map(|p| p.token())
    }
}
