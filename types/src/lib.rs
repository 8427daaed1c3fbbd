//! Core domain types for Warden.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod action;
mod claims;
mod error;

pub use action::{BanDuration, PrivilegedAction};
pub use claims::{FOUNDER_USERNAME, IdentityClaims, is_founder, read_claims};
pub use error::{AdminError, ValidationError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of characters an impersonation justification must carry.
pub const MIN_IMPERSONATION_REASON_CHARS: usize = 20;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a platform account targeted by a privileged action.
///
/// Guaranteed non-empty after trimming and never a `.` or `..` path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        if matches!(trimmed, "." | "..") {
            return Err(ValidationError::DotSegmentUserId);
        }
        if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for UserId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Device identifier attached to every admin request for audit attribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Identifier used when the platform cannot provide one.
    pub const UNKNOWN: &'static str = "unknown";

    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self(Self::UNKNOWN.to_string())
        } else {
            Self(value)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Secrets
// ============================================================================

/// Opaque bearer credential read from the secure token store.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Returns `None` for blank input so callers can treat it as "no credential".
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Manual Debug impl to prevent leaking credentials in logs.
impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Short-lived credential that lets the admin act as another account.
#[derive(Clone, PartialEq, Eq)]
pub struct ImpersonationToken(String);

impl ImpersonationToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImpersonationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ImpersonationToken([REDACTED])")
    }
}

/// Account password used as the second impersonation factor.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

// ============================================================================
// Justifications
// ============================================================================

/// Justification for an impersonation, at least
/// [`MIN_IMPERSONATION_REASON_CHARS`] characters long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpersonationReason(String);

impl ImpersonationReason {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let actual = value.chars().count();
        if actual < MIN_IMPERSONATION_REASON_CHARS {
            return Err(ValidationError::ReasonTooShort {
                min: MIN_IMPERSONATION_REASON_CHARS,
                actual,
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Wire bodies
// ============================================================================

/// Body of `POST /users/{id}/ban`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanBody<'a> {
    pub reason: &'a str,
    /// Hours; `0` means permanent.
    pub duration: u32,
}

/// Body of `POST /users/{id}/shadowban`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowbanBody<'a> {
    pub reason: &'a str,
}

/// Body of `POST /users/{id}/impersonate`.
#[derive(Clone, Serialize)]
pub struct ImpersonateBody<'a> {
    pub reason: &'a str,
    pub password: &'a str,
}

impl fmt::Debug for ImpersonateBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpersonateBody")
            .field("reason", &self.reason)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful response of `POST /users/{id}/impersonate`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImpersonateResponse {
    pub impersonation_token: String,
}
