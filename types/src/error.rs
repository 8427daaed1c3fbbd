use thiserror::Error;

/// Local input validation failures. These never reach the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("reason must be at least {min} characters (got {actual})")]
    ReasonTooShort { min: usize, actual: usize },
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("user id must not be '.' or '..'")]
    DotSegmentUserId,
}

/// Failure taxonomy for every admin control-plane operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// Caller is not the founder identity. Fails closed locally.
    #[error("founder access required")]
    NotAuthorized,
    /// Device-owner verification declined or unavailable.
    #[error("step-up authentication failed for '{purpose}'")]
    StepUpFailed { purpose: &'static str },
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
    /// Transport error, non-success status, or a malformed response.
    #[error("remote exchange failed: {0}")]
    RemoteExchangeFailed(String),
    /// No stored credential for a remote call.
    #[error("not authenticated")]
    NotAuthenticated,
}

impl AdminError {
    /// Short text suitable for a blocking alert.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthorized => "Not authorized for admin access".to_string(),
            Self::StepUpFailed { .. } => "Biometric authentication failed".to_string(),
            Self::ValidationFailed(ValidationError::ReasonTooShort { min, .. }) => {
                format!("Reason must be at least {min} characters")
            }
            Self::ValidationFailed(ValidationError::EmptyUserId) => {
                "A target user is required".to_string()
            }
            Self::ValidationFailed(ValidationError::DotSegmentUserId) => {
                "Not a valid user id".to_string()
            }
            Self::RemoteExchangeFailed(_) => "The admin service request failed".to_string(),
            Self::NotAuthenticated => "Not authenticated".to_string(),
        }
    }

    /// Whether the failure happened before any network traffic.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        !matches!(self, Self::RemoteExchangeFailed(_))
    }
}
