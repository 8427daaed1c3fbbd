use std::sync::Arc;

use warden_types::{IdentityClaims, read_claims};

use crate::credentials::CredentialProvider;

/// Decodes the caller's identity claims from the stored credential.
///
/// No network call is made and the token signature is not checked; the
/// result only gates client-side affordances.
#[derive(Clone)]
pub struct IdentityClaimReader {
    credentials: Arc<dyn CredentialProvider>,
}

impl IdentityClaimReader {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { credentials }
    }

    /// Claims of the current credential, or the zero value when there is none.
    #[must_use]
    pub fn current_claims(&self) -> IdentityClaims {
        self.credentials
            .token()
            .map(|token| read_claims(token.expose()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_founder(&self) -> bool {
        self.current_claims().is_founder_identity()
    }
}
