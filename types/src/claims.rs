//! Client-side identity claims.
//!
//! Claims are decoded from the payload segment of a `header.payload.signature`
//! bearer token. The signature is NOT verified here: the decoded values are
//! advisory and only decide whether privileged affordances are offered. The
//! admin backend enforces authorization on every request.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

/// The single account allowed to enter admin mode.
pub const FOUNDER_USERNAME: &str = "neoqiss";

/// Identity claims extracted from a bearer token.
///
/// The zero value (`Default`) is what every malformed token decodes to, and it
/// is never a founder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject_id: String,
    pub username: String,
    pub is_founder: bool,
}

impl IdentityClaims {
    /// Both the founder flag and the fixed founder username must match.
    #[must_use]
    pub fn is_founder_identity(&self) -> bool {
        self.is_founder && self.username == FOUNDER_USERNAME
    }

    fn from_payload(payload: &Map<String, Value>) -> Self {
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            subject_id: text("sub").or_else(|| text("user_id")).unwrap_or_default(),
            username: text("username").unwrap_or_default(),
            is_founder: payload
                .get("is_founder")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

/// Decode the identity claims carried by `token`.
///
/// Never fails: a wrong segment count, invalid base64 or a payload that is not
/// a JSON object all yield [`IdentityClaims::default`].
#[must_use]
pub fn read_claims(token: &str) -> IdentityClaims {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return IdentityClaims::default();
    };

    let Some(bytes) = decode_segment(payload) else {
        return IdentityClaims::default();
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => IdentityClaims::from_payload(&map),
        _ => IdentityClaims::default(),
    }
}

/// Whether `token` identifies the founder account.
#[must_use]
pub fn is_founder(token: &str) -> bool {
    read_claims(token).is_founder_identity()
}

/// URL-safe alphabet translated to the standard one, right-padded with `=`
/// to a multiple of four, then decoded.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let mut standard: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while standard.len() % 4 != 0 {
        standard.push('=');
    }
    STANDARD.decode(standard.as_bytes()).ok()
}
