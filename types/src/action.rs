use std::fmt;
use std::num::NonZeroU32;

/// A remote operation that mutates another account and therefore needs a
/// fresh step-up confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivilegedAction {
    Ban,
    Unban,
    Shadowban,
    Unshadowban,
    Impersonate,
    EndImpersonation,
}

impl PrivilegedAction {
    /// Final path segment under `/users/{id}/`.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Shadowban => "shadowban",
            Self::Unshadowban => "unshadowban",
            Self::Impersonate => "impersonate",
            Self::EndImpersonation => "end-impersonation",
        }
    }

    /// Label shown on the verification prompt.
    ///
    /// `None` for actions that only reduce privilege and are never gated.
    #[must_use]
    pub const fn step_up_purpose(self) -> Option<&'static str> {
        match self {
            Self::Ban => Some("ban user"),
            Self::Unban => Some("unban user"),
            Self::Shadowban => Some("shadowban user"),
            Self::Unshadowban => Some("unshadowban user"),
            Self::Impersonate => Some("impersonate — step 1"),
            Self::EndImpersonation => None,
        }
    }

    #[must_use]
    pub const fn requires_step_up(self) -> bool {
        self.step_up_purpose().is_some()
    }
}

impl fmt::Display for PrivilegedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// How long a ban lasts. Serialized on the wire as hours, `0` meaning permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BanDuration {
    #[default]
    Permanent,
    Hours(NonZeroU32),
}

impl BanDuration {
    #[must_use]
    pub fn from_hours(hours: u32) -> Self {
        NonZeroU32::new(hours).map_or(Self::Permanent, Self::Hours)
    }

    #[must_use]
    pub const fn as_wire_hours(self) -> u32 {
        match self {
            Self::Permanent => 0,
            Self::Hours(hours) => hours.get(),
        }
    }
}
