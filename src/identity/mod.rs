//! Identity lookup capability.
//!
//! The gateway never decides who a user is. It hands the decoded login
//! credentials to an [`IdentityLookup`] and only asserts the trusted
//! identity header when the lookup affirms them. Persistence lives behind
//! this trait; the gateway ships a config-backed store for small deployments
//! and tests.

mod static_store;

pub use static_store::StaticIdentities;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Login payload. Fields other than these two are ignored.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Answer from an identity lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Affirmed,
    Denied,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

/// Verifies credentials against some identity store.
///
/// Implementations may block on network or database round trips; the
/// gateway calls them from the per-request task only.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn verify(&self, credentials: &Credentials) -> Result<Verdict, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_ignore_extra_fields() {
        let creds: Credentials =
            serde_json::from_str(r#"{"username":"alice","password":"pw","recaptcha":""}"#).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "pw");
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
