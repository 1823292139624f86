//! Config-backed identity store.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{Credentials, IdentityError, IdentityLookup, Verdict};
use crate::config::UserConfig;

/// Username/password pairs loaded from configuration.
#[derive(Default)]
pub struct StaticIdentities {
    users: HashMap<String, String>,
}

impl StaticIdentities {
    pub fn new(users: &[UserConfig]) -> Self {
        Self {
            users: users
                .iter()
                .map(|u| (u.username.clone(), u.password.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl IdentityLookup for StaticIdentities {
    async fn verify(&self, credentials: &Credentials) -> Result<Verdict, IdentityError> {
        let verdict = match self.users.get(&credentials.username) {
            Some(password) if password == &credentials.password => Verdict::Affirmed,
            _ => Verdict::Denied,
        };
        Ok(verdict)
    }
}
