//! UMA artifacts.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// `WWW-Authenticate` challenge returned with a UMA 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UmaChallenge(pub String);

/// Single-use permission ticket issued by the authorization server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTicket(String);

impl PermissionTicket {
    #[must_use]
    pub fn new(ticket: impl Into<String>) -> Self {
        Self(ticket.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Requesting party token.
#[derive(Clone)]
pub struct Rpt(SecretString);

impl Rpt {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Rpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rpt([REDACTED])")
    }
}

impl PartialEq for Rpt {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}
