//! CAEP stream-management and event models.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::CtxSubject;
use crate::uma::UmaChallenge;

/// Receiver-side view of a CAEP stream configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamConfig {
    pub receiver_id: String,
    /// Push endpoint the provider delivers events to.
    pub delivery_endpoint: String,
    /// Event type URIs the receiver asked for.
    #[serde(default)]
    pub events_requested: BTreeSet<String>,
}

impl StreamConfig {
    /// Union of the requested event types with `desired`.
    ///
    /// Returns `None` when `desired` adds nothing, i.e. no update is needed.
    #[must_use]
    pub fn merged_with(&self, desired: &BTreeSet<String>) -> Option<Self> {
        if desired.is_subset(&self.events_requested) {
            return None;
        }
        let mut merged = self.clone();
        merged.events_requested.extend(desired.iter().cloned());
        Some(merged)
    }
}

/// Provider-asserted subscription state of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectStatus {
    Enabled,
    Paused,
    Disabled,
}

/// Stream status for a (receiver, subject) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub receiver_id: String,
    pub subject: CtxSubject,
    pub status: SubjectStatus,
    /// Event type → scopes the provider granted for it.
    #[serde(default)]
    pub events: BTreeMap<String, Vec<String>>,
}

impl StreamStatus {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status == SubjectStatus::Enabled
    }
}

/// Request to add a subject to the receiver's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSubjectRequest {
    pub receiver_id: String,
    pub subject: CtxSubject,
    /// Whether the receiver verified the subject itself.
    pub verified: bool,
}

/// Result of an `add_subject` call that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddSubjectResponse {
    Added,
    /// The provider requires a UMA grant (HTTP 401 with a permission ticket).
    Unauthorized(UmaChallenge),
}

/// Verified and decoded push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaepEvent {
    pub event_type: String,
    pub subject: CtxSubject,
    /// Scope → value carried by the event.
    #[serde(default)]
    pub scopes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub resource_id: Option<String>,
}
