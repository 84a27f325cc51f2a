//! Domain models for the access controller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque session identifier issued by the PEP transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Primary identity of the requester, as asserted by the primary identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Issuer of the identity (`iss`).
    pub issuer: String,
    /// Subject identifier within the issuer (`sub`).
    pub id: String,
}

impl Subject {
    #[must_use]
    pub fn new(issuer: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.issuer, self.id)
    }
}

/// Provider-scoped identity used to subscribe to and receive context.
///
/// May be pseudonymous or device-scoped, so it need not look like the
/// primary [`Subject`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CtxSubject {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl CtxSubject {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device: None,
        }
    }

    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }
}

impl fmt::Display for CtxSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.device {
            Some(device) => write!(f, "{}@{device}", self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// The resource being accessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource type identifier (e.g., "`documents.report`").
    pub resource_type: String,
    /// Specific resource instance, if any.
    #[serde(default)]
    pub id: Option<String>,
}

impl Resource {
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// The action being performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Action name (e.g., "read", "write").
    pub name: String,
}

impl Action {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Name of a kind of context (e.g. `"device-posture"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextType(String);

impl ContextType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A context type and the scopes of it a decision needs.
///
/// Produced by the PDP, consumed by the PIP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedContextSpec {
    pub context_type: ContextType,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl RequestedContextSpec {
    #[must_use]
    pub fn new<S: Into<String>>(
        context_type: impl Into<ContextType>,
        scopes: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            context_type: context_type.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Value of a single context scope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ScopeValue {
    /// Placeholder: nothing has been delivered for this scope yet.
    #[default]
    Unknown,
    /// Value asserted by the context provider.
    Known(serde_json::Value),
}

impl ScopeValue {
    #[must_use]
    pub fn as_known(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }
}

/// Cached context of one type for one provider-scoped subject.
///
/// Created with [`ScopeValue::Unknown`] placeholders on first reference and
/// updated in place by pushed events. Scopes are overwritten only when an
/// event carries them; they are never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextValue {
    pub context_type: ContextType,
    pub subject: CtxSubject,
    pub values: BTreeMap<String, ScopeValue>,
    /// Resource registered at the UMA authorization server for this context.
    #[serde(default)]
    pub resource_id: Option<String>,
}

impl ContextValue {
    /// A value with every scope set to [`ScopeValue::Unknown`].
    #[must_use]
    pub fn placeholder<'a>(
        context_type: ContextType,
        subject: CtxSubject,
        scopes: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        Self {
            context_type,
            subject,
            values: scopes
                .into_iter()
                .map(|s| (s.clone(), ScopeValue::Unknown))
                .collect(),
            resource_id: None,
        }
    }

    /// Whether the provider has delivered at least one scope.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.values
            .values()
            .any(|v| matches!(v, ScopeValue::Known(_)))
    }

    /// Known value of `scope`; `None` when absent or not yet delivered.
    #[must_use]
    pub fn get(&self, scope: &str) -> Option<&serde_json::Value> {
        self.values.get(scope).and_then(ScopeValue::as_known)
    }

    /// Known string value of `scope`.
    #[must_use]
    pub fn get_str(&self, scope: &str) -> Option<&str> {
        self.get(scope).and_then(serde_json::Value::as_str)
    }

    /// Merge delivered scopes: present keys overwrite, absent keys are kept.
    pub fn merge(
        &mut self,
        scopes: impl IntoIterator<Item = (String, serde_json::Value)>,
        resource_id: Option<String>,
    ) {
        for (scope, value) in scopes {
            self.values.insert(scope, ScopeValue::Known(value));
        }
        if resource_id.is_some() {
            self.resource_id = resource_id;
        }
    }

    /// Register scopes the caller is interested in without touching known ones.
    pub fn ensure_scopes<'a>(&mut self, scopes: impl IntoIterator<Item = &'a String>) {
        for scope in scopes {
            self.values.entry(scope.clone()).or_default();
        }
    }
}

/// Identity returned by an identity provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub issuer: String,
    pub subject: String,
    #[serde(default)]
    pub device: Option<String>,
}

impl VerifiedIdentity {
    #[must_use]
    pub fn to_subject(&self) -> Subject {
        Subject::new(self.issuer.clone(), self.subject.clone())
    }

    #[must_use]
    pub fn to_ctx_subject(&self) -> CtxSubject {
        CtxSubject {
            id: self.subject.clone(),
            device: self.device.clone(),
        }
    }
}

/// Where to send the user agent to start a login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectTarget {
    pub url: String,
    /// Anti-forgery value the callback must echo back.
    pub state: String,
}

/// Parameters of an authorization-code callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub code: String,
    pub state: String,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn posture() -> ContextValue {
        ContextValue::placeholder(
            ContextType::new("device-posture"),
            CtxSubject::new("alice"),
            &["risk".to_owned(), "os".to_owned()],
        )
    }

    #[test]
    fn placeholder_is_not_delivered() {
        let value = posture();
        assert!(!value.is_delivered());
        assert_eq!(value.values.get("risk"), Some(&ScopeValue::Unknown));
        assert_eq!(value.get("risk"), None);
    }

    #[test]
    fn merge_overwrites_only_present_scopes() {
        let mut value = posture();
        value.merge([("risk".to_owned(), json!("high"))], None);
        value.merge([("os".to_owned(), json!("linux"))], Some("rs-1".to_owned()));

        assert_eq!(value.get_str("risk"), Some("high"));
        assert_eq!(value.get_str("os"), Some("linux"));
        assert_eq!(value.resource_id.as_deref(), Some("rs-1"));

        value.merge([("risk".to_owned(), json!("low"))], None);
        assert_eq!(value.get_str("risk"), Some("low"));
        assert_eq!(value.get_str("os"), Some("linux"));
        assert_eq!(value.resource_id.as_deref(), Some("rs-1"));
    }

    #[test]
    fn ensure_scopes_keeps_known_values() {
        let mut value = posture();
        value.merge([("risk".to_owned(), json!("low"))], None);
        value.ensure_scopes(&["risk".to_owned(), "location".to_owned()]);

        assert_eq!(value.get_str("risk"), Some("low"));
        assert_eq!(value.values.get("location"), Some(&ScopeValue::Unknown));
    }

    #[test]
    fn ctx_subject_display_includes_device() {
        let subject = CtxSubject::new("alice").with_device("laptop-7");
        assert_eq!(subject.to_string(), "alice@laptop-7");
        assert_eq!(CtxSubject::new("bob").to_string(), "bob");
    }
}
