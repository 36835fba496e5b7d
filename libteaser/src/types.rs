//! Core types for Social Teaser

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PublishError;

/// Free-form JSON object used for request bodies and argument maps.
pub type JsonMap = Map<String, Value>;

/// A stored authorization artifact for one account on one platform.
///
/// Credentials belong to the credential store; the core only borrows them for
/// the duration of a publish call. The token is never printed by `Debug`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    /// Store-assigned identifier, unique per platform
    pub id: String,
    /// Platform name (e.g., "facebook", "twitter", "tumblr")
    pub platform: String,
    /// Identity of the user owning this credential
    pub owner: String,
    /// Display name of the remote account
    #[serde(default)]
    pub account_name: String,
    /// Opaque token payload
    pub token: SecretString,
}

impl Credential {
    pub fn new(
        id: impl Into<String>,
        platform: impl Into<String>,
        owner: impl Into<String>,
        account_name: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            platform: platform.into(),
            owner: owner.into(),
            account_name: account_name.into(),
            token: SecretString::from(token.into()),
        }
    }

    pub fn key(&self) -> CredentialKey {
        CredentialKey::new(&self.platform, &self.id)
    }

    /// Whether the token payload carries anything at all
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

/// Identifies a credential across platforms: `(platform, credential id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CredentialKey {
    pub platform: String,
    pub credential_id: String,
}

impl CredentialKey {
    pub fn new(platform: impl Into<String>, credential_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            credential_id: credential_id.into(),
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.credential_id)
    }
}

/// Everything a backend needs to know about the published subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Subject (post) identifier; `None` means there is nothing to describe
    pub subject_id: Option<String>,
    pub title: String,
    /// Canonical link to the subject
    pub link: String,
    /// Short link, used where platforms embed the link in the message
    pub short_link: Option<String>,
    /// Platform-specific extension fields, visible to pipeline transforms
    #[serde(default)]
    pub extra: JsonMap,
}

impl PublishRequest {
    pub fn new(
        subject_id: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
            title: title.into(),
            link: link.into(),
            short_link: None,
            extra: JsonMap::new(),
        }
    }

    pub fn with_short_link(mut self, short_link: impl Into<String>) -> Self {
        self.short_link = Some(short_link.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Whether a subject is attached; without one, defaults are empty
    pub fn has_subject(&self) -> bool {
        self.subject_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Title, or an empty string when no subject is attached
    pub fn title_or_empty(&self) -> &str {
        if self.has_subject() {
            &self.title
        } else {
            ""
        }
    }

    /// Canonical link, or an empty string when no subject is attached
    pub fn link_or_empty(&self) -> &str {
        if self.has_subject() {
            &self.link
        } else {
            ""
        }
    }

    /// Short link (falling back to the canonical link), or empty without a subject
    pub fn short_link_or_empty(&self) -> &str {
        if !self.has_subject() {
            return "";
        }
        self.short_link.as_deref().unwrap_or(&self.link)
    }

    /// Raw args map handed to pipeline transforms
    pub fn args(&self) -> JsonMap {
        let mut args = self.extra.clone();
        if let Some(subject_id) = &self.subject_id {
            args.insert("subject_id".to_string(), Value::String(subject_id.clone()));
        }
        args
    }
}

/// Parsed response of a successful publish call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub status: u16,
    /// JSON body when the platform answered with JSON, raw text otherwise
    pub body: Value,
}

/// Result of a single backend publish call.
pub type PublishResult = std::result::Result<PublishResponse, PublishError>;

/// Why a credential was not published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No backend is registered for the credential's platform
    NoBackend,
    /// The credential store rejected the credential, or it carries no token
    InvalidCredential,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoBackend => write!(f, "no backend registered"),
            SkipReason::InvalidCredential => write!(f, "invalid credential"),
        }
    }
}

/// Outcome of dispatching to one credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Published(PublishResponse),
    Failed(PublishError),
    Skipped(SkipReason),
}

impl DispatchOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, DispatchOutcome::Published(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DispatchOutcome::Skipped(_))
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            DispatchOutcome::Published(_) => OutcomeKind::Published,
            DispatchOutcome::Failed(_) => OutcomeKind::Failed,
            DispatchOutcome::Skipped(_) => OutcomeKind::Skipped,
        }
    }

    pub fn status_str(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Which way a credential's publish ended, without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Published,
    Failed,
    Skipped,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Published => "published",
            OutcomeKind::Failed => "failed",
            OutcomeKind::Skipped => "skipped",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PublishResult> for DispatchOutcome {
    fn from(result: PublishResult) -> Self {
        match result {
            Ok(response) => DispatchOutcome::Published(response),
            Err(error) => DispatchOutcome::Failed(error),
        }
    }
}

/// Lifecycle status of a subject as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectStatus {
    Draft,
    Pending,
    Scheduled,
    Private,
    Published,
}

/// A host lifecycle event for one subject.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub request: PublishRequest,
    /// User whose credentials are used
    pub owner: String,
    pub old_status: Option<SubjectStatus>,
    pub new_status: SubjectStatus,
}

impl TriggerEvent {
    /// Whether this event moves the subject into the published state
    pub fn is_publish_transition(&self) -> bool {
        self.new_status == SubjectStatus::Published
            && self.old_status != Some(SubjectStatus::Published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_hides_token() {
        let credential = Credential::new("7", "facebook", "alice", "Alice", "very-secret");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("very-secret"));
        assert!(credential.has_token());
    }

    #[test]
    fn test_blank_token_is_not_a_token() {
        let credential = Credential::new("7", "facebook", "alice", "Alice", "   ");
        assert!(!credential.has_token());
    }

    #[test]
    fn test_credential_key_display() {
        let key = CredentialKey::new("tumblr", "42");
        assert_eq!(key.to_string(), "tumblr:42");
    }

    #[test]
    fn test_defaults_are_empty_without_subject() {
        let request = PublishRequest {
            subject_id: None,
            title: "Hello".to_string(),
            link: "http://x/hello".to_string(),
            short_link: Some("http://x/1".to_string()),
            extra: JsonMap::new(),
        };

        assert_eq!(request.title_or_empty(), "");
        assert_eq!(request.link_or_empty(), "");
        assert_eq!(request.short_link_or_empty(), "");
    }

    #[test]
    fn test_short_link_falls_back_to_canonical_link() {
        let request = PublishRequest::new("1", "Hello", "http://x/hello");
        assert_eq!(request.short_link_or_empty(), "http://x/hello");

        let request = request.with_short_link("http://x/1");
        assert_eq!(request.short_link_or_empty(), "http://x/1");
    }

    #[test]
    fn test_args_include_subject_and_extra() {
        let request = PublishRequest::new("12", "Hello", "http://x/hello").with_extra("lang", "en");
        let args = request.args();
        assert_eq!(args["subject_id"], "12");
        assert_eq!(args["lang"], "en");
    }

    #[test]
    fn test_publish_transition() {
        let request = PublishRequest::new("1", "Hello", "http://x/1");
        let event = TriggerEvent {
            request: request.clone(),
            owner: "alice".to_string(),
            old_status: Some(SubjectStatus::Draft),
            new_status: SubjectStatus::Published,
        };
        assert!(event.is_publish_transition());

        let resave = TriggerEvent {
            old_status: Some(SubjectStatus::Published),
            ..event.clone()
        };
        assert!(!resave.is_publish_transition());

        let draft = TriggerEvent {
            new_status: SubjectStatus::Draft,
            ..event
        };
        assert!(!draft.is_publish_transition());
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: DispatchOutcome = Ok(PublishResponse {
            status: 200,
            body: Value::Null,
        })
        .into();
        assert!(ok.is_published());
        assert_eq!(ok.status_str(), "published");

        let err: DispatchOutcome = Err(PublishError::EmptyEndpoint {
            platform: "tumblr".to_string(),
        })
        .into();
        assert!(err.is_failed());
        assert_eq!(err.status_str(), "failed");
        assert_eq!(err.kind(), OutcomeKind::Failed);

        let skipped = DispatchOutcome::Skipped(SkipReason::NoBackend);
        assert_eq!(skipped.kind(), OutcomeKind::Skipped);
        assert_eq!(serde_json::to_value(skipped.kind()).unwrap(), "skipped");
    }
}
