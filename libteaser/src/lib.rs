//! Social Teaser - publish teasers of freshly published posts
//!
//! When a post (the "subject") becomes public, this library announces it on
//! the social accounts its author selected: one HTTP call per account,
//! through a pluggable backend per platform. Each subject is teased at most
//! once, and one account failing never stops the others.
//!
//! The pieces, bottom-up:
//!
//! - [`transport`]: the HTTP seam (`reqwest` in production, a scripted mock in tests)
//! - [`pipeline`]: per-platform URL, body and parameter transforms
//! - [`backends`]: Facebook, Twitter and Tumblr adapters
//! - [`registry`]: name to backend lookup, built once at startup
//! - [`dispatcher`]: once-per-subject, concurrent publishing with recorded outcomes

pub mod backends;
pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod selection;
pub mod store;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use backends::{Backend, ServiceClient};
pub use config::Config;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use dispatcher::{DispatchReport, DispatchResults, Dispatcher, TriggerOutcome};
pub use error::{PublishError, Result, TeaserError, TransportError};
pub use pipeline::RequestPipeline;
pub use registry::BackendRegistry;
pub use selection::{AccountOption, Selection};
pub use store::{Database, MemoryStore, TeaserStore};
pub use types::{
    Credential, CredentialKey, DispatchOutcome, OutcomeKind, PublishRequest, PublishResponse,
    SubjectStatus, TriggerEvent,
};
