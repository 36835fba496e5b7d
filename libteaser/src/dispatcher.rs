//! Dispatch of one subject to many accounts
//!
//! The dispatcher ties the registry, the credential store and the persistent
//! store together:
//!
//! 1. A subject is dispatched at most once. The persisted marker is checked
//!    before any backend runs, and an in-process in-flight set keeps two
//!    concurrent calls for the same subject from both passing that check.
//! 2. Every credential is published independently and concurrently. A
//!    failure is a value in the report, never a reason to stop the batch.
//! 3. Published and failed outcomes are recorded; the marker is set once,
//!    after every credential has finished.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::backends::Backend;
use crate::credentials::CredentialStore;
use crate::error::{Result, TeaserError};
use crate::events::{Event, EventBus, EventReceiver};
use crate::registry::BackendRegistry;
use crate::selection::{AccountOption, Selection};
use crate::store::{RecordedResult, TeaserStore};
use crate::types::{
    Credential, CredentialKey, DispatchOutcome, PublishRequest, SkipReason, TriggerEvent,
};

/// Per-credential outcomes of one batch
pub type DispatchResults = BTreeMap<CredentialKey, DispatchOutcome>;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchReport {
    /// Marker already set (or another dispatch running); nothing was invoked
    AlreadyProcessed,
    Completed { results: DispatchResults },
}

impl DispatchReport {
    pub fn is_already_processed(&self) -> bool {
        matches!(self, DispatchReport::AlreadyProcessed)
    }

    pub fn results(&self) -> Option<&DispatchResults> {
        match self {
            DispatchReport::AlreadyProcessed => None,
            DispatchReport::Completed { results } => Some(results),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// The event does not move the subject into the published state
    NotPublished,
    AlreadyProcessed,
    Dispatched(DispatchResults),
}

/// Releases a subject's in-flight slot on drop, including when the
/// dispatch future is abandoned.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    subject_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.subject_id);
    }
}

pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    credentials: Arc<dyn CredentialStore>,
    store: Arc<dyn TeaserStore>,
    event_bus: EventBus,
    in_flight: Mutex<HashSet<String>>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<BackendRegistry>,
        credentials: Arc<dyn CredentialStore>,
        store: Arc<dyn TeaserStore>,
    ) -> Self {
        Self::with_event_bus(registry, credentials, store, EventBus::default())
    }

    pub fn with_event_bus(
        registry: Arc<BackendRegistry>,
        credentials: Arc<dyn CredentialStore>,
        store: Arc<dyn TeaserStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            registry,
            credentials,
            store,
            event_bus,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, subject_id: &str) -> Option<InFlightGuard<'_>> {
        if !self.in_flight().insert(subject_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            in_flight: &self.in_flight,
            subject_id: subject_id.to_string(),
        })
    }

    /// Publish `request` through the backend registered for `credential`.
    ///
    /// Never fails: an unknown platform or an unusable credential is a skip,
    /// a backend error is `Failed`.
    pub async fn publish_to_credential(
        &self,
        credential: &Credential,
        request: &PublishRequest,
    ) -> DispatchOutcome {
        let Some(backend) = self.registry.resolve(&credential.platform) else {
            debug!("No backend registered for {}", credential.platform);
            return DispatchOutcome::Skipped(SkipReason::NoBackend);
        };

        if !credential.has_token() || !self.credentials.validate(credential) {
            warn!(
                "Credential {} rejected by {} credential store",
                credential.key(),
                self.credentials.backend_name()
            );
            return DispatchOutcome::Skipped(SkipReason::InvalidCredential);
        }

        self.publish_with(backend.as_ref(), credential, request).await
    }

    async fn publish_with(
        &self,
        backend: &dyn Backend,
        credential: &Credential,
        request: &PublishRequest,
    ) -> DispatchOutcome {
        match backend.publish(credential, request).await {
            Ok(response) => DispatchOutcome::Published(response),
            Err(e) => {
                warn!("Publishing to {} failed: {}", credential.key(), e);
                DispatchOutcome::Failed(e)
            }
        }
    }

    /// Publish `request` to every credential, once per subject.
    ///
    /// Requires a subject id. Duplicate credential keys are published once.
    pub async fn dispatch_all(
        &self,
        request: &PublishRequest,
        credentials: &[Credential],
    ) -> Result<DispatchReport> {
        let subject_id = match request.subject_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(TeaserError::InvalidInput(
                    "Cannot dispatch a request without a subject id".to_string(),
                ))
            }
        };

        let Some(_guard) = self.claim(subject_id) else {
            info!("Subject {} is already being dispatched", subject_id);
            return Ok(DispatchReport::AlreadyProcessed);
        };

        if self.store.get_marker(subject_id).await? {
            info!("Subject {} was already dispatched", subject_id);
            return Ok(DispatchReport::AlreadyProcessed);
        }

        let mut seen = HashSet::new();
        let batch: Vec<&Credential> = credentials
            .iter()
            .filter(|credential| seen.insert(credential.key()))
            .collect();

        let dispatch_id = uuid::Uuid::new_v4().to_string();
        info!(
            "Dispatching subject {} to {} account(s) (dispatch {})",
            subject_id,
            batch.len(),
            dispatch_id
        );
        self.event_bus.emit(Event::DispatchStarted {
            subject_id: subject_id.to_string(),
            dispatch_id: dispatch_id.clone(),
            credentials: batch.iter().map(|c| c.key().to_string()).collect(),
        });

        let tasks = batch.iter().map(|credential| {
            let dispatch_id = dispatch_id.as_str();
            async move {
                let key = credential.key();
                let outcome = self.publish_to_credential(credential, request).await;

                if !outcome.is_skipped() {
                    if let Err(e) = self.store.record_result(subject_id, &key, &outcome).await {
                        warn!("Failed to record result for {}: {}", key, e);
                    }
                }

                let detail = match &outcome {
                    DispatchOutcome::Published(_) => None,
                    DispatchOutcome::Failed(e) => Some(e.to_string()),
                    DispatchOutcome::Skipped(reason) => Some(reason.to_string()),
                };
                self.event_bus.emit(Event::CredentialFinished {
                    subject_id: subject_id.to_string(),
                    dispatch_id: dispatch_id.to_string(),
                    key: key.clone(),
                    status: outcome.kind(),
                    detail,
                });

                (key, outcome)
            }
        });

        let results: DispatchResults = join_all(tasks).await.into_iter().collect();

        if let Err(e) = self.store.set_marker(subject_id).await {
            error!("Failed to mark subject {} as dispatched: {}", subject_id, e);
        }

        let published = results.values().filter(|o| o.is_published()).count();
        let failed = results.values().filter(|o| o.is_failed()).count();
        let skipped = results.values().filter(|o| o.is_skipped()).count();

        info!(
            "Dispatch {} finished: {} published, {} failed, {} skipped",
            dispatch_id, published, failed, skipped
        );
        self.event_bus.emit(Event::DispatchCompleted {
            subject_id: subject_id.to_string(),
            dispatch_id,
            published,
            failed,
            skipped,
        });

        Ok(DispatchReport::Completed { results })
    }

    /// React to a host lifecycle event.
    ///
    /// Only a transition into the published state dispatches, and only to
    /// the owner's credentials that `selection` ticks, gathered in registry
    /// order.
    pub async fn handle_trigger(
        &self,
        event: &TriggerEvent,
        selection: &Selection,
    ) -> Result<TriggerOutcome> {
        if !event.is_publish_transition() {
            debug!(
                "Ignoring status change {:?} -> {:?}",
                event.old_status, event.new_status
            );
            return Ok(TriggerOutcome::NotPublished);
        }

        if let Some(subject_id) = event.request.subject_id.as_deref() {
            if self.store.get_marker(subject_id).await? {
                debug!("Subject {} was already dispatched", subject_id);
                return Ok(TriggerOutcome::AlreadyProcessed);
            }
        }

        let credentials: Vec<Credential> = self
            .registry
            .names()
            .iter()
            .flat_map(|platform| self.credentials.credentials_for(platform, &event.owner))
            .filter(|credential| selection.is_selected(&credential.key()))
            .collect();

        match self.dispatch_all(&event.request, &credentials).await? {
            DispatchReport::AlreadyProcessed => Ok(TriggerOutcome::AlreadyProcessed),
            DispatchReport::Completed { results } => Ok(TriggerOutcome::Dispatched(results)),
        }
    }

    /// One checkbox option per credential `owner` holds on a registered
    /// platform, in registry order
    pub fn selectable_accounts(&self, owner: &str) -> Vec<AccountOption> {
        self.registry
            .list()
            .iter()
            .flat_map(|(name, backend)| {
                self.credentials
                    .credentials_for(name, owner)
                    .into_iter()
                    .map(|credential| {
                        AccountOption::new(
                            credential.key(),
                            backend.label(),
                            &credential.account_name,
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Recorded outcomes for `subject_id`
    pub async fn results_for(&self, subject_id: &str) -> Result<Vec<RecordedResult>> {
        self.store.results_for(subject_id).await
    }
}
