//! Backend registry
//!
//! Maps platform names to [`Backend`] instances. The registry is built once
//! at startup and then shared read-only by the dispatcher.
//!
//! Registration order is kept and is the order in which platforms are listed
//! to hosts. The first registration for a name wins; later ones are ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backends::facebook::{self, FacebookBackend};
use crate::backends::tumblr::{self, TumblrBackend};
use crate::backends::twitter::{self, TwitterBackend};
use crate::backends::{Backend, ServiceClient};
use crate::config::Config;
use crate::pipeline::RequestPipeline;
use crate::transport::HttpTransport;

/// Names of the built-in backends, in default registration order
pub const BUILTIN_PLATFORMS: [&str; 3] = [facebook::NAME, twitter::NAME, tumblr::NAME];

#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<(String, Arc<dyn Backend>)>,
    index: HashMap<String, usize>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in backends.
    ///
    /// Candidates are [`BUILTIN_PLATFORMS`] narrowed to the platforms the
    /// config enables, then passed through the pipeline's `active_platforms`
    /// filters. Names the filters add that are not built in are ignored.
    pub fn with_builtin(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        pipeline: Arc<RequestPipeline>,
    ) -> Self {
        let client = ServiceClient::new(transport, pipeline, config.requests.timeout());

        let candidates: Vec<String> = BUILTIN_PLATFORMS
            .iter()
            .filter(|name| config.is_enabled(name))
            .map(|name| name.to_string())
            .collect();
        let active = client.pipeline().filter_platforms(candidates);

        let mut registry = Self::new();
        for name in active {
            let backend: Arc<dyn Backend> = match name.as_str() {
                facebook::NAME => Arc::new(FacebookBackend::new(
                    client.clone(),
                    &config.platforms.facebook.endpoint,
                )),
                twitter::NAME => Arc::new(TwitterBackend::new(
                    client.clone(),
                    &config.platforms.twitter.endpoint,
                )),
                tumblr::NAME => Arc::new(TumblrBackend::new(
                    client.clone(),
                    &config.platforms.tumblr.post_endpoint,
                    &config.platforms.tumblr.user_info_endpoint,
                )),
                other => {
                    warn!("Ignoring unknown platform '{}' from active platforms", other);
                    continue;
                }
            };
            registry.register(&name, backend);
        }

        info!("Registered backends: {}", registry.names().join(", "));
        registry
    }

    /// Register `backend` under `name`.
    ///
    /// Returns `false` and keeps the existing entry if `name` is taken.
    pub fn register(&mut self, name: &str, backend: Arc<dyn Backend>) -> bool {
        if self.index.contains_key(name) {
            debug!("Backend '{}' already registered, keeping the first", name);
            return false;
        }

        self.index.insert(name.to_string(), self.backends.len());
        self.backends.push((name.to_string(), backend));
        true
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.index
            .get(name)
            .map(|&position| Arc::clone(&self.backends[position].1))
    }

    /// All registered backends in registration order
    pub fn list(&self) -> Vec<(String, Arc<dyn Backend>)> {
        self.backends.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockBackend;
    use crate::transport::mock::MockTransport;

    fn builtin(config: &Config, pipeline: RequestPipeline) -> BackendRegistry {
        BackendRegistry::with_builtin(
            config,
            Arc::new(MockTransport::new()),
            Arc::new(pipeline),
        )
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = BackendRegistry::new();
        let first = MockBackend::success("first");
        let second = MockBackend::success("second");

        assert!(registry.register("facebook", Arc::new(first)));
        assert!(!registry.register("facebook", Arc::new(second)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("facebook").unwrap().name(), "first");
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = BackendRegistry::new();
        assert!(registry.resolve("myspace").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_keeps_registration_order() {
        let mut registry = BackendRegistry::new();
        for name in ["tumblr", "facebook", "twitter"] {
            registry.register(name, Arc::new(MockBackend::success(name)));
        }

        let names: Vec<String> = registry.list().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["tumblr", "facebook", "twitter"]);
    }

    #[test]
    fn test_builtin_registers_all_by_default() {
        let registry = builtin(&Config::default(), RequestPipeline::empty());
        assert_eq!(registry.names(), vec!["facebook", "twitter", "tumblr"]);

        let labels: Vec<String> = registry
            .list()
            .iter()
            .map(|(_, backend)| backend.label().to_string())
            .collect();
        assert_eq!(labels, vec!["Facebook", "Twitter", "Tumblr"]);
    }

    #[test]
    fn test_builtin_respects_active_platforms_filter() {
        let pipeline = RequestPipeline::builder()
            .active_platforms(|names| names.into_iter().filter(|n| n != "twitter").collect())
            .build();
        let registry = builtin(&Config::default(), pipeline);

        assert_eq!(registry.names(), vec!["facebook", "tumblr"]);
        assert!(!registry.contains("twitter"));
    }

    #[test]
    fn test_builtin_ignores_unknown_names_from_filter() {
        let pipeline = RequestPipeline::builder()
            .active_platforms(|mut names| {
                names.push("myspace".to_string());
                names
            })
            .build();
        let registry = builtin(&Config::default(), pipeline);

        assert_eq!(registry.len(), 3);
        assert!(registry.resolve("myspace").is_none());
    }

    #[test]
    fn test_builtin_respects_config() {
        let config = Config::from_toml(
            r#"
            [platforms]
            enabled = ["tumblr"]
            "#,
        )
        .unwrap();
        let registry = builtin(&config, RequestPipeline::empty());

        assert_eq!(registry.names(), vec!["tumblr"]);
    }
}
