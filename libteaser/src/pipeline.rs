//! Request pipeline
//!
//! Every backend builds its request in stages, and each stage can be
//! rewritten by host code without touching the backend. Transforms are
//! registered by hook name, `<platform>_<stage>`:
//!
//! | hook | value |
//! |---|---|
//! | `<platform>_url` | endpoint URL |
//! | `<platform>_body` | request body (JSON object) |
//! | `<platform>_request_params` | method, timeout, headers |
//! | `<platform>_destinations` | sub-destinations found by an auxiliary lookup |
//!
//! Transforms for the same hook run in registration order, each receiving
//! the previous output. With nothing registered the backend's default passes
//! through unchanged. A separate `active_platforms` filter decides which
//! built-in backends get registered at all.
//!
//! ```
//! use libteaser::pipeline::RequestPipeline;
//! use serde_json::json;
//!
//! let pipeline = RequestPipeline::builder()
//!     .body("facebook", |mut body, _ctx| {
//!         body.insert("extra".to_string(), json!("x"));
//!         body
//!     })
//!     .active_platforms(|names| names.into_iter().filter(|n| n != "twitter").collect())
//!     .build();
//!
//! assert_eq!(pipeline.transform_count("facebook_body"), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::transport::RequestParams;
use crate::types::{Credential, JsonMap, PublishRequest};

/// What a transform gets to look at besides the value it rewrites.
pub struct StageContext<'a> {
    pub request: &'a PublishRequest,
    pub credential: &'a Credential,
    /// Raw args map: request extras, `subject_id`, and backend-added entries
    pub args: &'a JsonMap,
}

pub type Transform<T> = Arc<dyn Fn(T, &StageContext<'_>) -> T + Send + Sync>;
pub type PlatformsFilter = Arc<dyn Fn(Vec<String>) -> Vec<String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Url,
    Body,
    RequestParams,
    Destinations,
}

impl Stage {
    fn suffix(self) -> &'static str {
        match self {
            Stage::Url => "url",
            Stage::Body => "body",
            Stage::RequestParams => "request_params",
            Stage::Destinations => "destinations",
        }
    }

    pub fn hook_name(self, platform: &str) -> String {
        format!("{}_{}", platform, self.suffix())
    }
}

fn run<T>(
    chains: &HashMap<String, Vec<Transform<T>>>,
    hook: &str,
    value: T,
    ctx: &StageContext<'_>,
) -> T {
    match chains.get(hook) {
        Some(chain) => {
            debug!("Applying {} transform(s) for {}", chain.len(), hook);
            chain.iter().fold(value, |acc, transform| transform(acc, ctx))
        }
        None => value,
    }
}

/// Ordered, named transforms for every stage. Immutable once built.
#[derive(Default)]
pub struct RequestPipeline {
    url: HashMap<String, Vec<Transform<String>>>,
    body: HashMap<String, Vec<Transform<JsonMap>>>,
    params: HashMap<String, Vec<Transform<RequestParams>>>,
    destinations: HashMap<String, Vec<Transform<Vec<String>>>>,
    active_platforms: Vec<PlatformsFilter>,
}

impl RequestPipeline {
    /// A pipeline with no transforms: every default passes through
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn apply_url(&self, platform: &str, url: String, ctx: &StageContext<'_>) -> String {
        run(&self.url, &Stage::Url.hook_name(platform), url, ctx)
    }

    pub fn apply_body(&self, platform: &str, body: JsonMap, ctx: &StageContext<'_>) -> JsonMap {
        run(&self.body, &Stage::Body.hook_name(platform), body, ctx)
    }

    pub fn apply_request_params(
        &self,
        platform: &str,
        params: RequestParams,
        ctx: &StageContext<'_>,
    ) -> RequestParams {
        run(&self.params, &Stage::RequestParams.hook_name(platform), params, ctx)
    }

    pub fn apply_destinations(
        &self,
        platform: &str,
        destinations: Vec<String>,
        ctx: &StageContext<'_>,
    ) -> Vec<String> {
        run(
            &self.destinations,
            &Stage::Destinations.hook_name(platform),
            destinations,
            ctx,
        )
    }

    /// Run the `active_platforms` filters over candidate platform names
    pub fn filter_platforms(&self, names: Vec<String>) -> Vec<String> {
        self.active_platforms
            .iter()
            .fold(names, |acc, filter| filter(acc))
    }

    /// Number of transforms registered under `hook_name`
    pub fn transform_count(&self, hook_name: &str) -> usize {
        if hook_name == "active_platforms" {
            return self.active_platforms.len();
        }

        [
            self.url.get(hook_name).map(Vec::len),
            self.body.get(hook_name).map(Vec::len),
            self.params.get(hook_name).map(Vec::len),
            self.destinations.get(hook_name).map(Vec::len),
        ]
        .into_iter()
        .flatten()
        .sum()
    }
}

impl fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<&String> = self
            .url
            .keys()
            .chain(self.body.keys())
            .chain(self.params.keys())
            .chain(self.destinations.keys())
            .collect();
        hooks.sort();

        f.debug_struct("RequestPipeline")
            .field("hooks", &hooks)
            .field("active_platforms", &self.active_platforms.len())
            .finish()
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    pipeline: RequestPipeline,
}

impl PipelineBuilder {
    /// Register a `<platform>_url` transform
    pub fn url<F>(mut self, platform: &str, transform: F) -> Self
    where
        F: Fn(String, &StageContext<'_>) -> String + Send + Sync + 'static,
    {
        self.pipeline
            .url
            .entry(Stage::Url.hook_name(platform))
            .or_default()
            .push(Arc::new(transform));
        self
    }

    /// Register a `<platform>_body` transform
    pub fn body<F>(mut self, platform: &str, transform: F) -> Self
    where
        F: Fn(JsonMap, &StageContext<'_>) -> JsonMap + Send + Sync + 'static,
    {
        self.pipeline
            .body
            .entry(Stage::Body.hook_name(platform))
            .or_default()
            .push(Arc::new(transform));
        self
    }

    /// Register a `<platform>_request_params` transform
    pub fn request_params<F>(mut self, platform: &str, transform: F) -> Self
    where
        F: Fn(RequestParams, &StageContext<'_>) -> RequestParams + Send + Sync + 'static,
    {
        self.pipeline
            .params
            .entry(Stage::RequestParams.hook_name(platform))
            .or_default()
            .push(Arc::new(transform));
        self
    }

    /// Register a `<platform>_destinations` transform
    pub fn destinations<F>(mut self, platform: &str, transform: F) -> Self
    where
        F: Fn(Vec<String>, &StageContext<'_>) -> Vec<String> + Send + Sync + 'static,
    {
        self.pipeline
            .destinations
            .entry(Stage::Destinations.hook_name(platform))
            .or_default()
            .push(Arc::new(transform));
        self
    }

    /// Register an `active_platforms` filter
    pub fn active_platforms<F>(mut self, filter: F) -> Self
    where
        F: Fn(Vec<String>) -> Vec<String> + Send + Sync + 'static,
    {
        self.pipeline.active_platforms.push(Arc::new(filter));
        self
    }

    pub fn build(self) -> RequestPipeline {
        self.pipeline
    }
}
