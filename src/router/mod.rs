//! Domain Router
//!
//! Picks the domain that should handle a user message. Strategies run in a
//! fixed priority order and the first one with an opinion wins:
//!
//! 1. explicit switch ("switch to hedge fund domain")
//! 2. DSL verbs in the session DSL and the message
//! 3. session context keys, then the current state
//! 4. keywords in the message
//! 5. the session's current domain, or the first registered domain
//!
//! When none of them applies a fallback still picks a domain, so routing
//! only fails on an empty registry, an unknown explicit switch, or a bad
//! request. Every outcome is folded into [`RoutingMetrics`].

mod strategies;
pub mod types;
pub mod verbs;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::error::{ConfigError, RoutingError, RoutingResult};
use crate::registry::Registry;

pub use strategies::normalize_domain_name;
pub use types::{RoutingMetrics, RoutingRequest, RoutingResponse, RoutingStrategy};
pub use verbs::{extract_verbs_lenient, SExprVerbExtractor, VerbExtractor, VerbParseError};

use strategies::{RouteCandidate, RoutingScope};

/// Strategies tried after the explicit switch, in order
const HEURISTIC_ORDER: [RoutingStrategy; 4] = [
    RoutingStrategy::Verb,
    RoutingStrategy::Context,
    RoutingStrategy::Keyword,
    RoutingStrategy::Default,
];

pub struct Router {
    registry: Arc<Registry>,
    config: RouterConfig,
    verb_extractor: Arc<dyn VerbExtractor>,
    metrics: RwLock<RoutingMetrics>,
}

impl Router {
    /// Router over `registry` with the default business tables
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: RouterConfig::default(),
            verb_extractor: Arc::new(SExprVerbExtractor),
            metrics: RwLock::new(RoutingMetrics::default()),
        }
    }

    pub fn with_config(registry: Arc<Registry>, config: RouterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(registry)
        })
    }

    /// Swap the DSL grammar used by the verb strategy
    pub fn with_verb_extractor(mut self, extractor: Arc<dyn VerbExtractor>) -> Self {
        self.verb_extractor = extractor;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Route a message to a domain
    pub async fn route(&self, request: &RoutingRequest) -> RoutingResult<RoutingResponse> {
        let started = Instant::now();

        if request.message.trim().is_empty() {
            return Err(RoutingError::InvalidRequest(
                "message cannot be empty".to_string(),
            ));
        }
        let timestamp = request.timestamp.unwrap_or_else(Utc::now);

        let candidate = match self.select(request).await {
            Ok(candidate) => candidate,
            Err(e) => {
                self.metrics.write().await.record_failure();
                warn!(
                    request_id = %request.request_id,
                    session_id = %request.session_id,
                    error = %e,
                    "Routing failed"
                );
                return Err(e);
            }
        };

        // Resolving through the registry also records the domain's usage
        let domain = match self.registry.get(&candidate.domain_name).await {
            Ok(domain) => domain,
            Err(e) => {
                self.metrics.write().await.record_failure();
                warn!(
                    request_id = %request.request_id,
                    domain = %candidate.domain_name,
                    error = %e,
                    "Selected domain disappeared before it could be resolved"
                );
                return Err(e.into());
            }
        };

        let processing_time = started.elapsed();
        self.metrics.write().await.record_success(
            candidate.strategy,
            &candidate.domain_name,
            candidate.confidence,
            processing_time,
        );

        info!(
            request_id = %request.request_id,
            session_id = %request.session_id,
            domain = %candidate.domain_name,
            strategy = %candidate.strategy,
            confidence = candidate.confidence,
            elapsed_us = processing_time.as_micros() as u64,
            "Routed request"
        );

        Ok(RoutingResponse {
            domain_name: candidate.domain_name,
            domain,
            strategy: candidate.strategy,
            confidence: candidate.confidence,
            reason: candidate.reason,
            alternatives: candidate.alternatives,
            matched_keywords: candidate.matched_keywords,
            matched_verbs: candidate.matched_verbs,
            context_keys: candidate.context_keys,
            processing_time,
            request_id: request.request_id,
            timestamp,
        })
    }

    async fn select(&self, request: &RoutingRequest) -> RoutingResult<RouteCandidate> {
        let scope = RoutingScope {
            registered: self.registry.list().await,
            excluded: &request.excluded_domains,
            preferred: &request.preferred_domains,
        };

        if let Some(candidate) = self.route_by_explicit_switch(request, &scope)? {
            return Ok(candidate);
        }

        for strategy in HEURISTIC_ORDER {
            let attempt = match strategy {
                RoutingStrategy::Verb => self.route_by_dsl_verbs(request, &scope).await,
                RoutingStrategy::Context => self.route_by_context(request, &scope),
                RoutingStrategy::Keyword => self.route_by_keywords(request, &scope),
                RoutingStrategy::Default => self.route_by_default(request, &scope),
                RoutingStrategy::Explicit | RoutingStrategy::Fallback => Ok(None),
            };
            match attempt {
                Ok(Some(candidate)) => return Ok(candidate),
                Ok(None) => debug!(strategy = %strategy, "Strategy declined"),
                Err(e) => debug!(strategy = %strategy, error = %e, "Strategy failed"),
            }
        }

        self.route_by_fallback(&scope)
            .map_err(|e| RoutingError::Exhausted {
                source: Box::new(e),
            })
    }

    /// Snapshot of the routing metrics
    pub async fn get_routing_metrics(&self) -> RoutingMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn reset_metrics(&self) {
        *self.metrics.write().await = RoutingMetrics::default();
        info!("Routing metrics reset");
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
