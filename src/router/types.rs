//! Routing request, response and metrics types

use chrono::{DateTime, Utc};
use domain_types::{Domain, SessionContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Which strategy produced a routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingStrategy {
    /// "switch to X domain"
    Explicit,
    /// DSL verbs owned by a domain
    Verb,
    /// Session context keys or current state
    Context,
    /// Keyword found in the message
    Keyword,
    /// Current session domain, or the first registered one
    Default,
    /// Last resort
    Fallback,
}

impl RoutingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStrategy::Explicit => "EXPLICIT",
            RoutingStrategy::Verb => "VERB",
            RoutingStrategy::Context => "CONTEXT",
            RoutingStrategy::Keyword => "KEYWORD",
            RoutingStrategy::Default => "DEFAULT",
            RoutingStrategy::Fallback => "FALLBACK",
        }
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// A user message to be routed to a domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRequest {
    pub request_id: Uuid,
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub current_domain: Option<String>,
    #[serde(default)]
    pub context: Option<SessionContext>,
    /// DSL accumulated so far in the session
    #[serde(default)]
    pub dsl: Option<String>,
    /// Win ties between equally scored domains
    #[serde(default)]
    pub preferred_domains: Vec<String>,
    /// Never selected, except by an explicit switch
    #[serde(default)]
    pub excluded_domains: Vec<String>,
    /// Defaults to the routing time when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RoutingRequest {
    pub fn new(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            message: message.into(),
            session_id: session_id.into(),
            current_domain: None,
            context: None,
            dsl: None,
            preferred_domains: Vec::new(),
            excluded_domains: Vec::new(),
            timestamp: None,
        }
    }

    pub fn with_current_domain(mut self, domain: impl Into<String>) -> Self {
        self.current_domain = Some(domain.into());
        self
    }

    pub fn with_context(mut self, context: SessionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_dsl(mut self, dsl: impl Into<String>) -> Self {
        self.dsl = Some(dsl.into());
        self
    }

    pub fn with_preferred_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excluded_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

// ============================================================================
// RESPONSE
// ============================================================================

/// The routing decision with its evidence
#[derive(Debug, Clone, Serialize)]
pub struct RoutingResponse {
    pub domain_name: String,
    #[serde(skip)]
    pub domain: Arc<dyn Domain>,
    pub strategy: RoutingStrategy,
    /// In [0, 1]
    pub confidence: f64,
    pub reason: String,
    /// Other domains that also matched
    pub alternatives: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub matched_verbs: Vec<String>,
    pub context_keys: Vec<String>,
    pub processing_time: Duration,
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// METRICS
// ============================================================================

/// Router telemetry; handed out as a copy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingMetrics {
    pub total_requests: u64,
    pub successful_routings: u64,
    pub failed_routings: u64,
    pub strategy_usage: BTreeMap<RoutingStrategy, u64>,
    pub domain_selections: BTreeMap<String, u64>,
    /// Running mean over successful routings
    pub average_confidence: f64,
    /// Running mean over successful routings
    pub average_response_time: Duration,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RoutingMetrics {
    pub(crate) fn record_success(
        &mut self,
        strategy: RoutingStrategy,
        domain: &str,
        confidence: f64,
        elapsed: Duration,
    ) {
        self.total_requests += 1;
        self.successful_routings += 1;
        *self.strategy_usage.entry(strategy).or_insert(0) += 1;
        *self.domain_selections.entry(domain.to_string()).or_insert(0) += 1;

        let n = self.successful_routings as f64;
        self.average_confidence += (confidence - self.average_confidence) / n;

        let average = self.average_response_time.as_secs_f64();
        let updated = average + (elapsed.as_secs_f64() - average) / n;
        self.average_response_time = Duration::from_secs_f64(updated.max(0.0));

        self.last_updated = Some(Utc::now());
    }

    pub(crate) fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_routings += 1;
        self.last_updated = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = RoutingRequest::new("onboard client", "session-1")
            .with_current_domain("onboarding")
            .with_dsl("(case.create)")
            .with_preferred_domains(["onboarding"])
            .with_excluded_domains(vec!["kyc".to_string()]);

        assert_eq!(request.current_domain.as_deref(), Some("onboarding"));
        assert_eq!(request.preferred_domains, vec!["onboarding"]);
        assert_eq!(request.excluded_domains, vec!["kyc"]);
        assert!(request.timestamp.is_none());
        assert_ne!(request.request_id, RoutingRequest::new("x", "y").request_id);
    }

    #[test]
    fn test_running_averages() {
        let mut metrics = RoutingMetrics::default();
        metrics.record_success(RoutingStrategy::Keyword, "onboarding", 0.4, Duration::from_millis(2));
        metrics.record_success(RoutingStrategy::Verb, "onboarding", 1.0, Duration::from_millis(4));
        metrics.record_failure();

        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.successful_routings, 2);
        assert_eq!(metrics.failed_routings, 1);
        assert!((metrics.average_confidence - 0.7).abs() < 1e-9);
        let avg_ms = metrics.average_response_time.as_secs_f64() * 1000.0;
        assert!((avg_ms - 3.0).abs() < 1e-6);
        assert_eq!(metrics.domain_selections["onboarding"], 2);
        assert_eq!(metrics.strategy_usage[&RoutingStrategy::Keyword], 1);
    }

    #[test]
    fn test_strategy_serializes_upper_case() {
        let json = serde_json::to_string(&RoutingStrategy::Explicit).unwrap();
        assert_eq!(json, "\"EXPLICIT\"");
        assert_eq!(RoutingStrategy::Fallback.to_string(), "FALLBACK");
    }
}
