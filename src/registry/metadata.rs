//! Registry-owned bookkeeping: per-domain metadata and aggregate metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Last sampled health of a registered domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// Not sampled yet
    Unknown,
}

impl HealthStatus {
    pub fn from_probe(healthy: bool) -> Self {
        if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Usage and health bookkeeping for one registered domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainMetadata {
    pub registered_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub health_status: HealthStatus,
    pub last_health_check: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl DomainMetadata {
    pub fn new(tags: Vec<String>) -> Self {
        Self {
            registered_at: Utc::now(),
            last_used: None,
            usage_count: 0,
            health_status: HealthStatus::Unknown,
            last_health_check: None,
            tags,
        }
    }

    pub(crate) fn record_use(&mut self, at: DateTime<Utc>) {
        self.usage_count += 1;
        self.last_used = Some(at);
    }

    /// Apply a health sample; returns the previous status
    pub(crate) fn record_health(&mut self, status: HealthStatus, at: DateTime<Utc>) -> HealthStatus {
        let previous = self.health_status;
        self.health_status = status;
        self.last_health_check = Some(at);
        previous
    }
}

/// `list_with_metadata` projection of a registered domain
#[derive(Debug, Clone, Serialize)]
pub struct DomainInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub metadata: DomainMetadata,
}

/// Aggregate registry telemetry. Always handed out as a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryMetrics {
    pub total_domains: usize,
    pub healthy_domains: usize,
    pub unhealthy_domains: usize,
    pub total_requests: u64,
    pub domain_requests: BTreeMap<String, u64>,
    /// Mean of the response times the domains report about themselves
    pub average_response_time: Duration,
    pub uptime: Duration,
    pub last_updated: DateTime<Utc>,
}

impl Default for RegistryMetrics {
    fn default() -> Self {
        Self {
            total_domains: 0,
            healthy_domains: 0,
            unhealthy_domains: 0,
            total_requests: 0,
            domain_requests: BTreeMap::new(),
            average_response_time: Duration::ZERO,
            uptime: Duration::ZERO,
            last_updated: Utc::now(),
        }
    }
}
