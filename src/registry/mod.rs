//! Domain Registry
//!
//! Thread-safe catalog of [`Domain`] implementations keyed by name. Besides
//! lookup it keeps per-domain usage metadata, aggregate metrics and a
//! periodically sampled health status.
//!
//! All state sits behind a single `tokio::sync::RwLock`, so every read sees
//! a consistent snapshot of domains, metadata and metrics together. Usage
//! recording on [`Registry::get`] is fire-and-forget so lookups never wait
//! on the write lock.
//!
//! ```rust,ignore
//! let registry = Registry::new();
//! registry.register(Arc::new(OnboardingDomain::new())).await?;
//! let domain = registry.get("onboarding").await?;
//! ```

mod health;
pub mod metadata;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use domain_types::{Domain, Vocabulary};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::error::{ConfigError, InvalidDomain, RegistryError, RegistryResult};

pub use metadata::{DomainInfo, DomainMetadata, HealthStatus, RegistryMetrics};

// ============================================================================
// SHARED STATE
// ============================================================================

struct RegistryState {
    domains: BTreeMap<String, Arc<dyn Domain>>,
    metadata: BTreeMap<String, DomainMetadata>,
    metrics: RegistryMetrics,
}

pub(crate) struct RegistryInner {
    state: RwLock<RegistryState>,
    started_at: Instant,
}

impl RegistryInner {
    fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                domains: BTreeMap::new(),
                metadata: BTreeMap::new(),
                metrics: RegistryMetrics::default(),
            }),
            started_at: Instant::now(),
        }
    }

    /// Rebuild the derived counters from the current domain set
    fn recompute_metrics(&self, state: &mut RegistryState) {
        let total = state.domains.len();
        let healthy = state.domains.values().filter(|d| d.is_healthy()).count();

        let average_response_time = if total == 0 {
            Duration::ZERO
        } else {
            let sum: Duration = state
                .domains
                .values()
                .map(|d| d.metrics().average_response_time)
                .sum();
            sum / total as u32
        };

        let metrics = &mut state.metrics;
        metrics.total_domains = total;
        metrics.healthy_domains = healthy;
        metrics.unhealthy_domains = total - healthy;
        metrics.average_response_time = average_response_time;
        metrics.uptime = self.started_at.elapsed();
        metrics.last_updated = Utc::now();
    }

    async fn record_usage(&self, name: &str) {
        let mut state = self.state.write().await;
        let now = Utc::now();

        // Domain may have been unregistered since the lookup
        let Some(metadata) = state.metadata.get_mut(name) else {
            return;
        };
        metadata.record_use(now);
        let usage_count = metadata.usage_count;

        let metrics = &mut state.metrics;
        metrics.total_requests += 1;
        *metrics.domain_requests.entry(name.to_string()).or_insert(0) += 1;
        metrics.last_updated = now;

        debug!(domain = %name, usage_count, "Recorded domain usage");
    }

    /// Probe every domain once and refresh statuses and metrics
    pub(super) async fn sample_health(&self) -> BTreeMap<String, HealthStatus> {
        let snapshot: Vec<(String, Arc<dyn Domain>)> = {
            let state = self.state.read().await;
            state
                .domains
                .iter()
                .map(|(name, domain)| (name.clone(), Arc::clone(domain)))
                .collect()
        };

        let statuses: BTreeMap<String, HealthStatus> = snapshot
            .iter()
            .map(|(name, domain)| (name.clone(), HealthStatus::from_probe(domain.is_healthy())))
            .collect();

        let mut state = self.state.write().await;
        let now = Utc::now();
        for (name, status) in &statuses {
            let Some(metadata) = state.metadata.get_mut(name) else {
                continue;
            };
            let previous = metadata.record_health(*status, now);
            match (previous, *status) {
                (HealthStatus::Healthy | HealthStatus::Unknown, HealthStatus::Unhealthy) => {
                    warn!(domain = %name, "Domain reported unhealthy");
                }
                (HealthStatus::Unhealthy, HealthStatus::Healthy) => {
                    info!(domain = %name, "Domain recovered");
                }
                _ => {}
            }
        }
        self.recompute_metrics(&mut state);

        debug!(
            domains = statuses.len(),
            healthy = state.metrics.healthy_domains,
            "Health sample complete"
        );
        statuses
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Thread-safe domain catalog; share it as `Arc<Registry>`
pub struct Registry {
    inner: Arc<RegistryInner>,
    config: RegistryConfig,
    shutdown_tx: watch::Sender<bool>,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl Registry {
    /// Registry with default configuration. The health sampler starts if a
    /// Tokio runtime is available.
    pub fn new() -> Self {
        Self::build(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RegistryConfig) -> Self {
        let inner = Arc::new(RegistryInner::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let health_task = if !config.enable_health_checks {
            None
        } else if tokio::runtime::Handle::try_current().is_err() {
            warn!("No Tokio runtime available, domain health sampling disabled");
            None
        } else {
            Some(health::spawn_health_sampler(
                Arc::downgrade(&inner),
                config.health_check_interval,
                shutdown_rx,
            ))
        };

        Self {
            inner,
            config,
            shutdown_tx,
            health_task: Mutex::new(health_task),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    pub async fn register(&self, domain: Arc<dyn Domain>) -> RegistryResult<()> {
        self.register_with_tags(domain, Vec::new()).await
    }

    /// Register a domain with free-form tags. Either fully succeeds or
    /// leaves the registry untouched.
    pub async fn register_with_tags(
        &self,
        domain: Arc<dyn Domain>,
        tags: Vec<String>,
    ) -> RegistryResult<()> {
        validate_domain(domain.as_ref())?;
        let name = domain.name().to_string();
        let version = domain.version().to_string();

        let mut state = self.inner.state.write().await;
        if state.domains.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered { name });
        }

        state.domains.insert(name.clone(), domain);
        state.metadata.insert(name.clone(), DomainMetadata::new(tags));
        self.inner.recompute_metrics(&mut state);

        info!(
            domain = %name,
            version = %version,
            total_domains = state.metrics.total_domains,
            "Domain registered"
        );
        Ok(())
    }

    pub async fn unregister(&self, name: &str) -> RegistryResult<()> {
        let mut state = self.inner.state.write().await;
        if state.domains.remove(name).is_none() {
            return Err(RegistryError::NotRegistered {
                name: name.to_string(),
            });
        }
        state.metadata.remove(name);
        state.metrics.domain_requests.remove(name);
        self.inner.recompute_metrics(&mut state);

        info!(
            domain = %name,
            total_domains = state.metrics.total_domains,
            "Domain unregistered"
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Look up a domain and record the use in the background
    pub async fn get(&self, name: &str) -> RegistryResult<Arc<dyn Domain>> {
        let domain = {
            let state = self.inner.state.read().await;
            state.domains.get(name).cloned()
        }
        .ok_or_else(|| RegistryError::NotRegistered {
            name: name.to_string(),
        })?;

        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        tokio::spawn(async move {
            inner.record_usage(&name).await;
        });

        Ok(domain)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.state.read().await.domains.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.inner.state.read().await.domains.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.read().await.domains.is_empty()
    }

    /// Registered names in ascending order
    pub async fn list(&self) -> Vec<String> {
        self.inner.state.read().await.domains.keys().cloned().collect()
    }

    /// Registered domains with their metadata, sorted by name
    pub async fn list_with_metadata(&self) -> Vec<DomainInfo> {
        let state = self.inner.state.read().await;
        state
            .domains
            .iter()
            .filter_map(|(name, domain)| {
                let metadata = state.metadata.get(name)?;
                Some(DomainInfo {
                    name: name.clone(),
                    version: domain.version().to_string(),
                    description: domain.description().to_string(),
                    metadata: metadata.clone(),
                })
            })
            .collect()
    }

    pub async fn metadata(&self, name: &str) -> RegistryResult<DomainMetadata> {
        self.inner
            .state
            .read()
            .await
            .metadata
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotRegistered {
                name: name.to_string(),
            })
    }

    // ------------------------------------------------------------------------
    // Vocabulary queries
    // ------------------------------------------------------------------------

    pub async fn get_vocabulary(&self, name: &str) -> RegistryResult<Vocabulary> {
        let state = self.inner.state.read().await;
        let domain = state
            .domains
            .get(name)
            .ok_or_else(|| RegistryError::NotRegistered {
                name: name.to_string(),
            })?;
        domain.vocabulary().cloned().ok_or_else(|| {
            InvalidDomain::MissingVocabulary {
                domain: name.to_string(),
            }
            .into()
        })
    }

    pub async fn get_all_vocabularies(&self) -> BTreeMap<String, Vocabulary> {
        let state = self.inner.state.read().await;
        state
            .domains
            .iter()
            .filter_map(|(name, domain)| Some((name.clone(), domain.vocabulary()?.clone())))
            .collect()
    }

    /// Domains whose vocabulary defines `verb`, sorted by name
    pub async fn find_domains_by_verb(&self, verb: &str) -> Vec<String> {
        let state = self.inner.state.read().await;
        state
            .domains
            .iter()
            .filter(|(_, domain)| domain.vocabulary().is_some_and(|v| v.has_verb(verb)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Domains declaring `category` or owning a verb in it, sorted by name
    pub async fn find_domains_by_category(&self, category: &str) -> Vec<String> {
        let state = self.inner.state.read().await;
        state
            .domains
            .iter()
            .filter(|(_, domain)| {
                domain.vocabulary().is_some_and(|v| {
                    v.categories.contains_key(category)
                        || v.verbs.values().any(|verb| verb.category == category)
                })
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Health and metrics
    // ------------------------------------------------------------------------

    /// Live probe: true when every registered domain reports healthy
    pub async fn is_healthy(&self) -> bool {
        let state = self.inner.state.read().await;
        state.domains.values().all(|d| d.is_healthy())
    }

    /// Sample health now instead of waiting for the next tick
    pub async fn run_health_check(&self) -> BTreeMap<String, HealthStatus> {
        self.inner.sample_health().await
    }

    /// Snapshot of the aggregate metrics
    pub async fn get_metrics(&self) -> RegistryMetrics {
        let mut metrics = self.inner.state.read().await.metrics.clone();
        metrics.uptime = self.inner.started_at.elapsed();
        metrics
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Stop the health sampler and wait for it to exit. Safe to call more
    /// than once.
    pub async fn shutdown(&self) {
        let was_shut_down = self.shutdown_tx.send_replace(true);

        let handle = self.health_task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Health sampler task ended abnormally");
            }
        }

        if !was_shut_down {
            info!("Domain registry shut down");
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Structural checks a domain must pass before it is accepted
fn validate_domain(domain: &dyn Domain) -> Result<(), InvalidDomain> {
    let name = domain.name();
    if name.trim().is_empty() {
        return Err(InvalidDomain::EmptyName);
    }
    if domain.version().trim().is_empty() {
        return Err(InvalidDomain::EmptyVersion {
            domain: name.to_string(),
        });
    }

    let vocabulary = domain
        .vocabulary()
        .ok_or_else(|| InvalidDomain::MissingVocabulary {
            domain: name.to_string(),
        })?;
    if vocabulary.domain != name {
        return Err(InvalidDomain::NameMismatch {
            domain: name.to_string(),
            vocabulary_domain: vocabulary.domain.clone(),
        });
    }
    vocabulary
        .validate()
        .map_err(|e| InvalidDomain::InconsistentVocabulary {
            domain: name.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::VocabularyDomain;
    use domain_types::{VerbDefinition, Vocabulary};

    fn vocabulary(name: &str) -> Vocabulary {
        Vocabulary::new(name, "1.0.0", "test vocabulary")
            .with_verb(VerbDefinition::new(format!("{}.start", name), "lifecycle"))
            .with_states(["CREATED", "ACTIVE"])
    }

    fn quiet_registry() -> Registry {
        Registry::with_config(RegistryConfig::without_health_checks()).unwrap()
    }

    #[test]
    fn test_validate_domain_rejects_name_mismatch() {
        let domain = VocabularyDomain::named("onboarding", vocabulary("kyc"));
        let err = validate_domain(&domain).unwrap_err();
        assert!(matches!(err, InvalidDomain::NameMismatch { .. }));
        assert!(err.to_string().contains("vocabulary domain name mismatch"));
    }

    #[test]
    fn test_validate_domain_rejects_inconsistent_vocabulary() {
        let mut vocab = vocabulary("kyc");
        vocab.verbs.insert(
            "kyc.approve".to_string(),
            VerbDefinition::new("kyc.approve", "lifecycle")
                .with_transition(domain_types::StateTransition::to("APPROVED")),
        );
        let domain = VocabularyDomain::new(vocab);
        assert!(matches!(
            validate_domain(&domain),
            Err(InvalidDomain::InconsistentVocabulary { .. })
        ));
    }

    #[tokio::test]
    async fn test_record_usage_ignores_unregistered_name() {
        let registry = quiet_registry();
        registry.inner.record_usage("ghost").await;
        let metrics = registry.get_metrics().await;
        assert_eq!(metrics.total_requests, 0);
        assert!(metrics.domain_requests.is_empty());
    }

    #[tokio::test]
    async fn test_recompute_tracks_health_and_response_time() {
        let registry = quiet_registry();
        let healthy = Arc::new(VocabularyDomain::new(vocabulary("alpha")));
        let sick = Arc::new(VocabularyDomain::new(vocabulary("beta")));
        sick.set_healthy(false);

        registry.register(healthy).await.unwrap();
        registry.register(sick.clone()).await.unwrap();

        let metrics = registry.get_metrics().await;
        assert_eq!(metrics.total_domains, 2);
        assert_eq!(metrics.healthy_domains, 1);
        assert_eq!(metrics.unhealthy_domains, 1);
        assert_eq!(metrics.average_response_time, Duration::ZERO);

        sick.set_healthy(true);
        let statuses = registry.run_health_check().await;
        assert_eq!(statuses["beta"], HealthStatus::Healthy);
        assert_eq!(registry.get_metrics().await.healthy_domains, 2);
    }
}
