//! Shared fixtures for the registry and router integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ob_domain_registry::domain_types::{
    Domain, DomainError, DomainMetrics, GenerationRequest, GenerationResponse, SessionContext,
    StateTransition, VerbCategory, VerbDefinition, Vocabulary,
};
use ob_domain_registry::{Registry, RegistryConfig, VocabularyDomain};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ob_domain_registry=debug")
        .with_test_writer()
        .try_init();
}

pub fn onboarding_vocabulary() -> Vocabulary {
    Vocabulary::new("onboarding", "1.0.0", "Client onboarding")
        .with_category(VerbCategory::new("lifecycle", "Case lifecycle"))
        .with_category(VerbCategory::new("products", "Product selection"))
        .with_states(["CREATE", "ADD_PRODUCTS", "PRODUCTS_ADDED", "COMPLETE"])
        .with_verb(
            VerbDefinition::new("onboarding.start", "lifecycle")
                .with_transition(StateTransition::to("CREATE"))
                .with_example("(onboarding.start :cbu-id \"CBU-1234\")"),
        )
        .with_verb(
            VerbDefinition::new("onboarding.add-products", "products")
                .with_transition(StateTransition::to("PRODUCTS_ADDED").from(["CREATE"])),
        )
        .with_verb(
            VerbDefinition::new("onboarding.complete", "lifecycle")
                .with_transition(StateTransition::to("COMPLETE").from(["PRODUCTS_ADDED"])),
        )
}

pub fn hedge_fund_vocabulary() -> Vocabulary {
    Vocabulary::new("hedge-fund-investor", "2.1.0", "Hedge fund investor lifecycle")
        .with_states(["OPPORTUNITY", "KYC_PENDING", "SUB_PENDING_CASH", "ISSUED"])
        .with_verb(
            VerbDefinition::new("hedge-fund-investor.start", "lifecycle")
                .with_transition(StateTransition::to("OPPORTUNITY")),
        )
        .with_verb(
            VerbDefinition::new("hedge-fund-investor.subscribe", "trading").with_transition(
                StateTransition::to("SUB_PENDING_CASH").from(["KYC_PENDING"]),
            ),
        )
        .with_verb(VerbDefinition::new("kyc.collect-documents", "kyc"))
}

/// Minimal vocabulary with CREATED/ACTIVE/COMPLETED states
pub fn simple_vocabulary(name: &str) -> Vocabulary {
    Vocabulary::new(name, "1.0.0", format!("{} domain", name))
        .with_states(["CREATED", "ACTIVE", "COMPLETED"])
        .with_verb(
            VerbDefinition::new(format!("{}.start", name), "lifecycle")
                .with_transition(StateTransition::to("ACTIVE").from(["CREATED"])),
        )
        .with_verb(
            VerbDefinition::new(format!("{}.finish", name), "lifecycle")
                .with_transition(StateTransition::to("COMPLETED").from(["ACTIVE"])),
        )
}

pub fn onboarding() -> Arc<VocabularyDomain> {
    Arc::new(VocabularyDomain::new(onboarding_vocabulary()))
}

pub fn hedge_fund_investor() -> Arc<VocabularyDomain> {
    Arc::new(VocabularyDomain::new(hedge_fund_vocabulary()))
}

pub fn quiet_registry() -> Arc<Registry> {
    Arc::new(Registry::with_config(RegistryConfig::without_health_checks()).unwrap())
}

/// Registry holding onboarding and hedge-fund-investor, sampler off
pub async fn standard_registry() -> Arc<Registry> {
    let registry = quiet_registry();
    registry.register(onboarding()).await.unwrap();
    registry.register(hedge_fund_investor()).await.unwrap();
    registry
}

/// Wait for fire-and-forget usage recording to land
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}

// ============================================================================
// PROBE DOMAIN
// ============================================================================

/// Delegates to a vocabulary domain and counts health probes
pub struct ProbeDomain {
    inner: VocabularyDomain,
    health_probes: AtomicU64,
}

impl ProbeDomain {
    pub fn new(name: &str) -> Self {
        Self {
            inner: VocabularyDomain::new(simple_vocabulary(name)),
            health_probes: AtomicU64::new(0),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.inner.set_healthy(healthy);
    }

    pub fn health_probes(&self) -> u64 {
        self.health_probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Domain for ProbeDomain {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> &str {
        self.inner.version()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn vocabulary(&self) -> Option<&Vocabulary> {
        self.inner.vocabulary()
    }

    fn validate_verbs(&self, dsl: &str) -> Result<(), DomainError> {
        self.inner.validate_verbs(dsl)
    }

    fn validate_state_transition(&self, from: &str, to: &str) -> Result<(), DomainError> {
        self.inner.validate_state_transition(from, to)
    }

    async fn generate_dsl(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, DomainError> {
        self.inner.generate_dsl(request).await
    }

    fn current_state(&self, context: &SessionContext) -> Result<String, DomainError> {
        self.inner.current_state(context)
    }

    fn valid_states(&self) -> Vec<String> {
        self.inner.valid_states()
    }

    fn initial_state(&self) -> String {
        self.inner.initial_state()
    }

    fn extract_context(&self, dsl: &str) -> Result<SessionContext, DomainError> {
        self.inner.extract_context(dsl)
    }

    fn is_healthy(&self) -> bool {
        self.health_probes.fetch_add(1, Ordering::SeqCst);
        self.inner.is_healthy()
    }

    fn metrics(&self) -> DomainMetrics {
        self.inner.metrics()
    }
}
