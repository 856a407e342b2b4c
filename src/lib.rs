//! OB Domain Registry - multi-domain routing for the onboarding DSL
//!
//! Business capabilities (onboarding, hedge-fund investor, KYC, UBO, ...)
//! are pluggable [`Domain`]s. The [`Registry`] catalogs them and samples
//! their health; the [`Router`] decides which one should handle a user
//! message.
//!
//! ## Call Chain
//! User message -> Router (explicit / verb / context / keyword / default /
//! fallback) -> Registry lookup -> Domain
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ob_domain_registry::{Registry, Router, RoutingRequest, VocabularyDomain};
//! use ob_domain_registry::domain_types::{VerbDefinition, Vocabulary};
//!
//! # async fn run() -> Result<(), ob_domain_registry::Error> {
//! let registry = Arc::new(Registry::new());
//! let vocabulary = Vocabulary::new("onboarding", "1.0.0", "Client onboarding")
//!     .with_verb(VerbDefinition::new("case.create", "case"));
//! registry.register(Arc::new(VocabularyDomain::new(vocabulary))).await?;
//!
//! let router = Router::new(registry.clone());
//! let response = router
//!     .route(&RoutingRequest::new(r#"(case.create :cbu-id "CBU-1234")"#, "session-1"))
//!     .await?;
//! assert_eq!(response.domain_name, "onboarding");
//!
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Registry and router configuration
pub mod config;

// Vocabulary-backed domain implementation
pub mod domains;

// Domain catalog with health sampling
pub mod registry;

// Message -> domain routing
pub mod router;

pub use domain_types;
pub use domain_types::{Domain, DomainError, DomainMetrics, SessionContext, Vocabulary};

pub use config::{RegistryConfig, RouterConfig};
pub use domains::VocabularyDomain;
pub use error::{
    ConfigError, Error, InvalidDomain, RegistryError, RegistryResult, RoutingError, RoutingResult,
};
pub use registry::{DomainInfo, DomainMetadata, HealthStatus, Registry, RegistryMetrics};
pub use router::{
    Router, RoutingMetrics, RoutingRequest, RoutingResponse, RoutingStrategy, VerbExtractor,
};
