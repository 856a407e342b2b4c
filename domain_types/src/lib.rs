//! Domain Types - Level 1 Foundation Types
//!
//! The capability contract every business domain (onboarding, hedge-fund
//! investor, KYC, UBO, ...) implements, plus the vocabulary data model a
//! domain exposes through it.
//!
//! ## Architecture Level: LEVEL 1 (Foundation)
//!
//! The registry and router build on this crate; this crate depends on no
//! other workspace crate. Domains are implemented by the embedding
//! application and handed to the registry as `Arc<dyn Domain>`.
//!
//! ## Contents
//!
//! - [`Domain`] - the capability trait
//! - [`Vocabulary`], [`VerbDefinition`], [`VerbCategory`] - verb catalog
//! - [`ArgumentSpec`], [`ArgumentType`] - verb argument schemas
//! - [`StateTransition`], [`TransitionCondition`] - state machine metadata
//! - [`DomainMetrics`] - self-reported telemetry
//! - [`GenerationRequest`], [`GenerationResponse`] - DSL generation I/O

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub mod argument;
pub mod vocabulary;

pub use argument::{ArgumentSpec, ArgumentType};
pub use vocabulary::{
    ConditionOperator, StateTransition, TransitionCondition, VerbCategory, VerbDefinition,
    Vocabulary,
};

/// Arbitrary session key/value context (e.g. `cbu_id`, `investor_id`,
/// `current_state`)
pub type SessionContext = HashMap<String, Value>;

// ============================================================================
// DOMAIN CAPABILITY
// ============================================================================

/// A pluggable business capability with its own verb vocabulary and state
/// machine.
///
/// The registry only reads a domain through these methods and never mutates
/// it. `is_healthy` and `metrics` are polled by the registry's background
/// health sampler, so they must be cheap and must not block.
#[async_trait]
pub trait Domain: Send + Sync {
    /// Stable registry key
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str;

    /// The domain's vocabulary. `vocabulary().domain` must equal `name()`;
    /// the registry checks this at registration.
    fn vocabulary(&self) -> Option<&Vocabulary>;

    /// Check that `dsl` only uses verbs this domain owns
    fn validate_verbs(&self, dsl: &str) -> Result<(), DomainError>;

    fn validate_state_transition(&self, from: &str, to: &str) -> Result<(), DomainError>;

    /// Turn a natural-language instruction into DSL. May be slow (can call
    /// out to a model).
    async fn generate_dsl(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, DomainError>;

    fn current_state(&self, context: &SessionContext) -> Result<String, DomainError>;

    fn valid_states(&self) -> Vec<String>;

    fn initial_state(&self) -> String;

    /// Extract domain context (ids, reached state) from accumulated DSL
    fn extract_context(&self, dsl: &str) -> Result<SessionContext, DomainError>;

    fn is_healthy(&self) -> bool;

    fn metrics(&self) -> DomainMetrics;
}

impl std::fmt::Debug for dyn Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.name())
            .field("version", &self.version())
            .finish()
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Errors produced by domain implementations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Empty DSL")]
    EmptyDsl,

    #[error("Unknown verb '{verb}' in domain '{domain}'")]
    UnknownVerb { domain: String, verb: String },

    #[error("Invalid state '{state}' in domain '{domain}'")]
    InvalidState { domain: String, state: String },

    #[error("Invalid state transition in domain '{domain}': {from} -> {to}")]
    InvalidStateTransition {
        domain: String,
        from: String,
        to: String,
    },

    #[error("Missing required argument '{argument}'")]
    MissingArgument { argument: String },

    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("Unsupported instruction in domain '{domain}': {instruction}")]
    UnsupportedInstruction { domain: String, instruction: String },

    #[error("Validation failed in domain '{domain}': {message}")]
    ValidationFailed { domain: String, message: String },

    #[error("DSL generation failed in domain '{domain}': {message}")]
    Generation { domain: String, message: String },
}

pub type DomainResult<T> = Result<T, DomainError>;

// ============================================================================
// METRICS
// ============================================================================

/// Telemetry a domain reports about itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_verbs: usize,
    pub active_verbs: usize,
    pub unused_verbs: usize,
    pub state_transitions: HashMap<String, u64>,
    pub current_states: HashMap<String, u64>,
    pub validation_errors: HashMap<String, u64>,
    pub generation_errors: HashMap<String, u64>,
    pub average_response_time: Duration,
    pub is_healthy: bool,
    pub last_health_check: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub memory_usage_bytes: u64,
    pub collected_at: DateTime<Utc>,
    pub version: String,
}

impl Default for DomainMetrics {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            total_verbs: 0,
            active_verbs: 0,
            unused_verbs: 0,
            state_transitions: HashMap::new(),
            current_states: HashMap::new(),
            validation_errors: HashMap::new(),
            generation_errors: HashMap::new(),
            average_response_time: Duration::ZERO,
            is_healthy: true,
            last_health_check: now,
            uptime_seconds: 0,
            memory_usage_bytes: 0,
            collected_at: now,
            version: String::new(),
        }
    }
}

// ============================================================================
// DSL GENERATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub instruction: String,
    pub session_id: String,
    #[serde(default)]
    pub current_domain: Option<String>,
    #[serde(default)]
    pub context: SessionContext,
    /// DSL accumulated so far in the session
    #[serde(default)]
    pub existing_dsl: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            session_id: session_id.into(),
            current_domain: None,
            context: SessionContext::new(),
            existing_dsl: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub dsl: String,
    /// Primary verb of the generated DSL
    pub verb: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    pub is_valid: bool,
    pub confidence: f64,
    #[serde(default)]
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
}
