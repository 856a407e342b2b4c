//! Error types for the domain registry and router
//!
//! Registration and lookup failures are [`RegistryError`]s, routing failures
//! are [`RoutingError`]s. A strategy that simply has no opinion is not an
//! error; see `router::strategies`.

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Domain error: {0}")]
    Domain(#[from] domain_types::DomainError),
}

/// Registration and lookup errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Domain '{name}' is already registered")]
    AlreadyRegistered { name: String },

    #[error("Domain '{name}' is not registered")]
    NotRegistered { name: String },

    #[error("Invalid domain: {0}")]
    InvalidDomain(#[from] InvalidDomain),
}

/// Why a domain was refused at registration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidDomain {
    #[error("domain name cannot be empty")]
    EmptyName,

    #[error("domain '{domain}' has an empty version")]
    EmptyVersion { domain: String },

    #[error("domain '{domain}' has no vocabulary")]
    MissingVocabulary { domain: String },

    #[error("vocabulary domain name mismatch: domain '{domain}' declares vocabulary for '{vocabulary_domain}'")]
    NameMismatch {
        domain: String,
        vocabulary_domain: String,
    },

    #[error("domain '{domain}' has an inconsistent vocabulary: {reason}")]
    InconsistentVocabulary { domain: String, reason: String },
}

/// Routing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Invalid routing request: {0}")]
    InvalidRequest(String),

    #[error("Unknown domain '{requested}'{}", did_you_mean(.suggestion))]
    UnknownDomain {
        requested: String,
        suggestion: Option<String>,
    },

    #[error("No domains available for routing")]
    NoDomainsAvailable,

    #[error("All routing strategies failed: {source}")]
    Exhausted {
        #[source]
        source: Box<RoutingError>,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Invalid configuration values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Mapping for '{key}' targets an empty domain name")]
    EmptyMappingTarget { key: String },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

pub type RegistryResult<T> = Result<T, RegistryError>;
pub type RoutingResult<T> = Result<T, RoutingError>;
