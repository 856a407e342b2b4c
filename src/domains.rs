//! Vocabulary-driven domain
//!
//! [`VocabularyDomain`] implements the whole [`Domain`] contract from a
//! [`Vocabulary`] alone: verb validation, state transitions taken from the
//! verbs' transition metadata, context extraction and example-based DSL
//! generation. Domains with no bespoke logic (or whose vocabulary is loaded
//! from configuration) can be registered without writing a handler.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use domain_types::{
    Domain, DomainError, DomainMetrics, GenerationRequest, GenerationResponse, SessionContext,
    Vocabulary,
};
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::router::verbs::{extract_verbs_lenient, SExprVerbExtractor, VerbExtractor};

/// `:cbu-id "CBU-1234"` style identifier arguments
static ID_ARGUMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#":([a-z][a-z0-9-]*-id)\s+"([^"]*)""#).unwrap());

pub const CURRENT_STATE_KEY: &str = "current_state";

pub struct VocabularyDomain {
    name: String,
    vocabulary: Vocabulary,
    healthy: AtomicBool,
    started_at: Instant,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
}

impl VocabularyDomain {
    /// Domain named after its vocabulary
    pub fn new(vocabulary: Vocabulary) -> Self {
        let name = vocabulary.domain.clone();
        Self::named(name, vocabulary)
    }

    /// Domain with an explicit name. The registry refuses it unless the
    /// vocabulary declares the same name.
    pub fn named(name: impl Into<String>, vocabulary: Vocabulary) -> Self {
        Self {
            name: name.into(),
            vocabulary,
            healthy: AtomicBool::new(true),
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    fn verbs_in(&self, dsl: &str) -> Vec<String> {
        SExprVerbExtractor
            .extract_verbs(dsl)
            .unwrap_or_else(|_| extract_verbs_lenient(dsl))
    }

    /// Pick the verb an instruction asks for: a full verb name beats a bare
    /// action word
    fn match_instruction(&self, instruction: &str) -> Option<(&str, f64)> {
        let instruction = instruction.to_lowercase();
        let names = self.vocabulary.verb_names();

        let by_name = names.iter().find(|name| instruction.contains(name.as_str()));
        if let Some(name) = by_name {
            return self.vocabulary.verb(name).map(|v| (v.name.as_str(), 0.9));
        }

        names
            .iter()
            .filter_map(|name| self.vocabulary.verb(name))
            .find(|verb| {
                let action = verb.action().replace('-', " ");
                !action.is_empty()
                    && instruction
                        .split(|c: char| !c.is_alphanumeric())
                        .any(|word| word == action || (word.len() > 3 && action.starts_with(word)))
            })
            .map(|verb| (verb.name.as_str(), 0.6))
    }
}

#[async_trait]
impl Domain for VocabularyDomain {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.vocabulary.version
    }

    fn description(&self) -> &str {
        &self.vocabulary.description
    }

    fn vocabulary(&self) -> Option<&Vocabulary> {
        Some(&self.vocabulary)
    }

    fn validate_verbs(&self, dsl: &str) -> Result<(), DomainError> {
        if dsl.trim().is_empty() {
            return Err(DomainError::EmptyDsl);
        }
        let verbs = SExprVerbExtractor
            .extract_verbs(dsl)
            .map_err(|e| DomainError::ValidationFailed {
                domain: self.name.clone(),
                message: e.to_string(),
            })?;
        match verbs.into_iter().find(|v| !self.vocabulary.has_verb(v)) {
            Some(verb) => Err(DomainError::UnknownVerb {
                domain: self.name.clone(),
                verb,
            }),
            None => Ok(()),
        }
    }

    fn validate_state_transition(&self, from: &str, to: &str) -> Result<(), DomainError> {
        for state in [from, to] {
            if !self.vocabulary.has_state(state) {
                return Err(DomainError::InvalidState {
                    domain: self.name.clone(),
                    state: state.to_string(),
                });
            }
        }

        let allowed = self
            .vocabulary
            .verbs
            .values()
            .filter_map(|verb| verb.state_transition.as_ref())
            .any(|t| t.to_state == to && t.allows_from(from));
        if allowed {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                domain: self.name.clone(),
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    async fn generate_dsl(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, DomainError> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let matched = self
            .match_instruction(&request.instruction)
            .and_then(|(name, confidence)| {
                let verb = self.vocabulary.verb(name)?;
                let example = verb.examples.first()?;
                Some((verb, example.clone(), confidence))
            });

        let Some((verb, dsl, confidence)) = matched else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
            return Err(DomainError::UnsupportedInstruction {
                domain: self.name.clone(),
                instruction: request.instruction.clone(),
            });
        };

        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        debug!(domain = %self.name, verb = %verb.name, "Generated DSL from verb example");

        Ok(GenerationResponse {
            is_valid: self.validate_verbs(&dsl).is_ok(),
            dsl,
            verb: verb.name.clone(),
            parameters: Default::default(),
            confidence,
            explanation: format!("Example usage of '{}'", verb.name),
            timestamp: Utc::now(),
        })
    }

    fn current_state(&self, context: &SessionContext) -> Result<String, DomainError> {
        match context.get(CURRENT_STATE_KEY).and_then(Value::as_str) {
            Some(state) if self.vocabulary.has_state(state) => Ok(state.to_string()),
            Some(state) => Err(DomainError::InvalidState {
                domain: self.name.clone(),
                state: state.to_string(),
            }),
            None => Ok(self.initial_state()),
        }
    }

    fn valid_states(&self) -> Vec<String> {
        self.vocabulary.states.clone()
    }

    fn initial_state(&self) -> String {
        self.vocabulary.states.first().cloned().unwrap_or_default()
    }

    fn extract_context(&self, dsl: &str) -> Result<SessionContext, DomainError> {
        if dsl.trim().is_empty() {
            return Err(DomainError::EmptyDsl);
        }

        let mut context = SessionContext::new();
        for verb in self.verbs_in(dsl) {
            let Some(definition) = self.vocabulary.verb(&verb) else {
                continue;
            };
            if let Some(transition) = &definition.state_transition {
                context.insert(CURRENT_STATE_KEY.to_string(), json!(transition.to_state));
            }
            context.insert("last_verb".to_string(), json!(verb));
        }

        for caps in ID_ARGUMENT_RE.captures_iter(dsl) {
            context.insert(caps[1].replace('-', "_"), json!(&caps[2]));
        }
        Ok(context)
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn metrics(&self) -> DomainMetrics {
        let now = Utc::now();
        DomainMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            total_verbs: self.vocabulary.verbs.len(),
            is_healthy: self.is_healthy(),
            last_health_check: now,
            uptime_seconds: self.started_at.elapsed().as_secs(),
            collected_at: now,
            version: self.vocabulary.version.clone(),
            ..DomainMetrics::default()
        }
    }
}
