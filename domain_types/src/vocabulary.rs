//! Domain vocabulary
//!
//! A [`Vocabulary`] is the complete description of what a domain can say:
//! its verbs (keyed by their dotted `domain.action` names), the categories
//! the verbs are grouped under, and the ordered list of valid states.
//!
//! ## Verb Naming Convention
//!
//! Verbs follow the domain-prefixed format: "domain.action"
//! (e.g. `onboarding.start`, `hedge-fund-investor.subscribe`). The prefix is
//! a convention only; the router relies on it for verb-based matching but
//! nothing here enforces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::{ArgumentSpec, DomainError, SessionContext};

// ============================================================================
// VOCABULARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Owning domain name; must equal `Domain::name()`
    pub domain: String,
    pub version: String,
    pub description: String,
    pub verbs: HashMap<String, VerbDefinition>,
    pub categories: HashMap<String, VerbCategory>,
    /// Valid state names, in lifecycle order
    pub states: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vocabulary {
    pub fn new(
        domain: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            domain: domain.into(),
            version: version.into(),
            description: description.into(),
            verbs: HashMap::new(),
            categories: HashMap::new(),
            states: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a verb, keyed by its own name. Also lists it under its category
    /// when that category has already been declared.
    pub fn with_verb(mut self, verb: VerbDefinition) -> Self {
        if let Some(category) = self.categories.get_mut(&verb.category) {
            if !category.verbs.contains(&verb.name) {
                category.verbs.push(verb.name.clone());
            }
        }
        self.verbs.insert(verb.name.clone(), verb);
        self
    }

    pub fn with_category(mut self, category: VerbCategory) -> Self {
        self.categories.insert(category.name.clone(), category);
        self
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn verb(&self, name: &str) -> Option<&VerbDefinition> {
        self.verbs.get(name)
    }

    pub fn has_verb(&self, name: &str) -> bool {
        self.verbs.contains_key(name)
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    /// All verb names, sorted
    pub fn verb_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.verbs.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the verbs whose category is `category`, sorted
    pub fn verbs_in_category(&self, category: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .verbs
            .values()
            .filter(|v| v.category == category)
            .map(|v| v.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Check the vocabulary is internally consistent.
    ///
    /// - every verb is keyed by its own name
    /// - when categories are declared, every verb's category is one of them
    /// - when states are declared, every transition references known states
    pub fn validate(&self) -> Result<(), DomainError> {
        for (key, verb) in &self.verbs {
            if key != &verb.name {
                return Err(self.inconsistent(format!(
                    "verb keyed as '{}' is named '{}'",
                    key, verb.name
                )));
            }

            if !self.categories.is_empty() && !self.categories.contains_key(&verb.category) {
                return Err(self.inconsistent(format!(
                    "verb '{}' references undeclared category '{}'",
                    verb.name, verb.category
                )));
            }

            if let (Some(transition), false) = (&verb.state_transition, self.states.is_empty()) {
                let unknown = transition
                    .from_states
                    .iter()
                    .chain(std::iter::once(&transition.to_state))
                    .find(|s| !self.has_state(s));
                if let Some(state) = unknown {
                    return Err(self.inconsistent(format!(
                        "verb '{}' transitions through unknown state '{}'",
                        verb.name, state
                    )));
                }
            }
        }
        Ok(())
    }

    fn inconsistent(&self, message: String) -> DomainError {
        DomainError::ValidationFailed {
            domain: self.domain.clone(),
            message,
        }
    }
}

// ============================================================================
// VERBS AND CATEGORIES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerbDefinition {
    /// Dotted name, e.g. `onboarding.start`
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub arguments: HashMap<String, ArgumentSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_transition: Option<StateTransition>,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guard_conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_effects: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerbDefinition {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            category: category.into(),
            version: "1.0.0".to_string(),
            description: String::new(),
            arguments: HashMap::new(),
            state_transition: None,
            idempotent: false,
            guard_conditions: Vec::new(),
            side_effects: Vec::new(),
            examples: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_argument(mut self, spec: ArgumentSpec) -> Self {
        self.arguments.insert(spec.name.clone(), spec);
        self
    }

    pub fn with_transition(mut self, transition: StateTransition) -> Self {
        self.state_transition = Some(transition);
        self
    }

    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    /// The action part of the verb name (`start` for `onboarding.start`)
    pub fn action(&self) -> &str {
        self.name
            .split_once('.')
            .map(|(_, action)| action)
            .unwrap_or(&self.name)
    }

    /// Validate a full argument set: unknown names are rejected, required
    /// arguments must be present, and each value must satisfy its spec.
    pub fn validate_arguments(&self, args: &HashMap<String, Value>) -> Result<(), DomainError> {
        if let Some(unknown) = args.keys().find(|k| !self.arguments.contains_key(*k)) {
            return Err(DomainError::InvalidArgument {
                argument: unknown.clone(),
                reason: format!("not declared by verb '{}'", self.name),
            });
        }

        let mut specs: Vec<&ArgumentSpec> = self.arguments.values().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        for spec in specs {
            spec.validate_value(args.get(&spec.name).unwrap_or(&Value::Null))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerbCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub verbs: Vec<String>,
}

impl VerbCategory {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            verbs: Vec::new(),
        }
    }
}

// ============================================================================
// STATE TRANSITIONS
// ============================================================================

/// State change performed by a verb
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// States the verb may be applied from; empty means any
    #[serde(default)]
    pub from_states: Vec<String>,
    pub to_state: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<TransitionCondition>,
}

impl StateTransition {
    pub fn to(state: impl Into<String>) -> Self {
        Self {
            from_states: Vec::new(),
            to_state: state.into(),
            conditions: Vec::new(),
        }
    }

    pub fn from<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.from_states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn when(mut self, condition: TransitionCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_conditional(&self) -> bool {
        !self.conditions.is_empty()
    }

    pub fn allows_from(&self, state: &str) -> bool {
        self.from_states.is_empty() || self.from_states.iter().any(|s| s == state)
    }

    /// True when the transition may fire from `state` given `context`
    pub fn is_satisfied(&self, state: &str, context: &SessionContext) -> bool {
        self.allows_from(state) && self.conditions.iter().all(|c| c.evaluate(context))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Exists,
    In,
    Gt,
    Lt,
}

/// `field <operator> value` guard on a conditional transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionCondition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl TransitionCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn evaluate(&self, context: &SessionContext) -> bool {
        let actual = context.get(&self.field);
        match self.operator {
            ConditionOperator::Exists => actual.is_some_and(|v| !v.is_null()),
            ConditionOperator::Eq => actual == Some(&self.value),
            ConditionOperator::Ne => actual != Some(&self.value),
            ConditionOperator::In => match (&self.value, actual) {
                (Value::Array(options), Some(v)) => options.contains(v),
                _ => false,
            },
            ConditionOperator::Gt => compare(actual, &self.value).is_some_and(|o| o.is_gt()),
            ConditionOperator::Lt => compare(actual, &self.value).is_some_and(|o| o.is_lt()),
        }
    }
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<std::cmp::Ordering> {
    let a = actual?.as_f64()?;
    let b = expected.as_f64()?;
    a.partial_cmp(&b)
}
