//! Verb argument schemas
//!
//! Every verb declares its arguments as [`ArgumentSpec`] entries. The spec
//! carries the argument's type and the constraints that only make sense for
//! some types (enum members for ENUM, lengths for STRING/ARRAY, numeric
//! bounds for INTEGER/DECIMAL, a regex pattern for string values).

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::DomainError;

// ============================================================================
// ARGUMENT TYPES
// ============================================================================

/// Closed set of argument types understood by every domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArgumentType {
    Uuid,
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    Enum,
    Array,
    Object,
    Any,
}

impl std::fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgumentType::Uuid => write!(f, "UUID"),
            ArgumentType::String => write!(f, "STRING"),
            ArgumentType::Integer => write!(f, "INTEGER"),
            ArgumentType::Decimal => write!(f, "DECIMAL"),
            ArgumentType::Boolean => write!(f, "BOOLEAN"),
            ArgumentType::Date => write!(f, "DATE"),
            ArgumentType::Enum => write!(f, "ENUM"),
            ArgumentType::Array => write!(f, "ARRAY"),
            ArgumentType::Object => write!(f, "OBJECT"),
            ArgumentType::Any => write!(f, "ANY"),
        }
    }
}

// ============================================================================
// ARGUMENT SPEC
// ============================================================================

/// Schema for one verb argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub arg_type: ArgumentType,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub description: String,

    /// Allowed values (ENUM only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    /// Minimum length in characters (STRING) or elements (ARRAY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum length in characters (STRING) or elements (ARRAY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,

    /// Regex every string value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl ArgumentSpec {
    /// Create an optional argument of the given type with no constraints
    pub fn new(name: impl Into<String>, arg_type: ArgumentType) -> Self {
        Self {
            name: name.into(),
            arg_type,
            required: false,
            description: String::new(),
            enum_values: Vec::new(),
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            pattern: None,
            default_value: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Check a supplied value against the declared type and constraints.
    ///
    /// `Null` is accepted for optional arguments and rejected for required
    /// ones.
    pub fn validate_value(&self, value: &Value) -> Result<(), DomainError> {
        if value.is_null() {
            if self.required {
                return Err(DomainError::MissingArgument {
                    argument: self.name.clone(),
                });
            }
            return Ok(());
        }

        match self.arg_type {
            ArgumentType::Uuid => {
                let s = self.expect_str(value)?;
                Uuid::parse_str(s).map_err(|e| self.invalid(format!("not a UUID: {}", e)))?;
            }
            ArgumentType::String => {
                let s = self.expect_str(value)?;
                self.check_length(s.chars().count())?;
            }
            ArgumentType::Integer => {
                let n = match (value.as_i64(), value.as_u64()) {
                    (Some(n), _) => n as f64,
                    (None, Some(n)) => n as f64,
                    _ => return Err(self.invalid(format!("expected INTEGER, got {}", value))),
                };
                self.check_range(n)?;
            }
            ArgumentType::Decimal => {
                let n = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| self.invalid(format!("expected DECIMAL, got {}", value)))?;
                self.check_range(n)?;
            }
            ArgumentType::Boolean => {
                if !value.is_boolean() {
                    return Err(self.invalid(format!("expected BOOLEAN, got {}", value)));
                }
            }
            ArgumentType::Date => {
                let s = self.expect_str(value)?;
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|e| self.invalid(format!("not a YYYY-MM-DD date: {}", e)))?;
            }
            ArgumentType::Enum => {
                let s = self.expect_str(value)?;
                if !self.enum_values.iter().any(|v| v == s) {
                    return Err(self.invalid(format!(
                        "'{}' is not one of [{}]",
                        s,
                        self.enum_values.join(", ")
                    )));
                }
            }
            ArgumentType::Array => {
                let items = value
                    .as_array()
                    .ok_or_else(|| self.invalid(format!("expected ARRAY, got {}", value)))?;
                self.check_length(items.len())?;
            }
            ArgumentType::Object => {
                if !value.is_object() {
                    return Err(self.invalid(format!("expected OBJECT, got {}", value)));
                }
            }
            ArgumentType::Any => {}
        }

        if let (Some(pattern), Some(s)) = (&self.pattern, value.as_str()) {
            let re = Regex::new(pattern)
                .map_err(|e| self.invalid(format!("bad pattern '{}': {}", pattern, e)))?;
            if !re.is_match(s) {
                return Err(self.invalid(format!("'{}' does not match pattern {}", s, pattern)));
            }
        }

        Ok(())
    }

    fn expect_str<'v>(&self, value: &'v Value) -> Result<&'v str, DomainError> {
        value
            .as_str()
            .ok_or_else(|| self.invalid(format!("expected {} string, got {}", self.arg_type, value)))
    }

    fn check_length(&self, len: usize) -> Result<(), DomainError> {
        if let Some(min) = self.min_length {
            if len < min {
                return Err(self.invalid(format!("length {} is below minimum {}", len, min)));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(self.invalid(format!("length {} exceeds maximum {}", len, max)));
            }
        }
        Ok(())
    }

    fn check_range(&self, n: f64) -> Result<(), DomainError> {
        if let Some(min) = self.min_value {
            if n < min {
                return Err(self.invalid(format!("{} is below minimum {}", n, min)));
            }
        }
        if let Some(max) = self.max_value {
            if n > max {
                return Err(self.invalid(format!("{} exceeds maximum {}", n, max)));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> DomainError {
        DomainError::InvalidArgument {
            argument: self.name.clone(),
            reason,
        }
    }
}
