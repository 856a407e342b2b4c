//! Registry and router configuration
//!
//! [`RegistryConfig`] controls the background health sampler and is usually
//! read from the environment. [`RouterConfig`] holds the business tables the
//! router's heuristic strategies consult (keywords, context keys, aliases,
//! state names). The defaults describe the onboarding and hedge-fund investor
//! domains; embedding applications override them in code or from YAML.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_HEALTH_INTERVAL_SECS: &str = "DOMAIN_REGISTRY_HEALTH_INTERVAL_SECS";
pub const ENV_HEALTH_CHECKS: &str = "DOMAIN_REGISTRY_HEALTH_CHECKS";

const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

// ============================================================================
// REGISTRY CONFIG
// ============================================================================

/// Configuration for the domain registry
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Interval between health samples
    pub health_check_interval: Duration,
    /// Whether to run the background health sampler at all
    pub enable_health_checks: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS),
            enable_health_checks: true,
        }
    }
}

impl RegistryConfig {
    /// Configuration with the background sampler switched off
    pub fn without_health_checks() -> Self {
        Self {
            enable_health_checks: false,
            ..Self::default()
        }
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            health_check_interval: Duration::from_secs(
                lookup(ENV_HEALTH_INTERVAL_SECS)
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS),
            ),
            enable_health_checks: lookup(ENV_HEALTH_CHECKS)
                .map(|s| {
                    let s = s.trim();
                    s != "false" && s != "0"
                })
                .unwrap_or(true),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enable_health_checks && self.health_check_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "health_check_interval".to_string(),
                value: format!("{:?}", self.health_check_interval),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// ROUTER CONFIG
// ============================================================================

/// Business tables consulted by the router's heuristic strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Lower-case keyword -> domain (substring match against the message)
    pub keyword_mappings: BTreeMap<String, String>,
    /// Session context key -> domain
    pub context_mappings: BTreeMap<String, String>,
    /// Spoken phrase -> domain, for "switch to <phrase> domain"
    pub domain_aliases: BTreeMap<String, String>,
    /// Domain -> state names that identify it
    pub state_mappings: BTreeMap<String, Vec<String>>,
}

const ONBOARDING: &str = "onboarding";
const HEDGE_FUND_INVESTOR: &str = "hedge-fund-investor";

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for RouterConfig {
    fn default() -> Self {
        let keyword_mappings = table(&[
            ("onboard", ONBOARDING),
            ("onboarding", ONBOARDING),
            ("case", ONBOARDING),
            ("client", ONBOARDING),
            ("cbu", ONBOARDING),
            ("custody", ONBOARDING),
            ("fund accounting", ONBOARDING),
            ("transfer agency", ONBOARDING),
            ("investor", HEDGE_FUND_INVESTOR),
            ("subscription", HEDGE_FUND_INVESTOR),
            ("subscribe", HEDGE_FUND_INVESTOR),
            ("redemption", HEDGE_FUND_INVESTOR),
            ("redeem", HEDGE_FUND_INVESTOR),
            ("hedge fund", HEDGE_FUND_INVESTOR),
            ("capital call", HEDGE_FUND_INVESTOR),
        ]);

        let context_mappings = table(&[
            ("investor_id", HEDGE_FUND_INVESTOR),
            ("subscription_id", HEDGE_FUND_INVESTOR),
            ("fund_id", HEDGE_FUND_INVESTOR),
            ("cbu_id", ONBOARDING),
            ("case_id", ONBOARDING),
            ("onboarding_id", ONBOARDING),
        ]);

        let domain_aliases = table(&[
            ("hedge fund", HEDGE_FUND_INVESTOR),
            ("hedge funds", HEDGE_FUND_INVESTOR),
            ("hf", HEDGE_FUND_INVESTOR),
            ("hfi", HEDGE_FUND_INVESTOR),
            ("investor", HEDGE_FUND_INVESTOR),
            ("investors", HEDGE_FUND_INVESTOR),
            ("ob", ONBOARDING),
            ("onboard", ONBOARDING),
            ("client", ONBOARDING),
            ("client onboarding", ONBOARDING),
        ]);

        let mut state_mappings = BTreeMap::new();
        state_mappings.insert(
            ONBOARDING.to_string(),
            [
                "CREATE",
                "ADD_PRODUCTS",
                "PRODUCTS_ADDED",
                "KYC_STARTED",
                "SERVICES_DISCOVERED",
                "RESOURCES_PLANNED",
                "ATTRIBUTES_BOUND",
                "WORKFLOW_ACTIVE",
                "COMPLETE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        state_mappings.insert(
            HEDGE_FUND_INVESTOR.to_string(),
            [
                "OPPORTUNITY",
                "PRECHECKS",
                "KYC_PENDING",
                "KYC_APPROVED",
                "SUB_PENDING_CASH",
                "FUNDED_PENDING_NAV",
                "ISSUED",
                "ACTIVE",
                "REDEEM_PENDING",
                "REDEEMED",
                "OFFBOARDED",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );

        Self {
            keyword_mappings,
            context_mappings,
            domain_aliases,
            state_mappings,
        }
    }
}

impl RouterConfig {
    /// Parse a (possibly partial) YAML override; missing tables keep their
    /// defaults.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse router config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read router config {:?}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid router config {:?}", path))
    }

    /// Reject entries that map to an empty domain name
    pub fn validate(&self) -> Result<(), ConfigError> {
        let flat = self
            .keyword_mappings
            .iter()
            .chain(&self.context_mappings)
            .chain(&self.domain_aliases);
        for (key, domain) in flat {
            if domain.trim().is_empty() {
                return Err(ConfigError::EmptyMappingTarget { key: key.clone() });
            }
        }
        if let Some(key) = self.state_mappings.keys().find(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyMappingTarget { key: key.clone() });
        }
        Ok(())
    }

    /// Domain owning `state`, checked in domain-name order
    pub fn domain_for_state(&self, state: &str) -> Option<&str> {
        if state.is_empty() {
            return None;
        }
        self.state_mappings
            .iter()
            .find(|(_, states)| states.iter().any(|s| s == state))
            .map(|(domain, _)| domain.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_registry_config_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.health_check_interval, Duration::from_secs(30));
        assert!(config.enable_health_checks);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_registry_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_HEALTH_INTERVAL_SECS, "5"),
            (ENV_HEALTH_CHECKS, "false"),
        ]
        .into_iter()
        .collect();
        let config = RegistryConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.health_check_interval, Duration::from_secs(5));
        assert!(!config.enable_health_checks);

        let fallback = RegistryConfig::from_lookup(|k| {
            (k == ENV_HEALTH_INTERVAL_SECS).then(|| "soon".to_string())
        });
        assert_eq!(fallback.health_check_interval, Duration::from_secs(30));
        assert!(fallback.enable_health_checks);
    }

    #[test]
    fn test_zero_interval_rejected_only_when_enabled() {
        let config = RegistryConfig::default().with_health_check_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let disabled = RegistryConfig::without_health_checks()
            .with_health_check_interval(Duration::ZERO);
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_router_config_state_lookup() {
        let config = RouterConfig::default();
        assert_eq!(config.domain_for_state("KYC_PENDING"), Some("hedge-fund-investor"));
        assert_eq!(config.domain_for_state("ADD_PRODUCTS"), Some("onboarding"));
        assert_eq!(config.domain_for_state("UNKNOWN_STATE"), None);
        assert_eq!(config.domain_for_state(""), None);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
keyword_mappings:
  ubo: ubo
  beneficial owner: ubo
"#;
        let config = RouterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.keyword_mappings.len(), 2);
        assert_eq!(config.keyword_mappings["beneficial owner"], "ubo");
        assert_eq!(
            config.context_mappings,
            RouterConfig::default().context_mappings
        );
    }

    #[test]
    fn test_yaml_with_empty_target_rejected() {
        let yaml = "context_mappings:\n  ubo_id: \"\"\n";
        assert!(RouterConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_yaml_file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.yaml");
        std::fs::write(&path, "domain_aliases:\n  kyc checks: kyc\n").unwrap();

        let config = RouterConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.domain_aliases["kyc checks"], "kyc");

        let missing = RouterConfig::from_yaml_file(&dir.path().join("absent.yaml"));
        assert!(missing.is_err());
    }
}
