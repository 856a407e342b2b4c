//! Routing strategies
//!
//! Each strategy either proposes a [`RouteCandidate`], declines with
//! `Ok(None)`, or fails. Only the explicit switch and the fallback fail:
//! a switch to an unknown domain is a user error, and the fallback has
//! nowhere left to go.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::types::{RoutingRequest, RoutingStrategy};
use super::verbs::extract_verbs_lenient;
use super::Router;
use crate::domains::CURRENT_STATE_KEY;
use crate::error::{RoutingError, RoutingResult};

pub(crate) const EXPLICIT_CONFIDENCE: f64 = 1.0;
/// Verbs recovered by regex are trusted less than parsed ones
pub(crate) const REGEX_CONFIDENCE_FACTOR: f64 = 0.8;
pub(crate) const CONTEXT_KEY_CONFIDENCE: f64 = 0.8;
pub(crate) const STATE_CONFIDENCE: f64 = 0.6;
pub(crate) const KEYWORD_CONFIDENCE: f64 = 0.4;
pub(crate) const MULTI_KEYWORD_CONFIDENCE: f64 = 0.6;
pub(crate) const DEFAULT_CONFIDENCE: f64 = 0.2;
pub(crate) const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Domain the fallback prefers when it is available
const PREFERRED_FALLBACK_DOMAIN: &str = "onboarding";
const SUGGESTION_THRESHOLD: f64 = 0.85;

static SWITCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bswitch\s+to\s+(?:the\s+)?(.+?)\s+domain\b").unwrap());

// ============================================================================
// CANDIDATES AND SCOPE
// ============================================================================

/// A strategy's proposal, before the domain is resolved
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RouteCandidate {
    pub domain_name: String,
    pub strategy: RoutingStrategy,
    pub confidence: f64,
    pub reason: String,
    pub alternatives: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub matched_verbs: Vec<String>,
    pub context_keys: Vec<String>,
}

impl RouteCandidate {
    fn new(
        domain_name: impl Into<String>,
        strategy: RoutingStrategy,
        confidence: f64,
        reason: String,
    ) -> Self {
        Self {
            domain_name: domain_name.into(),
            strategy,
            confidence,
            reason,
            alternatives: Vec::new(),
            matched_keywords: Vec::new(),
            matched_verbs: Vec::new(),
            context_keys: Vec::new(),
        }
    }

    fn with_alternatives<'a>(mut self, candidates: impl IntoIterator<Item = &'a String>) -> Self {
        self.alternatives = candidates
            .into_iter()
            .filter(|name| **name != self.domain_name)
            .cloned()
            .collect();
        self
    }
}

/// Registered domains as seen by one routing request
pub(crate) struct RoutingScope<'a> {
    /// Sorted, as returned by the registry
    pub registered: Vec<String>,
    pub excluded: &'a [String],
    pub preferred: &'a [String],
}

impl RoutingScope<'_> {
    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.iter().any(|n| n == name)
    }

    /// Registered and not excluded by the request
    pub fn is_eligible(&self, name: &str) -> bool {
        self.is_registered(name) && !self.excluded.iter().any(|n| n == name)
    }

    fn is_preferred(&self, name: &str) -> bool {
        self.preferred.iter().any(|n| n == name)
    }

    fn eligible(&self) -> impl Iterator<Item = &String> + '_ {
        self.registered.iter().filter(|n| self.is_eligible(n))
    }

    /// Highest score wins; ties go to a preferred domain, then to the
    /// lexicographically smallest name
    fn pick_best(&self, scores: &BTreeMap<String, f64>) -> Option<(String, f64)> {
        let mut best: Option<(&String, f64)> = None;
        for (name, &score) in scores {
            best = match best {
                None => Some((name, score)),
                Some((current, top)) => {
                    let tied = (score - top).abs() < f64::EPSILON;
                    if (score > top && !tied)
                        || (tied && self.is_preferred(name) && !self.is_preferred(current))
                    {
                        Some((name, score))
                    } else {
                        Some((current, top))
                    }
                }
            };
        }
        best.map(|(name, score)| (name.clone(), score))
    }
}

// ============================================================================
// NAME RESOLUTION
// ============================================================================

/// "  Hedge Fund Investor " -> "hedge-fund-investor"
pub fn normalize_domain_name(phrase: &str) -> String {
    phrase
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Lower-case, whitespace-collapsed form used for alias lookup
fn alias_key(phrase: &str) -> String {
    phrase
        .to_lowercase()
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// DSL accumulated in the session followed by the current message
fn verb_source(request: &RoutingRequest) -> String {
    match request.dsl.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(dsl) => format!("{}\n{}", dsl, request.message),
        None => request.message.clone(),
    }
}

fn dedup_preserving_order(items: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(items.len());
    for item in items {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

impl Router {
    /// Domain an alias phrase ("hedge fund", "hf") stands for
    pub fn find_alternative_domain_name(&self, phrase: &str) -> Option<&str> {
        self.config
            .domain_aliases
            .get(&alias_key(phrase))
            .map(String::as_str)
    }

    /// Domain owning a state name, if any
    pub fn infer_domain_from_state(&self, state: &str) -> Option<&str> {
        self.config.domain_for_state(state)
    }

    fn suggest_domain(&self, normalized: &str, phrase: &str, scope: &RoutingScope<'_>) -> Option<String> {
        let key = alias_key(phrase);
        let by_name = scope
            .registered
            .iter()
            .map(|name| (strsim::jaro_winkler(normalized, name), name));
        let by_alias = self
            .config
            .domain_aliases
            .iter()
            .filter(|(_, domain)| scope.is_registered(domain))
            .map(|(alias, domain)| (strsim::jaro_winkler(&key, alias), domain));

        by_name
            .chain(by_alias)
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, name)| name.clone())
    }

    // ------------------------------------------------------------------------
    // Strategies, in priority order
    // ------------------------------------------------------------------------

    /// "switch to <name> domain". Ignores the request's exclusions.
    pub(crate) fn route_by_explicit_switch(
        &self,
        request: &RoutingRequest,
        scope: &RoutingScope<'_>,
    ) -> RoutingResult<Option<RouteCandidate>> {
        let Some(caps) = SWITCH_RE.captures(&request.message) else {
            return Ok(None);
        };
        let phrase = caps[1].trim();
        let normalized = normalize_domain_name(phrase);
        if normalized.is_empty() {
            return Ok(None);
        }

        if scope.is_registered(&normalized) {
            return Ok(Some(RouteCandidate::new(
                normalized.clone(),
                RoutingStrategy::Explicit,
                EXPLICIT_CONFIDENCE,
                format!("Explicit switch to domain '{}'", normalized),
            )));
        }

        if let Some(domain) = self
            .find_alternative_domain_name(phrase)
            .filter(|d| scope.is_registered(d))
        {
            return Ok(Some(RouteCandidate::new(
                domain,
                RoutingStrategy::Explicit,
                EXPLICIT_CONFIDENCE,
                format!("Explicit switch to domain '{}' (alias '{}')", domain, phrase),
            )));
        }

        Err(RoutingError::UnknownDomain {
            suggestion: self.suggest_domain(&normalized, phrase, scope),
            requested: normalized,
        })
    }

    /// Verbs parsed from the session DSL plus the message; scans with a
    /// regex when the text does not parse
    pub(crate) async fn route_by_dsl_verbs(
        &self,
        request: &RoutingRequest,
        scope: &RoutingScope<'_>,
    ) -> RoutingResult<Option<RouteCandidate>> {
        let source = verb_source(request);
        match self.verb_extractor.extract_verbs(&source) {
            Ok(verbs) => Ok(self.score_verbs(&verbs, 1.0, scope).await),
            Err(e) => {
                debug!(error = %e, "Text did not parse as DSL, scanning for verbs");
                self.route_by_verb_regex(request, scope).await
            }
        }
    }

    pub(crate) async fn route_by_verb_regex(
        &self,
        request: &RoutingRequest,
        scope: &RoutingScope<'_>,
    ) -> RoutingResult<Option<RouteCandidate>> {
        let verbs = extract_verbs_lenient(&verb_source(request));
        Ok(self
            .score_verbs(&verbs, REGEX_CONFIDENCE_FACTOR, scope)
            .await
            .map(|mut candidate| {
                candidate.reason.push_str(" (regex extraction)");
                candidate
            }))
    }

    async fn score_verbs(
        &self,
        verbs: &[String],
        factor: f64,
        scope: &RoutingScope<'_>,
    ) -> Option<RouteCandidate> {
        if verbs.is_empty() {
            return None;
        }

        let mut matched: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for verb in verbs {
            for domain in self.registry.find_domains_by_verb(verb).await {
                if scope.is_eligible(&domain) {
                    matched.entry(domain).or_default().push(verb.clone());
                }
            }
        }

        let scores: BTreeMap<String, f64> = matched
            .iter()
            .map(|(domain, hits)| (domain.clone(), hits.len() as f64))
            .collect();
        let (winner, score) = scope.pick_best(&scores)?;
        let confidence = (score / verbs.len() as f64).min(1.0) * factor;
        let matched_verbs = dedup_preserving_order(&matched[&winner]);

        let mut candidate = RouteCandidate::new(
            winner.clone(),
            RoutingStrategy::Verb,
            confidence,
            format!(
                "Matched {} of {} DSL verbs to domain '{}'",
                score as usize,
                verbs.len(),
                winner
            ),
        )
        .with_alternatives(matched.keys());
        candidate.matched_verbs = matched_verbs;
        Some(candidate)
    }

    /// Session context keys, then the session's current state
    pub(crate) fn route_by_context(
        &self,
        request: &RoutingRequest,
        scope: &RoutingScope<'_>,
    ) -> RoutingResult<Option<RouteCandidate>> {
        let Some(context) = request.context.as_ref().filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        let mut scores: BTreeMap<String, f64> = BTreeMap::new();
        let mut keys: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, domain) in &self.config.context_mappings {
            let present = context.get(key).is_some_and(|v| !v.is_null());
            if present && scope.is_eligible(domain) {
                *scores.entry(domain.clone()).or_insert(0.0) += CONTEXT_KEY_CONFIDENCE;
                keys.entry(domain.clone()).or_default().push(key.clone());
            }
        }

        if scores.is_empty() {
            let state_domain = context
                .get(CURRENT_STATE_KEY)
                .and_then(Value::as_str)
                .and_then(|state| self.infer_domain_from_state(state))
                .filter(|domain| scope.is_eligible(domain));
            if let Some(domain) = state_domain {
                scores.insert(domain.to_string(), STATE_CONFIDENCE);
                keys.insert(domain.to_string(), vec![CURRENT_STATE_KEY.to_string()]);
            }
        }

        let Some((winner, score)) = scope.pick_best(&scores) else {
            return Ok(None);
        };
        let context_keys = keys.remove(&winner).unwrap_or_default();
        let reason = format!(
            "Session context ({}) points to domain '{}'",
            context_keys.join(", "),
            winner
        );

        let mut candidate = RouteCandidate::new(
            winner,
            RoutingStrategy::Context,
            score.min(1.0),
            reason,
        )
        .with_alternatives(scores.keys());
        candidate.context_keys = context_keys;
        Ok(Some(candidate))
    }

    /// Substring keywords in the message; the longest keyword wins
    pub(crate) fn route_by_keywords(
        &self,
        request: &RoutingRequest,
        scope: &RoutingScope<'_>,
    ) -> RoutingResult<Option<RouteCandidate>> {
        let message = request.message.to_lowercase();

        let mut matched: Vec<String> = Vec::new();
        let mut domains: Vec<String> = Vec::new();
        let mut winner: Option<(&str, &str)> = None;
        for (keyword, domain) in &self.config.keyword_mappings {
            if !scope.is_eligible(domain) || !message.contains(keyword.as_str()) {
                continue;
            }
            matched.push(keyword.clone());
            if !domains.contains(domain) {
                domains.push(domain.clone());
            }
            match winner {
                Some((best, _)) if keyword.len() <= best.len() => {}
                _ => winner = Some((keyword.as_str(), domain.as_str())),
            }
        }

        let Some((keyword, domain)) = winner else {
            return Ok(None);
        };
        let confidence = if matched.len() > 1 {
            MULTI_KEYWORD_CONFIDENCE
        } else {
            KEYWORD_CONFIDENCE
        };

        let mut candidate = RouteCandidate::new(
            domain,
            RoutingStrategy::Keyword,
            confidence,
            format!("Keyword '{}' maps to domain '{}'", keyword, domain),
        )
        .with_alternatives(domains.iter());
        candidate.matched_keywords = matched;
        Ok(Some(candidate))
    }

    /// The session's current domain, else the first registered domain
    pub(crate) fn route_by_default(
        &self,
        request: &RoutingRequest,
        scope: &RoutingScope<'_>,
    ) -> RoutingResult<Option<RouteCandidate>> {
        if let Some(current) = request
            .current_domain
            .as_deref()
            .filter(|d| scope.is_eligible(d))
        {
            return Ok(Some(RouteCandidate::new(
                current,
                RoutingStrategy::Default,
                DEFAULT_CONFIDENCE,
                format!("Continuing in current domain '{}'", current),
            )));
        }

        Ok(scope.eligible().next().map(|first| {
            RouteCandidate::new(
                first.clone(),
                RoutingStrategy::Default,
                DEFAULT_CONFIDENCE,
                format!("Defaulting to first available domain '{}'", first),
            )
        }))
    }

    /// Last resort: onboarding when available, else the first domain
    pub(crate) fn route_by_fallback(
        &self,
        scope: &RoutingScope<'_>,
    ) -> RoutingResult<RouteCandidate> {
        let domain = if scope.is_eligible(PREFERRED_FALLBACK_DOMAIN) {
            PREFERRED_FALLBACK_DOMAIN.to_string()
        } else {
            scope
                .eligible()
                .next()
                .cloned()
                .ok_or(RoutingError::NoDomainsAvailable)?
        };

        Ok(RouteCandidate::new(
            domain.clone(),
            RoutingStrategy::Fallback,
            FALLBACK_CONFIDENCE,
            format!("No strategy matched, falling back to domain '{}'", domain),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::domains::VocabularyDomain;
    use crate::registry::Registry;
    use domain_types::{SessionContext, VerbDefinition, Vocabulary};
    use serde_json::json;
    use std::sync::Arc;

    async fn router_with(names: &[&str]) -> Router {
        let registry =
            Arc::new(Registry::with_config(RegistryConfig::without_health_checks()).unwrap());
        for name in names {
            let vocabulary = Vocabulary::new(*name, "1.0.0", "test")
                .with_verb(VerbDefinition::new(format!("{}.start", name), "lifecycle"))
                .with_verb(VerbDefinition::new(format!("{}.finish", name), "lifecycle"));
            registry
                .register(Arc::new(VocabularyDomain::new(vocabulary)))
                .await
                .unwrap();
        }
        Router::new(registry)
    }

    fn scope<'a>(names: &[&str], excluded: &'a [String], preferred: &'a [String]) -> RoutingScope<'a> {
        RoutingScope {
            registered: names.iter().map(|s| s.to_string()).collect(),
            excluded,
            preferred,
        }
    }

    #[test]
    fn test_normalize_domain_name() {
        assert_eq!(normalize_domain_name("  hedge fund  "), "hedge-fund");
        assert_eq!(normalize_domain_name("Hedge Fund Investor"), "hedge-fund-investor");
        assert_eq!(normalize_domain_name("onboarding"), "onboarding");
        assert_eq!(normalize_domain_name("   "), "");
    }

    #[test]
    fn test_pick_best_tie_breaks() {
        let scores: BTreeMap<String, f64> =
            [("beta".to_string(), 2.0), ("alpha".to_string(), 2.0), ("gamma".to_string(), 1.0)]
                .into_iter()
                .collect();

        let none: Vec<String> = Vec::new();
        let s = scope(&["alpha", "beta", "gamma"], &none, &none);
        assert_eq!(s.pick_best(&scores), Some(("alpha".to_string(), 2.0)));

        let preferred = vec!["beta".to_string()];
        let s = scope(&["alpha", "beta", "gamma"], &none, &preferred);
        assert_eq!(s.pick_best(&scores), Some(("beta".to_string(), 2.0)));

        // Preference never beats a higher score
        let preferred = vec!["gamma".to_string()];
        let s = scope(&["alpha", "beta", "gamma"], &none, &preferred);
        assert_eq!(s.pick_best(&scores), Some(("alpha".to_string(), 2.0)));
    }

    #[tokio::test]
    async fn test_explicit_switch() {
        let router = router_with(&["hedge-fund-investor", "onboarding"]).await;
        let none: Vec<String> = Vec::new();
        let s = scope(&["hedge-fund-investor", "onboarding"], &none, &none);

        let request = RoutingRequest::new("switch to hedge fund domain", "s");
        let candidate = router.route_by_explicit_switch(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.domain_name, "hedge-fund-investor");
        assert_eq!(candidate.confidence, EXPLICIT_CONFIDENCE);

        let request = RoutingRequest::new("Switch to the Onboarding domain please", "s");
        let candidate = router.route_by_explicit_switch(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.domain_name, "onboarding");

        let request = RoutingRequest::new("switch to unknown domain", "s");
        assert!(matches!(
            router.route_by_explicit_switch(&request, &s),
            Err(RoutingError::UnknownDomain { .. })
        ));

        let request = RoutingRequest::new("create a new case", "s");
        assert!(router.route_by_explicit_switch(&request, &s).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_explicit_switch_suggests_close_name() {
        let router = router_with(&["onboarding"]).await;
        let none: Vec<String> = Vec::new();
        let s = scope(&["onboarding"], &none, &none);

        let request = RoutingRequest::new("switch to onbording domain", "s");
        match router.route_by_explicit_switch(&request, &s) {
            Err(RoutingError::UnknownDomain { requested, suggestion }) => {
                assert_eq!(requested, "onbording");
                assert_eq!(suggestion.as_deref(), Some("onboarding"));
            }
            other => panic!("expected unknown domain, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dsl_verbs_and_regex_fallback() {
        let router = router_with(&["hedge-fund-investor", "onboarding"]).await;
        let none: Vec<String> = Vec::new();
        let s = scope(&["hedge-fund-investor", "onboarding"], &none, &none);

        let request = RoutingRequest::new("(onboarding.start \"test-id\")", "s");
        let candidate = router.route_by_dsl_verbs(&request, &s).await.unwrap().unwrap();
        assert_eq!(candidate.domain_name, "onboarding");
        assert_eq!(candidate.confidence, 1.0);
        assert_eq!(candidate.matched_verbs, vec!["onboarding.start"]);

        for text in ["()", "not valid dsl syntax"] {
            let request = RoutingRequest::new(text, "s");
            assert!(router.route_by_dsl_verbs(&request, &s).await.unwrap().is_none());
        }

        let request = RoutingRequest::new("(onboarding.start incomplete dsl", "s");
        let candidate = router.route_by_dsl_verbs(&request, &s).await.unwrap().unwrap();
        assert_eq!(candidate.domain_name, "onboarding");
        assert!(candidate.confidence < 1.0);
        assert!((candidate.confidence - REGEX_CONFIDENCE_FACTOR).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_verb_confidence_is_share_of_matched_verbs() {
        let router = router_with(&["hedge-fund-investor", "onboarding"]).await;
        let none: Vec<String> = Vec::new();
        let s = scope(&["hedge-fund-investor", "onboarding"], &none, &none);

        let request = RoutingRequest::new("(hedge-fund-investor.start)", "s")
            .with_dsl("(onboarding.start)\n(onboarding.finish)\n(kyc.collect)");
        let candidate = router.route_by_dsl_verbs(&request, &s).await.unwrap().unwrap();
        assert_eq!(candidate.domain_name, "onboarding");
        assert!((candidate.confidence - 0.5).abs() < 1e-9);
        assert_eq!(candidate.alternatives, vec!["hedge-fund-investor"]);
    }

    #[tokio::test]
    async fn test_context_keys_and_state() {
        let router = router_with(&["hedge-fund-investor", "onboarding"]).await;
        let none: Vec<String> = Vec::new();
        let s = scope(&["hedge-fund-investor", "onboarding"], &none, &none);

        let mut context = SessionContext::new();
        context.insert("investor_id".to_string(), json!("uuid-123"));
        let request = RoutingRequest::new("next step", "s").with_context(context);
        let candidate = router.route_by_context(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.domain_name, "hedge-fund-investor");
        assert_eq!(candidate.context_keys, vec!["investor_id"]);

        let mut context = SessionContext::new();
        context.insert("investor_id".to_string(), json!("uuid-123"));
        context.insert("fund_id".to_string(), json!("fund-9"));
        let request = RoutingRequest::new("next step", "s").with_context(context);
        let candidate = router.route_by_context(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.confidence, 1.0);

        let mut context = SessionContext::new();
        context.insert("current_state".to_string(), json!("ADD_PRODUCTS"));
        let request = RoutingRequest::new("next step", "s").with_context(context);
        let candidate = router.route_by_context(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.domain_name, "onboarding");
        assert_eq!(candidate.confidence, STATE_CONFIDENCE);

        let mut context = SessionContext::new();
        context.insert("unrelated".to_string(), json!(1));
        let request = RoutingRequest::new("next step", "s").with_context(context);
        assert!(router.route_by_context(&request, &s).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_longest_keyword_wins() {
        let router = router_with(&["hedge-fund-investor", "onboarding"]).await;
        let none: Vec<String> = Vec::new();
        let s = scope(&["hedge-fund-investor", "onboarding"], &none, &none);

        let request = RoutingRequest::new("investor subscription", "s");
        let candidate = router.route_by_keywords(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.domain_name, "hedge-fund-investor");
        assert_eq!(candidate.confidence, MULTI_KEYWORD_CONFIDENCE);
        assert_eq!(candidate.matched_keywords, vec!["investor", "subscription"]);

        let request = RoutingRequest::new("onboard", "s");
        let candidate = router.route_by_keywords(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.domain_name, "onboarding");
        assert_eq!(candidate.confidence, KEYWORD_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_excluded_domains_are_skipped() {
        let router = router_with(&["hedge-fund-investor", "onboarding"]).await;
        let excluded = vec!["hedge-fund-investor".to_string()];
        let none: Vec<String> = Vec::new();
        let s = scope(&["hedge-fund-investor", "onboarding"], &excluded, &none);

        let request = RoutingRequest::new("new investor subscription", "s");
        assert!(router.route_by_keywords(&request, &s).unwrap().is_none());

        let request = RoutingRequest::new("anything", "s").with_current_domain("hedge-fund-investor");
        let candidate = router.route_by_default(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.domain_name, "onboarding");

        // Explicit switches ignore exclusions
        let request = RoutingRequest::new("switch to hedge fund domain", "s");
        let candidate = router.route_by_explicit_switch(&request, &s).unwrap().unwrap();
        assert_eq!(candidate.domain_name, "hedge-fund-investor");
    }

    #[tokio::test]
    async fn test_fallback_prefers_onboarding() {
        let router = router_with(&["alpha", "onboarding"]).await;
        let none: Vec<String> = Vec::new();

        let candidate = router
            .route_by_fallback(&scope(&["alpha", "onboarding"], &none, &none))
            .unwrap();
        assert_eq!(candidate.domain_name, "onboarding");
        assert_eq!(candidate.confidence, FALLBACK_CONFIDENCE);

        let candidate = router.route_by_fallback(&scope(&["alpha"], &none, &none)).unwrap();
        assert_eq!(candidate.domain_name, "alpha");

        assert_eq!(
            router.route_by_fallback(&scope(&[], &none, &none)),
            Err(RoutingError::NoDomainsAvailable)
        );
    }

    #[tokio::test]
    async fn test_alias_and_state_lookup() {
        let router = router_with(&[]).await;
        assert_eq!(router.find_alternative_domain_name("Hedge  Fund"), Some("hedge-fund-investor"));
        assert_eq!(router.find_alternative_domain_name("hedge-fund"), Some("hedge-fund-investor"));
        assert_eq!(router.find_alternative_domain_name("ob"), Some("onboarding"));
        assert_eq!(router.find_alternative_domain_name("unknown"), None);

        assert_eq!(router.infer_domain_from_state("KYC_PENDING"), Some("hedge-fund-investor"));
        assert_eq!(router.infer_domain_from_state("ADD_PRODUCTS"), Some("onboarding"));
        assert_eq!(router.infer_domain_from_state("UNKNOWN_STATE"), None);
    }
}
