//! Resolution strategies.
//!
//! Each strategy inspects the request and either yields a route, declines
//! with `Ok(None)`, or fails with a validation error. The pipeline runs them
//! in a fixed order: token, element, rule, well-known, template.

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::schema::GeneralConfig;
use crate::error::{RoutingError, RoutingResult};
use crate::http::request::RequestContext;
use crate::lookup::elements::{ElementLookup, HOME_URI};
use crate::lookup::templates::{has_private_segment, is_traversal, TemplateExistence};
use crate::lookup::tokens::TokenStore;
use crate::routing::path::PathFacts;
use crate::routing::route::{ResolvedRoute, RouteParams, StrategyKind, REDIRECT_ACTION};
use crate::routing::rule::UrlRule;
use crate::sites::site::Site;

/// Everything a strategy may look at.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionInput<'a> {
    pub ctx: &'a RequestContext,
    pub site: &'a Site,
    pub facts: &'a PathFacts,
    pub rules: &'a [UrlRule],
}

/// One step of the resolution chain.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn try_resolve(&self, input: &ResolutionInput<'_>) -> RoutingResult<Option<ResolvedRoute>>;
}

/// Returns the route stored behind a request token.
pub struct TokenStrategy {
    store: Arc<dyn TokenStore>,
    param: String,
    header: String,
}

impl TokenStrategy {
    pub fn new(store: Arc<dyn TokenStore>, general: &GeneralConfig) -> Self {
        Self {
            store,
            param: general.token_param.clone(),
            header: general.token_header.clone(),
        }
    }
}

impl Strategy for TokenStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Token
    }

    fn try_resolve(&self, input: &ResolutionInput<'_>) -> RoutingResult<Option<ResolvedRoute>> {
        let Some(token) = input.ctx.token(&self.param, &self.header) else {
            return Ok(None);
        };
        let route = self.store.lookup(token);
        if route.is_none() {
            tracing::debug!("Request token did not resolve");
        }
        Ok(route)
    }
}

/// Routes public requests to the content element at their URI.
pub struct ElementStrategy {
    lookup: Arc<dyn ElementLookup>,
    installed: bool,
    headless: bool,
}

impl ElementStrategy {
    pub fn new(lookup: Arc<dyn ElementLookup>, general: &GeneralConfig) -> Self {
        Self {
            lookup,
            installed: general.installed,
            headless: general.headless_mode,
        }
    }
}

impl Strategy for ElementStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Element
    }

    fn try_resolve(&self, input: &ResolutionInput<'_>) -> RoutingResult<Option<ResolvedRoute>> {
        if input.facts.is_cp_request || !self.installed || self.headless {
            return Ok(None);
        }

        let uri = if input.facts.path.is_empty() {
            HOME_URI
        } else {
            input.facts.path.as_str()
        };

        let Some(element) = self.lookup.find_by_uri(uri, input.site.id) else {
            return Ok(None);
        };
        if element.route.is_none() {
            tracing::debug!(element = element.element_id, uri, "Element has no route");
        }
        Ok(element.route)
    }
}

/// Matches compiled URL rules in declaration order.
#[derive(Debug, Default)]
pub struct RuleStrategy;

impl Strategy for RuleStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Rule
    }

    fn try_resolve(&self, input: &ResolutionInput<'_>) -> RoutingResult<Option<ResolvedRoute>> {
        let method = input.ctx.method();
        let path = input.facts.path.as_str();
        Ok(input
            .rules
            .iter()
            .filter(|rule| rule.applies_to_site(&input.site.handle))
            .find_map(|rule| rule.parse_request(method, path)))
    }
}

const CHANGE_PASSWORD_PATH: &str = ".well-known/change-password";

/// Redirects conventional `.well-known` paths.
pub struct WellKnownStrategy {
    set_password_request_path: Option<String>,
    security_key: String,
}

impl WellKnownStrategy {
    pub fn new(general: &GeneralConfig) -> Self {
        Self {
            set_password_request_path: general
                .set_password_request_path
                .as_ref()
                .map(|p| p.trim_matches('/').to_string()),
            security_key: general.security_key.clone(),
        }
    }

    /// Hex SHA-256 digest of the target keyed with the security key.
    fn sign(&self, target: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.security_key.as_bytes());
        hasher.update([0u8]);
        hasher.update(target.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Strategy for WellKnownStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::WellKnown
    }

    fn try_resolve(&self, input: &ResolutionInput<'_>) -> RoutingResult<Option<ResolvedRoute>> {
        if input.facts.is_cp_request {
            return Ok(None);
        }

        let target_path = match input.facts.path.as_str() {
            CHANGE_PASSWORD_PATH => self.set_password_request_path.as_deref(),
            _ => None,
        };
        let Some(target_path) = target_path else {
            return Ok(None);
        };

        let url = input.site.url_for(target_path);
        let mut params = RouteParams::new();
        params.insert("signature".to_string(), Value::String(self.sign(&url)));
        params.insert("status_code".to_string(), Value::from(302));
        params.insert("url".to_string(), Value::String(url));
        Ok(Some(ResolvedRoute::new(REDIRECT_ACTION, params)))
    }
}

/// Renders a template that exists at the request path.
pub struct TemplateStrategy {
    templates: Arc<dyn TemplateExistence>,
    private_trigger: String,
    installed: bool,
    headless: bool,
}

impl TemplateStrategy {
    pub fn new(templates: Arc<dyn TemplateExistence>, general: &GeneralConfig) -> Self {
        Self {
            templates,
            private_trigger: general.private_template_trigger.clone(),
            installed: general.installed,
            headless: general.headless_mode,
        }
    }
}

impl Strategy for TemplateStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Template
    }

    fn try_resolve(&self, input: &ResolutionInput<'_>) -> RoutingResult<Option<ResolvedRoute>> {
        let public_only = !input.facts.is_cp_request;
        if !self.installed || (public_only && self.headless) {
            return Ok(None);
        }

        let path = input.facts.path.as_str();
        if is_traversal(path) {
            return Err(RoutingError::PathTraversal {
                path: path.to_string(),
            });
        }
        if public_only && has_private_segment(path, &self.private_trigger) {
            return Ok(None);
        }

        if self.templates.exists(path, public_only) {
            Ok(Some(ResolvedRoute::render_template(path)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::elements::{ElementRoute, MemoryElementIndex};
    use crate::lookup::tokens::MemoryTokenStore;
    use crate::routing::path::PathClassifier;
    use crate::routing::rule::{RuleDeclaration, UrlRuleCompiler};
    use serde_json::json;
    use std::collections::HashSet;

    struct Templates(HashSet<&'static str>);

    impl TemplateExistence for Templates {
        fn exists(&self, path: &str, _public_only: bool) -> bool {
            self.0.contains(path)
        }
    }

    struct Fixture {
        ctx: RequestContext,
        site: Site,
        facts: PathFacts,
    }

    impl Fixture {
        fn new(url: &str) -> Self {
            let ctx = RequestContext::from_url("GET", url).unwrap();
            let facts = PathClassifier::from_config(&GeneralConfig::default()).classify(&ctx);
            Self {
                ctx,
                site: Site::new(1, "default", Some("https://example.com/".into()), true),
                facts,
            }
        }

        fn input<'a>(&'a self, rules: &'a [UrlRule]) -> ResolutionInput<'a> {
            ResolutionInput {
                ctx: &self.ctx,
                site: &self.site,
                facts: &self.facts,
                rules,
            }
        }
    }

    #[test]
    fn test_token_strategy() {
        let store = MemoryTokenStore::new();
        let route = ResolvedRoute::new("entries/view", serde_json::from_value(json!({"id": 7})).unwrap());
        store.insert("abc123", route.clone(), None, None);
        let strategy = TokenStrategy::new(Arc::new(store), &GeneralConfig::default());

        let fixture = Fixture::new("https://example.com/x?token=abc123");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), Some(route));

        let fixture = Fixture::new("https://example.com/x?token=unknown");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);

        let fixture = Fixture::new("https://example.com/x");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);
    }

    #[test]
    fn test_element_strategy() {
        let index = MemoryElementIndex::new();
        index.insert(1, "news/hello", 5, Some(ResolvedRoute::render_template("news/_entry")));
        index.insert(1, HOME_URI, 1, Some(ResolvedRoute::render_template("index")));
        index.insert(1, "routeless", 9, None);
        let strategy = ElementStrategy::new(Arc::new(index), &GeneralConfig::default());

        let fixture = Fixture::new("https://example.com/news/hello");
        assert_eq!(
            strategy.try_resolve(&fixture.input(&[])).unwrap(),
            Some(ResolvedRoute::render_template("news/_entry"))
        );

        let fixture = Fixture::new("https://example.com/");
        assert_eq!(
            strategy.try_resolve(&fixture.input(&[])).unwrap(),
            Some(ResolvedRoute::render_template("index"))
        );

        let fixture = Fixture::new("https://example.com/routeless");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);

        // Control panel requests never route to elements
        let fixture = Fixture::new("https://example.com/admin/news/hello");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);
    }

    #[test]
    fn test_element_strategy_disabled_when_headless() {
        let index = MemoryElementIndex::new();
        index.insert(1, "news", 5, Some(ResolvedRoute::render_template("news")));
        let general = GeneralConfig {
            headless_mode: true,
            ..GeneralConfig::default()
        };
        let strategy = ElementStrategy::new(Arc::new(index), &general);
        let fixture = Fixture::new("https://example.com/news");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);
    }

    #[test]
    fn test_element_lookup_trait_object() {
        struct Fixed;
        impl ElementLookup for Fixed {
            fn find_by_uri(&self, uri: &str, _site_id: u32) -> Option<ElementRoute> {
                (uri == "fixed").then(|| ElementRoute {
                    element_id: 1,
                    route: Some(ResolvedRoute::render_template("fixed")),
                })
            }
        }
        let strategy = ElementStrategy::new(Arc::new(Fixed), &GeneralConfig::default());
        let fixture = Fixture::new("https://example.com/fixed");
        assert!(strategy.try_resolve(&fixture.input(&[])).unwrap().is_some());
    }

    #[test]
    fn test_rule_strategy_respects_site_and_order() {
        let rules = UrlRuleCompiler::new("-")
            .compile(&[
                RuleDeclaration::Explicit(crate::routing::rule::ExplicitRule {
                    pattern: "news".into(),
                    route: Some("blog/news".into()),
                    site: Some("blog".into()),
                    ..Default::default()
                }),
                RuleDeclaration::shorthand("news", "first/news"),
                RuleDeclaration::shorthand("news", "second/news"),
            ])
            .unwrap();
        let fixture = Fixture::new("https://example.com/news");
        let route = RuleStrategy.try_resolve(&fixture.input(&rules)).unwrap().unwrap();
        assert_eq!(route.action, "first/news");
    }

    #[test]
    fn test_well_known_strategy() {
        let general = GeneralConfig {
            set_password_request_path: Some("/account/reset/".into()),
            security_key: "secret".into(),
            ..GeneralConfig::default()
        };
        let strategy = WellKnownStrategy::new(&general);

        let fixture = Fixture::new("https://example.com/.well-known/change-password");
        let route = strategy.try_resolve(&fixture.input(&[])).unwrap().unwrap();
        assert_eq!(route.action, REDIRECT_ACTION);
        assert_eq!(route.params["url"], json!("https://example.com/account/reset"));
        assert_eq!(route.params["status_code"], json!(302));
        assert_eq!(
            route.params["signature"],
            json!(strategy.sign("https://example.com/account/reset"))
        );

        let unconfigured = WellKnownStrategy::new(&GeneralConfig::default());
        assert_eq!(unconfigured.try_resolve(&fixture.input(&[])).unwrap(), None);

        let fixture = Fixture::new("https://example.com/.well-known/other");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);
    }

    #[test]
    fn test_signature_depends_on_key() {
        let a = WellKnownStrategy::new(&GeneralConfig {
            security_key: "a".into(),
            ..GeneralConfig::default()
        });
        let b = WellKnownStrategy::new(&GeneralConfig {
            security_key: "b".into(),
            ..GeneralConfig::default()
        });
        assert_ne!(a.sign("https://example.com/x"), b.sign("https://example.com/x"));
        assert_eq!(a.sign("https://example.com/x").len(), 64);
    }

    #[test]
    fn test_template_strategy() {
        let templates = Arc::new(Templates(HashSet::from(["about", "_partials/header", "entries"])));
        let strategy = TemplateStrategy::new(templates, &GeneralConfig::default());

        let fixture = Fixture::new("https://example.com/about");
        assert_eq!(
            strategy.try_resolve(&fixture.input(&[])).unwrap(),
            Some(ResolvedRoute::render_template("about"))
        );

        let fixture = Fixture::new("https://example.com/_partials/header");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);

        let fixture = Fixture::new("https://example.com/missing");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);

        // Control panel templates are not filtered by the private marker
        let fixture = Fixture::new("https://example.com/admin/entries");
        assert!(strategy.try_resolve(&fixture.input(&[])).unwrap().is_some());
    }

    #[test]
    fn test_template_strategy_rejects_traversal() {
        let templates = Arc::new(Templates(HashSet::new()));
        let strategy = TemplateStrategy::new(templates, &GeneralConfig::default());
        let fixture = Fixture::new("https://example.com/");
        let facts = PathFacts {
            segments: vec!["..".into(), "secrets".into()],
            path: "../secrets".into(),
            ..fixture.facts.clone()
        };
        let input = ResolutionInput {
            facts: &facts,
            ..fixture.input(&[])
        };
        assert!(matches!(
            strategy.try_resolve(&input),
            Err(RoutingError::PathTraversal { .. })
        ));
    }

    #[test]
    fn test_template_strategy_disabled_when_not_installed() {
        let templates = Arc::new(Templates(HashSet::from(["about"])));
        let general = GeneralConfig {
            installed: false,
            ..GeneralConfig::default()
        };
        let strategy = TemplateStrategy::new(templates, &general);
        let fixture = Fixture::new("https://example.com/about");
        assert_eq!(strategy.try_resolve(&fixture.input(&[])).unwrap(), None);
    }
}
