//! Static URL rules.
//!
//! # Pattern Syntax
//! - `<name>` captures one path segment (`[^/]+`)
//! - `<name:regex>` captures with a custom expression
//! - `{handle}`, `{slug}`, `{uid}` expand to fixed expressions
//! - Everything else matches literally against the whole normalized path
//!
//! # Declaration Forms
//! - Shorthand: `pattern = "GET,POST foo/<id:\d+>"`, `target = "entries/edit"`
//!   (or `target = { template = "...", variables = {...} }`)
//! - Explicit: `pattern`, `route` or `template`, `params`, `verbs`
//!
//! A rule restricted to verbs that do not include `GET` is parse-only: it
//! matches requests but never generates URLs.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use crate::error::{RoutingError, RoutingResult};
use crate::routing::route::{ResolvedRoute, RouteParams, RENDER_TEMPLATE_ACTION};

/// HTTP verbs recognized in a shorthand verb prefix.
pub const VERBS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

static VERB_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    let verbs = VERBS.join("|");
    Regex::new(&format!(r"^((?:(?:{verbs}),)*(?:{verbs}))\s+(.*)$"))
        .expect("verb prefix pattern is valid")
});

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([\w.\-]+)(?::([^>]+))?>").expect("placeholder pattern is valid")
});

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(handle|slug|uid)\}").expect("token pattern is valid"));

static ROUTE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([\w.\-]+)>").expect("route placeholder pattern is valid"));

const HANDLE_PATTERN: &str = "(?:[a-zA-Z][a-zA-Z0-9_]*)";
const UID_PATTERN: &str =
    "(?:[A-Za-z0-9]{8}-[A-Za-z0-9]{4}-4[A-Za-z0-9]{3}-[89abAB][A-Za-z0-9]{3}-[A-Za-z0-9]{12})";
const DEFAULT_SEGMENT_PATTERN: &str = "[^/]+";

/// A rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RuleDeclaration {
    Shorthand(ShorthandRule),
    Explicit(ExplicitRule),
}

/// `pattern` (optionally verb-prefixed) mapped to a target.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShorthandRule {
    pub pattern: String,
    pub target: RuleTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RuleTarget {
    Route(String),
    Template {
        template: String,
        #[serde(default)]
        variables: RouteParams,
    },
}

/// A fully spelled-out rule.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExplicitRule {
    pub pattern: String,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub variables: RouteParams,
    #[serde(default)]
    pub params: RouteParams,
    #[serde(default)]
    pub verbs: Option<Vec<String>>,
    #[serde(default)]
    pub site: Option<String>,
}

impl RuleDeclaration {
    /// `"VERB,VERB pattern" => route`.
    pub fn shorthand(pattern: impl Into<String>, route: impl Into<String>) -> Self {
        RuleDeclaration::Shorthand(ShorthandRule {
            pattern: pattern.into(),
            target: RuleTarget::Route(route.into()),
            site: None,
        })
    }

    /// `pattern => { template, variables }`.
    pub fn template(pattern: impl Into<String>, template: impl Into<String>, variables: RouteParams) -> Self {
        RuleDeclaration::Shorthand(ShorthandRule {
            pattern: pattern.into(),
            target: RuleTarget::Template {
                template: template.into(),
                variables,
            },
            site: None,
        })
    }

    /// Pattern as declared, including any verb prefix.
    pub fn pattern(&self) -> &str {
        match self {
            RuleDeclaration::Shorthand(rule) => &rule.pattern,
            RuleDeclaration::Explicit(rule) => &rule.pattern,
        }
    }

    /// Handle of the site this rule is restricted to.
    pub fn site(&self) -> Option<&str> {
        match self {
            RuleDeclaration::Shorthand(rule) => rule.site.as_deref(),
            RuleDeclaration::Explicit(rule) => rule.site.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
enum PatternPart {
    Literal(String),
    Token,
    Placeholder(usize),
}

#[derive(Debug, Clone)]
struct Placeholder {
    name: String,
    group: String,
    check: Regex,
}

/// A compiled rule. Read-only after compilation.
#[derive(Debug, Clone)]
pub struct UrlRule {
    /// Pattern after verb extraction, without surrounding slashes.
    pub pattern: String,
    pub route: String,
    /// Fixed params merged into every match.
    pub params: RouteParams,
    pub verbs: Option<BTreeSet<String>>,
    pub parse_only: bool,
    pub site: Option<String>,
    matcher: Regex,
    parts: Vec<PatternPart>,
    placeholders: Vec<Placeholder>,
    route_placeholders: Vec<String>,
}

impl UrlRule {
    /// Whether this rule applies on the site with `handle`.
    pub fn applies_to_site(&self, handle: &str) -> bool {
        self.site.as_deref().map_or(true, |site| site == handle)
    }

    /// Match a request method and normalized path.
    pub fn parse_request(&self, method: &str, path: &str) -> Option<ResolvedRoute> {
        if let Some(verbs) = &self.verbs {
            if !verbs.contains(method) {
                return None;
            }
        }

        let caps = self.matcher.captures(path)?;
        let mut route = self.route.clone();
        let mut params = self.params.clone();
        for placeholder in &self.placeholders {
            let Some(value) = caps.name(&placeholder.group) else {
                continue;
            };
            if self.route_placeholders.contains(&placeholder.name) {
                route = route.replace(&format!("<{}>", placeholder.name), value.as_str());
            } else {
                params.insert(placeholder.name.clone(), Value::String(value.as_str().to_string()));
            }
        }

        Some(ResolvedRoute::new(route, params))
    }

    /// Build a path for `route` and `params`, if this rule can generate one.
    ///
    /// Params not consumed by the pattern are appended as a query string.
    pub fn create_url(&self, route: &str, params: &RouteParams) -> Option<String> {
        if self.parse_only || !self.route_placeholders.is_empty() || route != self.route {
            return None;
        }

        for (name, fixed) in &self.params {
            if params.get(name).is_some_and(|given| given != fixed) {
                return None;
            }
        }

        let mut path = String::new();
        for part in &self.parts {
            match part {
                PatternPart::Literal(text) => path.push_str(text),
                PatternPart::Token => return None,
                PatternPart::Placeholder(index) => {
                    let placeholder = &self.placeholders[*index];
                    let value = params.get(&placeholder.name).and_then(scalar)?;
                    if !placeholder.check.is_match(&value) {
                        return None;
                    }
                    path.push_str(&value);
                }
            }
        }

        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (name, value) in params {
            if self.params.contains_key(name) || self.placeholders.iter().any(|p| &p.name == name) {
                continue;
            }
            if let Some(value) = scalar(value) {
                query.append_pair(name, &value);
                has_query = true;
            }
        }

        let path = path.trim_matches('/').to_string();
        if has_query {
            Some(format!("{path}?{}", query.finish()))
        } else {
            Some(path)
        }
    }
}

/// Compiles rule declarations into [`UrlRule`]s.
#[derive(Debug, Clone)]
pub struct UrlRuleCompiler {
    slug_pattern: String,
}

impl UrlRuleCompiler {
    /// `slug_word_separator` extends the characters allowed by `{slug}`.
    pub fn new(slug_word_separator: &str) -> Self {
        let mut chars = vec!['.', '_', '-'];
        for c in slug_word_separator.chars() {
            if c != '/' && !chars.contains(&c) {
                chars.push(c);
            }
        }
        let extra: String = chars.into_iter().collect();
        Self {
            slug_pattern: format!(r"(?:[\p{{L}}\p{{N}}\p{{M}}{}]+)", regex::escape(&extra)),
        }
    }

    /// Compile declarations, keeping their order.
    pub fn compile(&self, declarations: &[RuleDeclaration]) -> RoutingResult<Vec<UrlRule>> {
        declarations.iter().map(|d| self.compile_one(d)).collect()
    }

    pub fn compile_one(&self, declaration: &RuleDeclaration) -> RoutingResult<UrlRule> {
        match declaration {
            RuleDeclaration::Shorthand(rule) => {
                let (verbs, pattern) = split_verbs(&rule.pattern);
                let (route, params) = match &rule.target {
                    RuleTarget::Route(route) => (route.clone(), RouteParams::new()),
                    RuleTarget::Template { template, variables } => template_target(template, variables),
                };
                self.build(&rule.pattern, pattern, route, params, verbs, rule.site.clone())
            }
            RuleDeclaration::Explicit(rule) => {
                let (route, mut params) = match (&rule.route, &rule.template) {
                    (Some(route), None) => (route.clone(), RouteParams::new()),
                    (None, Some(template)) => template_target(template, &rule.variables),
                    _ => {
                        return Err(invalid(&rule.pattern, "declare exactly one of `route` or `template`"));
                    }
                };
                for (name, value) in &rule.params {
                    params.entry(name.clone()).or_insert_with(|| value.clone());
                }
                let verbs = rule
                    .verbs
                    .as_ref()
                    .filter(|verbs| !verbs.is_empty())
                    .map(|verbs| verbs.iter().map(|v| v.to_ascii_uppercase()).collect());
                self.build(&rule.pattern, &rule.pattern, route, params, verbs, rule.site.clone())
            }
        }
    }

    fn expand_tokens(&self, text: &str) -> String {
        TOKEN
            .replace_all(text, |caps: &regex::Captures<'_>| self.token_pattern(&caps[1]).to_string())
            .into_owned()
    }

    fn token_pattern(&self, token: &str) -> &str {
        match token {
            "handle" => HANDLE_PATTERN,
            "slug" => self.slug_pattern.as_str(),
            _ => UID_PATTERN,
        }
    }

    /// Literal text matches itself. Tokens written outside a placeholder
    /// still match their expression but make the rule unable to build URLs.
    fn push_literal(&self, literal: &str, expression: &mut String, parts: &mut Vec<PatternPart>) {
        let mut last = 0;
        for token in TOKEN.captures_iter(literal) {
            let Some(whole) = token.get(0) else {
                continue;
            };
            push_text(&literal[last..whole.start()], expression, parts);
            expression.push_str(self.token_pattern(&token[1]));
            parts.push(PatternPart::Token);
            last = whole.end();
        }
        push_text(&literal[last..], expression, parts);
    }

    fn build(
        &self,
        declared: &str,
        pattern: &str,
        route: String,
        params: RouteParams,
        verbs: Option<BTreeSet<String>>,
        site: Option<String>,
    ) -> RoutingResult<UrlRule> {
        let pattern = pattern.trim_matches('/').to_string();

        let mut expression = String::from("^(?:");
        let mut parts = Vec::new();
        let mut placeholders = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&pattern) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            self.push_literal(&pattern[last..whole.start()], &mut expression, &mut parts);
            last = whole.end();

            let name = caps[1].to_string();
            let inner = caps
                .get(2)
                .map_or_else(|| DEFAULT_SEGMENT_PATTERN.to_string(), |m| self.expand_tokens(m.as_str()));
            let group = format!("p{}", placeholders.len());
            expression.push_str(&format!("(?P<{group}>{inner})"));

            let check = Regex::new(&format!("^(?:{inner})$")).map_err(|e| invalid(declared, e))?;
            parts.push(PatternPart::Placeholder(placeholders.len()));
            placeholders.push(Placeholder { name, group, check });
        }
        self.push_literal(&pattern[last..], &mut expression, &mut parts);
        expression.push_str(")$");

        let matcher = Regex::new(&expression).map_err(|e| invalid(declared, e))?;

        let mut route_placeholders = Vec::new();
        for caps in ROUTE_PLACEHOLDER.captures_iter(&route) {
            let name = caps[1].to_string();
            if !placeholders.iter().any(|p| p.name == name) {
                return Err(invalid(
                    declared,
                    format!("route references unknown placeholder <{name}>"),
                ));
            }
            route_placeholders.push(name);
        }

        let parse_only = verbs.as_ref().is_some_and(|v| !v.contains("GET"));

        Ok(UrlRule {
            pattern,
            route,
            params,
            verbs,
            parse_only,
            site,
            matcher,
            parts,
            placeholders,
            route_placeholders,
        })
    }
}

/// Split `"GET,POST pattern"` into its verb set and pattern. Anything that is
/// not a well-formed verb list stays part of the pattern.
fn split_verbs(declared: &str) -> (Option<BTreeSet<String>>, &str) {
    match VERB_PREFIX.captures(declared) {
        Some(caps) => {
            let verbs = caps[1].split(',').map(str::to_string).collect();
            let pattern = caps.get(2).map_or("", |m| m.as_str());
            (Some(verbs), pattern)
        }
        None => (None, declared),
    }
}

fn template_target(template: &str, variables: &RouteParams) -> (String, RouteParams) {
    let mut params = RouteParams::new();
    params.insert("template".to_string(), Value::String(template.to_string()));
    if !variables.is_empty() {
        params.insert(
            "variables".to_string(),
            Value::Object(variables.clone().into_iter().collect()),
        );
    }
    (RENDER_TEMPLATE_ACTION.to_string(), params)
}

fn invalid(pattern: &str, reason: impl ToString) -> RoutingError {
    RoutingError::InvalidRule {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

fn push_text(text: &str, expression: &mut String, parts: &mut Vec<PatternPart>) {
    if !text.is_empty() {
        expression.push_str(&regex::escape(text));
        parts.push(PatternPart::Literal(text.to_string()));
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}
