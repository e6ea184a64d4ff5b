//! Route values produced by resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Route parameters. Ordered so that equal routes compare and serialize equally.
pub type RouteParams = BTreeMap<String, Value>;

/// Action that renders a template; its `template` param names the template.
pub const RENDER_TEMPLATE_ACTION: &str = "templates/render";

/// Action that issues an HTTP redirect.
pub const REDIRECT_ACTION: &str = "redirect";

/// An action identifier plus its parameters, handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRoute {
    pub action: String,
    #[serde(default)]
    pub params: RouteParams,
}

impl ResolvedRoute {
    pub fn new(action: impl Into<String>, params: RouteParams) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }

    /// Route rendering `template` with no extra variables.
    pub fn render_template(template: impl Into<String>) -> Self {
        let mut params = RouteParams::new();
        params.insert("template".to_string(), Value::String(template.into()));
        Self::new(RENDER_TEMPLATE_ACTION, params)
    }

    /// Template path of a render route.
    pub fn template(&self) -> Option<&str> {
        if self.action != RENDER_TEMPLATE_ACTION {
            return None;
        }
        self.params.get("template").and_then(Value::as_str)
    }
}

/// Which strategy produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Token,
    Element,
    Rule,
    WellKnown,
    Template,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Token => "token",
            StrategyKind::Element => "element",
            StrategyKind::Rule => "rule",
            StrategyKind::WellKnown => "well_known",
            StrategyKind::Template => "template",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of route resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    Matched {
        strategy: StrategyKind,
        route: ResolvedRoute,
    },
    NotFound,
}

impl RouteOutcome {
    pub fn route(&self) -> Option<&ResolvedRoute> {
        match self {
            RouteOutcome::Matched { route, .. } => Some(route),
            RouteOutcome::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RouteOutcome::NotFound)
    }
}
