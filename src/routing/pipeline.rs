//! Ordered execution of resolution strategies.

use std::sync::Arc;
use std::time::Instant;

use crate::config::schema::GeneralConfig;
use crate::error::{RoutingError, RoutingResult};
use crate::lookup::elements::ElementLookup;
use crate::lookup::templates::{is_traversal, TemplateExistence};
use crate::lookup::tokens::TokenStore;
use crate::routing::route::RouteOutcome;
use crate::routing::strategy::{
    ElementStrategy, ResolutionInput, RuleStrategy, Strategy, TemplateStrategy, TokenStrategy,
    WellKnownStrategy,
};

/// Runs strategies in order until one yields a route.
pub struct RouteResolutionPipeline {
    strategies: Vec<Box<dyn Strategy>>,
}

impl RouteResolutionPipeline {
    /// Pipeline over a custom strategy list.
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// The standard chain: token, element, rule, well-known, template.
    pub fn standard(
        tokens: Arc<dyn TokenStore>,
        elements: Arc<dyn ElementLookup>,
        templates: Arc<dyn TemplateExistence>,
        general: &GeneralConfig,
    ) -> Self {
        Self::new(vec![
            Box::new(TokenStrategy::new(tokens, general)),
            Box::new(ElementStrategy::new(elements, general)),
            Box::new(RuleStrategy),
            Box::new(WellKnownStrategy::new(general)),
            Box::new(TemplateStrategy::new(templates, general)),
        ])
    }

    /// Resolve a request. `NotFound` is a normal outcome, not an error.
    ///
    /// The deadline is checked before each strategy runs.
    pub fn resolve(
        &self,
        input: &ResolutionInput<'_>,
        deadline: Option<Instant>,
    ) -> RoutingResult<RouteOutcome> {
        for strategy in &self.strategies {
            let kind = strategy.kind();
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(RoutingError::DeadlineExceeded {
                    strategy: kind.as_str(),
                });
            }

            let Some(route) = strategy.try_resolve(input)? else {
                tracing::trace!(strategy = %kind, "Strategy declined");
                continue;
            };

            if let Some(template) = route.template() {
                if is_traversal(template) {
                    return Err(RoutingError::PathTraversal {
                        path: template.to_string(),
                    });
                }
            }

            tracing::debug!(strategy = %kind, action = %route.action, "Route resolved");
            return Ok(RouteOutcome::Matched {
                strategy: kind,
                route,
            });
        }

        Ok(RouteOutcome::NotFound)
    }
}
