//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check site integrity (exactly one primary, unique ids and handles)
//! - Check referential integrity (rules reference existing sites)
//! - Compile rule declarations so bad patterns fail at load time
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::error::RoutingError;
use crate::routing::rule::UrlRuleCompiler;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one site must be configured")]
    NoSites,

    #[error("exactly one site must be primary, found {0}")]
    PrimaryCount(usize),

    #[error("duplicate site id {0}")]
    DuplicateSiteId(u32),

    #[error("duplicate site handle `{0}`")]
    DuplicateSiteHandle(String),

    #[error("`general.{0}` must be a single non-empty path segment")]
    InvalidSegment(&'static str),

    #[error("`general.page_trigger` must not be empty")]
    EmptyPageTrigger,

    #[error("`general.max_page_num` must be at least 1")]
    InvalidMaxPage,

    #[error("`general.token_param` must not be empty")]
    EmptyTokenParam,

    #[error("rule `{pattern}` references unknown site `{site}`")]
    UnknownRuleSite { pattern: String, site: String },

    #[error("element {id} references unknown site `{site}`")]
    UnknownElementSite { id: u64, site: String },

    #[error("{0}")]
    Rule(RoutingError),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.sites.is_empty() {
        errors.push(ValidationError::NoSites);
    } else {
        let primaries = config.sites.iter().filter(|s| s.primary).count();
        if primaries != 1 {
            errors.push(ValidationError::PrimaryCount(primaries));
        }
    }

    let mut ids = HashSet::new();
    let mut handles = HashSet::new();
    for site in &config.sites {
        if !ids.insert(site.id) {
            errors.push(ValidationError::DuplicateSiteId(site.id));
        }
        if !handles.insert(site.handle.as_str()) {
            errors.push(ValidationError::DuplicateSiteHandle(site.handle.clone()));
        }
    }

    let general = &config.general;
    if !is_segment(&general.cp_trigger) {
        errors.push(ValidationError::InvalidSegment("cp_trigger"));
    }
    if !is_segment(&general.action_trigger) {
        errors.push(ValidationError::InvalidSegment("action_trigger"));
    }
    if general.page_trigger.trim_start_matches('?').trim_end_matches('=').is_empty() {
        errors.push(ValidationError::EmptyPageTrigger);
    }
    if general.max_page_num == 0 {
        errors.push(ValidationError::InvalidMaxPage);
    }
    if general.token_param.is_empty() {
        errors.push(ValidationError::EmptyTokenParam);
    }

    for declaration in config.rules.iter().chain(&config.cp_rules) {
        if let Some(site) = declaration.site() {
            if !handles.contains(site) {
                errors.push(ValidationError::UnknownRuleSite {
                    pattern: declaration.pattern().to_string(),
                    site: site.to_string(),
                });
            }
        }
    }

    for element in &config.elements {
        if !handles.contains(element.site.as_str()) {
            errors.push(ValidationError::UnknownElementSite {
                id: element.id,
                site: element.site.clone(),
            });
        }
    }

    let compiler = UrlRuleCompiler::new(&general.slug_word_separator);
    for declaration in config.rules.iter().chain(&config.cp_rules) {
        if let Err(e) = compiler.compile_one(declaration) {
            errors.push(ValidationError::Rule(e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_segment(value: &str) -> bool {
    !value.is_empty() && !value.contains('/')
}
