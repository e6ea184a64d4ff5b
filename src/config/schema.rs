//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::routing::rule::RuleDeclaration;

/// Root configuration for the site router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request classification and resolution settings.
    pub general: GeneralConfig,

    /// Configured sites, in declaration order.
    pub sites: Vec<SiteConfig>,

    /// URL rules for public requests, in priority order.
    pub rules: Vec<RuleDeclaration>,

    /// URL rules for control panel requests, in priority order.
    pub cp_rules: Vec<RuleDeclaration>,

    /// Seed entries for the in-memory token store.
    pub tokens: Vec<TokenConfig>,

    /// Seed entries for the in-memory element index.
    pub elements: Vec<ElementConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request deadline in seconds, shared by the HTTP layer and resolution.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Settings consumed by request classification and the resolution strategies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Whether the system is installed. Element and template routing are
    /// disabled until it is.
    pub installed: bool,

    /// Headless systems never route public requests to elements or templates.
    pub headless_mode: bool,

    /// First path segment that marks a control panel request.
    pub cp_trigger: String,

    /// Host that serves the control panel without a trigger segment.
    pub base_cp_host: Option<String>,

    /// First path segment that marks an action request.
    pub action_trigger: String,

    /// Pagination trigger: `p` for `/blog/p2`, `?page` for `/blog?page=2`.
    pub page_trigger: String,

    /// Upper bound for derived page numbers.
    pub max_page_num: u32,

    /// Query parameter carrying a route token.
    pub token_param: String,

    /// Header carrying a route token.
    pub token_header: String,

    /// Segment prefix that marks a template as private.
    pub private_template_trigger: String,

    pub login_path: String,
    pub logout_path: String,
    pub set_password_path: String,
    pub verify_email_path: String,

    /// Public path that starts a password reset, target of
    /// `/.well-known/change-password`.
    pub set_password_request_path: Option<String>,

    /// Extra character allowed in `{slug}` rule tokens.
    pub slug_word_separator: String,

    /// Key used to sign well-known redirect targets.
    pub security_key: String,

    /// Root directory of renderable templates.
    pub templates_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            installed: true,
            headless_mode: false,
            cp_trigger: "admin".to_string(),
            base_cp_host: None,
            action_trigger: "actions".to_string(),
            page_trigger: "p".to_string(),
            max_page_num: 100_000,
            token_param: "token".to_string(),
            token_header: "X-Route-Token".to_string(),
            private_template_trigger: "_".to_string(),
            login_path: "login".to_string(),
            logout_path: "logout".to_string(),
            set_password_path: "setpassword".to_string(),
            verify_email_path: "verifyemail".to_string(),
            set_password_request_path: None,
            slug_word_separator: "-".to_string(),
            security_key: String::new(),
            templates_path: "templates".to_string(),
        }
    }
}

/// A configured site.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Unique numeric site identifier.
    pub id: u32,

    /// Unique site handle.
    pub handle: String,

    /// Base URL; may reference environment variables (`$NAME`, `${NAME}`).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Whether this is the primary site.
    #[serde(default)]
    pub primary: bool,
}

/// A stored route token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    pub token: String,
    pub action: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
}

/// An element addressable by URI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElementConfig {
    pub id: u64,
    /// Site handle the URI belongs to.
    pub site: String,
    /// Element URI without leading slash; `__home__` for the site root.
    pub uri: String,
    /// Route the element declares for itself. Elements without one do not
    /// match.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}
