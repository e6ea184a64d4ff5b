//! Site configuration providers.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::schema::SiteConfig;
use crate::sites::site::Site;

/// Source of the configured site list.
pub trait SiteConfigProvider: Send + Sync {
    /// All sites in declaration order.
    fn all_sites(&self) -> Vec<Site>;

    /// The primary site, if one is configured.
    fn primary_site(&self) -> Option<Site>;
}

/// Serves sites declared in the router configuration.
#[derive(Debug, Clone)]
pub struct ConfigSiteProvider {
    sites: Vec<SiteConfig>,
}

impl ConfigSiteProvider {
    pub fn new(sites: Vec<SiteConfig>) -> Self {
        Self { sites }
    }

    fn build(config: &SiteConfig) -> Site {
        let base_url = config.base_url.as_deref().map(|raw| expand_env(raw).into_owned());
        Site::new(config.id, config.handle.clone(), base_url, config.primary)
    }
}

impl SiteConfigProvider for ConfigSiteProvider {
    fn all_sites(&self) -> Vec<Site> {
        self.sites.iter().map(Self::build).collect()
    }

    fn primary_site(&self) -> Option<Site> {
        self.sites.iter().find(|s| s.primary).map(Self::build)
    }
}

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("env reference pattern is valid")
});

/// Replace `$NAME` and `${NAME}` with environment values. Unknown variables
/// are left untouched.
pub fn expand_env(raw: &str) -> Cow<'_, str> {
    ENV_REF.replace_all(raw, |caps: &Captures<'_>| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    })
}
