//! Route lookup entry point.
//!
//! # Responsibilities
//! - Own configuration, collaborators and the site/rule cache
//! - Build the cache lazily, exactly once per configuration generation
//! - Resolve requests to a site, path facts and a route outcome
//!
//! # Design Decisions
//! - A generation is immutable once built; reload swaps in a new generation
//!   so in-flight requests keep a consistent view
//! - Concurrent first use is serialized by a mutex around cache construction
//! - Explicit NotFound rather than silent default

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::config::schema::RouterConfig;
use crate::error::RoutingResult;
use crate::http::request::RequestContext;
use crate::lookup::elements::{ElementLookup, MemoryElementIndex};
use crate::lookup::templates::{FsTemplates, TemplateExistence};
use crate::lookup::tokens::{MemoryTokenStore, TokenStore};
use crate::observability::metrics;
use crate::routing::path::{PathClassifier, PathFacts};
use crate::routing::pipeline::RouteResolutionPipeline;
use crate::routing::route::{RouteOutcome, RouteParams};
use crate::routing::rule::{UrlRule, UrlRuleCompiler};
use crate::routing::strategy::ResolutionInput;
use crate::sites::provider::{ConfigSiteProvider, SiteConfigProvider};
use crate::sites::resolver::SiteResolver;
use crate::sites::site::{Site, SiteSet};

/// External systems consulted during resolution.
#[derive(Clone)]
pub struct Collaborators {
    pub tokens: Arc<dyn TokenStore>,
    pub elements: Arc<dyn ElementLookup>,
    pub templates: Arc<dyn TemplateExistence>,
}

impl Collaborators {
    /// In-memory stores seeded from the config and templates on disk.
    pub fn from_config(config: &RouterConfig) -> Self {
        Self {
            tokens: Arc::new(MemoryTokenStore::from_config(&config.tokens)),
            elements: Arc::new(MemoryElementIndex::from_config(&config.elements, &config.sites)),
            templates: Arc::new(FsTemplates::new(
                &config.general.templates_path,
                config.general.private_template_trigger.clone(),
            )),
        }
    }
}

/// Result of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub site: Site,
    pub facts: PathFacts,
    #[serde(flatten)]
    pub outcome: RouteOutcome,
}

/// Counts reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouterSummary {
    pub sites: usize,
    pub rules: usize,
    pub cp_rules: usize,
}

/// Cached sites and compiled rules.
struct Compiled {
    sites: SiteSet,
    rules: Vec<UrlRule>,
    cp_rules: Vec<UrlRule>,
}

impl Compiled {
    fn build(config: &RouterConfig, provider: &dyn SiteConfigProvider) -> RoutingResult<Self> {
        let primary = provider.primary_site().map(|s| s.id);
        let sites = SiteSet::new(provider.all_sites(), primary)?;
        let compiler = UrlRuleCompiler::new(&config.general.slug_word_separator);
        Ok(Self {
            sites,
            rules: compiler.compile(&config.rules)?,
            cp_rules: compiler.compile(&config.cp_rules)?,
        })
    }
}

/// One configuration with its lazily built cache.
struct Generation {
    config: Arc<RouterConfig>,
    provider: Arc<dyn SiteConfigProvider>,
    classifier: PathClassifier,
    pipeline: RouteResolutionPipeline,
    compiled: OnceLock<Arc<Compiled>>,
    init_lock: Mutex<()>,
}

impl Generation {
    fn new(
        config: Arc<RouterConfig>,
        provider: Arc<dyn SiteConfigProvider>,
        collaborators: &Collaborators,
    ) -> Self {
        let pipeline = RouteResolutionPipeline::standard(
            collaborators.tokens.clone(),
            collaborators.elements.clone(),
            collaborators.templates.clone(),
            &config.general,
        );
        Self {
            classifier: PathClassifier::from_config(&config.general),
            pipeline,
            provider,
            config,
            compiled: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    fn compiled(&self) -> RoutingResult<Arc<Compiled>> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled.clone());
        }

        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled.clone());
        }

        let compiled = Arc::new(Compiled::build(&self.config, self.provider.as_ref())?);
        tracing::info!(
            sites = compiled.sites.len(),
            rules = compiled.rules.len(),
            cp_rules = compiled.cp_rules.len(),
            "Routing cache built"
        );
        metrics::record_cache_build();
        Ok(self.compiled.get_or_init(|| compiled).clone())
    }
}

/// Resolves requests to sites and routes.
pub struct Router {
    generation: ArcSwap<Generation>,
    collaborators: Collaborators,
    site_provider: Option<Arc<dyn SiteConfigProvider>>,
}

impl Router {
    /// Router whose sites come from the configuration.
    pub fn new(config: RouterConfig, collaborators: Collaborators) -> Self {
        Self::build(config, collaborators, None)
    }

    /// Router whose sites come from an external provider.
    pub fn with_site_provider(
        config: RouterConfig,
        collaborators: Collaborators,
        provider: Arc<dyn SiteConfigProvider>,
    ) -> Self {
        Self::build(config, collaborators, Some(provider))
    }

    fn build(
        config: RouterConfig,
        collaborators: Collaborators,
        site_provider: Option<Arc<dyn SiteConfigProvider>>,
    ) -> Self {
        let generation = Self::generation(Arc::new(config), &collaborators, site_provider.as_ref());
        Self {
            generation: ArcSwap::from_pointee(generation),
            collaborators,
            site_provider,
        }
    }

    fn generation(
        config: Arc<RouterConfig>,
        collaborators: &Collaborators,
        site_provider: Option<&Arc<dyn SiteConfigProvider>>,
    ) -> Generation {
        let provider = match site_provider {
            Some(provider) => provider.clone(),
            None => Arc::new(ConfigSiteProvider::new(config.sites.clone())),
        };
        Generation::new(config, provider, collaborators)
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<RouterConfig> {
        self.generation.load().config.clone()
    }

    /// Build the site and rule cache now instead of on first request.
    pub fn init(&self) -> RoutingResult<()> {
        self.generation.load().compiled().map(|_| ())
    }

    /// Whether the cache for the current configuration has been built.
    pub fn is_initialized(&self) -> bool {
        self.generation.load().compiled.get().is_some()
    }

    /// Drop the cached sites and rules; they are rebuilt on next use.
    pub fn invalidate(&self) {
        let config = self.config();
        let generation = Self::generation(config, &self.collaborators, self.site_provider.as_ref());
        self.generation.store(Arc::new(generation));
        tracing::info!("Routing cache invalidated");
    }

    /// Swap in a new configuration and drop the cache.
    pub fn reload(&self, config: RouterConfig) {
        let generation =
            Self::generation(Arc::new(config), &self.collaborators, self.site_provider.as_ref());
        self.generation.store(Arc::new(generation));
        tracing::info!("Router configuration reloaded");
    }

    /// All sites in declaration order.
    pub fn sites(&self) -> RoutingResult<Vec<Site>> {
        Ok(self.generation.load().compiled()?.sites.sites().to_vec())
    }

    pub fn summary(&self) -> RoutingResult<RouterSummary> {
        let compiled = self.generation.load().compiled()?;
        Ok(RouterSummary {
            sites: compiled.sites.len(),
            rules: compiled.rules.len(),
            cp_rules: compiled.cp_rules.len(),
        })
    }

    /// Resolve a request.
    ///
    /// `deadline` is the ambient request deadline; resolution fails with
    /// `DeadlineExceeded` once it has passed.
    pub fn resolve(&self, ctx: &RequestContext, deadline: Option<Instant>) -> RoutingResult<Resolution> {
        let start = Instant::now();
        let generation = self.generation.load_full();
        let compiled = generation.compiled()?;

        let site = SiteResolver::resolve(&compiled.sites, ctx);
        let facts = generation.classifier.classify_for_site(ctx, site);
        let rules = if facts.is_cp_request {
            &compiled.cp_rules
        } else {
            &compiled.rules
        };

        let input = ResolutionInput {
            ctx,
            site,
            facts: &facts,
            rules,
        };
        let result = generation.pipeline.resolve(&input, deadline);
        metrics::record_resolution(&result, start);

        let outcome = result?;
        tracing::debug!(
            site = %site.handle,
            path = %facts.path,
            cp = facts.is_cp_request,
            not_found = outcome.is_not_found(),
            "Request resolved"
        );

        Ok(Resolution {
            site: site.clone(),
            facts,
            outcome,
        })
    }

    /// Generate a URL for `route` on the site with `site_handle` (primary
    /// site when `None`), using the first rule able to build it.
    pub fn create_url(
        &self,
        site_handle: Option<&str>,
        route: &str,
        params: &RouteParams,
    ) -> RoutingResult<Option<String>> {
        let compiled = self.generation.load().compiled()?;
        let site = match site_handle {
            Some(handle) => match compiled.sites.by_handle(handle) {
                Some(site) => site,
                None => return Ok(None),
            },
            None => compiled.sites.primary(),
        };

        Ok(compiled
            .rules
            .iter()
            .filter(|rule| rule.applies_to_site(&site.handle))
            .find_map(|rule| rule.create_url(route, params))
            .map(|path| site.url_for(&path)))
    }
}
