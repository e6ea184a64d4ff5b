//! Element lookup by URI.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::config::schema::{ElementConfig, SiteConfig};
use crate::routing::route::ResolvedRoute;
use crate::sites::site::SiteId;

/// URI of the element serving a site's root.
pub const HOME_URI: &str = "__home__";

/// An element found at a URI, with the route it declares for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementRoute {
    pub element_id: u64,
    pub route: Option<ResolvedRoute>,
}

/// Finds content elements by URI.
pub trait ElementLookup: Send + Sync {
    fn find_by_uri(&self, uri: &str, site_id: SiteId) -> Option<ElementRoute>;
}

/// A thread-safe in-memory element index keyed by site and URI.
///
/// URIs compare case-insensitively.
#[derive(Clone, Default)]
pub struct MemoryElementIndex {
    inner: Arc<DashMap<(SiteId, String), ElementRoute>>,
}

impl MemoryElementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an index from configuration. Elements naming unknown sites are
    /// skipped.
    pub fn from_config(elements: &[ElementConfig], sites: &[SiteConfig]) -> Self {
        let ids: HashMap<&str, SiteId> = sites.iter().map(|s| (s.handle.as_str(), s.id)).collect();
        let index = Self::new();
        for element in elements {
            let Some(site_id) = ids.get(element.site.as_str()) else {
                tracing::warn!(element = element.id, site = %element.site, "Element references unknown site");
                continue;
            };
            let route = element
                .action
                .as_ref()
                .map(|action| ResolvedRoute::new(action.clone(), element.params.clone()));
            index.insert(*site_id, &element.uri, element.id, route);
        }
        index
    }

    pub fn insert(&self, site_id: SiteId, uri: &str, element_id: u64, route: Option<ResolvedRoute>) {
        self.inner
            .insert((site_id, normalize_uri(uri)), ElementRoute { element_id, route });
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ElementLookup for MemoryElementIndex {
    fn find_by_uri(&self, uri: &str, site_id: SiteId) -> Option<ElementRoute> {
        self.inner
            .get(&(site_id, normalize_uri(uri)))
            .map(|r| r.value().clone())
    }
}

fn normalize_uri(uri: &str) -> String {
    uri.trim_matches('/').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::RouteParams;

    #[test]
    fn test_lookup_is_per_site_and_case_insensitive() {
        let index = MemoryElementIndex::new();
        let route = ResolvedRoute::new("templates/render", RouteParams::new());
        index.insert(1, "/News/Hello/", 10, Some(route.clone()));

        let found = index.find_by_uri("news/hello", 1).unwrap();
        assert_eq!(found.element_id, 10);
        assert_eq!(found.route, Some(route));
        assert!(index.find_by_uri("news/hello", 2).is_none());
    }

    #[test]
    fn test_from_config() {
        let sites = vec![SiteConfig {
            id: 3,
            handle: "blog".into(),
            base_url: None,
            primary: true,
        }];
        let elements = vec![
            ElementConfig {
                id: 1,
                site: "blog".into(),
                uri: HOME_URI.into(),
                action: Some("templates/render".into()),
                params: RouteParams::new(),
            },
            ElementConfig {
                id: 2,
                site: "missing".into(),
                uri: "x".into(),
                action: None,
                params: RouteParams::new(),
            },
        ];
        let index = MemoryElementIndex::from_config(&elements, &sites);
        assert_eq!(index.len(), 1);
        assert!(index.find_by_uri(HOME_URI, 3).is_some());
    }
}
