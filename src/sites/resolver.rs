//! Site selection for incoming requests.
//!
//! # Scoring
//! A site is a candidate when its declared host (if any) equals the request
//! host and the request URI starts with its declared base path (if any).
//! Candidates score `8 + len(base path)`, plus 4 when the port matches, plus
//! 2 when the scheme matches, plus 1 for the primary site. The highest score
//! wins; equal scores keep declaration order.

use crate::http::request::{default_port, RequestContext};
use crate::routing::path::split_segments;
use crate::sites::site::{Site, SiteSet, SiteUrl};

/// Picks the site a request belongs to.
#[derive(Debug, Default, Clone, Copy)]
pub struct SiteResolver;

impl SiteResolver {
    /// Resolve the request's site. Falls back to the primary site.
    pub fn resolve<'a>(sites: &'a SiteSet, ctx: &RequestContext) -> &'a Site {
        let full_uri = full_uri(ctx.path());

        let mut best: Option<(usize, &Site)> = None;
        for site in sites.sites() {
            let Some(url) = site.url() else {
                continue;
            };
            let Some(score) = score(url, site.primary, ctx, &full_uri) else {
                continue;
            };

            tracing::trace!(site = %site.handle, score, "Site candidate");
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, site));
            }
        }

        match best {
            Some((_, site)) => site,
            None => sites.primary(),
        }
    }
}

/// `/seg/seg` form of the request path, empty for the root.
fn full_uri(path: &str) -> String {
    split_segments(path)
        .iter()
        .map(|s| format!("/{s}"))
        .collect()
}

fn score(url: &SiteUrl, primary: bool, ctx: &RequestContext, full_uri: &str) -> Option<usize> {
    if let Some(host) = &url.host {
        if host != ctx.host() {
            return None;
        }
    }

    if !url.path.is_empty() && !format!("{full_uri}/").starts_with(&format!("{}/", url.path)) {
        return None;
    }

    let mut score = 8 + url.path.len();

    let declared_port = url.port.unwrap_or_else(|| {
        default_port(url.scheme.as_deref().unwrap_or(ctx.scheme()))
    });
    if declared_port == ctx.port() {
        score += 4;
    }

    if url.scheme.as_deref() == Some(ctx.scheme()) {
        score += 2;
    }

    if primary {
        score += 1;
    }

    Some(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn site(id: u32, handle: &str, base_url: Option<&str>, primary: bool) -> Site {
        Site::new(id, handle, base_url.map(str::to_string), primary)
    }

    fn set(sites: Vec<Site>) -> SiteSet {
        let primary = sites.iter().find(|s| s.primary).map(|s| s.id);
        SiteSet::new(sites, primary).unwrap()
    }

    fn ctx(url: &str) -> RequestContext {
        RequestContext::from_url("GET", url).unwrap()
    }

    #[test]
    fn test_longer_base_path_wins() {
        let sites = set(vec![
            site(1, "a", Some("https://a.example.com/"), true),
            site(2, "b", Some("https://a.example.com/blog/"), false),
        ]);
        let resolved = SiteResolver::resolve(&sites, &ctx("https://a.example.com/blog/post-1"));
        assert_eq!(resolved.handle, "b");

        let resolved = SiteResolver::resolve(&sites, &ctx("https://a.example.com/blogger"));
        assert_eq!(resolved.handle, "a");
    }

    #[test]
    fn test_no_match_falls_back_to_primary() {
        let sites = set(vec![
            site(1, "a", Some("https://one.example.com/"), false),
            site(2, "b", Some("https://two.example.com/"), true),
        ]);
        let resolved = SiteResolver::resolve(&sites, &ctx("https://other.example.com/"));
        assert_eq!(resolved.handle, "b");
    }

    #[test]
    fn test_sites_without_url_are_skipped() {
        let sites = set(vec![
            site(1, "a", None, true),
            site(2, "b", Some("not a url"), false),
            site(3, "c", Some("https://example.com/"), false),
        ]);
        let resolved = SiteResolver::resolve(&sites, &ctx("https://example.com/x"));
        assert_eq!(resolved.handle, "c");

        let resolved = SiteResolver::resolve(&sites, &ctx("https://elsewhere.com/x"));
        assert_eq!(resolved.handle, "a");
    }

    #[test]
    fn test_tie_break_prefers_primary_then_declaration_order() {
        // Same path, no scheme/port match for either (http vs https:8443)
        let sites = set(vec![
            site(1, "first", Some("https://example.com:8443/"), false),
            site(2, "second", Some("https://example.com:8443/"), true),
        ]);
        let resolved = SiteResolver::resolve(&sites, &ctx("http://example.com/"));
        assert_eq!(resolved.handle, "second");

        let sites = set(vec![
            site(1, "first", Some("/"), false),
            site(2, "second", Some("/"), false),
            site(3, "primary", Some("https://elsewhere.com/"), true),
        ]);
        let resolved = SiteResolver::resolve(&sites, &ctx("http://example.com/"));
        assert_eq!(resolved.handle, "first");
    }

    #[test]
    fn test_port_and_scheme_bonuses() {
        let sites = set(vec![
            site(1, "plain", Some("http://example.com/"), true),
            site(2, "secure", Some("https://example.com/"), false),
        ]);
        let resolved = SiteResolver::resolve(&sites, &ctx("https://example.com/"));
        assert_eq!(resolved.handle, "secure");

        let resolved = SiteResolver::resolve(&sites, &ctx("http://example.com/"));
        assert_eq!(resolved.handle, "plain");
    }

    #[test]
    fn test_path_only_site_matches_any_host() {
        let sites = set(vec![
            site(1, "en", Some("https://example.com/"), true),
            site(2, "de", Some("/deutsch/"), false),
        ]);
        let resolved = SiteResolver::resolve(&sites, &ctx("https://example.com/deutsch/impressum"));
        assert_eq!(resolved.handle, "de");
    }

    proptest! {
        #[test]
        fn test_unmatched_host_resolves_to_primary(
            site_hosts in prop::collection::vec("[a-z]{1,8}\\.example(:[0-9]{2,4})?(/[a-z]{1,6})?", 1..6),
            primary in any::<prop::sample::Index>(),
            host in "[a-z]{1,12}\\.test",
            path in "(/[a-z0-9]{1,8}){0,3}",
        ) {
            let primary = primary.index(site_hosts.len());
            let sites = set(
                site_hosts
                    .iter()
                    .enumerate()
                    .map(|(i, base)| {
                        site(i as u32 + 1, &format!("s{i}"), Some(format!("https://{base}/").as_str()), i == primary)
                    })
                    .collect(),
            );
            let resolved = SiteResolver::resolve(&sites, &ctx(&format!("https://{host}{path}")));
            prop_assert_eq!(resolved.handle.clone(), format!("s{primary}"));
        }

        #[test]
        fn test_equal_scores_prefer_primary_then_first(
            count in 2usize..6,
            primary in 0usize..8,
        ) {
            // `primary` past the tied sites selects a separate primary site.
            let mut sites: Vec<Site> = (0..count)
                .map(|i| site(i as u32 + 1, &format!("s{i}"), Some("https://example.com/news/"), i == primary))
                .collect();
            if primary >= count {
                sites.push(site(99, "elsewhere", Some("https://elsewhere.test/"), true));
            }
            let sites = set(sites);

            let resolved = SiteResolver::resolve(&sites, &ctx("https://example.com/news/item"));
            let expected = if primary < count { format!("s{primary}") } else { "s0".to_string() };
            prop_assert_eq!(resolved.handle.clone(), expected);
        }
    }
}
