//! Site model and base URL parsing.

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::error::{RoutingError, RoutingResult};

/// Numeric site identifier.
pub type SiteId = u32;

/// Why a site base URL could not be used.
#[derive(Debug, Error)]
pub enum SiteUrlError {
    #[error("unparseable base URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("base URL has no host")]
    MissingHost,
}

/// The parts of a site base URL that take part in site matching.
///
/// Any part may be absent: `/blog/` declares only a path, `//example.com/`
/// declares no scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteUrl {
    pub scheme: Option<String>,
    pub host: Option<String>,
    /// Explicit port, if the URL names a non-default one.
    pub port: Option<u16>,
    /// Base path without trailing slash; empty for the root.
    pub path: String,
}

impl SiteUrl {
    /// Parse a base URL. Returns `Ok(None)` for an empty value.
    pub fn parse(raw: &str) -> Result<Option<Self>, SiteUrlError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = raw.strip_prefix("//") {
            let url = Url::parse(&format!("http://{rest}"))?;
            let mut parsed = Self::from_url(&url)?;
            parsed.scheme = None;
            return Ok(Some(parsed));
        }

        if raw.starts_with('/') {
            let path = raw.split(['?', '#']).next().unwrap_or_default();
            return Ok(Some(Self {
                scheme: None,
                host: None,
                port: None,
                path: path.trim_end_matches('/').to_string(),
            }));
        }

        let url = Url::parse(raw)?;
        Self::from_url(&url).map(Some)
    }

    fn from_url(url: &Url) -> Result<Self, SiteUrlError> {
        let host = url.host_str().ok_or(SiteUrlError::MissingHost)?;
        Ok(Self {
            scheme: Some(url.scheme().to_ascii_lowercase()),
            host: Some(host.to_ascii_lowercase()),
            port: url.port(),
            path: url.path().trim_end_matches('/').to_string(),
        })
    }
}

/// One logical front end within the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub id: SiteId,
    pub handle: String,
    pub base_url: Option<String>,
    pub primary: bool,
    #[serde(skip)]
    url: Option<SiteUrl>,
}

impl Site {
    /// Create a site, parsing its base URL.
    ///
    /// A malformed base URL is logged and leaves the site without one; such a
    /// site can still be selected as the primary fallback.
    pub fn new(id: SiteId, handle: impl Into<String>, base_url: Option<String>, primary: bool) -> Self {
        let handle = handle.into();
        let url = match base_url.as_deref().map(SiteUrl::parse) {
            Some(Ok(url)) => url,
            Some(Err(e)) => {
                tracing::warn!(site = %handle, base_url = ?base_url, error = %e, "Skipping malformed site base URL");
                None
            }
            None => None,
        };

        Self {
            id,
            handle,
            base_url,
            primary,
            url,
        }
    }

    /// Parsed base URL, if the site has a usable one.
    pub fn url(&self) -> Option<&SiteUrl> {
        self.url.as_ref()
    }

    /// Join a site-relative path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.as_deref().unwrap_or_default().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// The full site list with its primary site.
///
/// Non-empty with exactly one primary site by construction.
#[derive(Debug, Clone)]
pub struct SiteSet {
    sites: Vec<Site>,
    primary: usize,
}

impl SiteSet {
    /// Build a site set. `primary_id` names the primary site.
    pub fn new(sites: Vec<Site>, primary_id: Option<SiteId>) -> RoutingResult<Self> {
        if sites.is_empty() {
            return Err(RoutingError::NoSites);
        }

        let flagged: Vec<String> = sites
            .iter()
            .filter(|s| s.primary)
            .map(|s| s.handle.clone())
            .collect();
        if flagged.len() > 1 {
            return Err(RoutingError::MultiplePrimarySites(flagged));
        }

        let primary_id = primary_id.ok_or(RoutingError::NoPrimarySite)?;
        let primary = sites
            .iter()
            .position(|s| s.id == primary_id)
            .ok_or(RoutingError::NoPrimarySite)?;

        Ok(Self { sites, primary })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn primary(&self) -> &Site {
        &self.sites[self.primary]
    }

    pub fn by_handle(&self, handle: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
