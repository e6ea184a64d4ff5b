//! Path classification.
//!
//! # Responsibilities
//! - Normalize the request path into segments
//! - Detect control panel requests and strip the trigger segment
//! - Extract the page number (query or path-suffix form)
//! - Detect action requests and their action segments
//!
//! # Design Decisions
//! - Segments are dropped only when they are the empty string; `0` survives
//! - Action checks run in a fixed order: trigger segment, `action` param,
//!   special paths. The first match wins.
//! - Requests carrying a route token are never action requests

use regex::Regex;
use serde::Serialize;

use crate::config::schema::GeneralConfig;
use crate::http::request::{ParamValue, RequestContext};
use crate::sites::site::Site;

/// Split a path on `/`, dropping empty segments.
pub fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where the page number of a paginated request comes from.
#[derive(Debug, Clone)]
pub enum PageTrigger {
    /// `?page=2` style; holds the parameter name.
    Query(String),
    /// `/blog/p2` style; matches `^(?:(.*)/)?<trigger>([0-9]+)$`.
    PathSuffix(Regex),
}

impl PageTrigger {
    /// Parse a configured trigger. A leading `?` selects the query form.
    pub fn new(raw: &str) -> Self {
        match raw.strip_prefix('?') {
            Some(name) => PageTrigger::Query(name.trim_end_matches('=').to_string()),
            None => {
                let pattern = format!(r"^(?:(.*)/)?{}([0-9]+)$", regex::escape(raw));
                PageTrigger::PathSuffix(
                    Regex::new(&pattern).expect("escaped page trigger is a valid pattern"),
                )
            }
        }
    }
}

/// Facts derived from the request path, fixed for the rest of resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathFacts {
    /// Path segments without the CP trigger and page suffix.
    pub segments: Vec<String>,
    /// `segments` joined with `/`.
    pub path: String,
    pub is_cp_request: bool,
    pub page_num: u32,
    pub is_action_request: bool,
    pub action_segments: Option<Vec<String>>,
    pub is_single_action_request: bool,
}

/// Paths that always act as action requests.
#[derive(Debug, Clone)]
struct SpecialPaths {
    login: String,
    logout: String,
    set_password: String,
    verify_email: String,
}

/// Derives [`PathFacts`] from a request.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    cp_trigger: String,
    base_cp_host: Option<String>,
    action_trigger: String,
    page_trigger: PageTrigger,
    max_page_num: u32,
    token_param: String,
    token_header: String,
    special_paths: SpecialPaths,
}

impl PathClassifier {
    pub fn from_config(general: &GeneralConfig) -> Self {
        Self {
            cp_trigger: general.cp_trigger.clone(),
            base_cp_host: general.base_cp_host.as_ref().map(|h| h.to_ascii_lowercase()),
            action_trigger: general.action_trigger.clone(),
            page_trigger: PageTrigger::new(&general.page_trigger),
            max_page_num: general.max_page_num.max(1),
            token_param: general.token_param.clone(),
            token_header: general.token_header.clone(),
            special_paths: SpecialPaths {
                login: general.login_path.trim_matches('/').to_string(),
                logout: general.logout_path.trim_matches('/').to_string(),
                set_password: general.set_password_path.trim_matches('/').to_string(),
                verify_email: general.verify_email_path.trim_matches('/').to_string(),
            },
        }
    }

    pub fn classify(&self, ctx: &RequestContext) -> PathFacts {
        self.classify_segments(ctx, split_segments(ctx.path()))
    }

    /// Classify relative to a site: a leading base path of `site` is
    /// removed before anything else.
    pub fn classify_for_site(&self, ctx: &RequestContext, site: &Site) -> PathFacts {
        let mut segments = split_segments(ctx.path());
        if let Some(url) = site.url() {
            let base = split_segments(&url.path);
            if !base.is_empty() && segments.starts_with(&base) {
                segments.drain(..base.len());
            }
        }
        self.classify_segments(ctx, segments)
    }

    fn classify_segments(&self, ctx: &RequestContext, mut segments: Vec<String>) -> PathFacts {
        let mut is_cp_request = self
            .base_cp_host
            .as_deref()
            .is_some_and(|host| host == ctx.host());
        if segments.first().is_some_and(|first| *first == self.cp_trigger) {
            is_cp_request = true;
            segments.remove(0);
        }

        let page_num = match &self.page_trigger {
            PageTrigger::Query(name) => ctx
                .query_param(name)
                .and_then(ParamValue::as_str)
                .map(leading_int)
                .unwrap_or(1),
            PageTrigger::PathSuffix(pattern) => {
                let mut page = 1;
                if !segments.is_empty() {
                    let path = segments.join("/");
                    if let Some(caps) = pattern.captures(&path) {
                        page = caps[2].parse::<u64>().unwrap_or(u64::MAX);
                        segments = split_segments(caps.get(1).map_or("", |m| m.as_str()));
                    }
                }
                page
            }
        };
        let page_num = page_num.clamp(1, u64::from(self.max_page_num)) as u32;

        let path = segments.join("/");

        let mut facts = PathFacts {
            segments,
            path,
            is_cp_request,
            page_num,
            is_action_request: false,
            action_segments: None,
            is_single_action_request: false,
        };

        if ctx.token(&self.token_param, &self.token_header).is_none() {
            self.classify_action(ctx, &mut facts);
        }

        facts
    }

    fn classify_action(&self, ctx: &RequestContext, facts: &mut PathFacts) {
        if facts.segments.len() > 1 && facts.segments[0] == self.action_trigger {
            facts.is_action_request = true;
            facts.action_segments = Some(facts.segments[1..].to_vec());
            facts.is_single_action_request = true;
        } else if let Some(action) = ctx.param("action").and_then(ParamValue::as_str) {
            facts.is_action_request = true;
            facts.action_segments = Some(split_segments(action));
            facts.is_single_action_request = facts.path.is_empty();
        } else if let Some(action) = self.special_action(&facts.path, facts.is_cp_request) {
            facts.is_action_request = true;
            facts.action_segments = Some(action.iter().map(|s| s.to_string()).collect());
            facts.is_single_action_request = true;
        }
    }

    fn special_action(&self, path: &str, is_cp_request: bool) -> Option<[&'static str; 2]> {
        if path.is_empty() {
            return None;
        }

        let paths = &self.special_paths;
        let (login, logout, set_password, verify_email) = if is_cp_request {
            ("login", "logout", "set-password", "verify-email")
        } else {
            (
                paths.login.as_str(),
                paths.logout.as_str(),
                paths.set_password.as_str(),
                paths.verify_email.as_str(),
            )
        };

        if path == login {
            Some(["users", "login"])
        } else if path == logout {
            Some(["users", "logout"])
        } else if path == set_password {
            Some(["users", "set-password"])
        } else if path == verify_email {
            Some(["users", "verify-email"])
        } else if is_cp_request && path == "update" {
            Some(["updater", "index"])
        } else {
            None
        }
    }
}

/// Leading integer of a parameter value; `0` when there is none.
fn leading_int(value: &str) -> u64 {
    let value = value.trim_start();
    if value.starts_with('-') {
        return 0;
    }
    let value = value.strip_prefix('+').unwrap_or(value);
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    if end == 0 {
        0
    } else {
        value[..end].parse().unwrap_or(u64::MAX)
    }
}
