//! Shared fixtures for integration tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use site_router::config::parse_config;
use site_router::{Collaborators, RequestContext, Router, RouterConfig};

/// Two sites sharing a host, a separate German site, rules and seeded stores.
pub const CONFIG: &str = r#"
[general]
security_key = "test-secret"
set_password_request_path = "account/reset"

[[sites]]
id = 1
handle = "default"
base_url = "https://a.example.com/"
primary = true

[[sites]]
id = 2
handle = "blog"
base_url = "https://a.example.com/blog/"

[[sites]]
id = 3
handle = "de"
base_url = "https://a.example.de/"

[[rules]]
pattern = "GET,POST foo/<id:\\d+>"
target = "entries/edit"

[[rules]]
pattern = "about"
target = { template = "pages/about", variables = { section = "company" } }

[[rules]]
pattern = "<slug:{slug}>"
route = "blog/post"
site = "blog"

[[cp_rules]]
pattern = "entries/<section:{handle}>"
target = "entries/index"

[[tokens]]
token = "abc123"
action = "entries/view"
params = { id = 7 }

[[elements]]
id = 10
site = "default"
uri = "__home__"
action = "entries/home"

[[elements]]
id = 11
site = "default"
uri = "news/launch"
action = "entries/view"
params = { id = 11 }

[[elements]]
id = 12
site = "default"
uri = "drafts/hidden"
"#;

/// A template tree with public and private templates.
pub fn template_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("contact")).unwrap();
    fs::create_dir_all(dir.path().join("_partials")).unwrap();
    fs::write(dir.path().join("contact/index.twig"), "contact").unwrap();
    fs::write(dir.path().join("pricing.html"), "pricing").unwrap();
    fs::write(dir.path().join("_partials/header.html"), "header").unwrap();
    dir
}

pub fn config(templates: &Path) -> RouterConfig {
    let mut config = parse_config(CONFIG).unwrap();
    config.general.templates_path = templates.display().to_string();
    config
}

pub fn router(config: RouterConfig) -> Arc<Router> {
    let collaborators = Collaborators::from_config(&config);
    Arc::new(Router::new(config, collaborators))
}

#[allow(dead_code)]
pub fn ctx(method: &str, url: &str) -> RequestContext {
    RequestContext::from_url(method, url).unwrap()
}
