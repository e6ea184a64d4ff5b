//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rule::RuleDeclaration;

    const SAMPLE: &str = r#"
[general]
cp_trigger = "cms"
page_trigger = "?page"

[[sites]]
id = 1
handle = "default"
base_url = "https://example.com/"
primary = true

[[sites]]
id = 2
handle = "blog"
base_url = "https://example.com/blog/"

[[rules]]
pattern = "GET,POST foo/<id:\\d+>"
target = "entries/edit"

[[rules]]
pattern = "about"
target = { template = "pages/about", variables = { section = "company" } }

[[rules]]
pattern = "news/<slug:{slug}>"
route = "news/view"
verbs = ["get"]
params = { layout = "wide" }
site = "blog"
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.general.cp_trigger, "cms");
        assert_eq!(config.general.page_trigger, "?page");
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.rules.len(), 3);
        assert!(matches!(config.rules[0], RuleDeclaration::Shorthand(_)));
        assert!(matches!(config.rules[1], RuleDeclaration::Shorthand(_)));
        assert!(matches!(config.rules[2], RuleDeclaration::Explicit(_)));
        // Defaults fill the rest
        assert_eq!(config.general.action_trigger, "actions");
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_config(
            r#"
[[sites]]
id = 1
handle = "a"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("primary"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[[sites]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
