//! Controller configuration
//!
//! Options have sensible defaults and can be overridden from the environment:
//!
//! | variable | default |
//! |---|---|
//! | `CRUDMVC_CONTENT_HEADER` | `accept-content` |
//! | `CRUDMVC_PAGE_SIZE` | `20` |
//! | `CRUDMVC_MAX_PAGE_SIZE` | `100` |
//! | `CRUDMVC_TEMPLATES_DIR` | unset (built-in templates only) |

use std::env;
use std::path::PathBuf;

/// Options shared by every action of an entity controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Request header whose value selects JSON (`application/json`) over HTML
    pub content_header: String,
    pub default_page_size: u64,
    /// Page sizes offered by list views
    pub page_size_options: Vec<u64>,
    pub max_page_size: u64,
    /// Directory of `*.hbs` templates overriding the built-in views
    pub templates_dir: Option<PathBuf>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            content_header: "accept-content".to_string(),
            default_page_size: 20,
            page_size_options: vec![10, 20, 30, 50],
            max_page_size: 100,
            templates_dir: None,
        }
    }
}

impl ControllerOptions {
    /// Defaults overridden by `CRUDMVC_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let content_header = lookup("CRUDMVC_CONTENT_HEADER")
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.content_header);
        let max_page_size = parse_or(&lookup, "CRUDMVC_MAX_PAGE_SIZE", defaults.max_page_size);
        let default_page_size =
            parse_or(&lookup, "CRUDMVC_PAGE_SIZE", defaults.default_page_size).min(max_page_size);

        Self {
            content_header,
            default_page_size,
            page_size_options: defaults.page_size_options,
            max_page_size,
            templates_dir: lookup("CRUDMVC_TEMPLATES_DIR").map(PathBuf::from),
        }
    }

    /// Clamp a requested page size into `1..=max_page_size`
    #[must_use]
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

fn parse_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!(key, value = %raw, "Ignoring invalid configuration value");
                default
            }
        },
    }
}
