//! Template source resolution.
//!
//! A template argument can be an `http(s)` URL, a path to a file on disk, or
//! the template body itself.

use std::path::Path;

use tracing::{debug, warn};
use url::Url;

use crate::cfn::TemplateSource;
use crate::error::{CloudformError, ConfigError, Result};

/// Resolves a template argument, relative paths being taken from `base`.
///
/// # Errors
///
/// Returns an error if the argument is empty or names a file that cannot
/// be read.
pub fn resolve_template(input: &str, base: Option<&Path>) -> Result<TemplateSource> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CloudformError::Config(ConfigError::MissingValue {
            name: String::from("template"),
        }));
    }

    if let Ok(url) = Url::parse(trimmed)
        && matches!(url.scheme(), "http" | "https")
    {
        debug!("Using template URL {url}");
        return Ok(TemplateSource::Url(url.into()));
    }

    let candidate = base.map_or_else(|| Path::new(trimmed).to_path_buf(), |b| b.join(trimmed));
    if looks_like_path(trimmed) && candidate.is_file() {
        debug!("Reading template body from {}", candidate.display());
        let body = std::fs::read_to_string(&candidate).map_err(|e| {
            CloudformError::Config(ConfigError::ParseError {
                message: format!("Failed to read template: {e}"),
                location: Some(candidate.display().to_string()),
            })
        })?;
        return Ok(TemplateSource::Body(body));
    }

    if looks_like_path(trimmed) && has_template_extension(trimmed) {
        warn!(
            "Template file {} not found, sending '{trimmed}' as an inline template body",
            candidate.display()
        );
    } else {
        debug!("Using inline template body");
    }
    Ok(TemplateSource::Body(input.to_string()))
}

/// Multi-line input is always a body, never a path.
fn looks_like_path(input: &str) -> bool {
    !input.contains('\n')
}

fn has_template_extension(input: &str) -> bool {
    Path::new(input)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "yaml" | "yml" | "json" | "template"
            )
        })
}
