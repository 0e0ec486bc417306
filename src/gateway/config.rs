use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Registration options for a [`Gateway`](super::Gateway).
///
/// ```yaml
/// route: /api          # optional mount prefix, replaces basePath
/// url: doc/pets.yaml   # path, file:// or http(s):// URL
/// ```
///
/// Exactly one of `specification` (an inline document) and `url` must be set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub specification: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Where the specification document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecSource<'a> {
    Inline(&'a Value),
    Url(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither `specification` nor `url` was given
    NoSpecification,
    /// Both `specification` and `url` were given
    AmbiguousSpecification,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoSpecification => {
                write!(f, "one of 'specification' or 'url' is required")
            }
            ConfigError::AmbiguousSpecification => {
                write!(f, "'specification' and 'url' are mutually exclusive")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl GatewayConfig {
    pub fn from_url(url: impl Into<String>) -> Self {
        GatewayConfig {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn from_document(document: Value) -> Self {
        GatewayConfig {
            specification: Some(document),
            ..Self::default()
        }
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Read a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading gateway config {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing gateway config {}", path.display()))
    }

    pub fn source(&self) -> Result<SpecSource<'_>, ConfigError> {
        match (&self.specification, &self.url) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousSpecification),
            (Some(doc), None) => Ok(SpecSource::Inline(doc)),
            (None, Some(url)) => Ok(SpecSource::Url(url)),
            (None, None) => Err(ConfigError::NoSpecification),
        }
    }

    /// The configured mount prefix, normalised to `/segment...` without a trailing `/`.
    ///
    /// `None` when unset, so the document's `basePath` applies.
    pub fn mount(&self) -> Option<String> {
        let route = self.route.as_deref()?.trim().trim_end_matches('/');
        if route.is_empty() || route.starts_with('/') {
            Some(route.to_string())
        } else {
            Some(format!("/{route}"))
        }
    }
}
