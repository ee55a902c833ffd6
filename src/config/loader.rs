//! Loading of multi-document configuration files.
//!
//! The file is an ordered sequence of `---`-separated YAML mappings. At most
//! one document may carry the reserved base environment name; all others are
//! deployable entries and must name a region.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ConfigError, Result, StackpilotError};

use super::spec::RawDocument;

/// Parsed configuration source: the optional inheritance base plus the
/// deployable entries in file order.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// The reserved base document, if the file declares one.
    pub base: Option<RawDocument>,
    /// Deployable entries in document order.
    pub entries: Vec<RawDocument>,
}

/// Loads and validates a configuration source from a file.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if the file does not exist, or
/// [`ConfigError::Parse`] on malformed YAML or structural violations
/// (missing `Environment`, deployable entry without `Region`, more than one
/// base document).
pub fn load_source(path: impl AsRef<Path>) -> Result<ConfigSource> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    if !path.exists() {
        return Err(StackpilotError::Config(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        StackpilotError::Config(ConfigError::parse(
            format!("Failed to read file: {e}"),
            Some(path.display().to_string()),
        ))
    })?;

    parse_source(&content, Some(&path.display().to_string()))
}

/// Parses a configuration source from a YAML string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] on malformed YAML or structural violations.
pub fn parse_source(content: &str, location: Option<&str>) -> Result<ConfigSource> {
    debug!("Parsing multi-document YAML configuration");

    let mut source = ConfigSource::default();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document).map_err(|e| {
            StackpilotError::Config(ConfigError::parse(
                format!("YAML parse error: {e}"),
                location.map(ToString::to_string),
            ))
        })?;

        // A trailing document separator parses as null; skip it.
        if value.is_null() {
            continue;
        }

        let raw: RawDocument = serde_yaml::from_value(value).map_err(|e| {
            StackpilotError::Config(ConfigError::parse(
                format!("YAML parse error: {e}"),
                location.map(ToString::to_string),
            ))
        })?;

        validate_document(&raw, location)?;

        if raw.is_base() {
            if source.base.is_some() {
                return Err(StackpilotError::Config(ConfigError::parse(
                    "More than one base environment document",
                    location.map(ToString::to_string),
                )));
            }
            source.base = Some(raw);
        } else {
            source.entries.push(raw);
        }
    }

    debug!(
        "Parsed configuration: base={}, entries={}",
        source.base.is_some(),
        source.entries.len()
    );
    Ok(source)
}

/// Structural validation of a single document.
fn validate_document(raw: &RawDocument, location: Option<&str>) -> Result<()> {
    let environment = raw.environment.as_deref().unwrap_or_default();
    if environment.is_empty() {
        return Err(StackpilotError::Config(ConfigError::parse(
            "Environment is required",
            location.map(ToString::to_string),
        )));
    }

    if !raw.is_base() && raw.region.as_deref().unwrap_or_default().is_empty() {
        return Err(StackpilotError::Config(ConfigError::parse(
            format!("Region is required for environment {environment}"),
            location.map(ToString::to_string),
        )));
    }

    Ok(())
}
