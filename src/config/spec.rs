//! Raw configuration document types.
//!
//! These mirror one YAML document of the configuration file before any
//! inheritance merging or rendering has happened.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Reserved environment name for the inheritance base document.
///
/// The base document provides defaults to every deployable entry and is
/// never directly deployable itself.
pub const BASE_ENVIRONMENT: &str = "all";

/// One raw document from the multi-document configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    /// Environment name (`all` marks the inheritance base).
    #[serde(rename = "Environment")]
    pub environment: Option<String>,

    /// Region identifier; required for every deployable entry.
    #[serde(rename = "Region")]
    pub region: Option<String>,

    /// Stack name, may contain `{{ name }}` placeholders.
    #[serde(rename = "StackName")]
    pub stack_name: Option<String>,

    /// Template location: local path or `https://` URL. Not templated.
    #[serde(rename = "Template")]
    pub template: Option<String>,

    /// Parameter mapping; values may contain placeholders.
    #[serde(rename = "Parameters", default, deserialize_with = "scalar_map")]
    pub parameters: BTreeMap<String, String>,

    /// Tag mapping; values may contain placeholders.
    #[serde(rename = "Tags", default, deserialize_with = "scalar_map")]
    pub tags: BTreeMap<String, String>,

    /// Substitution variables. Raw input to rendering, never rendered.
    #[serde(rename = "Variables", default, deserialize_with = "scalar_map")]
    pub variables: BTreeMap<String, String>,

    /// Capability list; the entry's list replaces the base's wholesale.
    #[serde(rename = "Capabilities")]
    pub capabilities: Option<Vec<String>>,

    /// Termination protection flag. Not templated.
    #[serde(rename = "TerminationProtection")]
    pub termination_protection: Option<bool>,
}

impl RawDocument {
    /// Returns true if this document is the reserved inheritance base.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.environment.as_deref() == Some(BASE_ENVIRONMENT)
    }
}

/// Deserializes a mapping whose values are YAML scalars, coercing numbers
/// and booleans to strings (`CostCenter: 200` becomes `"200"`).
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: BTreeMap<String, serde_yaml::Value> = BTreeMap::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let coerced = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Null => String::new(),
                serde_yaml::Value::Sequence(_)
                | serde_yaml::Value::Mapping(_)
                | serde_yaml::Value::Tagged(_) => {
                    return Err(D::Error::custom(format!(
                        "value for '{key}' must be a scalar"
                    )));
                }
            };
            Ok((key, coerced))
        })
        .collect()
}
