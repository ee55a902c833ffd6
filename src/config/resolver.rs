//! Resolution of a configuration source into a deployment descriptor.
//!
//! Resolution locates the document matching the requested environment and
//! region, merges the inheritance base into it, builds the substitution
//! mapping, renders the templated fields and applies command-line overrides.
//! Mappings merge per-key with the entry winning; scalars and lists are
//! taken wholesale from the entry when present, otherwise from the base.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::{ConfigError, Result, StackpilotError};
use crate::template::{render, Variables};

use super::loader::ConfigSource;
use super::spec::{RawDocument, BASE_ENVIRONMENT};

/// Substitution name reserved for the environment.
const ENVIRONMENT_VAR: &str = "Environment";

/// Substitution name reserved for the region.
const REGION_VAR: &str = "Region";

/// A parameter value in a resolved descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// An explicit value.
    Value(String),
    /// Keep whatever value the remote stack currently has.
    UsePrevious,
}

/// Command-line overrides applied after merging and rendering.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Replaces the configured template location.
    pub template: Option<String>,
    /// Replaces or adds parameter entries by exact key match.
    pub parameters: Vec<(String, String)>,
    /// Parameter names marked as "keep the remote value".
    pub use_previous_parameters: Vec<String>,
}

/// Fully resolved configuration for one environment/region pair.
///
/// Constructed once per invocation and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    /// Environment name.
    pub environment: String,
    /// Region identifier.
    pub region: String,
    /// Rendered stack name.
    pub stack_name: String,
    /// Template location: local path or `https://` URL.
    pub template: String,
    /// Rendered parameters, possibly with use-previous sentinels.
    pub parameters: BTreeMap<String, ParameterValue>,
    /// Rendered tags.
    pub tags: BTreeMap<String, String>,
    /// Capability strings, in configuration order.
    pub capabilities: Vec<String>,
    /// Termination protection flag, default true.
    pub termination_protection: bool,
    /// Merged substitution variables (raw, never rendered).
    pub variables: BTreeMap<String, String>,
}

impl DeploymentDescriptor {
    /// Returns true if the template is a remote-storage URL rather than a
    /// local path.
    #[must_use]
    pub fn template_is_url(&self) -> bool {
        self.template.starts_with("https://")
    }
}

/// Resolves `source` for the given environment and region.
///
/// `region` may be omitted only when exactly one document matches the
/// environment; with several regional entries it is required for
/// disambiguation.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when the reserved base environment is
/// requested or required fields are absent after merging,
/// [`ConfigError::NotFound`] when no document (or more than one candidate)
/// matches, and [`crate::error::RenderError`] when a templated field
/// references an undefined variable.
pub fn resolve(
    source: &ConfigSource,
    environment: &str,
    region: Option<&str>,
    overrides: &Overrides,
) -> Result<DeploymentDescriptor> {
    if environment == BASE_ENVIRONMENT {
        return Err(StackpilotError::Config(ConfigError::validation(
            format!("Environment '{BASE_ENVIRONMENT}' is reserved and not deployable"),
            "Environment",
        )));
    }

    let entry = find_entry(source, environment, region)?;
    let base = source.base.as_ref();
    let region = entry.region.clone().unwrap_or_default();

    let variables = merge_maps(base.map(|b| &b.variables), &entry.variables);
    let raw_parameters = merge_maps(base.map(|b| &b.parameters), &entry.parameters);
    let raw_tags = merge_maps(base.map(|b| &b.tags), &entry.tags);

    let substitutions = build_substitutions(environment, &region, &variables);

    let raw_stack_name = scalar(entry.stack_name.as_ref(), base.and_then(|b| b.stack_name.as_ref()))
        .ok_or_else(|| {
            StackpilotError::Config(ConfigError::validation("StackName not set", "StackName"))
        })?;
    let stack_name = render("StackName", raw_stack_name, &substitutions)?;
    if stack_name.is_empty() {
        return Err(StackpilotError::Config(ConfigError::validation(
            "StackName is empty after rendering",
            "StackName",
        )));
    }

    let mut parameters = BTreeMap::new();
    for (key, value) in &raw_parameters {
        let rendered = render(&format!("Parameters.{key}"), value, &substitutions)?;
        parameters.insert(key.clone(), ParameterValue::Value(rendered));
    }

    let mut tags = BTreeMap::new();
    for (key, value) in &raw_tags {
        let rendered = render(&format!("Tags.{key}"), value, &substitutions)?;
        tags.insert(key.clone(), rendered);
    }

    apply_parameter_overrides(&mut parameters, overrides);

    let template = overrides
        .template
        .clone()
        .or_else(|| scalar(entry.template.as_ref(), base.and_then(|b| b.template.as_ref())).cloned())
        .ok_or_else(|| {
            StackpilotError::Config(ConfigError::validation("Template not set", "Template"))
        })?;

    let capabilities = entry
        .capabilities
        .clone()
        .or_else(|| base.and_then(|b| b.capabilities.clone()))
        .unwrap_or_default();

    let termination_protection = entry
        .termination_protection
        .or_else(|| base.and_then(|b| b.termination_protection))
        .unwrap_or(true);

    Ok(DeploymentDescriptor {
        environment: environment.to_string(),
        region,
        stack_name,
        template,
        parameters,
        tags,
        capabilities,
        termination_protection,
        variables,
    })
}

/// Locates the single entry matching environment (and region when given).
fn find_entry<'a>(
    source: &'a ConfigSource,
    environment: &str,
    region: Option<&str>,
) -> Result<&'a RawDocument> {
    let matches: Vec<&RawDocument> = source
        .entries
        .iter()
        .filter(|e| {
            e.environment.as_deref() == Some(environment)
                && region.is_none_or(|r| e.region.as_deref() == Some(r))
        })
        .collect();

    match matches.as_slice() {
        [entry] => Ok(entry),
        _ => Err(StackpilotError::Config(ConfigError::NotFound {
            environment: environment.to_string(),
            region: region.unwrap_or("<any region>").to_string(),
        })),
    }
}

/// Overlays the entry mapping onto the base mapping; entry keys win.
fn merge_maps(
    base: Option<&BTreeMap<String, String>>,
    entry: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.cloned().unwrap_or_default();
    for (key, value) in entry {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Entry value wins outright when present, else the base's.
fn scalar<'a, T>(entry: Option<&'a T>, base: Option<&'a T>) -> Option<&'a T> {
    entry.or(base)
}

/// Builds the substitution mapping: `Environment`, `Region`, then the merged
/// variables. Variables must not shadow the reserved names; a shadowing
/// value is ignored with a warning.
fn build_substitutions(
    environment: &str,
    region: &str,
    variables: &BTreeMap<String, String>,
) -> Variables {
    let mut substitutions = Variables::new();

    for (key, value) in variables {
        if key == ENVIRONMENT_VAR || key == REGION_VAR {
            warn!("Variable '{key}' shadows a reserved substitution name and is ignored");
            continue;
        }
        substitutions.insert(key.clone(), value.clone());
    }

    substitutions.insert(ENVIRONMENT_VAR.to_string(), environment.to_string());
    substitutions.insert(REGION_VAR.to_string(), region.to_string());
    substitutions
}

/// Applies command-line parameter overrides. Explicit overrides replace or
/// add entries by exact key; use-previous markers take effect only for keys
/// not already supplied by an explicit override.
fn apply_parameter_overrides(
    parameters: &mut BTreeMap<String, ParameterValue>,
    overrides: &Overrides,
) {
    for (key, value) in &overrides.parameters {
        parameters.insert(key.clone(), ParameterValue::Value(value.clone()));
    }

    for key in &overrides.use_previous_parameters {
        if overrides.parameters.iter().any(|(k, _)| k == key) {
            continue;
        }
        parameters.insert(key.clone(), ParameterValue::UsePrevious);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_source;
    use crate::error::RenderError;

    const SOURCE: &str = r"
Environment: all
StackName: '{{ Environment }}-ExampleStack'
Template: template.yaml
Parameters:
  KeyName: '{{ Environment }}-key'
  Code: '{{ EnvironmentCode }}'
  Override: all-value
Tags:
  Team: Ops
Variables:
  EnvironmentCode: x
Capabilities:
  - CAPABILITY_IAM
---
Environment: dev
Region: us-east-1
Parameters:
  Extra: '/Company/{{ Region }}/{{ Environment }}/Extra'
  Override: dev-value
Variables:
  EnvironmentCode: d
Tags:
  CostCenter: 200
Capabilities:
  - CAPABILITY_NAMED_IAM
---
Environment: prod
Region: us-east-1
TerminationProtection: true
---
Environment: prod
Region: eu-west-1
TerminationProtection: false
";

    fn source() -> ConfigSource {
        parse_source(SOURCE, None).unwrap()
    }

    fn value(v: &str) -> ParameterValue {
        ParameterValue::Value(v.to_string())
    }

    #[test]
    fn test_resolve_merges_base_and_entry() {
        let descriptor =
            resolve(&source(), "dev", Some("us-east-1"), &Overrides::default()).unwrap();

        assert_eq!(descriptor.stack_name, "dev-ExampleStack");
        assert_eq!(descriptor.template, "template.yaml");
        assert_eq!(descriptor.parameters.get("KeyName"), Some(&value("dev-key")));
        assert_eq!(descriptor.parameters.get("Code"), Some(&value("d")));
        assert_eq!(
            descriptor.parameters.get("Extra"),
            Some(&value("/Company/us-east-1/dev/Extra"))
        );
        // Entry values strictly override base values on key collision.
        assert_eq!(descriptor.parameters.get("Override"), Some(&value("dev-value")));
        assert_eq!(descriptor.tags.get("Team").unwrap(), "Ops");
        assert_eq!(descriptor.tags.get("CostCenter").unwrap(), "200");
    }

    #[test]
    fn test_capabilities_replace_not_merge() {
        let dev = resolve(&source(), "dev", Some("us-east-1"), &Overrides::default()).unwrap();
        assert_eq!(dev.capabilities, vec!["CAPABILITY_NAMED_IAM"]);

        let prod = resolve(&source(), "prod", Some("us-east-1"), &Overrides::default()).unwrap();
        assert_eq!(prod.capabilities, vec!["CAPABILITY_IAM"]);
    }

    #[test]
    fn test_termination_protection_defaults_true() {
        let dev = resolve(&source(), "dev", Some("us-east-1"), &Overrides::default()).unwrap();
        assert!(dev.termination_protection);

        let eu = resolve(&source(), "prod", Some("eu-west-1"), &Overrides::default()).unwrap();
        assert!(!eu.termination_protection);
    }

    #[test]
    fn test_base_environment_not_deployable() {
        let result = resolve(&source(), "all", None, &Overrides::default());
        assert!(matches!(
            result,
            Err(StackpilotError::Config(ConfigError::Validation { .. }))
        ));
    }

    #[test]
    fn test_unknown_environment_not_found() {
        let result = resolve(&source(), "staging", Some("us-east-1"), &Overrides::default());
        assert!(matches!(
            result,
            Err(StackpilotError::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_region_omitted_with_single_match() {
        let descriptor = resolve(&source(), "dev", None, &Overrides::default()).unwrap();
        assert_eq!(descriptor.region, "us-east-1");
    }

    #[test]
    fn test_region_omitted_with_ambiguous_match() {
        let result = resolve(&source(), "prod", None, &Overrides::default());
        assert!(matches!(
            result,
            Err(StackpilotError::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_template_override() {
        let overrides = Overrides {
            template: Some(String::from("other.yaml")),
            ..Overrides::default()
        };
        let descriptor = resolve(&source(), "dev", Some("us-east-1"), &overrides).unwrap();
        assert_eq!(descriptor.template, "other.yaml");
    }

    #[test]
    fn test_parameter_overrides_and_use_previous() {
        let overrides = Overrides {
            template: None,
            parameters: vec![(String::from("Override"), String::from("cli-value"))],
            use_previous_parameters: vec![String::from("KeyName"), String::from("Override")],
        };
        let descriptor = resolve(&source(), "dev", Some("us-east-1"), &overrides).unwrap();

        // Explicit override wins; the use-previous marker for the same key
        // is ignored.
        assert_eq!(descriptor.parameters.get("Override"), Some(&value("cli-value")));
        assert_eq!(
            descriptor.parameters.get("KeyName"),
            Some(&ParameterValue::UsePrevious)
        );
    }

    #[test]
    fn test_undefined_variable_fails_resolution() {
        let yaml = r"
Environment: dev
Region: us-east-1
StackName: dev-Stack
Template: template.yaml
Parameters:
  Broken: '{{ NoSuchVariable }}'
";
        let src = parse_source(yaml, None).unwrap();
        let result = resolve(&src, "dev", Some("us-east-1"), &Overrides::default());
        match result {
            Err(StackpilotError::Render(RenderError::UndefinedVariable { name, field })) => {
                assert_eq!(name, "NoSuchVariable");
                assert_eq!(field, "Parameters.Broken");
            }
            other => panic!("Expected UndefinedVariable, got {other:?}"),
        }
    }

    #[test]
    fn test_variable_shadowing_reserved_name_ignored() {
        let yaml = r"
Environment: dev
Region: us-east-1
StackName: '{{ Environment }}-Stack'
Template: template.yaml
Variables:
  Environment: hijacked
";
        let src = parse_source(yaml, None).unwrap();
        let descriptor = resolve(&src, "dev", Some("us-east-1"), &Overrides::default()).unwrap();
        assert_eq!(descriptor.stack_name, "dev-Stack");
    }

    #[test]
    fn test_missing_stack_name_fails_validation() {
        let yaml = r"
Environment: dev
Region: us-east-1
Template: template.yaml
";
        let src = parse_source(yaml, None).unwrap();
        let result = resolve(&src, "dev", Some("us-east-1"), &Overrides::default());
        assert!(matches!(
            result,
            Err(StackpilotError::Config(ConfigError::Validation { .. }))
        ));
    }

    #[test]
    fn test_missing_template_fails_validation() {
        let yaml = r"
Environment: dev
Region: us-east-1
StackName: dev-Stack
";
        let src = parse_source(yaml, None).unwrap();
        let result = resolve(&src, "dev", Some("us-east-1"), &Overrides::default());
        assert!(matches!(
            result,
            Err(StackpilotError::Config(ConfigError::Validation { .. }))
        ));
    }

    #[test]
    fn test_resolution_is_order_independent() {
        let src = source();
        let dev_first = resolve(&src, "dev", Some("us-east-1"), &Overrides::default()).unwrap();
        let _prod = resolve(&src, "prod", Some("us-east-1"), &Overrides::default()).unwrap();
        let dev_second = resolve(&src, "dev", Some("us-east-1"), &Overrides::default()).unwrap();
        assert_eq!(dev_first, dev_second);
    }

    #[test]
    fn test_resolution_round_trip_identical() {
        let src = source();
        let first = resolve(&src, "dev", Some("us-east-1"), &Overrides::default()).unwrap();
        let second = resolve(&src, "dev", Some("us-east-1"), &Overrides::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_template_url_detection() {
        let descriptor = DeploymentDescriptor {
            environment: String::from("dev"),
            region: String::from("us-east-1"),
            stack_name: String::from("dev-Stack"),
            template: String::from("https://bucket.s3.amazonaws.com/template.yaml"),
            parameters: BTreeMap::new(),
            tags: BTreeMap::new(),
            capabilities: Vec::new(),
            termination_protection: true,
            variables: BTreeMap::new(),
        };
        assert!(descriptor.template_is_url());
    }
}
