//! The `{{ name }}` placeholder renderer.
//!
//! Rendering is a pure function over the input text and a variable mapping:
//! no I/O, no side effects, deterministic output. An undefined variable
//! reference fails the whole render; a partially substituted string is never
//! returned.

use std::collections::BTreeMap;

use crate::error::RenderError;

/// Variable mapping used as substitution input.
pub type Variables = BTreeMap<String, String>;

/// Opening placeholder marker.
const OPEN: &str = "{{";

/// Closing placeholder marker.
const CLOSE: &str = "}}";

/// Renders `text`, substituting `{{ name }}` and `{{ name | filter }}`
/// placeholders from `variables`.
///
/// Supported filters: `lower`, `upper`, `trim`. Filters may be chained with
/// additional `|` separators and apply left to right.
///
/// `field` names the configuration field being rendered and is only used in
/// error messages.
///
/// # Errors
///
/// Returns [`RenderError::UndefinedVariable`] if a placeholder references a
/// variable not present in the mapping, or [`RenderError::Syntax`] for an
/// unterminated placeholder, an empty variable name or an unknown filter.
pub fn render(field: &str, text: &str, variables: &Variables) -> Result<String, RenderError> {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let Some(end) = after_open.find(CLOSE) else {
            return Err(RenderError::Syntax {
                message: String::from("unterminated '{{' placeholder"),
                field: field.to_string(),
            });
        };

        let expression = &after_open[..end];
        output.push_str(&evaluate(field, expression, variables)?);
        rest = &after_open[end + CLOSE.len()..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Evaluates a single placeholder expression: a variable name followed by an
/// optional filter chain.
fn evaluate(field: &str, expression: &str, variables: &Variables) -> Result<String, RenderError> {
    let mut parts = expression.split('|').map(str::trim);

    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        return Err(RenderError::Syntax {
            message: String::from("empty variable reference"),
            field: field.to_string(),
        });
    }

    let mut value = variables
        .get(name)
        .cloned()
        .ok_or_else(|| RenderError::UndefinedVariable {
            name: name.to_string(),
            field: field.to_string(),
        })?;

    for filter in parts {
        value = apply_filter(field, filter, &value)?;
    }

    Ok(value)
}

/// Applies a single named filter to a value.
fn apply_filter(field: &str, filter: &str, value: &str) -> Result<String, RenderError> {
    match filter {
        "lower" => Ok(value.to_lowercase()),
        "upper" => Ok(value.to_uppercase()),
        "trim" => Ok(value.trim().to_string()),
        other => Err(RenderError::Syntax {
            message: format!("unknown filter '{other}'"),
            field: field.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_render_plain_text() {
        let result = render("StackName", "no placeholders here", &Variables::new());
        assert_eq!(result.unwrap(), "no placeholders here");
    }

    #[test]
    fn test_render_single_variable() {
        let variables = vars(&[("Environment", "dev")]);
        let result = render(
            "StackName",
            "{{ Environment }}-ExampleStack",
            &variables,
        );
        assert_eq!(result.unwrap(), "dev-ExampleStack");
    }

    #[test]
    fn test_render_multiple_variables() {
        let variables = vars(&[("Environment", "prod"), ("Region", "us-east-1")]);
        let result = render(
            "Parameters.Path",
            "/Company/{{ Environment }}/{{ Region }}/This",
            &variables,
        );
        assert_eq!(result.unwrap(), "/Company/prod/us-east-1/This");
    }

    #[test]
    fn test_render_without_spaces() {
        let variables = vars(&[("Region", "eu-west-1")]);
        let result = render("Tags.Region", "{{Region}}", &variables);
        assert_eq!(result.unwrap(), "eu-west-1");
    }

    #[test]
    fn test_lower_filter() {
        let variables = vars(&[("Environment", "Dev")]);
        let result = render("StackName", "{{ Environment | lower }}-app", &variables);
        assert_eq!(result.unwrap(), "dev-app");
    }

    #[test]
    fn test_chained_filters() {
        let variables = vars(&[("Name", "  Widget  ")]);
        let result = render("Tags.Name", "{{ Name | trim | upper }}", &variables);
        assert_eq!(result.unwrap(), "WIDGET");
    }

    #[test]
    fn test_undefined_variable_fails() {
        let variables = vars(&[("Environment", "dev")]);
        let result = render("StackName", "{{ Environment }}-{{ Missing }}", &variables);
        match result {
            Err(RenderError::UndefinedVariable { name, field }) => {
                assert_eq!(name, "Missing");
                assert_eq!(field, "StackName");
            }
            other => panic!("Expected UndefinedVariable, got {other:?}"),
        }
    }

    #[test]
    fn test_undefined_variable_never_partial() {
        // The error path must not leak a partially substituted string;
        // render returns Result, so any Err discards the accumulator.
        let variables = Variables::new();
        assert!(render("StackName", "prefix-{{ Missing }}-suffix", &variables).is_err());
    }

    #[test]
    fn test_unterminated_placeholder() {
        let variables = vars(&[("Environment", "dev")]);
        let result = render("StackName", "{{ Environment ", &variables);
        assert!(matches!(result, Err(RenderError::Syntax { .. })));
    }

    #[test]
    fn test_empty_reference() {
        let result = render("StackName", "{{ }}", &Variables::new());
        assert!(matches!(result, Err(RenderError::Syntax { .. })));
    }

    #[test]
    fn test_unknown_filter() {
        let variables = vars(&[("Environment", "dev")]);
        let result = render("StackName", "{{ Environment | reverse }}", &variables);
        match result {
            Err(RenderError::Syntax { message, .. }) => {
                assert!(message.contains("reverse"));
            }
            other => panic!("Expected Syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let variables = vars(&[("Environment", "qa"), ("Region", "us-west-2")]);
        let first = render("StackName", "{{ Environment }}-{{ Region }}", &variables).unwrap();
        let second = render("StackName", "{{ Environment }}-{{ Region }}", &variables).unwrap();
        assert_eq!(first, second);
    }
}
