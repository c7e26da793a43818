use serde_json::Value;

use crate::error::{DashScopeError, Result};

/// Parses the inbound prompt list: a JSON array of strings, or a single JSON
/// string which counts as a one-element list.
pub fn parse_prompts(prompts_json: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(prompts_json)
        .map_err(|e| DashScopeError::InputError(format!("prompts are not valid JSON: {}", e)))?;

    match value {
        Value::String(prompt) => Ok(vec![prompt]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(prompt) => Ok(prompt),
                _ => Err(not_a_string_array()),
            })
            .collect(),
        _ => Err(not_a_string_array()),
    }
}

fn not_a_string_array() -> DashScopeError {
    DashScopeError::InputError(
        r#"prompts must be a JSON array of strings, e.g. ["prompt 1","prompt 2"]"#.into(),
    )
}

/// Splits a JSON array into its raw items.
pub fn json_array_items(text: &str) -> Result<Vec<Value>> {
    match serde_json::from_str(text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(DashScopeError::InputError("Input is not a JSON array".into())),
        Err(e) => Err(DashScopeError::InputError(format!("invalid JSON: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array() {
        let prompts = parse_prompts(r#"["一只猫", "a dog"]"#).unwrap();
        assert_eq!(prompts, vec!["一只猫".to_string(), "a dog".to_string()]);
    }

    #[test]
    fn test_bare_string_is_one_prompt() {
        assert_eq!(
            parse_prompts(r#""a lighthouse""#).unwrap(),
            parse_prompts(r#"["a lighthouse"]"#).unwrap()
        );
    }

    #[test]
    fn test_empty_array_parses_to_empty_list() {
        assert!(parse_prompts("[]").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_string_items() {
        for bad in [r#"["ok", 3]"#, r#"{"prompt": "x"}"#, "42", "null", "not json"] {
            assert!(
                matches!(parse_prompts(bad), Err(DashScopeError::InputError(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_json_array_items() {
        assert_eq!(
            json_array_items(r#"["a", 1, {"b": 2}]"#).unwrap(),
            vec![json!("a"), json!(1), json!({"b": 2})]
        );
        let err = json_array_items(r#""a""#).unwrap_err();
        assert_eq!(err.to_string(), "Input error: Input is not a JSON array");
    }
}
