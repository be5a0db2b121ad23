//! Catalog adaptation logic for turning MCP tool listings into a `ToolCatalog`.
//!
//! This module parses the descriptors returned by an MCP `tools/list` call
//! (or a static tools file), resolves every parameter schema to a
//! [`ParamType`], and renders the prompt fragment the selection model reads.

use crate::catalog::types::{ParamType, ParameterSpec, ToolCatalog, ToolDescriptor};
use crate::error::CatalogError;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// Result type for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Keys under which a descriptor may carry its argument schema.
const SCHEMA_KEYS: [&str; 3] = ["inputSchema", "input_schema", "parameters"];

/// Locate the descriptor array in a catalog document.
///
/// Accepts a bare array, `{"tools": [...]}`, or a full JSON-RPC
/// `tools/list` response `{"result": {"tools": [...]}}`.
pub fn tools_array(json: &Value) -> CatalogResult<&Vec<Value>> {
    if let Some(array) = json.as_array() {
        return Ok(array);
    }

    json.get("tools")
        .or_else(|| json.get("result").and_then(|r| r.get("tools")))
        .and_then(|t| t.as_array())
        .ok_or(CatalogError::MissingToolsArray)
}

/// Transform raw tool descriptors into a catalog snapshot.
///
/// Individual malformed descriptors are logged and skipped (partial success
/// model). If every descriptor is malformed the whole listing is rejected.
pub fn adapt_tools(raw: &[Value]) -> CatalogResult<ToolCatalog> {
    let mut tools = Vec::with_capacity(raw.len());

    for (idx, tool_value) in raw.iter().enumerate() {
        match normalize_tool(tool_value) {
            Ok(tool) => tools.push(tool),
            Err(e) => {
                tracing::warn!(
                    index = idx,
                    error = %e,
                    "Skipping malformed tool definition"
                );
            }
        }
    }

    if tools.is_empty() && !raw.is_empty() {
        return Err(CatalogError::AllMalformed(raw.len()));
    }

    let catalog = build_catalog(tools);

    tracing::debug!(
        total = raw.len(),
        parsed = catalog.len(),
        fingerprint = %catalog.fingerprint(),
        "Tool catalog adapted"
    );

    Ok(catalog)
}

/// Index already-normalized descriptors and render their prompt fragment.
///
/// Names must be unique: the first occurrence wins, later duplicates are dropped.
pub fn build_catalog(descriptors: Vec<ToolDescriptor>) -> ToolCatalog {
    let mut tools = Vec::with_capacity(descriptors.len());
    let mut index = HashMap::with_capacity(descriptors.len());

    for tool in descriptors {
        if index.contains_key(&tool.name) {
            tracing::warn!(tool = %tool.name, "Skipping duplicate tool name");
            continue;
        }
        index.insert(tool.name.clone(), tools.len());
        tools.push(tool);
    }

    let prompt_fragment = render_prompt_fragment(&tools);
    let fingerprint = compute_fingerprint(&tools);

    ToolCatalog::from_parts(tools, index, prompt_fragment, fingerprint)
}

/// Transform a single tool definition into a ToolDescriptor.
fn normalize_tool(tool_value: &Value) -> CatalogResult<ToolDescriptor> {
    let name = tool_value
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| {
            CatalogError::MalformedTool(format!(
                "missing required 'name' field: {:?}",
                tool_value.get("name")
            ))
        })?;

    // Description is optional; null and absent both become empty
    let description = tool_value
        .get("description")
        .and_then(|v| v.as_str())
        .map(clean_description)
        .unwrap_or_default();

    let schema = SCHEMA_KEYS.iter().find_map(|key| tool_value.get(*key));

    Ok(ToolDescriptor {
        name: name.to_string(),
        description,
        parameters: parse_parameters(schema),
    })
}

/// Collapse all internal whitespace (newlines included) to single spaces.
fn clean_description(desc: &str) -> String {
    desc.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build parameter specs from `properties` and `required`.
///
/// Names listed in `required` but absent from `properties` are appended as
/// required `any` parameters, so every required name has a spec.
fn parse_parameters(input_schema: Option<&Value>) -> Vec<ParameterSpec> {
    let Some(schema) = input_schema else {
        return Vec::new();
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();
    let required_set: HashSet<&str> = required.iter().copied().collect();

    let mut params: Vec<ParameterSpec> = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .map(|properties| {
            properties
                .iter()
                .map(|(name, prop)| {
                    let (param_type, nullable) = resolve_type(prop);
                    ParameterSpec {
                        name: name.clone(),
                        param_type,
                        required: required_set.contains(name.as_str()),
                        nullable,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    for name in required {
        if !params.iter().any(|p| p.name == name) {
            params.push(ParameterSpec {
                name: name.to_string(),
                param_type: ParamType::Any,
                required: true,
                nullable: false,
            });
        }
    }

    params
}

/// Resolve a property schema to its first non-null declared type.
///
/// Looks at `type` (string or array) and then the members of `anyOf` /
/// `oneOf`. Returns whether `null` appeared anywhere in the union.
fn resolve_type(prop: &Value) -> (ParamType, bool) {
    let mut declared: Vec<&str> = Vec::new();

    match prop.get("type") {
        Some(Value::String(t)) => declared.push(t),
        Some(Value::Array(ts)) => declared.extend(ts.iter().filter_map(Value::as_str)),
        _ => {}
    }

    for key in ["anyOf", "oneOf"] {
        if let Some(variants) = prop.get(key).and_then(Value::as_array) {
            declared.extend(
                variants
                    .iter()
                    .filter_map(|v| v.get("type"))
                    .filter_map(Value::as_str),
            );
        }
    }

    let nullable = declared.contains(&"null");
    let param_type = declared
        .into_iter()
        .find(|t| *t != "null")
        .map(|t| ParamType::from_schema_name(t).unwrap_or(ParamType::Any))
        .unwrap_or(ParamType::Any);

    (param_type, nullable)
}

/// Render the tool listing in catalog order.
///
/// Format per tool:
/// ```text
/// - Tool Name: `add_numbers`
///   Description: Add two numbers.
///   Arguments:
///     - `a` (type: number, status: required)
/// ```
fn render_prompt_fragment(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "(no tools available)".to_string();
    }

    let blocks: Vec<String> = tools.iter().map(render_tool).collect();
    blocks.join("\n\n")
}

fn render_tool(tool: &ToolDescriptor) -> String {
    let mut lines = vec![format!("- Tool Name: `{}`", tool.name)];

    if !tool.description.is_empty() {
        lines.push(format!("  Description: {}", tool.description));
    }

    if tool.parameters.is_empty() {
        lines.push("  Arguments: None".to_string());
        return lines.join("\n");
    }

    lines.push("  Arguments:".to_string());
    for param in &tool.parameters {
        let status = if param.required { "required" } else { "optional" };
        lines.push(format!(
            "    - `{}` (type: {}, status: {})",
            param.name, param.param_type, status
        ));
    }

    lines.join("\n")
}

/// Compute a SHA-256 over everything the prompt and validator depend on.
fn compute_fingerprint(tools: &[ToolDescriptor]) -> String {
    let mut hasher = Sha256::new();

    for tool in tools {
        hasher.update(tool.name.as_bytes());
        hasher.update(b"|");
        hasher.update(tool.description.as_bytes());
        for param in &tool.parameters {
            hasher.update(b"|");
            hasher.update(param.name.as_bytes());
            hasher.update(b":");
            hasher.update(param.param_type.as_str().as_bytes());
            hasher.update(if param.required { b":r" } else { b":o" });
            hasher.update(if param.nullable { b"?" } else { b"!" });
        }
        hasher.update(b"\n");
    }

    hasher.finalize().iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_numbers() -> Value {
        json!({
            "name": "add_numbers",
            "description": "Add two numbers.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "a": { "type": "number", "description": "First number" },
                    "b": { "type": "number" }
                },
                "required": ["a", "b"]
            }
        })
    }

    #[test]
    fn test_adapt_valid_descriptor() {
        let catalog = adapt_tools(&[add_numbers()]).unwrap();

        assert_eq!(catalog.len(), 1);
        let tool = catalog.get("add_numbers").unwrap();
        assert_eq!(tool.description, "Add two numbers.");
        assert_eq!(tool.parameters.len(), 2);
        assert!(tool.parameters.iter().all(|p| p.required));
        assert!(tool
            .parameters
            .iter()
            .all(|p| p.param_type == ParamType::Number));
    }

    #[test]
    fn test_tools_array_accepts_all_envelopes() {
        let bare = json!([add_numbers()]);
        let wrapped = json!({ "tools": [add_numbers()] });
        let rpc = json!({ "jsonrpc": "2.0", "id": 1, "result": { "tools": [add_numbers()] } });

        assert_eq!(tools_array(&bare).unwrap().len(), 1);
        assert_eq!(tools_array(&wrapped).unwrap().len(), 1);
        assert_eq!(tools_array(&rpc).unwrap().len(), 1);
    }

    #[test]
    fn test_tools_array_missing_returns_error() {
        let response = json!({ "jsonrpc": "2.0" });
        assert!(matches!(
            tools_array(&response),
            Err(CatalogError::MissingToolsArray)
        ));
    }

    #[test]
    fn test_null_description_uses_empty() {
        let catalog = adapt_tools(&[json!({
            "name": "no_desc_tool",
            "description": null,
            "inputSchema": {}
        })])
        .unwrap();

        assert_eq!(catalog.get("no_desc_tool").unwrap().description, "");
        assert!(!catalog.prompt_fragment().contains("Description:"));
    }

    #[test]
    fn test_missing_name_skips_tool() {
        let catalog = adapt_tools(&[
            json!({ "description": "No name here" }),
            json!({ "name": "valid_tool", "description": "Has name" }),
        ])
        .unwrap();

        assert_eq!(catalog.names(), vec!["valid_tool".to_string()]);
    }

    #[test]
    fn test_all_malformed_returns_error() {
        let result = adapt_tools(&[json!({ "description": "a" }), json!(42)]);
        assert!(matches!(result, Err(CatalogError::AllMalformed(2))));
    }

    #[test]
    fn test_empty_listing_gives_empty_catalog() {
        let catalog = adapt_tools(&[]).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.prompt_fragment(), "(no tools available)");
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let catalog = adapt_tools(&[
            json!({ "name": "dup", "description": "first" }),
            json!({ "name": "dup", "description": "second" }),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("dup").unwrap().description, "first");
    }

    #[test]
    fn test_description_whitespace_collapsed() {
        let catalog = adapt_tools(&[json!({
            "name": "get_blog_posts",
            "description": "Get blog posts with basic metadata.\n\n    Args:\n        limit: Optional max."
        })])
        .unwrap();

        assert_eq!(
            catalog.get("get_blog_posts").unwrap().description,
            "Get blog posts with basic metadata. Args: limit: Optional max."
        );
    }

    #[test]
    fn test_any_of_picks_first_non_null() {
        let (ty, nullable) = resolve_type(&json!({
            "anyOf": [{ "type": "null" }, { "type": "integer" }, { "type": "string" }]
        }));
        assert_eq!(ty, ParamType::Integer);
        assert!(nullable);
    }

    #[test]
    fn test_type_array_picks_first_non_null() {
        let (ty, nullable) = resolve_type(&json!({ "type": ["null", "string"] }));
        assert_eq!(ty, ParamType::String);
        assert!(nullable);
    }

    #[test]
    fn test_unresolvable_type_is_any() {
        assert_eq!(resolve_type(&json!({})), (ParamType::Any, false));
        assert_eq!(resolve_type(&json!({ "type": "null" })), (ParamType::Any, true));
        assert_eq!(
            resolve_type(&json!({ "type": "tuple" })),
            (ParamType::Any, false)
        );
    }

    #[test]
    fn test_required_without_property_is_added() {
        let params = parse_parameters(Some(&json!({
            "properties": { "title": { "type": "string" } },
            "required": ["title", "content"]
        })));

        assert_eq!(params.len(), 2);
        assert_eq!(params[1].name, "content");
        assert_eq!(params[1].param_type, ParamType::Any);
        assert!(params[1].required);
    }

    #[test]
    fn test_parameters_keep_declaration_order() {
        let params = parse_parameters(Some(&json!({
            "properties": {
                "zeta": { "type": "string" },
                "alpha": { "type": "string" },
                "mid": { "type": "string" }
            }
        })));

        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_prompt_fragment_format() {
        let catalog = adapt_tools(&[
            add_numbers(),
            json!({ "name": "ping", "description": "Health check" }),
        ])
        .unwrap();

        assert_eq!(
            catalog.prompt_fragment(),
            "- Tool Name: `add_numbers`\n  Description: Add two numbers.\n  Arguments:\n    - `a` (type: number, status: required)\n    - `b` (type: number, status: required)\n\n- Tool Name: `ping`\n  Description: Health check\n  Arguments: None"
        );
    }

    #[test]
    fn test_prompt_fragment_lists_every_tool_and_parameter_once() {
        let catalog = adapt_tools(&[
            json!({
                "name": "get_blog_posts",
                "inputSchema": {
                    "properties": { "limit": { "anyOf": [{ "type": "integer" }, { "type": "null" }] } }
                }
            }),
            json!({
                "name": "add_blog_post",
                "inputSchema": {
                    "properties": {
                        "title": { "type": "string" },
                        "content": { "type": "string" }
                    },
                    "required": ["title", "content"]
                }
            }),
        ])
        .unwrap();

        let fragment = catalog.prompt_fragment();
        assert_eq!(fragment.matches("Tool Name: `get_blog_posts`").count(), 1);
        assert_eq!(fragment.matches("Tool Name: `add_blog_post`").count(), 1);
        assert_eq!(
            fragment
                .matches("`limit` (type: integer, status: optional)")
                .count(),
            1
        );
        assert_eq!(
            fragment
                .matches("`title` (type: string, status: required)")
                .count(),
            1
        );
        assert_eq!(
            fragment
                .matches("`content` (type: string, status: required)")
                .count(),
            1
        );
    }

    #[test]
    fn test_fragment_and_fingerprint_are_deterministic() {
        let first = adapt_tools(&[add_numbers()]).unwrap();
        let second = adapt_tools(&[add_numbers()]).unwrap();

        assert_eq!(first.prompt_fragment(), second.prompt_fragment());
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_tools() {
        let first = adapt_tools(&[add_numbers()]).unwrap();
        let second = adapt_tools(&[json!({ "name": "other" })]).unwrap();

        assert_ne!(first.fingerprint(), second.fingerprint());
    }
}
