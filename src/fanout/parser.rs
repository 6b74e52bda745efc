use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::error::ParseError;
use super::labels::{QueryType, RoutingFormat};
use super::types::{ExpandedQuery, FanOutResult, GenerationPlan};

const FENCE: &str = "```";
const KNOWN_ITEM_KEYS: [&str; 6] = [
    "query",
    "type",
    "user_intent",
    "reasoning",
    "routing_format",
    "format_reason",
];
/// Keys the batch row adds around an item; a model-sent key of the same name
/// is kept under a `model_` prefix so it cannot shadow the row's own field.
const ROW_KEYS: [&str; 1] = ["lookup_query"];

/// Removes a surrounding Markdown code fence, if the text opens with one.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed;
    }

    let body = match trimmed.find('\n') {
        Some(newline) => &trimmed[newline + 1..],
        // Single-line fence: drop the backticks and an optional language tag.
        None => {
            let rest = &trimmed[FENCE.len()..];
            rest.strip_prefix("json").unwrap_or(rest)
        }
    };

    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// Parses model output into a [`FanOutResult`].
///
/// Missing top-level fields and missing item fields degrade to empty
/// values; only unreadable JSON or a wrongly shaped container is an error.
pub fn parse(raw: &str) -> Result<FanOutResult, ParseError> {
    let text = strip_fences(raw);
    let value: Value = serde_json::from_str(text).map_err(|e| ParseError::new(e.to_string(), text))?;

    let Value::Object(root) = value else {
        return Err(ParseError::new("response is not a JSON object", text));
    };

    let plan = match root.get("generation_details") {
        None | Some(Value::Null) => GenerationPlan::default(),
        Some(Value::Object(details)) => parse_plan(details),
        Some(_) => return Err(ParseError::new("generation_details is not an object", text)),
    };

    let queries = match root.get("expanded_queries") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(obj) => Ok(parse_item(obj)),
                _ => Err(ParseError::new(
                    format!("expanded_queries[{i}] is not an object"),
                    text,
                )),
            })
            .collect::<Result<Vec<_>, ParseError>>()?,
        Some(_) => return Err(ParseError::new("expanded_queries is not an array", text)),
    };

    Ok(FanOutResult { plan, queries })
}

fn parse_plan(details: &Map<String, Value>) -> GenerationPlan {
    GenerationPlan {
        target_query_count: details
            .get("target_query_count")
            .filter(|v| !v.is_null())
            .cloned(),
        reasoning_for_count: string_field(details, "reasoning_for_count"),
    }
}

fn parse_item(obj: &Map<String, Value>) -> ExpandedQuery {
    let extra: BTreeMap<String, String> = obj
        .iter()
        .filter(|(k, _)| !KNOWN_ITEM_KEYS.contains(&k.as_str()))
        .map(|(k, v)| {
            let key = if ROW_KEYS.contains(&k.as_str()) {
                format!("model_{k}")
            } else {
                k.clone()
            };
            (key, value_to_text(v))
        })
        .collect();

    ExpandedQuery {
        query: string_field(obj, "query"),
        query_type: QueryType::from_label(&string_field(obj, "type")),
        user_intent: string_field(obj, "user_intent"),
        reasoning: string_field(obj, "reasoning"),
        routing_format: optional_field(obj, "routing_format").map(|f| RoutingFormat::from_label(&f)),
        format_reason: optional_field(obj, "format_reason"),
        extra,
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    optional_field(obj, key).unwrap_or_default()
}

fn optional_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).filter(|v| !v.is_null()).map(value_to_text)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
