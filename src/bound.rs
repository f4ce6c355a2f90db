//! Response size bounding.
//!
//! Tool responses are serialized JSON handed to protocol clients with hard
//! message-size limits, so every payload passes through [`bound`] before it
//! leaves the process. Payloads under the byte budget are returned unchanged;
//! oversized payloads are rewritten by a deterministic first-fit pass that
//! truncates array tails and long strings and replaces excess object fields
//! with a single marker, preserving enough structure to stay a valid
//! structured response.

use serde_json::{json, Map, Value};

/// Bytes reserved for the `_metadata` object attached to truncated output,
/// so the final serialization still fits the caller's budget.
const METADATA_HEADROOM: usize = 256;

/// Suffix appended to strings cut at the character cap.
const STRING_SUFFIX: &str = "... [truncated]";

/// Tuning knobs for the truncation pass.
///
/// The defaults mirror the long-standing behavior (fill to 90% of budget,
/// quarter the budget for nested arrays longer than 10 elements, cap strings
/// at 1000 characters); they are fields rather than constants because none of
/// the fractions has a normative justification.
#[derive(Debug, Clone, PartialEq)]
pub struct TruncationPolicy {
    /// Fraction of the working budget a container may fill before cutting.
    pub fill_ratio: f64,
    /// Array-valued object fields longer than this are recursed instead of
    /// being costed whole.
    pub nested_array_threshold: usize,
    /// Divisor applied to the working budget when recursing into a nested
    /// array field.
    pub nested_budget_divisor: usize,
    /// Strings longer than this many characters are cut to the prefix.
    pub max_string_chars: usize,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            fill_ratio: 0.9,
            nested_array_threshold: 10,
            nested_budget_divisor: 4,
            max_string_chars: 1000,
        }
    }
}

/// Outcome of a bounding pass.
#[derive(Debug, Clone)]
pub struct BoundedResponse {
    pub data: Value,
    pub truncated: bool,
    /// Serialized size of the input value.
    pub original_size: usize,
    /// Serialized size of `data` as returned.
    pub size: usize,
}

/// Bound `value` to at most `max_bytes` of serialized JSON.
///
/// Values that already fit are returned unchanged with `truncated = false`.
/// Oversized values are truncated and gain a top-level `_metadata` object
/// recording the original and truncated sizes plus a hint for the caller;
/// a non-object top level is wrapped as `{data, _metadata}` so the metadata
/// has somewhere to live.
///
/// The pass is deterministic: identical input and budget produce identical
/// cut points, every time.
pub fn bound(value: Value, max_bytes: usize, policy: &TruncationPolicy) -> BoundedResponse {
    let original_size = serialized_len(&value);
    if original_size <= max_bytes {
        return BoundedResponse {
            data: value,
            truncated: false,
            original_size,
            size: original_size,
        };
    }

    let body_budget = max_bytes.saturating_sub(METADATA_HEADROOM).max(2);
    let truncated_body = truncate_value(&value, body_budget, policy);
    let truncated_size = serialized_len(&truncated_body);

    let mut fields = match truncated_body {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".into(), other);
            map
        }
    };
    fields.insert(
        "_metadata".into(),
        json!({
            "truncated": true,
            "originalSize": original_size,
            "truncatedSize": truncated_size,
            "message": format!(
                "Response truncated from {original_size} to {truncated_size} bytes to fit \
                 the {max_bytes}-byte limit. Narrow your query or lower maxDepth for more detail."
            ),
        }),
    );

    let data = Value::Object(fields);
    let size = serialized_len(&data);
    BoundedResponse {
        data,
        truncated: true,
        original_size,
        size,
    }
}

/// Serialized byte length of a JSON value.
pub fn serialized_len(value: &Value) -> usize {
    serde_json::to_string(value)
        .expect("JSON value must serialize to string")
        .len()
}

fn truncate_value(value: &Value, budget: usize, policy: &TruncationPolicy) -> Value {
    match value {
        Value::Array(items) => truncate_array(items, budget, policy),
        Value::Object(map) => truncate_object(map, budget, policy),
        Value::String(s) => Value::String(truncate_string(s, policy)),
        other => other.clone(),
    }
}

/// Keep a prefix of `items` that fits under `fill_ratio` of the budget, then
/// append exactly one marker element naming the dropped count. Elements past
/// the cut are discarded, not summarized.
fn truncate_array(items: &[Value], budget: usize, policy: &TruncationPolicy) -> Value {
    let cap = (budget as f64 * policy.fill_ratio) as usize;
    let mut used = 2; // brackets
    let mut out = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let cost = serialized_len(item) + 1;
        if used + cost > cap {
            out.push(Value::String(format!(
                "[{} of {} items truncated]",
                items.len() - index,
                items.len()
            )));
            return Value::Array(out);
        }
        used += cost;
        out.push(item.clone());
    }

    Value::Array(out)
}

/// Accumulate fields under the budget rule, rewriting oversized nested
/// arrays and long strings along the way. On the first field that would
/// exceed the cap, insert exactly one `_remaining` marker and stop.
fn truncate_object(map: &Map<String, Value>, budget: usize, policy: &TruncationPolicy) -> Value {
    let cap = (budget as f64 * policy.fill_ratio) as usize;
    let mut used = 2; // braces
    let mut out = Map::new();

    for (index, (key, value)) in map.iter().enumerate() {
        let rewritten = match value {
            Value::Array(items) if items.len() > policy.nested_array_threshold => {
                let nested_budget = (budget / policy.nested_budget_divisor).max(2);
                truncate_array(items, nested_budget, policy)
            }
            Value::String(s) => Value::String(truncate_string(s, policy)),
            other => other.clone(),
        };

        // key quotes + colon + trailing comma
        let cost = serialized_len(&rewritten) + key.len() + 4;
        if used + cost > cap {
            out.insert(
                "_remaining".into(),
                Value::String(format!("{} more fields truncated", map.len() - index)),
            );
            return Value::Object(out);
        }
        used += cost;
        out.insert(key.clone(), rewritten);
    }

    Value::Object(out)
}

fn truncate_string(s: &str, policy: &TruncationPolicy) -> String {
    if s.chars().count() <= policy.max_string_chars {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(policy.max_string_chars).collect();
    cut.push_str(STRING_SUFFIX);
    cut
}
