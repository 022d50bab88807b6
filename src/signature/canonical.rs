//! Canonical string form of nested request parameters.

// self
use crate::_prelude::*;

/// Top-level fields that never take part in the canonical string.
pub const RESERVED_FIELDS: [&str; 6] =
	["app_key", "app_secret", "timestamp", "ts", "random_str", "sign"];

/// Flattens `params` into the canonical `&key=value` string.
///
/// Objects flatten to `parent:child` and arrays to `parent:index`, recursively. Every leaf
/// key is then sorted byte-wise across the whole document, so two semantically equal inputs
/// always produce the same string no matter how their maps were ordered. Empty objects and
/// arrays contribute nothing.
pub fn canonicalize(params: &JsonMap<String, JsonValue>) -> String {
	let mut leaves = Vec::new();

	for (key, value) in params {
		if RESERVED_FIELDS.contains(&key.as_str()) {
			continue;
		}

		flatten(key.clone(), value, &mut leaves);
	}

	leaves.sort_unstable();

	leaves.into_iter().fold(String::new(), |mut canonical, (key, value)| {
		canonical.push('&');
		canonical.push_str(&key);
		canonical.push('=');
		canonical.push_str(&value);

		canonical
	})
}

/// Renders a scalar the way it appears in the canonical string; containers render empty.
pub fn render_scalar(value: &JsonValue) -> String {
	match value {
		JsonValue::String(s) => s.clone(),
		JsonValue::Number(n) => n.to_string(),
		JsonValue::Bool(b) => b.to_string(),
		JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => String::new(),
	}
}

fn flatten(path: String, value: &JsonValue, leaves: &mut Vec<(String, String)>) {
	match value {
		JsonValue::Object(map) =>
			for (key, child) in map {
				flatten(format!("{path}:{key}"), child, leaves);
			},
		JsonValue::Array(items) =>
			for (index, child) in items.iter().enumerate() {
				flatten(format!("{path}:{index}"), child, leaves);
			},
		scalar => leaves.push((path, render_scalar(scalar))),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn object(value: JsonValue) -> JsonMap<String, JsonValue> {
		match value {
			JsonValue::Object(map) => map,
			other => panic!("Fixture must be a JSON object, got {other}."),
		}
	}

	#[test]
	fn arrays_flatten_by_index() {
		let params = object(json!({ "uid": 5, "tags": ["a", "b"] }));

		assert_eq!(canonicalize(&params), "&tags:0=a&tags:1=b&uid=5");
	}

	#[test]
	fn reserved_fields_are_dropped_at_the_top_level_only() {
		let params = object(json!({
			"app_key": "app1",
			"app_secret": "leak",
			"timestamp": 1_700_000_000,
			"ts": 1,
			"random_str": "abcdefghij",
			"sign": "x",
			"meta": { "sign": "kept" },
		}));

		assert_eq!(canonicalize(&params), "&meta:sign=kept");
	}

	#[test]
	fn nested_leaves_sort_globally() {
		let params = object(json!({
			"b": { "z": 1, "a": [true, null] },
			"a": "x",
			"ab": {},
			"c": [],
		}));

		assert_eq!(canonicalize(&params), "&a=x&b:a:0=true&b:a:1=&b:z=1");
	}

	#[test]
	fn scalars_render_in_json_form() {
		assert_eq!(render_scalar(&json!("text")), "text");
		assert_eq!(render_scalar(&json!(-3)), "-3");
		assert_eq!(render_scalar(&json!(1.5)), "1.5");
		assert_eq!(render_scalar(&json!(false)), "false");
		assert_eq!(render_scalar(&JsonValue::Null), "");
	}
}
