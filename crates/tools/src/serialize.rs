//! Form body serializer
//!
//! Flattens one level of a JSON object into an
//! `application/x-www-form-urlencoded` string. Scalars become `key=value`,
//! arrays become one `key[]=element` pair per element. Anything nested deeper
//! is rendered the way string coercion would render it.

use serde_json::{Map, Value};
use url::form_urlencoded::byte_serialize;

use crate::error::{Result, ToolsError};
use crate::numeric::MAX_SAFE_INTEGER;
use crate::type_tag::TypeTag;

fn encode(s: &str) -> String {
    byte_serialize(s.as_bytes()).collect()
}

/// Number as its shortest decimal text, integral floats without a fraction
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER as f64 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// String coercion of a nested value
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn serialize_map(map: &Map<String, Value>) -> String {
    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        let key = encode(key);
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push(format!("{}[]={}", key, encode(&coerce_to_string(item))));
                }
            }
            scalar => pairs.push(format!("{}={}", key, encode(&coerce_to_string(scalar)))),
        }
    }
    pairs.join("&")
}

/// Serialize an object into a form body. Keys keep their insertion order.
pub fn serialize_object(value: &Value) -> Result<String> {
    match value {
        Value::Object(map) => Ok(serialize_map(map)),
        other => Err(ToolsError::ObjectRequired(TypeTag::of(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(serialize_object(&json!({"x": 1, "y": 2})).unwrap(), "x=1&y=2");
        assert_eq!(serialize_object(&json!({"x": 1})).unwrap(), "x=1");
        assert_eq!(serialize_object(&json!({})).unwrap(), "");
        assert_eq!(
            serialize_object(&json!({"b": true, "n": null, "f": 2.5, "g": 3.0})).unwrap(),
            "b=true&n=null&f=2.5&g=3"
        );
    }

    #[test]
    fn test_insertion_order_is_kept() {
        assert_eq!(serialize_object(&json!({"z": 1, "a": 2})).unwrap(), "z=1&a=2");
    }

    #[test]
    fn test_arrays_repeat_the_key() {
        assert_eq!(
            serialize_object(&json!({"ids": [1, 2], "q": "s"})).unwrap(),
            "ids[]=1&ids[]=2&q=s"
        );
        assert_eq!(serialize_object(&json!({"q": "s", "ids": [3]})).unwrap(), "q=s&ids[]=3");
        assert_eq!(serialize_object(&json!({"empty": [], "q": 1})).unwrap(), "q=1");
    }

    #[test]
    fn test_values_are_encoded() {
        assert_eq!(
            serialize_object(&json!({"url": "https://a.test/p?x=1&y=2", "message": "bad thing"}))
                .unwrap(),
            "url=https%3A%2F%2Fa.test%2Fp%3Fx%3D1%26y%3D2&message=bad+thing"
        );
        assert_eq!(serialize_object(&json!({"a b": "c"})).unwrap(), "a+b=c");
    }

    #[test]
    fn test_nested_values_are_coerced() {
        assert_eq!(
            serialize_object(&json!({"o": {"k": 1}, "a": [[1, null, 2], {"k": 1}]})).unwrap(),
            "o=%5Bobject+Object%5D&a[]=1%2C%2C2&a[]=%5Bobject+Object%5D"
        );
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert_eq!(
            serialize_object(&json!([1, 2])),
            Err(ToolsError::ObjectRequired(TypeTag::Array))
        );
        assert_eq!(
            serialize_object(&json!("x=1")),
            Err(ToolsError::ObjectRequired(TypeTag::String))
        );
    }
}
