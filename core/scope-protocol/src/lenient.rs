//! Field deserializers implementing the default-substitution policy.
//!
//! Every helper here accepts any JSON value. Numbers and numeric strings are
//! read; anything else becomes the neutral value (0, `None`, empty string).
//! Collections drop the entries that do not decode and keep the rest.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn number_or_zero(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn optional_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => None,
        Value::Number(_) | Value::String(_) => Some(number_or_zero(value)),
        _ => None,
    }
}

fn count(value: &Value) -> u64 {
    if let Some(exact) = value.as_u64() {
        return exact;
    }
    let parsed = number_or_zero(value);
    if parsed <= 0.0 {
        0
    } else {
        parsed.floor() as u64
    }
}

pub(crate) fn f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_or_zero(&value))
}

pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(optional_number(&value))
}

pub(crate) fn u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(count(&value))
}

pub(crate) fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::Number(_) | Value::String(_) => Some(count(&value)),
        _ => None,
    })
}

pub(crate) fn opt_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<bool>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(flag) => Some(flag),
        Value::Number(number) => number.as_f64().map(|v| v != 0.0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

pub(crate) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Text as sent; numbers and booleans in their JSON spelling.
pub(crate) fn opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}

pub(crate) fn opt_map<'de, D, T>(deserializer: D) -> Result<Option<HashMap<String, T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(entries) = value else {
        return Ok(None);
    };
    Ok(Some(
        entries
            .into_iter()
            .filter_map(|(key, entry)| serde_json::from_value(entry).ok().map(|item| (key, item)))
            .collect(),
    ))
}

pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Flat list of numbers; one level of nesting (`[[v], [v]]`) is flattened.
pub(crate) fn samples<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    let mut flat = Vec::with_capacity(items.len());
    for item in &items {
        match item {
            Value::Array(inner) => flat.extend(inner.iter().map(number_or_zero)),
            other => flat.push(number_or_zero(other)),
        }
    }
    Ok(flat)
}

pub(crate) fn matrix<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let rows = match value {
        Value::Array(rows) => rows,
        _ => return Ok(Vec::new()),
    };
    Ok(rows
        .iter()
        .map(|row| match row {
            Value::Array(cells) => cells.iter().map(number_or_zero).collect(),
            _ => Vec::new(),
        })
        .collect())
}
