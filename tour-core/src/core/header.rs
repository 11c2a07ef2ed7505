//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Lenient readers for page header fields.
//!
//! Page headers are edited by hand and by form submissions, so numbers arrive as strings and
//! cleared fields arrive as empty strings. Empty values are read as absent, everything else keeps
//! its value (including `0` and `false`).

use crate::core::feature::{PropertyValue, Properties};
use serde::de::{Deserialize, Deserializer};
use serde_json::Value;

fn read_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
    Value::deserialize(deserializer)
}

pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn value_to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "on" | "1" => Some(true),
            "false" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    read_value(d).map(|v| value_to_string(&v))
}

pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    read_value(d).map(|v| value_to_int(&v))
}

pub fn opt_float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    read_value(d).map(|v| value_to_float(&v))
}

pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    read_value(d).map(|v| value_to_bool(&v))
}

/// `true` only for an explicit true value
pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    read_value(d).map(|v| value_to_bool(&v).unwrap_or(false))
}

/// Property maps with null entries dropped
pub fn properties<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Properties>, D::Error> {
    let value = read_value(d)?;
    Ok(match value {
        Value::Object(map) => Some(
            map.iter()
                .filter_map(|(k, v)| PropertyValue::from_json(v).map(|pv| (k.clone(), pv)))
                .collect(),
        ),
        _ => None,
    })
}

/// String lists, skipping empty entries
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let value = read_value(d)?;
    Ok(match value {
        Value::Array(items) => Some(items.iter().filter_map(value_to_string).collect()),
        _ => None,
    })
}
