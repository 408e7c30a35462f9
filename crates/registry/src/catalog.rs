//! Type catalog: maps schema type names to output value types and parameter kinds.
//!
//! Lookups never fail hard. A type name the client does not know yet falls
//! back to [`ValueType`]-less ("untyped") outputs and to the string parameter
//! kind, so a newer server schema still loads on an older client.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::ConversionError;

/// Runtime value type of a compiled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Dn,
    DnsName,
    NoneType,
    Sequence,
    Bool,
    Dict,
    Int,
    List,
    Tuple,
    Unicode,
}

/// Input parameter kind selected for a compiled parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Str,
    /// Secret string; never echoed, may ask for confirmation
    Password,
    /// Boolean set by presence, false when absent
    Flag,
    Bool,
    Int,
    Decimal,
    Bytes,
    DateTime,
    Dict,
    Dn,
    DnsName,
}

const VALUE_TYPES: &[(&str, ValueType)] = &[
    ("DN", ValueType::Dn),
    ("DNSName", ValueType::DnsName),
    ("NoneType", ValueType::NoneType),
    ("Sequence", ValueType::Sequence),
    ("bool", ValueType::Bool),
    ("dict", ValueType::Dict),
    ("int", ValueType::Int),
    ("list", ValueType::List),
    ("tuple", ValueType::Tuple),
    ("unicode", ValueType::Unicode),
];

const PARAM_KINDS: &[(&str, ParamKind)] = &[
    ("Decimal", ParamKind::Decimal),
    ("DN", ParamKind::Dn),
    ("DNSName", ParamKind::DnsName),
    ("bool", ParamKind::Bool),
    ("bytes", ParamKind::Bytes),
    ("datetime", ParamKind::DateTime),
    ("dict", ParamKind::Dict),
    ("int", ParamKind::Int),
    ("str", ParamKind::Str),
];

/// Schema type name of the generic string kind.
pub const STR_TYPE: &str = "str";
/// Schema type name of the boolean kind.
pub const BOOL_TYPE: &str = "bool";

/// Value type for an output declared as `type_name`, `None` meaning untyped.
pub fn value_type(type_name: &str) -> Option<ValueType> {
    VALUE_TYPES
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, value_type)| *value_type)
}

/// Parameter kind registered for `type_name`, if any.
pub fn param_kind(type_name: &str) -> Option<ParamKind> {
    PARAM_KINDS
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, kind)| *kind)
}

/// Parameter kind for `type_name`, falling back to [`ParamKind::Str`].
pub fn param_kind_or_str(type_name: &str) -> ParamKind {
    param_kind(type_name).unwrap_or(ParamKind::Str)
}

impl ValueType {
    /// Whether `value` has this runtime type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ValueType::Dn | ValueType::DnsName | ValueType::Unicode => value.is_string(),
            ValueType::NoneType => value.is_null(),
            ValueType::Sequence | ValueType::List | ValueType::Tuple => value.is_array(),
            ValueType::Bool => value.is_boolean(),
            ValueType::Dict => value.is_object(),
            ValueType::Int => value.is_i64() || value.is_u64(),
        }
    }
}

/// Layouts accepted for date-time defaults, tried in order.
const DATETIME_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%MZ", "%Y-%m-%d %H:%M:%SZ", "%Y-%m-%d %H:%MZ"];
/// Canonical rendering of converted date-times.
const DATETIME_CANONICAL: &str = "%Y-%m-%dT%H:%M:%SZ";

impl ParamKind {
    /// Converts one raw scalar to this kind's canonical JSON representation.
    pub fn convert_scalar(self, raw: &Value) -> Result<Value, ConversionError> {
        let fail = |reason: &str| ConversionError {
            kind: self,
            value: raw.clone(),
            reason: reason.to_string(),
        };
        match self {
            ParamKind::Str | ParamKind::Password => match raw {
                Value::String(_) => Ok(raw.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(fail("must be text")),
            },
            ParamKind::Flag | ParamKind::Bool => convert_bool(raw).ok_or_else(|| fail("must be True or False")),
            ParamKind::Int => convert_int(raw).ok_or_else(|| fail("must be an integer")),
            ParamKind::Decimal => match raw {
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::String(s) if s.trim().parse::<f64>().is_ok_and(f64::is_finite) => Ok(Value::String(s.trim().to_string())),
                _ => Err(fail("must be a decimal number")),
            },
            ParamKind::DateTime => convert_datetime(raw).ok_or_else(|| fail("must be a date-time such as 2024-01-31T12:00:00Z")),
            ParamKind::Dict => match raw {
                Value::Object(_) => Ok(raw.clone()),
                _ => Err(fail("must be a dictionary")),
            },
            ParamKind::Bytes | ParamKind::Dn | ParamKind::DnsName => match raw {
                Value::String(_) => Ok(raw.clone()),
                _ => Err(fail("must be text")),
            },
        }
    }
}

fn convert_bool(raw: &Value) -> Option<Value> {
    match raw {
        Value::Bool(_) => Some(raw.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn convert_int(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(raw.clone()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::Number(Number::from(f as i64))),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(Value::Number(Number::from(i)));
            }
            s.parse::<u64>().ok().map(|u| Value::Number(Number::from(u)))
        }
        _ => None,
    }
}

fn convert_datetime(raw: &Value) -> Option<Value> {
    let text = match raw {
        Value::String(s) => s.trim(),
        // JSON-RPC encodes date-times as {"__datetime__": "..."}
        Value::Object(map) => map.get("__datetime__")?.as_str()?.trim(),
        _ => return None,
    };
    parse_datetime(text).map(|parsed| Value::String(parsed.format(DATETIME_CANONICAL).to_string()))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    // LDAP generalized time, e.g. 20240131120000Z
    if text.len() == 15 && text.ends_with('Z') && text[..14].bytes().all(|b| b.is_ascii_digit()) {
        let dashed = format!(
            "{}-{}-{}T{}:{}:{}Z",
            &text[0..4],
            &text[4..6],
            &text[6..8],
            &text[8..10],
            &text[10..12],
            &text[12..14]
        );
        return NaiveDateTime::parse_from_str(&dashed, DATETIME_CANONICAL).ok();
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(parsed);
        }
    }
    if let Some(date) = text.strip_suffix('Z')
        && let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d")
    {
        return parsed.and_hms_opt(0, 0, 0);
    }
    DateTime::parse_from_rfc3339(text).ok().map(|parsed| parsed.naive_utc())
}
