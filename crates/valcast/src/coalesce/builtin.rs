//! Built-in converters installed into the registry at first use.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Number, Value};

use super::{coalesce, delegate, CoalesceOpts, Converter, Tag};
use crate::error::{CoalesceError, Errors};
use crate::locals::Locals;
use crate::validate::ValidateOptions;

const TRUTHY: &[&str] = &["true", "t", "yes", "y", "on", "1"];
const FALSY: &[&str] = &["false", "f", "no", "n", "off", "0"];

pub(crate) fn defaults() -> HashMap<Tag, Converter> {
    let mut table: HashMap<Tag, Converter> = HashMap::new();
    table.insert(Tag::String, Arc::new(to_string));
    table.insert(Tag::Integer, Arc::new(to_integer));
    table.insert(Tag::Float, Arc::new(to_float));
    table.insert(Tag::Boolean, Arc::new(to_boolean));
    table.insert(Tag::Symbol, Arc::new(to_symbol));
    table.insert(Tag::DateTime, Arc::new(to_datetime));
    table.insert(Tag::Date, Arc::new(to_date));
    table.insert(Tag::Null, Arc::new(to_null));
    table.insert(Tag::Map, Arc::new(to_map));
    table.insert(Tag::Seq, Arc::new(to_seq));
    table.insert(Tag::Raw, Arc::new(passthrough));
    table
}

fn invalid(tag: Tag) -> CoalesceError {
    CoalesceError::InvalidType(tag.name().to_string())
}

fn to_string(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        _ => Err(invalid(Tag::String)),
    }
}

fn to_integer(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => {
            let f = n.as_f64().ok_or_else(|| invalid(Tag::Integer))?;
            // `i64::MAX as f64` rounds up to 2^63, which would saturate on
            // the cast, so the upper bound must be exclusive.
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(Value::Number(Number::from(f as i64)))
            } else {
                Err(invalid(Tag::Integer))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(Number::from(n)))
            .map_err(|_| invalid(Tag::Integer)),
        _ => Err(invalid(Tag::Integer)),
    }
}

fn to_float(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    let float = match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(Tag::Float))?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid(Tag::Float))?,
        _ => return Err(invalid(Tag::Float)),
    };
    Number::from_f64(float)
        .map(Value::Number)
        .ok_or_else(|| invalid(Tag::Float))
}

fn to_boolean(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(true))),
        Value::String(s) => {
            let token = s.trim().to_ascii_lowercase();
            if TRUTHY.contains(&token.as_str()) {
                Ok(Value::Bool(true))
            } else if FALSY.contains(&token.as_str()) {
                Ok(Value::Bool(false))
            } else {
                Err(invalid(Tag::Boolean))
            }
        }
        _ => Err(invalid(Tag::Boolean)),
    }
}

fn to_symbol(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(value.clone()),
        _ => Err(invalid(Tag::Symbol)),
    }
}

fn to_datetime(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Value::String(dt.to_rfc3339()))
            .map_err(|_| invalid(Tag::DateTime)),
        Value::Number(n) => {
            let secs = n.as_i64().ok_or_else(|| invalid(Tag::DateTime))?;
            Utc.timestamp_opt(secs, 0)
                .single()
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(|| invalid(Tag::DateTime))
        }
        _ => Err(invalid(Tag::DateTime)),
    }
}

fn to_date(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    let Value::String(s) = value else {
        return Err(invalid(Tag::Date));
    };
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Value::String(date.format("%Y-%m-%d").to_string()));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| Value::String(dt.date_naive().format("%Y-%m-%d").to_string()))
        .map_err(|_| invalid(Tag::Date))
}

fn to_null(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) if s.is_empty() => Ok(Value::Null),
        _ => Err(invalid(Tag::Null)),
    }
}

fn to_map(
    value: &Value,
    opts: &CoalesceOpts,
    locals: &Locals,
    options: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    let Value::Object(entries) = value else {
        return Err(invalid(Tag::Map));
    };
    if let Some(node) = &opts.with {
        return delegate(node, value, locals, options);
    }
    if let Some(of) = &opts.of {
        let mut out = serde_json::Map::new();
        let mut errors = Errors::new();
        for (key, val) in entries {
            match coalesce(val, of, locals, options) {
                Ok(v) => {
                    out.insert(key.clone(), v);
                }
                Err(CoalesceError::Nested(child)) => errors.combine(key, child),
                Err(e) => errors.add(key, e.to_string()),
            }
        }
        return if errors.is_empty() {
            Ok(Value::Object(out))
        } else {
            Err(CoalesceError::Nested(errors))
        };
    }
    Ok(value.clone())
}

fn to_seq(
    value: &Value,
    opts: &CoalesceOpts,
    locals: &Locals,
    options: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    let Value::Array(items) = value else {
        return Err(invalid(Tag::Seq));
    };
    if let Some(of) = &opts.of {
        let mut out = Vec::with_capacity(items.len());
        let mut errors = Errors::new();
        for (index, item) in items.iter().enumerate() {
            match coalesce(item, of, locals, options) {
                Ok(v) => out.push(v),
                Err(CoalesceError::Nested(child)) => errors.combine(&index.to_string(), child),
                Err(e) => errors.add(&index.to_string(), e.to_string()),
            }
        }
        return if errors.is_empty() {
            Ok(Value::Array(out))
        } else {
            Err(CoalesceError::Nested(errors))
        };
    }
    Ok(value.clone())
}

fn passthrough(
    value: &Value,
    _: &CoalesceOpts,
    _: &Locals,
    _: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    Ok(value.clone())
}
