//! Built-in Modifiers
//!
//! String transforms leave `Absent` untouched so a later `default` in the
//! chain can still see that the variable was missing.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt::{Display, Write};

use crate::registry::{Modifier, ModifierError, ModifierRegistry};
use crate::template::Arg;
use crate::value::{Context, Value};

pub fn install(registry: &mut ModifierRegistry) {
    registry.register("upper", Upper);
    registry.register("lower", Lower);
    registry.register("capitalize", Capitalize);
    registry.register("trim", Trim);
    registry.register("default", DefaultValue);
    registry.register("truncate", Truncate);
    registry.register("escape", Escape);
    registry.register("replace", Replace);
    registry.register("length", Length);
    registry.register("date", Date);
}

fn map_str(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Absent | Value::Null => value,
        Value::String(s) => Value::String(f(&s)),
        other => Value::String(f(&other.to_string())),
    }
}

fn require(args: &[Arg], expected: usize) -> Result<(), ModifierError> {
    if args.len() < expected {
        return Err(ModifierError::MissingArgument { expected, got: args.len() });
    }
    Ok(())
}

pub struct Upper;

impl Modifier for Upper {
    fn apply(&self, value: Value, _args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        Ok(map_str(value, str::to_uppercase))
    }
}

pub struct Lower;

impl Modifier for Lower {
    fn apply(&self, value: Value, _args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        Ok(map_str(value, str::to_lowercase))
    }
}

pub struct Capitalize;

impl Modifier for Capitalize {
    fn apply(&self, value: Value, _args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        Ok(map_str(value, |s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }))
    }
}

pub struct Trim;

impl Modifier for Trim {
    fn apply(&self, value: Value, _args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        Ok(map_str(value, |s| s.trim().to_string()))
    }
}

/// `default:<literal>` - substitutes when the value is absent, null or empty.
pub struct DefaultValue;

impl Modifier for DefaultValue {
    fn apply(&self, value: Value, args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        require(args, 1)?;
        if value.is_empty() {
            Ok(args[0].to_value())
        } else {
            Ok(value)
        }
    }
}

/// `truncate:<n>[,<suffix>]` - clips to `n` characters, appending the
/// suffix only when something was cut.
pub struct Truncate;

impl Modifier for Truncate {
    fn apply(&self, value: Value, args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        require(args, 1)?;
        let limit = args[0]
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ModifierError::InvalidArgument {
                index: 0,
                reason: format!("expected a non-negative integer, got {:?}", args[0].as_str()),
            })?;
        let suffix = args.get(1).map(Arg::as_str).unwrap_or("");

        Ok(map_str(value, |s| match s.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}{}", &s[..cut], suffix),
            None => s.to_string(),
        }))
    }
}

/// HTML entity escaping.
pub struct Escape;

impl Modifier for Escape {
    fn apply(&self, value: Value, _args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        Ok(map_str(value, |s| html_escape::encode_quoted_attribute(s).into_owned()))
    }
}

/// `replace:<from>,<to>`
pub struct Replace;

impl Modifier for Replace {
    fn apply(&self, value: Value, args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        require(args, 2)?;
        if args[0].as_str().is_empty() {
            return Err(ModifierError::InvalidArgument {
                index: 0,
                reason: "pattern must not be empty".to_string(),
            });
        }
        Ok(map_str(value, |s| s.replace(args[0].as_str(), args[1].as_str())))
    }
}

/// Character count for strings, element count for lists and maps.
pub struct Length;

impl Modifier for Length {
    fn apply(&self, value: Value, _args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        let len = match &value {
            Value::Absent | Value::Null => 0,
            Value::String(s) => s.chars().count(),
            Value::List(items) => items.len(),
            Value::Map(map) => map.len(),
            other => other.to_string().chars().count(),
        };
        Ok(Value::Int(len as i64))
    }
}

/// `date:<strftime>` - formats a unix timestamp (UTC) or an RFC 3339 string.
pub struct Date;

impl Modifier for Date {
    fn apply(&self, value: Value, args: &[Arg], _context: &Context) -> Result<Value, ModifierError> {
        require(args, 1)?;
        let pattern = args[0].as_str();
        if matches!(value, Value::Absent | Value::Null) {
            return Ok(value);
        }

        let formatted = match &value {
            Value::Int(secs) => format_datetime(timestamp(*secs)?, pattern)?,
            Value::UInt(secs) => {
                return Err(ModifierError::Failed(format!("timestamp {} out of range", secs)));
            }
            Value::Float(secs) if !secs.is_finite() => {
                return Err(ModifierError::Failed(format!("timestamp {} is not a finite number", secs)));
            }
            Value::Float(secs) => format_datetime(timestamp(secs.trunc() as i64)?, pattern)?,
            Value::String(s) => {
                let parsed = DateTime::parse_from_rfc3339(s)
                    .map_err(|e| ModifierError::Failed(format!("not an RFC 3339 date: {}", e)))?;
                format_datetime(parsed, pattern)?
            }
            other => {
                return Err(ModifierError::Failed(format!("cannot format {} as a date", other)));
            }
        };
        Ok(Value::String(formatted))
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, ModifierError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ModifierError::Failed(format!("timestamp {} out of range", secs)))
}

fn format_datetime<Tz>(dt: DateTime<Tz>, pattern: &str) -> Result<String, ModifierError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    write!(out, "{}", dt.format(pattern)).map_err(|_| ModifierError::InvalidArgument {
        index: 0,
        reason: format!("invalid date format {:?}", pattern),
    })?;
    Ok(out)
}
