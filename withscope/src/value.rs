//! Values of the reference host.
//!
//! The engine is generic over the value type. This is the one the CLI and
//! the tests use: small, cloneable, and with its own `None` so that tests
//! can tell "bound to none" apart from "unbound".

use anyhow::{Result, anyhow, bail};
use std::fmt;
use std::str::FromStr;

/// Runtime values of the reference host.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The host's null value. Still a binding: a slot holding `None` is bound.
    None,
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i128),
    /// Unsigned integer value, written with a `u` suffix
    Uint(u128),
    /// String value
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}u"),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl FromStr for Value {
    type Err = anyhow::Error;

    /// Parses `none`, `true`, `false`, integers (`-3`, `7u`) and strings.
    /// Strings may be double-quoted; anything else unquoted is taken as a
    /// bare string.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("Empty value");
        }
        if let Some(inner) = s.strip_prefix('"') {
            let Some(inner) = inner.strip_suffix('"') else {
                bail!("Unterminated string value: {}", s);
            };
            return Ok(Value::Str(unescape(inner)?));
        }
        match s {
            "none" => return Ok(Value::None),
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            _ => {}
        }
        if let Some(digits) = s.strip_suffix('u')
            && let Ok(u) = digits.parse::<u128>()
        {
            return Ok(Value::Uint(u));
        }
        if let Ok(i) = s.parse::<i128>() {
            return Ok(Value::Int(i));
        }
        Ok(Value::Str(s.to_string()))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

/// Undoes the escaping `Display` applies to strings.
fn unescape(quoted: &str) -> Result<String> {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '"' {
            bail!("Unescaped quote in string value: \"{}\"", quoted);
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let code: String = chars.by_ref().take_while(|&c| c != '}').collect();
                let Some(hex) = code.strip_prefix('{') else {
                    bail!("Malformed unicode escape in string value: \"{}\"", quoted);
                };
                let decoded = u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| anyhow!("Invalid unicode escape '\\u{{{}}}'", hex))?;
                out.push(decoded);
            }
            Some(other) => bail!("Unknown escape '\\{}' in string value", other),
            None => bail!("Trailing backslash in string value: \"{}\"", quoted),
        }
    }
    Ok(out)
}
