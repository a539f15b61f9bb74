//! Command definitions
//!
//! Store operations as data, so operator tooling can drive a store from
//! the command line or from a batch of text lines.
//!
//! ## Text Form (one command per line, verb case-insensitive)
//! ```text
//! GET   <key> [default]      HAS  <key>        DEL  <key>
//! SET   <key> <value...>     PUSH <key> <item...>
//! INCR  <key> [delta]        DECR <key> [delta]
//! KEYS  [prefix]             ARRAY <key>
//! TOP   <prefix> [limit]     DUMP              SAVE
//! ```
//! Values are parsed with [`Value::parse_literal`].

use std::fmt;

use crate::error::{Result, StoreError};
use crate::ranking::Ranked;
use crate::value::{Number, Value};

/// Default row count for TOP
pub const DEFAULT_TOP_LIMIT: usize = 10;

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Get a value, falling back to `default`
    Get { key: String, default: Option<Value> },

    /// Check for presence
    Has { key: String },

    /// Replace a value
    Set { key: String, value: Value },

    /// Remove a key
    Delete { key: String },

    /// Add to a number
    Increment { key: String, delta: Number },

    /// Subtract from a number
    Decrement { key: String, delta: Number },

    /// Append to a list
    Push { key: String, item: String },

    /// Enumerate keys under a prefix
    Keys { prefix: String },

    /// Read a list
    GetArray { key: String },

    /// Rank identities under a prefix
    Top { prefix: String, limit: usize },

    /// Pretty-print the whole store
    Dump,

    /// Force a durable flush
    Save,
}

impl Command {
    /// Verb used in the text form
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "GET",
            Command::Has { .. } => "HAS",
            Command::Set { .. } => "SET",
            Command::Delete { .. } => "DEL",
            Command::Increment { .. } => "INCR",
            Command::Decrement { .. } => "DECR",
            Command::Push { .. } => "PUSH",
            Command::Keys { .. } => "KEYS",
            Command::GetArray { .. } => "ARRAY",
            Command::Top { .. } => "TOP",
            Command::Dump => "DUMP",
            Command::Save => "SAVE",
        }
    }

    /// True if executing the command can change the store
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Set { .. }
                | Command::Delete { .. }
                | Command::Increment { .. }
                | Command::Decrement { .. }
                | Command::Push { .. }
        )
    }

    /// Parse one line of the text form
    pub fn parse(line: &str) -> Result<Command> {
        let (verb, rest) = next_token(line);
        if verb.is_empty() {
            return Err(StoreError::Command("empty command".to_string()));
        }

        let command = match verb.to_ascii_uppercase().as_str() {
            "GET" => {
                let (key, rest) = required(rest, "GET <key> [default]")?;
                let default = (!rest.is_empty()).then(|| Value::parse_literal(rest));
                Command::Get { key, default }
            }
            "HAS" => Command::Has {
                key: only_key(rest, "HAS <key>")?,
            },
            "SET" => {
                let (key, value) = required(rest, "SET <key> <value>")?;
                if value.is_empty() {
                    return Err(usage("SET <key> <value>"));
                }
                Command::Set {
                    key,
                    value: Value::parse_literal(value),
                }
            }
            "DEL" | "DELETE" => Command::Delete {
                key: only_key(rest, "DEL <key>")?,
            },
            "INCR" => {
                let (key, delta) = required(rest, "INCR <key> [delta]")?;
                Command::Increment {
                    delta: parse_delta(delta)?,
                    key,
                }
            }
            "DECR" => {
                let (key, delta) = required(rest, "DECR <key> [delta]")?;
                Command::Decrement {
                    delta: parse_delta(delta)?,
                    key,
                }
            }
            "PUSH" => {
                let (key, item) = required(rest, "PUSH <key> <item>")?;
                if item.is_empty() {
                    return Err(usage("PUSH <key> <item>"));
                }
                Command::Push {
                    key,
                    item: item.to_string(),
                }
            }
            "KEYS" => Command::Keys {
                prefix: rest.to_string(),
            },
            "ARRAY" => Command::GetArray {
                key: only_key(rest, "ARRAY <key>")?,
            },
            "TOP" => {
                let (prefix, limit) = required(rest, "TOP <prefix> [limit]")?;
                let limit = if limit.is_empty() {
                    DEFAULT_TOP_LIMIT
                } else {
                    limit
                        .parse()
                        .map_err(|_| StoreError::Command(format!("invalid limit '{}'", limit)))?
                };
                Command::Top { prefix, limit }
            }
            "DUMP" => Command::Dump,
            "SAVE" => Command::Save,
            other => {
                return Err(StoreError::Command(format!("unknown command '{}'", other)));
            }
        };

        Ok(command)
    }
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Value(Option<Value>),
    Bool(bool),
    Number(Number),
    Count(usize),
    Keys(Vec<String>),
    Ranking(Vec<Ranked>),
    Text(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("OK"),
            Reply::Value(Some(value)) => write!(f, "{}", value),
            Reply::Value(None) => f.write_str("(nil)"),
            Reply::Bool(b) => write!(f, "{}", b),
            Reply::Number(n) => write!(f, "{}", n),
            Reply::Count(n) => write!(f, "{}", n),
            Reply::Keys(keys) if keys.is_empty() => f.write_str("(empty)"),
            Reply::Keys(keys) => f.write_str(&keys.join("\n")),
            Reply::Ranking(rows) if rows.is_empty() => f.write_str("(empty)"),
            Reply::Ranking(rows) => {
                let lines: Vec<String> = rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| format!("#{} {} {}", i + 1, row.identity, row.value))
                    .collect();
                f.write_str(&lines.join("\n"))
            }
            Reply::Text(text) => f.write_str(text),
        }
    }
}

// =============================================================================
// Parsing Helpers
// =============================================================================

/// Split off the first whitespace-delimited token
fn next_token(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.find(char::is_whitespace) {
        Some(idx) => (&input[..idx], input[idx..].trim_start()),
        None => (input, ""),
    }
}

fn required<'a>(rest: &'a str, form: &str) -> Result<(String, &'a str)> {
    let (key, rest) = next_token(rest);
    if key.is_empty() {
        return Err(usage(form));
    }
    Ok((key.to_string(), rest))
}

fn only_key(rest: &str, form: &str) -> Result<String> {
    let (key, rest) = required(rest, form)?;
    if !rest.is_empty() {
        return Err(usage(form));
    }
    Ok(key)
}

fn parse_delta(input: &str) -> Result<Number> {
    if input.is_empty() {
        return Ok(Number::Int(1));
    }
    Value::parse_literal(input)
        .as_number()
        .ok_or_else(|| StoreError::Command(format!("invalid number '{}'", input)))
}

fn usage(form: &str) -> StoreError {
    StoreError::Command(format!("usage: {}", form))
}
