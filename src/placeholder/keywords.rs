//! Built-in value generators for `$(!Keyword)` tokens.

use chrono::{DateTime, Duration, Local, SecondsFormat, TimeZone, Utc};
use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Environment lookup used by the `ENV` keyword; injectable so tests do not
/// depend on the process environment.
type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Evaluates keyword tokens to JSON values.
///
/// Evaluation is stateless: every call generates a fresh value. Memoization
/// by token text is the resolver's job, not this one's.
pub struct KeywordEvaluator {
    env_lookup: EnvLookup,
}

impl KeywordEvaluator {
    pub fn new() -> Self {
        Self {
            env_lookup: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the environment lookup (used by tests)
    pub fn with_env_lookup(lookup: EnvLookup) -> Self {
        Self { env_lookup: lookup }
    }

    /// Evaluate a keyword by name with its raw argument text.
    ///
    /// `rest` carries everything after the keyword name: disambiguators
    /// (`.id`), argument brackets (`[0,10]`), or duration suffixes
    /// (`.plus[h1]`). Malformed arguments fail with a configuration error
    /// which aborts the whole resolution pass.
    pub fn evaluate(&self, name: &str, rest: &str) -> EngineResult<Value> {
        match name {
            "UUID" => Ok(Value::String(Uuid::new_v4().to_string())),
            "Random" => random_value(rest),
            "Instant" => {
                let at = now_with_offset("Instant", rest)?;
                Ok(Value::String(
                    at.to_rfc3339_opts(SecondsFormat::Millis, true),
                ))
            }
            "Timestamp" => {
                let at = now_with_offset("Timestamp", rest)?;
                Ok(Value::from(at.timestamp_millis()))
            }
            "OffsetDateTime" => {
                let at = now_with_offset("OffsetDateTime", rest)?;
                let local: DateTime<Local> = at.with_timezone(&Local);
                Ok(Value::String(
                    local.to_rfc3339_opts(SecondsFormat::Millis, false),
                ))
            }
            "ENV" => self.env_value(rest),
            other => Err(EngineError::Configuration(format!(
                "Unknown keyword `{other}`"
            ))),
        }
    }

    fn env_value(&self, rest: &str) -> EngineResult<Value> {
        let name = bracket_content(rest).ok_or_else(|| {
            EngineError::Configuration("ENV keyword requires a [NAME] argument".to_string())
        })?;
        if name.is_empty() {
            return Err(EngineError::Configuration(
                "ENV keyword requires a non-empty variable name".to_string(),
            ));
        }
        // Unset variable resolves to null, matching missing-path semantics
        Ok(match (self.env_lookup)(name) {
            Some(value) => Value::String(value),
            None => Value::Null,
        })
    }
}

impl Default for KeywordEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn random_value(rest: &str) -> EngineResult<Value> {
    if !rest.contains('[') {
        return Ok(Value::from(rand::rng().random::<i32>()));
    }

    let content = bracket_content(rest).ok_or_else(|| {
        EngineError::Configuration(format!("Malformed Random arguments `{rest}`"))
    })?;

    let (min, max) = match content.split_once(',') {
        Some((lo, hi)) => (parse_bound(lo)?, parse_bound(hi)?),
        None => (0, parse_bound(content)?),
    };

    if min > max {
        return Err(EngineError::Configuration(format!(
            "Random bounds out of order: [{min},{max}]"
        )));
    }

    Ok(Value::from(rand::rng().random_range(min..=max)))
}

fn parse_bound(text: &str) -> EngineResult<i64> {
    text.trim().parse::<i64>().map_err(|_| {
        EngineError::Configuration(format!("Invalid Random bound `{}`", text.trim()))
    })
}

/// Current time at millisecond precision, shifted by a `.plus[<unit><±n>]`
/// suffix when one is present in `rest`.
fn now_with_offset(keyword: &str, rest: &str) -> EngineResult<DateTime<Utc>> {
    let now = Utc
        .timestamp_millis_opt(Utc::now().timestamp_millis())
        .single()
        .expect("current epoch milliseconds are representable");

    let Some(plus_at) = rest.find(".plus[") else {
        return Ok(now);
    };

    let args = &rest[plus_at + ".plus[".len()..];
    let close = args.find(']').ok_or_else(|| {
        EngineError::Configuration(format!("{keyword}: unterminated .plus[ arguments"))
    })?;
    let content = &args[..close];

    let mut chars = content.chars();
    let unit = chars.next().ok_or_else(|| {
        EngineError::Configuration(format!("{keyword}: empty .plus[] arguments"))
    })?;
    let amount: i64 = chars.as_str().parse().map_err(|_| {
        EngineError::Configuration(format!(
            "{keyword}: invalid .plus duration amount `{}`",
            chars.as_str()
        ))
    })?;

    let shift = match unit.to_ascii_lowercase() {
        'h' => Duration::hours(amount),
        'm' => Duration::minutes(amount),
        's' => Duration::seconds(amount),
        other => {
            return Err(EngineError::Configuration(format!(
                "{keyword}: unsupported duration unit `{other}`"
            )))
        }
    };

    Ok(now + shift)
}

fn bracket_content(rest: &str) -> Option<&str> {
    let open = rest.find('[')?;
    let close = rest[open + 1..].find(']')?;
    Some(&rest[open + 1..open + 1 + close])
}
