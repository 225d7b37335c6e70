//! `${NAME}` / `${NAME:-default}` substitution in configuration values.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// Only whole-string values are substituted; `"a-${B}"` stays literal.
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}$").expect("reference pattern is valid")
});

/// Where variable values come from.
#[derive(Clone, Debug, Default)]
pub enum Environment {
    /// The process environment.
    #[default]
    Process,
    /// A fixed set of variables; everything else is unset.
    Fixed(HashMap<String, String>),
}

impl Environment {
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Environment::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Value of `name`. An empty value is still a value.
    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Environment::Process => std::env::var_os(name).and_then(|v| v.into_string().ok()),
            Environment::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Substitute variable references throughout `value`.
///
/// Mappings and sequences are walked recursively; non-string scalars pass
/// through unchanged.
pub fn interpolate(value: Value, env: &Environment) -> ConfigResult<Value> {
    match value {
        Value::String(text) => interpolate_str(text, env).map(Value::String),
        Value::Array(items) => items
            .into_iter()
            .map(|item| interpolate(item, env))
            .collect::<ConfigResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| Ok((k, interpolate(v, env)?)))
            .collect::<ConfigResult<serde_json::Map<_, _>>>()
            .map(Value::Object),
        other => Ok(other),
    }
}

fn interpolate_str(text: String, env: &Environment) -> ConfigResult<String> {
    let reference = REFERENCE.captures(&text).map(|c| {
        let default = c.get(3).map(|m| m.as_str().to_string());
        (c[1].to_string(), default)
    });
    let Some((name, default)) = reference else {
        return Ok(text);
    };
    match (env.get(&name), default) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(ConfigError::MissingEnv(name)),
    }
}
