//! Model configuration options and the canonical run names derived from them.
use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Options which never contribute to a run name
const IGNORED_OPTIONS: [&str; 1] = ["resultsfile"];

/// The run name used when no option differs from its default
pub const DEFAULT_RUN_NAME: &str = "default";

/// The value of a single model option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    /// A boolean flag
    Bool(bool),
    /// An integer
    Int(i64),
    /// A floating-point number
    Float(f64),
    /// A piece of text
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl TryFrom<toml::Value> for OptionValue {
    type Error = anyhow::Error;

    fn try_from(value: toml::Value) -> Result<Self> {
        Ok(match value {
            toml::Value::Boolean(value) => Self::Bool(value),
            toml::Value::Integer(value) => Self::Int(value),
            toml::Value::Float(value) => Self::Float(value),
            toml::Value::String(value) => Self::Text(value),
            other => bail!("Unsupported option value: {other}"),
        })
    }
}

/// The configuration options a model was run with, keyed by option name
pub type ModelOptions = IndexMap<String, OptionValue>;

/// Convert a TOML table of options into [`ModelOptions`]
pub fn options_from_toml(table: toml::Table) -> Result<ModelOptions> {
    table
        .into_iter()
        .map(|(key, value)| {
            let value = OptionValue::try_from(value)
                .map_err(|err| err.context(format!("Invalid value for option {key}")))?;
            Ok((key, value))
        })
        .collect()
}

/// The options a model run uses unless told otherwise
pub fn default_options() -> ModelOptions {
    [
        ("regionset", OptionValue::from("Europe8")),
        ("carbontax", 0.0.into()),
        ("carboncap", 1.0.into()),
        ("maxbioenergy", 0.05.into()),
        ("nuclearallowed", true.into()),
        ("hydroinvestmentsallowed", false.into()),
        ("transmissionallowed", "all".into()),
        ("hours", 1.into()),
        ("resultsfile", "results.sgr".into()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

/// Overlay `options` on the defaults
pub fn merge_with_defaults(options: &ModelOptions) -> ModelOptions {
    let mut merged = default_options();
    for (key, value) in options {
        merged.insert(key.clone(), value.clone());
    }

    merged
}

/// Build the canonical run name for a set of options.
///
/// The name lists every option which differs from its default as `key=value`, separated by
/// commas, in the order of the default option table (options without a default come last). If
/// nothing differs, the name is [`DEFAULT_RUN_NAME`].
pub fn canonical_run_name(options: &ModelOptions) -> String {
    let defaults = default_options();
    let merged = merge_with_defaults(options);
    let parts: Vec<_> = merged
        .iter()
        .filter(|(key, _)| !IGNORED_OPTIONS.contains(&key.as_str()))
        .filter(|(key, value)| defaults.get(*key) != Some(*value))
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    if parts.is_empty() {
        DEFAULT_RUN_NAME.to_string()
    } else {
        parts.join(", ")
    }
}
