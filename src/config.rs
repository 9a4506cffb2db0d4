use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::error::{Error, Result};

/// Tape capacity used when none (or a non-positive one) is configured.
pub const DEFAULT_TAPE_SIZE: usize = 100;

/// Tokens configured for one command: a single scalar or a list.
///
/// Unquoted numbers and booleans (`inc: 1`, `dec: [0, true]`) are taken as
/// their YAML text, so `1` is the token `"1"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TokenSpec {
    #[serde(deserialize_with = "scalar_token")]
    One(String),
    #[serde(deserialize_with = "scalar_tokens")]
    Many(Vec<Option<String>>),
}

fn token_text<E: serde::de::Error>(value: Value) -> std::result::Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(E::custom(format!("token must be a scalar, got {other:?}"))),
    }
}

fn scalar_token<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    token_text::<D::Error>(Value::deserialize(deserializer)?)?
        .ok_or_else(|| serde::de::Error::custom("token must not be null"))
}

fn scalar_tokens<'de, D>(deserializer: D) -> std::result::Result<Vec<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(token_text)
        .collect()
}

impl TokenSpec {
    /// Flatten into the listed tokens, skipping null entries.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            TokenSpec::One(s) => vec![s.as_str()],
            TokenSpec::Many(list) => list.iter().flatten().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for TokenSpec {
    fn from(s: &str) -> Self {
        TokenSpec::One(s.to_string())
    }
}

impl From<Vec<&str>> for TokenSpec {
    fn from(list: Vec<&str>) -> Self {
        TokenSpec::Many(list.into_iter().map(|s| Some(s.to_string())).collect())
    }
}

/// Token configuration as written by the user: command name to tokens.
///
/// Keys are free-form; only names [`Command::from_name`] recognizes survive
/// table construction.
///
/// [`Command::from_name`]: crate::command::Command::from_name
pub type RawTable = BTreeMap<String, Option<TokenSpec>>;

/// Build a raw table from `(name, tokens)` pairs.
pub fn raw_table<I, K, V>(entries: I) -> RawTable
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<TokenSpec>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), Some(v.into())))
        .collect()
}

/// Parse a YAML token configuration.
///
/// An empty document is rejected here since it cannot name any command.
pub fn parse_table(yaml: &str) -> Result<RawTable> {
    if yaml.trim().is_empty() {
        return Err(Error::Configuration("definition blank".to_string()));
    }
    let parsed: Option<RawTable> = serde_yaml::from_str(yaml)?;
    parsed.ok_or_else(|| Error::Configuration("definition blank".to_string()))
}

/// Read and parse a YAML token configuration file.
pub fn load_table(path: &Path) -> Result<RawTable> {
    let content = read_source(path)?;
    parse_table(&content)
}

/// Read a whole file as text, reporting a missing path as a configuration error.
pub fn read_source(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::Configuration(format!(
            "file not found: {}",
            path.display()
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Options for a machine run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Nominal tape capacity. Non-positive or absent means the default.
    pub size: Option<i64>,
    /// Write a trace line after every step.
    pub debug: bool,
    /// Echo output bytes as they are produced.
    pub flash: bool,
    /// Disable bounds and sign enforcement.
    pub loose: bool,
}

impl MachineConfig {
    pub fn capacity(&self) -> usize {
        match self.size {
            Some(s) if s > 0 => s as usize,
            _ => DEFAULT_TAPE_SIZE,
        }
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub fn flash(mut self) -> Self {
        self.flash = true;
        self
    }

    pub fn loose(mut self) -> Self {
        self.loose = true;
        self
    }
}
