use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use regex::Regex;

use crate::command::Command;
use crate::config::RawTable;
use crate::error::{Error, Result};

/// Command to token mapping after validation.
///
/// Every present command has at least one distinct, non-empty token, and at
/// least one command is present. Iteration follows catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTable {
    entries: BTreeMap<Command, Vec<String>>,
}

impl TokenTable {
    /// Validate a raw mapping.
    ///
    /// Keys naming no known command are ignored. Duplicate and empty tokens
    /// are dropped, keeping first-occurrence order.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::Configuration("definition blank".to_string()));
        }

        let mut entries: BTreeMap<Command, Vec<String>> = BTreeMap::new();
        for (name, spec) in raw {
            let Some(cmd) = Command::from_name(name) else {
                tracing::debug!("ignoring unknown command key {name:?}");
                continue;
            };
            let Some(spec) = spec else { continue };
            let list = entries.entry(cmd).or_default();
            for token in spec.tokens() {
                if !token.is_empty() && !list.iter().any(|t| t == token) {
                    list.push(token.to_string());
                }
            }
        }
        entries.retain(|_, tokens| !tokens.is_empty());

        if entries.is_empty() {
            return Err(Error::Configuration("definition not found".to_string()));
        }
        Ok(Self { entries })
    }

    /// Tokens configured for `cmd`, if any.
    pub fn tokens(&self, cmd: Command) -> Option<&[String]> {
        self.entries.get(&cmd).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Command, &[String])> {
        self.entries.iter().map(|(&c, t)| (c, t.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns source text into commands using a configured token table.
///
/// The inverse dictionary and the combined scan pattern are derived once
/// whenever the table is replaced.
#[derive(Debug, Default)]
pub struct Resolver {
    table: Option<TokenTable>,
    dictionary: HashMap<String, Command>,
    pattern: Option<Regex>,
}

impl Resolver {
    /// An unconfigured resolver. Every query fails until a table is set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(raw: &RawTable) -> Result<Self> {
        let mut resolver = Self::new();
        resolver.set_table(raw)?;
        Ok(resolver)
    }

    /// Replace the token table. On error the previous configuration is kept.
    pub fn set_table(&mut self, raw: &RawTable) -> Result<&TokenTable> {
        let table = TokenTable::from_raw(raw)?;

        let mut dictionary = HashMap::new();
        let mut alternatives = Vec::new();
        for (cmd, tokens) in table.iter() {
            for token in tokens {
                if let Some(prev) = dictionary.insert(token.clone(), cmd) {
                    tracing::warn!("token {token:?} maps to both {prev} and {cmd}; using {cmd}");
                } else {
                    alternatives.push(regex::escape(token));
                }
            }
        }
        let pattern = Regex::new(&alternatives.join("|"))
            .map_err(|e| Error::Configuration(format!("token pattern: {e}")))?;

        tracing::debug!(
            commands = table.len(),
            tokens = dictionary.len(),
            "token table loaded"
        );
        self.dictionary = dictionary;
        self.pattern = Some(pattern);
        Ok(&*self.table.insert(table))
    }

    pub fn table(&self) -> Result<&TokenTable> {
        self.table.as_ref().ok_or_else(not_configured)
    }

    /// Token to command lookup derived from the table.
    ///
    /// Asking before any table is set fails with [`Error::State`], not
    /// [`Error::Configuration`]: nothing was misconfigured, the resolver is
    /// simply being used out of order. Every other query behaves the same.
    pub fn dictionary(&self) -> Result<&HashMap<String, Command>> {
        self.table()?;
        Ok(&self.dictionary)
    }

    /// Extract every known token from `source`, in text order.
    ///
    /// Lines starting with `#` or `//` (after optional whitespace) are
    /// skipped. At each position the scan takes the first alternative that
    /// matches, in table order, not the longest.
    pub fn filter<'s>(&self, source: &'s str) -> Result<Vec<&'s str>> {
        let pattern = self.pattern.as_ref().ok_or_else(not_configured)?;
        let tokens = source
            .lines()
            .filter(|line| !is_comment(line))
            .flat_map(|line| pattern.find_iter(line).map(|m| m.as_str()))
            .collect();
        Ok(tokens)
    }

    /// Map tokens to commands, silently dropping unknown ones.
    pub fn convert<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<Command>> {
        let dictionary = self.dictionary()?;
        Ok(tokens
            .iter()
            .filter_map(|t| dictionary.get(t.as_ref()).copied())
            .collect())
    }

    /// `convert(filter(source))`.
    pub fn build(&self, source: &str) -> Result<Vec<Command>> {
        let tokens = self.filter(source)?;
        self.convert(&tokens)
    }

    /// Spell `commands` in this dialect, picking one of each command's tokens
    /// at random and separating them with spaces.
    pub fn render<R: Rng>(&self, commands: &[Command], rng: &mut R) -> Result<String> {
        let table = self.table()?;
        let mut words = Vec::with_capacity(commands.len());
        for &cmd in commands {
            let tokens = table
                .tokens(cmd)
                .ok_or_else(|| Error::Configuration(format!("no token for {cmd}")))?;
            words.push(tokens[rng.gen_range(0..tokens.len())].as_str());
        }
        Ok(words.join(" "))
    }
}

fn is_comment(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with('#') || line.starts_with("//")
}

fn not_configured() -> Error {
    Error::State("token table not configured".to_string())
}
