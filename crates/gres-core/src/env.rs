//! Job and step environment state

use std::collections::BTreeMap;

/// Environment being built for a job or step
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvironmentState {
    vars: BTreeMap<String, String>,
}

impl EnvironmentState {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `NAME=value` strings; entries without `=` are skipped
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vars = pairs
            .into_iter()
            .filter_map(|pair| {
                pair.as_ref()
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect();
        Self { vars }
    }

    /// Current value of a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Set a variable, replacing any previous value
    pub fn overwrite(&mut self, name: &str, value: impl Into<String>) {
        self.vars.insert(name.to_string(), value.into());
    }

    /// Remove a variable, returning its old value
    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    /// Variables in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `NAME=value` strings in name order
    pub fn to_pairs(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no variables are set
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// State carried across the projection calls of one environment-build session.
///
/// Once a call has written the device variable, later calls in the same
/// session append to it instead of starting over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvSession {
    already_seen: bool,
}

impl EnvSession {
    /// Start a new session
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a session with a known flag
    pub fn with_seen(already_seen: bool) -> Self {
        Self { already_seen }
    }

    /// Whether the variable was already written in this session
    pub fn already_seen(&self) -> bool {
        self.already_seen
    }

    /// Record the outcome of a projection
    pub fn set_seen(&mut self, already_seen: bool) {
        self.already_seen = already_seen;
    }
}
