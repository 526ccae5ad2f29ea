//! Resolved configuration: a flat, read-only map of dotted key paths.
//!
//! Keys are case-insensitive. `ServiceDiscovery.AgentAddress`,
//! `servicediscovery.agentaddress` and the environment form
//! `SERVICEDISCOVERY__AGENTADDRESS` all address the same entry.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::loader::ConfigError;

/// Immutable key/value configuration produced once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    values: BTreeMap<String, String>,
}

impl ResolvedConfig {
    /// Build a configuration from explicit key/value pairs.
    ///
    /// Later pairs override earlier ones with the same (normalized) key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = ResolvedConfigBuilder::default();
        for (k, v) in pairs {
            builder.set(k.as_ref(), v);
        }
        builder.build()
    }

    /// Raw lookup. Returns the value even if it is blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Lookup that treats blank values as absent.
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse a value, falling back to `default` when the key is absent or blank.
    ///
    /// A present but unparseable value is a configuration error.
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get_non_blank(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    /// Boolean lookup accepting `true/false`, `1/0`, `yes/no` in any case.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get_non_blank(key) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Mutable accumulator used while layering sources. Only the loader sees it.
#[derive(Debug, Default)]
pub(crate) struct ResolvedConfigBuilder {
    values: BTreeMap<String, String>,
}

impl ResolvedConfigBuilder {
    pub(crate) fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = normalize_key(key);
        if key.is_empty() {
            return;
        }
        self.values.insert(key, value.into());
    }

    /// Merge a parsed TOML document, flattening tables into dotted paths.
    pub(crate) fn merge_toml(&mut self, table: &toml::Table) {
        for (key, value) in table {
            self.merge_toml_value(key, value);
        }
    }

    fn merge_toml_value(&mut self, path: &str, value: &toml::Value) {
        match value {
            toml::Value::Table(inner) => {
                for (key, value) in inner {
                    self.merge_toml_value(&format!("{}.{}", path, key), value);
                }
            }
            toml::Value::Array(items) => {
                for (i, value) in items.iter().enumerate() {
                    self.merge_toml_value(&format!("{}.{}", path, i), value);
                }
            }
            toml::Value::String(s) => self.set(path, s.clone()),
            other => self.set(path, other.to_string()),
        }
    }

    /// Merge environment variables. `__` separates path segments.
    pub(crate) fn merge_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            self.set(&key.replace("__", "."), value);
        }
    }

    pub(crate) fn build(self) -> ResolvedConfig {
        ResolvedConfig {
            values: self.values,
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}
