//! # File tier
//!
//! Loads the declarative YAML document named by `OTEL_EXPERIMENTAL_CONFIG_FILE`.
//!
//! String values may reference environment variables:
//!
//! - `${VAR}` is replaced by the value of `VAR`.
//! - `${VAR:-fallback}` uses `fallback` when `VAR` is unset or empty.
//! - `$$` is a literal `$`.
//!
//! A reference to an unset variable without fallback is left in place and
//! reported through internal logging. A value consisting of a single reference
//! is typed after substitution, so `timeout: ${TIMEOUT}` yields a number.

use crate::environment::Environment;
use crate::error::ConfigError;
use crate::fragment::ConfigurationFragment;
use opentelemetry::{otel_debug, otel_warn};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Path of the declarative configuration file.
pub const OTEL_EXPERIMENTAL_CONFIG_FILE: &str = "OTEL_EXPERIMENTAL_CONFIG_FILE";

const SUPPORTED_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Builds the file tier.
#[derive(Clone, Copy, Debug)]
pub struct FileConfigLoader<'a> {
    env: &'a Environment,
}

impl<'a> FileConfigLoader<'a> {
    /// Creates a loader substituting references from `env`.
    pub fn new(env: &'a Environment) -> Self {
        FileConfigLoader { env }
    }

    /// The configured file, resolved against the working directory. A blank
    /// `OTEL_EXPERIMENTAL_CONFIG_FILE` means no file.
    pub fn config_file(&self) -> Option<PathBuf> {
        self.env
            .get(OTEL_EXPERIMENTAL_CONFIG_FILE)
            .map(|path| self.env.resolve_path(path))
    }

    /// Loads the configured file, if any.
    pub fn load(&self) -> Result<Option<ConfigurationFragment>, ConfigError> {
        self.config_file()
            .map(|path| self.load_file(&path))
            .transpose()
    }

    /// Loads `path`, which must have a `.yaml` or `.yml` extension.
    pub fn load_file(&self, path: &Path) -> Result<ConfigurationFragment, ConfigError> {
        let supported = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|supported| extension.eq_ignore_ascii_case(supported))
            });
        if !supported {
            return Err(ConfigError::UnsupportedFileFormat(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        otel_debug!(
            name: "Config.File.Loaded",
            path = format!("{}", path.display())
        );
        self.parse(&content, path)
    }

    /// Parses a YAML document. `path` is only used in error messages.
    pub fn parse(&self, content: &str, path: &Path) -> Result<ConfigurationFragment, ConfigError> {
        let malformed = |reason: String| ConfigError::MalformedFile {
            path: path.to_path_buf(),
            reason,
        };
        if content.trim().is_empty() {
            return Ok(ConfigurationFragment::default());
        }
        let document: Value =
            serde_yaml::from_str(content).map_err(|err| malformed(err.to_string()))?;
        if document.is_null() {
            return Ok(ConfigurationFragment::default());
        }
        let document = self.substitute_value(document);
        serde_yaml::from_value(document).map_err(|err| malformed(err.to_string()))
    }

    fn substitute_value(&self, value: Value) -> Value {
        match value {
            Value::String(text) => self.substitute_scalar(text),
            Value::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(|item| self.substitute_value(item))
                    .collect(),
            ),
            Value::Mapping(mapping) => Value::Mapping(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key, self.substitute_value(value)))
                    .collect(),
            ),
            Value::Tagged(mut tagged) => {
                tagged.value = self.substitute_value(tagged.value);
                Value::Tagged(tagged)
            }
            other => other,
        }
    }

    fn substitute_scalar(&self, text: String) -> Value {
        if !text.contains('$') {
            return Value::String(text);
        }
        let whole_reference = is_single_reference(&text);
        let substituted = substitute(&text, self.env);
        if !whole_reference || substituted == text {
            return Value::String(substituted);
        }
        if substituted.trim().is_empty() {
            return Value::Null;
        }
        match serde_yaml::from_str::<Value>(&substituted) {
            Ok(typed @ (Value::Bool(_) | Value::Number(_))) => typed,
            _ => Value::String(substituted),
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_single_reference(text: &str) -> bool {
    text.starts_with("${") && text.ends_with('}') && text[2..].find('}') == Some(text.len() - 3)
}

/// Replaces `${VAR}`, `${VAR:-fallback}` and `$$` in `text`.
pub fn substitute(text: &str, env: &Environment) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest.find('$') {
        result.push_str(&rest[..index]);
        rest = &rest[index..];

        if let Some(after) = rest.strip_prefix("$$") {
            result.push('$');
            rest = after;
            continue;
        }

        let Some(end) = rest.strip_prefix("${").and_then(|inner| inner.find('}')) else {
            result.push('$');
            rest = &rest[1..];
            continue;
        };
        let reference = &rest[..end + 3];
        let inner = &rest[2..end + 2];
        rest = &rest[end + 3..];

        let (name, fallback) = match inner.split_once(":-") {
            Some((name, fallback)) => (name.trim(), Some(fallback)),
            None => (inner.trim(), None),
        };
        if !is_valid_name(name) {
            result.push_str(reference);
            continue;
        }

        match (env.raw(name).filter(|value| !value.is_empty()), fallback) {
            (Some(value), _) => result.push_str(value),
            (None, Some(fallback)) => result.push_str(fallback),
            (None, None) => {
                otel_warn!(
                    name: "Config.File.UnresolvedReference",
                    message = format!("Environment variable '{name}' referenced by the config file is not set. The reference is left as is")
                );
                result.push_str(reference);
            }
        }
    }
    result.push_str(rest);
    result
}
