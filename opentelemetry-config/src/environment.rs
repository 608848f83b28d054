//! # Environment snapshot
//!
//! Configuration is resolved from an immutable copy of the process
//! environment rather than from ad hoc `std::env` lookups, so resolution is
//! deterministic and tests never have to mutate global state.

use opentelemetry::otel_warn;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The telemetry signal a setting applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Signal {
    /// Spans.
    Traces,
    /// Metric data points.
    Metrics,
    /// Log records.
    Logs,
}

impl Signal {
    /// All signals, in the order providers are configured.
    pub const ALL: [Signal; 3] = [Signal::Traces, Signal::Metrics, Signal::Logs];

    /// Upper-case name used in signal specific variables such as
    /// `OTEL_EXPORTER_OTLP_TRACES_ENDPOINT`.
    pub fn env_name(&self) -> &'static str {
        match self {
            Signal::Traces => "TRACES",
            Signal::Metrics => "METRICS",
            Signal::Logs => "LOGS",
        }
    }

    /// Path the OTLP/HTTP receiver serves this signal on.
    pub fn resource_path(&self) -> &'static str {
        match self {
            Signal::Traces => "v1/traces",
            Signal::Metrics => "v1/metrics",
            Signal::Logs => "v1/logs",
        }
    }

    /// Appends [`Signal::resource_path`] to `base`, inserting a `/` when
    /// `base` does not already end with one.
    pub fn append_resource_path(&self, base: &str) -> String {
        if base.ends_with('/') {
            format!("{base}{}", self.resource_path())
        } else {
            format!("{base}/{}", self.resource_path())
        }
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Traces => write!(f, "traces"),
            Signal::Metrics => write!(f, "metrics"),
            Signal::Logs => write!(f, "logs"),
        }
    }
}

/// Name of an OTLP exporter variable, signal specific when `signal` is set.
///
/// `otlp_var(Some(Signal::Logs), "HEADERS")` is `OTEL_EXPORTER_OTLP_LOGS_HEADERS`.
pub fn otlp_var(signal: Option<Signal>, name: &str) -> String {
    match signal {
        Some(signal) => format!("OTEL_EXPORTER_OTLP_{}_{name}", signal.env_name()),
        None => format!("OTEL_EXPORTER_OTLP_{name}"),
    }
}

/// Immutable key-value view of environment variables.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    working_dir: PathBuf,
}

impl Environment {
    /// Captures the current process environment and working directory.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn from_process() -> Self {
        Environment {
            vars: std::env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
                .collect(),
            working_dir: std::env::current_dir().unwrap_or_default(),
        }
    }

    /// An environment without any variable set.
    pub fn empty() -> Self {
        Environment::default()
    }

    /// Replaces the directory relative file paths are resolved against.
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    /// Directory relative file paths are resolved against.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Raw value of `name`, untouched.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Trimmed value of `name`. Empty or whitespace-only values are absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Value of the signal specific variable, falling back to the generic one.
    pub fn get_either(&self, specific: &str, generic: &str) -> Option<&str> {
        self.get(specific).or_else(|| self.get(generic))
    }

    /// Parses `name` as a boolean. Only `true` and `false` (any case) are
    /// accepted, everything else is absent.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        let raw = self.get(name)?;
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            otel_warn!(
                name: "Config.Env.InvalidBoolean",
                message = format!("{name} is set to '{raw}' which is not a boolean, expected 'true' or 'false'. The value is ignored")
            );
            None
        }
    }

    /// Parses `name` as a number. A value that does not parse is logged and
    /// treated as absent.
    pub fn get_number<T: FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.get(name)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                otel_warn!(
                    name: "Config.Env.InvalidNumber",
                    message = format!("{name} is set to '{raw}' which is not a valid number. The value is ignored")
                );
                None
            }
        }
    }

    /// Splits `name` on commas, trimming every entry and dropping empty ones.
    pub fn get_list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_owned)
                .collect()
        })
    }

    /// Resolves `path` against [`Environment::working_dir`].
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.working_dir.join(path)
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Environment {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            working_dir: std::env::current_dir().unwrap_or_default(),
        }
    }
}
