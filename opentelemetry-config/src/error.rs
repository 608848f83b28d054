use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving a configuration.
///
/// Only construction-time problems surface here. Malformed environment
/// variables are reported through internal logging and treated as absent.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("unable to read config file '{}': {source}", .path.display())]
    FileRead {
        /// Path of the file as resolved against the working directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file does not have a supported extension.
    #[error("unsupported config file format '{}', expected a .yaml or .yml file", .0.display())]
    UnsupportedFileFormat(PathBuf),

    /// The configuration file content could not be parsed.
    #[error("malformed config file '{}': {reason}", .path.display())]
    MalformedFile {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A value is syntactically valid but not usable.
    #[error("{name}: {reason}")]
    InvalidConfig {
        /// The configuration name.
        name: String,
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// The compiled defaults left a required field unset.
    #[error("compiled defaults do not provide a value for '{0}'")]
    IncompleteDefaults(&'static str),
}

impl ConfigError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidConfig {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
