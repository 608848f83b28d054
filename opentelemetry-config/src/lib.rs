//! # OpenTelemetry SDK configuration
//!
//! Resolves the configuration of an OpenTelemetry SDK from four tiers, highest
//! priority first:
//!
//! 1. options provided by user code,
//! 2. `OTEL_*` environment variables,
//! 3. the declarative YAML file named by `OTEL_EXPERIMENTAL_CONFIG_FILE`,
//! 4. compiled defaults.
//!
//! Each tier produces a [`ConfigurationFragment`] in which every field is
//! optional. [`ConfigMerger`] selects, for every field, the value of the highest
//! tier that sets it; headers and resource attributes are merged per key. The
//! result is a [`ConfigurationModel`] in which every required field holds a
//! value.
//!
//! ```no_run
//! use opentelemetry_config::create_config_provider;
//!
//! let provider = create_config_provider()?;
//! let config = provider.instrumentation_config();
//! println!("propagators: {:?}", config.propagator.composite);
//! # Ok::<(), opentelemetry_config::ConfigError>(())
//! ```
//!
//! ## Environment
//!
//! Variables are read from an [`Environment`] snapshot rather than from the
//! live process environment, which keeps resolution deterministic. Empty or
//! whitespace-only values count as unset. Values that do not parse are logged
//! and ignored.
//!
//! ## Internal logging
//!
//! Diagnostics are emitted through the `opentelemetry` internal logging macros
//! when the `internal-logs` feature is enabled (default).
#![warn(missing_debug_implementations, missing_docs)]

mod defaults;
mod env;
mod environment;
mod error;
mod file;
mod fragment;
mod kv_list;
mod merge;
mod model;
mod provider;
mod resolve;

pub use defaults::*;
pub use env::*;
pub use environment::{otlp_var, Environment, Signal};
pub use error::ConfigError;
pub use file::{substitute, FileConfigLoader, OTEL_EXPERIMENTAL_CONFIG_FILE};
pub use fragment::*;
pub use kv_list::{merge_key_value_lists, parse_key_value_list};
pub use merge::{
    fold_tiers, merge_by_name, merge_indexwise, merge_key_value_strings, merge_nested,
    ConfigMerger, Merge, Named,
};
pub use model::*;
pub use provider::{create_config_provider, ConfigProvider};
