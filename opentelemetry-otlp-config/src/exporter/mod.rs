//! OTLP exporter settings shared by every transport.
//!
//! User code sets values through [`WithExportConfig`]; values left unset fall
//! back to `OTEL_EXPORTER_OTLP_*` variables and then to defaults.

use ::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::otel_warn;
use opentelemetry_config::{
    merge_key_value_lists, otlp_var, parse_key_value_list, Compression, Environment, OtlpExporter,
    Signal, DEFAULT_OTLP_TIMEOUT_MILLIS,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub mod grpc;
pub mod http;

/// Target to which the exporter is going to send signals.
pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
/// Key-value pairs to be used as headers associated with gRPC or HTTP requests.
/// Example: `k1=v1,k2=v2`
pub const OTEL_EXPORTER_OTLP_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
/// Compression algorithm to use, defaults to none.
pub const OTEL_EXPORTER_OTLP_COMPRESSION: &str = "OTEL_EXPORTER_OTLP_COMPRESSION";
/// Max waiting time for the backend to process each signal batch, defaults to 10 seconds.
pub const OTEL_EXPORTER_OTLP_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TIMEOUT";
/// Default max waiting time for the backend to process each signal batch.
pub const OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT: Duration =
    Duration::from_millis(DEFAULT_OTLP_TIMEOUT_MILLIS);
/// Default number of exports allowed in flight at the same time.
pub const OTEL_EXPORTER_OTLP_CONCURRENCY_LIMIT_DEFAULT: usize = 30;

#[derive(Error, Debug)]
/// Errors that can occur while resolving exporter settings.
#[non_exhaustive]
pub enum ExporterBuildError {
    /// Invalid URI.
    #[error("invalid URI {0}. Reason {1}")]
    InvalidUri(String, String),

    /// Invalid configuration.
    #[error("{name}: {reason}")]
    InvalidConfig {
        /// The configuration name.
        name: String,
        /// The reason the configuration is invalid.
        reason: String,
    },
}

/// Settings provided by user code.
///
/// Every field is optional; an unset field is resolved from the environment
/// and then from defaults.
#[derive(Clone, Debug, Default)]
pub struct ExportConfig {
    /// The address of the OTLP collector.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    pub endpoint: Option<String>,

    /// The timeout to the collector. Must not be zero.
    pub timeout: Option<Duration>,

    /// Compression applied to export requests.
    pub compression: Option<Compression>,

    /// Maximum number of exports in flight.
    pub concurrency_limit: Option<usize>,

    /// Headers sent with every request, replacing environment and default
    /// headers of the same name.
    pub headers: Vec<(String, String)>,
}

impl From<&OtlpExporter> for ExportConfig {
    fn from(exporter: &OtlpExporter) -> Self {
        ExportConfig {
            endpoint: Some(exporter.endpoint.clone()),
            timeout: Some(Duration::from_millis(exporter.timeout)),
            compression: Some(exporter.compression),
            concurrency_limit: None,
            headers: exporter.headers.clone(),
        }
    }
}

/// Settings resolved for one exporter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtlpSharedConfiguration {
    /// Export timeout.
    pub timeout: Duration,
    /// Compression applied to export requests.
    pub compression: Compression,
    /// Maximum number of exports in flight.
    pub concurrency_limit: usize,
    /// Request headers.
    pub headers: HeaderMap,
}

/// Resolves [`OtlpSharedConfiguration`] from user settings, the environment
/// and defaults, in that order.
#[derive(Clone, Copy, Debug)]
pub struct SharedConfigResolver<'a> {
    env: &'a Environment,
    signal: Signal,
}

impl<'a> SharedConfigResolver<'a> {
    /// Creates a resolver reading `signal` specific and generic variables from `env`.
    pub fn new(env: &'a Environment, signal: Signal) -> Self {
        SharedConfigResolver { env, signal }
    }

    /// Resolves every shared setting.
    pub fn resolve(
        &self,
        user: &ExportConfig,
    ) -> Result<OtlpSharedConfiguration, ExporterBuildError> {
        let timeout = match user.timeout {
            Some(timeout) if timeout.is_zero() => {
                return Err(ExporterBuildError::InvalidConfig {
                    name: "timeout".to_string(),
                    reason: "timeout must be greater than zero".to_string(),
                })
            }
            Some(timeout) => timeout,
            None => self
                .env_timeout()
                .unwrap_or(OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT),
        };

        Ok(OtlpSharedConfiguration {
            timeout,
            compression: user
                .compression
                .or_else(|| self.env_compression())
                .unwrap_or(Compression::None),
            concurrency_limit: user
                .concurrency_limit
                .unwrap_or(OTEL_EXPORTER_OTLP_CONCURRENCY_LIMIT_DEFAULT),
            headers: self.resolve_headers(&user.headers),
        })
    }

    /// Timeout from the signal specific or generic variable. Values that are
    /// not a positive number of milliseconds are ignored.
    pub fn env_timeout(&self) -> Option<Duration> {
        self.read_var("TIMEOUT", |name| {
            let millis = self.env.get_number::<u64>(name)?;
            if millis == 0 {
                otel_warn!(
                    name: "Config.Otlp.InvalidTimeout",
                    message = format!("{name} must be greater than zero. The value is ignored")
                );
                return None;
            }
            Some(Duration::from_millis(millis))
        })
    }

    /// Compression from the signal specific or generic variable. Only `gzip`
    /// and `none` are accepted.
    pub fn env_compression(&self) -> Option<Compression> {
        self.read_var("COMPRESSION", |name| {
            let raw = self.env.get(name)?;
            match Compression::from_str(raw) {
                Ok(compression) => Some(compression),
                Err(_) => {
                    otel_warn!(
                        name: "Config.Otlp.UnsupportedCompression",
                        message = format!("{name} is set to '{raw}', expected 'gzip' or 'none'. The value is ignored")
                    );
                    None
                }
            }
        })
    }

    /// Builds request headers. User headers replace environment headers,
    /// which replace [`default_headers`]. Entries that are not valid HTTP
    /// header names or values are dropped.
    pub fn resolve_headers(&self, user: &[(String, String)]) -> HeaderMap {
        let from_env = merge_key_value_lists(
            self.env
                .get(&otlp_var(Some(self.signal), "HEADERS"))
                .map(parse_key_value_list)
                .unwrap_or_default(),
            self.env
                .get(OTEL_EXPORTER_OTLP_HEADERS)
                .map(parse_key_value_list)
                .unwrap_or_default(),
        );

        let mut headers = HeaderMap::new();
        for (key, value) in default_headers()
            .into_iter()
            .chain(from_env)
            .chain(user.iter().cloned())
        {
            insert_header(&mut headers, &key, &value);
        }
        headers
    }

    /// The signal specific variable, then the generic one when the first is
    /// unset or rejected by `read`.
    fn read_var<T>(&self, name: &str, read: impl Fn(&str) -> Option<T>) -> Option<T> {
        read(&otlp_var(Some(self.signal), name)).or_else(|| read(&otlp_var(None, name)))
    }
}

fn insert_header(headers: &mut HeaderMap, key: &str, value: &str) {
    match (HeaderName::from_str(key), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => {
            otel_warn!(
                name: "Config.Otlp.InvalidHeader",
                message = format!("Header '{key}' is not a valid HTTP header and is dropped")
            );
        }
    }
}

/// Headers sent by every exporter unless overridden.
pub fn default_headers() -> Vec<(String, String)> {
    vec![(
        "User-Agent".to_string(),
        format!("OTel-OTLP-Exporter-Rust/{}", env!("CARGO_PKG_VERSION")),
    )]
}

/// Provide access to the [ExportConfig] field within the exporter builders.
pub trait HasExportConfig {
    /// Return a mutable reference to the [ExportConfig] within the exporter builders.
    fn export_config(&mut self) -> &mut ExportConfig;
}

/// Expose methods to override [ExportConfig].
///
/// This trait will be implemented for every struct that implemented [`HasExportConfig`] trait.
///
/// ## Examples
/// ```
/// use opentelemetry_otlp_config::{GrpcExporterConfigBuilder, WithExportConfig};
///
/// let builder = GrpcExporterConfigBuilder::default()
///     .with_endpoint("http://localhost:7201")
///     .with_header("api-key", "secret");
/// ```
pub trait WithExportConfig {
    /// Set the address of the OTLP collector. If not set or set to empty string, the default address is used.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    fn with_endpoint<T: Into<String>>(self, endpoint: T) -> Self;
    /// Set the timeout to the collector.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    fn with_timeout(self, timeout: Duration) -> Self;
    /// Set the compression algorithm.
    fn with_compression(self, compression: Compression) -> Self;
    /// Set the maximum number of exports in flight.
    fn with_concurrency_limit(self, limit: usize) -> Self;
    /// Add a request header.
    fn with_header<K: Into<String>, V: Into<String>>(self, key: K, value: V) -> Self;
    /// Set export config. This will override all previous configurations.
    fn with_export_config(self, export_config: ExportConfig) -> Self;
}

impl<B: HasExportConfig> WithExportConfig for B {
    fn with_endpoint<T: Into<String>>(mut self, endpoint: T) -> Self {
        self.export_config().endpoint = Some(endpoint.into());
        self
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.export_config().timeout = Some(timeout);
        self
    }

    fn with_compression(mut self, compression: Compression) -> Self {
        self.export_config().compression = Some(compression);
        self
    }

    fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.export_config().concurrency_limit = Some(limit);
        self
    }

    fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.export_config()
            .headers
            .push((key.into(), value.into()));
        self
    }

    fn with_export_config(mut self, exporter_config: ExportConfig) -> Self {
        *self.export_config() = exporter_config;
        self
    }
}

/// The user endpoint, ignoring blank values.
pub(crate) fn user_endpoint(config: &ExportConfig) -> Option<&str> {
    config
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolve(env: &[(&str, &str)], user: ExportConfig) -> OtlpSharedConfiguration {
        let env = Environment::from_iter(env.iter().copied());
        SharedConfigResolver::new(&env, Signal::Traces)
            .resolve(&user)
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = resolve(&[], ExportConfig::default());
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert_eq!(config.compression, Compression::None);
        assert_eq!(config.concurrency_limit, 30);
        assert_eq!(
            config.headers.get("user-agent").unwrap(),
            &format!("OTel-OTLP-Exporter-Rust/{}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[rstest]
    #[case(&[("OTEL_EXPORTER_OTLP_TIMEOUT", "3000")], 3000)]
    #[case(&[("OTEL_EXPORTER_OTLP_TRACES_TIMEOUT", "2000"), ("OTEL_EXPORTER_OTLP_TIMEOUT", "3000")], 2000)]
    #[case(&[("OTEL_EXPORTER_OTLP_METRICS_TIMEOUT", "2000")], 10_000)]
    #[case(&[("OTEL_EXPORTER_OTLP_TIMEOUT", "0")], 10_000)]
    #[case(&[("OTEL_EXPORTER_OTLP_TIMEOUT", "-5")], 10_000)]
    #[case(&[("OTEL_EXPORTER_OTLP_TIMEOUT", "soon")], 10_000)]
    #[case(&[("OTEL_EXPORTER_OTLP_TRACES_TIMEOUT", "abc"), ("OTEL_EXPORTER_OTLP_TIMEOUT", "2000")], 2000)]
    #[case(&[("OTEL_EXPORTER_OTLP_TRACES_TIMEOUT", "0"), ("OTEL_EXPORTER_OTLP_TIMEOUT", "2000")], 2000)]
    fn test_env_timeout(#[case] env: &[(&str, &str)], #[case] expected: u64) {
        let config = resolve(env, ExportConfig::default());
        assert_eq!(config.timeout, Duration::from_millis(expected));
    }

    #[test]
    fn test_user_timeout_wins() {
        let config = resolve(
            &[("OTEL_EXPORTER_OTLP_TRACES_TIMEOUT", "2000")],
            ExportConfig {
                timeout: Some(Duration::from_millis(500)),
                ..Default::default()
            },
        );
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_user_timeout_is_rejected() {
        let env = Environment::empty();
        let err = SharedConfigResolver::new(&env, Signal::Logs)
            .resolve(&ExportConfig {
                timeout: Some(Duration::ZERO),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ExporterBuildError::InvalidConfig { .. }));
    }

    #[rstest]
    #[case(&[("OTEL_EXPORTER_OTLP_COMPRESSION", "gzip")], Compression::Gzip)]
    #[case(&[("OTEL_EXPORTER_OTLP_TRACES_COMPRESSION", "none"), ("OTEL_EXPORTER_OTLP_COMPRESSION", "gzip")], Compression::None)]
    #[case(&[("OTEL_EXPORTER_OTLP_COMPRESSION", "zstd")], Compression::None)]
    #[case(&[("OTEL_EXPORTER_OTLP_TRACES_COMPRESSION", "zstd"), ("OTEL_EXPORTER_OTLP_COMPRESSION", "gzip")], Compression::Gzip)]
    fn test_env_compression(#[case] env: &[(&str, &str)], #[case] expected: Compression) {
        assert_eq!(resolve(env, ExportConfig::default()).compression, expected);
    }

    #[test]
    fn test_user_compression_and_concurrency_win() {
        let config = resolve(
            &[("OTEL_EXPORTER_OTLP_COMPRESSION", "gzip")],
            ExportConfig {
                compression: Some(Compression::None),
                concurrency_limit: Some(4),
                ..Default::default()
            },
        );
        assert_eq!(config.compression, Compression::None);
        assert_eq!(config.concurrency_limit, 4);
    }

    #[test]
    fn test_header_precedence() {
        let config = resolve(
            &[
                ("OTEL_EXPORTER_OTLP_HEADERS", "a=generic,b=generic,User-Agent=env"),
                ("OTEL_EXPORTER_OTLP_TRACES_HEADERS", "b=specific,c=specific"),
            ],
            ExportConfig {
                headers: vec![("c".to_string(), "user".to_string())],
                ..Default::default()
            },
        );
        let headers = &config.headers;
        assert_eq!(headers.get("a").unwrap(), "generic");
        assert_eq!(headers.get("b").unwrap(), "specific");
        assert_eq!(headers.get("c").unwrap(), "user");
        assert_eq!(headers.get("user-agent").unwrap(), "env");
    }

    #[test]
    fn test_from_resolved_exporter() {
        let exporter = OtlpExporter {
            endpoint: "http://collector:4318/v1/logs".to_string(),
            certificate: None,
            client_key: None,
            client_certificate: None,
            headers: vec![("tenant".to_string(), "a".to_string())],
            compression: Compression::Gzip,
            timeout: 2500,
            encoding: opentelemetry_config::OtlpEncoding::Protobuf,
            insecure: false,
        };
        let config = resolve(
            &[("OTEL_EXPORTER_OTLP_TIMEOUT", "9000")],
            ExportConfig::from(&exporter),
        );
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.compression, Compression::Gzip);
        assert_eq!(config.headers.get("tenant").unwrap(), "a");
    }

    #[test]
    fn test_invalid_headers_are_dropped() {
        let config = resolve(
            &[("OTEL_EXPORTER_OTLP_HEADERS", "bad header=x,ok=fine")],
            ExportConfig::default(),
        );
        assert!(config.headers.get("bad header").is_none());
        assert_eq!(config.headers.get("ok").unwrap(), "fine");
    }
}
