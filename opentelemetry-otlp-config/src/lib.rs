//! # OTLP exporter configuration
//!
//! Resolves the transport settings of OTLP exporters: the endpoint, channel
//! credentials, timeout, compression, concurrency limit and request headers.
//! Values set by user code win over `OTEL_EXPORTER_OTLP_*` variables, which
//! win over defaults. Signal specific variables such as
//! `OTEL_EXPORTER_OTLP_TRACES_TIMEOUT` win over their generic counterpart.
//!
//! ```
//! use opentelemetry_config::{Environment, Signal};
//! use opentelemetry_otlp_config::{HttpExporterConfigBuilder, WithExportConfig};
//! use std::time::Duration;
//!
//! let env = Environment::from_iter([("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4318")]);
//! let config = HttpExporterConfigBuilder::default()
//!     .with_timeout(Duration::from_secs(3))
//!     .build(Signal::Logs, &env)?;
//! assert_eq!(config.url, "http://collector:4318/v1/logs");
//! assert_eq!(config.shared.timeout, Duration::from_secs(3));
//! # Ok::<(), opentelemetry_otlp_config::ExporterBuildError>(())
//! ```
//!
//! ## Feature flags
//!
//! * `internal-logs` (default): diagnostics through the `opentelemetry`
//!   internal logging macros.
//! * `tls`: conversion of [`TlsCredentials`] into tonic's `ClientTlsConfig`.
//! * `tls-roots`: `tls` plus the platform trust roots in tonic.
#![warn(missing_debug_implementations, missing_docs)]

mod exporter;

pub use crate::exporter::grpc::{
    validate_and_normalize_url, CertificatePaths, ChannelCredentials, CredentialResolver,
    CredentialsFactory, GrpcExporterConfig, GrpcExporterConfigBuilder, TlsCredentials,
};
pub use crate::exporter::http::{resolve_endpoint, HttpExporterConfig, HttpExporterConfigBuilder};
pub use crate::exporter::{
    default_headers, ExportConfig, ExporterBuildError, HasExportConfig, OtlpSharedConfiguration,
    SharedConfigResolver, WithExportConfig, OTEL_EXPORTER_OTLP_COMPRESSION,
    OTEL_EXPORTER_OTLP_CONCURRENCY_LIMIT_DEFAULT, OTEL_EXPORTER_OTLP_ENDPOINT,
    OTEL_EXPORTER_OTLP_HEADERS, OTEL_EXPORTER_OTLP_TIMEOUT, OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT,
};
