//! Settings of the OTLP/gRPC exporter.

use crate::exporter::{
    user_endpoint, ExportConfig, ExporterBuildError, HasExportConfig, OtlpSharedConfiguration,
    SharedConfigResolver, OTEL_EXPORTER_OTLP_ENDPOINT,
};
use opentelemetry::otel_debug;
use opentelemetry_config::{
    otlp_var, Environment, OtlpExporter, Signal, OTEL_EXPORTER_OTLP_GRPC_ENDPOINT_DEFAULT,
};
use std::fmt::{Debug, Formatter};

mod credentials;
mod url;

pub use self::credentials::{
    CertificatePaths, ChannelCredentials, CredentialResolver, CredentialsFactory, TlsCredentials,
};
pub use self::url::validate_and_normalize_url;

/// Resolved settings of a gRPC exporter.
#[derive(Clone)]
pub struct GrpcExporterConfig {
    /// Timeout, compression, concurrency limit and metadata.
    pub shared: OtlpSharedConfiguration,
    /// Channel target, `host[:port]` or a `unix://` socket address.
    pub url: String,
    /// Credentials of every channel created for this exporter.
    pub credentials: CredentialsFactory,
}

impl Debug for GrpcExporterConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcExporterConfig")
            .field("shared", &self.shared)
            .field("url", &self.url)
            .field("credentials", &"<factory>")
            .finish()
    }
}

/// Configuration for the gRPC exporter.
///
/// ## Examples
///
/// ```
/// use opentelemetry_config::{Environment, Signal};
/// use opentelemetry_otlp_config::{GrpcExporterConfigBuilder, WithExportConfig};
///
/// let config = GrpcExporterConfigBuilder::default()
///     .with_endpoint("https://collector.example.com:4317")
///     .build(Signal::Traces, &Environment::empty())?;
/// assert_eq!(config.url, "collector.example.com:4317");
/// assert!((config.credentials)().is_secure());
/// # Ok::<(), opentelemetry_otlp_config::ExporterBuildError>(())
/// ```
#[derive(Debug, Default)]
pub struct GrpcExporterConfigBuilder {
    exporter_config: ExportConfig,
    credentials: Option<ChannelCredentials>,
    insecure: Option<bool>,
    certificates: CertificatePaths,
}

impl HasExportConfig for GrpcExporterConfigBuilder {
    fn export_config(&mut self) -> &mut ExportConfig {
        &mut self.exporter_config
    }
}

impl GrpcExporterConfigBuilder {
    /// Starts from an exporter of a resolved configuration model.
    pub fn from_exporter(exporter: &OtlpExporter) -> Self {
        GrpcExporterConfigBuilder {
            exporter_config: ExportConfig::from(exporter),
            credentials: None,
            insecure: Some(exporter.insecure),
            certificates: CertificatePaths {
                certificate: exporter.certificate.clone(),
                client_key: exporter.client_key.clone(),
                client_certificate: exporter.client_certificate.clone(),
            },
        }
    }

    /// Use `credentials` regardless of the endpoint scheme and environment.
    pub fn with_credentials(mut self, credentials: ChannelCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Read TLS material from these files rather than from
    /// `OTEL_EXPORTER_OTLP_[SIGNAL_]<CERTIFICATE|CLIENT_KEY|CLIENT_CERTIFICATE>`.
    pub fn with_certificate_paths(mut self, certificates: CertificatePaths) -> Self {
        self.certificates = certificates;
        self
    }

    /// Use a plaintext channel for endpoints without a scheme. Overrides
    /// `OTEL_EXPORTER_OTLP_[SIGNAL_]INSECURE`.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = Some(insecure);
        self
    }

    /// Resolves the settings of a `signal` exporter.
    ///
    /// The endpoint is taken from user code, then
    /// `OTEL_EXPORTER_OTLP_<SIGNAL>_ENDPOINT`, then `OTEL_EXPORTER_OTLP_ENDPOINT`,
    /// then `http://localhost:4317`. Neither environment value gets a signal
    /// path appended.
    pub fn build(
        self,
        signal: Signal,
        env: &Environment,
    ) -> Result<GrpcExporterConfig, ExporterBuildError> {
        let shared = SharedConfigResolver::new(env, signal).resolve(&self.exporter_config)?;
        let endpoint = resolve_endpoint(&self.exporter_config, signal, env);
        let url = validate_and_normalize_url(endpoint)?;
        let mut resolver =
            CredentialResolver::new(env, signal).with_certificate_paths(self.certificates);
        if let Some(insecure) = self.insecure {
            resolver = resolver.with_insecure(insecure);
        }
        let credentials = resolver.resolve(endpoint, self.credentials);

        otel_debug!(
            name: "Config.Grpc.Resolved",
            signal = format!("{signal}"),
            url = url.as_str(),
            timeout = format!("{:?}", shared.timeout),
            compression = format!("{}", shared.compression)
        );
        Ok(GrpcExporterConfig {
            shared,
            url,
            credentials,
        })
    }
}

fn resolve_endpoint<'a>(config: &'a ExportConfig, signal: Signal, env: &'a Environment) -> &'a str {
    user_endpoint(config)
        .or_else(|| env.get(&otlp_var(Some(signal), "ENDPOINT")))
        .or_else(|| env.get(OTEL_EXPORTER_OTLP_ENDPOINT))
        .unwrap_or(OTEL_EXPORTER_OTLP_GRPC_ENDPOINT_DEFAULT)
}
