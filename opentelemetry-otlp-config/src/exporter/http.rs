//! Settings of the OTLP/HTTP exporter.

use crate::exporter::{
    user_endpoint, ExportConfig, ExporterBuildError, HasExportConfig, OtlpSharedConfiguration,
    SharedConfigResolver, OTEL_EXPORTER_OTLP_ENDPOINT,
};
use opentelemetry::{otel_debug, otel_warn};
use opentelemetry_config::{
    otlp_var, Environment, OtlpExporter, Signal, OTEL_EXPORTER_OTLP_HTTP_ENDPOINT_DEFAULT,
};
use url::Url;

/// Resolved settings of an HTTP exporter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpExporterConfig {
    /// Timeout, compression, concurrency limit and headers.
    pub shared: OtlpSharedConfiguration,
    /// Full URL requests are posted to.
    pub url: String,
}

/// Configuration for the HTTP exporter.
#[derive(Debug, Default)]
pub struct HttpExporterConfigBuilder {
    exporter_config: ExportConfig,
}

impl HasExportConfig for HttpExporterConfigBuilder {
    fn export_config(&mut self) -> &mut ExportConfig {
        &mut self.exporter_config
    }
}

impl HttpExporterConfigBuilder {
    /// Starts from an exporter of a resolved configuration model.
    pub fn from_exporter(exporter: &OtlpExporter) -> Self {
        HttpExporterConfigBuilder {
            exporter_config: ExportConfig::from(exporter),
        }
    }

    /// Resolves the settings of a `signal` exporter.
    pub fn build(
        self,
        signal: Signal,
        env: &Environment,
    ) -> Result<HttpExporterConfig, ExporterBuildError> {
        let shared = SharedConfigResolver::new(env, signal).resolve(&self.exporter_config)?;
        let url = resolve_endpoint(user_endpoint(&self.exporter_config), signal, env)?;
        otel_debug!(
            name: "Config.Http.Resolved",
            signal = format!("{signal}"),
            url = url.as_str(),
            timeout = format!("{:?}", shared.timeout),
            compression = format!("{}", shared.compression)
        );
        Ok(HttpExporterConfig { shared, url })
    }
}

// see https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/protocol/exporter.md#endpoint-urls-for-otlphttp
/// Resolves the URL a `signal` exporter posts to.
///
/// - A URL from user code gets the signal path appended when it has no path.
///   It must parse.
/// - `OTEL_EXPORTER_OTLP_<SIGNAL>_ENDPOINT` is used as is.
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` always gets the signal path appended.
/// - Otherwise `http://localhost:4318/v1/<signal>`.
///
/// Environment values that do not parse are logged and skipped.
pub fn resolve_endpoint(
    provided: Option<&str>,
    signal: Signal,
    env: &Environment,
) -> Result<String, ExporterBuildError> {
    if let Some(provided) = provided {
        let mut url = Url::parse(provided)
            .map_err(|err| ExporterBuildError::InvalidUri(provided.to_string(), err.to_string()))?;
        if matches!(url.path(), "" | "/") {
            url.set_path(signal.resource_path());
        }
        return Ok(url.to_string());
    }

    // per signal env var is not modified
    let signal_var = otlp_var(Some(signal), "ENDPOINT");
    if let Some(url) = env.get(&signal_var).and_then(|url| parse_env(&signal_var, url)) {
        return Ok(url.to_string());
    }

    if let Some(url) = env
        .get(OTEL_EXPORTER_OTLP_ENDPOINT)
        .and_then(|url| parse_env(OTEL_EXPORTER_OTLP_ENDPOINT, &signal.append_resource_path(url)))
    {
        return Ok(url.to_string());
    }

    Ok(signal.append_resource_path(OTEL_EXPORTER_OTLP_HTTP_ENDPOINT_DEFAULT))
}

fn parse_env(name: &str, value: &str) -> Option<Url> {
    match Url::parse(value) {
        Ok(url) => Some(url),
        Err(err) => {
            otel_warn!(
                name: "Config.Http.InvalidEndpoint",
                message = format!("{name} is set to '{value}' which is not a valid URL: {err}. The value is ignored")
            );
            None
        }
    }
}
