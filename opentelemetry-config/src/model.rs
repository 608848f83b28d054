//! # Configuration model
//!
//! The fully resolved configuration. Every required field holds a value; an
//! `Option` only remains where "no value" is itself meaningful (e.g. no
//! attribute value length limit).

use crate::error::ConfigError;
use crate::environment::Signal;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

/// Default OTLP/HTTP endpoint, without the signal path.
pub const OTEL_EXPORTER_OTLP_HTTP_ENDPOINT_DEFAULT: &str = "http://localhost:4318";
/// Default OTLP/gRPC endpoint.
pub const OTEL_EXPORTER_OTLP_GRPC_ENDPOINT_DEFAULT: &str = "http://localhost:4317";

/// Resolved SDK configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigurationModel {
    /// Whether the SDK is disabled.
    pub disabled: bool,
    /// Verbosity of the SDK's own diagnostics.
    pub log_level: LogLevel,
    /// Resource detectors to run.
    pub node_resource_detectors: Vec<String>,
    /// Resource describing the entity producing telemetry.
    pub resource: Resource,
    /// Limits applied to attributes of every signal.
    pub attribute_limits: AttributeLimits,
    /// Context propagators.
    pub propagator: Propagator,
    /// Tracing pipeline.
    pub tracer_provider: TracerProvider,
    /// Metrics pipeline.
    pub meter_provider: MeterProvider,
    /// Logs pipeline.
    pub logger_provider: LoggerProvider,
}

/// Resource attributes and schema.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    /// Attributes in resolution order.
    pub attributes: Vec<Attribute>,
    /// Schema URL of the resource, if any.
    pub schema_url: Option<String>,
}

impl Resource {
    /// Value of the attribute called `name`.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| &attribute.value)
    }
}

/// A named attribute value.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    /// Attribute key.
    pub name: String,
    /// Attribute value.
    pub value: AttributeValue,
}

/// Value of a resource attribute.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Double(f64),
    /// String value.
    String(String),
    /// Homogeneous array of values.
    Array(Vec<AttributeValue>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

/// Global attribute limits.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeLimits {
    /// Maximum length of string attribute values.
    pub attribute_value_length_limit: Option<u32>,
    /// Maximum number of attributes.
    pub attribute_count_limit: u32,
}

/// Resolved propagators.
#[derive(Clone, Debug, PartialEq)]
pub struct Propagator {
    /// Propagator names, deduplicated in first-seen order. An empty list means
    /// no propagation.
    pub composite: Vec<String>,
}

/// Tracer provider configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct TracerProvider {
    /// Span processors.
    pub processors: Vec<Processor>,
    /// Span limits.
    pub limits: SpanLimits,
    /// Sampler.
    pub sampler: Sampler,
}

/// Limits applied to spans.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanLimits {
    /// Maximum length of string attribute values.
    pub attribute_value_length_limit: Option<u32>,
    /// Maximum number of attributes per span.
    pub attribute_count_limit: u32,
    /// Maximum number of events per span.
    pub event_count_limit: u32,
    /// Maximum number of links per span.
    pub link_count_limit: u32,
    /// Maximum number of attributes per event.
    pub event_attribute_count_limit: u32,
    /// Maximum number of attributes per link.
    pub link_attribute_count_limit: u32,
}

/// Meter provider configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct MeterProvider {
    /// Metric readers.
    pub readers: Vec<MetricReader>,
    /// Which measurements become exemplars.
    pub exemplar_filter: ExemplarFilter,
}

/// Logger provider configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggerProvider {
    /// Log record processors.
    pub processors: Vec<Processor>,
    /// Log record limits.
    pub limits: LogRecordLimits,
}

/// Limits applied to log records.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecordLimits {
    /// Maximum length of string attribute values.
    pub attribute_value_length_limit: Option<u32>,
    /// Maximum number of attributes per log record.
    pub attribute_count_limit: u32,
}

/// Span or log record processor.
#[derive(Clone, Debug, PartialEq)]
pub enum Processor {
    /// Batching processor.
    Batch(BatchProcessor),
    /// Processor exporting every item as it ends.
    Simple(SimpleProcessor),
}

impl Processor {
    /// Exporter of this processor.
    pub fn exporter(&self) -> &Exporter {
        match self {
            Processor::Batch(batch) => &batch.exporter,
            Processor::Simple(simple) => &simple.exporter,
        }
    }
}

/// Batching processor settings, durations in milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchProcessor {
    /// Delay between two consecutive exports.
    pub schedule_delay: u64,
    /// Maximum time an export may take.
    pub export_timeout: u64,
    /// Maximum number of queued items.
    pub max_queue_size: u32,
    /// Maximum number of items per export.
    pub max_export_batch_size: u32,
    /// Exporter.
    pub exporter: Exporter,
}

/// Simple processor settings.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleProcessor {
    /// Exporter.
    pub exporter: Exporter,
}

/// Span or log record exporter.
#[derive(Clone, Debug, PartialEq)]
pub enum Exporter {
    /// OTLP over HTTP.
    OtlpHttp(OtlpExporter),
    /// OTLP over gRPC.
    OtlpGrpc(OtlpExporter),
    /// Writes to stdout.
    Console,
}

/// Metric reader.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricReader {
    /// Pushes metrics on an interval.
    Periodic(PeriodicReader),
}

/// Periodic reader settings, durations in milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodicReader {
    /// Delay between two consecutive exports.
    pub interval: u64,
    /// Maximum time an export may take.
    pub timeout: u64,
    /// Exporter.
    pub exporter: MetricExporter,
}

/// Metric exporter.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricExporter {
    /// OTLP over HTTP.
    OtlpHttp(OtlpMetricExporter),
    /// OTLP over gRPC.
    OtlpGrpc(OtlpMetricExporter),
    /// Writes to stdout.
    Console,
}

/// OTLP exporter settings.
#[derive(Clone, Debug, PartialEq)]
pub struct OtlpExporter {
    /// Collector endpoint.
    pub endpoint: String,
    /// Trusted certificate file.
    pub certificate: Option<PathBuf>,
    /// Client private key file for mTLS.
    pub client_key: Option<PathBuf>,
    /// Client certificate file for mTLS.
    pub client_certificate: Option<PathBuf>,
    /// Headers sent with every export request.
    pub headers: Vec<(String, String)>,
    /// Payload compression.
    pub compression: Compression,
    /// Export timeout in milliseconds.
    pub timeout: u64,
    /// Payload encoding, only meaningful for OTLP/HTTP.
    pub encoding: OtlpEncoding,
    /// Disables TLS for gRPC endpoints without a scheme.
    pub insecure: bool,
}

/// OTLP metric exporter settings.
#[derive(Clone, Debug, PartialEq)]
pub struct OtlpMetricExporter {
    /// Transport settings.
    pub otlp: OtlpExporter,
    /// Aggregation temporality per instrument kind.
    pub temporality_preference: TemporalityPreference,
    /// Aggregation used for histogram instruments.
    pub default_histogram_aggregation: HistogramAggregation,
}

/// The kind of exporter a processor or reader uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExporterKind {
    /// OTLP over HTTP.
    OtlpHttp,
    /// OTLP over gRPC.
    OtlpGrpc,
    /// Writes to stdout.
    Console,
}

impl ExporterKind {
    /// Endpoint used when no tier provides one, `None` for exporters that
    /// do not send over the network.
    pub fn default_endpoint(&self, signal: Signal) -> Option<String> {
        match self {
            ExporterKind::OtlpGrpc => Some(OTEL_EXPORTER_OTLP_GRPC_ENDPOINT_DEFAULT.to_string()),
            ExporterKind::OtlpHttp => {
                Some(signal.append_resource_path(OTEL_EXPORTER_OTLP_HTTP_ENDPOINT_DEFAULT))
            }
            ExporterKind::Console => None,
        }
    }
}

/// Sampler configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "crate::fragment::SamplerDocument")]
pub enum Sampler {
    /// Samples every trace.
    AlwaysOn,
    /// Samples no trace.
    AlwaysOff,
    /// Samples the given ratio of traces.
    TraceIdRatioBased(f64),
    /// Respects the parent's decision, using `root` for root spans.
    ParentBased(Box<Sampler>),
}

macro_rules! string_enum {
    (@first $first:literal $(| $rest:literal)*) => { $first };
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $($text:literal)|+),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize)]
        #[serde(try_from = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $($($text)|+ => Ok($name::$variant),)+
                    _ => Err(ConfigError::invalid(
                        stringify!($name),
                        format!("unsupported value '{s}'"),
                    )),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ConfigError;

            fn try_from(value: String) -> Result<Self, ConfigError> {
                value.parse()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let text = match self {
                    $($name::$variant => string_enum!(@first $($text)|+),)+
                };
                write!(f, "{text}")
            }
        }
    };
}

string_enum! {
    /// Verbosity of SDK diagnostics.
    LogLevel {
        /// No diagnostics.
        None => "none",
        /// Errors only.
        Error => "error",
        /// Warnings and errors.
        Warn => "warn",
        /// Informational messages.
        Info => "info",
        /// Debug messages.
        Debug => "debug",
        /// Verbose messages.
        Verbose => "verbose",
        /// Everything.
        All => "all",
    }
}

string_enum! {
    /// The compression algorithm to use when sending data.
    Compression {
        /// No compression.
        None => "none",
        /// Compresses data using gzip.
        Gzip => "gzip",
    }
}

string_enum! {
    /// OTLP/HTTP payload encoding.
    OtlpEncoding {
        /// Binary protobuf.
        Protobuf => "protobuf",
        /// Protobuf JSON mapping.
        Json => "json",
    }
}

string_enum! {
    /// Preferred aggregation temporality of exported metrics.
    TemporalityPreference {
        /// Cumulative for every instrument.
        Cumulative => "cumulative",
        /// Delta for counters and histograms.
        Delta => "delta",
        /// Delta for synchronous counters and histograms only.
        LowMemory => "low_memory" | "lowmemory",
    }
}

string_enum! {
    /// Aggregation used for histogram instruments.
    HistogramAggregation {
        /// Fixed bucket boundaries.
        ExplicitBucketHistogram => "explicit_bucket_histogram",
        /// Base-2 exponential buckets.
        Base2ExponentialBucketHistogram => "base2_exponential_bucket_histogram",
    }
}

string_enum! {
    /// Which measurements are eligible to become exemplars.
    ExemplarFilter {
        /// Every measurement.
        AlwaysOn => "always_on",
        /// No measurement.
        AlwaysOff => "always_off",
        /// Measurements recorded inside a sampled span.
        TraceBased => "trace_based",
    }
}
