//! # Configuration fragments
//!
//! A fragment mirrors [`ConfigurationModel`](crate::ConfigurationModel) with
//! every field optional. Each tier produces one: user code builds it directly,
//! the environment extractor and the file loader fill in what they find.
//!
//! Fragments deserialize from the declarative file schema, so the field names
//! below are the YAML keys.

use crate::error::ConfigError;
use crate::merge::{
    merge_by_name, merge_indexwise, merge_key_value_strings, merge_nested, Merge, Named,
};
use crate::model::{
    AttributeValue, Compression, ExemplarFilter, ExporterKind, HistogramAggregation, LogLevel,
    OtlpEncoding, Sampler, TemporalityPreference,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Partial SDK configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ConfigurationFragment {
    /// Whether the SDK is disabled.
    pub disabled: Option<bool>,
    /// Verbosity of the SDK's own diagnostics.
    pub log_level: Option<LogLevel>,
    /// Resource detectors to run.
    pub node_resource_detectors: Option<Vec<String>>,
    /// Resource.
    pub resource: Option<ResourceFragment>,
    /// Global attribute limits.
    pub attribute_limits: Option<AttributeLimitsFragment>,
    /// Propagators.
    pub propagator: Option<PropagatorFragment>,
    /// Tracing pipeline.
    pub tracer_provider: Option<TracerProviderFragment>,
    /// Metrics pipeline.
    pub meter_provider: Option<MeterProviderFragment>,
    /// Logs pipeline.
    pub logger_provider: Option<LoggerProviderFragment>,
}

impl Merge for ConfigurationFragment {
    fn merge(self, lower: Self) -> Self {
        ConfigurationFragment {
            disabled: self.disabled.or(lower.disabled),
            log_level: self.log_level.or(lower.log_level),
            node_resource_detectors: self.node_resource_detectors.or(lower.node_resource_detectors),
            resource: merge_nested(self.resource, lower.resource),
            attribute_limits: merge_nested(self.attribute_limits, lower.attribute_limits),
            propagator: merge_nested(self.propagator, lower.propagator),
            tracer_provider: merge_nested(self.tracer_provider, lower.tracer_provider),
            meter_provider: merge_nested(self.meter_provider, lower.meter_provider),
            logger_provider: merge_nested(self.logger_provider, lower.logger_provider),
        }
    }
}

/// A `name`/`value` pair, used for exporter headers.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NameValue {
    /// Header name.
    pub name: String,
    /// Header value. Entries without a value are ignored.
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: Option<String>,
}

impl NameValue {
    /// Creates an entry with a value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        NameValue {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl Named for NameValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Partial resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ResourceFragment {
    /// Structured attributes. They take precedence over `attributes_list`.
    pub attributes: Option<Vec<AttributeFragment>>,
    /// Attributes in `key=value,...` form, as found in
    /// `OTEL_RESOURCE_ATTRIBUTES`.
    pub attributes_list: Option<String>,
    /// Schema URL.
    pub schema_url: Option<String>,
}

impl Merge for ResourceFragment {
    fn merge(self, lower: Self) -> Self {
        ResourceFragment {
            attributes: merge_by_name(self.attributes, lower.attributes),
            attributes_list: merge_key_value_strings(self.attributes_list, lower.attributes_list),
            schema_url: self.schema_url.or(lower.schema_url),
        }
    }
}

/// A single structured resource attribute.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AttributeFragment {
    /// Attribute key.
    pub name: String,
    /// Attribute value. Entries without a value are ignored.
    #[serde(default)]
    pub value: Option<AttributeValue>,
}

impl AttributeFragment {
    /// Creates an attribute with a value.
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        AttributeFragment {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl Named for AttributeFragment {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Partial global attribute limits.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AttributeLimitsFragment {
    /// Maximum length of string attribute values.
    pub attribute_value_length_limit: Option<u32>,
    /// Maximum number of attributes.
    pub attribute_count_limit: Option<u32>,
}

impl Merge for AttributeLimitsFragment {
    fn merge(self, lower: Self) -> Self {
        AttributeLimitsFragment {
            attribute_value_length_limit: self
                .attribute_value_length_limit
                .or(lower.attribute_value_length_limit),
            attribute_count_limit: self.attribute_count_limit.or(lower.attribute_count_limit),
        }
    }
}

/// Partial propagator configuration.
///
/// `composite` and `composite_list` are each taken from the highest tier that
/// sets them and combined at resolution, structured names first.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PropagatorFragment {
    /// Propagator names. In a file each entry is either a name or a single-key
    /// mapping such as `tracecontext:`.
    #[serde(default, deserialize_with = "composite_names")]
    pub composite: Option<Vec<String>>,
    /// Comma separated propagator names.
    pub composite_list: Option<String>,
}

impl Merge for PropagatorFragment {
    fn merge(self, lower: Self) -> Self {
        PropagatorFragment {
            composite: self.composite.or(lower.composite),
            composite_list: self.composite_list.or(lower.composite_list),
        }
    }
}

/// Partial tracer provider.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TracerProviderFragment {
    /// Span processors, merged position by position.
    pub processors: Option<Vec<ProcessorFragment>>,
    /// Span limits.
    pub limits: Option<SpanLimitsFragment>,
    /// Sampler, replaced as a whole.
    pub sampler: Option<Sampler>,
}

impl Merge for TracerProviderFragment {
    fn merge(self, lower: Self) -> Self {
        TracerProviderFragment {
            processors: merge_indexwise(self.processors, lower.processors),
            limits: merge_nested(self.limits, lower.limits),
            sampler: self.sampler.or(lower.sampler),
        }
    }
}

/// Partial span limits.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SpanLimitsFragment {
    /// Maximum length of string attribute values.
    pub attribute_value_length_limit: Option<u32>,
    /// Maximum number of attributes per span.
    pub attribute_count_limit: Option<u32>,
    /// Maximum number of events per span.
    pub event_count_limit: Option<u32>,
    /// Maximum number of links per span.
    pub link_count_limit: Option<u32>,
    /// Maximum number of attributes per event.
    pub event_attribute_count_limit: Option<u32>,
    /// Maximum number of attributes per link.
    pub link_attribute_count_limit: Option<u32>,
}

impl Merge for SpanLimitsFragment {
    fn merge(self, lower: Self) -> Self {
        SpanLimitsFragment {
            attribute_value_length_limit: self
                .attribute_value_length_limit
                .or(lower.attribute_value_length_limit),
            attribute_count_limit: self.attribute_count_limit.or(lower.attribute_count_limit),
            event_count_limit: self.event_count_limit.or(lower.event_count_limit),
            link_count_limit: self.link_count_limit.or(lower.link_count_limit),
            event_attribute_count_limit: self
                .event_attribute_count_limit
                .or(lower.event_attribute_count_limit),
            link_attribute_count_limit: self
                .link_attribute_count_limit
                .or(lower.link_attribute_count_limit),
        }
    }
}

/// Partial meter provider.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MeterProviderFragment {
    /// Metric readers, merged position by position.
    pub readers: Option<Vec<MetricReaderFragment>>,
    /// Exemplar filter.
    pub exemplar_filter: Option<ExemplarFilter>,
}

impl Merge for MeterProviderFragment {
    fn merge(self, lower: Self) -> Self {
        MeterProviderFragment {
            readers: merge_indexwise(self.readers, lower.readers),
            exemplar_filter: self.exemplar_filter.or(lower.exemplar_filter),
        }
    }
}

/// Partial metric reader.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MetricReaderFragment {
    /// Periodic reader settings.
    pub periodic: Option<PeriodicReaderFragment>,
}

impl Merge for MetricReaderFragment {
    fn merge(self, lower: Self) -> Self {
        MetricReaderFragment {
            periodic: merge_nested(self.periodic, lower.periodic),
        }
    }
}

/// Partial periodic reader.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PeriodicReaderFragment {
    /// Export interval in milliseconds.
    pub interval: Option<u64>,
    /// Export timeout in milliseconds.
    pub timeout: Option<u64>,
    /// Exporter.
    pub exporter: Option<ExporterFragment>,
}

impl Merge for PeriodicReaderFragment {
    fn merge(self, lower: Self) -> Self {
        PeriodicReaderFragment {
            interval: self.interval.or(lower.interval),
            timeout: self.timeout.or(lower.timeout),
            exporter: merge_nested(self.exporter, lower.exporter),
        }
    }
}

/// Partial logger provider.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LoggerProviderFragment {
    /// Log record processors, merged position by position.
    pub processors: Option<Vec<ProcessorFragment>>,
    /// Log record limits.
    pub limits: Option<LogRecordLimitsFragment>,
}

impl Merge for LoggerProviderFragment {
    fn merge(self, lower: Self) -> Self {
        LoggerProviderFragment {
            processors: merge_indexwise(self.processors, lower.processors),
            limits: merge_nested(self.limits, lower.limits),
        }
    }
}

/// Partial log record limits.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LogRecordLimitsFragment {
    /// Maximum length of string attribute values.
    pub attribute_value_length_limit: Option<u32>,
    /// Maximum number of attributes per log record.
    pub attribute_count_limit: Option<u32>,
}

impl Merge for LogRecordLimitsFragment {
    fn merge(self, lower: Self) -> Self {
        LogRecordLimitsFragment {
            attribute_value_length_limit: self
                .attribute_value_length_limit
                .or(lower.attribute_value_length_limit),
            attribute_count_limit: self.attribute_count_limit.or(lower.attribute_count_limit),
        }
    }
}

/// The kind of a processor fragment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessorKind {
    /// Batching processor.
    Batch,
    /// Simple processor.
    Simple,
}

/// Partial span or log record processor. At most one of `batch` and `simple`
/// is expected to be set.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ProcessorFragment {
    /// Batching processor settings.
    pub batch: Option<BatchProcessorFragment>,
    /// Simple processor settings.
    #[serde(default, deserialize_with = "present")]
    pub simple: Option<SimpleProcessorFragment>,
    /// Exporter settings that apply whatever the processor kind. They merge
    /// into the exporter of the kind a lower tier declares.
    #[serde(skip)]
    pub exporter: Option<ExporterFragment>,
}

impl ProcessorFragment {
    /// Kind of processor this fragment describes, `None` when it declares
    /// neither.
    pub fn kind(&self) -> Option<ProcessorKind> {
        match (&self.batch, &self.simple) {
            (Some(_), _) => Some(ProcessorKind::Batch),
            (None, Some(_)) => Some(ProcessorKind::Simple),
            (None, None) => None,
        }
    }

    /// Moves the kind independent exporter settings below the exporter of the
    /// declared kind. Fragments without a kind are returned unchanged.
    pub fn settle(mut self) -> Self {
        if self.kind().is_some() {
            let exporter = self.exporter.take();
            let slot = self.exporter_slot();
            *slot = merge_nested(slot.take(), exporter);
        }
        self
    }

    fn exporter_slot(&mut self) -> &mut Option<ExporterFragment> {
        match (&mut self.batch, &mut self.simple) {
            (Some(batch), _) => &mut batch.exporter,
            (None, Some(simple)) => &mut simple.exporter,
            (None, None) => &mut self.exporter,
        }
    }
}

impl Merge for ProcessorFragment {
    fn merge(self, mut lower: Self) -> Self {
        if let (Some(higher), Some(lower_kind)) = (self.kind(), lower.kind()) {
            if higher != lower_kind {
                return self;
            }
        }
        // kind independent settings outrank every exporter of the lower tier
        let slot = lower.exporter_slot();
        *slot = merge_nested(self.exporter, slot.take());
        ProcessorFragment {
            batch: merge_nested(self.batch, lower.batch),
            simple: merge_nested(self.simple, lower.simple),
            exporter: lower.exporter,
        }
    }
}

/// Partial batching processor, durations in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BatchProcessorFragment {
    /// Delay between two consecutive exports.
    pub schedule_delay: Option<u64>,
    /// Maximum time an export may take.
    pub export_timeout: Option<u64>,
    /// Maximum number of queued items.
    pub max_queue_size: Option<u32>,
    /// Maximum number of items per export.
    pub max_export_batch_size: Option<u32>,
    /// Exporter.
    pub exporter: Option<ExporterFragment>,
}

impl Merge for BatchProcessorFragment {
    fn merge(self, lower: Self) -> Self {
        BatchProcessorFragment {
            schedule_delay: self.schedule_delay.or(lower.schedule_delay),
            export_timeout: self.export_timeout.or(lower.export_timeout),
            max_queue_size: self.max_queue_size.or(lower.max_queue_size),
            max_export_batch_size: self.max_export_batch_size.or(lower.max_export_batch_size),
            exporter: merge_nested(self.exporter, lower.exporter),
        }
    }
}

/// Partial simple processor.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SimpleProcessorFragment {
    /// Exporter.
    pub exporter: Option<ExporterFragment>,
}

impl Merge for SimpleProcessorFragment {
    fn merge(self, lower: Self) -> Self {
        SimpleProcessorFragment {
            exporter: merge_nested(self.exporter, lower.exporter),
        }
    }
}

/// Partial exporter.
///
/// In a file an exporter is a mapping with one of the keys `otlp_http`,
/// `otlp_grpc` or `console`. The environment may leave `kind` unset while
/// still providing OTLP settings; the kind is then inherited from a lower
/// tier.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(try_from = "ExporterDocument")]
pub struct ExporterFragment {
    /// Exporter kind.
    pub kind: Option<ExporterKind>,
    /// OTLP settings, ignored for [`ExporterKind::Console`].
    pub otlp: Option<OtlpExporterFragment>,
}

impl ExporterFragment {
    /// An exporter of the given kind with no OTLP settings.
    pub fn of_kind(kind: ExporterKind) -> Self {
        ExporterFragment {
            kind: Some(kind),
            otlp: None,
        }
    }
}

impl Merge for ExporterFragment {
    fn merge(self, lower: Self) -> Self {
        match (self.kind, lower.kind) {
            (Some(higher), Some(lower_kind)) if higher != lower_kind => self,
            _ => ExporterFragment {
                kind: self.kind.or(lower.kind),
                otlp: merge_nested(self.otlp, lower.otlp),
            },
        }
    }
}

#[derive(Deserialize)]
struct ExporterDocument {
    #[serde(default, deserialize_with = "present")]
    otlp_http: Option<OtlpExporterFragment>,
    #[serde(default, deserialize_with = "present")]
    otlp_grpc: Option<OtlpExporterFragment>,
    #[serde(default, deserialize_with = "present")]
    console: Option<EmptyDocument>,
}

#[derive(Default, Deserialize)]
struct EmptyDocument {}

impl TryFrom<ExporterDocument> for ExporterFragment {
    type Error = ConfigError;

    fn try_from(document: ExporterDocument) -> Result<Self, Self::Error> {
        match (document.otlp_http, document.otlp_grpc, document.console) {
            (Some(otlp), None, None) => Ok(ExporterFragment {
                kind: Some(ExporterKind::OtlpHttp),
                otlp: Some(otlp),
            }),
            (None, Some(otlp), None) => Ok(ExporterFragment {
                kind: Some(ExporterKind::OtlpGrpc),
                otlp: Some(otlp),
            }),
            (None, None, Some(_)) => Ok(ExporterFragment::of_kind(ExporterKind::Console)),
            (None, None, None) => Err(ConfigError::invalid(
                "exporter",
                "expected one of otlp_http, otlp_grpc or console",
            )),
            _ => Err(ConfigError::invalid(
                "exporter",
                "only one of otlp_http, otlp_grpc or console may be set",
            )),
        }
    }
}

/// Partial OTLP exporter settings.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct OtlpExporterFragment {
    /// Collector endpoint, used as is.
    pub endpoint: Option<String>,
    /// Base URL shared by every signal. OTLP/HTTP exporters get the signal
    /// path appended to it. Only consulted when no tier sets `endpoint` at
    /// the same or a higher priority.
    #[serde(skip)]
    pub endpoint_base: Option<String>,
    /// Trusted certificate file.
    pub certificate: Option<PathBuf>,
    /// Client private key file.
    pub client_key: Option<PathBuf>,
    /// Client certificate file.
    pub client_certificate: Option<PathBuf>,
    /// Structured headers. They take precedence over `headers_list`.
    pub headers: Option<Vec<NameValue>>,
    /// Headers in `key=value,...` form.
    pub headers_list: Option<String>,
    /// Payload compression.
    pub compression: Option<Compression>,
    /// Export timeout in milliseconds.
    pub timeout: Option<u64>,
    /// Payload encoding for OTLP/HTTP.
    pub encoding: Option<OtlpEncoding>,
    /// Disables TLS for gRPC endpoints without a scheme.
    pub insecure: Option<bool>,
    /// Metrics only: aggregation temporality preference.
    pub temporality_preference: Option<TemporalityPreference>,
    /// Metrics only: histogram aggregation.
    pub default_histogram_aggregation: Option<HistogramAggregation>,
}

impl Merge for OtlpExporterFragment {
    fn merge(self, lower: Self) -> Self {
        let (endpoint, endpoint_base) = match (self.endpoint, self.endpoint_base) {
            (None, None) => (lower.endpoint, lower.endpoint_base),
            (Some(endpoint), _) => (Some(endpoint), None),
            (None, base) => (None, base),
        };
        OtlpExporterFragment {
            endpoint,
            endpoint_base,
            certificate: self.certificate.or(lower.certificate),
            client_key: self.client_key.or(lower.client_key),
            client_certificate: self.client_certificate.or(lower.client_certificate),
            headers: merge_by_name(self.headers, lower.headers),
            headers_list: merge_key_value_strings(self.headers_list, lower.headers_list),
            compression: self.compression.or(lower.compression),
            timeout: self.timeout.or(lower.timeout),
            encoding: self.encoding.or(lower.encoding),
            insecure: self.insecure.or(lower.insecure),
            temporality_preference: self.temporality_preference.or(lower.temporality_preference),
            default_histogram_aggregation: self
                .default_histogram_aggregation
                .or(lower.default_histogram_aggregation),
        }
    }
}

/// File form of a sampler: a mapping with exactly one sampler key.
#[derive(Deserialize)]
pub(crate) struct SamplerDocument {
    #[serde(default, deserialize_with = "present")]
    always_on: Option<EmptyDocument>,
    #[serde(default, deserialize_with = "present")]
    always_off: Option<EmptyDocument>,
    #[serde(default, deserialize_with = "present")]
    trace_id_ratio_based: Option<RatioDocument>,
    #[serde(default, deserialize_with = "present")]
    parent_based: Option<ParentBasedDocument>,
}

#[derive(Default, Deserialize)]
struct RatioDocument {
    ratio: Option<f64>,
}

#[derive(Default, Deserialize)]
struct ParentBasedDocument {
    root: Option<Box<Sampler>>,
}

impl TryFrom<SamplerDocument> for Sampler {
    type Error = ConfigError;

    fn try_from(document: SamplerDocument) -> Result<Self, Self::Error> {
        let mut samplers = Vec::with_capacity(1);
        if document.always_on.is_some() {
            samplers.push(Sampler::AlwaysOn);
        }
        if document.always_off.is_some() {
            samplers.push(Sampler::AlwaysOff);
        }
        if let Some(ratio) = document.trace_id_ratio_based {
            let ratio = ratio.ratio.unwrap_or(1.0);
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigError::invalid(
                    "sampler",
                    format!("trace_id_ratio_based ratio must be within [0.0, 1.0], got {ratio}"),
                ));
            }
            samplers.push(Sampler::TraceIdRatioBased(ratio));
        }
        if let Some(parent) = document.parent_based {
            samplers.push(Sampler::ParentBased(
                parent.root.unwrap_or_else(|| Box::new(Sampler::AlwaysOn)),
            ));
        }
        match samplers.len() {
            1 => Ok(samplers.remove(0)),
            0 => Err(ConfigError::invalid("sampler", "no sampler specified")),
            _ => Err(ConfigError::invalid("sampler", "only one sampler may be specified")),
        }
    }
}

/// Deserializes a key whose mere presence is meaningful: `key:` with a null
/// value yields `Some(T::default())`. Combine with `#[serde(default)]` so a
/// missing key stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(|value| Some(value.unwrap_or_default()))
}

/// Accepts any YAML scalar as a string. Substituted values such as
/// `${API_KEY}` may be typed as numbers or booleans by the time they get here.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<serde_yaml::Value>::deserialize(deserializer)?
        .map(|value| match value {
            serde_yaml::Value::String(text) => Ok(text),
            serde_yaml::Value::Number(number) => Ok(number.to_string()),
            serde_yaml::Value::Bool(flag) => Ok(flag.to_string()),
            other => Err(D::Error::custom(format!(
                "expected a scalar value, got {other:?}"
            ))),
        })
        .transpose()
}

fn composite_names<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(entries) = Option::<Vec<serde_yaml::Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let mut names = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            serde_yaml::Value::String(name) => names.push(name),
            serde_yaml::Value::Mapping(mapping) => {
                for key in mapping.keys() {
                    match key.as_str() {
                        Some(name) => names.push(name.to_owned()),
                        None => {
                            return Err(D::Error::custom(format!(
                                "propagator names must be strings, got {key:?}"
                            )))
                        }
                    }
                }
            }
            other => {
                return Err(D::Error::custom(format!(
                    "expected a propagator name, got {other:?}"
                )))
            }
        }
    }
    Ok(Some(names))
}
