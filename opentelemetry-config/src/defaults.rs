use crate::fragment::{
    AttributeLimitsFragment, BatchProcessorFragment, ConfigurationFragment, ExporterFragment,
    LogRecordLimitsFragment, LoggerProviderFragment, MeterProviderFragment, MetricReaderFragment,
    OtlpExporterFragment, PeriodicReaderFragment, ProcessorFragment, PropagatorFragment,
    ResourceFragment, SpanLimitsFragment, TracerProviderFragment,
};
use crate::model::{
    Compression, ExemplarFilter, ExporterKind, HistogramAggregation, LogLevel, OtlpEncoding,
    Sampler, TemporalityPreference,
};

/// Default number of attributes allowed per item.
pub const DEFAULT_ATTRIBUTE_COUNT_LIMIT: u32 = 128;
/// Default OTLP export timeout in milliseconds.
pub const DEFAULT_OTLP_TIMEOUT_MILLIS: u64 = 10_000;

/// Batch span processor delay in milliseconds.
pub const OTEL_BSP_SCHEDULE_DELAY_DEFAULT: u64 = 5_000;
/// Batch log record processor delay in milliseconds.
pub const OTEL_BLRP_SCHEDULE_DELAY_DEFAULT: u64 = 1_000;
/// Batch processor export timeout in milliseconds.
pub const OTEL_BATCH_EXPORT_TIMEOUT_DEFAULT: u64 = 30_000;
/// Batch processor queue size.
pub const OTEL_BATCH_MAX_QUEUE_SIZE_DEFAULT: u32 = 2_048;
/// Batch processor export batch size.
pub const OTEL_BATCH_MAX_EXPORT_BATCH_SIZE_DEFAULT: u32 = 512;
/// Periodic reader interval in milliseconds.
pub const OTEL_METRIC_EXPORT_INTERVAL_DEFAULT: u64 = 60_000;
/// Periodic reader timeout in milliseconds.
pub const OTEL_METRIC_EXPORT_TIMEOUT_DEFAULT: u64 = 30_000;

fn otlp_http_exporter() -> ExporterFragment {
    ExporterFragment {
        kind: Some(ExporterKind::OtlpHttp),
        otlp: Some(OtlpExporterFragment {
            headers: Some(Vec::new()),
            compression: Some(Compression::None),
            timeout: Some(DEFAULT_OTLP_TIMEOUT_MILLIS),
            encoding: Some(OtlpEncoding::Protobuf),
            insecure: Some(false),
            ..Default::default()
        }),
    }
}

fn batch_processor(schedule_delay: u64) -> ProcessorFragment {
    ProcessorFragment {
        batch: Some(BatchProcessorFragment {
            schedule_delay: Some(schedule_delay),
            export_timeout: Some(OTEL_BATCH_EXPORT_TIMEOUT_DEFAULT),
            max_queue_size: Some(OTEL_BATCH_MAX_QUEUE_SIZE_DEFAULT),
            max_export_batch_size: Some(OTEL_BATCH_MAX_EXPORT_BATCH_SIZE_DEFAULT),
            exporter: Some(otlp_http_exporter()),
        }),
        simple: None,
        exporter: None,
    }
}

/// The compiled default tier.
///
/// Provides a value for every field the resolved model requires. Exporter
/// endpoints are left out on purpose: they depend on the exporter kind and
/// signal and are derived during resolution.
pub fn default_configuration() -> ConfigurationFragment {
    let mut metric_exporter = otlp_http_exporter();
    if let Some(otlp) = metric_exporter.otlp.as_mut() {
        otlp.temporality_preference = Some(TemporalityPreference::Cumulative);
        otlp.default_histogram_aggregation = Some(HistogramAggregation::ExplicitBucketHistogram);
    }

    ConfigurationFragment {
        disabled: Some(false),
        log_level: Some(LogLevel::Info),
        node_resource_detectors: Some(vec!["all".to_string()]),
        resource: Some(ResourceFragment::default()),
        attribute_limits: Some(AttributeLimitsFragment {
            attribute_value_length_limit: None,
            attribute_count_limit: Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT),
        }),
        propagator: Some(PropagatorFragment {
            composite: Some(vec!["tracecontext".to_string(), "baggage".to_string()]),
            composite_list: None,
        }),
        tracer_provider: Some(TracerProviderFragment {
            processors: Some(vec![batch_processor(OTEL_BSP_SCHEDULE_DELAY_DEFAULT)]),
            limits: Some(SpanLimitsFragment {
                attribute_value_length_limit: None,
                attribute_count_limit: Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT),
                event_count_limit: Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT),
                link_count_limit: Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT),
                event_attribute_count_limit: Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT),
                link_attribute_count_limit: Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT),
            }),
            sampler: Some(Sampler::ParentBased(Box::new(Sampler::AlwaysOn))),
        }),
        meter_provider: Some(MeterProviderFragment {
            readers: Some(vec![MetricReaderFragment {
                periodic: Some(PeriodicReaderFragment {
                    interval: Some(OTEL_METRIC_EXPORT_INTERVAL_DEFAULT),
                    timeout: Some(OTEL_METRIC_EXPORT_TIMEOUT_DEFAULT),
                    exporter: Some(metric_exporter),
                }),
            }]),
            exemplar_filter: Some(ExemplarFilter::TraceBased),
        }),
        logger_provider: Some(LoggerProviderFragment {
            processors: Some(vec![batch_processor(OTEL_BLRP_SCHEDULE_DELAY_DEFAULT)]),
            limits: Some(LogRecordLimitsFragment {
                attribute_value_length_limit: None,
                attribute_count_limit: Some(DEFAULT_ATTRIBUTE_COUNT_LIMIT),
            }),
        }),
    }
}
