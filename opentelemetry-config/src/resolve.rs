//! Turns a merged [`ConfigurationFragment`] into a [`ConfigurationModel`].
//!
//! Scalars missing from every explicit tier come from the compiled defaults.
//! Processor and reader lists are taken from the highest tier that defines
//! them; each element is then completed from the default element of the same
//! kind.

use crate::environment::Signal;
use crate::error::ConfigError;
use crate::fragment::{
    AttributeLimitsFragment, ConfigurationFragment, ExporterFragment, LogRecordLimitsFragment,
    LoggerProviderFragment, MeterProviderFragment, MetricReaderFragment, NameValue,
    OtlpExporterFragment, ProcessorFragment, ProcessorKind, PropagatorFragment, ResourceFragment,
    SpanLimitsFragment, TracerProviderFragment,
};
use crate::kv_list::{merge_key_value_lists, parse_key_value_list};
use crate::merge::{merge_nested, Merge};
use crate::model::{
    Attribute, AttributeLimits, AttributeValue, BatchProcessor, ConfigurationModel, Exporter,
    ExporterKind, LogRecordLimits, LoggerProvider, MeterProvider, MetricExporter, MetricReader,
    OtlpExporter, OtlpMetricExporter, PeriodicReader, Processor, Propagator, Resource,
    SimpleProcessor, SpanLimits, TracerProvider,
};

fn required<T>(value: Option<T>, path: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::IncompleteDefaults(path))
}

pub(crate) fn resolve_configuration(
    explicit: ConfigurationFragment,
    defaults: &ConfigurationFragment,
) -> Result<ConfigurationModel, ConfigError> {
    let defaults = defaults.clone();
    Ok(ConfigurationModel {
        disabled: required(explicit.disabled.or(defaults.disabled), "disabled")?,
        log_level: required(explicit.log_level.or(defaults.log_level), "log_level")?,
        node_resource_detectors: required(
            explicit
                .node_resource_detectors
                .or(defaults.node_resource_detectors),
            "node_resource_detectors",
        )?,
        resource: resolve_resource(
            merge_nested(explicit.resource, defaults.resource).unwrap_or_default(),
        ),
        attribute_limits: resolve_attribute_limits(
            merge_nested(explicit.attribute_limits, defaults.attribute_limits).unwrap_or_default(),
        )?,
        propagator: resolve_propagator(
            merge_nested(explicit.propagator, defaults.propagator).unwrap_or_default(),
        ),
        tracer_provider: resolve_tracer_provider(
            explicit.tracer_provider.unwrap_or_default(),
            defaults.tracer_provider.unwrap_or_default(),
        )?,
        meter_provider: resolve_meter_provider(
            explicit.meter_provider.unwrap_or_default(),
            defaults.meter_provider.unwrap_or_default(),
        )?,
        logger_provider: resolve_logger_provider(
            explicit.logger_provider.unwrap_or_default(),
            defaults.logger_provider.unwrap_or_default(),
        )?,
    })
}

fn resolve_resource(resource: ResourceFragment) -> Resource {
    let mut attributes: Vec<Attribute> = resource
        .attributes
        .into_iter()
        .flatten()
        .filter_map(|attribute| {
            Some(Attribute {
                value: attribute.value?,
                name: attribute.name,
            })
        })
        .collect();
    let listed = resource
        .attributes_list
        .as_deref()
        .map(parse_key_value_list)
        .unwrap_or_default();
    for (name, value) in listed {
        if !attributes.iter().any(|attribute| attribute.name == name) {
            attributes.push(Attribute {
                name,
                value: AttributeValue::String(value),
            });
        }
    }
    Resource {
        attributes,
        schema_url: resource.schema_url,
    }
}

fn resolve_attribute_limits(limits: AttributeLimitsFragment) -> Result<AttributeLimits, ConfigError> {
    Ok(AttributeLimits {
        attribute_value_length_limit: limits.attribute_value_length_limit,
        attribute_count_limit: required(
            limits.attribute_count_limit,
            "attribute_limits.attribute_count_limit",
        )?,
    })
}

fn resolve_propagator(propagator: PropagatorFragment) -> Propagator {
    let listed: Vec<String> = propagator
        .composite_list
        .iter()
        .flat_map(|list| list.split(','))
        .map(str::to_owned)
        .collect();
    let mut composite: Vec<String> = Vec::new();
    for name in propagator.composite.into_iter().flatten().chain(listed) {
        let name = name.trim();
        if name.is_empty() || name == "none" || composite.iter().any(|seen| seen == name) {
            continue;
        }
        composite.push(name.to_owned());
    }
    Propagator { composite }
}

fn resolve_headers(headers: Option<Vec<NameValue>>, headers_list: Option<String>) -> Vec<(String, String)> {
    let structured = headers
        .into_iter()
        .flatten()
        .filter_map(|header| Some((header.name, header.value?)))
        .collect();
    let listed = headers_list
        .as_deref()
        .map(parse_key_value_list)
        .unwrap_or_default();
    merge_key_value_lists(structured, listed)
}

fn resolve_tracer_provider(
    explicit: TracerProviderFragment,
    defaults: TracerProviderFragment,
) -> Result<TracerProvider, ConfigError> {
    let templates = defaults.processors.unwrap_or_default();
    let limits: SpanLimitsFragment = merge_nested(explicit.limits, defaults.limits).unwrap_or_default();
    Ok(TracerProvider {
        processors: resolve_processors(
            explicit.processors.unwrap_or_else(|| templates.clone()),
            &templates,
            Signal::Traces,
        )?,
        limits: SpanLimits {
            attribute_value_length_limit: limits.attribute_value_length_limit,
            attribute_count_limit: required(
                limits.attribute_count_limit,
                "tracer_provider.limits.attribute_count_limit",
            )?,
            event_count_limit: required(
                limits.event_count_limit,
                "tracer_provider.limits.event_count_limit",
            )?,
            link_count_limit: required(
                limits.link_count_limit,
                "tracer_provider.limits.link_count_limit",
            )?,
            event_attribute_count_limit: required(
                limits.event_attribute_count_limit,
                "tracer_provider.limits.event_attribute_count_limit",
            )?,
            link_attribute_count_limit: required(
                limits.link_attribute_count_limit,
                "tracer_provider.limits.link_attribute_count_limit",
            )?,
        },
        sampler: required(
            explicit.sampler.or(defaults.sampler),
            "tracer_provider.sampler",
        )?,
    })
}

fn resolve_logger_provider(
    explicit: LoggerProviderFragment,
    defaults: LoggerProviderFragment,
) -> Result<LoggerProvider, ConfigError> {
    let templates = defaults.processors.unwrap_or_default();
    let limits: LogRecordLimitsFragment =
        merge_nested(explicit.limits, defaults.limits).unwrap_or_default();
    Ok(LoggerProvider {
        processors: resolve_processors(
            explicit.processors.unwrap_or_else(|| templates.clone()),
            &templates,
            Signal::Logs,
        )?,
        limits: LogRecordLimits {
            attribute_value_length_limit: limits.attribute_value_length_limit,
            attribute_count_limit: required(
                limits.attribute_count_limit,
                "logger_provider.limits.attribute_count_limit",
            )?,
        },
    })
}

fn resolve_meter_provider(
    explicit: MeterProviderFragment,
    defaults: MeterProviderFragment,
) -> Result<MeterProvider, ConfigError> {
    let templates = defaults.readers.unwrap_or_default();
    let readers = explicit.readers.unwrap_or_else(|| templates.clone());
    let periodic_template = templates
        .iter()
        .find_map(|reader| reader.periodic.clone())
        .unwrap_or_default();

    let mut resolved = Vec::with_capacity(readers.len());
    for (index, reader) in readers.into_iter().enumerate() {
        let reader = match (&reader.periodic, templates.get(index)) {
            (None, Some(template)) => reader.merge(template.clone()),
            _ => reader,
        };
        let MetricReaderFragment { periodic } = reader;
        let Some(mut periodic) = periodic else {
            return Err(ConfigError::invalid(
                "meter_provider.readers",
                format!("reader {index} does not declare a kind"),
            ));
        };
        let exporter = periodic.exporter.take();
        let periodic = periodic.merge(periodic_template.clone());
        resolved.push(MetricReader::Periodic(PeriodicReader {
            interval: required(periodic.interval, "meter_provider.readers.periodic.interval")?,
            timeout: required(periodic.timeout, "meter_provider.readers.periodic.timeout")?,
            exporter: resolve_metric_exporter(exporter, periodic_template.exporter.as_ref())?,
        }));
    }

    Ok(MeterProvider {
        readers: resolved,
        exemplar_filter: required(
            explicit.exemplar_filter.or(defaults.exemplar_filter),
            "meter_provider.exemplar_filter",
        )?,
    })
}

fn resolve_processors(
    processors: Vec<ProcessorFragment>,
    templates: &[ProcessorFragment],
    signal: Signal,
) -> Result<Vec<Processor>, ConfigError> {
    let batch_template = templates
        .iter()
        .find_map(|template| template.batch.clone())
        .unwrap_or_default();
    let exporter_template = templates.iter().find_map(|template| {
        template
            .batch
            .as_ref()
            .and_then(|batch| batch.exporter.clone())
            .or_else(|| template.simple.as_ref().and_then(|simple| simple.exporter.clone()))
    });

    let mut resolved = Vec::with_capacity(processors.len());
    for (index, processor) in processors.into_iter().enumerate() {
        let processor = match (processor.kind(), templates.get(index)) {
            (None, Some(template)) => processor.merge(template.clone()),
            _ => processor,
        }
        .settle();
        let processor = match processor.kind() {
            Some(ProcessorKind::Batch) => {
                let mut batch = processor.batch.unwrap_or_default();
                let exporter = batch.exporter.take();
                let batch = batch.merge(batch_template.clone());
                Processor::Batch(BatchProcessor {
                    schedule_delay: required(batch.schedule_delay, "processors.batch.schedule_delay")?,
                    export_timeout: required(batch.export_timeout, "processors.batch.export_timeout")?,
                    max_queue_size: required(batch.max_queue_size, "processors.batch.max_queue_size")?,
                    max_export_batch_size: required(
                        batch.max_export_batch_size,
                        "processors.batch.max_export_batch_size",
                    )?,
                    exporter: resolve_exporter(exporter, exporter_template.as_ref(), signal)?,
                })
            }
            Some(ProcessorKind::Simple) => {
                let exporter = processor.simple.and_then(|simple| simple.exporter);
                Processor::Simple(SimpleProcessor {
                    exporter: resolve_exporter(exporter, exporter_template.as_ref(), signal)?,
                })
            }
            None => {
                return Err(ConfigError::invalid(
                    format!("{signal} processors"),
                    format!("processor {index} does not declare a kind"),
                ))
            }
        };
        resolved.push(processor);
    }
    Ok(resolved)
}

/// Completes `exporter` from `template`. OTLP settings of a template of
/// another kind still apply, except for its endpoint.
fn complete_exporter(
    exporter: Option<ExporterFragment>,
    template: Option<&ExporterFragment>,
) -> Result<(ExporterKind, OtlpExporterFragment), ConfigError> {
    let exporter = exporter.unwrap_or_default();
    let template = template.cloned().unwrap_or_default();
    let kind = required(exporter.kind.or(template.kind), "exporter")?;
    let mut template_otlp = template.otlp.unwrap_or_default();
    if template.kind != Some(kind) {
        template_otlp.endpoint = None;
        template_otlp.endpoint_base = None;
    }
    Ok((kind, exporter.otlp.unwrap_or_default().merge(template_otlp)))
}

fn resolve_otlp(
    kind: ExporterKind,
    otlp: OtlpExporterFragment,
    signal: Signal,
) -> Result<OtlpExporter, ConfigError> {
    Ok(OtlpExporter {
        endpoint: required(
            otlp.endpoint
                .or_else(|| {
                    otlp.endpoint_base.map(|base| match kind {
                        ExporterKind::OtlpHttp => signal.append_resource_path(&base),
                        ExporterKind::OtlpGrpc | ExporterKind::Console => base,
                    })
                })
                .or_else(|| kind.default_endpoint(signal)),
            "exporter.endpoint",
        )?,
        certificate: otlp.certificate,
        client_key: otlp.client_key,
        client_certificate: otlp.client_certificate,
        headers: resolve_headers(otlp.headers, otlp.headers_list),
        compression: required(otlp.compression, "exporter.compression")?,
        timeout: required(otlp.timeout, "exporter.timeout")?,
        encoding: required(otlp.encoding, "exporter.encoding")?,
        insecure: required(otlp.insecure, "exporter.insecure")?,
    })
}

fn resolve_exporter(
    exporter: Option<ExporterFragment>,
    template: Option<&ExporterFragment>,
    signal: Signal,
) -> Result<Exporter, ConfigError> {
    let (kind, otlp) = complete_exporter(exporter, template)?;
    Ok(match kind {
        ExporterKind::OtlpHttp => Exporter::OtlpHttp(resolve_otlp(kind, otlp, signal)?),
        ExporterKind::OtlpGrpc => Exporter::OtlpGrpc(resolve_otlp(kind, otlp, signal)?),
        ExporterKind::Console => Exporter::Console,
    })
}

fn resolve_metric_exporter(
    exporter: Option<ExporterFragment>,
    template: Option<&ExporterFragment>,
) -> Result<MetricExporter, ConfigError> {
    let (kind, otlp) = complete_exporter(exporter, template)?;
    let metric_exporter = |otlp: OtlpExporterFragment| -> Result<OtlpMetricExporter, ConfigError> {
        Ok(OtlpMetricExporter {
            temporality_preference: required(
                otlp.temporality_preference,
                "meter_provider.readers.periodic.exporter.temporality_preference",
            )?,
            default_histogram_aggregation: required(
                otlp.default_histogram_aggregation,
                "meter_provider.readers.periodic.exporter.default_histogram_aggregation",
            )?,
            otlp: resolve_otlp(kind, otlp, Signal::Metrics)?,
        })
    };
    Ok(match kind {
        ExporterKind::OtlpHttp => MetricExporter::OtlpHttp(metric_exporter(otlp)?),
        ExporterKind::OtlpGrpc => MetricExporter::OtlpGrpc(metric_exporter(otlp)?),
        ExporterKind::Console => MetricExporter::Console,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_configuration;
    use crate::fragment::{AttributeFragment, BatchProcessorFragment, SimpleProcessorFragment};
    use crate::model::{Compression, TemporalityPreference};

    fn resolve(explicit: ConfigurationFragment) -> ConfigurationModel {
        resolve_configuration(explicit, &default_configuration()).expect("complete defaults")
    }

    #[test]
    fn test_incomplete_defaults_is_an_error() {
        let mut defaults = default_configuration();
        defaults.log_level = None;
        let err = resolve_configuration(ConfigurationFragment::default(), &defaults).unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteDefaults("log_level")));
    }

    #[test]
    fn test_structured_headers_win_over_list() {
        let otlp = OtlpExporterFragment {
            headers: Some(vec![NameValue::new("api-key", "1234")]),
            headers_list: Some("api-key=override,tenant=a".into()),
            ..Default::default()
        };
        let config = resolve(ConfigurationFragment {
            tracer_provider: Some(TracerProviderFragment {
                processors: Some(vec![ProcessorFragment {
                    batch: Some(BatchProcessorFragment {
                        exporter: Some(ExporterFragment {
                            kind: Some(ExporterKind::OtlpHttp),
                            otlp: Some(otlp),
                        }),
                        ..Default::default()
                    }),
                    simple: None,
                    exporter: None,
                }]),
                ..Default::default()
            }),
            ..Default::default()
        });
        let Exporter::OtlpHttp(exporter) = config.tracer_provider.processors[0].exporter() else {
            panic!("expected an OTLP/HTTP exporter");
        };
        assert_eq!(
            exporter.headers,
            vec![
                ("api-key".to_string(), "1234".to_string()),
                ("tenant".to_string(), "a".to_string())
            ]
        );
        assert_eq!(exporter.endpoint, "http://localhost:4318/v1/traces");
    }

    #[test]
    fn test_list_elements_are_completed_from_templates() {
        let config = resolve(ConfigurationFragment {
            logger_provider: Some(LoggerProviderFragment {
                processors: Some(vec![
                    ProcessorFragment {
                        batch: None,
                        simple: Some(SimpleProcessorFragment {
                            exporter: Some(ExporterFragment::of_kind(ExporterKind::Console)),
                        }),
                        exporter: None,
                    },
                    ProcessorFragment {
                        batch: Some(BatchProcessorFragment {
                            max_queue_size: Some(10),
                            exporter: Some(ExporterFragment::of_kind(ExporterKind::OtlpGrpc)),
                            ..Default::default()
                        }),
                        simple: None,
                        exporter: None,
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        });
        let processors = &config.logger_provider.processors;
        assert_eq!(processors.len(), 2);
        assert_eq!(processors[0].exporter(), &Exporter::Console);
        let Processor::Batch(batch) = &processors[1] else {
            panic!("expected a batch processor");
        };
        assert_eq!(batch.max_queue_size, 10);
        assert_eq!(batch.schedule_delay, 1000);
        let Exporter::OtlpGrpc(exporter) = &batch.exporter else {
            panic!("expected an OTLP/gRPC exporter");
        };
        assert_eq!(exporter.endpoint, "http://localhost:4317");
        assert_eq!(exporter.timeout, 10000);
        assert_eq!(exporter.compression, Compression::None);
    }

    #[test]
    fn test_metric_exporter_defaults() {
        let config = resolve(ConfigurationFragment::default());
        let MetricReader::Periodic(reader) = &config.meter_provider.readers[0];
        let MetricExporter::OtlpHttp(exporter) = &reader.exporter else {
            panic!("expected an OTLP/HTTP exporter");
        };
        assert_eq!(
            exporter.temporality_preference,
            TemporalityPreference::Cumulative
        );
        assert_eq!(exporter.otlp.endpoint, "http://localhost:4318/v1/metrics");
    }

    #[test]
    fn test_resource_structured_attributes_win() {
        let config = resolve(ConfigurationFragment {
            resource: Some(ResourceFragment {
                attributes: Some(vec![
                    AttributeFragment::new("service.name", "checkout"),
                    AttributeFragment {
                        name: "dropped".into(),
                        value: None,
                    },
                ]),
                attributes_list: Some("service.name=ignored,host.name=web-1".into()),
                schema_url: None,
            }),
            ..Default::default()
        });
        assert_eq!(
            config.resource.get("service.name"),
            Some(&AttributeValue::from("checkout"))
        );
        assert_eq!(
            config.resource.get("host.name"),
            Some(&AttributeValue::from("web-1"))
        );
        assert_eq!(config.resource.get("dropped"), None);
    }

    #[test]
    fn test_propagators_deduplicated_and_none_dropped() {
        let config = resolve(ConfigurationFragment {
            propagator: Some(PropagatorFragment {
                composite: Some(vec!["tracecontext".into(), "none".into()]),
                composite_list: Some("baggage, tracecontext,,b3".into()),
            }),
            ..Default::default()
        });
        assert_eq!(
            config.propagator.composite,
            vec!["tracecontext", "baggage", "b3"]
        );
    }
}
