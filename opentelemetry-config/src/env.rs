//! # Environment tier
//!
//! [`EnvConfigExtractor`] reads the `OTEL_*` variables of an [`Environment`]
//! into a [`ConfigurationFragment`]. Malformed values never fail extraction:
//! they are reported through internal logging and treated as absent so the
//! next tier supplies the value.

use crate::environment::{otlp_var, Environment, Signal};
use crate::error::ConfigError;
use crate::fragment::{
    AttributeFragment, AttributeLimitsFragment, BatchProcessorFragment, ConfigurationFragment,
    ExporterFragment, LogRecordLimitsFragment, LoggerProviderFragment, MeterProviderFragment,
    MetricReaderFragment, OtlpExporterFragment, PeriodicReaderFragment, ProcessorFragment,
    PropagatorFragment, ResourceFragment, SpanLimitsFragment, TracerProviderFragment,
};
use crate::merge::{fold_tiers, merge_key_value_strings};
use crate::model::{ExporterKind, OtlpEncoding, Sampler};
use opentelemetry::otel_warn;
use std::str::FromStr;

/// Disables the SDK when `true`.
pub const OTEL_SDK_DISABLED: &str = "OTEL_SDK_DISABLED";
/// Verbosity of SDK diagnostics.
pub const OTEL_LOG_LEVEL: &str = "OTEL_LOG_LEVEL";
/// Comma separated resource detectors.
pub const OTEL_NODE_RESOURCE_DETECTORS: &str = "OTEL_NODE_RESOURCE_DETECTORS";
/// Resource attributes in `key=value,...` form.
pub const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
/// Value of the `service.name` resource attribute.
pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
/// Comma separated propagator names.
pub const OTEL_PROPAGATORS: &str = "OTEL_PROPAGATORS";
/// Maximum length of attribute values, for every signal.
pub const OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT: &str = "OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT";
/// Maximum number of attributes, for every signal.
pub const OTEL_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_ATTRIBUTE_COUNT_LIMIT";
/// Sampler name.
pub const OTEL_TRACES_SAMPLER: &str = "OTEL_TRACES_SAMPLER";
/// Sampler argument, the ratio for ratio based samplers.
pub const OTEL_TRACES_SAMPLER_ARG: &str = "OTEL_TRACES_SAMPLER_ARG";
/// Exemplar filter of the meter provider.
pub const OTEL_METRICS_EXEMPLAR_FILTER: &str = "OTEL_METRICS_EXEMPLAR_FILTER";
/// Periodic reader interval in milliseconds.
pub const OTEL_METRIC_EXPORT_INTERVAL: &str = "OTEL_METRIC_EXPORT_INTERVAL";
/// Periodic reader timeout in milliseconds.
pub const OTEL_METRIC_EXPORT_TIMEOUT: &str = "OTEL_METRIC_EXPORT_TIMEOUT";

fn non_empty<T: Default + PartialEq>(value: T) -> Option<T> {
    (value != T::default()).then_some(value)
}

/// Builds the environment tier from an [`Environment`] snapshot.
#[derive(Clone, Copy, Debug)]
pub struct EnvConfigExtractor<'a> {
    env: &'a Environment,
}

impl<'a> EnvConfigExtractor<'a> {
    /// Creates an extractor reading from `env`.
    pub fn new(env: &'a Environment) -> Self {
        EnvConfigExtractor { env }
    }

    /// Settings that do not belong to a single signal: SDK switches, resource,
    /// attribute limits and propagators.
    pub fn extract_common(&self) -> ConfigurationFragment {
        let service_name = self
            .env
            .get(OTEL_SERVICE_NAME)
            .map(|name| vec![AttributeFragment::new("service.name", name)]);

        ConfigurationFragment {
            disabled: self.env.get_bool(OTEL_SDK_DISABLED),
            log_level: self.parse(OTEL_LOG_LEVEL),
            node_resource_detectors: self.env.get_list(OTEL_NODE_RESOURCE_DETECTORS),
            resource: non_empty(ResourceFragment {
                attributes: service_name,
                attributes_list: self.env.get(OTEL_RESOURCE_ATTRIBUTES).map(str::to_owned),
                schema_url: None,
            }),
            attribute_limits: non_empty(AttributeLimitsFragment {
                attribute_value_length_limit: self.env.get_number(OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT),
                attribute_count_limit: self.env.get_number(OTEL_ATTRIBUTE_COUNT_LIMIT),
            }),
            propagator: self.env.get_list(OTEL_PROPAGATORS).map(|names| PropagatorFragment {
                composite: Some(names),
                composite_list: None,
            }),
            ..Default::default()
        }
    }

    /// Settings of the provider handling `signal`. The returned fragment only
    /// sets the provider of that signal.
    pub fn extract(&self, signal: Signal) -> ConfigurationFragment {
        match signal {
            Signal::Traces => ConfigurationFragment {
                tracer_provider: self.tracer_provider(),
                ..Default::default()
            },
            Signal::Metrics => ConfigurationFragment {
                meter_provider: self.meter_provider(),
                ..Default::default()
            },
            Signal::Logs => ConfigurationFragment {
                logger_provider: self.logger_provider(),
                ..Default::default()
            },
        }
    }

    /// The complete environment tier: common settings and every signal.
    pub fn extract_all(&self) -> ConfigurationFragment {
        let tiers = std::iter::once(Some(self.extract_common()))
            .chain(Signal::ALL.iter().map(|signal| Some(self.extract(*signal))));
        fold_tiers(tiers).unwrap_or_default()
    }

    fn parse<T: FromStr<Err = ConfigError>>(&self, name: &str) -> Option<T> {
        let raw = self.env.get(name)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(err) => {
                otel_warn!(
                    name: "Config.Env.InvalidValue",
                    message = format!("{name} is set to '{raw}' which is not supported ({err}). The value is ignored")
                );
                None
            }
        }
    }

    /// Reads `OTEL_EXPORTER_OTLP_<SIGNAL>_<NAME>` with `read`, then
    /// `OTEL_EXPORTER_OTLP_<NAME>` when the first is unset or malformed.
    fn otlp_read<T>(&self, signal: Signal, name: &str, read: impl Fn(&str) -> Option<T>) -> Option<T> {
        read(&otlp_var(Some(signal), name)).or_else(|| read(&otlp_var(None, name)))
    }

    fn otlp_parse<T: FromStr<Err = ConfigError>>(&self, signal: Signal, name: &str) -> Option<T> {
        self.otlp_read(signal, name, |var| self.parse(var))
    }

    fn tracer_provider(&self) -> Option<TracerProviderFragment> {
        let limits = SpanLimitsFragment {
            attribute_value_length_limit: self.number_either(
                "OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT",
                OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT,
            ),
            attribute_count_limit: self
                .number_either("OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT", OTEL_ATTRIBUTE_COUNT_LIMIT),
            event_count_limit: self.env.get_number("OTEL_SPAN_EVENT_COUNT_LIMIT"),
            link_count_limit: self.env.get_number("OTEL_SPAN_LINK_COUNT_LIMIT"),
            event_attribute_count_limit: self.env.get_number("OTEL_EVENT_ATTRIBUTE_COUNT_LIMIT"),
            link_attribute_count_limit: self.env.get_number("OTEL_LINK_ATTRIBUTE_COUNT_LIMIT"),
        };
        non_empty(TracerProviderFragment {
            processors: self.processor("OTEL_BSP", Signal::Traces),
            limits: non_empty(limits),
            sampler: self.sampler(),
        })
    }

    fn logger_provider(&self) -> Option<LoggerProviderFragment> {
        let limits = LogRecordLimitsFragment {
            attribute_value_length_limit: self.number_either(
                "OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT",
                OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT,
            ),
            attribute_count_limit: self
                .number_either("OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT", OTEL_ATTRIBUTE_COUNT_LIMIT),
        };
        non_empty(LoggerProviderFragment {
            processors: self.processor("OTEL_BLRP", Signal::Logs),
            limits: non_empty(limits),
        })
    }

    fn meter_provider(&self) -> Option<MeterProviderFragment> {
        let reader = PeriodicReaderFragment {
            interval: self.env.get_number(OTEL_METRIC_EXPORT_INTERVAL),
            timeout: self.env.get_number(OTEL_METRIC_EXPORT_TIMEOUT),
            exporter: self.exporter(Signal::Metrics),
        };
        non_empty(MeterProviderFragment {
            readers: non_empty(reader).map(|periodic| {
                vec![MetricReaderFragment {
                    periodic: Some(periodic),
                }]
            }),
            exemplar_filter: self.parse(OTEL_METRICS_EXEMPLAR_FILTER),
        })
    }

    fn number_either<T: FromStr>(&self, specific: &str, generic: &str) -> Option<T> {
        self.env
            .get_number(specific)
            .or_else(|| self.env.get_number(generic))
    }

    /// Only `<prefix>_*` variables declare a batch processor. Exporter
    /// settings alone leave the kind to lower tiers.
    fn processor(&self, prefix: &str, signal: Signal) -> Option<Vec<ProcessorFragment>> {
        let batch = BatchProcessorFragment {
            schedule_delay: self.env.get_number(&format!("{prefix}_SCHEDULE_DELAY")),
            export_timeout: self.env.get_number(&format!("{prefix}_EXPORT_TIMEOUT")),
            max_queue_size: self.env.get_number(&format!("{prefix}_MAX_QUEUE_SIZE")),
            max_export_batch_size: self.env.get_number(&format!("{prefix}_MAX_EXPORT_BATCH_SIZE")),
            exporter: None,
        };
        non_empty(ProcessorFragment {
            batch: non_empty(batch),
            simple: None,
            exporter: self.exporter(signal),
        })
        .map(|processor| vec![processor])
    }

    fn exporter(&self, signal: Signal) -> Option<ExporterFragment> {
        let (kind, encoding) = self
            .otlp_read(signal, "PROTOCOL", |var| self.protocol(var))
            .map_or((None, None), |(kind, encoding)| (Some(kind), encoding));

        // the generic endpoint is a base URL, completed once the kind is known
        let signal_endpoint = self.env.get(&otlp_var(Some(signal), "ENDPOINT"));
        let endpoint_base = match signal_endpoint {
            Some(_) => None,
            None => self.env.get(&otlp_var(None, "ENDPOINT")),
        };

        let path = |name: &str| {
            self.otlp_read(signal, name, |var| self.env.get(var))
                .map(|path| self.env.resolve_path(path))
        };

        let (temporality_preference, default_histogram_aggregation) = match signal {
            Signal::Metrics => (
                self.parse(&otlp_var(Some(signal), "TEMPORALITY_PREFERENCE")),
                self.parse(&otlp_var(Some(signal), "DEFAULT_HISTOGRAM_AGGREGATION")),
            ),
            Signal::Traces | Signal::Logs => (None, None),
        };

        let otlp = OtlpExporterFragment {
            endpoint: signal_endpoint.map(str::to_owned),
            endpoint_base: endpoint_base.map(str::to_owned),
            certificate: path("CERTIFICATE"),
            client_key: path("CLIENT_KEY"),
            client_certificate: path("CLIENT_CERTIFICATE"),
            headers: None,
            headers_list: merge_key_value_strings(
                self.env.get(&otlp_var(Some(signal), "HEADERS")).map(str::to_owned),
                self.env.get(&otlp_var(None, "HEADERS")).map(str::to_owned),
            ),
            compression: self.otlp_parse(signal, "COMPRESSION"),
            timeout: self.otlp_read(signal, "TIMEOUT", |var| self.env.get_number(var)),
            encoding,
            insecure: self.otlp_read(signal, "INSECURE", |var| self.env.get_bool(var)),
            temporality_preference,
            default_histogram_aggregation,
        };

        non_empty(ExporterFragment {
            kind,
            otlp: non_empty(otlp),
        })
    }

    fn protocol(&self, var: &str) -> Option<(ExporterKind, Option<OtlpEncoding>)> {
        let raw = self.env.get(var)?;
        match raw.to_ascii_lowercase().as_str() {
            "grpc" => Some((ExporterKind::OtlpGrpc, None)),
            "http/protobuf" => Some((ExporterKind::OtlpHttp, Some(OtlpEncoding::Protobuf))),
            "http/json" => Some((ExporterKind::OtlpHttp, Some(OtlpEncoding::Json))),
            _ => {
                otel_warn!(
                    name: "Config.Env.UnsupportedProtocol",
                    message = format!("{var} is set to '{raw}'. Valid values are: grpc, http/protobuf, http/json. The value is ignored")
                );
                None
            }
        }
    }

    fn sampler(&self) -> Option<Sampler> {
        let sampler = self.env.get(OTEL_TRACES_SAMPLER)?;
        let sampler_arg = self.env.get(OTEL_TRACES_SAMPLER_ARG);
        let ratio = || {
            let ratio = sampler_arg
                .and_then(|arg| arg.parse::<f64>().ok())
                .filter(|ratio| (0.0..=1.0).contains(ratio));
            if ratio.is_none() {
                otel_warn!(
                    name: "Config.Env.InvalidSamplerArgument",
                    message = format!("{OTEL_TRACES_SAMPLER} is set to '{sampler}' but {OTEL_TRACES_SAMPLER_ARG} is missing or invalid. It must be a float between 0.0 and 1.0. Falling back to default ratio: 1.0"),
                    otel_traces_sampler_arg = format!("{sampler_arg:?}")
                );
            }
            ratio.unwrap_or(1.0)
        };

        match sampler {
            "always_on" => Some(Sampler::AlwaysOn),
            "always_off" => Some(Sampler::AlwaysOff),
            "traceidratio" => Some(Sampler::TraceIdRatioBased(ratio())),
            "parentbased_always_on" => Some(Sampler::ParentBased(Box::new(Sampler::AlwaysOn))),
            "parentbased_always_off" => Some(Sampler::ParentBased(Box::new(Sampler::AlwaysOff))),
            "parentbased_traceidratio" => Some(Sampler::ParentBased(Box::new(
                Sampler::TraceIdRatioBased(ratio()),
            ))),
            "parentbased_jaeger_remote" | "jaeger_remote" | "xray" => {
                otel_warn!(
                    name: "Config.Env.UnsupportedSampler",
                    message = format!("{OTEL_TRACES_SAMPLER} is set to '{sampler}' which is not supported. The value is ignored")
                );
                None
            }
            other => {
                otel_warn!(
                    name: "Config.Env.InvalidSamplerType",
                    message = format!("Unrecognized sampler type '{other}' in {OTEL_TRACES_SAMPLER}. Valid values are: always_on, always_off, traceidratio, parentbased_always_on, parentbased_always_off, parentbased_traceidratio. The value is ignored")
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Compression, LogLevel, TemporalityPreference};
    use rstest::rstest;
    use std::path::PathBuf;

    fn otlp(fragment: &ConfigurationFragment) -> OtlpExporterFragment {
        fragment
            .tracer_provider
            .as_ref()
            .and_then(|provider| provider.processors.as_ref())
            .and_then(|processors| processors[0].exporter.as_ref())
            .and_then(|exporter| exporter.otlp.clone())
            .expect("an OTLP exporter fragment")
    }

    #[test]
    fn test_empty_environment_yields_empty_fragment() {
        let env = Environment::empty();
        assert_eq!(
            EnvConfigExtractor::new(&env).extract_all(),
            ConfigurationFragment::default()
        );
    }

    #[test]
    fn test_common_settings() {
        let env = Environment::from_iter([
            (OTEL_SDK_DISABLED, "TRUE"),
            (OTEL_LOG_LEVEL, "debug"),
            (OTEL_PROPAGATORS, "tracecontext, b3,"),
            (OTEL_SERVICE_NAME, "checkout"),
            (OTEL_RESOURCE_ATTRIBUTES, "host.name=web-1"),
            (OTEL_ATTRIBUTE_COUNT_LIMIT, "0"),
        ]);
        let fragment = EnvConfigExtractor::new(&env).extract_common();
        assert_eq!(fragment.disabled, Some(true));
        assert_eq!(fragment.log_level, Some(LogLevel::Debug));
        assert_eq!(
            fragment.propagator.unwrap().composite,
            Some(vec!["tracecontext".to_string(), "b3".to_string()])
        );
        let resource = fragment.resource.unwrap();
        assert_eq!(
            resource.attributes,
            Some(vec![AttributeFragment::new("service.name", "checkout")])
        );
        assert_eq!(resource.attributes_list.as_deref(), Some("host.name=web-1"));
        // zero is an explicit value
        assert_eq!(fragment.attribute_limits.unwrap().attribute_count_limit, Some(0));
    }

    #[test]
    fn test_invalid_values_are_absent() {
        let env = Environment::from_iter([
            (OTEL_LOG_LEVEL, "loud"),
            (OTEL_SDK_DISABLED, "yes"),
            ("OTEL_BSP_SCHEDULE_DELAY", "soon"),
            ("OTEL_EXPORTER_OTLP_COMPRESSION", "brotli"),
        ]);
        assert_eq!(
            EnvConfigExtractor::new(&env).extract_all(),
            ConfigurationFragment::default()
        );
    }

    #[rstest]
    #[case::http_default(None, None)]
    #[case::http_json(Some("http/json"), Some(ExporterKind::OtlpHttp))]
    #[case::grpc(Some("grpc"), Some(ExporterKind::OtlpGrpc))]
    fn test_generic_endpoint_is_a_base(
        #[case] protocol: Option<&str>,
        #[case] kind: Option<ExporterKind>,
    ) {
        let mut vars = vec![("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4318")];
        if let Some(protocol) = protocol {
            vars.push(("OTEL_EXPORTER_OTLP_PROTOCOL", protocol));
        }
        let env = Environment::from_iter(vars);
        let fragment = EnvConfigExtractor::new(&env).extract(Signal::Traces);
        let processor = &fragment.tracer_provider.as_ref().unwrap().processors.as_ref().unwrap()[0];
        // exporter settings alone do not pick a processor kind
        assert_eq!(processor.kind(), None);
        assert_eq!(processor.exporter.as_ref().unwrap().kind, kind);
        let otlp = otlp(&fragment);
        assert_eq!(otlp.endpoint, None);
        assert_eq!(otlp.endpoint_base.as_deref(), Some("http://collector:4318"));
    }

    #[test]
    fn test_batch_settings_declare_batch_processor() {
        let env = Environment::from_iter([("OTEL_BLRP_SCHEDULE_DELAY", "250")]);
        let processors = EnvConfigExtractor::new(&env)
            .extract(Signal::Logs)
            .logger_provider
            .and_then(|provider| provider.processors)
            .unwrap();
        assert_eq!(processors[0].kind(), Some(crate::fragment::ProcessorKind::Batch));
        assert_eq!(processors[0].batch.as_ref().unwrap().schedule_delay, Some(250));
        assert_eq!(processors[0].exporter, None);
    }

    #[test]
    fn test_malformed_signal_value_falls_back_to_generic() {
        let env = Environment::from_iter([
            ("OTEL_EXPORTER_OTLP_TRACES_TIMEOUT", "abc"),
            ("OTEL_EXPORTER_OTLP_TIMEOUT", "2000"),
            ("OTEL_EXPORTER_OTLP_TRACES_COMPRESSION", "brotli"),
            ("OTEL_EXPORTER_OTLP_COMPRESSION", "gzip"),
            ("OTEL_EXPORTER_OTLP_TRACES_INSECURE", "maybe"),
            ("OTEL_EXPORTER_OTLP_INSECURE", "true"),
            ("OTEL_EXPORTER_OTLP_TRACES_PROTOCOL", "thrift"),
            ("OTEL_EXPORTER_OTLP_PROTOCOL", "grpc"),
            ("OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT", "many"),
            (OTEL_ATTRIBUTE_COUNT_LIMIT, "16"),
        ]);
        let fragment = EnvConfigExtractor::new(&env).extract(Signal::Traces);
        let otlp = otlp(&fragment);
        assert_eq!(otlp.timeout, Some(2000));
        assert_eq!(otlp.compression, Some(Compression::Gzip));
        assert_eq!(otlp.insecure, Some(true));
        let provider = fragment.tracer_provider.unwrap();
        assert_eq!(
            provider.processors.unwrap()[0].exporter.as_ref().unwrap().kind,
            Some(ExporterKind::OtlpGrpc)
        );
        assert_eq!(provider.limits.unwrap().attribute_count_limit, Some(16));
    }

    #[test]
    fn test_signal_specific_settings_win() {
        let env = Environment::from_iter([
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://generic:4318"),
            ("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT", "http://traces:4318/custom"),
            ("OTEL_EXPORTER_OTLP_TIMEOUT", "2000"),
            ("OTEL_EXPORTER_OTLP_TRACES_TIMEOUT", "3000"),
            ("OTEL_EXPORTER_OTLP_HEADERS", "a=generic,b=generic"),
            ("OTEL_EXPORTER_OTLP_TRACES_HEADERS", "a=traces"),
            ("OTEL_EXPORTER_OTLP_TRACES_COMPRESSION", "gzip"),
            ("OTEL_EXPORTER_OTLP_INSECURE", "true"),
        ]);
        let otlp = otlp(&EnvConfigExtractor::new(&env).extract(Signal::Traces));
        assert_eq!(otlp.endpoint.as_deref(), Some("http://traces:4318/custom"));
        assert_eq!(otlp.timeout, Some(3000));
        assert_eq!(otlp.compression, Some(Compression::Gzip));
        assert_eq!(otlp.insecure, Some(true));
        assert_eq!(
            crate::kv_list::parse_key_value_list(&otlp.headers_list.unwrap()),
            vec![
                ("a".to_string(), "traces".to_string()),
                ("b".to_string(), "generic".to_string())
            ]
        );
    }

    #[test]
    fn test_empty_endpoint_is_absent() {
        let env = Environment::from_iter([
            ("OTEL_EXPORTER_OTLP_LOGS_ENDPOINT", " "),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", ""),
        ]);
        assert_eq!(
            EnvConfigExtractor::new(&env).extract(Signal::Logs),
            ConfigurationFragment::default()
        );
    }

    #[test]
    fn test_certificate_paths_resolve_against_working_dir() {
        let env = Environment::from_iter([("OTEL_EXPORTER_OTLP_CERTIFICATE", "certs/ca.pem")])
            .with_working_dir("/srv/app");
        let otlp = otlp(&EnvConfigExtractor::new(&env).extract(Signal::Traces));
        assert_eq!(otlp.certificate, Some(PathBuf::from("/srv/app/certs/ca.pem")));
    }

    #[test]
    fn test_metrics_settings() {
        let env = Environment::from_iter([
            (OTEL_METRIC_EXPORT_INTERVAL, "1000"),
            ("OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE", "Delta"),
            ("OTEL_EXPORTER_OTLP_TRACES_TEMPORALITY_PREFERENCE", "delta"),
        ]);
        let extractor = EnvConfigExtractor::new(&env);
        let meter_provider = extractor.extract(Signal::Metrics).meter_provider.unwrap();
        let periodic = meter_provider.readers.unwrap()[0].periodic.clone().unwrap();
        assert_eq!(periodic.interval, Some(1000));
        assert_eq!(
            periodic.exporter.unwrap().otlp.unwrap().temporality_preference,
            Some(TemporalityPreference::Delta)
        );
        // temporality is a metrics only setting
        assert_eq!(extractor.extract(Signal::Traces), ConfigurationFragment::default());
    }

    #[rstest]
    #[case("always_on", None, Some(Sampler::AlwaysOn))]
    #[case("traceidratio", Some("0.5"), Some(Sampler::TraceIdRatioBased(0.5)))]
    #[case("traceidratio", Some("1.5"), Some(Sampler::TraceIdRatioBased(1.0)))]
    #[case(
        "parentbased_traceidratio",
        Some("0.1"),
        Some(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(0.1))))
    )]
    #[case(
        "parentbased_always_off",
        None,
        Some(Sampler::ParentBased(Box::new(Sampler::AlwaysOff)))
    )]
    #[case("xray", None, None)]
    #[case("bogus", None, None)]
    fn test_sampler(
        #[case] sampler: &str,
        #[case] arg: Option<&str>,
        #[case] expected: Option<Sampler>,
    ) {
        let mut vars = vec![(OTEL_TRACES_SAMPLER, sampler)];
        if let Some(arg) = arg {
            vars.push((OTEL_TRACES_SAMPLER_ARG, arg));
        }
        let env = Environment::from_iter(vars);
        let sampler = EnvConfigExtractor::new(&env)
            .extract(Signal::Traces)
            .tracer_provider
            .and_then(|provider| provider.sampler);
        assert_eq!(sampler, expected);
    }

    #[test]
    fn test_span_limits_fall_back_to_generic_limits() {
        let env = Environment::from_iter([
            (OTEL_ATTRIBUTE_COUNT_LIMIT, "64"),
            ("OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT", "256"),
            (OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT, "512"),
        ]);
        let limits = EnvConfigExtractor::new(&env)
            .extract(Signal::Traces)
            .tracer_provider
            .and_then(|provider| provider.limits)
            .unwrap();
        assert_eq!(limits.attribute_count_limit, Some(64));
        assert_eq!(limits.attribute_value_length_limit, Some(256));
    }
}
