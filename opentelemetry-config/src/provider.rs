use crate::env::EnvConfigExtractor;
use crate::environment::Environment;
use crate::error::ConfigError;
use crate::file::FileConfigLoader;
use crate::fragment::ConfigurationFragment;
use crate::merge::ConfigMerger;
use crate::model::ConfigurationModel;
use opentelemetry::otel_debug;

/// Resolves the SDK configuration once and hands it out afterwards.
///
/// The environment and the configuration file are read during construction
/// only; later changes to either are not observed.
///
/// ```no_run
/// use opentelemetry_config::{ConfigProvider, Environment};
///
/// let provider = ConfigProvider::create(&Environment::from_process())?;
/// if !provider.instrumentation_config().disabled {
///     // build providers
/// }
/// # Ok::<(), opentelemetry_config::ConfigError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ConfigProvider {
    config: ConfigurationModel,
}

impl ConfigProvider {
    /// Resolves the environment, file and default tiers.
    ///
    /// Fails when `OTEL_EXPERIMENTAL_CONFIG_FILE` names a file that cannot be
    /// read, does not have a YAML extension or does not parse.
    pub fn create(env: &Environment) -> Result<Self, ConfigError> {
        Self::create_with_user_config(None, env)
    }

    /// Like [`ConfigProvider::create`], with `user` taking precedence over every
    /// other tier.
    pub fn create_with_user_config(
        user: Option<ConfigurationFragment>,
        env: &Environment,
    ) -> Result<Self, ConfigError> {
        let file = FileConfigLoader::new(env).load()?;
        let from_env = EnvConfigExtractor::new(env).extract_all();
        let config = ConfigMerger::default().merge(user, Some(from_env), file)?;
        otel_debug!(
            name: "Config.Provider.Resolved",
            disabled = config.disabled,
            log_level = format!("{}", config.log_level)
        );
        Ok(ConfigProvider { config })
    }

    /// The resolved configuration.
    pub fn instrumentation_config(&self) -> &ConfigurationModel {
        &self.config
    }
}

/// Creates a [`ConfigProvider`] from the current process environment.
pub fn create_config_provider() -> Result<ConfigProvider, ConfigError> {
    ConfigProvider::create(&Environment::from_process())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogLevel;

    #[test]
    fn test_user_config_wins_over_environment() {
        let env = Environment::from_iter([("OTEL_LOG_LEVEL", "debug"), ("OTEL_SDK_DISABLED", "true")]);
        let provider = ConfigProvider::create_with_user_config(
            Some(ConfigurationFragment {
                log_level: Some(LogLevel::Error),
                ..Default::default()
            }),
            &env,
        )
        .unwrap();
        let config = provider.instrumentation_config();
        assert_eq!(config.log_level, LogLevel::Error);
        assert!(config.disabled);
    }

    #[test]
    fn test_config_is_stable() {
        let provider = ConfigProvider::create(&Environment::empty()).unwrap();
        assert_eq!(
            provider.instrumentation_config(),
            provider.instrumentation_config()
        );
    }
}
