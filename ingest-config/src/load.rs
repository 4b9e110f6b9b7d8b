use serde::de::DeserializeOwned;

use crate::environment::Environment;

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Base configuration file loaded for all environments.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
///
/// Example: `APP_RETRY__MAX_ATTEMPTS` sets the `retry.max_attempts` field.
const ENV_SEPARATOR: &str = "__";

/// Loads hierarchical configuration from YAML files and environment variables.
///
/// Loads configuration in this order:
/// 1. Base configuration from `configuration/base.yaml`
/// 2. Environment-specific file from `configuration/{environment}.yaml`
/// 3. Environment variable overrides prefixed with `APP`
///
/// Both files are optional so that a case can run on defaults alone.
pub fn load_config<T>() -> Result<T, config::ConfigError>
where
    T: DeserializeOwned,
{
    let base_path = std::env::current_dir()
        .map_err(|err| config::ConfigError::Foreign(Box::new(err)))?;
    let configuration_directory = base_path.join(CONFIGURATION_DIR);

    let environment =
        Environment::load().map_err(|err| config::ConfigError::Foreign(Box::new(err)))?;
    let environment_filename = environment.config_file_name();

    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    let settings = config::Config::builder()
        .add_source(
            config::File::from(configuration_directory.join(BASE_CONFIG_FILE)).required(false),
        )
        .add_source(
            config::File::from(configuration_directory.join(environment_filename))
                .required(false),
        )
        // E.g. `APP_RECORD_NUM=10` sets `CaseConfig { record_num }` to `10`.
        .add_source(environment_source)
        .build()?;

    settings.try_deserialize::<T>()
}
