use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable name containing the environment identifier.
const APP_ENVIRONMENT_ENV_NAME: &str = "APP_ENVIRONMENT";

const DEV_ENV_NAME: &str = "dev";

const PROD_ENV_NAME: &str = "prod";

/// Identifiers accepted for a run against a deployed pipeline.
const PROD_ALIASES: [&str; 3] = [PROD_ENV_NAME, "staging", "ci"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0} is not a supported environment, use `dev` or `prod` (or `staging`/`ci`)")]
pub struct EnvironmentError(String);

/// Where a verification case runs.
///
/// A local run uses the in-memory pipeline and logs to the console. Any run against a deployed
/// pipeline (production, staging, CI) is prod-like: it reads `prod.yaml` and logs JSON to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    /// Loads the environment from `APP_ENVIRONMENT`, [`Environment::Dev`] when it is not set.
    pub fn load() -> Result<Environment, EnvironmentError> {
        match std::env::var(APP_ENVIRONMENT_ENV_NAME) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::Dev),
        }
    }

    /// Sets the `APP_ENVIRONMENT` environment variable to this environment's value.
    pub fn set(&self) {
        unsafe { std::env::set_var(APP_ENVIRONMENT_ENV_NAME, self.to_string()) }
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }

    /// Name of the environment-specific file under `configuration/`.
    pub fn config_file_name(&self) -> String {
        format!("{self}.yaml")
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "{DEV_ENV_NAME}"),
            Environment::Prod => write!(f, "{PROD_ENV_NAME}"),
        }
    }
}

impl FromStr for Environment {
    type Err = EnvironmentError;

    /// Parses an identifier case-insensitively, `staging` and `ci` mapping to prod.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let identifier = s.trim().to_lowercase();

        if identifier == DEV_ENV_NAME {
            Ok(Self::Dev)
        } else if PROD_ALIASES.contains(&identifier.as_str()) {
            Ok(Self::Prod)
        } else {
            Err(EnvironmentError(s.to_string()))
        }
    }
}
