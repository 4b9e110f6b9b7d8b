use ingest_config::load_config;
use ingest_config::shared::CaseConfig;

/// Loads the [`CaseConfig`] and validates it.
pub fn load_case_config() -> anyhow::Result<CaseConfig> {
    let config = load_config::<CaseConfig>()?;
    config.validate()?;

    Ok(config)
}
