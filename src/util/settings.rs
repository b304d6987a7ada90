//! Layered configuration.
//!
//! Priority (highest to lowest):
//! 1. Environment variables (`NEXTRADE__` prefix, `__` between sections)
//! 2. An explicit file passed on the command line
//! 3. `settings.toml` in the per-user config directory
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AllocatorConfig, CostEngineConfig, QuoteSettings, ValidationError};
use crate::infra::RateSettings;
use crate::util::logging::LoggingSettings;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "NexTrade";
const APP_NAME: &str = "NexTrade";
const SETTINGS_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "NEXTRADE";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to render settings: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rates: RateSettings,
    pub engine: CostEngineConfig,
    pub allocator: AllocatorConfig,
    pub quote: QuoteSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.engine.validate()?;
        self.allocator.validate()?;
        self.quote.validate()?;
        if self.rates.fx.timeout_ms == 0 {
            return Err(ValidationError::InvalidConfig(
                "rates.fx.timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Per-user settings file, when the platform has a config directory.
pub fn user_settings_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    load_from(user_settings_file().as_deref(), explicit)
}

fn load_from(user_file: Option<&Path>, explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder();

    if let Some(path) = user_file {
        builder = builder.add_source(File::from(path).required(false));
    }

    // A file named on the command line must exist.
    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;

    tracing::debug!(
        user_file = ?user_file,
        explicit = ?explicit,
        destinations = settings.engine.destinations.len(),
        "loaded settings"
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransitWindow;
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::TempDir;

    fn write_settings(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("settings.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.engine.destinations.len(), 2);
        assert!(settings.rates.fx.enabled);
        assert_eq!(settings.rates.fx.timeout_ms, 2000);
    }

    #[test]
    fn missing_user_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let settings = load_from(Some(dir.path().join("absent.toml").as_path()), None).unwrap();
        assert_eq!(settings.engine, CostEngineConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = load_from(None, Some(dir.path().join("absent.toml").as_path()));
        assert!(matches!(result, Err(SettingsError::Load(_))));
    }

    #[test]
    fn file_overrides_selected_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_settings(
            &dir,
            r#"
[engine]
thc_fee_per_teu = 180

[[engine.destinations]]
name = "Uzbekistan"
rail_distance_km = 5200
rail_transit = { min_days = 14, max_days = 18 }
duty_rate = 0.1

[rates.fx]
enabled = false

[quote]
insurance_rate = 0.004
"#,
        );

        let settings = load_from(None, Some(path.as_path())).unwrap();
        assert_eq!(settings.engine.thc_fee_per_teu, dec!(180));
        assert_eq!(settings.engine.inland_fee_per_teu, dec!(400));
        assert_eq!(settings.engine.destinations.len(), 1);
        assert_eq!(settings.engine.destinations[0].name, "Uzbekistan");
        assert_eq!(settings.engine.destinations[0].duty_rate, dec!(0.1));
        assert_eq!(
            settings.engine.destinations[0].rail_transit,
            TransitWindow::new(14, 18)
        );
        assert_eq!(settings.engine.ocean_transit, TransitWindow::new(3, 4));
        assert!(!settings.rates.fx.enabled);
        assert_eq!(settings.quote.insurance_rate, dec!(0.004));
        assert_eq!(settings.quote.units_per_teu, 20_000);
    }

    #[test]
    fn explicit_file_wins_over_user_file() {
        let user = TempDir::new().unwrap();
        let user_path = write_settings(&user, "[allocator]\nexport_clearance_fee = 60\n");
        let explicit = TempDir::new().unwrap();
        let explicit_path = write_settings(&explicit, "[allocator]\nexport_clearance_fee = 75\n");

        let settings = load_from(Some(user_path.as_path()), Some(explicit_path.as_path())).unwrap();
        assert_eq!(settings.allocator.export_clearance_fee, dec!(75));
    }

    #[test]
    fn invalid_values_are_rejected_after_loading() {
        let dir = TempDir::new().unwrap();
        let path = write_settings(&dir, "[engine.surcharges]\nbaf = 0\n");
        assert!(matches!(
            load_from(None, Some(path.as_path())),
            Err(SettingsError::Invalid(_))
        ));

        let path = write_settings(&dir, "[rates.defaults]\nexchange_rate = -1\n");
        assert!(load_from(None, Some(path.as_path())).is_err());

        let path = write_settings(
            &dir,
            "[engine.ocean_transit]\nmin_days = 6\nmax_days = 4\n",
        );
        assert!(matches!(
            load_from(None, Some(path.as_path())),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn rendered_toml_loads_back() {
        let dir = TempDir::new().unwrap();
        let rendered = Settings::default().to_toml().unwrap();
        assert!(rendered.contains("[engine.surcharges]"));

        let path = write_settings(&dir, &rendered);
        let reloaded = load_from(None, Some(path.as_path())).unwrap();
        assert_eq!(reloaded, Settings::default());
    }
}
