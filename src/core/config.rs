use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable overriding [`ComplianceConfig::ghg_intensity_target`].
pub const ENV_GHG_INTENSITY_TARGET: &str = "FUELEU_GHG_INTENSITY_TARGET";
/// Environment variable overriding [`ComplianceConfig::energy_density_mj_per_tonne`].
pub const ENV_ENERGY_DENSITY: &str = "FUELEU_ENERGY_DENSITY_MJ_PER_TONNE";

/// Errors arising from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: Decimal },
    #[error("invalid decimal '{value}' for {name}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Regulatory constants the balance formula depends on.
///
/// These vary by reporting period and fuel scope, so they are never
/// compiled in: build one from [`Default`], the environment, or a file.
///
/// # Examples
///
/// ```
/// use fueleu_ledger::core::config::ComplianceConfig;
/// use rust_decimal_macros::dec;
///
/// let config = ComplianceConfig::new(dec!(89.34), dec!(41000)).unwrap();
/// assert_eq!(config.ghg_intensity_target, dec!(89.34));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Target GHG intensity in gCO2e/MJ.
    pub ghg_intensity_target: Decimal,
    /// Lower calorific value applied to every tonne of fuel, in MJ/t.
    pub energy_density_mj_per_tonne: Decimal,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            ghg_intensity_target: dec!(89.34),
            energy_density_mj_per_tonne: dec!(41000),
        }
    }
}

impl ComplianceConfig {
    /// Create a validated configuration.
    pub fn new(
        ghg_intensity_target: Decimal,
        energy_density_mj_per_tonne: Decimal,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            ghg_intensity_target,
            energy_density_mj_per_tonne,
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overridden by whichever environment variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = read_env_decimal(ENV_GHG_INTENSITY_TARGET)? {
            config.ghg_intensity_target = value;
        }
        if let Some(value) = read_env_decimal(ENV_ENERGY_DENSITY)? {
            config.energy_density_mj_per_tonne = value;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file of the form
    /// `{ "ghg_intensity_target": "89.34", "energy_density_mj_per_tonne": "41000" }`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ghg_intensity_target <= Decimal::ZERO {
            return Err(ConfigError::NonPositive {
                name: "ghg_intensity_target",
                value: self.ghg_intensity_target,
            });
        }
        if self.energy_density_mj_per_tonne <= Decimal::ZERO {
            return Err(ConfigError::NonPositive {
                name: "energy_density_mj_per_tonne",
                value: self.energy_density_mj_per_tonne,
            });
        }
        Ok(())
    }
}

fn read_env_decimal(name: &'static str) -> Result<Option<Decimal>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => Decimal::from_str(raw.trim())
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ComplianceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_target() {
        let result = ComplianceConfig::new(dec!(0), dec!(41000));
        assert!(matches!(
            result,
            Err(ConfigError::NonPositive {
                name: "ghg_intensity_target",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_negative_density() {
        let result = ComplianceConfig::new(dec!(89.34), dec!(-1));
        assert!(result.is_err());
    }

    #[test]
    fn test_json_uses_string_decimals() {
        let config = ComplianceConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["ghg_intensity_target"], "89.34");
        assert_eq!(json["energy_density_mj_per_tonne"], "41000");
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("fueleu-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{ "ghg_intensity_target": "91.16", "energy_density_mj_per_tonne": "42700" }"#,
        )
        .unwrap();
        let config = ComplianceConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.ghg_intensity_target, dec!(91.16));
        assert_eq!(config.energy_density_mj_per_tonne, dec!(42700));
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = ComplianceConfig::from_json_file("/nonexistent/fueleu.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    /// Every environment case runs in this one test: the variables are
    /// process-wide and tests run in parallel.
    #[test]
    fn test_from_env_overrides() {
        std::env::remove_var(ENV_GHG_INTENSITY_TARGET);
        std::env::remove_var(ENV_ENERGY_DENSITY);
        assert_eq!(ComplianceConfig::from_env().unwrap(), ComplianceConfig::default());

        std::env::set_var(ENV_GHG_INTENSITY_TARGET, " 91.16 ");
        let config = ComplianceConfig::from_env().unwrap();
        assert_eq!(config.ghg_intensity_target, dec!(91.16));
        assert_eq!(config.energy_density_mj_per_tonne, dec!(41000));

        std::env::set_var(ENV_ENERGY_DENSITY, "42700");
        let config = ComplianceConfig::from_env().unwrap();
        assert_eq!(config.ghg_intensity_target, dec!(91.16));
        assert_eq!(config.energy_density_mj_per_tonne, dec!(42700));

        std::env::set_var(ENV_ENERGY_DENSITY, "lots");
        match ComplianceConfig::from_env() {
            Err(ConfigError::InvalidNumber { name, value }) => {
                assert_eq!(name, ENV_ENERGY_DENSITY);
                assert_eq!(value, "lots");
            }
            other => panic!("expected InvalidNumber, got {:?}", other),
        }

        std::env::set_var(ENV_ENERGY_DENSITY, "0");
        assert!(matches!(
            ComplianceConfig::from_env(),
            Err(ConfigError::NonPositive {
                name: "energy_density_mj_per_tonne",
                ..
            })
        ));

        std::env::remove_var(ENV_GHG_INTENSITY_TARGET);
        std::env::remove_var(ENV_ENERGY_DENSITY);
    }
}
