use super::{types::Config, ConfigError};
use crate::job::Category;

/// Validate configuration
/// Currently validates:
/// - Default image quality is within 1-100
/// - Termination grace period is not 0
/// - Category overrides name a known category and list at least one extension
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let quality = config.actions.image.default_quality;
    if !(1..=100).contains(&quality) {
        return Err(ConfigError::ValidationError(format!(
            "actions.image.default_quality must be between 1 and 100, got {}",
            quality
        )));
    }

    if config.actions.termination_grace_ms == 0 {
        return Err(ConfigError::ValidationError(
            "actions.termination_grace_ms cannot be 0".to_string(),
        ));
    }

    for (name, category) in &config.categories {
        if name.parse::<Category>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "categories.{}: unknown category",
                name
            )));
        }
        if let Some(extensions) = &category.extensions {
            if extensions.iter().all(|e| e.trim_start_matches('.').trim().is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "categories.{}.extensions cannot be empty",
                    name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryConfig;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_quality_out_of_range_fails() {
        let mut config = Config::default();
        config.actions.image.default_quality = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        config.actions.image.default_quality = 101;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_grace_fails() {
        let mut config = Config::default();
        config.actions.termination_grace_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("termination_grace_ms"));
    }

    #[test]
    fn test_validate_category_overrides() {
        let mut config = Config::default();
        config.categories.insert(
            "image".to_string(),
            CategoryConfig {
                extensions: Some(vec!["png".to_string()]),
            },
        );
        assert!(validate_config(&config).is_ok());

        config.categories.insert(
            "video".to_string(),
            CategoryConfig {
                extensions: Some(vec![".".to_string()]),
            },
        );
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config
            .categories
            .insert("spreadsheets".to_string(), CategoryConfig::default());
        assert!(validate_config(&config).is_err());
    }
}
