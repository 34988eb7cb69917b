//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.namespace, "vlocity_ins");
        assert_eq!(config.deploy.max_polls, 20);
        assert_eq!(config.deploy.max_attempts, 3);
        assert_eq!(config.migration.prompt_attempts, 3);
        assert!(config.migration.components.is_empty());
        assert!(!config.rewrite.dry_run);
    }

    #[test]
    fn test_partial_yaml_overrides_defaults() {
        let yaml = "\
namespace: acme_pkg
migration:
  components: [data-mapper, script]
deploy:
  max_polls: 5
";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.namespace, "acme_pkg");
        assert_eq!(config.migration.components.len(), 2);
        assert_eq!(config.deploy.max_polls, 5);
        assert_eq!(config.deploy.poll_interval_secs, 60);
    }

    #[test]
    fn test_bad_component_name_is_rejected() {
        let err = Config::from_yaml("migration:\n  components: [widgets]\n").unwrap_err();
        assert!(matches!(err, MigrateError::UserInput(_)));
    }

    #[test]
    fn test_bad_namespace_is_rejected() {
        let err = Config::from_yaml("namespace: \"1bad ns\"\n").unwrap_err();
        assert!(matches!(err, MigrateError::UserInput(_)));
    }

    #[test]
    fn test_zero_budgets_are_rejected() {
        let err = Config::from_yaml("deploy:\n  max_polls: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_polls"));
    }

    #[test]
    fn test_poller_config_conversion() {
        let config = Config::from_yaml("deploy:\n  poll_interval_secs: 5\n").unwrap();
        let poller = config.deploy.poller_config();
        assert_eq!(poller.poll_interval, std::time::Duration::from_secs(5));
        assert_eq!(poller.max_polls, 20);
    }
}
