//! Configuration validation.

use std::str::FromStr;

use super::Config;
use crate::core::ComponentType;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.namespace.is_empty() {
        return Err(MigrateError::UserInput("namespace is required".into()));
    }
    if !is_identifier(&config.namespace) {
        return Err(MigrateError::UserInput(format!(
            "namespace '{}' is not a valid namespace prefix",
            config.namespace
        )));
    }

    // Component names must parse; a typo here must not silently run all
    // components.
    for name in &config.migration.components {
        ComponentType::from_str(name)?;
    }

    if config.migration.prompt_attempts == 0 {
        return Err(MigrateError::UserInput(
            "migration.prompt_attempts must be at least 1".into(),
        ));
    }
    if config.migration.prompt_timeout_secs == 0 {
        return Err(MigrateError::UserInput(
            "migration.prompt_timeout_secs must be at least 1".into(),
        ));
    }

    if config.deploy.max_polls == 0 {
        return Err(MigrateError::UserInput(
            "deploy.max_polls must be at least 1".into(),
        ));
    }
    if config.deploy.max_attempts == 0 {
        return Err(MigrateError::UserInput(
            "deploy.max_attempts must be at least 1".into(),
        ));
    }

    Ok(())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
