//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
///
/// The variants follow the propagation policy of the engine: record-level
/// errors ([`Transform`](MigrateError::Transform), most
/// [`RemoteCall`](MigrateError::RemoteCall)) are recorded on the affected
/// record and never abort the surrounding loop; component-level errors
/// ([`Precondition`](MigrateError::Precondition),
/// [`Validation`](MigrateError::Validation)) abort only that component's
/// remaining phases; only user-input and prompt-exhaustion errors abort the
/// whole run.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Invalid flag/option combination or configuration value.
    #[error("Invalid input: {0}")]
    UserInput(String),

    /// A safety precondition failed (feature already enabled, rollback flag
    /// set). Truncate/migrate for that component aborts; the run continues.
    #[error("Precondition failed for {component}: {message}")]
    Precondition { component: String, message: String },

    /// A record could not be transformed (duplicate or unmappable name).
    #[error("Transform failed for record {record}: {message}")]
    Transform { record: String, message: String },

    /// A remote create/delete/query call failed.
    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    /// Post-migrate count/success mismatch. Blocks cleanup for the
    /// component so source records are never deleted unverified.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A deployment job reached a terminal failure state.
    #[error("Deployment failed: {message}")]
    Deployment { message: String, retryable: bool },

    /// The poll budget was exhausted without a terminal deployment status.
    #[error("Deployment timed out after {polls} status checks")]
    DeploymentTimeout { polls: usize },

    /// The name registry was read before its build pass completed.
    #[error("Name registry queried before pre-processing completed")]
    RegistryNotBuilt,

    /// No name mapping exists for a component the engine expected to know.
    #[error("No name mapping for {component_type} '{name}'")]
    UnknownName {
        component_type: String,
        name: String,
    },

    /// Source file could not be parsed into a syntax tree.
    #[error("Parse failed for {file}: {message}")]
    Parse { file: String, message: String },

    /// Token edit derivation or application failed.
    #[error("Rewrite failed: {0}")]
    Rewrite(String),

    /// An operator prompt timed out.
    #[error("Prompt timed out after {0} ms")]
    PromptTimeout(u64),

    /// The operator failed to confirm within the allowed attempts.
    #[error("Prompt retries exhausted: {0}")]
    PromptExhausted(String),

    /// IO error (file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Precondition error.
    pub fn precondition(component: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Precondition {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a Transform error for a specific record.
    pub fn transform(record: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transform {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Whether the error may succeed on a retry of the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MigrateError::Deployment {
                retryable: true,
                ..
            }
        )
    }

    /// Process exit code for the error.
    ///
    /// Operator mistakes (bad flags, refused prompts) exit with 2 so
    /// wrappers can distinguish them from migration failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::UserInput(_) | MigrateError::PromptExhausted(_) => 2,
            _ => 1,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::UserInput("bad flag".into()).exit_code(), 2);
        assert_eq!(
            MigrateError::PromptExhausted("no consent".into()).exit_code(),
            2
        );
        assert_eq!(MigrateError::Validation("mismatch".into()).exit_code(), 1);
        assert_eq!(MigrateError::RegistryNotBuilt.exit_code(), 1);
    }

    #[test]
    fn test_retryable_classification() {
        let retryable = MigrateError::Deployment {
            message: "network timeout".into(),
            retryable: true,
        };
        let fatal = MigrateError::Deployment {
            message: "permission denied".into(),
            retryable: false,
        };
        assert!(retryable.is_retryable());
        assert!(!fatal.is_retryable());
        assert!(!MigrateError::DeploymentTimeout { polls: 20 }.is_retryable());
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = MigrateError::precondition("script", "rollback flag set");
        let detail = err.format_detailed();
        assert!(detail.contains("Precondition failed"));
        assert!(detail.contains("rollback flag set"));
    }
}
