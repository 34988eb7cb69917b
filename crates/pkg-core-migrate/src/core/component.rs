//! Component type enumeration and dependency ordering.

use crate::error::MigrateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six migratable component kinds.
///
/// The declaration order here is the migration dependency order:
/// low-dependency components first. The orchestrator migrates in this
/// order and truncates in the reverse, so objects that reference others
/// are removed before the objects they reference, and created only after
/// their dependencies exist in the target schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    DataMapper,
    IntegrationProcedure,
    Script,
    Card,
    AutoNumber,
    Label,
}

impl ComponentType {
    /// All component types in migration (forward dependency) order.
    pub const ALL: [ComponentType; 6] = [
        ComponentType::DataMapper,
        ComponentType::IntegrationProcedure,
        ComponentType::Script,
        ComponentType::Card,
        ComponentType::AutoNumber,
        ComponentType::Label,
    ];

    /// Human-readable label used in reports and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ComponentType::DataMapper => "Data Mapper",
            ComponentType::IntegrationProcedure => "Integration Procedure",
            ComponentType::Script => "Script",
            ComponentType::Card => "Card",
            ComponentType::AutoNumber => "Auto Number",
            ComponentType::Label => "Label",
        }
    }

    /// Managed-package (source schema) object name, without the namespace
    /// prefix. The prefix is applied by the namespace adapter at query time.
    pub fn source_object(&self) -> &'static str {
        match self {
            ComponentType::DataMapper => "DRBundle__c",
            ComponentType::IntegrationProcedure => "OmniScript__c",
            ComponentType::Script => "OmniScript__c",
            ComponentType::Card => "VlocityCard__c",
            ComponentType::AutoNumber => "AutoNumber__c",
            ComponentType::Label => "Label__c",
        }
    }

    /// Core (target schema) object name.
    pub fn target_object(&self) -> &'static str {
        match self {
            ComponentType::DataMapper => "OmniDataTransform",
            ComponentType::IntegrationProcedure => "OmniProcess",
            ComponentType::Script => "OmniProcess",
            ComponentType::Card => "OmniUiCard",
            ComponentType::AutoNumber => "AutoNumber",
            ComponentType::Label => "Label",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ComponentType {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "datamapper" | "data-mapper" | "dm" => Ok(ComponentType::DataMapper),
            "integrationprocedure" | "integration-procedure" | "ip" => {
                Ok(ComponentType::IntegrationProcedure)
            }
            "script" | "os" => Ok(ComponentType::Script),
            "card" => Ok(ComponentType::Card),
            "autonumber" | "auto-number" => Ok(ComponentType::AutoNumber),
            "label" => Ok(ComponentType::Label),
            other => Err(MigrateError::UserInput(format!(
                "Unknown component type '{}' (expected one of: data-mapper, \
                 integration-procedure, script, card, auto-number, label)",
                other
            ))),
        }
    }
}
