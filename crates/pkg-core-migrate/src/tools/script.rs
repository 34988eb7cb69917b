//! Script migration tool (OmniScript__c with IsProcedure__c = false →
//! OmniProcess).
//!
//! Scripts share their source object with integration procedures; the
//! query filter keeps the two tools disjoint. A script's display name is
//! composed from its type, subtype and language, matching how the designer
//! identifies versions.

use async_trait::async_trait;

use super::{ToolContext, ToolSpec};
use crate::core::{
    AssessmentInfo, ComponentType, MigrationRecord, MigrationResult, MigrationTool,
    TruncateOutcome,
};
use crate::error::Result;
use crate::mapping::{strip_namespace, FieldMapping, SCRIPT_FIELDS};
use crate::names::NameRegistry;

static SPEC: ToolSpec = ToolSpec {
    component_type: ComponentType::Script,
    table: SCRIPT_FIELDS,
    feature_flag: "OmniScriptDesignerEnabled",
    rollback_flag: "RollbackScriptMigration",
    filter: Some("IsProcedure__c = false"),
    renamed: true,
};

pub struct ScriptTool {
    ctx: ToolContext,
}

impl ScriptTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    fn field<'a>(&self, record: &'a MigrationRecord, canonical: &str) -> Option<&'a str> {
        record.fields.iter().find_map(|(key, value)| {
            (strip_namespace(key, &self.ctx.namespace) == canonical)
                .then(|| value.as_str())
                .flatten()
        })
    }
}

#[async_trait]
impl MigrationTool for ScriptTool {
    fn name(&self) -> &str {
        SPEC.component_type.label()
    }

    fn component_type(&self) -> ComponentType {
        SPEC.component_type
    }

    fn mappings(&self) -> &'static [FieldMapping] {
        SPEC.table
    }

    /// `Type_SubType_Language`, falling back to the record name when the
    /// identifying fields are absent.
    fn record_name(&self, record: &MigrationRecord) -> String {
        match (
            self.field(record, "Type__c"),
            self.field(record, "SubType__c"),
            self.field(record, "Language__c"),
        ) {
            (Some(ty), Some(sub), Some(lang)) => format!("{ty}_{sub}_{lang}"),
            _ => record.name.clone(),
        }
    }

    async fn assess(&self, registry: &NameRegistry) -> Result<Vec<AssessmentInfo>> {
        super::assess_records(&self.ctx, &SPEC, registry).await
    }

    async fn truncate(&self) -> Result<TruncateOutcome> {
        super::truncate_records(&self.ctx, &SPEC).await
    }

    async fn migrate(&self, registry: &NameRegistry) -> Result<MigrationResult> {
        super::migrate_records(&self.ctx, &SPEC, registry).await
    }

    async fn cleanup(&self, result: &MigrationResult) -> Result<()> {
        super::cleanup_records(&self.ctx, &SPEC, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;
    use serde_json::json;
    use std::sync::Arc;

    fn tool() -> ScriptTool {
        let store = Arc::new(MemoryRecordStore::new());
        ScriptTool::new(ToolContext::new(store.clone(), store, "vlocity_ins"))
    }

    #[test]
    fn test_record_name_composed_from_type_fields() {
        let record = MigrationRecord::new("a01", "ignored")
            .with_field("vlocity_ins__Type__c", json!("Quote"))
            .with_field("vlocity_ins__SubType__c", json!("Renewal"))
            .with_field("vlocity_ins__Language__c", json!("English"));

        assert_eq!(tool().record_name(&record), "Quote_Renewal_English");
    }

    #[test]
    fn test_record_name_falls_back_to_name() {
        let record = MigrationRecord::new("a01", "Bare Script");
        assert_eq!(tool().record_name(&record), "Bare Script");
    }
}
