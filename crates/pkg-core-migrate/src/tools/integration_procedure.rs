//! Integration procedure migration tool (OmniScript__c with
//! IsProcedure__c = true → OmniProcess).

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
    component_type: ComponentType::IntegrationProcedure,
    table: SCRIPT_FIELDS,
    feature_flag: "IntegrationProcedureEnabled",
    rollback_flag: "RollbackProcedureMigration",
    filter: Some("IsProcedure__c = true"),
    renamed: true,
};

pub struct IntegrationProcedureTool {
    ctx: ToolContext,
}

impl IntegrationProcedureTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MigrationTool for IntegrationProcedureTool {
    fn name(&self) -> &str {
        SPEC.component_type.label()
    }

    fn component_type(&self) -> ComponentType {
        SPEC.component_type
    }

    fn mappings(&self) -> &'static [FieldMapping] {
        SPEC.table
    }

    /// Procedures are keyed `Type_SubType`; they carry no language.
    fn record_name(&self, record: &MigrationRecord) -> String {
        let get = |canonical: &str| {
            record.fields.iter().find_map(|(key, value)| {
                (strip_namespace(key, &self.ctx.namespace) == canonical)
                    .then(|| value.as_str())
                    .flatten()
            })
        };
        match (get("Type__c"), get("SubType__c")) {
            (Some(ty), Some(sub)) => format!("{ty}_{sub}"),
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
