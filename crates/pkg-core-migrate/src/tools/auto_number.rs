//! Auto number migration tool (AutoNumber__c → AutoNumber).
//!
//! Auto numbers keep their free-form names: they are configuration labels,
//! not developer names, so they bypass the name registry entirely.

use async_trait::async_trait;

use super::{ToolContext, ToolSpec};
use crate::core::{
    AssessmentInfo, ComponentType, MigrationRecord, MigrationResult, MigrationTool,
    TruncateOutcome,
};
use crate::error::Result;
use crate::mapping::{FieldMapping, AUTO_NUMBER_FIELDS};
use crate::names::NameRegistry;

static SPEC: ToolSpec = ToolSpec {
    component_type: ComponentType::AutoNumber,
    table: AUTO_NUMBER_FIELDS,
    feature_flag: "CoreAutoNumberEnabled",
    rollback_flag: "RollbackAutoNumberMigration",
    filter: None,
    renamed: false,
};

pub struct AutoNumberTool {
    ctx: ToolContext,
}

impl AutoNumberTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MigrationTool for AutoNumberTool {
    fn name(&self) -> &str {
        SPEC.component_type.label()
    }

    fn component_type(&self) -> ComponentType {
        SPEC.component_type
    }

    fn mappings(&self) -> &'static [FieldMapping] {
        SPEC.table
    }

    fn record_name(&self, record: &MigrationRecord) -> String {
        record.name.clone()
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
