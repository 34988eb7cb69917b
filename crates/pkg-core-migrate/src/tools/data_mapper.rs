//! Data mapper migration tool (DRBundle__c → OmniDataTransform).

use async_trait::async_trait;

use super::{ToolContext, ToolSpec};
use crate::core::{
    AssessmentInfo, ComponentType, MigrationRecord, MigrationResult, MigrationTool,
    TruncateOutcome,
};
use crate::error::Result;
use crate::mapping::{FieldMapping, DATA_MAPPER_FIELDS};
use crate::names::NameRegistry;

static SPEC: ToolSpec = ToolSpec {
    component_type: ComponentType::DataMapper,
    table: DATA_MAPPER_FIELDS,
    feature_flag: "OmniDataTransformEnabled",
    rollback_flag: "RollbackDataMapperMigration",
    filter: None,
    renamed: true,
};

pub struct DataMapperTool {
    ctx: ToolContext,
}

impl DataMapperTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MigrationTool for DataMapperTool {
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
