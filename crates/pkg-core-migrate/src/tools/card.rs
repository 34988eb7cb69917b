//! Card migration tool (VlocityCard__c → OmniUiCard).

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::{ToolContext, ToolSpec};
use crate::core::{
    AssessmentInfo, ComponentType, MigrationRecord, MigrationResult, MigrationTool,
    TruncateOutcome,
};
use crate::error::Result;
use crate::mapping::{FieldMapping, CARD_FIELDS};
use crate::names::NameRegistry;

static SPEC: ToolSpec = ToolSpec {
    component_type: ComponentType::Card,
    table: CARD_FIELDS,
    feature_flag: "OmniUiCardEnabled",
    rollback_flag: "RollbackCardMigration",
    filter: None,
    renamed: true,
};

pub struct CardTool {
    ctx: ToolContext,
}

impl CardTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MigrationTool for CardTool {
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
        let mut findings = super::assess_records(&self.ctx, &SPEC, registry).await?;
        // Inactive card versions migrate but stay inactive; worth calling
        // out since the designer hides them by default.
        let inactive: BTreeSet<String> = self
            .ctx
            .store
            .query(
                &self.ctx.source_object(SPEC.component_type),
                &["Id"],
                Some(&format!("{} = false", self.ctx.qualify_field("Active__c"))),
            )
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        for finding in &mut findings {
            if inactive.contains(&finding.source_id) {
                finding
                    .warnings
                    .push("card version is inactive; it migrates but stays hidden".to_string());
            }
        }
        Ok(findings)
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
    use crate::names::ComponentInventory;
    use crate::store::MemoryRecordStore;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn seed_card(store: &MemoryRecordStore, id: &str, name: &str, active: bool) {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), json!(name));
        fields.insert("vlocity_ins__Active__c".to_string(), json!(active));
        store.seed("vlocity_ins__VlocityCard__c", id, fields);
    }

    #[tokio::test]
    async fn test_assess_warns_on_inactive_versions_only() {
        let store = Arc::new(MemoryRecordStore::new());
        seed_card(&store, "c01", "Welcome Card", true);
        seed_card(&store, "c02", "Welcome Card v1", false);

        let mut registry = NameRegistry::new();
        registry.pre_process_components(&ComponentInventory {
            cards: vec!["Welcome Card".into(), "Welcome Card v1".into()],
            ..Default::default()
        });

        let tool = CardTool::new(ToolContext::new(store.clone(), store, "vlocity_ins"));
        let findings = tool.assess(&registry).await.unwrap();
        assert_eq!(findings.len(), 2);

        let by_id = |id: &str| findings.iter().find(|f| f.source_id == id).unwrap();
        assert!(by_id("c01").warnings.is_empty());
        assert!(by_id("c02")
            .warnings
            .iter()
            .any(|w| w.contains("inactive")));
    }
}
