//! Migration orchestrator - main workflow coordinator.
//!
//! Holds the ordered list of migration tools and drives one run:
//!
//! 1. Build the name registry (a checkpoint: nothing downstream runs
//!    against a partially populated registry).
//! 2. Truncate phase, iterating the tool list reversed so components that
//!    reference others are removed before the components they reference.
//!    Any truncate failure fails the run closed: the migrate phase is
//!    skipped entirely.
//! 3. Migrate phase in forward order, so objects are created only after
//!    their dependencies exist. Tool failures are isolated: one component
//!    failing never blocks another's attempt.
//! 4. Per-tool validation gates cleanup; a component whose record set was
//!    not verified keeps its source records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::{
    AssessmentInfo, ComponentType, DeployRequest, DeploymentApi, MigrationResult, MigrationTool,
};
use crate::deploy::{DeploymentPoller, PollerConfig};
use crate::error::Result;
use crate::names::{ComponentInventory, NameMappingEntry, NameRegistry};
use crate::tools::{
    AutoNumberTool, CardTool, DataMapperTool, IntegrationProcedureTool, LabelTool, ScriptTool,
    ToolContext,
};

/// Migration orchestrator.
pub struct Orchestrator {
    ctx: ToolContext,
    tools: Vec<Arc<dyn MigrationTool>>,
    registry: Option<Arc<NameRegistry>>,
    deployment: Option<DeploymentPoller>,
}

/// Result of a full migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: completed, failed, or truncate-failed.
    pub status: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,

    /// Components attempted.
    pub components_total: usize,

    /// Components that migrated cleanly.
    pub components_clean: usize,

    /// Source records seen across all components.
    pub records_total: usize,

    /// Records migrated successfully.
    pub records_migrated: usize,

    /// Per-component results, in migration order.
    pub results: Vec<MigrationResult>,

    /// Truncate-phase failures that caused the migrate phase to be skipped.
    pub truncate_failures: Vec<String>,

    /// Every error, prefixed with component and record, for the operator.
    pub action_items: Vec<String>,

    /// The name mapping table used for this run.
    pub name_mappings: Vec<NameMappingEntry>,
}

impl RunReport {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Orchestrator {
    /// Create an orchestrator for a full run, or for a single component
    /// type when `filter` is set.
    pub fn new(ctx: ToolContext, filter: Option<ComponentType>) -> Self {
        match filter {
            Some(component_type) => Self::with_components(ctx, &[component_type]),
            None => Self::with_components(ctx, &[]),
        }
    }

    /// Create an orchestrator restricted to a subset of component types.
    /// An empty subset runs every tool. Relative migration order is always
    /// the fixed dependency order, regardless of subset order.
    pub fn with_components(ctx: ToolContext, components: &[ComponentType]) -> Self {
        let all: Vec<Arc<dyn MigrationTool>> = vec![
            Arc::new(DataMapperTool::new(ctx.clone())),
            Arc::new(IntegrationProcedureTool::new(ctx.clone())),
            Arc::new(ScriptTool::new(ctx.clone())),
            Arc::new(CardTool::new(ctx.clone())),
            Arc::new(AutoNumberTool::new(ctx.clone())),
            Arc::new(LabelTool::new(ctx.clone())),
        ];
        let tools = if components.is_empty() {
            all
        } else {
            all.into_iter()
                .filter(|t| components.contains(&t.component_type()))
                .collect()
        };
        Self {
            ctx,
            tools,
            registry: None,
            deployment: None,
        }
    }

    /// Deploy migrated components through `api` at the end of a run.
    /// Without this, the run stops after cleanup and deployment is left
    /// to an external process.
    pub fn with_deployment(mut self, api: Arc<dyn DeploymentApi>, config: PollerConfig) -> Self {
        self.deployment = Some(DeploymentPoller::new(api, config));
        self
    }

    /// Tool component types in migration order. Exposed for reporting.
    pub fn component_order(&self) -> Vec<ComponentType> {
        self.tools.iter().map(|t| t.component_type()).collect()
    }

    /// Collect the names of every renameable component in the org.
    async fn collect_inventory(&self) -> Result<ComponentInventory> {
        let names_of = |records: Vec<crate::core::SourceRecord>| -> Vec<String> {
            records
                .iter()
                .filter_map(|r| r.get_str("Name").map(str::to_string))
                .collect()
        };

        let ns = &self.ctx.namespace;
        let script_object = self.ctx.source_object(ComponentType::Script);
        let qualify = |field: &str| self.ctx.qualify_field(field);

        let data_mappers = names_of(
            self.ctx
                .store
                .query(
                    &self.ctx.source_object(ComponentType::DataMapper),
                    &["Id", "Name"],
                    None,
                )
                .await?,
        );
        let scripts = names_of(
            self.ctx
                .store
                .query(
                    &script_object,
                    &["Id", "Name"],
                    Some(&format!("{} = false", qualify("IsProcedure__c"))),
                )
                .await?,
        );
        // Legacy-designer scripts share the object and the name space;
        // identical names dedupe in the registry, distinct ones must
        // participate in collision detection.
        let scripts_other_runtime = names_of(
            self.ctx
                .store
                .query(
                    &script_object,
                    &["Id", "Name"],
                    Some(&format!("{} = 'Classic'", qualify("DesignerRuntime__c"))),
                )
                .await?,
        );
        let integration_procedures = names_of(
            self.ctx
                .store
                .query(
                    &script_object,
                    &["Id", "Name"],
                    Some(&format!("{} = true", qualify("IsProcedure__c"))),
                )
                .await?,
        );
        let cards = names_of(
            self.ctx
                .store
                .query(
                    &self.ctx.source_object(ComponentType::Card),
                    &["Id", "Name"],
                    None,
                )
                .await?,
        );

        info!(
            namespace = %ns,
            data_mappers = data_mappers.len(),
            scripts = scripts.len(),
            procedures = integration_procedures.len(),
            cards = cards.len(),
            "collected component inventory"
        );

        Ok(ComponentInventory {
            data_mappers,
            scripts,
            scripts_other_runtime,
            integration_procedures,
            cards,
        })
    }

    /// Build the name registry. Must complete before any consumer reads it;
    /// called automatically by [`run`](Self::run) and
    /// [`assess`](Self::assess).
    pub async fn build_registry(&mut self) -> Result<Arc<NameRegistry>> {
        let inventory = self.collect_inventory().await?;
        let mut registry = NameRegistry::new();
        registry.pre_process_components(&inventory);
        let registry = Arc::new(registry);
        self.registry = Some(registry.clone());
        Ok(registry)
    }

    /// Dry run: every tool's assess, no writes.
    pub async fn assess(&mut self) -> Result<Vec<AssessmentInfo>> {
        let registry = self.build_registry().await?;
        let mut findings = Vec::new();
        for tool in &self.tools {
            info!("Assessing {}", tool.name());
            findings.extend(tool.assess(&registry).await?);
        }
        Ok(findings)
    }

    /// Run the migration.
    pub async fn run(&mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);

        // Phase 1: registry checkpoint.
        let registry = self.build_registry().await?;

        // Phase 2: truncate in reverse dependency order.
        let mut truncate_failures = Vec::new();
        for tool in self.tools.iter().rev() {
            info!("Truncating {}", tool.name());
            match tool.truncate().await {
                Ok(outcome) if outcome.is_skipped() => {
                    let reason = outcome.skipped.unwrap_or_default();
                    warn!("{}: truncate skipped - {}", tool.name(), reason);
                    truncate_failures.push(format!("{}: {}", tool.name(), reason));
                }
                Ok(outcome) => {
                    info!("{}: truncated {} records", tool.name(), outcome.deleted);
                }
                Err(e) => {
                    error!("{}: truncate failed - {}", tool.name(), e);
                    truncate_failures.push(format!("{}: {}", tool.name(), e));
                }
            }
        }

        // Phase 3: migrate in forward order, unless truncate failed.
        let mut results = Vec::new();
        if truncate_failures.is_empty() {
            for tool in &self.tools {
                info!("Migrating {}", tool.name());
                let result = self.migrate_one(tool.clone(), registry.clone()).await;

                // Phase 4: validation gates cleanup, per component.
                let mut result = result;
                if result.is_clean() {
                    if let Err(e) = tool.cleanup(&result).await {
                        error!("{}: cleanup failed - {}", tool.name(), e);
                        result.errors.push(format!("cleanup failed: {e}"));
                    }
                } else {
                    warn!(
                        "{}: {} of {} records verified; cleanup skipped",
                        tool.name(),
                        result.success_count(),
                        result.records.len()
                    );
                }
                results.push(result);
            }
        } else {
            warn!(
                "Truncate phase failed for {} component(s); migrate phase skipped",
                truncate_failures.len()
            );
        }

        // Phase 5: deploy what migrated, when a deployment API is wired.
        let mut deploy_failure = None;
        if let Some(poller) = &self.deployment {
            let members: Vec<String> = results
                .iter()
                .flat_map(|r| r.results.values())
                .filter(|u| u.success)
                .map(|u| u.new_name.clone())
                .collect();
            if !members.is_empty() {
                let request = DeployRequest {
                    package_name: format!("{}-core-components", self.ctx.namespace),
                    members,
                };
                match poller.deploy(&request).await {
                    Ok(job_id) => info!("Deployment {} succeeded", job_id),
                    Err(e) => {
                        error!("Deployment failed - {}", e);
                        deploy_failure = Some(e.to_string());
                    }
                }
            }
        }

        // Aggregate.
        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let components_clean = results.iter().filter(|r| r.is_clean()).count();
        let records_total: usize = results.iter().map(|r| r.records.len()).sum();
        let records_migrated: usize = results.iter().map(|r| r.success_count()).sum();
        let mut action_items: Vec<String> = truncate_failures
            .iter()
            .map(|f| format!("[Truncate] {f}"))
            .collect();
        for result in &results {
            action_items.extend(result.action_items());
        }
        if let Some(ref failure) = deploy_failure {
            action_items.push(format!("[Deploy] {failure}"));
        }

        let status = if !truncate_failures.is_empty() {
            "truncate-failed"
        } else if components_clean < results.len() || deploy_failure.is_some() {
            "failed"
        } else {
            "completed"
        };

        let report = RunReport {
            run_id,
            status: status.to_string(),
            started_at,
            completed_at,
            duration_seconds: duration,
            components_total: self.tools.len(),
            components_clean,
            records_total,
            records_migrated,
            results,
            truncate_failures,
            action_items,
            name_mappings: registry.all_mappings()?,
        };

        info!(
            "Migration {}: {}/{} components clean, {}/{} records in {:.1}s",
            report.status,
            report.components_clean,
            report.components_total,
            report.records_migrated,
            report.records_total,
            report.duration_seconds
        );

        Ok(report)
    }

    /// Run one tool's migrate on its own task so a panic or error in one
    /// component cannot take down the rest of the run.
    async fn migrate_one(
        &self,
        tool: Arc<dyn MigrationTool>,
        registry: Arc<NameRegistry>,
    ) -> MigrationResult {
        let name = tool.name().to_string();
        let handle = tokio::spawn(async move { tool.migrate(&registry).await });

        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("{}: migrate failed - {}", name, e);
                MigrationResult::from_error(&name, e.to_string())
            }
            Err(e) => {
                error!("{}: migrate task panicked - {}", name, e);
                MigrationResult::from_error(&name, format!("Task panicked: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeployStatus;
    use crate::store::MemoryRecordStore;
    use crate::tools::SETTINGS_KIND;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn seed_mapper(store: &MemoryRecordStore, id: &str, name: &str) {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), json!(name));
        fields.insert("vlocity_ins__Type__c".to_string(), json!("Extract"));
        store.seed("vlocity_ins__DRBundle__c", id, fields);
    }

    fn orchestrator(store: Arc<MemoryRecordStore>, filter: Option<ComponentType>) -> Orchestrator {
        let ctx = ToolContext::new(store.clone(), store, "vlocity_ins");
        Orchestrator::new(ctx, filter)
    }

    #[test]
    fn test_full_tool_order() {
        let store = Arc::new(MemoryRecordStore::new());
        let orch = orchestrator(store, None);
        assert_eq!(orch.component_order(), ComponentType::ALL.to_vec());
    }

    #[test]
    fn test_filtered_to_single_tool() {
        let store = Arc::new(MemoryRecordStore::new());
        let orch = orchestrator(store, Some(ComponentType::Card));
        assert_eq!(orch.component_order(), vec![ComponentType::Card]);
    }

    #[tokio::test]
    async fn test_run_migrates_seeded_mappers() {
        let store = Arc::new(MemoryRecordStore::new());
        seed_mapper(&store, "a01", "My-Data Mapper!");

        let mut orch = orchestrator(store.clone(), Some(ComponentType::DataMapper));
        let report = orch.run().await.unwrap();

        assert_eq!(report.status, "completed");
        assert_eq!(report.records_migrated, 1);
        let created = store.records_of("OmniDataTransform");
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1.get("Name"), Some(&json!("MyDataMapper")));
    }

    #[tokio::test]
    async fn test_duplicate_names_one_success_one_error() {
        let store = Arc::new(MemoryRecordStore::new());
        seed_mapper(&store, "a01", "My-Data Mapper!");
        seed_mapper(&store, "a02", "My-Data Mapper!");

        let mut orch = orchestrator(store.clone(), Some(ComponentType::DataMapper));
        let report = orch.run().await.unwrap();

        // Identical old names are one mapping, not a collision; the second
        // record trips the duplicate-within-pass check before any create.
        assert_eq!(report.status, "failed");
        assert_eq!(report.records_migrated, 1);
        assert_eq!(store.records_of("OmniDataTransform").len(), 1);
        assert!(report
            .action_items
            .iter()
            .any(|item| item.contains("duplicate target name 'MyDataMapper'")));
    }

    #[tokio::test]
    async fn test_truncate_skip_fails_run_closed() {
        let store = Arc::new(MemoryRecordStore::new());
        seed_mapper(&store, "a01", "Mapper A");
        store.set_setting(SETTINGS_KIND, "RollbackDataMapperMigration", json!(true));

        let mut orch = orchestrator(store.clone(), Some(ComponentType::DataMapper));
        let report = orch.run().await.unwrap();

        assert_eq!(report.status, "truncate-failed");
        assert!(report.results.is_empty());
        // Nothing was deleted and nothing was created.
        assert_eq!(store.records_of("vlocity_ins__DRBundle__c").len(), 1);
        assert!(store.records_of("OmniDataTransform").is_empty());
    }

    #[tokio::test]
    async fn test_failed_record_blocks_cleanup_but_not_other_tools() {
        let store = Arc::new(MemoryRecordStore::new());
        seed_mapper(&store, "a01", "Mapper A");
        store.fail_reference("OmniDataTransform_a01");

        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), json!("Welcome Card"));
        store.seed("vlocity_ins__VlocityCard__c", "c01", fields);

        let mut orch = orchestrator(store.clone(), None);
        let report = orch.run().await.unwrap();

        assert_eq!(report.status, "failed");
        // The mapper failed, its source record survives (cleanup blocked).
        assert_eq!(store.records_of("vlocity_ins__DRBundle__c").len(), 1);
        // The card still migrated and cleaned up: tool isolation.
        assert_eq!(store.records_of("OmniUiCard").len(), 1);
        assert!(store.records_of("vlocity_ins__VlocityCard__c").is_empty());
    }

    #[tokio::test]
    async fn test_assess_is_side_effect_free() {
        let store = Arc::new(MemoryRecordStore::new());
        seed_mapper(&store, "a01", "My-Data Mapper!");
        seed_mapper(&store, "a02", "My Data:Mapper");

        let mut orch = orchestrator(store.clone(), Some(ComponentType::DataMapper));
        let findings = orch.assess().await.unwrap();

        assert_eq!(findings.len(), 2);
        // Distinct old names cleaning to the same target name: both flagged.
        assert!(findings.iter().all(|f| f.new_name == "MyDataMapper"));
        assert!(findings.iter().all(|f| !f.eligible));
        assert!(store.records_of("OmniDataTransform").is_empty());
        assert_eq!(store.records_of("vlocity_ins__DRBundle__c").len(), 2);
        assert!(store.deletions().is_empty());
    }

    struct FixedStatusDeploy {
        status: DeployStatus,
        submitted: Mutex<Vec<DeployRequest>>,
    }

    impl FixedStatusDeploy {
        fn new(status: DeployStatus) -> Arc<Self> {
            Arc::new(Self {
                status,
                submitted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DeploymentApi for FixedStatusDeploy {
        async fn submit(&self, request: &DeployRequest) -> crate::error::Result<String> {
            self.submitted.lock().unwrap().push(request.clone());
            Ok("job-1".to_string())
        }

        async fn check_status(&self, _job_id: &str) -> crate::error::Result<DeployStatus> {
            Ok(self.status.clone())
        }
    }

    #[tokio::test]
    async fn test_run_deploys_migrated_members() {
        let store = Arc::new(MemoryRecordStore::new());
        seed_mapper(&store, "a01", "My-Data Mapper!");

        let api = FixedStatusDeploy::new(DeployStatus::Succeeded);
        let mut orch = orchestrator(store, Some(ComponentType::DataMapper))
            .with_deployment(api.clone(), PollerConfig::default());
        let report = orch.run().await.unwrap();

        assert_eq!(report.status, "completed");
        let submitted = api.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].package_name, "vlocity_ins-core-components");
        assert_eq!(submitted[0].members, vec!["MyDataMapper".to_string()]);
    }

    #[tokio::test]
    async fn test_deploy_failure_fails_the_run() {
        let store = Arc::new(MemoryRecordStore::new());
        seed_mapper(&store, "a01", "Mapper A");

        let api = FixedStatusDeploy::new(DeployStatus::Failed {
            message: "permission denied".to_string(),
        });
        let mut orch = orchestrator(store, Some(ComponentType::DataMapper))
            .with_deployment(api, PollerConfig::default());
        let report = orch.run().await.unwrap();

        assert_eq!(report.status, "failed");
        assert!(report
            .action_items
            .iter()
            .any(|item| item.starts_with("[Deploy]") && item.contains("permission denied")));
    }
}
