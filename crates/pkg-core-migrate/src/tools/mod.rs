//! Per-component migration tools.
//!
//! One tool per component type, each implementing the
//! assess → truncate → migrate → validate → cleanup lifecycle against the
//! record transform layer and the name registry. The phases share one
//! engine (this module); the per-type files contribute the mapping table,
//! the safety flags, and any type-specific record handling.

mod auto_number;
mod card;
mod data_mapper;
mod integration_procedure;
mod label;
mod script;

pub use auto_number::AutoNumberTool;
pub use card::CardTool;
pub use data_mapper::DataMapperTool;
pub use integration_procedure::IntegrationProcedureTool;
pub use label::LabelTool;
pub use script::ScriptTool;

use crate::core::{
    AssessmentInfo, ComponentType, MetadataStore, MigrationRecord, MigrationResult, RecordStore,
    TruncateOutcome, UploadResult,
};
use crate::error::{MigrateError, Result};
use crate::mapping::{transform_record, FieldMapping};
use crate::names::NameRegistry;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Metadata kind holding the per-component feature and rollback flags.
pub const SETTINGS_KIND: &str = "OmniInterfaceSettings";

/// Shared collaborator handles passed to every tool.
#[derive(Clone)]
pub struct ToolContext {
    pub store: Arc<dyn RecordStore>,
    pub metadata: Arc<dyn MetadataStore>,
    /// Managed-package namespace prefix (without the trailing `__`).
    pub namespace: String,
}

impl ToolContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        metadata: Arc<dyn MetadataStore>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            metadata,
            namespace: namespace.into(),
        }
    }

    /// Namespace-qualified object name for the source schema.
    pub fn source_object(&self, component_type: ComponentType) -> String {
        qualify(&self.namespace, component_type.source_object())
    }

    /// Namespace-qualified field name, leaving standard fields untouched.
    pub fn qualify_field(&self, field: &str) -> String {
        if field.ends_with("__c") {
            qualify(&self.namespace, field)
        } else {
            field.to_string()
        }
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}__{name}")
    }
}

/// Static description of one component tool, consumed by the shared phase
/// implementations below.
pub(crate) struct ToolSpec {
    pub component_type: ComponentType,
    pub table: &'static [FieldMapping],
    /// Settings flag that is true once the core feature is enabled.
    /// Truncate refuses to run when already set.
    pub feature_flag: &'static str,
    /// Safety flag set by a rollback; blocks re-migration until cleared.
    pub rollback_flag: &'static str,
    /// Source-side filter restricting the query, already canonical
    /// (namespace applied at query time).
    pub filter: Option<&'static str>,
    /// Whether this component's names go through the registry. Auto
    /// numbers and labels keep their free-form names.
    pub renamed: bool,
}

/// Query all source records for a tool, normalized to [`MigrationRecord`].
pub(crate) async fn query_source(
    ctx: &ToolContext,
    spec: &ToolSpec,
) -> Result<Vec<MigrationRecord>> {
    let object = ctx.source_object(spec.component_type);
    let fields: Vec<String> = std::iter::once("Id".to_string())
        .chain(spec.table.iter().map(|fm| ctx.qualify_field(fm.source)))
        .collect();
    let field_refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    let filter = spec.filter.map(|f| qualify_filter(&ctx.namespace, f));

    let rows = ctx
        .store
        .query(&object, &field_refs, filter.as_deref())
        .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let name = row.get_str("Name").unwrap_or_default().to_string();
        let mut record = MigrationRecord::new(row.id.clone(), name);
        record.fields = row.fields;
        records.push(record);
    }
    debug!(
        component = %spec.component_type,
        count = records.len(),
        "queried source records"
    );
    Ok(records)
}

/// Apply the namespace to every `__c` token in a canonical filter string.
fn qualify_filter(namespace: &str, filter: &str) -> String {
    if namespace.is_empty() {
        return filter.to_string();
    }
    filter
        .split_whitespace()
        .map(|token| {
            if token.ends_with("__c") && !token.starts_with(namespace) {
                qualify(namespace, token)
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Target name for a record: registry-resolved for renamed components,
/// verbatim otherwise.
pub(crate) fn resolve_target_name(
    spec: &ToolSpec,
    registry: &NameRegistry,
    record: &MigrationRecord,
) -> Result<String> {
    if spec.renamed {
        registry.target_name(spec.component_type, &record.name)
    } else {
        Ok(record.name.clone())
    }
}

/// Shared assess implementation: read, transform in memory, report. Never
/// writes.
pub(crate) async fn assess_records(
    ctx: &ToolContext,
    spec: &ToolSpec,
    registry: &NameRegistry,
) -> Result<Vec<AssessmentInfo>> {
    let records = query_source(ctx, spec).await?;
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut findings = Vec::with_capacity(records.len());

    for record in &records {
        let new_name = resolve_target_name(spec, registry, record)?;
        let mut warnings = Vec::new();
        let mut eligible = true;

        if spec.renamed && registry.is_collision(spec.component_type, &record.name)? {
            eligible = false;
            warnings.push(format!(
                "name '{}' collides with another component after cleaning",
                record.name
            ));
        }
        if !seen.insert(new_name.clone()) {
            eligible = false;
            warnings.push(format!("duplicate target name '{new_name}'"));
        }

        let transformed = transform_record(record, spec.table, &ctx.namespace)?;
        for field in &transformed.unmapped {
            warnings.push(format!("field '{field}' has no target mapping"));
        }

        findings.push(AssessmentInfo {
            component_type: spec.component_type,
            source_id: record.source_id.clone(),
            name: record.name.clone(),
            new_name,
            eligible,
            warnings,
        });
    }

    Ok(findings)
}

/// Check a tool's safety preconditions. A failed precondition is a typed
/// [`MigrateError::Precondition`]; any other error is a settings read
/// failure.
pub(crate) async fn check_preconditions(ctx: &ToolContext, spec: &ToolSpec) -> Result<()> {
    let flags = ctx
        .metadata
        .read_settings(SETTINGS_KIND, &[spec.feature_flag, spec.rollback_flag])
        .await?;

    if flags.get(spec.rollback_flag) == Some(&Value::Bool(true)) {
        return Err(MigrateError::precondition(
            spec.component_type.label(),
            format!(
                "rollback flag '{}' is set; clear it before re-migrating",
                spec.rollback_flag
            ),
        ));
    }
    if flags.get(spec.feature_flag) == Some(&Value::Bool(true)) {
        return Err(MigrateError::precondition(
            spec.component_type.label(),
            format!(
                "feature flag '{}' already enabled on the target",
                spec.feature_flag
            ),
        ));
    }
    Ok(())
}

/// Shared truncate implementation: preconditions first, then delete the
/// component's target-side leftovers from any previous migration attempt,
/// so the migrate pass starts against a clean target. Source records are
/// never touched here; they are only deleted by cleanup, after the
/// migrated copy has been verified. A failed precondition deletes nothing
/// and raises nothing; the orchestrator treats the skip as a propagated
/// failure.
pub(crate) async fn truncate_records(ctx: &ToolContext, spec: &ToolSpec) -> Result<TruncateOutcome> {
    match check_preconditions(ctx, spec).await {
        Ok(()) => {}
        Err(MigrateError::Precondition { message, .. }) => {
            warn!(component = %spec.component_type, reason = %message, "truncate skipped");
            return Ok(TruncateOutcome::skipped(message));
        }
        Err(e) => return Err(e),
    }

    let object = spec.component_type.target_object();
    let leftovers = ctx.store.query(object, &["Id"], None).await?;
    if leftovers.is_empty() {
        return Ok(TruncateOutcome::deleted(0));
    }

    let ids: Vec<String> = leftovers.iter().map(|r| r.id.clone()).collect();
    ctx.store.delete_many(object, &ids).await?;

    info!(component = %spec.component_type, count = ids.len(), "truncated target leftovers");
    Ok(TruncateOutcome::deleted(ids.len()))
}

/// Shared migrate implementation.
///
/// Records are processed strictly sequentially: duplicate-name detection
/// checks names seen so far in this pass, so ordering is a correctness
/// contract, not an implementation convenience. Record-level failures are
/// recorded and never abort the loop.
pub(crate) async fn migrate_records(
    ctx: &ToolContext,
    spec: &ToolSpec,
    registry: &NameRegistry,
) -> Result<MigrationResult> {
    let mut result = MigrationResult::new(spec.component_type.label());

    let records = query_source(ctx, spec).await?;
    for record in &records {
        result
            .records
            .insert(record.source_id.clone(), record.clone());
    }

    let mut names_seen: BTreeSet<String> = BTreeSet::new();
    let target_object = spec.component_type.target_object();

    for record in &records {
        let reference_id = format!("{}_{}", target_object, record.source_id);

        if record.name.is_empty() {
            let err = MigrateError::transform(&record.source_id, "record has no Name value");
            result.record_result(
                &record.source_id,
                UploadResult::failure(&reference_id, "", err.to_string()),
            );
            continue;
        }

        let new_name = resolve_target_name(spec, registry, record)?;

        // Registry-level collision: two different old names cleaning to the
        // same target name blocks both records.
        if spec.renamed && registry.is_collision(spec.component_type, &record.name)? {
            result.record_result(
                &record.source_id,
                UploadResult::failure(
                    &reference_id,
                    &new_name,
                    format!(
                        "name '{}' collides with another component cleaning to '{}'",
                        record.name, new_name
                    ),
                ),
            );
            continue;
        }

        // Duplicate within this pass: detected before the create call so no
        // remote call is wasted and no ambiguous partial write can happen.
        if !names_seen.insert(new_name.clone()) {
            result.record_result(
                &record.source_id,
                UploadResult::failure(
                    &reference_id,
                    &new_name,
                    format!("duplicate target name '{new_name}' in this migration"),
                ),
            );
            continue;
        }

        let transformed = match transform_record(record, spec.table, &ctx.namespace) {
            Ok(t) => t,
            Err(e) => {
                let err = MigrateError::transform(&record.source_id, e.to_string());
                result.record_result(
                    &record.source_id,
                    UploadResult::failure(&reference_id, &new_name, err.to_string()),
                );
                continue;
            }
        };

        let mut payload = transformed.payload;
        payload.insert("Name".to_string(), Value::String(new_name.clone()));

        match ctx
            .store
            .create_one(target_object, &reference_id, &payload)
            .await
        {
            Ok(created) if created.success && created.id.is_some() => {
                let mut upload =
                    UploadResult::success(&reference_id, created.id.unwrap(), &new_name);
                for field in &transformed.unmapped {
                    upload = upload.with_warning(format!("field '{field}' not migrated"));
                }
                result.record_result(&record.source_id, upload);
            }
            Ok(created) => {
                let message = if created.errors.is_empty() {
                    "create returned no id".to_string()
                } else {
                    created.errors.join("; ")
                };
                result.record_result(
                    &record.source_id,
                    UploadResult::failure(&reference_id, &new_name, message),
                );
            }
            Err(e) => {
                result.record_result(
                    &record.source_id,
                    UploadResult::failure(&reference_id, &new_name, e.to_string()),
                );
            }
        }
    }

    info!(
        component = %spec.component_type,
        total = result.records.len(),
        succeeded = result.success_count(),
        "migrate pass complete"
    );
    Ok(result)
}

/// Post-migrate validation: the source record count must equal the count of
/// successful uploads, and no individual upload may have failed. Any
/// mismatch blocks cleanup for this component.
pub(crate) fn validate_migration(result: &MigrationResult) -> Result<()> {
    let total = result.records.len();
    let succeeded = result.success_count();

    if !result.errors.is_empty() {
        return Err(MigrateError::Validation(format!(
            "{}: component errors present: {}",
            result.name,
            result.errors.join("; ")
        )));
    }
    if succeeded != total {
        return Err(MigrateError::Validation(format!(
            "{}: {} of {} records migrated successfully; cleanup blocked",
            result.name, succeeded, total
        )));
    }
    Ok(())
}

/// Shared cleanup: delete the verified source records and enable the core
/// feature flag. Only called after [`validate_migration`] passed, so the
/// migrated copy is known to exist.
pub(crate) async fn cleanup_records(
    ctx: &ToolContext,
    spec: &ToolSpec,
    result: &MigrationResult,
) -> Result<()> {
    validate_migration(result)?;

    let ids: Vec<String> = result.records.keys().cloned().collect();
    if !ids.is_empty() {
        let object = ctx.source_object(spec.component_type);
        ctx.store.delete_many(&object, &ids).await?;
    }

    let mut settings = BTreeMap::new();
    settings.insert(spec.feature_flag.to_string(), Value::Bool(true));
    ctx.metadata.update_settings(SETTINGS_KIND, &settings).await?;

    info!(component = %spec.component_type, deleted = ids.len(), "cleanup complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DATA_MAPPER_FIELDS;
    use crate::names::ComponentInventory;
    use crate::store::MemoryRecordStore;
    use serde_json::json;

    static MAPPER_SPEC: ToolSpec = ToolSpec {
        component_type: ComponentType::DataMapper,
        table: DATA_MAPPER_FIELDS,
        feature_flag: "OmniDataTransformEnabled",
        rollback_flag: "RollbackDataMapperMigration",
        filter: None,
        renamed: true,
    };

    fn context(store: Arc<MemoryRecordStore>) -> ToolContext {
        ToolContext::new(store.clone(), store, "vlocity_ins")
    }

    fn built_registry() -> NameRegistry {
        let mut registry = NameRegistry::new();
        registry.pre_process_components(&ComponentInventory::default());
        registry
    }

    #[test]
    fn test_qualify_field() {
        let ctx_ns = "vlocity_ins";
        assert_eq!(qualify(ctx_ns, "DRBundle__c"), "vlocity_ins__DRBundle__c");
        assert_eq!(qualify("", "DRBundle__c"), "DRBundle__c");
    }

    #[test]
    fn test_qualify_filter() {
        assert_eq!(
            qualify_filter("vlocity_ins", "IsProcedure__c = true"),
            "vlocity_ins__IsProcedure__c = true"
        );
        assert_eq!(qualify_filter("", "IsProcedure__c = true"), "IsProcedure__c = true");
    }

    #[test]
    fn test_validate_migration_mismatch() {
        let mut result = MigrationResult::new("Data Mapper");
        result
            .records
            .insert("a01".into(), MigrationRecord::new("a01", "A"));
        result
            .records
            .insert("a02".into(), MigrationRecord::new("a02", "B"));
        result.record_result("a01", UploadResult::success("r1", "core-1", "A"));

        let err = validate_migration(&result).unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
        assert!(err.to_string().contains("1 of 2"));
    }

    #[test]
    fn test_validate_migration_clean() {
        let mut result = MigrationResult::new("Data Mapper");
        result
            .records
            .insert("a01".into(), MigrationRecord::new("a01", "A"));
        result.record_result("a01", UploadResult::success("r1", "core-1", "A"));
        assert!(validate_migration(&result).is_ok());
    }

    #[tokio::test]
    async fn test_precondition_failure_is_typed() {
        let store = Arc::new(MemoryRecordStore::new());
        store.set_setting(SETTINGS_KIND, "RollbackDataMapperMigration", json!(true));

        let err = check_preconditions(&context(store), &MAPPER_SPEC)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Precondition { .. }));
        assert!(err.to_string().contains("RollbackDataMapperMigration"));
    }

    #[tokio::test]
    async fn test_migrate_fails_nameless_record_without_create() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed("vlocity_ins__DRBundle__c", "a01", BTreeMap::new());

        let result = migrate_records(&context(store.clone()), &MAPPER_SPEC, &built_registry())
            .await
            .unwrap();

        assert_eq!(result.success_count(), 0);
        assert!(result
            .action_items()
            .iter()
            .any(|item| item.contains("has no Name")));
        assert!(store.records_of("OmniDataTransform").is_empty());
    }
}
