//! Collaborator and tool abstractions.
//!
//! The engine never talks to the platform directly. Everything remote is
//! behind one of these traits so the orchestrator can be exercised against
//! in-memory implementations (see the `store` module) and the transport
//! layer can be swapped without touching migration logic.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{AssessmentInfo, ComponentType, MigrationRecord, MigrationResult};
use crate::error::Result;
use crate::mapping::FieldMapping;
use crate::names::NameRegistry;

/// Raw record as returned by [`RecordStore::query`].
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub id: String,
    pub fields: BTreeMap<String, Value>,
}

impl SourceRecord {
    /// String value of a field, if present and a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Outcome of a single create call.
#[derive(Debug, Clone)]
pub struct CreateResult {
    pub id: Option<String>,
    pub success: bool,
    pub errors: Vec<String>,
}

/// Remote data store: query, create and delete structured records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Query records of an object type, optionally filtered.
    async fn query(
        &self,
        object_type: &str,
        fields: &[&str],
        filter: Option<&str>,
    ) -> Result<Vec<SourceRecord>>;

    /// Create one record, tagged with a caller-chosen reference id so the
    /// result can be correlated back to the source record.
    async fn create_one(
        &self,
        object_type: &str,
        reference_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<CreateResult>;

    /// Delete a batch of records by id.
    async fn delete_many(&self, object_type: &str, ids: &[String]) -> Result<()>;
}

/// Org settings access (feature flags, rollback flags).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read named settings of a metadata kind. Missing settings are
    /// returned as `Value::Null` entries.
    async fn read_settings(&self, kind: &str, names: &[&str]) -> Result<BTreeMap<String, Value>>;

    /// Update settings of a metadata kind.
    async fn update_settings(&self, kind: &str, settings: &BTreeMap<String, Value>) -> Result<()>;
}

/// Interactive operator prompt.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn prompt(&self, question: &str) -> Result<String>;

    /// Prompt with a deadline; resolves to `MigrateError::PromptTimeout`
    /// when the operator does not answer in time.
    async fn prompt_with_timeout(&self, question: &str, timeout: Duration) -> Result<String>;
}

/// Request to deploy a metadata package to the target environment.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Logical package name, used in log lines only.
    pub package_name: String,
    /// Component member names included in the deployment.
    pub members: Vec<String>,
}

/// Status of an asynchronous deployment job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed { message: String },
    Canceling,
    Canceled,
}

/// Asynchronous deployment job API.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Submit a deployment job; returns the job id.
    async fn submit(&self, request: &DeployRequest) -> Result<String>;

    /// Check the status of a previously submitted job. Errors from this
    /// call are transport errors, distinct from deployment failures.
    async fn check_status(&self, job_id: &str) -> Result<DeployStatus>;
}

/// Outcome of a truncate pass.
///
/// Precondition failures are a skip, not an error: the tool returns without
/// deleting anything and the orchestrator treats the skip as a propagated
/// failure (fail-closed for the migrate phase).
#[derive(Debug, Clone)]
pub struct TruncateOutcome {
    /// Target-side records deleted.
    pub deleted: usize,
    /// Set when a precondition prevented deletion.
    pub skipped: Option<String>,
}

impl TruncateOutcome {
    pub fn deleted(count: usize) -> Self {
        Self {
            deleted: count,
            skipped: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            deleted: 0,
            skipped: Some(reason.into()),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

/// One migration tool, bound to a single component type.
///
/// The orchestrator holds a fixed, ordered list of these and drives the
/// assess → truncate → migrate → validate → cleanup lifecycle.
#[async_trait]
pub trait MigrationTool: Send + Sync {
    /// Tool name, used in reports.
    fn name(&self) -> &str;

    fn component_type(&self) -> ComponentType;

    /// The component's old-field → new-field mapping table.
    fn mappings(&self) -> &'static [FieldMapping];

    /// Source-side display name of a record.
    fn record_name(&self, record: &MigrationRecord) -> String;

    /// Dry run: read, transform in memory, report what would change.
    /// Must be side-effect free.
    async fn assess(&self, registry: &NameRegistry) -> Result<Vec<AssessmentInfo>>;

    /// Delete the component's target-side leftovers from previous
    /// attempts, preconditions permitting. Source records survive until
    /// [`cleanup`](MigrationTool::cleanup).
    async fn truncate(&self) -> Result<TruncateOutcome>;

    /// Migrate every source record to the target schema.
    async fn migrate(&self, registry: &NameRegistry) -> Result<MigrationResult>;

    /// Post-validation cleanup: delete verified source records and flip the
    /// component's feature flag. Only called when validation passed.
    async fn cleanup(&self, result: &MigrationResult) -> Result<()>;
}
