//! Per-run migration record state.
//!
//! All of these types live only for the duration of one run: created during
//! the truncate/migrate phases, consumed by the report generator, then
//! discarded. Nothing here is persisted.

use super::ComponentType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One pre-migration source record, keyed by source identifier.
///
/// Immutable once read: the migrate pass transforms a copy of the fields,
/// never the record itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Source-side record identifier.
    pub source_id: String,
    /// Source-side component name (pre-cleaning).
    pub name: String,
    /// Raw field map as read from the source object. BTreeMap keeps
    /// iteration order deterministic across runs.
    pub fields: BTreeMap<String, Value>,
}

impl MigrationRecord {
    pub fn new(source_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter, used heavily by tests and the snapshot
    /// store loader.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// Outcome of one attempted upload.
///
/// Invariant: `success == true` implies `migrated_id` is set and `errors`
/// is empty. The constructors are the only way to build one, so the
/// invariant holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub reference_id: String,
    pub migrated_id: Option<String>,
    pub new_name: String,
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl UploadResult {
    /// A successful upload. Requires the target-side id.
    pub fn success(
        reference_id: impl Into<String>,
        migrated_id: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self {
            reference_id: reference_id.into(),
            migrated_id: Some(migrated_id.into()),
            new_name: new_name.into(),
            success: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A failed upload. Requires at least one error message.
    pub fn failure(
        reference_id: impl Into<String>,
        new_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            reference_id: reference_id.into(),
            migrated_id: None,
            new_name: new_name.into(),
            success: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Status of one record inside a [`MigrationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Uploaded and verified.
    Complete,
    /// Upload attempted and failed.
    Error,
    /// Read from the source but never attempted (no entry in `results`).
    Skipped,
}

/// Aggregated outcome for one component type.
///
/// Invariant: every key in `results` exists in `records`. The reverse need
/// not hold; a record with no attempted upload reports as
/// [`RecordStatus::Skipped`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Component label (tool name).
    pub name: String,
    /// Source records read, keyed by source id.
    pub records: BTreeMap<String, MigrationRecord>,
    /// Upload outcomes, keyed by source id.
    pub results: BTreeMap<String, UploadResult>,
    /// Component-level errors (not tied to a single record).
    pub errors: Vec<String>,
}

impl MigrationResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A result carrying only a component-level error. Used by the
    /// orchestrator when a tool's migrate fails outright.
    pub fn from_error(name: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new(name);
        result.errors.push(error.into());
        result
    }

    /// Record an upload outcome, debug-asserting the `results ⊆ records`
    /// invariant.
    pub fn record_result(&mut self, source_id: &str, result: UploadResult) {
        debug_assert!(
            self.records.contains_key(source_id),
            "result recorded for unknown record {source_id}"
        );
        self.results.insert(source_id.to_string(), result);
    }

    /// Status of a single source record.
    pub fn status_of(&self, source_id: &str) -> RecordStatus {
        match self.results.get(source_id) {
            Some(r) if r.success => RecordStatus::Complete,
            Some(_) => RecordStatus::Error,
            None => RecordStatus::Skipped,
        }
    }

    /// Number of successfully uploaded records.
    pub fn success_count(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    /// Whether the component migrated cleanly: every source record has a
    /// successful result and there are no component-level errors.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.success_count() == self.records.len()
    }

    /// Every error from this component, prefixed with the record name, for
    /// the operator-facing action items list.
    pub fn action_items(&self) -> Vec<String> {
        let mut items: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("[{}] {}", self.name, e))
            .collect();
        for (source_id, result) in &self.results {
            let record_name = self
                .records
                .get(source_id)
                .map(|r| r.name.as_str())
                .unwrap_or(source_id.as_str());
            for error in &result.errors {
                items.push(format!("[{}] {}: {}", self.name, record_name, error));
            }
        }
        items
    }
}

/// One dry-run finding: what would happen to a record if migrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentInfo {
    pub component_type: ComponentType,
    pub source_id: String,
    pub name: String,
    /// Name the record would receive in the target schema.
    pub new_name: String,
    /// False when a blocking condition (duplicate name, unmappable field)
    /// was detected.
    pub eligible: bool,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_migrated_id() {
        let ok = UploadResult::success("ref1", "core-001", "MyMapper");
        assert!(ok.success);
        assert_eq!(ok.migrated_id.as_deref(), Some("core-001"));
        assert!(ok.errors.is_empty());
    }

    #[test]
    fn test_failure_has_no_migrated_id() {
        let bad = UploadResult::failure("ref1", "MyMapper", "duplicate name");
        assert!(!bad.success);
        assert!(bad.migrated_id.is_none());
        assert!(bad.has_errors());
    }

    #[test]
    fn test_status_of_unattempted_record_is_skipped() {
        let mut result = MigrationResult::new("Data Mapper");
        result
            .records
            .insert("a01".into(), MigrationRecord::new("a01", "Mapper A"));
        assert_eq!(result.status_of("a01"), RecordStatus::Skipped);

        result.record_result("a01", UploadResult::failure("r1", "MapperA", "boom"));
        assert_eq!(result.status_of("a01"), RecordStatus::Error);
    }

    #[test]
    fn test_action_items_include_record_names() {
        let mut result = MigrationResult::new("Script");
        result
            .records
            .insert("a01".into(), MigrationRecord::new("a01", "Quote Flow"));
        result.record_result(
            "a01",
            UploadResult::failure("r1", "QuoteFlow", "duplicate name 'QuoteFlow'"),
        );
        result.errors.push("feature flag already enabled".into());

        let items = result.action_items();
        assert_eq!(items.len(), 2);
        assert!(items[0].contains("feature flag"));
        assert!(items[1].contains("Quote Flow"));
    }

    #[test]
    fn test_is_clean() {
        let mut result = MigrationResult::new("Card");
        result
            .records
            .insert("a01".into(), MigrationRecord::new("a01", "Card A"));
        assert!(!result.is_clean());

        result.record_result("a01", UploadResult::success("r1", "core-1", "CardA"));
        assert!(result.is_clean());
    }
}
