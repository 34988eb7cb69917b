//! Offline collaborator implementations.
//!
//! The engine only ever sees the [`RecordStore`] / [`MetadataStore`]
//! traits; these implementations back them with process memory or JSON
//! snapshot files. They power the test suite and the CLI's offline
//! harness. The real remote transport lives outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::core::{CreateResult, MetadataStore, RecordStore, SourceRecord};
use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    fields: BTreeMap<String, Value>,
}

/// In-memory record and settings store.
///
/// Supports the single filter form the tools use: `field = literal`, where
/// the literal is `true`, `false`, or a quoted string.
#[derive(Default)]
pub struct MemoryRecordStore {
    objects: Mutex<BTreeMap<String, Vec<StoredRecord>>>,
    settings: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    deleted: Mutex<Vec<(String, Vec<String>)>>,
    /// Reference ids whose create call should be rejected, for failure
    /// injection in tests.
    failing_references: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one record into an object type.
    pub fn seed(&self, object_type: &str, id: &str, fields: BTreeMap<String, Value>) {
        let mut objects = self.objects.lock().unwrap();
        objects
            .entry(object_type.to_string())
            .or_default()
            .push(StoredRecord {
                id: id.to_string(),
                fields,
            });
    }

    /// Set one settings flag.
    pub fn set_setting(&self, kind: &str, name: &str, value: Value) {
        let mut settings = self.settings.lock().unwrap();
        settings
            .entry(kind.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Make create calls with this reference id fail.
    pub fn fail_reference(&self, reference_id: &str) {
        self.failing_references
            .lock()
            .unwrap()
            .push(reference_id.to_string());
    }

    /// Records currently stored for an object type.
    pub fn records_of(&self, object_type: &str) -> Vec<(String, BTreeMap<String, Value>)> {
        self.objects
            .lock()
            .unwrap()
            .get(object_type)
            .map(|rs| rs.iter().map(|r| (r.id.clone(), r.fields.clone())).collect())
            .unwrap_or_default()
    }

    /// Delete calls observed, in order.
    pub fn deletions(&self) -> Vec<(String, Vec<String>)> {
        self.deleted.lock().unwrap().clone()
    }

    fn matches(record: &StoredRecord, filter: &str) -> bool {
        let Some((field, literal)) = filter.split_once('=') else {
            return true;
        };
        let field = field.trim();
        let literal = literal.trim();
        let value = record.fields.get(field);

        match literal {
            "true" => value == Some(&Value::Bool(true)),
            "false" => {
                // Absent booleans read as false, matching platform defaults.
                value.is_none() || value == Some(&Value::Bool(false))
            }
            quoted => {
                let unquoted = quoted.trim_matches('\'');
                value.and_then(Value::as_str) == Some(unquoted)
            }
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(
        &self,
        object_type: &str,
        _fields: &[&str],
        filter: Option<&str>,
    ) -> Result<Vec<SourceRecord>> {
        let objects = self.objects.lock().unwrap();
        let records = objects
            .get(object_type)
            .map(|rs| {
                rs.iter()
                    .filter(|r| filter.map_or(true, |f| Self::matches(r, f)))
                    .map(|r| SourceRecord {
                        id: r.id.clone(),
                        fields: r.fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn create_one(
        &self,
        object_type: &str,
        reference_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<CreateResult> {
        if self
            .failing_references
            .lock()
            .unwrap()
            .iter()
            .any(|r| r == reference_id)
        {
            return Ok(CreateResult {
                id: None,
                success: false,
                errors: vec![format!("create rejected for {reference_id}")],
            });
        }

        let id = format!("core-{:04}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut objects = self.objects.lock().unwrap();
        objects
            .entry(object_type.to_string())
            .or_default()
            .push(StoredRecord {
                id: id.clone(),
                fields: payload.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            });

        Ok(CreateResult {
            id: Some(id),
            success: true,
            errors: Vec::new(),
        })
    }

    async fn delete_many(&self, object_type: &str, ids: &[String]) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        if let Some(records) = objects.get_mut(object_type) {
            records.retain(|r| !ids.contains(&r.id));
        }
        self.deleted
            .lock()
            .unwrap()
            .push((object_type.to_string(), ids.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for MemoryRecordStore {
    async fn read_settings(&self, kind: &str, names: &[&str]) -> Result<BTreeMap<String, Value>> {
        let settings = self.settings.lock().unwrap();
        let kind_settings = settings.get(kind);
        Ok(names
            .iter()
            .map(|name| {
                let value = kind_settings
                    .and_then(|s| s.get(*name))
                    .cloned()
                    .unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect())
    }

    async fn update_settings(&self, kind: &str, updates: &BTreeMap<String, Value>) -> Result<()> {
        let mut settings = self.settings.lock().unwrap();
        let kind_settings = settings.entry(kind.to_string()).or_default();
        for (name, value) in updates {
            kind_settings.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

/// Snapshot file layout: one JSON array of records per object type.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    object_type: String,
    records: Vec<StoredRecord>,
}

/// Load a directory of JSON snapshot files into a [`MemoryRecordStore`].
///
/// Each `*.json` file (except `settings.json`) holds one object type's
/// records; `settings.json` holds the metadata flags. Used by the CLI's
/// offline harness to assess against an exported data set.
pub fn load_snapshot_dir(dir: &Path) -> Result<MemoryRecordStore> {
    let store = MemoryRecordStore::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;

        if path.file_name().and_then(|n| n.to_str()) == Some("settings.json") {
            let flags: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(&content)?;
            for (kind, values) in flags {
                for (name, value) in values {
                    store.set_setting(&kind, &name, value);
                }
            }
            continue;
        }

        let snapshot: SnapshotFile = serde_json::from_str(&content).map_err(|e| {
            MigrateError::UserInput(format!("invalid snapshot file {}: {e}", path.display()))
        })?;
        for record in snapshot.records {
            store.seed(&snapshot.object_type, &record.id, record.fields);
        }
    }

    Ok(store)
}
