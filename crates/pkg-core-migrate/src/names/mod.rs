//! Name cleaning and the run-scoped name mapping registry.
//!
//! Core component names are developer names: alphanumeric, no spaces or
//! punctuation. Managed-package names are free-form, so every renameable
//! component gets a cleaned target name computed once, up front, and every
//! downstream consumer (record migration, source rewriting, reporting)
//! reads the same mapping. A partially populated registry is a correctness
//! bug, not a recoverable condition: reads before the build pass completes
//! return a typed error, never an empty default.

use crate::core::ComponentType;
use crate::error::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Clean a component name into core developer-name form.
///
/// Strips every character that is not ASCII alphanumeric (optionally
/// keeping underscores) and prefixes an `X` when the result would start
/// with a digit. Pure and idempotent: `clean_name(clean_name(x)) ==
/// clean_name(x)` for all inputs.
pub fn clean_name(raw: &str, keep_underscores: bool) -> String {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || (keep_underscores && *c == '_'))
        .collect();

    if cleaned.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        cleaned.insert(0, 'X');
    }

    cleaned
}

/// Clean a field-level name into canonical form.
///
/// Unlike the object-level [`clean_name`], underscores are always kept
/// (field API names rely on them). The whole input is cleaned; nothing is
/// truncated at namespace-style separators. The original implementation
/// dropped everything after the first separator in some call paths, which
/// its own test suite flagged as a likely bug, so that behavior is
/// deliberately not reproduced here.
pub fn clean_field_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Whether names of this component type keep underscores when cleaned.
///
/// Scripts and integration procedures encode `Type_SubType_Language` in
/// their names; the separator is structural and survives cleaning.
fn keeps_underscores(component_type: ComponentType) -> bool {
    matches!(
        component_type,
        ComponentType::Script | ComponentType::IntegrationProcedure
    )
}

/// One `(component type, old name) → new name` entry, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameMappingEntry {
    pub component_type: ComponentType,
    pub old_name: String,
    pub new_name: String,
    /// True when another old name cleans to the same new name.
    pub collision: bool,
}

/// Names of every component to be migrated, fed to the registry build pass.
#[derive(Debug, Clone, Default)]
pub struct ComponentInventory {
    pub data_mappers: Vec<String>,
    pub scripts: Vec<String>,
    /// Scripts authored for the other (legacy) designer runtime. They share
    /// the script namespace, so their names participate in collision
    /// detection even though they migrate through the same tool.
    pub scripts_other_runtime: Vec<String>,
    pub integration_procedures: Vec<String>,
    pub cards: Vec<String>,
}

/// Run-scoped table of old → new component names.
///
/// Explicitly lifecycled: construct (or [`clear`](NameRegistry::clear)) at
/// run start, populate once with
/// [`pre_process_components`](NameRegistry::pre_process_components), then
/// read-only for the remainder of the run.
#[derive(Debug, Default)]
pub struct NameRegistry {
    built: bool,
    entries: BTreeMap<(ComponentType, String), String>,
    /// Reverse index: cleaned name → old names that produce it.
    by_new_name: BTreeMap<(ComponentType, String), Vec<String>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the unbuilt state. Must be called when reusing a registry
    /// across runs in a long-lived process.
    pub fn clear(&mut self) {
        self.built = false;
        self.entries.clear();
        self.by_new_name.clear();
    }

    /// Scan every component to be migrated and record its cleaned target
    /// name. Completes the build pass; lookups are legal afterwards.
    pub fn pre_process_components(&mut self, inventory: &ComponentInventory) {
        self.clear();

        self.insert_all(ComponentType::DataMapper, &inventory.data_mappers);
        self.insert_all(ComponentType::Script, &inventory.scripts);
        self.insert_all(ComponentType::Script, &inventory.scripts_other_runtime);
        self.insert_all(
            ComponentType::IntegrationProcedure,
            &inventory.integration_procedures,
        );
        self.insert_all(ComponentType::Card, &inventory.cards);

        self.built = true;
        debug!(entries = self.entries.len(), "name registry populated");

        for ((component_type, new_name), old_names) in &self.by_new_name {
            if old_names.len() > 1 {
                warn!(
                    %component_type,
                    new_name,
                    old_names = ?old_names,
                    "name collision: multiple components clean to the same name"
                );
            }
        }
    }

    fn insert_all(&mut self, component_type: ComponentType, names: &[String]) {
        for old_name in names {
            let new_name = clean_name(old_name, keeps_underscores(component_type));
            let key = (component_type, old_name.clone());
            // Two identical old names map to the same new name by purity of
            // clean_name; only record the reverse entry once per old name.
            if self.entries.insert(key, new_name.clone()).is_none() {
                self.by_new_name
                    .entry((component_type, new_name))
                    .or_default()
                    .push(old_name.clone());
            }
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    fn ensure_built(&self) -> Result<()> {
        if self.built {
            Ok(())
        } else {
            Err(MigrateError::RegistryNotBuilt)
        }
    }

    /// Target name for a component, as recorded during the build pass.
    pub fn lookup(&self, component_type: ComponentType, old_name: &str) -> Result<&str> {
        self.ensure_built()?;
        self.entries
            .get(&(component_type, old_name.to_string()))
            .map(String::as_str)
            .ok_or_else(|| MigrateError::UnknownName {
                component_type: component_type.to_string(),
                name: old_name.to_string(),
            })
    }

    /// Target name for a component that may not have been inventoried
    /// (e.g. a name referenced only from source code). Falls back to the
    /// pure cleaning function, which is what the build pass would have
    /// recorded. Still requires the registry to be built.
    pub fn target_name(&self, component_type: ComponentType, old_name: &str) -> Result<String> {
        self.ensure_built()?;
        match self.entries.get(&(component_type, old_name.to_string())) {
            Some(name) => Ok(name.clone()),
            None => Ok(clean_name(old_name, keeps_underscores(component_type))),
        }
    }

    /// Old names colliding on the given cleaned name, when more than one.
    pub fn collisions_for(
        &self,
        component_type: ComponentType,
        new_name: &str,
    ) -> Result<Option<&[String]>> {
        self.ensure_built()?;
        Ok(self.colliding_old_names(component_type, new_name))
    }

    fn colliding_old_names(&self, component_type: ComponentType, new_name: &str) -> Option<&[String]> {
        self.by_new_name
            .get(&(component_type, new_name.to_string()))
            .filter(|olds| olds.len() > 1)
            .map(Vec::as_slice)
    }

    /// Whether migrating `old_name` is blocked by a registry collision.
    pub fn is_collision(&self, component_type: ComponentType, old_name: &str) -> Result<bool> {
        let new_name = self.target_name(component_type, old_name)?;
        Ok(self.colliding_old_names(component_type, &new_name).is_some())
    }

    /// Every mapping, for the report. Sorted by component type then name.
    pub fn all_mappings(&self) -> Result<Vec<NameMappingEntry>> {
        self.ensure_built()?;
        Ok(self
            .entries
            .iter()
            .map(|((component_type, old_name), new_name)| NameMappingEntry {
                component_type: *component_type,
                old_name: old_name.clone(),
                new_name: new_name.clone(),
                collision: self.colliding_old_names(*component_type, new_name).is_some(),
            })
            .collect())
    }
}
