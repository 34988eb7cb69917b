//! Record transform layer: old field → new field mapping tables.
//!
//! One fixed source schema, one fixed target schema. Each component type
//! carries a static table mapping canonical (namespace-stripped) source
//! field names to target field names. The namespace adapter turns the
//! runtime-prefixed field keys a query returns (`vlocity_ins__Type__c`)
//! into the canonical key (`Type__c`) the tables are written against.

use crate::core::MigrationRecord;
use crate::error::Result;
use serde_json::{Map, Value};

/// One old-field → new-field entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Canonical source field name (namespace prefix already stripped).
    pub source: &'static str,
    /// Target schema field name.
    pub target: &'static str,
}

const fn m(source: &'static str, target: &'static str) -> FieldMapping {
    FieldMapping { source, target }
}

/// Data mapper (DRBundle__c → OmniDataTransform) field table.
pub static DATA_MAPPER_FIELDS: &[FieldMapping] = &[
    m("Name", "Name"),
    m("Type__c", "Type"),
    m("Description__c", "Description"),
    m("InputType__c", "InputType"),
    m("OutputType__c", "OutputType"),
    m("TargetFieldName__c", "TargetFieldName"),
    m("SourceObject__c", "SourceObject"),
    m("IsProcedure__c", "IsIntegrationProcedure"),
    m("ResponseCacheType__c", "ResponseCacheType"),
    m("Active__c", "IsActive"),
];

/// Script / integration procedure (OmniScript__c → OmniProcess) field table.
pub static SCRIPT_FIELDS: &[FieldMapping] = &[
    m("Name", "Name"),
    m("Type__c", "Type"),
    m("SubType__c", "SubType"),
    m("Language__c", "Language"),
    m("Version__c", "VersionNumber"),
    m("IsActive__c", "IsActive"),
    m("IsProcedure__c", "IsIntegrationProcedure"),
    m("CustomJavaScript__c", "CustomJavaScript"),
    m("PropertySet__c", "PropertySetConfig"),
];

/// Card (VlocityCard__c → OmniUiCard) field table.
pub static CARD_FIELDS: &[FieldMapping] = &[
    m("Name", "Name"),
    m("Author__c", "AuthorName"),
    m("Version__c", "VersionNumber"),
    m("Active__c", "IsActive"),
    m("CardType__c", "OmniUiCardType"),
    m("Definition__c", "PropertySetConfig"),
    m("StylingConfiguration__c", "StylingConfiguration"),
];

/// Auto number (AutoNumber__c → AutoNumber) field table.
pub static AUTO_NUMBER_FIELDS: &[FieldMapping] = &[
    m("Name", "Name"),
    m("ObjectName__c", "ObjectName"),
    m("FieldName__c", "FieldName"),
    m("Format__c", "Format"),
    m("StartingNumber__c", "StartingNumber"),
    m("IsActive__c", "IsActive"),
];

/// Label (Label__c → Label) field table.
pub static LABEL_FIELDS: &[FieldMapping] = &[
    m("Name", "Name"),
    m("Value__c", "Value"),
    m("Language__c", "Language"),
    m("Category__c", "Category"),
    m("IsProtected__c", "IsProtected"),
];

/// Strip a known namespace prefix (`ns__`) from a field name.
///
/// Returns the canonical key unchanged when the prefix is absent; standard
/// fields (`Name`, `Id`) carry no prefix in the first place.
pub fn strip_namespace<'a>(field: &'a str, namespace: &str) -> &'a str {
    if namespace.is_empty() {
        return field;
    }
    let prefix_len = namespace.len() + 2;
    if field.len() > prefix_len
        && field.starts_with(namespace)
        && field[namespace.len()..].starts_with("__")
    {
        &field[prefix_len..]
    } else {
        field
    }
}

/// Result of transforming one record's fields.
#[derive(Debug, Clone, Default)]
pub struct TransformedRecord {
    /// Target-schema payload, ready for the create call.
    pub payload: Map<String, Value>,
    /// Source fields with no entry in the mapping table. Surfaced as
    /// warnings, never silently dropped.
    pub unmapped: Vec<String>,
}

/// Transform a record's fields through a component mapping table.
///
/// Each source field key has its namespace prefix stripped, is looked up in
/// the table, and lands in the payload under the target name. Fields absent
/// from the table are collected into `unmapped`. The input record is not
/// modified.
pub fn transform_record(
    record: &MigrationRecord,
    table: &[FieldMapping],
    namespace: &str,
) -> Result<TransformedRecord> {
    let mut out = TransformedRecord::default();

    for (field, value) in &record.fields {
        let canonical = strip_namespace(field, namespace);
        if canonical == "Id" {
            // Source ids never carry over; the target assigns its own.
            continue;
        }
        match table.iter().find(|fm| fm.source == canonical) {
            Some(fm) => {
                out.payload.insert(fm.target.to_string(), value.clone());
            }
            None => out.unmapped.push(field.clone()),
        }
    }

    Ok(out)
}
