//! Core data model and collaborator abstractions.
//!
//! This module defines the types that flow through one migration run:
//!
//! - [`ComponentType`]: the six migratable component kinds
//! - [`MigrationRecord`] / [`UploadResult`] / [`MigrationResult`]: per-run,
//!   in-memory migration state (never persisted by this engine)
//! - [`AssessmentInfo`]: dry-run findings
//! - Collaborator traits ([`RecordStore`], [`MetadataStore`], [`Prompter`],
//!   [`DeploymentApi`]): the external services the engine consumes, kept
//!   behind object-safe async traits so tests can substitute in-memory
//!   implementations.

mod component;
mod record;
pub mod traits;

pub use component::ComponentType;
pub use record::{AssessmentInfo, MigrationRecord, MigrationResult, RecordStatus, UploadResult};
pub use traits::{
    CreateResult, DeployRequest, DeployStatus, DeploymentApi, MetadataStore, MigrationTool,
    Prompter, RecordStore, SourceRecord, TruncateOutcome,
};
