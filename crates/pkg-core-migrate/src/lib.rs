//! # pkg-core-migrate
//!
//! Migration engine for moving managed-package components onto the
//! platform-native core schema.
//!
//! The library drives each component type through a fixed lifecycle —
//! assess, truncate, migrate, validate, cleanup — with support for:
//!
//! - **Dependency ordering** across component types, so referenced
//!   components land before their consumers
//! - **Name cleaning** through a registry built once per run, with
//!   collision detection
//! - **Source rewriting** of extension classes off the legacy interfaces,
//!   via syntax-tree token edits
//! - **Deployment polling** with bounded per-job and per-request budgets
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pkg_core_migrate::{Config, MemoryRecordStore, Orchestrator, Result, ToolContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let store = Arc::new(MemoryRecordStore::new());
//!     let ctx = ToolContext::new(store.clone(), store, &config.namespace);
//!     let report = Orchestrator::new(ctx, None).run().await?;
//!     println!("Migrated {} records", report.records_migrated);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod deploy;
pub mod error;
pub mod mapping;
pub mod names;
pub mod orchestrator;
pub mod rewrite;
pub mod store;
pub mod tools;

// Re-exports for convenient access
pub use crate::config::{Config, DeployConfig, MigrationConfig, RewriteConfig};
pub use crate::core::{
    ComponentType, DeployRequest, DeployStatus, DeploymentApi, MetadataStore, MigrationResult,
    MigrationTool, Prompter, RecordStore, UploadResult,
};
pub use crate::deploy::{DeploymentPoller, PollerConfig};
pub use crate::error::{MigrateError, Result};
pub use crate::names::{clean_name, ComponentInventory, NameRegistry};
pub use crate::orchestrator::{Orchestrator, RunReport};
pub use crate::rewrite::{FileRewrite, RewriteStatus, SourceRewriter};
pub use crate::store::MemoryRecordStore;
pub use crate::tools::ToolContext;
