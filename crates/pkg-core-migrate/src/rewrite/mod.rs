//! Source rewriting: migrate extension classes off the legacy managed
//! interfaces and clean component-name arguments at known call sites.
//!
//! The pipeline per file is parse → derive token edits → apply to the
//! original text → diff. Files that fail to parse are reported and left
//! untouched; a partial rewrite of a file never happens.

mod diff;
mod edits;
mod engine;
mod parser;

pub use diff::unified_diff;
pub use edits::{apply_edits, EditKind, TokenEdit};
pub use engine::{RewriteEngine, CALL_SIGNATURES, LEGACY_INTERFACES, TARGET_INTERFACE};
pub use parser::SourceParser;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::names::NameRegistry;

/// Terminal state of one file after a rewrite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStatus {
    /// Analysis found nothing to change.
    NoChange,
    /// Edits were derived (and applied, unless dry-run).
    Rewritten,
    /// The file could not be processed; it was left untouched.
    Failed,
}

/// Outcome of rewriting one file.
#[derive(Debug)]
pub struct FileRewrite {
    pub file: PathBuf,
    pub status: RewriteStatus,
    pub edits_applied: usize,
    pub warnings: Vec<String>,
    /// Unified diff of the change; empty for `NoChange` and `Failed`.
    pub diff: String,
    pub error: Option<String>,
}

/// Drives the rewrite pipeline over files and directories.
pub struct SourceRewriter<'r> {
    parser: SourceParser,
    engine: RewriteEngine<'r>,
    dry_run: bool,
}

impl<'r> SourceRewriter<'r> {
    pub fn new(namespace: &str, registry: &'r NameRegistry, dry_run: bool) -> Result<Self> {
        Ok(Self {
            parser: SourceParser::new()?,
            engine: RewriteEngine::new(namespace, registry),
            dry_run,
        })
    }

    /// Rewrite in-memory source, returning the new text, the edits that
    /// produced it, and any advisory warnings.
    pub fn rewrite_source(
        &mut self,
        file: &str,
        source: &str,
    ) -> Result<(String, Vec<TokenEdit>, Vec<String>)> {
        let tree = self.parser.parse(file, source)?;
        let (token_edits, warnings) = self.engine.derive_edits(source, &tree)?;
        let rewritten = apply_edits(source, &token_edits)?;
        Ok((rewritten, token_edits, warnings))
    }

    /// Rewrite one file on disk. Errors are folded into the returned
    /// `Failed` outcome so one broken file never stops a directory pass.
    pub fn rewrite_file(&mut self, path: &Path) -> FileRewrite {
        let label = path.display().to_string();
        match self.process_file(path, &label) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(file = %label, error = %e, "rewrite failed");
                FileRewrite {
                    file: path.to_path_buf(),
                    status: RewriteStatus::Failed,
                    edits_applied: 0,
                    warnings: Vec::new(),
                    diff: String::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Rewrite every eligible source file directly under `dir`, in
    /// deterministic name order.
    pub fn rewrite_dir(&mut self, dir: &Path) -> Result<Vec<FileRewrite>> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_source_file(p))
            .collect();
        files.sort();

        info!(dir = %dir.display(), files = files.len(), "rewriting sources");
        Ok(files.iter().map(|p| self.rewrite_file(p)).collect())
    }

    fn process_file(&mut self, path: &Path, label: &str) -> Result<FileRewrite> {
        let source = fs::read_to_string(path)?;
        let (rewritten, token_edits, warnings) = self.rewrite_source(label, &source)?;

        if token_edits.is_empty() {
            debug!(file = %label, "no changes");
            return Ok(FileRewrite {
                file: path.to_path_buf(),
                status: RewriteStatus::NoChange,
                edits_applied: 0,
                warnings,
                diff: String::new(),
                error: None,
            });
        }

        let diff = unified_diff(label, label, &source, &rewritten);
        if self.dry_run {
            info!(file = %label, edits = token_edits.len(), "would rewrite (dry run)");
        } else {
            fs::write(path, &rewritten)?;
            info!(file = %label, edits = token_edits.len(), "rewrote");
        }

        Ok(FileRewrite {
            file: path.to_path_buf(),
            status: RewriteStatus::Rewritten,
            edits_applied: token_edits.len(),
            warnings,
            diff,
            error: None,
        })
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("cls") || ext.eq_ignore_ascii_case("java"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::ComponentInventory;

    const LEGACY: &str = "\
public class QuoteHandler implements VlocityOpenInterface {
    public Boolean invokeMethod(String m, Map<String, Object> i,
            Map<String, Object> o, Map<String, Object> opts) {
        return true;
    }
}
";

    fn built_registry() -> NameRegistry {
        let mut registry = NameRegistry::new();
        registry.pre_process_components(&ComponentInventory::default());
        registry
    }

    #[test]
    fn test_apply_rewrites_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("QuoteHandler.cls");
        fs::write(&path, LEGACY).unwrap();

        let registry = built_registry();
        let mut rewriter = SourceRewriter::new("vlocity_ins", &registry, false).unwrap();
        let outcome = rewriter.rewrite_file(&path);

        assert_eq!(outcome.status, RewriteStatus::Rewritten);
        assert_eq!(outcome.edits_applied, 2);
        assert!(outcome.diff.contains("+public class QuoteHandler implements Callable {"));

        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("implements Callable"));
        assert!(on_disk.contains("public Object call"));
    }

    #[test]
    fn test_dry_run_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("QuoteHandler.cls");
        fs::write(&path, LEGACY).unwrap();

        let registry = built_registry();
        let mut rewriter = SourceRewriter::new("vlocity_ins", &registry, true).unwrap();
        let outcome = rewriter.rewrite_file(&path);

        assert_eq!(outcome.status, RewriteStatus::Rewritten);
        assert!(!outcome.diff.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), LEGACY);
    }

    #[test]
    fn test_unparseable_file_fails_and_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Broken.cls");
        fs::write(&path, "public class { {").unwrap();

        let registry = built_registry();
        let mut rewriter = SourceRewriter::new("vlocity_ins", &registry, false).unwrap();
        let outcome = rewriter.rewrite_file(&path);

        assert_eq!(outcome.status, RewriteStatus::Failed);
        assert!(outcome.error.is_some());
        assert_eq!(fs::read_to_string(&path).unwrap(), "public class { {");
    }

    #[test]
    fn test_directory_pass_is_sorted_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("B.cls"), LEGACY).unwrap();
        fs::write(dir.path().join("A.cls"), "public class A { }").unwrap();
        fs::write(dir.path().join("notes.txt"), "not source").unwrap();

        let registry = built_registry();
        let mut rewriter = SourceRewriter::new("vlocity_ins", &registry, false).unwrap();
        let outcomes = rewriter.rewrite_dir(dir.path()).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].file.ends_with("A.cls"));
        assert_eq!(outcomes[0].status, RewriteStatus::NoChange);
        assert_eq!(outcomes[1].status, RewriteStatus::Rewritten);
    }
}
