//! Grammar-based parser consumer.
//!
//! The rewriting engine does not own a grammar; it consumes tree-sitter
//! with the Java grammar, which covers the Java-syntax extension classes
//! the managed package ships. Parse failures put the file into the
//! `Failed` terminal state rather than producing best-effort edits.

use tree_sitter::{Parser, Tree};

use crate::error::{MigrateError, Result};

/// Thin wrapper around a configured tree-sitter parser.
pub struct SourceParser {
    parser: Parser,
}

impl SourceParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| MigrateError::Rewrite(format!("failed to load grammar: {e}")))?;
        Ok(Self { parser })
    }

    /// Parse source text into a syntax tree.
    ///
    /// A tree containing error nodes is treated as a parse failure: edits
    /// derived from a broken tree could splice text into the wrong spans.
    pub fn parse(&mut self, file: &str, source: &str) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| MigrateError::Parse {
                file: file.to_string(),
                message: "parser returned no tree".to_string(),
            })?;

        if tree.root_node().has_error() {
            return Err(MigrateError::Parse {
                file: file.to_string(),
                message: "source contains syntax errors".to_string(),
            });
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_class() {
        let mut parser = SourceParser::new().unwrap();
        let tree = parser
            .parse("Demo.cls", "public class Demo { }")
            .unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[test]
    fn test_parse_broken_source_is_failure() {
        let mut parser = SourceParser::new().unwrap();
        let err = parser.parse("Broken.cls", "public class { {").unwrap_err();
        assert!(matches!(err, MigrateError::Parse { .. }));
    }
}
