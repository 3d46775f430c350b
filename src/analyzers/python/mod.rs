//! Python parsing on top of tree-sitter.
//!
//! The tree-sitter grammar is more permissive than CPython: it accepts
//! Python 2 `print`/`exec` statements and compound statements without a
//! body. Both are rejected here so that "parses" means the same thing as
//! `ast.parse` succeeding.

pub mod kinds;
mod lower;
pub mod syntax;

pub use kinds::{classify_expression, classify_statement, AstKind};
pub use syntax::{NodeId, NodeKind, SubTree, SyntaxTree};

use crate::errors::{Error, Result};
use tree_sitter::Parser;

pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| Error::ParserSetup(format!("Failed to set Python language: {e}")))?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<SyntaxTree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::parse(1, "parser produced no tree"))?;
        let root = tree.root_node();

        if root.has_error() {
            let (line, message) = describe_error(root);
            return Err(Error::parse(line, message));
        }

        lower::Lowering::new(source).lower_module(root)
    }
}

/// Parse `source` with a fresh parser.
pub fn parse(source: &str) -> Result<SyntaxTree> {
    PythonParser::new()?.parse(source)
}

fn describe_error(root: tree_sitter::Node) -> (usize, String) {
    match first_error(root) {
        Some(node) if node.is_missing() => (
            node.start_position().row + 1,
            format!("missing `{}`", node.kind()),
        ),
        Some(node) => (node.start_position().row + 1, "invalid syntax".to_string()),
        None => (root.start_position().row + 1, "invalid syntax".to_string()),
    }
}

fn first_error(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_sources() {
        assert!(parse("").is_ok());
        assert!(parse("def f(): pass").is_ok());
        assert!(parse("def f():\n    pass").is_ok());
        assert!(parse("def f(:").is_err());
        assert!(parse("def f():").is_err());
        assert!(parse("def f():\npass").is_err());
        assert!(parse("print 'hello'").is_err());
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = parse("x = 1\ny = (\n").unwrap_err();
        match err {
            Error::Parse { line, .. } => assert!(line >= 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parser_is_reusable() {
        let mut parser = PythonParser::new().unwrap();
        let first = parser.parse("a = 1").unwrap();
        let second = parser.parse("import os\nimport sys").unwrap();
        assert_eq!(first.children(first.root()).len(), 1);
        assert_eq!(second.children(second.root()).len(), 2);
    }
}
