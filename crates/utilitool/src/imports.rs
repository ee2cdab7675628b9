//! Module specifier extraction
//!
//! Parses a TypeScript/JavaScript file with tree-sitter and locates every
//! string literal that names a module: static imports, `export ... from`
//! re-exports and `import("...")` calls with a single literal argument.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

/// Errors that can occur while parsing a source file
#[derive(Debug, Error)]
pub enum ParseError {
    /// The grammar could not be loaded into the parser
    #[error("Failed to load grammar for {path}: {message}")]
    Language { path: PathBuf, message: String },

    /// tree-sitter returned no tree
    #[error("Failed to parse {0}")]
    NoTree(PathBuf),
}

/// Location of a specifier's content, excluding the surrounding quotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRange {
    /// Byte offset of the first character after the opening quote
    pub start: usize,
    /// Byte offset of the closing quote
    pub end: usize,
    /// Raw literal content, escape sequences left as written
    pub literal_text: String,
}

/// A parsed source file and the specifier ranges found in it
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub reference_ranges: Vec<TextRange>,
}

impl SourceFile {
    /// Parse `text` and collect its specifier ranges
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self, ParseError> {
        let path = path.into();
        let text = text.into();
        let reference_ranges = find_import_ranges(&path, &text)?;
        Ok(Self {
            path,
            text,
            reference_ranges,
        })
    }
}

fn language_for(path: &Path) -> Language {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsx") | Some("jsx") => tree_sitter_typescript::language_tsx(),
        _ => tree_sitter_typescript::language_typescript(),
    }
}

/// Find all module specifier ranges in `text`, ordered by position.
///
/// Specifiers computed at runtime (`import(name)`, template literals) are
/// not collected since they cannot be rewritten statically.
pub fn find_import_ranges(path: &Path, text: &str) -> Result<Vec<TextRange>, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&language_for(path))
        .map_err(|e| ParseError::Language {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let tree = parser
        .parse(text, None)
        .ok_or_else(|| ParseError::NoTree(path.to_path_buf()))?;

    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!("syntax errors in {}, extracting specifiers anyway", path.display());
    }

    let mut ranges = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match specifier_of(&node) {
            Visit::Found(literal) => ranges.push(literal_range(&literal, text)),
            Visit::Skip => {}
            Visit::Descend => {
                // Reversed so that children are visited in source order
                let mut cursor = node.walk();
                let children: Vec<Node> = node.children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }
    }

    ranges.sort_by_key(|range| range.start);
    Ok(ranges)
}

enum Visit<'tree> {
    /// The node is a module reference with this string literal
    Found(Node<'tree>),
    /// The node is a module reference without a literal specifier
    Skip,
    Descend,
}

fn specifier_of<'tree>(node: &Node<'tree>) -> Visit<'tree> {
    match node.kind() {
        "import_statement" => match node.child_by_field_name("source") {
            Some(source) if source.kind() == "string" => Visit::Found(source),
            _ => Visit::Skip,
        },
        // `export const x = import("./x")` has no source but may nest dynamic imports
        "export_statement" => match node.child_by_field_name("source") {
            Some(source) if source.kind() == "string" => Visit::Found(source),
            Some(_) => Visit::Skip,
            None => Visit::Descend,
        },
        "call_expression" => {
            let is_import = node
                .child_by_field_name("function")
                .map_or(false, |callee| callee.kind() == "import");
            if !is_import {
                return Visit::Descend;
            }
            let arguments = match node.child_by_field_name("arguments") {
                Some(arguments) => arguments,
                None => return Visit::Skip,
            };
            let mut cursor = arguments.walk();
            let args: Vec<Node> = arguments
                .named_children(&mut cursor)
                .filter(|arg| arg.kind() != "comment")
                .collect();
            match args.as_slice() {
                [only] if only.kind() == "string" => Visit::Found(*only),
                [_] => Visit::Skip,
                _ => Visit::Descend,
            }
        }
        _ => Visit::Descend,
    }
}

fn literal_range(literal: &Node, text: &str) -> TextRange {
    let start = literal.start_byte() + 1;
    let end = literal.end_byte().saturating_sub(1).max(start);
    TextRange {
        start,
        end,
        literal_text: text.get(start..end).unwrap_or_default().to_string(),
    }
}
