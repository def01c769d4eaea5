//! Core compiler for the OWS scripting language.
//!
//! OWS programs declare variables, constants and rules; the compiler turns
//! them into the `rule { event / conditions / actions }` text format of the
//! workshop. The pipeline is:
//!
//!   source .ows
//!     -> lexer / cursor (tokens, one-token lookahead)
//!     -> parser         (AST)
//!     -> compiler       (scopes, slots, type checks against the catalog)
//!     -> codegen        (indented rule text, optional minification)
//!
//! Front ends such as the CLI should depend on this crate rather than
//! reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Front-end: vocabulary, lexing and parsing
// ---------------------------------------------------------------------

pub mod vocabulary;
pub mod lexer;
pub mod cursor;
pub mod ast;
pub mod parser;

// ---------------------------------------------------------------------
// Semantic layers: types, builtins, scopes and slots
// ---------------------------------------------------------------------

pub mod types;
pub mod builtins;
pub mod scope;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use ast::Node;
pub use builtins::Catalog;
pub use codegen::minify;
pub use compiler::{CompileOptions, Compiler, compile, compile_ast, compile_with};
pub use error::{CoreError, SemanticError};
pub use parser::{parse, parse_with};
pub use vocabulary::Vocabulary;

/// Pretty-printed JSON of a syntax tree, for the debug artifact.
pub fn ast_to_json(ast: &Node) -> Result<String, CoreError> {
    Ok(serde_json::to_string_pretty(ast)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ast_json_names_node_types() {
        let ast = parse(r#"var x = 1; rule "R": Event.global() { x = 2; }"#).expect("parse");
        let json = ast_to_json(&ast).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["type"], "block");
        assert_eq!(value["statements"][0]["type"], "declare");
        assert_eq!(value["statements"][1]["type"], "rule");
        assert_eq!(value["statements"][1]["eventTarget"], "global");
        assert_eq!(value["statements"][1]["actions"][0]["type"], "assign");
    }
}
