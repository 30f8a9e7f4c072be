//! Compiler front-end and lowering core for a small scripting language used
//! to declare HTML extraction scripts.
//!
//! A script names remote targets by URL alias and, for each target, issues
//! `extract where ...` / `extract from ALIAS where ...` statements whose
//! bodies are boolean combinations of HTML-property predicates. This crate
//! turns a raw script string into a stable [`ir::IntermediateRepresentation`]
//! a downstream execution engine can apply to fetched HTML; it does not
//! fetch, parse, or traverse HTML itself.
//!
//! The pipeline is three total stages, each either producing a value or a
//! structured [`error::CompileError`]:
//!
//! ```text
//! raw_source + id -> HighLevelTree -> ScriptTree -> IntermediateRepresentation
//! ```
//!
//! [`compile`] runs the full pipeline; [`parse_to_ast`] stops after AST
//! assembly; [`lower`] is total given a [`ast::ScriptTree`] already produced
//! by this crate.

pub mod ast;
mod block;
pub mod error;
mod filter;
mod grammar;
pub mod ir;
mod lower;
mod high_level;
mod registry;
pub mod source;
mod util;

use ast::{ActionBlock, ScriptTree};
use error::{CompileError, ExternalDiagnostic};
use ir::IntermediateRepresentation;
use source::Source;

/// Parse a raw script into its AST (§4.2–§4.6): split into targets and raw
/// action blocks, dispatch every statement to its action kind, and verify
/// every block targets a declared alias.
pub fn parse_to_ast(source_text: &str) -> Result<ScriptTree, CompileError> {
    let source = Source::new(source_text);
    let high_level_tree = high_level::parse_high_level(&source)?;

    let mut action_blocks = Vec::with_capacity(high_level_tree.blocks.len());
    for (target, raw_block_body, block_offset) in high_level_tree.blocks {
        if !high_level_tree.targets.contains_key(&target) {
            return Err(ExternalDiagnostic::UnknownTargetAlias { alias: target }.into());
        }
        let statements = block::split_statements(&raw_block_body);
        let actions = statements
            .iter()
            .map(|(statement, local_offset)| {
                registry::dispatch(statement, block_offset + local_offset, &source)
            })
            .collect::<Result<Vec<_>, _>>()?;
        action_blocks.push(ActionBlock { target, actions });
    }

    Ok(ScriptTree {
        targets: high_level_tree.targets,
        action_blocks,
    })
}

/// Lower an already-assembled [`ScriptTree`] into an
/// [`IntermediateRepresentation`]. Total: a `ScriptTree` produced by
/// [`parse_to_ast`] has already had every invariant `lower` depends on
/// checked.
pub fn lower(ast: &ScriptTree, identifier: &str) -> Result<IntermediateRepresentation, CompileError> {
    lower::lower(ast, identifier)
}

/// Compile a raw script source string into its intermediate representation.
/// The full pipeline: `parse_to_ast` followed by `lower`.
pub fn compile(source_text: &str, identifier: &str) -> Result<IntermediateRepresentation, CompileError> {
    let ast = parse_to_ast(source_text)?;
    lower(&ast, identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_minimal_script() {
        let ir = compile(
            r#"targets = [A: "u1"] A: { extract where tag "div" -> out; }"#,
            "script-1",
        )
        .expect("compiles");
        assert_eq!(ir.instruction_list.len(), 1);
        assert_eq!(ir.instruction_list[0].url, "u1");
        assert_eq!(ir.instruction_list[0].alias, "A");
    }

    #[test]
    fn rejects_action_block_for_undeclared_target() {
        let err = parse_to_ast(r#"targets = [A: "u1"] B: { extract where tag "div" -> out; }"#)
            .unwrap_err();
        match err {
            CompileError::External(ExternalDiagnostic::UnknownTargetAlias { alias }) => {
                assert_eq!(alias, "B");
            }
            other => panic!("expected UnknownTargetAlias, got {other:?}"),
        }
    }

    #[test]
    fn syntax_error_inside_filter_reports_real_script_line() {
        let script = "targets = [A: \"u1\"]\nA: {\n    extract where bogus \"div\" -> out;\n}";
        let err = parse_to_ast(script).unwrap_err();
        match err {
            CompileError::External(ExternalDiagnostic::SyntaxError { position, .. }) => {
                assert_eq!(position.line, 3);
            }
            other => panic!("expected SyntaxError, got {other:?}"),
        }
    }
}
