//! Diagnostic taxonomy: user-facing [`ExternalDiagnostic`]s for malformed
//! scripts and [`InternalDiagnostic`]s for a broken compiler invariant
//! (unregistered factory, misbehaving grammar). Both are derived with
//! `thiserror` rather than hand-written `Display` impls, since each variant
//! carries several named fields that are easier to keep in sync as
//! `#[error("...")]` format strings than as manual `write!` calls.

use crate::source::Position;
use std::collections::BTreeSet;

/// A parse failure caused by malformed input, not a compiler bug.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalDiagnostic {
    #[error("syntax error at {position}: unexpected {offending_context:?}, expected one of {expected:?}")]
    SyntaxError {
        position: Position,
        offending_context: String,
        expected: BTreeSet<String>,
    },

    #[error("multiple `targets = [...]` definitions found; kept {kept:?}, rejected {rejected:?}")]
    MultipleTargetListDefinitions { kept: String, rejected: Vec<String> },

    #[error("statement does not match `extract where ...` or `extract from ALIAS where ...`: {statement:?}")]
    BadExtractStatement { statement: String },

    #[error("no action kind claims statement: {statement:?}")]
    UnknownActionKind { statement: String },

    #[error("multiple action kinds claim statement {statement:?}: {claimants:?}")]
    ConflictingActionKinds {
        statement: String,
        claimants: Vec<String>,
    },

    #[error("unrecognized {filter_type} filter value shape: {raw:?}")]
    UnknownAtomicValueShape { filter_type: String, raw: String },

    #[error("action block targets undeclared alias {alias:?}")]
    UnknownTargetAlias { alias: String },
}

/// A failure of the compiler's own invariants. Never caused by user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalDiagnostic {
    #[error("grammar has no start rule for {rule_name:?}")]
    NoStartRule { rule_name: String },

    #[error("grammar handler failure while parsing {stage:?}: {message}")]
    GrammarHandlerFailure { stage: String, message: String },

    #[error("no raw content provided to {stage:?}")]
    NoRawContentProvided { stage: String },

    #[error("transformer failed to interpret parse tree at {stage:?}: {message}")]
    TransformerParseError { stage: String, message: String },

    #[error("content shape does not match registered plugin {plugin:?}: {message}")]
    IncorrectContentForPlugin { plugin: String, message: String },

    #[error("no operation factory registered for action kind {action_kind:?}")]
    MissingOperationFactory { action_kind: String },
}

/// The `Err` type of every fallible operation this crate exposes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    External(#[from] ExternalDiagnostic),
    #[error(transparent)]
    Internal(#[from] InternalDiagnostic),
}

pub type Result<T> = std::result::Result<T, CompileError>;
