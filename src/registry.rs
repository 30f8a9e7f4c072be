//! Action registry & dispatcher (§4.4): a process-wide, insertion-ordered
//! mapping from an opaque action kind to a `{classify, build}` pair,
//! populated once and read-only thereafter. Dispatch runs every classifier
//! against a statement string and requires exactly one match.

use crate::ast::Action;
use crate::error::{CompileError, ExternalDiagnostic};
use crate::filter;
use crate::source::Source;
use once_cell::sync::Lazy;

/// An opaque newtype over the short string used as both the action
/// registry's key and the lowering registry's key, replacing the
/// string-as-hash-key pattern with a value whose equality and hashing are
/// simply the wrapped string's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKind(pub &'static str);

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const FILTER: ActionKind = ActionKind("filter");

struct ActionDefinition {
    kind: ActionKind,
    classify: fn(&str) -> bool,
    build: fn(&str, usize, &Source<'_>) -> Result<Action, CompileError>,
}

/// The action registry, populated once on first access. Insertion order
/// matters only for reporting `claimants` in declaration order; it has no
/// bearing on dispatch semantics.
static REGISTRY: Lazy<Vec<ActionDefinition>> = Lazy::new(|| {
    vec![ActionDefinition {
        kind: FILTER,
        classify: filter::classify,
        build: filter::build,
    }]
});

/// Classify and build one statement string into an [`Action`].
///
/// `offset` is the statement's absolute byte offset in `source`, threaded
/// through to `build` so any diagnostic raised while parsing the
/// statement's body resolves to a real position in the original script
/// rather than one local to the extracted statement text.
///
/// Exactly one registered classifier must accept the statement. Zero or
/// more than one is a malformed-script condition, not a registry bug, since
/// the only way a statement fails every classifier or satisfies several is
/// through its own text — surfaced as [`ExternalDiagnostic::UnknownActionKind`]
/// / [`ExternalDiagnostic::ConflictingActionKinds`].
pub fn dispatch(statement: &str, offset: usize, source: &Source<'_>) -> Result<Action, CompileError> {
    let claimants: Vec<&ActionDefinition> = REGISTRY
        .iter()
        .filter(|definition| (definition.classify)(statement))
        .collect();

    match claimants.as_slice() {
        [] => Err(ExternalDiagnostic::UnknownActionKind {
            statement: statement.to_string(),
        }
        .into()),
        [only] => (only.build)(statement, offset, source),
        many => Err(ExternalDiagnostic::ConflictingActionKinds {
            statement: statement.to_string(),
            claimants: many.iter().map(|d| d.kind.to_string()).collect(),
        }
        .into()),
    }
}
