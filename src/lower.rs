//! The lowering pass (§4.7): orders action blocks by target declaration
//! order, merges same-alias blocks into one `Instruction`, and lowers each
//! parsed `Filter` tree into a `FilterConditional` over `HTMLProperty`
//! leaves via a small operation registry keyed by `action_type`.

use crate::ast::{Action, BoolOp, Filter, FilterValue, ScriptTree};
use crate::error::{CompileError, InternalDiagnostic};
use crate::ir::{
    ConditionalOp, FilterConditional, FilterOp, FilterOpType, HTMLProperty, HTMLType,
    IntermediateRepresentation, Instruction, Operation, PropertyDetail,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;

type OperationFactory = fn(&Action) -> Result<Operation, CompileError>;

/// Separate from the action registry (§4.4): classification is a
/// parser-layer concern, lowering is a code-generation concern. The two
/// registries happen to share key strings.
static OPERATION_REGISTRY: Lazy<HashMap<&'static str, OperationFactory>> =
    Lazy::new(|| HashMap::from([(crate::registry::FILTER.0, lower_filter_action as OperationFactory)]));

/// Lower a validated [`ScriptTree`] into an [`IntermediateRepresentation`].
/// Total on ASTs produced by [`crate::parse_to_ast`]: every block's target
/// is already known to exist in `targets` by that point.
pub fn lower(ast: &ScriptTree, identifier: &str) -> Result<IntermediateRepresentation, CompileError> {
    let position_of: HashMap<&str, usize> = ast
        .targets
        .keys()
        .enumerate()
        .map(|(i, alias)| (alias.as_str(), i))
        .collect();

    let mut sorted_blocks: Vec<&crate::ast::ActionBlock> = ast.action_blocks.iter().collect();
    sorted_blocks.sort_by_key(|block| position_of.get(block.target.as_str()).copied().unwrap_or(usize::MAX));

    let mut grouped: IndexMap<&str, Vec<&Action>> = IndexMap::new();
    for block in &sorted_blocks {
        grouped
            .entry(block.target.as_str())
            .or_default()
            .extend(block.actions.iter());
    }

    let mut instruction_list = Vec::with_capacity(grouped.len());
    for (alias, actions) in grouped {
        let url = ast.targets.get(alias).expect("validated at AST assembly").clone();
        let operations = actions
            .into_iter()
            .map(lower_operation)
            .collect::<Result<Vec<_>, _>>()?;
        instruction_list.push(Instruction {
            url,
            alias: alias.to_string(),
            operations,
        });
    }

    Ok(IntermediateRepresentation {
        identifier: identifier.to_string(),
        instruction_list,
    })
}

fn lower_operation(action: &Action) -> Result<Operation, CompileError> {
    let action_type = action.metadata().action_type;
    let factory = OPERATION_REGISTRY.get(action_type).ok_or_else(|| {
        InternalDiagnostic::MissingOperationFactory {
            action_kind: action_type.to_string(),
        }
    })?;
    factory(action)
}

fn lower_filter_action(action: &Action) -> Result<Operation, CompileError> {
    let Action::Filter { metadata, filter } = action;
    let condition = wrap_as_conditional(filter);
    Ok(Operation::Filter(FilterOp {
        to_alias: metadata.assignment.clone(),
        from_alias: metadata.from_alias.clone(),
        optype: FilterOpType::for_from_alias(&metadata.from_alias),
        condition,
    }))
}

/// Lower a `Filter` tree to a `FilterConditional`, wrapping a lone atomic
/// root in a one-child `any` conditional per the §8 wrapping law.
fn wrap_as_conditional(filter: &Filter) -> FilterConditional {
    match filter {
        Filter::Atomic { value, .. } => FilterConditional::Operator {
            op: ConditionalOp::Any,
            constraints: vec![FilterConditional::Property(lower_atomic(value))],
        },
        Filter::Operator { .. } => lower_filter_tree(filter),
    }
}

fn lower_filter_tree(filter: &Filter) -> FilterConditional {
    match filter {
        Filter::Operator { op, operands } => FilterConditional::Operator {
            op: lower_bool_op(*op),
            constraints: operands.iter().map(lower_filter_tree).collect(),
        },
        Filter::Atomic { value, .. } => FilterConditional::Property(lower_atomic(value)),
    }
}

fn lower_bool_op(op: BoolOp) -> ConditionalOp {
    match op {
        BoolOp::And => ConditionalOp::And,
        BoolOp::Or => ConditionalOp::Or,
        BoolOp::Not => ConditionalOp::Not,
    }
}

fn lower_atomic(value: &FilterValue) -> HTMLProperty {
    match value {
        FilterValue::Tag(v) => HTMLProperty {
            htype: HTMLType::Tag,
            detail: PropertyDetail::Value(v.clone()),
        },
        FilterValue::Text(v) => HTMLProperty {
            htype: HTMLType::Text,
            detail: PropertyDetail::Value(v.clone()),
        },
        FilterValue::Attribute(pairs) => HTMLProperty {
            htype: HTMLType::Attr,
            detail: PropertyDetail::Attributes(pairs.clone()),
        },
    }
}
