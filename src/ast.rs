//! The parsed-script tree: [`ScriptTree`] → [`ActionBlock`] → [`Action`] →
//! [`Filter`]. Every type here is an immutable value built bottom-up by the
//! parsers in [`crate::high_level`], [`crate::block`], and [`crate::filter`];
//! none of them are mutated once returned from [`crate::parse_to_ast`].

use indexmap::IndexMap;
use ptree::{Style, TreeItem};
use std::borrow::Cow;

/// The root of a parsed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTree {
    /// Alias → URL, in declaration order. Order is the canonical execution
    /// priority carried through to [`crate::ir::IntermediateRepresentation`].
    pub targets: IndexMap<String, String>,
    /// One block per `TARGET: { ... }` group, in source order.
    pub action_blocks: Vec<ActionBlock>,
}

/// A `TARGET: { ... }` group attaching a sequence of actions to a
/// previously-declared target alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBlock {
    pub target: String,
    pub actions: Vec<Action>,
}

/// Metadata shared by every action variant: `action_type` is the registry
/// key used by both the dispatcher (§4.4) and the lowering registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMetadata {
    pub action_type: &'static str,
    pub from_alias: String,
    pub raw_filter: String,
    pub assignment: String,
}

/// One statement inside an [`ActionBlock`]. A tagged sum with one variant
/// per action kind rather than an inheritance hierarchy — currently only
/// `Filter` is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Filter {
        metadata: ActionMetadata,
        filter: Filter,
    },
}

impl Action {
    pub fn metadata(&self) -> &ActionMetadata {
        match self {
            Action::Filter { metadata, .. } => metadata,
        }
    }
}

/// Boolean connective at a [`Filter::Operator`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

/// Which HTML property an atomic filter constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Tag,
    Attribute,
    Text,
}

/// A single value position in an atomic filter: a bare string/options list
/// (the `any` wildcard normalizes to an empty list, matching §4.5.3's
/// `tag any` / `attribute "k": any` rows), or a `contains` wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicValue {
    Values(Vec<String>),
    Contains(ContainsValue),
}

/// The payload of a `contains` wrapper: `contains "x"` keeps the bare string
/// rather than promoting it to a one-element list, while `contains ["x","y"]`
/// keeps the list — the two shapes are not unified at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainsValue {
    Single(String),
    Many(Vec<String>),
}

/// An `attribute` atomic filter's value: an ordered list of key/value pairs,
/// where the key is `None` for a bare `any` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePair {
    pub key: Option<String>,
    pub value: AtomicValue,
}

/// The normalized value carried by an atomic [`Filter`] node, shaped per the
/// filter type (§4.5.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Tag(AtomicValue),
    Text(AtomicValue),
    Attribute(Vec<AttributePair>),
}

/// A recursive boolean expression over HTML-property predicates. A node is
/// exactly one of its two variants — never both, never neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Operator { op: BoolOp, operands: Vec<Filter> },
    Atomic { filter_type: FilterType, value: FilterValue },
}

impl Filter {
    pub fn filter_type(&self) -> Option<FilterType> {
        match self {
            Filter::Atomic { filter_type, .. } => Some(*filter_type),
            Filter::Operator { .. } => None,
        }
    }
}

impl TreeItem for Filter {
    type Child = Filter;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &Style) -> std::io::Result<()> {
        match self {
            Filter::Operator { op, .. } => write!(f, "{op:?}"),
            Filter::Atomic { filter_type, value } => write!(f, "{filter_type:?} {value:?}"),
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        match self {
            Filter::Operator { operands, .. } => Cow::from(operands),
            Filter::Atomic { .. } => Cow::from(&[][..]),
        }
    }
}

impl Filter {
    /// Render the filter as an ASCII tree, for debugging a parsed script.
    pub fn print(&self) -> std::io::Result<()> {
        ptree::print_tree(self)
    }
}

/// A tree node wrapping an [`ActionBlock`] purely for [`ScriptTree::print`];
/// the underlying data lives in [`ScriptTree`] itself.
#[derive(Clone)]
enum ScriptTreeNode<'a> {
    Root(&'a ScriptTree),
    Block(&'a ActionBlock),
    Action(&'a Action),
}

impl<'a> TreeItem for ScriptTreeNode<'a> {
    type Child = ScriptTreeNode<'a>;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &Style) -> std::io::Result<()> {
        match self {
            ScriptTreeNode::Root(tree) => write!(f, "script ({} targets)", tree.targets.len()),
            ScriptTreeNode::Block(block) => write!(f, "{}: {{ }}", block.target),
            ScriptTreeNode::Action(action) => {
                let metadata = action.metadata();
                write!(f, "{} -> {}", metadata.action_type, metadata.assignment)
            }
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        match self {
            ScriptTreeNode::Root(tree) => {
                Cow::from(tree.action_blocks.iter().map(ScriptTreeNode::Block).collect::<Vec<_>>())
            }
            ScriptTreeNode::Block(block) => {
                Cow::from(block.actions.iter().map(ScriptTreeNode::Action).collect::<Vec<_>>())
            }
            ScriptTreeNode::Action(_) => Cow::from(&[][..]),
        }
    }
}

impl ScriptTree {
    /// Render the whole tree as an ASCII tree, for debugging a compilation.
    pub fn print(&self) -> std::io::Result<()> {
        ptree::print_tree(&ScriptTreeNode::Root(self))
    }
}
