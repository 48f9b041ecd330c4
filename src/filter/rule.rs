//! Rule tree for filter expressions
//!
//! A filter is a tree of [`Rule`]s. Leaves are [`Condition`]s (a column compared
//! against a value, or a bare boolean column test); inner nodes are [`Chain`]s
//! combining their children with a [`LogicalOp`].
//!
//! Trees are immutable-by-replacement: edits build new nodes and swap them into
//! the parent slot (see [`crate::filter::edit`]), so a tree handed to a renderer
//! is never observed half-edited.

use serde::{Deserialize, Serialize};

/// Comparison operators for conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,  // =
    Neq, // !=
    Gt,  // >
    Lt,  // <
    Gte, // >=
    Lte, // <=
}

impl ComparisonOp {
    /// All operators, in the order suggestions present them
    pub const ALL: [ComparisonOp; 6] = [
        ComparisonOp::Eq,
        ComparisonOp::Neq,
        ComparisonOp::Gt,
        ComparisonOp::Lt,
        ComparisonOp::Gte,
        ComparisonOp::Lte,
    ];

    /// Wire symbol for the operator
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Neq => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lte => "<=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

/// Logical operator of a [`Chain`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    /// Every child must match (`&`)
    All,
    /// At least one child must match (`|`)
    Any,
    /// No child may match (`!(..|..)`)
    None,
}

impl LogicalOp {
    /// Separator placed between children when rendering
    pub fn separator(&self) -> char {
        match self {
            LogicalOp::All => '&',
            LogicalOp::Any | LogicalOp::None => '|',
        }
    }

    /// Parse the names accepted by the `chain-operator` edit directive
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "and" | "all" | "&" => Some(LogicalOp::All),
            "or" | "any" | "|" => Some(LogicalOp::Any),
            "not" | "none" | "!" => Some(LogicalOp::None),
            _ => None,
        }
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Bare column test: `column` (true) or `!column` (false)
    Bool(bool),
    Scalar(String),
    /// Array value, written `(v1|v2|...)`
    List(Vec<String>),
}

impl Value {
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: ToString> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.iter().map(|v| v.to_string()).collect())
    }
}

/// UI-only metadata attached to a condition. Never part of rule equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionMeta {
    /// Offset in the source string where the column began
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_offset: Option<usize>,
    /// Offset where the operator began
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_offset: Option<usize>,
    /// Offset where the value began (absent for empty or boolean values)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_offset: Option<usize>,
    /// Display label overriding the column name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ConditionMeta {
    /// Offsets recorded for this condition, in column/operator/value order
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        [self.column_offset, self.operator_offset, self.value_offset]
            .into_iter()
            .flatten()
    }
}

/// Single comparison, or a bare boolean column test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub op: ComparisonOp,
    pub value: Value,
    #[serde(default, skip_serializing_if = "is_default_meta")]
    pub meta: ConditionMeta,
}

fn is_default_meta(meta: &ConditionMeta) -> bool {
    *meta == ConditionMeta::default()
}

impl Condition {
    pub fn new(column: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
            meta: ConditionMeta::default(),
        }
    }

    /// Attach a display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.meta.label = Some(label.into());
        self
    }

    /// Column name as presented to users
    pub fn display_column(&self) -> &str {
        self.meta.label.as_deref().unwrap_or(&self.column)
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column && self.op == other.op && self.value == other.value
    }
}

impl Eq for Condition {}

/// Boolean combination of child rules. Child order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub op: LogicalOp,
    pub children: Vec<Rule>,
}

impl Chain {
    pub fn new(op: LogicalOp, children: Vec<Rule>) -> Self {
        Self { op, children }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    Condition(Condition),
    Chain(Chain),
}

/// Position of a node in a tree: child indices from the root
pub type RulePath = Vec<usize>;

impl Rule {
    /// The "no filter" tree: an empty ALL chain
    pub fn empty() -> Self {
        Rule::Chain(Chain::new(LogicalOp::All, Vec::new()))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Rule::Chain(chain) if chain.children.is_empty())
    }

    pub fn condition(column: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Rule::Condition(Condition::new(column, op, value))
    }

    pub fn equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, ComparisonOp::Eq, value)
    }

    pub fn unequal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, ComparisonOp::Neq, value)
    }

    pub fn greater_than(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, ComparisonOp::Gt, value)
    }

    pub fn less_than(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, ComparisonOp::Lt, value)
    }

    pub fn greater_than_or_equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, ComparisonOp::Gte, value)
    }

    pub fn less_than_or_equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, ComparisonOp::Lte, value)
    }

    /// Bare column test (`column` or `!column`)
    pub fn boolean(column: impl Into<String>, value: bool) -> Self {
        Self::condition(column, ComparisonOp::Eq, Value::Bool(value))
    }

    pub fn all(children: Vec<Rule>) -> Self {
        Rule::Chain(Chain::new(LogicalOp::All, children))
    }

    pub fn any(children: Vec<Rule>) -> Self {
        Rule::Chain(Chain::new(LogicalOp::Any, children))
    }

    pub fn none(children: Vec<Rule>) -> Self {
        Rule::Chain(Chain::new(LogicalOp::None, children))
    }

    /// Negate a rule. Bare boolean tests flip their value, everything else is
    /// wrapped in a NONE chain.
    pub fn negate(self) -> Self {
        match self {
            Rule::Condition(Condition { column, op, value: Value::Bool(b), meta }) => {
                Rule::Condition(Condition { column, op, value: Value::Bool(!b), meta })
            }
            other => Rule::none(vec![other]),
        }
    }

    pub fn as_chain(&self) -> Option<&Chain> {
        match self {
            Rule::Chain(chain) => Some(chain),
            Rule::Condition(_) => None,
        }
    }

    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            Rule::Condition(condition) => Some(condition),
            Rule::Chain(_) => None,
        }
    }

    /// Resolve a path to the node it names
    pub fn get(&self, path: &[usize]) -> Option<&Rule> {
        let mut node = self;
        for &index in path {
            node = node.as_chain()?.children.get(index)?;
        }
        Some(node)
    }

    /// All conditions in document order
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        collect_conditions(self, &mut out);
        out
    }
}

fn collect_conditions<'a>(rule: &'a Rule, out: &mut Vec<&'a Condition>) {
    match rule {
        Rule::Condition(condition) => out.push(condition),
        Rule::Chain(chain) => {
            for child in &chain.children {
                collect_conditions(child, out);
            }
        }
    }
}

/// Format a rule path the way edit directives spell it (`0-2-1`)
pub fn format_path(path: &[usize]) -> String {
    path.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
