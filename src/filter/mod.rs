//! Filter expression language
//!
//! Query strings such as `host=web*&(state=2|!acknowledged)` are parsed into
//! [`Rule`] trees, edited structurally, rendered back to canonical text and
//! evaluated against records.

pub mod rule;
pub mod messages;
pub mod scanner;
pub mod parser;
pub mod renderer;
pub mod evaluator;
pub mod edit;

pub use rule::{Chain, ComparisonOp, Condition, ConditionMeta, LogicalOp, Rule, RulePath, Value, format_path};
pub use messages::{DefaultMessages, Messages};
pub use parser::{parse_filter, parse_lenient, ParseError, Parser, MAX_NESTING};
pub use renderer::{fragments, render, Fragment};
pub use evaluator::{filter_records, Record};
pub use edit::{apply_edit, apply_edits, parse_directives, parse_path, EditDirective, EditError, Placement};
