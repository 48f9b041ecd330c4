//! Term index: the linear, token-by-token view of a rule tree that the
//! interactive editor works on

pub mod token;
pub mod index;

pub use token::{ConditionPart, TermPath, Token, TokenKind};
pub use index::{link_counterparts, Change, TermIndex};
