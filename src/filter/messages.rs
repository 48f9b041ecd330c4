//! User-facing message catalog
//!
//! The parser and the editor never format user-visible text themselves; they
//! ask an injected [`Messages`] implementation. [`DefaultMessages`] ships the
//! English strings.

pub trait Messages {
    /// Reason attached to a "missing logical operator" parse error
    fn expected_logical_operator(&self) -> String;

    /// Reason attached to a parse error for groups and negations nested
    /// more than `limit` deep
    fn nesting_too_deep(&self, limit: usize) -> String;

    /// Validity hint listing the terms that would be legal next
    fn type_one_of(&self, candidates: &[&str]) -> String;

    /// Hint for a free-text term that may not be empty
    fn expected_term(&self, kind: &str) -> String;

    /// Shown when the suggestion source failed
    fn no_suggestions(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl Messages for DefaultMessages {
    fn expected_logical_operator(&self) -> String {
        "Expected logical operator".to_string()
    }

    fn nesting_too_deep(&self, limit: usize) -> String {
        format!("Groups and negations nest at most {} deep", limit)
    }

    fn type_one_of(&self, candidates: &[&str]) -> String {
        format!("please type one of: {}", candidates.join(", "))
    }

    fn expected_term(&self, kind: &str) -> String {
        format!("please type a {}", kind)
    }

    fn no_suggestions(&self) -> String {
        "No suggestions available".to_string()
    }
}
