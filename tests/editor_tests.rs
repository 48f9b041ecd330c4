use filterq::editor::{Editor, LocalSuggestions, SubmitError, SuggestionSource};
use filterq::filter::{parse_filter, Messages, Rule};
use filterq::terms::TokenKind;
use std::time::{Duration, Instant};

fn typed(text: &str) -> Editor {
    let mut editor = Editor::new();
    editor.type_str(text, Instant::now());
    editor
}

#[test]
fn test_typed_query_matches_parsed_tree() {
    let mut editor = typed("host=web*&(state>=2|!ack)");
    assert!(editor.is_valid());
    let canonical = editor.submit().unwrap();
    assert_eq!(parse_filter(&canonical).unwrap(), parse_filter("host=web*&(state>=2|!ack)").unwrap());
}

#[test]
fn test_from_rule_round_trips() {
    let rule = Rule::any(vec![Rule::equal("a", "1"), Rule::all(vec![Rule::equal("b", "2"), Rule::boolean("c", true)])]);
    let mut editor = Editor::from_rule(&rule);
    assert_eq!(editor.query(), "a=1|(b=2&c)");
    assert_eq!(editor.submit().unwrap(), "a=1|(b=2&c)");
}

#[test]
fn test_unclosed_group_is_closed_on_submit() {
    let mut editor = typed("a=1&(b=2|c=3");
    assert!(editor.is_valid());
    assert_eq!(editor.submit().unwrap(), "a=1&(b=2|c=3)");
}

#[test]
fn test_invalid_fragment_blocks_submit() {
    let mut editor = typed("a=1&)");
    assert!(!editor.is_valid());
    match editor.submit() {
        Err(SubmitError::Invalid { message }) => assert!(message.contains("please type one of")),
        other => panic!("expected invalid submit, got {:?}", other),
    }
}

#[test]
fn test_changes_are_coalesced_per_edit() {
    let mut editor = Editor::from_query("a=1&b=2|c=3").unwrap();
    editor.take_changes();
    editor.type_str("&d=4", Instant::now());
    editor.commit();
    // logical operator, column, operator and value: one change each
    assert_eq!(editor.take_changes().len(), 4);
}

#[test]
fn test_suggestions_for_value_carry_column() {
    let mut editor = typed("host=we");
    let request = editor.suggestion_request();
    assert_eq!(request.term.kind, TokenKind::Value);
    assert_eq!(request.term.search, "we");
    assert_eq!(request.column.as_deref(), Some("host"));

    let source = LocalSuggestions::new(Vec::new(), 10);
    let response = source.suggest(&request).unwrap();
    assert!(response.items.is_empty());
    assert_eq!(response.default.unwrap().search, "we");

    let later = Instant::now() + Duration::from_secs(1);
    assert!(editor.fetch_suggestions(&source, later));
    assert_eq!(editor.default_suggestion().unwrap().search, "we");
}

struct Terse;

impl Messages for Terse {
    fn expected_logical_operator(&self) -> String {
        "need & or |".to_string()
    }

    fn nesting_too_deep(&self, limit: usize) -> String {
        format!("max {}", limit)
    }

    fn type_one_of(&self, candidates: &[&str]) -> String {
        format!("one of {}", candidates.join(" "))
    }

    fn expected_term(&self, kind: &str) -> String {
        format!("need {}", kind)
    }

    fn no_suggestions(&self) -> String {
        "nothing".to_string()
    }
}

#[test]
fn test_injected_messages() {
    let mut editor = Editor::new().with_messages(Box::new(Terse));
    editor.type_str("a=1)", Instant::now());
    assert_eq!(editor.syntax_error(), Some("one of & |"));
}
