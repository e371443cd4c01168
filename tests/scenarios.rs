//! Integration tests against the public API: representative documents and
//! the tree-shape invariants they must satisfy, run as ordinary
//! deterministic assertions.

use gularen::ast::{Alignment, CheckState, EmphasisKind, HeadingKind, NodeKind, RowKind};
use gularen::document::Config;
use gularen::json;
use gularen::lexer::lex;
use gularen::token::TokenKind;
use gularen::Document;
use test_case::test_case;

fn parse(source: &str) -> Document {
    Document::parse_string(source, ".", &Config::new())
}

#[test]
fn scenario_1_heading_with_subtitle() {
    let doc = parse(">> Title\n> Subtitle\n");
    let heading = &doc.root.children[0];
    match &heading.kind {
        NodeKind::Heading { heading } => assert_eq!(*heading, HeadingKind::Subsection),
        other => panic!("unexpected kind: {:?}", other),
    }
    assert!(matches!(heading.children[0].kind, NodeKind::Text { .. }));
    assert!(matches!(heading.children[1].kind, NodeKind::Subtitle));
    assert!(matches!(heading.children[1].children[0].kind, NodeKind::Text { .. }));
}

#[test]
fn scenario_2_emphasis_round_trip() {
    let doc = parse("*bold _italic_ bold*\n");
    let emphasis = &doc.root.children[0].children[0];
    match &emphasis.kind {
        NodeKind::Emphasis { emphasis } => assert_eq!(*emphasis, EmphasisKind::Bold),
        other => panic!("unexpected kind: {:?}", other),
    }
    assert_eq!(emphasis.children.len(), 3);
    assert!(matches!(emphasis.children[0].kind, NodeKind::Text { .. }));
    assert!(matches!(emphasis.children[1].kind, NodeKind::Emphasis { .. }));
    assert!(matches!(emphasis.children[2].kind, NodeKind::Text { .. }));
}

#[test]
fn scenario_3_smart_quotes() {
    let tokens = lex("she said \"hi\"");
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert!(kinds.contains(&TokenKind::QuoteOpen));
    assert!(kinds.contains(&TokenKind::QuoteClose));
    let open_idx = kinds.iter().position(|k| *k == TokenKind::QuoteOpen).unwrap();
    let close_idx = kinds.iter().position(|k| *k == TokenKind::QuoteClose).unwrap();
    assert!(open_idx < close_idx);
}

#[test_case(" \"x", TokenKind::QuoteOpen; "after whitespace opens")]
#[test_case("\"'x", TokenKind::SquoteOpen; "after an opening quote byte opens")]
#[test_case("a\"x", TokenKind::QuoteClose; "after a letter closes")]
#[test_case("a'x", TokenKind::SquoteClose; "apostrophe after letter is squoteClose")]
fn quote_disambiguation_is_left_context_driven(source: &str, expected: TokenKind) {
    let tokens = lex(source);
    let quote = tokens
        .iter()
        .rev()
        .find(|t| matches!(t.kind, TokenKind::QuoteOpen | TokenKind::QuoteClose | TokenKind::SquoteOpen | TokenKind::SquoteClose))
        .expect("a quote token");
    assert_eq!(quote.kind, expected);
}

#[test]
fn scenario_4_check_list_with_nested_indent() {
    let doc = parse("[x] done\n\titem\n[ ] todo\n");
    let list = &doc.root.children[0];
    assert!(matches!(list.kind, NodeKind::CheckList));
    assert_eq!(list.children.len(), 2);

    match &list.children[0].kind {
        NodeKind::CheckItem { checked } => assert_eq!(*checked, CheckState::Checked),
        other => panic!("unexpected kind: {:?}", other),
    }
    assert!(list.children[0].children.iter().any(|c| matches!(c.kind, NodeKind::Indent)));

    match &list.children[1].kind {
        NodeKind::CheckItem { checked } => assert_eq!(*checked, CheckState::Unchecked),
        other => panic!("unexpected kind: {:?}", other),
    }
}

#[test]
fn scenario_5_table_with_alignments() {
    let doc = parse("| A | B | C |\n|:--|:-:|--:|\n| 1 | 2 | 3 |\n");
    let table = &doc.root.children[0];
    match &table.kind {
        NodeKind::Table { alignments } => {
            assert_eq!(alignments, &vec![Alignment::Left, Alignment::Center, Alignment::Right]);
        }
        other => panic!("unexpected kind: {:?}", other),
    }
    assert_eq!(table.children.len(), 2);
    assert!(matches!(table.children[0].kind, NodeKind::Row { row: RowKind::Header }));
    assert!(matches!(table.children[1].kind, NodeKind::Row { row: RowKind::Content }));
}

#[test]
fn table_with_no_separator_retypes_every_row_to_content() {
    let doc = parse("| A | B |\n| 1 | 2 |\n");
    let table = &doc.root.children[0];
    for row in &table.children {
        assert!(matches!(row.kind, NodeKind::Row { row: RowKind::Content }));
    }
}

#[test]
fn scenario_6_definition_list_promotion() {
    let doc = parse("term :: definition\n");
    let list = &doc.root.children[0];
    assert!(matches!(list.kind, NodeKind::DefinitionList));
    let item = &list.children[0];
    assert!(matches!(item.kind, NodeKind::DefinitionItem));
    assert!(matches!(item.children[0].kind, NodeKind::DefinitionTerm));
    assert!(matches!(item.children[1].kind, NodeKind::DefinitionDesc));
}

#[test]
fn scenario_7_fenced_code() {
    let doc = parse("---- rust\nfn main(){}\n----\n");
    match &doc.root.children[0].kind {
        NodeKind::CodeBlock { label, content } => {
            assert_eq!(label.as_deref(), Some("rust"));
            assert_eq!(content, "fn main(){}");
        }
        other => panic!("unexpected kind: {:?}", other),
    }
}

#[test]
fn scenario_8_include_disabled() {
    let doc = Document::parse_string("?[other.gr]\n", ".", &Config::new().with_file_inclusion(false));
    let include = &doc.root.children[0];
    match &include.kind {
        NodeKind::Document { path, content } => {
            assert_eq!(path.as_deref(), Some("other.gr"));
            assert!(content.is_none());
        }
        other => panic!("unexpected kind: {:?}", other),
    }
    assert!(include.children.is_empty());
}

#[test]
fn invariant_range_containment_holds_recursively() {
    let doc = parse(
        "> Title\n\
         *bold* and `code` and [res](label) and !view text\n\
         - one\n\
         \t- nested\n\
         | A | B |\n\
         |---|---|\n\
         | 1 | 2 |\n",
    );
    assert!(doc.root.ranges_well_formed());
}

#[test_case("\t\t", "\t/ ", &[TokenKind::IndentClose, TokenKind::BlockquoteOpen]; "shared prefix kept, only the differing tail pops then pushes")]
#[test_case("/ \t", "\t/ ", &[TokenKind::IndentClose, TokenKind::BlockquoteClose, TokenKind::BlockquoteOpen, TokenKind::IndentOpen]; "swapping order pops all then pushes all")]
fn invariant_prefix_diffing_is_minimal(first_prefix: &str, second_prefix: &str, expected_after_first_line: &[TokenKind]) {
    let source = format!("{}a\n{}b\n", first_prefix, second_prefix);
    let tokens = lex(&source);
    let structural: Vec<TokenKind> = tokens
        .iter()
        .map(|t| t.kind)
        .filter(|k| {
            matches!(
                k,
                TokenKind::IndentOpen | TokenKind::IndentClose | TokenKind::BlockquoteOpen | TokenKind::BlockquoteClose
            )
        })
        .collect();
    // Every element of the second line's diff is present, contiguous, and no
    // element appears as both an open and a close of the same kind back to
    // back for the unchanged portion of the prefix (that would mean the diff
    // wasn't minimal).
    let second_line_diff = &structural[structural.len() - expected_after_first_line.len()..];
    assert_eq!(second_line_diff, expected_after_first_line);
}

#[test]
fn invariant_token_stream_scopes_are_balanced() {
    let tokens = lex("\t- one\n\t\t- two\n- three\n");
    let mut depth = 0i32;
    for t in &tokens {
        match t.kind {
            TokenKind::IndentOpen => depth += 1,
            TokenKind::IndentClose => depth -= 1,
            _ => {}
        }
        assert!(depth >= 0);
    }
    assert_eq!(depth, 0);
}

#[test]
fn invariant_json_round_trip_retokenises_text_nodes() {
    let doc = parse("hello world\n");
    let value = json::to_json(&doc.root);
    let text = &value["children"][0]["children"][0];
    assert_eq!(text["kind"], "text");
    let content = text["content"].as_str().unwrap();
    let retokenised = lex(content);
    let original_text_tokens: Vec<&str> = lex("hello world\n")
        .iter()
        .filter(|t| t.kind == TokenKind::Text)
        .map(|t| t.content.as_str())
        .collect();
    let retokenised_text: Vec<&str> = retokenised
        .iter()
        .filter(|t| t.kind == TokenKind::Text)
        .map(|t| t.content.as_str())
        .collect();
    assert_eq!(retokenised_text, original_text_tokens);
}

#[test]
fn invariant_parse_is_pure() {
    let source = "> Title\n*bold* text\n- item\n";
    let a = Document::parse_string(source, ".", &Config::new());
    let b = Document::parse_string(source, ".", &Config::new());
    assert_eq!(format!("{:?}", a.root), format!("{:?}", b.root));
}
