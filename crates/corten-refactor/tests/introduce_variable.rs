use corten_refactor::{
    apply_text_edits, find_occurrences, introduce_variable, needs_mutable, possible_targets,
    Anchor, Candidate, CandidateKind, IntroduceError, IntroduceOptions, TextRange, TextSize,
};
use corten_syntax::{parse, SyntaxTree};
use pretty_assertions::assert_eq;

/// Extracts a `/*caret*/` marker and returns the cleaned source plus the
/// caret offset.
fn caret_fixture(fixture: &str) -> (String, TextSize) {
    let marker = "/*caret*/";
    let pos = fixture.find(marker).expect("missing caret marker");
    let mut code = fixture.to_string();
    code.replace_range(pos..pos + marker.len(), "");
    (code, TextSize::from(pos as u32))
}

/// Extracts `/*[*/ ... /*]*/` selection markers and returns the cleaned
/// source plus the selected range.
fn selection_fixture(fixture: &str) -> (String, TextRange) {
    let start_marker = "/*[*/";
    let end_marker = "/*]*/";
    let start = fixture.find(start_marker).expect("missing start marker");
    let mut code = fixture.to_string();
    code.replace_range(start..start + start_marker.len(), "");
    let end = code.find(end_marker).expect("missing end marker");
    code.replace_range(end..end + end_marker.len(), "");
    (
        code,
        TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32)),
    )
}

fn parse_fixture(text: &str) -> SyntaxTree {
    let result = parse(text);
    assert_eq!(result.errors, vec![], "fixture must parse cleanly");
    result.tree
}

/// Applies the rewrite and checks the result still parses.
fn apply_and_check(
    tree: &SyntaxTree,
    candidate: &Candidate,
    occurrences: &[TextRange],
    options: IntroduceOptions,
) -> String {
    let outcome = introduce_variable(tree, candidate, occurrences, options).expect("rewrite");
    let updated = apply_text_edits(tree.text(), &outcome.edits).expect("apply edits");
    let reparsed = parse(&updated);
    assert_eq!(
        reparsed.errors,
        vec![],
        "rewrite must keep the document parseable:\n{updated}"
    );
    updated
}

#[test]
fn extracts_innermost_literal() {
    let (code, caret) = caret_fixture(
        "fn hello() {
    foo(5 + /*caret*/10);
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    assert_eq!(targets.len(), 3);
    assert_eq!(&code[targets[0].range], "10");
    assert_eq!(targets[0].kind, CandidateKind::Expression);

    let updated = apply_and_check(&tree, &targets[0], &[], IntroduceOptions::default());
    assert_eq!(
        updated,
        "fn hello() {
    let i = 10;
    foo(5 + i);
}
"
    );
}

#[test]
fn explicit_selection_yields_single_target() {
    let (code, selection) = selection_fixture("fn main() { 1 + /*[*/1/*]*/; }\n");
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Selection(selection)).unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].range, selection);
    assert_eq!(targets[0].kind, CandidateKind::Expression);
}

#[test]
fn misaligned_selection_is_rejected() {
    let (code, selection) = selection_fixture("fn main() { 1 /*[*/+ 1/*]*/; }\n");
    let tree = parse_fixture(&code);
    let err = possible_targets(&tree, Anchor::Selection(selection)).unwrap_err();
    assert_eq!(err, IntroduceError::NoMatchingExpression);
}

#[test]
fn unifies_multiple_occurrences() {
    let (code, caret) = caret_fixture(
        "fn hello() {
    foo(5 + /*caret*/10);
    foo(5 + 10);
}

fn foo(x: i32) {

}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    assert_eq!(targets.len(), 3);
    assert_eq!(&code[targets[1].range], "5 + 10");

    let occurrences = find_occurrences(&tree, &targets[1]);
    assert_eq!(occurrences.len(), 2);
    for &range in &occurrences {
        assert_eq!(&code[range], "5 + 10");
    }

    let updated = apply_and_check(&tree, &targets[1], &occurrences, IntroduceOptions::default());
    assert_eq!(
        updated,
        "fn hello() {
    let x = 5 + 10;
    foo(x);
    foo(x);
}

fn foo(x: i32) {

}
"
    );
}

#[test]
fn caret_after_element_anchors_left() {
    let (code, caret) = caret_fixture(
        "fn main() {
    1/*caret*/;
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].kind, CandidateKind::Statement);

    let updated = apply_and_check(&tree, &targets[0], &[], IntroduceOptions::default());
    assert_eq!(
        updated,
        "fn main() {
    let i = 1;
}
"
    );
}

#[test]
fn statement_candidate_is_replaced_in_place() {
    let (code, caret) = caret_fixture(
        "fn hello() {
    foo(5 + /*caret*/10);
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    assert_eq!(targets.len(), 3);
    assert_eq!(targets[2].kind, CandidateKind::Statement);

    let updated = apply_and_check(&tree, &targets[2], &[], IntroduceOptions::default());
    assert_eq!(
        updated,
        "fn hello() {
    let foo = foo(5 + 10);
}
"
    );
}

#[test]
fn extracts_match_statement() {
    let (code, caret) = caret_fixture(
        "fn bar() {
    ma/*caret*/tch 5 {
        2 => 2,
        _ => 8,
    };
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].kind, CandidateKind::Statement);

    let updated = apply_and_check(&tree, &targets[0], &[], IntroduceOptions::default());
    assert_eq!(
        updated,
        "fn bar() {
    let x = match 5 {
        2 => 2,
        _ => 8,
    };
}
"
    );
}

#[test]
fn extracts_tail_expression_as_statement() {
    let (code, caret) = caret_fixture(
        "fn read_file() -> Result<String, io::Error> {
    File::op/*caret*/en(\"res/input.txt\")?
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(&code[targets[0].range], "File::open(\"res/input.txt\")");
    assert_eq!(targets[1].kind, CandidateKind::Statement);

    let updated = apply_and_check(&tree, &targets[1], &[], IntroduceOptions::default());
    assert_eq!(
        updated,
        "fn read_file() -> Result<String, io::Error> {
    let x = File::open(\"res/input.txt\")?;
}
"
    );
}

#[test]
fn mutable_borrow_forces_let_mut() {
    let (code, caret) = caret_fixture(
        "fn read_file() -> Result<String, Error> {
    let file = File::open(\"res/input.txt\")?;

    file.read_to_string(&mut String:/*caret*/:new())?;
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    assert_eq!(&code[targets[0].range], "String::new()");

    let outcome =
        introduce_variable(&tree, &targets[0], &[], IntroduceOptions::default()).unwrap();
    assert!(outcome.mutable);
    assert_eq!(outcome.name, "string");

    let updated = apply_text_edits(tree.text(), &outcome.edits).unwrap();
    assert_eq!(
        updated,
        "fn read_file() -> Result<String, Error> {
    let file = File::open(\"res/input.txt\")?;
    let mut string = String::new();

    file.read_to_string(&mut string)?;
}
"
    );
    assert_eq!(parse(&updated).errors, vec![]);
}

#[test]
fn targets_are_strictly_nested_innermost_first() {
    let (code, caret) = caret_fixture("fn f() { foo(bar(baz(/*caret*/1))); }\n");
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();

    let texts: Vec<&str> = targets.iter().map(|t| &code[t.range]).collect();
    assert_eq!(texts, vec!["1", "baz(1)", "bar(baz(1))", "foo(bar(baz(1)))"]);
    for pair in targets.windows(2) {
        assert!(pair[1].range.contains_range(pair[0].range));
        assert_ne!(pair[0].range, pair[1].range);
    }
    assert_eq!(targets.last().unwrap().kind, CandidateKind::Statement);
}

#[test]
fn caret_outside_expression_is_rejected() {
    let (code, caret) = caret_fixture("fn na/*caret*/me() { 1; }\n");
    let tree = parse_fixture(&code);
    let err = possible_targets(&tree, Anchor::Cursor(caret)).unwrap_err();
    assert_eq!(err, IntroduceError::NoEnclosingExpression);
}

#[test]
fn occurrences_skip_shadowing_closures() {
    let (code, selection) = selection_fixture(
        "fn f() {
    let y = /*[*/x + 1/*]*/;
    xs.map(|x| x + 1);
    xs.map(|z| x + 1);
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Selection(selection)).unwrap();
    let occurrences = find_occurrences(&tree, &targets[0]);

    // The first closure shadows `x`; the second does not.
    assert_eq!(occurrences.len(), 2);
    assert_eq!(occurrences[0], selection);
    for &range in &occurrences {
        assert_eq!(&code[range], "x + 1");
    }
}

#[test]
fn occurrences_stay_within_enclosing_block() {
    let (code, caret) = caret_fixture(
        "fn a() {
    foo(1 + /*caret*/2);
}

fn b() {
    foo(1 + 2);
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    let occurrences = find_occurrences(&tree, &targets[1]);
    assert_eq!(occurrences.len(), 1);
}

#[test]
fn disjoint_scopes_have_no_insertion_point() {
    let code = "fn a() { foo(1 + 2); }\nfn b() { foo(1 + 2); }\n";
    let tree = parse_fixture(code);

    let first = code.find("1 + 2").unwrap() as u32;
    let second = code.rfind("1 + 2").unwrap() as u32;
    let first_range = TextRange::new(first.into(), (first + 5).into());
    let second_range = TextRange::new(second.into(), (second + 5).into());

    let targets = possible_targets(&tree, Anchor::Selection(first_range)).unwrap();
    let err = introduce_variable(
        &tree,
        &targets[0],
        &[first_range, second_range],
        IntroduceOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err, IntroduceError::AmbiguousInsertionPoint);
}

#[test]
fn single_line_block_keeps_declaration_inline() {
    let (code, caret) = caret_fixture("fn main() { foo(5 + /*caret*/10); foo(5 + 10); }\n");
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    let occurrences = find_occurrences(&tree, &targets[1]);
    assert_eq!(occurrences.len(), 2);

    let updated = apply_and_check(&tree, &targets[1], &occurrences, IntroduceOptions::default());
    assert_eq!(
        updated,
        "fn main() { let x = 5 + 10; foo(x); foo(x); }\n"
    );
}

#[test]
fn explicit_name_overrides_suggestion() {
    let (code, caret) = caret_fixture(
        "fn hello() {
    foo(5 + /*caret*/10);
}
",
    );
    let tree = parse_fixture(&code);
    let targets = possible_targets(&tree, Anchor::Cursor(caret)).unwrap();
    let updated = apply_and_check(
        &tree,
        &targets[0],
        &[],
        IntroduceOptions {
            name: Some("answer".to_string()),
        },
    );
    assert_eq!(
        updated,
        "fn hello() {
    let answer = 10;
    foo(5 + answer);
}
"
    );
}

#[test]
fn assignment_target_needs_mut() {
    let code = "fn f() { s; s = 1; }\n";
    let tree = parse_fixture(code);

    let first = code.find('s').unwrap() as u32;
    let second = code.find("s =").unwrap() as u32;
    let ranges = [
        TextRange::new(first.into(), (first + 1).into()),
        TextRange::new(second.into(), (second + 1).into()),
    ];
    assert!(needs_mutable(&tree, &ranges));
    assert!(!needs_mutable(&tree, &ranges[..1]));
}
