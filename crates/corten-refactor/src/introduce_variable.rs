use std::collections::HashSet;

use corten_syntax::{NodeId, SyntaxKind, SyntaxTree};
use serde::{Deserialize, Serialize};
use text_size::{TextRange, TextSize};
use thiserror::Error;

use crate::edit::{normalize_edits, EditError, TextEdit};

/// Where the user asked to introduce a variable: a collapsed caret or an
/// explicit, non-empty selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Cursor(TextSize),
    Selection(TextRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Expression,
    /// The expression is the whole of its enclosing expression statement;
    /// extraction replaces the statement in place.
    Statement,
}

/// An expression eligible for extraction. A candidate is a view into the
/// tree snapshot it was produced from and must not be mixed with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub node: NodeId,
    pub range: TextRange,
    pub kind: CandidateKind,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntroduceError {
    #[error("no enclosing expression at the given offset")]
    NoEnclosingExpression,
    #[error("selection does not align with an expression")]
    NoMatchingExpression,
    #[error("occurrences do not admit a single insertion point")]
    AmbiguousInsertionPoint,
    #[error("computed edits conflict: {0}")]
    RewriteConflict(#[from] EditError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntroduceOptions {
    /// Overrides the suggested binding name.
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroduceOutcome {
    pub edits: Vec<TextEdit>,
    pub name: String,
    pub mutable: bool,
}

/// Enumerates the expressions that can be extracted at `anchor`, innermost
/// first, ending with the enclosing statement when the walk reaches one.
///
/// An explicit selection must match an expression span exactly; no widening
/// is attempted.
pub fn possible_targets(
    tree: &SyntaxTree,
    anchor: Anchor,
) -> Result<Vec<Candidate>, IntroduceError> {
    match anchor {
        Anchor::Selection(range) => {
            if range.is_empty() {
                return Err(IntroduceError::NoMatchingExpression);
            }
            let node = tree
                .expression_with_range(range)
                .ok_or(IntroduceError::NoMatchingExpression)?;
            Ok(vec![Candidate {
                node,
                range,
                kind: CandidateKind::Expression,
            }])
        }
        Anchor::Cursor(offset) => {
            let node = tree
                .node_at_offset(offset)
                .ok_or(IntroduceError::NoEnclosingExpression)?;
            let innermost = tree
                .ancestors(node)
                .find(|&n| tree.kind(n).is_expression())
                .ok_or(IntroduceError::NoEnclosingExpression)?;
            let targets = collect_targets(tree, promote_callee(tree, innermost));
            tracing::debug!(count = targets.len(), "collected extraction targets");
            Ok(targets)
        }
    }
}

/// A caret inside a call's path lands on the path, but the interesting
/// candidate is the call itself.
fn promote_callee(tree: &SyntaxTree, expr: NodeId) -> NodeId {
    if tree.kind(expr) == SyntaxKind::PathExpr {
        if let Some(parent) = tree.parent(expr) {
            if tree.kind(parent) == SyntaxKind::CallExpr
                && tree.children(parent).first() == Some(&expr)
            {
                return parent;
            }
        }
    }
    expr
}

fn collect_targets(tree: &SyntaxTree, innermost: NodeId) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut current = innermost;
    loop {
        // Hop over wrappers (argument lists, match arms, ...) that sit
        // between an expression and its enclosing expression. Statements and
        // blocks end the walk.
        let mut parent = tree.parent(current);
        while let Some(p) = parent {
            let kind = tree.kind(p);
            if kind.is_expression()
                || kind.is_statement()
                || matches!(
                    kind,
                    SyntaxKind::Block | SyntaxKind::Function | SyntaxKind::SourceFile
                )
            {
                break;
            }
            parent = tree.parent(p);
        }

        let range = tree.range(current);
        let terminal = match parent {
            Some(p) if tree.kind(p) == SyntaxKind::ExprStmt => {
                push_candidate(&mut candidates, tree, current, CandidateKind::Statement);
                true
            }
            Some(p) if tree.kind(p).is_expression() => {
                push_candidate(&mut candidates, tree, current, CandidateKind::Expression);
                current = p;
                false
            }
            _ => {
                push_candidate(&mut candidates, tree, current, CandidateKind::Expression);
                true
            }
        };
        if terminal {
            break;
        }
        debug_assert!(tree.range(current).contains_range(range));
    }
    candidates
}

fn push_candidate(
    candidates: &mut Vec<Candidate>,
    tree: &SyntaxTree,
    node: NodeId,
    kind: CandidateKind,
) {
    let range = tree.range(node);
    // Degenerate trees can yield an ancestor with the same span; the
    // innermost one already represents it.
    if candidates.last().map(|c| c.range) == Some(range) {
        if kind == CandidateKind::Statement {
            if let Some(last) = candidates.last_mut() {
                last.kind = kind;
            }
        }
        return;
    }
    candidates.push(Candidate { node, range, kind });
}

/// Finds every expression in the candidate's enclosing block that is
/// structurally equal to it: same significant token sequence, trivia
/// ignored. The candidate's own span is always part of the result, and
/// results come back in source order.
///
/// Nested function or closure bodies whose parameters shadow a name the
/// candidate uses are not entered.
pub fn find_occurrences(tree: &SyntaxTree, candidate: &Candidate) -> Vec<TextRange> {
    let scope = tree
        .ancestors(candidate.node)
        .skip(1)
        .find(|&n| tree.kind(n) == SyntaxKind::Block)
        .unwrap_or_else(|| tree.root());

    let wanted: Vec<(SyntaxKind, &str)> = significant_token_texts(tree, candidate.node);
    let free = free_names(tree, candidate.node);

    let mut occurrences = Vec::new();
    collect_occurrences(tree, scope, candidate, &wanted, &free, &mut occurrences);
    occurrences
}

fn collect_occurrences(
    tree: &SyntaxTree,
    node: NodeId,
    candidate: &Candidate,
    wanted: &[(SyntaxKind, &str)],
    free: &HashSet<&str>,
    out: &mut Vec<TextRange>,
) {
    let kind = tree.kind(node);
    if kind.is_expression() && significant_token_texts(tree, node) == wanted {
        out.push(tree.range(node));
        // An occurrence cannot contain another of itself.
        return;
    }

    if matches!(kind, SyntaxKind::Function | SyntaxKind::ClosureExpr)
        && !tree.range(node).contains_range(candidate.range)
        && shadows_any(tree, node, free)
    {
        return;
    }

    for &child in tree.children(node) {
        collect_occurrences(tree, child, candidate, wanted, free, out);
    }
}

fn significant_token_texts<'t>(tree: &'t SyntaxTree, node: NodeId) -> Vec<(SyntaxKind, &'t str)> {
    tree.significant_tokens(node)
        .map(|t| (t.kind, tree.token_text(t)))
        .collect()
}

/// Names the candidate mentions as path roots; used to decide whether a
/// nested scope shadows something the candidate depends on.
fn free_names<'t>(tree: &'t SyntaxTree, node: NodeId) -> HashSet<&'t str> {
    let mut names = HashSet::new();
    for descendant in tree.descendants(node) {
        if tree.kind(descendant) != SyntaxKind::PathExpr {
            continue;
        }
        if let Some(token) = tree
            .significant_tokens(descendant)
            .find(|t| t.kind == SyntaxKind::Identifier)
        {
            names.insert(tree.token_text(token));
        }
    }
    names
}

fn shadows_any(tree: &SyntaxTree, fn_like: NodeId, free: &HashSet<&str>) -> bool {
    let Some(&params) = tree
        .children(fn_like)
        .iter()
        .find(|&&c| tree.kind(c) == SyntaxKind::ParamList)
    else {
        return false;
    };
    for &param in tree.children(params) {
        if tree.kind(param) != SyntaxKind::Param {
            continue;
        }
        if let Some(token) = tree
            .significant_tokens(param)
            .find(|t| t.kind == SyntaxKind::Identifier)
        {
            if free.contains(tree.token_text(token)) {
                return true;
            }
        }
    }
    false
}

/// Derives a default binding name from the candidate's shape. Deterministic
/// and collision-unaware: callers resolve clashes with
/// [`IntroduceOptions::name`].
pub fn suggest_name(tree: &SyntaxTree, candidate: &Candidate) -> String {
    match tree.kind(candidate.node) {
        SyntaxKind::CallExpr => {
            let callee = tree.children(candidate.node).first().copied();
            let segments = callee
                .filter(|&c| tree.kind(c) == SyntaxKind::PathExpr)
                .map(|c| path_segment_names(tree, c))
                .unwrap_or_default();
            match segments.as_slice() {
                [simple] => simple.to_string(),
                [first, ..] => first.to_lowercase(),
                [] => "x".to_string(),
            }
        }
        SyntaxKind::LiteralExpr => "i".to_string(),
        _ => "x".to_string(),
    }
}

fn path_segment_names<'t>(tree: &'t SyntaxTree, path_expr: NodeId) -> Vec<&'t str> {
    tree.significant_tokens(path_expr)
        .filter(|t| t.kind == SyntaxKind::Identifier)
        .map(|t| tree.token_text(t))
        .collect()
}

/// Syntax-level mutability check over the sites the binding will replace:
/// `&mut <site>` (through parentheses) or `<site> = ...` forces `let mut`.
/// This is deliberately not a borrow analysis.
pub fn needs_mutable(tree: &SyntaxTree, occurrences: &[TextRange]) -> bool {
    occurrences.iter().any(|&range| {
        let Some(node) = tree.expression_with_range(range) else {
            return false;
        };
        let mut current = node;
        loop {
            let Some(parent) = tree.parent(current) else {
                return false;
            };
            match tree.kind(parent) {
                SyntaxKind::ParenExpr => current = parent,
                SyntaxKind::RefExpr => {
                    return tree
                        .significant_tokens(parent)
                        .take(2)
                        .any(|t| t.kind == SyntaxKind::MutKw);
                }
                SyntaxKind::BinaryExpr => {
                    if tree.children(parent).first() != Some(&current) {
                        return false;
                    }
                    let lhs_end = tree.range(current).end();
                    let op = tree
                        .significant_tokens(parent)
                        .find(|t| t.range.start() >= lhs_end)
                        .map(|t| t.kind);
                    return matches!(
                        op,
                        Some(
                            SyntaxKind::Eq
                                | SyntaxKind::PlusEq
                                | SyntaxKind::MinusEq
                                | SyntaxKind::StarEq
                                | SyntaxKind::SlashEq
                                | SyntaxKind::PercentEq
                                | SyntaxKind::AmpEq
                                | SyntaxKind::PipeEq
                                | SyntaxKind::CaretEq
                                | SyntaxKind::ShlEq
                        )
                    );
                }
                _ => return false,
            }
        }
    })
}

/// Computes the edit set that introduces the binding: a declaration
/// insertion plus one replacement per chosen occurrence, or a single
/// in-place rewrite for a statement candidate. Edits are validated to be
/// non-overlapping and are meant to be applied atomically with
/// [`crate::apply_text_edits`].
pub fn introduce_variable(
    tree: &SyntaxTree,
    candidate: &Candidate,
    occurrences: &[TextRange],
    options: IntroduceOptions,
) -> Result<IntroduceOutcome, IntroduceError> {
    let name = options
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| suggest_name(tree, candidate));

    let mut edits = match candidate.kind {
        CandidateKind::Statement => rewrite_statement(tree, candidate, &name)?,
        CandidateKind::Expression => rewrite_expression(tree, candidate, occurrences, &name)?,
    };

    normalize_edits(&mut edits)?;

    let mutable = match candidate.kind {
        CandidateKind::Statement => false,
        CandidateKind::Expression => {
            let chosen: &[TextRange] = if occurrences.is_empty() {
                std::slice::from_ref(&candidate.range)
            } else {
                occurrences
            };
            needs_mutable(tree, chosen)
        }
    };

    // The declaration text depends on the mutability decision; patch it in
    // after the fact so the edit set stays a single atomic pass.
    if mutable {
        for edit in &mut edits {
            if let Some(rest) = edit.replacement.strip_prefix("let ") {
                edit.replacement = format!("let mut {rest}");
                break;
            }
            if let Some(pos) = edit.replacement.find("let ") {
                edit.replacement.insert_str(pos + "let ".len(), "mut ");
                break;
            }
        }
    }

    tracing::debug!(
        name = %name,
        mutable,
        edits = edits.len(),
        "introduce variable rewrite computed"
    );

    Ok(IntroduceOutcome {
        edits,
        name,
        mutable,
    })
}

fn rewrite_statement(
    tree: &SyntaxTree,
    candidate: &Candidate,
    name: &str,
) -> Result<Vec<TextEdit>, IntroduceError> {
    let stmt = tree
        .ancestors(candidate.node)
        .find(|&n| tree.kind(n) == SyntaxKind::ExprStmt)
        .ok_or(IntroduceError::AmbiguousInsertionPoint)?;
    let init = tree.node_text(candidate.node);
    let decl = format!("let {name} = {init};");
    Ok(vec![TextEdit::replace(tree.range(stmt), decl)])
}

fn rewrite_expression(
    tree: &SyntaxTree,
    candidate: &Candidate,
    occurrences: &[TextRange],
    name: &str,
) -> Result<Vec<TextEdit>, IntroduceError> {
    let chosen: Vec<TextRange> = if occurrences.is_empty() {
        vec![candidate.range]
    } else {
        occurrences.to_vec()
    };

    let nodes = chosen
        .iter()
        .map(|&range| tree.expression_with_range(range))
        .collect::<Option<Vec<_>>>()
        .ok_or(IntroduceError::NoMatchingExpression)?;

    let block = common_block(tree, &nodes).ok_or(IntroduceError::AmbiguousInsertionPoint)?;

    let anchors = nodes
        .iter()
        .map(|&n| {
            tree.ancestors(n)
                .find(|&a| tree.parent(a) == Some(block))
        })
        .collect::<Option<Vec<_>>>()
        .ok_or(IntroduceError::AmbiguousInsertionPoint)?;

    let first_anchor = anchors
        .iter()
        .copied()
        .min_by_key(|&a| tree.range(a).start())
        .ok_or(IntroduceError::AmbiguousInsertionPoint)?;

    let anchor_start = tree.range(first_anchor).start();
    if chosen.iter().any(|o| o.start() < anchor_start) {
        return Err(IntroduceError::AmbiguousInsertionPoint);
    }

    let text = tree.text();
    let init = &text[candidate.range];
    let stmt_start = usize::from(anchor_start);
    let block_start = usize::from(tree.range(block).start());

    let mut edits = Vec::with_capacity(chosen.len() + 1);
    if line_start(text, stmt_start) <= block_start {
        // The anchor statement shares a line with the opening brace; keep
        // the declaration on that line too.
        let decl = format!("let {name} = {init}; ");
        edits.push(TextEdit::insert(anchor_start, decl));
    } else {
        let indent = indentation_at(text, stmt_start);
        let insert_at = insertion_offset(text, stmt_start);
        let decl = format!("{indent}let {name} = {init};\n");
        edits.push(TextEdit::insert(TextSize::from(insert_at as u32), decl));
    }

    for range in chosen {
        edits.push(TextEdit::replace(range, name.to_string()));
    }
    Ok(edits)
}

/// Innermost block that contains every occurrence.
fn common_block(tree: &SyntaxTree, nodes: &[NodeId]) -> Option<NodeId> {
    let first = *nodes.first()?;
    tree.ancestors(first)
        .filter(|&a| tree.kind(a) == SyntaxKind::Block)
        .find(|&block| {
            nodes[1..]
                .iter()
                .all(|&n| tree.ancestors(n).any(|a| a == block))
        })
}

fn line_start(text: &str, offset: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = offset;
    while i > 0 && bytes[i - 1] != b'\n' {
        i -= 1;
    }
    i
}

fn indentation_at(text: &str, offset: usize) -> String {
    let start = line_start(text, offset);
    text[start..offset]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Line start of the statement at `offset`, hopped back over entirely blank
/// lines so the declaration attaches to the preceding statement and the
/// blank lines stay where they were.
fn insertion_offset(text: &str, offset: usize) -> usize {
    let mut insert = line_start(text, offset);
    while insert > 0 {
        let prev_start = line_start(text, insert - 1);
        if text[prev_start..insert].trim().is_empty() {
            insert = prev_start;
        } else {
            break;
        }
    }
    insert
}
