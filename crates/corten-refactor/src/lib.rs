//! Introduce-local-variable refactoring for Corten.
//!
//! The engine consumes an immutable [`corten_syntax::SyntaxTree`] snapshot
//! and an [`Anchor`] (caret offset or explicit selection) and drives the
//! whole extraction flow:
//! - [`possible_targets`] enumerates extractable expressions, innermost
//!   first, ending with the enclosing statement;
//! - [`find_occurrences`] collects structurally equal expressions in the
//!   enclosing block for the caller to unify;
//! - [`suggest_name`] derives a default binding name;
//! - [`introduce_variable`] computes the atomic, non-overlapping edit set
//!   (declaration insertion plus occurrence replacements), deciding
//!   `let` vs `let mut` along the way;
//! - [`apply_text_edits`] materializes a new document snapshot.
//!
//! One invocation is a single transaction over one snapshot: either the
//! caller applies the returned edits, or nothing happens. Re-parse before
//! starting the next one.

mod edit;
mod introduce_variable;

pub use edit::{apply_text_edits, normalize_edits, EditError, TextEdit};
pub use introduce_variable::{
    find_occurrences, introduce_variable, needs_mutable, possible_targets, suggest_name, Anchor,
    Candidate, CandidateKind, IntroduceError, IntroduceOptions, IntroduceOutcome,
};

pub use corten_syntax::{TextRange, TextSize};
