use text_size::TextRange;

use crate::lexer::{lex, Token};
use crate::syntax_kind::SyntaxKind;
use crate::tree::{SyntaxTree, TreeBuilder};
use crate::ParseError;

/// Result of parsing one source snapshot.
///
/// The tree is always produced; syntax errors are collected alongside and
/// the offending tokens are wrapped in `Error` nodes.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub tree: SyntaxTree,
    pub errors: Vec<ParseError>,
}

pub fn parse(text: &str) -> ParseResult {
    Parser::new(text).parse()
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    /// Index of the next unconsumed token (trivia included).
    pos: usize,
    builder: TreeBuilder,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: lex(text),
            pos: 0,
            builder: TreeBuilder::new(),
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> ParseResult {
        self.builder.start_node(SyntaxKind::SourceFile);

        while !self.at(SyntaxKind::Eof) {
            if self.at_function_start() {
                self.parse_function();
            } else {
                self.recover_top_level();
            }
        }

        self.builder.finish_node();

        let errors = std::mem::take(&mut self.errors);
        tracing::debug!(
            tokens = self.tokens.len(),
            errors = errors.len(),
            "parsed source file"
        );
        let tree = self.builder.finish(self.text.to_string(), self.tokens);
        ParseResult { tree, errors }
    }

    // --- Token access -----------------------------------------------------

    /// Index of the nth significant token at or after `pos`.
    fn significant_index(&self, n: usize) -> usize {
        let mut idx = self.pos;
        let mut remaining = n;
        loop {
            let token = &self.tokens[idx];
            if token.kind == SyntaxKind::Eof {
                return idx;
            }
            if !token.kind.is_trivia() {
                if remaining == 0 {
                    return idx;
                }
                remaining -= 1;
            }
            idx += 1;
        }
    }

    fn current(&self) -> SyntaxKind {
        self.tokens[self.significant_index(0)].kind
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        self.tokens[self.significant_index(n)].kind
    }

    fn current_range(&self) -> TextRange {
        self.tokens[self.significant_index(0)].range
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    /// True when the current token is immediately followed (no trivia, no
    /// gap) by a token of `kind`. Used to join split `>` `>` pairs.
    fn at_adjacent_pair(&self, second: SyntaxKind) -> bool {
        let idx = self.significant_index(0);
        match self.tokens.get(idx + 1) {
            Some(next) => {
                next.kind == second && self.tokens[idx].range.end() == next.range.start()
            }
            None => false,
        }
    }

    fn bump(&mut self) {
        let idx = self.significant_index(0);
        if self.tokens[idx].kind == SyntaxKind::Eof {
            return;
        }
        self.builder.token(idx as u32);
        self.pos = idx + 1;
    }

    fn expect(&mut self, kind: SyntaxKind, message: &str) {
        if self.at(kind) {
            self.bump();
        } else {
            self.error_here(message);
        }
    }

    fn error_here(&mut self, message: &str) {
        self.errors.push(ParseError {
            message: message.to_string(),
            range: self.current_range(),
        });
    }

    fn err_and_bump(&mut self, message: &str) {
        self.error_here(message);
        if !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::Error);
            self.bump();
            self.builder.finish_node();
        }
    }

    fn recover_top_level(&mut self) {
        self.error_here("expected a function definition");
        self.builder.start_node(SyntaxKind::Error);
        while !self.at(SyntaxKind::Eof) && !self.at_function_start() {
            self.bump();
        }
        self.builder.finish_node();
    }

    fn at_function_start(&self) -> bool {
        self.at(SyntaxKind::FnKw)
            || (self.at(SyntaxKind::PubKw) && self.nth(1) == SyntaxKind::FnKw)
    }

    // --- Items ------------------------------------------------------------

    fn parse_function(&mut self) {
        self.builder.start_node(SyntaxKind::Function);
        if self.at(SyntaxKind::PubKw) {
            self.bump();
        }
        self.expect(SyntaxKind::FnKw, "expected `fn`");
        self.expect(SyntaxKind::Identifier, "expected function name");
        if self.at(SyntaxKind::LParen) {
            self.parse_param_list();
        } else {
            self.error_here("expected parameter list");
        }
        if self.at(SyntaxKind::Arrow) {
            self.builder.start_node(SyntaxKind::RetType);
            self.bump();
            self.parse_type();
            self.builder.finish_node();
        }
        if self.at(SyntaxKind::LBrace) {
            self.parse_block();
        } else {
            self.error_here("expected function body");
        }
        self.builder.finish_node();
    }

    fn parse_param_list(&mut self) {
        self.builder.start_node(SyntaxKind::ParamList);
        self.expect(SyntaxKind::LParen, "expected `(`");
        while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
            self.parse_param();
            if self.at(SyntaxKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.builder.finish_node();
    }

    fn parse_param(&mut self) {
        self.builder.start_node(SyntaxKind::Param);
        if self.at(SyntaxKind::MutKw) {
            self.bump();
        }
        self.expect(SyntaxKind::Identifier, "expected parameter name");
        if self.at(SyntaxKind::Colon) {
            self.bump();
            self.parse_type();
        }
        self.builder.finish_node();
    }

    fn parse_type(&mut self) {
        self.builder.start_node(SyntaxKind::Type);
        match self.current() {
            SyntaxKind::Amp => {
                self.bump();
                if self.at(SyntaxKind::Lifetime) {
                    self.bump();
                }
                if self.at(SyntaxKind::MutKw) {
                    self.bump();
                }
                self.parse_type();
            }
            SyntaxKind::LParen => {
                self.bump();
                while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
                    self.parse_type();
                    if self.at(SyntaxKind::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(SyntaxKind::RParen, "expected `)` in type");
            }
            SyntaxKind::Identifier => {
                self.bump();
                while self.at(SyntaxKind::ColonColon) {
                    self.bump();
                    self.expect(SyntaxKind::Identifier, "expected type path segment");
                }
                if self.at(SyntaxKind::Less) {
                    self.parse_generic_args();
                }
            }
            _ => self.err_and_bump("expected type"),
        }
        self.builder.finish_node();
    }

    fn parse_generic_args(&mut self) {
        self.builder.start_node(SyntaxKind::GenericArgs);
        self.expect(SyntaxKind::Less, "expected `<`");
        while !self.at(SyntaxKind::Greater) && !self.at(SyntaxKind::Eof) {
            self.parse_type();
            if self.at(SyntaxKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(SyntaxKind::Greater, "expected `>` to close generic arguments");
        self.builder.finish_node();
    }

    // --- Statements -------------------------------------------------------

    fn parse_block(&mut self) {
        self.builder.start_node(SyntaxKind::Block);
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            self.parse_stmt();
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    fn parse_stmt(&mut self) {
        match self.current() {
            SyntaxKind::Semicolon => {
                self.builder.start_node(SyntaxKind::EmptyStmt);
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::LetKw => self.parse_let_stmt(),
            _ if self.at_function_start() => self.parse_function(),
            _ => {
                self.builder.start_node(SyntaxKind::ExprStmt);
                self.parse_expr(0);
                if self.at(SyntaxKind::Semicolon) {
                    self.bump();
                }
                self.builder.finish_node();
            }
        }
    }

    fn parse_let_stmt(&mut self) {
        self.builder.start_node(SyntaxKind::LetStmt);
        self.expect(SyntaxKind::LetKw, "expected `let`");
        self.parse_pat();
        if self.at(SyntaxKind::Colon) {
            self.bump();
            self.parse_type();
        }
        if self.at(SyntaxKind::Eq) {
            self.bump();
            self.parse_expr(0);
        }
        self.expect(SyntaxKind::Semicolon, "expected `;` after let statement");
        self.builder.finish_node();
    }

    // --- Patterns ---------------------------------------------------------

    fn parse_pat(&mut self) {
        match self.current() {
            SyntaxKind::Underscore => {
                self.builder.start_node(SyntaxKind::WildcardPat);
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::IntLiteral
            | SyntaxKind::FloatLiteral
            | SyntaxKind::StringLiteral
            | SyntaxKind::CharLiteral
            | SyntaxKind::TrueKw
            | SyntaxKind::FalseKw => {
                self.builder.start_node(SyntaxKind::LiteralPat);
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::Minus => {
                self.builder.start_node(SyntaxKind::LiteralPat);
                self.bump();
                if matches!(
                    self.current(),
                    SyntaxKind::IntLiteral | SyntaxKind::FloatLiteral
                ) {
                    self.bump();
                } else {
                    self.error_here("expected numeric literal");
                }
                self.builder.finish_node();
            }
            SyntaxKind::RefKw | SyntaxKind::MutKw => {
                self.builder.start_node(SyntaxKind::IdentPat);
                if self.at(SyntaxKind::RefKw) {
                    self.bump();
                }
                if self.at(SyntaxKind::MutKw) {
                    self.bump();
                }
                self.expect(SyntaxKind::Identifier, "expected binding name");
                self.builder.finish_node();
            }
            SyntaxKind::Identifier => {
                if self.nth(1) == SyntaxKind::ColonColon || self.nth(1) == SyntaxKind::LParen {
                    let checkpoint = self.builder.checkpoint();
                    self.parse_path();
                    if self.at(SyntaxKind::LParen) {
                        self.builder
                            .start_node_at(checkpoint, SyntaxKind::TupleStructPat);
                        self.bump();
                        while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
                            self.parse_pat();
                            if self.at(SyntaxKind::Comma) {
                                self.bump();
                            } else {
                                break;
                            }
                        }
                        self.expect(SyntaxKind::RParen, "expected `)` in pattern");
                        self.builder.finish_node();
                    } else {
                        self.builder.start_node_at(checkpoint, SyntaxKind::PathPat);
                        self.builder.finish_node();
                    }
                } else {
                    self.builder.start_node(SyntaxKind::IdentPat);
                    self.bump();
                    self.builder.finish_node();
                }
            }
            _ => self.err_and_bump("expected pattern"),
        }
    }

    fn parse_path(&mut self) {
        self.builder.start_node(SyntaxKind::Path);
        self.parse_path_segment();
        while self.at(SyntaxKind::ColonColon) {
            self.bump();
            self.parse_path_segment();
        }
        self.builder.finish_node();
    }

    fn parse_path_segment(&mut self) {
        self.builder.start_node(SyntaxKind::PathSegment);
        self.expect(SyntaxKind::Identifier, "expected path segment");
        self.builder.finish_node();
    }

    // --- Expressions ------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) {
        let checkpoint = self.builder.checkpoint();
        self.parse_prefix_expr();
        loop {
            let Some((l_bp, r_bp, glued)) = self.binary_op_bp() else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.builder.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            if glued {
                self.bump();
            }
            self.parse_expr(r_bp);
            self.builder.finish_node();
        }
    }

    /// Binding powers of the current token viewed as a binary operator.
    ///
    /// `glued` marks a split `>` `>` pair that forms one shift (or
    /// shift-assign) operator and must be bumped as two tokens.
    fn binary_op_bp(&self) -> Option<(u8, u8, bool)> {
        use SyntaxKind::*;
        let bp = match self.current() {
            Eq | PlusEq | MinusEq | StarEq | SlashEq | PercentEq | AmpEq | PipeEq | CaretEq
            | ShlEq => (2, 1, false),
            DotDot | DotDotEq => (4, 3, false),
            PipePipe => (5, 6, false),
            AmpAmp => (7, 8, false),
            Greater if self.at_adjacent_pair(Greater) => (17, 18, true),
            Greater if self.at_adjacent_pair(GreaterEq) => (2, 1, true),
            EqEq | BangEq | Less | LessEq | Greater | GreaterEq => (9, 10, false),
            Pipe => (11, 12, false),
            Caret => (13, 14, false),
            Amp => (15, 16, false),
            Shl => (17, 18, false),
            Plus | Minus => (19, 20, false),
            Star | Slash | Percent => (21, 22, false),
            _ => return None,
        };
        Some(bp)
    }

    const UNARY_BP: u8 = 23;

    fn parse_prefix_expr(&mut self) {
        match self.current() {
            SyntaxKind::Minus | SyntaxKind::Bang | SyntaxKind::Star => {
                self.builder.start_node(SyntaxKind::UnaryExpr);
                self.bump();
                self.parse_expr(Self::UNARY_BP);
                self.builder.finish_node();
            }
            SyntaxKind::Amp | SyntaxKind::AmpAmp => {
                self.builder.start_node(SyntaxKind::RefExpr);
                self.bump();
                if self.at(SyntaxKind::MutKw) {
                    self.bump();
                }
                self.parse_expr(Self::UNARY_BP);
                self.builder.finish_node();
            }
            _ => self.parse_postfix_expr(),
        }
    }

    fn parse_postfix_expr(&mut self) {
        let checkpoint = self.builder.checkpoint();
        self.parse_primary_expr();
        loop {
            match self.current() {
                SyntaxKind::LParen => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::CallExpr);
                    self.parse_arg_list();
                    self.builder.finish_node();
                }
                SyntaxKind::Question => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::TryExpr);
                    self.bump();
                    self.builder.finish_node();
                }
                SyntaxKind::LBracket => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::IndexExpr);
                    self.bump();
                    self.parse_expr(0);
                    self.expect(SyntaxKind::RBracket, "expected `]`");
                    self.builder.finish_node();
                }
                SyntaxKind::Dot => {
                    if self.nth(1) == SyntaxKind::Identifier && self.nth(2) == SyntaxKind::LParen
                    {
                        self.builder
                            .start_node_at(checkpoint, SyntaxKind::MethodCallExpr);
                        self.bump();
                        self.bump();
                        self.parse_arg_list();
                        self.builder.finish_node();
                    } else {
                        self.builder.start_node_at(checkpoint, SyntaxKind::FieldExpr);
                        self.bump();
                        if matches!(
                            self.current(),
                            SyntaxKind::Identifier | SyntaxKind::IntLiteral
                        ) {
                            self.bump();
                        } else {
                            self.error_here("expected field name");
                        }
                        self.builder.finish_node();
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_arg_list(&mut self) {
        self.builder.start_node(SyntaxKind::ArgList);
        self.expect(SyntaxKind::LParen, "expected `(`");
        while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
            self.parse_expr(0);
            if self.at(SyntaxKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.builder.finish_node();
    }

    fn parse_primary_expr(&mut self) {
        match self.current() {
            SyntaxKind::IntLiteral
            | SyntaxKind::FloatLiteral
            | SyntaxKind::StringLiteral
            | SyntaxKind::CharLiteral
            | SyntaxKind::TrueKw
            | SyntaxKind::FalseKw => {
                self.builder.start_node(SyntaxKind::LiteralExpr);
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::Identifier => {
                self.builder.start_node(SyntaxKind::PathExpr);
                self.parse_path();
                self.builder.finish_node();
            }
            SyntaxKind::LParen => {
                self.builder.start_node(SyntaxKind::ParenExpr);
                self.bump();
                while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
                    self.parse_expr(0);
                    if self.at(SyntaxKind::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(SyntaxKind::RParen, "expected `)`");
                self.builder.finish_node();
            }
            SyntaxKind::LBrace => {
                self.builder.start_node(SyntaxKind::BlockExpr);
                self.parse_block();
                self.builder.finish_node();
            }
            SyntaxKind::MatchKw => self.parse_match_expr(),
            SyntaxKind::IfKw => self.parse_if_expr(),
            SyntaxKind::WhileKw => {
                self.builder.start_node(SyntaxKind::WhileExpr);
                self.bump();
                self.parse_expr(0);
                self.parse_block();
                self.builder.finish_node();
            }
            SyntaxKind::LoopKw => {
                self.builder.start_node(SyntaxKind::LoopExpr);
                self.bump();
                self.parse_block();
                self.builder.finish_node();
            }
            SyntaxKind::ForKw => {
                self.builder.start_node(SyntaxKind::ForExpr);
                self.bump();
                self.parse_pat();
                self.expect(SyntaxKind::InKw, "expected `in`");
                self.parse_expr(0);
                self.parse_block();
                self.builder.finish_node();
            }
            SyntaxKind::ReturnKw => {
                self.builder.start_node(SyntaxKind::ReturnExpr);
                self.bump();
                if self.at_expr_start() {
                    self.parse_expr(0);
                }
                self.builder.finish_node();
            }
            SyntaxKind::BreakKw => {
                self.builder.start_node(SyntaxKind::BreakExpr);
                self.bump();
                if self.at_expr_start() {
                    self.parse_expr(0);
                }
                self.builder.finish_node();
            }
            SyntaxKind::ContinueKw => {
                self.builder.start_node(SyntaxKind::ContinueExpr);
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::Pipe | SyntaxKind::PipePipe | SyntaxKind::MoveKw => {
                self.parse_closure_expr();
            }
            _ => self.err_and_bump("expected expression"),
        }
    }

    fn at_expr_start(&self) -> bool {
        use SyntaxKind::*;
        matches!(
            self.current(),
            IntLiteral
                | FloatLiteral
                | StringLiteral
                | CharLiteral
                | TrueKw
                | FalseKw
                | Identifier
                | LParen
                | LBrace
                | MatchKw
                | IfKw
                | WhileKw
                | LoopKw
                | ForKw
                | ReturnKw
                | BreakKw
                | ContinueKw
                | Minus
                | Bang
                | Star
                | Amp
                | AmpAmp
                | Pipe
                | PipePipe
                | MoveKw
        )
    }

    fn parse_match_expr(&mut self) {
        self.builder.start_node(SyntaxKind::MatchExpr);
        self.expect(SyntaxKind::MatchKw, "expected `match`");
        self.parse_expr(0);
        self.builder.start_node(SyntaxKind::MatchArmList);
        self.expect(SyntaxKind::LBrace, "expected `{` after match scrutinee");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            self.parse_match_arm();
        }
        self.expect(SyntaxKind::RBrace, "expected `}` to close match");
        self.builder.finish_node();
        self.builder.finish_node();
    }

    fn parse_match_arm(&mut self) {
        self.builder.start_node(SyntaxKind::MatchArm);
        self.parse_pat();
        while self.at(SyntaxKind::Pipe) {
            self.bump();
            self.parse_pat();
        }
        if self.at(SyntaxKind::IfKw) {
            self.builder.start_node(SyntaxKind::MatchGuard);
            self.bump();
            self.parse_expr(0);
            self.builder.finish_node();
        }
        self.expect(SyntaxKind::FatArrow, "expected `=>`");
        self.parse_expr(0);
        if self.at(SyntaxKind::Comma) {
            self.bump();
        }
        self.builder.finish_node();
    }

    fn parse_if_expr(&mut self) {
        self.builder.start_node(SyntaxKind::IfExpr);
        self.expect(SyntaxKind::IfKw, "expected `if`");
        if self.at(SyntaxKind::LetKw) {
            self.bump();
            self.parse_pat();
            self.expect(SyntaxKind::Eq, "expected `=` in if-let");
            self.parse_expr(0);
        } else {
            self.parse_expr(0);
        }
        self.parse_block();
        if self.at(SyntaxKind::ElseKw) {
            self.bump();
            if self.at(SyntaxKind::IfKw) {
                self.parse_if_expr();
            } else {
                self.parse_block();
            }
        }
        self.builder.finish_node();
    }

    fn parse_closure_expr(&mut self) {
        self.builder.start_node(SyntaxKind::ClosureExpr);
        if self.at(SyntaxKind::MoveKw) {
            self.bump();
        }
        self.builder.start_node(SyntaxKind::ParamList);
        if self.at(SyntaxKind::PipePipe) {
            self.bump();
        } else {
            self.expect(SyntaxKind::Pipe, "expected `|`");
            while !self.at(SyntaxKind::Pipe) && !self.at(SyntaxKind::Eof) {
                self.parse_param();
                if self.at(SyntaxKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
            self.expect(SyntaxKind::Pipe, "expected `|` to close closure parameters");
        }
        self.builder.finish_node();
        self.parse_expr(0);
        self.builder.finish_node();
    }
}
