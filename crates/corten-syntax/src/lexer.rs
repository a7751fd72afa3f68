use text_size::{TextRange, TextSize};

use crate::syntax_kind::SyntaxKind;

/// A lexed token: kind plus the byte range it occupies in the source.
///
/// Trivia (whitespace and comments) is kept in the token stream so that
/// downstream consumers can reconstruct exact source text and strip trivia
/// for structural comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

impl Token {
    fn new(kind: SyntaxKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            range: TextRange::new(
                TextSize::from(start as u32),
                TextSize::from(end as u32),
            ),
        }
    }
}

/// Lex `text` into a token stream terminated by a zero-length `Eof` token.
///
/// The lexer never fails: unrecognized characters become `Error` tokens.
pub fn lex(text: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(text);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }
    let end = text.len();
    tokens.push(Token::new(SyntaxKind::Eof, end, end));
    tokens
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Lexer { text, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.remaining().chars();
        chars.next();
        chars.next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.remaining().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        let start = self.pos;
        let c = self.peek_char()?;

        if c.is_whitespace() {
            while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
                self.bump_char();
            }
            return Some(Token::new(SyntaxKind::Whitespace, start, self.pos));
        }

        if self.remaining().starts_with("//") {
            while !matches!(self.peek_char(), None | Some('\n')) {
                self.bump_char();
            }
            return Some(Token::new(SyntaxKind::LineComment, start, self.pos));
        }

        if self.remaining().starts_with("/*") {
            self.pos += 2;
            // Block comments nest in Rust.
            let mut depth = 1usize;
            while depth > 0 {
                if self.eat("/*") {
                    depth += 1;
                } else if self.eat("*/") {
                    depth -= 1;
                } else if self.bump_char().is_none() {
                    break;
                }
            }
            return Some(Token::new(SyntaxKind::BlockComment, start, self.pos));
        }

        if unicode_ident::is_xid_start(c) || c == '_' {
            self.bump_char();
            while matches!(
                self.peek_char(),
                Some(c) if unicode_ident::is_xid_continue(c)
            ) {
                self.bump_char();
            }
            let text = &self.text[start..self.pos];
            let kind = if text == "_" {
                SyntaxKind::Underscore
            } else {
                SyntaxKind::from_keyword(text).unwrap_or(SyntaxKind::Identifier)
            };
            return Some(Token::new(kind, start, self.pos));
        }

        if c.is_ascii_digit() {
            return Some(self.number(start));
        }

        if c == '"' {
            return Some(self.string_literal(start));
        }

        if c == '\'' {
            return Some(self.quote_token(start));
        }

        let kind = self.operator();
        Some(Token::new(kind, start, self.pos))
    }

    fn number(&mut self, start: usize) -> Token {
        let mut kind = SyntaxKind::IntLiteral;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.bump_char();
        }
        // A `.` continues the literal only when followed by a digit, so that
        // `1.max(2)` and `1..2` lex as method call / range.
        if self.peek_char() == Some('.')
            && matches!(self.peek_second(), Some(c) if c.is_ascii_digit())
        {
            kind = SyntaxKind::FloatLiteral;
            self.bump_char();
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit() || c == '_') {
                self.bump_char();
            }
        }
        // Type suffix (`1u32`, `2.5f64`).
        while matches!(
            self.peek_char(),
            Some(c) if unicode_ident::is_xid_continue(c)
        ) {
            self.bump_char();
        }
        Token::new(kind, start, self.pos)
    }

    fn string_literal(&mut self, start: usize) -> Token {
        self.bump_char(); // opening quote
        loop {
            match self.bump_char() {
                None | Some('"') => break,
                Some('\\') => {
                    self.bump_char();
                }
                Some(_) => {}
            }
        }
        Token::new(SyntaxKind::StringLiteral, start, self.pos)
    }

    /// Disambiguates char literals from lifetimes after a leading `'`.
    fn quote_token(&mut self, start: usize) -> Token {
        self.bump_char(); // '
        match self.peek_char() {
            Some('\\') => {
                self.bump_char();
                self.bump_char();
                self.eat("'");
                Token::new(SyntaxKind::CharLiteral, start, self.pos)
            }
            Some(c) if unicode_ident::is_xid_start(c) || c == '_' => {
                self.bump_char();
                while matches!(
                    self.peek_char(),
                    Some(c) if unicode_ident::is_xid_continue(c)
                ) {
                    self.bump_char();
                }
                if self.eat("'") {
                    Token::new(SyntaxKind::CharLiteral, start, self.pos)
                } else {
                    Token::new(SyntaxKind::Lifetime, start, self.pos)
                }
            }
            Some(_) => {
                self.bump_char();
                self.eat("'");
                Token::new(SyntaxKind::CharLiteral, start, self.pos)
            }
            None => Token::new(SyntaxKind::Error, start, self.pos),
        }
    }

    fn operator(&mut self) -> SyntaxKind {
        // Maximal munch, longest operators first. `>` is never glued into a
        // shift token: generic argument lists need the split form, and the
        // expression parser joins adjacent `>` tokens itself.
        if self.eat("<<=") {
            return SyntaxKind::ShlEq;
        }
        if self.eat("..=") {
            return SyntaxKind::DotDotEq;
        }
        if self.eat("::") {
            return SyntaxKind::ColonColon;
        }
        if self.eat("..") {
            return SyntaxKind::DotDot;
        }
        if self.eat("->") {
            return SyntaxKind::Arrow;
        }
        if self.eat("=>") {
            return SyntaxKind::FatArrow;
        }
        if self.eat("==") {
            return SyntaxKind::EqEq;
        }
        if self.eat("!=") {
            return SyntaxKind::BangEq;
        }
        if self.eat("<=") {
            return SyntaxKind::LessEq;
        }
        if self.eat(">=") {
            return SyntaxKind::GreaterEq;
        }
        if self.eat("<<") {
            return SyntaxKind::Shl;
        }
        if self.eat("&&") {
            return SyntaxKind::AmpAmp;
        }
        if self.eat("||") {
            return SyntaxKind::PipePipe;
        }
        if self.eat("+=") {
            return SyntaxKind::PlusEq;
        }
        if self.eat("-=") {
            return SyntaxKind::MinusEq;
        }
        if self.eat("*=") {
            return SyntaxKind::StarEq;
        }
        if self.eat("/=") {
            return SyntaxKind::SlashEq;
        }
        if self.eat("%=") {
            return SyntaxKind::PercentEq;
        }
        if self.eat("&=") {
            return SyntaxKind::AmpEq;
        }
        if self.eat("|=") {
            return SyntaxKind::PipeEq;
        }
        if self.eat("^=") {
            return SyntaxKind::CaretEq;
        }

        let c = self.bump_char().expect("operator lexed at end of input");
        match c {
            '(' => SyntaxKind::LParen,
            ')' => SyntaxKind::RParen,
            '{' => SyntaxKind::LBrace,
            '}' => SyntaxKind::RBrace,
            '[' => SyntaxKind::LBracket,
            ']' => SyntaxKind::RBracket,
            ';' => SyntaxKind::Semicolon,
            ',' => SyntaxKind::Comma,
            ':' => SyntaxKind::Colon,
            '.' => SyntaxKind::Dot,
            '?' => SyntaxKind::Question,
            '#' => SyntaxKind::Pound,
            '+' => SyntaxKind::Plus,
            '-' => SyntaxKind::Minus,
            '*' => SyntaxKind::Star,
            '/' => SyntaxKind::Slash,
            '%' => SyntaxKind::Percent,
            '!' => SyntaxKind::Bang,
            '=' => SyntaxKind::Eq,
            '<' => SyntaxKind::Less,
            '>' => SyntaxKind::Greater,
            '&' => SyntaxKind::Amp,
            '|' => SyntaxKind::Pipe,
            '^' => SyntaxKind::Caret,
            _ => SyntaxKind::Error,
        }
    }
}
