use serde_repr::{Deserialize_repr, Serialize_repr};

/// Unified syntax kind for both tokens and AST nodes.
///
/// This enum is intentionally "fat": a stable, closed set of kinds is a
/// prerequisite for exhaustive matching in the refactoring engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_repr, Deserialize_repr,
)]
#[repr(u16)]
pub enum SyntaxKind {
    // --- Trivia ---
    Whitespace,
    LineComment,
    BlockComment,

    // --- Identifiers & literals ---
    Identifier,
    Lifetime,
    IntLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,

    // --- Keywords ---
    AsKw,
    BreakKw,
    ConstKw,
    ContinueKw,
    ElseKw,
    EnumKw,
    FnKw,
    ForKw,
    IfKw,
    ImplKw,
    InKw,
    LetKw,
    LoopKw,
    MatchKw,
    ModKw,
    MoveKw,
    MutKw,
    PubKw,
    RefKw,
    ReturnKw,
    StaticKw,
    StructKw,
    UseKw,
    WhileKw,

    // Literal keywords.
    TrueKw,
    FalseKw,

    // --- Operators / punctuation ---
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    ColonColon,
    Dot,
    DotDot,
    DotDotEq,
    Arrow,
    FatArrow,
    Question,
    Pound,
    Underscore,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    Eq,
    EqEq,
    BangEq,

    Less,
    LessEq,
    Greater,
    GreaterEq,

    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Shl,
    ShlEq,

    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,

    // --- Special ---
    Error,
    Eof,

    // --- Nodes ---
    SourceFile,
    Function,
    ParamList,
    Param,
    RetType,
    Block,

    LetStmt,
    ExprStmt,
    EmptyStmt,

    Path,
    PathSegment,
    Type,
    GenericArgs,
    ArgList,

    MatchArmList,
    MatchArm,
    MatchGuard,

    // Patterns
    WildcardPat,
    LiteralPat,
    IdentPat,
    PathPat,
    TupleStructPat,

    // Expressions
    LiteralExpr,
    PathExpr,
    ParenExpr,
    CallExpr,
    MethodCallExpr,
    FieldExpr,
    IndexExpr,
    RefExpr,
    UnaryExpr,
    BinaryExpr,
    TryExpr,
    MatchExpr,
    IfExpr,
    WhileExpr,
    LoopExpr,
    ForExpr,
    ReturnExpr,
    BreakExpr,
    ContinueExpr,
    ClosureExpr,
    BlockExpr,

    __Last,
}

impl SyntaxKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::Whitespace | SyntaxKind::LineComment | SyntaxKind::BlockComment
        )
    }

    /// Nodes the refactoring engine treats as extractable expressions.
    ///
    /// `Block` is deliberately absent: blocks are scope boundaries, not
    /// extraction targets.
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            SyntaxKind::LiteralExpr
                | SyntaxKind::PathExpr
                | SyntaxKind::ParenExpr
                | SyntaxKind::CallExpr
                | SyntaxKind::MethodCallExpr
                | SyntaxKind::FieldExpr
                | SyntaxKind::IndexExpr
                | SyntaxKind::RefExpr
                | SyntaxKind::UnaryExpr
                | SyntaxKind::BinaryExpr
                | SyntaxKind::TryExpr
                | SyntaxKind::MatchExpr
                | SyntaxKind::IfExpr
                | SyntaxKind::WhileExpr
                | SyntaxKind::LoopExpr
                | SyntaxKind::ForExpr
                | SyntaxKind::ReturnExpr
                | SyntaxKind::BreakExpr
                | SyntaxKind::ContinueExpr
                | SyntaxKind::ClosureExpr
                | SyntaxKind::BlockExpr
        )
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            SyntaxKind::LetStmt | SyntaxKind::ExprStmt | SyntaxKind::EmptyStmt
        )
    }

    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            SyntaxKind::WildcardPat
                | SyntaxKind::LiteralPat
                | SyntaxKind::IdentPat
                | SyntaxKind::PathPat
                | SyntaxKind::TupleStructPat
        )
    }

    pub fn from_keyword(text: &str) -> Option<SyntaxKind> {
        Some(match text {
            "as" => SyntaxKind::AsKw,
            "break" => SyntaxKind::BreakKw,
            "const" => SyntaxKind::ConstKw,
            "continue" => SyntaxKind::ContinueKw,
            "else" => SyntaxKind::ElseKw,
            "enum" => SyntaxKind::EnumKw,
            "fn" => SyntaxKind::FnKw,
            "for" => SyntaxKind::ForKw,
            "if" => SyntaxKind::IfKw,
            "impl" => SyntaxKind::ImplKw,
            "in" => SyntaxKind::InKw,
            "let" => SyntaxKind::LetKw,
            "loop" => SyntaxKind::LoopKw,
            "match" => SyntaxKind::MatchKw,
            "mod" => SyntaxKind::ModKw,
            "move" => SyntaxKind::MoveKw,
            "mut" => SyntaxKind::MutKw,
            "pub" => SyntaxKind::PubKw,
            "ref" => SyntaxKind::RefKw,
            "return" => SyntaxKind::ReturnKw,
            "static" => SyntaxKind::StaticKw,
            "struct" => SyntaxKind::StructKw,
            "use" => SyntaxKind::UseKw,
            "while" => SyntaxKind::WhileKw,

            "true" => SyntaxKind::TrueKw,
            "false" => SyntaxKind::FalseKw,

            _ => return None,
        })
    }
}
