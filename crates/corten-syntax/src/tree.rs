use text_size::{TextRange, TextSize};

use crate::lexer::Token;
use crate::syntax_kind::SyntaxKind;

/// Index of a node in the syntax tree's arena.
///
/// Nodes never move once the tree is built; an id stays valid for the
/// lifetime of the [`SyntaxTree`] that produced it and must not be used with
/// any other tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: SyntaxKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    range: TextRange,
    /// Window `[first, last)` into the tree's token list covering this
    /// node's significant tokens (interior trivia included positionally).
    first_token: u32,
    last_token: u32,
}

/// An immutable, arena-indexed syntax tree over one source snapshot.
///
/// Nodes are indices into a fixed table built once per parse; parent lookup
/// is plain index-chasing. Node spans cover significant tokens only, so
/// leading/trailing trivia never bleeds into an expression's range.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    text: String,
    tokens: Vec<Token>,
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self, node: NodeId) -> SyntaxKind {
        self.nodes[node.index()].kind
    }

    pub fn range(&self, node: NodeId) -> TextRange {
        self.nodes[node.index()].range
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    pub fn node_text(&self, node: NodeId) -> &str {
        &self.text[self.range(node)]
    }

    /// All tokens of the file, trivia included, in source order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens covered by `node`, trivia included.
    pub fn token_window(&self, node: NodeId) -> &[Token] {
        let data = &self.nodes[node.index()];
        &self.tokens[data.first_token as usize..data.last_token as usize]
    }

    /// Significant (non-trivia) tokens covered by `node`.
    pub fn significant_tokens(&self, node: NodeId) -> impl Iterator<Item = &Token> {
        self.token_window(node)
            .iter()
            .filter(|t| !t.kind.is_trivia())
    }

    pub fn token_text(&self, token: &Token) -> &str {
        &self.text[token.range]
    }

    /// Walks `node` and then its parents up to the root.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node), move |&n| self.parent(n))
    }

    /// Pre-order traversal of the subtree rooted at `node`.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![node],
        }
    }

    /// Deepest node whose range contains `offset`, with left bias: when the
    /// offset sits exactly between two siblings, the node ending at the
    /// offset wins (caret-after-token placement).
    pub fn node_at_offset(&self, offset: TextSize) -> Option<NodeId> {
        let root = self.root();
        if !covers(self.range(root), offset) {
            return None;
        }
        let mut node = root;
        'outer: loop {
            let children = self.children(node);
            // Prefer a child the offset is strictly inside; fall back to a
            // child ending exactly at the offset (left bias).
            for &child in children {
                let range = self.range(child);
                if range.start() < offset && offset < range.end() {
                    node = child;
                    continue 'outer;
                }
            }
            for &child in children.iter().rev() {
                let range = self.range(child);
                if !range.is_empty() && range.end() == offset {
                    node = child;
                    continue 'outer;
                }
            }
            for &child in children {
                let range = self.range(child);
                if !range.is_empty() && range.start() == offset {
                    node = child;
                    continue 'outer;
                }
            }
            return Some(node);
        }
    }

    /// Outermost expression node whose span equals `range` exactly.
    pub fn expression_with_range(&self, range: TextRange) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&n| self.kind(n).is_expression() && self.range(n) == range)
    }
}

fn covers(range: TextRange, offset: TextSize) -> bool {
    range.start() <= offset && offset <= range.end()
}

pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        let children = self.tree.children(node);
        self.stack.extend(children.iter().rev().copied());
        Some(node)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Checkpoint(usize);

#[derive(Debug)]
enum Event {
    Start(SyntaxKind),
    Finish,
    /// Index of a significant token in the tree's token list.
    Token(u32),
}

/// Event-based tree builder.
///
/// The parser drives the same `checkpoint` / `start_node_at` protocol used
/// for left-recursive grammar productions (binary and postfix expressions):
/// a checkpoint taken before the left operand lets the parser retroactively
/// wrap it once the operator shows up.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    events: Vec<Event>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.events.len())
    }

    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.events.push(Event::Start(kind));
    }

    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.events.insert(checkpoint.0, Event::Start(kind));
    }

    pub fn finish_node(&mut self) {
        self.events.push(Event::Finish);
    }

    pub fn token(&mut self, token_index: u32) {
        self.events.push(Event::Token(token_index));
    }

    /// Replays the recorded events into an immutable arena.
    pub fn finish(self, text: String, tokens: Vec<Token>) -> SyntaxTree {
        let mut nodes: Vec<NodeData> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        // Empty nodes get a zero-length range anchored after the last
        // significant token seen so far.
        let mut cursor = TextSize::from(0);

        for event in self.events {
            match event {
                Event::Start(kind) => {
                    let id = NodeId(nodes.len() as u32);
                    nodes.push(NodeData {
                        kind,
                        parent: stack.last().copied(),
                        children: Vec::new(),
                        range: TextRange::empty(cursor),
                        first_token: tokens.len() as u32,
                        last_token: tokens.len() as u32,
                    });
                    if let Some(&parent) = stack.last() {
                        nodes[parent.index()].children.push(id);
                    }
                    stack.push(id);
                }
                Event::Finish => {
                    let finished = stack.pop().expect("unbalanced finish_node");
                    if nodes[finished.index()].range.is_empty() {
                        nodes[finished.index()].range = TextRange::empty(cursor);
                    }
                }
                Event::Token(index) => {
                    let token = tokens[index as usize];
                    debug_assert!(!token.kind.is_trivia());
                    cursor = token.range.end();
                    for &open in &stack {
                        let data = &mut nodes[open.index()];
                        if data.first_token == data.last_token {
                            // First significant token under this node.
                            data.first_token = index;
                            data.range = token.range;
                        }
                        data.last_token = index + 1;
                        data.range = TextRange::new(data.range.start(), token.range.end());
                    }
                }
            }
        }

        debug_assert!(stack.is_empty(), "unbalanced start_node");
        SyntaxTree {
            text,
            tokens,
            nodes,
        }
    }
}
