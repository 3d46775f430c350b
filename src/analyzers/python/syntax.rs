//! Arena-backed Python syntax tree.
//!
//! The concrete tree-sitter tree is lowered into this shape (see `lower.rs`)
//! so that node categories follow Python's abstract grammar: statements,
//! expressions, operators and the auxiliary clause nodes that sit between
//! them. Nodes are addressed by [`NodeId`] into a flat `Vec`, parents own
//! their children's ids in source order.

use crate::core::LineSpan;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StmtKind {
    FunctionDef { is_async: bool },
    ClassDef,
    For { is_async: bool },
    While,
    If,
    Match,
    Assert,
    With { is_async: bool },
    Try,
    Assign,
    AugAssign,
    AnnAssign,
    Delete,
    Return,
    Raise,
    Break,
    Continue,
    Import,
    ImportFrom,
    /// Bare expression used as a statement
    Expr,
    Pass,
    Global,
    Nonlocal,
    TypeAlias,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Str,
    Bytes,
    Int,
    Float,
    Bool,
    None,
    Ellipsis,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    BoolOp,
    BinOp,
    UnaryOp,
    Compare,
    Call,
    Constant(Constant),
    JoinedStr,
    FormattedValue,
    Name,
    Attribute,
    Subscript,
    Slice,
    Starred,
    IfExp,
    Lambda,
    NamedExpr,
    Await,
    Yield,
    YieldFrom,
    List,
    Tuple,
    Set,
    Dict,
    ListComp,
    SetComp,
    DictComp,
    GeneratorExp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    Mod,
    Pow,
    FloorDiv,
    BitOr,
    BitXor,
    BitAnd,
    LShift,
    RShift,
    UAdd,
    USub,
    Invert,
    Not,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl Operator {
    /// Binary and augmented-assignment operators, keyed by their token
    pub fn binary(token: &str) -> Option<Self> {
        let op = match token.trim_end_matches('=') {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mult,
            "@" => Self::MatMult,
            "/" => Self::Div,
            "%" => Self::Mod,
            "**" => Self::Pow,
            "//" => Self::FloorDiv,
            "|" => Self::BitOr,
            "^" => Self::BitXor,
            "&" => Self::BitAnd,
            "<<" => Self::LShift,
            ">>" => Self::RShift,
            _ => return None,
        };
        Some(op)
    }

    pub fn unary(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Self::UAdd),
            "-" => Some(Self::USub),
            "~" => Some(Self::Invert),
            "not" => Some(Self::Not),
            _ => None,
        }
    }

    pub fn boolean(token: &str) -> Option<Self> {
        match token {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn comparison(token: &str) -> Option<Self> {
        let op = match token {
            "==" => Self::Eq,
            "!=" | "<>" => Self::NotEq,
            "<" => Self::Lt,
            "<=" => Self::LtE,
            ">" => Self::Gt,
            ">=" => Self::GtE,
            "is" => Self::Is,
            "is not" => Self::IsNot,
            "in" => Self::In,
            "not in" => Self::NotIn,
            _ => return None,
        };
        Some(op)
    }
}

/// Clause nodes that are neither statements nor expressions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuxKind {
    Arguments,
    Arg,
    Keyword,
    Alias,
    Comprehension,
    ExceptHandler,
    WithItem,
    MatchCase,
    Pattern,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    Stmt(StmtKind),
    Expr(ExprKind),
    Op(Operator),
    Aux(AuxKind),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    /// Lines of the `@decorator` entries attached to a function or class
    pub decorator_lines: Vec<usize>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn span(&self) -> LineSpan {
        LineSpan::new(self.start_line, self.end_line)
    }

    pub fn line_count(&self) -> usize {
        self.span().len()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_statement(&self) -> bool {
        matches!(self.kind, NodeKind::Stmt(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self.kind, NodeKind::Expr(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, NodeKind::Stmt(StmtKind::FunctionDef { .. }))
    }

    pub fn is_definition(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Stmt(StmtKind::FunctionDef { .. } | StmtKind::ClassDef)
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl SyntaxTree {
    /// Tree of an empty module
    pub fn empty() -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.push(NodeKind::Module, LineSpan::single(1), 0..0);
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// True when the module holds no statements at all
    pub fn is_empty_module(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    /// View of the subtree rooted at `root`
    pub fn subtree(&self, root: NodeId) -> SubTree<'_> {
        SubTree { tree: self, root }
    }

    pub fn as_subtree(&self) -> SubTree<'_> {
        self.subtree(self.root())
    }

    /// Move the start line of every decorated function or class to its
    /// first decorator, so a definition is located where its text begins.
    pub fn adjust_decorator_lines(&mut self) {
        for node in self.nodes.iter_mut().filter(|n| n.is_definition()) {
            if let Some(first) = node.decorator_lines.iter().min() {
                node.start_line = *first;
            }
        }
    }

    pub(crate) fn push(
        &mut self,
        kind: NodeKind,
        span: LineSpan,
        bytes: std::ops::Range<usize>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            start_line: span.start,
            end_line: span.end.max(span.start),
            start_byte: bytes.start,
            end_byte: bytes.end.max(bytes.start),
            decorator_lines: Vec::new(),
            children: Vec::new(),
        });
        id
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Re-root a module node's span once its contents are known
    pub(crate) fn set_span(&mut self, id: NodeId, span: LineSpan) {
        let node = &mut self.nodes[id.0];
        node.start_line = span.start;
        node.end_line = span.end.max(span.start);
    }
}

/// Borrowed view of one node and everything below it
#[derive(Clone, Copy, Debug)]
pub struct SubTree<'t> {
    pub tree: &'t SyntaxTree,
    pub root: NodeId,
}

impl<'t> SubTree<'t> {
    pub fn node(&self) -> &'t Node {
        self.tree.node(self.root)
    }

    /// Breadth-first iteration starting with the root itself
    pub fn walk(&self) -> Walk<'t> {
        Walk {
            tree: self.tree,
            queue: VecDeque::from([self.root]),
        }
    }
}

pub struct Walk<'t> {
    tree: &'t SyntaxTree,
    queue: VecDeque<NodeId>,
}

impl Iterator for Walk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        self.queue.extend(self.tree.children(id).iter().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyntaxTree {
        let mut tree = SyntaxTree::empty();
        let root = tree.root();
        let func = tree.push(
            NodeKind::Stmt(StmtKind::FunctionDef { is_async: false }),
            LineSpan::new(3, 4),
            0..10,
        );
        tree.node_mut(func).decorator_lines = vec![2, 1];
        let ret = tree.push(
            NodeKind::Stmt(StmtKind::Return),
            LineSpan::single(4),
            5..10,
        );
        let pass = tree.push(NodeKind::Stmt(StmtKind::Pass), LineSpan::single(5), 11..15);
        tree.attach(root, func);
        tree.attach(func, ret);
        tree.attach(root, pass);
        tree
    }

    #[test]
    fn test_walk_is_breadth_first() {
        let tree = sample();
        let order: Vec<usize> = tree.as_subtree().walk().map(NodeId::index).collect();
        assert_eq!(order, vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_adjust_decorator_lines_uses_first_decorator() {
        let mut tree = sample();
        let func = tree.children(tree.root())[0];
        assert_eq!(tree.node(func).start_line, 3);
        tree.adjust_decorator_lines();
        assert_eq!(tree.node(func).start_line, 1);
        assert_eq!(tree.node(func).end_line, 4);
    }

    #[test]
    fn test_operator_tokens() {
        assert_eq!(Operator::binary("+="), Some(Operator::Add));
        assert_eq!(Operator::binary("//"), Some(Operator::FloorDiv));
        assert_eq!(Operator::binary("**="), Some(Operator::Pow));
        assert_eq!(Operator::binary("and"), None);
        assert_eq!(Operator::comparison("not in"), Some(Operator::NotIn));
        assert_eq!(Operator::unary("~"), Some(Operator::Invert));
        assert_eq!(Operator::boolean("or"), Some(Operator::Or));
    }
}
