//! Semantic kinds of Python syntax nodes.
//!
//! Classification walks an ordered table of `(predicate, kind)` pairs and the
//! first matching predicate wins. The predicates target disjoint node
//! categories, except DOCSTR and VOIDEXPR where the order decides.

use super::syntax::{Constant, ExprKind, NodeId, NodeKind, Operator, StmtKind, SyntaxTree};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AstKind {
    Function,
    Class,
    Loop,
    Condition,
    Resource,
    Assign,
    Break,
    Import,
    Docstr,
    Voidexpr,
    Arith,
    Logic,
    Comp,
    Call,
    Literal,
}

impl AstKind {
    pub const STATEMENTS: [AstKind; 10] = [
        AstKind::Function,
        AstKind::Class,
        AstKind::Loop,
        AstKind::Condition,
        AstKind::Resource,
        AstKind::Assign,
        AstKind::Break,
        AstKind::Import,
        AstKind::Docstr,
        AstKind::Voidexpr,
    ];

    pub const EXPRESSIONS: [AstKind; 5] = [
        AstKind::Arith,
        AstKind::Logic,
        AstKind::Comp,
        AstKind::Call,
        AstKind::Literal,
    ];

    pub const COUNT: usize = 15;

    /// Statement kinds followed by expression kinds
    pub fn all() -> impl Iterator<Item = AstKind> {
        Self::STATEMENTS.into_iter().chain(Self::EXPRESSIONS)
    }

    pub fn name(self) -> &'static str {
        match self {
            AstKind::Function => "FUNCTION",
            AstKind::Class => "CLASS",
            AstKind::Loop => "LOOP",
            AstKind::Condition => "CONDITION",
            AstKind::Resource => "RESOURCE",
            AstKind::Assign => "ASSIGN",
            AstKind::Break => "BREAK",
            AstKind::Import => "IMPORT",
            AstKind::Docstr => "DOCSTR",
            AstKind::Voidexpr => "VOIDEXPR",
            AstKind::Arith => "ARITH",
            AstKind::Logic => "LOGIC",
            AstKind::Comp => "COMP",
            AstKind::Call => "CALL",
            AstKind::Literal => "LITERAL",
        }
    }

    /// Key used for this kind in metric records
    pub fn metric_label(self) -> &'static str {
        match self {
            AstKind::Function => "functions",
            AstKind::Class => "classes",
            AstKind::Loop => "loops",
            AstKind::Condition => "conditions",
            AstKind::Resource => "resources",
            AstKind::Assign => "assigns",
            AstKind::Break => "breaks",
            AstKind::Import => "imports",
            AstKind::Docstr => "docstrs",
            AstKind::Voidexpr => "voidexprs",
            AstKind::Arith => "ariths",
            AstKind::Logic => "logics",
            AstKind::Comp => "comps",
            AstKind::Call => "calls",
            AstKind::Literal => "literals",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

type Predicate = fn(&SyntaxTree, NodeId) -> bool;

static STATEMENT_KINDS: &[(Predicate, AstKind)] = &[
    (is_function, AstKind::Function),
    (is_class, AstKind::Class),
    (is_loop, AstKind::Loop),
    (is_condition, AstKind::Condition),
    (is_resource, AstKind::Resource),
    (is_assign, AstKind::Assign),
    (is_break, AstKind::Break),
    (is_import, AstKind::Import),
    (is_docstr, AstKind::Docstr),
    (is_voidexpr, AstKind::Voidexpr),
];

static EXPRESSION_KINDS: &[(Predicate, AstKind)] = &[
    (is_arith, AstKind::Arith),
    (is_logic, AstKind::Logic),
    (is_comp, AstKind::Comp),
    (is_call, AstKind::Call),
    (is_literal, AstKind::Literal),
];

pub fn classify_statement(tree: &SyntaxTree, id: NodeId) -> Option<AstKind> {
    classify(STATEMENT_KINDS, tree, id)
}

pub fn classify_expression(tree: &SyntaxTree, id: NodeId) -> Option<AstKind> {
    classify(EXPRESSION_KINDS, tree, id)
}

fn classify(table: &[(Predicate, AstKind)], tree: &SyntaxTree, id: NodeId) -> Option<AstKind> {
    table
        .iter()
        .find(|(predicate, _)| predicate(tree, id))
        .map(|(_, kind)| *kind)
}

fn stmt(tree: &SyntaxTree, id: NodeId) -> Option<StmtKind> {
    match tree.kind(id) {
        NodeKind::Stmt(kind) => Some(kind),
        _ => None,
    }
}

fn op(tree: &SyntaxTree, id: NodeId) -> Option<Operator> {
    match tree.kind(id) {
        NodeKind::Op(op) => Some(op),
        _ => None,
    }
}

pub fn is_function(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(stmt(tree, id), Some(StmtKind::FunctionDef { .. }))
}

fn is_class(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(stmt(tree, id), Some(StmtKind::ClassDef))
}

fn is_loop(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        stmt(tree, id),
        Some(StmtKind::For { .. } | StmtKind::While)
    )
}

fn is_condition(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        stmt(tree, id),
        Some(StmtKind::If | StmtKind::Match | StmtKind::Assert)
    )
}

fn is_resource(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        stmt(tree, id),
        Some(StmtKind::With { .. } | StmtKind::Try)
    )
}

fn is_assign(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        stmt(tree, id),
        Some(StmtKind::Assign | StmtKind::AugAssign | StmtKind::AnnAssign | StmtKind::Delete)
    )
}

fn is_break(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        stmt(tree, id),
        Some(StmtKind::Return | StmtKind::Raise | StmtKind::Break | StmtKind::Continue)
    )
}

fn is_import(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        stmt(tree, id),
        Some(StmtKind::Import | StmtKind::ImportFrom)
    )
}

fn is_docstr(tree: &SyntaxTree, id: NodeId) -> bool {
    stmt(tree, id) == Some(StmtKind::Expr)
        && tree.children(id).first().is_some_and(|value| {
            tree.kind(*value) == NodeKind::Expr(ExprKind::Constant(Constant::Str))
        })
}

fn is_voidexpr(tree: &SyntaxTree, id: NodeId) -> bool {
    stmt(tree, id) == Some(StmtKind::Expr) && !is_docstr(tree, id)
}

fn is_arith(tree: &SyntaxTree, id: NodeId) -> bool {
    use Operator::*;
    matches!(
        op(tree, id),
        Some(Add | Sub | Mult | MatMult | Div | Mod | Pow | FloorDiv | UAdd | USub)
    )
}

fn is_logic(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        op(tree, id),
        Some(Operator::And | Operator::Or | Operator::Not)
    )
}

fn is_comp(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        op(tree, id),
        Some(
            Operator::Eq
                | Operator::NotEq
                | Operator::Lt
                | Operator::LtE
                | Operator::Gt
                | Operator::GtE
                | Operator::Is
                | Operator::IsNot
        )
    )
}

fn is_call(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.kind(id) == NodeKind::Expr(ExprKind::Call)
}

fn is_literal(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(tree.kind(id), NodeKind::Expr(ExprKind::Constant(_)))
}
