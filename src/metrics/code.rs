//! Node-kind counts, volumes and cyclomatic complexity of Python code.

use crate::analyzers::python::{
    self, classify_expression, classify_statement, syntax::AuxKind, syntax::ExprKind,
    syntax::Operator, syntax::StmtKind, AstKind, NodeKind, SubTree,
};
use crate::core::text;
use crate::errors::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::ops::{Index, IndexMut};

/// One value per [`AstKind`], serialized as a map keyed by metric label
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KindTable<T>([T; AstKind::COUNT]);

impl<T: Copy + Default> Default for KindTable<T> {
    fn default() -> Self {
        Self([T::default(); AstKind::COUNT])
    }
}

impl<T> Index<AstKind> for KindTable<T> {
    type Output = T;

    fn index(&self, kind: AstKind) -> &T {
        &self.0[kind.index()]
    }
}

impl<T> IndexMut<AstKind> for KindTable<T> {
    fn index_mut(&mut self, kind: AstKind) -> &mut T {
        &mut self.0[kind.index()]
    }
}

impl<T: Copy> KindTable<T> {
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> KindTable<U> {
        KindTable(self.0.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (AstKind, T)> + '_ {
        AstKind::all().map(|kind| (kind, self[kind]))
    }
}

impl<T: Serialize + Copy> Serialize for KindTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(AstKind::COUNT))?;
        for (kind, value) in self.iter() {
            map.serialize_entry(kind.metric_label(), &value)?;
        }
        map.end()
    }
}

/// Countable nodes in total and per kind
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeCounts {
    pub all: usize,
    pub kinds: KindTable<usize>,
}

impl Serialize for NodeCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(AstKind::COUNT + 1))?;
        map.serialize_entry("all", &self.all)?;
        for (kind, count) in self.kinds.iter() {
            map.serialize_entry(kind.metric_label(), &count)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CodeMetrics {
    /// Characters of source text
    pub len: usize,
    pub lines: usize,
    pub cyc_comp: usize,
    pub nodes: NodeCounts,
    /// Each kind's share of `nodes.all`
    pub volumes: KindTable<f64>,
}

/// Compute the metrics of `code`.
///
/// `tree` is the already parsed form of `code` (or of the node `code` was cut
/// from); without it the code is parsed here, which fails on invalid syntax.
pub fn calculate_code_metrics(code: &str, tree: Option<SubTree<'_>>) -> Result<CodeMetrics> {
    let parsed;
    let tree = match tree {
        Some(tree) => tree,
        None => {
            parsed = python::parse(code)?;
            parsed.as_subtree()
        }
    };

    let nodes = count_nodes(tree);
    let volumes = nodes
        .kinds
        .map(|count| text::ratio(count, nodes.all));

    Ok(CodeMetrics {
        len: text::char_len(code),
        lines: text::line_count(code),
        cyc_comp: cyclomatic_complexity(tree),
        nodes,
        volumes,
    })
}

/// Every statement except a bare expression statement, and every expression,
/// counts towards `all`. A bare expression statement still counts towards its
/// DOCSTR or VOIDEXPR kind.
fn count_nodes(tree: SubTree<'_>) -> NodeCounts {
    let mut counts = NodeCounts::default();
    for id in tree.walk() {
        if let Some(kind) = classify_statement(tree.tree, id) {
            counts.kinds[kind] += 1;
        }
        if let Some(kind) = classify_expression(tree.tree, id) {
            counts.kinds[kind] += 1;
        }
        if is_countable(tree.tree.kind(id)) {
            counts.all += 1;
        }
    }
    counts
}

fn is_countable(kind: NodeKind) -> bool {
    match kind {
        NodeKind::Stmt(StmtKind::Expr) => false,
        NodeKind::Stmt(_) | NodeKind::Expr(_) => true,
        NodeKind::Module | NodeKind::Op(_) | NodeKind::Aux(_) => false,
    }
}

fn is_branch(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Stmt(StmtKind::For { .. } | StmtKind::While | StmtKind::If)
            | NodeKind::Aux(AuxKind::MatchCase)
            | NodeKind::Expr(ExprKind::IfExp)
            | NodeKind::Op(Operator::And | Operator::Or)
    )
}

fn cyclomatic_complexity(tree: SubTree<'_>) -> usize {
    1 + tree
        .walk()
        .filter(|id| is_branch(tree.tree.kind(*id)))
        .count()
}
