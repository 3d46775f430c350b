//! Lowering of the tree-sitter concrete tree into [`SyntaxTree`].
//!
//! Node boundaries follow Python's `ast` module: an `elif` is an `If` nested
//! in the previous branch, chained `and`/`or` collapse into one `BoolOp`,
//! every comparison operator is its own node, `a = b = 1` is a single
//! `Assign`, and wrapper nodes such as parentheses disappear. Comments are
//! never lowered and never extend a node's end line.

use super::syntax::{
    AuxKind, Constant, ExprKind, NodeId, NodeKind, Operator, StmtKind, SyntaxTree,
};
use crate::core::{text, LineSpan};
use crate::errors::{Error, Result};
use std::ops::Range;
use tree_sitter::{Node as TsNode, Point};

pub(super) struct Lowering<'s> {
    source: &'s str,
    tree: SyntaxTree,
    /// First construct that tree-sitter accepts but CPython rejects
    rejected: Option<(usize, &'static str)>,
}

impl<'s> Lowering<'s> {
    pub(super) fn new(source: &'s str) -> Self {
        Self {
            source,
            tree: SyntaxTree::empty(),
            rejected: None,
        }
    }

    pub(super) fn lower_module(mut self, module: TsNode) -> Result<SyntaxTree> {
        let root = self.tree.root();
        self.tree
            .set_span(root, LineSpan::new(1, text::line_count(self.source).max(1)));
        self.tree.node_mut(root).end_byte = self.source.len();

        for child in named_children(module) {
            self.lower_statement(child, root);
        }

        match self.rejected {
            Some((line, message)) => Err(Error::parse(line, message)),
            None => Ok(self.tree),
        }
    }

    fn reject(&mut self, node: TsNode, message: &'static str) {
        if self.rejected.is_none() {
            self.rejected = Some((node.start_position().row + 1, message));
        }
    }

    // ---- node creation ----

    fn push(&mut self, kind: NodeKind, ts: TsNode, parent: NodeId) -> NodeId {
        let (span, bytes) = extent(ts);
        self.push_extent(kind, span, bytes, parent)
    }

    fn push_extent(
        &mut self,
        kind: NodeKind,
        span: LineSpan,
        bytes: Range<usize>,
        parent: NodeId,
    ) -> NodeId {
        let id = self.tree.push(kind, span, bytes);
        self.tree.attach(parent, id);
        id
    }

    /// Node covering `first` through `last`
    fn push_between(
        &mut self,
        kind: NodeKind,
        first: TsNode,
        last: TsNode,
        parent: NodeId,
    ) -> NodeId {
        let (start, start_bytes) = extent(first);
        let (end, end_bytes) = extent(last);
        self.push_extent(
            kind,
            LineSpan::new(start.start, end.end),
            start_bytes.start..end_bytes.end,
            parent,
        )
    }

    fn statement(&mut self, ts: TsNode, kind: StmtKind, parent: NodeId) -> NodeId {
        self.push(NodeKind::Stmt(kind), ts, parent)
    }

    fn expression(&mut self, ts: TsNode, kind: ExprKind, parent: NodeId) -> NodeId {
        self.push(NodeKind::Expr(kind), ts, parent)
    }

    fn aux(&mut self, ts: TsNode, kind: AuxKind, parent: NodeId) -> NodeId {
        self.push(NodeKind::Aux(kind), ts, parent)
    }

    fn operator(&mut self, token: Option<TsNode>, op: Option<Operator>, parent: NodeId) {
        if let (Some(token), Some(op)) = (token, op) {
            self.push(NodeKind::Op(op), token, parent);
        }
    }

    fn token_text(&self, ts: TsNode) -> &'s str {
        self.source.get(ts.byte_range()).unwrap_or("")
    }

    // ---- statements ----

    fn lower_statement(&mut self, ts: TsNode, parent: NodeId) {
        match ts.kind() {
            "function_definition" => self.lower_function(ts, &[], parent),
            "class_definition" => self.lower_class(ts, &[], parent),
            "decorated_definition" => self.lower_decorated(ts, parent),
            "if_statement" => self.lower_if(ts, parent),
            "for_statement" => self.lower_for(ts, parent),
            "while_statement" => self.lower_while(ts, parent),
            "try_statement" => self.lower_try(ts, parent),
            "with_statement" => self.lower_with(ts, parent),
            "match_statement" => self.lower_match(ts, parent),
            "expression_statement" => self.lower_expression_statement(ts, parent),
            "return_statement" => self.lower_simple(ts, StmtKind::Return, parent),
            "raise_statement" => self.lower_simple(ts, StmtKind::Raise, parent),
            "assert_statement" => self.lower_simple(ts, StmtKind::Assert, parent),
            "type_alias_statement" => self.lower_simple(ts, StmtKind::TypeAlias, parent),
            "delete_statement" => self.lower_delete(ts, parent),
            "import_statement" => self.lower_import(ts, StmtKind::Import, parent),
            "import_from_statement" | "future_import_statement" => {
                self.lower_import(ts, StmtKind::ImportFrom, parent)
            }
            "pass_statement" => {
                self.statement(ts, StmtKind::Pass, parent);
            }
            "break_statement" => {
                self.statement(ts, StmtKind::Break, parent);
            }
            "continue_statement" => {
                self.statement(ts, StmtKind::Continue, parent);
            }
            "global_statement" => {
                self.statement(ts, StmtKind::Global, parent);
            }
            "nonlocal_statement" => {
                self.statement(ts, StmtKind::Nonlocal, parent);
            }
            "print_statement" | "exec_statement" => {
                self.reject(ts, "Python 2 statement");
            }
            _ => {
                for child in named_children(ts) {
                    self.lower_statement(child, parent);
                }
            }
        }
    }

    /// Lower the statements of an indented or inline block.
    fn lower_block(&mut self, owner: TsNode, block: Option<TsNode>, parent: NodeId) {
        let Some(block) = block else {
            self.reject(owner, "expected an indented block");
            return;
        };
        let statements = named_children(block);
        if statements.is_empty() {
            self.reject(block, "expected an indented block");
        }
        for statement in statements {
            self.lower_statement(statement, parent);
        }
    }

    fn lower_simple(&mut self, ts: TsNode, kind: StmtKind, parent: NodeId) {
        let id = self.statement(ts, kind, parent);
        for child in named_children(ts) {
            self.lower_expr(child, id);
        }
    }

    fn lower_decorated(&mut self, ts: TsNode, parent: NodeId) {
        let children = named_children(ts);
        let decorators: Vec<TsNode> = children
            .iter()
            .copied()
            .filter(|c| c.kind() == "decorator")
            .collect();
        let definition = ts
            .child_by_field_name("definition")
            .or_else(|| children.iter().copied().find(|c| c.kind() != "decorator"));

        match definition {
            Some(def) if def.kind() == "class_definition" => {
                self.lower_class(def, &decorators, parent)
            }
            Some(def) => self.lower_function(def, &decorators, parent),
            None => self.reject(ts, "decorator without definition"),
        }
    }

    fn lower_function(&mut self, ts: TsNode, decorators: &[TsNode], parent: NodeId) {
        let is_async = has_token(ts, "async");
        let id = self.statement(ts, StmtKind::FunctionDef { is_async }, parent);

        match ts.child_by_field_name("parameters") {
            Some(params) => self.lower_parameters(params, id),
            None => {
                self.aux(ts, AuxKind::Arguments, id);
            }
        }
        self.lower_block(ts, ts.child_by_field_name("body"), id);
        self.lower_decorators(decorators, id);
        if let Some(returns) = ts.child_by_field_name("return_type") {
            self.lower_expr(returns, id);
        }
    }

    fn lower_class(&mut self, ts: TsNode, decorators: &[TsNode], parent: NodeId) {
        let id = self.statement(ts, StmtKind::ClassDef, parent);
        if let Some(bases) = ts.child_by_field_name("superclasses") {
            self.lower_arguments(bases, id);
        }
        self.lower_block(ts, ts.child_by_field_name("body"), id);
        self.lower_decorators(decorators, id);
    }

    fn lower_decorators(&mut self, decorators: &[TsNode], id: NodeId) {
        for decorator in decorators {
            self.tree
                .node_mut(id)
                .decorator_lines
                .push(decorator.start_position().row + 1);
            for expr in named_children(*decorator) {
                self.lower_expr(expr, id);
            }
        }
    }

    fn lower_parameters(&mut self, params: TsNode, parent: NodeId) {
        let arguments = self.aux(params, AuxKind::Arguments, parent);
        for param in named_children(params) {
            match param.kind() {
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern"
                | "tuple_pattern" => {
                    self.aux(param, AuxKind::Arg, arguments);
                }
                "typed_parameter" => {
                    let arg = self.aux(param, AuxKind::Arg, arguments);
                    if let Some(annotation) = param.child_by_field_name("type") {
                        self.lower_expr(annotation, arg);
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    let arg = self.aux(param, AuxKind::Arg, arguments);
                    if let Some(annotation) = param.child_by_field_name("type") {
                        self.lower_expr(annotation, arg);
                    }
                    if let Some(default) = param.child_by_field_name("value") {
                        self.lower_expr(default, arguments);
                    }
                }
                _ => {}
            }
        }
    }

    fn lower_if(&mut self, ts: TsNode, parent: NodeId) {
        let (if_span, if_bytes) = extent(ts);
        let id = self.statement(ts, StmtKind::If, parent);
        if let Some(test) = ts.child_by_field_name("condition") {
            self.lower_expr(test, id);
        }
        self.lower_block(ts, ts.child_by_field_name("consequence"), id);

        // Each elif opens an If inside the orelse of the previous branch and
        // runs to the end of the whole statement.
        let mut branch = id;
        for alternative in field_children(ts, "alternative") {
            match alternative.kind() {
                "elif_clause" => {
                    let (span, bytes) = extent(alternative);
                    let elif = self.push_extent(
                        NodeKind::Stmt(StmtKind::If),
                        LineSpan::new(span.start, if_span.end),
                        bytes.start..if_bytes.end,
                        branch,
                    );
                    if let Some(test) = alternative.child_by_field_name("condition") {
                        self.lower_expr(test, elif);
                    }
                    self.lower_block(
                        alternative,
                        alternative.child_by_field_name("consequence"),
                        elif,
                    );
                    branch = elif;
                }
                _ => self.lower_block(alternative, block_of(alternative), branch),
            }
        }
    }

    fn lower_for(&mut self, ts: TsNode, parent: NodeId) {
        let is_async = has_token(ts, "async");
        let id = self.statement(ts, StmtKind::For { is_async }, parent);
        if let Some(target) = ts.child_by_field_name("left") {
            self.lower_expr(target, id);
        }
        for iter in field_children(ts, "right") {
            self.lower_expr(iter, id);
        }
        self.lower_block(ts, ts.child_by_field_name("body"), id);
        if let Some(orelse) = ts.child_by_field_name("alternative") {
            self.lower_block(orelse, block_of(orelse), id);
        }
    }

    fn lower_while(&mut self, ts: TsNode, parent: NodeId) {
        let id = self.statement(ts, StmtKind::While, parent);
        if let Some(test) = ts.child_by_field_name("condition") {
            self.lower_expr(test, id);
        }
        self.lower_block(ts, ts.child_by_field_name("body"), id);
        if let Some(orelse) = ts.child_by_field_name("alternative") {
            self.lower_block(orelse, block_of(orelse), id);
        }
    }

    fn lower_try(&mut self, ts: TsNode, parent: NodeId) {
        let id = self.statement(ts, StmtKind::Try, parent);
        self.lower_block(ts, ts.child_by_field_name("body"), id);
        for clause in named_children(ts) {
            match clause.kind() {
                "except_clause" | "except_group_clause" => self.lower_handler(clause, id),
                "else_clause" | "finally_clause" => {
                    self.lower_block(clause, block_of(clause), id)
                }
                _ => {}
            }
        }
    }

    fn lower_handler(&mut self, clause: TsNode, parent: NodeId) {
        let handler = self.aux(clause, AuxKind::ExceptHandler, parent);
        let mut after_as = false;
        let mut block = None;
        for child in all_children(clause) {
            if !child.is_named() {
                after_as |= child.kind() == "as";
                continue;
            }
            match child.kind() {
                "block" => block = Some(child),
                // `except E as e`: only the exception type is an expression
                "as_pattern" => {
                    if let Some(exc) = named_children(child).first() {
                        self.lower_expr(*exc, handler);
                    }
                }
                _ if !after_as => self.lower_expr(child, handler),
                _ => {}
            }
        }
        self.lower_block(clause, block, handler);
    }

    fn lower_with(&mut self, ts: TsNode, parent: NodeId) {
        let is_async = has_token(ts, "async");
        let id = self.statement(ts, StmtKind::With { is_async }, parent);
        for clause in named_children(ts) {
            if clause.kind() != "with_clause" {
                continue;
            }
            for item in named_children(clause) {
                if item.kind() == "with_item" {
                    self.lower_with_item(item, id);
                }
            }
        }
        self.lower_block(ts, ts.child_by_field_name("body"), id);
    }

    fn lower_with_item(&mut self, item: TsNode, parent: NodeId) {
        let with_item = self.aux(item, AuxKind::WithItem, parent);
        let Some(value) = item.child_by_field_name("value") else {
            return;
        };
        if value.kind() != "as_pattern" {
            self.lower_expr(value, with_item);
            return;
        }
        for part in named_children(value) {
            if part.kind() == "as_pattern_target" {
                for target in named_children(part) {
                    self.lower_expr(target, with_item);
                }
            } else {
                self.lower_expr(part, with_item);
            }
        }
    }

    fn lower_match(&mut self, ts: TsNode, parent: NodeId) {
        let id = self.statement(ts, StmtKind::Match, parent);
        for subject in field_children(ts, "subject") {
            self.lower_expr(subject, id);
        }
        let body = ts
            .child_by_field_name("body")
            .or_else(|| named_children(ts).into_iter().find(|c| c.kind() == "block"));
        let cases: Vec<TsNode> = body
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.kind() == "case_clause")
            .collect();
        if cases.is_empty() {
            self.reject(ts, "match statement without cases");
        }
        for case in cases {
            self.lower_case(case, id);
        }
    }

    fn lower_case(&mut self, case: TsNode, parent: NodeId) {
        let match_case = self.aux(case, AuxKind::MatchCase, parent);
        let mut block = None;
        for child in named_children(case) {
            match child.kind() {
                "case_pattern" => {
                    let pattern = self.aux(child, AuxKind::Pattern, match_case);
                    self.lower_pattern_parts(child, pattern);
                }
                "if_clause" => {
                    for guard in named_children(child) {
                        self.lower_expr(guard, match_case);
                    }
                }
                "block" => block = Some(child),
                _ => {}
            }
        }
        self.lower_block(case, block, match_case);
    }

    /// Capture names inside patterns are bare identifiers, not expressions.
    /// Value patterns produce expression nodes, class patterns their class
    /// name, and `None`/`True`/`False` singletons nothing at all.
    fn lower_pattern(&mut self, ts: TsNode, parent: NodeId) {
        match ts.kind() {
            "identifier" | "keyword_identifier" | "none" | "true" | "false" => {}
            "dotted_name" => {
                if named_children(ts).len() > 1 {
                    self.lower_expr(ts, parent);
                }
            }
            "integer" | "float" | "string" | "concatenated_string" => self.lower_expr(ts, parent),
            "complex_pattern" => self.lower_complex_pattern(ts, parent),
            "class_pattern" => {
                let parts = named_children(ts);
                if let Some((class, arguments)) = parts.split_first() {
                    self.lower_dotted(&named_children(*class), parent);
                    for argument in arguments {
                        self.lower_pattern(*argument, parent);
                    }
                }
            }
            _ => self.lower_pattern_parts(ts, parent),
        }
    }

    /// Sub-patterns of `ts`; a `-` token glued to a number is a negative
    /// literal.
    fn lower_pattern_parts(&mut self, ts: TsNode, parent: NodeId) {
        let mut children = all_children(ts).into_iter().peekable();
        while let Some(child) = children.next() {
            if child.kind() == "-" {
                if let Some(number) =
                    children.next_if(|n| matches!(n.kind(), "integer" | "float"))
                {
                    self.lower_negative(child, number, parent);
                }
            } else if child.is_named() {
                self.lower_pattern(child, parent);
            }
        }
    }

    fn lower_negative(&mut self, minus: TsNode, number: TsNode, parent: NodeId) {
        let id = self.push_between(NodeKind::Expr(ExprKind::UnaryOp), minus, number, parent);
        self.operator(Some(minus), Some(Operator::USub), id);
        self.lower_expr(number, id);
    }

    /// `1 + 2j` or `-1 - 2j`
    fn lower_complex_pattern(&mut self, ts: TsNode, parent: NodeId) {
        let children = all_children(ts);
        let Some(split) = children.iter().rposition(|c| matches!(c.kind(), "+" | "-")) else {
            return;
        };
        let id = self.expression(ts, ExprKind::BinOp, parent);
        let (left, right) = children.split_at(split);
        match left {
            [minus, number] => self.lower_negative(*minus, *number, id),
            [number] => self.lower_expr(*number, id),
            _ => {}
        }
        if let Some((op, operand)) = right.split_first() {
            self.operator(Some(*op), Operator::binary(op.kind()), id);
            for number in operand {
                self.lower_expr(*number, id);
            }
        }
    }

    fn lower_expression_statement(&mut self, ts: TsNode, parent: NodeId) {
        let exprs = named_children(ts);
        match exprs.as_slice() {
            [single] if single.kind() == "assignment" => {
                self.lower_assignment(*single, ts, parent)
            }
            [single] if single.kind() == "augmented_assignment" => {
                let id = self.statement(ts, StmtKind::AugAssign, parent);
                if let Some(target) = single.child_by_field_name("left") {
                    self.lower_expr(target, id);
                }
                let token = single.child_by_field_name("operator");
                let op = token.and_then(|t| Operator::binary(t.kind()));
                self.operator(token, op, id);
                if let Some(value) = single.child_by_field_name("right") {
                    self.lower_expr(value, id);
                }
            }
            [single] => {
                let id = self.statement(ts, StmtKind::Expr, parent);
                self.lower_expr(*single, id);
            }
            [first, .., last] => {
                let id = self.statement(ts, StmtKind::Expr, parent);
                let tuple =
                    self.push_between(NodeKind::Expr(ExprKind::Tuple), *first, *last, id);
                for expr in &exprs {
                    self.lower_expr(*expr, tuple);
                }
            }
            [] => {}
        }
    }

    fn lower_assignment(&mut self, assign: TsNode, ts: TsNode, parent: NodeId) {
        if let Some(annotation) = assign.child_by_field_name("type") {
            let id = self.statement(ts, StmtKind::AnnAssign, parent);
            if let Some(target) = assign.child_by_field_name("left") {
                self.lower_expr(target, id);
            }
            self.lower_expr(annotation, id);
            if let Some(value) = assign.child_by_field_name("right") {
                self.lower_expr(value, id);
            }
            return;
        }

        // `a = b = 1` nests assignments on the right; flatten the targets.
        let id = self.statement(ts, StmtKind::Assign, parent);
        let mut targets = Vec::new();
        let mut current = assign;
        let value = loop {
            if let Some(target) = current.child_by_field_name("left") {
                targets.push(target);
            }
            match current.child_by_field_name("right") {
                Some(right)
                    if right.kind() == "assignment"
                        && right.child_by_field_name("type").is_none() =>
                {
                    current = right
                }
                other => break other,
            }
        };
        for target in targets {
            self.lower_expr(target, id);
        }
        if let Some(value) = value {
            self.lower_expr(value, id);
        }
    }

    fn lower_delete(&mut self, ts: TsNode, parent: NodeId) {
        let id = self.statement(ts, StmtKind::Delete, parent);
        for child in named_children(ts) {
            if child.kind() == "expression_list" {
                for target in named_children(child) {
                    self.lower_expr(target, id);
                }
            } else {
                self.lower_expr(child, id);
            }
        }
    }

    fn lower_import(&mut self, ts: TsNode, kind: StmtKind, parent: NodeId) {
        let id = self.statement(ts, kind, parent);
        let names = match kind {
            StmtKind::ImportFrom => field_children(ts, "name"),
            _ => named_children(ts),
        };
        for name in names {
            self.aux(name, AuxKind::Alias, id);
        }
        if let Some(wildcard) = named_children(ts)
            .into_iter()
            .find(|c| c.kind() == "wildcard_import")
        {
            self.aux(wildcard, AuxKind::Alias, id);
        }
    }

    // ---- expressions ----

    fn lower_expr(&mut self, ts: TsNode, parent: NodeId) {
        match ts.kind() {
            "identifier" | "keyword_identifier" => {
                self.expression(ts, ExprKind::Name, parent);
            }
            "integer" => self.constant(ts, Constant::Int, parent),
            "float" => self.constant(ts, Constant::Float, parent),
            "true" | "false" => self.constant(ts, Constant::Bool, parent),
            "none" => self.constant(ts, Constant::None, parent),
            "ellipsis" => self.constant(ts, Constant::Ellipsis, parent),
            "string" | "concatenated_string" => self.lower_string(ts, parent),
            "attribute" => {
                let id = self.expression(ts, ExprKind::Attribute, parent);
                if let Some(object) = ts.child_by_field_name("object") {
                    self.lower_expr(object, id);
                }
            }
            "dotted_name" => {
                let parts = named_children(ts);
                self.lower_dotted(&parts, parent);
            }
            "subscript" => self.lower_subscript(ts, parent),
            "generic_type" => self.lower_generic_type(ts, parent),
            "union_type" => {
                let id = self.expression(ts, ExprKind::BinOp, parent);
                let token = all_children(ts).into_iter().find(|c| c.kind() == "|");
                let mut operands = named_children(ts).into_iter();
                if let Some(left) = operands.next() {
                    self.lower_expr(left, id);
                }
                self.operator(token, Some(Operator::BitOr), id);
                for right in operands {
                    self.lower_expr(right, id);
                }
            }
            "member_type" => {
                let id = self.expression(ts, ExprKind::Attribute, parent);
                if let Some(value) = named_children(ts).first() {
                    self.lower_expr(*value, id);
                }
            }
            "splat_type" => self.wrap(ts, ExprKind::Starred, parent),
            "slice" => self.wrap(ts, ExprKind::Slice, parent),
            "call" => {
                let id = self.expression(ts, ExprKind::Call, parent);
                if let Some(function) = ts.child_by_field_name("function") {
                    self.lower_expr(function, id);
                }
                match ts.child_by_field_name("arguments") {
                    Some(args) if args.kind() == "argument_list" => self.lower_arguments(args, id),
                    Some(generator) => self.lower_expr(generator, id),
                    None => {}
                }
            }
            "binary_operator" => {
                let id = self.expression(ts, ExprKind::BinOp, parent);
                if let Some(left) = ts.child_by_field_name("left") {
                    self.lower_expr(left, id);
                }
                let token = ts.child_by_field_name("operator");
                let op = token.and_then(|t| Operator::binary(t.kind()));
                self.operator(token, op, id);
                if let Some(right) = ts.child_by_field_name("right") {
                    self.lower_expr(right, id);
                }
            }
            "unary_operator" => {
                let id = self.expression(ts, ExprKind::UnaryOp, parent);
                let token = ts.child_by_field_name("operator");
                let op = token.and_then(|t| Operator::unary(t.kind()));
                self.operator(token, op, id);
                if let Some(operand) = ts.child_by_field_name("argument") {
                    self.lower_expr(operand, id);
                }
            }
            "not_operator" => {
                let id = self.expression(ts, ExprKind::UnaryOp, parent);
                let token = all_children(ts).into_iter().find(|c| c.kind() == "not");
                self.operator(token, Some(Operator::Not), id);
                if let Some(operand) = ts.child_by_field_name("argument") {
                    self.lower_expr(operand, id);
                }
            }
            "boolean_operator" => self.lower_bool_op(ts, parent),
            "comparison_operator" => self.lower_comparison(ts, parent),
            "conditional_expression" => {
                let id = self.expression(ts, ExprKind::IfExp, parent);
                let parts = named_children(ts);
                // `body if test else orelse` is stored as test, body, orelse
                let ordered = match parts.as_slice() {
                    [body, test, orelse] => vec![*test, *body, *orelse],
                    _ => parts,
                };
                for part in ordered {
                    self.lower_expr(part, id);
                }
            }
            "lambda" => {
                let id = self.expression(ts, ExprKind::Lambda, parent);
                match ts.child_by_field_name("parameters") {
                    Some(params) => self.lower_parameters(params, id),
                    None => {
                        self.aux(ts, AuxKind::Arguments, id);
                    }
                }
                if let Some(body) = ts.child_by_field_name("body") {
                    self.lower_expr(body, id);
                }
            }
            "list" | "list_pattern" => self.wrap(ts, ExprKind::List, parent),
            "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => {
                self.wrap(ts, ExprKind::Tuple, parent)
            }
            "set" => self.wrap(ts, ExprKind::Set, parent),
            "dictionary" => self.lower_dictionary(ts, parent),
            "list_comprehension" => self.lower_comprehension(ts, ExprKind::ListComp, parent),
            "set_comprehension" => self.lower_comprehension(ts, ExprKind::SetComp, parent),
            "dictionary_comprehension" => {
                self.lower_comprehension(ts, ExprKind::DictComp, parent)
            }
            "generator_expression" => {
                self.lower_comprehension(ts, ExprKind::GeneratorExp, parent)
            }
            "await" => self.wrap(ts, ExprKind::Await, parent),
            "yield" => {
                let kind = if has_token(ts, "from") {
                    ExprKind::YieldFrom
                } else {
                    ExprKind::Yield
                };
                self.wrap(ts, kind, parent)
            }
            "named_expression" => self.wrap(ts, ExprKind::NamedExpr, parent),
            "list_splat" | "list_splat_pattern" => self.wrap(ts, ExprKind::Starred, parent),
            "keyword_argument" => {
                let keyword = self.aux(ts, AuxKind::Keyword, parent);
                if let Some(value) = ts.child_by_field_name("value") {
                    self.lower_expr(value, keyword);
                }
            }
            "dictionary_splat" => {
                let keyword = self.aux(ts, AuxKind::Keyword, parent);
                for value in named_children(ts) {
                    self.lower_expr(value, keyword);
                }
            }
            _ => {
                for child in named_children(ts) {
                    self.lower_expr(child, parent);
                }
            }
        }
    }

    fn constant(&mut self, ts: TsNode, constant: Constant, parent: NodeId) {
        self.expression(ts, ExprKind::Constant(constant), parent);
    }

    /// Expression node whose named children are all sub-expressions
    fn wrap(&mut self, ts: TsNode, kind: ExprKind, parent: NodeId) {
        let id = self.expression(ts, kind, parent);
        for child in named_children(ts) {
            self.lower_expr(child, id);
        }
    }

    /// `a.b.c` as `Attribute(Attribute(Name(a)))`
    fn lower_dotted(&mut self, parts: &[TsNode], parent: NodeId) {
        match parts {
            [] => {}
            [name] => {
                self.expression(*name, ExprKind::Name, parent);
            }
            [first, .., last] => {
                let id =
                    self.push_between(NodeKind::Expr(ExprKind::Attribute), *first, *last, parent);
                self.lower_dotted(&parts[..parts.len() - 1], id);
            }
        }
    }

    fn lower_subscript(&mut self, ts: TsNode, parent: NodeId) {
        let id = self.expression(ts, ExprKind::Subscript, parent);
        if let Some(value) = ts.child_by_field_name("value") {
            self.lower_expr(value, id);
        }
        self.lower_indices(&field_children(ts, "subscript"), id);
    }

    /// `Optional[str]` or `dict[str, int]` in an annotation
    fn lower_generic_type(&mut self, ts: TsNode, parent: NodeId) {
        let id = self.expression(ts, ExprKind::Subscript, parent);
        for child in named_children(ts) {
            if child.kind() == "type_parameter" {
                self.lower_indices(&named_children(child), id);
            } else {
                self.lower_expr(child, id);
            }
        }
    }

    /// Several indices form one `Tuple`
    fn lower_indices(&mut self, indices: &[TsNode], parent: NodeId) {
        match indices {
            [single] => self.lower_expr(*single, parent),
            [first, .., last] => {
                let tuple =
                    self.push_between(NodeKind::Expr(ExprKind::Tuple), *first, *last, parent);
                for index in indices {
                    self.lower_expr(*index, tuple);
                }
            }
            [] => {}
        }
    }

    /// Positional arguments first, then keywords, as in `ast.Call`
    fn lower_arguments(&mut self, args: TsNode, parent: NodeId) {
        let (keywords, positional): (Vec<TsNode>, Vec<TsNode>) = named_children(args)
            .into_iter()
            .partition(|c| matches!(c.kind(), "keyword_argument" | "dictionary_splat"));
        for arg in positional.into_iter().chain(keywords) {
            self.lower_expr(arg, parent);
        }
    }

    fn lower_bool_op(&mut self, ts: TsNode, parent: NodeId) {
        let token = ts.child_by_field_name("operator");
        let op = token.and_then(|t| Operator::boolean(t.kind()));
        let id = self.expression(ts, ExprKind::BoolOp, parent);
        self.operator(token, op, id);

        let mut operands = Vec::new();
        collect_bool_operands(ts, op, &mut operands);
        for operand in operands {
            self.lower_expr(operand, id);
        }
    }

    fn lower_comparison(&mut self, ts: TsNode, parent: NodeId) {
        let id = self.expression(ts, ExprKind::Compare, parent);
        let mut operands = Vec::new();
        let mut operators = Vec::new();
        for child in all_children(ts) {
            if let Some(op) = Operator::comparison(child.kind()) {
                operators.push((child, op));
            } else if child.is_named() {
                operands.push(child);
            }
        }

        let Some((left, comparators)) = operands.split_first() else {
            return;
        };
        self.lower_expr(*left, id);
        for (token, op) in operators {
            self.operator(Some(token), Some(op), id);
        }
        for comparator in comparators {
            self.lower_expr(*comparator, id);
        }
    }

    fn lower_string(&mut self, ts: TsNode, parent: NodeId) {
        let parts = if ts.kind() == "concatenated_string" {
            named_children(ts)
        } else {
            vec![ts]
        };
        let bytes = parts.iter().filter(|part| self.is_bytes(**part)).count();
        if bytes > 0 && bytes < parts.len() {
            self.reject(ts, "cannot mix bytes and nonbytes literals");
        }
        let interpolated = parts
            .iter()
            .any(|part| named_children(*part).iter().any(|c| c.kind() == "interpolation"));

        if !interpolated {
            let constant = if bytes > 0 {
                Constant::Bytes
            } else {
                Constant::Str
            };
            self.constant(ts, constant, parent);
            return;
        }

        // Adjacent literal pieces, across implicitly concatenated parts too,
        // merge into one constant.
        let id = self.expression(ts, ExprKind::JoinedStr, parent);
        let mut text = None;
        for part in parts {
            for piece in named_children(part) {
                match piece.kind() {
                    "string_content" => extend_text(&mut text, piece),
                    "interpolation" => {
                        // `{x=}` also emits its source text
                        if has_token(piece, "=") {
                            extend_text(&mut text, piece);
                        }
                        self.flush_text(&mut text, id);
                        self.lower_interpolation(piece, id);
                    }
                    _ => {}
                }
            }
        }
        self.flush_text(&mut text, id);
    }

    fn lower_interpolation(&mut self, ts: TsNode, parent: NodeId) {
        let value = self.expression(ts, ExprKind::FormattedValue, parent);
        if let Some(expr) = ts.child_by_field_name("expression") {
            self.lower_expr(expr, value);
        }
        if let Some(spec) = ts.child_by_field_name("format_specifier") {
            self.lower_format_spec(spec, value);
        }
    }

    /// The part after `:` is itself a `JoinedStr`, possibly with nested
    /// interpolations.
    fn lower_format_spec(&mut self, spec: TsNode, parent: NodeId) {
        let id = self.expression(spec, ExprKind::JoinedStr, parent);
        let mut text = None;
        for (index, piece) in all_children(spec).into_iter().enumerate() {
            match piece.kind() {
                ":" if index == 0 => {}
                "format_expression" => {
                    self.flush_text(&mut text, id);
                    self.lower_interpolation(piece, id);
                }
                _ if !piece.is_named() => extend_text(&mut text, piece),
                _ => {}
            }
        }
        self.flush_text(&mut text, id);
    }

    fn flush_text<'t>(&mut self, text: &mut Option<(TsNode<'t>, TsNode<'t>)>, parent: NodeId) {
        if let Some((first, last)) = text.take() {
            let constant = NodeKind::Expr(ExprKind::Constant(Constant::Str));
            self.push_between(constant, first, last, parent);
        }
    }

    fn is_bytes(&self, string: TsNode) -> bool {
        let prefix = match named_children(string)
            .into_iter()
            .find(|c| c.kind() == "string_start")
        {
            Some(start) => self.token_text(start),
            None => self.token_text(string),
        };
        prefix
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .any(|c| c == 'b' || c == 'B')
    }

    fn lower_dictionary(&mut self, ts: TsNode, parent: NodeId) {
        let id = self.expression(ts, ExprKind::Dict, parent);
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for entry in named_children(ts) {
            match entry.kind() {
                "pair" => {
                    keys.extend(entry.child_by_field_name("key"));
                    values.extend(entry.child_by_field_name("value"));
                }
                // `**mapping` has no key
                _ => values.extend(named_children(entry)),
            }
        }
        for expr in keys.into_iter().chain(values) {
            self.lower_expr(expr, id);
        }
    }

    fn lower_comprehension(&mut self, ts: TsNode, kind: ExprKind, parent: NodeId) {
        let id = self.expression(ts, kind, parent);
        match ts.child_by_field_name("body") {
            Some(pair) if pair.kind() == "pair" => {
                for part in named_children(pair) {
                    self.lower_expr(part, id);
                }
            }
            Some(element) => self.lower_expr(element, id),
            None => {}
        }

        let mut generator = None;
        for clause in named_children(ts) {
            match clause.kind() {
                "for_in_clause" => {
                    let comp = self.aux(clause, AuxKind::Comprehension, id);
                    for target in field_children(clause, "left") {
                        self.lower_expr(target, comp);
                    }
                    for iter in field_children(clause, "right") {
                        self.lower_expr(iter, comp);
                    }
                    generator = Some(comp);
                }
                "if_clause" => {
                    if let Some(comp) = generator {
                        for condition in named_children(clause) {
                            self.lower_expr(condition, comp);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Grow the pending run of literal string pieces to end at `piece`
fn extend_text<'t>(text: &mut Option<(TsNode<'t>, TsNode<'t>)>, piece: TsNode<'t>) {
    let first = text.as_ref().map_or(piece, |(first, _)| *first);
    *text = Some((first, piece));
}

/// Flatten `a and b and c` into one operand list; a different operator or a
/// parenthesized operand starts a new `BoolOp`.
fn collect_bool_operands<'t>(
    node: TsNode<'t>,
    op: Option<Operator>,
    operands: &mut Vec<TsNode<'t>>,
) {
    for side in ["left", "right"] {
        let Some(operand) = node.child_by_field_name(side) else {
            continue;
        };
        let same_op = operand.kind() == "boolean_operator"
            && operand
                .child_by_field_name("operator")
                .and_then(|t| Operator::boolean(t.kind()))
                == op;
        if same_op {
            collect_bool_operands(operand, op, operands);
        } else {
            operands.push(operand);
        }
    }
}

/// Line span and byte range of `node`, ignoring trailing comments.
///
/// A node whose last token ends at column 0 of a later row (a trailing
/// newline) ends on the previous line.
fn extent(node: TsNode) -> (LineSpan, Range<usize>) {
    let (end, end_byte) = content_end(node);
    let start_row = node.start_position().row;
    let end_row = if end.column == 0 && end.row > start_row {
        end.row - 1
    } else {
        end.row
    };
    (
        LineSpan::new(start_row + 1, end_row + 1),
        node.start_byte()..end_byte,
    )
}

fn content_end(node: TsNode) -> (Point, usize) {
    let last = all_children(node)
        .into_iter()
        .filter(|c| c.end_byte() > c.start_byte())
        .last();
    match last {
        Some(child) => content_end(child),
        None => (node.end_position(), node.end_byte()),
    }
}

fn named_children(node: TsNode) -> Vec<TsNode> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn all_children(node: TsNode) -> Vec<TsNode> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn field_children<'t>(node: TsNode<'t>, field: &str) -> Vec<TsNode<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn has_token(node: TsNode, token: &str) -> bool {
    all_children(node)
        .iter()
        .any(|c| !c.is_named() && c.kind() == token)
}

/// Body block of an `else`/`finally` clause
fn block_of(clause: TsNode) -> Option<TsNode> {
    clause
        .child_by_field_name("body")
        .or_else(|| named_children(clause).into_iter().find(|c| c.kind() == "block"))
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::super::syntax::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn top_level(tree: &SyntaxTree) -> Vec<NodeKind> {
        tree.children(tree.root())
            .iter()
            .map(|id| tree.kind(*id))
            .collect()
    }

    fn spans(tree: &SyntaxTree, kind: NodeKind) -> Vec<(usize, usize)> {
        tree.as_subtree()
            .walk()
            .filter(|id| tree.kind(*id) == kind)
            .map(|id| (tree.node(id).start_line, tree.node(id).end_line))
            .collect()
    }

    #[test]
    fn test_statement_spans_ignore_trailing_comments() {
        let code = indoc! {"
            def f():
                return 1
                # trailing

            x = 2
        "};
        let tree = parse(code).unwrap();
        let func = tree.children(tree.root())[0];
        assert_eq!(tree.node(func).span(), crate::core::LineSpan::new(1, 2));
        assert_eq!(
            top_level(&tree),
            vec![
                NodeKind::Stmt(StmtKind::FunctionDef { is_async: false }),
                NodeKind::Stmt(StmtKind::Assign)
            ]
        );
    }

    #[test]
    fn test_elif_is_nested_if() {
        let code = indoc! {"
            if a:
                pass
            elif b:
                pass
            else:
                pass
        "};
        let tree = parse(code).unwrap();
        let ifs = spans(&tree, NodeKind::Stmt(StmtKind::If));
        assert_eq!(ifs, vec![(1, 6), (3, 6)]);

        let outer = tree.children(tree.root())[0];
        let inner = tree.children(outer)[2];
        assert_eq!(tree.kind(inner), NodeKind::Stmt(StmtKind::If));
        // test, body, orelse
        assert_eq!(tree.children(inner).len(), 3);
    }

    #[test]
    fn test_decorator_lines_are_recorded() {
        let code = indoc! {"
            @first
            @second(1)
            def f():
                pass
        "};
        let mut tree = parse(code).unwrap();
        let func = tree.children(tree.root())[0];
        assert_eq!(tree.node(func).start_line, 3);
        assert_eq!(tree.node(func).decorator_lines, vec![1, 2]);
        tree.adjust_decorator_lines();
        assert_eq!(tree.node(func).start_line, 1);
    }

    #[test]
    fn test_chained_assignment_is_single_statement() {
        let tree = parse("a = b = 1").unwrap();
        assert_eq!(top_level(&tree), vec![NodeKind::Stmt(StmtKind::Assign)]);
        let assign = tree.children(tree.root())[0];
        let kinds: Vec<NodeKind> = tree
            .children(assign)
            .iter()
            .map(|id| tree.kind(*id))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Expr(ExprKind::Name),
                NodeKind::Expr(ExprKind::Name),
                NodeKind::Expr(ExprKind::Constant(Constant::Int)),
            ]
        );
    }

    #[test]
    fn test_annotated_and_augmented_assignment() {
        let tree = parse("a: int = 1\nb += 2").unwrap();
        assert_eq!(
            top_level(&tree),
            vec![
                NodeKind::Stmt(StmtKind::AnnAssign),
                NodeKind::Stmt(StmtKind::AugAssign)
            ]
        );
    }

    #[test]
    fn test_comparison_operators_are_separate_nodes() {
        let tree = parse("a < b is not c").unwrap();
        let ops: Vec<NodeKind> = tree
            .as_subtree()
            .walk()
            .map(|id| tree.kind(id))
            .filter(|kind| matches!(kind, NodeKind::Op(_)))
            .collect();
        assert_eq!(
            ops,
            vec![NodeKind::Op(Operator::Lt), NodeKind::Op(Operator::IsNot)]
        );
    }

    #[test]
    fn test_parenthesized_bool_op_is_not_flattened() {
        let tree = parse("a and (b and c)").unwrap();
        assert_eq!(spans(&tree, NodeKind::Expr(ExprKind::BoolOp)).len(), 2);
        let tree = parse("a and b and c").unwrap();
        assert_eq!(spans(&tree, NodeKind::Expr(ExprKind::BoolOp)).len(), 1);
    }

    #[test]
    fn test_strings() {
        let tree = parse("'a'\nb'b'\nf'{x} y'").unwrap();
        let kinds: Vec<NodeKind> = tree
            .children(tree.root())
            .iter()
            .map(|stmt| tree.kind(tree.children(*stmt)[0]))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Expr(ExprKind::Constant(Constant::Str)),
                NodeKind::Expr(ExprKind::Constant(Constant::Bytes)),
                NodeKind::Expr(ExprKind::JoinedStr),
            ]
        );
    }

    #[test]
    fn test_mixed_bytes_concatenation_is_rejected() {
        assert!(parse("x = b'a' 'b'").is_err());
        assert!(parse("x = 'a' b'b'").is_err());
        assert!(parse("x = b'a' b'b'").is_ok());
        assert!(parse("x = 'a' f'{b}'").is_ok());
    }

    #[test]
    fn test_format_spec_lowering() {
        let tree = parse("f'{x:>{w}}'").unwrap();
        let joined = tree.children(tree.children(tree.root())[0])[0];
        let value = tree.children(joined)[0];
        let kinds: Vec<NodeKind> = tree
            .children(value)
            .iter()
            .map(|id| tree.kind(*id))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Expr(ExprKind::Name),
                NodeKind::Expr(ExprKind::JoinedStr),
            ]
        );
    }

    #[test]
    fn test_call_arguments_put_keywords_last() {
        let tree = parse("f(a=1, *b)").unwrap();
        let call = tree.children(tree.children(tree.root())[0])[0];
        let kinds: Vec<NodeKind> = tree
            .children(call)
            .iter()
            .map(|id| tree.kind(*id))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Expr(ExprKind::Name),
                NodeKind::Expr(ExprKind::Starred),
                NodeKind::Aux(AuxKind::Keyword),
            ]
        );
    }

    #[test]
    fn test_except_alias_is_not_an_expression() {
        let code = indoc! {"
            try:
                pass
            except ValueError as err:
                pass
        "};
        let tree = parse(code).unwrap();
        assert_eq!(spans(&tree, NodeKind::Expr(ExprKind::Name)), vec![(3, 3)]);
    }
}
