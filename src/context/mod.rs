//! Resolution of the code a review comment refers to.
//!
//! Starting from the comment's line range, the extractor walks down the
//! statements that enclose it and picks the unit a reader would look at: the
//! enclosing function if there is one, otherwise the enclosing statement whose
//! size is closest to a preferred window, narrowed to a sub-expression when
//! that statement is very long.

use crate::analyzers::python::{self, NodeId, SubTree, SyntaxTree};
use crate::config::ContextConfig;
use crate::core::{text, LineSpan};
use crate::errors::Result;

/// Code unit chosen for a comment
#[derive(Clone, Debug)]
pub struct Context {
    /// Dedented source of the chosen unit
    pub text: String,
    pub tree: SyntaxTree,
    /// Chosen node inside `tree`
    pub node: NodeId,
    /// Line bounds of the chosen node, `None` when nothing could be anchored
    pub span: Option<LineSpan>,
}

impl Context {
    /// Context of a comment that is not anchored to any code
    pub fn empty() -> Self {
        let tree = SyntaxTree::empty();
        let node = tree.root();
        Self {
            text: String::new(),
            tree,
            node,
            span: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_none()
    }

    /// The chosen node and everything below it
    pub fn subtree(&self) -> SubTree<'_> {
        self.tree.subtree(self.node)
    }

    fn of_node(tree: SyntaxTree, node: NodeId, text: String) -> Self {
        let span = tree.node(node).span();
        Self {
            text,
            tree,
            node,
            span: Some(span),
        }
    }
}

/// Find the context of the lines in `range` within `code`.
///
/// Fails only when `code` does not parse.
pub fn extract_context(
    code: &str,
    range: Option<LineSpan>,
    config: &ContextConfig,
) -> Result<Context> {
    let Some(range) = range else {
        return Ok(Context::empty());
    };
    if text::extract_range(code, Some(range)).trim().is_empty() {
        return Ok(Context::empty());
    }

    let mut tree = python::parse(code)?;
    tree.adjust_decorator_lines();
    let path = build_path(&tree, range);

    // Nothing encloses the range, e.g. a comment between top-level statements
    if path.is_empty() {
        let root = tree.root();
        return Ok(Context {
            text: code.to_string(),
            tree,
            node: root,
            span: Some(LineSpan::new(1, text::line_count(code))),
        });
    }

    if let Some(func) = path.iter().copied().find(|id| tree.node(*id).is_function()) {
        return Ok(statement_context(code, tree, func));
    }

    let Some(statement) = closest_to_window(&tree, path.iter().copied(), config.optimal_lines)
    else {
        return Ok(Context::empty());
    };
    if tree.node(statement).line_count() <= config.max_statement_lines {
        return Ok(statement_context(code, tree, statement));
    }

    let expressions = tree.subtree(statement).walk().filter(|id| {
        let node = tree.node(*id);
        node.is_expression() && node.span().contains(&range)
    });
    let chosen = closest_to_window(&tree, expressions, config.optimal_lines).unwrap_or(statement);
    log::debug!(
        "Statement at line {} exceeds {} lines, narrowed to node at line {}",
        tree.node(statement).start_line,
        config.max_statement_lines,
        tree.node(chosen).start_line
    );

    let segment = node_source(code, &tree, chosen);
    let text = text::dedent(segment);
    Ok(Context::of_node(tree, chosen, text))
}

/// Statements enclosing `range`, innermost first.
///
/// At each level only the first statement child whose span contains the range
/// is followed; clause nodes such as exception handlers and match cases stop
/// the descent.
pub fn build_path(tree: &SyntaxTree, range: LineSpan) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut parent = tree.root();
    while let Some(child) = tree.children(parent).iter().copied().find(|id| {
        let node = tree.node(*id);
        node.is_statement() && node.span().contains(&range)
    }) {
        path.push(child);
        parent = child;
    }
    path.reverse();
    path
}

/// Distance of a node's size from the preferred window
pub fn context_score(tree: &SyntaxTree, id: NodeId, optimal_lines: usize) -> usize {
    tree.node(id).line_count().abs_diff(optimal_lines)
}

/// Candidate with the lowest score; the earliest one wins ties.
fn closest_to_window(
    tree: &SyntaxTree,
    candidates: impl Iterator<Item = NodeId>,
    optimal_lines: usize,
) -> Option<NodeId> {
    candidates
        .map(|id| (context_score(tree, id, optimal_lines), id))
        .fold(None, |best: Option<(usize, NodeId)>, current| match best {
            Some(best) if best.0 <= current.0 => Some(best),
            _ => Some(current),
        })
        .map(|(_, id)| id)
}

fn statement_context(code: &str, tree: SyntaxTree, id: NodeId) -> Context {
    let span = tree.node(id).span();
    let text = text::dedent(&text::extract_range(code, Some(span)));
    Context::of_node(tree, id, text)
}

/// Exact source of a node: from its column on its (possibly decorator
/// adjusted) first line through its last token.
fn node_source<'c>(code: &'c str, tree: &SyntaxTree, id: NodeId) -> &'c str {
    let node = tree.node(id);
    let line_start = code
        .get(..node.start_byte)
        .and_then(|before| before.rfind('\n'))
        .map_or(0, |newline| newline + 1);
    let column = node.start_byte.saturating_sub(line_start);
    text::source_segment(code, node.start_line, column, node.end_byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::python::parse;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn extract(code: &str, start: usize, end: usize) -> Context {
        extract_context(
            code,
            Some(LineSpan::new(start, end)),
            &ContextConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_context_score() {
        let tree = parse("def f(): pass").unwrap();
        let func = tree.children(tree.root())[0];
        assert_eq!(context_score(&tree, func, 20), 19);

        let tree = parse("if x == 1:\n\tx += 1\n\tprint(x)").unwrap();
        let cond = tree.children(tree.root())[0];
        assert_eq!(context_score(&tree, cond, 20), 17);
    }

    #[test]
    fn test_absent_range_is_empty() {
        let ctx = extract_context("x = 1", None, &ContextConfig::default()).unwrap();
        assert!(ctx.is_empty());
        assert_eq!(ctx.text, "");
        assert!(ctx.tree.is_empty_module());
    }

    #[test]
    fn test_blank_line_is_empty() {
        let ctx = extract("x = 1\n\n   \ny = 2\n", 2, 3);
        assert!(ctx.is_empty());
        assert_eq!(ctx.span, None);
    }

    #[test]
    fn test_blank_slice_does_not_need_valid_code() {
        let ctx = extract("def broken(:\n\n", 2, 2);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_function_wins() {
        let code = indoc! {"
            import os

            def handler(event):
                if event:
                    return os.getcwd()
                return None
        "};
        let ctx = extract(code, 5, 5);
        assert_eq!(ctx.span, Some(LineSpan::new(3, 6)));
        assert!(ctx.text.starts_with("def handler(event):"));
    }

    #[test]
    fn test_method_is_dedented() {
        let code = indoc! {"
            class Service:
                def run(self):
                    return 1
        "};
        let ctx = extract(code, 3, 3);
        assert_eq!(ctx.span, Some(LineSpan::new(2, 3)));
        assert_eq!(ctx.text, "def run(self):\n    return 1");
    }

    #[test]
    fn test_decorated_function_starts_at_decorator() {
        let code = indoc! {"
            @app.route('/')
            @login_required
            def index():
                return 'ok'
        "};
        let ctx = extract(code, 4, 4);
        assert_eq!(ctx.span, Some(LineSpan::new(1, 4)));
        assert!(ctx.text.starts_with("@app.route('/')"));
    }

    #[test]
    fn test_top_level_comment_returns_whole_file() {
        let code = "x = 1\n# note\ny = 2\n";
        let ctx = extract(code, 2, 2);
        assert_eq!(ctx.span, Some(LineSpan::new(1, 3)));
        assert_eq!(ctx.text, code);
        assert_eq!(ctx.node, ctx.tree.root());
    }

    #[test]
    fn test_statement_closest_to_window() {
        let code = indoc! {"
            for item in items:
                if item:
                    total = item + 1
        "};
        let ctx = extract(code, 3, 3);
        // every enclosing statement is shorter than the window, the outermost
        // one is closest
        assert_eq!(ctx.span, Some(LineSpan::new(1, 3)));
    }

    #[test]
    fn test_tie_prefers_statement_nearest_to_leaf() {
        let code = "while a:\n    while b:\n        x = 1\n    y = 2\n";
        let tree = parse(code).unwrap();
        let path = build_path(&tree, LineSpan::single(3));
        assert_eq!(path.len(), 3);
        let config = ContextConfig {
            optimal_lines: 3,
            ..ContextConfig::default()
        };
        // inner loop (2 lines) and outer loop (4 lines) are both 1 away
        let ctx = extract_context(code, Some(LineSpan::single(3)), &config).unwrap();
        assert_eq!(ctx.span, Some(LineSpan::new(2, 3)));
    }

    #[test]
    fn test_build_path_is_leaf_first() {
        let code = indoc! {"
            if a:
                for x in y:
                    z = x
            w = 2
        "};
        let tree = parse(code).unwrap();
        let path = build_path(&tree, LineSpan::single(3));
        let starts: Vec<usize> = path.iter().map(|id| tree.node(*id).start_line).collect();
        assert_eq!(starts, vec![3, 2, 1]);
    }

    #[test]
    fn test_build_path_stops_at_except_handler() {
        let code = indoc! {"
            try:
                pass
            except ValueError:
                x = 1
        "};
        let tree = parse(code).unwrap();
        let path = build_path(&tree, LineSpan::single(4));
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_long_statement_narrows_to_expression() {
        let mut code = String::from("CONFIG = {\n");
        for i in 0..120 {
            code.push_str(&format!("    'key{i}': [\n        {i},\n    ],\n"));
        }
        code.push_str("}\n");
        // line 3 holds the value of 'key0'
        let ctx = extract(&code, 3, 3);
        let span = ctx.span.unwrap();
        assert!(span.start <= 3 && 3 <= span.end);
        assert!(span.len() < 100);
        assert_eq!(ctx.text, "[\n        0,\n    ]");
    }

    #[test]
    fn test_long_statement_without_expression_falls_back() {
        let mut code = String::from("class Big:\n");
        for i in 0..110 {
            code.push_str(&format!("    a{i} = {i}\n"));
        }
        // the class line itself has no enclosing expression
        let ctx = extract(&code, 1, 1);
        assert_eq!(ctx.span, Some(LineSpan::new(1, 111)));
        assert!(ctx.text.starts_with("class Big:"));
    }
}
