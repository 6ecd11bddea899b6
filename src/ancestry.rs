//! Lexical context lookup over source trees. Context is an explicit path of
//! enclosing nodes; nothing is stored on the nodes themselves.

use crate::syntax::{Node, NodeKind};

/// Child slots of `node` in source order. Absent optional slots are skipped.
pub fn children(node: &Node) -> Vec<&Node> {
    match &node.kind {
        NodeKind::Assignment { left, right, .. } | NodeKind::Binary { left, right, .. } => {
            vec![left.as_ref(), right.as_ref()]
        }
        NodeKind::Block(body) => body.iter().collect(),
        NodeKind::Call { callee, arguments } => {
            std::iter::once(callee.as_ref()).chain(arguments).collect()
        }
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } => vec![test.as_ref(), consequent.as_ref(), alternate.as_ref()],
        NodeKind::DoWhile { body, test } => vec![body.as_ref(), test.as_ref()],
        NodeKind::ExpressionStatement(expression) => vec![expression.as_ref()],
        NodeKind::For {
            init,
            test,
            update,
            body,
        } => [init.as_deref(), test.as_deref(), update.as_deref(), Some(body.as_ref())]
            .into_iter()
            .flatten()
            .collect(),
        NodeKind::FunctionDeclaration { params, body, .. } => {
            params.iter().chain(std::iter::once(body.as_ref())).collect()
        }
        NodeKind::Identifier(_) | NodeKind::Literal { .. } => Vec::new(),
        NodeKind::If {
            test,
            consequent,
            alternate,
        } => [Some(test.as_ref()), Some(consequent.as_ref()), alternate.as_deref()]
            .into_iter()
            .flatten()
            .collect(),
        NodeKind::Return(argument) => argument.as_deref().into_iter().collect(),
        NodeKind::Update { argument, .. } => vec![argument.as_ref()],
        NodeKind::VariableDeclaration { declarations, .. } => declarations
            .iter()
            .flat_map(|declarator| std::iter::once(&declarator.id).chain(&declarator.init))
            .collect(),
        NodeKind::While { test, body } => vec![test.as_ref(), body.as_ref()],
    }
}

/// Pre-order walk. The visitor receives each node with the path from the
/// root down to its parent.
pub fn walk<'a, F>(root: &'a Node, visitor: &mut F)
where
    F: FnMut(&'a Node, &[&'a Node]),
{
    let mut path = Vec::new();
    walk_with(root, &mut path, visitor);
}

fn walk_with<'a, F>(node: &'a Node, path: &mut Vec<&'a Node>, visitor: &mut F)
where
    F: FnMut(&'a Node, &[&'a Node]),
{
    visitor(node, path);
    path.push(node);
    for child in children(node) {
        walk_with(child, path, visitor);
    }
    path.pop();
}

/// The enclosing nodes of `target`, root first, matched by identity.
/// `None` when `target` is not part of the tree under `root`.
pub fn ancestors_of<'a>(root: &'a Node, target: &Node) -> Option<Vec<&'a Node>> {
    let mut found = None;
    walk(root, &mut |node, path| {
        if found.is_none() && std::ptr::eq(node, target) {
            found = Some(path.to_vec());
        }
    });
    found
}

pub fn enclosing_function<'a>(path: &[&'a Node]) -> Option<&'a Node> {
    path.iter()
        .rev()
        .copied()
        .find(|node| matches!(node.kind, NodeKind::FunctionDeclaration { .. }))
}
