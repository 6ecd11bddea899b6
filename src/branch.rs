//! Turns symbolic branch targets into the nesting depths the target machine
//! expects. Depth 0 is the innermost enclosing `block`, `loop` or `if`.

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind},
    sexpr::{
        pattern::{and, collect, head_equals, walk, walk_mut, when, Predicate},
        Atom, SExpr,
    },
};

fn symbolic_branch() -> Predicate {
    let targets_label: Predicate = Box::new(|node: &SExpr| {
        matches!(node.children().get(1), Some(SExpr::Atom(Atom::Label(_))))
    });
    and(vec![head_equals("br"), targets_label])
}

pub fn resolve_branches(root: &mut SExpr) -> Result<(), Diagnostic> {
    let is_symbolic = symbolic_branch();

    let mut depths = Vec::new();
    let mut failure = None;
    walk(
        &*root,
        &mut when(&is_symbolic, |branch: &SExpr, ancestors: &[&SExpr]| {
            if failure.is_some() {
                return;
            }
            match branch_depth(branch, ancestors) {
                Ok(depth) => depths.push(depth),
                Err(err) => failure = Some(err),
            }
        }),
    );
    if let Some(err) = failure {
        return Err(err);
    }

    // Same pre-order as the walk above, so depths line up one-to-one.
    let mut depths = depths.into_iter();
    walk_mut(root, &mut |node| {
        if is_symbolic(&*node) {
            if let Some(depth) = depths.next() {
                node.children_mut()[1] = SExpr::Atom(Atom::Depth(depth));
            }
        }
    });
    Ok(())
}

fn branch_depth(branch: &SExpr, ancestors: &[&SExpr]) -> Result<u32, Diagnostic> {
    let Some(SExpr::Atom(Atom::Label(target))) = branch.children().get(1) else {
        return Err(Diagnostic::new(
            DiagnosticKind::UnresolvedBranch,
            format!("`{branch}` has no symbolic target"),
        ));
    };
    let mut depth = 0;
    for ancestor in ancestors.iter().rev() {
        let SExpr::Control(control) = ancestor else {
            continue;
        };
        if control.label.as_deref() == Some(target.as_str()) {
            return Ok(depth);
        }
        depth += 1;
    }
    Err(Diagnostic::new(
        DiagnosticKind::UnresolvedBranch,
        format!("unmatched label `{target}`"),
    ))
}

/// Branches whose target is still a label.
pub fn symbolic_branches(root: &SExpr) -> Vec<&SExpr> {
    collect(root, &symbolic_branch())
}
