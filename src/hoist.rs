//! Moves every `local` declaration of a function to the top of its `func`
//! form, where the target requires all locals to be declared.

use crate::{
    diagnostics::Diagnostic,
    sexpr::{
        pattern::{collect, head_equals},
        SExpr,
    },
};

pub fn hoist_locals(func: &mut SExpr) -> Result<(), Diagnostic> {
    if func.head() != Some("func") {
        return Err(Diagnostic::shape(format!(
            "Expected a func form to hoist locals in, found `{func}`"
        )));
    }
    let Some(items) = func.items_mut() else {
        return Ok(());
    };
    let header_len = items
        .iter()
        .position(|item| !is_header(item))
        .unwrap_or(items.len());
    let body = items.split_off(header_len);
    let mut locals = Vec::new();
    let body = strip_locals(body, &mut locals);
    items.extend(locals);
    items.extend(body);
    Ok(())
}

/// `local` forms in discovery order.
pub fn local_declarations(func: &SExpr) -> Vec<&SExpr> {
    collect(func, &head_equals("local"))
}

fn is_header(item: &SExpr) -> bool {
    match item {
        SExpr::Atom(_) => true,
        _ => matches!(item.head(), Some("param") | Some("result")),
    }
}

fn strip_locals(forms: Vec<SExpr>, locals: &mut Vec<SExpr>) -> Vec<SExpr> {
    let is_local = head_equals("local");
    let mut kept = Vec::with_capacity(forms.len());
    for mut form in forms {
        if is_local(&form) {
            locals.push(form);
            continue;
        }
        if let Some(children) = form.items_mut() {
            let nested = std::mem::take(children);
            *children = strip_locals(nested, locals);
        }
        kept.push(form);
    }
    kept
}
