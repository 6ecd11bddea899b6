pub mod ancestry;
pub mod branch;
mod diagnostics;
pub mod emit;
pub mod hoist;
pub mod sexpr;
pub mod syntax;

pub use diagnostics::{Diagnostic, DiagnosticKind, SourceSpan};
pub use sexpr::SExpr;
pub use syntax::{Node, NodeKind};

/// Lowers one function declaration to a `func` form with its locals hoisted
/// and every branch target resolved to a depth.
pub fn compile_function(node: &Node) -> Result<SExpr, Diagnostic> {
    if !matches!(node.kind, NodeKind::FunctionDeclaration { .. }) {
        return Err(Diagnostic::shape(format!(
            "Expected a FunctionDeclaration, found {}",
            node.type_name()
        ))
        .with_span(node.span));
    }
    let mut forms = emit::emit(node)?;
    let mut func = match (forms.pop(), forms.is_empty()) {
        (Some(func), true) => func,
        _ => {
            return Err(Diagnostic::shape("Expected a function to emit a single func form")
                .with_span(node.span))
        }
    };
    hoist::hoist_locals(&mut func)?;
    branch::resolve_branches(&mut func)?;
    Ok(func)
}

/// Compiles each function independently and exports it under its own name.
pub fn compile_module(functions: &[Node]) -> Result<SExpr, Diagnostic> {
    let mut funcs = Vec::with_capacity(functions.len());
    let mut exports = Vec::with_capacity(functions.len());
    for function in functions {
        let NodeKind::FunctionDeclaration { name, .. } = &function.kind else {
            return Err(Diagnostic::shape(format!(
                "Only function declarations are supported at the top level, found {}",
                function.type_name()
            ))
            .with_span(function.span));
        };
        funcs.push(compile_function(function)?);
        exports.push(SExpr::form(
            "export",
            vec![
                SExpr::string(name),
                SExpr::form("func", vec![SExpr::name(name)]),
            ],
        ));
    }
    funcs.extend(exports);
    Ok(SExpr::form("module", funcs))
}

/// Reads an ESTree document and returns the module text.
pub fn compile_estree(json: &str) -> Result<String, Diagnostic> {
    let functions = syntax::estree::read_program(json)?;
    Ok(compile_module(&functions)?.to_string())
}

/// Assembles module text to a binary and validates it.
pub fn assemble(wat: &str) -> Result<Vec<u8>, Diagnostic> {
    let bytes = wat::parse_str(wat).map_err(|err| {
        Diagnostic::new(
            DiagnosticKind::Assembly,
            format!("Failed to assemble module: {err}"),
        )
    })?;
    wasmparser::Validator::new()
        .validate_all(&bytes)
        .map_err(|err| {
            Diagnostic::new(
                DiagnosticKind::Assembly,
                format!("Module failed validation: {err}"),
            )
        })?;
    Ok(bytes)
}
