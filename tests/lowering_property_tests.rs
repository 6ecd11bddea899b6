use estree_wat::branch::{resolve_branches, symbolic_branches};
use estree_wat::emit::{emit, RETURN_LABEL};
use estree_wat::hoist::{hoist_locals, local_declarations};
use estree_wat::sexpr::pattern::walk;
use estree_wat::sexpr::{Atom, SExpr};
use estree_wat::syntax::build::*;
use estree_wat::{compile_function, DiagnosticKind, Node};

/// Whether a lowered form leaves a value on the stack.
fn leaves_value(form: &SExpr) -> bool {
    match form {
        SExpr::Control(control) => control.items.first().map(is_result) == Some(true),
        _ => !matches!(
            form.head(),
            Some("local") | Some("local.set") | Some("drop") | Some("br")
        ),
    }
}

fn is_result(item: &SExpr) -> bool {
    item.head() == Some("result")
}

/// Every statement-position form below `form` is stack-neutral.
fn assert_neutral(form: &SExpr) {
    assert!(!leaves_value(form), "`{form}` leaves a value");
    let SExpr::Control(control) = form else {
        return;
    };
    let arms: Vec<&SExpr> = match form.head() {
        Some("if") => control
            .items
            .iter()
            .filter(|item| matches!(item.head(), Some("then") | Some("else")))
            .flat_map(|arm| arm.children().iter().skip(1))
            .collect(),
        _ => control.items.iter().collect(),
    };
    for statement in arms {
        assert_neutral(statement);
    }
}

fn statements() -> Vec<Node> {
    vec![
        let_("x", Some(num(1))),
        let_("y", None),
        expr(assign("+=", ident("x"), num(2))),
        expr(update("--", false, ident("x"))),
        expr(call("f", vec![ident("x")])),
        if_(
            ident("x"),
            block(vec![expr(assign("=", ident("y"), num(1)))]),
            Some(block(vec![let_("z", Some(num(3)))])),
        ),
        while_(
            binary("<", ident("x"), num(10)),
            block(vec![expr(update("++", true, ident("x")))]),
        ),
        do_while(
            block(vec![expr(update("++", true, ident("x")))]),
            binary("<", ident("x"), num(10)),
        ),
        for_(
            Some(let_("i", Some(num(0)))),
            Some(binary("<", ident("i"), num(3))),
            Some(update("++", false, ident("i"))),
            block(vec![expr(assign("*=", ident("x"), num(2)))]),
        ),
        for_(None, None, None, block(vec![])),
        block(vec![let_("w", Some(num(0))), expr(ident("w"))]),
    ]
}

fn expressions() -> Vec<Node> {
    vec![
        num(7),
        ident("x"),
        binary("^", ident("x"), num(255)),
        assign("=", ident("x"), num(2)),
        assign("<<=", ident("x"), num(1)),
        update("++", true, ident("x")),
        update("--", false, ident("x")),
        conditional(ident("c"), num(1), binary("+", ident("x"), num(1))),
        call("g", vec![num(1), call("h", vec![])]),
    ]
}

#[test]
fn statements_are_stack_neutral() {
    for statement in statements() {
        let forms = emit(&statement).unwrap_or_else(|err| panic!("{err}"));
        for form in &forms {
            assert_neutral(form);
        }
    }
}

#[test]
fn expressions_emit_one_value() {
    for expression in expressions() {
        let forms = emit(&expression).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(forms.len(), 1, "{:?}", expression.kind);
        assert!(leaves_value(&forms[0]), "`{}` leaves no value", forms[0]);
    }
}

fn sample_function() -> Node {
    function(
        "sample",
        &["n"],
        vec![
            let_("total", Some(num(0))),
            for_(
                Some(let_("i", Some(num(0)))),
                Some(binary("<", ident("i"), ident("n"))),
                Some(update("++", true, ident("i"))),
                block(vec![
                    let_("square", Some(binary("*", ident("i"), ident("i")))),
                    if_(
                        binary(">", ident("square"), num(100)),
                        block(vec![ret(Some(ident("total")))]),
                        Some(block(vec![expr(assign(
                            "+=",
                            ident("total"),
                            ident("square"),
                        ))])),
                    ),
                ]),
            ),
            while_(
                ident("n"),
                block(vec![
                    let_("step", Some(num(1))),
                    expr(assign("-=", ident("n"), ident("step"))),
                    do_while(block(vec![ret(None)]), num(0)),
                ]),
            ),
            ret(Some(ident("total"))),
        ],
    )
}

fn local_names(func: &SExpr) -> Vec<String> {
    local_declarations(func)
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn hoisting_keeps_discovery_order_and_is_idempotent() {
    let mut forms = emit(&sample_function()).expect("sample lowers");
    let mut func = forms.remove(0);
    let discovered = local_names(&func);
    assert_eq!(
        discovered,
        vec![
            "(local $.return i32)",
            "(local $total i32)",
            "(local $i i32)",
            "(local $square i32)",
            "(local $step i32)",
        ]
    );

    hoist_locals(&mut func).expect("func form");
    assert_eq!(local_names(&func), discovered);
    let leading: Vec<String> = func.children()[4..9]
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(leading, discovered);

    let mut again = func.clone();
    hoist_locals(&mut again).expect("func form");
    assert_eq!(again, func);
}

#[test]
fn every_branch_resolves_to_its_labeled_target() {
    let mut forms = emit(&sample_function()).expect("sample lowers");
    let mut func = forms.remove(0);
    hoist_locals(&mut func).expect("func form");

    let mut targets = Vec::new();
    walk(&func, &mut |node: &SExpr, _: &[&SExpr]| {
        if node.head() == Some("br") {
            targets.push(match node.children().get(1) {
                Some(SExpr::Atom(Atom::Label(label))) => Some(label.clone()),
                _ => None,
            });
        }
    });
    assert_eq!(targets.iter().filter(|target| target.is_some()).count(), 3);

    resolve_branches(&mut func).expect("every label is in scope");
    assert!(symbolic_branches(&func).is_empty());

    let mut resolved = Vec::new();
    walk(&func, &mut |node: &SExpr, ancestors: &[&SExpr]| {
        if node.head() != Some("br") {
            return;
        }
        let Some(SExpr::Atom(Atom::Depth(depth))) = node.children().get(1) else {
            panic!("`{node}` still has a symbolic target");
        };
        let target = ancestors
            .iter()
            .rev()
            .filter(|ancestor| matches!(ancestor, SExpr::Control(_)))
            .nth(*depth as usize)
            .unwrap_or_else(|| panic!("`{node}` branches out of the function"));
        resolved.push(target.label().map(str::to_string));
    });
    assert_eq!(resolved.len(), targets.len());
    for (before, after) in targets.iter().zip(&resolved) {
        if let Some(label) = before {
            assert_eq!(after.as_deref(), Some(label.as_str()));
            assert_eq!(label, RETURN_LABEL);
        }
    }
}

#[test]
fn unmatched_label_aborts_without_output() {
    let mut tree = SExpr::form(
        "func",
        vec![
            SExpr::name("broken"),
            SExpr::result_i32(),
            SExpr::block(vec![SExpr::looped(vec![SExpr::br_to("missing")])]).labeled("exit"),
            SExpr::i32_const("0"),
        ],
    );
    let before = tree.clone();
    let err = resolve_branches(&mut tree).expect_err("label is not in scope");
    assert_eq!(err.kind, DiagnosticKind::UnresolvedBranch);
    assert!(err.message.contains("unmatched label"), "{}", err.message);
    assert_eq!(tree, before);
}

#[test]
fn compiled_function_has_no_symbolic_branches() {
    let func = compile_function(&sample_function()).unwrap_or_else(|err| panic!("{err}"));
    assert!(symbolic_branches(&func).is_empty());
    assert_eq!(func.head(), Some("func"));
    assert_eq!(
        func.children().last().map(ToString::to_string).as_deref(),
        Some("(local.get $.return)")
    );
}

#[test]
fn compile_function_rejects_other_nodes() {
    let err = compile_function(&block(vec![])).expect_err("not a function");
    assert_eq!(err.kind, DiagnosticKind::ShapeViolation);
    assert_eq!(err.message, "Expected a FunctionDeclaration, found BlockStatement");
}
