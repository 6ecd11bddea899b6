use estree_wat::syntax::estree::read_program;
use estree_wat::{assemble, compile_estree, DiagnosticKind, NodeKind};
use wasmparser::{Parser, Payload};

fn exports(wasm: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    for payload in Parser::new(0).parse_all(wasm) {
        if let Payload::ExportSection(section) = payload.expect("failed to parse wasm payload") {
            for export in section {
                names.push(export.expect("invalid export entry").name.to_string());
            }
        }
    }
    names
}

#[test]
fn factorial_fixture_compiles() {
    let json = include_str!("../fixtures/factorial.json");
    let source = include_str!("../fixtures/factorial.js");
    let wat = compile_estree(json).unwrap_or_else(|err| panic!("{}", err.render_with_source(source)));
    assert_eq!(
        wat,
        "(module (func $factorial (param $n i32) (result i32) \
         (local $.return i32) (local $result i32) (local $i i32) \
         (block (local.set $result (i32.const 1)) \
         (block (local.set $i (i32.const 1)) \
         (loop (if (i32.le_s (local.get $i) (local.get $n)) \
         (then (drop (block (result i32) (local.set $result (i32.mul (local.get $result) (local.get $i))) (local.get $result))) \
         (drop (block (result i32) (local.set $i (i32.add (local.get $i) (i32.const 1))) (local.get $i))) \
         (br 1)) \
         (else (br 2))))) \
         (local.set $.return (local.get $result)) (br 0)) \
         (local.get $.return)) \
         (export \"factorial\" (func $factorial)))"
    );
    let wasm = assemble(&wat).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(exports(&wasm), vec!["factorial"]);
}

#[test]
fn fibonacci_fixture_compiles() {
    let json = include_str!("../fixtures/fibonacci.json");
    let source = include_str!("../fixtures/fibonacci.js");
    let wat = compile_estree(json).unwrap_or_else(|err| panic!("{}", err.render_with_source(source)));
    assert!(
        wat.contains("(if (result i32) (i32.lt_s (local.get $n) (i32.const 3))"),
        "{wat}"
    );
    assert!(wat.contains("(call $fib (i32.sub (local.get $n) (i32.const 2)))"), "{wat}");
    let wasm = assemble(&wat).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(exports(&wasm), vec!["fib"]);
}

#[test]
fn fixture_spans_follow_the_source() {
    let json = include_str!("../fixtures/factorial.json");
    let source = include_str!("../fixtures/factorial.js");
    let program = read_program(json).expect("fixture reads");
    let NodeKind::FunctionDeclaration { body, .. } = &program[0].kind else {
        panic!("expected a function declaration");
    };
    let NodeKind::Block(statements) = &body.kind else {
        panic!("expected a block body");
    };
    let texts: Vec<&str> = statements
        .iter()
        .map(|statement| &source[statement.span.start()..statement.span.end()])
        .collect();
    assert_eq!(texts[0], "let result = 1;");
    assert!(texts[1].starts_with("for (let i = 1; i <= n; ++i) {"));
    assert_eq!(texts[2], "return result;");
}

#[test]
fn unsupported_node_points_at_source() {
    let json = include_str!("../fixtures/logical.json");
    let source = include_str!("../fixtures/logical.js");
    let err = compile_estree(json).expect_err("logical operators are not lowered");
    assert_eq!(err.kind, DiagnosticKind::UnsupportedConstruct);
    assert_eq!(
        err.render_with_source(source),
        "Don't know about type LogicalExpression\n \
         --> line 2, column 10\n   \
         |\n \
         2 |   return a && b;\n   \
         |          ^^^^^^"
    );
}

#[test]
fn malformed_documents_are_reported() {
    let err = compile_estree("{ \"type\": ").expect_err("truncated JSON");
    assert_eq!(err.kind, DiagnosticKind::MalformedInput);

    let err = compile_estree(r#"{ "type": "Program", "body": [ { "type": "ReturnStatement" } ] }"#)
        .expect_err("return at top level");
    assert_eq!(err.kind, DiagnosticKind::ShapeViolation);
}
