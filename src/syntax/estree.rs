//! Reads ESTree JSON, as produced by acorn, into [`Node`] trees.

use serde::Deserialize;
use serde_json::Value;

use super::{DeclarationKind, Declarator, Node, NodeKind};
use crate::diagnostics::{Diagnostic, SourceSpan};

#[derive(Debug, Deserialize)]
struct NodeHeader {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    end: Option<usize>,
}

impl NodeHeader {
    fn span(&self) -> SourceSpan {
        match (self.start, self.end) {
            (Some(start), Some(end)) => SourceSpan::from_bounds(start, end),
            (Some(start), None) => SourceSpan::new(start, 0),
            _ => SourceSpan::default(),
        }
    }
}

struct Fields<'a> {
    header: NodeHeader,
    value: &'a Value,
}

impl<'a> Fields<'a> {
    fn read(value: &'a Value) -> Result<Self, Diagnostic> {
        let header = NodeHeader::deserialize(value)
            .map_err(|err| Diagnostic::malformed(format!("Expected an ESTree node: {err}")))?;
        Ok(Fields { header, value })
    }

    fn span(&self) -> SourceSpan {
        self.header.span()
    }

    fn missing(&self, field: &str, expected: &str) -> Diagnostic {
        Diagnostic::malformed(format!(
            "{} is missing {expected} field `{field}`",
            self.header.kind
        ))
        .with_span(self.span())
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        match self.value.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn node(&self, field: &str) -> Result<Node, Diagnostic> {
        let value = self.get(field).ok_or_else(|| self.missing(field, "node"))?;
        read_node(value)
    }

    fn optional_node(&self, field: &str) -> Result<Option<Node>, Diagnostic> {
        self.get(field).map(read_node).transpose()
    }

    fn boxed(&self, field: &str) -> Result<Box<Node>, Diagnostic> {
        self.node(field).map(Box::new)
    }

    fn optional_boxed(&self, field: &str) -> Result<Option<Box<Node>>, Diagnostic> {
        Ok(self.optional_node(field)?.map(Box::new))
    }

    fn list(&self, field: &str) -> Result<&'a Vec<Value>, Diagnostic> {
        match self.get(field) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(self.missing(field, "array")),
        }
    }

    fn nodes(&self, field: &str) -> Result<Vec<Node>, Diagnostic> {
        self.list(field)?.iter().map(read_node).collect()
    }

    fn string(&self, field: &str) -> Result<String, Diagnostic> {
        self.get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.missing(field, "string"))
    }

    fn boolean(&self, field: &str) -> Result<bool, Diagnostic> {
        self.get(field)
            .and_then(Value::as_bool)
            .ok_or_else(|| self.missing(field, "boolean"))
    }
}

/// Reads a whole document. A `Program` yields its top-level statements; any
/// other node is returned on its own.
pub fn read_program(json: &str) -> Result<Vec<Node>, Diagnostic> {
    let value: Value = serde_json::from_str(json)
        .map_err(|err| Diagnostic::malformed(format!("Invalid ESTree JSON: {err}")))?;
    let fields = Fields::read(&value)?;
    if fields.header.kind == "Program" {
        fields.nodes("body")
    } else {
        Ok(vec![read_node(&value)?])
    }
}

pub fn read_node(value: &Value) -> Result<Node, Diagnostic> {
    let fields = Fields::read(value)?;
    let span = fields.span();
    let kind = match fields.header.kind.as_str() {
        "AssignmentExpression" => NodeKind::Assignment {
            operator: fields.string("operator")?,
            left: fields.boxed("left")?,
            right: fields.boxed("right")?,
        },
        "BinaryExpression" => NodeKind::Binary {
            operator: fields.string("operator")?,
            left: fields.boxed("left")?,
            right: fields.boxed("right")?,
        },
        "BlockStatement" => NodeKind::Block(fields.nodes("body")?),
        "CallExpression" => NodeKind::Call {
            callee: fields.boxed("callee")?,
            arguments: fields.nodes("arguments")?,
        },
        "ConditionalExpression" => NodeKind::Conditional {
            test: fields.boxed("test")?,
            consequent: fields.boxed("consequent")?,
            alternate: fields.boxed("alternate")?,
        },
        "DoWhileStatement" => NodeKind::DoWhile {
            body: fields.boxed("body")?,
            test: fields.boxed("test")?,
        },
        "ExpressionStatement" => NodeKind::ExpressionStatement(fields.boxed("expression")?),
        "ForStatement" => NodeKind::For {
            init: fields.optional_boxed("init")?,
            test: fields.optional_boxed("test")?,
            update: fields.optional_boxed("update")?,
            body: fields.boxed("body")?,
        },
        "FunctionDeclaration" => {
            let id = fields.node("id")?;
            let name = id
                .as_identifier()
                .ok_or_else(|| fields.missing("id", "identifier"))?
                .to_string();
            NodeKind::FunctionDeclaration {
                name,
                params: fields.nodes("params")?,
                body: fields.boxed("body")?,
            }
        }
        "Identifier" => NodeKind::Identifier(fields.string("name")?),
        "IfStatement" => NodeKind::If {
            test: fields.boxed("test")?,
            consequent: fields.boxed("consequent")?,
            alternate: fields.optional_boxed("alternate")?,
        },
        "Literal" => NodeKind::Literal {
            raw: fields.string("raw")?,
        },
        "ReturnStatement" => NodeKind::Return(fields.optional_boxed("argument")?),
        "UpdateExpression" => NodeKind::Update {
            operator: fields.string("operator")?,
            prefix: fields.boolean("prefix")?,
            argument: fields.boxed("argument")?,
        },
        "VariableDeclaration" => {
            let kind = match fields.string("kind")?.as_str() {
                "let" => DeclarationKind::Let,
                "const" => DeclarationKind::Const,
                "var" => DeclarationKind::Var,
                other => {
                    return Err(Diagnostic::unsupported(format!(
                        "Unsupported declaration kind `{other}`"
                    ))
                    .with_span(span))
                }
            };
            let declarations = fields
                .list("declarations")?
                .iter()
                .map(read_declarator)
                .collect::<Result<Vec<_>, _>>()?;
            NodeKind::VariableDeclaration { kind, declarations }
        }
        "WhileStatement" => NodeKind::While {
            test: fields.boxed("test")?,
            body: fields.boxed("body")?,
        },
        other => {
            return Err(
                Diagnostic::unsupported(format!("Don't know about type {other}")).with_span(span),
            )
        }
    };
    Ok(Node::new(kind, span))
}

fn read_declarator(value: &Value) -> Result<Declarator, Diagnostic> {
    let fields = Fields::read(value)?;
    if fields.header.kind != "VariableDeclarator" {
        return Err(Diagnostic::malformed(format!(
            "Expected VariableDeclarator, found {}",
            fields.header.kind
        ))
        .with_span(fields.span()));
    }
    Ok(Declarator {
        id: fields.node("id")?,
        init: fields.optional_node("init")?,
        span: fields.span(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::syntax::build;

    #[test]
    fn reads_function_with_spans() {
        let json = r#"{
            "type": "FunctionDeclaration", "start": 0, "end": 30,
            "id": { "type": "Identifier", "start": 9, "end": 11, "name": "id" },
            "params": [{ "type": "Identifier", "start": 12, "end": 13, "name": "x" }],
            "body": { "type": "BlockStatement", "start": 15, "end": 30, "body": [
                { "type": "ReturnStatement", "start": 17, "end": 26,
                  "argument": { "type": "Identifier", "start": 24, "end": 25, "name": "x" } }
            ] }
        }"#;
        let nodes = read_program(json).expect("function should read");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].span, SourceSpan::new(0, 30));
        match &nodes[0].kind {
            NodeKind::FunctionDeclaration { name, params, body } => {
                assert_eq!(name, "id");
                assert_eq!(params, &vec![Node::new(
                    NodeKind::Identifier("x".to_string()),
                    SourceSpan::new(12, 1)
                )]);
                assert_eq!(body.span, SourceSpan::new(15, 15));
            }
            other => panic!("expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn null_slots_read_as_absent() {
        let json = r#"{
            "type": "ForStatement", "init": null, "test": null, "update": null,
            "body": { "type": "BlockStatement", "body": [] }
        }"#;
        let nodes = read_program(json).expect("for statement should read");
        assert_eq!(
            nodes[0].kind,
            build::for_(None, None, None, build::block(vec![])).kind
        );
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let json = r#"{ "type": "MemberExpression", "start": 4, "end": 7 }"#;
        let err = read_program(json).expect_err("member expressions are not supported");
        assert_eq!(err.kind, DiagnosticKind::UnsupportedConstruct);
        assert_eq!(err.message, "Don't know about type MemberExpression");
        assert_eq!(err.span, Some(SourceSpan::new(4, 3)));
    }

    #[test]
    fn missing_field_is_malformed() {
        let json = r#"{ "type": "BinaryExpression", "operator": "+",
            "left": { "type": "Identifier", "name": "a" } }"#;
        let err = read_program(json).expect_err("right operand is missing");
        assert_eq!(err.kind, DiagnosticKind::MalformedInput);
        assert!(err.message.contains("`right`"), "{}", err.message);
    }
}
