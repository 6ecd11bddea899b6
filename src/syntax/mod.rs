pub mod estree;

use crate::diagnostics::SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: SourceSpan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    Let,
    Const,
    Var,
}

impl DeclarationKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            DeclarationKind::Let => "let",
            DeclarationKind::Const => "const",
            DeclarationKind::Var => "var",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declarator {
    pub id: Node,
    pub init: Option<Node>,
    pub span: SourceSpan,
}

/// The closed set of source constructs the compiler understands. Every
/// variant names its ESTree counterpart in [`NodeKind::type_name`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Assignment {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    Binary {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    Block(Vec<Node>),
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    Conditional {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        test: Box<Node>,
    },
    ExpressionStatement(Box<Node>),
    For {
        init: Option<Box<Node>>,
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    FunctionDeclaration {
        name: String,
        params: Vec<Node>,
        body: Box<Node>,
    },
    Identifier(String),
    If {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
    },
    Literal {
        raw: String,
    },
    Return(Option<Box<Node>>),
    Update {
        operator: String,
        prefix: bool,
        argument: Box<Node>,
    },
    VariableDeclaration {
        kind: DeclarationKind,
        declarations: Vec<Declarator>,
    },
    While {
        test: Box<Node>,
        body: Box<Node>,
    },
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Assignment { .. } => "AssignmentExpression",
            NodeKind::Binary { .. } => "BinaryExpression",
            NodeKind::Block(_) => "BlockStatement",
            NodeKind::Call { .. } => "CallExpression",
            NodeKind::Conditional { .. } => "ConditionalExpression",
            NodeKind::DoWhile { .. } => "DoWhileStatement",
            NodeKind::ExpressionStatement(_) => "ExpressionStatement",
            NodeKind::For { .. } => "ForStatement",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::If { .. } => "IfStatement",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::Return(_) => "ReturnStatement",
            NodeKind::Update { .. } => "UpdateExpression",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::While { .. } => "WhileStatement",
        }
    }

    /// Expressions leave exactly one value behind; everything else is a
    /// statement and leaves none.
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::Assignment { .. }
                | NodeKind::Binary { .. }
                | NodeKind::Call { .. }
                | NodeKind::Conditional { .. }
                | NodeKind::Identifier(_)
                | NodeKind::Literal { .. }
                | NodeKind::Update { .. }
        )
    }
}

impl Node {
    pub fn new(kind: NodeKind, span: SourceSpan) -> Self {
        Node { kind, span }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// Span-less constructors for building trees by hand.
pub mod build {
    use super::{DeclarationKind, Declarator, Node, NodeKind};
    use crate::diagnostics::SourceSpan;

    fn node(kind: NodeKind) -> Node {
        Node::new(kind, SourceSpan::default())
    }

    pub fn ident(name: &str) -> Node {
        node(NodeKind::Identifier(name.to_string()))
    }

    pub fn num(value: i64) -> Node {
        node(NodeKind::Literal {
            raw: value.to_string(),
        })
    }

    pub fn literal(raw: &str) -> Node {
        node(NodeKind::Literal {
            raw: raw.to_string(),
        })
    }

    pub fn binary(operator: &str, left: Node, right: Node) -> Node {
        node(NodeKind::Binary {
            operator: operator.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn assign(operator: &str, target: Node, value: Node) -> Node {
        node(NodeKind::Assignment {
            operator: operator.to_string(),
            left: Box::new(target),
            right: Box::new(value),
        })
    }

    pub fn update(operator: &str, prefix: bool, argument: Node) -> Node {
        node(NodeKind::Update {
            operator: operator.to_string(),
            prefix,
            argument: Box::new(argument),
        })
    }

    pub fn call(callee: &str, arguments: Vec<Node>) -> Node {
        node(NodeKind::Call {
            callee: Box::new(ident(callee)),
            arguments,
        })
    }

    pub fn conditional(test: Node, consequent: Node, alternate: Node) -> Node {
        node(NodeKind::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    pub fn expr(expression: Node) -> Node {
        node(NodeKind::ExpressionStatement(Box::new(expression)))
    }

    pub fn block(body: Vec<Node>) -> Node {
        node(NodeKind::Block(body))
    }

    pub fn let_(name: &str, init: Option<Node>) -> Node {
        declare(DeclarationKind::Let, vec![(name, init)])
    }

    pub fn declare(kind: DeclarationKind, declarators: Vec<(&str, Option<Node>)>) -> Node {
        node(NodeKind::VariableDeclaration {
            kind,
            declarations: declarators
                .into_iter()
                .map(|(name, init)| Declarator {
                    id: ident(name),
                    init,
                    span: SourceSpan::default(),
                })
                .collect(),
        })
    }

    pub fn ret(argument: Option<Node>) -> Node {
        node(NodeKind::Return(argument.map(Box::new)))
    }

    pub fn if_(test: Node, consequent: Node, alternate: Option<Node>) -> Node {
        node(NodeKind::If {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    pub fn while_(test: Node, body: Node) -> Node {
        node(NodeKind::While {
            test: Box::new(test),
            body: Box::new(body),
        })
    }

    pub fn do_while(body: Node, test: Node) -> Node {
        node(NodeKind::DoWhile {
            body: Box::new(body),
            test: Box::new(test),
        })
    }

    pub fn for_(init: Option<Node>, test: Option<Node>, update: Option<Node>, body: Node) -> Node {
        node(NodeKind::For {
            init: init.map(Box::new),
            test: test.map(Box::new),
            update: update.map(Box::new),
            body: Box::new(body),
        })
    }

    pub fn function(name: &str, params: &[&str], body: Vec<Node>) -> Node {
        node(NodeKind::FunctionDeclaration {
            name: name.to_string(),
            params: params.iter().map(|param| ident(param)).collect(),
            body: Box::new(block(body)),
        })
    }
}
