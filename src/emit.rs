use std::collections::HashSet;

use crate::{
    ancestry::enclosing_function,
    diagnostics::Diagnostic,
    sexpr::SExpr,
    syntax::{Declarator, Node, NodeKind},
};

pub const RETURN_LABEL: &str = "return";
// `.` cannot appear in a source identifier.
pub const RETURN_LOCAL: &str = ".return";

pub fn binary_op(operator: &str) -> Option<&'static str> {
    let op = match operator {
        "+" => "i32.add",
        "-" => "i32.sub",
        "*" => "i32.mul",
        "/" => "i32.div_s",
        "%" => "i32.rem_s",
        "<" => "i32.lt_s",
        "<=" => "i32.le_s",
        ">" => "i32.gt_s",
        ">=" => "i32.ge_s",
        "==" | "===" => "i32.eq",
        "!=" | "!==" => "i32.ne",
        "&" => "i32.and",
        "|" => "i32.or",
        "^" => "i32.xor",
        "<<" => "i32.shl",
        ">>" => "i32.shr_s",
        ">>>" => "i32.shr_u",
        _ => return None,
    };
    Some(op)
}

/// Lowers one source node. Expressions produce exactly one form; statements
/// produce any number of stack-neutral forms.
///
/// Every local shares one function-wide scope in the output, so a name may be
/// declared once per function.
pub fn emit(node: &Node) -> Result<Vec<SExpr>, Diagnostic> {
    Emitter::new().emit(node)
}

#[derive(Default)]
pub struct Emitter<'a> {
    path: Vec<&'a Node>,
    declared: HashSet<String>,
}

impl<'a> Emitter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, node: &'a Node) -> Result<Vec<SExpr>, Diagnostic> {
        self.path.push(node);
        let result = self.lower(node);
        self.path.pop();
        result
    }

    fn ancestors(&self) -> &[&'a Node] {
        &self.path[..self.path.len().saturating_sub(1)]
    }

    pub fn emit_expression(&mut self, node: &'a Node) -> Result<SExpr, Diagnostic> {
        if !node.kind.is_expression() {
            return Err(Diagnostic::shape(format!(
                "{} cannot be used as a value",
                node.type_name()
            ))
            .with_span(node.span));
        }
        let mut forms = self.emit(node)?;
        match forms.len() {
            1 => Ok(forms.remove(0)),
            count => Err(Diagnostic::shape(format!(
                "Expected {} to emit 1 statement, but it emitted {count} instead",
                node.type_name()
            ))
            .with_span(node.span)),
        }
    }

    pub fn emit_statement(&mut self, node: &'a Node) -> Result<Vec<SExpr>, Diagnostic> {
        if node.kind.is_expression() {
            return Err(Diagnostic::shape(format!(
                "{} in statement position must be wrapped in an ExpressionStatement",
                node.type_name()
            ))
            .with_span(node.span));
        }
        self.emit(node)
    }

    fn declare(&mut self, id: &Node, name: &str) -> Result<(), Diagnostic> {
        let name = wat_name(id, name)?;
        if !self.declared.insert(name.to_string()) {
            return Err(Diagnostic::shape(format!(
                "`{name}` is declared more than once in this function"
            ))
            .with_span(id.span));
        }
        Ok(())
    }

    fn lower(&mut self, node: &'a Node) -> Result<Vec<SExpr>, Diagnostic> {
        match &node.kind {
            NodeKind::FunctionDeclaration { name, params, body } => {
                if enclosing_function(self.ancestors()).is_some() {
                    return Err(Diagnostic::shape(format!(
                        "Nested function declaration `{name}` is not supported"
                    ))
                    .with_span(node.span));
                }
                self.declared.clear();
                let mut form = vec![SExpr::name(wat_name(node, name)?)];
                for param in params {
                    let param_name = param.as_identifier().ok_or_else(|| {
                        Diagnostic::shape(format!(
                            "Only identifier parameters are supported, found {}",
                            param.type_name()
                        ))
                        .with_span(param.span)
                    })?;
                    self.declare(param, param_name)?;
                    form.push(SExpr::form(
                        "param",
                        vec![SExpr::name(param_name), SExpr::symbol("i32")],
                    ));
                }
                form.push(SExpr::result_i32());
                form.push(SExpr::local(RETURN_LOCAL));
                let body = self.emit_statement(body)?;
                form.push(SExpr::block(body).labeled(RETURN_LABEL));
                form.push(SExpr::local_get(RETURN_LOCAL));
                Ok(vec![SExpr::form("func", form)])
            }
            NodeKind::Block(statements) => {
                let mut forms = Vec::new();
                for statement in statements {
                    forms.extend(self.emit_statement(statement)?);
                }
                Ok(forms)
            }
            NodeKind::VariableDeclaration { declarations, .. } => {
                let declarator = single_declarator(node, declarations)?;
                let name = declarator.id.as_identifier().ok_or_else(|| {
                    Diagnostic::shape(format!(
                        "Only identifier declarations are supported, found {}",
                        declarator.id.type_name()
                    ))
                    .with_span(declarator.id.span)
                })?;
                self.declare(&declarator.id, name)?;
                let mut forms = vec![SExpr::local(name)];
                if let Some(init) = &declarator.init {
                    forms.push(SExpr::local_set(name, self.emit_expression(init)?));
                }
                Ok(forms)
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let op = binary_op(operator).ok_or_else(|| {
                    Diagnostic::unsupported(format!("Unrecognized operator '{operator}'"))
                        .with_span(node.span)
                })?;
                let left = self.emit_expression(left)?;
                let right = self.emit_expression(right)?;
                Ok(vec![SExpr::form(op, vec![left, right])])
            }
            NodeKind::Identifier(name) => Ok(vec![SExpr::local_get(wat_name(node, name)?)]),
            NodeKind::Literal { raw } => {
                let text = integer_literal_text(raw).ok_or_else(|| {
                    Diagnostic::unsupported(format!("Unsupported literal `{raw}`"))
                        .with_span(node.span)
                })?;
                Ok(vec![SExpr::i32_const(&text)])
            }
            NodeKind::Return(argument) => {
                if enclosing_function(self.ancestors()).is_none() {
                    return Err(Diagnostic::shape("`return` outside of a function")
                        .with_span(node.span));
                }
                let value = match argument {
                    Some(argument) => self.emit_expression(argument)?,
                    None => SExpr::i32_const("0"),
                };
                Ok(vec![
                    SExpr::local_set(RETURN_LOCAL, value),
                    SExpr::br_to(RETURN_LABEL),
                ])
            }
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                let mut items = vec![
                    self.emit_expression(test)?,
                    SExpr::form("then", self.emit_statement(consequent)?),
                ];
                if let Some(alternate) = alternate {
                    items.push(SExpr::form("else", self.emit_statement(alternate)?));
                }
                Ok(vec![SExpr::if_(items)])
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => Ok(vec![SExpr::if_(vec![
                SExpr::result_i32(),
                self.emit_expression(test)?,
                SExpr::form("then", vec![self.emit_expression(consequent)?]),
                SExpr::form("else", vec![self.emit_expression(alternate)?]),
            ])]),
            NodeKind::While { test, body } => {
                let exit = exit_unless(self.emit_expression(test)?);
                let mut looped = vec![exit];
                looped.extend(self.emit_statement(body)?);
                looped.push(SExpr::br(0));
                Ok(vec![SExpr::block(vec![SExpr::looped(looped)])])
            }
            NodeKind::DoWhile { body, test } => {
                let mut looped = self.emit_statement(body)?;
                looped.push(exit_unless(self.emit_expression(test)?));
                looped.push(SExpr::br(0));
                Ok(vec![SExpr::block(vec![SExpr::looped(looped)])])
            }
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => {
                let mut outer = Vec::new();
                if let Some(init) = init {
                    if init.kind.is_expression() {
                        outer.push(SExpr::drop(self.emit_expression(init)?));
                    } else {
                        outer.extend(self.emit_statement(init)?);
                    }
                }
                let test = match test {
                    Some(test) => self.emit_expression(test)?,
                    None => SExpr::i32_const("1"),
                };
                let mut then = self.emit_statement(body)?;
                if let Some(update) = update {
                    then.push(SExpr::drop(self.emit_expression(update)?));
                }
                then.push(SExpr::br(1));
                outer.push(SExpr::looped(vec![SExpr::if_(vec![
                    test,
                    SExpr::form("then", then),
                    SExpr::form("else", vec![SExpr::br(2)]),
                ])]));
                Ok(vec![SExpr::block(outer)])
            }
            NodeKind::Assignment {
                operator,
                left,
                right,
            } => {
                let name = assignment_target(left)?;
                let value = self.emit_expression(right)?;
                let value = if operator == "=" {
                    value
                } else {
                    let op = operator
                        .strip_suffix('=')
                        .and_then(binary_op)
                        .ok_or_else(|| {
                            Diagnostic::unsupported(format!(
                                "Don't know what to do with {operator}"
                            ))
                            .with_span(node.span)
                        })?;
                    SExpr::form(op, vec![SExpr::local_get(name), value])
                };
                Ok(vec![SExpr::block(vec![
                    SExpr::result_i32(),
                    SExpr::local_set(name, value),
                    SExpr::local_get(name),
                ])])
            }
            NodeKind::Update {
                operator,
                prefix,
                argument,
            } => {
                let op = match operator.as_str() {
                    "++" => "i32.add",
                    "--" => "i32.sub",
                    other => {
                        return Err(Diagnostic::unsupported(format!(
                            "Unrecognized update operator '{other}'"
                        ))
                        .with_span(node.span))
                    }
                };
                let name = assignment_target(argument)?;
                let write = SExpr::local_set(
                    name,
                    SExpr::form(op, vec![SExpr::local_get(name), SExpr::i32_const("1")]),
                );
                // Postfix leaves the old value on the stack before writing.
                let items = if *prefix {
                    vec![SExpr::result_i32(), write, SExpr::local_get(name)]
                } else {
                    vec![SExpr::result_i32(), SExpr::local_get(name), write]
                };
                Ok(vec![SExpr::block(items)])
            }
            NodeKind::ExpressionStatement(expression) => {
                Ok(vec![SExpr::drop(self.emit_expression(expression)?)])
            }
            NodeKind::Call { callee, arguments } => {
                let name = callee.as_identifier().ok_or_else(|| {
                    Diagnostic::shape(format!(
                        "Only calls to named functions are supported, found {} callee",
                        callee.type_name()
                    ))
                    .with_span(callee.span)
                })?;
                let mut items = vec![SExpr::name(wat_name(callee, name)?)];
                for argument in arguments {
                    items.push(self.emit_expression(argument)?);
                }
                Ok(vec![SExpr::form("call", items)])
            }
        }
    }
}

/// Leaves the enclosing `block`/`loop` pair when `test` is false.
fn exit_unless(test: SExpr) -> SExpr {
    SExpr::if_(vec![
        SExpr::form("i32.eqz", vec![test]),
        SExpr::form("then", vec![SExpr::br(2)]),
    ])
}

fn single_declarator<'n>(
    node: &Node,
    declarations: &'n [Declarator],
) -> Result<&'n Declarator, Diagnostic> {
    match declarations {
        [declarator] => Ok(declarator),
        _ => Err(Diagnostic::shape(format!(
            "Only single-variable declarations are supported, found {} declarators",
            declarations.len()
        ))
        .with_span(node.span)),
    }
}

fn assignment_target(target: &Node) -> Result<&str, Diagnostic> {
    let name = target.as_identifier().ok_or_else(|| {
        Diagnostic::shape(format!(
            "Only identifier assignment targets are supported, found {}",
            target.type_name()
        ))
        .with_span(target.span)
    })?;
    wat_name(target, name)
}

/// `name` as a `$` reference in module text. The text format only allows
/// printable ASCII in names, while source identifiers may use any letter.
fn wat_name<'n>(node: &Node, name: &'n str) -> Result<&'n str, Diagnostic> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-./:<=>?@\\^_`|~".contains(c));
    if valid {
        Ok(name)
    } else {
        Err(Diagnostic::unsupported(format!(
            "Identifier `{name}` cannot be written as a module name"
        ))
        .with_span(node.span))
    }
}

/// `None` for anything that is not an integer in 32 bits.
fn integer_literal_text(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| *c != '_').collect();
    let (body, radix) = match digits.get(..2) {
        Some("0x") | Some("0X") => (&digits[2..], 16),
        Some("0o") | Some("0O") => (&digits[2..], 8),
        Some("0b") | Some("0B") => (&digits[2..], 2),
        _ => (digits.as_str(), 10),
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    // Legacy octal (`010`) means something else in the source language.
    if radix == 10 && body.len() > 1 && body.starts_with('0') {
        return None;
    }
    let value = u64::from_str_radix(body, radix).ok()?;
    if value > u64::from(u32::MAX) {
        return None;
    }
    if radix == 10 {
        Some(raw.to_string())
    } else {
        Some(value.to_string())
    }
}
