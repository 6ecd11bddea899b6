//! The stack-machine tree the emitter produces: WebAssembly text forms with
//! optional symbolic labels on structured control constructs.

pub mod pattern;

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Atom {
    Symbol(String),
    Number(String),
    Name(String),
    Str(String),
    Depth(u32),
    /// Unresolved branch target.
    Label(String),
}

impl Atom {
    pub fn symbol(text: &str) -> Self {
        Atom::Symbol(text.to_string())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Symbol(text) | Atom::Number(text) => f.write_str(text),
            Atom::Name(name) => write!(f, "${name}"),
            Atom::Str(text) => {
                f.write_str("\"")?;
                for ch in text.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        ch => write!(f, "{ch}")?,
                    }
                }
                f.write_str("\"")
            }
            Atom::Depth(depth) => write!(f, "{depth}"),
            Atom::Label(label) => write!(f, "${label}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Block,
    Loop,
    If,
}

impl ControlKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ControlKind::Block => "block",
            ControlKind::Loop => "loop",
            ControlKind::If => "if",
        }
    }
}

/// A `block`, `loop` or `if`: the only forms a branch can target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Control {
    pub kind: ControlKind,
    pub label: Option<String>,
    pub items: Vec<SExpr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SExpr {
    Atom(Atom),
    List(Vec<SExpr>),
    Control(Control),
}

impl SExpr {
    pub fn symbol(text: &str) -> Self {
        SExpr::Atom(Atom::symbol(text))
    }

    pub fn name(name: &str) -> Self {
        SExpr::Atom(Atom::Name(name.to_string()))
    }

    pub fn number(raw: &str) -> Self {
        SExpr::Atom(Atom::Number(raw.to_string()))
    }

    pub fn string(text: &str) -> Self {
        SExpr::Atom(Atom::Str(text.to_string()))
    }

    pub fn form(tag: &str, items: Vec<SExpr>) -> Self {
        let mut list = Vec::with_capacity(items.len() + 1);
        list.push(SExpr::symbol(tag));
        list.extend(items);
        SExpr::List(list)
    }

    pub fn control(kind: ControlKind, items: Vec<SExpr>) -> Self {
        SExpr::Control(Control {
            kind,
            label: None,
            items,
        })
    }

    pub fn block(items: Vec<SExpr>) -> Self {
        SExpr::control(ControlKind::Block, items)
    }

    pub fn looped(items: Vec<SExpr>) -> Self {
        SExpr::control(ControlKind::Loop, items)
    }

    pub fn if_(items: Vec<SExpr>) -> Self {
        SExpr::control(ControlKind::If, items)
    }

    /// Only `block`, `loop` and `if` take a label; other forms are returned
    /// unchanged.
    pub fn labeled(mut self, name: &str) -> Self {
        if let SExpr::Control(control) = &mut self {
            control.label = Some(name.to_string());
        }
        self
    }

    pub fn result_i32() -> Self {
        SExpr::form("result", vec![SExpr::symbol("i32")])
    }

    pub fn i32_const(raw: &str) -> Self {
        SExpr::form("i32.const", vec![SExpr::number(raw)])
    }

    pub fn local(name: &str) -> Self {
        SExpr::form("local", vec![SExpr::name(name), SExpr::symbol("i32")])
    }

    pub fn local_get(name: &str) -> Self {
        SExpr::form("local.get", vec![SExpr::name(name)])
    }

    pub fn local_set(name: &str, value: SExpr) -> Self {
        SExpr::form("local.set", vec![SExpr::name(name), value])
    }

    pub fn drop(value: SExpr) -> Self {
        SExpr::form("drop", vec![value])
    }

    pub fn br(depth: u32) -> Self {
        SExpr::form("br", vec![SExpr::Atom(Atom::Depth(depth))])
    }

    pub fn br_to(label: &str) -> Self {
        SExpr::form("br", vec![SExpr::Atom(Atom::Label(label.to_string()))])
    }

    pub fn head(&self) -> Option<&str> {
        match self {
            SExpr::List(items) => match items.first() {
                Some(SExpr::Atom(Atom::Symbol(tag))) => Some(tag),
                _ => None,
            },
            SExpr::Control(control) => Some(control.kind.tag()),
            SExpr::Atom(_) => None,
        }
    }

    pub fn is_list(&self) -> bool {
        !matches!(self, SExpr::Atom(_))
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            SExpr::Control(control) => control.label.as_deref(),
            _ => None,
        }
    }

    // A plain list's head tag is a child atom; a control form's is implied.
    pub fn children(&self) -> &[SExpr] {
        match self {
            SExpr::Atom(_) => &[],
            SExpr::List(items) => items,
            SExpr::Control(control) => &control.items,
        }
    }

    pub fn children_mut(&mut self) -> &mut [SExpr] {
        match self {
            SExpr::Atom(_) => &mut [],
            SExpr::List(items) => items,
            SExpr::Control(control) => &mut control.items,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<SExpr>> {
        match self {
            SExpr::Atom(_) => None,
            SExpr::List(items) => Some(items),
            SExpr::Control(control) => Some(&mut control.items),
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Atom(atom) => write!(f, "{atom}"),
            SExpr::List(items) => {
                f.write_str("(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            SExpr::Control(control) => {
                write!(f, "({}", control.kind.tag())?;
                for item in &control.items {
                    write!(f, " {item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_fully_parenthesized() {
        let func = SExpr::form(
            "func",
            vec![
                SExpr::name("add"),
                SExpr::form("param", vec![SExpr::name("a"), SExpr::symbol("i32")]),
                SExpr::result_i32(),
                SExpr::form(
                    "i32.add",
                    vec![SExpr::local_get("a"), SExpr::i32_const("1")],
                ),
            ],
        );
        assert_eq!(
            func.to_string(),
            "(func $add (param $a i32) (result i32) (i32.add (local.get $a) (i32.const 1)))"
        );
    }

    #[test]
    fn labels_are_not_printed() {
        let body = SExpr::block(vec![SExpr::br(0)]).labeled("exit");
        assert_eq!(body.label(), Some("exit"));
        assert_eq!(body.to_string(), "(block (br 0))");
    }

    #[test]
    fn export_names_are_quoted() {
        let export = SExpr::form(
            "export",
            vec![
                SExpr::string("say \"hi\""),
                SExpr::form("func", vec![SExpr::name("hi")]),
            ],
        );
        assert_eq!(export.to_string(), r#"(export "say \"hi\"" (func $hi))"#);
    }

    #[test]
    fn head_covers_lists_and_control_forms() {
        assert_eq!(SExpr::drop(SExpr::i32_const("0")).head(), Some("drop"));
        assert_eq!(SExpr::looped(vec![]).head(), Some("loop"));
        assert_eq!(SExpr::name("x").head(), None);
        assert_eq!(SExpr::local_get("x").labeled("ignored").label(), None);
    }
}
