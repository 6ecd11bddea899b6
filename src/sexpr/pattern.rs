//! Structural predicates and walks over [`SExpr`] trees.

use super::{Atom, SExpr};

pub type Predicate = Box<dyn Fn(&SExpr) -> bool>;

// Control forms have no tag atom, so position 0 comes from the kind.
enum Element<'a> {
    Tag(&'static str),
    Node(&'a SExpr),
}

impl Element<'_> {
    fn equals(&self, value: &Atom) -> bool {
        match (self, value) {
            (Element::Tag(tag), Atom::Symbol(symbol)) => *tag == symbol.as_str(),
            (Element::Tag(_), _) => false,
            (Element::Node(SExpr::Atom(atom)), value) => atom == value,
            (Element::Node(_), _) => false,
        }
    }
}

fn element(node: &SExpr, n: usize) -> Option<Element<'_>> {
    match node {
        SExpr::Atom(_) => None,
        SExpr::List(items) => items.get(n).map(Element::Node),
        SExpr::Control(control) => match n {
            0 => Some(Element::Tag(control.kind.tag())),
            n => control.items.get(n - 1).map(Element::Node),
        },
    }
}

pub fn nth_equals(n: usize, value: Atom) -> Predicate {
    Box::new(move |node: &SExpr| {
        element(node, n).is_some_and(|element| element.equals(&value))
    })
}

pub fn head_equals(tag: &str) -> Predicate {
    nth_equals(0, Atom::symbol(tag))
}

pub fn and(conditions: Vec<Predicate>) -> Predicate {
    Box::new(move |node: &SExpr| conditions.iter().all(|condition| condition(node)))
}

pub fn when<'a, C, T>(condition: C, mut then: T) -> impl FnMut(&'a SExpr, &[&'a SExpr])
where
    C: Fn(&SExpr) -> bool,
    T: FnMut(&'a SExpr, &[&'a SExpr]),
{
    move |node: &'a SExpr, ancestors: &[&'a SExpr]| {
        if condition(node) {
            then(node, ancestors);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Any,
    Atom(Atom),
    List(Vec<Pattern>),
}

impl Pattern {
    pub fn symbol(text: &str) -> Self {
        Pattern::Atom(Atom::symbol(text))
    }
}

/// Structural match. `Pattern::Any` matches anything, including a missing
/// position; a list pattern constrains only the positions it names.
pub fn matches(node: &SExpr, pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Any => true,
        Pattern::Atom(atom) => matches!(node, SExpr::Atom(candidate) if candidate == atom),
        Pattern::List(patterns) => {
            if !node.is_list() {
                return false;
            }
            patterns
                .iter()
                .enumerate()
                .all(|(index, pattern)| match (element(node, index), pattern) {
                    (_, Pattern::Any) => true,
                    (None, _) => false,
                    (Some(Element::Tag(tag)), Pattern::Atom(Atom::Symbol(symbol))) => {
                        tag == symbol.as_str()
                    }
                    (Some(Element::Tag(_)), _) => false,
                    (Some(Element::Node(child)), pattern) => matches(child, pattern),
                })
        }
    }
}

/// Pre-order walk. The visitor sees every node, atoms included, together
/// with its ancestors from the root down to its parent.
pub fn walk<'a, F>(root: &'a SExpr, visitor: &mut F)
where
    F: FnMut(&'a SExpr, &[&'a SExpr]),
{
    let mut ancestors = Vec::new();
    walk_with(root, &mut ancestors, visitor);
}

fn walk_with<'a, F>(node: &'a SExpr, ancestors: &mut Vec<&'a SExpr>, visitor: &mut F)
where
    F: FnMut(&'a SExpr, &[&'a SExpr]),
{
    visitor(node, ancestors);
    ancestors.push(node);
    for child in node.children() {
        walk_with(child, ancestors, visitor);
    }
    ancestors.pop();
}

/// Same order as [`walk`].
pub fn walk_mut<F>(node: &mut SExpr, visitor: &mut F)
where
    F: FnMut(&mut SExpr),
{
    visitor(node);
    for child in node.children_mut() {
        walk_mut(child, visitor);
    }
}

pub fn collect<'a>(root: &'a SExpr, predicate: &dyn Fn(&SExpr) -> bool) -> Vec<&'a SExpr> {
    let mut found = Vec::new();
    walk(
        root,
        &mut when(predicate, |node: &'a SExpr, _: &[&'a SExpr]| found.push(node)),
    );
    found
}
