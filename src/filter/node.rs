use super::compiler::compile_filter;
use super::error::FilterError;
use super::lookup::{Lookup, Value};
use std::fmt;
use std::sync::Arc;

/// Boolean joiner of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "and",
            Connector::Or => "or",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of a filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Lookup),
    Group(Group),
}

/// A logical grouping of sub-expressions. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    connector: Connector,
    negated: bool,
    children: Vec<Q>,
}

impl Group {
    pub fn connector(&self) -> Connector {
        self.connector
    }

    pub fn negated(&self) -> bool {
        self.negated
    }

    pub fn children(&self) -> &[Q] {
        &self.children
    }

    /// Whether this group's children merge into a parent joined by
    /// `connector` instead of nesting under it.
    fn absorbs_into(&self, connector: Connector) -> bool {
        self.connector == connector && !self.negated
    }
}

/// An immutable filter expression.
///
/// Cloning is cheap: subtrees are shared between every expression built
/// from them, and combining never modifies an operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Q {
    node: Arc<Node>,
}

impl Q {
    fn from_node(node: Node) -> Self {
        Q {
            node: Arc::new(node),
        }
    }

    pub fn leaf(lookup: Lookup) -> Self {
        Q::from_node(Node::Leaf(lookup))
    }

    /// Single lookup from `field__operator__annotation` key sugar
    pub fn lookup(key: &str, value: impl Into<Value>) -> Result<Self, FilterError> {
        Ok(Q::leaf(Lookup::parse(key, value)?))
    }

    /// Lookups combined with AND in declaration order
    pub fn lookups<I, K, V>(pairs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut children = pairs
            .into_iter()
            .map(|(key, value)| Q::lookup(key.as_ref(), value))
            .collect::<Result<Vec<_>, _>>()?;

        match children.len() {
            0 => Err(FilterError::NoCriteria),
            1 => Ok(children.remove(0)),
            _ => Ok(Q::from_node(Node::Group(Group {
                connector: Connector::And,
                negated: false,
                children,
            }))),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self.node() {
            Node::Group(group) => Some(group),
            Node::Leaf(_) => None,
        }
    }

    pub fn is_negated(&self) -> bool {
        self.as_group().is_some_and(Group::negated)
    }

    pub fn and(&self, other: &Q) -> Q {
        combine(self, other, Connector::And)
    }

    pub fn or(&self, other: &Q) -> Q {
        combine(self, other, Connector::Or)
    }

    pub fn not(&self) -> Q {
        match self.node() {
            Node::Leaf(_) => Q::from_node(Node::Group(Group {
                connector: Connector::And,
                negated: true,
                children: vec![self.clone()],
            })),
            Node::Group(group) => Q::from_node(Node::Group(Group {
                connector: group.connector,
                negated: !group.negated,
                children: group.children.clone(),
            })),
        }
    }

    /// Left fold with AND; `None` for an empty input
    pub fn all<I: IntoIterator<Item = Q>>(items: I) -> Option<Q> {
        items.into_iter().reduce(|acc, q| acc.and(&q))
    }

    /// Left fold with OR; `None` for an empty input
    pub fn any<I: IntoIterator<Item = Q>>(items: I) -> Option<Q> {
        items.into_iter().reduce(|acc, q| acc.or(&q))
    }
}

impl From<Lookup> for Q {
    fn from(lookup: Lookup) -> Self {
        Q::leaf(lookup)
    }
}

/// Renders with logical field names, without alias resolution
impl fmt::Display for Q {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = compile_filter(self, None).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

pub fn and(a: &Q, b: &Q) -> Q {
    a.and(b)
}

pub fn or(a: &Q, b: &Q) -> Q {
    a.or(b)
}

pub fn not(a: &Q) -> Q {
    a.not()
}

fn combine(a: &Q, b: &Q, connector: Connector) -> Q {
    let mut children = Vec::new();
    absorb(&mut children, a, connector);
    absorb(&mut children, b, connector);
    Q::from_node(Node::Group(Group {
        connector,
        negated: false,
        children,
    }))
}

fn absorb(children: &mut Vec<Q>, q: &Q, connector: Connector) {
    match q.as_group() {
        Some(group) if group.absorbs_into(connector) => {
            children.extend(group.children.iter().cloned());
        }
        _ => children.push(q.clone()),
    }
}
