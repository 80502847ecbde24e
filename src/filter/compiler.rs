use super::error::FilterError;
use super::lookup::{Annotation, Lookup, Operator, Value};
use super::node::{Connector, Node, Q};
use crate::schema::FieldMapping;

/// Render a filter tree into a `$filter` expression.
///
/// With a mapping, logical field names are replaced by their wire aliases
/// and unknown fields are rejected; without one, names pass through.
pub fn compile_filter(q: &Q, mapping: Option<&FieldMapping>) -> Result<String, FilterError> {
    match q.node() {
        Node::Leaf(lookup) => compile_lookup(lookup, mapping),
        Node::Group(group) => {
            let parts = group
                .children()
                .iter()
                .map(|child| compile_child(child, group.connector(), mapping))
                .collect::<Result<Vec<_>, _>>()?;
            let joined = parts.join(&format!(" {} ", group.connector()));
            if group.negated() {
                Ok(format!("not ({joined})"))
            } else {
                Ok(joined)
            }
        }
    }
}

fn compile_child(
    child: &Q,
    parent: Connector,
    mapping: Option<&FieldMapping>,
) -> Result<String, FilterError> {
    let rendered = compile_filter(child, mapping)?;
    let needs_parens = match child.node() {
        Node::Group(group) => !group.negated() && group.connector() != parent,
        // an `in` expansion is an implicit OR group
        Node::Leaf(lookup) => lookup.is_expansion() && parent != Connector::Or,
    };

    if needs_parens {
        Ok(format!("({rendered})"))
    } else {
        Ok(rendered)
    }
}

/// Render a single lookup, e.g. `Name eq 'Ivanov'`
pub fn compile_lookup(lookup: &Lookup, mapping: Option<&FieldMapping>) -> Result<String, FilterError> {
    let field = match mapping {
        Some(mapping) => mapping.resolve(lookup.field())?,
        None => lookup.field(),
    };

    match (lookup.operator(), lookup.value()) {
        (Operator::In, Value::List(items)) => Ok(items
            .iter()
            .map(|item| format!("{field} eq {}", render_value(item, lookup.annotation())))
            .collect::<Vec<_>>()
            .join(" or ")),
        (operator, value) => Ok(format!(
            "{field} {operator} {}",
            render_value(value, lookup.annotation())
        )),
    }
}

/// Render a literal, applying the annotation if any
pub fn render_value(value: &Value, annotation: Option<Annotation>) -> String {
    if let Some(annotation) = annotation {
        return format!("{annotation}'{}'", escape_quotes(&value.raw_text()));
    }

    match value {
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => value.raw_text(),
        Value::Text(_) | Value::Date(_) | Value::DateTime(_) => {
            format!("'{}'", escape_quotes(&value.raw_text()))
        }
        Value::List(items) => items
            .iter()
            .map(|item| render_value(item, None))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\'', "''")
}
