use super::error::FilterError;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Comparison operators supported by the `$filter` grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Membership; expands to one `eq` clause per value joined with `or`
    In,
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "gt" => Ok(Operator::Gt),
            "ge" => Ok(Operator::Ge),
            "lt" => Ok(Operator::Lt),
            "le" => Ok(Operator::Le),
            "in" => Ok(Operator::In),
            _ => Err(FilterError::UnsupportedOperator {
                operator: s.to_string(),
                lookup: s.to_string(),
            }),
        }
    }
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::In => "in",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire-format decoration of a literal, e.g. `guid'...'`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Guid,
    Date,
}

impl FromStr for Annotation {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guid" => Ok(Annotation::Guid),
            "date" => Ok(Annotation::Date),
            _ => Err(FilterError::UnknownAnnotation(s.to_string())),
        }
    }
}

impl Annotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Annotation::Guid => "guid",
            Annotation::Date => "date",
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal compared against a field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
}

impl Value {
    /// Text of the value without any quoting, as placed inside an annotation
    pub fn raw_text(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::raw_text)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// False for NaN or infinite floats, including inside a list
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            Value::List(items) => items.iter().all(Value::is_finite),
            _ => true,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// A single `(field, operator, annotation, value)` filter unit
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    field: String,
    operator: Operator,
    annotation: Option<Annotation>,
    value: Value,
}

impl Lookup {
    /// Build a lookup, checking that the value shape fits the operator
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        annotation: Option<Annotation>,
        value: impl Into<Value>,
    ) -> Result<Self, FilterError> {
        let field = field.into();
        if field.is_empty() {
            return Err(FilterError::MalformedLookup(field));
        }
        let value = value.into();

        match (&operator, &value) {
            (Operator::In, Value::List(items)) if items.is_empty() => {
                return Err(FilterError::EmptyInList(field));
            }
            (Operator::In, Value::List(_)) => {}
            (Operator::In, _) => return Err(FilterError::InExpectsList(field)),
            (op, Value::List(_)) => {
                return Err(FilterError::UnexpectedList {
                    field,
                    operator: op.to_string(),
                });
            }
            _ => {}
        }
        if !value.is_finite() {
            return Err(FilterError::NonFiniteNumber(field));
        }

        Ok(Lookup {
            field,
            operator,
            annotation,
            value,
        })
    }

    /// Parse a `field__operator__annotation` key into a lookup
    ///
    /// The operator defaults to `eq` when omitted or empty, so `width__`
    /// reads as `width`.
    pub fn parse(key: &str, value: impl Into<Value>) -> Result<Self, FilterError> {
        let parts: Vec<&str> = key.split("__").collect();
        if parts.len() > 3 || parts[0].is_empty() {
            return Err(FilterError::MalformedLookup(key.to_string()));
        }

        let operator = match parts.get(1).filter(|op| !op.is_empty()) {
            Some(op) => op
                .parse::<Operator>()
                .map_err(|_| FilterError::UnsupportedOperator {
                    operator: op.to_string(),
                    lookup: key.to_string(),
                })?,
            None => Operator::default(),
        };
        let annotation = parts
            .get(2)
            .filter(|a| !a.is_empty())
            .map(|a| a.parse::<Annotation>())
            .transpose()?;

        Lookup::new(parts[0], operator, annotation, value)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn annotation(&self) -> Option<Annotation> {
        self.annotation
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether this lookup renders as several `or`-joined clauses
    pub fn is_expansion(&self) -> bool {
        matches!((&self.operator, &self.value), (Operator::In, Value::List(items)) if items.len() > 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_only_defaults_to_eq() {
        let lookup = Lookup::parse("length", 500).unwrap();
        assert_eq!(lookup.field(), "length");
        assert_eq!(lookup.operator(), Operator::Eq);
        assert_eq!(lookup.annotation(), None);
        assert_eq!(lookup.value(), &Value::Int(500));
    }

    #[test]
    fn test_parse_operator_and_annotation() {
        let lookup = Lookup::parse("owner__ne__guid", "abc").unwrap();
        assert_eq!(lookup.operator(), Operator::Ne);
        assert_eq!(lookup.annotation(), Some(Annotation::Guid));
    }

    #[test]
    fn test_parse_unsupported_operator() {
        let err = Lookup::parse("width__like", 1).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnsupportedOperator {
                operator: "like".to_string(),
                lookup: "width__like".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_unknown_annotation() {
        let err = Lookup::parse("created__gt__datetime", "2024-01-01").unwrap_err();
        assert_eq!(err, FilterError::UnknownAnnotation("datetime".to_string()));
    }

    #[test]
    fn test_parse_too_many_parts() {
        assert!(matches!(
            Lookup::parse("a__eq__guid__extra", 1),
            Err(FilterError::MalformedLookup(_))
        ));
        assert!(matches!(
            Lookup::parse("__eq", 1),
            Err(FilterError::MalformedLookup(_))
        ));
    }

    #[test]
    fn test_in_requires_non_empty_list() {
        assert_eq!(
            Lookup::parse("id__in", 1).unwrap_err(),
            FilterError::InExpectsList("id".to_string())
        );
        assert_eq!(
            Lookup::parse("id__in", Vec::<i64>::new()).unwrap_err(),
            FilterError::EmptyInList("id".to_string())
        );
        assert!(Lookup::parse("id__in", vec![1, 2]).is_ok());
    }

    #[test]
    fn test_list_rejected_for_scalar_operator() {
        assert!(matches!(
            Lookup::parse("id__gt", vec![1, 2]),
            Err(FilterError::UnexpectedList { .. })
        ));
    }

    #[test]
    fn test_empty_operator_segment_defaults_to_eq() {
        let lookup = Lookup::parse("width__", 5).unwrap();
        assert_eq!(lookup.operator(), Operator::Eq);
        assert_eq!(lookup.annotation(), None);

        let lookup = Lookup::parse("owner____guid", "abc").unwrap();
        assert_eq!(lookup.operator(), Operator::Eq);
        assert_eq!(lookup.annotation(), Some(Annotation::Guid));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert_eq!(
            Lookup::parse("a__gt", f64::INFINITY).unwrap_err(),
            FilterError::NonFiniteNumber("a".to_string())
        );
        assert_eq!(
            Lookup::parse("a", f64::NAN).unwrap_err(),
            FilterError::NonFiniteNumber("a".to_string())
        );
        assert!(matches!(
            Lookup::parse("a__in", vec![1.0, f64::NEG_INFINITY]),
            Err(FilterError::NonFiniteNumber(_))
        ));
        assert!(Lookup::parse("a", 1.5).is_ok());
    }

    #[test]
    fn test_option_none_becomes_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
