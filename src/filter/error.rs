use thiserror::Error;

/// Errors raised for malformed filter input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Field '{field}' not found. Use one of {valid:?}")]
    UnknownField { field: String, valid: Vec<String> },

    #[error("Unsupported operator '{operator}' ({lookup}). Use one of: eq, ne, gt, ge, lt, le, in")]
    UnsupportedOperator { operator: String, lookup: String },

    #[error("Unknown annotation '{0}'. Use one of: guid, date")]
    UnknownAnnotation(String),

    #[error("Malformed lookup '{0}'. Expected 'field', 'field__operator' or 'field__operator__annotation'")]
    MalformedLookup(String),

    #[error("Lookup 'in' on field '{0}' expects a list of values")]
    InExpectsList(String),

    #[error("Lookup 'in' on field '{0}' has an empty value list")]
    EmptyInList(String),

    #[error("Operator '{operator}' on field '{field}' does not accept a list of values")]
    UnexpectedList { field: String, operator: String },

    #[error("Value for field '{0}' is not a finite number")]
    NonFiniteNumber(String),

    #[error("No filter criteria given")]
    NoCriteria,
}
