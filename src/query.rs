use crate::filter::{FilterError, Q, compile_filter};
use crate::schema::FieldMapping;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt;

/// Everything except unreserved characters is escaped, spaces as `%20`
pub(crate) const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Parameters of one collection or resource request
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub select: Vec<String>,
    pub filter: Option<Q>,
    pub top: Option<u32>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the `$select` paths declared by a mapping
    pub fn for_mapping(mapping: &FieldMapping) -> Self {
        QuerySpec {
            select: mapping.select_paths(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Option<Q>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_top(mut self, top: Option<u32>) -> Self {
        self.top = top;
        self
    }
}

/// Compiled query parameters in wire order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Build `$select`, `$filter`, `$top` from a spec, dropping empty ones
    pub fn compile(spec: &QuerySpec, mapping: &FieldMapping) -> Result<Self, FilterError> {
        let mut pairs = Vec::new();

        let select = spec.select.join(", ");
        if !select.is_empty() {
            pairs.push(("$select", select));
        }

        if let Some(filter) = &spec.filter {
            let expression = compile_filter(filter, Some(mapping))?;
            if !expression.is_empty() {
                pairs.push(("$filter", expression));
            }
        }

        if let Some(top) = spec.top {
            pairs.push(("$top", top.to_string()));
        }

        Ok(QueryParams { pairs })
    }

    /// Unencoded `(name, value)` pairs
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Percent-encoded query string with leading `?`, or empty
    pub fn encode(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }

        let joined = self
            .pairs
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, QUERY_ENCODE_SET),
                    utf8_percent_encode(value, QUERY_ENCODE_SET)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("?{joined}")
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Compile a spec straight to its encoded query string
pub fn compile_query(spec: &QuerySpec, mapping: &FieldMapping) -> Result<String, FilterError> {
    Ok(QueryParams::compile(spec, mapping)?.encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;

    fn decode(s: &str) -> String {
        percent_decode_str(s).decode_utf8().unwrap().into_owned()
    }

    #[test]
    fn test_empty_spec_yields_empty_string() {
        let query = compile_query(&QuerySpec::new(), &FieldMapping::new()).unwrap();
        assert_eq!(query, "");
    }

    #[test]
    fn test_parameter_order_is_select_filter_top() {
        let mapping = FieldMapping::new().field("width", "Ширина");
        let spec = QuerySpec::for_mapping(&mapping)
            .with_filter(Some(Q::lookup("width__gt", 50).unwrap()))
            .with_top(Some(10));
        let params = QueryParams::compile(&spec, &mapping).unwrap();
        let names: Vec<&str> = params.pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["$select", "$filter", "$top"]);
    }

    #[test]
    fn test_encoding_escapes_spaces_and_non_ascii() {
        let mapping = FieldMapping::new()
            .field("width", "Ширина")
            .field("length", "Длина");
        let spec = QuerySpec::new().with_filter(Some(
            Q::lookups([("width__gt", 50), ("length", 500)]).unwrap(),
        ));
        let query = compile_query(&spec, &mapping).unwrap();
        assert!(query.starts_with('?'));
        assert!(!query.contains(' '));
        assert!(query.contains("%20gt%2050"));
        assert_eq!(
            decode(&query),
            "?$filter=Ширина gt 50 and Длина eq 500"
        );
    }

    #[test]
    fn test_only_top() {
        let spec = QuerySpec::new().with_top(Some(5));
        let query = compile_query(&spec, &FieldMapping::new()).unwrap();
        assert_eq!(query, "?%24top=5");
    }

    #[test]
    fn test_select_joins_with_comma() {
        let mapping = FieldMapping::new().field("id", "Ref_Key").plain("Code");
        let params = QueryParams::compile(&QuerySpec::for_mapping(&mapping), &mapping).unwrap();
        assert_eq!(params.get("$select"), Some("Ref_Key, Code"));
        assert_eq!(params.get("$filter"), None);
    }
}
