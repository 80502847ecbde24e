use crate::filter::{FilterError, Value};
use regex::Regex;
use std::sync::LazyLock;

static LOOKUP_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<key>[^=\s]+)\s*=\s*(?P<value>.*?)\s*$").expect("valid lookup regex")
});
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(?P<items>.*)\]$").expect("valid list regex"));
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").expect("valid decimal regex"));

/// Split a `key=value` command-line lookup
pub fn parse_lookup_arg(arg: &str) -> Result<(String, Value), FilterError> {
    let caps = LOOKUP_ARG_RE
        .captures(arg)
        .ok_or_else(|| FilterError::MalformedLookup(arg.to_string()))?;
    Ok((caps["key"].to_string(), parse_value(&caps["value"])))
}

/// Interpret a command-line literal.
///
/// `null`, booleans, integers and decimals map to their types, `[a, b]`
/// becomes a list, quotes force text, anything else is text.
pub fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();

    if let Some(caps) = LIST_RE.captures(raw) {
        return Value::List(
            split_preserving_quotes(&caps["items"])
                .into_iter()
                .map(parse_value)
                .collect(),
        );
    }
    if let Some(text) = strip_quotes(raw) {
        return Value::Text(text.to_string());
    }

    match raw {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(int) = raw.parse::<i64>() {
                Value::Int(int)
            } else if DECIMAL_RE.is_match(raw)
                && let Ok(float) = raw.parse::<f64>()
            {
                Value::Float(float)
            } else {
                Value::Text(raw.to_string())
            }
        }
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    if s.len() < 2 {
        return None;
    }
    ['\'', '"']
        .into_iter()
        .find_map(|q| s.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)))
}

/// Split list items on commas while preserving quoted segments
fn split_preserving_quotes(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' | '\'' if quote == Some(c) => quote = None,
            '"' | '\'' if quote.is_none() => quote = Some(c),
            ',' if quote.is_none() => {
                let part = s[start..i].trim();
                if !part.is_empty() {
                    parts.push(part);
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    let part = s[start..].trim();
    if !part.is_empty() {
        parts.push(part);
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookup_arg() {
        let (key, value) = parse_lookup_arg("width__gt=50").unwrap();
        assert_eq!(key, "width__gt");
        assert_eq!(value, Value::Int(50));
    }

    #[test]
    fn test_parse_lookup_arg_rejects_missing_value_separator() {
        assert!(parse_lookup_arg("width__gt").is_err());
    }

    #[test]
    fn test_parse_scalar_literals() {
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("-7"), Value::Int(-7));
        assert_eq!(parse_value("2.5"), Value::Float(2.5));
        assert_eq!(parse_value("'42'"), Value::Text("42".to_string()));
        assert_eq!(parse_value("Ivanov"), Value::Text("Ivanov".to_string()));
        assert_eq!(parse_value("nan"), Value::Text("nan".to_string()));
    }

    #[test]
    fn test_parse_list_preserves_quoted_commas() {
        assert_eq!(
            parse_value("[1, 'a, b', c]"),
            Value::List(vec![
                Value::Int(1),
                Value::Text("a, b".to_string()),
                Value::Text("c".to_string()),
            ])
        );
    }
}
