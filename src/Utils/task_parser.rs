/// parse task documents with structure
/// ```text
/// title1
/// key1: value1, value2
/// key2: 1, 2; 3, 4
/// title2
/// key3: x^2 - 4
/// ```
/// into maps of titles to key-value pairs. A value runs until `,`, `;` or the end of the line, so
/// expressions may contain spaces. `;` splits a value list into rows (matrices).
/// Lines starting with `//`, `#`, `%` or `;` are comments.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, line_ending, multispace0, space0},
    combinator::{map, map_res, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type SectionMap = HashMap<String, Option<Vec<Value>>>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
    /// one `;`-separated row of a matrix
    Row(Vec<Value>),
}

impl Value {
    /// numeric value, integers widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&[Value]> {
        if let Value::Row(values) = self {
            Some(values)
        } else {
            None
        }
    }

    // Try to convert to string representation
    pub fn to_string_value(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(f) => f.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Row(values) => values
                .iter()
                .map(|v| v.to_string_value())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Row(_) => write!(f, "[{}]", self.to_string_value()),
            _ => write!(f, "{}", self.to_string_value()),
        }
    }
}

fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

/// Parses a title: a lone identifier on its own line
fn parse_title(input: &str) -> IResult<&str, String> {
    let mut parser = terminated(preceded(space0, identifier), pair(space0, line_ending));
    parser.parse(input)
}

/// Parses a key (word characters without spaces)
fn parse_key(input: &str) -> IResult<&str, String> {
    preceded(space0, identifier).parse(input)
}

fn typed_value(raw: &str) -> Result<Value, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty value".to_string());
    }
    // Try parsing as different types in order
    if let Ok(val) = s.parse::<i64>() {
        Ok(Value::Integer(val))
    } else if let Ok(val) = s.parse::<f64>() {
        Ok(Value::Float(val))
    } else if let Ok(val) = s.parse::<bool>() {
        Ok(Value::Boolean(val))
    } else {
        Ok(Value::String(s.to_string()))
    }
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    // everything up to the next separator or end of line
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ';' | '\n' | '\r'));
    map_res(value_parser, typed_value).parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let separator_coma = delimited(space0, tag(","), space0);
    separated_list1(separator_coma, parse_value).parse(input)
}

/// rows separated by `;`, a trailing `;` is allowed
fn parse_rows(input: &str) -> IResult<&str, Vec<Value>> {
    let separator_semicolon = delimited(space0, tag(";"), space0);
    let mut parser = terminated(
        separated_list1(separator_semicolon, parse_value_list),
        opt(preceded(space0, tag(";"))),
    );
    let (input, mut rows) = parser.parse(input)?;
    if rows.len() == 1 {
        return Ok((input, rows.remove(0)));
    }
    Ok((input, rows.into_iter().map(Value::Row).collect()))
}

/// Parses a key-value pair where value is a list
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let mut colon_separator = delimited(space0, tag(":"), space0);
    let (input, key) = parse_key(input)?;
    let (input, _) = colon_separator.parse(input)?;
    let (input, values) = parse_rows(input)?;
    let (input, _) = space0(input)?;
    Ok((input, (key, values)))
}

/// Parses a section with a title and one or more key-value lines
fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, title) = parse_title(input)?;
    let (input, pairs) = separated_list1(line_ending, parse_key_value_pair).parse(input)?;
    let mut section_map = HashMap::new();
    for (key, values) in pairs {
        section_map.insert(key, Some(values));
    }
    Ok((input, (title, section_map)))
}

/// Filters out comment lines (starting with //, #, %, or ;) and blank lines
pub fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

fn parse_all_sections(input: &str) -> IResult<&str, Vec<(String, SectionMap)>> {
    preceded(
        multispace0,
        separated_list1(line_ending, parse_section),
    )
    .parse(input)
}

/// Parses the document into sections, keeping their order (titles may repeat)
pub fn parse_sections(input: &str) -> Result<Vec<(String, SectionMap)>, String> {
    let filtered = filter_comments(input);
    if filtered.trim().is_empty() {
        return Err("document contains no sections".to_string());
    }
    match parse_all_sections(&filtered) {
        Ok((remaining, sections)) => {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Failed to parse entire document. Remaining: '{}'",
                    remaining.trim()
                ));
            }
            Ok(sections)
        }
        Err(e) => Err(format!("Parsing error: {:?}", e)),
    }
}

/////////////////////////////TESTS////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("bisection\nexpression: x").unwrap();
        assert_eq!(title, "bisection");
        assert_eq!(remaining, "expression: x");
        let (_, title) = parse_title("  comparison_lsm  \nmatrix_a: 1").unwrap();
        assert_eq!(title, "comparison_lsm");
        // a key line is not a title
        assert!(parse_title("tol: 1e-6\n").is_err());
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("x^2 - 4, next").unwrap();
        assert_eq!(value, Value::String("x^2 - 4".to_string()));
        assert_eq!(remaining, ", next");

        let (_, value) = parse_value("123").unwrap();
        assert_eq!(value, Value::Integer(123));
        let (_, value) = parse_value("1e-6").unwrap();
        assert_eq!(value, Value::Float(1e-6));
        let (_, value) = parse_value("true").unwrap();
        assert_eq!(value, Value::Boolean(true));
    }

    #[test]
    fn test_parse_rows() {
        let (_, values) = parse_rows("1, 2.5, 3").unwrap();
        assert_eq!(
            values,
            vec![Value::Integer(1), Value::Float(2.5), Value::Integer(3)]
        );
        let (_, values) = parse_rows("4, 1; 2, 3;").unwrap();
        assert_eq!(
            values,
            vec![
                Value::Row(vec![Value::Integer(4), Value::Integer(1)]),
                Value::Row(vec![Value::Integer(2), Value::Integer(3)]),
            ]
        );
        assert_eq!(values[1].to_string(), "[2, 3]");
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("tol : 0.001  \nniter: 5").unwrap();
        assert_eq!(key, "tol");
        assert_eq!(values, vec![Value::Float(0.001)]);
        assert_eq!(remaining, "\nniter: 5");
    }

    #[test]
    fn test_parse_sections_keeps_order() {
        let input = "
            // root finding first
            secant
            fx: exp(x) - 2
            x0: 0
            x1: 1

            # then a linear system
            jacobi
            matrix_a: 4, 1; 2, 3
            vector_b: 1, 2
            x0: 0, 0

            secant
            fx: x^3 - 1
            x0: 2
            x1: 3
        ";
        let sections = parse_sections(input).unwrap();
        let titles: Vec<&str> = sections.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(titles, vec!["secant", "jacobi", "secant"]);
        let jacobi = &sections[1].1;
        let matrix = jacobi["matrix_a"].as_ref().unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].as_row().unwrap()[1], Value::Integer(1));
        assert_eq!(
            sections[2].1["fx"].as_ref().unwrap()[0],
            Value::String("x^3 - 1".to_string())
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_sections("").is_err());
        assert!(parse_sections("// only a comment\n").is_err());
        // a title without any key-value line
        assert!(parse_sections("bisection\n").is_err());
        // a key line without a title
        assert!(parse_sections("a: 1\n").is_err());
        // an empty value
        assert!(parse_sections("bisection\na: 1,\n").is_err());
    }

    #[test]
    fn test_read_document_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "lagrange\nx: 1, 2, 3\ny: 1, 4, 9").unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let sections = parse_sections(&text).unwrap();
        assert_eq!(sections[0].0, "lagrange");
        let x: Vec<f64> = sections[0].1["x"]
            .as_ref()
            .unwrap()
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
    }
}
