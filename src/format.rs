//! Titles for parameterized (`each`) registrations.
//!
//! Rows are plain [`serde_json::Value`]s. Arrays are positional rows and fill
//! printf-style placeholders left to right, objects are record rows and fill
//! `$name` placeholders. See [`format_title`] for the full set.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

static POSITIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[sdifjoOp#$%]").expect("valid positional placeholder regex"));

static NAMED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(#|[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)")
        .expect("valid named placeholder regex")
});

/// Expand `template` against one data row.
///
/// Positional placeholders:
///
/// | placeholder | value |
/// |---|---|
/// | `%s` | the value as a string |
/// | `%d` | the value as a number |
/// | `%i` | the value as an integer, truncated |
/// | `%f` | the value as a floating point number |
/// | `%j` | the value as JSON |
/// | `%o`, `%O`, `%p` | the inspected value (strings are quoted) |
/// | `%#` | the 0-based row index |
/// | `%$` | the 1-based row index |
/// | `%%` | a literal `%` |
///
/// Record rows replace `$name` and `$nested.name` with the inspected field
/// value and `$#` with the 0-based index. Unknown names and placeholders
/// without a value left are kept as written.
///
/// A row that is not an array and matches no placeholder in `template` gets
/// its index appended, so every row still has its own title. An escaped `%%`
/// does not count as a placeholder here.
pub fn format_title(template: &str, row: &Value, index: usize) -> String {
    match row {
        Value::Array(values) => format_positional(template, values, index),
        Value::Object(record) => match format_named(template, record, index) {
            Some(title) => title,
            None => format_single(template, row, index),
        },
        _ => format_single(template, row, index),
    }
}

fn format_single(template: &str, value: &Value, index: usize) -> String {
    let title = format_positional(template, std::slice::from_ref(value), index);
    match varies_per_row(template) {
        true => title,
        false => format!("{title} {index}"),
    }
}

/// Whether `template` has a placeholder filled from the row or its index.
/// A literal `%%` alone renders the same for every row.
fn varies_per_row(template: &str) -> bool {
    POSITIONAL_RE
        .find_iter(template)
        .any(|placeholder| placeholder.as_str() != "%%")
}

fn format_positional(template: &str, values: &[Value], index: usize) -> String {
    let mut values = values.iter();
    POSITIONAL_RE
        .replace_all(template, |caps: &Captures| {
            let placeholder = &caps[0];
            match placeholder {
                "%%" => "%".to_owned(),
                "%#" => index.to_string(),
                "%$" => (index + 1).to_string(),
                _ => match values.next() {
                    Some(value) => render(placeholder, value),
                    None => placeholder.to_owned(),
                },
            }
        })
        .into_owned()
}

/// Replace named placeholders, or `None` if none of them matched the record.
fn format_named(template: &str, record: &Map<String, Value>, index: usize) -> Option<String> {
    let mut matched = false;
    let title = NAMED_RE.replace_all(template, |caps: &Captures| {
        let path = &caps[1];
        if path == "#" {
            matched = true;
            return index.to_string();
        }

        match lookup(record, path) {
            Some(value) => {
                matched = true;
                inspect(value)
            }
            None => caps[0].to_owned(),
        }
    });

    matched.then(|| title.into_owned())
}

fn lookup<'v>(record: &'v Map<String, Value>, path: &str) -> Option<&'v Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn render(placeholder: &str, value: &Value) -> String {
    match placeholder {
        "%s" => match value {
            Value::String(s) => s.clone(),
            Value::Number(_) | Value::Bool(_) | Value::Null => value.to_string(),
            Value::Array(_) | Value::Object(_) => inspect(value),
        },
        "%d" | "%f" => as_f64(value).map(number).unwrap_or_else(nan),
        "%i" => as_f64(value)
            .map(|n| number(n.trunc()))
            .unwrap_or_else(nan),
        "%j" => value.to_string(),
        _ => inspect(value),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn number(n: f64) -> String {
    // f64's Display already drops a trailing ".0"
    match n == 0.0 {
        true => "0".to_owned(),
        false => n.to_string(),
    }
}

fn nan() -> String {
    "NaN".to_owned()
}

/// Single line, human readable rendering of a value.
fn inspect(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => value.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => number(f),
            _ => n.to_string(),
        },
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(inspect).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let fields: Vec<_> = map
                .iter()
                .map(|(key, value)| format!("{}: {}", Value::from(key.as_str()), inspect(value)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}
