use std::fmt;

/// A value produced or consumed by engine keywords
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Decimal(f64),
    Bool(bool),
    None,
    List(Vec<Value>),
    /// Insertion-ordered, like the engine's own dictionaries
    Dict(Vec<(String, Value)>),
}

impl Value {
    /// Render the value the way the engine echoes results (`['a', 'b']`, `{'k': 'v'}`)
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => quote(s),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => decimal_repr(*d),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::None => "None".to_string(),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Dict(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", quote(key), value.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }

    /// Falsy values are never echoed back to the user
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::String(s) => !s.is_empty(),
            Value::Integer(i) => *i != 0,
            Value::Decimal(d) => *d != 0.0,
            Value::Bool(b) => *b,
            Value::None => false,
            Value::List(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
        }
    }

    /// Parse the body of a `${...}` that is not a stored variable: numbers and the
    /// boolean/none literals
    pub(crate) fn parse_literal(s: &str) -> Option<Value> {
        match s.to_ascii_lowercase().as_str() {
            "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            "none" => return Some(Value::None),
            _ => {}
        }

        if !s.contains('.')
            && let Ok(i) = s.parse::<i64>()
        {
            return Some(Value::Integer(i));
        }

        if s.contains('.')
            && let Ok(d) = s.parse::<f64>()
        {
            return Some(Value::Decimal(d));
        }

        None
    }

    /// Number of items, characters or entries, when that makes sense for the value
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Dict(entries) => Some(entries.len()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

fn decimal_repr(d: f64) -> String {
    // Debug keeps the trailing `.0` on whole numbers
    format!("{:?}", d)
}

/// Quote a string, preferring single quotes unless the text contains one
fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}
