use std::collections::HashMap;

use super::{EngineError, Value};

/// A `${name}`, `@{name}` or `&{name}` reference found in a piece of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarRef<'a> {
    pub sigil: char,
    pub name: &'a str,
    /// Byte offset of the sigil
    pub start: usize,
    /// Byte offset just past the closing brace
    pub end: usize,
}

/// Find the first variable reference at or after `from`, skipping `\`-escaped characters
pub fn find_variable(text: &str, from: usize) -> Option<VarRef<'_>> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' | b'@' | b'&' if bytes.get(i + 1) == Some(&b'{') => {
                // An unterminated reference leaves the rest of the text literal
                let close = matching_brace(bytes, i + 1)?;
                return Some(VarRef {
                    sigil: bytes[i] as char,
                    name: &text[i + 2..close],
                    start: i,
                    end: close + 1,
                });
            }
            _ => i += 1,
        }
    }
    None
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

/// True when the whole text is exactly one variable reference
pub fn is_variable(text: &str) -> bool {
    match find_variable(text, 0) {
        Some(var) => var.start == 0 && var.end == text.len() && !var.name.is_empty(),
        None => false,
    }
}

/// Variable names ignore case, spaces and underscores
pub(crate) fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn decorate(sigil: char, name: &str) -> String {
    format!("{}{{{}}}", sigil, name)
}

/// Resolve `\` escapes in literal text
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Variables visible to keywords run from the shell
#[derive(Debug, Default)]
pub struct VariableStore {
    vars: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value to a decorated name such as `${x}` or `@{items}`
    pub fn set(&mut self, decorated: &str, value: Value) -> Result<(), EngineError> {
        let var = match find_variable(decorated, 0) {
            Some(var) if is_variable(decorated) => var,
            _ => {
                return Err(EngineError::execution_failed(format!(
                    "Invalid variable name '{}'.",
                    decorated
                )));
            }
        };

        check_kind(var.sigil, var.name, &value)?;
        let name = self.replace_string(var.name)?;
        self.vars.insert(normalize(&name), value);
        Ok(())
    }

    /// Look up a variable by sigil and undecorated name
    pub fn get(&self, sigil: char, name: &str) -> Result<Value, EngineError> {
        let value = self.lookup(sigil, name)?;
        check_kind(sigil, name, &value)?;
        Ok(value)
    }

    fn lookup(&self, sigil: char, name: &str) -> Result<Value, EngineError> {
        if let Some(value) = self.vars.get(&normalize(name)) {
            return Ok(value.clone());
        }

        match normalize(name).as_str() {
            "empty" => {
                return Ok(match sigil {
                    '@' => Value::List(Vec::new()),
                    '&' => Value::Dict(Vec::new()),
                    _ => Value::String(String::new()),
                });
            }
            "space" => return Ok(Value::String(" ".to_string())),
            _ => {}
        }

        if let Some(value) = Value::parse_literal(name) {
            return Ok(value);
        }

        // Extended syntax: ${dict.key}
        if let Some((base, key)) = name.split_once('.')
            && let Some(Value::Dict(entries)) = self.vars.get(&normalize(base))
            && let Some((_, value)) = entries.iter().find(|(k, _)| k == key)
        {
            return Ok(value.clone());
        }

        Err(EngineError::execution_failed(format!(
            "Variable '{}' not found.",
            decorate(sigil, name)
        )))
    }

    /// Substitute every variable in `text`, producing a plain string
    pub fn replace_string(&self, text: &str) -> Result<String, EngineError> {
        let mut out = String::new();
        let mut rest = text;
        while let Some(var) = find_variable(rest, 0) {
            out.push_str(&unescape(&rest[..var.start]));
            let name = self.replace_string(var.name)?;
            out.push_str(&self.lookup(var.sigil, &name)?.to_string());
            rest = &rest[var.end..];
        }
        out.push_str(&unescape(rest));
        Ok(out)
    }

    /// Resolve one raw keyword argument; a lone `@{list}` expands to its items
    pub fn resolve_argument(&self, raw: &str) -> Result<Vec<Value>, EngineError> {
        if is_variable(raw)
            && let Some(var) = find_variable(raw, 0)
        {
            let name = self.replace_string(var.name)?;
            return match self.get(var.sigil, &name)? {
                Value::List(items) if var.sigil == '@' => Ok(items),
                value => Ok(vec![value]),
            };
        }
        Ok(vec![Value::String(self.replace_string(raw)?)])
    }
}

fn check_kind(sigil: char, name: &str, value: &Value) -> Result<(), EngineError> {
    match (sigil, value) {
        ('@', Value::List(_)) | ('&', Value::Dict(_)) | ('$', _) => Ok(()),
        ('@', _) => Err(EngineError::execution_failed(format!(
            "Value of variable '{}' is not list or list-like.",
            decorate(sigil, name)
        ))),
        _ => Err(EngineError::execution_failed(format!(
            "Value of variable '{}' is not dictionary or dictionary-like.",
            decorate(sigil, name)
        ))),
    }
}
