use std::thread;
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use time::macros::format_description;

use super::builtin::BuiltinEngine;
use super::{EngineError, Value};

pub(crate) type KeywordFn = fn(&mut BuiltinEngine, Vec<Value>) -> Result<Value, EngineError>;

pub(crate) struct KeywordDef {
    pub name: &'static str,
    pub doc: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub run: KeywordFn,
}

impl KeywordDef {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    /// "1", "0 to 2" or "at least 1", as used in argument count errors
    pub fn expected(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

pub(crate) struct LibraryDef {
    pub name: &'static str,
    pub version: &'static str,
    pub doc: &'static str,
    pub keywords: &'static [KeywordDef],
}

pub(crate) const SOURCE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/", file!());

/// Libraries that can be imported by name
pub(crate) static STANDARD_LIBRARIES: &[&LibraryDef] = &[&BUILTIN, &COLLECTIONS];

/// Every library the engine knows about, imported or not
static KNOWN_LIBRARIES: &[&LibraryDef] = &[&BUILTIN, &COLLECTIONS, &DEBUG_LIBRARY];

pub(crate) fn find_library(name: &str) -> Option<&'static LibraryDef> {
    let wanted = super::variables::normalize(name);
    KNOWN_LIBRARIES
        .iter()
        .copied()
        .find(|lib| super::variables::normalize(lib.name) == wanted)
}

pub(crate) static BUILTIN: LibraryDef = LibraryDef {
    name: "BuiltIn",
    version: env!("CARGO_PKG_VERSION"),
    doc: "Generic keywords that are always available.",
    keywords: &[
        KeywordDef {
            name: "Catenate",
            doc: "Catenates the given items together and returns the resulted string.\n\nItems are separated with a space unless the first item is `SEPARATOR=<sep>`.",
            min_args: 0,
            max_args: None,
            run: catenate,
        },
        KeywordDef {
            name: "Create Dictionary",
            doc: "Creates and returns a dictionary based on the given items.\n\nItems are given as `key=value` pairs or as existing dictionaries.",
            min_args: 0,
            max_args: None,
            run: create_dictionary,
        },
        KeywordDef {
            name: "Create List",
            doc: "Returns a list containing given items.",
            min_args: 0,
            max_args: None,
            run: create_list,
        },
        KeywordDef {
            name: "Fail",
            doc: "Fails the test with the given message.",
            min_args: 0,
            max_args: Some(1),
            run: fail,
        },
        KeywordDef {
            name: "Get Count",
            doc: "Returns and logs how many times `item` is found from `container`.",
            min_args: 2,
            max_args: Some(2),
            run: get_count,
        },
        KeywordDef {
            name: "Get Length",
            doc: "Returns and logs the length of the given item as an integer.",
            min_args: 1,
            max_args: Some(1),
            run: get_length,
        },
        KeywordDef {
            name: "Get Time",
            doc: "Returns the current time in the requested format.\n\nThe default is a `YYYY-MM-DD hh:mm:ss` timestamp. `epoch` returns seconds since the Unix epoch.",
            min_args: 0,
            max_args: Some(1),
            run: get_time,
        },
        KeywordDef {
            name: "Import Library",
            doc: "Imports a library with the given name into the running suite.",
            min_args: 1,
            max_args: Some(1),
            run: import_library,
        },
        KeywordDef {
            name: "Keyword Should Exist",
            doc: "Fails unless the given keyword exists in the current scope.",
            min_args: 1,
            max_args: Some(2),
            run: keyword_should_exist,
        },
        KeywordDef {
            name: "Log",
            doc: "Logs the given message with the given level (INFO by default).",
            min_args: 1,
            max_args: Some(2),
            run: log,
        },
        KeywordDef {
            name: "Log To Console",
            doc: "Logs the given message to the console.",
            min_args: 1,
            max_args: Some(1),
            run: log_to_console,
        },
        KeywordDef {
            name: "No Operation",
            doc: "Does absolutely nothing.",
            min_args: 0,
            max_args: Some(0),
            run: no_operation,
        },
        KeywordDef {
            name: "Set Variable",
            doc: "Returns the given values which can then be assigned to variables.",
            min_args: 0,
            max_args: None,
            run: set_variable,
        },
        KeywordDef {
            name: "Should Be Equal",
            doc: "Fails if the given objects are unequal.",
            min_args: 2,
            max_args: Some(3),
            run: should_be_equal,
        },
        KeywordDef {
            name: "Should Be True",
            doc: "Fails if the given condition is not true.",
            min_args: 1,
            max_args: Some(2),
            run: should_be_true,
        },
        KeywordDef {
            name: "Sleep",
            doc: "Pauses the test executed for the given time.\n\nTime is a number of seconds or a number followed by `ms`, `s` or `min`.",
            min_args: 1,
            max_args: Some(2),
            run: sleep,
        },
    ],
};

pub(crate) static COLLECTIONS: LibraryDef = LibraryDef {
    name: "Collections",
    version: env!("CARGO_PKG_VERSION"),
    doc: "Keywords for handling lists and dictionaries.",
    keywords: &[
        KeywordDef {
            name: "Combine Lists",
            doc: "Combines the given lists together and returns the result.",
            min_args: 0,
            max_args: None,
            run: combine_lists,
        },
        KeywordDef {
            name: "Dictionary Should Contain Key",
            doc: "Fails if `key` is not found from `dictionary`.",
            min_args: 2,
            max_args: Some(3),
            run: dictionary_should_contain_key,
        },
        KeywordDef {
            name: "Get Dictionary Keys",
            doc: "Returns the sorted keys of the given dictionary as a list.",
            min_args: 1,
            max_args: Some(1),
            run: get_dictionary_keys,
        },
        KeywordDef {
            name: "Get From Dictionary",
            doc: "Returns a value from the given dictionary based on the given key.",
            min_args: 2,
            max_args: Some(2),
            run: get_from_dictionary,
        },
        KeywordDef {
            name: "Get From List",
            doc: "Returns the value specified with an index from list.\n\nNegative indices count from the end.",
            min_args: 2,
            max_args: Some(2),
            run: get_from_list,
        },
        KeywordDef {
            name: "List Should Contain Value",
            doc: "Fails if the value is not found from list.",
            min_args: 2,
            max_args: Some(3),
            run: list_should_contain_value,
        },
    ],
};

pub(crate) static DEBUG_LIBRARY: LibraryDef = LibraryDef {
    name: "DebugLibrary",
    version: env!("CARGO_PKG_VERSION"),
    doc: "Debug keywords that open an interactive shell.",
    keywords: &[
        KeywordDef {
            name: "Debug",
            doc: "Open an interactive shell, run any keywords.\n\nKeywords are separated with two spaces or one tab, and Ctrl-D exits.",
            min_args: 0,
            max_args: Some(0),
            run: debug,
        },
        KeywordDef {
            name: "Debug If",
            doc: "Runs the Debug keyword if condition is true.",
            min_args: 1,
            max_args: Some(1),
            run: debug_if,
        },
    ],
};

// BuiltIn

fn catenate(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let mut items: Vec<String> = args.iter().map(Value::to_string).collect();
    let separator = match items.first().and_then(|first| first.strip_prefix("SEPARATOR=")) {
        Some(sep) => {
            let sep = sep.to_string();
            items.remove(0);
            sep
        }
        None => " ".to_string(),
    };
    Ok(Value::String(items.join(&separator)))
}

fn create_dictionary(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let mut entries: Vec<(String, Value)> = Vec::new();
    let mut insert = |key: String, value: Value| match entries.iter_mut().find(|(k, _)| *k == key)
    {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    };

    for arg in args {
        match arg {
            Value::Dict(items) => {
                for (key, value) in items {
                    insert(key, value);
                }
            }
            Value::String(item) => match item.split_once('=') {
                Some((key, value)) => insert(key.to_string(), value.into()),
                None => {
                    return Err(EngineError::execution_failed(format!(
                        "Invalid dictionary item '{}': expected 'name=value'.",
                        item
                    )));
                }
            },
            other => {
                return Err(EngineError::execution_failed(format!(
                    "Invalid dictionary item {}.",
                    other.repr()
                )));
            }
        }
    }
    Ok(Value::Dict(entries))
}

fn create_list(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    Ok(Value::List(args))
}

fn fail(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let message = match args.first() {
        Some(msg) => msg.to_string(),
        None => "AssertionError".to_string(),
    };
    Err(EngineError::handler_failed(message))
}

fn get_count(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let item = args[1].to_string();
    let count = match &args[0] {
        Value::List(items) => items.iter().filter(|v| v.to_string() == item).count(),
        Value::Dict(entries) => entries.iter().filter(|(k, _)| *k == item).count(),
        container if !item.is_empty() => container.to_string().matches(item.as_str()).count(),
        _ => 0,
    };
    tracing::info!("Item found from the container {} times.", count);
    Ok(Value::Integer(count as i64))
}

fn get_length(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    match args[0].len() {
        Some(len) => Ok(Value::Integer(len as i64)),
        None => Err(EngineError::execution_failed(format!(
            "Could not get length of {}.",
            args[0].repr()
        ))),
    }
}

fn get_time(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let format = args
        .first()
        .map(|v| v.to_string().to_lowercase())
        .unwrap_or_default();

    if format.contains("epoch") {
        return Ok(Value::Integer(OffsetDateTime::now_utc().unix_timestamp()));
    }

    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let timestamp = now
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .map_err(anyhow::Error::from)?;
    Ok(Value::String(timestamp))
}

fn import_library(engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    engine.import_library(&args[0].to_string())?;
    Ok(Value::None)
}

fn keyword_should_exist(engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let name = args[0].to_string();
    match engine.resolve(&name) {
        Ok(_) => Ok(Value::None),
        Err(err) => Err(EngineError::handler_failed(match args.get(1) {
            Some(msg) => msg.to_string(),
            None => err.to_string(),
        })),
    }
}

fn log(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let message = args[0].to_string();
    let level = args
        .get(1)
        .map(|v| v.to_string().to_uppercase())
        .unwrap_or_default();
    match level.as_str() {
        "TRACE" => tracing::trace!(target: "rfdebug::keyword", "{}", message),
        "DEBUG" => tracing::debug!(target: "rfdebug::keyword", "{}", message),
        "WARN" => tracing::warn!(target: "rfdebug::keyword", "{}", message),
        "ERROR" => tracing::error!(target: "rfdebug::keyword", "{}", message),
        _ => tracing::info!(target: "rfdebug::keyword", "{}", message),
    }
    Ok(Value::None)
}

fn log_to_console(engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    engine.session().console.line(&args[0].to_string())?;
    Ok(Value::None)
}

fn no_operation(_engine: &mut BuiltinEngine, _args: Vec<Value>) -> Result<Value, EngineError> {
    Ok(Value::None)
}

fn set_variable(_engine: &mut BuiltinEngine, mut args: Vec<Value>) -> Result<Value, EngineError> {
    Ok(match args.len() {
        0 => Value::String(String::new()),
        1 => args.remove(0),
        _ => Value::List(args),
    })
}

fn should_be_equal(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    if args[0] == args[1] {
        return Ok(Value::None);
    }
    Err(EngineError::handler_failed(match args.get(2) {
        Some(msg) => msg.to_string(),
        None => format!("{} != {}", args[0], args[1]),
    }))
}

fn should_be_true(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let condition = args[0].to_string();
    if evaluate_condition(&condition)? {
        return Ok(Value::None);
    }
    Err(EngineError::handler_failed(match args.get(1) {
        Some(msg) => msg.to_string(),
        None => format!("'{}' should be true.", condition),
    }))
}

fn sleep(engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let text = args[0].to_string();
    let duration = parse_duration(&text).ok_or_else(|| {
        EngineError::execution_failed(format!("Invalid time string '{}'.", text))
    })?;

    let started = Instant::now();
    while started.elapsed() < duration {
        if engine.monitor().stop_requested() {
            return Err(EngineError::execution_failed(
                "Execution terminated by signal",
            ));
        }
        thread::sleep(
            duration
                .saturating_sub(started.elapsed())
                .min(Duration::from_millis(50)),
        );
    }
    tracing::info!("Slept {:?}", duration);
    Ok(Value::None)
}

// Collections

fn combine_lists(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let mut combined = Vec::new();
    for arg in args {
        match arg {
            Value::List(items) => combined.extend(items),
            other => {
                return Err(EngineError::execution_failed(format!(
                    "Expected a list, got {}.",
                    other.repr()
                )));
            }
        }
    }
    Ok(Value::List(combined))
}

fn dictionary_should_contain_key(
    _engine: &mut BuiltinEngine,
    args: Vec<Value>,
) -> Result<Value, EngineError> {
    let entries = expect_dict(&args[0])?;
    let key = args[1].to_string();
    if entries.iter().any(|(k, _)| *k == key) {
        return Ok(Value::None);
    }
    Err(EngineError::handler_failed(match args.get(2) {
        Some(msg) => msg.to_string(),
        None => format!("Dictionary does not contain key '{}'.", key),
    }))
}

fn get_dictionary_keys(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let mut keys: Vec<String> = expect_dict(&args[0])?
        .iter()
        .map(|(k, _)| k.clone())
        .collect();
    keys.sort();
    Ok(Value::List(keys.into_iter().map(Value::String).collect()))
}

fn get_from_dictionary(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let key = args[1].to_string();
    expect_dict(&args[0])?
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| {
            EngineError::handler_failed(format!("Dictionary does not contain key '{}'.", key))
        })
}

fn get_from_list(_engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    let Value::List(items) = &args[0] else {
        return Err(EngineError::execution_failed(format!(
            "Expected a list, got {}.",
            args[0].repr()
        )));
    };
    let raw = args[1].to_string();
    let index: i64 = raw.parse().map_err(|_| {
        EngineError::execution_failed(format!("Cannot convert index '{}' to an integer.", raw))
    })?;

    let len = items.len() as i64;
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 || resolved >= len {
        return Err(EngineError::handler_failed(format!(
            "Given index {} is out of the range 0-{}.",
            index,
            len - 1
        )));
    }
    Ok(items[resolved as usize].clone())
}

fn list_should_contain_value(
    _engine: &mut BuiltinEngine,
    args: Vec<Value>,
) -> Result<Value, EngineError> {
    let Value::List(items) = &args[0] else {
        return Err(EngineError::execution_failed(format!(
            "Expected a list, got {}.",
            args[0].repr()
        )));
    };
    if items.contains(&args[1]) {
        return Ok(Value::None);
    }
    Err(EngineError::handler_failed(match args.get(2) {
        Some(msg) => msg.to_string(),
        None => format!("{} does not contain value '{}'.", args[0].repr(), args[1]),
    }))
}

fn expect_dict(value: &Value) -> Result<&[(String, Value)], EngineError> {
    match value {
        Value::Dict(entries) => Ok(entries),
        other => Err(EngineError::execution_failed(format!(
            "Expected a dictionary, got {}.",
            other.repr()
        ))),
    }
}

// DebugLibrary

fn debug(engine: &mut BuiltinEngine, _args: Vec<Value>) -> Result<Value, EngineError> {
    let session = engine.session().clone();
    crate::session::debug(engine, &session)?;
    Ok(Value::None)
}

fn debug_if(engine: &mut BuiltinEngine, args: Vec<Value>) -> Result<Value, EngineError> {
    if evaluate_condition(&args[0].to_string())? {
        return debug(engine, Vec::new());
    }
    Ok(Value::None)
}

/// Evaluate the small expression language accepted by `Should Be True` and `Debug If`
///
/// Supports a single comparison (`==`, `!=`, `>=`, `<=`, `>`, `<`) between numbers or
/// (optionally quoted) strings, and bare truthy values.
pub(crate) fn evaluate_condition(expression: &str) -> Result<bool, EngineError> {
    let expression = expression.trim();

    for op in ["==", "!=", ">=", "<=", ">", "<"] {
        if let Some((left, right)) = expression.split_once(op) {
            return Ok(compare(left.trim(), op, right.trim()));
        }
    }

    match expression.to_lowercase().as_str() {
        "true" => return Ok(true),
        "false" | "none" | "" => return Ok(false),
        _ => {}
    }
    if let Ok(number) = expression.parse::<f64>() {
        return Ok(number != 0.0);
    }
    if let Some(text) = unquote(expression) {
        return Ok(!text.is_empty());
    }

    Err(EngineError::execution_failed(format!(
        "Evaluating expression '{}' failed: unsupported expression.",
        expression
    )))
}

fn compare(left: &str, op: &str, right: &str) -> bool {
    use std::cmp::Ordering;

    let ordering = match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r),
        _ => {
            let l = unquote(left).unwrap_or(left);
            let r = unquote(right).unwrap_or(right);
            Some(l.cmp(r))
        }
    };

    match (op, ordering) {
        ("==", Some(o)) => o == Ordering::Equal,
        ("!=", Some(o)) => o != Ordering::Equal,
        (">=", Some(o)) => o != Ordering::Less,
        ("<=", Some(o)) => o != Ordering::Greater,
        (">", Some(o)) => o == Ordering::Greater,
        ("<", Some(o)) => o == Ordering::Less,
        // NaN compares unequal to everything
        ("!=", None) => true,
        _ => false,
    }
}

fn unquote(text: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|q| {
        text.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })
}

/// Parse `1.5`, `500ms`, `2s`, `2 seconds`, `1min` ...
pub(crate) fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim().to_lowercase();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.parse().ok()?;

    let scale = match unit.trim() {
        "" | "s" | "sec" | "second" | "seconds" => 1.0,
        "ms" | "millisecond" | "milliseconds" => 0.001,
        "m" | "min" | "minute" | "minutes" => 60.0,
        _ => return None,
    };
    Duration::try_from_secs_f64(number * scale).ok()
}
