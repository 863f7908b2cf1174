pub mod builtin;
pub mod catalog;
pub mod signal;
mod stdlib;
pub mod value;
pub mod variables;

use std::ops::RangeInclusive;
use std::path::Path;

pub use builtin::BuiltinEngine;
pub use signal::StopSignalMonitor;
pub use value::Value;

/// Failures reported by an engine invocation
///
/// The shell reports each variant differently so the user can tell a failing keyword apart
/// from a broken invocation and from a bug on the host side.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The keyword ran and raised
    #[error("{message}")]
    HandlerFailed {
        message: String,
        full_message: String,
    },
    /// The engine could not run the keyword at all (unknown name, bad arguments, ...)
    #[error("{0}")]
    ExecutionFailed(String),
    /// The installed engine lacks an optional capability
    #[error("{0}")]
    Unsupported(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn handler_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        EngineError::HandlerFailed {
            full_message: message.clone(),
            message,
        }
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        EngineError::ExecutionFailed(message.into())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Other(err.into())
    }
}

/// An imported library as seen by the shell
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub doc: String,
    pub source: Option<String>,
}

/// Documentation of one keyword
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordDoc {
    pub name: String,
    pub library: String,
    pub doc: String,
}

impl KeywordDoc {
    pub fn new(name: &str, library: &str, doc: &str) -> Self {
        Self {
            name: name.to_string(),
            library: library.to_string(),
            doc: doc.to_string(),
        }
    }

    /// First line of the documentation
    pub fn summary(&self) -> &str {
        self.doc.lines().next().unwrap_or("")
    }

    /// `Library.Keyword`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.library, self.name)
    }
}

/// What the debug shell can ask of the engine it is embedded in
///
/// Every call blocks until the engine is done. The shell never runs engine code on its own.
pub trait Engine {
    /// Imported libraries, sorted by name
    fn libraries(&self) -> Vec<LibraryInfo>;

    /// Names of the standard libraries that ship with the engine
    fn builtin_library_names(&self) -> Vec<String>;

    /// Introspect the keywords of one imported library
    fn library_keywords(&self, library: &str) -> Vec<KeywordDoc>;

    /// Run a keyword with positional arguments, as the engine would from a test
    fn run_keyword(&mut self, name: &str, args: &[String]) -> Result<Value, EngineError>;

    /// Bind a value to a decorated variable name (`${x}`, `@{x}`, `&{x}`)
    fn set_variable(&mut self, name: &str, value: Value) -> Result<(), EngineError>;

    /// Print text to the console after the engine has substituted its variables
    fn log_to_console(&mut self, message: &str) -> Result<(), EngineError> {
        self.run_keyword("Log To Console", &[message.to_string()])
            .map(|_| ())
    }

    /// Forget a stop request left over from an interrupted keyword
    ///
    /// Returns true when something was actually pending.
    fn clear_pending_cancellation(&mut self) -> bool;

    /// `Library.Keyword` form of a keyword name, if the engine can resolve it
    fn qualified_name(&self, _name: &str) -> Option<String> {
        None
    }

    /// First and last line of the test case containing `lineno`
    fn test_case_lines(
        &self,
        _path: &Path,
        _lineno: usize,
    ) -> Result<RangeInclusive<usize>, EngineError> {
        Err(EngineError::Unsupported(
            "this engine does not report test case boundaries".to_string(),
        ))
    }
}
