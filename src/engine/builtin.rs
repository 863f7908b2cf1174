use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::stdlib::{self, KeywordDef, LibraryDef};
use super::variables::{VariableStore, normalize};
use super::{Engine, EngineError, KeywordDoc, LibraryInfo, StopSignalMonitor, Value};
use crate::session::Session;

/// Small in-process engine used when the shell runs standalone
///
/// It knows the bundled `BuiltIn`, `Collections` and `DebugLibrary` libraries, keeps a
/// variable store, and remembers where the test cases of walked suites start and end.
pub struct BuiltinEngine {
    session: Session,
    variables: VariableStore,
    /// Sorted by library name
    imported: Vec<&'static LibraryDef>,
    test_cases: HashMap<PathBuf, Vec<RangeInclusive<usize>>>,
    monitor: Arc<StopSignalMonitor>,
}

impl BuiltinEngine {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            variables: VariableStore::new(),
            imported: vec![&stdlib::BUILTIN, &stdlib::DEBUG_LIBRARY],
            test_cases: HashMap::new(),
            monitor: StopSignalMonitor::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn monitor(&self) -> &Arc<StopSignalMonitor> {
        &self.monitor
    }

    /// Make a known library's keywords available
    pub fn import_library(&mut self, name: &str) -> Result<(), EngineError> {
        let Some(library) = stdlib::find_library(name) else {
            return Err(EngineError::execution_failed(format!(
                "Importing library '{}' failed: library not found.",
                name
            )));
        };

        if self.imported.iter().any(|lib| lib.name == library.name) {
            return Ok(());
        }

        self.imported.push(library);
        self.imported.sort_by_key(|lib| lib.name);
        tracing::info!(library = library.name, "imported library");
        Ok(())
    }

    /// Remember the line ranges of the test cases in a suite file
    pub fn register_test_cases(&mut self, path: &Path, spans: Vec<RangeInclusive<usize>>) {
        self.test_cases.insert(path.to_path_buf(), spans);
    }

    /// Find a keyword by plain or `Library.Keyword` name, ignoring case, spaces and underscores
    pub(crate) fn resolve(
        &self,
        name: &str,
    ) -> Result<(&'static LibraryDef, &'static KeywordDef), EngineError> {
        let wanted = normalize(name);
        let matches: Vec<(&'static LibraryDef, &'static KeywordDef)> = self
            .imported
            .iter()
            .flat_map(|lib| {
                lib.keywords
                    .iter()
                    .filter(|kw| normalize(kw.name) == wanted)
                    .map(move |kw| (*lib, kw))
            })
            .collect();

        match matches.as_slice() {
            [found] => return Ok(*found),
            [] => {}
            many => {
                let names: Vec<String> = many
                    .iter()
                    .map(|(lib, kw)| format!("{}.{}", lib.name, kw.name))
                    .collect();
                return Err(EngineError::execution_failed(format!(
                    "Multiple keywords with name '{}' found. Give the full name of the keyword you want to use: {}",
                    name,
                    names.join(", ")
                )));
            }
        }

        // Library names may contain dots too, so try every split point
        for (dot, _) in name.match_indices('.') {
            let (lib_name, kw_name) = (&name[..dot], &name[dot + 1..]);
            let Some(lib) = self
                .imported
                .iter()
                .find(|lib| normalize(lib.name) == normalize(lib_name))
            else {
                continue;
            };
            if let Some(kw) = lib
                .keywords
                .iter()
                .find(|kw| normalize(kw.name) == normalize(kw_name))
            {
                return Ok((*lib, kw));
            }
        }

        Err(EngineError::execution_failed(format!(
            "No keyword with name '{}' found.",
            name
        )))
    }
}

impl Engine for BuiltinEngine {
    fn libraries(&self) -> Vec<LibraryInfo> {
        self.imported
            .iter()
            .map(|lib| LibraryInfo {
                name: lib.name.to_string(),
                version: lib.version.to_string(),
                doc: lib.doc.to_string(),
                source: Some(stdlib::SOURCE.to_string()),
            })
            .collect()
    }

    fn builtin_library_names(&self) -> Vec<String> {
        let mut names: Vec<String> = stdlib::STANDARD_LIBRARIES
            .iter()
            .map(|lib| lib.name.to_string())
            .collect();
        names.sort();
        names
    }

    fn library_keywords(&self, library: &str) -> Vec<KeywordDoc> {
        self.imported
            .iter()
            .filter(|lib| lib.name == library)
            .flat_map(|lib| {
                lib.keywords
                    .iter()
                    .map(|kw| KeywordDoc::new(kw.name, lib.name, kw.doc))
            })
            .collect()
    }

    fn run_keyword(&mut self, name: &str, args: &[String]) -> Result<Value, EngineError> {
        let (library, keyword) = self.resolve(name)?;

        let mut values = Vec::with_capacity(args.len());
        for raw in args {
            values.extend(self.variables.resolve_argument(raw)?);
        }

        if !keyword.accepts(values.len()) {
            return Err(EngineError::execution_failed(format!(
                "Keyword '{}.{}' expected {} arguments, got {}.",
                library.name,
                keyword.name,
                keyword.expected(),
                values.len()
            )));
        }

        tracing::debug!(
            library = library.name,
            keyword = keyword.name,
            args = values.len(),
            "running keyword"
        );
        (keyword.run)(self, values)
    }

    fn set_variable(&mut self, name: &str, value: Value) -> Result<(), EngineError> {
        self.variables.set(name, value)
    }

    fn clear_pending_cancellation(&mut self) -> bool {
        self.monitor.reset()
    }

    fn qualified_name(&self, name: &str) -> Option<String> {
        self.resolve(name)
            .ok()
            .map(|(lib, kw)| format!("{}.{}", lib.name, kw.name))
    }

    fn test_case_lines(
        &self,
        path: &Path,
        lineno: usize,
    ) -> Result<RangeInclusive<usize>, EngineError> {
        self.test_cases
            .get(path)
            .and_then(|spans| spans.iter().find(|span| span.contains(&lineno)))
            .cloned()
            .ok_or_else(|| {
                EngineError::execution_failed(format!(
                    "No test case found at {}:{}.",
                    path.display(),
                    lineno
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn engine() -> (BuiltinEngine, crate::styles::SharedBuffer) {
        let (session, output) = Session::scripted(&[]);
        (BuiltinEngine::new(session), output)
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keyword_names_are_normalized() {
        let (mut engine, output) = engine();
        engine
            .run_keyword("log to console", &args(&["hello"]))
            .unwrap();
        engine
            .run_keyword("BuiltIn.Log_To_Console", &args(&["again"]))
            .unwrap();
        assert_eq!(output.contents(), "hello\nagain\n");
    }

    #[test]
    fn unknown_keyword_is_an_execution_failure() {
        let (mut engine, _) = engine();
        match engine.run_keyword("nothing", &[]) {
            Err(EngineError::ExecutionFailed(msg)) => {
                assert_eq!(msg, "No keyword with name 'nothing' found.")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn fail_is_a_handler_failure() {
        let (mut engine, _) = engine();
        match engine.run_keyword("Fail", &[]) {
            Err(EngineError::HandlerFailed { full_message, .. }) => {
                assert_eq!(full_message, "AssertionError")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn argument_count_is_checked() {
        let (mut engine, _) = engine();
        match engine.run_keyword("Fail", &args(&["a", "b"])) {
            Err(EngineError::ExecutionFailed(msg)) => assert_eq!(
                msg,
                "Keyword 'BuiltIn.Fail' expected 0 to 1 arguments, got 2."
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn variables_flow_between_keywords() {
        let (mut engine, output) = engine();
        let list = engine
            .run_keyword("Create List", &args(&["hello", "world"]))
            .unwrap();
        engine.set_variable("@{list}", list).unwrap();

        let count = engine
            .run_keyword("Get Length", &args(&["${list}"]))
            .unwrap();
        assert_eq!(count, Value::Integer(2));

        let spliced = engine
            .run_keyword("Create List", &args(&["@{list}", "!"]))
            .unwrap();
        assert_eq!(spliced.repr(), "['hello', 'world', '!']");

        engine.log_to_console("${list}").unwrap();
        assert_eq!(output.contents(), "['hello', 'world']\n");
    }

    #[test]
    fn create_dictionary_from_pairs() {
        let (mut engine, _) = engine();
        let dict = engine
            .run_keyword("Create Dictionary", &args(&["name=admin", "role=x=y"]))
            .unwrap();
        assert_eq!(dict.repr(), "{'name': 'admin', 'role': 'x=y'}");
        assert!(
            engine
                .run_keyword("Create Dictionary", &args(&["broken"]))
                .is_err()
        );
    }

    #[test]
    fn import_library_adds_keywords() {
        let (mut engine, _) = engine();
        assert!(engine.qualified_name("Get From List").is_none());

        engine
            .run_keyword("Import Library", &args(&["Collections"]))
            .unwrap();
        assert_eq!(
            engine.qualified_name("get from list").as_deref(),
            Some("Collections.Get From List")
        );
        let names: Vec<String> = engine.libraries().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["BuiltIn", "Collections", "DebugLibrary"]);

        match engine.run_keyword("Import Library", &args(&["SeleniumLibrary"])) {
            Err(EngineError::ExecutionFailed(msg)) => assert!(msg.contains("SeleniumLibrary")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pending_cancellation_stops_sleep_until_cleared() {
        let (mut engine, _) = engine();
        engine.monitor().record_signal();
        assert!(engine.run_keyword("Sleep", &args(&["1s"])).is_err());

        assert!(engine.clear_pending_cancellation());
        assert!(!engine.clear_pending_cancellation());
        engine.run_keyword("Sleep", &args(&["10ms"])).unwrap();
    }

    #[test]
    fn test_case_lines_come_from_registered_suites() {
        let (mut engine, _) = engine();
        let path = Path::new("suite.robot");
        engine.register_test_cases(path, vec![2..=4, 6..=9]);

        assert_eq!(engine.test_case_lines(path, 7).unwrap(), 6..=9);
        assert!(engine.test_case_lines(path, 5).is_err());
        assert!(engine.test_case_lines(Path::new("other.robot"), 2).is_err());
    }
}
