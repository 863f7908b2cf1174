use rfdebug::engine::{BuiltinEngine, Engine, EngineError, KeywordDoc, LibraryInfo, Value};
use rfdebug::repl::ReadOutcome;
use rfdebug::session::Session;
use rfdebug::shell::DebugShell;
use rfdebug::styles::SharedBuffer;

/// Run a scripted shell on the bundled engine and return what it printed
fn run_shell(lines: &[&str]) -> (Session, String) {
    let (session, output) = Session::scripted(lines);
    let mut engine = BuiltinEngine::new(session.clone());
    DebugShell::new(&mut engine, session.clone())
        .cmdloop(Some(""))
        .unwrap();
    (session, output.contents())
}

#[test]
fn libs_lists_imported_then_builtin_libraries() {
    let (_, output) = run_shell(&["libs"]);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines[0], "< Imported libraries:");
    assert!(lines[1].starts_with("   BuiltIn "));
    let builtin_header = lines
        .iter()
        .position(|line| *line == "< Builtin libraries:")
        .unwrap();
    assert!(builtin_header > 1);
    assert!(lines[builtin_header + 1..].contains(&"   Collections "));
}

#[test]
fn libs_with_source_adds_a_line_per_library() {
    let (_, plain) = run_shell(&["libs"]);
    let (_, with_source) = run_shell(&["ls  -s"]);
    assert_eq!(
        with_source.lines().count(),
        plain.lines().count() + 2,
        "{}",
        with_source
    );
}

#[test]
fn keywords_of_an_unknown_library() {
    let (_, output) = run_shell(&["keywords nosuchlib"]);
    assert_eq!(output, "< not found library nosuchlib\n");
}

#[test]
fn keywords_of_a_library_prefix() {
    let (_, output) = run_shell(&["k debug"]);
    assert_eq!(
        output,
        "< Keywords of library DebugLibrary\n\
         \u{20}  Debug\t Open an interactive shell, run any keywords.\n\
         \u{20}  Debug If\t Runs the Debug keyword if condition is true.\n"
    );
}

#[test]
fn docs_of_one_and_of_no_keyword() {
    let (_, output) = run_shell(&["d  no operation", "docs nothing here"]);
    assert!(output.starts_with("Does absolutely nothing."));
    assert!(output.ends_with("< not find keyword nothing here\n"));
}

#[test]
fn assignment_then_echo() {
    let (_, output) = run_shell(&["${x} =  Create List    a    b", "${x}"]);
    assert_eq!(output, "# ${x} = ['a', 'b']\n['a', 'b']\n");
}

#[test]
fn failing_keyword_does_not_stop_the_loop() {
    let (_, output) = run_shell(&["fail", "log to console  after"]);
    assert_eq!(
        output,
        "! keyword: fail\n! handler execution failed: AssertionError\nafter\n"
    );
}

#[test]
fn exit_does_not_become_the_last_command() {
    let (session, _) = run_shell(&["libs", "exit", "keywords"]);
    assert_eq!(session.context.last_command(), "libs");
}

#[test]
fn empty_line_is_a_no_op_outside_step_mode() {
    let (_, output) = run_shell(&["log to console  once", "", ""]);
    assert_eq!(output, "once\n");
}

#[test]
fn empty_line_replays_in_step_mode() {
    let (session, output) = Session::scripted(&["log to console  again", "", ""]);
    session.context.set_step_mode(true);
    let mut engine = BuiltinEngine::new(session.clone());
    DebugShell::new(&mut engine, session.clone())
        .cmdloop(Some(""))
        .unwrap();

    assert_eq!(output.contents(), "again\nagain\nagain\n");
}

#[test]
fn help_lists_commands_and_topics() {
    let (_, output) = run_shell(&["help", "?step", "help nothing"]);
    assert!(output.contains("Documented commands (type help <topic>):\n"));
    assert!(output.contains("longlist"));
    assert!(output.contains("Execute the current line, stop at the first possible occasion.\n"));
    assert!(output.ends_with("*** No help on nothing\n"));
}

#[test]
fn list_outside_step_mode() {
    let (_, output) = run_shell(&["list", "ll"]);
    assert_eq!(
        output,
        "Please run `step` or `next` command first.\n\
         Please run `step` or `next` command first.\n"
    );
}

#[test]
fn selenium_reports_each_command() {
    let (_, output) = run_shell(&["selenium  example.com  chrome"]);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "# import library  SeleniumLibrary");
    assert_eq!(lines[1], "! keyword: import library  SeleniumLibrary");
    assert!(lines.contains(&"# open browser  http://example.com  chrome"));
}

#[test]
fn interrupt_at_the_prompt_keeps_going() {
    let (session, output) = Session::scripted_outcomes(vec![
        ReadOutcome::Interrupted,
        ReadOutcome::Line("log to console  alive".to_string()),
        ReadOutcome::Interrupted,
    ]);
    let mut engine = BuiltinEngine::new(session.clone());
    DebugShell::new(&mut engine, session.clone())
        .cmdloop(Some(""))
        .unwrap();
    assert_eq!(output.contents(), "alive\n");
}

/// Engine that records what the shell asks of it
#[derive(Default)]
struct Recording {
    calls: Vec<String>,
    resets: usize,
}

impl Engine for Recording {
    fn libraries(&self) -> Vec<LibraryInfo> {
        Vec::new()
    }

    fn builtin_library_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn library_keywords(&self, _library: &str) -> Vec<KeywordDoc> {
        Vec::new()
    }

    fn run_keyword(&mut self, name: &str, args: &[String]) -> Result<Value, EngineError> {
        self.calls.push(format!("{}|{}", name, args.join("|")));
        match name {
            "Broken" => Err(EngineError::Unsupported("no such thing".to_string())),
            _ => Ok(Value::None),
        }
    }

    fn set_variable(&mut self, _name: &str, _value: Value) -> Result<(), EngineError> {
        Ok(())
    }

    fn clear_pending_cancellation(&mut self) -> bool {
        self.resets += 1;
        false
    }
}

fn run_recording(lines: &[&str]) -> (Recording, Session, SharedBuffer) {
    let (session, output) = Session::scripted(lines);
    let mut engine = Recording::default();
    DebugShell::new(&mut engine, session.clone())
        .cmdloop(Some(""))
        .unwrap();
    (engine, session, output)
}

#[test]
fn step_then_continue_never_reaches_the_engine() {
    let (engine, session, _) = run_recording(&["step"]);
    assert!(session.context.in_step_mode());
    assert!(engine.calls.is_empty());

    let (session, _) = {
        let (session, output) = Session::scripted(&["continue"]);
        session.context.set_step_mode(true);
        let mut engine = Recording::default();
        DebugShell::new(&mut engine, session.clone())
            .cmdloop(Some(""))
            .unwrap();
        assert!(engine.calls.is_empty());
        (session, output)
    };
    assert!(!session.context.in_step_mode());
}

#[test]
fn cancellation_is_cleared_every_iteration() {
    // Two lines, then the end-of-input iteration
    let (engine, _, _) = run_recording(&["# comment", "Some Keyword  1  2"]);
    assert_eq!(engine.resets, 3);
    assert_eq!(engine.calls, vec!["Some Keyword|1|2"]);
}

#[test]
fn unexpected_engine_errors_are_reported() {
    let (_, _, output) = run_recording(&["Broken"]);
    assert_eq!(
        output.contents(),
        "! keyword: Broken\n! FAILED: Unsupported(\"no such thing\")\n"
    );
}

#[test]
fn nested_debug_sessions_share_the_reader() {
    let (session, output) = Session::scripted(&[
        "debug",
        "log to console  inner",
        "exit",
        "log to console  outer",
    ]);
    let mut engine = BuiltinEngine::new(session.clone());
    DebugShell::new(&mut engine, session.clone())
        .cmdloop(Some(""))
        .unwrap();

    let text = output.contents();
    let enter = text.find(">>>>> Enter interactive shell").unwrap();
    let inner = text.find("inner").unwrap();
    let exit = text.find(">>>>> Exit shell.").unwrap();
    let outer = text.find("outer").unwrap();
    assert!(enter < inner && inner < exit && exit < outer);
}

/// Two libraries that both define `Same`
struct Overlapping;

impl Engine for Overlapping {
    fn libraries(&self) -> Vec<LibraryInfo> {
        ["A", "B"]
            .into_iter()
            .map(|name| LibraryInfo {
                name: name.to_string(),
                version: String::new(),
                doc: String::new(),
                source: None,
            })
            .collect()
    }

    fn builtin_library_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn library_keywords(&self, library: &str) -> Vec<KeywordDoc> {
        vec![KeywordDoc::new("Same", library, "Shared name.")]
    }

    fn run_keyword(&mut self, _name: &str, _args: &[String]) -> Result<Value, EngineError> {
        Ok(Value::None)
    }

    fn set_variable(&mut self, _name: &str, _value: Value) -> Result<(), EngineError> {
        Ok(())
    }

    fn clear_pending_cancellation(&mut self) -> bool {
        false
    }
}

#[test]
fn docs_of_an_ambiguous_keyword_lists_every_match() {
    let (session, output) = Session::scripted(&["d same"]);
    let mut engine = Overlapping;
    DebugShell::new(&mut engine, session.clone())
        .cmdloop(Some(""))
        .unwrap();
    assert_eq!(output.contents(), "< found 2 keywords A.Same, B.Same\n");
}

#[test]
fn debug_if_opens_a_shell_only_when_true() {
    let (_, output) = run_shell(&["Debug If  1 > 2", "Debug If  2 > 1", "exit"]);
    assert_eq!(output.matches(">>>>> Enter interactive shell").count(), 1);
    assert_eq!(output.matches(">>>>> Exit shell.").count(), 1);
}

#[test]
fn library_source_is_a_file_path() {
    let (_, output) = run_shell(&["libs -s"]);
    let source = output
        .lines()
        .map(str::trim)
        .find(|line| line.ends_with("stdlib.rs"))
        .unwrap();
    assert!(std::path::Path::new(source).is_file(), "{}", source);
}
