use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;

use crate::context::Context;
use crate::engine::Engine;
use crate::repl::{LineReader, ReadOutcome, ScriptedReader};
use crate::shell::DebugShell;
use crate::styles::{Console, SharedBuffer};

pub type SharedReader = Rc<RefCell<dyn LineReader>>;

/// Everything a debug shell needs besides the engine
///
/// Shells come and go between pauses; the session is what stays.
#[derive(Clone)]
pub struct Session {
    pub context: Context,
    pub console: Console,
    pub reader: SharedReader,
}

impl Session {
    pub fn new(context: Context, console: Console, reader: impl LineReader + 'static) -> Self {
        let reader: SharedReader = Rc::new(RefCell::new(reader));
        Self {
            context,
            console,
            reader,
        }
    }

    /// Session fed from canned lines, with its output captured
    ///
    /// Uses a private context rather than the process-wide one.
    pub fn scripted(lines: &[&str]) -> (Self, SharedBuffer) {
        Self::scripted_outcomes(
            lines
                .iter()
                .map(|line| ReadOutcome::Line(line.to_string()))
                .collect(),
        )
    }

    pub fn scripted_outcomes(outcomes: Vec<ReadOutcome>) -> (Self, SharedBuffer) {
        let (console, buffer) = Console::buffered();
        let session = Self::new(
            Context::default(),
            console,
            ScriptedReader::new(outcomes),
        );
        (session, buffer)
    }
}

/// Open an interactive shell and block until the user hands control back
pub fn debug(engine: &mut dyn Engine, session: &Session) -> Result<()> {
    let show_intro = !session.context.in_step_mode();
    if show_intro {
        session.console.output("\n>>>>>", "Enter interactive shell")?;
    }

    tracing::debug!(resuming = !show_intro, "opening debug shell");
    let mut shell = DebugShell::new(engine, session.clone());
    if show_intro {
        shell.cmdloop(None)?;
    } else {
        shell.cmdloop(Some(""))?;
    }

    if !session.context.in_step_mode() {
        session.console.output("\n>>>>>", "Exit shell.")?;
    }
    Ok(())
}

/// A step about to be run by the host
pub struct StepEvent<'a> {
    pub path: &'a Path,
    pub lineno: usize,
    /// The step as written in the source file
    pub source: &'a str,
    /// Variable the result is assigned to, if any
    pub assign: Option<&'a str>,
    pub keyword: &'a str,
    pub args: &'a [String],
}

/// Called by the host before every step; pauses in a shell while step mode is on
pub fn step_listener(engine: &mut dyn Engine, session: &Session, step: &StepEvent<'_>) -> Result<()> {
    if !session.context.in_step_mode() {
        return Ok(());
    }

    session.context.set_source_location(step.path, step.lineno);

    let console = &session.console;
    console.output(">", &format!("{}({})", step.path.display(), step.lineno))?;
    console.output("->", step.source.trim())?;

    let mut call = String::new();
    if let Some(assign) = step.assign {
        call.push_str(assign);
        call.push_str(" = ");
    }
    match engine.qualified_name(step.keyword) {
        Some(name) => call.push_str(&name),
        None => call.push_str(step.keyword),
    }
    for arg in step.args {
        call.push_str("  ");
        call.push_str(arg);
    }
    console.output("=>", &call)?;

    debug(engine, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BuiltinEngine;

    #[test]
    fn debug_prints_banners_around_the_shell() {
        let (session, output) = Session::scripted(&["log to console  inside"]);
        let mut engine = BuiltinEngine::new(session.clone());

        debug(&mut engine, &session).unwrap();

        let text = output.contents();
        let enter = text.find("Enter interactive shell").unwrap();
        let inside = text.find("inside").unwrap();
        let exit = text.find("Exit shell.").unwrap();
        assert!(enter < inside && inside < exit);
    }

    #[test]
    fn resuming_in_step_mode_skips_banners() {
        let (session, output) = Session::scripted(&["s"]);
        session.context.set_step_mode(true);
        let mut engine = BuiltinEngine::new(session.clone());

        debug(&mut engine, &session).unwrap();

        let text = output.contents();
        assert!(!text.contains("Enter interactive shell"));
        assert!(!text.contains("Exit shell."));
        assert!(session.context.in_step_mode());
    }

    #[test]
    fn step_listener_is_silent_outside_step_mode() {
        let (session, output) = Session::scripted(&[]);
        let mut engine = BuiltinEngine::new(session.clone());
        let args = vec!["working".to_string()];
        let step = StepEvent {
            path: Path::new("suite.robot"),
            lineno: 3,
            source: "    log to console  working",
            assign: None,
            keyword: "log to console",
            args: &args,
        };

        step_listener(&mut engine, &session, &step).unwrap();
        assert_eq!(output.contents(), "");
        assert_eq!(session.context.source_location(), None);
    }

    #[test]
    fn step_listener_reports_location_and_pauses() {
        let (session, output) = Session::scripted(&["n"]);
        session.context.set_step_mode(true);
        let mut engine = BuiltinEngine::new(session.clone());
        let args = vec!["hello".to_string(), "world".to_string()];
        let step = StepEvent {
            path: Path::new("suite.robot"),
            lineno: 8,
            source: "    @{list} =  Create List    hello    world",
            assign: Some("@{list}"),
            keyword: "Create List",
            args: &args,
        };

        step_listener(&mut engine, &session, &step).unwrap();

        let text = output.contents();
        assert!(text.contains("> suite.robot(8)\n"));
        assert!(text.contains("-> @{list} =  Create List    hello    world\n"));
        assert!(text.contains("=> @{list} = BuiltIn.Create List  hello  world\n"));
        assert_eq!(
            session.context.source_location(),
            Some((Path::new("suite.robot").to_path_buf(), 8))
        );
        assert_eq!(session.context.last_command(), "n");
    }
}
