pub mod bridge;
pub mod commands;
pub mod completer;
pub mod source;

use std::collections::VecDeque;

use anyhow::Result;

use crate::engine::Engine;
use crate::engine::catalog::all_keywords;
use crate::repl::ReadOutcome;
use crate::session::Session;
use commands::CommandTable;
use completer::{CmdCompleter, build_candidates};

pub use bridge::{parse_keyword, run_robot_command};
pub use commands::CommandSpec;

const PROMPT: &str = "> ";

const INTRO: &str = "\
Only accepted plain text format keyword separated with two or more spaces.
Type \"help\" for more information.";

/// Sentinel every way of leaving the shell is turned into
const EOF: &str = "EOF";

/// One pause in the engine's run: reads commands until told to hand control back
pub struct DebugShell<'a> {
    pub(crate) engine: &'a mut dyn Engine,
    pub(crate) session: Session,
    pub(crate) commands: CommandTable,
    cmdqueue: VecDeque<String>,
    lastcmd: String,
    prompt: String,
}

impl<'a> DebugShell<'a> {
    pub fn new(engine: &'a mut dyn Engine, session: Session) -> Self {
        Self {
            engine,
            session,
            commands: CommandTable::standard(),
            cmdqueue: VecDeque::new(),
            lastcmd: String::new(),
            prompt: PROMPT.to_string(),
        }
    }

    /// Run until a command asks to stop. `intro` replaces the default banner; "" hides it.
    pub fn cmdloop(&mut self, intro: Option<&str>) -> Result<()> {
        let intro = intro.unwrap_or(INTRO);
        if !intro.is_empty() {
            self.session.console.line(intro)?;
        }

        tracing::debug!("debug shell started");
        while !self.loop_once()? {}
        Ok(())
    }

    /// Handle one line; true once the shell should stop
    pub fn loop_once(&mut self) -> Result<bool> {
        self.pre_loop_iter();

        let Some(mut line) = self.next_line()? else {
            return Ok(false);
        };
        if line == "exit" {
            line = EOF.to_string();
        }

        // Never dispatch the sentinel, so it cannot overwrite the last command
        let stop = if line == EOF { true } else { self.onecmd(&line)? };
        Ok(self.postcmd(stop, &line))
    }

    fn pre_loop_iter(&mut self) {
        if self.engine.clear_pending_cancellation() {
            tracing::info!("Reset last exception of DebugLibrary");
        }
    }

    /// Queued commands first, then the user; `None` when the prompt was interrupted
    fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.cmdqueue.pop_front() {
            return Ok(Some(line));
        }

        let completer = self.completer();
        let outcome = self
            .session
            .reader
            .borrow_mut()
            .read_line(&self.prompt, completer)?;
        match outcome {
            ReadOutcome::Line(line) => Ok(Some(line)),
            ReadOutcome::Interrupted => Ok(None),
            ReadOutcome::Eof => Ok(Some(EOF.to_string())),
        }
    }

    /// Dispatch one line, keeping the last command in the shared context
    pub fn onecmd(&mut self, line: &str) -> Result<bool> {
        self.lastcmd = self.session.context.last_command();
        let stop = self.dispatch(line);
        self.session.context.set_last_command(&self.lastcmd);
        stop
    }

    fn dispatch(&mut self, line: &str) -> Result<bool> {
        let (command, arg, line) = parse_line(line);
        if line.is_empty() {
            return self.emptyline();
        }

        self.lastcmd = line.clone();
        if line == EOF {
            self.lastcmd.clear();
        }

        match self.commands.get(&command) {
            Some(spec) if !command.is_empty() => (spec.handler)(self, &arg),
            _ => self.default(&line),
        }
    }

    /// Repeat the last command while stepping, otherwise do nothing
    fn emptyline(&mut self) -> Result<bool> {
        if self.session.context.in_step_mode() && !self.lastcmd.is_empty() {
            let last = self.lastcmd.clone();
            return self.dispatch(&last);
        }
        Ok(false)
    }

    /// Anything that is not a command is a keyword
    fn default(&mut self, line: &str) -> Result<bool> {
        let console = self.session.console.clone();
        run_robot_command(&mut *self.engine, &console, line.trim())?;
        Ok(false)
    }

    fn postcmd(&mut self, stop: bool, line: &str) -> bool {
        if stop {
            tracing::debug!(line, queued = self.cmdqueue.len(), "debug shell stopped");
        }
        stop
    }

    pub fn append_command(&mut self, command: &str) {
        self.cmdqueue.push_back(command.to_string());
    }

    pub fn append_exit(&mut self) {
        self.append_command("exit");
    }

    /// Lines queued but not yet run
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.cmdqueue.iter().map(String::as_str)
    }

    /// Completion snapshot of the commands, libraries and keywords available right now
    pub fn completer(&self) -> CmdCompleter {
        let libraries = self.engine.libraries();
        let keywords = all_keywords(&*self.engine, &self.session.context);
        let helps = self.commands.helps();
        let names = libraries.iter().map(|lib| lib.name.clone()).collect();
        CmdCompleter::new(
            build_candidates(&helps, &libraries, &keywords),
            self.commands.completers(),
            names,
        )
    }
}

fn is_identchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split a line into `(command, argument, line)`; a leading `?` means `help`
pub fn parse_line(line: &str) -> (String, String, String) {
    let mut line = line.trim().to_string();
    if line.is_empty() {
        return (String::new(), String::new(), line);
    }
    if let Some(topic) = line.strip_prefix('?') {
        line = format!("help {}", topic);
    }

    let end = line.find(|c: char| !is_identchar(c)).unwrap_or(line.len());
    let command = line[..end].to_string();
    let arg = line[end..].trim().to_string();
    (command, arg, line)
}
