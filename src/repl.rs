use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context as _, bail};
use reedline::{
    ColumnarMenu, DefaultHinter, Emacs, FileBackedHistory, KeyCode, KeyModifiers, MenuBuilder,
    Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, default_emacs_keybindings,
};

use crate::shell::completer::CmdCompleter;

const COMPLETION_MENU: &str = "completion_menu";
const HISTORY_SIZE: usize = 1000;

/// What came back from one prompt
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C at the prompt
    Interrupted,
    /// Ctrl-D or end of input
    Eof,
}

/// Source of input lines for the debug shell
pub trait LineReader {
    /// Prompt for one line. `completer` reflects the libraries imported right now.
    fn read_line(&mut self, prompt: &str, completer: CmdCompleter) -> anyhow::Result<ReadOutcome>;
}

/// Prompt for the debug shell
struct DebugPrompt {
    text: String,
}

impl Prompt for DebugPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        // Use ANSI reset code to ensure white/default terminal color
        Cow::Owned(format!("\x1b[0m{}", self.text))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}reverse search) ", prefix))
    }
}

/// Interactive line editor with history, auto-suggestion and a Tab completion menu
pub struct ReedlineReader {
    // Taken out while a completer is swapped in
    editor: Option<Reedline>,
}

impl ReedlineReader {
    pub fn new(history_path: Option<PathBuf>) -> Self {
        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu(COMPLETION_MENU.to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );

        let menu = ColumnarMenu::default().with_name(COMPLETION_MENU);
        let mut editor = Reedline::create()
            .with_edit_mode(Box::new(Emacs::new(keybindings)))
            .with_hinter(Box::new(DefaultHinter::default()))
            .with_menu(ReedlineMenu::EngineCompleter(Box::new(menu)))
            .with_quick_completions(false);

        if let Some(path) = history_path {
            match FileBackedHistory::with_file(HISTORY_SIZE, path.clone()) {
                Ok(history) => editor = editor.with_history(Box::new(history)),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "history disabled")
                }
            }
        }

        Self {
            editor: Some(editor),
        }
    }
}

impl LineReader for ReedlineReader {
    fn read_line(&mut self, prompt: &str, completer: CmdCompleter) -> anyhow::Result<ReadOutcome> {
        let Some(editor) = self.editor.take() else {
            bail!("line editor is gone after an earlier failure");
        };
        let mut editor = editor.with_completer(Box::new(completer));
        let prompt = DebugPrompt {
            text: prompt.to_string(),
        };
        let signal = editor.read_line(&prompt);
        self.editor = Some(editor);

        match signal.context("line editor failed")? {
            Signal::Success(line) => Ok(ReadOutcome::Line(line)),
            Signal::CtrlC => Ok(ReadOutcome::Interrupted),
            Signal::CtrlD => Ok(ReadOutcome::Eof),
        }
    }
}

/// Plain reader for piped input; completion is not available
pub struct StdinReader<R> {
    input: R,
}

impl StdinReader<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> StdinReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> LineReader for StdinReader<R> {
    fn read_line(&mut self, prompt: &str, _completer: CmdCompleter) -> anyhow::Result<ReadOutcome> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        Ok(ReadOutcome::Line(trimmed.to_string()))
    }
}

/// Replays canned outcomes, then reports end of input
#[derive(Debug, Default)]
pub struct ScriptedReader {
    outcomes: VecDeque<ReadOutcome>,
}

impl ScriptedReader {
    pub fn new(outcomes: Vec<ReadOutcome>) -> Self {
        Self {
            outcomes: outcomes.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.outcomes.len()
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, _prompt: &str, _completer: CmdCompleter) -> anyhow::Result<ReadOutcome> {
        Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::Eof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_reader_ends_with_eof() {
        let mut reader = ScriptedReader::new(vec![
            ReadOutcome::Line("libs".to_string()),
            ReadOutcome::Interrupted,
        ]);
        assert_eq!(reader.remaining(), 2);
        assert_eq!(
            reader.read_line("> ", CmdCompleter::default()).unwrap(),
            ReadOutcome::Line("libs".to_string())
        );
        assert_eq!(
            reader.read_line("> ", CmdCompleter::default()).unwrap(),
            ReadOutcome::Interrupted
        );
        assert_eq!(
            reader.read_line("> ", CmdCompleter::default()).unwrap(),
            ReadOutcome::Eof
        );
    }

    #[test]
    fn stdin_reader_strips_line_endings() {
        let mut reader = StdinReader::new(io::Cursor::new("log  hi\r\nexit\n"));
        assert_eq!(
            reader.read_line("", CmdCompleter::default()).unwrap(),
            ReadOutcome::Line("log  hi".to_string())
        );
        assert_eq!(
            reader.read_line("", CmdCompleter::default()).unwrap(),
            ReadOutcome::Line("exit".to_string())
        );
        assert_eq!(
            reader.read_line("", CmdCompleter::default()).unwrap(),
            ReadOutcome::Eof
        );
    }
}
