use std::env;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

/// Environment variable naming the history file
pub const HISTORY_ENV: &str = "RFDEBUG_HISTORY";
pub const DEFAULT_HISTORY: &str = "~/.rfdebug_history";

/// Settings for one interactive session
#[derive(Debug, Clone, PartialEq)]
pub struct ShellConfig {
    /// `None` when no home directory can be found for `~`
    pub history_path: Option<PathBuf>,
    pub colored: bool,
    /// stdin is a terminal: line editing and the SIGINT stop monitor are used
    pub interactive: bool,
}

impl ShellConfig {
    pub fn from_env() -> Self {
        let raw = env::var(HISTORY_ENV).unwrap_or_else(|_| DEFAULT_HISTORY.to_string());
        Self {
            history_path: expand_home(&raw, home::home_dir().as_deref()),
            colored: io::stdout().is_terminal(),
            interactive: io::stdin().is_terminal(),
        }
    }

    pub fn with_history(mut self, path: &str) -> Self {
        self.history_path = expand_home(path, home::home_dir().as_deref());
        self
    }

    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    /// A piped stdin cannot tell Ctrl-C at the prompt apart from Ctrl-C in a keyword,
    /// so the default SIGINT behaviour is kept there
    pub fn handles_interrupts(&self) -> bool {
        self.interactive
    }
}

/// Expand a leading `~` against `home`
pub fn expand_home(path: &str, home: Option<&Path>) -> Option<PathBuf> {
    if path == "~" {
        return home.map(Path::to_path_buf);
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_is_expanded_against_home() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(
            expand_home("~/.rfdebug_history", Some(home.path())),
            Some(home.path().join(".rfdebug_history"))
        );
        assert_eq!(
            expand_home("~", Some(home.path())),
            Some(home.path().to_path_buf())
        );
    }

    #[test]
    fn other_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("history");
        let raw = file.to_string_lossy().into_owned();
        assert_eq!(expand_home(&raw, None), Some(file));
        assert_eq!(expand_home("~user/history", None), Some(PathBuf::from("~user/history")));
    }

    #[test]
    fn tilde_without_home_disables_history() {
        assert_eq!(expand_home("~/.rfdebug_history", None), None);
    }

    #[test]
    fn overrides_apply_on_top() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom_history");
        let config = ShellConfig {
            history_path: None,
            colored: true,
            interactive: true,
        }
        .with_history(&file.to_string_lossy())
        .without_color();

        assert_eq!(config.history_path, Some(file));
        assert!(!config.colored);
        assert!(config.handles_interrupts());
    }

    #[test]
    fn piped_input_keeps_default_interrupts() {
        let config = ShellConfig {
            history_path: None,
            colored: false,
            interactive: false,
        };
        assert!(!config.handles_interrupts());
    }
}
