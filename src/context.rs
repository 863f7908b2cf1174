use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::KeywordDoc;

/// State shared between every debug shell opened during one host engine run
///
/// A shell instance is torn down each time control goes back to the engine (after `step`,
/// `next` or `continue`), so anything that has to survive until the next pause lives here
/// rather than on the shell.
#[derive(Debug, Default)]
pub struct ShellContext {
    pub in_step_mode: bool,
    pub last_command: String,
    pub current_source_path: Option<PathBuf>,
    pub current_source_lineno: Option<usize>,
    /// Keyword documentation per library name. Never invalidated: a library reloaded with
    /// different keywords keeps showing the first listing.
    keyword_cache: HashMap<String, Arc<[KeywordDoc]>>,
}

/// Cheap, cloneable handle onto a `ShellContext`
#[derive(Debug, Clone, Default)]
pub struct Context(Arc<RwLock<ShellContext>>);

/// Process-wide context instance
static GLOBAL_CONTEXT: OnceLock<Context> = OnceLock::new();

impl Context {
    /// Get the context shared by the whole process
    pub fn global() -> Context {
        GLOBAL_CONTEXT.get_or_init(Context::default).clone()
    }

    // A panic while holding the lock leaves plain data behind, so keep using it.
    fn read(&self) -> RwLockReadGuard<'_, ShellContext> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShellContext> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn in_step_mode(&self) -> bool {
        self.read().in_step_mode
    }

    pub fn set_step_mode(&self, value: bool) {
        self.write().in_step_mode = value;
    }

    pub fn last_command(&self) -> String {
        self.read().last_command.clone()
    }

    pub fn set_last_command(&self, command: &str) {
        let mut state = self.write();
        if state.last_command != command {
            state.last_command = command.to_string();
        }
    }

    /// Where the paused engine currently is, if it has reported a location
    pub fn source_location(&self) -> Option<(PathBuf, usize)> {
        let state = self.read();
        match (&state.current_source_path, state.current_source_lineno) {
            (Some(path), Some(lineno)) => Some((path.clone(), lineno)),
            _ => None,
        }
    }

    pub fn set_source_location(&self, path: &Path, lineno: usize) {
        let mut state = self.write();
        state.current_source_path = Some(path.to_path_buf());
        state.current_source_lineno = Some(lineno);
    }

    pub fn cached_keywords(&self, library: &str) -> Option<Arc<[KeywordDoc]>> {
        self.read().keyword_cache.get(library).cloned()
    }

    pub fn cache_keywords(&self, library: &str, keywords: Vec<KeywordDoc>) -> Arc<[KeywordDoc]> {
        let keywords: Arc<[KeywordDoc]> = keywords.into();
        self.write()
            .keyword_cache
            .insert(library.to_string(), Arc::clone(&keywords));
        keywords
    }
}
