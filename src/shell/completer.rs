use std::collections::HashMap;

use reedline::{Completer, Span, Suggestion};

use super::bridge::{SELENIUM_WEBDRIVERS, parse_keyword};
use crate::engine::catalog::names_with_prefix;
use crate::engine::{KeywordDoc, LibraryInfo};

/// Completes the arguments of one command
pub type ArgCompleter = fn(&ArgumentQuery<'_>) -> Vec<String>;

/// What an argument completer gets to look at
pub struct ArgumentQuery<'a> {
    /// The partial argument under the cursor
    pub text: &'a str,
    pub line: &'a str,
    pub begin: usize,
    pub end: usize,
    /// Names of the imported libraries
    pub libraries: &'a [String],
}

/// One thing the completer can offer at the start of a line
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// What gets inserted and matched against
    pub name: String,
    pub display: String,
    pub summary: String,
}

impl Candidate {
    fn new(name: impl Into<String>, display: impl Into<String>, summary: String) -> Self {
        Self {
            name: name.into(),
            display: display.into(),
            summary,
        }
    }

    /// `Library.Keyword` candidates live a level below commands and bare names
    fn is_qualified(&self) -> bool {
        self.name.contains('.')
    }
}

/// A completion ready to be applied: replace `start..` of the typed text with `value`
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub value: String,
    pub display: String,
    pub summary: Option<String>,
    pub start: usize,
}

/// Commands, then libraries, then each keyword qualified and bare
pub fn build_candidates(
    helps: &[(&str, &str)],
    libraries: &[LibraryInfo],
    keywords: &[KeywordDoc],
) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(helps.len() + libraries.len() + keywords.len() * 2);

    for (name, help) in helps {
        candidates.push(Candidate::new(*name, *name, format!("DEBUG command: {}", help)));
    }

    for lib in libraries {
        candidates.push(Candidate::new(
            lib.name.as_str(),
            lib.name.as_str(),
            format!("Library: {} {}", lib.name, lib.version),
        ));
    }

    for keyword in keywords {
        candidates.push(Candidate::new(
            keyword.qualified_name(),
            keyword.name.as_str(),
            format!("Keyword: {}", keyword.summary()),
        ));
        candidates.push(Candidate::new(
            keyword.name.as_str(),
            keyword.name.as_str(),
            format!("Keyword[{}.]: {}", keyword.library, keyword.summary()),
        ));
    }

    candidates
}

/// Snapshot of everything completable at the moment the prompt was shown
#[derive(Clone, Default)]
pub struct CmdCompleter {
    candidates: Vec<Candidate>,
    completers: HashMap<String, ArgCompleter>,
    libraries: Vec<String>,
}

impl CmdCompleter {
    pub fn new(
        candidates: Vec<Candidate>,
        completers: HashMap<String, ArgCompleter>,
        libraries: Vec<String>,
    ) -> Self {
        Self {
            candidates,
            completers,
            libraries,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Completions for `line` with the cursor at byte offset `pos`
    pub fn complete_line(&self, line: &str, pos: usize) -> Vec<Completion> {
        let pos = pos.min(line.len());
        let text = line[..pos].to_lowercase();
        let parts = parse_keyword(&text);

        if parts.len() >= 2 {
            self.argument_completions(parts[0].trim(), line, pos)
        } else {
            self.command_completions(&text)
        }
    }

    fn command_completions(&self, text: &str) -> Vec<Completion> {
        let wanted = text.trim();
        let qualified = text.contains('.');
        self.candidates
            .iter()
            .filter(|candidate| candidate.is_qualified() == qualified)
            .filter(|candidate| candidate.name.to_lowercase().trim().starts_with(wanted))
            .map(|candidate| Completion {
                value: candidate.name.clone(),
                display: candidate.display.clone(),
                summary: Some(candidate.summary.clone()),
                start: 0,
            })
            .collect()
    }

    fn argument_completions(&self, command: &str, line: &str, end: usize) -> Vec<Completion> {
        let Some(completer) = self.completers.get(command) else {
            return Vec::new();
        };

        let begin = line[..end].rfind(' ').map(|idx| idx + 1).unwrap_or(0);
        let query = ArgumentQuery {
            text: &line[begin..end],
            line,
            begin,
            end,
            libraries: &self.libraries,
        };
        completer(&query)
            .into_iter()
            .map(|value| Completion {
                display: value.clone(),
                value,
                summary: None,
                start: begin,
            })
            .collect()
    }
}

impl Completer for CmdCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        self.complete_line(line, pos)
            .into_iter()
            .map(|completion| Suggestion {
                value: completion.value,
                description: completion.summary,
                span: Span::new(completion.start, pos),
                append_whitespace: false,
                ..Default::default()
            })
            .collect()
    }
}

/// `libs` takes a single `-s` flag
pub fn complete_libs(query: &ArgumentQuery<'_>) -> Vec<String> {
    if query.line.split_whitespace().count() == 1 && query.line.ends_with(' ') {
        vec!["-s".to_string()]
    } else {
        Vec::new()
    }
}

/// `keywords` takes a library name prefix
pub fn complete_keywords(query: &ArgumentQuery<'_>) -> Vec<String> {
    let words: Vec<&str> = query.line.split_whitespace().collect();
    match words.as_slice() {
        [_, lib_name] => names_with_prefix(query.libraries, lib_name),
        [_] if query.line.ends_with(' ') => query.libraries.to_vec(),
        _ => Vec::new(),
    }
}

/// `selenium` takes a url, then a browser
pub fn complete_selenium(query: &ArgumentQuery<'_>) -> Vec<String> {
    let line = query.line.to_lowercase();
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [_, _, driver] => SELENIUM_WEBDRIVERS
            .iter()
            .filter(|name| name.starts_with(driver))
            .map(|name| name.to_string())
            .collect(),
        [_, _] if line.ends_with(' ') => SELENIUM_WEBDRIVERS
            .iter()
            .map(|name| name.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<KeywordDoc> {
        vec![
            KeywordDoc::new("Log", "BuiltIn", "Logs the given message.\n\nMore text."),
            KeywordDoc::new("Log To Console", "BuiltIn", "Logs to the console."),
            KeywordDoc::new("Get From List", "Collections", "Returns the value."),
        ]
    }

    fn libraries() -> Vec<LibraryInfo> {
        ["BuiltIn", "Collections"]
            .iter()
            .map(|name| LibraryInfo {
                name: name.to_string(),
                version: "7.0".to_string(),
                doc: String::new(),
                source: None,
            })
            .collect()
    }

    fn completer() -> CmdCompleter {
        let helps = [("help", "Show help message."), ("keywords", "Print keywords.")];
        let mut completers: HashMap<String, ArgCompleter> = HashMap::new();
        completers.insert("keywords".to_string(), complete_keywords);
        completers.insert("k".to_string(), complete_keywords);
        completers.insert("selenium".to_string(), complete_selenium);
        CmdCompleter::new(
            build_candidates(&helps, &libraries(), &keywords()),
            completers,
            vec!["BuiltIn".to_string(), "Collections".to_string()],
        )
    }

    fn values(completions: Vec<Completion>) -> Vec<String> {
        completions.into_iter().map(|c| c.value).collect()
    }

    #[test]
    fn every_keyword_appears_qualified_and_bare() {
        let completer = completer();
        for keyword in keywords() {
            let matching: Vec<&Candidate> = completer
                .candidates()
                .iter()
                .filter(|c| c.display == keyword.name && c.summary.starts_with("Keyword"))
                .collect();
            assert_eq!(matching.len(), 2, "{}", keyword.name);
            assert!(matching.iter().any(|c| c.name == keyword.qualified_name()));
            assert!(matching.iter().any(|c| c.name == keyword.name));
        }
    }

    #[test]
    fn summaries_describe_the_source() {
        let candidates = completer().candidates;
        let summary = |name: &str| {
            candidates
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.summary.clone())
                .unwrap()
        };
        assert_eq!(summary("help"), "DEBUG command: Show help message.");
        assert_eq!(summary("Collections"), "Library: Collections 7.0");
        assert_eq!(summary("BuiltIn.Log"), "Keyword: Logs the given message.");
        assert_eq!(summary("Log"), "Keyword[BuiltIn.]: Logs the given message.");
    }

    #[test]
    fn root_level_text_never_offers_qualified_names() {
        let completer = completer();
        for text in ["", "l", "lo", "LOG", "get", "b"] {
            for completion in completer.complete_line(text, text.len()) {
                assert!(!completion.value.contains('.'), "{} -> {}", text, completion.value);
            }
        }
        assert_eq!(
            values(completer.complete_line("LOG", 3)),
            vec!["Log", "Log To Console"]
        );
    }

    #[test]
    fn dotted_text_only_offers_qualified_names() {
        let completer = completer();
        assert_eq!(
            values(completer.complete_line("builtin.log t", 13)),
            vec!["BuiltIn.Log To Console"]
        );
        assert_eq!(
            values(completer.complete_line("collections.", 12)),
            vec!["Collections.Get From List"]
        );
    }

    #[test]
    fn arguments_use_the_command_completer() {
        let completer = completer();

        let all = completer.complete_line("keywords  ", 10);
        assert_eq!(values(all.clone()), vec!["BuiltIn", "Collections"]);
        assert!(all.iter().all(|c| c.start == 10));

        assert_eq!(values(completer.complete_line("k  co", 5)), vec!["Collections"]);
        assert!(completer.complete_line("help  x", 7).is_empty());
        assert!(completer.complete_line("nothing  x", 10).is_empty());
    }

    #[test]
    fn argument_completers() {
        let libraries = vec!["BuiltIn".to_string()];
        let query = |line: &'static str| ArgumentQuery {
            text: "",
            line,
            begin: line.len(),
            end: line.len(),
            libraries: &[],
        };

        assert_eq!(complete_libs(&query("libs  ")), vec!["-s"]);
        assert!(complete_libs(&query("libs  -")).is_empty());

        assert_eq!(complete_selenium(&query("selenium  google.com  ")).len(), 7);
        assert_eq!(
            complete_selenium(&query("selenium  google.com  Ch")),
            vec!["chrome"]
        );
        assert!(complete_selenium(&query("selenium  ")).is_empty());

        let with_libs = ArgumentQuery {
            text: "b",
            line: "keywords  b",
            begin: 10,
            end: 11,
            libraries: &libraries,
        };
        assert_eq!(complete_keywords(&with_libs), vec!["BuiltIn"]);
    }
}
