use std::collections::HashMap;

use anyhow::Result;

use super::DebugShell;
use super::bridge::{run_robot_command, start_selenium_commands};
use super::completer::{ArgCompleter, complete_keywords, complete_libs, complete_selenium};
use super::source::{print_source_lines, print_test_case_lines};
use crate::engine::catalog::{find_keyword, find_library, lib_keywords, match_libs};

/// Runs a command with its argument; returns true to leave the shell
pub type Handler = fn(&mut DebugShell<'_>, &str) -> Result<bool>;

/// A shell command and the names it answers to
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub help: &'static str,
    pub handler: Handler,
    pub completer: Option<ArgCompleter>,
}

impl CommandSpec {
    /// First line of the help text
    pub fn summary(&self) -> &'static str {
        self.help.lines().next().unwrap_or(self.name)
    }
}

const HELP_INTRO: &str = "\
Input Robotframework keywords, or commands listed below.
Use \"libs\" or \"l\" to see available libraries,
use \"keywords\" or \"k\" see the list of library keywords,
use the TAB keyboard key to autocomplete keywords.";

const DOC_HEADER: &str = "Documented commands (type help <topic>):";

static COMMANDS: [CommandSpec; 11] = [
    CommandSpec {
        name: "help",
        aliases: &[],
        help: "Show help message.",
        handler: do_help,
        completer: None,
    },
    CommandSpec {
        name: "exit",
        aliases: &["EOF"],
        help: "Exit debug shell.",
        handler: do_exit,
        completer: None,
    },
    CommandSpec {
        name: "libs",
        aliases: &["ls"],
        help: "Print imported and builtin libraries, with source if `-s` specified.\n\n    ls( libs ) [-s]",
        handler: do_libs,
        completer: Some(complete_libs),
    },
    CommandSpec {
        name: "keywords",
        aliases: &["k"],
        help: "Print keywords of libraries, all or starts with <lib_name>.\n\n    k(eywords) [<lib_name>]",
        handler: do_keywords,
        completer: Some(complete_keywords),
    },
    CommandSpec {
        name: "docs",
        aliases: &["d"],
        help: "Get keyword documentation for individual keywords.\n\n    d(ocs) [<keyword_name>]",
        handler: do_docs,
        completer: None,
    },
    CommandSpec {
        name: "step",
        aliases: &["s"],
        help: "Execute the current line, stop at the first possible occasion.",
        handler: do_step,
        completer: None,
    },
    CommandSpec {
        name: "next",
        aliases: &["n"],
        help: "Continue execution until the next line is reached or it returns.",
        handler: do_next,
        completer: None,
    },
    CommandSpec {
        name: "continue",
        aliases: &["c"],
        help: "Continue execution.",
        handler: do_continue,
        completer: None,
    },
    CommandSpec {
        name: "list",
        aliases: &["l"],
        help: "List source code for the current file.",
        handler: do_list,
        completer: None,
    },
    CommandSpec {
        name: "longlist",
        aliases: &["ll"],
        help: "List the whole source code for the current test case.",
        handler: do_longlist,
        completer: None,
    },
    CommandSpec {
        name: "selenium",
        aliases: &[],
        help: "Start a selenium webdriver and open url in browser you expect.\n\n    selenium  [<url>]  [<browser>]\n\n    default url is google.com, default browser is firefox.",
        handler: do_selenium,
        completer: Some(complete_selenium),
    },
];

/// Lookup of commands by name or alias
pub struct CommandTable {
    specs: &'static [CommandSpec],
    index: HashMap<&'static str, usize>,
}

impl CommandTable {
    pub fn standard() -> Self {
        Self::new(&COMMANDS)
    }

    fn new(specs: &'static [CommandSpec]) -> Self {
        let mut index = HashMap::new();
        for (idx, spec) in specs.iter().enumerate() {
            index.insert(spec.name, idx);
            for alias in spec.aliases {
                index.insert(*alias, idx);
            }
        }
        Self { specs, index }
    }

    pub fn get(&self, name: &str) -> Option<&'static CommandSpec> {
        let specs = self.specs;
        self.index.get(name).map(|idx| &specs[*idx])
    }

    /// Every name and alias, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.index.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// `(name, summary)` for every name and alias
    pub fn helps(&self) -> Vec<(&'static str, &'static str)> {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(name).map(|spec| (name, spec.summary())))
            .collect()
    }

    /// Argument completers keyed by every name they answer to
    pub fn completers(&self) -> HashMap<String, ArgCompleter> {
        let mut completers = HashMap::new();
        for (name, idx) in &self.index {
            if let Some(completer) = self.specs[*idx].completer {
                completers.insert(name.to_string(), completer);
            }
        }
        completers
    }
}

fn do_help(shell: &mut DebugShell<'_>, arg: &str) -> Result<bool> {
    let console = shell.session.console.clone();
    let topic = arg.trim();

    if topic.is_empty() {
        console.line(HELP_INTRO)?;
        console.line("")?;
        console.line(DOC_HEADER)?;
        console.line(&"=".repeat(DOC_HEADER.len()))?;
        console.line(&shell.commands.names().join("  "))?;
        console.line("")?;
        return Ok(false);
    }

    match shell.commands.get(topic) {
        Some(spec) => console.line(spec.help)?,
        None => console.line(&format!("*** No help on {}", topic))?,
    }
    Ok(false)
}

fn do_exit(shell: &mut DebugShell<'_>, _arg: &str) -> Result<bool> {
    // Leaving on purpose also leaves step mode
    shell.session.context.set_step_mode(false);
    shell.append_exit();
    Ok(true)
}

fn do_libs(shell: &mut DebugShell<'_>, arg: &str) -> Result<bool> {
    let console = shell.session.console.clone();
    let with_source = arg.contains("-s");

    console.output("<", "Imported libraries:")?;
    for lib in shell.engine.libraries() {
        console.output(&format!("   {}", lib.name), &lib.version)?;
        if let Some(summary) = lib.doc.lines().next()
            && !summary.is_empty()
        {
            console.line(&format!("       {}", summary))?;
        }
        if with_source {
            console.line(&format!("       {}", lib.source.as_deref().unwrap_or("None")))?;
        }
    }

    console.output("<", "Builtin libraries:")?;
    for name in shell.engine.builtin_library_names() {
        console.output(&format!("   {}", name), "")?;
    }
    Ok(false)
}

fn do_keywords(shell: &mut DebugShell<'_>, arg: &str) -> Result<bool> {
    let console = shell.session.console.clone();
    let context = shell.session.context.clone();

    let matched = match_libs(&*shell.engine, arg);
    if matched.is_empty() {
        console.error("< not found library", arg)?;
        return Ok(false);
    }

    for name in matched {
        let Some(lib) = find_library(&*shell.engine, &name) else {
            continue;
        };
        console.output("< Keywords of library", &lib.name)?;
        for keyword in lib_keywords(&*shell.engine, &context, &lib.name).iter() {
            console.output(&format!("   {}\t", keyword.name), keyword.summary())?;
        }
    }
    Ok(false)
}

fn do_docs(shell: &mut DebugShell<'_>, arg: &str) -> Result<bool> {
    let console = shell.session.console.clone();
    let keywords = find_keyword(&*shell.engine, &shell.session.context, arg);

    match keywords.as_slice() {
        [] => console.error("< not find keyword", arg)?,
        [keyword] => console.line(&keyword.doc)?,
        many => {
            let names: Vec<String> = many.iter().map(|kw| kw.qualified_name()).collect();
            console.error(&format!("< found {} keywords", many.len()), &names.join(", "))?
        }
    }
    Ok(false)
}

fn do_step(shell: &mut DebugShell<'_>, _arg: &str) -> Result<bool> {
    shell.session.context.set_step_mode(true);
    // Hand control back to the engine for exactly one step
    shell.append_exit();
    Ok(false)
}

fn do_next(shell: &mut DebugShell<'_>, arg: &str) -> Result<bool> {
    do_step(shell, arg)
}

fn do_continue(shell: &mut DebugShell<'_>, arg: &str) -> Result<bool> {
    do_exit(shell, arg)
}

fn list_source(shell: &mut DebugShell<'_>, longlist: bool) -> Result<bool> {
    let console = shell.session.console.clone();
    let context = &shell.session.context;

    if !context.in_step_mode() {
        console.line("Please run `step` or `next` command first.")?;
        return Ok(false);
    }

    let Some((path, lineno)) = context.source_location() else {
        console.error("< no source location", "the engine has not reported a step yet")?;
        return Ok(false);
    };

    if longlist {
        print_test_case_lines(&*shell.engine, &console, &path, lineno)?;
    } else {
        print_source_lines(&console, &path, lineno)?;
    }
    Ok(false)
}

fn do_list(shell: &mut DebugShell<'_>, _arg: &str) -> Result<bool> {
    list_source(shell, false)
}

fn do_longlist(shell: &mut DebugShell<'_>, _arg: &str) -> Result<bool> {
    list_source(shell, true)
}

fn do_selenium(shell: &mut DebugShell<'_>, arg: &str) -> Result<bool> {
    let console = shell.session.console.clone();
    for command in start_selenium_commands(arg) {
        console.output("#", &command)?;
        run_robot_command(&mut *shell.engine, &console, &command)?;
    }
    Ok(false)
}
