use std::fs;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::engine::variables::is_variable;
use crate::engine::{BuiltinEngine, Engine, EngineError};
use crate::session::{StepEvent, step_listener};
use crate::shell::parse_keyword;

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub lineno: usize,
    /// The line as written
    pub source: String,
    pub assign: Option<String>,
    pub keyword: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    /// Line of the test name
    pub lineno: usize,
    /// Last line holding a step (or the name line for an empty test)
    pub end: usize,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    pub path: PathBuf,
    pub libraries: Vec<String>,
    pub tests: Vec<TestCase>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Settings,
    TestCases,
    Other,
}

fn section_of(header: &str) -> Section {
    let name = header.trim_matches(|c: char| c == '*' || c.is_whitespace()).to_lowercase();
    if name.starts_with("setting") {
        Section::Settings
    } else if name.starts_with("test case") {
        Section::TestCases
    } else {
        Section::Other
    }
}

pub fn parse_suite(path: &Path) -> Result<Suite> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read suite {}", path.display()))?;
    Ok(parse_suite_text(path, &text))
}

pub fn parse_suite_text(path: &Path, text: &str) -> Suite {
    let mut suite = Suite {
        path: path.to_path_buf(),
        libraries: Vec::new(),
        tests: Vec::new(),
    };
    let mut section = Section::Other;

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let trimmed = raw.trim();
        if trimmed.starts_with("***") {
            section = section_of(trimmed);
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = parse_keyword(trimmed)
            .into_iter()
            .filter(|token| !token.is_empty())
            .collect();

        match section {
            Section::Settings => {
                if let [setting, library, ..] = tokens.as_slice()
                    && setting.eq_ignore_ascii_case("library")
                {
                    suite.libraries.push(library.to_string());
                }
            }
            Section::TestCases => {
                let indented = raw.starts_with([' ', '\t']);
                if !indented {
                    suite.tests.push(TestCase {
                        name: trimmed.to_string(),
                        lineno,
                        end: lineno,
                        steps: Vec::new(),
                    });
                } else if let Some(test) = suite.tests.last_mut()
                    && let Some(step) = parse_step(lineno, trimmed, &tokens)
                {
                    test.end = lineno;
                    test.steps.push(step);
                }
            }
            Section::Other => {}
        }
    }

    suite
}

fn parse_step(lineno: usize, source: &str, tokens: &[&str]) -> Option<Step> {
    let (first, rest) = tokens.split_first()?;
    let variable = first.trim_end_matches(['=', ' ']);
    let (assign, keyword, args) = if is_variable(variable) {
        let (keyword, args) = rest.split_first()?;
        (Some(variable.to_string()), *keyword, args)
    } else {
        (None, *first, rest)
    };

    Some(Step {
        lineno,
        source: source.to_string(),
        assign,
        keyword: keyword.to_string(),
        args: args.iter().map(|arg| arg.to_string()).collect(),
    })
}

/// Pass/fail counts
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SuiteOutcome {
    pub passed: usize,
    pub failed: usize,
}

impl AddAssign for SuiteOutcome {
    fn add_assign(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
    }
}

/// Runs suites on the bundled engine with the step listener attached
pub struct SuiteRunner {
    engine: BuiltinEngine,
}

impl SuiteRunner {
    pub fn new(engine: BuiltinEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &BuiltinEngine {
        &self.engine
    }

    pub fn run(&mut self, suite: &Suite) -> Result<SuiteOutcome> {
        let session = self.engine.session().clone();
        let console = &session.console;

        for library in &suite.libraries {
            if let Err(err) = self.engine.import_library(library) {
                tracing::warn!(library = library.as_str(), error = %err, "suite import failed");
                console.error("! import failed:", &err.to_string())?;
            }
        }
        self.engine.register_test_cases(
            &suite.path,
            suite.tests.iter().map(|test| test.lineno..=test.end).collect(),
        );

        let mut outcome = SuiteOutcome::default();
        for test in &suite.tests {
            tracing::info!(test = test.name.as_str(), "running test");
            match self.run_test(&suite.path, test) {
                Ok(()) => {
                    console.line(&format!("{} | PASS", test.name))?;
                    outcome.passed += 1;
                }
                Err(StepFailure::Engine(err)) => {
                    console.line(&format!("{} | FAIL", test.name))?;
                    console.line(&err.to_string())?;
                    outcome.failed += 1;
                }
                Err(StepFailure::Host(err)) => return Err(err),
            }
        }
        Ok(outcome)
    }

    fn run_test(&mut self, path: &Path, test: &TestCase) -> Result<(), StepFailure> {
        let session = self.engine.session().clone();
        for step in &test.steps {
            let event = StepEvent {
                path,
                lineno: step.lineno,
                source: &step.source,
                assign: step.assign.as_deref(),
                keyword: &step.keyword,
                args: &step.args,
            };
            step_listener(&mut self.engine, &session, &event).map_err(StepFailure::Host)?;

            let value = self
                .engine
                .run_keyword(&step.keyword, &step.args)
                .map_err(StepFailure::Engine)?;
            if let Some(assign) = &step.assign {
                self.engine
                    .set_variable(assign, value)
                    .map_err(StepFailure::Engine)?;
            }
        }
        Ok(())
    }

    /// `<n> tests, <p> passed, <f> failed`
    pub fn print_summary(&self, outcome: &SuiteOutcome) -> Result<()> {
        self.engine.session().console.line(&format!(
            "{} tests, {} passed, {} failed",
            outcome.passed + outcome.failed,
            outcome.passed,
            outcome.failed
        ))?;
        Ok(())
    }
}

enum StepFailure {
    /// The test failed
    Engine(EngineError),
    /// The walk itself cannot go on
    Host(anyhow::Error),
}
