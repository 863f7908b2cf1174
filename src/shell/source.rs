use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use anyhow::Result;

use crate::engine::{Engine, EngineError};
use crate::styles::Console;

/// Lines shown before the current one by `list`
const CONTEXT_BEFORE: usize = 5;
/// Lines shown after the first one by `list`
const LIST_SPAN: usize = 10;

fn print_lines(
    console: &Console,
    path: &Path,
    lines: RangeInclusive<usize>,
    current: usize,
) -> Result<()> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            console.error("! FAILED:", &format!("cannot read {}: {}", path.display(), err))?;
            return Ok(());
        }
    };

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        if !lines.contains(&lineno) {
            continue;
        }
        let marker = if lineno == current { "->" } else { "  " };
        console.line(&format!("{:>3} {}\t{}", lineno, marker, line.trim_end()))?;
    }
    Ok(())
}

/// Print the lines around `lineno`
pub fn print_source_lines(console: &Console, path: &Path, lineno: usize) -> Result<()> {
    let first = lineno.saturating_sub(CONTEXT_BEFORE).max(1);
    print_lines(console, path, first..=first + LIST_SPAN, lineno)
}

/// Print the whole test case containing `lineno`
pub fn print_test_case_lines(
    engine: &dyn Engine,
    console: &Console,
    path: &Path,
    lineno: usize,
) -> Result<()> {
    match engine.test_case_lines(path, lineno) {
        Ok(lines) => print_lines(console, path, lines, lineno),
        Err(EngineError::Unsupported(reason)) => {
            console.line("Please upgrade the engine to support listing test case source:")?;
            console.line(&format!("    {}", reason))?;
            Ok(())
        }
        Err(err) => {
            console.error("! execution failed:", &err.to_string())?;
            Ok(())
        }
    }
}
