use crate::engine::variables::is_variable;
use crate::engine::{Engine, EngineError};
use crate::styles::Console;

pub const SELENIUM_WEBDRIVERS: [&str; 7] = [
    "firefox",
    "chrome",
    "ie",
    "opera",
    "safari",
    "phantomjs",
    "remote",
];

const DEFAULT_URL: &str = "http://www.google.com/";
const DEFAULT_BROWSER: &str = "firefox";

/// Split a line on runs of two or more spaces, or on single tabs
///
/// Single spaces belong to the token, so `Log To Console  hi` is two tokens.
pub fn parse_keyword(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\t' => {
                parts.push(&line[start..i]);
                i += 1;
                start = i;
            }
            b' ' if bytes.get(i + 1) == Some(&b' ') => {
                parts.push(&line[start..i]);
                while i < bytes.len() && bytes[i] == b' ' {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    parts.push(&line[start..]);
    parts
}

/// Run one line as a keyword (or variable assignment) and describe the result
///
/// Returns `(head, message)` when there is something worth echoing.
pub fn run_keyword(
    engine: &mut dyn Engine,
    line: &str,
) -> Result<Option<(&'static str, String)>, EngineError> {
    if line.is_empty() {
        return Ok(None);
    }

    let parts = parse_keyword(line);
    let (keyword, args) = match parts.split_first() {
        Some((keyword, args)) => (*keyword, args),
        None => return Ok(None),
    };

    if keyword.trim().starts_with('#') {
        return Ok(None);
    }

    let variable = keyword.trim_end_matches(['=', ' ']);
    if is_variable(variable) {
        return assign_variable(engine, variable, keyword, args);
    }

    let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    let output = engine.run_keyword(keyword, &args)?;
    if output.is_truthy() {
        Ok(Some(("<", output.repr())))
    } else {
        Ok(None)
    }
}

fn assign_variable(
    engine: &mut dyn Engine,
    variable: &str,
    token: &str,
    args: &[&str],
) -> Result<Option<(&'static str, String)>, EngineError> {
    let Some((keyword, rest)) = args.split_first() else {
        // A bare variable just shows its value
        engine.log_to_console(token)?;
        return Ok(None);
    };

    let rest: Vec<String> = rest.iter().map(|arg| arg.to_string()).collect();
    let value = engine.run_keyword(keyword, &rest)?;
    let echo = format!("{} = {}", variable, value.repr());
    engine.set_variable(variable, value)?;
    Ok(Some(("#", echo)))
}

/// Run a line and report the outcome on the console; keyword failures never escape
///
/// Only a failure to write to the console is returned.
pub fn run_robot_command(
    engine: &mut dyn Engine,
    console: &Console,
    command: &str,
) -> anyhow::Result<()> {
    if command.is_empty() {
        return Ok(());
    }

    match run_keyword(engine, command) {
        Ok(Some((head, message))) => console.output(head, &message)?,
        Ok(None) => {}
        Err(err) => {
            tracing::debug!(command, error = %err, "keyword failed");
            console.error("! keyword:", command)?;
            match err {
                EngineError::HandlerFailed { full_message, .. } => {
                    console.error("! handler execution failed:", &full_message)?
                }
                EngineError::ExecutionFailed(message) => {
                    console.error("! execution failed:", &message)?
                }
                other => console.error("! FAILED:", &format!("{:?}", other))?,
            }
        }
    }
    Ok(())
}

/// The two commands that open a browser: `[<url>]  [<browser>]`
pub fn start_selenium_commands(arg: &str) -> [String; 2] {
    let mut url = DEFAULT_URL.to_string();
    let mut browser = DEFAULT_BROWSER.to_string();
    if !arg.is_empty() {
        match parse_keyword(arg).as_slice() {
            [given_url, given_browser] => {
                url = given_url.to_string();
                browser = given_browser.to_string();
            }
            _ => url = arg.to_string(),
        }
    }
    if !url.contains("://") {
        url = format!("http://{}", url);
    }

    [
        "import library  SeleniumLibrary".to_string(),
        format!("open browser  {}  {}", url, browser),
    ]
}
