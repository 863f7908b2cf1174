//! Interactive debug shell for keyword-driven test engines
//!
//! The shell pauses a running engine, lets the user run keywords and inspect libraries, and
//! can single-step through a suite. It talks to the engine only through [`engine::Engine`].

pub mod config;
pub mod context;
pub mod engine;
pub mod host;
pub mod repl;
pub mod session;
pub mod shell;
pub mod styles;

pub use context::Context;
pub use engine::{BuiltinEngine, Engine, EngineError};
pub use session::{Session, debug, step_listener};
