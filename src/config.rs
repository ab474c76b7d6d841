// ABOUTME: Configuration and constants for the Lox interpreter
// This module contains version info, REPL banner text, and the history file name

pub const VERSION: &str = "1.0.0";
pub const WELCOME_MESSAGE: &str = "Lox Interpreter v1.0";
pub const WELCOME_SUBTITLE: &str = "A tree-walking Lox implementation in Rust";
pub const WELCOME_FOOTER: &str = "Type a statement to run it. Use Ctrl-D or an empty line to exit.";

pub const PROMPT: &str = "lox> ";
pub const HISTORY_FILE: &str = ".rlox_history";

pub const USAGE: &str = "Usage: rlox [script]";
