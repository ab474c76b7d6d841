// ABOUTME: Error types, control-flow signals, and the diagnostic Reporter contract

use crate::token::{Token, TokenKind};
use crate::value::Value;
use thiserror::Error;

/// A runtime failure in the interpreter, carrying the offending token for
/// line attribution.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        RuntimeError {
            token: token.clone(),
            message: message.into(),
        }
    }
}

/// Marker raised inside the parser to unwind to the nearest declaration,
/// where panic-mode recovery resynchronizes the token stream. The actual
/// diagnostic has already gone through the Reporter by the time this exists.
#[derive(Error, Debug, Clone, Copy)]
#[error("parse error")]
pub struct ParseError;

/// Non-local exits during statement execution.
///
/// `Return` is control flow, not an error: it is caught at the function-call
/// boundary and nowhere else. `Error` propagates to the top-level interpret
/// loop.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

/// Sink for diagnostics emitted by the lexer, parser, resolver, and
/// interpreter. The driver decides how they reach the user.
pub trait Reporter {
    /// A compile-time error (lex/parse/resolve) at a line, with an optional
    /// location such as ` at 'foo'`.
    fn compile_error(&mut self, line: usize, location: &str, message: &str);

    /// A runtime error from the evaluator.
    fn runtime_error(&mut self, error: &RuntimeError);

    /// A compile-time error attributed to a specific token.
    fn error_at(&mut self, token: &Token, message: &str) {
        if token.kind == TokenKind::Eof {
            self.compile_error(token.line, " at end", message);
        } else {
            let location = format!(" at '{}'", token.lexeme);
            self.compile_error(token.line, &location, message);
        }
    }
}

/// Reporter that prints diagnostics to stderr and tracks error flags.
///
/// Flags are per-instance: every interpreter run owns its own reporter.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        ConsoleReporter::default()
    }

    /// Clears both flags between REPL lines so one bad line does not
    /// suppress the next.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

impl Reporter for ConsoleReporter {
    fn compile_error(&mut self, line: usize, location: &str, message: &str) {
        eprintln!("[line {}] Error{}: {}", line, location, message);
        self.had_error = true;
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error.message, error.token.line);
        self.had_runtime_error = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme.to_string(), None, 3)
    }

    #[test]
    fn test_compile_error_sets_flag() {
        let mut reporter = ConsoleReporter::new();
        assert!(!reporter.had_error);
        reporter.compile_error(1, "", "Unexpected character '@'.");
        assert!(reporter.had_error);
        assert!(!reporter.had_runtime_error);
    }

    #[test]
    fn test_runtime_error_sets_flag() {
        let mut reporter = ConsoleReporter::new();
        let error = RuntimeError::new(&token(TokenKind::Plus, "+"), "Operands must be numbers.");
        reporter.runtime_error(&error);
        assert!(reporter.had_runtime_error);
        assert!(!reporter.had_error);
    }

    #[test]
    fn test_reset_clears_flags() {
        let mut reporter = ConsoleReporter::new();
        reporter.compile_error(1, "", "Expect expression.");
        reporter.reset();
        assert!(!reporter.had_error);
        assert!(!reporter.had_runtime_error);
    }

    #[test]
    fn test_error_at_formats_location() {
        struct Collecting(Vec<String>);
        impl Reporter for Collecting {
            fn compile_error(&mut self, line: usize, location: &str, message: &str) {
                self.0
                    .push(format!("[line {}] Error{}: {}", line, location, message));
            }
            fn runtime_error(&mut self, _error: &RuntimeError) {}
        }

        let mut reporter = Collecting(Vec::new());
        reporter.error_at(&token(TokenKind::Eof, ""), "Expect ';' after value.");
        reporter.error_at(&token(TokenKind::Equal, "="), "Invalid assignment target.");
        assert_eq!(
            reporter.0,
            vec![
                "[line 3] Error at end: Expect ';' after value.",
                "[line 3] Error at '=': Invalid assignment target.",
            ]
        );
    }

    #[test]
    fn test_runtime_error_display_is_message() {
        let error = RuntimeError::new(&token(TokenKind::Minus, "-"), "Operand must be a number.");
        assert_eq!(format!("{}", error), "Operand must be a number.");
    }
}
