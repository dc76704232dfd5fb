// ABOUTME: Collects error flags and prints diagnostics for all phases

use crate::error::{ParseError, RuntimeError};
use crate::token::Token;

/// Error sink shared by scanner, parser, resolver, and interpreter. The
/// driver inspects the flags after each phase to gate the next one and to
/// pick an exit code.
#[derive(Debug, Default)]
pub struct Reporter {
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    /// Scan error: no token exists yet, only a line number.
    pub fn error(&mut self, line: usize, message: &str) {
        println!("[line {}] Error: {}", line, message);
        self.had_error = true;
    }

    /// Parse or resolve error anchored at a token.
    pub fn error_at(&mut self, token: &Token, message: &str) {
        self.parse_error(&ParseError::new(token.clone(), message));
    }

    pub fn parse_error(&mut self, error: &ParseError) {
        println!("{}", error);
        self.had_error = true;
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        println!("{}", error);
        self.had_runtime_error = true;
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clears both flags; the REPL calls this between lines.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    #[test]
    fn test_flags_start_clear() {
        let reporter = Reporter::new();
        assert!(!reporter.had_error());
        assert!(!reporter.had_runtime_error());
    }

    #[test]
    fn test_error_sets_compile_flag_only() {
        let mut reporter = Reporter::new();
        reporter.error(1, "Unexpected character.");
        assert!(reporter.had_error());
        assert!(!reporter.had_runtime_error());
    }

    #[test]
    fn test_runtime_error_sets_runtime_flag_only() {
        let mut reporter = Reporter::new();
        let token = Token::new(TokenType::Plus, "+".to_string(), None, 1);
        reporter.runtime_error(&RuntimeError::new(token, "Operands must be numbers."));
        assert!(!reporter.had_error());
        assert!(reporter.had_runtime_error());
    }

    #[test]
    fn test_reset_clears_both_flags() {
        let mut reporter = Reporter::new();
        reporter.error(1, "Unexpected character.");
        let token = Token::new(TokenType::Plus, "+".to_string(), None, 1);
        reporter.runtime_error(&RuntimeError::new(token, "Operand must be a number."));
        reporter.reset();
        assert!(!reporter.had_error());
        assert!(!reporter.had_runtime_error());
    }
}
